//! Public roster: everyone who connected the required providers, stripped of
//! anything secret. Order follows the store and is not meaningful.

use std::sync::Arc;

use crate::db::Database;
use crate::error::RosterError;
use crate::models::{Provider, PublicProfile};

/// Which sub-records a record must have to appear on the roster
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RosterFilter {
    pub required: Vec<Provider>,
}

impl RosterFilter {
    /// The filter the public roster uses: GitHub and Twitter both connected
    pub fn github_and_twitter() -> Self {
        Self {
            required: vec![Provider::Github, Provider::Twitter],
        }
    }
}

pub struct RosterProjector {
    db: Arc<Database>,
}

impl RosterProjector {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub fn list(&self, filter: &RosterFilter) -> Result<Vec<PublicProfile>, RosterError> {
        let records = self.db.list_identities_with(&filter.required)?;
        Ok(records.iter().map(PublicProfile::from).collect())
    }
}
