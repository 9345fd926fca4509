//! Link resolver: decides whether a completed OAuth flow creates a new
//! identity record, logs into an existing one, or links/refreshes a provider
//! on the record the session is already bound to.

use std::sync::Arc;

use crate::config::LinkConflictPolicy;
use crate::db::Database;
use crate::error::LinkError;
use crate::models::{IdentityRecord, LinkedAccount, Provider, ProviderCallback};

/// What a resolution did to the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum LinkOutcome {
    /// Anonymous caller, unknown provider account: new record
    Created,
    /// Anonymous caller, known provider account: existing record, tokens refreshed
    LoggedIn,
    /// Signed-in caller, provider not yet on their record
    Linked,
    /// Signed-in caller, provider already on their record
    Refreshed,
}

#[derive(Debug, Clone)]
pub struct Resolution {
    pub record: IdentityRecord,
    pub outcome: LinkOutcome,
}

pub struct LinkResolver {
    db: Arc<Database>,
    conflict_policy: LinkConflictPolicy,
}

impl LinkResolver {
    pub fn new(db: Arc<Database>, conflict_policy: LinkConflictPolicy) -> Self {
        Self { db, conflict_policy }
    }

    /// Validate a provider callback and resolve it against the caller's record
    pub fn resolve(
        &self,
        current: Option<&IdentityRecord>,
        provider: Provider,
        callback: ProviderCallback,
    ) -> Result<Resolution, LinkError> {
        let account = callback.into_account(provider)?;
        self.resolve_account(current, account)
    }

    /// Create-or-update exactly one record inside a single transaction
    fn resolve_account(
        &self,
        current: Option<&IdentityRecord>,
        account: LinkedAccount,
    ) -> Result<Resolution, LinkError> {
        let provider = account.provider();
        let provider_id = account.provider_id().to_string();

        let resolution = self.db.transaction(|tx| {
            // Re-read the bound record so the decision sees the latest state
            let bound = match current {
                Some(record) => Database::find_identity(tx, &record.id)?,
                None => None,
            };

            if let Some(bound) = bound {
                if let Some(other) =
                    Database::find_other_identity_by_provider(tx, provider, &provider_id, &bound.id)?
                {
                    log::warn!(
                        "{} account {} is already linked to identity {}, requested by identity {}",
                        provider,
                        provider_id,
                        other.id,
                        bound.id
                    );
                    if self.conflict_policy == LinkConflictPolicy::Reject {
                        return Err(LinkError::LinkConflict {
                            provider,
                            provider_id: provider_id.clone(),
                            existing_id: other.id,
                        });
                    }
                }

                let outcome = if bound.has(provider) {
                    LinkOutcome::Refreshed
                } else {
                    LinkOutcome::Linked
                };
                Database::write_linked_account(tx, &bound.id, &account)?;
                let record = Database::find_identity(tx, &bound.id)?
                    .ok_or(rusqlite::Error::QueryReturnedNoRows)
                    .map_err(crate::error::StoreError::from)?;
                return Ok(Resolution { record, outcome });
            }

            if let Some(current) = current {
                log::warn!("Session was bound to missing identity {}, treating as anonymous", current.id);
            }

            match Database::find_identity_by_provider(tx, provider, &provider_id)? {
                Some(existing) => {
                    Database::write_linked_account(tx, &existing.id, &account)?;
                    let record = Database::find_identity(tx, &existing.id)?
                        .ok_or(rusqlite::Error::QueryReturnedNoRows)
                        .map_err(crate::error::StoreError::from)?;
                    Ok(Resolution {
                        record,
                        outcome: LinkOutcome::LoggedIn,
                    })
                }
                None => Ok(Resolution {
                    record: Database::insert_identity(tx, &account)?,
                    outcome: LinkOutcome::Created,
                }),
            }
        })?;

        log::info!(
            "{} {} account {} for identity {} ({} providers connected)",
            resolution.outcome,
            provider,
            provider_id,
            resolution.record.id,
            resolution.record.connection_count()
        );

        Ok(resolution)
    }
}
