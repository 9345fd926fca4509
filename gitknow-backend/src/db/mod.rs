mod sqlite;
mod tables;

pub use sqlite::Database;

#[cfg(test)]
pub(crate) use sqlite::test_database;
