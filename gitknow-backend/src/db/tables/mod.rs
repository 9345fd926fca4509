//! Table modules - extend Database with domain-specific methods
//!
//! Each module adds `impl Database` blocks with methods for one table.

mod identities; // identity_records
mod sessions;   // sessions
