//! Player whitelist management.

pub mod store;

pub use store::{WhitelistEntry, WhitelistStore};
