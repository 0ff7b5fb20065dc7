pub mod connection;
pub mod fixtures;
pub mod migrations;
pub mod repositories;
pub mod stores;

pub use connection::{connect, connect_from_config, connect_with_settings, DbPool};
pub use fixtures::{DemoCatalog, SeedResult, VerificationResult};
pub use stores::Stores;
