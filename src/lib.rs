// Library surface for the CLI, integration tests and reuse.
pub mod analytics;
pub mod app_dirs;
pub mod catalog;
pub mod config;
pub mod error;
pub mod logging;
pub mod migration;
pub mod model;
pub mod performance;
pub mod render;
pub mod snapshot;
pub mod store;
pub mod util;

pub use error::{Error, Result};
pub use snapshot::Snapshot;
pub use store::{KeyValueStore, MemoryStore, SqliteStore};
