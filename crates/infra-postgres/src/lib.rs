// cogdb Infrastructure - Postgres Adapter
// Implements: DatabaseAdmin, EngineFactory, Engine

mod admin;
mod engine;
mod error;
mod options;

pub use admin::{PgAdminConnection, PgDatabaseAdmin};
pub use engine::{PgEngine, PgEngineFactory};
pub use options::{connect_options, quote_ident};
