pub mod auth;
pub mod audit_sink;
pub mod db;
pub mod dbc;
pub mod rate_limit;

pub use auth::*;
pub use audit_sink::*;
pub use dbc::database_client::DatabaseClient;
pub use rate_limit::RateLimiter;
