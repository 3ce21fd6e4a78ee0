pub mod audit_log_repository;
pub mod repository_trait;
pub mod trip_event_repository;

pub use audit_log_repository::*;
pub use repository_trait::*;
pub use trip_event_repository::*;
