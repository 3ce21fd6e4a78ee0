pub mod alert_manager;

pub use alert_manager::AlertManager;
