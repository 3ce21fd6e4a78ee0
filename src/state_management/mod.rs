pub mod state_manager;
pub mod terminal_state_repository;
pub mod event_dispatcher;
pub mod ledger_manager;
pub mod state_manager_lifecycle;

pub use state_manager::TerminalStateManager;
pub use terminal_state_repository::{Committed, TerminalSnapshot, TerminalStateRepository, TerminalTx};
