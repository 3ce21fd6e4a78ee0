pub mod ready_queue;

pub use ready_queue::*;
