pub mod booking_controller;
pub mod gate_controller;
pub mod bay_controller;

pub use booking_controller::BookingController;
pub use gate_controller::GateController;
pub use bay_controller::BayController;
