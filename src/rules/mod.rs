pub mod safety_gate_rule;

pub use safety_gate_rule::*;
