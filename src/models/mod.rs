pub mod istates;
pub mod itransitions;
pub mod ibooking;
pub mod itrip;
pub mod ibay;
pub mod irecommendation;
pub mod ievents;
pub mod idb_log;

pub use istates::*;
pub use itransitions::*;
pub use ibooking::*;
pub use itrip::*;
pub use ibay::*;
pub use irecommendation::*;
pub use ievents::*;
pub use idb_log::*;

use chrono::{Local, NaiveDateTime};

pub fn local_now() -> NaiveDateTime {
    Local::now().naive_local()
}

/// Fresh identifier for a new entity or ledger row.
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
