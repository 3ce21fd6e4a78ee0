//! # Terminal State Enums

//! This module defines the enums representing every lifecycle position tracked by the terminal operations engine:
//! booking status, truck-trip status, custody stage, bay status, priority class and schedule-block status.
//! Every enum travels on the wire as its SCREAMING_SNAKE name and parses case-insensitively from the same name.

use std::fmt;
use std::str::FromStr;
use serde::{Deserialize, Serialize};
use crate::errors::TerminalError;

macro_rules! wire_enum {
    (
        $(#[$meta:meta])*
        $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident => $wire:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub enum $name {
            $( $(#[$vmeta])* #[serde(rename = $wire)] $variant, )+
        }

        impl $name {
            /// Every variant, in declaration order.
            pub const ALL: &'static [$name] = &[ $( $name::$variant ),+ ];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $( $name::$variant => $wire, )+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = TerminalError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let upper = s.trim().to_ascii_uppercase();
                match upper.as_str() {
                    $( $wire => Ok($name::$variant), )+
                    _ => Err(TerminalError::Validation(format!(
                        "'{}' is not a valid {}; expected one of [{}]",
                        s,
                        stringify!($name),
                        [$( $wire ),+].join(", ")
                    ))),
                }
            }
        }
    };
}

wire_enum! {
    /// The coarse lifecycle of a booking, from client draft to closure.
    BookingStatus {
        /// Created by the client, not yet submitted.
        Draft => "DRAFT",
        /// Submitted for approval.
        Submitted => "SUBMITTED",
        /// Approved on the client side.
        ClientApproved => "CLIENT_APPROVED",
        /// Scheduled by terminal operations.
        OpsScheduled => "OPS_SCHEDULED",
        /// Waiting for the truck details.
        TruckDetailsPending => "TRUCK_DETAILS_PENDING",
        /// Gate-entry credential issued.
        QrIssued => "QR_ISSUED",
        /// The truck is at the gate.
        ArrivedGate => "ARRIVED_GATE",
        /// The truck has been checked in.
        InTerminal => "IN_TERMINAL",
        /// Product has been loaded.
        Loaded => "LOADED",
        /// The truck has left the terminal.
        Exited => "EXITED",
        /// Final. Paperwork complete.
        Closed => "CLOSED",
        /// Final. Refused at approval.
        Rejected => "REJECTED",
        /// Final. Withdrawn.
        Cancelled => "CANCELLED",
        /// Safety hold, resumable.
        StopWork => "STOP_WORK",
    }
}

wire_enum! {
    /// The coarse status of one physical truck movement.
    TripStatus {
        Pending => "PENDING",
        QrIssued => "QR_ISSUED",
        Arrived => "ARRIVED",
        InTerminal => "IN_TERMINAL",
        Loaded => "LOADED",
        Exited => "EXITED",
        Closed => "CLOSED",
    }
}

wire_enum! {
    /// The fine-grained physical custody of a truck inside the terminal.
    CustodyStage {
        GateCheckin => "GATE_CHECKIN",
        SafetyApproved => "SAFETY_APPROVED",
        DocumentsVerified => "DOCUMENTS_VERIFIED",
        WeighIn => "WEIGH_IN",
        ReadyForBay => "READY_FOR_BAY",
        LoadingStarted => "LOADING_STARTED",
        LoadingCompleted => "LOADING_COMPLETED",
        WeighOut => "WEIGH_OUT",
        Sealed => "SEALED",
        CustodyTransferred => "CUSTODY_TRANSFERRED",
        Exited => "EXITED",
    }
}

wire_enum! {
    /// The status of a physical loading bay.
    BayStatus {
        Available => "AVAILABLE",
        Occupied => "OCCUPIED",
        Maintenance => "MAINTENANCE",
        Blocked => "BLOCKED",
    }
}

wire_enum! {
    /// Scheduling category controlling queue tie-breaking.
    PriorityClass {
        /// System default: arrived within its appointment window.
        Appointment => "APPOINTMENT",
        /// System default: first come, first served.
        Fcfs => "FCFS",
        /// Operator override.
        Reclassified => "RECLASSIFIED",
        /// Operator override.
        Blocked => "BLOCKED",
    }
}

wire_enum! {
    BlockStatus {
        Planned => "PLANNED",
        Active => "ACTIVE",
        Completed => "COMPLETED",
        Cancelled => "CANCELLED",
    }
}

wire_enum! {
    /// Where a schedule block came from.
    BlockSource {
        ControllerConfirmed => "CONTROLLER_CONFIRMED",
        AiSuggested => "AI_SUGGESTED",
        Manual => "MANUAL",
    }
}

wire_enum! {
    RecommendationKind {
        BayAssignment => "BAY_ASSIGNMENT",
        QueueResequence => "QUEUE_RESEQUENCE",
    }
}

impl PriorityClass {
    /// `true` for the classes only an operator can set.
    pub fn is_override(&self) -> bool {
        matches!(self, PriorityClass::Reclassified | PriorityClass::Blocked)
    }
}

impl CustodyStage {
    /// `true` for stages that move the truck or the product. Administrative stages stay reachable under a stop-work hold.
    pub fn is_physical_movement(&self) -> bool {
        !matches!(
            self,
            CustodyStage::GateCheckin | CustodyStage::SafetyApproved | CustodyStage::DocumentsVerified
        )
    }
}
