//! # Lifecycle Transition Tables
//!
//! Fixed directed graphs for the booking lifecycle and the custody stage. Both are pure lookups with no side effects;
//! every mutating workflow validates its requested edge here before touching state.

use crate::errors::{TerminalError, TerminalResult};
use crate::models::istates::{BookingStatus, CustodyStage};

impl BookingStatus {
    pub fn next_states(&self) -> &'static [BookingStatus] {
        use BookingStatus::*;
        match self {
            Draft => &[Submitted, Cancelled],
            Submitted => &[ClientApproved, Rejected, Cancelled],
            ClientApproved => &[OpsScheduled, Cancelled],
            OpsScheduled => &[TruckDetailsPending, Cancelled, StopWork],
            TruckDetailsPending => &[QrIssued, Cancelled, StopWork],
            QrIssued => &[ArrivedGate, Cancelled, StopWork],
            ArrivedGate => &[InTerminal, StopWork],
            InTerminal => &[Loaded, StopWork],
            Loaded => &[Exited, StopWork],
            Exited => &[Closed],
            StopWork => &[OpsScheduled, Cancelled],
            Closed | Rejected | Cancelled => &[],
        }
    }

    pub fn can_transition_to(&self, to: BookingStatus) -> bool {
        self.next_states().contains(&to)
    }

    pub fn is_terminal(&self) -> bool {
        self.next_states().is_empty()
    }

    /// Client-side edits are only accepted before the booking is approved.
    pub fn is_modifiable(&self) -> bool {
        matches!(self, BookingStatus::Draft | BookingStatus::Submitted)
    }

    pub fn is_cancellable(&self) -> bool {
        self.can_transition_to(BookingStatus::Cancelled)
    }

    /// Statuses that represent the truck physically advancing through the terminal.
    pub fn is_physical_movement(&self) -> bool {
        matches!(
            self,
            BookingStatus::ArrivedGate | BookingStatus::InTerminal | BookingStatus::Loaded | BookingStatus::Exited
        )
    }
}

impl CustodyStage {
    pub fn next_stages(&self) -> &'static [CustodyStage] {
        use CustodyStage::*;
        match self {
            GateCheckin => &[SafetyApproved, DocumentsVerified],
            SafetyApproved => &[DocumentsVerified, ReadyForBay],
            DocumentsVerified => &[ReadyForBay],
            WeighIn => &[ReadyForBay],
            ReadyForBay => &[LoadingStarted],
            LoadingStarted => &[LoadingCompleted],
            LoadingCompleted => &[WeighOut],
            WeighOut => &[Sealed],
            Sealed => &[CustodyTransferred],
            CustodyTransferred => &[Exited],
            Exited => &[],
        }
    }

    pub fn can_transition_to(&self, to: CustodyStage) -> bool {
        self.next_stages().contains(&to)
    }

    pub fn is_terminal(&self) -> bool {
        self.next_stages().is_empty()
    }
}

pub fn can_transition(from: BookingStatus, to: BookingStatus) -> bool {
    from.can_transition_to(to)
}

pub fn next_states(current: BookingStatus) -> &'static [BookingStatus] {
    current.next_states()
}

pub fn can_advance_custody(from: CustodyStage, to: CustodyStage) -> bool {
    from.can_transition_to(to)
}

/// Fails with `InvalidTransition` unless `from -> to` is an edge of the booking graph.
pub fn ensure_booking_transition(from: BookingStatus, to: BookingStatus) -> TerminalResult<()> {
    if from.can_transition_to(to) {
        Ok(())
    } else {
        Err(TerminalError::InvalidTransition { from: from.to_string(), to: to.to_string() })
    }
}

/// Fails with `InvalidTransition` unless `from -> to` is an edge of the custody graph.
pub fn ensure_custody_transition(from: CustodyStage, to: CustodyStage) -> TerminalResult<()> {
    if from.can_transition_to(to) {
        Ok(())
    } else {
        Err(TerminalError::InvalidTransition { from: from.to_string(), to: to.to_string() })
    }
}
