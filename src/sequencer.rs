use crate::{
    error::SequencerError,
    session::Session,
    types::RequestKind,
};

/// Explicit admission gate: a single client may have a single mutating
/// request in flight. A second submission while busy is rejected, not queued.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum GateState {
    Idle,
    Busy,
}

#[derive(Debug)]
pub struct AdmissionGate {
    state: GateState,
}

impl AdmissionGate {
    pub fn new() -> Self {
        AdmissionGate {
            state: GateState::Idle,
        }
    }

    pub fn state(&self) -> GateState {
        self.state
    }

    pub fn try_acquire(&mut self) -> Result<(), SequencerError> {
        match self.state {
            GateState::Busy => Err(SequencerError::Busy),
            GateState::Idle => {
                self.state = GateState::Busy;
                Ok(())
            }
        }
    }

    pub fn release(&mut self) {
        self.state = GateState::Idle;
    }
}

impl Default for AdmissionGate {
    fn default() -> Self {
        AdmissionGate::new()
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RequestStatus {
    Submitted,
    Confirmed,
    Failed,
}

#[derive(Clone, Debug)]
pub struct PendingRequest {
    pub kind: RequestKind,
    pub sequence: u64,
    pub status: RequestStatus,
}

/// Handle for one admitted request; carries the sequence number the outgoing
/// call must attach.
#[derive(Clone, Debug)]
pub struct Ticket {
    pub kind: RequestKind,
    pub sequence: u64,
}

/// Outcome of a settled request, reported back to the caller.
#[derive(Clone, Debug)]
pub struct Receipt {
    pub kind: RequestKind,
    pub sequence: u64,
    pub status: RequestStatus,
}

/// Admits one mutating request at a time and tracks it to completion.
#[derive(Debug, Default)]
pub struct Sequencer {
    gate: AdmissionGate,
    pending: Option<PendingRequest>,
}

impl Sequencer {
    pub fn new() -> Self {
        Sequencer::default()
    }

    pub fn pending(&self) -> Option<&PendingRequest> {
        self.pending.as_ref()
    }

    pub fn in_flight(&self) -> bool {
        self.gate.state() == GateState::Busy
    }

    /// Admit a request: rejects with `Busy` before anything touches the
    /// network, otherwise consumes the session's next sequence number
    /// unconditionally and marks the request submitted.
    pub fn admit(
        &mut self,
        kind: RequestKind,
        session: &mut Session,
    ) -> Result<Ticket, SequencerError> {
        self.gate.try_acquire()?;
        let sequence = session.take_sequence();
        tracing::debug!(?kind, sequence, "request admitted");
        self.pending = Some(PendingRequest {
            kind,
            sequence,
            status: RequestStatus::Submitted,
        });
        Ok(Ticket { kind, sequence })
    }

    /// Settle the in-flight request. The pending slot is cleared as soon as
    /// the status leaves `Submitted`; the consumed sequence number stays
    /// consumed either way.
    pub fn settle(&mut self, ticket: &Ticket, confirmed: bool) -> Receipt {
        let status = if confirmed {
            RequestStatus::Confirmed
        } else {
            RequestStatus::Failed
        };
        tracing::debug!(kind = ?ticket.kind, sequence = ticket.sequence, ?status, "request settled");
        self.pending = None;
        self.gate.release();
        Receipt {
            kind: ticket.kind,
            sequence: ticket.sequence,
            status,
        }
    }
}
