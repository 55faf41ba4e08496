use crate::types::Address;

/// Client-held connection state: the active account, the network it lives on,
/// and the sequence counter for outgoing mutating requests.
///
/// The counter is only ever advanced by the sequencer's admission step and is
/// never handed out twice, mirroring the ledger's own anti-replay counter.
#[derive(Clone, Debug)]
pub struct Session {
    pub account: Option<Address>,
    pub chain_id: u64,
    sequence: u64,
}

impl Session {
    pub fn new(chain_id: u64, account: Option<Address>, sequence: u64) -> Self {
        Session {
            account,
            chain_id,
            sequence,
        }
    }

    /// The number the next admitted request will carry.
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Hand out the current number and advance. A consumed number is never
    /// given back, even if the request it was attached to fails.
    pub fn take_sequence(&mut self) -> u64 {
        let sequence = self.sequence;
        self.sequence += 1;
        sequence
    }

    /// Re-seed the counter from the ledger, e.g. after an account change.
    pub fn reset_sequence(&mut self, sequence: u64) {
        self.sequence = sequence;
    }
}
