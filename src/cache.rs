use crate::{
    error::FetchError,
    gateway::LedgerGateway,
    types::{
        Address,
        Wei,
    },
};
use serde::{
    Deserialize,
    Serialize,
};

/// Full set of ledger-derived values cached client-side at a point in time.
/// Replaced wholesale on each refresh; never partially merged.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    pub is_open: bool,
    pub entry_fee: Wei,
    pub player_count: u64,
    pub prize_pool: Wei,
    pub manager: Address,
    pub last_winner: Option<Address>,
    pub last_prize: Wei,
    pub threshold: Wei,
}

/// Last-known-good ledger state plus flags derived against the session.
#[derive(Debug, Default)]
pub struct StateCache {
    snapshot: Option<LedgerSnapshot>,
    is_manager: bool,
}

impl StateCache {
    pub fn new() -> Self {
        StateCache::default()
    }

    pub fn snapshot(&self) -> Option<&LedgerSnapshot> {
        self.snapshot.as_ref()
    }

    pub fn is_manager(&self) -> bool {
        self.is_manager
    }

    /// Fetch a fresh snapshot: all reads issued concurrently, published
    /// all-or-nothing. On any individual failure the previous snapshot is
    /// retained untouched and the error is reported to the caller.
    pub async fn refresh<G: LedgerGateway>(
        &mut self,
        gateway: &G,
        account: Option<Address>,
    ) -> Result<&LedgerSnapshot, FetchError> {
        let (is_open, entry_fee, players, prize_pool, manager, last_winner, last_prize, threshold) =
            tokio::try_join!(
                gateway.is_open(),
                gateway.entry_fee(),
                gateway.players(),
                gateway.prize_pool(),
                gateway.manager(),
                gateway.last_winner(),
                gateway.last_prize(),
                gateway.threshold(),
            )?;
        let snapshot = LedgerSnapshot {
            is_open,
            entry_fee,
            player_count: players.len() as u64,
            prize_pool,
            manager,
            last_winner,
            last_prize,
            threshold,
        };
        self.is_manager = account.is_some_and(|account| account == snapshot.manager);
        Ok(&*self.snapshot.insert(snapshot))
    }

    /// Re-derive the manager flag after an account change, against the
    /// unchanged cached manager field.
    pub fn rederive_manager(&mut self, account: Option<Address>) {
        self.is_manager = match (&self.snapshot, account) {
            (Some(snapshot), Some(account)) => snapshot.manager == account,
            _ => false,
        };
    }
}
