use crate::{
    error::GatewayError,
    gateway::LedgerGateway,
    types::{
        Address,
        LedgerEvent,
        Wei,
        format_eth,
    },
};
use rand::Rng;
use std::{
    cmp::Ordering,
    collections::HashMap,
    sync::{
        Arc,
        Mutex,
    },
    time::{
        Duration,
        Instant,
    },
};
use tokio::sync::broadcast;

const EVENT_CHANNEL_CAPACITY: usize = 64;

#[derive(Clone, Debug)]
pub struct LedgerConfig {
    pub entry_fee: Wei,
    pub threshold: Wei,
    pub draw_delay: Duration,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        LedgerConfig {
            entry_fee: crate::types::WEI_PER_ETH / 100,
            threshold: crate::types::WEI_PER_ETH / 20,
            draw_delay: Duration::from_secs(120),
        }
    }
}

#[derive(Debug)]
struct LedgerState {
    open: bool,
    players: Vec<Address>,
    prize_pool: Wei,
    manager: Address,
    last_winner: Option<Address>,
    last_prize: Wei,
    draw_deadline: Option<Instant>,
    expected_sequence: HashMap<Address, u64>,
    balances: HashMap<Address, Wei>,
}

/// In-process lottery ledger.
///
/// Implements the full gateway surface against shared in-memory state so the
/// client can run and be tested without a live node. Clones share state.
#[derive(Clone)]
pub struct LocalLedger {
    state: Arc<Mutex<LedgerState>>,
    events: broadcast::Sender<LedgerEvent>,
    config: LedgerConfig,
}

impl LocalLedger {
    pub fn new(manager: Address, config: LedgerConfig) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let state = LedgerState {
            open: false,
            players: Vec::new(),
            prize_pool: 0,
            manager,
            last_winner: None,
            last_prize: 0,
            draw_deadline: None,
            expected_sequence: HashMap::new(),
            balances: HashMap::new(),
        };
        LocalLedger {
            state: Arc::new(Mutex::new(state)),
            events,
            config,
        }
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// Credit an account at genesis so it can pay fees and fund the pool.
    pub fn fund_account(&self, account: Address, amount: Wei) {
        let mut state = self.state.lock().unwrap();
        *state.balances.entry(account).or_insert(0) += amount;
    }

    pub fn balance_of(&self, account: Address) -> Wei {
        let state = self.state.lock().unwrap();
        state.balances.get(&account).copied().unwrap_or(0)
    }

    fn emit(&self, event: LedgerEvent) {
        let _ = self.events.send(event);
    }

    fn consume_sequence(
        state: &mut LedgerState,
        from: Address,
        sequence: u64,
    ) -> Result<(), GatewayError> {
        let expected = state.expected_sequence.entry(from).or_insert(0);
        match sequence.cmp(expected) {
            Ordering::Less => Err(GatewayError::DuplicateSequence(sequence)),
            Ordering::Greater => Err(GatewayError::CapacityExceeded),
            Ordering::Equal => {
                *expected += 1;
                Ok(())
            }
        }
    }

    fn debit(
        state: &mut LedgerState,
        from: Address,
        value: Wei,
    ) -> Result<(), GatewayError> {
        let balance = state.balances.entry(from).or_insert(0);
        if *balance < value {
            return Err(GatewayError::InsufficientFunds);
        }
        *balance -= value;
        Ok(())
    }

    /// Schedule the draw when an open round's pool first meets the threshold.
    fn maybe_schedule_draw(&self, state: &mut LedgerState) -> Option<LedgerEvent> {
        if !state.open
            || state.draw_deadline.is_some()
            || state.prize_pool < self.config.threshold
        {
            return None;
        }
        state.draw_deadline = Some(Instant::now() + self.config.draw_delay);
        Some(LedgerEvent::CountdownStarted {
            seconds_until_draw: self.config.draw_delay.as_secs(),
        })
    }
}

impl LedgerGateway for LocalLedger {
    async fn is_open(&self) -> Result<bool, GatewayError> {
        Ok(self.state.lock().unwrap().open)
    }

    async fn entry_fee(&self) -> Result<Wei, GatewayError> {
        Ok(self.config.entry_fee)
    }

    async fn players(&self) -> Result<Vec<Address>, GatewayError> {
        Ok(self.state.lock().unwrap().players.clone())
    }

    async fn prize_pool(&self) -> Result<Wei, GatewayError> {
        Ok(self.state.lock().unwrap().prize_pool)
    }

    async fn manager(&self) -> Result<Address, GatewayError> {
        Ok(self.state.lock().unwrap().manager)
    }

    async fn last_winner(&self) -> Result<Option<Address>, GatewayError> {
        Ok(self.state.lock().unwrap().last_winner)
    }

    async fn last_prize(&self) -> Result<Wei, GatewayError> {
        Ok(self.state.lock().unwrap().last_prize)
    }

    async fn threshold(&self) -> Result<Wei, GatewayError> {
        Ok(self.config.threshold)
    }

    async fn time_until_draw(&self) -> Result<u64, GatewayError> {
        let state = self.state.lock().unwrap();
        let remaining = state
            .draw_deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
            .unwrap_or(Duration::ZERO);
        Ok(remaining.as_secs())
    }

    async fn next_sequence(&self, account: Address) -> Result<u64, GatewayError> {
        let state = self.state.lock().unwrap();
        Ok(state.expected_sequence.get(&account).copied().unwrap_or(0))
    }

    async fn start_round(&self, from: Address, sequence: u64) -> Result<(), GatewayError> {
        let scheduled = {
            let mut state = self.state.lock().unwrap();
            Self::consume_sequence(&mut state, from, sequence)?;
            if from != state.manager {
                return Err(GatewayError::Rejected(String::from(
                    "only the manager can start a round",
                )));
            }
            if state.open {
                return Err(GatewayError::Rejected(String::from(
                    "a round is already open",
                )));
            }
            state.open = true;
            self.maybe_schedule_draw(&mut state)
        };
        self.emit(LedgerEvent::RoundStarted);
        if let Some(event) = scheduled {
            self.emit(event);
        }
        Ok(())
    }

    async fn resolve_draw(&self, from: Address, sequence: u64) -> Result<(), GatewayError> {
        let (winner, prize) = {
            let mut state = self.state.lock().unwrap();
            Self::consume_sequence(&mut state, from, sequence)?;
            if !state.open {
                return Err(GatewayError::Rejected(String::from("lottery is not open")));
            }
            if state.players.is_empty() {
                return Err(GatewayError::Rejected(String::from(
                    "no players have entered",
                )));
            }
            if state.prize_pool < self.config.threshold {
                return Err(GatewayError::Rejected(String::from(
                    "prize pool has not reached the threshold",
                )));
            }
            let ready = state
                .draw_deadline
                .is_some_and(|deadline| Instant::now() >= deadline);
            if !ready {
                return Err(GatewayError::Rejected(String::from(
                    "the draw countdown has not finished",
                )));
            }
            let index = rand::rng().random_range(0..state.players.len());
            let winner = state.players[index];
            let prize = state.prize_pool;
            *state.balances.entry(winner).or_insert(0) += prize;
            state.last_winner = Some(winner);
            state.last_prize = prize;
            state.open = false;
            state.players.clear();
            state.prize_pool = 0;
            state.draw_deadline = None;
            (winner, prize)
        };
        self.emit(LedgerEvent::RoundEnded {
            winner,
            amount: prize,
        });
        Ok(())
    }

    async fn enter(
        &self,
        from: Address,
        sequence: u64,
        value: Wei,
    ) -> Result<(), GatewayError> {
        let scheduled = {
            let mut state = self.state.lock().unwrap();
            Self::consume_sequence(&mut state, from, sequence)?;
            if !state.open {
                return Err(GatewayError::Rejected(String::from("lottery is not open")));
            }
            if value != self.config.entry_fee {
                return Err(GatewayError::Rejected(format!(
                    "entry fee is {} ETH",
                    format_eth(self.config.entry_fee)
                )));
            }
            Self::debit(&mut state, from, value)?;
            state.players.push(from);
            state.prize_pool += value;
            self.maybe_schedule_draw(&mut state)
        };
        self.emit(LedgerEvent::PlayerEntered {
            player: from,
            amount: value,
        });
        if let Some(event) = scheduled {
            self.emit(event);
        }
        Ok(())
    }

    async fn fund(
        &self,
        from: Address,
        sequence: u64,
        value: Wei,
    ) -> Result<(), GatewayError> {
        let scheduled = {
            let mut state = self.state.lock().unwrap();
            Self::consume_sequence(&mut state, from, sequence)?;
            if value == 0 {
                return Err(GatewayError::Rejected(String::from(
                    "funding amount must be positive",
                )));
            }
            Self::debit(&mut state, from, value)?;
            state.prize_pool += value;
            self.maybe_schedule_draw(&mut state)
        };
        if let Some(event) = scheduled {
            self.emit(event);
        }
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<LedgerEvent> {
        self.events.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(byte: u8) -> Address {
        Address::new([byte; 20])
    }

    fn open_ledger() -> (LocalLedger, Address, Address) {
        let manager = addr(1);
        let player = addr(2);
        let ledger = LocalLedger::new(manager, LedgerConfig::default());
        ledger.fund_account(player, crate::types::WEI_PER_ETH);
        (ledger, manager, player)
    }

    #[tokio::test]
    async fn start_round__rejects_non_manager() {
        let (ledger, _manager, player) = open_ledger();
        let result = ledger.start_round(player, 0).await;
        assert!(matches!(result, Err(GatewayError::Rejected(_))));
    }

    #[tokio::test]
    async fn mutations__consume_sequence_numbers_even_on_revert() {
        let (ledger, _manager, player) = open_ledger();
        // closed lottery: the call reverts but the number is spent
        let result = ledger.enter(player, 0, ledger.config().entry_fee).await;
        assert!(matches!(result, Err(GatewayError::Rejected(_))));
        assert_eq!(ledger.next_sequence(player).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn mutations__reject_reused_and_skipped_sequence_numbers() {
        let (ledger, manager, _player) = open_ledger();
        ledger.start_round(manager, 0).await.unwrap();
        assert!(matches!(
            ledger.start_round(manager, 0).await,
            Err(GatewayError::DuplicateSequence(0))
        ));
        assert!(matches!(
            ledger.start_round(manager, 5).await,
            Err(GatewayError::CapacityExceeded)
        ));
    }

    #[tokio::test]
    async fn enter__requires_exact_fee_and_open_round() {
        let (ledger, manager, player) = open_ledger();
        ledger.start_round(manager, 0).await.unwrap();
        let fee = ledger.config().entry_fee;
        assert!(matches!(
            ledger.enter(player, 0, fee + 1).await,
            Err(GatewayError::Rejected(_))
        ));
        ledger.enter(player, 1, fee).await.unwrap();
        assert_eq!(ledger.players().await.unwrap(), vec![player]);
        assert_eq!(ledger.prize_pool().await.unwrap(), fee);
    }

    #[tokio::test]
    async fn enter__without_balance_is_insufficient_funds() {
        let (ledger, manager, _player) = open_ledger();
        ledger.start_round(manager, 0).await.unwrap();
        let broke = addr(9);
        let result = ledger.enter(broke, 0, ledger.config().entry_fee).await;
        assert!(matches!(result, Err(GatewayError::InsufficientFunds)));
    }

    #[tokio::test]
    async fn threshold_crossing__schedules_the_draw_once() {
        let (ledger, manager, player) = open_ledger();
        let mut events = ledger.subscribe();
        ledger.start_round(manager, 0).await.unwrap();
        ledger.fund_account(manager, crate::types::WEI_PER_ETH);
        ledger
            .fund(manager, 1, ledger.config().threshold)
            .await
            .unwrap();
        // drain: RoundStarted, then CountdownStarted
        assert_eq!(events.recv().await.unwrap(), LedgerEvent::RoundStarted);
        assert!(matches!(
            events.recv().await.unwrap(),
            LedgerEvent::CountdownStarted { .. }
        ));
        // a later entry must not reschedule
        ledger
            .enter(player, 0, ledger.config().entry_fee)
            .await
            .unwrap();
        assert!(matches!(
            events.recv().await.unwrap(),
            LedgerEvent::PlayerEntered { .. }
        ));
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn resolve_draw__pays_the_pool_to_a_player_and_closes() {
        let manager = addr(1);
        let player = addr(2);
        let config = LedgerConfig {
            draw_delay: Duration::ZERO,
            ..LedgerConfig::default()
        };
        let ledger = LocalLedger::new(manager, config);
        ledger.fund_account(manager, crate::types::WEI_PER_ETH);
        ledger.fund_account(player, crate::types::WEI_PER_ETH);
        ledger.start_round(manager, 0).await.unwrap();
        ledger
            .fund(manager, 1, ledger.config().threshold)
            .await
            .unwrap();
        ledger
            .enter(player, 0, ledger.config().entry_fee)
            .await
            .unwrap();
        let pool = ledger.prize_pool().await.unwrap();

        ledger.resolve_draw(manager, 2).await.unwrap();

        assert!(!ledger.is_open().await.unwrap());
        assert_eq!(ledger.prize_pool().await.unwrap(), 0);
        assert_eq!(ledger.players().await.unwrap().len(), 0);
        assert_eq!(ledger.last_winner().await.unwrap(), Some(player));
        assert_eq!(ledger.last_prize().await.unwrap(), pool);
    }
}
