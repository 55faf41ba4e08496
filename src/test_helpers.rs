//! In-process doubles and a ready-made context for exercising the client
//! core without a live wallet or ledger.

use crate::{
    app::AppController,
    error::GatewayError,
    identity::LocalIdentity,
    local_ledger::{
        LedgerConfig,
        LocalLedger,
    },
    notify::{
        NotificationSink,
        Severity,
    },
    types::{
        Address,
        LedgerEvent,
        WEI_PER_ETH,
        Wei,
    },
};
use std::{
    collections::VecDeque,
    sync::{
        Arc,
        Mutex,
        atomic::{
            AtomicBool,
            AtomicUsize,
            Ordering,
        },
    },
    time::Duration,
};
use tokio::sync::broadcast;

pub const LOCAL_CHAIN_ID: u64 = 31_337;

pub fn addr(byte: u8) -> Address {
    Address::new([byte; 20])
}

/// Notification sink that records every call for assertions.
#[derive(Default)]
pub struct RecordingSink {
    pub notices: Vec<(String, Severity)>,
    pub winner_presentations: Vec<Wei>,
}

impl RecordingSink {
    pub fn new() -> Self {
        RecordingSink::default()
    }

    pub fn contains(&self, fragment: &str) -> bool {
        self.notices.iter().any(|(m, _)| m.contains(fragment))
    }
}

impl NotificationSink for RecordingSink {
    fn notify(&mut self, message: String, severity: Severity) {
        self.notices.push((message, severity));
    }

    fn present_winner(&mut self, amount: Wei) {
        self.winner_presentations.push(amount);
    }
}

/// Gateway wrapper that counts every network call made through it.
#[derive(Clone)]
pub struct CountingGateway<G> {
    pub inner: G,
    calls: Arc<AtomicUsize>,
}

impl<G> CountingGateway<G> {
    pub fn new(inner: G) -> Self {
        CountingGateway {
            inner,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn count(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

impl<G: crate::gateway::LedgerGateway> crate::gateway::LedgerGateway
    for CountingGateway<G>
{
    async fn is_open(&self) -> Result<bool, GatewayError> {
        self.count();
        self.inner.is_open().await
    }

    async fn entry_fee(&self) -> Result<Wei, GatewayError> {
        self.count();
        self.inner.entry_fee().await
    }

    async fn players(&self) -> Result<Vec<Address>, GatewayError> {
        self.count();
        self.inner.players().await
    }

    async fn prize_pool(&self) -> Result<Wei, GatewayError> {
        self.count();
        self.inner.prize_pool().await
    }

    async fn manager(&self) -> Result<Address, GatewayError> {
        self.count();
        self.inner.manager().await
    }

    async fn last_winner(&self) -> Result<Option<Address>, GatewayError> {
        self.count();
        self.inner.last_winner().await
    }

    async fn last_prize(&self) -> Result<Wei, GatewayError> {
        self.count();
        self.inner.last_prize().await
    }

    async fn threshold(&self) -> Result<Wei, GatewayError> {
        self.count();
        self.inner.threshold().await
    }

    async fn time_until_draw(&self) -> Result<u64, GatewayError> {
        self.count();
        self.inner.time_until_draw().await
    }

    async fn next_sequence(&self, account: Address) -> Result<u64, GatewayError> {
        self.count();
        self.inner.next_sequence(account).await
    }

    async fn start_round(&self, from: Address, sequence: u64) -> Result<(), GatewayError> {
        self.count();
        self.inner.start_round(from, sequence).await
    }

    async fn resolve_draw(
        &self,
        from: Address,
        sequence: u64,
    ) -> Result<(), GatewayError> {
        self.count();
        self.inner.resolve_draw(from, sequence).await
    }

    async fn enter(
        &self,
        from: Address,
        sequence: u64,
        value: Wei,
    ) -> Result<(), GatewayError> {
        self.count();
        self.inner.enter(from, sequence, value).await
    }

    async fn fund(
        &self,
        from: Address,
        sequence: u64,
        value: Wei,
    ) -> Result<(), GatewayError> {
        self.count();
        self.inner.fund(from, sequence, value).await
    }

    fn subscribe(&self) -> broadcast::Receiver<LedgerEvent> {
        self.inner.subscribe()
    }
}

/// Gateway wrapper that can be told to fail one read of the refresh batch,
/// for exercising the all-or-nothing snapshot rule.
#[derive(Clone)]
pub struct FlakyGateway<G> {
    pub inner: G,
    fail_reads: Arc<AtomicBool>,
}

impl<G> FlakyGateway<G> {
    pub fn new(inner: G) -> Self {
        FlakyGateway {
            inner,
            fail_reads: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn set_failing(&self, failing: bool) {
        self.fail_reads.store(failing, Ordering::SeqCst);
    }

    fn failing(&self) -> bool {
        self.fail_reads.load(Ordering::SeqCst)
    }
}

impl<G: crate::gateway::LedgerGateway> crate::gateway::LedgerGateway for FlakyGateway<G> {
    async fn is_open(&self) -> Result<bool, GatewayError> {
        self.inner.is_open().await
    }

    async fn entry_fee(&self) -> Result<Wei, GatewayError> {
        self.inner.entry_fee().await
    }

    async fn players(&self) -> Result<Vec<Address>, GatewayError> {
        self.inner.players().await
    }

    async fn prize_pool(&self) -> Result<Wei, GatewayError> {
        if self.failing() {
            return Err(GatewayError::Connection(String::from(
                "prize pool read timed out",
            )));
        }
        self.inner.prize_pool().await
    }

    async fn manager(&self) -> Result<Address, GatewayError> {
        self.inner.manager().await
    }

    async fn last_winner(&self) -> Result<Option<Address>, GatewayError> {
        self.inner.last_winner().await
    }

    async fn last_prize(&self) -> Result<Wei, GatewayError> {
        self.inner.last_prize().await
    }

    async fn threshold(&self) -> Result<Wei, GatewayError> {
        self.inner.threshold().await
    }

    async fn time_until_draw(&self) -> Result<u64, GatewayError> {
        self.inner.time_until_draw().await
    }

    async fn next_sequence(&self, account: Address) -> Result<u64, GatewayError> {
        self.inner.next_sequence(account).await
    }

    async fn start_round(&self, from: Address, sequence: u64) -> Result<(), GatewayError> {
        self.inner.start_round(from, sequence).await
    }

    async fn resolve_draw(
        &self,
        from: Address,
        sequence: u64,
    ) -> Result<(), GatewayError> {
        self.inner.resolve_draw(from, sequence).await
    }

    async fn enter(
        &self,
        from: Address,
        sequence: u64,
        value: Wei,
    ) -> Result<(), GatewayError> {
        self.inner.enter(from, sequence, value).await
    }

    async fn fund(
        &self,
        from: Address,
        sequence: u64,
        value: Wei,
    ) -> Result<(), GatewayError> {
        self.inner.fund(from, sequence, value).await
    }

    fn subscribe(&self) -> broadcast::Receiver<LedgerEvent> {
        self.inner.subscribe()
    }
}

/// Gateway double that records the sequence number of every mutating call and
/// answers each one with the next scripted outcome (confirm or reject).
#[derive(Clone)]
pub struct ScriptedGateway {
    outcomes: Arc<Mutex<VecDeque<Result<(), GatewayError>>>>,
    recorded: Arc<Mutex<Vec<u64>>>,
    events: broadcast::Sender<LedgerEvent>,
}

impl ScriptedGateway {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(16);
        ScriptedGateway {
            outcomes: Arc::new(Mutex::new(VecDeque::new())),
            recorded: Arc::new(Mutex::new(Vec::new())),
            events,
        }
    }

    pub fn script(&self, outcome: Result<(), GatewayError>) {
        self.outcomes.lock().unwrap().push_back(outcome);
    }

    pub fn recorded_sequences(&self) -> Vec<u64> {
        self.recorded.lock().unwrap().clone()
    }

    fn submit(&self, sequence: u64) -> Result<(), GatewayError> {
        self.recorded.lock().unwrap().push(sequence);
        self.outcomes.lock().unwrap().pop_front().unwrap_or(Ok(()))
    }
}

impl Default for ScriptedGateway {
    fn default() -> Self {
        ScriptedGateway::new()
    }
}

impl crate::gateway::LedgerGateway for ScriptedGateway {
    async fn is_open(&self) -> Result<bool, GatewayError> {
        Ok(true)
    }

    async fn entry_fee(&self) -> Result<Wei, GatewayError> {
        Ok(WEI_PER_ETH / 100)
    }

    async fn players(&self) -> Result<Vec<Address>, GatewayError> {
        Ok(Vec::new())
    }

    async fn prize_pool(&self) -> Result<Wei, GatewayError> {
        Ok(0)
    }

    async fn manager(&self) -> Result<Address, GatewayError> {
        Ok(addr(1))
    }

    async fn last_winner(&self) -> Result<Option<Address>, GatewayError> {
        Ok(None)
    }

    async fn last_prize(&self) -> Result<Wei, GatewayError> {
        Ok(0)
    }

    async fn threshold(&self) -> Result<Wei, GatewayError> {
        Ok(WEI_PER_ETH / 20)
    }

    async fn time_until_draw(&self) -> Result<u64, GatewayError> {
        Ok(0)
    }

    async fn next_sequence(&self, _account: Address) -> Result<u64, GatewayError> {
        Ok(0)
    }

    async fn start_round(&self, _from: Address, sequence: u64) -> Result<(), GatewayError> {
        self.submit(sequence)
    }

    async fn resolve_draw(
        &self,
        _from: Address,
        sequence: u64,
    ) -> Result<(), GatewayError> {
        self.submit(sequence)
    }

    async fn enter(
        &self,
        _from: Address,
        sequence: u64,
        _value: Wei,
    ) -> Result<(), GatewayError> {
        self.submit(sequence)
    }

    async fn fund(
        &self,
        _from: Address,
        sequence: u64,
        _value: Wei,
    ) -> Result<(), GatewayError> {
        self.submit(sequence)
    }

    fn subscribe(&self) -> broadcast::Receiver<LedgerEvent> {
        self.events.subscribe()
    }
}

/// Local ledger, two funded accounts, and constructors for controllers bound
/// to either of them.
pub struct TestContext {
    pub ledger: LocalLedger,
    pub owner: Address,
    pub alice: Address,
}

impl TestContext {
    pub fn new() -> Self {
        Self::with_config(LedgerConfig::default())
    }

    /// A config whose countdown elapses immediately, for end-to-end draws.
    pub fn instant_draw() -> Self {
        Self::with_config(LedgerConfig {
            draw_delay: Duration::ZERO,
            ..LedgerConfig::default()
        })
    }

    pub fn with_config(config: LedgerConfig) -> Self {
        let owner = addr(1);
        let alice = addr(2);
        let ledger = LocalLedger::new(owner, config);
        ledger.fund_account(owner, 10 * WEI_PER_ETH);
        ledger.fund_account(alice, 10 * WEI_PER_ETH);
        TestContext {
            ledger,
            owner,
            alice,
        }
    }

    pub fn identity_for(&self, account: Address) -> LocalIdentity {
        LocalIdentity::new(LOCAL_CHAIN_ID, vec![(String::from("test"), account)])
    }

    pub async fn controller_for(
        &self,
        account: Address,
    ) -> AppController<LocalLedger, LocalIdentity, RecordingSink> {
        AppController::attach(
            self.ledger.clone(),
            self.identity_for(account),
            RecordingSink::new(),
            LOCAL_CHAIN_ID,
        )
        .await
        .expect("attach against local ledger")
    }
}

impl Default for TestContext {
    fn default() -> Self {
        TestContext::new()
    }
}
