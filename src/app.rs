use crate::{
    cache::StateCache,
    countdown::{
        CountdownReconciler,
        TickOutcome,
    },
    error::{
        ConnectionError,
        GatewayError,
        SequencerError,
    },
    gateway::LedgerGateway,
    identity::{
        IdentityEvent,
        IdentityProvider,
    },
    notify::{
        NotificationSink,
        Severity,
    },
    sequencer::{
        Receipt,
        Sequencer,
    },
    session::Session,
    types::{
        LedgerEvent,
        RequestKind,
        Wei,
        format_eth,
    },
};
use tracing::{
    error,
    info,
    warn,
};

/// Orchestrates the client core: owns the session, the state cache, the
/// transaction sequencer and the countdown reconciler, and converts ledger
/// and identity events into cache refreshes and user-visible notifications.
///
/// Constructed once at startup with its collaborators injected, so tests can
/// assemble it from in-process doubles.
pub struct AppController<G, P, N> {
    pub gateway: G,
    pub identity: P,
    pub sink: N,
    pub session: Session,
    pub cache: StateCache,
    pub sequencer: Sequencer,
    pub countdown: CountdownReconciler,
}

impl<G, P, N> AppController<G, P, N>
where
    G: LedgerGateway,
    P: IdentityProvider,
    N: NotificationSink,
{
    /// Connect the client: verify the network, obtain the active account,
    /// seed the sequence counter, and perform the initial load. Any failure
    /// here is fatal; no automatic recovery is attempted.
    pub async fn attach(
        gateway: G,
        identity: P,
        mut sink: N,
        expected_chain: u64,
    ) -> Result<Self, ConnectionError> {
        let chain_id = identity.network();
        if chain_id != expected_chain {
            return Err(ConnectionError::WrongNetwork {
                expected: expected_chain,
                actual: chain_id,
            });
        }
        let account = identity.request_access().await?;
        let sequence = gateway.next_sequence(account).await?;
        info!(%account, chain_id, sequence, "wallet connected");
        sink.notify(
            String::from("Wallet connected successfully"),
            Severity::Success,
        );

        let mut controller = AppController {
            gateway,
            identity,
            sink,
            session: Session::new(chain_id, Some(account), sequence),
            cache: StateCache::new(),
            sequencer: Sequencer::new(),
            countdown: CountdownReconciler::new(),
        };
        controller
            .cache
            .refresh(&controller.gateway, controller.session.account)
            .await
            .map_err(|e| ConnectionError::Ledger(e.0))?;
        controller.reconcile_countdown(true).await;
        Ok(controller)
    }

    /// Fetch a fresh snapshot and re-evaluate the countdown. A failed refresh
    /// degrades to keeping the last snapshot; it never propagates.
    pub async fn refresh(&mut self) {
        match self
            .cache
            .refresh(&self.gateway, self.session.account)
            .await
        {
            Ok(_) => {}
            Err(e) => {
                warn!(error = %e, "refresh failed; keeping last snapshot");
                return;
            }
        }
        self.reconcile_countdown(false).await;
    }

    /// Re-evaluate the countdown against the cached snapshot, fetching the
    /// authoritative time-to-draw only when a draw can actually be scheduled.
    async fn reconcile_countdown(&mut self, force: bool) {
        let Some(snapshot) = self.cache.snapshot() else {
            return;
        };
        let authoritative = if snapshot.is_open && snapshot.prize_pool >= snapshot.threshold
        {
            match self.gateway.time_until_draw().await {
                Ok(time) => Some(time),
                Err(e) => {
                    warn!(error = %e, "failed to read time until draw");
                    None
                }
            }
        } else {
            None
        };
        if force {
            self.countdown.force_reseed(snapshot, authoritative);
        } else {
            self.countdown.reconcile(snapshot, authoritative);
        }
    }

    /// One second of local time: advance the countdown, and resolve the draw
    /// when the clock fires.
    pub async fn tick(&mut self) {
        let outcome = self.countdown.tick(self.sequencer.in_flight());
        if outcome == TickOutcome::TriggerDraw {
            info!("local countdown reached zero; resolving draw");
            let _ = self.submit(RequestKind::PickWinner, 0).await;
        }
    }

    pub async fn start_lottery(&mut self) {
        let _ = self.submit(RequestKind::Start, 0).await;
    }

    pub async fn pick_winner(&mut self) {
        let _ = self.submit(RequestKind::PickWinner, 0).await;
    }

    /// Enter with the cached entry fee attached as payment.
    pub async fn enter_lottery(&mut self) {
        let Some(fee) = self.cache.snapshot().map(|s| s.entry_fee) else {
            self.sink.notify(
                String::from("Lottery information not loaded yet"),
                Severity::Error,
            );
            return;
        };
        let _ = self.submit(RequestKind::Enter, fee).await;
    }

    pub async fn fund_contract(&mut self, amount: Wei) {
        if amount == 0 {
            self.sink.notify(
                String::from("Please enter a valid funding amount"),
                Severity::Error,
            );
            return;
        }
        let _ = self.submit(RequestKind::Fund, amount).await;
    }

    /// Single path for all mutating requests: admission gate, sequence number
    /// attachment, delegation to the gateway, settlement, and user feedback.
    pub async fn submit(
        &mut self,
        kind: RequestKind,
        value: Wei,
    ) -> Result<Receipt, SequencerError> {
        let Some(account) = self.session.account else {
            self.sink
                .notify(String::from("No account connected"), Severity::Error);
            return Err(SequencerError::NoAccount);
        };
        let ticket = match self.sequencer.admit(kind, &mut self.session) {
            Ok(ticket) => ticket,
            Err(e) => {
                self.sink.notify(
                    String::from("Please wait for the previous transaction to complete"),
                    Severity::Warning,
                );
                return Err(e);
            }
        };
        self.sink
            .notify(kind.progress_message().to_owned(), Severity::Info);

        let outcome = match kind {
            RequestKind::Start => self.gateway.start_round(account, ticket.sequence).await,
            RequestKind::PickWinner => {
                self.gateway.resolve_draw(account, ticket.sequence).await
            }
            RequestKind::Enter => {
                self.gateway.enter(account, ticket.sequence, value).await
            }
            RequestKind::Fund => self.gateway.fund(account, ticket.sequence, value).await,
        };

        let receipt = self.sequencer.settle(&ticket, outcome.is_ok());
        match outcome {
            Ok(()) => {
                match kind {
                    RequestKind::Start => self.sink.notify(
                        String::from("Lottery started successfully!"),
                        Severity::Success,
                    ),
                    RequestKind::Fund => self.sink.notify(
                        format!(
                            "Successfully funded the contract with {} ETH!",
                            format_eth(value)
                        ),
                        Severity::Success,
                    ),
                    // enter and pick-winner feedback arrives via push events
                    RequestKind::Enter | RequestKind::PickWinner => {}
                }
                self.refresh().await;
                Ok(receipt)
            }
            Err(e) => {
                error!(?kind, sequence = ticket.sequence, error = %e, "request failed");
                self.sink.notify(failure_message(kind, &e), Severity::Error);
                Err(SequencerError::Gateway(e))
            }
        }
    }

    /// React to a ledger push event: refresh the cache, then surface whatever
    /// the event means to this account.
    pub async fn handle_ledger_event(&mut self, event: LedgerEvent) {
        use LedgerEvent::*;
        tracing::debug!(?event, "ledger event");
        self.refresh().await;
        match event {
            PlayerEntered { player, amount: _ } => {
                if Some(player) == self.session.account {
                    self.sink.notify(
                        String::from("You have successfully entered the lottery!"),
                        Severity::Success,
                    );
                }
            }
            CountdownStarted { seconds_until_draw } => {
                if let Some(snapshot) = self.cache.snapshot() {
                    self.countdown
                        .force_reseed(snapshot, Some(seconds_until_draw));
                }
                self.sink.notify(
                    String::from("Draw countdown has started!"),
                    Severity::Info,
                );
            }
            RoundStarted => {
                self.reconcile_countdown(true).await;
                self.sink.notify(
                    String::from("A new lottery round has started!"),
                    Severity::Info,
                );
            }
            RoundEnded { winner, amount } => {
                self.reconcile_countdown(true).await;
                if Some(winner) == self.session.account {
                    self.sink.present_winner(amount);
                } else {
                    self.sink.notify(
                        format!(
                            "Lottery ended. Winner: {} won {} ETH",
                            winner.short(),
                            format_eth(amount)
                        ),
                        Severity::Info,
                    );
                }
            }
        }
    }

    /// React to an identity change. Returns `true` when the client must be
    /// torn down and rebuilt (network change).
    pub async fn handle_identity_event(&mut self, event: IdentityEvent) -> bool {
        match event {
            IdentityEvent::AccountChanged(account) => {
                info!(?account, "account changed");
                self.session.account = account;
                if let Some(account) = account {
                    match self.gateway.next_sequence(account).await {
                        Ok(sequence) => self.session.reset_sequence(sequence),
                        Err(e) => {
                            warn!(error = %e, "failed to re-seed sequence counter")
                        }
                    }
                }
                self.cache.rederive_manager(account);
                self.refresh().await;
                false
            }
            IdentityEvent::NetworkChanged(chain_id) => {
                info!(chain_id, "network changed; client reload required");
                true
            }
        }
    }
}

/// Map a gateway failure to the message shown to the user, keeping the
/// action-specific prefix for unclassified rejections.
fn failure_message(kind: RequestKind, error: &GatewayError) -> String {
    match error {
        GatewayError::DuplicateSequence(_) => {
            String::from("Transaction already pending. Please wait for it to complete")
        }
        GatewayError::CapacityExceeded => String::from(
            "Too many pending transactions. Please wait a moment and try again",
        ),
        GatewayError::InsufficientFunds => {
            String::from("Insufficient funds in your wallet")
        }
        GatewayError::Rejected(_) | GatewayError::Connection(_) => {
            kind.failure_prefix().to_owned()
        }
    }
}
