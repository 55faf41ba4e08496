use crate::ui;
use color_eyre::eyre::{
    Result,
    eyre,
};
use crossterm::event::{
    Event,
    EventStream,
    KeyEventKind,
};
use futures::StreamExt;
use lottery_client::{
    app::AppController,
    gateway::LedgerGateway,
    identity::{
        IdentityProvider,
        LocalIdentity,
    },
    local_ledger::{
        LedgerConfig,
        LocalLedger,
    },
    notify::NoticeFeed,
    types::{
        Address,
        WEI_PER_ETH,
        network_name,
    },
    wallets::UnlockedWallet,
};
use std::time::Duration;
use tokio::{
    sync::broadcast::error::RecvError,
    time,
};
use tracing::{
    info,
    warn,
};

pub const LOCAL_CHAIN_ID: u64 = 31_337;

/// Coarse pull cadence backing up the push events.
const POLL_INTERVAL: Duration = Duration::from_secs(10);

const GENESIS_BALANCE: u128 = 100 * WEI_PER_ETH;

pub struct AppConfig {
    pub ledger: LedgerConfig,
    pub wallet: Option<UnlockedWallet>,
}

fn demo_address(tag: u8) -> Address {
    Address::new([tag; 20])
}

type Controller = AppController<LocalLedger, LocalIdentity, NoticeFeed>;

pub async fn run_app(config: AppConfig) -> Result<()> {
    let owner = demo_address(0x11);
    let player = match config.wallet {
        Some(wallet) => (wallet.name, wallet.address),
        None => (String::from("alice"), demo_address(0x22)),
    };
    info!(manager = %owner, player = %player.1, "starting local ledger");

    let ledger = LocalLedger::new(owner, config.ledger);
    ledger.fund_account(owner, GENESIS_BALANCE);
    ledger.fund_account(player.1, GENESIS_BALANCE);
    let identity = LocalIdentity::new(
        LOCAL_CHAIN_ID,
        vec![(String::from("owner"), owner), player],
    );

    let mut ui_state = ui::UiState::default();
    ui::terminal_enter(&mut ui_state)?;
    let res = run_loop(ledger, identity, &mut ui_state).await;
    ui::terminal_exit()?;
    res
}

async fn run_loop(
    ledger: LocalLedger,
    identity: LocalIdentity,
    ui_state: &mut ui::UiState,
) -> Result<()> {
    let mut input = EventStream::new();

    // a network change tears the controller down and rebuilds it
    'reload: loop {
        let mut ledger_events = ledger.subscribe();
        let mut identity_events = identity.changes();
        let mut controller = AppController::attach(
            ledger.clone(),
            identity.clone(),
            NoticeFeed::new(),
            LOCAL_CHAIN_ID,
        )
        .await
        .map_err(|e| eyre!("initialization failed: {e}"))?;

        let mut ticker = time::interval(Duration::from_secs(1));
        let mut poll = time::interval(POLL_INTERVAL);
        ui::draw(ui_state, &build_view(&mut controller, &identity))?;

        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => { return Ok(()); }
                _ = ticker.tick() => {
                    controller.tick().await;
                }
                _ = poll.tick() => {
                    controller.refresh().await;
                }
                event = ledger_events.recv() => {
                    match event {
                        Ok(event) => controller.handle_ledger_event(event).await,
                        Err(RecvError::Lagged(missed)) => {
                            warn!(missed, "ledger event stream lagged; refreshing");
                            controller.refresh().await;
                        }
                        Err(RecvError::Closed) => {
                            return Err(eyre!("ledger event stream closed"));
                        }
                    }
                }
                event = identity_events.recv() => {
                    match event {
                        Ok(event) => {
                            if controller.handle_identity_event(event).await {
                                continue 'reload;
                            }
                        }
                        Err(RecvError::Lagged(missed)) => {
                            warn!(missed, "identity event stream lagged");
                        }
                        Err(RecvError::Closed) => {
                            return Err(eyre!("identity event stream closed"));
                        }
                    }
                }
                maybe_event = input.next() => {
                    match maybe_event {
                        Some(Ok(Event::Key(key))) if key.kind == KeyEventKind::Press => {
                            let Some(action) = ui::interpret_key(ui_state, key) else {
                                continue;
                            };
                            if dispatch(&mut controller, &identity, action).await {
                                return Ok(());
                            }
                        }
                        Some(Ok(_)) => {} // resize etc.: fall through to redraw
                        Some(Err(e)) => return Err(e.into()),
                        None => return Ok(()),
                    }
                }
            }
            ui::draw(ui_state, &build_view(&mut controller, &identity))?;
        }
    }
}

/// Apply one user action. Returns `true` when the app should quit.
async fn dispatch(
    controller: &mut Controller,
    identity: &LocalIdentity,
    action: ui::UserAction,
) -> bool {
    match action {
        ui::UserAction::Quit => return true,
        ui::UserAction::Redraw => {}
        ui::UserAction::StartLottery => controller.start_lottery().await,
        ui::UserAction::PickWinner => controller.pick_winner().await,
        ui::UserAction::EnterLottery => controller.enter_lottery().await,
        ui::UserAction::Fund(amount) => controller.fund_contract(amount).await,
        ui::UserAction::SwitchAccount(index) => identity.switch_to(index),
        ui::UserAction::Refresh => controller.refresh().await,
        ui::UserAction::DismissWinner => controller.sink.dismiss_winner(),
    }
    false
}

fn build_view(controller: &mut Controller, identity: &LocalIdentity) -> ui::AppView {
    ui::AppView {
        network: network_name(controller.session.chain_id),
        account: controller.session.account,
        account_label: identity.active_label(),
        accounts: identity
            .accounts()
            .iter()
            .map(|(label, _)| label.clone())
            .collect(),
        is_manager: controller.cache.is_manager(),
        snapshot: controller.cache.snapshot().cloned(),
        countdown: controller.countdown.phase().display(),
        pending: controller.sequencer.pending().cloned(),
        notices: controller.sink.visible(),
        winner: controller.sink.winner(),
    }
}
