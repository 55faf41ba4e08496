use lottery_client::{
    gateway::LedgerGateway,
    notify::Severity,
    test_helpers::{
        TestContext,
        addr,
    },
    types::{
        LedgerEvent,
        WEI_PER_ETH,
        format_eth,
    },
};

#[tokio::test]
async fn round_ended__local_winner_gets_the_presentation_and_no_notice() {
    let ctx = TestContext::new();
    let mut controller = ctx.controller_for(ctx.alice).await;
    let prize = WEI_PER_ETH / 10;

    controller
        .handle_ledger_event(LedgerEvent::RoundEnded {
            winner: ctx.alice,
            amount: prize,
        })
        .await;

    assert_eq!(controller.sink.winner_presentations, vec![prize]);
    assert!(!controller.sink.contains("Lottery ended"));
}

#[tokio::test]
async fn round_ended__other_winner_gets_an_info_notice_naming_them() {
    let ctx = TestContext::new();
    let mut controller = ctx.controller_for(ctx.alice).await;
    let prize = WEI_PER_ETH / 10;

    controller
        .handle_ledger_event(LedgerEvent::RoundEnded {
            winner: ctx.owner,
            amount: prize,
        })
        .await;

    assert!(controller.sink.winner_presentations.is_empty());
    let (message, severity) = controller
        .sink
        .notices
        .iter()
        .find(|(m, _)| m.contains("Lottery ended"))
        .expect("round-ended notice");
    assert_eq!(*severity, Severity::Info);
    assert!(message.contains(&ctx.owner.short()));
    assert!(message.contains(&format_eth(prize)));
}

#[tokio::test]
async fn player_entered__own_entry_gets_a_personal_success_notice() {
    let ctx = TestContext::new();
    let mut controller = ctx.controller_for(ctx.alice).await;

    controller
        .handle_ledger_event(LedgerEvent::PlayerEntered {
            player: ctx.alice,
            amount: ctx.ledger.config().entry_fee,
        })
        .await;

    assert!(
        controller
            .sink
            .notices
            .iter()
            .any(|(m, s)| m.contains("successfully entered")
                && *s == Severity::Success)
    );
}

#[tokio::test]
async fn player_entered__someone_else_is_silent_for_this_account() {
    let ctx = TestContext::new();
    let mut controller = ctx.controller_for(ctx.alice).await;

    controller
        .handle_ledger_event(LedgerEvent::PlayerEntered {
            player: addr(9),
            amount: ctx.ledger.config().entry_fee,
        })
        .await;

    assert!(!controller.sink.contains("successfully entered"));
}

#[tokio::test]
async fn round_started__notifies_and_refreshes_the_cache() {
    let ctx = TestContext::new();
    let mut controller = ctx.controller_for(ctx.alice).await;
    assert!(!controller.cache.snapshot().unwrap().is_open);

    // another client opened the round; only the push event tells us
    ctx.ledger.start_round(ctx.owner, 0).await.unwrap();
    controller
        .handle_ledger_event(LedgerEvent::RoundStarted)
        .await;

    assert!(controller.cache.snapshot().unwrap().is_open);
    assert!(controller.sink.contains("A new lottery round has started"));
}
