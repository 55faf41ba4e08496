use lottery_client::{
    gateway::LedgerGateway,
    test_helpers::TestContext,
};

/// Full round driven through two clients sharing one ledger: the manager
/// opens and funds, a player enters, the draw resolves, and the push events
/// land on the player's side.
#[tokio::test]
async fn full_round__start_enter_fund_and_draw() {
    let ctx = TestContext::instant_draw();
    let mut events = ctx.ledger.subscribe();
    let mut owner = ctx.controller_for(ctx.owner).await;
    let mut alice = ctx.controller_for(ctx.alice).await;

    owner.start_lottery().await;
    assert!(owner.sink.contains("Lottery started successfully"));
    assert!(owner.cache.snapshot().unwrap().is_open);

    alice.enter_lottery().await;
    while let Ok(event) = events.try_recv() {
        alice.handle_ledger_event(event).await;
    }
    assert!(alice.sink.contains("successfully entered"));
    assert_eq!(alice.cache.snapshot().unwrap().player_count, 1);

    owner.fund_contract(ctx.ledger.config().threshold).await;
    assert!(owner.sink.contains("Successfully funded"));

    owner.pick_winner().await;
    while let Ok(event) = events.try_recv() {
        alice.handle_ledger_event(event).await;
    }

    // alice was the only player, so the celebration is hers
    assert_eq!(alice.sink.winner_presentations.len(), 1);
    assert!(!ctx.ledger.is_open().await.unwrap());
    assert_eq!(ctx.ledger.last_winner().await.unwrap(), Some(ctx.alice));
    assert_eq!(ctx.ledger.prize_pool().await.unwrap(), 0);
}

/// The sequence numbers spent by each client over a full round are contiguous
/// per account, including the failed attempt in the middle.
#[tokio::test]
async fn full_round__per_account_counters_stay_contiguous() {
    let ctx = TestContext::instant_draw();
    let mut owner = ctx.controller_for(ctx.owner).await;
    let mut alice = ctx.controller_for(ctx.alice).await;

    owner.start_lottery().await;
    // a second start fails on the ledger but still consumes number 1
    owner.start_lottery().await;
    alice.enter_lottery().await;
    owner.fund_contract(ctx.ledger.config().threshold).await;
    owner.pick_winner().await;

    assert_eq!(ctx.ledger.next_sequence(ctx.owner).await.unwrap(), 4);
    assert_eq!(ctx.ledger.next_sequence(ctx.alice).await.unwrap(), 1);
    assert_eq!(owner.session.sequence(), 4);
    assert_eq!(alice.session.sequence(), 1);
}
