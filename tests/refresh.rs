use lottery_client::{
    app::AppController,
    gateway::LedgerGateway,
    identity::{
        IdentityEvent,
        LocalIdentity,
    },
    test_helpers::{
        FlakyGateway,
        LOCAL_CHAIN_ID,
        RecordingSink,
        TestContext,
    },
};

#[tokio::test]
async fn refresh__failed_read_leaves_the_snapshot_unchanged() {
    // given: an attached controller, then the ledger state moves on
    let ctx = TestContext::new();
    let gateway = FlakyGateway::new(ctx.ledger.clone());
    let identity = ctx.identity_for(ctx.alice);
    let mut controller = AppController::attach(
        gateway.clone(),
        identity,
        RecordingSink::new(),
        LOCAL_CHAIN_ID,
    )
    .await
    .unwrap();
    let before = controller.cache.snapshot().cloned().unwrap();
    assert!(!before.is_open);
    ctx.ledger.start_round(ctx.owner, 0).await.unwrap();

    // when: one read of the batch fails
    gateway.set_failing(true);
    controller.refresh().await;

    // then: no partial fields leak through
    assert_eq!(controller.cache.snapshot().unwrap(), &before);

    // and a later healthy refresh replaces the snapshot wholesale
    gateway.set_failing(false);
    controller.refresh().await;
    assert!(controller.cache.snapshot().unwrap().is_open);
}

#[tokio::test]
async fn refresh__derives_the_manager_flag_from_the_session_account() {
    let ctx = TestContext::new();

    let owner_controller = ctx.controller_for(ctx.owner).await;
    let alice_controller = ctx.controller_for(ctx.alice).await;

    assert!(owner_controller.cache.is_manager());
    assert!(!alice_controller.cache.is_manager());
}

#[tokio::test]
async fn refresh__tracks_entries_in_the_published_snapshot() {
    let ctx = TestContext::new();
    ctx.ledger.start_round(ctx.owner, 0).await.unwrap();
    let mut controller = ctx.controller_for(ctx.alice).await;
    controller.refresh().await;
    let fee = controller.cache.snapshot().unwrap().entry_fee;

    controller.enter_lottery().await;

    let snapshot = controller.cache.snapshot().unwrap();
    assert_eq!(snapshot.player_count, 1);
    assert_eq!(snapshot.prize_pool, fee);
}

#[tokio::test]
async fn account_change__rederives_is_manager_and_reseeds_the_counter() {
    // given: a controller connected as the manager, with one spent number
    let ctx = TestContext::new();
    let identity = LocalIdentity::new(
        LOCAL_CHAIN_ID,
        vec![
            (String::from("owner"), ctx.owner),
            (String::from("alice"), ctx.alice),
        ],
    );
    let mut controller = AppController::attach(
        ctx.ledger.clone(),
        identity,
        RecordingSink::new(),
        LOCAL_CHAIN_ID,
    )
    .await
    .unwrap();
    assert!(controller.cache.is_manager());
    controller.start_lottery().await;
    assert_eq!(controller.session.sequence(), 1);

    // when
    let reload = controller
        .handle_identity_event(IdentityEvent::AccountChanged(Some(ctx.alice)))
        .await;

    // then: same cached manager field, new account against it
    assert!(!reload);
    assert!(!controller.cache.is_manager());
    assert_eq!(controller.session.account, Some(ctx.alice));
    assert_eq!(controller.session.sequence(), 0);

    // and switching back re-derives it as true
    controller
        .handle_identity_event(IdentityEvent::AccountChanged(Some(ctx.owner)))
        .await;
    assert!(controller.cache.is_manager());
    assert_eq!(controller.session.sequence(), 1);
}

#[tokio::test]
async fn network_change__requires_a_client_reload() {
    let ctx = TestContext::new();
    let mut controller = ctx.controller_for(ctx.alice).await;

    let reload = controller
        .handle_identity_event(IdentityEvent::NetworkChanged(1))
        .await;

    assert!(reload);
}
