use lottery_client::{
    countdown::CountdownPhase,
    gateway::LedgerGateway,
    types::LedgerEvent,
};
use lottery_client::test_helpers::TestContext;

#[tokio::test]
async fn below_threshold__the_reconciler_waits_and_names_the_target() {
    let ctx = TestContext::new();
    ctx.ledger.start_round(ctx.owner, 0).await.unwrap();
    let mut controller = ctx.controller_for(ctx.alice).await;

    controller.refresh().await;

    let threshold = ctx.ledger.config().threshold;
    assert_eq!(
        *controller.countdown.phase(),
        CountdownPhase::WaitingForThreshold {
            required: threshold
        }
    );
}

#[tokio::test]
async fn countdown_started_event__seeds_the_clock_from_the_deadline() {
    // given: an open round whose pool has just crossed the threshold
    let ctx = TestContext::new();
    ctx.ledger.start_round(ctx.owner, 0).await.unwrap();
    ctx.ledger
        .fund(ctx.owner, 1, ctx.ledger.config().threshold)
        .await
        .unwrap();
    let mut controller = ctx.controller_for(ctx.alice).await;

    // when: the push event arrives
    controller
        .handle_ledger_event(LedgerEvent::CountdownStarted {
            seconds_until_draw: 120,
        })
        .await;

    // then
    assert_eq!(
        *controller.countdown.phase(),
        CountdownPhase::Counting { remaining: 120 }
    );
    assert!(controller.sink.contains("Draw countdown has started"));
}

#[tokio::test]
async fn zero_clock__resolves_the_draw_exactly_once() {
    // given: threshold met, countdown elapsed, one player in the round
    let ctx = TestContext::instant_draw();
    ctx.ledger.start_round(ctx.owner, 0).await.unwrap();
    ctx.ledger
        .fund(ctx.owner, 1, ctx.ledger.config().threshold)
        .await
        .unwrap();
    ctx.ledger
        .enter(ctx.alice, 0, ctx.ledger.config().entry_fee)
        .await
        .unwrap();
    let mut controller = ctx.controller_for(ctx.owner).await;
    controller.refresh().await;
    assert_eq!(
        *controller.countdown.phase(),
        CountdownPhase::Counting { remaining: 0 }
    );

    // when: the clock fires, and keeps ticking afterwards
    controller.tick().await;
    controller.tick().await;
    controller.tick().await;

    // then: exactly one resolve-draw request went out and the round is closed
    // (the owner had spent numbers 0 and 1 before the client attached)
    assert_eq!(ctx.ledger.next_sequence(ctx.owner).await.unwrap(), 3);
    assert!(!ctx.ledger.is_open().await.unwrap());
    assert_eq!(ctx.ledger.last_winner().await.unwrap(), Some(ctx.alice));
}

#[tokio::test]
async fn zero_clock__holds_while_another_request_is_in_flight() {
    let ctx = TestContext::instant_draw();
    ctx.ledger.start_round(ctx.owner, 0).await.unwrap();
    ctx.ledger
        .fund(ctx.owner, 1, ctx.ledger.config().threshold)
        .await
        .unwrap();
    ctx.ledger
        .enter(ctx.alice, 0, ctx.ledger.config().entry_fee)
        .await
        .unwrap();
    let mut controller = ctx.controller_for(ctx.owner).await;
    controller.refresh().await;

    // occupy the admission gate, as an in-flight request would
    controller
        .sequencer
        .admit(lottery_client::types::RequestKind::Fund, &mut controller.session)
        .unwrap();
    let sequence_before = ctx.ledger.next_sequence(ctx.owner).await.unwrap();

    controller.tick().await;

    // no draw resolution was submitted while the request pends
    assert_eq!(
        ctx.ledger.next_sequence(ctx.owner).await.unwrap(),
        sequence_before
    );
    assert!(ctx.ledger.is_open().await.unwrap());
}
