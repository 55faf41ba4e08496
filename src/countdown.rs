use crate::{
    cache::LedgerSnapshot,
    types::{
        Wei,
        format_eth,
    },
};

/// If the local clock and the authoritative clock disagree by more than this
/// many seconds at a reconciliation point, the local clock is re-seeded.
/// Smaller drift keeps the local clock to avoid a visibly stuttering display.
pub const RESYNC_TOLERANCE_SECS: u64 = 5;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum CountdownPhase {
    /// Ledger reports the lottery closed.
    #[default]
    Inactive,
    /// Open, but the prize pool has not reached the draw threshold.
    WaitingForThreshold { required: Wei },
    /// Open and threshold met; ticking down locally from an authoritative seed.
    Counting { remaining: u64 },
    /// The draw-resolution action has been invoked; awaiting the outcome.
    Triggering,
}

impl CountdownPhase {
    pub fn display(&self) -> String {
        match self {
            CountdownPhase::Inactive => String::from("Lottery is not open"),
            CountdownPhase::WaitingForThreshold { required } => format!(
                "Waiting for prize pool to reach {} ETH",
                format_eth(*required)
            ),
            CountdownPhase::Counting { remaining } => {
                format!("{}:{:02}", remaining / 60, remaining % 60)
            }
            CountdownPhase::Triggering => String::from("Selecting winner..."),
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TickOutcome {
    Idle,
    Ticked,
    /// The local clock hit zero with no request pending: resolve the draw.
    TriggerDraw,
}

/// Reconciles a locally ticking countdown against authoritative ledger time.
///
/// The local tick is a cheap approximation; the authoritative time-to-draw
/// re-seeds it on phase entry, on relevant push events, and whenever drift
/// exceeds [`RESYNC_TOLERANCE_SECS`].
#[derive(Debug, Default)]
pub struct CountdownReconciler {
    phase: CountdownPhase,
}

impl CountdownReconciler {
    pub fn new() -> Self {
        CountdownReconciler::default()
    }

    pub fn phase(&self) -> &CountdownPhase {
        &self.phase
    }

    /// Routine re-entry evaluation after a refresh. Keeps the local clock
    /// while it agrees with the authoritative one within tolerance, and holds
    /// a `Triggering` phase until a push event forces re-entry.
    pub fn reconcile(&mut self, snapshot: &LedgerSnapshot, authoritative: Option<u64>) {
        if !snapshot.is_open {
            self.phase = CountdownPhase::Inactive;
            return;
        }
        if snapshot.prize_pool < snapshot.threshold {
            self.phase = CountdownPhase::WaitingForThreshold {
                required: snapshot.threshold,
            };
            return;
        }
        match (&self.phase, authoritative) {
            (CountdownPhase::Counting { remaining }, Some(time))
                if remaining.abs_diff(time) > RESYNC_TOLERANCE_SECS =>
            {
                tracing::debug!(local = remaining, authoritative = time, "countdown drift; re-seeding");
                self.phase = CountdownPhase::Counting { remaining: time };
            }
            (CountdownPhase::Counting { .. }, _) => {}
            (CountdownPhase::Triggering, _) => {}
            (_, Some(time)) => self.phase = CountdownPhase::Counting { remaining: time },
            // threshold met but no fresh clock available; hold the current
            // phase until the next reconciliation brings one
            (_, None) => {}
        }
    }

    /// Forced re-entry evaluation on a push event that signals a new countdown
    /// or a round state change. Discards the local clock and any sticky
    /// `Triggering` state in favor of fresh authoritative data.
    pub fn force_reseed(&mut self, snapshot: &LedgerSnapshot, authoritative: Option<u64>) {
        self.phase = if !snapshot.is_open {
            CountdownPhase::Inactive
        } else if snapshot.prize_pool < snapshot.threshold {
            CountdownPhase::WaitingForThreshold {
                required: snapshot.threshold,
            }
        } else if let Some(time) = authoritative {
            CountdownPhase::Counting { remaining: time }
        } else {
            self.phase.clone()
        };
    }

    /// Advance the local clock by one second. Fires `TriggerDraw` exactly once
    /// when the clock reaches zero, and only while no request is in flight; a
    /// pending request holds the clock at zero for a later tick or refresh to
    /// re-evaluate.
    pub fn tick(&mut self, request_in_flight: bool) -> TickOutcome {
        match &mut self.phase {
            CountdownPhase::Counting { remaining } => {
                if *remaining > 0 {
                    *remaining -= 1;
                }
                if *remaining == 0 {
                    if request_in_flight {
                        return TickOutcome::Idle;
                    }
                    self.phase = CountdownPhase::Triggering;
                    return TickOutcome::TriggerDraw;
                }
                TickOutcome::Ticked
            }
            _ => TickOutcome::Idle,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Address;

    fn snapshot(is_open: bool, prize_pool: Wei, threshold: Wei) -> LedgerSnapshot {
        LedgerSnapshot {
            is_open,
            entry_fee: 1,
            player_count: 2,
            prize_pool,
            manager: Address::ZERO,
            last_winner: None,
            last_prize: 0,
            threshold,
        }
    }

    #[test]
    fn closed_lottery_is_inactive() {
        let mut reconciler = CountdownReconciler::new();
        reconciler.reconcile(&snapshot(false, 10, 5), Some(90));
        assert_eq!(*reconciler.phase(), CountdownPhase::Inactive);
    }

    #[test]
    fn below_threshold_waits_and_never_counts() {
        let mut reconciler = CountdownReconciler::new();
        reconciler.reconcile(&snapshot(true, 0, 5), Some(90));
        assert_eq!(
            *reconciler.phase(),
            CountdownPhase::WaitingForThreshold { required: 5 }
        );
        assert_eq!(reconciler.tick(false), TickOutcome::Idle);
    }

    #[test]
    fn threshold_met_seeds_from_authoritative_time() {
        let mut reconciler = CountdownReconciler::new();
        reconciler.reconcile(&snapshot(true, 10, 5), Some(90));
        assert_eq!(
            *reconciler.phase(),
            CountdownPhase::Counting { remaining: 90 }
        );
    }

    #[test]
    fn ninety_ticks_trigger_the_draw_exactly_once() {
        let mut reconciler = CountdownReconciler::new();
        reconciler.reconcile(&snapshot(true, 10, 5), Some(90));

        let mut triggers = 0;
        for _ in 0..89 {
            assert_eq!(reconciler.tick(false), TickOutcome::Ticked);
        }
        for _ in 0..10 {
            if reconciler.tick(false) == TickOutcome::TriggerDraw {
                triggers += 1;
            }
        }
        assert_eq!(triggers, 1);
        assert_eq!(*reconciler.phase(), CountdownPhase::Triggering);
    }

    #[test]
    fn pending_request_holds_the_clock_at_zero() {
        let mut reconciler = CountdownReconciler::new();
        reconciler.reconcile(&snapshot(true, 10, 5), Some(1));

        assert_eq!(reconciler.tick(true), TickOutcome::Idle);
        assert_eq!(
            *reconciler.phase(),
            CountdownPhase::Counting { remaining: 0 }
        );
        // once the pending request resolves, the next tick fires
        assert_eq!(reconciler.tick(false), TickOutcome::TriggerDraw);
    }

    #[test]
    fn small_drift_keeps_the_local_clock() {
        let mut reconciler = CountdownReconciler::new();
        reconciler.reconcile(&snapshot(true, 10, 5), Some(90));
        reconciler.tick(false);
        reconciler.tick(false);

        reconciler.reconcile(&snapshot(true, 10, 5), Some(90));

        assert_eq!(
            *reconciler.phase(),
            CountdownPhase::Counting { remaining: 88 }
        );
    }

    #[test]
    fn large_drift_reseeds_from_authoritative_time() {
        let mut reconciler = CountdownReconciler::new();
        reconciler.reconcile(&snapshot(true, 10, 5), Some(90));

        reconciler.reconcile(&snapshot(true, 10, 5), Some(60));

        assert_eq!(
            *reconciler.phase(),
            CountdownPhase::Counting { remaining: 60 }
        );
    }

    #[test]
    fn push_event_reseed_discards_the_local_clock() {
        let mut reconciler = CountdownReconciler::new();
        reconciler.reconcile(&snapshot(true, 10, 5), Some(90));
        for _ in 0..30 {
            reconciler.tick(false);
        }

        reconciler.force_reseed(&snapshot(true, 10, 5), Some(120));

        assert_eq!(
            *reconciler.phase(),
            CountdownPhase::Counting { remaining: 120 }
        );
    }

    #[test]
    fn triggering_is_sticky_until_forced_reentry() {
        let mut reconciler = CountdownReconciler::new();
        reconciler.reconcile(&snapshot(true, 10, 5), Some(0));
        assert_eq!(reconciler.tick(false), TickOutcome::TriggerDraw);

        // routine refreshes do not restart the clock while resolution pends
        reconciler.reconcile(&snapshot(true, 10, 5), Some(0));
        assert_eq!(*reconciler.phase(), CountdownPhase::Triggering);

        // the round-ended event forces re-entry
        reconciler.force_reseed(&snapshot(false, 0, 5), None);
        assert_eq!(*reconciler.phase(), CountdownPhase::Inactive);
    }
}
