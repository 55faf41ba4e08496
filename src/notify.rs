use crate::types::Wei;
use chrono::{
    DateTime,
    Duration,
    Utc,
};
use std::collections::VecDeque;

/// How long a transient notification stays visible.
pub const NOTICE_TTL_SECS: i64 = 5;
/// The winner banner lingers a little longer.
pub const WINNER_TTL_SECS: i64 = 8;

const MAX_NOTICES: usize = 6;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
}

/// Sink for user-visible messages produced by the client core.
pub trait NotificationSink {
    fn notify(&mut self, message: String, severity: Severity);

    /// Distinguished celebratory state for the local account winning.
    fn present_winner(&mut self, amount: Wei);
}

#[derive(Clone, Debug)]
pub struct Notice {
    pub message: String,
    pub severity: Severity,
    pub at: DateTime<Utc>,
}

#[derive(Clone, Debug)]
pub struct WinnerBanner {
    pub amount: Wei,
    pub at: DateTime<Utc>,
}

/// In-memory notification feed rendered by the terminal UI.
///
/// Notices auto-dismiss after a fixed interval; expiry happens lazily when the
/// feed is read for drawing.
#[derive(Default)]
pub struct NoticeFeed {
    notices: VecDeque<Notice>,
    winner: Option<WinnerBanner>,
}

impl NoticeFeed {
    pub fn new() -> Self {
        NoticeFeed::default()
    }

    pub fn visible(&mut self) -> Vec<Notice> {
        self.prune();
        self.notices.iter().cloned().collect()
    }

    pub fn winner(&mut self) -> Option<WinnerBanner> {
        self.prune();
        self.winner.clone()
    }

    pub fn dismiss_winner(&mut self) {
        self.winner = None;
    }

    fn prune(&mut self) {
        let now = Utc::now();
        self.notices
            .retain(|notice| now - notice.at < Duration::seconds(NOTICE_TTL_SECS));
        if let Some(banner) = &self.winner
            && now - banner.at >= Duration::seconds(WINNER_TTL_SECS)
        {
            self.winner = None;
        }
    }
}

impl NotificationSink for NoticeFeed {
    fn notify(&mut self, message: String, severity: Severity) {
        tracing::debug!(%message, ?severity, "notice");
        self.notices.push_back(Notice {
            message,
            severity,
            at: Utc::now(),
        });
        while self.notices.len() > MAX_NOTICES {
            self.notices.pop_front();
        }
    }

    fn present_winner(&mut self, amount: Wei) {
        self.winner = Some(WinnerBanner {
            amount,
            at: Utc::now(),
        });
    }
}
