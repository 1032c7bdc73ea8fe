use chrono::{DateTime, Utc};
use serde::Serialize;

/// Health of one lineage's refresh loop, as seen by `/healthz`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshStatus {
    /// `true` between an attempt starting and its outcome being recorded.
    pub refreshing: bool,
    pub last_attempt: Option<DateTime<Utc>>,
    pub last_success: Option<DateTime<Utc>>,
    /// Message of the most recent root failure; cleared by a success.
    pub last_error: Option<String>,
    pub consecutive_failures: u32,
}

impl RefreshStatus {
    pub(crate) fn begin(&mut self, at: DateTime<Utc>) {
        self.refreshing = true;
        self.last_attempt = Some(at);
    }

    pub(crate) fn succeed(&mut self, at: DateTime<Utc>) {
        self.refreshing = false;
        self.last_success = Some(at);
        self.last_error = None;
        self.consecutive_failures = 0;
    }

    pub(crate) fn fail(&mut self, message: String) {
        self.refreshing = false;
        self.last_error = Some(message);
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
    }
}
