/*
 * Dashboard events, user-visible notices, push notifications and busy tracking
 */

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{error, info, warn};
use crate::models::{DashboardError, DealCategory};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

/// Transient message meant for the user, e.g. a connectivity warning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    #[must_use]
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Warning,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }

    /// Notice for a failed operation; `what` names the data being fetched.
    #[must_use]
    pub fn for_failure(what: &str, err: &DashboardError) -> Self {
        match err {
            DashboardError::Connection(_) => {
                Notice::warning(format!("Unable to fetch {what} from database - check API connection"))
            }
            DashboardError::Request { status, status_text } => {
                Notice::warning(format!("Backend rejected {what} request: {status} {status_text}"))
            }
            DashboardError::Taxonomy(tag) => {
                Notice::error(format!("Backend returned deals with unknown source '{tag}'"))
            }
            other => Notice::error(format!("Failed to load {what}: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DashboardEvent {
    DealsUpdated {
        refreshed_at: DateTime<Utc>,
        replaced: Vec<DealCategory>,
        found: usize,
    },
    Notice(Notice),
}

/// System-level notification channel (desktop, mobile push, ...).
pub trait Notifier: Send + Sync {
    fn notify(&self, title: &str, message: &str);
}

/// Default notifier that only records notifications in the log.
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, title: &str, message: &str) {
        info!(title, message, "Push notification");
    }
}

pub(crate) fn log_notice(notice: &Notice) {
    match notice.level {
        NoticeLevel::Info => info!(message = %notice.message, "Notice"),
        NoticeLevel::Warning => warn!(message = %notice.message, "Notice"),
        NoticeLevel::Error => error!(message = %notice.message, "Notice"),
    }
}

/// Counts outstanding operations; the dashboard is busy while any are running.
/// It does not prevent new operations from starting.
#[derive(Debug, Default)]
pub struct BusyIndicator {
    depth: AtomicUsize,
}

impl BusyIndicator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enter(&self) -> BusyGuard<'_> {
        self.depth.fetch_add(1, Ordering::AcqRel);
        BusyGuard { indicator: self }
    }

    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.depth.load(Ordering::Acquire) > 0
    }
}

pub struct BusyGuard<'a> {
    indicator: &'a BusyIndicator,
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.indicator.depth.fetch_sub(1, Ordering::AcqRel);
    }
}
