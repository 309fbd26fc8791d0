//! Share summary text and share-collaborator status handling.
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::{
    SHARE_BRAND, SHARE_STATUS_COPIED, SHARE_STATUS_FAILED, SHARE_STATUS_SHARED,
    SHARE_STATUS_UNSUPPORTED,
};
use crate::summary::RoundSummary;

/// How a platform share attempt ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShareOutcome {
    /// Handed to a native share sheet.
    Shared,
    /// Written to the clipboard instead.
    Copied,
    /// Neither mechanism exists on this device.
    Unsupported,
}

impl ShareOutcome {
    #[must_use]
    pub const fn status_message(self) -> &'static str {
        match self {
            Self::Shared => SHARE_STATUS_SHARED,
            Self::Copied => SHARE_STATUS_COPIED,
            Self::Unsupported => SHARE_STATUS_UNSUPPORTED,
        }
    }
}

/// Failure reported by a share collaborator.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ShareError {
    #[error("share canceled by the user")]
    Canceled,
    #[error("share failed: {0}")]
    Failed(String),
}

/// Platform hook that publishes the share summary (share sheet, clipboard).
pub trait ShareTarget {
    /// Publish `text`.
    ///
    /// # Errors
    ///
    /// Returns an error if the user cancels or the platform rejects the request.
    fn share(&self, title: &str, text: &str) -> Result<ShareOutcome, ShareError>;
}

/// Summary line for a finished round, e.g.
/// `UNPCK | Beach Weekend — Score 7/10 | Accuracy 70%`.
#[must_use]
pub fn share_text(trip_name: &str, summary: &RoundSummary) -> String {
    format!(
        "{SHARE_BRAND} | {trip_name} — Score {}/{} | Accuracy {}%",
        summary.score, summary.total, summary.accuracy
    )
}

/// Publish `text` through `target` and turn whatever happens into a status
/// message for the results screen. Never fails.
pub fn share_results<T>(target: &T, title: &str, text: &str) -> String
where
    T: ShareTarget + ?Sized,
{
    match target.share(title, text) {
        Ok(outcome) => outcome.status_message().to_string(),
        Err(err) => {
            log::warn!("share attempt failed: {err}");
            SHARE_STATUS_FAILED.to_string()
        }
    }
}
