//! Tunables shared across the round engine.
use std::time::Duration;

use crate::catalog::Pace;

/// Pace used for every round's per-item countdown. Easy and hard are carried
/// in the catalog but not selectable yet.
pub const ROUND_PACE: Pace = Pace::Medium;

/// Cadence at which a presentation loop should poll the countdown.
pub const COUNTDOWN_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Brand prefix used in share summaries.
pub const SHARE_BRAND: &str = "UNPCK";

/// Title handed to native share sheets.
pub const SHARE_TITLE: &str = "UNPCK: Pack It Right";

/// Log target for round lifecycle lines.
pub const LOG_TARGET_ROUND: &str = "unpck::round";

pub const SHARE_STATUS_SHARED: &str = "Shared via native sheet.";
pub const SHARE_STATUS_COPIED: &str = "Copied results to clipboard.";
pub const SHARE_STATUS_UNSUPPORTED: &str = "Share unsupported on this device.";
pub const SHARE_STATUS_FAILED: &str = "Share canceled or failed.";
