//! `view_content` tracking: fires once on whichever comes first, half-page
//! scroll or the dwell timer.

use serde::Serialize;
use serde_json::json;
use tracing::{debug, info, warn};

use crate::config::SCROLL_THRESHOLD;
use crate::events::{EventEmitter, EventName};

/// What triggered `view_content`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EngagementType {
    #[serde(rename = "scroll_50")]
    Scroll50,
    #[serde(rename = "time_15s")]
    Time15s,
}

impl EngagementType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Scroll50 => "scroll_50",
            Self::Time15s => "time_15s",
        }
    }
}

/// Where a scroll-progress reading came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollSource {
    /// Smooth-scroll library progress callback.
    SmoothScroll,
    /// Native window scroll listener; always registered.
    Native,
}

/// Scroll sources to listen on. The native listener is always present, so
/// tracking works without the smooth-scroll library.
pub fn scroll_sources(smooth_scroll_available: bool) -> Vec<ScrollSource> {
    if smooth_scroll_available {
        vec![ScrollSource::SmoothScroll, ScrollSource::Native]
    } else {
        warn!("Smooth scroll library not found, using native scroll listener only");
        vec![ScrollSource::Native]
    }
}

/// One-shot `view_content` guard.
#[derive(Debug, Default)]
pub struct EngagementTracker {
    fired: Option<EngagementType>,
}

impl EngagementTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Which trigger fired `view_content`, if it has fired.
    pub fn fired(&self) -> Option<EngagementType> {
        self.fired
    }

    /// Feed a scroll-progress ratio in `[0, 1]`.
    pub fn on_scroll_progress(
        &mut self,
        ratio: f64,
        source: ScrollSource,
        emitter: &EventEmitter,
    ) -> bool {
        if ratio.is_nan() || ratio < SCROLL_THRESHOLD {
            return false;
        }
        debug!(ratio, source = ?source, "Scroll threshold reached");
        self.fire(EngagementType::Scroll50, emitter)
    }

    /// The dwell timer elapsed.
    pub fn on_dwell_elapsed(&mut self, emitter: &EventEmitter) -> bool {
        self.fire(EngagementType::Time15s, emitter)
    }

    fn fire(&mut self, engagement: EngagementType, emitter: &EventEmitter) -> bool {
        if self.fired.is_some() {
            return false;
        }
        self.fired = Some(engagement);
        emitter.emit(
            EventName::ViewContent,
            json!({ "engagement_type": engagement.as_str() }),
        );
        info!(engagement = engagement.as_str(), "View content fired");
        true
    }
}
