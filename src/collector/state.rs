use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

use crate::scrape_types::CollectedLink;

/// Collector lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectorState {
    Init,
    PageLoaded,
    Scrolling,
    /// Target count reached
    Converged,
    /// Page stopped producing links before the target
    Exhausted,
    Saved,
}

/// Why scrolling ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum StopReason {
    TargetReached,
    IdleLimit,
    PageEnd,
    /// Listing loaded but never rendered a product link
    EmptyListing,
}

impl StopReason {
    #[must_use]
    pub const fn tag(&self) -> &'static str {
        match self {
            Self::TargetReached => "target-reached",
            Self::IdleLimit => "idle-limit",
            Self::PageEnd => "page-end",
            Self::EmptyListing => "empty-listing",
        }
    }
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CollectionStats {
    pub collected: usize,
    pub target: usize,
    /// Idle counter value when scrolling stopped
    pub idle_scrolls: u32,
    pub scroll_cycles: u32,
    pub category: String,
}

/// Where the links ended up
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Persistence {
    NotRequested,
    Saved(PathBuf),
    /// Links stay in memory; the message says why writing failed
    Failed(String),
}

#[derive(Debug, Clone)]
pub struct CollectionOutcome {
    pub links: Vec<CollectedLink>,
    pub state: CollectorState,
    pub stop_reason: StopReason,
    pub stats: CollectionStats,
    pub persistence: Persistence,
}

impl CollectionOutcome {
    #[must_use]
    pub fn is_partial(&self) -> bool {
        self.stats.collected < self.stats.target
    }

    pub fn urls(&self) -> impl Iterator<Item = &str> {
        self.links.iter().map(|l| l.url.as_str())
    }
}
