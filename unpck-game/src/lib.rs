//! UNPCK Round Engine
//!
//! Platform-agnostic core logic for UNPCK: Pack It Right, a decision-speed
//! packing game. This crate selects round items, runs the per-item countdown,
//! scores decisions, and summarizes rounds without UI or platform-specific
//! dependencies.

pub mod catalog;
pub mod constants;
pub mod countdown;
pub mod decision;
pub mod numbers;
pub mod round;
pub mod selector;
pub mod session;
pub mod share;
pub mod summary;

// Re-export commonly used types
pub use catalog::{
    Catalog, CatalogError, DifficultyDefaults, ItemTag, Pace, RoundItemCount, Trip, TripItem,
};
#[cfg(feature = "async")]
pub use countdown::{TokioClock, drive_round};
pub use countdown::{Clock, Countdown, ManualClock, MonotonicClock, TimerPoll, TimerToken};
pub use decision::{Decision, DecisionInput, DecisionRecord, DecisionSource, is_correct};
pub use round::{
    DecisionOutcome, Feedback, IgnoreReason, Phase, RoundEngine, RoundError, RoundResults,
    RoundStart, RoundState, RoundView,
};
pub use selector::select_round_items;
pub use session::{PlaySession, SessionError};
pub use share::{ShareError, ShareOutcome, ShareTarget, share_results, share_text};
pub use summary::{RoundSummary, summarize};

/// Trait for abstracting catalog loading
/// Platform-specific implementations should provide this
pub trait CatalogLoader {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Load the trip catalog from the platform-specific source
    ///
    /// # Errors
    ///
    /// Returns an error if the catalog cannot be loaded.
    fn load_catalog(&self) -> Result<Catalog, Self::Error>;
}

/// Loader serving the catalog bundled with this crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct BundledCatalog;

impl CatalogLoader for BundledCatalog {
    type Error = CatalogError;

    fn load_catalog(&self) -> Result<Catalog, Self::Error> {
        Catalog::from_json(include_str!("../assets/data/trips.json"))
    }
}

/// Main game engine for creating play sessions
pub struct GameEngine<L>
where
    L: CatalogLoader,
{
    loader: L,
}

impl<L> GameEngine<L>
where
    L: CatalogLoader,
{
    /// Create a new game engine with the provided catalog loader
    pub const fn new(loader: L) -> Self {
        Self { loader }
    }

    /// Create a session on the wall clock with the given selection seed.
    ///
    /// # Errors
    ///
    /// Returns an error if the catalog cannot be loaded.
    pub fn create_session(&self, seed: u64) -> Result<PlaySession, L::Error> {
        self.create_session_with_clock(seed, MonotonicClock::new())
    }

    /// Create a session driven by `clock`.
    ///
    /// Catalog problems are logged rather than returned; trips that cannot
    /// form a round are refused when chosen.
    ///
    /// # Errors
    ///
    /// Returns an error if the catalog cannot be loaded.
    pub fn create_session_with_clock<C: Clock>(
        &self,
        seed: u64,
        clock: C,
    ) -> Result<PlaySession<C>, L::Error> {
        let catalog = self.loader.load_catalog()?;
        if let Err(err) = catalog.validate() {
            log::warn!("trip catalog failed validation: {err}");
        }
        Ok(PlaySession::new(
            catalog,
            RoundEngine::with_clock(seed, clock),
        ))
    }
}
