//! Trip catalog: trips, their item pools, and round configuration.
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_TRIP_DATA: &str = include_str!("../assets/data/trips.json");

/// Classification of an item as authored in the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemTag {
    Essential,
    Useful,
    NotRequired,
    Trap,
}

impl ItemTag {
    pub const ALL: [Self; 4] = [Self::Essential, Self::Useful, Self::NotRequired, Self::Trap];

    /// Whether an item carrying this tag belongs in the bag.
    #[must_use]
    pub const fn should_pack(self) -> bool {
        matches!(self, Self::Essential | Self::Useful)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Essential => "essential",
            Self::Useful => "useful",
            Self::NotRequired => "not_required",
            Self::Trap => "trap",
        }
    }

    /// Human-facing label shown on item cards and the results list.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Essential => "Essential",
            Self::Useful => "Useful",
            Self::NotRequired => "Not required",
            Self::Trap => "Trap",
        }
    }
}

impl fmt::Display for ItemTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ItemTag {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "essential" => Ok(Self::Essential),
            "useful" => Ok(Self::Useful),
            "not_required" => Ok(Self::NotRequired),
            "trap" => Ok(Self::Trap),
            _ => Err(()),
        }
    }
}

/// A single packable good.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TripItem {
    pub name: String,
    pub tag: ItemTag,
}

impl TripItem {
    #[must_use]
    pub fn new(name: impl Into<String>, tag: ItemTag) -> Self {
        Self {
            name: name.into(),
            tag,
        }
    }

    #[must_use]
    pub const fn should_pack(&self) -> bool {
        self.tag.should_pack()
    }
}

/// Inclusive bounds on how many items a round of this trip presents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundItemCount {
    pub min: usize,
    pub max: usize,
}

impl RoundItemCount {
    #[must_use]
    pub const fn new(min: usize, max: usize) -> Self {
        Self { min, max }
    }

    /// Number of items a round draws from a pool of `pool` items.
    ///
    /// `min(max, max(min, pool))`, further capped at `pool` so a round never
    /// repeats an item.
    #[must_use]
    pub fn target_for(self, pool: usize) -> usize {
        self.max.min(self.min.max(pool)).min(pool)
    }
}

/// Preset pace names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Pace {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl Pace {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Easy => "easy",
            Self::Medium => "medium",
            Self::Hard => "hard",
        }
    }
}

impl fmt::Display for Pace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Seconds allotted per item for each preset pace.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DifficultyDefaults {
    pub easy: f64,
    pub medium: f64,
    pub hard: f64,
}

impl DifficultyDefaults {
    #[must_use]
    pub const fn seconds_for(&self, pace: Pace) -> f64 {
        match pace {
            Pace::Easy => self.easy,
            Pace::Medium => self.medium,
            Pace::Hard => self.hard,
        }
    }

    /// Per-item countdown length for `pace`. Non-finite or negative values
    /// collapse to zero.
    #[must_use]
    pub fn duration_for(&self, pace: Pace) -> Duration {
        Duration::try_from_secs_f64(self.seconds_for(pace)).unwrap_or(Duration::ZERO)
    }
}

impl Default for DifficultyDefaults {
    fn default() -> Self {
        Self {
            easy: 6.0,
            medium: 4.0,
            hard: 3.0,
        }
    }
}

/// A themed scenario bundling an item pool with round configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trip {
    pub id: String,
    pub name: String,
    pub round_item_count: RoundItemCount,
    pub difficulty_defaults: DifficultyDefaults,
    #[serde(default)]
    pub recommended_loadout: Vec<String>,
    #[serde(default)]
    pub items: Vec<TripItem>,
}

impl Trip {
    /// Whether a round can be formed from this trip.
    #[must_use]
    pub fn is_playable(&self) -> bool {
        self.round_len() > 0
    }

    /// Number of items a round of this trip presents.
    #[must_use]
    pub fn round_len(&self) -> usize {
        self.round_item_count.target_for(self.items.len())
    }

    /// Check the invariants a single trip must satisfy.
    ///
    /// # Errors
    ///
    /// Returns the first violated invariant.
    pub fn validate(&self) -> Result<(), CatalogError> {
        let bounds = self.round_item_count;
        if bounds.min > bounds.max {
            return Err(CatalogError::RoundBounds {
                trip_id: self.id.clone(),
                min: bounds.min,
                max: bounds.max,
            });
        }
        if self.items.is_empty() {
            return Err(CatalogError::EmptyTrip {
                trip_id: self.id.clone(),
            });
        }
        if self.round_len() == 0 {
            return Err(CatalogError::EmptyRound {
                trip_id: self.id.clone(),
            });
        }
        for pace in [Pace::Easy, Pace::Medium, Pace::Hard] {
            let seconds = self.difficulty_defaults.seconds_for(pace);
            if !seconds.is_finite() || seconds <= 0.0 {
                return Err(CatalogError::PaceSeconds {
                    trip_id: self.id.clone(),
                    pace,
                    seconds,
                });
            }
        }
        Ok(())
    }
}

/// Errors raised while loading or validating the catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("catalog JSON is malformed: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("trip '{trip_id}' round bounds invalid (min {min} > max {max})")]
    RoundBounds {
        trip_id: String,
        min: usize,
        max: usize,
    },
    #[error("trip '{trip_id}' has no items")]
    EmptyTrip { trip_id: String },
    #[error("trip '{trip_id}' rounds would present no items (round max is 0)")]
    EmptyRound { trip_id: String },
    #[error("trip id '{0}' appears more than once")]
    DuplicateTrip(String),
    #[error("trip '{trip_id}' {pace} pace must be positive (got {seconds})")]
    PaceSeconds {
        trip_id: String,
        pace: Pace,
        seconds: f64,
    },
}

/// Ordered list of trips offered on the selection screen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Catalog {
    pub trips: Vec<Trip>,
}

impl Catalog {
    /// Create an empty catalog (useful for tests)
    #[must_use]
    pub fn empty() -> Self {
        Self { trips: Vec::new() }
    }

    /// Parse a catalog document.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON cannot be parsed into a catalog.
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        Ok(serde_json::from_str(json)?)
    }

    #[must_use]
    pub fn from_trips(trips: Vec<Trip>) -> Self {
        Self { trips }
    }

    /// Catalog bundled with the crate.
    #[must_use]
    pub fn load_from_static() -> Self {
        match Self::from_json(DEFAULT_TRIP_DATA) {
            Ok(catalog) => catalog,
            Err(err) => {
                log::error!("bundled trip catalog failed to parse: {err}");
                Self::empty()
            }
        }
    }

    #[must_use]
    pub fn trip_by_id(&self, trip_id: &str) -> Option<&Trip> {
        self.trips.iter().find(|trip| trip.id == trip_id)
    }

    /// Trips that can actually start a round.
    pub fn playable_trips(&self) -> impl Iterator<Item = &Trip> {
        self.trips.iter().filter(|trip| trip.is_playable())
    }

    /// Validate every trip and the uniqueness of trip ids.
    ///
    /// # Errors
    ///
    /// Returns the first problem found, in catalog order.
    pub fn validate(&self) -> Result<(), CatalogError> {
        let mut seen = HashSet::new();
        for trip in &self.trips {
            if !seen.insert(trip.id.as_str()) {
                return Err(CatalogError::DuplicateTrip(trip.id.clone()));
            }
            trip.validate()?;
        }
        Ok(())
    }
}
