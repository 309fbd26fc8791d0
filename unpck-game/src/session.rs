//! Catalog-aware play session: picks trips by id and hands them to a round engine.
use thiserror::Error;

use crate::catalog::{Catalog, Trip};
use crate::countdown::{Clock, MonotonicClock};
use crate::round::{RoundEngine, RoundError, RoundStart};

/// Errors raised by catalog-aware session operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("unknown trip '{0}'")]
    UnknownTrip(String),
    #[error(transparent)]
    Round(#[from] RoundError),
}

/// High-level session binding the trip catalog to a round engine.
#[derive(Debug, Clone)]
pub struct PlaySession<C = MonotonicClock> {
    catalog: Catalog,
    engine: RoundEngine<C>,
}

impl<C: Clock> PlaySession<C> {
    #[must_use]
    pub const fn new(catalog: Catalog, engine: RoundEngine<C>) -> Self {
        Self { catalog, engine }
    }

    #[must_use]
    pub const fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Trips offered on the selection screen, in catalog order.
    #[must_use]
    pub fn trips(&self) -> &[Trip] {
        &self.catalog.trips
    }

    #[must_use]
    pub const fn engine(&self) -> &RoundEngine<C> {
        &self.engine
    }

    pub const fn engine_mut(&mut self) -> &mut RoundEngine<C> {
        &mut self.engine
    }

    /// Look up `trip_id` and start a round of it.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::UnknownTrip`] for ids missing from the catalog,
    /// or the engine's [`RoundError`] if the round cannot start.
    pub fn choose_trip(&mut self, trip_id: &str) -> Result<RoundStart, SessionError> {
        let trip = self
            .catalog
            .trip_by_id(trip_id)
            .ok_or_else(|| SessionError::UnknownTrip(trip_id.to_string()))?;
        Ok(self.engine.choose_trip(trip)?)
    }

    #[must_use]
    pub fn into_engine(self) -> RoundEngine<C> {
        self.engine
    }
}
