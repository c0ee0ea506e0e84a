//! Travel-cost oracle value types, errors and the fallback combinator.

use std::fmt;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::geo::Coordinate;
use crate::traits::TravelCostOracle;

/// Traffic assumption used when a departure time is supplied.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrafficModel {
    #[default]
    BestGuess,
    Optimistic,
    Pessimistic,
}

/// Per-request options passed to the oracle.
///
/// Without a departure time the oracle returns a traffic-agnostic estimate.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RouteOptions {
    pub departure_time: Option<SystemTime>,
    pub traffic_model: TrafficModel,
}

impl RouteOptions {
    pub fn departing_at(departure_time: SystemTime, traffic_model: TrafficModel) -> Self {
        Self {
            departure_time: Some(departure_time),
            traffic_model,
        }
    }
}

/// Driving cost of one origin/destination pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LegCost {
    pub distance_meters: f64,
    pub duration_seconds: f64,
}

impl LegCost {
    pub const fn new(distance_meters: f64, duration_seconds: f64) -> Self {
        Self {
            distance_meters,
            duration_seconds,
        }
    }
}

/// Single-pair route result.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RouteEstimate {
    pub distance_meters: f64,
    pub duration_seconds: f64,
    /// Only present when a departure time was supplied and the service models traffic.
    pub duration_in_traffic_seconds: Option<f64>,
}

impl From<RouteEstimate> for LegCost {
    fn from(estimate: RouteEstimate) -> Self {
        LegCost::new(estimate.distance_meters, estimate.duration_seconds)
    }
}

/// Origins x destinations table of leg costs. `None` marks an unavailable pair.
#[derive(Debug, Clone, PartialEq)]
pub struct CostMatrix {
    rows: Vec<Vec<Option<LegCost>>>,
}

impl CostMatrix {
    pub fn new(rows: Vec<Vec<Option<LegCost>>>) -> Self {
        Self { rows }
    }

    /// A table where every pair is unavailable.
    pub fn unavailable(origins: usize, destinations: usize) -> Self {
        Self {
            rows: vec![vec![None; destinations]; origins],
        }
    }

    pub fn get(&self, origin: usize, destination: usize) -> Option<LegCost> {
        self.rows
            .get(origin)
            .and_then(|row| row.get(destination))
            .copied()
            .flatten()
    }

    pub fn set(&mut self, origin: usize, destination: usize, cost: Option<LegCost>) {
        if let Some(cell) = self.rows.get_mut(origin).and_then(|row| row.get_mut(destination)) {
            *cell = cost;
        }
    }

    pub fn rows(&self) -> &[Vec<Option<LegCost>>] {
        &self.rows
    }

    pub fn origin_count(&self) -> usize {
        self.rows.len()
    }

    pub fn destination_count(&self) -> usize {
        self.rows.first().map_or(0, Vec::len)
    }

    /// True when the table has exactly `origins` rows of `destinations` cells.
    pub fn has_shape(&self, origins: usize, destinations: usize) -> bool {
        self.rows.len() == origins && self.rows.iter().all(|row| row.len() == destinations)
    }

    /// True when no pair could be priced.
    pub fn all_unavailable(&self) -> bool {
        self.rows.iter().flatten().all(Option::is_none)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum OracleError {
    /// The service could not be reached at all.
    Unreachable(String),
    /// The service answered with an error code for the whole request.
    Rejected { code: String, message: String },
    /// The response could not be interpreted.
    InvalidResponse(String),
}

impl fmt::Display for OracleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OracleError::Unreachable(reason) => write!(f, "routing service unreachable: {}", reason),
            OracleError::Rejected { code, message } => {
                write!(f, "routing service rejected request ({}): {}", code, message)
            }
            OracleError::InvalidResponse(reason) => {
                write!(f, "invalid routing service response: {}", reason)
            }
        }
    }
}

impl std::error::Error for OracleError {}

/// Consults `primary` first and fills in whatever it cannot price from `secondary`.
///
/// Typically an [`OsrmClient`](crate::osrm::OsrmClient) backed by a
/// [`HaversineOracle`](crate::haversine::HaversineOracle).
#[derive(Debug, Clone)]
pub struct FallbackOracle<P, S> {
    primary: P,
    secondary: S,
}

impl<P, S> FallbackOracle<P, S> {
    pub fn new(primary: P, secondary: S) -> Self {
        Self { primary, secondary }
    }
}

impl<P, S> TravelCostOracle for FallbackOracle<P, S>
where
    P: TravelCostOracle,
    S: TravelCostOracle,
{
    fn route(
        &self,
        origin: Coordinate,
        destination: Coordinate,
        options: &RouteOptions,
    ) -> Result<Option<RouteEstimate>, OracleError> {
        match self.primary.route(origin, destination, options) {
            Ok(Some(estimate)) => Ok(Some(estimate)),
            Ok(None) => self.secondary.route(origin, destination, options),
            Err(err) => {
                warn!(error = %err, "primary oracle failed, using fallback route");
                self.secondary.route(origin, destination, options)
            }
        }
    }

    fn distance_matrix(
        &self,
        origins: &[Coordinate],
        destinations: &[Coordinate],
        options: &RouteOptions,
    ) -> Result<CostMatrix, OracleError> {
        let mut matrix = match self.primary.distance_matrix(origins, destinations, options) {
            Ok(matrix) => matrix,
            Err(err) => {
                warn!(error = %err, "primary oracle failed, using fallback matrix");
                return self.secondary.distance_matrix(origins, destinations, options);
            }
        };
        if !matrix.has_shape(origins.len(), destinations.len()) {
            warn!(
                rows = matrix.origin_count(),
                expected = origins.len(),
                "primary oracle returned a mis-sized matrix, using fallback matrix"
            );
            return self.secondary.distance_matrix(origins, destinations, options);
        }

        let missing = (0..origins.len())
            .flat_map(|i| (0..destinations.len()).map(move |j| (i, j)))
            .filter(|&(i, j)| matrix.get(i, j).is_none())
            .collect::<Vec<_>>();
        if missing.is_empty() {
            return Ok(matrix);
        }

        warn!(pairs = missing.len(), "filling unavailable pairs from fallback oracle");
        let fallback = self.secondary.distance_matrix(origins, destinations, options)?;
        for (i, j) in missing {
            matrix.set(i, j, fallback.get(i, j));
        }
        Ok(matrix)
    }

    fn leg_costs(
        &self,
        waypoints: &[Coordinate],
        options: &RouteOptions,
    ) -> Result<Vec<Option<LegCost>>, OracleError> {
        let mut legs = match self.primary.leg_costs(waypoints, options) {
            Ok(legs) => legs,
            Err(err) => {
                warn!(error = %err, "primary oracle failed, using fallback legs");
                return self.secondary.leg_costs(waypoints, options);
            }
        };
        if legs.len() != waypoints.len().saturating_sub(1) {
            warn!(legs = legs.len(), "primary oracle returned the wrong leg count, using fallback legs");
            return self.secondary.leg_costs(waypoints, options);
        }

        for (leg, pair) in legs.iter_mut().zip(waypoints.windows(2)) {
            if leg.is_none() {
                *leg = self.secondary.route(pair[0], pair[1], options)?.map(LegCost::from);
            }
        }
        Ok(legs)
    }
}
