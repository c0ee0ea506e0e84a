//! Straight-line travel-cost oracle (fallback when OSRM is unavailable).
//!
//! Uses great-circle distance to estimate driving distance and time.
//! Less accurate than a road network (ignores roads) but always available.

use rayon::prelude::*;

use crate::geo::{great_circle_meters, Coordinate};
use crate::oracle::{CostMatrix, LegCost, OracleError, RouteEstimate, RouteOptions, TrafficModel};
use crate::traits::TravelCostOracle;

/// Average driving speed assumption for time estimation.
const DEFAULT_SPEED_KMH: f64 = 40.0;

/// Duration multipliers applied when a departure time is supplied.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrafficFactors {
    pub best_guess: f64,
    pub optimistic: f64,
    pub pessimistic: f64,
}

impl Default for TrafficFactors {
    fn default() -> Self {
        Self {
            best_guess: 1.0,
            optimistic: 0.85,
            pessimistic: 1.3,
        }
    }
}

impl TrafficFactors {
    fn for_model(&self, model: TrafficModel) -> f64 {
        match model {
            TrafficModel::BestGuess => self.best_guess,
            TrafficModel::Optimistic => self.optimistic,
            TrafficModel::Pessimistic => self.pessimistic,
        }
    }
}

/// Great-circle oracle.
///
/// Estimates travel time using straight-line distance and an assumed speed.
/// Invalid coordinates are reported as unavailable pairs.
#[derive(Debug, Clone)]
pub struct HaversineOracle {
    /// Assumed average driving speed in km/h.
    pub speed_kmh: f64,
    pub traffic: TrafficFactors,
}

impl Default for HaversineOracle {
    fn default() -> Self {
        Self {
            speed_kmh: DEFAULT_SPEED_KMH,
            traffic: TrafficFactors::default(),
        }
    }
}

impl HaversineOracle {
    pub fn new(speed_kmh: f64) -> Self {
        Self {
            speed_kmh,
            ..Self::default()
        }
    }

    /// Convert a distance in meters to travel time in seconds.
    fn meters_to_seconds(&self, meters: f64) -> f64 {
        let hours = meters / 1_000.0 / self.speed_kmh;
        (hours * 3600.0).round()
    }

    fn leg(&self, from: Coordinate, to: Coordinate) -> Option<LegCost> {
        if !from.is_valid() || !to.is_valid() {
            return None;
        }
        let meters = great_circle_meters(from, to);
        Some(LegCost::new(meters, self.meters_to_seconds(meters)))
    }
}

impl TravelCostOracle for HaversineOracle {
    fn route(
        &self,
        origin: Coordinate,
        destination: Coordinate,
        options: &RouteOptions,
    ) -> Result<Option<RouteEstimate>, OracleError> {
        Ok(self.leg(origin, destination).map(|leg| RouteEstimate {
            distance_meters: leg.distance_meters,
            duration_seconds: leg.duration_seconds,
            duration_in_traffic_seconds: options
                .departure_time
                .map(|_| (leg.duration_seconds * self.traffic.for_model(options.traffic_model)).round()),
        }))
    }

    fn distance_matrix(
        &self,
        origins: &[Coordinate],
        destinations: &[Coordinate],
        _options: &RouteOptions,
    ) -> Result<CostMatrix, OracleError> {
        let rows = origins
            .par_iter()
            .map(|from| destinations.iter().map(|to| self.leg(*from, *to)).collect())
            .collect();

        Ok(CostMatrix::new(rows))
    }

    fn leg_costs(
        &self,
        waypoints: &[Coordinate],
        _options: &RouteOptions,
    ) -> Result<Vec<Option<LegCost>>, OracleError> {
        Ok(waypoints.windows(2).map(|pair| self.leg(pair[0], pair[1])).collect())
    }
}
