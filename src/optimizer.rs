//! Route optimizer facade.
//!
//! Routes small requests to the exact sequencer and larger ones to the
//! nearest-neighbor heuristic.

use std::fmt;

use tracing::{debug, instrument};

use crate::exact::sequence_exact;
use crate::geo::Coordinate;
use crate::heuristic::sequence_heuristic;
use crate::oracle::{OracleError, RouteOptions};
use crate::route::{OptimizedRoute, RouteRequest};
use crate::traits::{Stop, TravelCostOracle};

/// Largest stop count solved by full permutation search (8! = 40,320 orders).
pub const DEFAULT_EXACT_CEILING: usize = 8;

#[derive(Debug, Clone)]
pub struct OptimizerConfig {
    /// Requests with at most this many stops are solved exactly.
    pub exact_ceiling: usize,
    /// Discard exact-search orders that reach a stop after its window closes.
    /// Windows are otherwise only reported via `late_stop_ids`.
    pub enforce_time_windows: bool,
    /// Departure time and traffic model forwarded to the oracle.
    pub route_options: RouteOptions,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            exact_ceiling: DEFAULT_EXACT_CEILING,
            enforce_time_windows: false,
            route_options: RouteOptions::default(),
        }
    }
}

/// Why a route could not be optimized.
///
/// Callers should keep the stops in their original order on any of these.
#[derive(Debug, Clone, PartialEq)]
pub enum OptimizeError {
    /// The oracle produced no data for the request.
    OracleUnavailable(OracleError),
    /// No permutation keeps every pickup ahead of its load's deliveries.
    /// Holds indices of stops with malformed load pairing, if any.
    NoValidSequence { malformed: Vec<usize> },
    /// Every valid order reaches some stop after its window closes.
    NoFeasibleSchedule,
    /// The oracle could not price any candidate route.
    Unpriceable,
}

impl fmt::Display for OptimizeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptimizeError::OracleUnavailable(err) => write!(f, "travel costs unavailable: {}", err),
            OptimizeError::NoValidSequence { malformed } => write!(
                f,
                "no precedence-valid stop sequence ({} stops with malformed load pairing)",
                malformed.len()
            ),
            OptimizeError::NoFeasibleSchedule => {
                write!(f, "no stop sequence satisfies the time windows")
            }
            OptimizeError::Unpriceable => write!(f, "travel costs unavailable for every candidate route"),
        }
    }
}

impl std::error::Error for OptimizeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            OptimizeError::OracleUnavailable(err) => Some(err),
            _ => None,
        }
    }
}

impl From<OracleError> for OptimizeError {
    fn from(err: OracleError) -> Self {
        OptimizeError::OracleUnavailable(err)
    }
}

/// Stateless entry point for route optimization.
///
/// Holds no per-request state; one optimizer can serve concurrent requests.
#[derive(Debug, Clone)]
pub struct RouteOptimizer<O> {
    oracle: O,
    config: OptimizerConfig,
}

impl<O: TravelCostOracle> RouteOptimizer<O> {
    pub fn new(oracle: O) -> Self {
        Self::with_config(oracle, OptimizerConfig::default())
    }

    pub fn with_config(oracle: O, config: OptimizerConfig) -> Self {
        Self { oracle, config }
    }

    pub fn config(&self) -> &OptimizerConfig {
        &self.config
    }

    pub fn oracle(&self) -> &O {
        &self.oracle
    }

    /// Order `stops` for a trip from `origin`, optionally finishing at `end`.
    ///
    /// No stops yields an empty route with zero metrics.
    #[instrument(skip_all, fields(stops = stops.len(), has_end = end.is_some()))]
    pub fn optimize_route<S>(
        &self,
        origin: Coordinate,
        stops: &[S],
        end: Option<Coordinate>,
    ) -> Result<OptimizedRoute<S::Id>, OptimizeError>
    where
        S: Stop + Sync,
    {
        if stops.is_empty() {
            return Ok(OptimizedRoute::empty());
        }

        let request = RouteRequest::new(origin, stops, end);
        if stops.len() <= self.config.exact_ceiling {
            debug!(ceiling = self.config.exact_ceiling, "using exact sequencer");
            sequence_exact(&self.oracle, &request, &self.config)
        } else {
            debug!(ceiling = self.config.exact_ceiling, "using heuristic sequencer");
            sequence_heuristic(&self.oracle, &request, &self.config)
        }
    }
}
