//! dispatch-planner
//!
//! Stop sequencing and driver/load proximity scoring for freight dispatch,
//! priced by a pluggable travel-cost oracle (OSRM or great-circle estimates).

pub mod geo;
pub mod traits;
pub mod oracle;
pub mod haversine;
pub mod pacing;
pub mod osrm;
pub mod osrm_data;
pub mod constraints;
pub mod route;
pub mod exact;
pub mod heuristic;
pub mod optimizer;
pub mod proximity;

pub use geo::Coordinate;
pub use optimizer::{OptimizeError, OptimizerConfig, RouteOptimizer};
pub use oracle::{CostMatrix, LegCost, OracleError, RouteOptions};
pub use proximity::{ProximityScorer, ScoringConfig};
pub use route::{OptimizedRoute, RouteMetrics, Strategy};
pub use traits::{Driver, Stop, StopKind, TimeWindow, TravelCostOracle};
