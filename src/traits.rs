//! Core domain traits for the dispatch planner.
//!
//! Host applications implement these for their own stop, driver and
//! routing-service types.

use std::hash::Hash;

use crate::geo::Coordinate;
use crate::oracle::{CostMatrix, LegCost, OracleError, RouteEstimate, RouteOptions};

/// Unique identifier for planner entities.
pub trait Id: Clone + Eq + Hash {}

impl<T> Id for T where T: Clone + Eq + Hash {}

/// Whether a stop loads or unloads freight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StopKind {
    Pickup,
    Delivery,
}

/// Window during which a stop should be reached.
///
/// Seconds relative to departure from the route origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: i32,
    pub end: i32,
}

impl TimeWindow {
    pub const fn new(start: i32, end: i32) -> Self {
        Self { start, end }
    }
}

/// One physical visit in a route.
pub trait Stop {
    type Id: Id;
    type LoadRef: Id;

    /// Caller-assigned id, unique within one optimization call.
    fn id(&self) -> &Self::Id;

    fn location(&self) -> Coordinate;

    fn kind(&self) -> StopKind;

    /// Shipment this stop belongs to. Couples a pickup to its delivery.
    fn load_ref(&self) -> Option<&Self::LoadRef>;

    /// Arrival window. Advisory unless the optimizer enforces windows.
    fn time_window(&self) -> Option<TimeWindow> {
        None
    }
}

/// A driver that can be matched to loads.
pub trait Driver {
    type Id: Id;

    fn id(&self) -> &Self::Id;

    fn name(&self) -> &str;

    /// Last known position. Drivers without one cannot be scored.
    fn location(&self) -> Option<Coordinate>;

    fn is_available(&self) -> bool;
}

/// Real-world travel cost between coordinates.
///
/// Pairs the service cannot price are reported per pair (`None`), while
/// `Err` means the whole call produced no data.
pub trait TravelCostOracle {
    /// Best route between two points.
    fn route(
        &self,
        origin: Coordinate,
        destination: Coordinate,
        options: &RouteOptions,
    ) -> Result<Option<RouteEstimate>, OracleError>;

    /// Cost of every origin/destination pair, addressed `[i][j]`.
    fn distance_matrix(
        &self,
        origins: &[Coordinate],
        destinations: &[Coordinate],
        options: &RouteOptions,
    ) -> Result<CostMatrix, OracleError>;

    /// Cost of each consecutive leg along `waypoints`.
    ///
    /// Returns `waypoints.len() - 1` entries (none for fewer than two points).
    fn leg_costs(
        &self,
        waypoints: &[Coordinate],
        options: &RouteOptions,
    ) -> Result<Vec<Option<LegCost>>, OracleError> {
        waypoints
            .windows(2)
            .map(|pair| {
                self.route(pair[0], pair[1], options)
                    .map(|estimate| estimate.map(LegCost::from))
            })
            .collect()
    }
}

impl<T: TravelCostOracle + ?Sized> TravelCostOracle for &T {
    fn route(
        &self,
        origin: Coordinate,
        destination: Coordinate,
        options: &RouteOptions,
    ) -> Result<Option<RouteEstimate>, OracleError> {
        (**self).route(origin, destination, options)
    }

    fn distance_matrix(
        &self,
        origins: &[Coordinate],
        destinations: &[Coordinate],
        options: &RouteOptions,
    ) -> Result<CostMatrix, OracleError> {
        (**self).distance_matrix(origins, destinations, options)
    }

    fn leg_costs(
        &self,
        waypoints: &[Coordinate],
        options: &RouteOptions,
    ) -> Result<Vec<Option<LegCost>>, OracleError> {
        (**self).leg_costs(waypoints, options)
    }
}

/// Spaces out calls to an external service.
///
/// Called once before every network request an oracle issues.
pub trait Pacer {
    fn pace(&self);
}
