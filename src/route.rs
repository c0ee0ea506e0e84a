//! Route request and result types shared by the sequencers.

use serde::Serialize;

use crate::geo::Coordinate;
use crate::oracle::{CostMatrix, LegCost};
use crate::traits::{Stop, TimeWindow};

/// Aggregate cost of an ordered sequence.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct RouteMetrics {
    pub total_distance_meters: f64,
    pub total_duration_seconds: f64,
}

impl RouteMetrics {
    /// Sum of every leg, or `None` if any leg is unavailable.
    pub fn from_legs(legs: &[Option<LegCost>]) -> Option<Self> {
        legs.iter().try_fold(Self::default(), |total, leg| {
            let leg = (*leg)?;
            Some(Self {
                total_distance_meters: total.total_distance_meters + leg.distance_meters,
                total_duration_seconds: total.total_duration_seconds + leg.duration_seconds,
            })
        })
    }
}

/// Which sequencer produced a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Strategy {
    /// No stops; nothing to sequence.
    Trivial,
    Exact,
    Heuristic,
}

/// Stops a sequencer could not order cleanly.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConstraintViolation<Id> {
    /// Stops of loads with more than one pickup or delivery.
    pub malformed_stop_ids: Vec<Id>,
    /// Stops left out because no legal position remained.
    pub unplaced_stop_ids: Vec<Id>,
}

/// An optimized visiting order and its cost.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptimizedRoute<Id> {
    pub stop_ids: Vec<Id>,
    /// Indices into the caller's stop slice, in visiting order.
    pub order: Vec<usize>,
    pub metrics: RouteMetrics,
    pub strategy: Strategy,
    pub constraint_violation: Option<ConstraintViolation<Id>>,
    /// Stops whose estimated arrival is past their window end.
    pub late_stop_ids: Vec<Id>,
}

impl<Id> OptimizedRoute<Id> {
    pub fn empty() -> Self {
        Self {
            stop_ids: Vec::new(),
            order: Vec::new(),
            metrics: RouteMetrics::default(),
            strategy: Strategy::Trivial,
            constraint_violation: None,
            late_stop_ids: Vec::new(),
        }
    }

    /// Every stop placed and no pairing problems.
    pub fn is_complete(&self) -> bool {
        self.constraint_violation.is_none()
    }
}

/// Origin, stops and optional end of one optimization request.
///
/// Point indices used with the oracle: 0 is the origin, `1..=n` the stops,
/// `n + 1` the end when present.
#[derive(Debug)]
pub struct RouteRequest<'a, S> {
    pub origin: Coordinate,
    pub stops: &'a [S],
    pub end: Option<Coordinate>,
}

impl<'a, S: Stop> RouteRequest<'a, S> {
    pub fn new(origin: Coordinate, stops: &'a [S], end: Option<Coordinate>) -> Self {
        Self { origin, stops, end }
    }

    /// All points of the request, in point-index order.
    pub fn points(&self) -> Vec<Coordinate> {
        std::iter::once(self.origin)
            .chain(self.stops.iter().map(Stop::location))
            .chain(self.end)
            .collect()
    }

    /// Points visited by `order`, including origin and end.
    pub fn path(&self, order: &[usize]) -> Vec<Coordinate> {
        std::iter::once(self.origin)
            .chain(order.iter().map(|&i| self.stops[i].location()))
            .chain(self.end)
            .collect()
    }

    pub fn end_point(&self) -> Option<usize> {
        self.end.map(|_| self.stops.len() + 1)
    }

    /// Legs of `order` looked up in a matrix over [`Self::points`].
    pub fn legs_from_matrix(&self, matrix: &CostMatrix, order: &[usize]) -> Vec<Option<LegCost>> {
        let points = std::iter::once(0)
            .chain(order.iter().map(|&i| i + 1))
            .chain(self.end_point())
            .collect::<Vec<_>>();

        points.windows(2).map(|pair| matrix.get(pair[0], pair[1])).collect()
    }

    pub fn result(
        &self,
        order: Vec<usize>,
        metrics: RouteMetrics,
        strategy: Strategy,
        late: &[usize],
    ) -> OptimizedRoute<S::Id> {
        OptimizedRoute {
            stop_ids: self.ids(&order),
            order,
            metrics,
            strategy,
            constraint_violation: None,
            late_stop_ids: self.ids(late),
        }
    }

    pub fn ids(&self, indices: &[usize]) -> Vec<S::Id> {
        indices.iter().map(|&i| self.stops[i].id().clone()).collect()
    }

    pub fn windows(&self) -> Vec<Option<TimeWindow>> {
        self.stops.iter().map(Stop::time_window).collect()
    }
}
