//! Nearest-neighbor sequencing with precedence filtering.
//!
//! Candidates are compared by great-circle distance to keep the walk O(n²)
//! without oracle calls; only the finished route is priced by the oracle.

use tracing::{debug, warn};

use crate::constraints::{check_pairing, late_arrivals, PrecedenceIndex};
use crate::geo::great_circle_meters;
use crate::optimizer::{OptimizeError, OptimizerConfig};
use crate::route::{ConstraintViolation, OptimizedRoute, RouteMetrics, RouteRequest, Strategy};
use crate::traits::{Stop, TravelCostOracle};

/// Greedy route from the origin, always moving to the closest legal stop.
///
/// Malformed load pairings and stops that could not be placed are reported in
/// [`OptimizedRoute::constraint_violation`] rather than dropped silently.
pub fn sequence_heuristic<S, O>(
    oracle: &O,
    request: &RouteRequest<'_, S>,
    config: &OptimizerConfig,
) -> Result<OptimizedRoute<S::Id>, OptimizeError>
where
    S: Stop,
    O: TravelCostOracle + ?Sized,
{
    let stops = request.stops;
    if stops.is_empty() {
        return Ok(OptimizedRoute::empty());
    }

    let (order, unplaced) = nearest_neighbor_order(request);
    debug!(placed = order.len(), unplaced = unplaced.len(), "nearest-neighbor walk finished");

    let path = request.path(&order);
    let legs = oracle.leg_costs(&path, &config.route_options)?;
    let Some(metrics) = RouteMetrics::from_legs(&legs) else {
        warn!(legs = legs.len(), "oracle could not price the heuristic route");
        return Err(OptimizeError::Unpriceable);
    };

    let durations = legs
        .iter()
        .take(order.len())
        .map(|leg| leg.map_or(0.0, |leg| leg.duration_seconds))
        .collect::<Vec<_>>();
    let late = late_arrivals(&request.windows(), &order, &durations);

    let malformed = check_pairing(stops);
    let mut route = request.result(order, metrics, Strategy::Heuristic, &late);
    if !malformed.is_empty() || !unplaced.is_empty() {
        warn!(
            malformed = malformed.len(),
            unplaced = unplaced.len(),
            "heuristic route violates load constraints"
        );
        route.constraint_violation = Some(ConstraintViolation {
            malformed_stop_ids: request.ids(&malformed),
            unplaced_stop_ids: request.ids(&unplaced),
        });
    }

    Ok(route)
}

/// Visiting order and the stops left over when no legal candidate remained.
///
/// Ties on distance go to the stop listed first by the caller.
fn nearest_neighbor_order<S: Stop>(request: &RouteRequest<'_, S>) -> (Vec<usize>, Vec<usize>) {
    let stops = request.stops;
    let precedence = PrecedenceIndex::new(stops);
    let mut tracker = precedence.tracker();

    let mut unvisited = (0..stops.len()).collect::<Vec<_>>();
    let mut order = Vec::with_capacity(stops.len());
    let mut current = request.origin;

    while !unvisited.is_empty() {
        let nearest = unvisited
            .iter()
            .enumerate()
            .filter(|&(_, &stop)| tracker.can_visit(stop))
            .map(|(slot, &stop)| (slot, great_circle_meters(current, stops[stop].location())))
            .min_by(|a, b| a.1.total_cmp(&b.1));

        let Some((slot, _)) = nearest else {
            break;
        };

        let stop = unvisited.remove(slot);
        tracker.place(stop);
        order.push(stop);
        current = stops[stop].location();
    }

    (order, unvisited)
}
