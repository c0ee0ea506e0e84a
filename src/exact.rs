//! Exact sequencing by permutation enumeration.
//!
//! Factorial in the stop count, which is why the optimizer only routes small
//! requests here (see [`OptimizerConfig::exact_ceiling`]).

use std::cmp::Ordering;

use rayon::prelude::*;
use tracing::{debug, warn};

use crate::constraints::{check_pairing, late_arrivals, PrecedenceIndex};
use crate::optimizer::{OptimizeError, OptimizerConfig};
use crate::oracle::CostMatrix;
use crate::route::{ConstraintViolation, OptimizedRoute, RouteMetrics, RouteRequest, Strategy};
use crate::traits::{Stop, TimeWindow, TravelCostOracle};

/// Lowest-distance precedence-valid order of `request.stops`.
///
/// Prices every permutation from a single batched matrix call. Ties go to the
/// permutation that comes first lexicographically. Loads with duplicated
/// pickups or deliveries are still sequenced and reported in
/// [`OptimizedRoute::constraint_violation`].
pub fn sequence_exact<S, O>(
    oracle: &O,
    request: &RouteRequest<'_, S>,
    config: &OptimizerConfig,
) -> Result<OptimizedRoute<S::Id>, OptimizeError>
where
    S: Stop + Sync,
    O: TravelCostOracle + ?Sized,
{
    if request.stops.is_empty() {
        return Ok(OptimizedRoute::empty());
    }

    let points = request.points();
    let matrix = oracle.distance_matrix(&points, &points, &config.route_options)?;

    let search = Search {
        request,
        matrix: &matrix,
        precedence: PrecedenceIndex::new(request.stops),
        windows: request.windows(),
        enforce_windows: config.enforce_time_windows,
    };

    let n = request.stops.len();
    let outcome = (0..n)
        .into_par_iter()
        .map(|first| search.run_from(first))
        .reduce(Outcome::default, Outcome::merge);

    debug!(
        stops = n,
        valid = outcome.valid,
        priced = outcome.priced,
        feasible = outcome.feasible,
        "exact search finished"
    );

    let malformed = check_pairing(request.stops);
    let Some(best) = outcome.best else {
        return Err(if outcome.valid == 0 {
            OptimizeError::NoValidSequence { malformed }
        } else if outcome.priced == 0 {
            OptimizeError::Unpriceable
        } else {
            OptimizeError::NoFeasibleSchedule
        });
    };

    let late = search.late(&best.order);
    let mut route = request.result(best.order, best.metrics, Strategy::Exact, &late);
    if !malformed.is_empty() {
        warn!(stops = malformed.len(), "exact route includes malformed load pairing");
        route.constraint_violation = Some(ConstraintViolation {
            malformed_stop_ids: request.ids(&malformed),
            unplaced_stop_ids: Vec::new(),
        });
    }
    Ok(route)
}

struct Search<'a, 'r, S> {
    request: &'a RouteRequest<'r, S>,
    matrix: &'a CostMatrix,
    precedence: PrecedenceIndex,
    windows: Vec<Option<TimeWindow>>,
    enforce_windows: bool,
}

impl<S: Stop + Sync> Search<'_, '_, S> {
    /// Every permutation starting with `first`, in lexicographic order.
    fn run_from(&self, first: usize) -> Outcome {
        let n = self.request.stops.len();
        let mut order = Vec::with_capacity(n);
        order.push(first);
        order.extend((0..n).filter(|&i| i != first));

        let mut outcome = Outcome::default();
        let mut rank = 0usize;
        loop {
            if self.precedence.respects(&order) {
                outcome.valid += 1;
                self.evaluate(&order, (first, rank), &mut outcome);
            }
            rank += 1;
            if !next_permutation(&mut order[1..]) {
                break;
            }
        }
        outcome
    }

    fn evaluate(&self, order: &[usize], rank: (usize, usize), outcome: &mut Outcome) {
        let legs = self.request.legs_from_matrix(self.matrix, order);
        let Some(metrics) = RouteMetrics::from_legs(&legs) else {
            return;
        };
        outcome.priced += 1;

        if self.enforce_windows && !self.late(order).is_empty() {
            return;
        }
        outcome.feasible += 1;

        let candidate = Candidate {
            order: order.to_vec(),
            metrics,
            rank,
        };
        outcome.offer(candidate);
    }

    fn late(&self, order: &[usize]) -> Vec<usize> {
        if self.windows.iter().all(Option::is_none) {
            return Vec::new();
        }
        let durations = self
            .request
            .legs_from_matrix(self.matrix, order)
            .iter()
            .take(order.len())
            .map(|leg| leg.map_or(0.0, |leg| leg.duration_seconds))
            .collect::<Vec<_>>();
        late_arrivals(&self.windows, order, &durations)
    }
}

#[derive(Debug, Clone)]
struct Candidate {
    order: Vec<usize>,
    metrics: RouteMetrics,
    /// (first stop, position among permutations starting with it).
    rank: (usize, usize),
}

impl Candidate {
    fn cmp_cost(&self, other: &Self) -> Ordering {
        self.metrics
            .total_distance_meters
            .total_cmp(&other.metrics.total_distance_meters)
            .then(self.rank.cmp(&other.rank))
    }
}

#[derive(Debug, Default)]
struct Outcome {
    best: Option<Candidate>,
    valid: usize,
    priced: usize,
    feasible: usize,
}

impl Outcome {
    fn offer(&mut self, candidate: Candidate) {
        match &self.best {
            Some(best) if best.cmp_cost(&candidate) != Ordering::Greater => {}
            _ => self.best = Some(candidate),
        }
    }

    fn merge(mut self, other: Self) -> Self {
        self.valid += other.valid;
        self.priced += other.priced;
        self.feasible += other.feasible;
        if let Some(candidate) = other.best {
            self.offer(candidate);
        }
        self
    }
}

/// Advance `items` to the next lexicographic permutation.
///
/// Returns false (leaving `items` unchanged) once the last permutation is reached.
fn next_permutation(items: &mut [usize]) -> bool {
    if items.len() < 2 {
        return false;
    }

    let Some(pivot) = (0..items.len() - 1).rev().find(|&i| items[i] < items[i + 1]) else {
        return false;
    };
    let Some(successor) = (pivot + 1..items.len()).rev().find(|&j| items[j] > items[pivot]) else {
        return false;
    };

    items.swap(pivot, successor);
    items[pivot + 1..].reverse();
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_permutation_enumerates_all() {
        let mut items = vec![0, 1, 2, 3];
        let mut count = 1;
        while next_permutation(&mut items) {
            count += 1;
        }
        assert_eq!(count, 24);
        assert_eq!(items, vec![3, 2, 1, 0]);
    }

    #[test]
    fn test_next_permutation_is_lexicographic() {
        let mut items = vec![1, 2, 3];
        let mut seen = vec![items.clone()];
        while next_permutation(&mut items) {
            seen.push(items.clone());
        }
        assert_eq!(
            seen,
            vec![
                vec![1, 2, 3],
                vec![1, 3, 2],
                vec![2, 1, 3],
                vec![2, 3, 1],
                vec![3, 1, 2],
                vec![3, 2, 1],
            ]
        );
    }

    #[test]
    fn test_next_permutation_trivial_lengths() {
        assert!(!next_permutation(&mut []));
        assert!(!next_permutation(&mut [7]));
    }

    #[test]
    fn test_ties_go_to_earliest_permutation() {
        let metrics = RouteMetrics {
            total_distance_meters: 10.0,
            total_duration_seconds: 1.0,
        };
        let mut outcome = Outcome::default();
        outcome.offer(Candidate { order: vec![1, 0], metrics, rank: (1, 0) });
        outcome.offer(Candidate { order: vec![0, 1], metrics, rank: (0, 0) });
        outcome.offer(Candidate { order: vec![0, 1], metrics, rank: (0, 3) });

        assert_eq!(outcome.best.unwrap().rank, (0, 0));
    }

    #[test]
    fn test_merge_keeps_cheaper_candidate() {
        let cheap = RouteMetrics {
            total_distance_meters: 5.0,
            total_duration_seconds: 1.0,
        };
        let dear = RouteMetrics {
            total_distance_meters: 9.0,
            total_duration_seconds: 1.0,
        };
        let mut left = Outcome::default();
        left.valid = 4;
        left.priced = 2;
        left.offer(Candidate { order: vec![0, 1], metrics: dear, rank: (0, 0) });
        let mut right = Outcome::default();
        right.valid = 3;
        right.priced = 3;
        right.offer(Candidate { order: vec![1, 0], metrics: cheap, rank: (1, 0) });

        let merged = left.merge(right);
        assert_eq!(merged.valid, 7);
        assert_eq!(merged.priced, 5);
        assert_eq!(merged.best.unwrap().order, vec![1, 0]);
    }
}
