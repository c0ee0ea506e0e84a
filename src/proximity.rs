//! Driver-to-load proximity scoring.
//!
//! `score = miles + hours * time_weight`; lower is a better match.

use std::collections::{HashMap, HashSet};

use tracing::{debug, instrument, warn};

use crate::geo::{Coordinate, DistanceUnit};
use crate::oracle::{LegCost, RouteOptions};
use crate::traits::{Driver, Id, TravelCostOracle};

/// Hours of driving weighted like 30 miles, i.e. time is priced as if the
/// average speed were 30 mph.
pub const DEFAULT_TIME_WEIGHT: f64 = 30.0;

#[derive(Debug, Clone)]
pub struct ScoringConfig {
    /// Miles-equivalent penalty per hour of driving.
    pub time_weight: f64,
    pub route_options: RouteOptions,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            time_weight: DEFAULT_TIME_WEIGHT,
            route_options: RouteOptions::default(),
        }
    }
}

/// Driver id -> load id -> score. A missing entry means "could not be
/// scored", not "infinitely far".
pub type ScoreTable<D, L> = HashMap<D, HashMap<L, f64>>;

/// One driver/load pairing chosen by [`assign_greedy`].
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment<D, L> {
    pub driver_id: D,
    pub load_id: L,
    pub score: f64,
}

#[derive(Debug, Clone)]
pub struct ProximityScorer<O> {
    oracle: O,
    config: ScoringConfig,
}

impl<O: TravelCostOracle> ProximityScorer<O> {
    pub fn new(oracle: O) -> Self {
        Self::with_config(oracle, ScoringConfig::default())
    }

    pub fn with_config(oracle: O, config: ScoringConfig) -> Self {
        Self { oracle, config }
    }

    pub fn score(&self, leg: LegCost) -> f64 {
        let miles = DistanceUnit::Miles.from_meters(leg.distance_meters);
        let hours = leg.duration_seconds / 3600.0;
        miles + hours * self.config.time_weight
    }

    /// Score every located driver against every load pickup.
    ///
    /// Issues one batched oracle call per located driver. Drivers without a
    /// location, or whose call fails outright, get no entry.
    #[instrument(skip_all, fields(drivers = drivers.len(), loads = loads.len()))]
    pub fn score_driver_load_pairs<D, L>(
        &self,
        drivers: &[D],
        loads: &[(L, Coordinate)],
    ) -> ScoreTable<D::Id, L>
    where
        D: Driver,
        L: Id,
    {
        let mut table = HashMap::new();
        if loads.is_empty() {
            return table;
        }
        let pickups = loads.iter().map(|(_, at)| *at).collect::<Vec<_>>();

        for driver in drivers {
            let Some(origin) = driver.location() else {
                debug!(driver = driver.name(), "driver has no known location, skipping");
                continue;
            };

            let matrix = match self
                .oracle
                .distance_matrix(&[origin], &pickups, &self.config.route_options)
            {
                Ok(matrix) => matrix,
                Err(err) => {
                    warn!(driver = driver.name(), error = %err, "could not score driver");
                    continue;
                }
            };

            let scores = loads
                .iter()
                .enumerate()
                .filter_map(|(j, (load_id, _))| {
                    matrix.get(0, j).map(|leg| (load_id.clone(), self.score(leg)))
                })
                .collect::<HashMap<_, _>>();
            table.insert(driver.id().clone(), scores);
        }

        table
    }
}

/// Available drivers able to reach `load_id`, best first.
///
/// Ties keep the order of `drivers`.
pub fn rank_drivers_for_load<'d, D, L>(
    drivers: &'d [D],
    table: &ScoreTable<D::Id, L>,
    load_id: &L,
) -> Vec<(&'d D, f64)>
where
    D: Driver,
    L: Id,
{
    let mut ranked = drivers
        .iter()
        .filter(|driver| driver.is_available())
        .filter_map(|driver| {
            table
                .get(driver.id())
                .and_then(|scores| scores.get(load_id))
                .map(|&score| (driver, score))
        })
        .collect::<Vec<_>>();

    ranked.sort_by(|a, b| a.1.total_cmp(&b.1));
    ranked
}

/// One-to-one matching by repeatedly taking the lowest remaining score.
///
/// Only available drivers are matched. Ties prefer the earlier driver in
/// `drivers`, then the earlier load in `load_ids`.
pub fn assign_greedy<D, L>(
    drivers: &[D],
    load_ids: &[L],
    table: &ScoreTable<D::Id, L>,
) -> Vec<Assignment<D::Id, L>>
where
    D: Driver,
    L: Id,
{
    let mut candidates = Vec::new();
    for (d, driver) in drivers.iter().enumerate() {
        if !driver.is_available() {
            continue;
        }
        let Some(scores) = table.get(driver.id()) else {
            continue;
        };
        for (l, load_id) in load_ids.iter().enumerate() {
            if let Some(&score) = scores.get(load_id) {
                candidates.push((score, d, l));
            }
        }
    }

    candidates.sort_by(|a, b| {
        a.0.total_cmp(&b.0)
            .then_with(|| a.1.cmp(&b.1))
            .then_with(|| a.2.cmp(&b.2))
    });

    let mut used_drivers = HashSet::new();
    let mut used_loads = HashSet::new();
    let mut assignments = Vec::new();
    for (score, d, l) in candidates {
        if used_drivers.contains(&d) || used_loads.contains(&l) {
            continue;
        }
        used_drivers.insert(d);
        used_loads.insert(l);
        assignments.push(Assignment {
            driver_id: drivers[d].id().clone(),
            load_id: load_ids[l].clone(),
            score,
        });
    }

    assignments
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::haversine::HaversineOracle;

    #[derive(Debug)]
    struct Trucker {
        id: u32,
        at: Option<Coordinate>,
        available: bool,
    }

    impl Driver for Trucker {
        type Id = u32;

        fn id(&self) -> &u32 {
            &self.id
        }

        fn name(&self) -> &str {
            "trucker"
        }

        fn location(&self) -> Option<Coordinate> {
            self.at
        }

        fn is_available(&self) -> bool {
            self.available
        }
    }

    fn trucker(id: u32, lng: f64) -> Trucker {
        Trucker {
            id,
            at: Some(Coordinate::new(0.0, lng)),
            available: true,
        }
    }

    #[test]
    fn test_score_formula() {
        let scorer = ProximityScorer::new(HaversineOracle::default());
        // 1 mile in half an hour: 1 + 0.5 * 30
        let score = scorer.score(LegCost::new(1_609.344, 1_800.0));
        assert!((score - 16.0).abs() < 1e-9);
    }

    #[test]
    fn test_custom_time_weight() {
        let config = ScoringConfig {
            time_weight: 0.0,
            ..ScoringConfig::default()
        };
        let scorer = ProximityScorer::with_config(HaversineOracle::default(), config);
        let score = scorer.score(LegCost::new(16_093.44, 3_600.0));
        assert!((score - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_closer_driver_scores_lower() {
        let scorer = ProximityScorer::new(HaversineOracle::default());
        let drivers = vec![trucker(1, 0.5), trucker(2, 0.1)];
        let loads = vec![("L1", Coordinate::new(0.0, 0.0))];

        let table = scorer.score_driver_load_pairs(&drivers, &loads);
        assert!(table[&2]["L1"] < table[&1]["L1"]);

        let ranked = rank_drivers_for_load(&drivers, &table, &"L1");
        assert_eq!(ranked.iter().map(|(d, _)| d.id).collect::<Vec<_>>(), vec![2, 1]);
    }

    #[test]
    fn test_ranking_skips_unavailable_drivers() {
        let scorer = ProximityScorer::new(HaversineOracle::default());
        let mut busy = trucker(1, 0.0);
        busy.available = false;
        let drivers = vec![busy, trucker(2, 0.3)];
        let loads = vec![("L1", Coordinate::new(0.0, 0.0))];

        let table = scorer.score_driver_load_pairs(&drivers, &loads);
        assert!(table.contains_key(&1), "scores cover every located driver");

        let ranked = rank_drivers_for_load(&drivers, &table, &"L1");
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].0.id, 2);
    }

    #[test]
    fn test_greedy_assignment_is_one_to_one() {
        let drivers = vec![trucker(1, 0.0), trucker(2, 0.0)];
        let mut table: ScoreTable<u32, &str> = HashMap::new();
        table.insert(1, HashMap::from([("A", 1.0), ("B", 2.0)]));
        table.insert(2, HashMap::from([("A", 1.5), ("B", 9.0)]));

        let assignments = assign_greedy(&drivers, &["A", "B"], &table);
        assert_eq!(
            assignments,
            vec![
                Assignment { driver_id: 1, load_id: "A", score: 1.0 },
                Assignment { driver_id: 2, load_id: "B", score: 9.0 },
            ]
        );
    }
}
