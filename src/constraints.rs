//! Route feasibility checks: pickup-before-delivery precedence, load pairing
//! and arrival windows.

use std::collections::{HashMap, HashSet};

use crate::traits::{Stop, StopKind, TimeWindow};

/// True when no pickup in `sequence` follows a delivery of the same load.
///
/// Stops without a load ref never invalidate a sequence.
pub fn respects_precedence<'a, S>(sequence: impl IntoIterator<Item = &'a S>) -> bool
where
    S: Stop + 'a,
{
    let mut delivered: HashSet<&S::LoadRef> = HashSet::new();

    for stop in sequence {
        let Some(load) = stop.load_ref() else {
            continue;
        };
        match stop.kind() {
            StopKind::Delivery => {
                delivered.insert(load);
            }
            StopKind::Pickup => {
                if delivered.contains(load) {
                    return false;
                }
            }
        }
    }

    true
}

/// Indices of stops whose load has more than one pickup or more than one delivery.
///
/// A load with only a pickup or only a delivery in the request is fine; the
/// other half may belong to another route.
pub fn check_pairing<S: Stop>(stops: &[S]) -> Vec<usize> {
    let mut counts: HashMap<&S::LoadRef, (usize, usize)> = HashMap::new();
    for stop in stops {
        if let Some(load) = stop.load_ref() {
            let entry = counts.entry(load).or_default();
            match stop.kind() {
                StopKind::Pickup => entry.0 += 1,
                StopKind::Delivery => entry.1 += 1,
            }
        }
    }

    stops
        .iter()
        .enumerate()
        .filter(|(_, stop)| {
            stop.load_ref()
                .and_then(|load| counts.get(load))
                .is_some_and(|&(pickups, deliveries)| pickups > 1 || deliveries > 1)
        })
        .map(|(i, _)| i)
        .collect()
}

/// Precomputed load groups for checking orders expressed as stop indices.
#[derive(Debug, Clone)]
pub struct PrecedenceIndex {
    kinds: Vec<StopKind>,
    groups: Vec<Option<usize>>,
    pickups_per_group: Vec<usize>,
}

impl PrecedenceIndex {
    pub fn new<S: Stop>(stops: &[S]) -> Self {
        let mut group_of: HashMap<&S::LoadRef, usize> = HashMap::new();
        let mut pickups_per_group = Vec::new();
        let mut groups = Vec::with_capacity(stops.len());

        for stop in stops {
            let group = stop.load_ref().map(|load| {
                *group_of.entry(load).or_insert_with(|| {
                    pickups_per_group.push(0);
                    pickups_per_group.len() - 1
                })
            });
            if let (Some(group), StopKind::Pickup) = (group, stop.kind()) {
                pickups_per_group[group] += 1;
            }
            groups.push(group);
        }

        Self {
            kinds: stops.iter().map(Stop::kind).collect(),
            groups,
            pickups_per_group,
        }
    }

    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }

    /// Index-based equivalent of [`respects_precedence`].
    pub fn respects(&self, order: &[usize]) -> bool {
        let mut delivered = vec![false; self.pickups_per_group.len()];
        for &stop in order {
            let Some(group) = self.groups[stop] else {
                continue;
            };
            match self.kinds[stop] {
                StopKind::Delivery => delivered[group] = true,
                StopKind::Pickup if delivered[group] => return false,
                StopKind::Pickup => {}
            }
        }
        true
    }

    /// Incremental state for building a route one stop at a time.
    pub fn tracker(&self) -> PrecedenceTracker<'_> {
        PrecedenceTracker {
            index: self,
            pickups_placed: vec![0; self.pickups_per_group.len()],
            delivered: vec![false; self.pickups_per_group.len()],
        }
    }
}

/// Tracks which pickups and deliveries have been placed so far.
#[derive(Debug, Clone)]
pub struct PrecedenceTracker<'a> {
    index: &'a PrecedenceIndex,
    pickups_placed: Vec<usize>,
    delivered: Vec<bool>,
}

impl PrecedenceTracker<'_> {
    /// Whether `stop` may be appended next.
    ///
    /// A pickup is legal unless its load was already delivered. A delivery is
    /// legal once every pickup of its load in the request has been placed, so
    /// a greedy walk never strands a pickup behind its delivery.
    pub fn can_visit(&self, stop: usize) -> bool {
        let Some(group) = self.index.groups[stop] else {
            return true;
        };
        match self.index.kinds[stop] {
            StopKind::Pickup => !self.delivered[group],
            StopKind::Delivery => self.pickups_placed[group] == self.index.pickups_per_group[group],
        }
    }

    pub fn place(&mut self, stop: usize) {
        let Some(group) = self.index.groups[stop] else {
            return;
        };
        match self.index.kinds[stop] {
            StopKind::Pickup => self.pickups_placed[group] += 1,
            StopKind::Delivery => self.delivered[group] = true,
        }
    }
}

/// Stops in `order` reached after their window closes.
///
/// `leg_durations[k]` is the travel time into `order[k]`. Arriving before a
/// window opens waits for it.
pub fn late_arrivals(
    windows: &[Option<TimeWindow>],
    order: &[usize],
    leg_durations: &[f64],
) -> Vec<usize> {
    let mut time = 0.0;
    let mut late = Vec::new();

    for (&stop, &travel) in order.iter().zip(leg_durations) {
        time += travel;
        if let Some(window) = windows[stop] {
            if time < f64::from(window.start) {
                time = f64::from(window.start);
            }
            if time > f64::from(window.end) {
                late.push(stop);
            }
        }
    }

    late
}
