//! Test fixtures for dispatch-planner.
//!
//! Provides:
//! - Real Nevada freight locations
//! - Builders for stops and drivers
//! - Deterministic stub oracles

#![allow(dead_code)]

pub mod nevada_freight_locations;

use std::sync::atomic::{AtomicUsize, Ordering};

use dispatch_planner::oracle::RouteEstimate;
use dispatch_planner::{
    Coordinate, CostMatrix, Driver, LegCost, OracleError, RouteOptions, Stop, StopKind,
    TimeWindow, TravelCostOracle,
};

pub use nevada_freight_locations::*;

// ============================================================================
// Stops and drivers
// ============================================================================

/// Builder for test stops with sensible defaults.
#[derive(Clone, Debug, PartialEq)]
pub struct TestStop {
    pub id: String,
    pub at: Coordinate,
    pub kind: StopKind,
    pub load: Option<String>,
    pub window: Option<TimeWindow>,
}

impl TestStop {
    pub fn pickup(id: &str, load: &str) -> Self {
        Self::new(id, StopKind::Pickup).load(load)
    }

    pub fn delivery(id: &str, load: &str) -> Self {
        Self::new(id, StopKind::Delivery).load(load)
    }

    /// A stop with no load pairing.
    pub fn free(id: &str) -> Self {
        Self::new(id, StopKind::Delivery)
    }

    fn new(id: &str, kind: StopKind) -> Self {
        Self {
            id: id.to_string(),
            at: Coordinate::new(0.0, 0.0),
            kind,
            load: None,
            window: None,
        }
    }

    pub fn at(mut self, lat: f64, lng: f64) -> Self {
        self.at = Coordinate::new(lat, lng);
        self
    }

    pub fn located(mut self, location: &Location) -> Self {
        self.at = location.coordinate();
        self
    }

    pub fn load(mut self, load: &str) -> Self {
        self.load = Some(load.to_string());
        self
    }

    pub fn window(mut self, start: i32, end: i32) -> Self {
        self.window = Some(TimeWindow::new(start, end));
        self
    }
}

impl Stop for TestStop {
    type Id = String;
    type LoadRef = String;

    fn id(&self) -> &String {
        &self.id
    }

    fn location(&self) -> Coordinate {
        self.at
    }

    fn kind(&self) -> StopKind {
        self.kind
    }

    fn load_ref(&self) -> Option<&String> {
        self.load.as_ref()
    }

    fn time_window(&self) -> Option<TimeWindow> {
        self.window
    }
}

/// Ids of `stops` in the order given by `order`.
pub fn ids_in_order(stops: &[TestStop], order: &[usize]) -> Vec<String> {
    order.iter().map(|&i| stops[i].id.clone()).collect()
}

/// Builder for test drivers.
#[derive(Clone, Debug)]
pub struct TestDriver {
    pub id: String,
    pub name: String,
    pub at: Option<Coordinate>,
    pub available: bool,
}

impl TestDriver {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            name: format!("Driver {}", id),
            at: None,
            available: true,
        }
    }

    pub fn at(mut self, lat: f64, lng: f64) -> Self {
        self.at = Some(Coordinate::new(lat, lng));
        self
    }

    pub fn located(mut self, location: &Location) -> Self {
        self.at = Some(location.coordinate());
        self
    }

    pub fn off_duty(mut self) -> Self {
        self.available = false;
        self
    }
}

impl Driver for TestDriver {
    type Id = String;

    fn id(&self) -> &String {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn location(&self) -> Option<Coordinate> {
        self.at
    }

    fn is_available(&self) -> bool {
        self.available
    }
}

// ============================================================================
// Oracles
// ============================================================================

/// Roughly one degree of latitude.
pub const METERS_PER_DEGREE: f64 = 111_195.0;

/// Straight lines on a flat plane at 10 m/s. Deterministic and cheap.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlanarOracle;

impl PlanarOracle {
    pub fn leg(a: Coordinate, b: Coordinate) -> LegCost {
        let meters = (a.lat - b.lat).hypot(a.lng - b.lng) * METERS_PER_DEGREE;
        LegCost::new(meters, meters / 10.0)
    }
}

impl TravelCostOracle for PlanarOracle {
    fn route(
        &self,
        origin: Coordinate,
        destination: Coordinate,
        _options: &RouteOptions,
    ) -> Result<Option<RouteEstimate>, OracleError> {
        let leg = Self::leg(origin, destination);
        Ok(Some(RouteEstimate {
            distance_meters: leg.distance_meters,
            duration_seconds: leg.duration_seconds,
            duration_in_traffic_seconds: None,
        }))
    }

    fn distance_matrix(
        &self,
        origins: &[Coordinate],
        destinations: &[Coordinate],
        _options: &RouteOptions,
    ) -> Result<CostMatrix, OracleError> {
        let rows = origins
            .iter()
            .map(|&a| destinations.iter().map(|&b| Some(Self::leg(a, b))).collect())
            .collect();
        Ok(CostMatrix::new(rows))
    }
}

/// Answers every call but can price no pair.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRoadsOracle;

impl TravelCostOracle for NoRoadsOracle {
    fn route(
        &self,
        _origin: Coordinate,
        _destination: Coordinate,
        _options: &RouteOptions,
    ) -> Result<Option<RouteEstimate>, OracleError> {
        Ok(None)
    }

    fn distance_matrix(
        &self,
        origins: &[Coordinate],
        destinations: &[Coordinate],
        _options: &RouteOptions,
    ) -> Result<CostMatrix, OracleError> {
        Ok(CostMatrix::unavailable(origins.len(), destinations.len()))
    }
}

/// Fails every call.
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineOracle;

impl TravelCostOracle for OfflineOracle {
    fn route(
        &self,
        _origin: Coordinate,
        _destination: Coordinate,
        _options: &RouteOptions,
    ) -> Result<Option<RouteEstimate>, OracleError> {
        Err(OracleError::Unreachable("offline".to_string()))
    }

    fn distance_matrix(
        &self,
        _origins: &[Coordinate],
        _destinations: &[Coordinate],
        _options: &RouteOptions,
    ) -> Result<CostMatrix, OracleError> {
        Err(OracleError::Unreachable("offline".to_string()))
    }
}

/// Counts calls made to the wrapped oracle.
#[derive(Debug, Default)]
pub struct CountingOracle<O> {
    inner: O,
    matrix_calls: AtomicUsize,
    route_calls: AtomicUsize,
}

impl<O> CountingOracle<O> {
    pub fn new(inner: O) -> Self {
        Self {
            inner,
            matrix_calls: AtomicUsize::new(0),
            route_calls: AtomicUsize::new(0),
        }
    }

    pub fn matrix_calls(&self) -> usize {
        self.matrix_calls.load(Ordering::SeqCst)
    }

    pub fn route_calls(&self) -> usize {
        self.route_calls.load(Ordering::SeqCst)
    }
}

impl<O: TravelCostOracle> TravelCostOracle for CountingOracle<O> {
    fn route(
        &self,
        origin: Coordinate,
        destination: Coordinate,
        options: &RouteOptions,
    ) -> Result<Option<RouteEstimate>, OracleError> {
        self.route_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.route(origin, destination, options)
    }

    fn distance_matrix(
        &self,
        origins: &[Coordinate],
        destinations: &[Coordinate],
        options: &RouteOptions,
    ) -> Result<CostMatrix, OracleError> {
        self.matrix_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.distance_matrix(origins, destinations, options)
    }
}

// ============================================================================
// Brute force reference
// ============================================================================

/// Every permutation of `0..n`.
pub fn permutations(n: usize) -> Vec<Vec<usize>> {
    fn extend(prefix: &mut Vec<usize>, used: &mut Vec<bool>, out: &mut Vec<Vec<usize>>) {
        if prefix.len() == used.len() {
            out.push(prefix.clone());
            return;
        }
        for i in 0..used.len() {
            if used[i] {
                continue;
            }
            used[i] = true;
            prefix.push(i);
            extend(prefix, used, out);
            prefix.pop();
            used[i] = false;
        }
    }

    let mut out = Vec::new();
    extend(&mut Vec::with_capacity(n), &mut vec![false; n], &mut out);
    out
}

/// Planar length of origin -> stops in `order` -> optional end.
pub fn planar_length(
    origin: Coordinate,
    stops: &[TestStop],
    order: &[usize],
    end: Option<Coordinate>,
) -> f64 {
    let path = std::iter::once(origin)
        .chain(order.iter().map(|&i| stops[i].at))
        .chain(end)
        .collect::<Vec<_>>();
    path.windows(2)
        .map(|pair| PlanarOracle::leg(pair[0], pair[1]).distance_meters)
        .sum()
}
