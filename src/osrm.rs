//! OSRM HTTP adapter for travel costs.

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::geo::Coordinate;
use crate::oracle::{CostMatrix, LegCost, OracleError, RouteEstimate, RouteOptions};
use crate::pacing::NoPacing;
use crate::traits::{Pacer, TravelCostOracle};

#[derive(Debug, Clone)]
pub struct OsrmConfig {
    pub base_url: String,
    pub profile: String,
    pub timeout_secs: u64,
}

impl Default for OsrmConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000".to_string(),
            profile: "car".to_string(),
            timeout_secs: 10,
        }
    }
}

impl OsrmConfig {
    /// Defaults overridden by `OSRM_BASE_URL`, `OSRM_PROFILE` and `OSRM_TIMEOUT_SECS`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for the `OSRM_*` keys.
    /// Unparseable timeouts keep the default.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(base_url) = lookup("OSRM_BASE_URL") {
            config.base_url = base_url.trim_end_matches('/').to_string();
        }
        if let Some(profile) = lookup("OSRM_PROFILE") {
            config.profile = profile;
        }
        if let Some(timeout) = lookup("OSRM_TIMEOUT_SECS").and_then(|value| value.parse().ok()) {
            config.timeout_secs = timeout;
        }
        config
    }
}

/// Travel-cost oracle backed by an `osrm-routed` instance.
///
/// OSRM has no traffic model, so departure time and traffic model options
/// are ignored and `duration_in_traffic_seconds` is never set.
#[derive(Debug, Clone)]
pub struct OsrmClient<P = NoPacing> {
    config: OsrmConfig,
    client: reqwest::blocking::Client,
    pacer: P,
}

impl OsrmClient<NoPacing> {
    pub fn new(config: OsrmConfig) -> Result<Self, reqwest::Error> {
        Self::with_pacer(config, NoPacing)
    }
}

impl<P: Pacer> OsrmClient<P> {
    pub fn with_pacer(config: OsrmConfig, pacer: P) -> Result<Self, reqwest::Error> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            config,
            client,
            pacer,
        })
    }

    pub fn config(&self) -> &OsrmConfig {
        &self.config
    }

    fn service_url(&self, service: &str, coordinates: &[Coordinate]) -> String {
        let coords = coordinates
            .iter()
            .map(|c| format!("{:.6},{:.6}", c.lng, c.lat))
            .collect::<Vec<_>>()
            .join(";");

        format!(
            "{}/{}/v1/{}/{}",
            self.config.base_url, service, self.config.profile, coords
        )
    }

    /// Issue one request. OSRM reports failures in the JSON body, usually with a 400 status.
    fn fetch<T>(&self, url: String, query: &[(&str, String)]) -> Result<OsrmResponse<T>, OracleError>
    where
        T: DeserializeOwned,
    {
        self.pacer.pace();
        debug!(url = %url, "osrm request");

        let response = self
            .client
            .get(url)
            .query(query)
            .send()
            .map_err(|err| OracleError::Unreachable(err.to_string()))?;

        let status = response.status();
        if status.is_server_error() {
            return Err(OracleError::Unreachable(format!("osrm returned {}", status)));
        }

        response.json::<OsrmResponse<T>>().map_err(|err| {
            OracleError::InvalidResponse(format!("status {}: {}", status, err))
        })
    }

    fn log_ignored_options(&self, options: &RouteOptions) {
        if options.departure_time.is_some() {
            debug!(model = ?options.traffic_model, "osrm ignores departure time and traffic model");
        }
    }

    fn route_legs(&self, waypoints: &[Coordinate]) -> Result<Option<OsrmRoute>, OracleError> {
        let query = [
            ("overview", "false".to_string()),
            ("alternatives", "false".to_string()),
        ];
        let response = self.fetch::<RouteBody>(self.service_url("route", waypoints), &query)?;

        match response.outcome()? {
            Some(body) => Ok(body.routes.into_iter().next()),
            None => Ok(None),
        }
    }
}

impl<P: Pacer> TravelCostOracle for OsrmClient<P> {
    fn route(
        &self,
        origin: Coordinate,
        destination: Coordinate,
        options: &RouteOptions,
    ) -> Result<Option<RouteEstimate>, OracleError> {
        if !origin.is_valid() || !destination.is_valid() {
            return Ok(None);
        }
        self.log_ignored_options(options);

        Ok(self
            .route_legs(&[origin, destination])?
            .map(|route| RouteEstimate {
                distance_meters: route.distance,
                duration_seconds: route.duration,
                duration_in_traffic_seconds: None,
            }))
    }

    fn distance_matrix(
        &self,
        origins: &[Coordinate],
        destinations: &[Coordinate],
        options: &RouteOptions,
    ) -> Result<CostMatrix, OracleError> {
        let mut matrix = CostMatrix::unavailable(origins.len(), destinations.len());

        // Invalid coordinates would fail the whole table; leave their pairs unavailable.
        let valid_origins = valid_indices(origins);
        let valid_destinations = valid_indices(destinations);
        if valid_origins.is_empty() || valid_destinations.is_empty() {
            return Ok(matrix);
        }
        self.log_ignored_options(options);

        let coordinates = valid_origins
            .iter()
            .map(|&i| origins[i])
            .chain(valid_destinations.iter().map(|&j| destinations[j]))
            .collect::<Vec<_>>();
        let sources = (0..valid_origins.len()).map(|i| i.to_string()).collect::<Vec<_>>();
        let targets = (valid_origins.len()..coordinates.len())
            .map(|j| j.to_string())
            .collect::<Vec<_>>();
        let query = [
            ("sources", sources.join(";")),
            ("destinations", targets.join(";")),
            ("annotations", "duration,distance".to_string()),
        ];

        let response = self.fetch::<TableBody>(self.service_url("table", &coordinates), &query)?;
        let Some(body) = response.outcome()? else {
            return Ok(matrix);
        };

        fill_matrix(&mut matrix, &body, &valid_origins, &valid_destinations)?;
        Ok(matrix)
    }

    fn leg_costs(
        &self,
        waypoints: &[Coordinate],
        options: &RouteOptions,
    ) -> Result<Vec<Option<LegCost>>, OracleError> {
        if waypoints.len() < 2 {
            return Ok(Vec::new());
        }
        if waypoints.iter().any(|c| !c.is_valid()) {
            return self.legs_pairwise(waypoints, options);
        }
        self.log_ignored_options(options);

        match self.route_legs(waypoints)? {
            Some(route) if route.legs.len() == waypoints.len() - 1 => Ok(route
                .legs
                .into_iter()
                .map(|leg| Some(LegCost::new(leg.distance, leg.duration)))
                .collect()),
            // One unroutable leg sinks the whole multi-stop request; find out which.
            _ => {
                warn!(waypoints = waypoints.len(), "osrm multi-stop route failed, pricing legs individually");
                self.legs_pairwise(waypoints, options)
            }
        }
    }
}

impl<P: Pacer> OsrmClient<P> {
    fn legs_pairwise(
        &self,
        waypoints: &[Coordinate],
        options: &RouteOptions,
    ) -> Result<Vec<Option<LegCost>>, OracleError> {
        waypoints
            .windows(2)
            .map(|pair| Ok(self.route(pair[0], pair[1], options)?.map(LegCost::from)))
            .collect()
    }
}

fn valid_indices(coordinates: &[Coordinate]) -> Vec<usize> {
    coordinates
        .iter()
        .enumerate()
        .filter(|(_, c)| c.is_valid())
        .map(|(i, _)| i)
        .collect()
}

fn fill_matrix(
    matrix: &mut CostMatrix,
    body: &TableBody,
    origins: &[usize],
    destinations: &[usize],
) -> Result<(), OracleError> {
    let durations = body
        .durations
        .as_ref()
        .ok_or_else(|| OracleError::InvalidResponse("table without durations".to_string()))?;
    let distances = body
        .distances
        .as_ref()
        .ok_or_else(|| OracleError::InvalidResponse("table without distances".to_string()))?;

    if durations.len() != origins.len() || distances.len() != origins.len() {
        return Err(OracleError::InvalidResponse(format!(
            "expected {} table rows, got {}",
            origins.len(),
            durations.len()
        )));
    }

    for (row, &i) in origins.iter().enumerate() {
        for (col, &j) in destinations.iter().enumerate() {
            let duration = durations[row].get(col).copied().flatten();
            let distance = distances[row].get(col).copied().flatten();
            if let (Some(distance), Some(duration)) = (distance, duration) {
                matrix.set(i, j, Some(LegCost::new(distance, duration)));
            }
        }
    }

    Ok(())
}

#[derive(Debug, Deserialize)]
struct OsrmResponse<T> {
    code: String,
    message: Option<String>,
    #[serde(flatten)]
    body: Option<T>,
}

impl<T> OsrmResponse<T> {
    /// `Ok(None)` when OSRM found no route between the points.
    fn outcome(self) -> Result<Option<T>, OracleError> {
        match self.code.as_str() {
            "Ok" => self
                .body
                .map(Some)
                .ok_or_else(|| OracleError::InvalidResponse("missing response body".to_string())),
            "NoRoute" | "NoSegment" | "NoTable" => Ok(None),
            _ => Err(OracleError::Rejected {
                code: self.code,
                message: self.message.unwrap_or_default(),
            }),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TableBody {
    durations: Option<Vec<Vec<Option<f64>>>>,
    distances: Option<Vec<Vec<Option<f64>>>>,
}

#[derive(Debug, Deserialize)]
struct RouteBody {
    #[serde(default)]
    routes: Vec<OsrmRoute>,
}

#[derive(Debug, Deserialize)]
struct OsrmRoute {
    distance: f64,
    duration: f64,
    #[serde(default)]
    legs: Vec<OsrmLeg>,
}

#[derive(Debug, Deserialize)]
struct OsrmLeg {
    distance: f64,
    duration: f64,
}
