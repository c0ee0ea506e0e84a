//! Road-network dataset preparation for a local OSRM instance.
//!
//! Downloads a Geofabrik extract and runs the OSRM toolchain inside the
//! `osrm/osrm-backend` docker image. Every step is skipped when its output
//! already exists, so repeated calls are cheap.

use std::fmt;
use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::{debug, info};

const OSRM_IMAGE: &str = "osrm/osrm-backend";

/// Mount point of the dataset directory inside the container.
const CONTAINER_DATA_DIR: &str = "/data";

/// A Geofabrik extract, e.g. `north-america/us/nevada`.
#[derive(Debug, Clone)]
pub struct GeofabrikRegion {
    pub path: String,
}

impl GeofabrikRegion {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }

    /// Last path segment, used for file names.
    pub fn name(&self) -> &str {
        self.path
            .rsplit('/')
            .next()
            .filter(|name| !name.is_empty())
            .unwrap_or("region")
    }

    pub fn url(&self) -> String {
        format!("https://download.geofabrik.de/{}-latest.osm.pbf", self.path)
    }
}

/// OSRM preprocessing pipeline. Must match `osrm-routed --algorithm`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OsrmPrepMode {
    /// Contraction hierarchies: fastest queries, slow to build.
    Ch,
    /// Multi-level Dijkstra.
    Mld,
}

impl OsrmPrepMode {
    pub fn algorithm(self) -> &'static str {
        match self {
            OsrmPrepMode::Ch => "ch",
            OsrmPrepMode::Mld => "mld",
        }
    }

    /// Tools run after `osrm-extract`, in order.
    fn tools(self) -> &'static [&'static str] {
        match self {
            OsrmPrepMode::Ch => &["osrm-contract"],
            OsrmPrepMode::Mld => &["osrm-partition", "osrm-customize"],
        }
    }

    /// Extensions this mode adds next to the `.osrm` base file. The last one
    /// is written by the final tool.
    fn outputs(self) -> &'static [&'static str] {
        match self {
            OsrmPrepMode::Ch => &["osrm.hsgr"],
            OsrmPrepMode::Mld => &["osrm.partition", "osrm.cells", "osrm.mldgr"],
        }
    }
}

#[derive(Debug, Clone)]
pub struct OsrmDatasetConfig {
    pub region: GeofabrikRegion,
    pub data_root: PathBuf,
    pub mode: OsrmPrepMode,
    /// Lua profile inside the docker image.
    pub profile: String,
}

impl OsrmDatasetConfig {
    pub fn new(region: GeofabrikRegion, data_root: impl Into<PathBuf>) -> Self {
        Self {
            region,
            data_root: data_root.into(),
            mode: OsrmPrepMode::Mld,
            profile: "/opt/car.lua".to_string(),
        }
    }

    pub fn with_mode(mut self, mode: OsrmPrepMode) -> Self {
        self.mode = mode;
        self
    }
}

/// Paths of a prepared dataset.
#[derive(Debug, Clone)]
pub struct OsrmDataset {
    pub data_dir: PathBuf,
    pub osrm_base: PathBuf,
    pub pbf_path: PathBuf,
    pub mode: OsrmPrepMode,
}

/// One containerised toolchain invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
struct PrepStep {
    tool: &'static str,
    args: Vec<String>,
}

impl OsrmDataset {
    /// Where `config` keeps its files under `root`. Touches nothing on disk.
    fn layout(config: &OsrmDatasetConfig, root: &Path) -> Self {
        let name = config.region.name();
        let data_dir = root.join(name);
        Self {
            osrm_base: data_dir.join(format!("{}-latest.osrm", name)),
            pbf_path: data_dir.join(format!("{}-latest.osm.pbf", name)),
            data_dir,
            mode: config.mode,
        }
    }

    /// Download and preprocess the region if needed.
    pub fn ensure(config: &OsrmDatasetConfig) -> Result<Self, OsrmDataError> {
        let root = if config.data_root.is_absolute() {
            config.data_root.clone()
        } else {
            std::env::current_dir()?.join(&config.data_root)
        };
        let dataset = Self::layout(config, &root);
        fs::create_dir_all(&dataset.data_dir)?;

        if !dataset.pbf_path.exists() {
            info!(url = %config.region.url(), "downloading region extract");
            download_pbf(&config.region.url(), &dataset.pbf_path)?;
        }

        let steps = dataset.pending_steps(&config.profile);
        if steps.is_empty() {
            debug!(base = %dataset.osrm_base.display(), "dataset already prepared");
        }
        for step in &steps {
            info!(tool = step.tool, mode = dataset.mode.algorithm(), "running osrm preprocessing");
            dataset.run_in_container(step)?;
        }

        Ok(dataset)
    }

    /// Steps still missing their outputs. A fresh extract invalidates every
    /// later output, so it reruns the whole mode pipeline.
    fn pending_steps(&self, profile: &str) -> Vec<PrepStep> {
        let extracted = self.osrm_base.exists();
        let mut steps = Vec::new();
        if !extracted {
            steps.push(PrepStep {
                tool: "osrm-extract",
                args: vec!["-p".to_string(), profile.to_string(), self.in_container(&self.pbf_path)],
            });
        }
        if !extracted || !self.is_prepared() {
            steps.extend(self.mode.tools().iter().map(|&tool| PrepStep {
                tool,
                args: vec![self.in_container(&self.osrm_base)],
            }));
        }
        steps
    }

    /// Whether the base file and every output of the configured mode exist.
    pub fn is_prepared(&self) -> bool {
        self.osrm_base.exists()
            && self
                .mode
                .outputs()
                .iter()
                .all(|extension| self.osrm_base.with_extension(extension).exists())
    }

    /// File written last by the configured mode; its mtime identifies a build.
    pub fn prepared_marker(&self) -> PathBuf {
        let last = self.mode.outputs().last().copied().unwrap_or("osrm");
        self.osrm_base.with_extension(last)
    }

    /// Arguments for `osrm-routed` serving this dataset from `/data`.
    pub fn routed_args(&self) -> Vec<String> {
        vec![
            "osrm-routed".to_string(),
            "--algorithm".to_string(),
            self.mode.algorithm().to_string(),
            self.in_container(&self.osrm_base),
        ]
    }

    fn in_container(&self, path: &Path) -> String {
        let name = path.file_name().and_then(|name| name.to_str()).unwrap_or_default();
        format!("{}/{}", CONTAINER_DATA_DIR, name)
    }

    fn docker_args(&self, step: &PrepStep) -> Vec<String> {
        let mut args = vec![
            "run".to_string(),
            "--rm".to_string(),
            "-t".to_string(),
            "-v".to_string(),
            format!("{}:{}", self.data_dir.display(), CONTAINER_DATA_DIR),
            OSRM_IMAGE.to_string(),
            step.tool.to_string(),
        ];
        args.extend(step.args.iter().cloned());
        args
    }

    fn run_in_container(&self, step: &PrepStep) -> Result<(), OsrmDataError> {
        let status = Command::new("docker").args(self.docker_args(step)).status()?;
        if !status.success() {
            return Err(OsrmDataError::ProcessFailure(format!("{} exited with {}", step.tool, status)));
        }
        Ok(())
    }
}

#[derive(Debug)]
pub enum OsrmDataError {
    Io(io::Error),
    Http(reqwest::Error),
    ProcessFailure(String),
}

impl fmt::Display for OsrmDataError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OsrmDataError::Io(err) => write!(f, "dataset io error: {}", err),
            OsrmDataError::Http(err) => write!(f, "dataset download failed: {}", err),
            OsrmDataError::ProcessFailure(reason) => write!(f, "osrm preprocessing failed: {}", reason),
        }
    }
}

impl std::error::Error for OsrmDataError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            OsrmDataError::Io(err) => Some(err),
            OsrmDataError::Http(err) => Some(err),
            OsrmDataError::ProcessFailure(_) => None,
        }
    }
}

impl From<io::Error> for OsrmDataError {
    fn from(err: io::Error) -> Self {
        OsrmDataError::Io(err)
    }
}

impl From<reqwest::Error> for OsrmDataError {
    fn from(err: reqwest::Error) -> Self {
        OsrmDataError::Http(err)
    }
}

/// Streams the extract to a sibling `.part` file, renamed into place once complete.
fn download_pbf(url: &str, dest: &Path) -> Result<(), OsrmDataError> {
    let partial = dest.with_extension("part");
    let mut response = reqwest::blocking::get(url)?.error_for_status()?;
    let mut out = BufWriter::new(fs::File::create(&partial)?);
    let bytes = response.copy_to(&mut out)?;
    out.flush()?;
    drop(out);
    fs::rename(&partial, dest)?;
    debug!(bytes, dest = %dest.display(), "extract downloaded");
    Ok(())
}
