use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::Serialize;
use thiserror::Error;

use crate::ecosystem::{Ecosystem, LocationKind};

#[derive(Clone, Debug)]
pub struct SnapshotConfig {
    /// Days between snapshots; 0 disables them.
    pub interval_days: u32,
    pub output_dir: PathBuf,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            interval_days: 0,
            output_dir: PathBuf::from("snapshots"),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LocationSnapshot<'a> {
    pub name: &'a str,
    pub kind: LocationKind,
    pub population: u64,
    pub hazard_level: i32,
    pub occupancy: usize,
    pub spawn_weight: f64,
}

#[derive(Debug, Serialize)]
pub struct EcosystemSnapshot<'a> {
    pub scenario: &'a str,
    pub day: u32,
    pub date: NaiveDate,
    pub total_agents: usize,
    pub total_idps: usize,
    pub locations: Vec<LocationSnapshot<'a>>,
}

impl<'a> EcosystemSnapshot<'a> {
    pub fn capture(scenario: &'a str, day: u32, date: NaiveDate, ecosystem: &'a Ecosystem) -> Self {
        let locations = ecosystem
            .locations()
            .iter()
            .map(|location| LocationSnapshot {
                name: &location.name,
                kind: location.kind,
                population: location.population,
                hazard_level: location.hazard_level(),
                occupancy: location.occupancy(),
                spawn_weight: location.spawn_weight,
            })
            .collect();
        Self {
            scenario,
            day,
            date,
            total_agents: ecosystem.num_agents(),
            total_idps: ecosystem.num_idps(),
            locations,
        }
    }
}

pub struct SnapshotManager {
    config: SnapshotConfig,
}

impl SnapshotManager {
    pub fn new(config: SnapshotConfig) -> Self {
        Self { config }
    }

    /// Writes `<output_dir>/<scenario>/day_<day>.json` when `day` completes an
    /// interval. Day numbering starts at 0, so the first snapshot follows day
    /// `interval - 1`.
    pub fn maybe_snapshot(
        &self,
        snapshot: &EcosystemSnapshot<'_>,
    ) -> Result<Option<PathBuf>, SnapshotError> {
        let interval = self.config.interval_days;
        if interval == 0 || (snapshot.day + 1) % interval != 0 {
            return Ok(None);
        }
        let dir = Path::new(&self.config.output_dir).join(snapshot.scenario);
        fs::create_dir_all(&dir)?;
        let file_path = dir.join(format!("day_{:06}.json", snapshot.day));
        fs::write(&file_path, serde_json::to_string_pretty(snapshot)?)?;
        Ok(Some(file_path))
    }

    pub fn is_enabled(&self) -> bool {
        self.config.interval_days > 0
    }
}

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("snapshot io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("snapshot encoding error: {0}")]
    Encode(#[from] serde_json::Error),
}
