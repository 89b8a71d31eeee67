use std::{
    collections::HashSet,
    fs,
    path::{Path, PathBuf},
};

use chrono::NaiveDate;
use serde::Deserialize;

use crate::{
    ecosystem::{Closure, Ecosystem, Location, LocationKind},
    engine::{EngineBuilder, EngineError, EngineSettings},
    error::ConfigError,
    hazard::HazardTimeSeries,
    policy::{HazardPolicy, PolicyConfig},
    snapshot::SnapshotConfig,
    systems::{AgentProfile, SpawningEngine},
    validation::ReferenceTable,
};

fn default_workers() -> usize {
    1
}

fn default_scaledown() -> f64 {
    1.0
}

fn default_snapshot_dir() -> PathBuf {
    PathBuf::from("snapshots")
}

#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub seed: u64,
    pub start_date: NaiveDate,
    pub days: u32,
    #[serde(default = "default_workers")]
    pub workers: usize,
    pub hazard_file: PathBuf,
    pub policy: PolicyConfig,
    #[serde(default)]
    pub spawning: SpawningConfig,
    #[serde(default)]
    pub agent_defaults: AgentProfile,
    pub validation: ValidationConfig,
    #[serde(default)]
    pub output: OutputConfig,
    pub locations: Vec<ScenarioLocation>,
    #[serde(default)]
    pub routes: Vec<ScenarioRoute>,
    #[serde(default)]
    pub closures: Vec<ScenarioClosure>,
    /// Directory the scenario was loaded from; data paths resolve against it.
    #[serde(skip)]
    pub base_dir: PathBuf,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SpawningConfig {
    #[serde(default)]
    pub daily_cap: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ValidationConfig {
    pub reference_file: PathBuf,
    #[serde(default)]
    pub empty_camps_on_day0: bool,
    #[serde(default = "default_scaledown")]
    pub population_scaledown_factor: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub idp_totals: bool,
    #[serde(default)]
    pub snapshot_interval_days: u32,
    #[serde(default = "default_snapshot_dir")]
    pub snapshot_dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            idp_totals: false,
            snapshot_interval_days: 0,
            snapshot_dir: default_snapshot_dir(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScenarioLocation {
    pub name: String,
    pub population: u64,
    pub kind: LocationKind,
    #[serde(default)]
    pub initial_agents: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScenarioRoute {
    pub from: String,
    pub to: String,
    pub distance: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScenarioClosure {
    pub from: String,
    pub to: String,
    pub start_day: u32,
    pub end_day: u32,
}

pub struct ScenarioLoader {
    base_dir: PathBuf,
}

impl ScenarioLoader {
    pub fn new(base_dir: impl AsRef<Path>) -> Self {
        Self {
            base_dir: base_dir.as_ref().to_path_buf(),
        }
    }

    pub fn load(&self, file: impl AsRef<Path>) -> Result<Scenario, ConfigError> {
        let path = self.base_dir.join(file);
        let data = fs::read_to_string(&path).map_err(|source| ConfigError::Io {
            path: path.clone(),
            source,
        })?;
        let mut scenario: Scenario =
            serde_yaml::from_str(&data).map_err(|source| ConfigError::Parse {
                path: path.clone(),
                source,
            })?;
        scenario.base_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.base_dir.clone());
        scenario.validate()?;
        Ok(scenario)
    }
}

impl Scenario {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::Invalid("scenario must define a name".into()));
        }
        if self.days == 0 {
            return Err(ConfigError::Invalid("days must be greater than zero".into()));
        }
        if self.workers == 0 {
            return Err(ConfigError::Invalid("workers must be at least 1".into()));
        }
        let movechance = self.agent_defaults.movechance;
        if !(0.0..=1.0).contains(&movechance) {
            return Err(ConfigError::Invalid(format!(
                "agent_defaults.movechance {movechance} is outside [0, 1]"
            )));
        }
        let scaledown = self.validation.population_scaledown_factor;
        if !scaledown.is_finite() || scaledown <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "population_scaledown_factor must be positive, got {scaledown}"
            )));
        }
        if self.locations.is_empty() {
            return Err(ConfigError::Invalid(
                "scenario must define at least one location".into(),
            ));
        }

        let mut known = HashSet::new();
        for location in &self.locations {
            if !known.insert(location.name.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "location '{}' defined more than once",
                    location.name
                )));
            }
        }
        for route in &self.routes {
            for end in [&route.from, &route.to] {
                if !known.contains(end.as_str()) {
                    return Err(ConfigError::Invalid(format!(
                        "route references unknown location '{end}'"
                    )));
                }
            }
            if !route.distance.is_finite() || route.distance < 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "route {} - {} has invalid distance {}",
                    route.from, route.to, route.distance
                )));
            }
        }
        for closure in &self.closures {
            for end in [&closure.from, &closure.to] {
                if !known.contains(end.as_str()) {
                    return Err(ConfigError::Invalid(format!(
                        "closure references unknown location '{end}'"
                    )));
                }
            }
            if closure.start_day >= closure.end_day {
                return Err(ConfigError::Invalid(format!(
                    "closure {} - {} never applies: start_day {} is not before end_day {}",
                    closure.from, closure.to, closure.start_day, closure.end_day
                )));
            }
        }

        HazardPolicy::from_config(&self.policy).map(|_| ())
    }

    pub fn resolve(&self, path: &Path) -> PathBuf {
        self.base_dir.join(path)
    }

    pub fn build_policy(&self) -> Result<HazardPolicy, ConfigError> {
        HazardPolicy::from_config(&self.policy)
    }

    /// Geography plus the initial agents of every location.
    pub fn build_ecosystem(&self) -> Result<Ecosystem, ConfigError> {
        let mut ecosystem = Ecosystem::new();
        for location in &self.locations {
            ecosystem.add_location(Location::new(
                location.name.clone(),
                location.population,
                location.kind,
            ));
        }
        let lookup = |ecosystem: &Ecosystem, name: &str| {
            ecosystem
                .location_id(name)
                .ok_or_else(|| ConfigError::Invalid(format!("unknown location '{name}'")))
        };
        for route in &self.routes {
            let from = lookup(&ecosystem, &route.from)?;
            let to = lookup(&ecosystem, &route.to)?;
            ecosystem.add_route(from, to, route.distance);
        }
        for closure in &self.closures {
            let from = lookup(&ecosystem, &closure.from)?;
            let to = lookup(&ecosystem, &closure.to)?;
            ecosystem.add_closure(Closure {
                from,
                to,
                start_day: closure.start_day,
                end_day: closure.end_day,
            });
        }
        let profile = self.agent_defaults;
        for location in &self.locations {
            let id = lookup(&ecosystem, &location.name)?;
            for _ in 0..location.initial_agents {
                ecosystem.add_agent(id, profile.movechance, profile.awareness, profile.speed);
            }
        }
        Ok(ecosystem)
    }

    pub fn settings(&self, days: Option<u32>, workers: Option<usize>) -> EngineSettings {
        EngineSettings {
            scenario_name: self.name.clone(),
            seed: self.seed,
            start_date: self.start_date,
            days: days.unwrap_or(self.days),
            workers: workers.unwrap_or(self.workers),
            snapshot: SnapshotConfig {
                interval_days: self.output.snapshot_interval_days,
                output_dir: self.output.snapshot_dir.clone(),
            },
        }
    }

    /// Loads the data files and wires everything into an engine builder.
    /// Missing hazard data is tolerated; missing reference data is not.
    pub fn engine_builder(&self, settings: EngineSettings) -> Result<EngineBuilder, EngineError> {
        let policy = self.build_policy()?;
        let ecosystem = self.build_ecosystem()?;
        let hazard = HazardTimeSeries::read(self.resolve(&self.hazard_file));
        let reference = ReferenceTable::load(
            self.resolve(&self.validation.reference_file),
            self.validation.population_scaledown_factor,
        )?;
        let spawning =
            SpawningEngine::new(self.agent_defaults).with_daily_cap(self.spawning.daily_cap);

        Ok(EngineBuilder::new(settings, ecosystem)
            .with_hazard_source(hazard)
            .with_policy(policy)
            .with_spawning(spawning)
            .with_reference(reference)
            .seed_camps_from_reference(!self.validation.empty_camps_on_day0)
            .with_idp_totals(self.output.idp_totals))
    }
}
