//! Day-stepped simulation loop.

use std::collections::BTreeSet;
use std::io::Write;
use std::path::PathBuf;
use std::time::Instant;

use chrono::{Days, NaiveDate};
use log::{debug, info, warn};
use thiserror::Error;

use crate::{
    ecosystem::Ecosystem,
    error::{ConfigError, ReferenceDataError},
    hazard::{HazardDataSource, HazardTimeSeries},
    output::OutputWriter,
    policy::EcosystemPolicy,
    rng::RngManager,
    snapshot::{EcosystemSnapshot, SnapshotConfig, SnapshotError, SnapshotManager},
    systems::{
        AgentBehavior, DecisionEngine, DecisionReport, HazardAwareBehavior, SpawnReport,
        SpawningEngine,
    },
    validation::{DayRecord, ReferenceTable, Validator},
};

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Reference(#[from] ReferenceDataError),
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
    #[error("failed to write output: {0}")]
    Output(#[from] std::io::Error),
    #[error("simulation already completed {0} days")]
    Completed(u32),
}

pub struct EngineSettings {
    pub scenario_name: String,
    pub seed: u64,
    pub start_date: NaiveDate,
    pub days: u32,
    pub workers: usize,
    pub snapshot: SnapshotConfig,
}

pub struct EngineBuilder {
    settings: EngineSettings,
    ecosystem: Ecosystem,
    hazard: Box<dyn HazardDataSource>,
    policy: Option<Box<dyn EcosystemPolicy>>,
    behavior: Box<dyn AgentBehavior>,
    spawning: SpawningEngine,
    reference: Option<ReferenceTable>,
    seed_camps: bool,
    idp_totals: bool,
}

impl EngineBuilder {
    pub fn new(settings: EngineSettings, ecosystem: Ecosystem) -> Self {
        Self {
            settings,
            ecosystem,
            hazard: Box::new(HazardTimeSeries::default()),
            policy: None,
            behavior: Box::new(HazardAwareBehavior::new()),
            spawning: SpawningEngine::default(),
            reference: None,
            seed_camps: false,
            idp_totals: false,
        }
    }

    pub fn with_hazard_source(mut self, source: impl HazardDataSource + 'static) -> Self {
        self.hazard = Box::new(source);
        self
    }

    pub fn with_policy(mut self, policy: impl EcosystemPolicy + 'static) -> Self {
        self.policy = Some(Box::new(policy));
        self
    }

    pub fn with_behavior(mut self, behavior: impl AgentBehavior + 'static) -> Self {
        self.behavior = Box::new(behavior);
        self
    }

    pub fn with_spawning(mut self, spawning: SpawningEngine) -> Self {
        self.spawning = spawning;
        self
    }

    pub fn with_reference(mut self, reference: ReferenceTable) -> Self {
        self.reference = Some(reference);
        self
    }

    /// Fills each camp with its day-0 reference count before the run starts.
    pub fn seed_camps_from_reference(mut self, enabled: bool) -> Self {
        self.seed_camps = enabled;
        self
    }

    pub fn with_idp_totals(mut self, enabled: bool) -> Self {
        self.idp_totals = enabled;
        self
    }

    pub fn build(self) -> Result<Engine, EngineError> {
        let policy = self.policy.ok_or(ConfigError::MissingPolicy)?;
        let mut ecosystem = self.ecosystem;

        for name in self.hazard.location_names() {
            if ecosystem.location_id(&name).is_none() {
                warn!("hazard data names unknown location '{name}'; ignoring it");
            }
        }
        let max_level = policy.max_level();
        for level in self.hazard.levels().into_iter().filter(|l| *l > max_level) {
            warn!("hazard level {level} exceeds the policy tables; using level {max_level}");
        }

        if self.seed_camps {
            if let Some(table) = &self.reference {
                let profile = self.spawning.profile();
                for camp in ecosystem.camp_ids() {
                    let name = ecosystem.location(camp).name.clone();
                    let count = table.get(&name, 0).unwrap_or(0.0).round().max(0.0) as u64;
                    for _ in 0..count {
                        ecosystem.add_agent(camp, profile.movechance, profile.awareness, profile.speed);
                    }
                    if count > 0 {
                        info!("seeded {count} agents at camp {name} from reference data");
                    }
                }
            }
        }

        let validator = Validator::new(&ecosystem, self.reference, self.idp_totals)?;

        Ok(Engine {
            rng: RngManager::new(self.settings.seed),
            decisions: DecisionEngine::new(self.settings.workers),
            snapshots: SnapshotManager::new(self.settings.snapshot.clone()),
            settings: self.settings,
            ecosystem,
            hazard: self.hazard,
            policy,
            behavior: self.behavior,
            spawning: self.spawning,
            validator,
            state: RunState::Initialized,
            refugee_debt: 0,
            affected: BTreeSet::new(),
            hazard_days: 0,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Initialized,
    Running { next_day: u32 },
    Completed,
}

#[derive(Clone, Debug)]
pub struct PhaseReport {
    pub name: &'static str,
    pub duration_ms: f64,
}

#[derive(Clone, Debug)]
pub struct DaySummary {
    pub record: DayRecord,
    pub spawned: SpawnReport,
    pub decisions: DecisionReport,
    pub phases: Vec<PhaseReport>,
    pub snapshot_path: Option<PathBuf>,
}

pub struct Engine {
    settings: EngineSettings,
    ecosystem: Ecosystem,
    hazard: Box<dyn HazardDataSource>,
    policy: Box<dyn EcosystemPolicy>,
    behavior: Box<dyn AgentBehavior>,
    spawning: SpawningEngine,
    decisions: DecisionEngine,
    validator: Validator,
    rng: RngManager,
    snapshots: SnapshotManager,
    state: RunState,
    refugee_debt: u64,
    affected: BTreeSet<String>,
    hazard_days: usize,
}

impl Engine {
    /// Runs one day: hazard, spawning, closures, decisions, then validation.
    pub fn step(&mut self) -> Result<DaySummary, EngineError> {
        let day = match self.state {
            RunState::Initialized => 0,
            RunState::Running { next_day } => next_day,
            RunState::Completed => return Err(EngineError::Completed(self.settings.days)),
        };
        if day >= self.settings.days {
            self.state = RunState::Completed;
            return Err(EngineError::Completed(self.settings.days));
        }
        let mut phases = Vec::with_capacity(5);

        let start = Instant::now();
        if self.hazard.apply(day, &mut self.ecosystem) > 0 {
            self.hazard_days += 1;
        }
        for location in self.ecosystem.locations() {
            if location.hazard_level() > 0 && !self.affected.contains(&location.name) {
                self.affected.insert(location.name.clone());
            }
        }
        phases.push(phase("hazard", start));

        let start = Instant::now();
        let spawned = self
            .spawning
            .run(day, &mut self.ecosystem, self.policy.as_ref());
        self.refugee_debt += spawned.shortfall();
        phases.push(phase("spawning", start));

        let start = Instant::now();
        self.ecosystem.refresh_spawn_weights();
        self.ecosystem.enact_border_closures(day);
        phases.push(phase("closures", start));

        let start = Instant::now();
        let decisions = self.decisions.run(
            day,
            &mut self.ecosystem,
            self.behavior.as_ref(),
            self.policy.as_ref(),
            &self.rng,
        );
        phases.push(phase("decision", start));

        let start = Instant::now();
        let date = self.date(day);
        let record = self
            .validator
            .record(day, date, &self.ecosystem, self.refugee_debt);
        let snapshot_path = if self.snapshots.is_enabled() {
            let snapshot = EcosystemSnapshot::capture(
                &self.settings.scenario_name,
                day,
                date,
                &self.ecosystem,
            );
            self.snapshots.maybe_snapshot(&snapshot)?
        } else {
            None
        };
        phases.push(phase("validation", start));
        debug!(
            "day {day} timings: {}",
            phases
                .iter()
                .map(|phase| format!("{} {:.3}ms", phase.name, phase.duration_ms))
                .collect::<Vec<_>>()
                .join(", ")
        );

        self.state = if day + 1 >= self.settings.days {
            RunState::Completed
        } else {
            RunState::Running { next_day: day + 1 }
        };

        Ok(DaySummary {
            record,
            spawned,
            decisions,
            phases,
            snapshot_path,
        })
    }

    /// Runs every remaining day, writing the header first and one row per day.
    pub fn run<W: Write>(&mut self, output: &mut OutputWriter<W>) -> Result<(), EngineError> {
        let camps = self.validator.camp_names();
        output.write_header(&camps, self.validator.idp_totals())?;
        self.run_with_hook(|summary| output.write_record(&summary.record))?;
        output.flush()?;
        Ok(())
    }

    pub fn run_with_hook<F, E>(&mut self, mut hook: F) -> Result<(), EngineError>
    where
        F: FnMut(&DaySummary) -> Result<(), E>,
        EngineError: From<E>,
    {
        while self.state != RunState::Completed {
            if self.settings.days == 0 {
                self.state = RunState::Completed;
                break;
            }
            let summary = self.step()?;
            hook(&summary)?;
        }
        self.log_summary();
        Ok(())
    }

    pub fn date(&self, day: u32) -> NaiveDate {
        self.settings.start_date + Days::new(u64::from(day))
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn scenario_name(&self) -> &str {
        &self.settings.scenario_name
    }

    pub fn ecosystem(&self) -> &Ecosystem {
        &self.ecosystem
    }

    pub fn refugee_debt(&self) -> u64 {
        self.refugee_debt
    }

    /// Locations that reached a positive hazard level so far.
    pub fn affected_locations(&self) -> &BTreeSet<String> {
        &self.affected
    }

    fn log_summary(&self) {
        info!(
            "{} locations were impacted during the run",
            self.affected.len()
        );
        info!("{} days of hurricane data were used", self.hazard_days);
        info!(
            "simulation '{}' complete: {} agents, {} outside camps",
            self.settings.scenario_name,
            self.ecosystem.num_agents(),
            self.ecosystem.num_idps()
        );
    }
}

fn phase(name: &'static str, start: Instant) -> PhaseReport {
    PhaseReport {
        name,
        duration_ms: start.elapsed().as_secs_f64() * 1_000.0,
    }
}
