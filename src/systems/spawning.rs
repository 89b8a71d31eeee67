use log::info;
use serde::Deserialize;

use crate::{
    ecosystem::{Agent, Ecosystem, LocationId},
    policy::EcosystemPolicy,
};

fn default_movechance() -> f64 {
    0.3
}

fn default_awareness() -> u8 {
    1
}

fn default_speed() -> f64 {
    200.0
}

/// Attributes given to agents created before the run starts. Agents displaced
/// by the hazard take their movechance from the policy instead.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct AgentProfile {
    #[serde(default = "default_movechance")]
    pub movechance: f64,
    #[serde(default = "default_awareness")]
    pub awareness: u8,
    #[serde(default = "default_speed")]
    pub speed: f64,
}

impl Default for AgentProfile {
    fn default() -> Self {
        Self {
            movechance: default_movechance(),
            awareness: default_awareness(),
            speed: default_speed(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpawnReport {
    /// Sum of the per-location counts the policy asked for.
    pub requested: u64,
    /// Agents actually created.
    pub placed: u64,
    pub by_location: Vec<(LocationId, u64)>,
}

impl SpawnReport {
    pub fn shortfall(&self) -> u64 {
        self.requested - self.placed
    }
}

/// Creates displaced agents at locations under hazard.
#[derive(Debug, Clone, Default)]
pub struct SpawningEngine {
    profile: AgentProfile,
    daily_cap: Option<u64>,
}

impl SpawningEngine {
    pub fn new(profile: AgentProfile) -> Self {
        Self {
            profile,
            daily_cap: None,
        }
    }

    /// Limits how many agents may be created per day across all locations.
    pub fn with_daily_cap(mut self, cap: Option<u64>) -> Self {
        self.daily_cap = cap;
        self
    }

    pub fn profile(&self) -> AgentProfile {
        self.profile
    }

    /// Spawns the day's displaced agents, appending them after every existing
    /// agent so they take part in the same day's decisions.
    pub fn run(
        &self,
        day: u32,
        ecosystem: &mut Ecosystem,
        policy: &dyn EcosystemPolicy,
    ) -> SpawnReport {
        let mut report = SpawnReport::default();
        let mut remaining = self.daily_cap.unwrap_or(u64::MAX);
        let ids: Vec<LocationId> = ecosystem.location_ids().collect();

        for id in ids {
            let (name, population, level) = {
                let location = ecosystem.location(id);
                (location.name.clone(), location.population, location.hazard_level())
            };
            if level <= 0 {
                continue;
            }
            let count = policy.spawn(population, level).min(population);
            if count == 0 {
                continue;
            }
            let placed = count.min(remaining);
            remaining -= placed;
            report.requested += count;
            report.placed += placed;

            let movechance = policy.assess_hazard(level);
            for _ in 0..placed {
                ecosystem.push_agent(Agent {
                    location: id,
                    movechance,
                    awareness: self.profile.awareness,
                    speed: self.profile.speed,
                    spawned_on: Some(day),
                });
            }
            if placed > 0 {
                report.by_location.push((id, placed));
                info!("day {day}: spawning {placed} displaced from {name} (level {level})");
            }
        }
        report
    }
}
