//! Hazard policy: intensity to movement probability, evacuation trigger and
//! spawn curve.

use log::warn;
use serde::Deserialize;
use serde_yaml::Value;

use crate::error::ConfigError;

/// Tolerance applied before flooring spawn counts so that products such as
/// `0.29 * 100` do not lose an agent to representation error.
const SPAWN_EPSILON: f64 = 1e-9;

/// Raw policy section of the scenario file.
#[derive(Debug, Clone, Deserialize)]
pub struct PolicyConfig {
    pub evacuation_threshold: i32,
    pub movechance: Vec<Value>,
    pub spawn_fraction: Vec<Value>,
}

/// Decisions about hazard that the simulation loop delegates.
pub trait EcosystemPolicy: Send + Sync {
    /// Movement probability for agents at a location with this hazard level.
    fn assess_hazard(&self, level: i32) -> f64;
    fn should_evacuate(&self, level: i32) -> bool;
    /// Number of people displaced today from `population` at this level.
    fn spawn(&self, population: u64, level: i32) -> u64;
    /// Highest level each table distinguishes, for diagnostics.
    fn max_level(&self) -> i32;
}

#[derive(Debug, Clone, PartialEq)]
pub struct HazardPolicy {
    movechance: Vec<f64>,
    spawn_fraction: Vec<f64>,
    evacuation_threshold: i32,
}

impl HazardPolicy {
    /// Builds a policy from already-validated tables.
    pub fn new(
        movechance: Vec<f64>,
        spawn_fraction: Vec<f64>,
        evacuation_threshold: i32,
    ) -> Result<Self, ConfigError> {
        if movechance.is_empty() {
            return Err(ConfigError::PolicyTable {
                table: "movechance",
                reason: "table is empty".into(),
            });
        }
        if spawn_fraction.is_empty() {
            return Err(ConfigError::PolicyTable {
                table: "spawn_fraction",
                reason: "table is empty".into(),
            });
        }
        if let Some((level, value)) = movechance
            .iter()
            .enumerate()
            .find(|(_, value)| !(0.0..=1.0).contains(*value))
        {
            return Err(ConfigError::PolicyTable {
                table: "movechance",
                reason: format!("level {level} has value {value} outside [0, 1]"),
            });
        }
        let spawn_fraction = spawn_fraction
            .into_iter()
            .enumerate()
            .map(|(level, value)| sanitize_fraction(level, value))
            .collect();
        Ok(Self {
            movechance,
            spawn_fraction,
            evacuation_threshold,
        })
    }

    /// Builds a policy from the scenario section. Movechance entries must be
    /// numbers in [0, 1]; spawn entries that are not usable numbers resolve to 0.
    pub fn from_config(config: &PolicyConfig) -> Result<Self, ConfigError> {
        let movechance = config
            .movechance
            .iter()
            .enumerate()
            .map(|(level, value)| {
                value.as_f64().ok_or_else(|| ConfigError::PolicyTable {
                    table: "movechance",
                    reason: format!("level {level} is not a number"),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        let spawn_fraction = config
            .spawn_fraction
            .iter()
            .enumerate()
            .map(|(level, value)| {
                value.as_f64().unwrap_or_else(|| {
                    warn!("spawn_fraction level {level} is not a number; using 0");
                    0.0
                })
            })
            .collect();
        Self::new(movechance, spawn_fraction, config.evacuation_threshold)
    }

    pub fn movechance(&self, level: i32) -> f64 {
        lookup(&self.movechance, level)
    }

    pub fn spawn_fraction(&self, level: i32) -> f64 {
        lookup(&self.spawn_fraction, level)
    }

    pub fn should_evacuate(&self, level: i32) -> bool {
        level >= self.evacuation_threshold
    }

    pub fn evacuation_threshold(&self) -> i32 {
        self.evacuation_threshold
    }

    pub fn max_movechance_level(&self) -> i32 {
        self.movechance.len() as i32 - 1
    }

    pub fn max_spawn_level(&self) -> i32 {
        self.spawn_fraction.len() as i32 - 1
    }

    /// `floor(population * spawn_fraction(level))`, kept within `[0, population]`.
    pub fn spawn_count(&self, population: u64, level: i32) -> u64 {
        let raw = (population as f64 * self.spawn_fraction(level) + SPAWN_EPSILON).floor();
        if raw <= 0.0 {
            0
        } else {
            (raw as u64).min(population)
        }
    }
}

impl EcosystemPolicy for HazardPolicy {
    fn assess_hazard(&self, level: i32) -> f64 {
        self.movechance(level)
    }

    fn should_evacuate(&self, level: i32) -> bool {
        HazardPolicy::should_evacuate(self, level)
    }

    fn spawn(&self, population: u64, level: i32) -> u64 {
        self.spawn_count(population, level)
    }

    fn max_level(&self) -> i32 {
        self.max_movechance_level().min(self.max_spawn_level())
    }
}

fn lookup(table: &[f64], level: i32) -> f64 {
    let max = table.len().saturating_sub(1);
    let index = (level.max(0) as usize).min(max);
    table.get(index).copied().unwrap_or(0.0)
}

fn sanitize_fraction(level: usize, value: f64) -> f64 {
    if value.is_nan() || value < 0.0 {
        warn!("spawn_fraction level {level} is {value}; using 0");
        0.0
    } else if value > 1.0 {
        warn!("spawn_fraction level {level} is {value}; clamping to 1");
        1.0
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_levels_use_the_first_entry() {
        let policy = HazardPolicy::new(vec![0.1, 0.5], vec![0.0, 0.2], 1).unwrap();
        assert_eq!(policy.movechance(-3), 0.1);
        assert_eq!(policy.spawn_fraction(-1), 0.0);
    }

    #[test]
    fn bad_spawn_entries_resolve_to_zero() {
        let policy =
            HazardPolicy::new(vec![0.1], vec![f64::NAN, -0.5, 2.0, 0.25], 3).unwrap();
        assert_eq!(policy.spawn_fraction(0), 0.0);
        assert_eq!(policy.spawn_fraction(1), 0.0);
        assert_eq!(policy.spawn_fraction(2), 1.0);
        assert_eq!(policy.spawn_fraction(3), 0.25);
    }

    #[test]
    fn spawn_count_survives_representation_error() {
        let policy = HazardPolicy::new(vec![0.0], vec![0.0, 0.29], 3).unwrap();
        assert_eq!(policy.spawn_count(100, 1), 29);
    }
}
