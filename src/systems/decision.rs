use log::{debug, warn};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;

use crate::{
    ecosystem::{Agent, AgentId, Ecosystem, LocationId, LocationKind},
    policy::EcosystemPolicy,
    rng::{RngExt, RngManager},
    systems::movement::GenericMovement,
};

/// Outcome of one agent's daily decision.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Decision {
    Stay,
    /// Mandatory move out of an evacuation zone.
    Evacuate(LocationId),
    /// Voluntary move chosen by the generic movement mechanics.
    Relocate {
        destination: LocationId,
        movechance: f64,
    },
}

impl Decision {
    pub fn destination(&self) -> Option<LocationId> {
        match self {
            Decision::Stay => None,
            Decision::Evacuate(destination) => Some(*destination),
            Decision::Relocate { destination, .. } => Some(*destination),
        }
    }
}

/// What an agent can see when it decides.
pub struct DecisionState<'a> {
    pub ecosystem: &'a Ecosystem,
    pub agent: &'a Agent,
    pub policy: &'a dyn EcosystemPolicy,
}

pub trait AgentBehavior: Send + Sync {
    fn choose_destination(&self, state: &DecisionState<'_>, rng: &mut ChaCha8Rng) -> Decision;
}

/// Evacuates agents from threatened evacuation zones and otherwise lets hazard
/// raise the chance of a voluntary move.
#[derive(Debug, Clone, Default)]
pub struct HazardAwareBehavior {
    movement: GenericMovement,
}

impl HazardAwareBehavior {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AgentBehavior for HazardAwareBehavior {
    fn choose_destination(&self, state: &DecisionState<'_>, rng: &mut ChaCha8Rng) -> Decision {
        let here = state.ecosystem.location(state.agent.location);
        let level = here.hazard_level();

        if here.kind == LocationKind::EvacuationZone && state.policy.should_evacuate(level) {
            return match evacuation_target(state.ecosystem, state.agent.location) {
                Some(destination) => Decision::Evacuate(destination),
                None => Decision::Stay,
            };
        }

        if level > 0 {
            let movechance = state.policy.assess_hazard(level);
            if rng.bernoulli(movechance) {
                if let Some(destination) =
                    self.movement.select_route(state.ecosystem, state.agent, rng)
                {
                    return Decision::Relocate {
                        destination,
                        movechance,
                    };
                }
            }
        }
        Decision::Stay
    }
}

/// Nearest safe zone or camp over an open link. Equal distances keep the link
/// declared first.
pub fn evacuation_target(ecosystem: &Ecosystem, from: LocationId) -> Option<LocationId> {
    let mut best: Option<(LocationId, f64)> = None;
    for link in ecosystem.location(from).open_links() {
        if link.endpoint == from || !ecosystem.location(link.endpoint).kind.is_refuge() {
            continue;
        }
        match best {
            Some((_, distance)) if link.distance >= distance => {}
            _ => best = Some((link.endpoint, link.distance)),
        }
    }
    best.map(|(id, _)| id)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecisionReport {
    pub evacuated: usize,
    pub relocated: usize,
    pub stayed: usize,
}

/// Runs every agent's decision for one day.
///
/// Decisions are taken against the state left by spawning, then applied in
/// agent insertion order. With more than one worker they are evaluated on a
/// dedicated rayon pool; each agent draws from its own `(seed, agent, day)`
/// generator, so the outcome does not depend on the worker count.
#[derive(Debug)]
pub struct DecisionEngine {
    workers: usize,
    pool: Option<rayon::ThreadPool>,
}

impl DecisionEngine {
    pub fn new(workers: usize) -> Self {
        let workers = workers.max(1);
        let pool = if workers > 1 {
            match rayon::ThreadPoolBuilder::new().num_threads(workers).build() {
                Ok(pool) => Some(pool),
                Err(err) => {
                    warn!("could not start {workers} decision workers ({err}); deciding serially");
                    None
                }
            }
        } else {
            None
        };
        Self { workers, pool }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn decide(
        &self,
        day: u32,
        ecosystem: &Ecosystem,
        behavior: &dyn AgentBehavior,
        policy: &dyn EcosystemPolicy,
        rng: &RngManager,
    ) -> Vec<Decision> {
        let agents = ecosystem.agents();
        let decide_one = |index: usize, agent: &Agent| {
            let mut agent_rng = rng.agent_rng(index, day);
            let state = DecisionState {
                ecosystem,
                agent,
                policy,
            };
            behavior.choose_destination(&state, &mut agent_rng)
        };

        match &self.pool {
            Some(pool) if agents.len() > 1 => pool.install(|| {
                agents
                    .par_iter()
                    .enumerate()
                    .map(|(index, agent)| decide_one(index, agent))
                    .collect()
            }),
            _ => agents
                .iter()
                .enumerate()
                .map(|(index, agent)| decide_one(index, agent))
                .collect(),
        }
    }

    pub fn run(
        &self,
        day: u32,
        ecosystem: &mut Ecosystem,
        behavior: &dyn AgentBehavior,
        policy: &dyn EcosystemPolicy,
        rng: &RngManager,
    ) -> DecisionReport {
        let decisions = self.decide(day, ecosystem, behavior, policy, rng);
        let mut report = DecisionReport::default();
        for (agent, decision) in ecosystem.agent_ids().zip(decisions) {
            apply(ecosystem, agent, decision, &mut report);
        }
        debug!(
            "day {day}: {} evacuated, {} relocated, {} stayed",
            report.evacuated, report.relocated, report.stayed
        );
        report
    }
}

impl Default for DecisionEngine {
    fn default() -> Self {
        Self::new(1)
    }
}

fn apply(ecosystem: &mut Ecosystem, agent: AgentId, decision: Decision, report: &mut DecisionReport) {
    match decision {
        Decision::Stay => report.stayed += 1,
        Decision::Evacuate(destination) => {
            ecosystem.move_agent(agent, destination);
            report.evacuated += 1;
        }
        Decision::Relocate {
            destination,
            movechance,
        } => {
            ecosystem.agent_mut(agent).movechance = movechance;
            ecosystem.move_agent(agent, destination);
            report.relocated += 1;
        }
    }
}
