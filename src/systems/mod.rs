mod decision;
mod movement;
mod spawning;

pub use decision::{
    evacuation_target, AgentBehavior, Decision, DecisionEngine, DecisionReport, DecisionState,
    HazardAwareBehavior,
};
pub use movement::GenericMovement;
pub use spawning::{AgentProfile, SpawnReport, SpawningEngine};
