pub mod ecosystem;
pub mod engine;
pub mod error;
pub mod hazard;
pub mod output;
pub mod policy;
pub mod rng;
pub mod scenario;
pub mod snapshot;
pub mod systems;
mod table;
pub mod validation;

pub use ecosystem::Ecosystem;
pub use engine::{Engine, EngineBuilder, EngineSettings};
pub use scenario::{Scenario, ScenarioLoader};
