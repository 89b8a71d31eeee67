use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;

use crate::ecosystem::{Agent, Ecosystem, LocationId, LocationKind};

/// Route choice for agents that move voluntarily. Ignores hazard entirely.
#[derive(Debug, Clone, Default)]
pub struct GenericMovement;

impl GenericMovement {
    pub fn new() -> Self {
        Self
    }

    /// Picks the next hop along an open link, or `None` when the agent has
    /// nowhere it can reach today.
    pub fn select_route(
        &self,
        ecosystem: &Ecosystem,
        agent: &Agent,
        rng: &mut ChaCha8Rng,
    ) -> Option<LocationId> {
        let candidates: Vec<(LocationId, f64)> = ecosystem
            .location(agent.location)
            .open_links()
            .filter(|link| link.endpoint != agent.location)
            .filter(|link| agent.speed <= 0.0 || link.distance <= agent.speed)
            .map(|link| {
                let kind = ecosystem.location(link.endpoint).kind;
                (link.endpoint, kind_weight(kind) / link.distance.max(1.0))
            })
            .collect();

        if agent.awareness == 0 {
            return candidates.choose(rng).map(|(id, _)| *id);
        }
        candidates
            .choose_weighted(rng, |(_, weight)| *weight)
            .ok()
            .map(|(id, _)| *id)
    }
}

fn kind_weight(kind: LocationKind) -> f64 {
    match kind {
        LocationKind::Camp | LocationKind::SafeZone => 2.0,
        LocationKind::Other => 1.0,
        LocationKind::EvacuationZone => 0.5,
    }
}
