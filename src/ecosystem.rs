use std::collections::HashMap;

use log::warn;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LocationId(usize);

impl LocationId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AgentId(usize);

impl AgentId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationKind {
    EvacuationZone,
    #[serde(alias = "shelter")]
    SafeZone,
    Camp,
    Other,
}

impl LocationKind {
    /// Destinations an evacuating agent may head for.
    pub fn is_refuge(self) -> bool {
        matches!(self, LocationKind::SafeZone | LocationKind::Camp)
    }
}

#[derive(Debug, Clone)]
pub struct Link {
    pub endpoint: LocationId,
    pub distance: f64,
    pub closed: bool,
}

#[derive(Debug, Clone)]
pub struct Location {
    pub name: String,
    pub population: u64,
    pub kind: LocationKind,
    pub links: Vec<Link>,
    pub spawn_weight: f64,
    hazard_level: i32,
    occupancy: usize,
    hazard_day: Option<u32>,
}

impl Location {
    pub fn new(name: impl Into<String>, population: u64, kind: LocationKind) -> Self {
        Self {
            name: name.into(),
            population,
            kind,
            links: Vec::new(),
            hazard_level: 0,
            spawn_weight: 0.0,
            occupancy: 0,
            hazard_day: None,
        }
    }

    pub fn occupancy(&self) -> usize {
        self.occupancy
    }

    /// Level written by the most recent `Ecosystem::set_hazard_level`.
    pub fn hazard_level(&self) -> i32 {
        self.hazard_level
    }

    pub fn open_links(&self) -> impl Iterator<Item = &Link> {
        self.links.iter().filter(|link| !link.closed)
    }
}

#[derive(Debug, Clone)]
pub struct Agent {
    pub location: LocationId,
    pub movechance: f64,
    pub awareness: u8,
    pub speed: f64,
    /// Day the agent was displaced by the hazard, if it was spawned mid-run.
    pub spawned_on: Option<u32>,
}

#[derive(Debug, Clone, Copy)]
pub struct Closure {
    pub from: LocationId,
    pub to: LocationId,
    pub start_day: u32,
    pub end_day: u32,
}

impl Closure {
    fn active(&self, day: u32) -> bool {
        self.start_day <= day && day < self.end_day
    }

    fn covers(&self, a: LocationId, b: LocationId) -> bool {
        (self.from == a && self.to == b) || (self.from == b && self.to == a)
    }
}

/// Locations, routes and agents for one run.
#[derive(Debug, Default, Clone)]
pub struct Ecosystem {
    locations: Vec<Location>,
    names: HashMap<String, LocationId>,
    agents: Vec<Agent>,
    closures: Vec<Closure>,
}

impl Ecosystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_location(&mut self, location: Location) -> LocationId {
        let id = LocationId(self.locations.len());
        self.names.insert(location.name.clone(), id);
        self.locations.push(location);
        id
    }

    /// Adds a route as a pair of directed links.
    pub fn add_route(&mut self, a: LocationId, b: LocationId, distance: f64) {
        self.add_link(a, b, distance);
        self.add_link(b, a, distance);
    }

    pub fn add_link(&mut self, from: LocationId, to: LocationId, distance: f64) {
        self.locations[from.0].links.push(Link {
            endpoint: to,
            distance,
            closed: false,
        });
    }

    pub fn add_closure(&mut self, closure: Closure) {
        self.closures.push(closure);
    }

    pub fn add_agent(
        &mut self,
        location: LocationId,
        movechance: f64,
        awareness: u8,
        speed: f64,
    ) -> AgentId {
        self.push_agent(Agent {
            location,
            movechance,
            awareness,
            speed,
            spawned_on: None,
        })
    }

    pub fn push_agent(&mut self, agent: Agent) -> AgentId {
        let id = AgentId(self.agents.len());
        self.locations[agent.location.0].occupancy += 1;
        self.agents.push(agent);
        id
    }

    /// Reassigns the agent's location and keeps both occupancy counts in step.
    pub fn move_agent(&mut self, agent: AgentId, destination: LocationId) {
        let origin = self.agents[agent.0].location;
        if origin == destination {
            return;
        }
        self.locations[origin.0].occupancy -= 1;
        self.locations[destination.0].occupancy += 1;
        self.agents[agent.0].location = destination;
    }

    /// Writes the day's hazard level. Only the first write per day takes effect.
    pub fn set_hazard_level(&mut self, id: LocationId, day: u32, level: i32) -> bool {
        let location = &mut self.locations[id.0];
        if location.hazard_day == Some(day) {
            warn!(
                "hazard level for {} already set on day {day}; ignoring {level}",
                location.name
            );
            return false;
        }
        location.hazard_day = Some(day);
        location.hazard_level = level;
        true
    }

    pub fn enact_border_closures(&mut self, day: u32) {
        let active: Vec<Closure> = self
            .closures
            .iter()
            .filter(|closure| closure.active(day))
            .copied()
            .collect();
        for index in 0..self.locations.len() {
            let from = LocationId(index);
            for link in &mut self.locations[index].links {
                link.closed = active
                    .iter()
                    .any(|closure| closure.covers(from, link.endpoint));
            }
        }
    }

    pub fn refresh_spawn_weights(&mut self) {
        let pressure = |location: &Location| {
            if location.hazard_level > 0 {
                location.population as f64 * location.hazard_level as f64
            } else {
                0.0
            }
        };
        let total: f64 = self.locations.iter().map(pressure).sum();
        for location in &mut self.locations {
            location.spawn_weight = if total > 0.0 {
                pressure(location) / total
            } else {
                0.0
            };
        }
    }

    pub fn location(&self, id: LocationId) -> &Location {
        &self.locations[id.0]
    }

    pub fn location_mut(&mut self, id: LocationId) -> &mut Location {
        &mut self.locations[id.0]
    }

    pub fn location_id(&self, name: &str) -> Option<LocationId> {
        self.names.get(name).copied()
    }

    pub fn location_by_name(&self, name: &str) -> Option<&Location> {
        self.location_id(name).map(|id| self.location(id))
    }

    pub fn location_ids(&self) -> impl Iterator<Item = LocationId> {
        (0..self.locations.len()).map(LocationId)
    }

    pub fn locations(&self) -> &[Location] {
        &self.locations
    }

    pub fn agent(&self, id: AgentId) -> &Agent {
        &self.agents[id.0]
    }

    pub fn agent_mut(&mut self, id: AgentId) -> &mut Agent {
        &mut self.agents[id.0]
    }

    pub fn agent_ids(&self) -> impl Iterator<Item = AgentId> {
        (0..self.agents.len()).map(AgentId)
    }

    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    pub fn camp_ids(&self) -> Vec<LocationId> {
        self.location_ids()
            .filter(|id| self.location(*id).kind == LocationKind::Camp)
            .collect()
    }

    pub fn camp_names(&self) -> Vec<String> {
        self.camp_ids()
            .into_iter()
            .map(|id| self.location(id).name.clone())
            .collect()
    }

    pub fn num_agents(&self) -> usize {
        self.agents.len()
    }

    /// Agents that have not reached a camp.
    pub fn num_idps(&self) -> usize {
        self.locations
            .iter()
            .filter(|location| location.kind != LocationKind::Camp)
            .map(|location| location.occupancy)
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle() -> (Ecosystem, LocationId, LocationId, LocationId) {
        let mut eco = Ecosystem::new();
        let a = eco.add_location(Location::new("a", 100, LocationKind::EvacuationZone));
        let b = eco.add_location(Location::new("b", 300, LocationKind::Other));
        let c = eco.add_location(Location::new("c", 0, LocationKind::Camp));
        eco.add_route(a, b, 10.0);
        eco.add_route(a, c, 20.0);
        (eco, a, b, c)
    }

    #[test]
    fn moves_keep_occupancy_consistent() {
        let (mut eco, a, _, c) = triangle();
        let agent = eco.add_agent(a, 0.3, 1, 100.0);
        assert_eq!(eco.location(a).occupancy(), 1);
        eco.move_agent(agent, c);
        assert_eq!(eco.location(a).occupancy(), 0);
        assert_eq!(eco.location(c).occupancy(), 1);
        assert_eq!(eco.num_idps(), 0);
        assert_eq!(eco.num_agents(), 1);
    }

    #[test]
    fn closures_apply_in_both_directions_for_their_window() {
        let (mut eco, a, b, _) = triangle();
        eco.add_closure(Closure {
            from: b,
            to: a,
            start_day: 2,
            end_day: 4,
        });
        for (day, expect_closed) in [(1, false), (2, true), (3, true), (4, false)] {
            eco.enact_border_closures(day);
            assert_eq!(eco.location(a).links[0].closed, expect_closed, "day {day}");
            assert_eq!(eco.location(b).links[0].closed, expect_closed, "day {day}");
            assert!(!eco.location(a).links[1].closed);
        }
    }

    #[test]
    fn spawn_weights_follow_hazard_pressure() {
        let (mut eco, a, b, c) = triangle();
        eco.set_hazard_level(a, 0, 3);
        eco.set_hazard_level(b, 0, 1);
        eco.refresh_spawn_weights();
        assert!((eco.location(a).spawn_weight - 0.5).abs() < 1e-12);
        assert!((eco.location(b).spawn_weight - 0.5).abs() < 1e-12);
        assert_eq!(eco.location(c).spawn_weight, 0.0);
    }

    #[test]
    fn hazard_level_is_written_once_per_day() {
        let (mut eco, a, _, _) = triangle();
        assert!(eco.set_hazard_level(a, 5, 2));
        assert!(!eco.set_hazard_level(a, 5, 4));
        assert_eq!(eco.location(a).hazard_level(), 2);
        assert!(eco.set_hazard_level(a, 6, 4));
        assert_eq!(eco.location(a).hazard_level(), 4);
    }
}
