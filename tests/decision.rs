use hflee::{
    ecosystem::{Ecosystem, Location, LocationId, LocationKind},
    policy::HazardPolicy,
    rng::RngManager,
    systems::{
        evacuation_target, AgentBehavior, Decision, DecisionEngine, DecisionState,
        HazardAwareBehavior,
    },
};
use proptest::prelude::*;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

fn policy(movechance: Vec<f64>) -> HazardPolicy {
    HazardPolicy::new(movechance, vec![0.0, 0.0, 0.1, 0.3, 0.6, 1.0], 3).unwrap()
}

struct Coast {
    eco: Ecosystem,
    x: LocationId,
    y: LocationId,
    z: LocationId,
    w: LocationId,
}

/// X (evacuation zone) links to Y (safe zone, 5), Z (camp, 2) and W (other, 1).
fn coast(x_kind: LocationKind) -> Coast {
    let mut eco = Ecosystem::new();
    let x = eco.add_location(Location::new("x", 1000, x_kind));
    let y = eco.add_location(Location::new("y", 0, LocationKind::SafeZone));
    let z = eco.add_location(Location::new("z", 0, LocationKind::Camp));
    let w = eco.add_location(Location::new("w", 200, LocationKind::Other));
    eco.add_route(x, y, 5.0);
    eco.add_route(x, z, 2.0);
    eco.add_route(x, w, 1.0);
    Coast { eco, x, y, z, w }
}

fn decide(eco: &Ecosystem, policy: &HazardPolicy, seed: u64) -> Decision {
    let agent = eco.agents().first().expect("agent placed");
    let state = DecisionState {
        ecosystem: eco,
        agent,
        policy,
    };
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    HazardAwareBehavior::new().choose_destination(&state, &mut rng)
}

#[test]
fn below_threshold_evacuation_zone_does_not_evacuate() {
    let mut coast = coast(LocationKind::EvacuationZone);
    coast.eco.set_hazard_level(coast.x, 0, 1);
    coast.eco.add_agent(coast.x, 0.3, 1, 100.0);
    let policy = policy(vec![0.0; 6]);
    for seed in 0..50 {
        assert_eq!(decide(&coast.eco, &policy, seed), Decision::Stay);
    }
}

#[test]
fn evacuation_picks_nearest_refuge() {
    let mut coast = coast(LocationKind::EvacuationZone);
    coast.eco.set_hazard_level(coast.x, 0, 4);
    coast.eco.add_agent(coast.x, 0.3, 1, 100.0);
    let policy = policy(vec![0.0; 6]);
    assert_eq!(decide(&coast.eco, &policy, 1), Decision::Evacuate(coast.z));
    assert_eq!(evacuation_target(&coast.eco, coast.x), Some(coast.z));
}

#[test]
fn closed_links_are_not_evacuation_routes() {
    let mut coast = coast(LocationKind::EvacuationZone);
    coast.eco.set_hazard_level(coast.x, 0, 4);
    coast.eco.location_mut(coast.x).links[1].closed = true;
    assert_eq!(evacuation_target(&coast.eco, coast.x), Some(coast.y));

    coast.eco.location_mut(coast.x).links[0].closed = true;
    coast.eco.add_agent(coast.x, 0.3, 1, 100.0);
    assert_eq!(evacuation_target(&coast.eco, coast.x), None);
    assert_eq!(decide(&coast.eco, &policy(vec![1.0; 6]), 9), Decision::Stay);
}

#[test]
fn equal_distances_keep_declaration_order() {
    let mut eco = Ecosystem::new();
    let x = eco.add_location(Location::new("x", 10, LocationKind::EvacuationZone));
    let first = eco.add_location(Location::new("first", 0, LocationKind::Camp));
    let second = eco.add_location(Location::new("second", 0, LocationKind::SafeZone));
    eco.add_route(x, first, 4.0);
    eco.add_route(x, second, 4.0);
    assert_eq!(evacuation_target(&eco, x), Some(first));
}

#[test]
fn calm_locations_never_move() {
    let mut coast = coast(LocationKind::Other);
    coast.eco.add_agent(coast.x, 1.0, 1, 100.0);
    let policy = policy(vec![1.0; 6]);
    for seed in 0..50 {
        assert_eq!(decide(&coast.eco, &policy, seed), Decision::Stay);
    }
}

#[test]
fn hazard_below_evacuation_uses_movechance() {
    let mut coast = coast(LocationKind::EvacuationZone);
    coast.eco.set_hazard_level(coast.x, 0, 2);
    coast.eco.add_agent(coast.x, 0.0, 1, 100.0);

    let never = policy(vec![0.0; 6]);
    let always = policy(vec![1.0; 6]);
    for seed in 0..50 {
        assert_eq!(decide(&coast.eco, &never, seed), Decision::Stay);
        match decide(&coast.eco, &always, seed) {
            Decision::Relocate {
                destination,
                movechance,
            } => {
                assert!([coast.y, coast.z, coast.w].contains(&destination));
                assert_eq!(movechance, 1.0);
            }
            other => panic!("expected a relocation, got {other:?}"),
        }
    }
}

proptest! {
    #[test]
    fn identical_inputs_give_identical_decisions(seed in any::<u64>(), level in 0_i32..6, evac in any::<bool>()) {
        let kind = if evac { LocationKind::EvacuationZone } else { LocationKind::Other };
        let mut coast = coast(kind);
        coast.eco.set_hazard_level(coast.x, 0, level);
        coast.eco.add_agent(coast.x, 0.3, 1, 100.0);
        let policy = policy(vec![0.0, 0.2, 0.4, 0.6, 0.8, 1.0]);
        prop_assert_eq!(decide(&coast.eco, &policy, seed), decide(&coast.eco, &policy, seed));
    }
}

#[test]
fn worker_count_does_not_change_decisions() {
    let mut coast = coast(LocationKind::Other);
    coast.eco.set_hazard_level(coast.x, 0, 3);
    for _ in 0..997 {
        coast.eco.add_agent(coast.x, 0.3, 1, 100.0);
    }
    let policy = policy(vec![0.0, 0.2, 0.4, 0.5, 0.8, 1.0]);
    let behavior = HazardAwareBehavior::new();
    let rng = RngManager::new(11);

    let single = DecisionEngine::new(1).decide(0, &coast.eco, &behavior, &policy, &rng);
    let split = DecisionEngine::new(4).decide(0, &coast.eco, &behavior, &policy, &rng);
    assert_eq!(single.len(), 997);
    assert_eq!(single, split);
    assert!(single.iter().any(|d| *d == Decision::Stay));
    assert!(single.iter().any(|d| d.destination().is_some()));
}

#[test]
fn run_applies_moves_and_updates_occupancy() {
    let mut coast = coast(LocationKind::EvacuationZone);
    coast.eco.set_hazard_level(coast.x, 0, 5);
    for _ in 0..10 {
        coast.eco.add_agent(coast.x, 0.3, 1, 100.0);
    }
    let report = DecisionEngine::new(2).run(
        0,
        &mut coast.eco,
        &HazardAwareBehavior::new(),
        &policy(vec![0.0; 6]),
        &RngManager::new(3),
    );
    assert_eq!(report.evacuated, 10);
    assert_eq!(coast.eco.location(coast.x).occupancy(), 0);
    assert_eq!(coast.eco.location(coast.z).occupancy(), 10);
    assert!(coast.eco.agents().iter().all(|agent| agent.location == coast.z));
}
