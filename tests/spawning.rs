use chrono::NaiveDate;
use hflee::{
    ecosystem::{Ecosystem, Location, LocationId, LocationKind},
    engine::{EngineBuilder, EngineSettings},
    hazard::HazardTimeSeries,
    policy::HazardPolicy,
    snapshot::SnapshotConfig,
    systems::{AgentProfile, SpawningEngine},
};
use proptest::prelude::*;

fn policy() -> HazardPolicy {
    HazardPolicy::new(
        vec![0.0, 0.1, 0.2, 0.3, 0.4, 0.5],
        vec![0.0, 0.0, 0.1, 0.3, 0.6, 1.0],
        3,
    )
    .unwrap()
}

fn settings(days: u32) -> EngineSettings {
    EngineSettings {
        scenario_name: "spawn_test".into(),
        seed: 5,
        start_date: NaiveDate::from_ymd_opt(2019, 9, 1).unwrap(),
        days,
        workers: 1,
        snapshot: SnapshotConfig::default(),
    }
}

fn shore(population: u64) -> (Ecosystem, LocationId, LocationId) {
    let mut eco = Ecosystem::new();
    let x = eco.add_location(Location::new("x", population, LocationKind::EvacuationZone));
    let z = eco.add_location(Location::new("z", 0, LocationKind::Camp));
    eco.add_route(x, z, 2.0);
    (eco, x, z)
}

#[test]
fn level_four_spawns_six_hundred_with_policy_movechance() {
    let (mut eco, x, _) = shore(1000);
    eco.set_hazard_level(x, 0, 4);
    let report = SpawningEngine::new(AgentProfile::default()).run(0, &mut eco, &policy());
    assert_eq!(report.placed, 600);
    assert_eq!(report.shortfall(), 0);
    assert_eq!(report.by_location, vec![(x, 600)]);
    assert_eq!(eco.location(x).occupancy(), 600);
    assert!(eco
        .agents()
        .iter()
        .all(|agent| agent.movechance == 0.4 && agent.spawned_on == Some(0)));
}

#[test]
fn spawned_agents_follow_existing_ones() {
    let (mut eco, x, z) = shore(100);
    let resident = eco.add_agent(z, 0.3, 1, 100.0);
    eco.set_hazard_level(x, 0, 2);
    SpawningEngine::new(AgentProfile::default()).run(0, &mut eco, &policy());
    assert_eq!(eco.num_agents(), 11);
    assert_eq!(eco.agents()[resident.index()].location, z);
    assert!(eco.agents()[1..].iter().all(|agent| agent.location == x));
}

#[test]
fn calm_locations_spawn_nobody() {
    let (mut eco, _, _) = shore(1000);
    let report = SpawningEngine::new(AgentProfile::default()).run(0, &mut eco, &policy());
    assert_eq!(report.placed, 0);
    assert_eq!(eco.num_agents(), 0);
}

#[test]
fn daily_cap_accumulates_refugee_debt() {
    let (mut eco, x, _) = shore(1000);
    eco.set_hazard_level(x, 0, 4);
    let engine = SpawningEngine::new(AgentProfile::default()).with_daily_cap(Some(250));
    let report = engine.run(0, &mut eco, &policy());
    assert_eq!(report.requested, 600);
    assert_eq!(report.placed, 250);
    assert_eq!(report.shortfall(), 350);
}

#[test]
fn displaced_agents_evacuate_on_their_spawn_day() {
    let (eco, _, z) = shore(1000);
    let mut engine = EngineBuilder::new(settings(2), eco)
        .with_hazard_source(HazardTimeSeries::parse("#Day,x\n0,4\n1,0\n"))
        .with_policy(policy())
        .build()
        .unwrap();

    let day0 = engine.step().unwrap();
    assert_eq!(day0.spawned.placed, 600);
    assert_eq!(day0.decisions.evacuated, 600);
    assert_eq!(engine.ecosystem().location(z).occupancy(), 600);
    assert_eq!(day0.record.simulated_camp_total, 600);

    let day1 = engine.step().unwrap();
    assert_eq!(day1.spawned.placed, 0);
    assert_eq!(day1.record.simulated_total, 600);
}

#[test]
fn capped_engine_reports_cumulative_debt() {
    let (eco, _, _) = shore(1000);
    let mut engine = EngineBuilder::new(settings(3), eco)
        .with_hazard_source(HazardTimeSeries::parse("#Day,x\n0,3\n"))
        .with_policy(policy())
        .with_spawning(SpawningEngine::new(AgentProfile::default()).with_daily_cap(Some(100)))
        .build()
        .unwrap();
    let debts: Vec<u64> = (0..3)
        .map(|_| engine.step().unwrap().record.refugee_debt)
        .collect();
    assert_eq!(debts, vec![200, 400, 600]);
    assert_eq!(engine.refugee_debt(), 600);
}

proptest! {
    #[test]
    fn spawned_count_never_exceeds_population(population in 0_u64..50_000, level in 0_i32..12) {
        let (mut eco, x, _) = shore(population);
        eco.set_hazard_level(x, 0, level);
        let report = SpawningEngine::new(AgentProfile::default()).run(0, &mut eco, &policy());
        prop_assert!(report.placed <= population);
        prop_assert_eq!(eco.num_agents() as u64, report.placed);
    }
}
