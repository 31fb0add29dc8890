use colony_core::{
    BodyPart, ColonyConfig, Command, Host, Memory, Position, Role, StructureKind, TaskId,
    TechLevel, TerritoryRecord, WorkerName, WorkerRecord, SCHEMA_VERSION,
};
use colony_system_bootstrap::{Bootstrap, TickReport};
use colony_world::{self as world, World};

fn colony() -> World {
    let mut world = World::new("W1N1");
    let _ = world.add_source(Position::new(10, 10));
    let _ = world.add_source(Position::new(30, 12));
    let _ = world.add_structure(StructureKind::Spawn, Position::new(25, 25));
    world.set_controller(Position::new(40, 40), 2);
    world
}

fn advance(world: &mut World) {
    let mut events = Vec::new();
    world::apply(world, Command::Tick, &mut events);
}

fn replay(ticks: u64) -> (Memory, Vec<TickReport>) {
    let bootstrap = Bootstrap::new(ColonyConfig::default());
    let mut memory = Memory::new();
    let mut hosts = [colony()];
    let mut reports = Vec::new();
    for _ in 0..ticks {
        reports.push(bootstrap.run_tick(&mut memory, &mut hosts));
        advance(&mut hosts[0]);
    }
    (memory, reports)
}

#[test]
fn first_tick_initializes_and_spawns_a_miner() {
    let (memory, reports) = replay(1);

    let first = &reports[0].territories[0];
    assert!(first.initialized);
    assert_eq!(first.spawned, vec![WorkerName::new("W1N1 - miner0")]);
    assert_eq!(memory.territories["W1N1"].miner_tasks.len(), 16);
    assert!(!reports[0].schema_reset);
    assert_eq!(
        first.container,
        Some(memory.territories["W1N1"].container_positions[0].position),
        "maintenance opens the first planned container"
    );
    assert_eq!(first.extension, None);
}

#[test]
fn colony_builds_its_containers_and_hires_a_builder() {
    let bootstrap = Bootstrap::new(ColonyConfig::default());
    let mut memory = Memory::new();
    let mut hosts = [colony()];

    let mut hired = None;
    for _ in 0..6_000 {
        let report = bootstrap.run_tick(&mut memory, &mut hosts);
        hired = report.territories[0]
            .spawned
            .iter()
            .find(|name| {
                memory.workers.get(*name).map(WorkerRecord::role) == Some(Role::Builder)
            })
            .cloned();
        if hired.is_some() {
            break;
        }
        advance(&mut hosts[0]);
    }

    assert!(hired.is_some(), "a builder should be hired once the containers stand");
    assert!(memory.territories["W1N1"].tech_level >= TechLevel::BootstrappingBuilders);
    let containers = hosts[0]
        .structures()
        .into_iter()
        .filter(|structure| structure.kind == StructureKind::Container)
        .count();
    assert_eq!(containers, 2);
}

#[test]
fn replays_are_identical() {
    let (first_memory, first_reports) = replay(400);
    let (second_memory, second_reports) = replay(400);

    assert_eq!(first_memory, second_memory);
    assert_eq!(first_reports, second_reports);
    assert!(
        first_memory.workers.len() > 1,
        "the colony should have grown past its first miner"
    );
}

#[test]
fn outdated_schema_wipes_memory_before_planning() {
    let bootstrap = Bootstrap::new(ColonyConfig::default());
    let mut memory = Memory::new();
    memory.schema_version = Some(SCHEMA_VERSION - 1);
    let _ = memory
        .territories
        .insert("W1N1".to_owned(), TerritoryRecord::new("W1N1", 9, 1));
    let mut hosts = [colony()];

    let report = bootstrap.run_tick(&mut memory, &mut hosts);

    assert!(report.schema_reset);
    assert!(report.territories[0].initialized, "the record is rebuilt");
    assert_eq!(memory.schema_version, Some(SCHEMA_VERSION));
    assert_eq!(memory.territories["W1N1"].desired_builders, 2);
}

#[test]
fn stale_worker_memory_is_collected_on_census_ticks() {
    let bootstrap = Bootstrap::new(ColonyConfig::default());
    let mut memory = Memory::new();
    let ghost = WorkerName::new("W1N2 - builder7");
    let _ = memory
        .workers
        .insert(ghost.clone(), WorkerRecord::new(Role::Builder));
    let mut hosts = [colony()];
    advance(&mut hosts[0]);

    let quiet = bootstrap.run_tick(&mut memory, &mut hosts);
    assert!(quiet.collected.is_empty(), "tick 1 is not a census tick");
    assert!(memory.workers.contains_key(&ghost));

    while hosts[0].time() % 100 != 0 {
        advance(&mut hosts[0]);
    }
    let census = bootstrap.run_tick(&mut memory, &mut hosts);
    assert_eq!(census.collected, vec![ghost.clone()]);
    assert!(!memory.workers.contains_key(&ghost));
    assert!(memory.workers.contains_key(&WorkerName::new("W1N1 - miner0")));
}

#[test]
fn task_of_a_dead_miner_is_released_on_the_next_maintenance_tick() {
    let bootstrap = Bootstrap::new(ColonyConfig::default());
    let mut memory = Memory::new();
    let mut hosts = [colony()];
    let veteran = WorkerName::new("W1N1 - miner100");
    hosts[0].add_worker(
        veteran.clone(),
        vec![BodyPart::Work, BodyPart::Work, BodyPart::Carry, BodyPart::Move],
        Position::new(12, 12),
    );

    let _ = bootstrap.run_tick(&mut memory, &mut hosts);
    let holder = memory.territories["W1N1"]
        .task(TaskId::new(1))
        .and_then(|task| task.assigned_miner_name.clone());
    assert_eq!(holder, Some(veteran.clone()));

    let mut events = Vec::new();
    world::apply(
        &mut hosts[0],
        Command::RemoveWorker {
            name: veteran.clone(),
        },
        &mut events,
    );
    for _ in 0..10 {
        advance(&mut hosts[0]);
    }
    let report = bootstrap.run_tick(&mut memory, &mut hosts);

    assert!(report.territories[0].released.contains(&veteran));
    let holder = memory.territories["W1N1"]
        .task(TaskId::new(1))
        .and_then(|task| task.assigned_miner_name.clone());
    assert_ne!(holder, Some(veteran));
}
