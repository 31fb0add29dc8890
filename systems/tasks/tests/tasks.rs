use std::collections::BTreeMap;

use colony_core::{
    BodyPart, ColonyConfig, Position, Role, StructureKind, TaskId, Terrain, WorkerName,
    WorkerRecord,
};
use colony_system_tasks::{claim_first_unclaimed, initialize_territory, reconcile};
use colony_world::World;

fn miner_body() -> Vec<BodyPart> {
    vec![BodyPart::Work, BodyPart::Work, BodyPart::Carry, BodyPart::Move]
}

fn six_slot_world(with_spawn: bool) -> World {
    let mut world = World::new("W1N1");
    let _ = world.add_source(Position::new(10, 10));
    world.set_terrain(Position::new(9, 9), Terrain::Wall);
    world.set_terrain(Position::new(11, 11), Terrain::Wall);
    if with_spawn {
        let _ = world.add_structure(StructureKind::Spawn, Position::new(20, 12));
    }
    world
}

#[test]
fn six_walkable_neighbours_yield_six_tasks() {
    let world = six_slot_world(true);
    let record = initialize_territory(&world, &ColonyConfig::default());

    let ids: Vec<u32> = record.miner_tasks.iter().map(|task| task.task_id.get()).collect();
    assert_eq!(ids, vec![1, 2, 3, 4, 5, 6], "task ids are sequential from one");
    assert!(
        record
            .miner_tasks
            .iter()
            .all(|task| task.miner_position.position.range_to(Position::new(10, 10)) == 1),
        "every task sits next to the node"
    );
    assert_eq!(record.container_positions.len(), 1, "one container per node");
    assert_eq!(
        record.container_positions[0]
            .position
            .range_to(Position::new(10, 10)),
        2
    );
}

#[test]
fn container_is_not_planned_without_a_spawn() {
    let world = six_slot_world(false);
    let record = initialize_territory(&world, &ColonyConfig::default());

    assert_eq!(record.miner_tasks.len(), 6);
    assert!(record.container_positions.is_empty());
}

#[test]
fn reconciled_task_is_claimed_by_the_next_miner() {
    let mut world = six_slot_world(true);
    let record_config = ColonyConfig::default();
    let mut territory = initialize_territory(&world, &record_config);
    let mut workers = BTreeMap::new();

    for name in ["W1N1 - miner0", "W1N1 - miner1", "W1N1 - miner2"] {
        let name = WorkerName::new(name);
        world.add_worker(name.clone(), miner_body(), Position::new(15, 15));
        let _ = workers.insert(name.clone(), WorkerRecord::new(Role::Miner));
        let _ = claim_first_unclaimed(&mut territory, &name);
    }

    let departed = WorkerName::new("W1N1 - miner2");
    let mut events = Vec::new();
    colony_world::apply(
        &mut world,
        colony_core::Command::RemoveWorker {
            name: departed.clone(),
        },
        &mut events,
    );

    let cleared = reconcile(&world, &mut territory, &workers);
    assert_eq!(cleared, vec![departed]);
    assert!(territory
        .task(TaskId::new(3))
        .is_some_and(|task| task.is_unclaimed()));

    let newcomer = WorkerName::new("W1N1 - miner3");
    assert_eq!(
        claim_first_unclaimed(&mut territory, &newcomer),
        Some(TaskId::new(3)),
        "the freed task is the earliest unclaimed one"
    );
}

#[test]
fn reassigned_worker_loses_its_task() {
    let mut world = six_slot_world(true);
    let mut territory = initialize_territory(&world, &ColonyConfig::default());
    let name = WorkerName::new("W1N1 - miner0");
    world.add_worker(name.clone(), miner_body(), Position::new(15, 15));
    let mut workers = BTreeMap::new();
    let _ = workers.insert(name.clone(), WorkerRecord::new(Role::Builder));
    let _ = claim_first_unclaimed(&mut territory, &name);

    assert_eq!(reconcile(&world, &mut territory, &workers), vec![name]);
    assert!(territory.miner_tasks.iter().all(|task| task.is_unclaimed()));
}

#[test]
fn racing_miners_never_share_a_task() {
    let world = six_slot_world(true);
    let mut territory = initialize_territory(&world, &ColonyConfig::default());
    for task in territory.miner_tasks.iter_mut().take(5) {
        task.assigned_miner_name = Some(WorkerName::new(format!("holder{}", task.task_id.get())));
    }

    let first = claim_first_unclaimed(&mut territory, &WorkerName::new("first"));
    let second = claim_first_unclaimed(&mut territory, &WorkerName::new("second"));

    assert_eq!(first, Some(TaskId::new(6)));
    assert_eq!(second, None, "only the first miner claims the last free task");
}
