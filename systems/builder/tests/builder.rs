use std::collections::BTreeMap;

use colony_core::{
    BodyPart, BuilderMemory, BuilderPhase, ColonyConfig, Command, Host, Position, StructureId,
    StructureKind, TechLevel, TerritoryRecord, WorkerName, WorkerRecord,
};
use colony_system_builder::{container_loads, Builder};
use colony_system_scanner::scan;
use colony_system_tasks::initialize_territory;
use colony_world::{self as world, query, ActionKind, World};

struct Fixture {
    world: World,
    territory: TerritoryRecord,
    workers: BTreeMap<WorkerName, WorkerRecord>,
    config: ColonyConfig,
}

impl Fixture {
    fn new() -> Self {
        let mut world = World::new("W1N1");
        let _ = world.add_source(Position::new(10, 10));
        let _ = world.add_structure(StructureKind::Spawn, Position::new(25, 25));
        world.set_controller(Position::new(40, 40), 2);
        let config = ColonyConfig::default();
        let territory = initialize_territory(&world, &config);
        Self {
            world,
            territory,
            workers: BTreeMap::new(),
            config,
        }
    }

    fn add_builder(&mut self, name: &str, position: Position, phase: BuilderPhase) -> WorkerName {
        let name = WorkerName::new(name);
        self.world.add_worker(
            name.clone(),
            vec![
                BodyPart::Work,
                BodyPart::Carry,
                BodyPart::Carry,
                BodyPart::Move,
                BodyPart::Move,
            ],
            position,
        );
        let _ = self.workers.insert(
            name.clone(),
            WorkerRecord::Builder(BuilderMemory {
                container: None,
                phase,
            }),
        );
        name
    }

    fn command(&mut self, command: Command) {
        let mut events = Vec::new();
        world::apply(&mut self.world, command, &mut events);
    }

    fn fill(&mut self, structure: StructureId, energy: u32) {
        self.command(Command::SetStructureEnergy { structure, energy });
    }

    fn carry(&mut self, name: &WorkerName, carried: u32) {
        self.command(Command::SetWorkerEnergy {
            name: name.clone(),
            carried,
        });
    }

    fn tick(&mut self) {
        let census = scan(&self.world, &mut self.territory, &mut self.workers, &self.config);
        let builder = Builder::new(&self.config);
        for worker in &census.workers {
            builder.run(
                &mut self.world,
                &mut self.territory,
                &mut self.workers,
                &census,
                worker,
            );
        }
    }

    fn phase(&self, name: &WorkerName) -> Option<BuilderPhase> {
        match self.workers.get(name) {
            Some(WorkerRecord::Builder(memory)) => Some(memory.phase),
            _ => None,
        }
    }

    fn acted(&self, kind: &ActionKind) -> bool {
        query::actions(&self.world)
            .iter()
            .any(|record| &record.kind == kind)
    }
}

#[test]
fn full_target_is_replaced_by_a_deficient_structure() {
    let mut fixture = Fixture::new();
    let full = fixture
        .world
        .add_structure(StructureKind::Extension, Position::new(27, 27));
    let empty = fixture
        .world
        .add_structure(StructureKind::Extension, Position::new(30, 30));
    fixture.fill(full, 50);
    let name = fixture.add_builder(
        "W1N1 - builder0",
        Position::new(26, 26),
        BuilderPhase::Delivering { target: Some(full) },
    );
    fixture.carry(&name, 100);

    fixture.tick();

    assert_eq!(
        fixture.phase(&name),
        Some(BuilderPhase::Delivering {
            target: Some(empty)
        }),
        "full extension should be replaced by the one with spare capacity"
    );
    assert!(fixture.territory.extension_ids_assigned.contains(&empty));
    assert!(fixture.acted(&ActionKind::Transfer { structure: empty }));
    assert!(fixture.acted(&ActionKind::Move {
        goal: Position::new(30, 30)
    }));
}

#[test]
fn full_target_without_replacement_falls_through_to_build() {
    let mut fixture = Fixture::new();
    let full = fixture
        .world
        .add_structure(StructureKind::Extension, Position::new(27, 27));
    fixture.fill(full, 50);
    let site = fixture
        .world
        .add_construction_site(StructureKind::Road, Position::new(28, 28));
    let name = fixture.add_builder(
        "W1N1 - builder0",
        Position::new(26, 26),
        BuilderPhase::Delivering { target: Some(full) },
    );
    fixture.carry(&name, 100);

    fixture.tick();

    assert_eq!(
        fixture.phase(&name),
        Some(BuilderPhase::Delivering { target: None })
    );
    assert!(fixture.acted(&ActionKind::Build { site }));
    assert!(!fixture.acted(&ActionKind::Upgrade));
}

#[test]
fn repair_takes_priority_over_build() {
    let mut fixture = Fixture::new();
    let damaged = fixture
        .world
        .add_structure(StructureKind::Extension, Position::new(27, 27));
    fixture.fill(damaged, 50);
    fixture.command(Command::DamageStructure {
        structure: damaged,
        amount: 500,
    });
    let _ = fixture
        .world
        .add_construction_site(StructureKind::Road, Position::new(28, 28));
    let name = fixture.add_builder(
        "W1N1 - builder0",
        Position::new(26, 26),
        BuilderPhase::Delivering { target: None },
    );
    fixture.carry(&name, 100);

    fixture.tick();

    assert!(fixture.acted(&ActionKind::Repair { structure: damaged }));
    assert!(query::actions(&fixture.world)
        .iter()
        .all(|record| !matches!(record.kind, ActionKind::Build { .. })));
}

#[test]
fn idle_builder_commits_to_upgrading() {
    let mut fixture = Fixture::new();
    let name = fixture.add_builder(
        "W1N1 - builder0",
        Position::new(26, 26),
        BuilderPhase::Delivering { target: None },
    );
    fixture.carry(&name, 100);

    fixture.tick();

    assert_eq!(fixture.phase(&name), Some(BuilderPhase::Upgrading));
    assert!(fixture.acted(&ActionKind::Upgrade));
    assert!(fixture.acted(&ActionKind::Move {
        goal: Position::new(40, 40)
    }));
}

#[test]
fn critical_grace_abandons_delivery_the_same_tick() {
    let mut fixture = Fixture::new();
    let extension = fixture
        .world
        .add_structure(StructureKind::Extension, Position::new(27, 27));
    let name = fixture.add_builder(
        "W1N1 - builder0",
        Position::new(26, 26),
        BuilderPhase::Delivering {
            target: Some(extension),
        },
    );
    fixture.carry(&name, 100);
    fixture.command(Command::SetControllerGrace { ticks: 500 });

    fixture.tick();

    assert_eq!(fixture.phase(&name), Some(BuilderPhase::Upgrading));
    assert!(fixture.acted(&ActionKind::Upgrade));
    assert!(
        !fixture.acted(&ActionKind::Transfer {
            structure: extension
        }),
        "delivery is abandoned when the controller is about to decay"
    );
}

#[test]
fn emptied_builder_returns_to_gathering() {
    let mut fixture = Fixture::new();
    let name = fixture.add_builder(
        "W1N1 - builder0",
        Position::new(26, 26),
        BuilderPhase::Upgrading,
    );

    fixture.tick();

    assert_eq!(fixture.phase(&name), Some(BuilderPhase::Gathering));
    assert!(
        fixture.acted(&ActionKind::Harvest {
            source: fixture.territory.energy_sources[0].source
        }),
        "without a container the builder harvests the first node"
    );
}

#[test]
fn gathering_builder_withdraws_from_least_loaded_container() {
    let mut fixture = Fixture::new();
    let busy = fixture
        .world
        .add_structure(StructureKind::Container, Position::new(12, 12));
    let quiet = fixture
        .world
        .add_structure(StructureKind::Container, Position::new(20, 20));
    fixture.fill(quiet, 500);
    let _ = fixture.workers.insert(
        WorkerName::new("W1N1 - builder9"),
        WorkerRecord::Builder(BuilderMemory {
            container: Some(busy),
            phase: BuilderPhase::Gathering,
        }),
    );
    let name = fixture.add_builder(
        "W1N1 - builder0",
        Position::new(21, 21),
        BuilderPhase::Gathering,
    );

    fixture.tick();

    match fixture.workers.get(&name) {
        Some(WorkerRecord::Builder(memory)) => assert_eq!(memory.container, Some(quiet)),
        other => panic!("unexpected record: {other:?}"),
    }
    assert!(fixture.acted(&ActionKind::Withdraw { structure: quiet }));
    assert_eq!(fixture.world.worker(&name).map(|worker| worker.carried), Some(100));
}

#[test]
fn container_loads_count_assigned_builders() {
    let mut fixture = Fixture::new();
    let first = fixture
        .world
        .add_structure(StructureKind::Container, Position::new(12, 12));
    let second = fixture
        .world
        .add_structure(StructureKind::Container, Position::new(20, 20));
    for (index, container) in [first, first, second].into_iter().enumerate() {
        let _ = fixture.workers.insert(
            WorkerName::new(format!("b{index}")),
            WorkerRecord::Builder(BuilderMemory {
                container: Some(container),
                phase: BuilderPhase::Gathering,
            }),
        );
    }

    let census = scan(
        &fixture.world,
        &mut fixture.territory,
        &mut BTreeMap::new(),
        &fixture.config,
    );

    assert_eq!(
        container_loads(&census, &fixture.workers),
        vec![(first, 2), (second, 1)]
    );
}

#[test]
fn one_road_site_per_tick_across_builders() {
    let mut fixture = Fixture::new();
    for (name, x) in [("W1N1 - builder0", 20), ("W1N1 - builder1", 22)] {
        let _ = fixture.add_builder(name, Position::new(x, 30), BuilderPhase::Gathering);
    }

    let census = scan(
        &fixture.world,
        &mut fixture.territory,
        &mut fixture.workers,
        &fixture.config,
    );
    assert!(census.due.lay_roads, "tick zero is a maintenance tick");
    fixture.territory.tech_level = TechLevel::NeedExtensions;
    let builder = Builder::new(&fixture.config);
    for worker in &census.workers {
        builder.run(
            &mut fixture.world,
            &mut fixture.territory,
            &mut fixture.workers,
            &census,
            worker,
        );
    }

    let roads: Vec<_> = fixture
        .world
        .construction_sites()
        .into_iter()
        .filter(|site| site.kind == StructureKind::Road)
        .collect();
    assert_eq!(roads.len(), 1);
    assert_eq!(
        roads[0].position,
        Position::new(20, 30),
        "the first builder dispatched claims the road budget"
    );
    assert_eq!(fixture.territory.builds_this_tick, 1);
}
