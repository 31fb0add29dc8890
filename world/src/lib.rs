#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Deterministic in-memory territory implementing the colony [`Host`] contract.
//!
//! The world stands in for the host game engine in tests and in the command
//! line adapter. Systems act on it through [`Host`]; simulation-side effects
//! such as the passage of time or a worker dying are requested with
//! [`Command`] values through [`apply`], which reports what happened as
//! [`Event`] values.

use colony_core::{
    ActionError, ActionResult, BodyPart, Command, ControllerSnapshot, Event, Host, Position,
    SiteId, SiteSnapshot, SourceId, SourceSnapshot, StructureId, StructureKind,
    StructureSnapshot, Terrain, WorkerName, WorkerSnapshot, ROOM_SIZE,
};

const SOURCE_CAPACITY: u32 = 3_000;
const SOURCE_REGEN_TICKS: u64 = 300;
const CARRY_CAPACITY: u32 = 50;
const HARVEST_POWER: u32 = 2;
const BUILD_POWER: u32 = 5;
const REPAIR_POWER: u32 = 100;
const UPGRADE_POWER: u32 = 1;
const SPAWN_TICKS_PER_PART: u32 = 3;
const CONTROLLER_GRACE_TICKS: u32 = 20_000;
const SPAWN_ENERGY_FLOOR: u32 = 300;
const ADJACENT_RANGE: u32 = 1;
const WORK_RANGE: u32 = 3;

/// Kind of action recorded in the per-tick action log.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ActionKind {
    /// Step toward a goal cell.
    Move {
        /// Cell the worker was heading for.
        goal: Position,
    },
    /// Harvest from a resource node.
    Harvest {
        /// Targeted node.
        source: SourceId,
    },
    /// Withdraw energy from a structure.
    Withdraw {
        /// Targeted structure.
        structure: StructureId,
    },
    /// Transfer energy into a structure.
    Transfer {
        /// Targeted structure.
        structure: StructureId,
    },
    /// Work on a construction site.
    Build {
        /// Targeted site.
        site: SiteId,
    },
    /// Repair a structure.
    Repair {
        /// Targeted structure.
        structure: StructureId,
    },
    /// Upgrade the controller.
    Upgrade,
    /// Produce a worker.
    Spawn {
        /// Spawn asked to produce the worker.
        spawn: StructureId,
        /// Requested worker name.
        name: WorkerName,
    },
    /// Open a construction site.
    PlaceSite {
        /// Structure kind requested.
        kind: StructureKind,
        /// Requested cell.
        position: Position,
    },
}

/// Entry in the action log kept since the last tick.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ActionRecord {
    /// Worker that acted, absent for territory-level requests.
    pub actor: Option<WorkerName>,
    /// Requested action.
    pub kind: ActionKind,
    /// Outcome reported to the caller.
    pub result: ActionResult,
}

#[derive(Clone, Debug)]
struct Source {
    id: SourceId,
    position: Position,
    energy: u32,
}

#[derive(Clone, Debug)]
struct Structure {
    id: StructureId,
    kind: StructureKind,
    position: Position,
    hits: u32,
    hits_max: u32,
    energy: u32,
    energy_capacity: u32,
    spawning: Option<WorkerName>,
}

impl Structure {
    fn new(id: StructureId, kind: StructureKind, position: Position) -> Self {
        let (hits, hits_max, energy, energy_capacity) = match kind {
            StructureKind::Spawn => (5_000, 5_000, 300, 300),
            StructureKind::Extension => (1_000, 1_000, 0, 50),
            StructureKind::Tower => (3_000, 3_000, 0, 1_000),
            StructureKind::Container => (250_000, 250_000, 0, 2_000),
            StructureKind::Storage => (10_000, 10_000, 0, 1_000_000),
            StructureKind::Road => (5_000, 5_000, 0, 0),
            StructureKind::Wall => (1, 300_000_000, 0, 0),
            StructureKind::Rampart => (1, 300_000, 0, 0),
        };
        Self {
            id,
            kind,
            position,
            hits,
            hits_max,
            energy,
            energy_capacity,
            spawning: None,
        }
    }

    fn blocks_movement(&self) -> bool {
        !matches!(
            self.kind,
            StructureKind::Road | StructureKind::Container | StructureKind::Rampart
        )
    }

    fn snapshot(&self) -> StructureSnapshot {
        StructureSnapshot {
            id: self.id,
            kind: self.kind,
            position: self.position,
            hits: self.hits,
            hits_max: self.hits_max,
            energy: self.energy,
            energy_capacity: self.energy_capacity,
            spawning: self.spawning.is_some(),
        }
    }
}

#[derive(Clone, Debug)]
struct Site {
    id: SiteId,
    kind: StructureKind,
    position: Position,
    progress: u32,
    progress_total: u32,
}

impl Site {
    fn progress_total(kind: StructureKind) -> u32 {
        match kind {
            StructureKind::Spawn => 15_000,
            StructureKind::Extension => 3_000,
            StructureKind::Tower | StructureKind::Container => 5_000,
            StructureKind::Storage => 30_000,
            StructureKind::Road => 300,
            StructureKind::Wall | StructureKind::Rampart => 1,
        }
    }
}

#[derive(Clone, Debug)]
struct Controller {
    position: Position,
    level: u8,
    ticks_to_downgrade: u32,
    progress: u64,
}

#[derive(Clone, Debug)]
struct Worker {
    name: WorkerName,
    body: Vec<BodyPart>,
    position: Position,
    carried: u32,
    spawning_ticks: u32,
}

impl Worker {
    fn parts(&self, part: BodyPart) -> u32 {
        self.body.iter().filter(|candidate| **candidate == part).count() as u32
    }

    fn capacity(&self) -> u32 {
        self.parts(BodyPart::Carry) * CARRY_CAPACITY
    }

    fn free_capacity(&self) -> u32 {
        self.capacity().saturating_sub(self.carried)
    }

    fn snapshot(&self) -> WorkerSnapshot {
        WorkerSnapshot {
            name: self.name.clone(),
            position: self.position,
            carried: self.carried,
            capacity: self.capacity(),
            spawning: self.spawning_ticks > 0,
        }
    }
}

/// Authoritative state of one simulated territory.
#[derive(Clone, Debug)]
pub struct World {
    name: String,
    time: u64,
    terrain: Vec<Terrain>,
    sources: Vec<Source>,
    structures: Vec<Structure>,
    sites: Vec<Site>,
    controller: Option<Controller>,
    workers: Vec<Worker>,
    next_object_id: u32,
    actions: Vec<ActionRecord>,
}

impl World {
    /// Creates an empty plain territory with the provided name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        let cells = usize::try_from(ROOM_SIZE * ROOM_SIZE).unwrap_or(0);
        Self {
            name: name.into(),
            time: 0,
            terrain: vec![Terrain::Plain; cells],
            sources: Vec::new(),
            structures: Vec::new(),
            sites: Vec::new(),
            controller: None,
            workers: Vec::new(),
            next_object_id: 1,
            actions: Vec::new(),
        }
    }

    /// Overwrites the terrain of a cell; positions outside the grid are ignored.
    pub fn set_terrain(&mut self, position: Position, terrain: Terrain) {
        if let Some(index) = terrain_index(position) {
            self.terrain[index] = terrain;
        }
    }

    /// Places a full resource node.
    pub fn add_source(&mut self, position: Position) -> SourceId {
        let id = SourceId::new(self.allocate_id());
        self.sources.push(Source {
            id,
            position,
            energy: SOURCE_CAPACITY,
        });
        id
    }

    /// Places a finished structure with the default durability and store of its kind.
    pub fn add_structure(&mut self, kind: StructureKind, position: Position) -> StructureId {
        let id = StructureId::new(self.allocate_id());
        self.structures.push(Structure::new(id, kind, position));
        id
    }

    /// Opens a construction site without the placement checks of the host action.
    pub fn add_construction_site(&mut self, kind: StructureKind, position: Position) -> SiteId {
        let id = SiteId::new(self.allocate_id());
        self.sites.push(Site {
            id,
            kind,
            position,
            progress: 0,
            progress_total: Site::progress_total(kind),
        });
        id
    }

    /// Places the controller with a full grace period.
    pub fn set_controller(&mut self, position: Position, level: u8) {
        self.controller = Some(Controller {
            position,
            level,
            ticks_to_downgrade: CONTROLLER_GRACE_TICKS,
            progress: 0,
        });
    }

    /// Places a live, empty worker.
    pub fn add_worker(&mut self, name: WorkerName, body: Vec<BodyPart>, position: Position) {
        self.workers.push(Worker {
            name,
            body,
            position,
            carried: 0,
            spawning_ticks: 0,
        });
    }

    fn allocate_id(&mut self) -> u32 {
        let id = self.next_object_id;
        self.next_object_id += 1;
        id
    }

    fn record(
        &mut self,
        actor: Option<&WorkerName>,
        kind: ActionKind,
        result: ActionResult,
    ) -> ActionResult {
        self.actions.push(ActionRecord {
            actor: actor.cloned(),
            kind,
            result: result.clone(),
        });
        result
    }

    fn live_worker(&self, name: &WorkerName) -> Result<usize, ActionError> {
        let index = self
            .workers
            .iter()
            .position(|worker| &worker.name == name)
            .ok_or(ActionError::InvalidTarget)?;
        if self.workers[index].spawning_ticks > 0 {
            return Err(ActionError::Busy);
        }
        Ok(index)
    }

    fn structure_index(&self, id: StructureId) -> Result<usize, ActionError> {
        self.structures
            .iter()
            .position(|structure| structure.id == id)
            .ok_or(ActionError::InvalidTarget)
    }

    fn terrain_at(&self, position: Position) -> Terrain {
        terrain_index(position).map_or(Terrain::Wall, |index| self.terrain[index])
    }

    fn is_passable(&self, position: Position) -> bool {
        self.terrain_at(position).is_walkable()
            && !self
                .structures
                .iter()
                .any(|structure| structure.position == position && structure.blocks_movement())
    }

    fn step_toward(&self, from: Position, goal: Position) -> Option<Position> {
        let dx = (goal.x() - from.x()).signum();
        let dy = (goal.y() - from.y()).signum();
        [(dx, dy), (dx, 0), (0, dy)]
            .into_iter()
            .filter(|(step_x, step_y)| *step_x != 0 || *step_y != 0)
            .map(|(step_x, step_y)| from.offset(step_x, step_y))
            .find(|candidate| self.is_passable(*candidate))
    }

    fn free_cell_near(&self, origin: Position) -> Position {
        origin
            .neighbours()
            .into_iter()
            .find(|cell| self.is_passable(*cell))
            .unwrap_or(origin)
    }

    fn harvest_inner(&mut self, worker: &WorkerName, source: SourceId) -> ActionResult {
        let index = self.live_worker(worker)?;
        let source = self
            .sources
            .iter_mut()
            .find(|candidate| candidate.id == source)
            .ok_or(ActionError::InvalidTarget)?;
        let worker = &mut self.workers[index];
        if worker.position.range_to(source.position) > ADJACENT_RANGE {
            return Err(ActionError::NotInRange);
        }
        if source.energy == 0 {
            return Err(ActionError::NotEnoughResources);
        }
        if worker.free_capacity() == 0 {
            return Err(ActionError::Full);
        }
        let amount = (worker.parts(BodyPart::Work) * HARVEST_POWER)
            .min(source.energy)
            .min(worker.free_capacity());
        source.energy -= amount;
        worker.carried += amount;
        Ok(())
    }

    fn withdraw_inner(&mut self, worker: &WorkerName, structure: StructureId) -> ActionResult {
        let index = self.live_worker(worker)?;
        let target = self.structure_index(structure)?;
        let (worker, structure) = (&mut self.workers[index], &mut self.structures[target]);
        if worker.position.range_to(structure.position) > ADJACENT_RANGE {
            return Err(ActionError::NotInRange);
        }
        if structure.energy == 0 {
            return Err(ActionError::NotEnoughResources);
        }
        if worker.free_capacity() == 0 {
            return Err(ActionError::Full);
        }
        let amount = structure.energy.min(worker.free_capacity());
        structure.energy -= amount;
        worker.carried += amount;
        Ok(())
    }

    fn transfer_inner(&mut self, worker: &WorkerName, structure: StructureId) -> ActionResult {
        let index = self.live_worker(worker)?;
        let target = self.structure_index(structure)?;
        let (worker, structure) = (&mut self.workers[index], &mut self.structures[target]);
        if worker.position.range_to(structure.position) > ADJACENT_RANGE {
            return Err(ActionError::NotInRange);
        }
        if worker.carried == 0 {
            return Err(ActionError::NotEnoughResources);
        }
        let spare = structure.energy_capacity.saturating_sub(structure.energy);
        if spare == 0 {
            return Err(ActionError::Full);
        }
        let amount = worker.carried.min(spare);
        worker.carried -= amount;
        structure.energy += amount;
        Ok(())
    }

    fn build_inner(&mut self, worker: &WorkerName, site: SiteId) -> ActionResult {
        let index = self.live_worker(worker)?;
        let site_index = self
            .sites
            .iter()
            .position(|candidate| candidate.id == site)
            .ok_or(ActionError::InvalidTarget)?;
        let (worker, site) = (&mut self.workers[index], &mut self.sites[site_index]);
        if worker.position.range_to(site.position) > WORK_RANGE {
            return Err(ActionError::NotInRange);
        }
        if worker.carried == 0 {
            return Err(ActionError::NotEnoughResources);
        }
        let amount = (worker.parts(BodyPart::Work) * BUILD_POWER)
            .min(worker.carried)
            .min(site.progress_total - site.progress);
        worker.carried -= amount;
        site.progress += amount;
        if site.progress >= site.progress_total {
            let finished = self.sites.remove(site_index);
            let _ = self.add_structure(finished.kind, finished.position);
        }
        Ok(())
    }

    fn repair_inner(&mut self, worker: &WorkerName, structure: StructureId) -> ActionResult {
        let index = self.live_worker(worker)?;
        let target = self.structure_index(structure)?;
        let (worker, structure) = (&mut self.workers[index], &mut self.structures[target]);
        if worker.position.range_to(structure.position) > WORK_RANGE {
            return Err(ActionError::NotInRange);
        }
        if worker.carried == 0 {
            return Err(ActionError::NotEnoughResources);
        }
        let missing = structure.hits_max - structure.hits;
        if missing == 0 {
            return Err(ActionError::InvalidTarget);
        }
        let spent = worker.parts(BodyPart::Work).min(worker.carried).max(1);
        worker.carried -= spent;
        structure.hits += (spent * REPAIR_POWER).min(missing);
        Ok(())
    }

    fn upgrade_inner(&mut self, worker: &WorkerName) -> ActionResult {
        let index = self.live_worker(worker)?;
        let controller = self.controller.as_mut().ok_or(ActionError::InvalidTarget)?;
        let worker = &mut self.workers[index];
        if worker.position.range_to(controller.position) > WORK_RANGE {
            return Err(ActionError::NotInRange);
        }
        if worker.carried == 0 {
            return Err(ActionError::NotEnoughResources);
        }
        let spent = (worker.parts(BodyPart::Work) * UPGRADE_POWER).min(worker.carried);
        worker.carried -= spent;
        controller.progress += u64::from(spent);
        controller.ticks_to_downgrade = CONTROLLER_GRACE_TICKS;
        Ok(())
    }

    fn move_inner(&mut self, worker: &WorkerName, goal: Position) -> ActionResult {
        let index = self.live_worker(worker)?;
        let from = self.workers[index].position;
        if from == goal {
            return Ok(());
        }
        let next = self
            .step_toward(from, goal)
            .ok_or_else(|| ActionError::Rejected("no path".into()))?;
        self.workers[index].position = next;
        Ok(())
    }

    fn spawn_inner(
        &mut self,
        spawn: StructureId,
        body: &[BodyPart],
        name: &WorkerName,
    ) -> ActionResult {
        let index = self.structure_index(spawn)?;
        if self.structures[index].kind != StructureKind::Spawn {
            return Err(ActionError::InvalidTarget);
        }
        if self.structures[index].spawning.is_some() {
            return Err(ActionError::Busy);
        }
        if self.workers.iter().any(|worker| &worker.name == name) {
            return Err(ActionError::Rejected(format!("name {name} already in use")));
        }
        let cost = BodyPart::body_cost(body);
        if cost > self.energy_available() {
            return Err(ActionError::NotEnoughResources);
        }

        let mut owed = cost;
        let mut payers: Vec<&mut Structure> = self
            .structures
            .iter_mut()
            .filter(|structure| {
                matches!(structure.kind, StructureKind::Spawn | StructureKind::Extension)
            })
            .collect();
        payers.sort_by_key(|structure| (structure.kind != StructureKind::Spawn, structure.id));
        for payer in payers {
            let paid = payer.energy.min(owed);
            payer.energy -= paid;
            owed -= paid;
        }

        let position = self.structures[index].position;
        self.structures[index].spawning = Some(name.clone());
        self.workers.push(Worker {
            name: name.clone(),
            body: body.to_vec(),
            position,
            carried: 0,
            spawning_ticks: body.len() as u32 * SPAWN_TICKS_PER_PART,
        });
        Ok(())
    }

    fn place_site_inner(&mut self, position: Position, kind: StructureKind) -> ActionResult {
        if !self.terrain_at(position).is_walkable() {
            return Err(ActionError::InvalidTarget);
        }
        let occupied = self
            .structures
            .iter()
            .any(|structure| structure.position == position)
            || self.sites.iter().any(|site| site.position == position);
        if occupied {
            return Err(ActionError::Rejected(format!("{position} is occupied")));
        }
        let _ = self.add_construction_site(kind, position);
        Ok(())
    }

    fn advance(&mut self, out_events: &mut Vec<Event>) {
        self.time = self.time.saturating_add(1);
        self.actions.clear();

        let mut finished = Vec::new();
        for worker in &mut self.workers {
            if worker.spawning_ticks > 0 {
                worker.spawning_ticks -= 1;
                if worker.spawning_ticks == 0 {
                    finished.push(worker.name.clone());
                }
            }
        }
        for name in finished {
            let Some(spawn_index) = self
                .structures
                .iter()
                .position(|structure| structure.spawning.as_ref() == Some(&name))
            else {
                continue;
            };
            let spawn = self.structures[spawn_index].id;
            let exit = self.free_cell_near(self.structures[spawn_index].position);
            self.structures[spawn_index].spawning = None;
            if let Some(worker) = self.workers.iter_mut().find(|worker| worker.name == name) {
                worker.position = exit;
            }
            out_events.push(Event::WorkerSpawned { name, spawn });
        }

        if let Some(controller) = self.controller.as_mut() {
            controller.ticks_to_downgrade = controller.ticks_to_downgrade.saturating_sub(1);
        }

        if self.energy_available() < SPAWN_ENERGY_FLOOR {
            for spawn in &mut self.structures {
                if spawn.kind == StructureKind::Spawn && spawn.energy < spawn.energy_capacity {
                    spawn.energy += 1;
                }
            }
        }

        if self.time % SOURCE_REGEN_TICKS == 0 {
            for source in &mut self.sources {
                source.energy = SOURCE_CAPACITY;
            }
        }

        out_events.push(Event::TimeAdvanced { tick: self.time });
    }
}

impl Host for World {
    fn territory(&self) -> &str {
        &self.name
    }

    fn time(&self) -> u64 {
        self.time
    }

    fn workers(&self) -> Vec<WorkerSnapshot> {
        self.workers.iter().map(Worker::snapshot).collect()
    }

    fn worker(&self, name: &WorkerName) -> Option<WorkerSnapshot> {
        self.workers
            .iter()
            .find(|worker| &worker.name == name)
            .map(Worker::snapshot)
    }

    fn structures(&self) -> Vec<StructureSnapshot> {
        self.structures.iter().map(Structure::snapshot).collect()
    }

    fn construction_sites(&self) -> Vec<SiteSnapshot> {
        self.sites
            .iter()
            .map(|site| SiteSnapshot {
                id: site.id,
                kind: site.kind,
                position: site.position,
                progress: site.progress,
                progress_total: site.progress_total,
            })
            .collect()
    }

    fn sources(&self) -> Vec<SourceSnapshot> {
        self.sources
            .iter()
            .map(|source| SourceSnapshot {
                id: source.id,
                position: source.position,
                energy: source.energy,
            })
            .collect()
    }

    fn controller(&self) -> Option<ControllerSnapshot> {
        self.controller.as_ref().map(|controller| ControllerSnapshot {
            position: controller.position,
            level: controller.level,
            ticks_to_downgrade: controller.ticks_to_downgrade,
        })
    }

    fn energy_available(&self) -> u32 {
        self.structures
            .iter()
            .filter(|structure| {
                matches!(structure.kind, StructureKind::Spawn | StructureKind::Extension)
            })
            .map(|structure| structure.energy)
            .sum()
    }

    fn energy_capacity(&self) -> u32 {
        self.structures
            .iter()
            .filter(|structure| {
                matches!(structure.kind, StructureKind::Spawn | StructureKind::Extension)
            })
            .map(|structure| structure.energy_capacity)
            .sum()
    }

    fn is_walkable(&self, position: Position) -> bool {
        self.terrain_at(position).is_walkable()
    }

    fn move_toward(&mut self, worker: &WorkerName, goal: Position) -> ActionResult {
        let result = self.move_inner(worker, goal);
        self.record(Some(worker), ActionKind::Move { goal }, result)
    }

    fn harvest(&mut self, worker: &WorkerName, source: SourceId) -> ActionResult {
        let result = self.harvest_inner(worker, source);
        self.record(Some(worker), ActionKind::Harvest { source }, result)
    }

    fn withdraw(&mut self, worker: &WorkerName, structure: StructureId) -> ActionResult {
        let result = self.withdraw_inner(worker, structure);
        self.record(Some(worker), ActionKind::Withdraw { structure }, result)
    }

    fn transfer(&mut self, worker: &WorkerName, structure: StructureId) -> ActionResult {
        let result = self.transfer_inner(worker, structure);
        self.record(Some(worker), ActionKind::Transfer { structure }, result)
    }

    fn build(&mut self, worker: &WorkerName, site: SiteId) -> ActionResult {
        let result = self.build_inner(worker, site);
        self.record(Some(worker), ActionKind::Build { site }, result)
    }

    fn repair(&mut self, worker: &WorkerName, structure: StructureId) -> ActionResult {
        let result = self.repair_inner(worker, structure);
        self.record(Some(worker), ActionKind::Repair { structure }, result)
    }

    fn upgrade_controller(&mut self, worker: &WorkerName) -> ActionResult {
        let result = self.upgrade_inner(worker);
        self.record(Some(worker), ActionKind::Upgrade, result)
    }

    fn spawn_worker(
        &mut self,
        spawn: StructureId,
        body: &[BodyPart],
        name: &WorkerName,
    ) -> ActionResult {
        let result = self.spawn_inner(spawn, body, name);
        let kind = ActionKind::Spawn {
            spawn,
            name: name.clone(),
        };
        self.record(None, kind, result)
    }

    fn create_construction_site(
        &mut self,
        position: Position,
        kind: StructureKind,
    ) -> ActionResult {
        let result = self.place_site_inner(position, kind);
        self.record(None, ActionKind::PlaceSite { kind, position }, result)
    }
}

/// Applies the provided command to the world, mutating state deterministically.
pub fn apply(world: &mut World, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::Tick => world.advance(out_events),
        Command::RemoveWorker { name } => {
            let before = world.workers.len();
            world.workers.retain(|worker| worker.name != name);
            if world.workers.len() != before {
                for structure in &mut world.structures {
                    if structure.spawning.as_ref() == Some(&name) {
                        structure.spawning = None;
                    }
                }
                out_events.push(Event::WorkerExpired { name });
            }
        }
        Command::DestroyStructure { structure } => {
            if let Ok(index) = world.structure_index(structure) {
                let _ = world.structures.remove(index);
                out_events.push(Event::StructureDestroyed { structure });
            }
        }
        Command::DamageStructure { structure, amount } => {
            if let Ok(index) = world.structure_index(structure) {
                let target = &mut world.structures[index];
                target.hits = target.hits.saturating_sub(amount);
            }
        }
        Command::SetStructureEnergy { structure, energy } => {
            if let Ok(index) = world.structure_index(structure) {
                let target = &mut world.structures[index];
                target.energy = energy.min(target.energy_capacity);
            }
        }
        Command::SetWorkerEnergy { name, carried } => {
            if let Some(worker) = world.workers.iter_mut().find(|worker| worker.name == name) {
                worker.carried = carried.min(worker.capacity());
            }
        }
        Command::PlaceWorker { name, position } => {
            if let Some(worker) = world.workers.iter_mut().find(|worker| worker.name == name) {
                worker.position = position;
            }
        }
        Command::SetControllerGrace { ticks } => {
            if let Some(controller) = world.controller.as_mut() {
                controller.ticks_to_downgrade = ticks;
            }
        }
    }
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use colony_core::{Position, Terrain};

    use super::{terrain_index, ActionRecord, World};

    /// Actions requested since the last tick, in request order.
    #[must_use]
    pub fn actions(world: &World) -> &[ActionRecord] {
        &world.actions
    }

    /// Terrain of a cell; cells outside the grid read as walls.
    #[must_use]
    pub fn terrain(world: &World, position: Position) -> Terrain {
        terrain_index(position).map_or(Terrain::Wall, |index| world.terrain[index])
    }

    /// Accumulated controller upgrade progress.
    #[must_use]
    pub fn controller_progress(world: &World) -> u64 {
        world
            .controller
            .as_ref()
            .map_or(0, |controller| controller.progress)
    }
}

fn terrain_index(position: Position) -> Option<usize> {
    if !position.in_bounds() {
        return None;
    }
    usize::try_from(position.y() * ROOM_SIZE + position.x()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn miner_body() -> Vec<BodyPart> {
        vec![BodyPart::Work, BodyPart::Work, BodyPart::Carry, BodyPart::Move]
    }

    #[test]
    fn harvest_requires_adjacency() {
        let mut world = World::new("sim");
        let source = world.add_source(Position::new(10, 10));
        let name = WorkerName::new("miner");
        world.add_worker(name.clone(), miner_body(), Position::new(13, 10));

        assert_eq!(world.harvest(&name, source), Err(ActionError::NotInRange));
        assert_eq!(world.move_toward(&name, Position::new(11, 10)), Ok(()));
        assert_eq!(world.move_toward(&name, Position::new(11, 10)), Ok(()));
        assert_eq!(world.harvest(&name, source), Ok(()));
        assert_eq!(world.worker(&name).map(|worker| worker.carried), Some(4));
    }

    #[test]
    fn spawning_charges_energy_and_completes_after_ticks() {
        let mut world = World::new("sim");
        let spawn = world.add_structure(StructureKind::Spawn, Position::new(25, 25));
        let name = WorkerName::new("sim - miner0");

        assert_eq!(world.spawn_worker(spawn, &miner_body(), &name), Ok(()));
        assert_eq!(world.energy_available(), 0);
        assert_eq!(
            world.spawn_worker(spawn, &miner_body(), &WorkerName::new("other")),
            Err(ActionError::Busy)
        );

        let mut events = Vec::new();
        for _ in 0..12 {
            apply(&mut world, Command::Tick, &mut events);
        }
        assert!(events.contains(&Event::WorkerSpawned {
            name: name.clone(),
            spawn
        }));
        assert_eq!(world.worker(&name).map(|worker| worker.spawning), Some(false));
    }

    #[test]
    fn construction_completes_into_structure() {
        let mut world = World::new("sim");
        let name = WorkerName::new("builder");
        world.add_worker(name.clone(), miner_body(), Position::new(5, 5));
        assert_eq!(
            world.create_construction_site(Position::new(6, 6), StructureKind::Road),
            Ok(())
        );
        let site = world.construction_sites()[0].id;

        let mut events = Vec::new();
        for _ in 0..60 {
            apply(
                &mut world,
                Command::SetWorkerEnergy {
                    name: name.clone(),
                    carried: 50,
                },
                &mut events,
            );
            let _ = world.build(&name, site);
        }

        assert!(world.construction_sites().is_empty());
        assert!(world
            .structures()
            .iter()
            .any(|structure| structure.kind == StructureKind::Road));
    }

    #[test]
    fn walls_are_not_walkable() {
        let mut world = World::new("sim");
        world.set_terrain(Position::new(3, 3), Terrain::Wall);
        assert!(!world.is_walkable(Position::new(3, 3)));
        assert!(!world.is_walkable(Position::new(-1, 3)));
        assert!(world.is_walkable(Position::new(4, 3)));
        assert_eq!(query::terrain(&world, Position::new(3, 3)), Terrain::Wall);
    }
}
