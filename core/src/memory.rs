//! Typed view over the persisted territory and worker memory.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{Position, Role, SourceId, StructureId, TaskId, WorkerName};

/// Schema version expected by the running code.
///
/// A stored memory tagged with any other version is wiped and rebuilt.
pub const SCHEMA_VERSION: u32 = 5;

/// Errors raised while loading or saving memory.
#[derive(Debug, Error)]
pub enum MemoryError {
    /// The persisted document could not be encoded or decoded.
    #[error("memory serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Cell tied to the resource node it serves.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceAnchor {
    /// Cell of interest.
    pub position: Position,
    /// Resource node the cell belongs to.
    pub source: SourceId,
}

/// One harvesting slot adjacent to a resource node.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatheringTask {
    /// Identifier allocated at creation and never reused.
    pub task_id: TaskId,
    /// Cell the miner stands on and the node it harvests.
    pub miner_position: SourceAnchor,
    /// Miner currently holding the task; revalidated by reconciliation.
    pub assigned_miner_name: Option<WorkerName>,
    /// Drop-off container discovered for the node.
    pub source_container: Option<StructureId>,
}

impl GatheringTask {
    /// Creates an unclaimed task.
    #[must_use]
    pub fn new(task_id: TaskId, miner_position: SourceAnchor) -> Self {
        Self {
            task_id,
            miner_position,
            assigned_miner_name: None,
            source_container: None,
        }
    }

    /// Reports whether no miner holds the task.
    #[must_use]
    pub fn is_unclaimed(&self) -> bool {
        self.assigned_miner_name.is_none()
    }
}

/// Progression rung of a territory, derived every tick.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum TechLevel {
    /// Not enough miners yet.
    #[default]
    BootstrappingMiners = 1,
    /// Drop-off containers are missing.
    NeedContainers = 2,
    /// Not enough builders yet.
    BootstrappingBuilders = 3,
    /// Fewer extensions than the controller allows.
    NeedExtensions = 4,
    /// Fully built out.
    Mature = 5,
}

impl TechLevel {
    /// Numeric rung, from 1 to 5.
    #[must_use]
    pub const fn get(self) -> u8 {
        self as u8
    }
}

/// Spawning budget of a territory, derived every tick.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum EnergyLevel {
    /// Only the cheapest bodies are affordable.
    #[default]
    Low = 1,
    /// Mid-sized bodies.
    Medium = 2,
    /// Largest bodies.
    High = 3,
}

impl EnergyLevel {
    /// Numeric tier, from 1 to 3.
    #[must_use]
    pub const fn get(self) -> u8 {
        self as u8
    }
}

/// Persisted state of one managed territory.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerritoryRecord {
    /// Territory name.
    pub name: String,
    /// Gathering tasks in creation order.
    pub miner_tasks: Vec<GatheringTask>,
    /// Resource nodes of the territory.
    pub energy_sources: Vec<SourceAnchor>,
    /// Planned drop-off container cell per resource node.
    pub container_positions: Vec<SourceAnchor>,
    /// Target builder count.
    pub desired_builders: u32,
    /// Derived progression rung.
    pub tech_level: TechLevel,
    /// Derived spawning budget.
    pub energy_level: EnergyLevel,
    /// Worker-initiated construction sites placed during the current tick.
    pub builds_this_tick: u32,
    /// Label of the last spawned role, for presentation.
    pub spawn_text: Option<String>,
    /// Spawn that produced the last worker, for presentation.
    pub spawn_text_id: Option<StructureId>,
    /// Extensions recently claimed by builders; cleared periodically.
    pub extension_ids_assigned: Vec<StructureId>,
    /// Durability walls are repaired up to.
    pub desired_wall_hit_points: u32,
    next_task_id: u32,
    next_worker_serial: u32,
}

impl TerritoryRecord {
    /// Creates an empty record with no tasks.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        desired_builders: u32,
        desired_wall_hit_points: u32,
    ) -> Self {
        Self {
            name: name.into(),
            miner_tasks: Vec::new(),
            energy_sources: Vec::new(),
            container_positions: Vec::new(),
            desired_builders,
            tech_level: TechLevel::default(),
            energy_level: EnergyLevel::default(),
            builds_this_tick: 0,
            spawn_text: None,
            spawn_text_id: None,
            extension_ids_assigned: Vec::new(),
            desired_wall_hit_points,
            next_task_id: 1,
            next_worker_serial: 0,
        }
    }

    /// Appends a new task with a freshly allocated identifier.
    pub fn push_task(&mut self, miner_position: SourceAnchor) -> TaskId {
        let task_id = TaskId::new(self.next_task_id);
        self.next_task_id += 1;
        self.miner_tasks.push(GatheringTask::new(task_id, miner_position));
        task_id
    }

    /// Looks up a task by identifier.
    #[must_use]
    pub fn task(&self, task_id: TaskId) -> Option<&GatheringTask> {
        self.miner_tasks.iter().find(|task| task.task_id == task_id)
    }

    /// Looks up a task by identifier for mutation.
    pub fn task_mut(&mut self, task_id: TaskId) -> Option<&mut GatheringTask> {
        self.miner_tasks
            .iter_mut()
            .find(|task| task.task_id == task_id)
    }

    /// Planned container cell for the provided resource node.
    #[must_use]
    pub fn container_position_for(&self, source: SourceId) -> Option<Position> {
        self.container_positions
            .iter()
            .find(|anchor| anchor.source == source)
            .map(|anchor| anchor.position)
    }

    /// Serial the next spawned worker will carry in its name.
    #[must_use]
    pub const fn peek_worker_serial(&self) -> u32 {
        self.next_worker_serial
    }

    /// Consumes the current worker serial after a successful spawn.
    pub fn commit_worker_serial(&mut self) {
        self.next_worker_serial = self.next_worker_serial.saturating_add(1);
    }
}

/// Fill/spend mode of a miner.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MinerPhase {
    /// Filling its own carry capacity at the node.
    #[default]
    Gathering,
    /// Emptying its carry capacity.
    Delivering,
}

/// Persisted state of a miner.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MinerMemory {
    /// Claimed gathering task; `None` while unassigned.
    pub task: Option<TaskId>,
    /// Fill/spend mode.
    pub phase: MinerPhase,
}

/// Fill/spend mode of a builder.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "mode")]
pub enum BuilderPhase {
    /// Filling its own carry capacity.
    #[default]
    Gathering,
    /// Spending energy, optionally on a cached delivery target.
    Delivering {
        /// Structure currently being supplied.
        target: Option<StructureId>,
    },
    /// Committed to upgrading the controller until empty.
    Upgrading,
}

impl BuilderPhase {
    /// Reports whether the builder is filling its carry capacity.
    #[must_use]
    pub const fn is_gathering(self) -> bool {
        matches!(self, Self::Gathering)
    }
}

/// Persisted state of a builder.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuilderMemory {
    /// Container the builder withdraws from.
    pub container: Option<StructureId>,
    /// Fill/spend mode.
    pub phase: BuilderPhase,
}

/// Persisted state of one worker, tagged by role.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "role")]
pub enum WorkerRecord {
    /// Role still to be detected.
    #[default]
    Unassigned,
    /// Miner state machine.
    Miner(MinerMemory),
    /// Builder state machine.
    Builder(BuilderMemory),
}

impl WorkerRecord {
    /// Creates the initial record for a freshly spawned worker.
    #[must_use]
    pub fn new(role: Role) -> Self {
        match role {
            Role::Unassigned => Self::Unassigned,
            Role::Miner => Self::Miner(MinerMemory::default()),
            Role::Builder => Self::Builder(BuilderMemory::default()),
        }
    }

    /// Role encoded by the record.
    #[must_use]
    pub const fn role(&self) -> Role {
        match self {
            Self::Unassigned => Role::Unassigned,
            Self::Miner(_) => Role::Miner,
            Self::Builder(_) => Role::Builder,
        }
    }
}

/// Applies fill/spend hysteresis to a gathering flag.
///
/// Gathering stops only once the carry is full and resumes only once it is
/// empty, so a partially filled worker keeps its current mode.
#[must_use]
pub fn next_gathering(gathering: bool, carried: u32, capacity: u32) -> bool {
    let mut gathering = gathering;
    if gathering && carried >= capacity {
        gathering = false;
    }
    if !gathering && carried == 0 {
        gathering = true;
    }
    gathering
}

/// Persisted key-value store holding every territory and worker record.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Memory {
    /// Schema version the records were written with.
    pub schema_version: Option<u32>,
    /// Territory records keyed by territory name.
    pub territories: BTreeMap<String, TerritoryRecord>,
    /// Worker records keyed by worker name.
    pub workers: BTreeMap<WorkerName, WorkerRecord>,
}

impl Memory {
    /// Creates an empty store tagged with the current schema version.
    #[must_use]
    pub fn new() -> Self {
        Self {
            schema_version: Some(SCHEMA_VERSION),
            ..Self::default()
        }
    }

    /// Wipes every record when the stored version differs from `expected`.
    ///
    /// Returns `true` when a reset happened.
    pub fn ensure_schema(&mut self, expected: u32) -> bool {
        if self.schema_version == Some(expected) {
            return false;
        }
        self.territories.clear();
        self.workers.clear();
        self.schema_version = Some(expected);
        true
    }

    /// Deletes records of workers absent from `live`, returning their names.
    pub fn collect_stale_workers(&mut self, live: &BTreeSet<WorkerName>) -> Vec<WorkerName> {
        let stale: Vec<WorkerName> = self
            .workers
            .keys()
            .filter(|name| !live.contains(*name))
            .cloned()
            .collect();
        for name in &stale {
            let _ = self.workers.remove(name);
        }
        stale
    }

    /// Encodes the store as JSON.
    pub fn to_json(&self) -> Result<String, MemoryError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Decodes a store from JSON.
    pub fn from_json(json: &str) -> Result<Self, MemoryError> {
        Ok(serde_json::from_str(json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn anchor(x: i32, y: i32) -> SourceAnchor {
        SourceAnchor {
            position: Position::new(x, y),
            source: SourceId::new(1),
        }
    }

    #[test]
    fn hysteresis_holds_mode_below_capacity() {
        assert!(next_gathering(true, 49, 50), "one short of full keeps gathering");
        assert!(!next_gathering(true, 50, 50), "full carry flips to delivering");
        assert!(!next_gathering(false, 1, 50), "partially spent keeps delivering");
        assert!(next_gathering(false, 0, 50), "empty carry flips to gathering");
    }

    #[test]
    fn task_ids_are_sequential_and_never_reused() {
        let mut record = TerritoryRecord::new("W1N1", 2, 10_000);
        let first = record.push_task(anchor(1, 1));
        let second = record.push_task(anchor(1, 2));
        assert_eq!(first, TaskId::new(1));
        assert_eq!(second, TaskId::new(2));
        assert!(record.task(second).is_some_and(GatheringTask::is_unclaimed));
    }

    #[test]
    fn schema_mismatch_wipes_records() {
        let mut memory = Memory::new();
        let _ = memory
            .territories
            .insert("W1N1".to_owned(), TerritoryRecord::new("W1N1", 2, 10_000));
        let _ = memory
            .workers
            .insert(WorkerName::new("W1N1 - miner0"), WorkerRecord::new(Role::Miner));

        assert!(!memory.ensure_schema(SCHEMA_VERSION));
        assert_eq!(memory.territories.len(), 1);

        assert!(memory.ensure_schema(SCHEMA_VERSION + 1));
        assert!(memory.territories.is_empty());
        assert!(memory.workers.is_empty());
    }

    #[test]
    fn stale_workers_are_collected() {
        let mut memory = Memory::new();
        let alive = WorkerName::new("alive");
        let gone = WorkerName::new("gone");
        let _ = memory.workers.insert(alive.clone(), WorkerRecord::new(Role::Miner));
        let _ = memory.workers.insert(gone.clone(), WorkerRecord::new(Role::Builder));

        let live = BTreeSet::from([alive.clone()]);
        assert_eq!(memory.collect_stale_workers(&live), vec![gone]);
        assert!(memory.workers.contains_key(&alive));
    }

    #[test]
    fn memory_round_trips_through_json_and_bincode() {
        let mut memory = Memory::new();
        let mut record = TerritoryRecord::new("W1N1", 2, 10_000);
        let _ = record.push_task(anchor(3, 4));
        let _ = memory.territories.insert("W1N1".to_owned(), record);
        let _ = memory.workers.insert(
            WorkerName::new("W1N1 - builder1"),
            WorkerRecord::Builder(BuilderMemory {
                container: Some(StructureId::new(9)),
                phase: BuilderPhase::Delivering {
                    target: Some(StructureId::new(4)),
                },
            }),
        );

        let json = memory.to_json().expect("encode json");
        assert_eq!(Memory::from_json(&json).expect("decode json"), memory);

        let record = &memory.territories["W1N1"];
        let bytes = bincode::serialize(record).expect("serialize");
        let restored: TerritoryRecord = bincode::deserialize(&bytes).expect("deserialize");
        assert_eq!(&restored, record);
    }
}
