#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the colony decision engine.
//!
//! This crate defines the vocabulary that connects the persisted memory, the
//! host simulation, and the pure per-tick systems. Systems read census
//! snapshots through the [`Host`] trait, perform worker actions against it,
//! and record their decisions in the [`Memory`] store. The simulated world
//! crate additionally consumes [`Command`] values describing host-side
//! mutations and broadcasts [`Event`] values in response.

mod config;
mod host;
mod memory;

use std::{borrow::Borrow, fmt};

use serde::{Deserialize, Serialize};

pub use config::{BodyTiers, ColonyConfig, ConfigError};
pub use host::{
    act_or_approach, ActionError, ActionOutcome, ActionResult, ControllerSnapshot, Host,
    SiteSnapshot, SourceSnapshot, StructureSnapshot, WorkerSnapshot,
};
pub use memory::{
    next_gathering, BuilderMemory, BuilderPhase, EnergyLevel, GatheringTask, Memory, MemoryError,
    MinerMemory, MinerPhase, SourceAnchor, TechLevel, TerritoryRecord, WorkerRecord,
    SCHEMA_VERSION,
};

/// Width and height of a territory grid measured in cells.
pub const ROOM_SIZE: i32 = 50;

/// Cadence of task reconciliation, extension placement and road laying.
pub const MAINTENANCE_CADENCE: Cadence = Cadence::every(10);

/// Cadence at which the extension soft-lock list is cleared.
pub const LOCK_RESET_CADENCE: Cadence = Cadence::every(50);

/// Cadence of the census report and of stale worker-memory collection.
pub const CENSUS_CADENCE: Cadence = Cadence::every(100);

/// Location of a single grid cell inside a territory.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    x: i32,
    y: i32,
}

impl Position {
    /// Creates a new grid position.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Zero-based column of the cell.
    #[must_use]
    pub const fn x(&self) -> i32 {
        self.x
    }

    /// Zero-based row of the cell.
    #[must_use]
    pub const fn y(&self) -> i32 {
        self.y
    }

    /// Returns the position shifted by the provided offsets.
    #[must_use]
    pub const fn offset(self, dx: i32, dy: i32) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }

    /// Reports whether the position lies inside the territory grid.
    #[must_use]
    pub const fn in_bounds(&self) -> bool {
        self.x >= 0 && self.y >= 0 && self.x < ROOM_SIZE && self.y < ROOM_SIZE
    }

    /// Computes the grid distance (diagonal steps cost one) between two positions.
    #[must_use]
    pub fn range_to(self, other: Position) -> u32 {
        self.x.abs_diff(other.x).max(self.y.abs_diff(other.y))
    }

    /// Enumerates the eight orthogonal and diagonal neighbours of the cell.
    ///
    /// The order is fixed: the column to the left top to bottom, the column
    /// to the right top to bottom, then the cells directly above and below.
    /// Task identifiers are allocated in this order.
    #[must_use]
    pub fn neighbours(self) -> [Position; 8] {
        [
            self.offset(-1, -1),
            self.offset(-1, 0),
            self.offset(-1, 1),
            self.offset(1, -1),
            self.offset(1, 0),
            self.offset(1, 1),
            self.offset(0, -1),
            self.offset(0, 1),
        ]
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Identifier of a gathering task, unique within its territory.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TaskId(u32);

impl TaskId {
    /// Creates a new task identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Identifier the host assigns to a built structure.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StructureId(u32);

impl StructureId {
    /// Creates a new structure identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Identifier the host assigns to a resource node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SourceId(u32);

impl SourceId {
    /// Creates a new resource node identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Identifier the host assigns to an open construction site.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SiteId(u32);

impl SiteId {
    /// Creates a new construction site identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Stable name of a worker, chosen when it is spawned.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkerName(String);

impl WorkerName {
    /// Wraps the provided string as a worker name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Borrows the name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for WorkerName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WorkerName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Job a worker performs for its territory.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Role not yet determined.
    Unassigned,
    /// Harvests a resource node from a fixed gathering post.
    Miner,
    /// Supplies structures, repairs, builds and upgrades the controller.
    Builder,
}

impl Role {
    /// Lower-case label embedded in worker names.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Unassigned => "unassigned",
            Self::Miner => "miner",
            Self::Builder => "builder",
        }
    }

    /// Recovers a role from the label embedded in a worker name.
    ///
    /// Only used to adopt workers whose memory predates role tagging.
    #[must_use]
    pub fn from_worker_name(name: &str) -> Option<Self> {
        let lowered = name.to_ascii_lowercase();
        if lowered.contains(Self::Miner.label()) {
            Some(Self::Miner)
        } else if lowered.contains(Self::Builder.label()) {
            Some(Self::Builder)
        } else {
            None
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Types of structures a territory may contain.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StructureKind {
    /// Produces new workers.
    Spawn,
    /// Stores additional energy for spawning.
    Extension,
    /// Defensive tower fed with energy.
    Tower,
    /// Drop-off container next to a resource node.
    Container,
    /// Large energy store.
    Storage,
    /// Road tile.
    Road,
    /// Defensive wall.
    Wall,
    /// Defensive rampart.
    Rampart,
}

impl StructureKind {
    /// Reports whether workers deliver energy into structures of this kind.
    #[must_use]
    pub const fn accepts_delivery(self) -> bool {
        matches!(self, Self::Extension | Self::Spawn | Self::Tower)
    }
}

/// Body part composing a worker.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BodyPart {
    /// Harvests, builds, repairs and upgrades.
    Work,
    /// Adds fifty units of carry capacity.
    Carry,
    /// Allows the worker to move.
    Move,
}

impl BodyPart {
    /// Energy cost charged by the host to spawn the part.
    #[must_use]
    pub const fn cost(self) -> u32 {
        match self {
            Self::Work => 100,
            Self::Carry | Self::Move => 50,
        }
    }

    /// Total spawn cost of a body.
    #[must_use]
    pub fn body_cost(body: &[BodyPart]) -> u32 {
        body.iter().map(|part| part.cost()).sum()
    }
}

/// Terrain type of a single cell.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Terrain {
    /// Open ground.
    #[default]
    Plain,
    /// Slow but walkable ground.
    Swamp,
    /// Impassable rock.
    Wall,
}

impl Terrain {
    /// Reports whether workers may stand on the terrain.
    #[must_use]
    pub const fn is_walkable(self) -> bool {
        !matches!(self, Self::Wall)
    }
}

/// Fixed period at which a periodic side effect fires.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Cadence {
    period: u64,
}

impl Cadence {
    /// Creates a cadence firing every `period` ticks.
    #[must_use]
    pub const fn every(period: u64) -> Self {
        Self { period }
    }

    /// Number of ticks between firings.
    #[must_use]
    pub const fn period(&self) -> u64 {
        self.period
    }

    /// Reports whether the cadence fires on the provided tick.
    #[must_use]
    pub const fn fires(&self, tick: u64) -> bool {
        self.period != 0 && tick % self.period == 0
    }
}

/// Commands that express host-side mutations of a simulated territory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// Advances the simulation clock by one tick.
    Tick,
    /// Removes a worker, as when its lifetime ends.
    RemoveWorker {
        /// Name of the worker to remove.
        name: WorkerName,
    },
    /// Removes a structure, as when it is destroyed.
    DestroyStructure {
        /// Identifier of the structure to remove.
        structure: StructureId,
    },
    /// Lowers the durability of a structure.
    DamageStructure {
        /// Identifier of the damaged structure.
        structure: StructureId,
        /// Hit points removed.
        amount: u32,
    },
    /// Overwrites the energy stored in a structure.
    SetStructureEnergy {
        /// Identifier of the structure.
        structure: StructureId,
        /// Energy stored after the command, clamped to capacity.
        energy: u32,
    },
    /// Overwrites the energy carried by a worker.
    SetWorkerEnergy {
        /// Name of the worker.
        name: WorkerName,
        /// Energy carried after the command, clamped to capacity.
        carried: u32,
    },
    /// Relocates a worker.
    PlaceWorker {
        /// Name of the worker.
        name: WorkerName,
        /// Cell the worker occupies after the command.
        position: Position,
    },
    /// Overwrites the controller grace period.
    SetControllerGrace {
        /// Ticks remaining before the controller decays.
        ticks: u32,
    },
}

/// Events broadcast by a simulated territory after processing commands.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    /// Indicates that the simulation clock advanced.
    TimeAdvanced {
        /// Tick reached after advancing.
        tick: u64,
    },
    /// Confirms that a spawn finished producing a worker.
    WorkerSpawned {
        /// Name of the new worker.
        name: WorkerName,
        /// Spawn that produced it.
        spawn: StructureId,
    },
    /// Confirms that a worker left the simulation.
    WorkerExpired {
        /// Name of the removed worker.
        name: WorkerName,
    },
    /// Confirms that a structure left the simulation.
    StructureDestroyed {
        /// Identifier of the removed structure.
        structure: StructureId,
    },
}
