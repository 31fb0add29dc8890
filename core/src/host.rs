//! Boundary between the colony systems and the host simulation.

use thiserror::Error;
use tracing::error;

use crate::{BodyPart, Position, SiteId, SourceId, StructureId, StructureKind, WorkerName};

/// Reasons the host may reject a worker or structure action.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ActionError {
    /// The worker is not close enough to the target.
    #[error("target is not in range")]
    NotInRange,
    /// The worker or the target lacks the energy the action needs.
    #[error("not enough resources")]
    NotEnoughResources,
    /// The receiving store has no spare capacity.
    #[error("target is full")]
    Full,
    /// The acting object is occupied with something else.
    #[error("actor is busy")]
    Busy,
    /// The referenced object does not exist or cannot be used this way.
    #[error("invalid target")]
    InvalidTarget,
    /// Any other host rejection.
    #[error("rejected: {0}")]
    Rejected(String),
}

/// Result of a single host action.
pub type ActionResult = Result<(), ActionError>;

/// Immutable view of a worker valid for the current tick.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WorkerSnapshot {
    /// Stable name of the worker.
    pub name: WorkerName,
    /// Cell currently occupied by the worker.
    pub position: Position,
    /// Energy currently carried.
    pub carried: u32,
    /// Maximum energy the worker can carry.
    pub capacity: u32,
    /// Indicates whether the worker is still being produced by a spawn.
    pub spawning: bool,
}

/// Immutable view of a built structure valid for the current tick.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StructureSnapshot {
    /// Identifier allocated by the host.
    pub id: StructureId,
    /// Kind of structure.
    pub kind: StructureKind,
    /// Cell occupied by the structure.
    pub position: Position,
    /// Current durability.
    pub hits: u32,
    /// Maximum durability.
    pub hits_max: u32,
    /// Energy currently stored.
    pub energy: u32,
    /// Maximum energy the structure can store.
    pub energy_capacity: u32,
    /// Indicates whether a spawn is busy producing a worker.
    pub spawning: bool,
}

impl StructureSnapshot {
    /// Reports whether the structure can accept more energy.
    #[must_use]
    pub fn has_spare_capacity(&self) -> bool {
        self.energy < self.energy_capacity
    }
}

/// Immutable view of an open construction site.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SiteSnapshot {
    /// Identifier allocated by the host; lower identifiers are older.
    pub id: SiteId,
    /// Kind of structure under construction.
    pub kind: StructureKind,
    /// Cell occupied by the site.
    pub position: Position,
    /// Construction progress accumulated so far.
    pub progress: u32,
    /// Progress required to finish the structure.
    pub progress_total: u32,
}

/// Immutable view of a resource node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceSnapshot {
    /// Identifier allocated by the host.
    pub id: SourceId,
    /// Cell occupied by the node.
    pub position: Position,
    /// Energy left before the node needs to regenerate.
    pub energy: u32,
}

/// Immutable view of the territory controller.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ControllerSnapshot {
    /// Cell occupied by the controller.
    pub position: Position,
    /// Controller rank, unlocking more extensions.
    pub level: u8,
    /// Remaining grace period before the controller decays.
    pub ticks_to_downgrade: u32,
}

/// Host simulation for one territory, consumed but not implemented here.
///
/// Census queries return unordered snapshots valid only for the current
/// tick. Actions report their immediate outcome; anything that would require
/// waiting is retried by the caller on a later tick.
pub trait Host {
    /// Name of the territory.
    fn territory(&self) -> &str;

    /// Current simulation tick.
    fn time(&self) -> u64;

    /// Workers currently present in the territory, including ones being spawned.
    fn workers(&self) -> Vec<WorkerSnapshot>;

    /// Looks up a single worker by name.
    fn worker(&self, name: &WorkerName) -> Option<WorkerSnapshot>;

    /// Built structures, including spawns.
    fn structures(&self) -> Vec<StructureSnapshot>;

    /// Open construction sites.
    fn construction_sites(&self) -> Vec<SiteSnapshot>;

    /// Resource nodes.
    fn sources(&self) -> Vec<SourceSnapshot>;

    /// Controller of the territory, if any.
    fn controller(&self) -> Option<ControllerSnapshot>;

    /// Energy currently available for spawning.
    fn energy_available(&self) -> u32;

    /// Total spawning energy capacity.
    fn energy_capacity(&self) -> u32;

    /// Reports whether the terrain at `position` is not impassable.
    fn is_walkable(&self, position: Position) -> bool;

    /// Moves the worker one step toward `goal`.
    fn move_toward(&mut self, worker: &WorkerName, goal: Position) -> ActionResult;

    /// Harvests energy from a resource node.
    fn harvest(&mut self, worker: &WorkerName, source: SourceId) -> ActionResult;

    /// Withdraws energy from a structure.
    fn withdraw(&mut self, worker: &WorkerName, structure: StructureId) -> ActionResult;

    /// Transfers carried energy into a structure.
    fn transfer(&mut self, worker: &WorkerName, structure: StructureId) -> ActionResult;

    /// Spends carried energy on a construction site.
    fn build(&mut self, worker: &WorkerName, site: SiteId) -> ActionResult;

    /// Spends carried energy repairing a structure.
    fn repair(&mut self, worker: &WorkerName, structure: StructureId) -> ActionResult;

    /// Spends carried energy upgrading the controller.
    fn upgrade_controller(&mut self, worker: &WorkerName) -> ActionResult;

    /// Asks an idle spawn to produce a worker with the given body and name.
    fn spawn_worker(
        &mut self,
        spawn: StructureId,
        body: &[BodyPart],
        name: &WorkerName,
    ) -> ActionResult;

    /// Requests a construction site for a structure at `position`.
    fn create_construction_site(&mut self, position: Position, kind: StructureKind)
        -> ActionResult;
}

/// Classification of an action result after corrective movement.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ActionOutcome {
    /// The action succeeded.
    Done,
    /// The target was out of range, so the worker moved toward it.
    Approaching,
    /// The action failed for a reason expected to resolve on its own.
    Transient,
    /// The action failed unexpectedly; the failure was logged.
    Failed,
}

impl ActionOutcome {
    /// Reports whether the worker spent its tick on the action.
    #[must_use]
    pub const fn engaged(self) -> bool {
        matches!(self, Self::Done | Self::Approaching)
    }
}

/// Interprets an action result, moving toward `goal` when out of range.
///
/// `NotInRange` is always answered with an immediate move. Exhausted
/// resources and full stores are transient. Any other failure is logged.
pub fn act_or_approach<H: Host + ?Sized>(
    host: &mut H,
    worker: &WorkerName,
    goal: Position,
    result: ActionResult,
) -> ActionOutcome {
    match result {
        Ok(()) => ActionOutcome::Done,
        Err(ActionError::NotInRange) => {
            if let Err(reason) = host.move_toward(worker, goal) {
                error!(worker = %worker, goal = %goal, %reason, "movement failed");
            }
            ActionOutcome::Approaching
        }
        Err(ActionError::NotEnoughResources | ActionError::Full) => ActionOutcome::Transient,
        Err(reason) => {
            error!(worker = %worker, %reason, "action failed");
            ActionOutcome::Failed
        }
    }
}
