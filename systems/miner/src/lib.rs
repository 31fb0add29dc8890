#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Miner state machine.
//!
//! A miner claims one gathering task for life, harvests from the task cell
//! until its carry is full and then empties it into the drop-off container of
//! its node, a spawn-side store, or the controller.

use colony_core::{
    act_or_approach, next_gathering, ColonyConfig, Host, MinerMemory, MinerPhase, StructureKind,
    StructureSnapshot, TaskId, TechLevel, TerritoryRecord, WorkerName, WorkerSnapshot,
};
use colony_system_builder::{try_build, try_repair, upgrade};
use colony_system_scanner::Census;
use colony_system_tasks::claim_first_unclaimed;
use tracing::{debug, error};

const CONTAINER_SEARCH_RANGE: u32 = 2;

/// Miner system configured with its opportunistic work threshold.
#[derive(Clone, Copy, Debug)]
pub struct Miner {
    relaxed_downgrade_ticks: u32,
}

impl Miner {
    /// Creates a new miner system using the supplied configuration.
    #[must_use]
    pub fn new(config: &ColonyConfig) -> Self {
        Self {
            relaxed_downgrade_ticks: config.relaxed_downgrade_ticks,
        }
    }

    /// Runs one tick of a miner.
    pub fn run<H: Host + ?Sized>(
        &self,
        host: &mut H,
        territory: &mut TerritoryRecord,
        census: &Census,
        worker: &WorkerSnapshot,
        memory: &mut MinerMemory,
    ) {
        let Some(task_id) = hold_task(territory, &worker.name, memory) else {
            debug!(
                territory = %territory.name,
                worker = %worker.name,
                "no unclaimed gathering task"
            );
            return;
        };

        let gathering = next_gathering(
            memory.phase == MinerPhase::Gathering,
            worker.carried,
            worker.capacity,
        );
        memory.phase = if gathering {
            MinerPhase::Gathering
        } else {
            MinerPhase::Delivering
        };

        if gathering {
            harvest(host, territory, census, worker, task_id);
        } else {
            self.deliver(host, territory, census, worker, task_id);
        }
    }

    fn deliver<H: Host + ?Sized>(
        &self,
        host: &mut H,
        territory: &mut TerritoryRecord,
        census: &Census,
        worker: &WorkerSnapshot,
        task_id: TaskId,
    ) {
        let containers_built = census.progress.containers == census.progress.sources;
        if territory.tech_level >= TechLevel::BootstrappingBuilders && containers_built {
            if let Some(container) = source_container(&*host, territory, census, task_id) {
                let result = host.transfer(&worker.name, container.id);
                let _ = act_or_approach(host, &worker.name, container.position, result);
                return;
            }
        }

        if let Some(store) = nearest_store(&*host, worker) {
            let result = host.transfer(&worker.name, store.id);
            let _ = act_or_approach(host, &worker.name, store.position, result);
            return;
        }

        if census.ticks_to_downgrade() > self.relaxed_downgrade_ticks
            && (try_repair(host, territory, census, worker) || try_build(host, worker))
        {
            return;
        }
        let _ = upgrade(host, worker);
    }
}

/// Keeps the task the miner holds, or claims the earliest unclaimed one.
///
/// A task freed by reconciliation is taken back when still unclaimed; a task
/// someone else now holds is given up for a fresh claim.
fn hold_task(
    territory: &mut TerritoryRecord,
    name: &WorkerName,
    memory: &mut MinerMemory,
) -> Option<TaskId> {
    if let Some(task) = memory.task.and_then(|task_id| territory.task_mut(task_id)) {
        let holder = task.assigned_miner_name.as_ref();
        if holder.is_none() || holder == Some(name) {
            task.assigned_miner_name = Some(name.clone());
            return Some(task.task_id);
        }
    }
    memory.task = claim_first_unclaimed(territory, name);
    memory.task
}

fn harvest<H: Host + ?Sized>(
    host: &mut H,
    territory: &TerritoryRecord,
    census: &Census,
    worker: &WorkerSnapshot,
    task_id: TaskId,
) {
    let Some(task) = territory.task(task_id) else {
        return;
    };
    let post = task.miner_position.position;
    if worker.position != post {
        if let Err(reason) = host.move_toward(&worker.name, post) {
            error!(worker = %worker.name, goal = %post, %reason, "movement failed");
        }
        return;
    }

    let source = task.miner_position.source;
    let node = census
        .sources
        .iter()
        .find(|candidate| candidate.id == source)
        .map_or(post, |candidate| candidate.position);
    let result = host.harvest(&worker.name, source);
    let _ = act_or_approach(host, &worker.name, node, result);
}

/// Drop-off container of the task's node, discovering it when unknown.
///
/// A container that vanished is forgotten and `None` is returned, so the
/// miner falls back to other stores this tick and rediscovers next tick.
fn source_container<H: Host + ?Sized>(
    host: &H,
    territory: &mut TerritoryRecord,
    census: &Census,
    task_id: TaskId,
) -> Option<StructureSnapshot> {
    let source = territory.task(task_id)?.miner_position.source;
    let planned = territory.container_position_for(source);
    let containers: Vec<StructureSnapshot> = host
        .structures()
        .into_iter()
        .filter(|structure| structure.kind == StructureKind::Container)
        .collect();
    let task = territory.task_mut(task_id)?;

    if let Some(id) = task.source_container {
        if let Some(found) = containers.iter().find(|container| container.id == id) {
            return Some(found.clone());
        }
        debug!(task = task_id.get(), container = id.get(), "drop-off container vanished");
        task.source_container = None;
        return None;
    }

    let node = census
        .sources
        .iter()
        .find(|candidate| candidate.id == source)?
        .position;
    let found = containers
        .iter()
        .find(|container| Some(container.position) == planned)
        .or_else(|| {
            containers
                .iter()
                .filter(|container| container.position.range_to(node) <= CONTAINER_SEARCH_RANGE)
                .min_by_key(|container| (container.position.range_to(node), container.id))
        })?
        .clone();
    task.source_container = Some(found.id);
    Some(found)
}

fn nearest_store<H: Host + ?Sized>(
    host: &H,
    worker: &WorkerSnapshot,
) -> Option<StructureSnapshot> {
    host.structures()
        .into_iter()
        .filter(|structure| structure.kind.accepts_delivery() && structure.has_spare_capacity())
        .min_by_key(|structure| (structure.position.range_to(worker.position), structure.id))
}
