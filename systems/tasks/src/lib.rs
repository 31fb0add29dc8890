#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Gathering-task registry: one-time territory initialization and the
//! periodic reconciliation pass that frees tasks held by vanished miners.

use std::collections::BTreeMap;

use colony_core::{
    ColonyConfig, Host, Role, SourceAnchor, StructureKind, TaskId, TerritoryRecord, WorkerName,
    WorkerRecord,
};
use colony_system_placement::container_position;
use tracing::{debug, info};

/// Builds the record of a territory seen for the first time.
///
/// Resource nodes are visited in identifier order. Every walkable neighbour
/// of a node becomes one gathering task, and one container cell is planned
/// per node when the territory already has a spawn.
#[must_use]
pub fn initialize_territory<H: Host + ?Sized>(
    host: &H,
    config: &ColonyConfig,
) -> TerritoryRecord {
    let mut record = TerritoryRecord::new(
        host.territory(),
        config.desired_builders,
        config.desired_wall_hit_points,
    );

    let first_spawn = host
        .structures()
        .into_iter()
        .filter(|structure| structure.kind == StructureKind::Spawn)
        .min_by_key(|structure| structure.id)
        .map(|structure| structure.position);

    let mut sources = host.sources();
    sources.sort_by_key(|source| source.id);

    for source in sources {
        record.energy_sources.push(SourceAnchor {
            position: source.position,
            source: source.id,
        });

        let mut task_cells = Vec::new();
        for cell in source.position.neighbours() {
            if !cell.in_bounds() || !host.is_walkable(cell) {
                continue;
            }
            let task_id = record.push_task(SourceAnchor {
                position: cell,
                source: source.id,
            });
            debug!(task = task_id.get(), cell = %cell, "gathering task created");
            task_cells.push(cell);
        }

        let planned = container_position(source.position, &task_cells, first_spawn, |cell| {
            host.is_walkable(cell)
        });
        if let Some(position) = planned {
            record.container_positions.push(SourceAnchor {
                position,
                source: source.id,
            });
        }
    }

    info!(
        territory = %record.name,
        tasks = record.miner_tasks.len(),
        sources = record.energy_sources.len(),
        containers = record.container_positions.len(),
        "territory initialized"
    );
    record
}

/// Clears task assignments whose miner no longer exists or is no longer a miner.
///
/// Returns the names that lost their task. This pass is the only way a task
/// becomes available again.
pub fn reconcile<H: Host + ?Sized>(
    host: &H,
    territory: &mut TerritoryRecord,
    workers: &BTreeMap<WorkerName, WorkerRecord>,
) -> Vec<WorkerName> {
    let mut cleared = Vec::new();
    for task in &mut territory.miner_tasks {
        let Some(name) = task.assigned_miner_name.as_ref() else {
            continue;
        };
        let alive = host.worker(name).is_some();
        let still_miner = workers
            .get(name)
            .is_some_and(|record| record.role() == Role::Miner);
        if alive && still_miner {
            continue;
        }

        info!(
            territory = %territory.name,
            task = task.task_id.get(),
            worker = %name,
            "clearing gathering task assignment"
        );
        if let Some(name) = task.assigned_miner_name.take() {
            cleared.push(name);
        }
    }
    cleared
}

/// Hands the earliest-created unclaimed task to `name`.
///
/// The claim is written immediately, so a later worker dispatched in the
/// same tick cannot take the same task.
pub fn claim_first_unclaimed(
    territory: &mut TerritoryRecord,
    name: &WorkerName,
) -> Option<TaskId> {
    let task = territory
        .miner_tasks
        .iter_mut()
        .find(|task| task.is_unclaimed())?;
    task.assigned_miner_name = Some(name.clone());
    Some(task.task_id)
}
