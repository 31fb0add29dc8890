#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Builder state machine and the repair, build and upgrade actions shared
//! with idle miners.
//!
//! | phase        | condition                         | next phase              |
//! |--------------|-----------------------------------|-------------------------|
//! | `Gathering`  | carry full                        | `Delivering` (no target)|
//! | `Delivering` | controller grace below critical   | `Upgrading`             |
//! | `Delivering` | no target, nothing to repair/build| `Upgrading`             |
//! | any spending | carry empty                       | `Gathering`             |

use std::collections::BTreeMap;

use colony_core::{
    act_or_approach, next_gathering, ActionError, ActionOutcome, BuilderMemory, BuilderPhase,
    ColonyConfig, Host, StructureId, StructureKind, StructureSnapshot, TerritoryRecord,
    WorkerName, WorkerRecord, WorkerSnapshot,
};
use colony_system_scanner::{needs_repair, Census};
use tracing::{debug, warn};

/// Builder system configured with its controller and road thresholds.
#[derive(Clone, Copy, Debug)]
pub struct Builder {
    critical_downgrade_ticks: u32,
    road_tech_level: u8,
}

impl Builder {
    /// Creates a new builder system using the supplied configuration.
    #[must_use]
    pub fn new(config: &ColonyConfig) -> Self {
        Self {
            critical_downgrade_ticks: config.critical_downgrade_ticks,
            road_tech_level: config.road_tech_level,
        }
    }

    /// Runs one tick of the builder named by `worker`.
    ///
    /// Workers whose record is not a builder record are left untouched.
    pub fn run<H: Host + ?Sized>(
        &self,
        host: &mut H,
        territory: &mut TerritoryRecord,
        workers: &mut BTreeMap<WorkerName, WorkerRecord>,
        census: &Census,
        worker: &WorkerSnapshot,
    ) {
        let assignment = assign_container(&*host, territory, workers, census, &worker.name);
        let Some(WorkerRecord::Builder(memory)) = workers.get_mut(&worker.name) else {
            return;
        };
        memory.container = assignment;

        let was_gathering = memory.phase.is_gathering();
        let gathering = next_gathering(was_gathering, worker.carried, worker.capacity);
        if was_gathering && !gathering {
            memory.phase = BuilderPhase::Delivering { target: None };
        } else if gathering && !was_gathering {
            memory.phase = BuilderPhase::Gathering;
        }

        if census.due.lay_roads {
            self.lay_road(host, territory, worker);
        }

        if gathering {
            gather(host, census, worker, memory);
        } else {
            self.spend(host, territory, census, worker, memory);
        }
    }

    fn spend<H: Host + ?Sized>(
        &self,
        host: &mut H,
        territory: &mut TerritoryRecord,
        census: &Census,
        worker: &WorkerSnapshot,
        memory: &mut BuilderMemory,
    ) {
        if census.ticks_to_downgrade() < self.critical_downgrade_ticks {
            if memory.phase != BuilderPhase::Upgrading {
                debug!(worker = %worker.name, "controller grace critical, upgrading");
            }
            memory.phase = BuilderPhase::Upgrading;
            let _ = upgrade(host, worker);
            return;
        }

        let mut target = match memory.phase {
            BuilderPhase::Delivering { target } => target,
            BuilderPhase::Gathering | BuilderPhase::Upgrading => None,
        };
        if let Some(id) = target {
            let spare = live_structure(&*host, id)
                .is_some_and(|structure| structure.has_spare_capacity());
            if !spare {
                target = None;
            }
        }
        if target.is_none() && memory.phase != BuilderPhase::Upgrading {
            target = delivery_target(&*host, territory);
            memory.phase = BuilderPhase::Delivering { target };
        }

        if let Some(id) = target {
            let Some(structure) = live_structure(&*host, id) else {
                return;
            };
            let result = host.transfer(&worker.name, id);
            let full = result == Err(ActionError::Full);
            let _ = act_or_approach(host, &worker.name, structure.position, result);
            if full {
                memory.phase = BuilderPhase::Delivering { target: None };
            }
            return;
        }

        if try_repair(host, territory, census, worker) || try_build(host, worker) {
            return;
        }
        memory.phase = BuilderPhase::Upgrading;
        let _ = upgrade(host, worker);
    }

    fn lay_road<H: Host + ?Sized>(
        &self,
        host: &mut H,
        territory: &mut TerritoryRecord,
        worker: &WorkerSnapshot,
    ) {
        if territory.tech_level.get() < self.road_tech_level || territory.builds_this_tick > 0 {
            return;
        }
        let cell = worker.position;
        let occupied = host
            .structures()
            .iter()
            .any(|structure| structure.position == cell)
            || host
                .construction_sites()
                .iter()
                .any(|site| site.position == cell);
        if occupied {
            return;
        }

        match host.create_construction_site(cell, StructureKind::Road) {
            Ok(()) => {
                territory.builds_this_tick += 1;
                debug!(
                    territory = %territory.name,
                    %cell,
                    worker = %worker.name,
                    "road site placed"
                );
            }
            Err(reason) => {
                warn!(territory = %territory.name, %cell, %reason, "road site rejected");
            }
        }
    }
}

/// Number of builders assigned to each built container, in identifier order.
#[must_use]
pub fn container_loads(
    census: &Census,
    workers: &BTreeMap<WorkerName, WorkerRecord>,
) -> Vec<(StructureId, usize)> {
    census
        .structures_of(StructureKind::Container)
        .map(|container| {
            let load = workers
                .values()
                .filter(|record| match record {
                    WorkerRecord::Builder(memory) => memory.container == Some(container.id),
                    WorkerRecord::Miner(_) | WorkerRecord::Unassigned => false,
                })
                .count();
            (container.id, load)
        })
        .collect()
}

fn assign_container<H: Host + ?Sized>(
    host: &H,
    territory: &TerritoryRecord,
    workers: &BTreeMap<WorkerName, WorkerRecord>,
    census: &Census,
    name: &WorkerName,
) -> Option<StructureId> {
    let current = match workers.get(name) {
        Some(WorkerRecord::Builder(memory)) => memory.container,
        _ => return None,
    };
    if let Some(id) = current {
        let standing = live_structure(host, id)
            .is_some_and(|structure| structure.kind == StructureKind::Container);
        if standing {
            return Some(id);
        }
        debug!(
            territory = %territory.name,
            worker = %name,
            container = id.get(),
            "assigned container vanished"
        );
    }

    container_loads(census, workers)
        .into_iter()
        .min_by_key(|(id, load)| (*load, *id))
        .map(|(id, _)| id)
}

fn gather<H: Host + ?Sized>(
    host: &mut H,
    census: &Census,
    worker: &WorkerSnapshot,
    memory: &BuilderMemory,
) {
    if let Some(container) = memory.container.and_then(|id| live_structure(&*host, id)) {
        let result = host.withdraw(&worker.name, container.id);
        let _ = act_or_approach(host, &worker.name, container.position, result);
        return;
    }
    if let Some(source) = census.sources.first() {
        let result = host.harvest(&worker.name, source.id);
        let _ = act_or_approach(host, &worker.name, source.position, result);
    }
}

fn delivery_target<H: Host + ?Sized>(
    host: &H,
    territory: &mut TerritoryRecord,
) -> Option<StructureId> {
    let mut structures = host.structures();
    structures.sort_by_key(|structure| structure.id);
    let target = structures.into_iter().find(|structure| {
        structure.kind.accepts_delivery()
            && structure.has_spare_capacity()
            && !(structure.kind == StructureKind::Extension
                && territory.extension_ids_assigned.contains(&structure.id))
    })?;
    if target.kind == StructureKind::Extension {
        territory.extension_ids_assigned.push(target.id);
    }
    Some(target.id)
}

fn live_structure<H: Host + ?Sized>(host: &H, id: StructureId) -> Option<StructureSnapshot> {
    host.structures()
        .into_iter()
        .find(|structure| structure.id == id)
}

/// Repairs the first structure still due for repair, else a worn road underfoot.
///
/// Returns `true` when the worker spent its tick repairing or moving to repair.
pub fn try_repair<H: Host + ?Sized>(
    host: &mut H,
    territory: &TerritoryRecord,
    census: &Census,
    worker: &WorkerSnapshot,
) -> bool {
    let structures = host.structures();
    let due = census.repair_targets.iter().find_map(|id| {
        structures.iter().find(|structure| {
            structure.id == *id && needs_repair(structure, territory.desired_wall_hit_points)
        })
    });
    let underfoot = || {
        structures.iter().find(|structure| {
            structure.kind == StructureKind::Road
                && structure.position == worker.position
                && structure.hits < structure.hits_max
        })
    };
    let Some(target) = due.or_else(underfoot) else {
        return false;
    };

    let result = host.repair(&worker.name, target.id);
    act_or_approach(host, &worker.name, target.position, result).engaged()
}

/// Works on the oldest open construction site.
///
/// Returns `true` when the worker spent its tick building or moving to build.
pub fn try_build<H: Host + ?Sized>(host: &mut H, worker: &WorkerSnapshot) -> bool {
    let Some(site) = host
        .construction_sites()
        .into_iter()
        .min_by_key(|site| site.id)
    else {
        return false;
    };

    let result = host.build(&worker.name, site.id);
    act_or_approach(host, &worker.name, site.position, result).engaged()
}

/// Upgrades the controller, moving toward it when out of range.
pub fn upgrade<H: Host + ?Sized>(host: &mut H, worker: &WorkerSnapshot) -> ActionOutcome {
    let Some(controller) = host.controller() else {
        debug!(worker = %worker.name, "no controller to upgrade");
        return ActionOutcome::Failed;
    };
    let result = host.upgrade_controller(&worker.name);
    act_or_approach(host, &worker.name, controller.position, result)
}
