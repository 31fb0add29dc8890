#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Territory scanner producing the per-tick census.
//!
//! The scan runs first every tick. It sorts the host snapshots into a stable
//! order, adopts workers that have no role yet, derives the tech and energy
//! levels and writes them back into the territory record.

use std::collections::BTreeMap;

use colony_core::{
    ColonyConfig, ControllerSnapshot, EnergyLevel, Host, Position, Role, SiteSnapshot,
    SourceSnapshot, StructureId, StructureKind, StructureSnapshot, TechLevel, TerritoryRecord,
    WorkerName, WorkerRecord, WorkerSnapshot, CENSUS_CADENCE, LOCK_RESET_CADENCE,
    MAINTENANCE_CADENCE,
};
use colony_system_placement::{extension_position, ExtensionLayout};
use tracing::{debug, info, warn};

const LADDER_SLACK: usize = 2;
const MIN_WORKERS_PER_ROLE: usize = 2;

/// Periodic work that is due on the scanned tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DueWork {
    /// Revalidate gathering task owners.
    pub reconcile_tasks: bool,
    /// Try to open one container or extension construction site.
    pub place_sites: bool,
    /// Let builders lay roads under their feet.
    pub lay_roads: bool,
    /// Forget the extensions builders claimed recently.
    pub clear_extension_locks: bool,
    /// Emit the census line and collect stale worker memory.
    pub census_report: bool,
}

impl DueWork {
    /// Schedule for the provided tick.
    #[must_use]
    pub const fn at(tick: u64) -> Self {
        Self {
            reconcile_tasks: MAINTENANCE_CADENCE.fires(tick),
            place_sites: MAINTENANCE_CADENCE.fires(tick),
            lay_roads: MAINTENANCE_CADENCE.fires(tick),
            clear_extension_locks: LOCK_RESET_CADENCE.fires(tick),
            census_report: CENSUS_CADENCE.fires(tick),
        }
    }
}

/// Counts that feed the tech-level ladder.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Progress {
    /// Live miners.
    pub miners: usize,
    /// Gathering tasks in the registry.
    pub tasks: usize,
    /// Built drop-off containers.
    pub containers: usize,
    /// Resource nodes.
    pub sources: usize,
    /// Live builders.
    pub builders: usize,
    /// Target builder count.
    pub desired_builders: usize,
    /// Built extensions.
    pub extensions: usize,
    /// Extensions the controller allows.
    pub extension_quota: usize,
}

impl Progress {
    /// Climbs the ladder and stops at the first unmet rung.
    ///
    /// Worker rungs tolerate two missing workers so one death mid-respawn
    /// does not drop the level.
    #[must_use]
    pub fn tech_level(&self) -> TechLevel {
        if self.miners + LADDER_SLACK < self.tasks {
            TechLevel::BootstrappingMiners
        } else if self.containers != self.sources {
            TechLevel::NeedContainers
        } else if self.builders + LADDER_SLACK < self.desired_builders {
            TechLevel::BootstrappingBuilders
        } else if self.extensions < self.extension_quota {
            TechLevel::NeedExtensions
        } else {
            TechLevel::Mature
        }
    }
}

/// Picks the spawning budget from the tech level and the spawn energy.
#[must_use]
pub fn energy_level(
    tech_level: TechLevel,
    progress: &Progress,
    energy_available: u32,
    energy_capacity: u32,
    config: &ColonyConfig,
) -> EnergyLevel {
    let starved =
        tech_level <= TechLevel::NeedExtensions && energy_available < config.low_energy_threshold;
    if starved
        || progress.miners < MIN_WORKERS_PER_ROLE
        || progress.builders < MIN_WORKERS_PER_ROLE
    {
        EnergyLevel::Low
    } else if energy_capacity < config.high_energy_capacity {
        EnergyLevel::Medium
    } else {
        EnergyLevel::High
    }
}

/// Reports whether a structure is due for repair.
///
/// Roads never qualify here. Walls qualify below the durability target,
/// ramparts once a quarter of the target is missing and everything else once
/// a quarter of its maximum durability is missing.
#[must_use]
pub fn needs_repair(structure: &StructureSnapshot, wall_target: u32) -> bool {
    let quarter_exceeded =
        |deficit: u32, reference: u32| u64::from(deficit) * 4 > u64::from(reference);
    match structure.kind {
        StructureKind::Road => false,
        StructureKind::Wall => structure.hits < wall_target,
        StructureKind::Rampart => {
            quarter_exceeded(wall_target.saturating_sub(structure.hits), wall_target)
        }
        _ => quarter_exceeded(
            structure.hits_max.saturating_sub(structure.hits),
            structure.hits_max,
        ),
    }
}

/// Snapshot of a territory taken at the start of a tick.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Census {
    /// Tick the census was taken on.
    pub tick: u64,
    /// Workers sorted by name, including those still being spawned.
    pub workers: Vec<WorkerSnapshot>,
    /// Names of miners, sorted.
    pub miners: Vec<WorkerName>,
    /// Names of builders, sorted.
    pub builders: Vec<WorkerName>,
    /// Structures sorted by identifier.
    pub structures: Vec<StructureSnapshot>,
    /// Construction sites sorted by identifier, oldest first.
    pub sites: Vec<SiteSnapshot>,
    /// Structures due for repair, sorted by identifier.
    pub repair_targets: Vec<StructureId>,
    /// Resource nodes sorted by identifier.
    pub sources: Vec<SourceSnapshot>,
    /// Controller of the territory.
    pub controller: Option<ControllerSnapshot>,
    /// Energy available for spawning.
    pub energy_available: u32,
    /// Total spawning energy capacity.
    pub energy_capacity: u32,
    /// Inputs of the tech ladder.
    pub progress: Progress,
    /// Periodic work due this tick.
    pub due: DueWork,
}

impl Census {
    /// Structures of one kind, in identifier order.
    pub fn structures_of(
        &self,
        kind: StructureKind,
    ) -> impl Iterator<Item = &StructureSnapshot> + '_ {
        self.structures
            .iter()
            .filter(move |structure| structure.kind == kind)
    }

    /// Spawn with the lowest identifier, the anchor of every layout decision.
    #[must_use]
    pub fn first_spawn(&self) -> Option<&StructureSnapshot> {
        self.structures_of(StructureKind::Spawn).next()
    }

    /// Spawns not currently producing a worker, in identifier order.
    #[must_use]
    pub fn inactive_spawns(&self) -> Vec<StructureId> {
        self.structures_of(StructureKind::Spawn)
            .filter(|spawn| !spawn.spawning)
            .map(|spawn| spawn.id)
            .collect()
    }

    /// Remaining controller grace period; territories without one never decay.
    #[must_use]
    pub fn ticks_to_downgrade(&self) -> u32 {
        self.controller
            .as_ref()
            .map_or(u32::MAX, |controller| controller.ticks_to_downgrade)
    }
}

/// Takes the census and refreshes the derived fields of the territory record.
pub fn scan<H: Host + ?Sized>(
    host: &H,
    territory: &mut TerritoryRecord,
    workers: &mut BTreeMap<WorkerName, WorkerRecord>,
    config: &ColonyConfig,
) -> Census {
    let tick = host.time();

    let mut live = host.workers();
    live.sort_by(|left, right| left.name.cmp(&right.name));
    let mut miners = Vec::new();
    let mut builders = Vec::new();
    for worker in &live {
        match adopt(territory, workers, &worker.name) {
            Role::Miner => miners.push(worker.name.clone()),
            Role::Builder => builders.push(worker.name.clone()),
            Role::Unassigned => {}
        }
    }

    let mut structures = host.structures();
    structures.sort_by_key(|structure| structure.id);
    let mut sites = host.construction_sites();
    sites.sort_by_key(|site| site.id);
    let mut sources = host.sources();
    sources.sort_by_key(|source| source.id);

    let repair_targets = structures
        .iter()
        .filter(|structure| needs_repair(structure, territory.desired_wall_hit_points))
        .map(|structure| structure.id)
        .collect();

    let controller = host.controller();
    let extension_quota = controller
        .as_ref()
        .map_or(0, |controller| config.extension_quota(controller.level));
    let count = |kind: StructureKind| {
        structures
            .iter()
            .filter(|structure| structure.kind == kind)
            .count()
    };
    let progress = Progress {
        miners: miners.len(),
        tasks: territory.miner_tasks.len(),
        containers: count(StructureKind::Container),
        sources: territory.energy_sources.len(),
        builders: builders.len(),
        desired_builders: usize::try_from(territory.desired_builders).unwrap_or(usize::MAX),
        extensions: count(StructureKind::Extension),
        extension_quota: usize::try_from(extension_quota).unwrap_or(usize::MAX),
    };

    let energy_available = host.energy_available();
    let energy_capacity = host.energy_capacity();
    let tech_level = progress.tech_level();
    territory.tech_level = tech_level;
    territory.energy_level = energy_level(
        tech_level,
        &progress,
        energy_available,
        energy_capacity,
        config,
    );
    territory.builds_this_tick = 0;

    Census {
        tick,
        workers: live,
        miners,
        builders,
        structures,
        sites,
        repair_targets,
        sources,
        controller,
        energy_available,
        energy_capacity,
        progress,
        due: DueWork::at(tick),
    }
}

fn adopt(
    territory: &TerritoryRecord,
    workers: &mut BTreeMap<WorkerName, WorkerRecord>,
    name: &WorkerName,
) -> Role {
    let known = workers
        .get(name)
        .map_or(Role::Unassigned, WorkerRecord::role);
    if known != Role::Unassigned {
        return known;
    }

    let role = Role::from_worker_name(name.as_str()).unwrap_or(Role::Miner);
    info!(territory = %territory.name, worker = %name, %role, "adopting worker without a role");
    let _ = workers.insert(name.clone(), WorkerRecord::new(role));
    role
}

/// Opens a construction site on the first planned container cell still empty.
///
/// Cells already holding a structure or a site are skipped. Returns the cell
/// when the host accepted the site.
pub fn place_container<H: Host + ?Sized>(
    host: &mut H,
    territory: &TerritoryRecord,
    census: &Census,
) -> Option<Position> {
    let position = territory
        .container_positions
        .iter()
        .map(|anchor| anchor.position)
        .find(|cell| {
            !census.structures.iter().any(|structure| structure.position == *cell)
                && !census.sites.iter().any(|site| site.position == *cell)
        })?;

    match host.create_construction_site(position, StructureKind::Container) {
        Ok(()) => {
            info!(territory = %territory.name, cell = %position, "container site placed");
            Some(position)
        }
        Err(reason) => {
            warn!(
                territory = %territory.name,
                cell = %position,
                %reason,
                "container site rejected"
            );
            None
        }
    }
}

/// Opens one extension construction site when the territory is under quota.
///
/// Returns the chosen cell when the host accepted the site.
pub fn place_extension<H: Host + ?Sized>(
    host: &mut H,
    territory: &TerritoryRecord,
    census: &Census,
) -> Option<Position> {
    let Some(spawn) = census.first_spawn() else {
        debug!(territory = %territory.name, "no spawn to anchor extensions");
        return None;
    };

    let mut extensions: Vec<Position> = census
        .structures_of(StructureKind::Extension)
        .map(|structure| structure.position)
        .collect();
    let built = extensions.len();
    extensions.extend(
        census
            .sites
            .iter()
            .filter(|site| site.kind == StructureKind::Extension)
            .map(|site| site.position),
    );
    if extensions.len() >= census.progress.extension_quota {
        return None;
    }

    let sources: Vec<Position> = census.sources.iter().map(|source| source.position).collect();
    let occupied: Vec<Position> = census
        .structures
        .iter()
        .map(|structure| structure.position)
        .chain(census.sites.iter().map(|site| site.position))
        .collect();
    let layout = ExtensionLayout {
        spawn: spawn.position,
        sources: &sources,
        extensions: &extensions,
        occupied: &occupied,
    };

    let Some(position) = extension_position(&layout, |cell| host.is_walkable(cell)) else {
        warn!(territory = %territory.name, built, "no legal cell for another extension");
        return None;
    };
    match host.create_construction_site(position, StructureKind::Extension) {
        Ok(()) => {
            info!(territory = %territory.name, cell = %position, "extension site placed");
            Some(position)
        }
        Err(reason) => {
            warn!(
                territory = %territory.name,
                cell = %position,
                %reason,
                "extension site rejected"
            );
            None
        }
    }
}

/// Emits the periodic census line.
pub fn report(territory: &TerritoryRecord, census: &Census) {
    info!(
        territory = %territory.name,
        tick = census.tick,
        miners = census.miners.len(),
        tasks = territory.miner_tasks.len(),
        builders = census.builders.len(),
        desired_builders = territory.desired_builders,
        structures = census.structures.len(),
        containers = census.progress.containers,
        container_positions = territory.container_positions.len(),
        tech = territory.tech_level.get(),
        energy = territory.energy_level.get(),
        "census"
    );
}
