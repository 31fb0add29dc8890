#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Per-tick entry point that drives every colony system over each territory.
//!
//! Within a territory the order is fixed: scan, spawn planning, periodic
//! maintenance, then worker dispatch in census order. Maintenance opens at
//! most one construction site per tick, planned containers before extensions.

use std::collections::{BTreeMap, BTreeSet};

use colony_core::{
    ColonyConfig, Host, Memory, Position, Role, TerritoryRecord, WorkerName, WorkerRecord,
    CENSUS_CADENCE, SCHEMA_VERSION,
};
use colony_system_builder::Builder;
use colony_system_miner::Miner;
use colony_system_scanner::{place_container, place_extension, report, scan, Census};
use colony_system_spawning::Spawning;
use colony_system_tasks::{initialize_territory, reconcile};
use tracing::{debug, warn};

/// Outcome of one tick over every territory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TickReport {
    /// Tick that was processed.
    pub tick: u64,
    /// Whether stored memory was wiped because of a schema mismatch.
    pub schema_reset: bool,
    /// Per-territory outcomes in host order.
    pub territories: Vec<TerritoryReport>,
    /// Worker records deleted because their worker no longer exists.
    pub collected: Vec<WorkerName>,
}

/// Outcome of one tick over a single territory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TerritoryReport {
    /// Territory name.
    pub territory: String,
    /// Whether the territory record was created this tick.
    pub initialized: bool,
    /// Workers whose spawn request was accepted.
    pub spawned: Vec<WorkerName>,
    /// Cell of the container site opened this tick.
    pub container: Option<Position>,
    /// Cell of the extension site opened this tick.
    pub extension: Option<Position>,
    /// Workers that lost their gathering task during reconciliation.
    pub released: Vec<WorkerName>,
    /// Census the tick was planned from.
    pub census: Census,
}

/// Runs the colony systems in their fixed per-tick order.
#[derive(Clone, Debug)]
pub struct Bootstrap {
    config: ColonyConfig,
    spawning: Spawning,
    miner: Miner,
    builder: Builder,
}

impl Bootstrap {
    /// Creates the orchestrator with every system configured from `config`.
    #[must_use]
    pub fn new(config: ColonyConfig) -> Self {
        Self {
            spawning: Spawning::new(&config),
            miner: Miner::new(&config),
            builder: Builder::new(&config),
            config,
        }
    }

    /// Processes one tick for every territory, in the order of `hosts`.
    pub fn run_tick<H: Host>(&self, memory: &mut Memory, hosts: &mut [H]) -> TickReport {
        let tick = hosts.first().map_or(0, |host| host.time());

        let stored = memory.schema_version;
        let schema_reset = memory.ensure_schema(SCHEMA_VERSION);
        if schema_reset {
            warn!(
                stored = ?stored,
                expected = SCHEMA_VERSION,
                "memory schema changed, resetting every record"
            );
        }

        let territories = hosts
            .iter_mut()
            .map(|host| self.run_territory(memory, host))
            .collect();

        let collected = if CENSUS_CADENCE.fires(tick) {
            let live: BTreeSet<WorkerName> = hosts
                .iter()
                .flat_map(|host| host.workers())
                .map(|worker| worker.name)
                .collect();
            let collected = memory.collect_stale_workers(&live);
            for name in &collected {
                debug!(worker = %name, "clearing memory of missing worker");
            }
            collected
        } else {
            Vec::new()
        };

        TickReport {
            tick,
            schema_reset,
            territories,
            collected,
        }
    }

    fn run_territory<H: Host>(&self, memory: &mut Memory, host: &mut H) -> TerritoryReport {
        let Memory {
            territories,
            workers,
            ..
        } = memory;
        let name = host.territory().to_owned();

        let initialized = !territories.contains_key(&name);
        let territory = territories
            .entry(name.clone())
            .or_insert_with(|| initialize_territory(&*host, &self.config));

        let census = scan(&*host, territory, workers, &self.config);
        let spawned = self.spawning.handle(host, territory, workers, &census);

        let (container, extension) = if census.due.place_sites {
            match place_container(host, territory, &census) {
                Some(cell) => (Some(cell), None),
                None => (None, place_extension(host, territory, &census)),
            }
        } else {
            (None, None)
        };
        let released = if census.due.reconcile_tasks {
            reconcile(&*host, territory, workers)
        } else {
            Vec::new()
        };
        if census.due.clear_extension_locks {
            territory.extension_ids_assigned.clear();
        }
        if census.due.census_report {
            report(territory, &census);
        }

        self.dispatch(host, territory, workers, &census);

        TerritoryReport {
            territory: name,
            initialized,
            spawned,
            container,
            extension,
            released,
            census,
        }
    }

    fn dispatch<H: Host>(
        &self,
        host: &mut H,
        territory: &mut TerritoryRecord,
        workers: &mut BTreeMap<WorkerName, WorkerRecord>,
        census: &Census,
    ) {
        for worker in &census.workers {
            if worker.spawning {
                continue;
            }
            let role = workers
                .get(&worker.name)
                .map_or(Role::Unassigned, WorkerRecord::role);
            match role {
                Role::Miner => {
                    if let Some(WorkerRecord::Miner(memory)) = workers.get_mut(&worker.name) {
                        self.miner.run(host, territory, census, worker, memory);
                    }
                }
                Role::Builder => self.builder.run(host, territory, workers, census, worker),
                Role::Unassigned => {
                    debug!(territory = %territory.name, worker = %worker.name, "worker has no role");
                }
            }
        }
    }
}
