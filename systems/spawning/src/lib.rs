#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Spawn planner that fills miner and builder deficits from idle spawns.

use std::collections::BTreeMap;

use colony_core::{
    ActionError, BodyTiers, ColonyConfig, Host, Role, StructureId, TechLevel, TerritoryRecord,
    WorkerName, WorkerRecord,
};
use colony_system_scanner::Census;
use tracing::{debug, info};

/// Spawn planner configured with the body tables of each role.
#[derive(Clone, Debug)]
pub struct Spawning {
    miner_bodies: BodyTiers,
    builder_bodies: BodyTiers,
}

impl Spawning {
    /// Creates a new spawn planner using the supplied configuration.
    #[must_use]
    pub fn new(config: &ColonyConfig) -> Self {
        Self {
            miner_bodies: config.miner_bodies.clone(),
            builder_bodies: config.builder_bodies.clone(),
        }
    }

    /// Requests at most one worker per role with a deficit, miners first.
    ///
    /// Builders are only considered from [`TechLevel::BootstrappingBuilders`]
    /// on. A spawn that accepted a request is not offered the next one.
    /// Returns the names of the workers whose spawn was accepted.
    pub fn handle<H: Host + ?Sized>(
        &self,
        host: &mut H,
        territory: &mut TerritoryRecord,
        workers: &mut BTreeMap<WorkerName, WorkerRecord>,
        census: &Census,
    ) -> Vec<WorkerName> {
        let mut inactive = census.inactive_spawns();
        let mut spawned = Vec::new();

        if census.miners.len() < territory.miner_tasks.len() {
            spawned.extend(self.try_spawn(host, territory, workers, &mut inactive, Role::Miner));
        }

        let desired_builders = usize::try_from(territory.desired_builders).unwrap_or(usize::MAX);
        if territory.tech_level >= TechLevel::BootstrappingBuilders
            && census.builders.len() < desired_builders
        {
            let builder = self.try_spawn(host, territory, workers, &mut inactive, Role::Builder);
            spawned.extend(builder);
        }

        spawned
    }

    fn bodies(&self, role: Role) -> &BodyTiers {
        match role {
            Role::Builder => &self.builder_bodies,
            Role::Miner | Role::Unassigned => &self.miner_bodies,
        }
    }

    fn try_spawn<H: Host + ?Sized>(
        &self,
        host: &mut H,
        territory: &mut TerritoryRecord,
        workers: &mut BTreeMap<WorkerName, WorkerRecord>,
        inactive: &mut Vec<StructureId>,
        role: Role,
    ) -> Option<WorkerName> {
        let body = self.bodies(role).for_level(territory.energy_level);
        let name = WorkerName::new(format!(
            "{} - {}{}",
            territory.name,
            role.label(),
            territory.peek_worker_serial()
        ));

        let mut accepted = None;
        for (index, spawn) in inactive.iter().copied().enumerate() {
            match host.spawn_worker(spawn, body, &name) {
                Ok(()) => {
                    accepted = Some(index);
                    break;
                }
                Err(ActionError::NotEnoughResources) => {
                    debug!(territory = %territory.name, %role, "not enough energy to spawn");
                }
                Err(reason) => {
                    debug!(
                        territory = %territory.name,
                        spawn = spawn.get(),
                        %reason,
                        "spawn refused"
                    );
                }
            }
        }

        let spawn = inactive.remove(accepted?);
        territory.commit_worker_serial();
        territory.spawn_text = Some(role.label().to_owned());
        territory.spawn_text_id = Some(spawn);
        let _ = workers.insert(name.clone(), WorkerRecord::new(role));
        info!(
            territory = %territory.name,
            worker = %name,
            spawn = spawn.get(),
            parts = body.len(),
            "started spawning worker"
        );
        Some(name)
    }
}
