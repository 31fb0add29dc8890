//! Seeded territory layouts for simulated runs.

use colony_core::{Position, StructureKind, Terrain, ROOM_SIZE};
use colony_world::World;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

const TERRITORY_NAME: &str = "W1N1";
const SOURCE_COUNT: usize = 2;
const CONTROLLER_LEVEL: u8 = 2;
const BORDER: i32 = 5;
const LANDMARK_SPACING: u32 = 8;
const PLACEMENT_ATTEMPTS: usize = 64;
const WALL_CLUSTERS: usize = 14;
const WALL_CLEARANCE: u32 = 3;

/// Builds a territory with a spawn, a controller, resource nodes and wall clusters.
///
/// The same seed always yields the same territory.
pub(crate) fn generate(seed: u64) -> World {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut world = World::new(TERRITORY_NAME);

    let mut landmarks = Vec::new();
    let spawn = spaced_cell(&mut rng, &landmarks);
    landmarks.push(spawn);
    let controller = spaced_cell(&mut rng, &landmarks);
    landmarks.push(controller);
    for _ in 0..SOURCE_COUNT {
        let source = spaced_cell(&mut rng, &landmarks);
        landmarks.push(source);
        let _ = world.add_source(source);
    }
    let _ = world.add_structure(StructureKind::Spawn, spawn);
    world.set_controller(controller, CONTROLLER_LEVEL);

    for _ in 0..WALL_CLUSTERS {
        let centre = interior_cell(&mut rng);
        let radius = rng.gen_range(1..=2);
        for dx in -radius..=radius {
            for dy in -radius..=radius {
                let cell = centre.offset(dx, dy);
                let clear = landmarks
                    .iter()
                    .all(|landmark| landmark.range_to(cell) >= WALL_CLEARANCE);
                if clear {
                    world.set_terrain(cell, Terrain::Wall);
                }
            }
        }
    }
    world
}

fn interior_cell(rng: &mut ChaCha8Rng) -> Position {
    let far = ROOM_SIZE - BORDER;
    Position::new(rng.gen_range(BORDER..far), rng.gen_range(BORDER..far))
}

/// Draws a cell away from every landmark, settling for the last draw when crowded.
fn spaced_cell(rng: &mut ChaCha8Rng, landmarks: &[Position]) -> Position {
    let mut candidate = interior_cell(rng);
    for _ in 0..PLACEMENT_ATTEMPTS {
        if landmarks
            .iter()
            .all(|landmark| landmark.range_to(candidate) >= LANDMARK_SPACING)
        {
            break;
        }
        candidate = interior_cell(rng);
    }
    candidate
}
