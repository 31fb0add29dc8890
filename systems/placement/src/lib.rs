#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Spatial optimizer that ranks grid cells by summed distance cost.
//!
//! Both searches scan a bounded window column by column (x outer, y inner)
//! and keep the first cell with the lowest cost, so identical inputs always
//! produce the same answer.

use colony_core::Position;

const CONTAINER_RANGE: i32 = 2;
const EXTENSION_WINDOW_HALF: i32 = 10;
const EXTENSION_SPACING: u32 = 1;
const SOURCE_CLEARANCE: u32 = 3;
const SPAWN_CLEARANCE: u32 = 2;

/// Picks the drop-off container cell for a resource node.
///
/// Candidates lie at exactly range two from the node and must be walkable.
/// The cost sums the distance from every gathering cell of the node plus the
/// distance to the spawn. Without a spawn no container is planned.
#[must_use]
pub fn container_position<F>(
    source: Position,
    task_cells: &[Position],
    spawn: Option<Position>,
    is_walkable: F,
) -> Option<Position>
where
    F: Fn(Position) -> bool,
{
    let spawn = spawn?;
    let mut best: Option<(u32, Position)> = None;

    for dx in -CONTAINER_RANGE..=CONTAINER_RANGE {
        for dy in -CONTAINER_RANGE..=CONTAINER_RANGE {
            let candidate = source.offset(dx, dy);
            if !candidate.in_bounds()
                || source.range_to(candidate) != CONTAINER_RANGE.unsigned_abs()
                || !is_walkable(candidate)
            {
                continue;
            }

            let cost = task_cells
                .iter()
                .map(|cell| cell.range_to(candidate))
                .sum::<u32>()
                + spawn.range_to(candidate);
            if best.map_or(true, |(lowest, _)| cost < lowest) {
                best = Some((cost, candidate));
            }
        }
    }

    best.map(|(_, position)| position)
}

/// Snapshot of the territory layout consulted when placing an extension.
#[derive(Clone, Copy, Debug)]
pub struct ExtensionLayout<'a> {
    /// Cell of the first spawn; the search window is centred on it.
    pub spawn: Position,
    /// Cells of every resource node.
    pub sources: &'a [Position],
    /// Cells of built extensions and open extension sites.
    pub extensions: &'a [Position],
    /// Cells already holding any structure or construction site.
    pub occupied: &'a [Position],
}

/// Picks the next extension construction cell around the spawn.
///
/// Cells next to another extension, within three of a resource node, within
/// two of the spawn, unwalkable or already occupied are skipped outright.
/// Returns `None` when the window holds no legal cell.
#[must_use]
pub fn extension_position<F>(layout: &ExtensionLayout<'_>, is_walkable: F) -> Option<Position>
where
    F: Fn(Position) -> bool,
{
    let mut best: Option<(u32, Position)> = None;

    for dx in -EXTENSION_WINDOW_HALF..EXTENSION_WINDOW_HALF {
        for dy in -EXTENSION_WINDOW_HALF..EXTENSION_WINDOW_HALF {
            let candidate = layout.spawn.offset(dx, dy);
            if !is_extension_candidate(layout, candidate, &is_walkable) {
                continue;
            }

            let cost = layout
                .sources
                .iter()
                .map(|source| source.range_to(candidate))
                .sum::<u32>()
                + layout.spawn.range_to(candidate);
            if best.map_or(true, |(lowest, _)| cost < lowest) {
                best = Some((cost, candidate));
            }
        }
    }

    best.map(|(_, position)| position)
}

fn is_extension_candidate<F>(
    layout: &ExtensionLayout<'_>,
    candidate: Position,
    is_walkable: &F,
) -> bool
where
    F: Fn(Position) -> bool,
{
    if !candidate.in_bounds() || !is_walkable(candidate) {
        return false;
    }
    if layout.spawn.range_to(candidate) <= SPAWN_CLEARANCE {
        return false;
    }
    if layout
        .extensions
        .iter()
        .any(|extension| extension.range_to(candidate) <= EXTENSION_SPACING)
    {
        return false;
    }
    if layout
        .sources
        .iter()
        .any(|source| source.range_to(candidate) <= SOURCE_CLEARANCE)
    {
        return false;
    }
    !layout.occupied.contains(&candidate)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open(_: Position) -> bool {
        true
    }

    #[test]
    fn container_requires_a_spawn() {
        let source = Position::new(20, 20);
        let tasks = source.neighbours();
        assert_eq!(container_position(source, &tasks, None, open), None);
    }

    #[test]
    fn container_sits_at_range_two_towards_spawn() {
        let source = Position::new(20, 20);
        let tasks = source.neighbours();
        let spawn = Position::new(30, 20);

        let chosen = container_position(source, &tasks, Some(spawn), open)
            .expect("open ground yields a container cell");

        assert_eq!(source.range_to(chosen), 2);
        assert_eq!(chosen, Position::new(22, 20));
    }

    #[test]
    fn container_skips_unwalkable_cells() {
        let source = Position::new(20, 20);
        let tasks = source.neighbours();
        let spawn = Position::new(30, 20);
        let blocked = |cell: Position| cell.x() != 22;

        let chosen = container_position(source, &tasks, Some(spawn), blocked)
            .expect("other ring cells remain");

        assert_ne!(chosen.x(), 22);
        assert_eq!(source.range_to(chosen), 2);
    }

    #[test]
    fn extension_respects_clearances() {
        let spawn = Position::new(25, 25);
        let sources = [Position::new(25, 31)];
        let extensions = [Position::new(22, 25)];
        let layout = ExtensionLayout {
            spawn,
            sources: &sources,
            extensions: &extensions,
            occupied: &extensions,
        };

        let chosen = extension_position(&layout, open).expect("window has room");

        assert!(spawn.range_to(chosen) > 2);
        assert!(sources[0].range_to(chosen) > 3);
        assert!(extensions[0].range_to(chosen) > 1);
    }

    #[test]
    fn extension_search_fails_when_window_is_walled_off() {
        let sources = [Position::new(10, 10)];
        let layout = ExtensionLayout {
            spawn: Position::new(25, 25),
            sources: &sources,
            extensions: &[],
            occupied: &[],
        };
        assert_eq!(extension_position(&layout, |_| false), None);
    }

    #[test]
    fn repeated_searches_agree() {
        let spawn = Position::new(12, 40);
        let sources = [Position::new(8, 30), Position::new(20, 44)];
        let extensions = [Position::new(15, 37), Position::new(9, 41)];
        let layout = ExtensionLayout {
            spawn,
            sources: &sources,
            extensions: &extensions,
            occupied: &extensions,
        };
        let walls = |cell: Position| (cell.x() + cell.y()) % 7 != 0;

        assert_eq!(
            extension_position(&layout, walls),
            extension_position(&layout, walls)
        );
        let tasks = sources[0].neighbours();
        assert_eq!(
            container_position(sources[0], &tasks, Some(spawn), walls),
            container_position(sources[0], &tasks, Some(spawn), walls)
        );
    }
}
