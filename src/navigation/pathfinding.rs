//! A* pathfinding over the local map
//!
//! Four-directional, unit step cost, Manhattan heuristic. Only tiles
//! classified walkable are expanded, so blocked and unknown tiles are never
//! entered and the search never leaves the window.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use ahash::AHashMap;

use crate::core::types::{Direction, Position};
use crate::world::local_map::{LocalMap, TileClass};

/// Node in the A* open set
#[derive(Debug, Clone)]
struct PathNode {
    pos: Position,
    f_cost: u32,
    /// Push order, for deterministic tie-breaks
    seq: u64,
}

impl PartialEq for PathNode {
    fn eq(&self, other: &Self) -> bool {
        self.f_cost == other.f_cost && self.seq == other.seq
    }
}

impl Eq for PathNode {}

impl Ord for PathNode {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse order for min-heap; earlier insertion wins ties
        other
            .f_cost
            .cmp(&self.f_cost)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for PathNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Shortest orthogonal move sequence from `start` to `goal`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedPath {
    pub start: Position,
    pub goal: Position,
    pub moves: Vec<Direction>,
}

impl PlannedPath {
    pub fn len(&self) -> usize {
        self.moves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.moves.is_empty()
    }

    /// Every tile visited after `start`, in order
    pub fn positions(&self) -> Vec<Position> {
        self.moves
            .iter()
            .scan(self.start, |pos, dir| {
                *pos = pos.step(*dir);
                Some(*pos)
            })
            .collect()
    }

    /// Run-length description, e.g. `2×down, 3×right`
    pub fn condensed(&self) -> String {
        if self.moves.is_empty() {
            return "no moves".to_string();
        }
        let mut runs: Vec<(Direction, usize)> = Vec::new();
        for &dir in &self.moves {
            match runs.last_mut() {
                Some((last, n)) if *last == dir => *n += 1,
                _ => runs.push((dir, 1)),
            }
        }
        runs.iter()
            .map(|(dir, n)| format!("{n}×{dir}"))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Why no path was produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Unreachable {
    /// Goal is not walkable; no search was run
    GoalNotWalkable { goal: Position, class: TileClass },
    /// Search exhausted the walkable region
    NoRoute { goal: Position, explored: usize },
    /// No local map this turn, so there is nothing to search
    NoMap { goal: Position },
}

impl std::fmt::Display for Unreachable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Unreachable::GoalNotWalkable { goal, class } => {
                write!(f, "target {goal} is not walkable ({class:?})")
            }
            Unreachable::NoRoute { goal, explored } => {
                write!(f, "no route to {goal} through known walkable tiles ({explored} explored)")
            }
            Unreachable::NoMap { goal } => {
                write!(f, "cannot plan to {goal}: player position unresolved, no local map")
            }
        }
    }
}

pub type PlanOutcome = std::result::Result<PlannedPath, Unreachable>;

/// Plan on the local map
pub fn find_path(map: &LocalMap, start: Position, goal: Position) -> PlanOutcome {
    find_path_with(start, goal, |pos| map.classify(pos))
}

/// Plan with an arbitrary classification function
pub fn find_path_with(
    start: Position,
    goal: Position,
    classify: impl Fn(Position) -> TileClass,
) -> PlanOutcome {
    if start == goal {
        return Ok(PlannedPath {
            start,
            goal,
            moves: Vec::new(),
        });
    }

    let goal_class = classify(goal);
    if !goal_class.is_walkable() {
        return Err(Unreachable::GoalNotWalkable {
            goal,
            class: goal_class,
        });
    }

    let mut open_set = BinaryHeap::new();
    let mut came_from: AHashMap<Position, (Position, Direction)> = AHashMap::new();
    let mut g_scores: AHashMap<Position, u32> = AHashMap::new();
    let mut seq = 0u64;

    g_scores.insert(start, 0);
    open_set.push(PathNode {
        pos: start,
        f_cost: start.manhattan(&goal),
        seq,
    });

    while let Some(current) = open_set.pop() {
        if current.pos == goal {
            return Ok(PlannedPath {
                start,
                goal,
                moves: reconstruct_moves(&came_from, start, goal),
            });
        }

        let current_g = g_scores.get(&current.pos).copied().unwrap_or(u32::MAX);
        // Stale heap entry
        if current.f_cost > current_g.saturating_add(current.pos.manhattan(&goal)) {
            continue;
        }

        for (dir, neighbor) in current.pos.neighbors() {
            if !classify(neighbor).is_walkable() {
                continue;
            }

            let tentative_g = current_g + 1;
            let neighbor_g = g_scores.get(&neighbor).copied().unwrap_or(u32::MAX);

            if tentative_g < neighbor_g {
                came_from.insert(neighbor, (current.pos, dir));
                g_scores.insert(neighbor, tentative_g);

                seq += 1;
                open_set.push(PathNode {
                    pos: neighbor,
                    f_cost: tentative_g + neighbor.manhattan(&goal),
                    seq,
                });
            }
        }
    }

    Err(Unreachable::NoRoute {
        goal,
        explored: g_scores.len(),
    })
}

/// Walk `came_from` back from the goal and return moves in travel order
fn reconstruct_moves(
    came_from: &AHashMap<Position, (Position, Direction)>,
    start: Position,
    goal: Position,
) -> Vec<Direction> {
    let mut moves = Vec::new();
    let mut current = goal;
    while current != start {
        let Some(&(prev, dir)) = came_from.get(&current) else {
            break;
        };
        moves.push(dir);
        current = prev;
    }
    moves.reverse();
    moves
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::game_status::GameStatus;
    use crate::world::local_map::{Bounds, Confidence, StatusFlags, TerrainSignal};

    /// Window around `player` where every tile is walkable except `blocked`
    fn open_map(player: Position, radius: i32, blocked: &[Position]) -> LocalMap {
        let mut tiles = AHashMap::new();
        for dy in -radius..=radius {
            for dx in -radius..=radius {
                let pos = Position::new(player.x + dx, player.y + dy);
                let class = if blocked.contains(&pos) {
                    TileClass::Blocked(Confidence::Measured)
                } else {
                    TileClass::Walkable(Confidence::Derived)
                };
                tiles.insert(pos, class);
            }
        }
        LocalMap {
            map_id: None,
            player,
            facing: None,
            radius,
            bounds: Bounds::Unresolved {
                reason: "test".into(),
            },
            tiles,
            exits: vec![],
            npcs: vec![],
            terrain: TerrainSignal::Unavailable,
            status: StatusFlags::default(),
            game: GameStatus::default(),
            unresolved: vec![],
        }
    }

    #[test]
    fn test_pathfind_straight_line() {
        let start = Position::new(5, 5);
        let map = open_map(start, 5, &[]);
        let goal = Position::new(9, 5);

        let path = find_path(&map, start, goal).unwrap();
        assert_eq!(path.moves, vec![Direction::Right; 4]);
        assert_eq!(path.positions().last(), Some(&goal));
    }

    #[test]
    fn test_unobstructed_length_is_manhattan() {
        let start = Position::new(5, 5);
        let map = open_map(start, 5, &[]);
        let goal = Position::new(2, 9);

        let path = find_path(&map, start, goal).unwrap();
        assert_eq!(path.len() as u32, start.manhattan(&goal));
    }

    #[test]
    fn test_pathfind_around_corner_obstacles() {
        // Right and up from the start are blocked; the row below is open
        let start = Position::new(6, 1);
        let goal = Position::new(7, 0);
        let blocked = [Position::new(7, 1), Position::new(6, 0)];
        let map = open_map(start, 3, &blocked);

        let path = find_path(&map, start, goal).unwrap();
        assert!(path.len() >= 4);
        assert!(path.len() as u32 > start.manhattan(&goal));
        for pos in path.positions() {
            assert!(!blocked.contains(&pos), "path entered blocked tile {pos}");
        }
        assert_eq!(path.positions().last(), Some(&goal));
    }

    #[test]
    fn test_every_step_is_orthogonal() {
        let start = Position::new(5, 5);
        let map = open_map(start, 4, &[Position::new(6, 5), Position::new(6, 4)]);
        let path = find_path(&map, start, Position::new(8, 3)).unwrap();

        let mut prev = start;
        for pos in path.positions() {
            assert_eq!(prev.manhattan(&pos), 1);
            prev = pos;
        }
    }

    #[test]
    fn test_never_enters_unknown() {
        let start = Position::new(3, 3);
        let mut map = open_map(start, 3, &[]);
        // Wall of unknown between start and goal with a single gap at y=6
        for y in 0..6 {
            map.tiles.insert(Position::new(4, y), TileClass::Unknown);
        }
        let path = find_path(&map, start, Position::new(5, 3)).unwrap();
        assert!(path.positions().contains(&Position::new(4, 6)));
        assert!(path.positions().iter().all(|p| map.is_walkable(*p)));
    }

    #[test]
    fn test_pathfind_same_start_goal() {
        let start = Position::new(5, 5);
        let map = open_map(start, 2, &[]);
        let path = find_path(&map, start, start).unwrap();
        assert!(path.is_empty());
        assert_eq!(path.condensed(), "no moves");
    }

    #[test]
    fn test_blocked_goal_fails_without_search() {
        let start = Position::new(5, 5);
        let goal = Position::new(6, 6);
        let map = open_map(start, 2, &[goal]);
        assert_eq!(
            find_path(&map, start, goal),
            Err(Unreachable::GoalNotWalkable {
                goal,
                class: TileClass::Blocked(Confidence::Measured),
            })
        );
    }

    #[test]
    fn test_goal_outside_window_is_unreachable() {
        let start = Position::new(5, 5);
        let map = open_map(start, 2, &[]);
        let result = find_path(&map, start, Position::new(20, 5));
        assert!(matches!(
            result,
            Err(Unreachable::GoalNotWalkable {
                class: TileClass::Unknown,
                ..
            })
        ));
    }

    #[test]
    fn test_pathfind_no_path() {
        let start = Position::new(5, 5);
        let goal = Position::new(7, 7);
        let walls: Vec<Position> = goal.neighbors().iter().map(|(_, p)| *p).collect();
        let map = open_map(start, 3, &walls);
        assert!(matches!(
            find_path(&map, start, goal),
            Err(Unreachable::NoRoute { .. })
        ));
    }

    #[test]
    fn test_tie_break_is_deterministic() {
        let start = Position::new(5, 5);
        let map = open_map(start, 3, &[]);
        let goal = Position::new(7, 7);
        let a = find_path(&map, start, goal).unwrap();
        let b = find_path(&map, start, goal).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_condensed_runs() {
        let path = PlannedPath {
            start: Position::new(0, 0),
            goal: Position::new(3, 2),
            moves: vec![
                Direction::Down,
                Direction::Down,
                Direction::Right,
                Direction::Right,
                Direction::Right,
            ],
        };
        assert_eq!(path.condensed(), "2×down, 3×right");
    }
}
