//! Pathfinder - weighted best-first search over the movement cost model
//!
//! The search runs over a [`PathGrid`] inside a padded bounding box around
//! start and goal. Edge costs come from the same cost model movement uses;
//! impassable tiles are still explored when they can be opened or bashed.
//!
//! Scores are `g + heuristic_weight * rl_dist(tile, goal)`. With the default
//! weight of 2 the estimate overestimates, so results favor fast, greedy
//! searches over strictly shortest routes.

mod grid;

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use ahash::{AHashMap, AHashSet};
use glam::IVec2;
use tessera_tiles::{PartFlags, TileFlags};

pub use grid::{PathGrid, TileSample};

use crate::config::PathfindingConfig;
use crate::world::{TilePos, line_to, line_variants};

/// Why a step onto a tile is allowed
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StepAction {
    /// Plain movement onto a passable tile
    Walk,
    /// Open a door first
    OpenDoor,
    /// Smash the obstacle first
    Bash,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PathStep {
    pub pos: TilePos,
    pub action: StepAction,
}

/// How a search ended
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PathOutcome {
    /// Direct line over uniformly cheap tiles, no search needed
    Straight,
    /// Found by search
    Searched,
    /// Open set exhausted, or start and goal on different layers
    Unreachable,
    /// Best open score passed the abandonment ceiling
    TooExpensive,
    /// Goal farther than the requested radius
    OutOfRange,
    /// Start or goal outside the grid
    OutOfWindow,
    /// Expansion budget spent
    IterationLimit,
    /// Parent chain contained a non-adjacent jump; steps are partial
    ConsistencyFault,
}

/// Result of a path query. `steps` runs from the tile after the start to the
/// goal inclusive; it is empty when no path was found.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Path {
    pub steps: Vec<PathStep>,
    pub outcome: PathOutcome,
}

impl Path {
    fn failed(outcome: PathOutcome) -> Self {
        Self {
            steps: Vec::new(),
            outcome,
        }
    }

    /// Whether the path leads to the goal
    pub fn is_found(&self) -> bool {
        matches!(self.outcome, PathOutcome::Straight | PathOutcome::Searched)
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn tiles(&self) -> impl Iterator<Item = TilePos> + '_ {
        self.steps.iter().map(|step| step.pos)
    }
}

/// Clockwise from north, y pointing down
const DIRECTIONS: [IVec2; 8] = [
    IVec2::new(0, -1),
    IVec2::new(1, -1),
    IVec2::new(1, 0),
    IVec2::new(1, 1),
    IVec2::new(0, 1),
    IVec2::new(-1, 1),
    IVec2::new(-1, 0),
    IVec2::new(-1, -1),
];

/// Rotation order relative to the direction toward the goal
const FAN: [usize; 8] = [0, 1, 7, 2, 6, 3, 5, 4];

/// Neighbors of `cur`, the step along the line to `goal` first, then
/// alternating outward so straight moves win ties over detours
fn neighbor_order(cur: TilePos, goal: TilePos) -> [TilePos; 8] {
    let first = line_to(cur, goal)
        .first()
        .map(|next| next.xy() - cur.xy())
        .and_then(|step| DIRECTIONS.iter().position(|&d| d == step))
        .unwrap_or(0);
    FAN.map(|turn| {
        let d = DIRECTIONS[(first + turn) % 8];
        cur.offset(d.x, d.y)
    })
}

/// Open-set entry, ordered as a min-heap on score with FIFO ties
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Node {
    score: i32,
    seq: u64,
    pos: TilePos,
}

impl Ord for Node {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .score
            .cmp(&self.score)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for Node {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Inclusive search rectangle
#[derive(Clone, Copy, Debug)]
struct SearchBox {
    min: IVec2,
    max: IVec2,
}

impl SearchBox {
    fn contains(&self, pos: TilePos) -> bool {
        let p = pos.xy();
        p.x >= self.min.x && p.y >= self.min.y && p.x <= self.max.x && p.y <= self.max.y
    }
}

/// Cost-aware grid pathfinder
#[derive(Debug, Clone, Default)]
pub struct Pathfinder {
    config: PathfindingConfig,
}

impl Pathfinder {
    pub fn new(config: PathfindingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PathfindingConfig {
        &self.config
    }

    /// Find a route from `start` to `goal`.
    ///
    /// `radius` bounds the search around `start` (-1 = unbounded);
    /// `bash` is the strength available for smashing obstacles (0 disables it).
    pub fn find_path(&self, grid: &impl PathGrid, start: TilePos, goal: TilePos, radius: i32, bash: i32) -> Path {
        if start == goal {
            return Path {
                steps: Vec::new(),
                outcome: PathOutcome::Straight,
            };
        }
        if start.z() != goal.z() {
            return Path::failed(PathOutcome::Unreachable);
        }
        if !grid.contains(start) || !grid.contains(goal) {
            return Path::failed(PathOutcome::OutOfWindow);
        }
        if radius >= 0 && start.rl_dist(goal) > radius {
            return Path::failed(PathOutcome::OutOfRange);
        }

        if let Some(line) = self.straight_line(grid, start, goal, bash) {
            log::trace!("[PATH] {} -> {}: straight line, {} steps", start, goal, line.len());
            return Path {
                steps: line,
                outcome: PathOutcome::Straight,
            };
        }

        let path = self.search(grid, start, goal, radius, bash);
        log::debug!(
            "[PATH] {} -> {}: {:?}, {} steps",
            start,
            goal,
            path.outcome,
            path.steps.len()
        );
        path
    }

    /// The first line to the goal whose tiles between are all plain flat ground
    fn straight_line(&self, grid: &impl PathGrid, start: TilePos, goal: TilePos, bash: i32) -> Option<Vec<PathStep>> {
        let line = line_variants(start, goal).find(|line| {
            line.split_last().is_some_and(|(_, between)| {
                between
                    .iter()
                    .all(|&pos| grid.sample(pos).is_some_and(|s| s.move_cost() == 2))
            })
        })?;
        let (last, between) = line.split_last()?;
        let mut steps: Vec<PathStep> = between
            .iter()
            .map(|&pos| PathStep {
                pos,
                action: StepAction::Walk,
            })
            .collect();
        steps.push(PathStep {
            pos: *last,
            action: goal_action(grid, *last, bash),
        });
        Some(steps)
    }

    fn search_box(&self, grid: &impl PathGrid, start: TilePos, goal: TilePos, radius: i32) -> SearchBox {
        let pad = IVec2::splat(self.config.padding);
        let (lo, hi) = grid.bounds();
        let mut min = start.xy().min(goal.xy()) - pad;
        let mut max = start.xy().max(goal.xy()) + pad;
        min = min.max(lo);
        max = max.min(hi);
        if radius >= 0 {
            min = min.max(start.xy() - IVec2::splat(radius));
            max = max.min(start.xy() + IVec2::splat(radius));
        }
        SearchBox { min, max }
    }

    fn search(&self, grid: &impl PathGrid, start: TilePos, goal: TilePos, radius: i32, bash: i32) -> Path {
        let cfg = &self.config;
        let bounds = self.search_box(grid, start, goal, radius);

        let mut open = BinaryHeap::new();
        let mut closed: AHashSet<TilePos> = AHashSet::new();
        let mut gscore: AHashMap<TilePos, i32> = AHashMap::new();
        let mut parent: AHashMap<TilePos, (TilePos, StepAction)> = AHashMap::new();
        let mut seq = 0u64;
        let mut expansions = 0usize;

        open.push(Node {
            score: 0,
            seq,
            pos: start,
        });
        gscore.insert(start, 0);

        let mut done = false;
        while let Some(node) = open.pop() {
            if node.score > cfg.abandon_cost {
                return Path::failed(PathOutcome::TooExpensive);
            }
            let cur = node.pos;
            if !closed.insert(cur) {
                continue;
            }
            expansions += 1;
            if expansions > cfg.max_expansions {
                log::warn!(
                    "[PATH] {} -> {}: gave up after {} expansions",
                    start,
                    goal,
                    cfg.max_expansions
                );
                return Path::failed(PathOutcome::IterationLimit);
            }

            let cur_g = gscore.get(&cur).copied().unwrap_or(0);
            let here = grid.sample(cur);
            let here_indoors = here.is_some_and(|s| s.is_indoors());
            let here_occupant = here.and_then(|s| s.occupant).map(|(occ_ref, _)| occ_ref.id);

            for next in neighbor_order(cur, goal) {
                if next == goal {
                    parent.insert(goal, (cur, goal_action(grid, goal, bash)));
                    done = true;
                    break;
                }
                if !bounds.contains(next) || closed.contains(&next) {
                    continue;
                }
                let Some(sample) = grid.sample(next) else {
                    closed.insert(next);
                    continue;
                };

                let cost = sample.move_cost();
                let rating = if bash == 0 || cost != 0 {
                    -1
                } else {
                    sample.bash_rating(bash)
                };
                let terrain_door = sample.terrain.is_openable();
                let occupant_door = sample.occupant_door();

                if cost == 0 && rating <= 0 && !terrain_door && occupant_door.is_none() {
                    // Nothing to open or smash; never look at it again
                    closed.insert(next);
                    continue;
                }

                let diagonal = i32::from(next.x() != cur.x() && next.y() != cur.y());
                let mut new_g = cur_g + cost + diagonal;
                let mut action = StepAction::Walk;

                if cost == 0 {
                    if terrain_door
                        && (!sample.terrain.has_flag(TileFlags::OPENCLOSE_INSIDE) || here_indoors)
                    {
                        new_g += cfg.door_cost;
                        action = StepAction::OpenDoor;
                    } else if let Some((occ_ref, part)) = sample.occupant_obstacle() {
                        let inside_only = part.flags.contains(PartFlags::OPENCLOSE_INSIDE);
                        if part.is_closed_door() && (!inside_only || here_occupant == Some(occ_ref.id)) {
                            new_g += cfg.occupant_door_cost;
                            action = StepAction::OpenDoor;
                        } else if bash > 0 {
                            new_g += part.hp / bash + cfg.occupant_bash_penalty;
                            action = StepAction::Bash;
                        } else {
                            new_g = cfg.unopenable_cost;
                            action = StepAction::OpenDoor;
                        }
                    } else if rating > 1 {
                        new_g += cfg.bash_turns / rating + cfg.bash_penalty;
                        action = StepAction::Bash;
                    } else if rating == 1 {
                        new_g += cfg.desperate_bash_cost;
                        action = StepAction::Bash;
                    } else {
                        // A door that only opens from the other side
                        new_g = cfg.unopenable_cost;
                        action = StepAction::OpenDoor;
                    }
                }

                if gscore.get(&next).is_none_or(|&known| new_g < known) {
                    gscore.insert(next, new_g);
                    parent.insert(next, (cur, action));
                    seq += 1;
                    open.push(Node {
                        score: new_g + cfg.heuristic_weight * next.rl_dist(goal),
                        seq,
                        pos: next,
                    });
                }
            }

            if done {
                break;
            }
        }

        if !done {
            return Path::failed(PathOutcome::Unreachable);
        }
        log::trace!("[PATH] {} -> {}: {} expansions", start, goal, expansions);
        reconstruct(&parent, start, goal)
    }
}

/// Justification for stepping onto the goal tile, which is accepted
/// regardless of its cost
fn goal_action(grid: &impl PathGrid, goal: TilePos, bash: i32) -> StepAction {
    let Some(sample) = grid.sample(goal) else {
        return StepAction::Walk;
    };
    if sample.move_cost() > 0 {
        StepAction::Walk
    } else if sample.terrain.is_openable() || sample.occupant_door().is_some() {
        StepAction::OpenDoor
    } else if bash > 0 && sample.bash_rating(bash) > 0 {
        StepAction::Bash
    } else {
        StepAction::Walk
    }
}

fn reconstruct(parent: &AHashMap<TilePos, (TilePos, StepAction)>, start: TilePos, goal: TilePos) -> Path {
    let mut steps = Vec::new();
    let mut cur = goal;
    while cur != start {
        let Some(&(prev, action)) = parent.get(&cur) else {
            log::error!("[PATH] ConsistencyFault: {} has no parent on route {} -> {}", cur, start, goal);
            steps.reverse();
            return Path {
                steps,
                outcome: PathOutcome::ConsistencyFault,
            };
        };
        steps.push(PathStep { pos: cur, action });
        if !prev.is_adjacent(cur) {
            log::error!(
                "[PATH] ConsistencyFault: jump from {} to {} on route {} -> {}",
                prev,
                cur,
                start,
                goal
            );
            steps.reverse();
            return Path {
                steps,
                outcome: PathOutcome::ConsistencyFault,
            };
        }
        cur = prev;
    }
    steps.reverse();
    Path {
        steps,
        outcome: PathOutcome::Searched,
    }
}
