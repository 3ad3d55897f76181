//! A\* search over the tile grid.
//!
//! The search is 8-connected: cardinal steps cost `1.0`, diagonal steps cost
//! `√2`, and the heuristic is straight-line Euclidean distance, which never
//! overestimates under that metric.
//!
//! Only tiles the map reports as walkable are expanded. A tile that was never
//! sighted is as good as a wall, so routes never cut through unexplored
//! terrain. The start tile itself is not checked; the player is standing on
//! it whatever the map says.
//!
//! Ties on f-score are broken by insertion order, so the same map always
//! yields the same path.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, HashSet};
use std::f64::consts::SQRT_2;

use scout_types::TilePos;

/// Walkability oracle consulted by the search.
pub trait WalkabilityMap {
    fn is_walkable(&self, pos: TilePos) -> bool;
}

impl WalkabilityMap for HashSet<TilePos> {
    fn is_walkable(&self, pos: TilePos) -> bool {
        self.contains(&pos)
    }
}

impl<M: WalkabilityMap + ?Sized> WalkabilityMap for &M {
    fn is_walkable(&self, pos: TilePos) -> bool {
        (**self).is_walkable(pos)
    }
}

/// Neighbour offsets in expansion order: cardinals first, then diagonals.
pub const NEIGHBOR_OFFSETS: [(i32, i32); 8] = [
    (0, 1),
    (1, 0),
    (0, -1),
    (-1, 0),
    (1, 1),
    (1, -1),
    (-1, 1),
    (-1, -1),
];

// ---------------------------------------------------------------------------
// Open-set entry
// ---------------------------------------------------------------------------

struct OpenEntry {
    f: f64,
    seq: u64,
    pos: TilePos,
}

impl PartialEq for OpenEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}
impl Eq for OpenEntry {}

impl Ord for OpenEntry {
    // `BinaryHeap` is a max-heap: invert so the lowest f (then the earliest
    // insertion) is popped first.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .f
            .total_cmp(&self.f)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}
impl PartialOrd for OpenEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

// ---------------------------------------------------------------------------
// Search
// ---------------------------------------------------------------------------

/// Borrowing wrapper so callers can hold a configured pathfinder.
pub struct Pathfinder<'a, M: WalkabilityMap + ?Sized> {
    map: &'a M,
}

impl<'a, M: WalkabilityMap + ?Sized> Pathfinder<'a, M> {
    pub fn new(map: &'a M) -> Self {
        Self { map }
    }

    pub fn find_path(&self, start: TilePos, end: TilePos) -> Option<Vec<TilePos>> {
        find_path(self.map, start, end)
    }
}

/// Shortest path from `start` to `end`, both endpoints included.
///
/// Returns `None` when the goal cannot be reached through walkable tiles.
/// Paths never change floors.
pub fn find_path<M: WalkabilityMap + ?Sized>(
    map: &M,
    start: TilePos,
    end: TilePos,
) -> Option<Vec<TilePos>> {
    if start == end {
        return Some(vec![start]);
    }
    if start.z != end.z || !map.is_walkable(end) {
        return None;
    }

    let mut open = BinaryHeap::new();
    let mut g_score: HashMap<TilePos, f64> = HashMap::new();
    let mut came_from: HashMap<TilePos, TilePos> = HashMap::new();
    let mut closed: HashSet<TilePos> = HashSet::new();
    let mut seq = 0u64;

    g_score.insert(start, 0.0);
    open.push(OpenEntry {
        f: start.distance(&end),
        seq,
        pos: start,
    });

    while let Some(OpenEntry { pos, .. }) = open.pop() {
        if pos == end {
            return Some(reconstruct_path(&came_from, end));
        }
        if !closed.insert(pos) {
            continue;
        }

        let current_g = g_score.get(&pos).copied().unwrap_or(f64::INFINITY);
        for &(dx, dy) in &NEIGHBOR_OFFSETS {
            let next = pos.offset(dx, dy);
            if closed.contains(&next) || !map.is_walkable(next) {
                continue;
            }
            let step = if dx != 0 && dy != 0 { SQRT_2 } else { 1.0 };
            let tentative = current_g + step;
            if tentative < g_score.get(&next).copied().unwrap_or(f64::INFINITY) {
                g_score.insert(next, tentative);
                came_from.insert(next, pos);
                seq += 1;
                open.push(OpenEntry {
                    f: tentative + next.distance(&end),
                    seq,
                    pos: next,
                });
            }
        }
    }

    None
}

fn reconstruct_path(came_from: &HashMap<TilePos, TilePos>, end: TilePos) -> Vec<TilePos> {
    let mut path = vec![end];
    let mut current = end;
    while let Some(&prev) = came_from.get(&current) {
        path.push(prev);
        current = prev;
    }
    path.reverse();
    path
}

/// Travel cost of a path under the search metric.
pub fn path_cost(path: &[TilePos]) -> f64 {
    path.windows(2)
        .map(|w| {
            if w[0].x != w[1].x && w[0].y != w[1].y {
                SQRT_2
            } else {
                1.0
            }
        })
        .sum()
}
