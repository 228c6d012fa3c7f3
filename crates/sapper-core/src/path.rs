//! Bounded breadth-first pathfinding.

use std::collections::{HashMap, HashSet, VecDeque};

use crate::models::Position;

/// Shortest path from `start` to `goal`, as the ordered steps excluding
/// `start`, or `None` if no path of at most `max_len` steps exists.
///
/// Neighbors expand in fixed N, E, S, W order with visited-at-enqueue, so
/// among all minimal-length paths the one returned is the lexicographically
/// smallest move sequence in that direction order. Ties never depend on
/// map iteration order.
///
/// `blocked` decides passability; callers inject world blockage,
/// reservations, and danger checks there. `start` itself is never tested.
pub fn shortest_path(
    start: Position,
    goal: Position,
    max_len: usize,
    blocked: impl Fn(Position) -> bool,
) -> Option<Vec<Position>> {
    if start == goal {
        return Some(Vec::new());
    }

    let mut queue: VecDeque<(Position, usize)> = VecDeque::new();
    let mut visited: HashSet<Position> = HashSet::new();
    let mut parent: HashMap<Position, Position> = HashMap::new();

    queue.push_back((start, 0));
    visited.insert(start);

    while let Some((pos, depth)) = queue.pop_front() {
        if depth >= max_len {
            continue;
        }
        for next in pos.neighbors4() {
            if visited.contains(&next) || blocked(next) {
                continue;
            }
            visited.insert(next);
            parent.insert(next, pos);
            if next == goal {
                return Some(reconstruct(&parent, start, goal));
            }
            queue.push_back((next, depth + 1));
        }
    }
    None
}

fn reconstruct(parent: &HashMap<Position, Position>, start: Position, goal: Position) -> Vec<Position> {
    let mut steps = vec![goal];
    let mut cursor = goal;
    while let Some(&prev) = parent.get(&cursor) {
        if prev == start {
            break;
        }
        steps.push(prev);
        cursor = prev;
    }
    steps.reverse();
    steps
}
