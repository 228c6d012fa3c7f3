//! Per-tick hazard prediction: blast lines from live bombs (with chain
//! detonations) and graded contact zones around awake mobs and enemies.

use std::collections::{HashMap, HashSet, VecDeque};

use crate::models::{ArenaSnapshot, Dir, Position};

/// Contact hazard level above which a tile counts as unsafe.
const CONTACT_UNSAFE_LEVEL: f64 = 0.5;

/// Enemies radiate hazard farther than mobs but at half the weight, so
/// their peak of 0.5 never trips the unsafe threshold on its own. They
/// cost score, not routes.
const ENEMY_CONTACT_RADIUS: i32 = 3;
const ENEMY_CONTACT_WEIGHT: f64 = 0.5;

/// What a blast ray encounters at a tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RayTile {
    /// Ray passes through.
    Open,
    /// Ray covers this tile and stops.
    Blocking,
    /// Outside the arena; ray stops before this tile.
    Outside,
}

/// Cross-pattern blast coverage from `origin`. Rays run N, E, S, W up to
/// `range` tiles; a `Blocking` tile is included, then the ray stops.
pub fn blast_cross(
    origin: Position,
    range: i32,
    classify: impl Fn(Position) -> RayTile,
) -> Vec<Position> {
    let mut tiles = vec![origin];
    for dir in Dir::ALL {
        let mut pos = origin;
        for _ in 0..range {
            pos = pos.step(dir);
            match classify(pos) {
                RayTile::Outside => break,
                RayTile::Blocking => {
                    tiles.push(pos);
                    break;
                }
                RayTile::Open => tiles.push(pos),
            }
        }
    }
    tiles
}

/// Combined hazard at a tile, for scoring.
#[derive(Debug, Clone, Copy)]
pub struct Hazard {
    pub level: f64,
    pub ticks_until: u32,
}

/// Fresh per-tick hazard map. Never persisted across ticks.
#[derive(Debug, Default)]
pub struct DangerMap {
    mob_danger_radius: i32,
    /// Blast-covered tiles, mapped to the earliest (chain-adjusted) fuse.
    blast: HashMap<Position, u32>,
    /// Mob and enemy contact zones, mapped to hazard level.
    contact: HashMap<Position, f64>,
}

impl DangerMap {
    pub fn new(mob_danger_radius: i32) -> Self {
        Self {
            mob_danger_radius,
            blast: HashMap::new(),
            contact: HashMap::new(),
        }
    }

    /// Recompute the full map from the current snapshot.
    pub fn compute(&mut self, snapshot: &ArenaSnapshot) {
        self.blast.clear();
        self.contact.clear();

        let walls: HashSet<Position> = snapshot.walls.iter().copied().collect();
        let obstacles: HashSet<Position> = snapshot.obstacles.iter().copied().collect();
        let bomb_tiles: HashSet<Position> = snapshot.bombs.iter().map(|b| b.pos).collect();

        let classify = |pos: Position| {
            if !snapshot.in_bounds(pos) {
                RayTile::Outside
            } else if walls.contains(&pos) || obstacles.contains(&pos) || bomb_tiles.contains(&pos)
            {
                RayTile::Blocking
            } else {
                RayTile::Open
            }
        };

        // Static coverage per bomb.
        let coverage: Vec<(Position, u32, Vec<Position>)> = snapshot
            .bombs
            .iter()
            .map(|b| (b.pos, b.fuse_ticks, blast_cross(b.pos, b.range, classify)))
            .collect();

        // Chain detonation: a bomb caught in another blast inherits the
        // earlier fuse. Iterate to a fixpoint; each pass can only lower
        // fuses, so this terminates within `bombs.len()` passes.
        let mut fuse: HashMap<Position, u32> = coverage
            .iter()
            .map(|(pos, fuse_ticks, _)| (*pos, *fuse_ticks))
            .collect();
        loop {
            let mut changed = false;
            for (pos, _, tiles) in coverage.iter() {
                let f = fuse[pos];
                for tile in tiles.iter() {
                    if tile == pos {
                        continue;
                    }
                    if let Some(other) = fuse.get_mut(tile) {
                        if *other > f {
                            *other = f;
                            changed = true;
                        }
                    }
                }
            }
            if !changed {
                break;
            }
        }

        for (pos, _, tiles) in coverage.iter() {
            let f = fuse[pos];
            for &tile in tiles.iter() {
                let entry = self.blast.entry(tile).or_insert(u32::MAX);
                *entry = (*entry).min(f);
            }
        }

        // Contact zones: awake mobs at full weight, active enemies at
        // half. Spawn-protected enemies are not a threat yet.
        let r = self.mob_danger_radius;
        for mob in snapshot.mobs.iter().filter(|m| m.is_awake()) {
            self.spread_contact(snapshot, mob.pos, r, 1.0);
        }
        for enemy in snapshot.enemies.iter().filter(|e| e.safe_ticks == 0) {
            self.spread_contact(
                snapshot,
                enemy.pos,
                ENEMY_CONTACT_RADIUS,
                ENEMY_CONTACT_WEIGHT,
            );
        }
    }

    /// Manhattan diamond of `weight / (d + 1)` levels, keeping the max per
    /// tile.
    fn spread_contact(
        &mut self,
        snapshot: &ArenaSnapshot,
        center: Position,
        radius: i32,
        weight: f64,
    ) {
        for dy in -radius..=radius {
            for dx in -radius..=radius {
                let d = dx.abs() + dy.abs();
                if d > radius {
                    continue;
                }
                let pos = Position::new(center.x + dx, center.y + dy);
                if !snapshot.in_bounds(pos) {
                    continue;
                }
                let level = weight / (d as f64 + 1.0);
                let entry = self.contact.entry(pos).or_insert(0.0);
                if level > *entry {
                    *entry = level;
                }
            }
        }
    }

    /// Graded mob and enemy proximity at a tile, 0.0 when clear. Feeds
    /// risk scoring; only levels above the unsafe threshold affect
    /// routing.
    pub fn contact_level(&self, pos: Position) -> f64 {
        self.contact.get(&pos).copied().unwrap_or(0.0)
    }

    /// True when the tile is hazard-free for occupancy up to `after_ticks`
    /// from now: no blast detonating within the horizon, no strong
    /// contact presence.
    pub fn is_safe_at(&self, pos: Position, after_ticks: u32) -> bool {
        if let Some(&fuse) = self.blast.get(&pos) {
            if fuse <= after_ticks {
                return false;
            }
        }
        if let Some(&level) = self.contact.get(&pos) {
            if level > CONTACT_UNSAFE_LEVEL {
                return false;
            }
        }
        true
    }

    pub fn hazard(&self, pos: Position) -> Option<Hazard> {
        let blast = self.blast.get(&pos).copied();
        let contact = self.contact.get(&pos).copied();
        match (blast, contact) {
            (None, None) => None,
            (fuse, level) => Some(Hazard {
                level: level.unwrap_or(1.0).max(if fuse.is_some() { 1.0 } else { 0.0 }),
                ticks_until: fuse.unwrap_or(0),
            }),
        }
    }

    /// Nearest tile outside `blast`, safe against every already-known
    /// hazard, reachable from `from` within `max_steps` over `passable`
    /// tiles. BFS in fixed N, E, S, W order for determinism.
    ///
    /// `blast` is the prospective blast of a bomb not yet placed; it is
    /// deliberately checked separately from this map so that on an arena
    /// with no live bombs an escape always exists.
    pub fn escape_tile(
        &self,
        from: Position,
        blast: &HashSet<Position>,
        max_steps: u32,
        passable: impl Fn(Position) -> bool,
    ) -> Option<Position> {
        let mut queue = VecDeque::new();
        let mut visited = HashSet::new();
        queue.push_back((from, 0u32));
        visited.insert(from);

        while let Some((pos, steps)) = queue.pop_front() {
            if !blast.contains(&pos) && self.is_safe_at(pos, max_steps) {
                return Some(pos);
            }
            if steps >= max_steps {
                continue;
            }
            for next in pos.neighbors4() {
                if visited.contains(&next) || !passable(next) {
                    continue;
                }
                visited.insert(next);
                queue.push_back((next, steps + 1));
            }
        }
        None
    }
}
