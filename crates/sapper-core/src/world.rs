//! Persistent world model with fog of war.
//!
//! Tile memory is append-only per tile: an observation overwrites a tile's
//! stored state, anything out of vision is retained as last seen. Tiles
//! never observed are treated as blocked.

use std::collections::{HashMap, HashSet};

use crate::models::{ArenaSnapshot, Position, TileState};

#[derive(Debug, Clone, Copy)]
pub struct TileInfo {
    pub state: TileState,
    pub last_seen: u64,
    /// In vision during the current tick.
    pub observed: bool,
}

#[derive(Debug)]
pub struct WorldModel {
    tiles: HashMap<Position, TileInfo>,
    map_size: (i32, i32),
    tick: u64,
    vision_radius: i32,
    farm_cooldown_ticks: u64,
    /// Obstacle tiles seen destroyed, with the tick it happened.
    destroyed: HashMap<Position, u64>,
}

impl WorldModel {
    pub fn new(vision_radius: i32, farm_cooldown_ticks: u64) -> Self {
        Self {
            tiles: HashMap::new(),
            map_size: (0, 0),
            tick: 0,
            vision_radius,
            farm_cooldown_ticks,
            destroyed: HashMap::new(),
        }
    }

    pub fn map_size(&self) -> (i32, i32) {
        self.map_size
    }

    pub fn in_bounds(&self, pos: Position) -> bool {
        pos.x >= 0 && pos.y >= 0 && pos.x < self.map_size.0 && pos.y < self.map_size.1
    }

    /// Merge the current snapshot into persistent memory.
    pub fn update(&mut self, snapshot: &ArenaSnapshot) {
        self.tick = snapshot.tick;
        self.map_size = snapshot.map_size;

        for info in self.tiles.values_mut() {
            info.observed = false;
        }

        let walls: HashSet<Position> = snapshot.walls.iter().copied().collect();
        let obstacles: HashSet<Position> = snapshot.obstacles.iter().copied().collect();
        let bombs: HashSet<Position> = snapshot.bombs.iter().map(|b| b.pos).collect();

        // Vision circle around each living unit.
        for unit in snapshot.units.iter() {
            if unit.readiness == crate::models::Readiness::Dead {
                continue;
            }
            self.sweep_vision(unit.pos, &walls, &obstacles, &bombs);
        }

        // Walls and obstacles are also reported globally; merge them even
        // when outside any vision circle.
        for &wall in snapshot.walls.iter() {
            self.observe(wall, TileState::Wall);
        }
        for &obstacle in snapshot.obstacles.iter() {
            self.observe(obstacle, TileState::Obstacle);
        }
    }

    fn sweep_vision(
        &mut self,
        center: Position,
        walls: &HashSet<Position>,
        obstacles: &HashSet<Position>,
        bombs: &HashSet<Position>,
    ) {
        let r = self.vision_radius;
        let r_sq = r * r;
        for dy in -r..=r {
            for dx in -r..=r {
                if dx * dx + dy * dy > r_sq {
                    continue;
                }
                let pos = Position::new(center.x + dx, center.y + dy);
                if !self.in_bounds(pos) {
                    continue;
                }
                let state = if walls.contains(&pos) {
                    TileState::Wall
                } else if obstacles.contains(&pos) {
                    TileState::Obstacle
                } else if bombs.contains(&pos) {
                    TileState::Device
                } else {
                    TileState::Empty
                };
                self.observe(pos, state);
            }
        }
    }

    fn observe(&mut self, pos: Position, state: TileState) {
        let tick = self.tick;
        match self.tiles.get_mut(&pos) {
            Some(info) => {
                // Walls are indestructible; never downgrade one.
                if info.state == TileState::Wall && state != TileState::Wall {
                    info.last_seen = tick;
                    info.observed = true;
                    return;
                }
                // Obstacle observed gone is a destruction event.
                if info.state == TileState::Obstacle
                    && matches!(state, TileState::Empty | TileState::Device)
                {
                    self.destroyed.insert(pos, tick);
                }
                info.state = state;
                info.last_seen = tick;
                info.observed = true;
            }
            None => {
                self.tiles.insert(
                    pos,
                    TileInfo {
                        state,
                        last_seen: tick,
                        observed: true,
                    },
                );
            }
        }
    }

    pub fn tile(&self, pos: Position) -> TileState {
        self.tiles
            .get(&pos)
            .map(|info| info.state)
            .unwrap_or(TileState::Unknown)
    }

    /// Blocked for movement: Wall, Obstacle, Device, or never observed.
    pub fn is_blocked(&self, pos: Position) -> bool {
        !matches!(self.tile(pos), TileState::Empty)
    }

    pub fn is_wall(&self, pos: Position) -> bool {
        self.tile(pos) == TileState::Wall
    }

    pub fn is_obstacle(&self, pos: Position) -> bool {
        self.tile(pos) == TileState::Obstacle
    }

    /// Destroyed within the farm cooldown window.
    pub fn recently_destroyed(&self, pos: Position) -> bool {
        match self.destroyed.get(&pos) {
            Some(&at) => self.tick.saturating_sub(at) < self.farm_cooldown_ticks,
            None => false,
        }
    }

    /// Observed, passable tiles adjacent to at least one Unknown tile,
    /// in deterministic order.
    pub fn frontier_tiles(&self) -> Vec<Position> {
        let mut frontier: Vec<Position> = self
            .tiles
            .iter()
            .filter(|(_, info)| info.state == TileState::Empty)
            .filter(|(pos, _)| {
                pos.neighbors4()
                    .into_iter()
                    .any(|n| self.in_bounds(n) && self.tile(n) == TileState::Unknown)
            })
            .map(|(pos, _)| *pos)
            .collect();
        frontier.sort();
        frontier
    }
}
