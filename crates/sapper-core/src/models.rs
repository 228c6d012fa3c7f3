//! Core data model: positions, tiles, units, and the per-tick arena snapshot.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Integer position on the arena grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn manhattan(self, other: Position) -> i32 {
        (self.x - other.x).abs() + (self.y - other.y).abs()
    }

    pub fn step(self, dir: Dir) -> Position {
        let (dx, dy) = dir.delta();
        Position::new(self.x + dx, self.y + dy)
    }

    /// Orthogonal neighbors in fixed N, E, S, W order.
    pub fn neighbors4(self) -> [Position; 4] {
        [
            self.step(Dir::North),
            self.step(Dir::East),
            self.step(Dir::South),
            self.step(Dir::West),
        ]
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{})", self.x, self.y)
    }
}

/// Grid direction. The declaration order (N, E, S, W) is the canonical
/// expansion order everywhere determinism matters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Dir {
    North,
    East,
    South,
    West,
}

impl Dir {
    pub const ALL: [Dir; 4] = [Dir::North, Dir::East, Dir::South, Dir::West];

    pub fn delta(self) -> (i32, i32) {
        match self {
            Dir::North => (0, -1),
            Dir::East => (1, 0),
            Dir::South => (0, 1),
            Dir::West => (-1, 0),
        }
    }
}

/// What the world model knows about a tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileState {
    Unknown,
    Empty,
    Wall,
    Obstacle,
    Device,
}

/// Stable identifier for a controlled unit (wire id from the arena server).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UnitId(String);

impl UnitId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Truncated id for log lines. Falls back to the full id when byte 8
    /// is not a char boundary.
    pub fn short(&self) -> &str {
        self.0.get(..8).unwrap_or(&self.0)
    }
}

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    Ready,
    Moving,
    Dead,
}

/// Behavioral profile of a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Anchor,
    Farmer,
    Scout,
}

impl Role {
    /// Planning priority. Lower plans first.
    pub fn rank(self) -> u8 {
        match self {
            Role::Anchor => 0,
            Role::Farmer => 1,
            Role::Scout => 2,
        }
    }
}

/// One of our units, as seen in the current snapshot.
#[derive(Debug, Clone)]
pub struct Unit {
    pub id: UnitId,
    pub pos: Position,
    pub readiness: Readiness,
    pub bombs_available: u32,
    pub armor: u32,
}

impl Unit {
    pub fn is_ready(&self) -> bool {
        self.readiness == Readiness::Ready
    }
}

/// Hostile unit in vision.
#[derive(Debug, Clone)]
pub struct Enemy {
    pub id: UnitId,
    pub pos: Position,
    pub safe_ticks: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MobKind {
    Ghost,
    Patrol,
    Other,
}

impl MobKind {
    fn from_wire(kind: &str) -> Self {
        match kind {
            "ghost" => MobKind::Ghost,
            "patrol" => MobKind::Patrol,
            _ => MobKind::Other,
        }
    }
}

/// Mobile hazard. Asleep while `sleep_ticks > 0`; contact kills once awake.
#[derive(Debug, Clone)]
pub struct Mob {
    pub id: String,
    pub pos: Position,
    pub kind: MobKind,
    pub sleep_ticks: u32,
}

impl Mob {
    pub fn is_awake(&self) -> bool {
        self.sleep_ticks == 0
    }
}

/// Live bomb on the arena.
#[derive(Debug, Clone)]
pub struct Bomb {
    pub pos: Position,
    pub range: i32,
    /// Ticks until detonation, before chain adjustment.
    pub fuse_ticks: u32,
}

/// Immutable view of the arena, captured exactly once per tick.
#[derive(Debug, Clone)]
pub struct ArenaSnapshot {
    pub tick: u64,
    /// Monotonically increasing fetch counter, independent of tick skips.
    pub version: u64,
    pub map_size: (i32, i32),
    pub units: Vec<Unit>,
    pub enemies: Vec<Enemy>,
    pub mobs: Vec<Mob>,
    pub bombs: Vec<Bomb>,
    pub obstacles: Vec<Position>,
    pub walls: Vec<Position>,
    pub raw_score: i64,
    pub round: String,
}

impl ArenaSnapshot {
    pub fn in_bounds(&self, pos: Position) -> bool {
        pos.x >= 0 && pos.y >= 0 && pos.x < self.map_size.0 && pos.y < self.map_size.1
    }

    pub fn unit(&self, id: &UnitId) -> Option<&Unit> {
        self.units.iter().find(|u| &u.id == id)
    }
}

/// Outbound command for a single unit.
#[derive(Debug, Clone)]
pub struct MoveCommand {
    pub unit: UnitId,
    /// Ordered steps, excluding the current tile. At most 30.
    pub path: Vec<Position>,
    /// Bomb placement tile, if any. Must be the final path tile, or the
    /// current tile when the path is empty.
    pub bomb_at: Option<Position>,
}

/// Acknowledgement for an accepted move command.
#[derive(Debug, Clone, Default)]
pub struct MoveAck;

/// One purchasable upgrade from the booster shop.
#[derive(Debug, Clone, Deserialize)]
pub struct BoosterOffer {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub cost: u32,
}

/// Response of the booster shop endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BoosterCatalog {
    #[serde(default)]
    pub available: Vec<BoosterOffer>,
    #[serde(default)]
    pub points: u32,
}

/// Round schedule entry. Informational only.
#[derive(Debug, Clone, Deserialize)]
pub struct RoundInfo {
    pub name: String,
    #[serde(default)]
    pub status: String,
    #[serde(default, rename = "startAt")]
    pub start_at: String,
    #[serde(default, rename = "endAt")]
    pub end_at: String,
}

/// Wire shapes of the arena HTTP surface. Positions travel as `[x, y]`.
pub mod wire {
    use serde::{Deserialize, Serialize};

    use super::{
        ArenaSnapshot, Bomb, Enemy, Mob, MobKind, MoveCommand, Position, Readiness, Unit, UnitId,
    };

    #[derive(Debug, Deserialize)]
    pub struct ArenaResponse {
        #[serde(default)]
        pub bombers: Vec<WireBomber>,
        #[serde(default)]
        pub enemies: Vec<WireEnemy>,
        #[serde(default)]
        pub mobs: Vec<WireMob>,
        #[serde(default)]
        pub arena: WireArena,
        pub map_size: [i32; 2],
        #[serde(default)]
        pub round: String,
        #[serde(default)]
        pub raw_score: i64,
    }

    #[derive(Debug, Deserialize)]
    pub struct WireBomber {
        pub id: String,
        pub pos: [i32; 2],
        #[serde(default = "default_true")]
        pub alive: bool,
        #[serde(default = "default_true")]
        pub can_move: bool,
        #[serde(default = "default_one")]
        pub bombs_available: u32,
        #[serde(default)]
        pub armor: u32,
    }

    #[derive(Debug, Deserialize)]
    pub struct WireEnemy {
        pub id: String,
        pub pos: [i32; 2],
        #[serde(default)]
        pub safe_time: u32,
    }

    #[derive(Debug, Deserialize)]
    pub struct WireMob {
        pub id: String,
        pub pos: [i32; 2],
        #[serde(default, rename = "type")]
        pub kind: String,
        #[serde(default)]
        pub safe_time: u32,
    }

    #[derive(Debug, Default, Deserialize)]
    pub struct WireArena {
        #[serde(default)]
        pub walls: Vec<[i32; 2]>,
        #[serde(default)]
        pub obstacles: Vec<[i32; 2]>,
        #[serde(default)]
        pub bombs: Vec<WireBomb>,
    }

    #[derive(Debug, Deserialize)]
    pub struct WireBomb {
        pub pos: [i32; 2],
        #[serde(default = "default_one_i32")]
        pub range: i32,
        /// Seconds until detonation.
        #[serde(default)]
        pub timer: f64,
    }

    #[derive(Debug, Serialize)]
    pub struct MoveRequest {
        pub bombers: Vec<MoveEntry>,
    }

    #[derive(Debug, Serialize)]
    pub struct MoveEntry {
        pub id: String,
        pub path: Vec<[i32; 2]>,
        pub bombs: Vec<[i32; 2]>,
    }

    #[derive(Debug, Serialize)]
    pub struct BoosterRequest {
        pub booster: usize,
    }

    fn default_true() -> bool {
        true
    }

    fn default_one() -> u32 {
        1
    }

    fn default_one_i32() -> i32 {
        1
    }

    fn pos(p: [i32; 2]) -> Position {
        Position::new(p[0], p[1])
    }

    /// Milliseconds-to-ticks conversion, rounding up so a fuse never looks
    /// shorter than it is.
    fn ms_to_ticks(ms: f64, tick_interval_ms: u64) -> u32 {
        if ms <= 0.0 {
            return 0;
        }
        (ms / tick_interval_ms as f64).ceil() as u32
    }

    impl ArenaResponse {
        /// Lift the wire response into the planning model.
        pub fn into_snapshot(self, tick: u64, version: u64, tick_interval_ms: u64) -> ArenaSnapshot {
            let units = self
                .bombers
                .into_iter()
                .map(|b| Unit {
                    id: UnitId::new(b.id),
                    pos: pos(b.pos),
                    readiness: if !b.alive {
                        Readiness::Dead
                    } else if !b.can_move {
                        Readiness::Moving
                    } else {
                        Readiness::Ready
                    },
                    bombs_available: b.bombs_available,
                    armor: b.armor,
                })
                .collect();

            let enemies = self
                .enemies
                .into_iter()
                .map(|e| Enemy {
                    id: UnitId::new(e.id),
                    pos: pos(e.pos),
                    safe_ticks: ms_to_ticks(e.safe_time as f64, tick_interval_ms),
                })
                .collect();

            let mobs = self
                .mobs
                .into_iter()
                .map(|m| Mob {
                    id: m.id,
                    pos: pos(m.pos),
                    kind: MobKind::from_wire(&m.kind),
                    sleep_ticks: ms_to_ticks(m.safe_time as f64, tick_interval_ms),
                })
                .collect();

            let bombs = self
                .arena
                .bombs
                .iter()
                .map(|b| Bomb {
                    pos: pos(b.pos),
                    range: b.range.max(1),
                    fuse_ticks: ms_to_ticks(b.timer * 1000.0, tick_interval_ms),
                })
                .collect();

            ArenaSnapshot {
                tick,
                version,
                map_size: (self.map_size[0], self.map_size[1]),
                units,
                enemies,
                mobs,
                bombs,
                obstacles: self.arena.obstacles.iter().copied().map(pos).collect(),
                walls: self.arena.walls.iter().copied().map(pos).collect(),
                raw_score: self.raw_score,
                round: self.round,
            }
        }
    }

    impl MoveEntry {
        pub fn from_command(cmd: &MoveCommand) -> Self {
            Self {
                id: cmd.unit.as_str().to_string(),
                path: cmd.path.iter().map(|p| [p.x, p.y]).collect(),
                bombs: cmd.bomb_at.iter().map(|p| [p.x, p.y]).collect(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_id_respects_char_boundaries() {
        assert_eq!(UnitId::new("0123456789abcdef").short(), "01234567");
        assert_eq!(UnitId::new("u-1").short(), "u-1");
        // Byte 8 lands inside a two-byte char; the full id comes back.
        assert_eq!(UnitId::new("abcdefgюx").short(), "abcdefgюx");
    }

    #[test]
    fn arena_response_parses_into_snapshot() {
        let raw = serde_json::json!({
            "bombers": [
                {"id": "u-1", "pos": [3, 4], "alive": true, "can_move": true},
                {"id": "u-2", "pos": [5, 5], "alive": false}
            ],
            "enemies": [],
            "mobs": [{"id": "m-1", "pos": [8, 8], "type": "ghost", "safe_time": 0}],
            "arena": {
                "walls": [[0, 0]],
                "obstacles": [[2, 4]],
                "bombs": [{"pos": [6, 6], "range": 2, "timer": 4.0}]
            },
            "map_size": [20, 20],
            "round": "test-1",
            "raw_score": 42
        });
        let resp: wire::ArenaResponse = serde_json::from_value(raw).unwrap();
        let snap = resp.into_snapshot(7, 1, 50);

        assert_eq!(snap.tick, 7);
        assert_eq!(snap.map_size, (20, 20));
        assert_eq!(snap.units.len(), 2);
        assert_eq!(snap.units[0].readiness, Readiness::Ready);
        assert_eq!(snap.units[1].readiness, Readiness::Dead);
        assert_eq!(snap.mobs[0].kind, MobKind::Ghost);
        assert!(snap.mobs[0].is_awake());
        assert_eq!(snap.bombs[0].fuse_ticks, 80);
        assert_eq!(snap.raw_score, 42);
    }

    #[test]
    fn move_entry_serializes_positions_as_pairs() {
        let cmd = MoveCommand {
            unit: UnitId::new("u-1"),
            path: vec![Position::new(1, 2), Position::new(1, 3)],
            bomb_at: Some(Position::new(1, 3)),
        };
        let entry = wire::MoveEntry::from_command(&cmd);
        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value["path"], serde_json::json!([[1, 2], [1, 3]]));
        assert_eq!(value["bombs"], serde_json::json!([[1, 3]]));
    }
}
