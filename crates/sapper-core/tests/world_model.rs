use sapper_core::models::{ArenaSnapshot, Position, Readiness, TileState, Unit, UnitId};
use sapper_core::world::WorldModel;

fn snapshot(tick: u64, unit_at: Position, size: i32) -> ArenaSnapshot {
    ArenaSnapshot {
        tick,
        version: tick,
        map_size: (size, size),
        units: vec![Unit {
            id: UnitId::new("u-1"),
            pos: unit_at,
            readiness: Readiness::Ready,
            bombs_available: 1,
            armor: 0,
        }],
        enemies: Vec::new(),
        mobs: Vec::new(),
        bombs: Vec::new(),
        obstacles: Vec::new(),
        walls: Vec::new(),
        raw_score: 0,
        round: "test".to_string(),
    }
}

#[test]
fn tiles_persist_after_leaving_vision() {
    let mut world = WorldModel::new(2, 30);

    let mut snap = snapshot(1, Position::new(2, 2), 30);
    snap.obstacles = vec![Position::new(3, 2)];
    world.update(&snap);
    assert_eq!(world.tile(Position::new(3, 2)), TileState::Obstacle);
    assert_eq!(world.tile(Position::new(2, 3)), TileState::Empty);

    // Unit walks far away; the old neighborhood stays known.
    let snap = snapshot(2, Position::new(20, 20), 30);
    world.update(&snap);
    assert_eq!(world.tile(Position::new(2, 3)), TileState::Empty);
    assert_eq!(world.tile(Position::new(3, 2)), TileState::Obstacle);
}

#[test]
fn unknown_tiles_block_movement() {
    let world = WorldModel::new(2, 30);
    assert_eq!(world.tile(Position::new(7, 7)), TileState::Unknown);
    assert!(world.is_blocked(Position::new(7, 7)));
}

#[test]
fn destroyed_obstacle_enters_the_farm_cooldown() {
    let mut world = WorldModel::new(2, 5);

    let mut snap = snapshot(1, Position::new(2, 2), 30);
    snap.obstacles = vec![Position::new(3, 2)];
    world.update(&snap);

    // Next tick the obstacle is gone while still in vision.
    let snap = snapshot(2, Position::new(2, 2), 30);
    world.update(&snap);
    assert_eq!(world.tile(Position::new(3, 2)), TileState::Empty);
    assert!(world.recently_destroyed(Position::new(3, 2)));

    // Cooldown expires after the configured window.
    let snap = snapshot(8, Position::new(2, 2), 30);
    world.update(&snap);
    assert!(!world.recently_destroyed(Position::new(3, 2)));
}

#[test]
fn walls_are_never_downgraded() {
    let mut world = WorldModel::new(2, 30);

    let mut snap = snapshot(1, Position::new(2, 2), 30);
    snap.walls = vec![Position::new(3, 2)];
    world.update(&snap);

    // A later snapshot omits the wall; memory keeps it.
    let snap = snapshot(2, Position::new(2, 2), 30);
    world.update(&snap);
    assert_eq!(world.tile(Position::new(3, 2)), TileState::Wall);
}

#[test]
fn frontier_is_observed_passable_and_touches_unknown() {
    let mut world = WorldModel::new(2, 30);
    world.update(&snapshot(1, Position::new(2, 2), 30));

    let frontier = world.frontier_tiles();
    assert!(!frontier.is_empty());
    for &pos in frontier.iter() {
        assert_eq!(world.tile(pos), TileState::Empty);
        assert!(pos
            .neighbors4()
            .into_iter()
            .any(|n| world.in_bounds(n) && world.tile(n) == TileState::Unknown));
    }
    // An interior tile fully surrounded by known tiles is not a frontier.
    assert!(!frontier.contains(&Position::new(2, 2)));
}
