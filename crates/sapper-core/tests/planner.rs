use sapper_core::config::{ArenaRules, StrategyConfig};
use sapper_core::danger::DangerMap;
use sapper_core::models::{
    ArenaSnapshot, Enemy, Position, Readiness, Role, Unit, UnitId,
};
use sapper_core::reserve::ReservationManager;
use sapper_core::strategy::{ActionKind, PlanContext, Planner, RoleBook};
use sapper_core::world::WorldModel;

fn unit(id: &str, pos: Position) -> Unit {
    Unit {
        id: UnitId::new(id),
        pos,
        readiness: Readiness::Ready,
        bombs_available: 1,
        armor: 0,
    }
}

fn snapshot(units: Vec<Unit>, obstacles: Vec<Position>) -> ArenaSnapshot {
    ArenaSnapshot {
        tick: 1,
        version: 1,
        map_size: (15, 15),
        units,
        enemies: Vec::new(),
        mobs: Vec::new(),
        bombs: Vec::new(),
        obstacles,
        walls: Vec::new(),
        raw_score: 0,
        round: "test".to_string(),
    }
}

struct Fixture {
    snapshot: ArenaSnapshot,
    world: WorldModel,
    danger: DangerMap,
    reservations: ReservationManager,
}

impl Fixture {
    fn new(units: Vec<Unit>, obstacles: Vec<Position>) -> Self {
        let snapshot = snapshot(units, obstacles);
        let mut world = WorldModel::new(5, 30);
        world.update(&snapshot);
        let mut danger = DangerMap::new(2);
        danger.compute(&snapshot);
        Self {
            snapshot,
            world,
            danger,
            reservations: ReservationManager::new(),
        }
    }

    fn ctx(&self) -> PlanContext<'_> {
        PlanContext {
            snapshot: &self.snapshot,
            world: &self.world,
            danger: &self.danger,
            reservations: &self.reservations,
        }
    }
}

#[test]
fn role_assignment_is_persistent_and_deterministic() {
    let strategy = StrategyConfig::default();
    let mut roles = RoleBook::new();

    let units: Vec<Unit> = (1..=6)
        .map(|i| unit(&format!("u-{i}"), Position::new(i, 1)))
        .collect();
    let snap = snapshot(units, Vec::new());
    roles.assign(&snap, &strategy);

    // 1 anchor, 4 farmers, 1 scout, filled in id order.
    assert_eq!(roles.role(&UnitId::new("u-1")), Some(Role::Anchor));
    for i in 2..=5 {
        assert_eq!(roles.role(&UnitId::new(&format!("u-{i}"))), Some(Role::Farmer));
    }
    assert_eq!(roles.role(&UnitId::new("u-6")), Some(Role::Scout));

    // Re-assigning over the same living units changes nothing.
    roles.assign(&snap, &strategy);
    assert_eq!(roles.role(&UnitId::new("u-1")), Some(Role::Anchor));
    assert_eq!(roles.role(&UnitId::new("u-6")), Some(Role::Scout));
}

#[test]
fn dead_unit_frees_its_role_for_a_newcomer() {
    let strategy = StrategyConfig::default();
    let mut roles = RoleBook::new();

    let snap = snapshot(
        vec![unit("u-1", Position::new(1, 1)), unit("u-2", Position::new(2, 1))],
        Vec::new(),
    );
    roles.assign(&snap, &strategy);
    assert_eq!(roles.role(&UnitId::new("u-1")), Some(Role::Anchor));

    // u-1 dies; u-3 arrives and inherits the vacant anchor slot.
    let snap = snapshot(
        vec![unit("u-2", Position::new(2, 1)), unit("u-3", Position::new(3, 1))],
        Vec::new(),
    );
    roles.assign(&snap, &strategy);
    assert_eq!(roles.role(&UnitId::new("u-1")), None);
    assert_eq!(roles.role(&UnitId::new("u-2")), Some(Role::Farmer));
    assert_eq!(roles.role(&UnitId::new("u-3")), Some(Role::Anchor));
}

#[test]
fn farmer_prefers_the_denser_placement() {
    // Placement A at (3,3) hits two obstacles; placement B at (9,3) hits
    // one, and only under relaxed pressure would B qualify at all.
    let fixture = Fixture::new(
        vec![unit("u-1", Position::new(5, 3))],
        vec![
            Position::new(3, 2),
            Position::new(3, 4),
            Position::new(10, 3),
        ],
    );
    let mut planner = Planner::new(StrategyConfig::default(), ArenaRules::default());
    let u = fixture.snapshot.units[0].clone();
    let candidates = planner.candidates(&u, Role::Farmer, &fixture.ctx());

    assert!(!candidates.is_empty());
    match candidates[0].kind {
        ActionKind::Farm { at, .. } => assert_eq!(at, Position::new(3, 3)),
        ref other => panic!("expected a farm action, got {other:?}"),
    }
}

#[test]
fn enemy_beside_the_route_lowers_the_farm_score() {
    let units = vec![unit("u-1", Position::new(5, 3))];
    let obstacles = vec![Position::new(3, 2), Position::new(3, 4)];

    let quiet = Fixture::new(units.clone(), obstacles.clone());
    let mut contested = Fixture::new(units, obstacles);
    contested.snapshot.enemies = vec![Enemy {
        id: UnitId::new("e-1"),
        pos: Position::new(4, 4),
        safe_ticks: 0,
    }];
    contested.danger.compute(&contested.snapshot);

    let mut planner = Planner::new(StrategyConfig::default(), ArenaRules::default());
    let u = quiet.snapshot.units[0].clone();

    let best_quiet = planner.candidates(&u, Role::Farmer, &quiet.ctx());
    let best_contested = planner.candidates(&u, Role::Farmer, &contested.ctx());

    // Same placement wins either way; the enemy next to the route makes
    // it strictly less attractive.
    let quiet_top = &best_quiet[0];
    let contested_top = &best_contested[0];
    assert!(matches!(quiet_top.kind, ActionKind::Farm { at, .. } if at == Position::new(3, 3)));
    assert!(matches!(contested_top.kind, ActionKind::Farm { at, .. } if at == Position::new(3, 3)));
    assert!(contested_top.score < quiet_top.score);
}

#[test]
fn farmer_needs_a_valid_escape() {
    // The only qualifying placement sits in a dead-end pocket the blast
    // fills completely, so no candidate survives validation.
    let mut walls = Vec::new();
    // Pocket at (1,1): open corridor (1,1)-(1,2) capped by the obstacle
    // at (1,0), everything else sealed.
    let open = [Position::new(1, 0), Position::new(1, 1), Position::new(1, 2)];
    for x in 0..=2 {
        for y in 0..=3 {
            let pos = Position::new(x, y);
            if !open.contains(&pos) {
                walls.push(pos);
            }
        }
    }
    let fixture = {
        let mut snapshot = snapshot(
            vec![unit("u-1", Position::new(1, 2))],
            vec![Position::new(1, 0)],
        );
        snapshot.walls = walls;
        let mut world = WorldModel::new(5, 30);
        world.update(&snapshot);
        let mut danger = DangerMap::new(2);
        danger.compute(&snapshot);
        Fixture {
            snapshot,
            world,
            danger,
            reservations: ReservationManager::new(),
        }
    };

    let mut planner = Planner::new(
        StrategyConfig {
            relaxed_after_ticks: 0,
            ..StrategyConfig::default()
        },
        ArenaRules::default(),
    );
    let u = fixture.snapshot.units[0].clone();
    let candidates = planner.candidates(&u, Role::Farmer, &fixture.ctx());
    assert!(
        candidates
            .iter()
            .all(|c| !matches!(c.kind, ActionKind::Farm { .. })),
        "a placement with no escape must not be proposed"
    );
}

#[test]
fn scout_heads_for_the_frontier() {
    let fixture = Fixture::new(vec![unit("u-1", Position::new(7, 7))], Vec::new());
    let mut planner = Planner::new(StrategyConfig::default(), ArenaRules::default());
    let u = fixture.snapshot.units[0].clone();
    let candidates = planner.candidates(&u, Role::Scout, &fixture.ctx());

    assert!(!candidates.is_empty());
    let ActionKind::Scout { frontier } = candidates[0].kind else {
        panic!("expected a scout action");
    };
    // The target is a known-passable tile on the edge of the explored area.
    assert!(!fixture.world.is_blocked(frontier));
    assert!(fixture.world.frontier_tiles().contains(&frontier));
}

#[test]
fn unit_on_a_hazardous_tile_evades_first() {
    let mut snap = snapshot(vec![unit("u-1", Position::new(5, 5))], Vec::new());
    snap.bombs = vec![sapper_core::models::Bomb {
        pos: Position::new(5, 3),
        range: 4,
        fuse_ticks: 2,
    }];
    let mut world = WorldModel::new(5, 30);
    world.update(&snap);
    let mut danger = DangerMap::new(2);
    danger.compute(&snap);
    let fixture = Fixture {
        snapshot: snap,
        world,
        danger,
        reservations: ReservationManager::new(),
    };

    let mut planner = Planner::new(StrategyConfig::default(), ArenaRules::default());
    let u = fixture.snapshot.units[0].clone();
    let candidates = planner.candidates(&u, Role::Farmer, &fixture.ctx());

    assert!(!candidates.is_empty());
    let ActionKind::Evade { refuge } = candidates[0].kind else {
        panic!("expected an evade action");
    };
    assert!(fixture.danger.is_safe_at(refuge, 8));
}

#[test]
fn farmer_without_bombs_proposes_no_farm() {
    let mut fixture = Fixture::new(
        vec![unit("u-1", Position::new(5, 3))],
        vec![Position::new(3, 2), Position::new(3, 4)],
    );
    fixture.snapshot.units[0].bombs_available = 0;
    let mut planner = Planner::new(StrategyConfig::default(), ArenaRules::default());
    let u = fixture.snapshot.units[0].clone();
    let candidates = planner.candidates(&u, Role::Farmer, &fixture.ctx());
    assert!(candidates
        .iter()
        .all(|c| !matches!(c.kind, ActionKind::Farm { .. })));
}
