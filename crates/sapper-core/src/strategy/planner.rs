//! Per-unit candidate generation and scoring.
//!
//! Each tick the planner proposes a ranked list of candidate actions for
//! every ready unit. Scoring is `value - alpha*len - beta*risk -
//! gamma*interference`, with a `delta` information bonus for scouts.
//! Candidate order is fully deterministic for a given snapshot.

use std::collections::{HashMap, HashSet};

use crate::config::{ArenaRules, StrategyConfig};
use crate::danger::{blast_cross, DangerMap, RayTile};
use crate::models::{ArenaSnapshot, Position, Role, Unit, UnitId};
use crate::path::shortest_path;
use crate::reserve::{ReservationKind, ReservationManager};
use crate::world::WorldModel;

/// What a candidate intends to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionKind {
    /// Place a bomb at `at` and retreat to `escape` afterwards.
    Farm { at: Position, escape: Position },
    /// Walk to a frontier tile to push back the fog.
    Scout { frontier: Position },
    /// Leave a hazardous tile for `refuge`.
    Evade { refuge: Position },
    /// Stay put.
    Hold,
}

/// One scored action proposal for a unit.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub unit: UnitId,
    pub kind: ActionKind,
    /// Steps toward the action's target, excluding the current tile.
    pub path: Vec<Position>,
    pub score: f64,
}

impl Candidate {
    pub fn first_step(&self) -> Option<Position> {
        self.path.first().copied()
    }

    /// Bomb placement tile, when this candidate places one.
    pub fn place_bomb(&self) -> Option<Position> {
        match self.kind {
            ActionKind::Farm { at, .. } => Some(at),
            _ => None,
        }
    }
}

/// Farmer placement-quality requirement, relaxing the longer a unit goes
/// without finding a valid placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pressure {
    Normal,
    Relaxed,
    Desperate,
}

impl Pressure {
    /// Minimum obstacles a farmer placement must hit to qualify. Desperate
    /// accepts anything rather than deadlock in place.
    pub fn min_obstacles(self) -> u32 {
        match self {
            Pressure::Normal => 2,
            Pressure::Relaxed => 1,
            Pressure::Desperate => 0,
        }
    }
}

#[derive(Debug, Default)]
struct PressureState {
    ticks_blocked: u32,
}

/// Persistent role assignment. Living units keep their role across ticks;
/// newly seen units fill whichever role is furthest below its target
/// count, in Anchor, Farmer, Scout order.
#[derive(Debug, Default)]
pub struct RoleBook {
    roles: HashMap<UnitId, Role>,
}

impl RoleBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn role(&self, unit: &UnitId) -> Option<Role> {
        self.roles.get(unit).copied()
    }

    /// Reconcile assignments with the units alive in this snapshot.
    pub fn assign(&mut self, snapshot: &ArenaSnapshot, strategy: &StrategyConfig) {
        let alive: HashSet<&UnitId> = snapshot
            .units
            .iter()
            .filter(|u| u.readiness != crate::models::Readiness::Dead)
            .map(|u| &u.id)
            .collect();
        self.roles.retain(|id, _| alive.contains(id));

        let mut counts: HashMap<Role, usize> = HashMap::new();
        for role in self.roles.values() {
            *counts.entry(*role).or_default() += 1;
        }

        let targets = [
            (Role::Anchor, strategy.anchor_count),
            (Role::Farmer, strategy.farmer_count),
            (Role::Scout, strategy.scout_count),
        ];

        // Deterministic fill order.
        let mut unassigned: Vec<&UnitId> = alive
            .into_iter()
            .filter(|id| !self.roles.contains_key(*id))
            .collect();
        unassigned.sort();

        for id in unassigned {
            let role = targets
                .iter()
                .find(|(role, target)| counts.get(role).copied().unwrap_or(0) < *target)
                .map(|(role, _)| *role)
                .unwrap_or(Role::Farmer);
            *counts.entry(role).or_default() += 1;
            tracing::debug!(unit = id.short(), ?role, "role assigned");
            self.roles.insert(id.clone(), role);
        }
    }
}

/// Immutable planning context for one tick.
pub struct PlanContext<'a> {
    pub snapshot: &'a ArenaSnapshot,
    pub world: &'a WorldModel,
    pub danger: &'a DangerMap,
    pub reservations: &'a ReservationManager,
}

pub struct Planner {
    strategy: StrategyConfig,
    rules: ArenaRules,
    pressure: HashMap<UnitId, PressureState>,
    /// Anchor home tiles, pinned at first sight.
    homes: HashMap<UnitId, Position>,
}

impl Planner {
    pub fn new(strategy: StrategyConfig, rules: ArenaRules) -> Self {
        Self {
            strategy,
            rules,
            pressure: HashMap::new(),
            homes: HashMap::new(),
        }
    }

    pub fn pressure(&self, unit: &UnitId) -> Pressure {
        let blocked = self
            .pressure
            .get(unit)
            .map(|s| s.ticks_blocked)
            .unwrap_or(0);
        if blocked >= self.strategy.desperate_after_ticks {
            Pressure::Desperate
        } else if blocked >= self.strategy.relaxed_after_ticks {
            Pressure::Relaxed
        } else {
            Pressure::Normal
        }
    }

    /// A valid placement was committed this tick.
    pub fn note_placed(&mut self, unit: &UnitId) {
        self.pressure.remove(unit);
    }

    /// No valid placement existed this tick.
    pub fn note_blocked(&mut self, unit: &UnitId) {
        self.pressure
            .entry(unit.clone())
            .or_default()
            .ticks_blocked += 1;
    }

    pub fn forget(&mut self, unit: &UnitId) {
        self.pressure.remove(unit);
        self.homes.remove(unit);
    }

    /// Ranked candidate actions for one unit. Highest score first; ties
    /// break on action target so the order is stable.
    pub fn candidates(&mut self, unit: &Unit, role: Role, ctx: &PlanContext<'_>) -> Vec<Candidate> {
        let mut out = Vec::new();

        // A hazardous current tile overrides the role.
        if !ctx.danger.is_safe_at(unit.pos, self.strategy.transit_horizon) {
            if let Some(candidate) = self.evade_candidate(unit, ctx) {
                out.push(candidate);
            }
        }

        match role {
            Role::Anchor => {
                // Anchors never relax their placement bar.
                let home = *self.homes.entry(unit.id.clone()).or_insert(unit.pos);
                let radius = (self.strategy.farm_search_radius / 2).max(2);
                self.farm_candidates(unit, ctx, home, radius, 2, false, &mut out);
            }
            Role::Farmer => {
                let pressure = self.pressure(&unit.id);
                let radius = match pressure {
                    Pressure::Desperate => self.strategy.farm_search_radius * 2,
                    _ => self.strategy.farm_search_radius,
                };
                let min_hit = pressure.min_obstacles();
                self.farm_candidates(unit, ctx, unit.pos, radius, min_hit, false, &mut out);
            }
            Role::Scout => {
                self.scout_candidates(unit, ctx, &mut out);
                // Opportunistic farming, but only when it costs nothing in
                // exposure.
                self.farm_candidates(
                    unit,
                    ctx,
                    unit.pos,
                    self.strategy.farm_search_radius,
                    1,
                    true,
                    &mut out,
                );
            }
        }

        if out.is_empty() && ctx.danger.is_safe_at(unit.pos, self.strategy.transit_horizon) {
            out.push(Candidate {
                unit: unit.id.clone(),
                kind: ActionKind::Hold,
                path: Vec::new(),
                score: 0.0,
            });
        }

        out.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.path.cmp(&b.path))
        });
        out.truncate(self.strategy.max_candidates);
        out
    }

    /// Triangular placement value: 1, 3, 6, 10 points for 1..=4 obstacles,
    /// capped at 10.
    pub fn obstacle_points(hit: u32) -> u32 {
        (hit * (hit + 1) / 2).min(10)
    }

    /// Obstacles a bomb at `at` would destroy, ignoring tiles farmed too
    /// recently to have respawned value.
    pub fn obstacles_hit(&self, at: Position, ctx: &PlanContext<'_>) -> u32 {
        blast_cross(at, self.rules.bomb_range, |pos| self.ray_tile(pos, ctx))
            .into_iter()
            .filter(|&pos| ctx.world.is_obstacle(pos) && !ctx.world.recently_destroyed(pos))
            .count() as u32
    }

    fn ray_tile(&self, pos: Position, ctx: &PlanContext<'_>) -> RayTile {
        if !ctx.world.in_bounds(pos) {
            RayTile::Outside
        } else if ctx.world.is_blocked(pos) {
            RayTile::Blocking
        } else {
            RayTile::Open
        }
    }

    fn farm_candidates(
        &self,
        unit: &Unit,
        ctx: &PlanContext<'_>,
        center: Position,
        radius: i32,
        min_hit: u32,
        zero_risk_only: bool,
        out: &mut Vec<Candidate>,
    ) {
        if unit.bombs_available == 0 {
            return;
        }

        let mut spots: Vec<(u32, Position)> = Vec::new();
        for dy in -radius..=radius {
            for dx in -radius..=radius {
                if dx.abs() + dy.abs() > radius {
                    continue;
                }
                let at = Position::new(center.x + dx, center.y + dy);
                if !ctx.world.in_bounds(at) {
                    continue;
                }
                if at != unit.pos && ctx.world.is_blocked(at) {
                    continue;
                }
                let hit = self.obstacles_hit(at, ctx);
                if hit >= min_hit {
                    spots.push((hit, at));
                }
            }
        }
        // Best placements first keeps the candidate cap from starving
        // high-value spots.
        spots.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(&b.1)));
        spots.truncate(self.strategy.max_candidates);

        for (hit, at) in spots {
            let Some(path) = self.route(unit, at, ctx) else {
                continue;
            };
            let Some(escape) = self.escape_from(at, ctx) else {
                continue;
            };
            let risk = self.path_risk(&path, ctx);
            if zero_risk_only && risk > 0.0 {
                continue;
            }
            let value = Self::obstacle_points(hit) as f64;
            let score = value
                - self.strategy.alpha * path.len() as f64
                - self.strategy.beta * risk
                - self.strategy.gamma * self.interference(&path, &unit.id, ctx);
            out.push(Candidate {
                unit: unit.id.clone(),
                kind: ActionKind::Farm { at, escape },
                path,
                score,
            });
        }
    }

    fn scout_candidates(&self, unit: &Unit, ctx: &PlanContext<'_>, out: &mut Vec<Candidate>) {
        let mut frontier = ctx.world.frontier_tiles();
        frontier.sort_by_key(|&pos| (pos.manhattan(unit.pos), pos));
        frontier.truncate(self.strategy.scout_frontier_limit);

        for target in frontier {
            let Some(path) = self.route(unit, target, ctx) else {
                continue;
            };
            // Unknown neighbors the vantage point would reveal.
            let gain = target
                .neighbors4()
                .into_iter()
                .filter(|&n| {
                    ctx.world.in_bounds(n)
                        && ctx.world.tile(n) == crate::models::TileState::Unknown
                })
                .count() as f64;
            let score = self.strategy.delta * gain
                - self.strategy.alpha * path.len() as f64
                - self.strategy.beta * self.path_risk(&path, ctx)
                - self.strategy.gamma * self.interference(&path, &unit.id, ctx);
            out.push(Candidate {
                unit: unit.id.clone(),
                kind: ActionKind::Scout { frontier: target },
                path,
                score,
            });
        }
    }

    fn evade_candidate(&self, unit: &Unit, ctx: &PlanContext<'_>) -> Option<Candidate> {
        let refuge = ctx.danger.escape_tile(
            unit.pos,
            &HashSet::new(),
            self.strategy.evade_radius as u32,
            |pos| ctx.world.in_bounds(pos) && !ctx.world.is_blocked(pos),
        )?;
        let path = self.route(unit, refuge, ctx)?;
        // Survival dominates every other action.
        let score = 1_000.0 - self.strategy.alpha * path.len() as f64;
        Some(Candidate {
            unit: unit.id.clone(),
            kind: ActionKind::Evade { refuge },
            path,
            score,
        })
    }

    /// Shortest safe route. Foreign hard reservations block outright;
    /// soft claims only cost score through the interference term, so two
    /// units may still propose overlapping routes and let arbitration
    /// settle it.
    fn route(&self, unit: &Unit, goal: Position, ctx: &PlanContext<'_>) -> Option<Vec<Position>> {
        let horizon = self.strategy.transit_horizon;
        shortest_path(unit.pos, goal, self.rules.max_path_len, |pos| {
            !ctx.world.in_bounds(pos)
                || ctx.world.is_blocked(pos)
                || ctx
                    .reservations
                    .reservation(pos)
                    .is_some_and(|r| r.kind == ReservationKind::Hard && r.owner != unit.id)
                || !ctx.danger.is_safe_at(pos, horizon)
        })
    }

    /// A placement is valid only when the placer can leave the blast
    /// before it goes off.
    fn escape_from(&self, at: Position, ctx: &PlanContext<'_>) -> Option<Position> {
        let blast: HashSet<Position> =
            blast_cross(at, self.rules.bomb_range, |pos| self.ray_tile(pos, ctx))
                .into_iter()
                .collect();
        ctx.danger
            .escape_tile(at, &blast, self.strategy.escape_steps, |pos| {
                ctx.world.in_bounds(pos) && !ctx.world.is_blocked(pos)
            })
    }

    /// Residual hazard crossed in transit: full weight for a blast
    /// detonating within the step-adjusted horizon, plus graded mob and
    /// enemy proximity even on tiles that are technically safe.
    fn path_risk(&self, path: &[Position], ctx: &PlanContext<'_>) -> f64 {
        let horizon = self.strategy.transit_horizon;
        path.iter()
            .enumerate()
            .map(|(i, &pos)| {
                let blast = if ctx.danger.is_safe_at(pos, i as u32 + horizon) {
                    0.0
                } else {
                    1.0
                };
                blast + ctx.danger.contact_level(pos)
            })
            .sum()
    }

    /// Path tiles already softly claimed by teammates.
    fn interference(&self, path: &[Position], asking: &UnitId, ctx: &PlanContext<'_>) -> f64 {
        path.iter()
            .filter(|&&pos| ctx.reservations.is_reserved(pos, asking))
            .count() as f64
    }
}
