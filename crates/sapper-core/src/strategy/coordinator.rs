//! Tick arbitration: turns ranked candidates into reserved, submitted
//! commands, and reconciles reservations with submission outcomes.

use std::time::{Duration, Instant};

use crate::config::StrategyConfig;
use crate::models::{ArenaSnapshot, MoveCommand, Role, Unit, UnitId};
use crate::reserve::ReservationManager;
use crate::schedule::{RequestScheduler, SubmitOutcome};
use crate::strategy::planner::{ActionKind, Candidate, PlanContext, Planner, RoleBook};

/// Per-tick accounting, consumed by the status log.
#[derive(Debug, Default, Clone)]
pub struct TickReport {
    pub tick: u64,
    pub planned: usize,
    pub accepted: usize,
    pub rejected: usize,
    pub failed: usize,
    pub dropped: usize,
    /// Units with no viable candidate this tick.
    pub idle: usize,
}

pub struct Coordinator {
    planner: Planner,
    roles: RoleBook,
    reservations: ReservationManager,
    strategy: StrategyConfig,
    submit_budget: Duration,
}

impl Coordinator {
    pub fn new(planner: Planner, strategy: StrategyConfig, submit_budget: Duration) -> Self {
        Self {
            planner,
            roles: RoleBook::new(),
            reservations: ReservationManager::new(),
            strategy,
            submit_budget,
        }
    }

    pub fn reservations(&self) -> &ReservationManager {
        &self.reservations
    }

    pub fn role(&self, unit: &UnitId) -> Option<Role> {
        self.roles.role(unit)
    }

    /// Drop all planner and reservation state for a unit that died.
    pub fn forget_unit(&mut self, unit: &UnitId) {
        self.planner.forget(unit);
        self.reservations.rollback_owner(unit);
    }

    /// Plan, reserve, and submit commands for one tick.
    pub async fn run_tick(
        &mut self,
        snapshot: &ArenaSnapshot,
        world: &crate::world::WorldModel,
        danger: &crate::danger::DangerMap,
        scheduler: &mut RequestScheduler,
    ) -> TickReport {
        let mut report = TickReport {
            tick: snapshot.tick,
            ..TickReport::default()
        };

        self.reservations.set_tick(snapshot.tick);
        self.reservations.expire_hard(snapshot.tick);
        self.reservations.clear_soft();

        self.roles.assign(snapshot, &self.strategy);

        // Anchors plan first, then farmers, then scouts; id breaks ties.
        let mut units: Vec<&Unit> = snapshot.units.iter().filter(|u| u.is_ready()).collect();
        units.sort_by_key(|u| {
            let rank = self.roles.role(&u.id).map(|r| r.rank()).unwrap_or(u8::MAX);
            (rank, u.id.clone())
        });

        // Stale commands for units that died or lost readiness since they
        // were queued.
        let alive: Vec<UnitId> = units.iter().map(|u| u.id.clone()).collect();
        for unit in scheduler.drop_where(|id| !alive.contains(id)) {
            self.reservations.rollback_owner(&unit);
        }

        for unit in units {
            let role = match self.roles.role(&unit.id) {
                Some(role) => role,
                None => continue,
            };
            let candidates = {
                let ctx = PlanContext {
                    snapshot,
                    world,
                    danger,
                    reservations: &self.reservations,
                };
                self.planner.candidates(unit, role, &ctx)
            };
            match self.commit_first(unit, role, candidates, scheduler) {
                Some(placed_bomb) => {
                    report.planned += 1;
                    // Only farmers accrue pressure; anchors hold their bar
                    // and scouts farm opportunistically anyway.
                    if !placed_bomb && role == Role::Farmer {
                        self.planner.note_blocked(&unit.id);
                    }
                }
                None => {
                    report.idle += 1;
                    if role == Role::Farmer {
                        self.planner.note_blocked(&unit.id);
                    }
                }
            }
        }

        let deadline = Instant::now() + self.submit_budget;
        for outcome in scheduler.flush(deadline).await {
            match outcome.outcome {
                SubmitOutcome::Accepted => {
                    let promoted = self
                        .reservations
                        .promote_owner(&outcome.unit, self.strategy.hard_ttl_ticks);
                    tracing::debug!(unit = outcome.unit.short(), promoted, "move confirmed");
                    report.accepted += 1;
                }
                SubmitOutcome::Rejected(_) => {
                    self.reservations.rollback_owner(&outcome.unit);
                    report.rejected += 1;
                }
                SubmitOutcome::Failed(_) => {
                    self.reservations.rollback_owner(&outcome.unit);
                    report.failed += 1;
                }
                SubmitOutcome::Dropped => {
                    self.reservations.rollback_owner(&outcome.unit);
                    report.dropped += 1;
                }
            }
        }

        report
    }

    /// Reserve and enqueue the best candidate whose tiles can all be
    /// claimed. Returns whether the committed action places a bomb, or
    /// `None` when nothing could be committed.
    fn commit_first(
        &mut self,
        unit: &Unit,
        role: Role,
        candidates: Vec<Candidate>,
        scheduler: &mut RequestScheduler,
    ) -> Option<bool> {
        for candidate in candidates {
            if !self.claim(&candidate, unit) {
                continue;
            }
            if matches!(candidate.kind, ActionKind::Hold) {
                // Nothing to submit; the soft claim on the current tile is
                // enough to keep teammates off it.
                return Some(false);
            }
            let command = MoveCommand {
                unit: unit.id.clone(),
                path: candidate.path.clone(),
                bomb_at: candidate.place_bomb(),
            };
            match scheduler.enqueue(command) {
                Ok(()) => {
                    let placed = candidate.place_bomb().is_some();
                    if placed {
                        self.planner.note_placed(&unit.id);
                    }
                    tracing::debug!(
                        unit = unit.id.short(),
                        ?role,
                        kind = ?candidate.kind,
                        steps = candidate.path.len(),
                        score = candidate.score,
                        "command queued"
                    );
                    return Some(placed);
                }
                Err(err) => {
                    tracing::warn!(unit = unit.id.short(), %err, "scheduler full, unit idles");
                    self.reservations.rollback_owner(&unit.id);
                    return None;
                }
            }
        }
        None
    }

    /// Soft-reserve the tiles a candidate commits to: the current tile,
    /// the first step, the destination, and the bomb tile. Intermediate
    /// path tiles stay free for teammates. All-or-nothing: the claim is
    /// checked before the first tile is reserved, so a refusal leaves the
    /// unit's earlier reservations untouched.
    fn claim(&mut self, candidate: &Candidate, unit: &Unit) -> bool {
        let mut tiles = vec![unit.pos];
        if let Some(step) = candidate.first_step() {
            if !tiles.contains(&step) {
                tiles.push(step);
            }
        }
        if let Some(&dest) = candidate.path.last() {
            if !tiles.contains(&dest) {
                tiles.push(dest);
            }
        }
        if let Some(at) = candidate.place_bomb() {
            if !tiles.contains(&at) {
                tiles.push(at);
            }
        }
        if tiles
            .iter()
            .any(|&tile| self.reservations.is_reserved(tile, &unit.id))
        {
            return false;
        }
        for tile in tiles {
            if !self.reservations.soft_reserve(tile, &unit.id) {
                return false;
            }
        }
        true
    }
}
