//! Top-level tick loop wiring the snapshot fetch, world update, planning,
//! and the booster cadence together.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use crate::client::{ApiError, ArenaApi};
use crate::config::EngineConfig;
use crate::danger::DangerMap;
use crate::limit::{Admission, RateLimiter};
use crate::models::{Readiness, UnitId};
use crate::schedule::RequestScheduler;
use crate::strategy::{BoosterKind, BoosterPlanner, Coordinator, Planner};
use crate::world::WorldModel;

pub struct Bot {
    config: EngineConfig,
    api: Arc<dyn ArenaApi>,
    limiter: Arc<RateLimiter>,
    scheduler: RequestScheduler,
    world: WorldModel,
    danger: DangerMap,
    coordinator: Coordinator,
    boosters: BoosterPlanner,
    tick: u64,
    known_alive: HashSet<UnitId>,
}

impl Bot {
    pub fn new(config: EngineConfig, api: Arc<dyn ArenaApi>) -> Self {
        let limiter = Arc::new(RateLimiter::new(
            config.limits.requests_per_second,
            config.limits.bucket_capacity,
            Duration::from_millis(config.limits.base_backoff_ms),
            Duration::from_millis(config.limits.max_backoff_ms),
        ));
        let scheduler = RequestScheduler::new(
            api.clone(),
            limiter.clone(),
            config.limits.queue_capacity,
            config.limits.transport_retries,
            Duration::from_millis(config.limits.base_backoff_ms),
        );
        let planner = Planner::new(config.strategy.clone(), config.rules.clone());
        let coordinator = Coordinator::new(
            planner,
            config.strategy.clone(),
            Duration::from_millis(config.limits.submit_budget_ms),
        );
        Self {
            world: WorldModel::new(config.rules.vision_radius, config.rules.farm_cooldown_ticks),
            danger: DangerMap::new(config.rules.mob_danger_radius),
            coordinator,
            boosters: BoosterPlanner::new(),
            scheduler,
            limiter,
            api,
            config,
            tick: 0,
            known_alive: HashSet::new(),
        }
    }

    /// Run forever on the configured tick interval.
    pub async fn run(&mut self) {
        let mut interval =
            tokio::time::interval(Duration::from_millis(self.config.rules.tick_interval_ms));
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            self.step().await;
        }
    }

    /// Run a bounded number of ticks back to back. Test harness entry.
    pub async fn run_ticks(&mut self, ticks: u64) {
        for _ in 0..ticks {
            self.step().await;
        }
    }

    /// One full tick. A failed snapshot fetch skips the tick; stale plans
    /// are never made against an old snapshot.
    pub async fn step(&mut self) {
        self.tick += 1;

        match self.limiter.try_acquire() {
            Admission::Granted => {}
            Admission::RetryAfter(wait) => {
                tracing::debug!(wait_ms = wait.as_millis() as u64, "tick skipped, no budget");
                return;
            }
        }

        let snapshot = match self.api.fetch_arena_snapshot(self.tick).await {
            Ok(snapshot) => {
                self.limiter.on_success();
                snapshot
            }
            Err(ApiError::Throttled { retry_after }) => {
                let wait = self.limiter.on_throttled(retry_after);
                tracing::warn!(
                    backoff_ms = wait.as_millis() as u64,
                    "arena fetch throttled, tick skipped"
                );
                return;
            }
            Err(err) => {
                tracing::warn!(error = %err, "arena fetch failed, tick skipped");
                return;
            }
        };

        // Deaths release held tiles and feed the booster death counter.
        let alive: HashSet<UnitId> = snapshot
            .units
            .iter()
            .filter(|u| u.readiness != Readiness::Dead)
            .map(|u| u.id.clone())
            .collect();
        let dead: Vec<UnitId> = self.known_alive.difference(&alive).cloned().collect();
        for unit in dead {
            tracing::info!(unit = unit.short(), "unit died");
            self.boosters.record_death();
            self.coordinator.forget_unit(&unit);
        }
        self.known_alive = alive;

        self.world.update(&snapshot);
        self.danger.compute(&snapshot);

        let report = self
            .coordinator
            .run_tick(&snapshot, &self.world, &self.danger, &mut self.scheduler)
            .await;

        if self.tick % self.config.strategy.booster_interval_ticks == 0 {
            self.visit_shop().await;
        }

        if self.tick % 10 == 0 {
            tracing::info!(
                tick = snapshot.tick,
                round = %snapshot.round,
                units = snapshot.units.iter().filter(|u| u.is_ready()).count(),
                score = snapshot.raw_score,
                planned = report.planned,
                accepted = report.accepted,
                rejected = report.rejected,
                dropped = report.dropped,
                idle = report.idle,
                hard = self.coordinator.reservations().hard_count(),
                "tick complete"
            );
        }
    }

    /// Consult the booster shop and buy at most one upgrade. Both calls
    /// spend from the shared request budget.
    async fn visit_shop(&mut self) {
        if !matches!(self.limiter.try_acquire(), Admission::Granted) {
            return;
        }
        let catalog = match self.api.fetch_booster_options().await {
            Ok(catalog) => {
                self.limiter.on_success();
                catalog
            }
            Err(ApiError::Throttled { retry_after }) => {
                self.limiter.on_throttled(retry_after);
                return;
            }
            Err(err) => {
                tracing::debug!(error = %err, "booster catalog unavailable");
                return;
            }
        };

        let Some(index) = self.boosters.select(&catalog) else {
            return;
        };
        let kind = BoosterKind::from_wire(&catalog.available[index].kind);

        if !matches!(self.limiter.try_acquire(), Admission::Granted) {
            return;
        }
        match self.api.purchase_booster(index).await {
            Ok(()) => {
                self.limiter.on_success();
                self.boosters.record_purchase(kind);
                tracing::info!(?kind, "booster purchased");
            }
            Err(ApiError::Throttled { retry_after }) => {
                self.limiter.on_throttled(retry_after);
            }
            Err(err) => {
                tracing::warn!(error = %err, "booster purchase failed");
            }
        }
    }
}
