//! Two-phase tile reservations.
//!
//! Soft reservations are tentative claims made while planning a tick and
//! are cleared unconditionally at the start of every tick. Hard
//! reservations are created only after the external system has accepted a
//! command, and expire on their own TTL regardless of whether the outcome
//! was ever confirmed.

use std::collections::{HashMap, HashSet};

use crate::models::{Position, UnitId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReservationKind {
    Soft,
    Hard,
}

#[derive(Debug, Clone)]
pub struct Reservation {
    pub tile: Position,
    pub owner: UnitId,
    pub kind: ReservationKind,
    pub created_tick: u64,
    pub ttl: u64,
}

/// Single source of truth for tile occupancy during planning.
#[derive(Debug, Default)]
pub struct ReservationManager {
    soft: HashMap<Position, Reservation>,
    hard: HashMap<Position, Reservation>,
    by_owner: HashMap<UnitId, HashSet<Position>>,
    tick: u64,
}

impl ReservationManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance the manager's notion of the current tick. Call before
    /// `expire_hard` / `clear_soft` at the start of each tick.
    pub fn set_tick(&mut self, tick: u64) {
        self.tick = tick;
    }

    /// Tentative claim during planning. Fails only when a different owner
    /// holds a Hard reservation on the tile; a foreign Soft reservation is
    /// overwritten.
    pub fn soft_reserve(&mut self, tile: Position, owner: &UnitId) -> bool {
        if let Some(existing) = self.hard.get(&tile) {
            if &existing.owner != owner {
                tracing::debug!(
                    owner = owner.short(),
                    holder = existing.owner.short(),
                    tile = %tile,
                    "soft reserve refused, tile hard-held"
                );
                return false;
            }
        }

        if let Some(previous) = self.soft.insert(
            tile,
            Reservation {
                tile,
                owner: owner.clone(),
                kind: ReservationKind::Soft,
                created_tick: self.tick,
                ttl: 1,
            },
        ) {
            if &previous.owner != owner {
                self.untrack(&previous.owner, tile);
            }
        }
        self.by_owner.entry(owner.clone()).or_default().insert(tile);
        true
    }

    /// Confirmed claim, created only after an external ack. Supersedes any
    /// Soft reservation on the tile.
    pub fn hard_reserve(&mut self, tile: Position, owner: &UnitId, ttl: u64) {
        if let Some(soft) = self.soft.remove(&tile) {
            if &soft.owner != owner {
                tracing::warn!(
                    owner = owner.short(),
                    holder = soft.owner.short(),
                    tile = %tile,
                    "hard reserve superseding foreign soft reservation"
                );
                self.untrack(&soft.owner, tile);
            }
        }
        if let Some(previous) = self.hard.insert(
            tile,
            Reservation {
                tile,
                owner: owner.clone(),
                kind: ReservationKind::Hard,
                created_tick: self.tick,
                ttl,
            },
        ) {
            if &previous.owner != owner {
                self.untrack(&previous.owner, tile);
            }
        }
        self.by_owner.entry(owner.clone()).or_default().insert(tile);
        tracing::debug!(owner = owner.short(), tile = %tile, ttl, "hard reserved");
    }

    /// Promote every Soft reservation held by `owner` to Hard with the
    /// given TTL. Returns the number promoted.
    pub fn promote_owner(&mut self, owner: &UnitId, ttl: u64) -> usize {
        let tiles: Vec<Position> = self
            .by_owner
            .get(owner)
            .map(|tiles| {
                let mut tiles: Vec<Position> = tiles
                    .iter()
                    .filter(|tile| {
                        self.soft
                            .get(tile)
                            .is_some_and(|r| &r.owner == owner)
                    })
                    .copied()
                    .collect();
                tiles.sort();
                tiles
            })
            .unwrap_or_default();
        for &tile in tiles.iter() {
            self.hard_reserve(tile, owner, ttl);
        }
        tiles.len()
    }

    /// True iff a Soft or Hard reservation held by someone other than
    /// `asking` exists on the tile. A unit's own reservations are
    /// transparent to it.
    pub fn is_reserved(&self, tile: Position, asking: &UnitId) -> bool {
        if let Some(r) = self.hard.get(&tile) {
            if &r.owner != asking {
                return true;
            }
        }
        if let Some(r) = self.soft.get(&tile) {
            if &r.owner != asking {
                return true;
            }
        }
        false
    }

    pub fn reservation(&self, tile: Position) -> Option<&Reservation> {
        self.hard.get(&tile).or_else(|| self.soft.get(&tile))
    }

    /// Remove every reservation held by `owner`. Used when a submitted
    /// command fails; never partial.
    pub fn rollback_owner(&mut self, owner: &UnitId) {
        let Some(tiles) = self.by_owner.remove(owner) else {
            return;
        };
        let mut removed = 0usize;
        for tile in tiles {
            if self.soft.get(&tile).is_some_and(|r| &r.owner == owner) {
                self.soft.remove(&tile);
                removed += 1;
            }
            if self.hard.get(&tile).is_some_and(|r| &r.owner == owner) {
                self.hard.remove(&tile);
                removed += 1;
            }
        }
        if removed > 0 {
            tracing::debug!(owner = owner.short(), removed, "rolled back reservations");
        }
    }

    /// Drop Hard reservations whose TTL has elapsed. Run once per tick
    /// before planning.
    pub fn expire_hard(&mut self, current_tick: u64) {
        self.tick = current_tick;
        let expired: Vec<(Position, UnitId)> = self
            .hard
            .iter()
            .filter(|(_, r)| current_tick.saturating_sub(r.created_tick) >= r.ttl)
            .map(|(tile, r)| (*tile, r.owner.clone()))
            .collect();
        for (tile, owner) in expired.iter() {
            self.hard.remove(tile);
            self.untrack(owner, *tile);
        }
        if !expired.is_empty() {
            tracing::debug!(count = expired.len(), "expired hard reservations");
        }
    }

    /// Drop every Soft reservation unconditionally. Run once per tick
    /// before planning.
    pub fn clear_soft(&mut self) {
        let drained: Vec<(Position, UnitId)> = self
            .soft
            .drain()
            .map(|(tile, r)| (tile, r.owner))
            .collect();
        for (tile, owner) in drained {
            // Keep the tile tracked if the same owner also holds it hard.
            if !self.hard.get(&tile).is_some_and(|r| r.owner == owner) {
                self.untrack(&owner, tile);
            }
        }
    }

    pub fn soft_count(&self) -> usize {
        self.soft.len()
    }

    pub fn hard_count(&self) -> usize {
        self.hard.len()
    }

    pub fn owner_tiles(&self, owner: &UnitId) -> Vec<Position> {
        let mut tiles: Vec<Position> = self
            .by_owner
            .get(owner)
            .map(|tiles| tiles.iter().copied().collect())
            .unwrap_or_default();
        tiles.sort();
        tiles
    }

    fn untrack(&mut self, owner: &UnitId, tile: Position) {
        if let Some(tiles) = self.by_owner.get_mut(owner) {
            tiles.remove(&tile);
            if tiles.is_empty() {
                self.by_owner.remove(owner);
            }
        }
    }
}
