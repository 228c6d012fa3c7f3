//! Booster shop policy.
//!
//! Upgrades are bought in a fixed priority order, each capped at the level
//! beyond which further purchases stop paying off. Armor is only worth
//! points once units are actually dying.

use std::collections::HashMap;

use crate::models::BoosterCatalog;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BoosterKind {
    /// Shorter fuse, faster bomb cycle.
    Fuse,
    /// Longer blast rays; the biggest multiplier on farm value.
    Range,
    /// More simultaneous bombs.
    Pockets,
    Speed,
    /// Walk over destructibles.
    Acrobatics,
    Armor,
    Unknown,
}

impl BoosterKind {
    pub fn from_wire(kind: &str) -> Self {
        match kind {
            "bomb_delay" | "fuse" => BoosterKind::Fuse,
            "bomb_range" | "range" => BoosterKind::Range,
            "bomb_count" | "pockets" => BoosterKind::Pockets,
            "speed" => BoosterKind::Speed,
            "acrobatics" => BoosterKind::Acrobatics,
            "armor" | "armour" => BoosterKind::Armor,
            _ => BoosterKind::Unknown,
        }
    }

    /// Purchase priority and level cap. Lower priority buys first.
    fn policy(self) -> Option<(u8, u32)> {
        match self {
            BoosterKind::Range => Some((0, 4)),
            BoosterKind::Fuse => Some((1, 3)),
            BoosterKind::Pockets => Some((2, 3)),
            BoosterKind::Speed => Some((3, 3)),
            BoosterKind::Acrobatics => Some((4, 1)),
            BoosterKind::Armor => Some((5, 2)),
            BoosterKind::Unknown => None,
        }
    }
}

#[derive(Debug, Default)]
pub struct BoosterPlanner {
    levels: HashMap<BoosterKind, u32>,
    deaths: u32,
}

impl BoosterPlanner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn level(&self, kind: BoosterKind) -> u32 {
        self.levels.get(&kind).copied().unwrap_or(0)
    }

    /// Pick the catalog index to buy, or None when nothing affordable is
    /// worth buying.
    pub fn select(&self, catalog: &BoosterCatalog) -> Option<usize> {
        catalog
            .available
            .iter()
            .enumerate()
            .filter_map(|(index, offer)| {
                let kind = BoosterKind::from_wire(&offer.kind);
                let (priority, cap) = kind.policy()?;
                if self.level(kind) >= cap || offer.cost > catalog.points {
                    return None;
                }
                if kind == BoosterKind::Armor && self.deaths < 2 {
                    return None;
                }
                Some((priority, offer.cost, index, kind))
            })
            .min_by_key(|&(priority, cost, index, _)| (priority, cost, index))
            .map(|(_, _, index, kind)| {
                tracing::info!(?kind, level = self.level(kind) + 1, "booster selected");
                index
            })
    }

    pub fn record_purchase(&mut self, kind: BoosterKind) {
        *self.levels.entry(kind).or_insert(0) += 1;
    }

    pub fn record_death(&mut self) {
        self.deaths += 1;
    }
}
