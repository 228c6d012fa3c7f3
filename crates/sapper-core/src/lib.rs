//! Sapper Core - Tactical planning and reservation engine
//!
//! This crate provides the per-tick decision core for a multi-unit arena
//! bot: a persistent fog-of-war world model, hazard prediction, BFS
//! routing, two-phase tile reservations, and a rate-limited command
//! scheduler, arbitrated by a role-driven planner.

#![forbid(unsafe_code)]

pub mod bot;
pub mod client;
pub mod config;
pub mod danger;
pub mod limit;
pub mod models;
pub mod path;
pub mod reserve;
pub mod schedule;
pub mod strategy;
pub mod world;

pub use bot::Bot;
pub use client::{ApiError, ArenaApi, HttpArenaClient};
pub use config::EngineConfig;
pub use danger::DangerMap;
pub use limit::{Admission, RateLimiter};
pub use reserve::{Reservation, ReservationKind, ReservationManager};
pub use schedule::{RequestScheduler, SubmitOutcome};
pub use strategy::{Coordinator, Planner};
pub use world::WorldModel;
