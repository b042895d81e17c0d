//! gacha-core: deterministic roll reconstruction and route search for a
//! seeded gacha mechanic.
//!
//! Data flows one way:
//!   seed + BannerConfig → {CompletedPathModel | UncompletedPathModel}
//!   → node table → single / ten-draw walkers → RouteSearch → best path.

pub mod completed;
pub mod config;
pub mod draw;
pub mod engine;
pub mod error;
pub mod highlight;
pub mod request;
pub mod rng;
pub mod roll;
pub mod search;
pub mod types;
pub mod uncompleted;
