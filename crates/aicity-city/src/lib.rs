//! Projects, assets, lots, and tiles for the AIcity simulation.
//!
//! Joint infrastructure is the city's cooperative loop: a proposer starts
//! a project, contributors put days into it, the finished asset pays a
//! role-scoped benefit every morning until a saboteur brings it down.
//!
//! # Modules
//!
//! - [`catalog`] -- Static build requirements and benefit tables per asset
//!   type.
//! - [`projects`] -- The [`ProjectBoard`]: staged contributions, daily
//!   settlement, abandonment, completion.
//! - [`assets`] -- The [`AssetRegistry`]: standing assets, benefits,
//!   destruction.
//! - [`map`] -- The [`CityMap`]: home lots, world tiles, zone count.

pub mod assets;
pub mod catalog;
pub mod error;
pub mod map;
pub mod projects;

pub use assets::{AssetRegistry, BenefitCredit};
pub use catalog::{ProjectBlueprint, benefit_role, blueprint, daily_benefit};
pub use error::CityError;
pub use map::{CityMap, DEFAULT_ZONE_COUNT};
pub use projects::{
    CompletedProject, DEFAULT_ABANDON_DAYS, ProjectBoard, ProjectDayOutcome,
};
