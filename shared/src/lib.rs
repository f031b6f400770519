//! Shared types and pure logic for GanttFlow
//!
//! This crate contains the models, scheduling rules and view projections
//! shared between the backend, frontend (via WASM), and other components
//! of the system. Nothing in here performs I/O.

pub mod dates;
pub mod distribution;
pub mod export;
pub mod import;
pub mod models;
pub mod schedule;
pub mod types;
pub mod validation;
pub mod views;
pub mod working_set;

pub use models::*;
pub use schedule::{evaluate, Evaluation, LifecycleStatus, Phase, Schedule, UnlockPolicy};
pub use types::*;
pub use validation::*;
pub use working_set::{Applied, RefreshTicket, WorkingSet};
