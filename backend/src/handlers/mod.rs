//! HTTP request handlers

pub mod distribution;
pub mod events;
pub mod export;
pub mod health;
pub mod history;
pub mod import;
pub mod references;
pub mod views;

pub use distribution::*;
pub use events::*;
pub use export::*;
pub use health::*;
pub use history::*;
pub use import::*;
pub use references::*;
pub use views::*;
