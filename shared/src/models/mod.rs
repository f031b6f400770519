//! Domain models for GanttFlow

mod history;
mod reference;
mod sizing;

pub use history::*;
pub use reference::*;
pub use sizing::*;
