//! Business logic services for GanttFlow

pub mod export;
pub mod history;
pub mod import;
pub mod live;
pub mod reference;
pub mod views;

pub use export::ExportService;
pub use history::HistoryService;
pub use import::ImportService;
pub use live::{LiveEvent, LiveReferences};
pub use reference::ReferenceService;
pub use views::ViewService;
