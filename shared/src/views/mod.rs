//! Read-side projections over the current reference set
//!
//! Every projection takes the full set plus `today` and the unlock policy,
//! and is cheap enough to rebuild on each change.

mod calendar;
mod cards;
mod gantt;
mod listing;

pub use calendar::*;
pub use cards::*;
pub use gantt::*;
pub use listing::*;
