//! View state machines for the project admin UI.
//!
//! Each view owns its state exclusively and moves between named states in
//! response to typed events. Rendering lives in `web-ui`; this crate only
//! decides what is shown.

pub mod detail;
pub mod list;
pub mod status;

#[cfg(test)]
mod test_support;

pub use detail::{DetailError, DetailEvent, DetailState, Dialog, LoadedProject, ProjectDetailView};
pub use list::{ProjectListState, ProjectListView, sort_newest_first};
pub use status::{StatusControl, StatusOutcome};
