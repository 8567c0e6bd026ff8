//! Live terminal view for podstatus
//!
//! Renders the pod table and keeps it current from a watch, redrawing it in
//! place on every change.

mod controller;
mod live_set;
mod screen;

pub use controller::{LiveViewController, Mode, Phase, ViewError};
pub use live_set::LiveSet;
pub use screen::{ScreenBuffer, format_table};
