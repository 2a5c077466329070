//! Catalogue records and the derived views the player renders.
//!
//! `Track` is the persisted record shape shared by every store backend;
//! `views` computes the Popular / New / All orderings from a loaded list and
//! `display` holds the small text formatters used by the UI and the CLI.

mod display;
mod model;
mod views;

pub use display::*;
pub use model::*;
pub use views::*;
