//! User interface layer
//!
//! The terminal app renders the search state and drives the lazy image
//! loader from the results viewport.

pub mod thumbnails;
pub mod tui_app;
pub mod viewport;

pub use tui_app::{run_tui_app, TuiApp};
