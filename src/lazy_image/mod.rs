//! Viewport-driven lazy image loading
//!
//! Image placeholders register their real URL with a [`LazyImageLoader`];
//! the source is only assigned once the placeholder intersects the
//! viewport, so thumbnail cost follows visible rows rather than result
//! count.

pub mod element;
pub mod loader;
pub mod observer;

pub use element::{Bounds, ElementId, ImageElement};
pub use loader::{LazyImageLoader, RegistrationError};
pub use observer::{IntersectionEntry, Viewport};
