//! Observation registry that defers image loading until elements are visible.
//!
//! One loader is created at startup and handed to whatever mounts image
//! placeholders. Each registration fires at most once: the element is
//! removed from the observed set in the same step its source is assigned,
//! so later intersections find nothing to fire.

use super::element::{ElementId, ImageElement, WeakElement};
use super::observer::{IntersectionEntry, Viewport};
use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::Rc;
use thiserror::Error;
use tracing::{debug, trace};

/// Caller contract violations when registering an element
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistrationError {
    #[error("cannot register element {element}: target URL is empty")]
    EmptyUrl { element: ElementId },

    #[error("cannot register element {element}: element is not mounted")]
    NotMounted { element: ElementId },

    #[error("cannot register element {element}: its image was already loaded")]
    AlreadyFired { element: ElementId },

    #[error("cannot register element {element}: the image loader has been shut down")]
    LoaderShutDown { element: ElementId },
}

struct Registration {
    element: WeakElement,
    target_url: String,
}

struct LoaderInner {
    observed: RefCell<BTreeMap<ElementId, Registration>>,
    shut_down: Cell<bool>,
    fired_total: Cell<u64>,
}

/// Lazy image loader. Clones share one registry.
#[derive(Clone)]
pub struct LazyImageLoader {
    inner: Rc<LoaderInner>,
}

impl Default for LazyImageLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl LazyImageLoader {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(LoaderInner {
                observed: RefCell::new(BTreeMap::new()),
                shut_down: Cell::new(false),
                fired_total: Cell::new(0),
            }),
        }
    }

    /// Record `target_url` against `element` and start observing it.
    ///
    /// Registering an element that is still pending replaces its target.
    pub fn register(
        &self,
        element: &ImageElement,
        target_url: impl Into<String>,
    ) -> Result<(), RegistrationError> {
        let target_url = target_url.into();
        let id = element.id();

        if self.inner.shut_down.get() {
            return Err(RegistrationError::LoaderShutDown { element: id });
        }
        if target_url.trim().is_empty() {
            return Err(RegistrationError::EmptyUrl { element: id });
        }
        if !element.is_mounted() {
            return Err(RegistrationError::NotMounted { element: id });
        }
        if element.is_loaded() {
            return Err(RegistrationError::AlreadyFired { element: id });
        }

        element.set_data_src(&target_url);
        trace!(target: "lazy_image", "Observing {} -> {}", id, target_url);
        self.inner.observed.borrow_mut().insert(
            id,
            Registration {
                element: element.downgrade(),
                target_url,
            },
        );
        Ok(())
    }

    /// Observe every registered element against `viewport` and fire the
    /// visible ones. Returns the elements loaded by this pass.
    pub fn observe_viewport(&self, viewport: &Viewport) -> Vec<ImageElement> {
        self.prune();

        let entries: Vec<IntersectionEntry> = self
            .inner
            .observed
            .borrow()
            .iter()
            .filter_map(|(id, registration)| {
                let element = registration.element.upgrade()?;
                let ratio = element
                    .bounds()
                    .map(|bounds| viewport.intersection_ratio(bounds))
                    .unwrap_or(0.0);
                Some(IntersectionEntry {
                    element: *id,
                    ratio,
                })
            })
            .collect();

        self.handle_entries(&entries)
    }

    /// Process a batch of intersection entries. Entries for elements that
    /// are not observed (never registered, or already fired) are ignored.
    pub fn handle_entries(&self, entries: &[IntersectionEntry]) -> Vec<ImageElement> {
        let mut fired = Vec::new();

        for entry in entries.iter().filter(|entry| entry.is_intersecting()) {
            let registration = match self.inner.observed.borrow_mut().remove(&entry.element) {
                Some(registration) => registration,
                None => continue,
            };

            let element = match registration.element.upgrade() {
                Some(element) if element.is_mounted() => element,
                _ => {
                    debug!(target: "lazy_image", "Dropped registration for destroyed element {}", entry.element);
                    continue;
                }
            };

            element.assign_source(&registration.target_url);
            self.inner.fired_total.set(self.inner.fired_total.get() + 1);
            debug!(
                target: "lazy_image",
                "Loaded {} (ratio {:.2}) from {}",
                entry.element,
                entry.ratio,
                registration.target_url
            );
            fired.push(element);
        }

        fired
    }

    /// Release registrations whose element was dropped or unmounted
    pub fn prune(&self) -> usize {
        let mut observed = self.inner.observed.borrow_mut();
        let before = observed.len();
        observed.retain(|_, registration| {
            registration
                .element
                .upgrade()
                .map(|element| element.is_mounted())
                .unwrap_or(false)
        });
        let released = before - observed.len();
        if released > 0 {
            debug!(target: "lazy_image", "Released {} abandoned registrations", released);
        }
        released
    }

    pub fn is_observing(&self, element: &ImageElement) -> bool {
        self.inner.observed.borrow().contains_key(&element.id())
    }

    pub fn observed_count(&self) -> usize {
        self.inner.observed.borrow().len()
    }

    /// Number of sources assigned over the loader's lifetime
    pub fn fired_total(&self) -> u64 {
        self.inner.fired_total.get()
    }

    /// Stop observing everything; later registrations are rejected
    pub fn shutdown(&self) {
        let abandoned = {
            let mut observed = self.inner.observed.borrow_mut();
            let count = observed.len();
            observed.clear();
            count
        };
        self.inner.shut_down.set(true);
        debug!(
            target: "lazy_image",
            "Loader shut down ({} pending registrations abandoned)",
            abandoned
        );
    }

    pub fn is_shut_down(&self) -> bool {
        self.inner.shut_down.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lazy_image::element::Bounds;

    #[test]
    fn reregistering_pending_element_replaces_target() {
        let loader = LazyImageLoader::new();
        let element = ImageElement::mounted_at(Bounds::row(50));

        loader.register(&element, "http://img/a").unwrap();
        loader.register(&element, "http://img/b").unwrap();
        assert_eq!(loader.observed_count(), 1);
        assert_eq!(element.data_src().as_deref(), Some("http://img/b"));

        let fired = loader.observe_viewport(&Viewport::new(45, 10));
        assert_eq!(fired.len(), 1);
        assert_eq!(element.src().as_deref(), Some("http://img/b"));
    }

    #[test]
    fn unmounted_element_is_released() {
        let loader = LazyImageLoader::new();
        let element = ImageElement::mounted_at(Bounds::row(0));
        loader.register(&element, "http://img/a").unwrap();

        element.unmount();
        assert_eq!(loader.prune(), 1);
        assert!(!loader.is_observing(&element));
    }

    #[test]
    fn non_intersecting_entries_do_nothing() {
        let loader = LazyImageLoader::new();
        let element = ImageElement::mounted_at(Bounds::row(0));
        loader.register(&element, "http://img/a").unwrap();

        let fired = loader.handle_entries(&[IntersectionEntry {
            element: element.id(),
            ratio: 0.0,
        }]);
        assert!(fired.is_empty());
        assert!(loader.is_observing(&element));
        assert_eq!(element.src(), None);
    }
}
