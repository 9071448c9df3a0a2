//! UI element handle for a lazily loaded image

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_ELEMENT_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(u64);

impl ElementId {
    fn next() -> Self {
        Self(NEXT_ELEMENT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl std::fmt::Display for ElementId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Vertical extent of an element in layout units (rows in the TUI)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bounds {
    pub top: usize,
    pub height: usize,
}

impl Bounds {
    pub fn new(top: usize, height: usize) -> Self {
        Self { top, height }
    }

    /// A single row at `index`
    pub fn row(index: usize) -> Self {
        Self::new(index, 1)
    }

    /// Exclusive end
    pub fn bottom(&self) -> usize {
        self.top + self.height
    }
}

#[derive(Debug)]
pub(crate) struct ElementState {
    id: ElementId,
    mounted: Cell<bool>,
    bounds: Cell<Option<Bounds>>,
    /// Target recorded at registration (the `data-src` of an `<img>`)
    data_src: RefCell<Option<String>>,
    /// Effective source; set once the element has been loaded
    src: RefCell<Option<String>>,
    loads: Cell<u32>,
}

/// Handle to an image placeholder owned by the render layer.
///
/// Clones share the same element. The lazy image loader only keeps a weak
/// reference, so dropping every handle abandons a pending registration.
#[derive(Debug, Clone)]
pub struct ImageElement {
    state: Rc<ElementState>,
}

impl Default for ImageElement {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageElement {
    /// New, unmounted element
    pub fn new() -> Self {
        Self {
            state: Rc::new(ElementState {
                id: ElementId::next(),
                mounted: Cell::new(false),
                bounds: Cell::new(None),
                data_src: RefCell::new(None),
                src: RefCell::new(None),
                loads: Cell::new(0),
            }),
        }
    }

    /// New element already mounted at `bounds`
    pub fn mounted_at(bounds: Bounds) -> Self {
        let element = Self::new();
        element.mount(bounds);
        element
    }

    pub fn id(&self) -> ElementId {
        self.state.id
    }

    pub fn mount(&self, bounds: Bounds) {
        self.state.bounds.set(Some(bounds));
        self.state.mounted.set(true);
    }

    /// Move a mounted element (e.g. after the list above it changed)
    pub fn set_bounds(&self, bounds: Bounds) {
        self.state.bounds.set(Some(bounds));
    }

    /// Destruction signal: the loader releases the registration on its
    /// next pass
    pub fn unmount(&self) {
        self.state.mounted.set(false);
        self.state.bounds.set(None);
    }

    pub fn is_mounted(&self) -> bool {
        self.state.mounted.get()
    }

    pub fn bounds(&self) -> Option<Bounds> {
        self.state.bounds.get()
    }

    pub fn data_src(&self) -> Option<String> {
        self.state.data_src.borrow().clone()
    }

    /// Effective image source, `None` until loaded
    pub fn src(&self) -> Option<String> {
        self.state.src.borrow().clone()
    }

    /// Number of times a source was assigned
    pub fn load_count(&self) -> u32 {
        self.state.loads.get()
    }

    pub fn is_loaded(&self) -> bool {
        self.load_count() > 0
    }

    pub(crate) fn set_data_src(&self, url: &str) {
        *self.state.data_src.borrow_mut() = Some(url.to_string());
    }

    pub(crate) fn assign_source(&self, url: &str) {
        *self.state.src.borrow_mut() = Some(url.to_string());
        self.state.loads.set(self.state.loads.get() + 1);
    }

    pub(crate) fn downgrade(&self) -> WeakElement {
        WeakElement(Rc::downgrade(&self.state))
    }
}

/// Weak reference held by the loader
#[derive(Debug, Clone)]
pub(crate) struct WeakElement(Weak<ElementState>);

impl WeakElement {
    pub(crate) fn upgrade(&self) -> Option<ImageElement> {
        self.0.upgrade().map(|state| ImageElement { state })
    }
}
