//! Thumbnail fetches for result rows whose image element has fired.

use crate::lazy_image::{ElementId, ImageElement};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ThumbnailStatus {
    /// Registered but not yet on screen
    Pending,
    Loading,
    Ready { bytes: usize },
    Failed,
}

impl ThumbnailStatus {
    /// Cell text for the thumbnail column
    pub fn label(&self, use_glyphs: bool) -> String {
        match (self, use_glyphs) {
            (Self::Pending, true) => "·".to_string(),
            (Self::Pending, false) => ".".to_string(),
            (Self::Loading, true) => "…".to_string(),
            (Self::Loading, false) => "..".to_string(),
            (Self::Ready { bytes }, true) => format!("▣ {}", format_size(*bytes)),
            (Self::Ready { bytes }, false) => format!("img {}", format_size(*bytes)),
            (Self::Failed, true) => "✗".to_string(),
            (Self::Failed, false) => "x".to_string(),
        }
    }
}

fn format_size(bytes: usize) -> String {
    const KB: f64 = 1024.0;
    let bytes_f = bytes as f64;
    if bytes_f < KB {
        format!("{}B", bytes)
    } else if bytes_f < KB * KB {
        format!("{:.1}K", bytes_f / KB)
    } else {
        format!("{:.1}M", bytes_f / (KB * KB))
    }
}

#[derive(Default)]
struct StoreInner {
    statuses: RefCell<HashMap<ElementId, ThumbnailStatus>>,
    /// Bumped on `clear` so fetches for a previous result set are dropped
    epoch: Cell<u64>,
}

/// Per-element thumbnail status, filled in by background fetches
#[derive(Clone)]
pub struct ThumbnailStore {
    inner: Rc<StoreInner>,
    client: reqwest::Client,
}

impl ThumbnailStore {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            inner: Rc::new(StoreInner::default()),
            client,
        }
    }

    pub fn status(&self, id: ElementId) -> ThumbnailStatus {
        self.inner
            .statuses
            .borrow()
            .get(&id)
            .cloned()
            .unwrap_or(ThumbnailStatus::Pending)
    }

    pub fn set_status(&self, id: ElementId, status: ThumbnailStatus) {
        self.inner.statuses.borrow_mut().insert(id, status);
    }

    /// Forget every status; in-flight fetches finish into the void
    pub fn clear(&self) {
        self.inner.statuses.borrow_mut().clear();
        self.inner.epoch.set(self.inner.epoch.get() + 1);
    }

    /// Download the source assigned to `element` on the local task set.
    /// `dirty` is raised when the status changes.
    pub fn fetch(&self, element: &ImageElement, dirty: Rc<Cell<bool>>) {
        let Some(url) = element.src() else {
            return;
        };
        let id = element.id();
        let epoch = self.inner.epoch.get();
        self.set_status(id, ThumbnailStatus::Loading);

        let inner = Rc::clone(&self.inner);
        let request = self.client.get(url.as_str());
        tokio::task::spawn_local(async move {
            let status = match request.send().await.and_then(|r| r.error_for_status()) {
                Ok(response) => match response.bytes().await {
                    Ok(body) => ThumbnailStatus::Ready { bytes: body.len() },
                    Err(e) => {
                        warn!(target: "thumbnails", "Failed to read {}: {}", url, e);
                        ThumbnailStatus::Failed
                    }
                },
                Err(e) => {
                    warn!(target: "thumbnails", "Failed to fetch {}: {}", url, e);
                    ThumbnailStatus::Failed
                }
            };

            if inner.epoch.get() != epoch {
                debug!(target: "thumbnails", "Dropping stale thumbnail for {}", id);
                return;
            }
            inner.statuses.borrow_mut().insert(id, status);
            dirty.set(true);
        });
    }
}
