//! Wire types returned by the search endpoint.

use serde::{Deserialize, Serialize};

/// One displayable search hit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResultItem {
    pub title: String,
    #[serde(default)]
    pub artists: Vec<String>,
    pub uri: String,
    pub collection: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
}

impl SearchResultItem {
    /// Artists joined for display, `-` when the track has none
    pub fn artists_label(&self) -> String {
        if self.artists.is_empty() {
            "-".to_string()
        } else {
            self.artists.join(", ")
        }
    }

    /// Thumbnail URL, treating an empty string the same as a missing one
    pub fn thumbnail(&self) -> Option<&str> {
        self.thumbnail_url.as_deref().filter(|url| !url.is_empty())
    }
}

/// Body of `GET /api/search`.
///
/// `items` may be a truncated page of the matches; `total` always counts
/// every match the service found.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SearchResponse {
    pub items: Vec<SearchResultItem>,
    pub total: usize,
}

impl SearchResponse {
    pub fn displayed(&self) -> usize {
        self.items.len()
    }

    /// "N displayed of TOTAL" indicator for the status line
    pub fn summary(&self) -> String {
        format!("{} displayed of {}", self.displayed(), self.total)
    }

    pub fn is_truncated(&self) -> bool {
        self.displayed() < self.total
    }
}
