//! Pagination report – a serialisable summary of how a document was split,
//! for tooling that wants to inspect page fill without parsing markup.

use serde::{Deserialize, Serialize};

use crate::pagination::{PageFragment, CONTENT_HEIGHT_PX};

/// Summary of one pagination run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaginationReport {
    /// Theme id the document was measured with.
    pub theme: String,
    /// Content height available per page, in CSS px.
    pub usable_height_px: f32,
    pub keep_with_header_px: f32,
    /// Ordered list of pages.
    pub pages: Vec<PageReport>,
}

/// One page of the report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageReport {
    /// 1-based, as printed in the footer.
    pub number: usize,
    pub node_count: usize,
    pub height_px: f32,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub oversized: bool,
}

impl PaginationReport {
    pub fn new(theme: &str, keep_with_header_px: f32, pages: &[PageFragment]) -> Self {
        Self {
            theme: theme.to_string(),
            usable_height_px: CONTENT_HEIGHT_PX,
            keep_with_header_px,
            pages: pages
                .iter()
                .enumerate()
                .map(|(i, p)| PageReport {
                    number: i + 1,
                    node_count: p.node_count,
                    height_px: p.height,
                    oversized: p.oversized,
                })
                .collect(),
        }
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn total_nodes(&self) -> usize {
        self.pages.iter().map(|p| p.node_count).sum()
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
