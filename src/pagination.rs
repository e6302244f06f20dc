//! Pagination – splits a flat list of top-level blocks into A4 page
//! fragments.
//!
//! Handles:
//! - A4 usable-height budget
//! - Keeping a heading with enough of its section on the same page
//! - Never splitting atomic blocks (tables, code, lists, figures, ...)
//! - Oversized blocks, which get a page to themselves

use std::time::Duration;

use tokio::sync::Mutex;

use crate::dom::{top_level_blocks, ElementNode, Tag};
use crate::error::{MeasureError, PaginateError};
use crate::measure::{settle, Measure};
use crate::style::Stylesheet;

pub const A4_WIDTH_MM: f32 = 210.0;
pub const A4_HEIGHT_MM: f32 = 297.0;
pub const MARGIN_TOP_MM: f32 = 18.0;
pub const MARGIN_BOTTOM_MM: f32 = 18.0;
pub const MARGIN_LEFT_MM: f32 = 20.0;
pub const MARGIN_RIGHT_MM: f32 = 20.0;

/// CSS px per millimetre at 96 dpi.
pub const MM_TO_PX: f32 = 3.779_527_6;

/// Vertical space available to content on one page.
pub const CONTENT_HEIGHT_PX: f32 = (A4_HEIGHT_MM - MARGIN_TOP_MM - MARGIN_BOTTOM_MM) * MM_TO_PX;

/// Horizontal space available to content on one page.
pub const CONTENT_WIDTH_PX: f32 = (A4_WIDTH_MM - MARGIN_LEFT_MM - MARGIN_RIGHT_MM) * MM_TO_PX;

/// Minimum following content a heading must keep on its page.
pub const KEEP_WITH_HEADER_PX: f32 = 150.0;

/// Default wait for the measurement scaffold to lay out.
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(150);

/// How the splitter treats a top-level node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// `h1`–`h6`; the payload is the level, 1 being shallowest.
    Heading(u8),
    /// Never split, and never placed where it would overflow.
    Atomic,
    Block,
}

impl NodeKind {
    /// Headings win over atomicity; anything containing an atomic element
    /// is itself atomic.
    pub fn classify(element: &ElementNode) -> Self {
        if let Some(level) = element.tag.heading_level() {
            NodeKind::Heading(level)
        } else if element.tag.is_atomic() || element.has_descendant(&Tag::is_atomic) {
            NodeKind::Atomic
        } else {
            NodeKind::Block
        }
    }
}

/// One top-level block of the content flow.
#[derive(Debug, Clone)]
pub struct ContentNode {
    pub element: ElementNode,
    pub kind: NodeKind,
}

impl ContentNode {
    pub fn new(element: ElementNode) -> Self {
        let kind = NodeKind::classify(&element);
        Self { element, kind }
    }

    pub fn markup(&self) -> String {
        self.element.outer_html()
    }
}

/// The content of one page.
#[derive(Debug, Clone, PartialEq)]
pub struct PageFragment {
    /// Serialized top-level nodes, in document order.
    pub markup: String,
    pub node_count: usize,
    /// Sum of the measured node heights.
    pub height: f32,
    /// True when a single node taller than the page was placed alone.
    pub oversized: bool,
}

impl PageFragment {
    /// The whole input as one fragment, used when there is nothing to split.
    pub fn unsplit(html: &str) -> Self {
        Self {
            markup: html.to_string(),
            node_count: 0,
            height: 0.0,
            oversized: false,
        }
    }
}

/// Mutable state of one splitting pass.
struct PaginationRun {
    usable_height: f32,
    pages: Vec<PageFragment>,
    current: Vec<usize>,
    current_height: f32,
}

impl PaginationRun {
    fn new(usable_height: f32) -> Self {
        Self {
            usable_height,
            pages: Vec::new(),
            current: Vec::new(),
            current_height: 0.0,
        }
    }

    fn fits(&self, extra: f32) -> bool {
        self.current.is_empty() || self.current_height + extra <= self.usable_height
    }

    fn push(&mut self, index: usize, height: f32) {
        self.current.push(index);
        self.current_height += height;
    }

    fn flush(&mut self, nodes: &[ContentNode]) {
        if self.current.is_empty() {
            return;
        }
        let markup: String = self.current.iter().map(|&i| nodes[i].markup()).collect();
        let oversized = self.current.len() == 1 && self.current_height > self.usable_height;
        self.pages.push(PageFragment {
            markup,
            node_count: self.current.len(),
            height: self.current_height,
            oversized,
        });
        self.current.clear();
        self.current_height = 0.0;
    }
}

/// Splits rendered HTML into page fragments using a [`Measure`] capability.
pub struct Paginator<M> {
    measurer: M,
    keep_with_header_px: f32,
    settle_delay: Duration,
    /// Held for the duration of a run: one measurement scaffold at a time.
    scaffold: Mutex<()>,
}

impl<M: Measure> Paginator<M> {
    pub fn new(measurer: M) -> Self {
        Self {
            measurer,
            keep_with_header_px: KEEP_WITH_HEADER_PX,
            settle_delay: DEFAULT_SETTLE_DELAY,
            scaffold: Mutex::new(()),
        }
    }

    pub fn with_keep_with_header(mut self, px: f32) -> Self {
        self.keep_with_header_px = px;
        self
    }

    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    pub fn measurer(&self) -> &M {
        &self.measurer
    }

    /// Partition the top-level blocks of `html` into pages.
    ///
    /// Concatenating the returned markup reproduces every top-level block
    /// once, in order. Input without any block comes back as a single
    /// unsplit fragment.
    pub async fn split_into_pages(
        &self,
        html: &str,
        stylesheet: &Stylesheet,
    ) -> Result<Vec<PageFragment>, PaginateError> {
        let nodes: Vec<ContentNode> = top_level_blocks(html)
            .into_iter()
            .map(ContentNode::new)
            .collect();
        if nodes.is_empty() {
            log::debug!("no top-level blocks, returning input unsplit");
            return Ok(vec![PageFragment::unsplit(html)]);
        }

        let _scaffold = self.scaffold.lock().await;
        settle(self.settle_delay).await;

        let mut heights: Vec<Option<f32>> = vec![None; nodes.len()];
        let mut run = PaginationRun::new(CONTENT_HEIGHT_PX);

        for i in 0..nodes.len() {
            let h = self.height(&nodes, &mut heights, i, stylesheet).await?;
            let needed = match nodes[i].kind {
                NodeKind::Heading(level) => {
                    h + self
                        .lookahead(&nodes, &mut heights, i, level, stylesheet)
                        .await?
                }
                NodeKind::Atomic | NodeKind::Block => h,
            };

            if !run.fits(needed) {
                log::debug!(
                    "page {} break before <{}> ({:.1}px used, {:.1}px needed)",
                    run.pages.len() + 1,
                    nodes[i].element.tag.name(),
                    run.current_height,
                    needed
                );
                run.flush(&nodes);
            }

            run.push(i, h);

            if h > run.usable_height {
                log::debug!(
                    "<{}> is taller than a page ({:.1}px), placing it alone",
                    nodes[i].element.tag.name(),
                    h
                );
                run.flush(&nodes);
            }
        }
        run.flush(&nodes);

        log::info!(
            "paginated {} blocks into {} pages",
            nodes.len(),
            run.pages.len()
        );
        Ok(run.pages)
    }

    /// Cached height of node `i` for this run.
    async fn height(
        &self,
        nodes: &[ContentNode],
        cache: &mut [Option<f32>],
        i: usize,
        stylesheet: &Stylesheet,
    ) -> Result<f32, MeasureError> {
        if let Some(h) = cache[i] {
            return Ok(h);
        }
        let h = self.measurer.measure(&nodes[i].element, stylesheet).await?;
        cache[i] = Some(h);
        Ok(h)
    }

    /// Height of the section content following heading `i`.
    ///
    /// Walks siblings until a heading of equal or shallower level, or until
    /// the accumulated height reaches the keep-with-header threshold. Whole
    /// node heights are summed since nodes are never split.
    async fn lookahead(
        &self,
        nodes: &[ContentNode],
        cache: &mut [Option<f32>],
        i: usize,
        level: u8,
        stylesheet: &Stylesheet,
    ) -> Result<f32, MeasureError> {
        let mut acc = 0.0;
        for j in i + 1..nodes.len() {
            if let NodeKind::Heading(next) = nodes[j].kind {
                if next <= level {
                    break;
                }
            }
            if acc >= self.keep_with_header_px {
                break;
            }
            acc += self.height(nodes, cache, j, stylesheet).await?;
        }
        Ok(acc)
    }
}
