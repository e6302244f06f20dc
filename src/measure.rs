//! Measurement adapter – the capability the splitter uses to learn how tall
//! a top-level node renders under a stylesheet at page content width.

use std::time::Duration;

use crate::dom::ElementNode;
use crate::error::MeasureError;
use crate::fonts::FontManager;
use crate::layout::HeightEstimator;
use crate::pagination::CONTENT_WIDTH_PX;
use crate::style::Stylesheet;

/// Reports the rendered box height of a node, vertical margins included.
///
/// Implementations may suspend; the splitter awaits every call in order.
#[allow(async_fn_in_trait)]
pub trait Measure {
    async fn measure(&self, node: &ElementNode, stylesheet: &Stylesheet)
        -> Result<f32, MeasureError>;
}

impl<M: Measure + ?Sized> Measure for &M {
    async fn measure(
        &self,
        node: &ElementNode,
        stylesheet: &Stylesheet,
    ) -> Result<f32, MeasureError> {
        (**self).measure(node, stylesheet).await
    }
}

/// Wait for the scaffold to lay out: yield one scheduler turn, then sleep
/// for `delay`.
pub async fn settle(delay: Duration) {
    tokio::task::yield_now().await;
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}

/// Deterministic measurer backed by font metrics and the Taffy estimator.
pub struct LayoutMeasurer {
    fonts: FontManager,
    content_width: f32,
}

impl LayoutMeasurer {
    pub fn new(fonts: FontManager) -> Self {
        Self {
            fonts,
            content_width: CONTENT_WIDTH_PX,
        }
    }

    pub fn fonts(&self) -> &FontManager {
        &self.fonts
    }

    pub fn content_width(&self) -> f32 {
        self.content_width
    }
}

impl Default for LayoutMeasurer {
    fn default() -> Self {
        Self::new(FontManager::default())
    }
}

impl Measure for LayoutMeasurer {
    async fn measure(
        &self,
        node: &ElementNode,
        stylesheet: &Stylesheet,
    ) -> Result<f32, MeasureError> {
        if self.fonts.is_empty() {
            return Err(MeasureError::Unavailable(
                "no font metrics loaded".to_string(),
            ));
        }
        HeightEstimator::new(stylesheet, &self.fonts, self.content_width)
            .estimate(node)
            .map_err(|e| MeasureError::Layout(e.to_string()))
    }
}
