//! Height estimator – builds a Taffy tree for one top-level element and
//! reports its margin-box height at a fixed content width.
//!
//! This is the deterministic stand-in for a browser layout pass: text is
//! word-wrapped with [`FontManager`] metrics into fixed-height leaves, block
//! boxes stack with their spacing, and table rows lay cells out side by side.

use taffy::prelude::*;
use taffy::{TaffyError, TaffyResult};

use crate::dom::{ElementNode, Tag};
use crate::fonts::{wrap_text, FontManager, TextRun};
use crate::style::{
    self, build_styled_tree, ComputedStyle, StyledNode, Stylesheet, WhiteSpace,
};

/// Height given to images whose size cannot be determined from attributes,
/// styles, or an embedded data URI.
pub const IMAGE_PLACEHOLDER_HEIGHT_PX: f32 = 200.0;

/// Estimates rendered heights against one stylesheet and content width.
pub struct HeightEstimator<'a> {
    sheet: &'a Stylesheet,
    fonts: &'a FontManager,
    content_width: f32,
    root_style: ComputedStyle,
    root_chain: Vec<ElementNode>,
}

impl<'a> HeightEstimator<'a> {
    pub fn new(sheet: &'a Stylesheet, fonts: &'a FontManager, content_width: f32) -> Self {
        let (root_style, root_chain) = sheet.page_root_style();
        Self {
            sheet,
            fonts,
            content_width,
            root_style,
            root_chain,
        }
    }

    /// Margin-box height of `element` placed directly inside the page body.
    pub fn estimate(&self, element: &ElementNode) -> Result<f32, TaffyError> {
        let ancestors: Vec<&ElementNode> = self.root_chain.iter().collect();
        let Some(styled) = build_styled_tree(element, self.sheet, &self.root_style, &ancestors)
        else {
            return Ok(0.0);
        };

        let mut builder = LayoutBuilder::new(self.fonts);
        let child = builder.build_node(&styled, self.content_width)?;

        // Flex column root: the child's margins stay inside the root box.
        let root_style = Style {
            display: taffy::Display::Flex,
            flex_direction: taffy::FlexDirection::Column,
            size: Size {
                width: taffy::Dimension::Length(self.content_width),
                height: taffy::Dimension::Auto,
            },
            ..Default::default()
        };
        let root = builder.taffy.new_with_children(root_style, &[child])?;
        builder.taffy.compute_layout(
            root,
            Size {
                width: AvailableSpace::Definite(self.content_width),
                height: AvailableSpace::MaxContent,
            },
        )?;
        Ok(builder.taffy.layout(root)?.size.height)
    }
}

// ---------------------------------------------------------------------------
// Build Taffy tree from styled nodes
// ---------------------------------------------------------------------------

struct LayoutBuilder<'a> {
    taffy: TaffyTree<()>,
    fonts: &'a FontManager,
}

impl<'a> LayoutBuilder<'a> {
    fn new(fonts: &'a FontManager) -> Self {
        Self {
            taffy: TaffyTree::new(),
            fonts,
        }
    }

    /// Flatten an inline subtree to text. `<br>` becomes a newline; other
    /// whitespace collapses unless the run preserves it.
    fn collect_inline_text(node: &StyledNode, out: &mut String) {
        match node {
            StyledNode::Text { text, style } => match style.white_space {
                WhiteSpace::Pre => out.push_str(text),
                WhiteSpace::Normal => {
                    let mut words = text.split_whitespace().peekable();
                    if text.starts_with(char::is_whitespace) && !out.ends_with([' ', '\n']) {
                        out.push(' ');
                    }
                    while let Some(w) = words.next() {
                        out.push_str(w);
                        if words.peek().is_some() {
                            out.push(' ');
                        }
                    }
                    if text.ends_with(char::is_whitespace) && !text.trim().is_empty() {
                        out.push(' ');
                    }
                }
            },
            StyledNode::Element { tag: Tag::Br, .. } => out.push('\n'),
            StyledNode::Element { children, .. } => {
                for c in children {
                    Self::collect_inline_text(c, out);
                }
            }
        }
    }

    /// True when every child is text or an inline element with inline
    /// children. Images are boxes of their own, never inline text.
    fn all_inline(children: &[StyledNode]) -> bool {
        children.iter().all(|c| match c {
            StyledNode::Text { .. } => true,
            StyledNode::Element {
                tag,
                style,
                children: gc,
                ..
            } => {
                *tag != Tag::Img
                    && style.display == style::Display::Inline
                    && Self::all_inline(gc)
            }
        })
    }

    fn build_node(&mut self, styled: &StyledNode, parent_width: f32) -> TaffyResult<NodeId> {
        match styled {
            StyledNode::Text { text, style } => {
                let text = match style.white_space {
                    WhiteSpace::Pre => text.clone(),
                    WhiteSpace::Normal => text.split_whitespace().collect::<Vec<_>>().join(" "),
                };
                if text.is_empty() {
                    return self.taffy.new_leaf(Style::default());
                }
                self.build_text_leaf(&text, style, parent_width, Style::default())
            }
            StyledNode::Element {
                tag,
                style,
                children,
                attrs,
            } => self.build_element_node(tag, style, children, attrs, parent_width),
        }
    }

    /// Fixed-height leaf holding `text` wrapped to `width`. `box_style`
    /// supplies the spacing of an enclosing block merged into the leaf.
    fn build_text_leaf(
        &mut self,
        text: &str,
        style: &ComputedStyle,
        width: f32,
        box_style: Style,
    ) -> TaffyResult<NodeId> {
        let run = TextRun {
            font_size: style.font_size,
            bold: style.is_bold(),
            italic: style.is_italic(),
            family: &style.font_family,
        };
        let text = match style.white_space {
            WhiteSpace::Pre => text.strip_suffix('\n').unwrap_or(text),
            WhiteSpace::Normal => text.trim_matches(' '),
        };
        let lines = wrap_text(text, run, width.max(1.0), self.fonts);
        let text_height =
            lines.len() as f32 * self.fonts.line_height_px(style.font_size, style.line_height);

        let min_height = match box_style.size.height {
            taffy::Dimension::Length(h) => h,
            _ => 0.0,
        };
        // Taffy sizes are border-box.
        let edge = |v: LengthPercentage| match v {
            LengthPercentage::Length(l) => l,
            _ => 0.0,
        };
        let vertical_edges = edge(box_style.padding.top)
            + edge(box_style.padding.bottom)
            + edge(box_style.border.top)
            + edge(box_style.border.bottom);
        let leaf = Style {
            size: Size {
                width: box_style.size.width,
                height: taffy::Dimension::Length(text_height.max(min_height) + vertical_edges),
            },
            ..box_style
        };
        self.taffy.new_leaf(leaf)
    }

    fn build_element_node(
        &mut self,
        tag: &Tag,
        style: &ComputedStyle,
        children: &[StyledNode],
        attrs: &[(String, String)],
        parent_width: f32,
    ) -> TaffyResult<NodeId> {
        let my_width = style
            .width
            .resolve(parent_width)
            .unwrap_or(parent_width - style.margin_left - style.margin_right);
        let my_width = match style.max_width.resolve(parent_width) {
            Some(max) => my_width.min(max),
            None => my_width,
        };
        let inner_width = (my_width
            - style.padding_left
            - style.padding_right
            - style.border_left
            - style.border_right)
            .max(1.0);

        if *tag == Tag::Img {
            let (w, h) = image_box(attrs, style, inner_width.max(parent_width));
            let mut ts = self.computed_to_taffy(style, tag);
            ts.size = Size {
                width: taffy::Dimension::Length(w),
                height: taffy::Dimension::Length(h),
            };
            return self.taffy.new_leaf(ts);
        }

        // Block whose content is all inline: one wrapped text leaf carrying
        // the block's own box.
        if !children.is_empty() && Self::all_inline(children) {
            let mut text = String::new();
            for c in children {
                Self::collect_inline_text(c, &mut text);
            }
            if !text.trim().is_empty() {
                let ts = self.computed_to_taffy(style, tag);
                return self.build_text_leaf(&text, style, inner_width, ts);
            }
        }

        // Table rows split their width evenly between cells.
        let cell_count = children
            .iter()
            .filter(|c| matches!(c, StyledNode::Element { .. }))
            .count()
            .max(1);
        let child_width = if *tag == Tag::Tr {
            (inner_width / cell_count as f32).max(1.0)
        } else {
            inner_width
        };

        let mut child_nodes = Vec::with_capacity(children.len());
        for child in children {
            child_nodes.push(self.build_node(child, child_width)?);
        }

        let ts = self.computed_to_taffy(style, tag);
        self.taffy.new_with_children(ts, &child_nodes)
    }

    fn computed_to_taffy(&self, s: &ComputedStyle, tag: &Tag) -> Style {
        let mut ts = Style {
            margin: Rect {
                top: LengthPercentageAuto::Length(s.margin_top),
                right: LengthPercentageAuto::Length(s.margin_right),
                bottom: LengthPercentageAuto::Length(s.margin_bottom),
                left: LengthPercentageAuto::Length(s.margin_left),
            },
            padding: Rect {
                top: LengthPercentage::Length(s.padding_top),
                right: LengthPercentage::Length(s.padding_right),
                bottom: LengthPercentage::Length(s.padding_bottom),
                left: LengthPercentage::Length(s.padding_left),
            },
            border: Rect {
                top: LengthPercentage::Length(s.border_top),
                right: LengthPercentage::Length(s.border_right),
                bottom: LengthPercentage::Length(s.border_bottom),
                left: LengthPercentage::Length(s.border_left),
            },
            size: Size {
                width: dim_to_taffy(s.width),
                height: dim_to_taffy(s.height),
            },
            max_size: Size {
                width: dim_to_taffy(s.max_width),
                height: taffy::Dimension::Auto,
            },
            ..Default::default()
        };

        // HTML table model: rows are flex rows of equal-basis cells.
        match tag {
            Tag::Table => {
                ts.display = taffy::Display::Flex;
                ts.flex_direction = taffy::FlexDirection::Column;
                ts.min_size.width = taffy::Dimension::Length(0.0);
            }
            Tag::Tr => {
                ts.display = taffy::Display::Flex;
                ts.flex_direction = taffy::FlexDirection::Row;
                ts.align_items = Some(taffy::AlignItems::Stretch);
                ts.size.width = taffy::Dimension::Percent(1.0);
                ts.min_size.width = taffy::Dimension::Length(0.0);
            }
            Tag::Td | Tag::Th => {
                ts.display = taffy::Display::Block;
                ts.flex_grow = 1.0;
                ts.flex_shrink = 1.0;
                ts.flex_basis = taffy::Dimension::Length(0.0);
                ts.min_size.width = taffy::Dimension::Length(0.0);
            }
            _ => {
                ts.display = match s.display {
                    style::Display::None => taffy::Display::None,
                    _ => taffy::Display::Block,
                };
            }
        }
        ts
    }
}

fn dim_to_taffy(d: style::Dimension) -> taffy::Dimension {
    match d {
        style::Dimension::Auto => taffy::Dimension::Auto,
        style::Dimension::Px(v) => taffy::Dimension::Length(v),
        style::Dimension::Percent(v) => taffy::Dimension::Percent(v / 100.0),
    }
}

// ---------------------------------------------------------------------------
// Image sizing
// ---------------------------------------------------------------------------

/// Width and height an image occupies, scaled down to fit `max_width`.
///
/// Sources in order: CSS size, `width`/`height` attributes, the intrinsic
/// size of a base64 data URI. Anything still unknown gets a placeholder.
fn image_box(attrs: &[(String, String)], style: &ComputedStyle, max_width: f32) -> (f32, f32) {
    let attr = |name: &str| {
        attrs
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .and_then(|(_, v)| v.trim().trim_end_matches("px").parse::<f32>().ok())
    };
    let src = attrs
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case("src"))
        .map(|(_, v)| v.as_str())
        .unwrap_or("");

    let known_w = style.width.resolve(max_width).or_else(|| attr("width"));
    let known_h = match style.height {
        style::Dimension::Px(h) => Some(h),
        _ => attr("height"),
    };

    let (w, h) = match (known_w, known_h) {
        (Some(w), Some(h)) => (w, h),
        (w, h) => match intrinsic_size(src) {
            Some((iw, ih)) => {
                let aspect = iw / ih;
                match (w, h) {
                    (Some(w), None) => (w, w / aspect),
                    (None, Some(h)) => (h * aspect, h),
                    _ => (iw, ih),
                }
            }
            None => (
                w.unwrap_or(max_width),
                h.unwrap_or(IMAGE_PLACEHOLDER_HEIGHT_PX),
            ),
        },
    };

    if w > max_width && w > 0.0 {
        (max_width, h * max_width / w)
    } else {
        (w, h)
    }
}

/// Pixel size of a base64 data-URI image, if it decodes.
fn intrinsic_size(src: &str) -> Option<(f32, f32)> {
    use base64::{engine::general_purpose::STANDARD as BASE64_STD, Engine as _};

    if !src.starts_with("data:") || !src.contains(";base64,") {
        return None;
    }
    let comma = src.find(',')?;
    let bytes = BASE64_STD.decode(src[comma + 1..].trim()).ok()?;
    let (w, h) = ::image::ImageReader::new(std::io::Cursor::new(bytes))
        .with_guessed_format()
        .ok()?
        .into_dimensions()
        .ok()?;
    if w == 0 || h == 0 {
        return None;
    }
    Some((w as f32, h as f32))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::parse_html;

    fn estimate(html: &str, css: &str) -> f32 {
        let sheet = Stylesheet::parse(css);
        let fonts = FontManager::default();
        let est = HeightEstimator::new(&sheet, &fonts, 600.0);
        let el = parse_html(html)[0].as_element().unwrap().clone();
        est.estimate(&el).unwrap()
    }

    #[test]
    fn paragraph_height_includes_margins() {
        // 16px font, line-height 1.5 => 24px line, plus 10px margins each side.
        let h = estimate(
            "<p>Hello world</p>",
            "p { font-size: 16px; line-height: 1.5; margin: 10px 0; }",
        );
        assert!((h - 44.0).abs() < 0.5, "got {h}");
    }

    #[test]
    fn long_text_wraps_to_more_lines() {
        let css = "* { margin: 0; } p { font-size: 10px; line-height: 1; }";
        let short = estimate("<p>word</p>", css);
        let long = estimate(&format!("<p>{}</p>", "word ".repeat(400)), css);
        assert!(long > short * 5.0, "short {short}, long {long}");
    }

    #[test]
    fn br_forces_new_line() {
        let css = "* { margin: 0; } p { font-size: 10px; line-height: 1; }";
        let one = estimate("<p>a b</p>", css);
        let two = estimate("<p>a<br>b</p>", css);
        assert!((two - 2.0 * one).abs() < 0.5);
    }

    #[test]
    fn pre_keeps_every_line() {
        let css = "* { margin: 0; } pre { font-size: 10px; line-height: 1; }";
        let h = estimate("<pre><code>a\nb\nc\n</code></pre>", css);
        assert!((h - 30.0).abs() < 0.5, "got {h}");
    }

    #[test]
    fn table_rows_stack() {
        let css = "* { margin: 0; padding: 0; } td { font-size: 10px; line-height: 1; }";
        let one = estimate("<table><tr><td>a</td><td>b</td></tr></table>", css);
        let three = estimate(
            "<table><tr><td>a</td></tr><tr><td>b</td></tr><tr><td>c</td></tr></table>",
            css,
        );
        assert!((one - 10.0).abs() < 0.5, "got {one}");
        assert!((three - 30.0).abs() < 0.5, "got {three}");
    }

    #[test]
    fn image_attributes_size_the_box() {
        let h = estimate(r#"<img src="x.png" width="100" height="80">"#, "* { margin: 0; }");
        assert!((h - 80.0).abs() < 0.5);
    }

    #[test]
    fn unknown_image_gets_placeholder() {
        let h = estimate(r#"<img src="missing.png">"#, "* { margin: 0; }");
        assert!((h - IMAGE_PLACEHOLDER_HEIGHT_PX).abs() < 0.5);
    }

    #[test]
    fn wide_image_scales_to_width() {
        let h = estimate(r#"<img src="x.png" width="1200" height="600">"#, "* { margin: 0; }");
        assert!((h - 300.0).abs() < 0.5, "got {h}");
    }

    #[test]
    fn hidden_element_has_no_height() {
        assert_eq!(estimate(r#"<p style="display: none">x</p>"#, ""), 0.0);
    }

    #[test]
    fn spaced_inline_runs_measure_like_plain_text() {
        let css = "* { margin: 0; } p { font-size: 10px; line-height: 1; }";
        let plain = estimate(&format!("<p>{}</p>", "bold italic ".repeat(60)), css);
        let marked = estimate(
            &format!("<p>{}</p>", "<strong>bold</strong> <em>italic</em> ".repeat(60)),
            css,
        );
        assert!(marked >= plain, "plain {plain}, marked {marked}");
    }
}
