//! HTML DOM – parses Markdown-rendered HTML into a small owned tree and
//! serialises it back to markup.
//!
//! Parsing is HTML5 tree construction (kuchiki over html5ever); the result
//! is copied into [`DomNode`]s so the splitter can clone and move blocks
//! freely. Tags the pipeline cares about get their own [`Tag`] variant:
//! - Block: div, p, h1-h6, ul, ol, li, table parts, pre, blockquote, figure,
//!   dl/dt/dd, hr
//! - Inline: span, strong, em, code, a, br, img
//! - Raw text: style, script
//!
//! Attribute order is preserved. Text is stored decoded, so serialising
//! normalises character references (`&copy;` comes back as `©`).

use kuchiki::traits::TendrilSink;
use kuchiki::{NodeData, NodeRef};

// ---------------------------------------------------------------------------
// DOM types
// ---------------------------------------------------------------------------

/// The tag name of an element.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Tag {
    Div,
    P,
    H1,
    H2,
    H3,
    H4,
    H5,
    H6,
    Ul,
    Ol,
    Li,
    Table,
    Thead,
    Tbody,
    Tfoot,
    Tr,
    Td,
    Th,
    Pre,
    Code,
    Blockquote,
    Figure,
    Figcaption,
    Img,
    Dl,
    Dt,
    Dd,
    Hr,
    Br,
    Span,
    Strong,
    Em,
    A,
    Style,
    Script,
    Body,
    Html,
    Head,
    /// Anything else; kept verbatim and laid out as a block.
    Unknown(String),
}

impl Tag {
    pub fn from_str(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "div" => Tag::Div,
            "p" => Tag::P,
            "h1" => Tag::H1,
            "h2" => Tag::H2,
            "h3" => Tag::H3,
            "h4" => Tag::H4,
            "h5" => Tag::H5,
            "h6" => Tag::H6,
            "ul" => Tag::Ul,
            "ol" => Tag::Ol,
            "li" => Tag::Li,
            "table" => Tag::Table,
            "thead" => Tag::Thead,
            "tbody" => Tag::Tbody,
            "tfoot" => Tag::Tfoot,
            "tr" => Tag::Tr,
            "td" => Tag::Td,
            "th" => Tag::Th,
            "pre" => Tag::Pre,
            "code" => Tag::Code,
            "blockquote" => Tag::Blockquote,
            "figure" => Tag::Figure,
            "figcaption" => Tag::Figcaption,
            "img" => Tag::Img,
            "dl" => Tag::Dl,
            "dt" => Tag::Dt,
            "dd" => Tag::Dd,
            "hr" => Tag::Hr,
            "br" => Tag::Br,
            "span" => Tag::Span,
            "strong" => Tag::Strong,
            "em" => Tag::Em,
            "a" => Tag::A,
            "style" => Tag::Style,
            "script" => Tag::Script,
            "body" => Tag::Body,
            "html" => Tag::Html,
            "head" => Tag::Head,
            other => Tag::Unknown(other.to_string()),
        }
    }

    /// Lower-case tag name used for serialisation and selector matching.
    pub fn name(&self) -> &str {
        match self {
            Tag::Div => "div",
            Tag::P => "p",
            Tag::H1 => "h1",
            Tag::H2 => "h2",
            Tag::H3 => "h3",
            Tag::H4 => "h4",
            Tag::H5 => "h5",
            Tag::H6 => "h6",
            Tag::Ul => "ul",
            Tag::Ol => "ol",
            Tag::Li => "li",
            Tag::Table => "table",
            Tag::Thead => "thead",
            Tag::Tbody => "tbody",
            Tag::Tfoot => "tfoot",
            Tag::Tr => "tr",
            Tag::Td => "td",
            Tag::Th => "th",
            Tag::Pre => "pre",
            Tag::Code => "code",
            Tag::Blockquote => "blockquote",
            Tag::Figure => "figure",
            Tag::Figcaption => "figcaption",
            Tag::Img => "img",
            Tag::Dl => "dl",
            Tag::Dt => "dt",
            Tag::Dd => "dd",
            Tag::Hr => "hr",
            Tag::Br => "br",
            Tag::Span => "span",
            Tag::Strong => "strong",
            Tag::Em => "em",
            Tag::A => "a",
            Tag::Style => "style",
            Tag::Script => "script",
            Tag::Body => "body",
            Tag::Html => "html",
            Tag::Head => "head",
            Tag::Unknown(name) => name,
        }
    }

    /// Section heading level, 1 being the shallowest.
    pub fn heading_level(&self) -> Option<u8> {
        match self {
            Tag::H1 => Some(1),
            Tag::H2 => Some(2),
            Tag::H3 => Some(3),
            Tag::H4 => Some(4),
            Tag::H5 => Some(5),
            Tag::H6 => Some(6),
            _ => None,
        }
    }

    /// Elements that must never be sliced by a page boundary.
    pub fn is_atomic(&self) -> bool {
        matches!(
            self,
            Tag::Table
                | Tag::Thead
                | Tag::Tbody
                | Tag::Tr
                | Tag::Pre
                | Tag::Blockquote
                | Tag::Ul
                | Tag::Ol
                | Tag::Figure
                | Tag::Img
                | Tag::Dl
        )
    }

    pub fn is_inline(&self) -> bool {
        match self {
            Tag::Span | Tag::Strong | Tag::Em | Tag::Code | Tag::A | Tag::Br => true,
            Tag::Unknown(n) => matches!(
                n.as_str(),
                "b" | "i" | "u" | "s" | "sub" | "sup" | "mark" | "small" | "kbd" | "del" | "ins"
            ),
            _ => false,
        }
    }

    /// Elements without children or a closing tag.
    pub fn is_void(&self) -> bool {
        matches!(self, Tag::Img | Tag::Br | Tag::Hr)
            || matches!(self, Tag::Unknown(n) if matches!(
                n.as_str(),
                "meta" | "link" | "input" | "source" | "wbr" | "col" | "area" | "embed" | "track"
                    | "param" | "base"
            ))
    }

    /// Elements whose content is not markup.
    pub fn is_raw_text(&self) -> bool {
        matches!(self, Tag::Style | Tag::Script)
    }
}

/// A node in our DOM tree.
#[derive(Debug, Clone, PartialEq)]
pub enum DomNode {
    Element(ElementNode),
    Text(String),
}

/// An element node carrying tag, attributes, and children.
#[derive(Debug, Clone, PartialEq)]
pub struct ElementNode {
    pub tag: Tag,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<DomNode>,
}

impl ElementNode {
    pub fn new(tag: Tag) -> Self {
        Self {
            tag,
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Builder-style attribute setter, replacing an existing value.
    pub fn with_attr(mut self, key: &str, value: &str) -> Self {
        self.set_attr(key, value);
        self
    }

    pub fn set_attr(&mut self, key: &str, value: &str) {
        match self.attributes.iter_mut().find(|(k, _)| k == key) {
            Some(slot) => slot.1 = value.to_string(),
            None => self.attributes.push((key.to_string(), value.to_string())),
        }
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    pub fn classes(&self) -> Vec<&str> {
        self.attr("class")
            .map(|c| c.split_whitespace().collect())
            .unwrap_or_default()
    }

    pub fn inline_style(&self) -> Option<&str> {
        self.attr("style")
    }

    pub fn src(&self) -> Option<&str> {
        self.attr("src")
    }

    /// Iterator over element children, skipping text.
    pub fn element_children(&self) -> impl Iterator<Item = &ElementNode> {
        self.children.iter().filter_map(|c| match c {
            DomNode::Element(e) => Some(e),
            DomNode::Text(_) => None,
        })
    }

    /// True when any descendant (not the element itself) satisfies `pred`.
    pub fn has_descendant(&self, pred: &impl Fn(&Tag) -> bool) -> bool {
        self.element_children()
            .any(|c| pred(&c.tag) || c.has_descendant(pred))
    }

    /// Concatenated text content of the subtree.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        collect_text(&self.children, &mut out);
        out
    }

    /// Serialise the element including its own tags.
    pub fn outer_html(&self) -> String {
        let mut out = String::new();
        write_element(self, &mut out);
        out
    }

    /// Serialise the children only.
    pub fn inner_html(&self) -> String {
        let mut out = String::new();
        for child in &self.children {
            write_node(child, self.tag.is_raw_text(), &mut out);
        }
        out
    }
}

impl DomNode {
    pub fn to_html(&self) -> String {
        let mut out = String::new();
        write_node(self, false, &mut out);
        out
    }

    pub fn as_element(&self) -> Option<&ElementNode> {
        match self {
            DomNode::Element(e) => Some(e),
            DomNode::Text(_) => None,
        }
    }
}

fn collect_text(nodes: &[DomNode], out: &mut String) {
    for node in nodes {
        match node {
            DomNode::Text(t) => out.push_str(t),
            DomNode::Element(e) if e.tag == Tag::Br => out.push('\n'),
            DomNode::Element(e) => collect_text(&e.children, out),
        }
    }
}

// ---------------------------------------------------------------------------
// Serialiser
// ---------------------------------------------------------------------------

fn write_node(node: &DomNode, raw: bool, out: &mut String) {
    match node {
        DomNode::Text(t) if raw => out.push_str(t),
        DomNode::Text(t) => out.push_str(&escape_text(t)),
        DomNode::Element(e) => write_element(e, out),
    }
}

fn write_element(e: &ElementNode, out: &mut String) {
    out.push('<');
    out.push_str(e.tag.name());
    for (key, value) in &e.attributes {
        out.push(' ');
        out.push_str(key);
        out.push_str("=\"");
        out.push_str(&escape_attr(value));
        out.push('"');
    }
    out.push('>');
    if e.tag.is_void() {
        return;
    }
    for child in &e.children {
        write_node(child, e.tag.is_raw_text(), out);
    }
    out.push_str("</");
    out.push_str(e.tag.name());
    out.push('>');
}

/// Escape text content for HTML.
pub fn escape_text(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('\u{00A0}', "&nbsp;")
}

/// Escape an attribute value for a double-quoted HTML attribute.
pub fn escape_attr(s: &str) -> String {
    s.replace('&', "&amp;").replace('"', "&quot;")
}

// ---------------------------------------------------------------------------
// Parser – HTML5 tree construction via kuchiki
// ---------------------------------------------------------------------------

/// Parse an HTML string and return the content of its `<body>`.
///
/// Fragments and full documents both work: the HTML5 tree builder supplies
/// the missing `html`/`head`/`body` wrappers, moves leading `<style>` and
/// `<meta>` into the head, decodes every named and numeric character
/// reference and drops unmatched end tags.
pub fn parse_html(html: &str) -> Vec<DomNode> {
    let document = kuchiki::parse_html().one(html);
    let body = document.descendants().find(|node| {
        node.as_element()
            .is_some_and(|el| el.name.local.as_ref().eq_ignore_ascii_case("body"))
    });
    match body {
        Some(body) => convert_children(&body),
        None => Vec::new(),
    }
}

fn convert_children(node: &NodeRef) -> Vec<DomNode> {
    node.children().filter_map(|child| convert(&child)).collect()
}

fn convert(node: &NodeRef) -> Option<DomNode> {
    match node.data() {
        NodeData::Element(data) => {
            let mut elem = ElementNode::new(Tag::from_str(data.name.local.as_ref()));
            for (name, attr) in data.attributes.borrow().map.iter() {
                elem.attributes
                    .push((name.local.to_string(), attr.value.clone()));
            }
            if !elem.tag.is_void() {
                elem.children = convert_children(node);
            }
            Some(DomNode::Element(elem))
        }
        NodeData::Text(text) => {
            let text = text.borrow();
            (!text.is_empty()).then(|| DomNode::Text(text.clone()))
        }
        // Comments, doctypes and processing instructions carry no content.
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Convenience helpers
// ---------------------------------------------------------------------------

/// Top-level block nodes of a content blob, in document order.
///
/// Embedded `<style>`/`<script>` elements are not content. Stray top-level
/// text is wrapped in a `<p>` so it still takes part in pagination.
pub fn top_level_blocks(html: &str) -> Vec<ElementNode> {
    parse_html(html)
        .into_iter()
        .filter_map(|node| match node {
            DomNode::Element(e) if e.tag.is_raw_text() || e.tag == Tag::Head => None,
            DomNode::Element(e) => Some(e),
            DomNode::Text(t) if t.trim().is_empty() => None,
            DomNode::Text(t) => {
                let mut p = ElementNode::new(Tag::P);
                p.children.push(DomNode::Text(t.trim().to_string()));
                Some(p)
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_simple_div() {
        let html = r#"<div class="note wide"><p>Hello</p></div>"#;
        let nodes = parse_html(html);
        assert_eq!(nodes.len(), 1);
        if let DomNode::Element(e) = &nodes[0] {
            assert_eq!(e.tag, Tag::Div);
            assert_eq!(e.classes(), vec!["note", "wide"]);
            assert_eq!(e.children.len(), 1);
        } else {
            panic!("Expected element");
        }
    }

    #[test]
    fn parse_void_img_without_slash() {
        let nodes = parse_html(r#"<p><img src="a.png" alt="x">caption</p>"#);
        let p = nodes[0].as_element().unwrap();
        assert_eq!(p.children.len(), 2);
        assert_eq!(p.element_children().next().unwrap().src(), Some("a.png"));
    }

    #[test]
    fn heading_levels() {
        assert_eq!(Tag::from_str("H4").heading_level(), Some(4));
        assert_eq!(Tag::P.heading_level(), None);
    }

    #[test]
    fn pre_preserves_whitespace() {
        let html = "<pre><code>fn main() {\n    <b>x</b>\n}</code></pre>";
        let nodes = parse_html(html);
        let pre = nodes[0].as_element().unwrap();
        assert_eq!(pre.text_content(), "fn main() {\n    x\n}");
    }

    #[test]
    fn round_trip_preserves_attribute_order() {
        let html = r#"<table class="t" id="x"><tbody><tr><td>a &amp; b</td></tr></tbody></table>"#;
        let nodes = parse_html(html);
        assert_eq!(nodes[0].to_html(), html);
    }

    #[test]
    fn style_content_is_raw() {
        let nodes = parse_html("<p>x</p><style>p > a { color: red; }</style>");
        assert_eq!(nodes.len(), 2);
        assert_eq!(nodes[1].to_html(), "<style>p > a { color: red; }</style>");
    }

    #[test]
    fn whitespace_between_inline_elements_survives() {
        let html = "<p><strong>bold</strong> <em>italic</em></p>";
        let nodes = parse_html(html);
        assert_eq!(nodes[0].to_html(), html);
        assert_eq!(nodes[0].as_element().unwrap().text_content(), "bold italic");
    }

    #[test]
    fn character_references_are_decoded() {
        let nodes = parse_html("<p>&copy; 2025 &mdash; caf&#233; &lt;tag&gt;</p>");
        let p = nodes[0].as_element().unwrap();
        assert_eq!(p.text_content(), "\u{a9} 2025 \u{2014} caf\u{e9} <tag>");
        assert_eq!(p.outer_html(), "<p>\u{a9} 2025 \u{2014} caf\u{e9} &lt;tag&gt;</p>");
    }

    #[test]
    fn stray_end_tag_does_not_end_the_document() {
        let blocks = top_level_blocks("<p>a</p></div><p>b</p></span><p>c</p>");
        let markup: String = blocks.iter().map(|b| b.outer_html()).collect();
        assert_eq!(markup, "<p>a</p><p>b</p><p>c</p>");
    }

    #[test]
    fn comments_and_doctype_are_dropped() {
        let blocks = top_level_blocks("<!DOCTYPE html><!-- note --><p>a<!-- inner -->b</p>");
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].outer_html(), "<p>ab</p>");
    }

    #[test]
    fn top_level_blocks_skip_style_and_wrap_text() {
        let blocks = top_level_blocks("<style>h1{}</style>loose words<h1>T</h1>");
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].tag, Tag::P);
        assert_eq!(blocks[1].tag, Tag::H1);
    }

    #[test]
    fn atomic_descendant_detection() {
        let nodes = parse_html("<div><p><img src=\"x.png\"></p></div>");
        let div = nodes[0].as_element().unwrap();
        assert!(div.has_descendant(&Tag::is_atomic));
    }

    #[test]
    fn lone_angle_bracket_is_text() {
        let nodes = parse_html("<p>1 < 2</p>");
        assert_eq!(nodes[0].as_element().unwrap().text_content(), "1 < 2");
    }
}
