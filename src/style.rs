//! Style resolver – parses theme stylesheets and resolves a flat
//! [`ComputedStyle`] per element for the height estimator.
//!
//! Only what affects vertical geometry is modelled: box spacing, borders,
//! explicit sizes, and the typography that drives line wrapping. Selectors
//! are limited to type / class compounds joined by descendant (or child)
//! combinators; anything with pseudo-classes or attribute filters is
//! ignored.

use crate::dom::{DomNode, ElementNode, Tag};
use crate::pagination::MM_TO_PX;

/// Root font size in px (`rem`).
pub const ROOT_FONT_SIZE_PX: f32 = 16.0;

/// Line height used for `line-height: normal`.
pub const NORMAL_LINE_HEIGHT: f32 = 1.2;

/// Fully resolved style for a single element.
#[derive(Debug, Clone, PartialEq)]
pub struct ComputedStyle {
    pub display: Display,

    // Sizing
    pub width: Dimension,
    pub height: Dimension,
    pub max_width: Dimension,

    // Spacing (px)
    pub margin_top: f32,
    pub margin_right: f32,
    pub margin_bottom: f32,
    pub margin_left: f32,
    pub padding_top: f32,
    pub padding_right: f32,
    pub padding_bottom: f32,
    pub padding_left: f32,

    // Border widths (px)
    pub border_top: f32,
    pub border_right: f32,
    pub border_bottom: f32,
    pub border_left: f32,

    // Typography (inherited)
    pub font_size: f32,
    pub font_weight: FontWeight,
    pub font_style: FontStyle,
    pub font_family: String,
    /// Multiplier of `font_size`.
    pub line_height: f32,
    pub white_space: WhiteSpace,
}

impl Default for ComputedStyle {
    fn default() -> Self {
        Self {
            display: Display::Block,
            width: Dimension::Auto,
            height: Dimension::Auto,
            max_width: Dimension::Auto,
            margin_top: 0.0,
            margin_right: 0.0,
            margin_bottom: 0.0,
            margin_left: 0.0,
            padding_top: 0.0,
            padding_right: 0.0,
            padding_bottom: 0.0,
            padding_left: 0.0,
            border_top: 0.0,
            border_right: 0.0,
            border_bottom: 0.0,
            border_left: 0.0,
            font_size: ROOT_FONT_SIZE_PX,
            font_weight: FontWeight::Normal,
            font_style: FontStyle::Normal,
            font_family: "Helvetica".to_string(),
            line_height: NORMAL_LINE_HEIGHT,
            white_space: WhiteSpace::Normal,
        }
    }
}

impl ComputedStyle {
    /// Style a child starts from: inherited typography, initial box values.
    pub fn inherit(&self) -> Self {
        Self {
            font_size: self.font_size,
            font_weight: self.font_weight,
            font_style: self.font_style,
            font_family: self.font_family.clone(),
            line_height: self.line_height,
            white_space: self.white_space,
            ..Self::default()
        }
    }

    pub fn vertical_margins(&self) -> f32 {
        self.margin_top + self.margin_bottom
    }

    pub fn horizontal_extent(&self) -> f32 {
        self.margin_left
            + self.margin_right
            + self.padding_left
            + self.padding_right
            + self.border_left
            + self.border_right
    }

    pub fn is_bold(&self) -> bool {
        self.font_weight == FontWeight::Bold
    }

    pub fn is_italic(&self) -> bool {
        self.font_style == FontStyle::Italic
    }
}

// ---------------------------------------------------------------------------
// Supporting enums
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Display {
    Block,
    Inline,
    InlineBlock,
    ListItem,
    Table,
    TableRow,
    TableCell,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontWeight {
    Normal,
    Bold,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontStyle {
    Normal,
    Italic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WhiteSpace {
    Normal,
    /// Newlines are preserved (`pre`, `pre-wrap`, `pre-line`).
    Pre,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Dimension {
    Auto,
    Px(f32),
    Percent(f32),
}

impl Dimension {
    pub fn resolve(&self, container: f32) -> Option<f32> {
        match self {
            Dimension::Auto => None,
            Dimension::Px(v) => Some(*v),
            Dimension::Percent(p) => Some(container * p / 100.0),
        }
    }
}

// ---------------------------------------------------------------------------
// Stylesheet model
// ---------------------------------------------------------------------------

/// One compound selector: an optional type plus required classes.
#[derive(Debug, Clone, PartialEq)]
struct Compound {
    /// `None` for `*` or a bare class compound.
    tag: Option<String>,
    classes: Vec<String>,
}

impl Compound {
    fn matches(&self, el: &ElementRef<'_>) -> bool {
        if let Some(t) = &self.tag {
            if t != el.tag {
                return false;
            }
        }
        self.classes.iter().all(|c| el.classes.iter().any(|ec| ec == c))
    }
}

/// Descendant chain of compounds, outermost first.
#[derive(Debug, Clone, PartialEq)]
struct Selector {
    parts: Vec<Compound>,
    specificity: (usize, usize),
}

impl Selector {
    fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        if text.is_empty() || text.contains([':', '[', '#', '+', '~']) {
            return None;
        }
        let mut parts = Vec::new();
        for token in text.split(|c: char| c.is_whitespace() || c == '>') {
            if token.is_empty() {
                continue;
            }
            let mut pieces = token.split('.');
            let head = pieces.next().unwrap_or("");
            let tag = match head {
                "" | "*" => None,
                t if t.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') => {
                    Some(t.to_ascii_lowercase())
                }
                _ => return None,
            };
            let classes: Vec<String> = pieces.map(str::to_string).collect();
            if classes.iter().any(String::is_empty) {
                return None;
            }
            parts.push(Compound { tag, classes });
        }
        if parts.is_empty() {
            return None;
        }
        let specificity = (
            parts.iter().map(|p| p.classes.len()).sum(),
            parts.iter().filter(|p| p.tag.is_some()).count(),
        );
        Some(Self { parts, specificity })
    }

    /// `ancestors` is outermost first and excludes `el`.
    fn matches(&self, el: &ElementRef<'_>, ancestors: &[ElementRef<'_>]) -> bool {
        let Some((last, rest)) = self.parts.split_last() else {
            return false;
        };
        if !last.matches(el) {
            return false;
        }
        let mut remaining = ancestors;
        for part in rest.iter().rev() {
            match remaining.iter().rposition(|a| part.matches(a)) {
                Some(i) => remaining = &remaining[..i],
                None => return false,
            }
        }
        true
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Rule {
    selectors: Vec<Selector>,
    declarations: Vec<(String, String)>,
}

/// Borrowed view of an element used for selector matching.
#[derive(Debug, Clone)]
pub struct ElementRef<'a> {
    pub tag: &'a str,
    pub classes: Vec<&'a str>,
}

impl<'a> ElementRef<'a> {
    pub fn of(el: &'a ElementNode) -> Self {
        Self {
            tag: el.tag.name(),
            classes: el.classes(),
        }
    }
}

/// A parsed stylesheet.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Stylesheet {
    rules: Vec<Rule>,
    /// Custom properties declared on `:root`.
    vars: Vec<(String, String)>,
}

impl Stylesheet {
    /// Parse CSS text. Unsupported constructs are skipped, never rejected.
    pub fn parse(css: &str) -> Self {
        let css = strip_comments(css);
        let mut sheet = Stylesheet::default();
        let bytes = css.as_bytes();
        let mut pos = 0;

        while pos < bytes.len() {
            while pos < bytes.len() && bytes[pos].is_ascii_whitespace() {
                pos += 1;
            }
            if pos >= bytes.len() {
                break;
            }
            if bytes[pos] == b'@' {
                pos = skip_at_rule(&css, pos);
                continue;
            }
            let Some(open) = css[pos..].find('{').map(|i| pos + i) else {
                break;
            };
            let close = matching_brace(&css, open);
            let prelude = css[pos..open].trim();
            let body = &css[open + 1..close.min(css.len())];
            pos = (close + 1).min(css.len());

            let declarations = parse_declarations(body);
            if prelude == ":root" {
                sheet.vars.extend(
                    declarations
                        .into_iter()
                        .filter(|(k, _)| k.starts_with("--")),
                );
                continue;
            }
            let selectors: Vec<Selector> = prelude.split(',').filter_map(Selector::parse).collect();
            if !selectors.is_empty() && !declarations.is_empty() {
                sheet.rules.push(Rule {
                    selectors,
                    declarations,
                });
            }
        }
        sheet
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    /// Value of a `:root` custom property.
    pub fn var(&self, name: &str) -> Option<&str> {
        self.vars
            .iter()
            .rev()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Sheet declarations matching `el`, in cascade order.
    fn matching_declarations(
        &self,
        el: &ElementRef<'_>,
        ancestors: &[ElementRef<'_>],
    ) -> Vec<(String, String)> {
        let mut matched: Vec<((usize, usize), usize, &Rule)> = Vec::new();
        for (order, rule) in self.rules.iter().enumerate() {
            let best = rule
                .selectors
                .iter()
                .filter(|s| s.matches(el, ancestors))
                .map(|s| s.specificity)
                .max();
            if let Some(specificity) = best {
                matched.push((specificity, order, rule));
            }
        }
        matched.sort_by_key(|(specificity, order, _)| (*specificity, *order));
        matched
            .into_iter()
            .flat_map(|(_, _, rule)| rule.declarations.iter().cloned())
            .map(|(k, v)| {
                let v = self.substitute_vars(&v);
                (k, v)
            })
            .collect()
    }

    fn substitute_vars(&self, value: &str) -> String {
        let mut out = value.to_string();
        // Bounded so self-referencing variables cannot loop forever.
        for _ in 0..8 {
            let Some(start) = out.find("var(") else {
                break;
            };
            let end = matching_paren(&out, start + 3);
            let inner = &out[start + 4..end];
            let (name, fallback) = match inner.split_once(',') {
                Some((n, f)) => (n.trim(), Some(f.trim())),
                None => (inner.trim(), None),
            };
            let replacement = self
                .var(name)
                .or(fallback)
                .unwrap_or("")
                .to_string();
            out.replace_range(start..(end + 1).min(out.len()), &replacement);
        }
        out
    }

    /// Resolve the style of `el` given its parent style and ancestor chain.
    pub fn resolve(
        &self,
        el: &ElementNode,
        parent: &ComputedStyle,
        ancestors: &[ElementRef<'_>],
    ) -> ComputedStyle {
        let mut declarations: Vec<(String, String)> = ua_declarations(&el.tag)
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        declarations.extend(self.matching_declarations(&ElementRef::of(el), ancestors));
        if let Some(inline) = el.inline_style() {
            declarations.extend(
                parse_declarations(inline)
                    .into_iter()
                    .map(|(k, v)| (k, self.substitute_vars(&v))),
            );
        }
        compute(&declarations, parent)
    }

    /// Style of the off-screen page scaffold: `html > body > div.page`.
    pub fn page_root_style(&self) -> (ComputedStyle, Vec<ElementNode>) {
        let chain = [
            ElementNode::new(Tag::Html),
            ElementNode::new(Tag::Body),
            ElementNode::new(Tag::Div).with_attr("class", "page"),
        ];
        let mut style = ComputedStyle::default();
        for (i, el) in chain.iter().enumerate() {
            let ancestors: Vec<ElementRef<'_>> = chain[..i].iter().map(ElementRef::of).collect();
            style = self.resolve(el, &style.inherit(), &ancestors);
        }
        (style, chain.to_vec())
    }
}

/// Apply declarations in cascade order. `font-size` is resolved first so
/// that `em` lengths in the remaining properties use the element's own size.
fn compute(declarations: &[(String, String)], parent: &ComputedStyle) -> ComputedStyle {
    let mut s = parent.inherit();
    for (prop, val) in declarations {
        if prop == "font-size" {
            if let Some(px) = parse_font_size(val, parent.font_size) {
                s.font_size = px;
            }
        }
    }
    for (prop, val) in declarations {
        if prop != "font-size" {
            apply_css_property(&mut s, prop, val);
        }
    }
    s
}

/// User-agent defaults, modelled on the HTML rendering section.
fn ua_declarations(tag: &Tag) -> &'static [(&'static str, &'static str)] {
    match tag {
        Tag::H1 => &[("font-size", "2em"), ("font-weight", "bold"), ("margin", "0.67em 0")],
        Tag::H2 => &[("font-size", "1.5em"), ("font-weight", "bold"), ("margin", "0.83em 0")],
        Tag::H3 => &[("font-size", "1.17em"), ("font-weight", "bold"), ("margin", "1em 0")],
        Tag::H4 => &[("font-weight", "bold"), ("margin", "1.33em 0")],
        Tag::H5 => &[("font-size", "0.83em"), ("font-weight", "bold"), ("margin", "1.67em 0")],
        Tag::H6 => &[("font-size", "0.67em"), ("font-weight", "bold"), ("margin", "2.33em 0")],
        Tag::P | Tag::Dl => &[("margin", "1em 0")],
        Tag::Ul | Tag::Ol => &[("margin", "1em 0"), ("padding-left", "40px")],
        Tag::Li => &[("display", "list-item")],
        Tag::Blockquote | Tag::Figure => &[("margin", "1em 40px")],
        Tag::Dd => &[("margin-left", "40px")],
        Tag::Pre => &[
            ("margin", "1em 0"),
            ("font-family", "monospace"),
            ("white-space", "pre"),
        ],
        Tag::Code => &[("display", "inline"), ("font-family", "monospace")],
        Tag::Hr => &[("margin", "0.5em 0"), ("border-width", "1px")],
        Tag::Table => &[("display", "table")],
        Tag::Tr => &[("display", "table-row")],
        Tag::Td => &[("display", "table-cell"), ("padding", "1px")],
        Tag::Th => &[("display", "table-cell"), ("padding", "1px"), ("font-weight", "bold")],
        Tag::Img => &[("display", "inline-block")],
        Tag::Strong => &[("display", "inline"), ("font-weight", "bold")],
        Tag::Em => &[("display", "inline"), ("font-style", "italic")],
        Tag::Span | Tag::A | Tag::Br => &[("display", "inline")],
        Tag::Style | Tag::Script | Tag::Head => &[("display", "none")],
        Tag::Unknown(_) if tag.is_inline() => &[("display", "inline")],
        _ => &[],
    }
}

fn apply_css_property(s: &mut ComputedStyle, prop: &str, val: &str) {
    let fs = s.font_size;
    match prop {
        "display" => {
            s.display = match val {
                "block" | "flex" | "grid" => Display::Block,
                "inline" => Display::Inline,
                "inline-block" | "inline-flex" => Display::InlineBlock,
                "list-item" => Display::ListItem,
                "table" => Display::Table,
                "table-row" => Display::TableRow,
                "table-cell" => Display::TableCell,
                "none" => Display::None,
                _ => s.display,
            }
        }
        "font-family" => s.font_family = val.to_string(),
        "font-weight" => {
            s.font_weight = match val {
                "bold" | "bolder" | "600" | "700" | "800" | "900" => FontWeight::Bold,
                _ => FontWeight::Normal,
            }
        }
        "font-style" => {
            s.font_style = match val {
                "italic" | "oblique" => FontStyle::Italic,
                _ => FontStyle::Normal,
            }
        }
        "line-height" => {
            if val == "normal" {
                s.line_height = NORMAL_LINE_HEIGHT;
            } else if let Ok(v) = val.parse::<f32>() {
                s.line_height = v;
            } else if let Some(p) = val.strip_suffix('%').and_then(|p| p.trim().parse::<f32>().ok()) {
                s.line_height = p / 100.0;
            } else if let Some(px) = parse_length(val, fs) {
                if fs > 0.0 {
                    s.line_height = px / fs;
                }
            }
        }
        "white-space" => {
            s.white_space = match val {
                "pre" | "pre-wrap" | "pre-line" | "break-spaces" => WhiteSpace::Pre,
                _ => WhiteSpace::Normal,
            }
        }
        "width" => s.width = parse_dimension(val, fs),
        "height" => s.height = parse_dimension(val, fs),
        "max-width" => s.max_width = parse_dimension(val, fs),
        "margin" => apply_shorthand_spacing(
            val,
            fs,
            [
                &mut s.margin_top,
                &mut s.margin_right,
                &mut s.margin_bottom,
                &mut s.margin_left,
            ],
        ),
        "margin-top" => set_length(&mut s.margin_top, val, fs),
        "margin-right" => set_length(&mut s.margin_right, val, fs),
        "margin-bottom" => set_length(&mut s.margin_bottom, val, fs),
        "margin-left" => set_length(&mut s.margin_left, val, fs),
        "padding" => apply_shorthand_spacing(
            val,
            fs,
            [
                &mut s.padding_top,
                &mut s.padding_right,
                &mut s.padding_bottom,
                &mut s.padding_left,
            ],
        ),
        "padding-top" => set_length(&mut s.padding_top, val, fs),
        "padding-right" => set_length(&mut s.padding_right, val, fs),
        "padding-bottom" => set_length(&mut s.padding_bottom, val, fs),
        "padding-left" => set_length(&mut s.padding_left, val, fs),
        "border" => {
            let w = border_width(val, fs);
            s.border_top = w;
            s.border_right = w;
            s.border_bottom = w;
            s.border_left = w;
        }
        "border-width" => apply_shorthand_spacing(
            val,
            fs,
            [
                &mut s.border_top,
                &mut s.border_right,
                &mut s.border_bottom,
                &mut s.border_left,
            ],
        ),
        "border-top" => s.border_top = border_width(val, fs),
        "border-right" => s.border_right = border_width(val, fs),
        "border-bottom" => s.border_bottom = border_width(val, fs),
        "border-left" => s.border_left = border_width(val, fs),
        _ => {}
    }
}

fn set_length(slot: &mut f32, val: &str, font_size: f32) {
    if val == "auto" {
        *slot = 0.0;
    } else if let Some(px) = parse_length(val, font_size) {
        *slot = px;
    }
}

/// Width component of a `border` shorthand; `none`/`hidden` mean zero.
fn border_width(val: &str, font_size: f32) -> f32 {
    if val.split_whitespace().any(|t| t == "none" || t == "hidden") {
        return 0.0;
    }
    val.split_whitespace()
        .find_map(|t| match t {
            "thin" => Some(1.0),
            "medium" => Some(3.0),
            "thick" => Some(5.0),
            _ => parse_length(t, font_size),
        })
        .unwrap_or(0.0)
}

/// Parse a CSS length into px. Percentages are not lengths here.
pub fn parse_length(val: &str, font_size: f32) -> Option<f32> {
    let v = val.trim();
    if v == "0" {
        return Some(0.0);
    }
    let units: [(&str, f32); 8] = [
        ("px", 1.0),
        ("pt", 96.0 / 72.0),
        ("pc", 16.0),
        ("mm", MM_TO_PX),
        ("cm", MM_TO_PX * 10.0),
        ("in", 96.0),
        ("rem", ROOT_FONT_SIZE_PX),
        ("em", font_size),
    ];
    for (suffix, factor) in units {
        if let Some(num) = v.strip_suffix(suffix) {
            return num.trim().parse::<f32>().ok().map(|n| n * factor);
        }
    }
    None
}

fn parse_font_size(val: &str, parent_size: f32) -> Option<f32> {
    let v = val.trim();
    if let Some(p) = v.strip_suffix('%') {
        return p.trim().parse::<f32>().ok().map(|p| parent_size * p / 100.0);
    }
    match v {
        "xx-small" => Some(9.0),
        "x-small" => Some(10.0),
        "small" => Some(13.0),
        "medium" => Some(16.0),
        "large" => Some(18.0),
        "x-large" => Some(24.0),
        "xx-large" => Some(32.0),
        "smaller" => Some(parent_size / 1.2),
        "larger" => Some(parent_size * 1.2),
        _ => parse_length(v, parent_size),
    }
}

fn parse_dimension(s: &str, font_size: f32) -> Dimension {
    let s = s.trim();
    if s == "auto" {
        Dimension::Auto
    } else if let Some(p) = s.strip_suffix('%') {
        p.parse::<f32>()
            .map(Dimension::Percent)
            .unwrap_or(Dimension::Auto)
    } else {
        parse_length(s, font_size)
            .map(Dimension::Px)
            .unwrap_or(Dimension::Auto)
    }
}

/// Expand a 1–4 value box shorthand into top/right/bottom/left.
fn apply_shorthand_spacing(val: &str, font_size: f32, [top, right, bottom, left]: [&mut f32; 4]) {
    let parts: Vec<f32> = val
        .split_whitespace()
        .map(|p| match p {
            "auto" => Some(0.0),
            _ => parse_length(p, font_size),
        })
        .collect::<Option<Vec<f32>>>()
        .unwrap_or_default();
    let (t, r, b, l) = match parts.as_slice() {
        [a] => (*a, *a, *a, *a),
        [v, h] => (*v, *h, *v, *h),
        [t, h, b] => (*t, *h, *b, *h),
        [t, r, b, l] => (*t, *r, *b, *l),
        _ => return,
    };
    *top = t;
    *right = r;
    *bottom = b;
    *left = l;
}

// ---------------------------------------------------------------------------
// CSS text scanning
// ---------------------------------------------------------------------------

fn strip_comments(css: &str) -> String {
    let mut out = String::with_capacity(css.len());
    let mut rest = css;
    while let Some(start) = rest.find("/*") {
        out.push_str(&rest[..start]);
        match rest[start + 2..].find("*/") {
            Some(end) => rest = &rest[start + 2 + end + 2..],
            None => {
                rest = "";
                break;
            }
        }
    }
    out.push_str(rest);
    out
}

/// Skip an at-rule starting at `pos`: either a `;`-terminated statement or
/// a block with nested braces. Quoted strings and `url(...)` arguments may
/// hold `;` without ending the statement.
fn skip_at_rule(css: &str, pos: usize) -> usize {
    let bytes = css.as_bytes();
    let mut quote: Option<u8> = None;
    let mut parens = 0usize;
    let mut i = pos;
    while i < bytes.len() {
        let b = bytes[i];
        match quote {
            Some(_) if b == b'\\' => i += 1,
            Some(q) if b == q => quote = None,
            Some(_) => {}
            None => match b {
                b'"' | b'\'' => quote = Some(b),
                b'(' => parens += 1,
                b')' => parens = parens.saturating_sub(1),
                b';' if parens == 0 => return i + 1,
                b'{' if parens == 0 => return (matching_brace(css, i) + 1).min(css.len()),
                _ => {}
            },
        }
        i += 1;
    }
    css.len()
}

/// Index of the brace closing the one at `open`, or `css.len()`.
fn matching_brace(css: &str, open: usize) -> usize {
    let mut depth = 0usize;
    for (i, b) in css.bytes().enumerate().skip(open) {
        match b {
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return i;
                }
            }
            _ => {}
        }
    }
    css.len()
}

/// Index of the parenthesis closing the one at `open`, or the last index.
fn matching_paren(s: &str, open: usize) -> usize {
    let mut depth = 0usize;
    for (i, b) in s.bytes().enumerate().skip(open) {
        match b {
            b'(' => depth += 1,
            b')' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return i;
                }
            }
            _ => {}
        }
    }
    s.len().saturating_sub(1)
}

/// Split a declaration block on `;` outside quotes and parentheses.
fn parse_declarations(body: &str) -> Vec<(String, String)> {
    let mut decls = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut start = 0;
    let mut push = |piece: &str, decls: &mut Vec<(String, String)>| {
        if let Some((prop, val)) = piece.split_once(':') {
            let prop = prop.trim().to_ascii_lowercase();
            let val = val.trim().trim_end_matches("!important").trim().to_string();
            if !prop.is_empty() && !val.is_empty() {
                decls.push((prop, val));
            }
        }
    };
    for (i, c) in body.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, '(') => depth += 1,
            (None, ')') => depth = depth.saturating_sub(1),
            (None, ';') if depth == 0 => {
                push(&body[start..i], &mut decls);
                start = i + 1;
            }
            _ => {}
        }
    }
    push(&body[start..], &mut decls);
    decls
}

// ---------------------------------------------------------------------------
// Styled DOM tree
// ---------------------------------------------------------------------------

/// A DOM node annotated with its computed style.
#[derive(Debug, Clone)]
pub enum StyledNode {
    Element {
        tag: Tag,
        style: ComputedStyle,
        children: Vec<StyledNode>,
        /// Original attributes (image src, width/height hints).
        attrs: Vec<(String, String)>,
    },
    Text {
        text: String,
        style: ComputedStyle,
    },
}

impl StyledNode {
    pub fn style(&self) -> &ComputedStyle {
        match self {
            StyledNode::Element { style, .. } | StyledNode::Text { style, .. } => style,
        }
    }
}

/// Build a styled tree for one element, resolving styles top-down.
///
/// `ancestors` is the chain above `element`, outermost first. Elements with
/// `display: none` are dropped.
pub fn build_styled_tree(
    element: &ElementNode,
    sheet: &Stylesheet,
    parent_style: &ComputedStyle,
    ancestors: &[&ElementNode],
) -> Option<StyledNode> {
    let refs: Vec<ElementRef<'_>> = ancestors.iter().map(|a| ElementRef::of(a)).collect();
    let style = sheet.resolve(element, parent_style, &refs);
    if style.display == Display::None {
        return None;
    }

    let mut chain: Vec<&ElementNode> = ancestors.to_vec();
    chain.push(element);

    // Whitespace between inline siblings is a word gap; between blocks it
    // is formatting.
    let mut element_children = element.element_children().peekable();
    let inline_context = element_children.peek().is_some()
        && element_children.all(|e| e.tag.is_inline());

    let mut children = Vec::new();
    for child in &element.children {
        match child {
            DomNode::Element(e) => {
                if let Some(styled) = build_styled_tree(e, sheet, &style, &chain) {
                    children.push(styled);
                }
            }
            DomNode::Text(text) => {
                let keep = match style.white_space {
                    WhiteSpace::Pre => !text.is_empty(),
                    WhiteSpace::Normal => inline_context || !text.trim().is_empty(),
                };
                if keep {
                    children.push(StyledNode::Text {
                        text: text.clone(),
                        style: style.inherit(),
                    });
                }
            }
        }
    }

    Some(StyledNode::Element {
        tag: element.tag.clone(),
        style,
        children,
        attrs: element.attributes.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::parse_html;

    fn first(html: &str) -> ElementNode {
        parse_html(html)[0].as_element().unwrap().clone()
    }

    #[test]
    fn ua_heading_defaults() {
        let sheet = Stylesheet::default();
        let s = sheet.resolve(&first("<h1>x</h1>"), &ComputedStyle::default(), &[]);
        assert_eq!(s.font_size, 32.0);
        assert!((s.margin_top - 21.44).abs() < 0.01);
        assert!(s.is_bold());
    }

    #[test]
    fn sheet_overrides_ua_and_uses_vars() {
        let css = ":root { --gap: 8px; }\n* { margin: 0; }\np { font-size: 12pt; margin: var(--gap) 0; }";
        let sheet = Stylesheet::parse(css);
        assert_eq!(sheet.var("--gap"), Some("8px"));
        let s = sheet.resolve(&first("<p>x</p>"), &ComputedStyle::default(), &[]);
        assert_eq!(s.font_size, 16.0);
        assert_eq!(s.margin_top, 8.0);
        assert_eq!(s.margin_bottom, 8.0);
    }

    #[test]
    fn descendant_selector_needs_ancestor() {
        let sheet = Stylesheet::parse("blockquote p { margin: 0; }");
        let p = first("<p>x</p>");
        let bq = first("<blockquote></blockquote>");
        let alone = sheet.resolve(&p, &ComputedStyle::default(), &[]);
        let inside = sheet.resolve(&p, &ComputedStyle::default(), &[ElementRef::of(&bq)]);
        assert_eq!(alone.margin_top, 16.0);
        assert_eq!(inside.margin_top, 0.0);
    }

    #[test]
    fn class_selector_reaches_page_root() {
        let sheet = Stylesheet::parse(".page { line-height: 1.7; font-family: 'Sora', sans-serif; }");
        let (root, chain) = sheet.page_root_style();
        assert_eq!(chain.len(), 3);
        assert!((root.line_height - 1.7).abs() < f32::EPSILON);
        assert_eq!(root.font_family, "'Sora', sans-serif");
    }

    #[test]
    fn pseudo_selectors_and_at_rules_are_ignored() {
        let css = "@import url('x.css');\n@media print { .page { margin: 0 !important; } }\nli::marker { font-size: 40px; }\nh2 { padding: 4px 8px !important; }";
        let sheet = Stylesheet::parse(css);
        assert_eq!(sheet.rule_count(), 1);
        let s = sheet.resolve(&first("<h2>x</h2>"), &ComputedStyle::default(), &[]);
        assert_eq!(s.padding_top, 4.0);
        assert_eq!(s.padding_left, 8.0);
    }

    #[test]
    fn import_with_semicolons_in_url_does_not_eat_next_rule() {
        let css = "@import url('https://fonts.example/css2?family=Sora:wght@300;400;700&display=swap');\n* { margin: 0; padding: 0; }\nh2 { padding: 4px; }";
        let sheet = Stylesheet::parse(css);
        assert_eq!(sheet.rule_count(), 2);
        let s = sheet.resolve(&first("<h2>x</h2>"), &ComputedStyle::default(), &[]);
        assert_eq!(s.margin_top, 0.0);
        assert_eq!(s.padding_top, 4.0);
    }

    #[test]
    fn declarations_keep_data_uris_intact() {
        let decls = parse_declarations("background: url(\"data:image/svg+xml;utf8,<svg/>\"); margin: 2px");
        assert_eq!(decls.len(), 2);
        assert_eq!(decls[1], ("margin".to_string(), "2px".to_string()));
    }

    #[test]
    fn inline_style_wins() {
        let sheet = Stylesheet::parse("p { margin-bottom: 4px; }");
        let s = sheet.resolve(
            &first(r#"<p style="margin-bottom: 30px">x</p>"#),
            &ComputedStyle::default(),
            &[],
        );
        assert_eq!(s.margin_bottom, 30.0);
    }

    #[test]
    fn units_convert_to_px() {
        assert_eq!(parse_length("12pt", 16.0), Some(16.0));
        assert_eq!(parse_length("2em", 10.0), Some(20.0));
        assert!((parse_length("10mm", 16.0).unwrap() - 37.795).abs() < 0.01);
        assert_eq!(parse_length("50%", 16.0), None);
    }

    #[test]
    fn border_none_is_zero() {
        let sheet = Stylesheet::parse("pre { border: none; border-left: 3px solid #f00; }");
        let s = sheet.resolve(&first("<pre>x</pre>"), &ComputedStyle::default(), &[]);
        assert_eq!(s.border_top, 0.0);
        assert_eq!(s.border_left, 3.0);
    }
}
