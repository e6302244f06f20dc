//! Page assembler – wraps page fragments in the A4 chrome (header band,
//! footer with logo, label, flag and page counter) and produces the three
//! output shapes: preview pages, a print document, and an export bundle.

use crate::assets::BrandAssets;
use crate::dom::{escape_attr, escape_text, parse_html, DomNode, ElementNode, Tag};
use crate::pagination::{
    PageFragment, A4_HEIGHT_MM, A4_WIDTH_MM, MARGIN_BOTTOM_MM, MARGIN_LEFT_MM, MARGIN_RIGHT_MM,
    MARGIN_TOP_MM,
};
use crate::theme::ThemeRecord;

/// Label printed in the centre of every footer.
pub const DEFAULT_FOOTER_LABEL: &str = "FOMENTO CULTSP - PNAB Nº 12/2025";

/// Chrome styling. `@NAME@` tokens are filled per theme.
const LAYOUT_CSS: &str = r#"
.sp-header-bg {
  position: absolute;
  top: 0; left: 0; right: 0;
  height: 16mm;
  background: url("@BANNER@") repeat-x left center;
  background-size: auto 14mm;
  opacity: @HEADER_OPACITY@;
  z-index: 50;
  pointer-events: none;
}
.sp-footer {
  position: absolute;
  bottom: 5mm; left: 8mm; right: 8mm;
  height: 8mm;
  display: flex;
  align-items: center;
  justify-content: space-between;
  z-index: 100;
  font-family: 'Plus Jakarta Sans', system-ui, sans-serif;
  border-top: 0.5px solid @RULE_COLOR@;
  padding-top: 2mm;
}
.sp-footer-left, .sp-footer-right { display: flex; align-items: center; gap: 8px; }
.sp-footer-center { flex: 1; text-align: center; }
.sp-logo { height: 6mm; width: auto; opacity: @LOGO_OPACITY@; @LOGO_FILTER@ }
.sp-edital { font-size: 5.5pt; font-weight: 500; letter-spacing: 0.5px; color: @LABEL_COLOR@; }
.sp-bandeira { height: 4.5mm; width: auto; border-radius: 1px; opacity: @FLAG_OPACITY@; }
.sp-page {
  font-size: 6.5pt;
  font-weight: 600;
  color: @COUNTER_COLOR@;
  font-family: 'JetBrains Mono', monospace;
  letter-spacing: 0.5px;
}
.page-content { position: relative; z-index: 10; }
"#;

/// Elements a rasterizer must not break across pages.
const AVOID_BREAK_SELECTORS: &str =
    ".page table, .page pre, .page blockquote, .page ul, .page ol, .page figure, .page img, .page dl";

/// Chrome CSS for a dark or light theme with the given assets inlined.
pub fn layout_css(dark: bool, assets: &BrandAssets) -> String {
    let pick = |d: &'static str, l: &'static str| if dark { d } else { l };
    LAYOUT_CSS
        .replace("@BANNER@", &assets.banner)
        .replace("@HEADER_OPACITY@", pick("0.08", "0.12"))
        .replace(
            "@RULE_COLOR@",
            pick("rgba(255,255,255,0.08)", "rgba(0,0,0,0.06)"),
        )
        .replace("@LOGO_OPACITY@", pick("0.85", "0.6"))
        .replace(
            "@LOGO_FILTER@",
            pick(
                "filter: invert(1) hue-rotate(180deg) saturate(1.5) brightness(1.1);",
                "",
            ),
        )
        .replace(
            "@LABEL_COLOR@",
            pick("rgba(255,255,255,0.3)", "rgba(0,0,0,0.3)"),
        )
        .replace("@FLAG_OPACITY@", pick("0.5", "0.45"))
        .replace(
            "@COUNTER_COLOR@",
            pick("rgba(255,255,255,0.4)", "rgba(0,0,0,0.35)"),
        )
}

/// An export tree for a PDF rasterizer: the page container and the style
/// element it needs, detached from any document.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportBundle {
    pub container: ElementNode,
    pub style: ElementNode,
}

impl ExportBundle {
    pub fn page_count(&self) -> usize {
        self.container.element_children().count()
    }

    /// Both nodes in a standalone HTML document.
    pub fn to_html(&self) -> String {
        format!(
            "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"UTF-8\">\n{}\n</head>\n<body>{}</body>\n</html>\n",
            self.style.outer_html(),
            self.container.outer_html()
        )
    }
}

/// Decorates fragments for one theme.
pub struct PageAssembler<'a> {
    theme: &'a ThemeRecord,
    assets: &'a BrandAssets,
    footer_label: &'a str,
}

impl<'a> PageAssembler<'a> {
    pub fn new(theme: &'a ThemeRecord, assets: &'a BrandAssets, footer_label: &'a str) -> Self {
        Self {
            theme,
            assets,
            footer_label,
        }
    }

    pub fn is_dark(&self) -> bool {
        self.theme.is_dark()
    }

    pub fn layout_css(&self) -> String {
        layout_css(self.is_dark(), self.assets)
    }

    /// Fixed A4 box with print margins and the theme background.
    fn page_box_css(&self, extra: &str) -> String {
        format!(
            ".page {{\n  width: {A4_WIDTH_MM}mm; height: {A4_HEIGHT_MM}mm;\n  \
             position: relative;\n  \
             padding: {MARGIN_TOP_MM}mm {MARGIN_RIGHT_MM}mm {MARGIN_BOTTOM_MM}mm {MARGIN_LEFT_MM}mm;\n  \
             box-sizing: border-box;\n  overflow: hidden;\n  background: {};\n{extra}}}\n",
            self.theme.background
        )
    }

    /// One `.page` block: header band, content, footer.
    pub fn page_html(&self, content: &str, number: usize, total: usize) -> String {
        format!(
            concat!(
                "<div class=\"page\">",
                "<div class=\"sp-header-bg\"></div>",
                "<div class=\"page-content\">{content}</div>",
                "<div class=\"sp-footer\">",
                "<div class=\"sp-footer-left\"><img src=\"{logo}\" alt=\"SP\" class=\"sp-logo\"></div>",
                "<div class=\"sp-footer-center\"><span class=\"sp-edital\">{label}</span></div>",
                "<div class=\"sp-footer-right\"><img src=\"{flag}\" alt=\"\" class=\"sp-bandeira\">",
                "<span class=\"sp-page\">{number} / {total}</span></div>",
                "</div>",
                "</div>"
            ),
            content = content,
            logo = escape_attr(&self.assets.logo),
            label = escape_text(self.footer_label),
            flag = escape_attr(&self.assets.flag),
            number = number,
            total = total,
        )
    }

    /// Standalone page markup, each carrying its own stylesheet.
    pub fn preview_pages(&self, pages: &[PageFragment]) -> Vec<String> {
        let style = format!(
            "<style>\n{}\n{}\n{}</style>\n",
            self.theme.css,
            self.layout_css(),
            self.page_box_css("")
        );
        let total = pages.len();
        pages
            .iter()
            .enumerate()
            .map(|(i, page)| format!("{style}{}", self.page_html(&page.markup, i + 1, total)))
            .collect()
    }

    /// All pages in one HTML document, separated by gaps, for on-screen
    /// review or browser printing.
    pub fn print_document(&self, pages: &[PageFragment]) -> String {
        let total = pages.len();
        let body = pages
            .iter()
            .enumerate()
            .map(|(i, page)| self.page_html(&page.markup, i + 1, total))
            .collect::<Vec<_>>()
            .join("\n<div class=\"page-gap\"></div>\n");

        let page_box = self.page_box_css(
            "  min-height: 297mm; max-height: 297mm;\n  margin: 0 auto;\n  \
             box-shadow: 0 8px 40px rgba(0,0,0,0.5);\n  border-radius: 2px;\n",
        );
        format!(
            "<!DOCTYPE html>\n<html lang=\"pt-BR\">\n<head>\n<meta charset=\"UTF-8\">\n<style>\n{}\n{}\n\
             html, body {{ background: #1a1a1a; margin: 0; padding: 25px; }}\n\
             {page_box}\
             .page-gap {{ height: 30px; }}\n\
             </style>\n</head>\n<body>{body}</body>\n</html>\n",
            self.theme.css,
            self.layout_css(),
        )
    }

    /// Detached container and style nodes for a PDF rasterizer.
    pub fn export(&self, pages: &[PageFragment]) -> ExportBundle {
        let total = pages.len();
        let mut container = ElementNode::new(Tag::Div).with_attr("class", "pdf-container");
        for (i, page) in pages.iter().enumerate() {
            let markup = self.page_html(&page.markup, i + 1, total);
            container.children.extend(
                parse_html(&markup)
                    .into_iter()
                    .filter(|n| matches!(n, DomNode::Element(_))),
            );
        }

        let page_box = self.page_box_css(
            "  min-height: 297mm; max-height: 297mm;\n  \
             page-break-after: always;\n  page-break-inside: avoid;\n  \
             break-after: page;\n  break-inside: avoid;\n",
        );
        let css = format!(
            "{}\n{}\n.pdf-container {{ width: {A4_WIDTH_MM}mm; margin: 0; padding: 0; }}\n\
             {page_box}\
             .page:last-child {{ page-break-after: avoid; break-after: avoid; }}\n\
             {AVOID_BREAK_SELECTORS} {{ page-break-inside: avoid; break-inside: avoid; }}\n",
            self.theme.css,
            self.layout_css(),
        );
        let mut style = ElementNode::new(Tag::Style);
        style.children.push(DomNode::Text(css));

        ExportBundle { container, style }
    }
}
