//! Integration tests for the page-forge pipeline.
//!
//! These tests validate:
//! - The pagination properties (completeness, height bound, atomicity,
//!   headings kept with their content, unsplit fallback)
//! - The fixed scenarios for splitting, theme fallback and missing assets
//! - Estimator-backed runs over the bundled sample documents
//! - Deterministic assembled output

use std::cell::Cell;
use std::path::Path;
use std::sync::Arc;

use sha2::{Digest, Sha256};

use page_forge::assets::{AssetCache, DirSource, BANNER_FILE, FLAG_FILE};
use page_forge::dom::{top_level_blocks, ElementNode};
use page_forge::error::{Error, MeasureError, PaginateError};
use page_forge::fonts::FontManager;
use page_forge::measure::{LayoutMeasurer, Measure};
use page_forge::pagination::{NodeKind, PageFragment, Paginator, CONTENT_HEIGHT_PX};
use page_forge::pipeline::{Pipeline, PipelineConfig};
use page_forge::style::Stylesheet;
use page_forge::{templates, theme};

// =====================================================================
// Helpers
// =====================================================================

const PNG_MAGIC: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";

/// Height comes from the `data-h` attribute; 20px when absent.
struct FixedMeasurer;

impl Measure for FixedMeasurer {
    async fn measure(&self, node: &ElementNode, _: &Stylesheet) -> Result<f32, MeasureError> {
        Ok(data_h(node))
    }
}

fn data_h(node: &ElementNode) -> f32 {
    node.attr("data-h")
        .and_then(|v| v.parse().ok())
        .unwrap_or(20.0)
}

fn test_config() -> PipelineConfig {
    PipelineConfig {
        settle_delay_ms: 0,
        ..PipelineConfig::default()
    }
}

fn fixed_paginator() -> Paginator<FixedMeasurer> {
    Paginator::new(FixedMeasurer).with_settle_delay(std::time::Duration::ZERO)
}

fn asset_cache(dir: &Path) -> Arc<AssetCache<DirSource>> {
    Arc::new(AssetCache::new(DirSource::new(dir)))
}

fn fixed_pipeline(dir: &Path) -> Pipeline<FixedMeasurer, DirSource> {
    Pipeline::with_parts(test_config(), FixedMeasurer, asset_cache(dir))
}

fn estimator_pipeline(dir: &Path) -> Pipeline<LayoutMeasurer, DirSource> {
    Pipeline::with_parts(test_config(), LayoutMeasurer::default(), asset_cache(dir))
}

async fn split(html: &str) -> Vec<PageFragment> {
    fixed_paginator()
        .split_into_pages(html, &Stylesheet::default())
        .await
        .unwrap()
}

fn paragraphs(n: usize, h: u32) -> String {
    (0..n)
        .map(|i| format!(r#"<p data-h="{h}">Paragraph {i}</p>"#))
        .collect()
}

fn joined(pages: &[PageFragment]) -> String {
    pages.iter().map(|p| p.markup.as_str()).collect()
}

/// Markdown-style blocks in canonical markup, so the joined pages can be
/// compared with the source text itself.
fn markdown_blocks(sections: usize) -> Vec<String> {
    let mut blocks = vec!["<h1>Quarterly &amp; Annual Notes</h1>".to_string()];
    for s in 1..=sections {
        blocks.push(format!("<h2>Section {s}</h2>"));
        blocks.push(format!(
            "<p>The <strong>studio</strong> <em>opened</em> on \
             <a href=\"https://example.org/{s}\">weekends</a> for section {s}, \
             and <code>x &lt; y</code> held for every session we ran.</p>"
        ));
        blocks.push(format!(
            "<p>Follow-up {s}: attendance grew while volunteers kept the doors open late \
             and the print queue never emptied before closing time.</p>"
        ));
        blocks.push(format!(
            "<ul>\n<li>Point {s}.1 with <strong>bold</strong> text</li>\n<li>Point {s}.2</li>\n</ul>"
        ));
        blocks.push(format!(
            "<table><thead><tr><th>Item</th><th>Count</th></tr></thead>\
             <tbody><tr><td>Prints {s}</td><td>{}</td></tr></tbody></table>",
            s * 11
        ));
        blocks.push(format!(
            "<pre><code>section = {s}\nratio = {s} &lt; 100\n</code></pre>"
        ));
        blocks.push(format!("<blockquote><p>Quote for section {s}.</p></blockquote>"));
    }
    blocks
}

// =====================================================================
// Fixed scenarios
// =====================================================================

#[tokio::test]
async fn heading_with_short_paragraphs_fits_one_page() {
    let html = format!(r#"<h1 data-h="40">Title</h1>{}"#, paragraphs(30, 20));
    let pages = split(&html).await;
    assert_eq!(pages.len(), 1);
    assert_eq!(pages[0].node_count, 31);
}

#[tokio::test]
async fn heading_moves_to_next_page_with_its_content() {
    // 936px used leaves ~50px; the h2 needs itself plus >=150px.
    let html = format!(
        r#"<p data-h="936">filler</p><h2 data-h="30">Section</h2>{}"#,
        paragraphs(4, 100)
    );
    let pages = split(&html).await;
    assert_eq!(pages.len(), 2);
    assert_eq!(pages[0].node_count, 1);

    let second = top_level_blocks(&pages[1].markup);
    assert_eq!(second[0].tag.name(), "h2");
    let following: f32 = second[1..].iter().map(data_h).sum();
    assert!(following >= 150.0, "only {following}px follows the heading");
}

#[tokio::test]
async fn oversized_table_gets_its_own_fragment() {
    let h = CONTENT_HEIGHT_PX * 1.5;
    let html = format!(r#"<table data-h="{h}"><tr><td>x</td></tr></table>"#);
    let pages = split(&html).await;
    assert_eq!(pages.len(), 1);
    assert_eq!(pages[0].node_count, 1);
    assert!(pages[0].oversized);
    assert!(pages[0].markup.starts_with("<table"));
}

#[tokio::test]
async fn unknown_theme_renders_with_default() {
    let dir = tempfile::tempdir().unwrap();
    let pipeline = fixed_pipeline(dir.path());
    let pages = pipeline
        .render_preview(templates::minimal_sample(), "nonexistent")
        .await
        .unwrap();
    let default = theme::resolve("Gaming");
    assert_eq!(pages.len(), 1);
    assert!(pages[0].contains(&default.css));
    assert!(pages[0].contains("background: #030303;"));

    let report = pipeline
        .report(templates::minimal_sample(), "nonexistent")
        .await
        .unwrap();
    assert_eq!(report.theme, "Gaming");
}

#[tokio::test]
async fn missing_logo_keeps_footer_and_numbering() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join(BANNER_FILE), PNG_MAGIC).unwrap();
    std::fs::write(dir.path().join(FLAG_FILE), PNG_MAGIC).unwrap();

    let pipeline = fixed_pipeline(dir.path());
    let html = paragraphs(9, 400);
    let pages = pipeline.render_preview(&html, "Corporate").await.unwrap();
    assert_eq!(pages.len(), 5);
    for (i, page) in pages.iter().enumerate() {
        assert!(page.contains(r#"<img src="" alt="SP" class="sp-logo">"#));
        assert!(page.contains("<img src=\"data:image/png;base64,"));
        assert!(page.contains(&format!("<span class=\"sp-page\">{} / 5</span>", i + 1)));
        assert!(page.contains("FOMENTO CULTSP - PNAB Nº 12/2025"));
    }
}

// =====================================================================
// Properties
// =====================================================================

#[tokio::test]
async fn every_block_appears_once_in_order() {
    let blocks = markdown_blocks(10);
    let html = blocks.join("\n");
    let dir = tempfile::tempdir().unwrap();
    let pages = estimator_pipeline(dir.path())
        .paginate(&html, "Corporate")
        .await
        .unwrap();
    assert!(pages.len() > 1);
    assert_eq!(joined(&pages), blocks.concat());
    let total: usize = pages.iter().map(|p| p.node_count).sum();
    assert_eq!(total, blocks.len());
}

#[tokio::test]
async fn irregular_source_keeps_its_content() {
    let html = "<p>&copy; 2025 &mdash; caf&#233;</p>\n</div>\n\
                <p><strong>bold</strong> <em>italic</em></p>\n</section>\n\
                <p>after the stray tags</p>";
    let pages = split(html).await;
    assert_eq!(
        joined(&pages),
        "<p>\u{a9} 2025 \u{2014} caf\u{e9}</p>\
         <p><strong>bold</strong> <em>italic</em></p>\
         <p>after the stray tags</p>"
    );
    assert_eq!(pages[0].node_count, 3);
}

#[tokio::test]
async fn pages_respect_the_height_budget() {
    let html = templates::long_report(10);
    let dir = tempfile::tempdir().unwrap();
    for name in theme::names() {
        let pages = estimator_pipeline(dir.path())
            .paginate(&html, name)
            .await
            .unwrap();
        for page in pages.iter().filter(|p| !p.oversized) {
            assert!(
                page.height <= CONTENT_HEIGHT_PX,
                "{name}: page of {}px",
                page.height
            );
        }
    }
}

#[tokio::test]
async fn atomic_blocks_are_never_split() {
    let blocks = markdown_blocks(8);
    let html = blocks.join("\n");
    let dir = tempfile::tempdir().unwrap();
    let pages = estimator_pipeline(dir.path())
        .paginate(&html, "Tech")
        .await
        .unwrap();
    let atomic = ["<ul>", "<table>", "<pre>", "<blockquote>"];
    for block in blocks
        .iter()
        .filter(|b| atomic.iter().any(|tag| b.starts_with(tag)))
    {
        let holders = pages.iter().filter(|p| p.markup.contains(block.as_str())).count();
        assert_eq!(holders, 1, "atomic block not on exactly one page: {block}");
    }
}

#[tokio::test]
async fn no_page_ends_with_a_heading() {
    let html = templates::long_report(12);
    let dir = tempfile::tempdir().unwrap();
    let pages = estimator_pipeline(dir.path())
        .paginate(&html, "Classic")
        .await
        .unwrap();
    assert!(pages.len() > 2);
    for page in &pages[..pages.len() - 1] {
        let blocks = top_level_blocks(&page.markup);
        let last = blocks.last().unwrap();
        assert!(
            !matches!(NodeKind::classify(last), NodeKind::Heading(_)),
            "page ends with <{}>",
            last.tag.name()
        );
    }
}

#[tokio::test]
async fn fixed_heights_never_orphan_headings() {
    let mut html = String::new();
    for s in 0..15 {
        html.push_str(&format!(r#"<h2 data-h="36">S{s}</h2>"#));
        html.push_str(&paragraphs(3 + s % 4, 60 + (s as u32 * 13) % 90));
    }
    let pages = split(&html).await;
    for page in &pages[..pages.len() - 1] {
        let blocks = top_level_blocks(&page.markup);
        assert_ne!(blocks.last().unwrap().tag.name(), "h2");
    }
    assert_eq!(joined(&pages), html);
}

#[tokio::test]
async fn contentless_input_is_returned_unsplit() {
    for html in ["", "   \n", "<!-- nothing here -->", "<style>p { color: red; }</style>"] {
        let first = split(html).await;
        let second = split(html).await;
        assert_eq!(first, vec![PageFragment::unsplit(html)]);
        assert_eq!(first, second);
    }
}

#[tokio::test]
async fn full_documents_use_their_body() {
    let html = templates::full_document(templates::minimal_sample());
    let pages = split(&html).await;
    assert_eq!(pages.len(), 1);
    assert_eq!(pages[0].markup, "<h1>Hello</h1><p>World</p>");
}

// =====================================================================
// Measurement and concurrency
// =====================================================================

#[tokio::test]
async fn missing_font_metrics_fail_the_run() {
    let dir = tempfile::tempdir().unwrap();
    let pipeline = Pipeline::with_parts(
        test_config(),
        LayoutMeasurer::new(FontManager::new()),
        asset_cache(dir.path()),
    );
    let err = pipeline
        .render_document(templates::minimal_sample(), "Zen")
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Paginate(PaginateError::Measurement(MeasureError::Unavailable(_)))
    ));
}

/// Records how many measurements are in flight at once.
struct Tracking {
    in_flight: Cell<usize>,
    peak: Cell<usize>,
}

impl Measure for Tracking {
    async fn measure(&self, node: &ElementNode, _: &Stylesheet) -> Result<f32, MeasureError> {
        self.in_flight.set(self.in_flight.get() + 1);
        self.peak.set(self.peak.get().max(self.in_flight.get()));
        tokio::task::yield_now().await;
        self.in_flight.set(self.in_flight.get() - 1);
        Ok(data_h(node))
    }
}

#[tokio::test]
async fn concurrent_runs_do_not_overlap() {
    let paginator = Paginator::new(Tracking {
        in_flight: Cell::new(0),
        peak: Cell::new(0),
    })
    .with_settle_delay(std::time::Duration::ZERO);
    let sheet = Stylesheet::default();
    let a = paragraphs(20, 100);
    let b = paragraphs(15, 200);
    let (ra, rb) = tokio::join!(
        paginator.split_into_pages(&a, &sheet),
        paginator.split_into_pages(&b, &sheet)
    );
    assert_eq!(joined(&ra.unwrap()), a);
    assert_eq!(joined(&rb.unwrap()), b);
    assert_eq!(paginator.measurer().peak.get(), 1);
}

#[tokio::test]
async fn estimator_splits_the_proposal_sample() {
    let dir = tempfile::tempdir().unwrap();
    let report = estimator_pipeline(dir.path())
        .report(templates::proposal_sample(), "Corporate")
        .await
        .unwrap();
    assert_eq!(
        report.total_nodes(),
        top_level_blocks(templates::proposal_sample()).len()
    );
    assert!(report.pages.iter().all(|p| p.height_px > 0.0));
}

// =====================================================================
// Assembled output
// =====================================================================

fn digest(text: &str) -> String {
    Sha256::digest(text.as_bytes())
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

#[tokio::test]
async fn print_document_is_deterministic() {
    let dir = tempfile::tempdir().unwrap();
    let html = templates::long_report(5);
    let pipeline = estimator_pipeline(dir.path());
    let first = pipeline.render_document(&html, "Neon").await.unwrap();
    let second = pipeline.render_document(&html, "Neon").await.unwrap();
    let other = pipeline.render_document(&html, "Zen").await.unwrap();
    assert_eq!(digest(&first), digest(&second));
    assert_ne!(digest(&first), digest(&other));
}

#[tokio::test]
async fn export_bundle_has_one_page_block_per_fragment() {
    let dir = tempfile::tempdir().unwrap();
    let pipeline = fixed_pipeline(dir.path());
    let html = paragraphs(7, 300);
    let pages = pipeline.paginate(&html, "Luxury").await.unwrap();
    let bundle = pipeline.render_export(&html, "Luxury").await.unwrap();
    assert_eq!(bundle.page_count(), pages.len());
    let css = bundle.style.inner_html();
    assert!(css.contains("page-break-inside: avoid;"));
    assert!(css.contains(".page:last-child"));
    // Luxury is dark: inverted logo.
    assert!(css.contains("invert(1)"));
}

#[tokio::test]
async fn light_theme_document_uses_light_chrome() {
    let dir = tempfile::tempdir().unwrap();
    let doc = fixed_pipeline(dir.path())
        .render_document(&paragraphs(3, 100), "Minimal")
        .await
        .unwrap();
    assert!(doc.contains("opacity: 0.12;"));
    assert!(!doc.contains("invert(1)"));
    assert!(doc.contains("background: #ffffff;"));
}
