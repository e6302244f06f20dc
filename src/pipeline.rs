//! Pipeline – ties together theme resolution, measurement, pagination and
//! page assembly into a single call per output shape.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::assemble::{ExportBundle, PageAssembler, DEFAULT_FOOTER_LABEL};
use crate::assets::{self, AssetCache, AssetSource, DirSource};
use crate::error::{ConfigError, Result};
use crate::fonts::{FontError, FontManager};
use crate::measure::{LayoutMeasurer, Measure};
use crate::pagination::{PageFragment, Paginator, KEEP_WITH_HEADER_PX};
use crate::report::PaginationReport;
use crate::style::Stylesheet;
use crate::theme::{self, ThemeRecord};

/// The output shapes the pipeline can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// JSON array of standalone page documents.
    #[default]
    Preview,
    /// One HTML document with every page.
    Document,
    /// Container + style nodes for a PDF rasterizer, as HTML.
    Export,
    /// JSON pagination report.
    Report,
}

/// Configuration for the pagination pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Following content a heading must keep on its page (default: 150 px).
    pub keep_with_header_px: f32,
    /// Wait before measuring, in milliseconds (default: 150).
    pub settle_delay_ms: u64,
    /// Text printed in the centre of every footer.
    pub footer_label: String,
    /// Directory holding the header band, logo and flag images.
    pub asset_dir: PathBuf,
    /// TTF/OTF files for the height estimator. Empty means built-in
    /// metrics.
    pub font_files: Vec<PathBuf>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            keep_with_header_px: KEEP_WITH_HEADER_PX,
            settle_delay_ms: 150,
            footer_label: DEFAULT_FOOTER_LABEL.to_string(),
            asset_dir: assets::default_asset_dir(),
            font_files: Vec::new(),
        }
    }
}

impl PipelineConfig {
    /// Load a JSON config file; missing fields keep their defaults.
    pub fn from_json_file(path: &Path) -> std::result::Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(serde_json::from_str(&text)?)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    /// Font metrics for the estimator: the configured files, or built-in
    /// metrics when none are given.
    pub fn load_fonts(&self) -> std::result::Result<FontManager, FontError> {
        if self.font_files.is_empty() {
            return Ok(FontManager::default());
        }
        let mut fonts = FontManager::new();
        for path in &self.font_files {
            fonts.load_font_file(path)?;
        }
        Ok(fonts)
    }
}

/// A configured pipeline: one measurer, one asset cache.
pub struct Pipeline<M = LayoutMeasurer, S = DirSource> {
    config: PipelineConfig,
    paginator: Paginator<M>,
    assets: Arc<AssetCache<S>>,
}

impl Pipeline {
    /// Estimator-backed pipeline using the process-wide asset cache.
    pub fn new(config: PipelineConfig) -> Result<Self> {
        let fonts = config.load_fonts()?;
        let assets = assets::global(&config.asset_dir);
        Ok(Self::with_parts(config, LayoutMeasurer::new(fonts), assets))
    }
}

impl<M: Measure, S: AssetSource> Pipeline<M, S> {
    pub fn with_parts(config: PipelineConfig, measurer: M, assets: Arc<AssetCache<S>>) -> Self {
        let paginator = Paginator::new(measurer)
            .with_keep_with_header(config.keep_with_header_px)
            .with_settle_delay(config.settle_delay());
        Self {
            config,
            paginator,
            assets,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Split `html` into pages under `theme_name`'s stylesheet.
    pub async fn paginate(&self, html: &str, theme_name: &str) -> Result<Vec<PageFragment>> {
        self.paginate_with(html, theme::resolve(theme_name)).await
    }

    async fn paginate_with(&self, html: &str, record: &ThemeRecord) -> Result<Vec<PageFragment>> {
        let stylesheet = Stylesheet::parse(&record.css);
        let pages = self.paginator.split_into_pages(html, &stylesheet).await?;
        log::info!("theme {}: {} pages", record.id, pages.len());
        Ok(pages)
    }

    /// Resolve the theme once, paginate, and hand the pages to an assembler
    /// for that theme.
    async fn assemble<T>(
        &self,
        html: &str,
        theme_name: &str,
        f: impl FnOnce(&PageAssembler<'_>, &[PageFragment]) -> T,
    ) -> Result<T> {
        let record = theme::resolve(theme_name);
        let pages = self.paginate_with(html, record).await?;
        let assets = self.assets.get().await;
        let assembler = PageAssembler::new(record, assets, &self.config.footer_label);
        Ok(f(&assembler, &pages))
    }

    pub async fn render_preview(&self, html: &str, theme_name: &str) -> Result<Vec<String>> {
        self.assemble(html, theme_name, |a, p| a.preview_pages(p))
            .await
    }

    pub async fn render_document(&self, html: &str, theme_name: &str) -> Result<String> {
        self.assemble(html, theme_name, |a, p| a.print_document(p))
            .await
    }

    pub async fn render_export(&self, html: &str, theme_name: &str) -> Result<ExportBundle> {
        self.assemble(html, theme_name, |a, p| a.export(p)).await
    }

    pub async fn report(&self, html: &str, theme_name: &str) -> Result<PaginationReport> {
        let record = theme::resolve(theme_name);
        let pages = self.paginate_with(html, record).await?;
        Ok(PaginationReport::new(
            record.id,
            self.config.keep_with_header_px,
            &pages,
        ))
    }

    /// Render to text in the requested format.
    pub async fn render(&self, html: &str, theme_name: &str, format: OutputFormat) -> Result<String> {
        Ok(match format {
            OutputFormat::Preview => {
                serde_json::to_string(&self.render_preview(html, theme_name).await?)?
            }
            OutputFormat::Document => self.render_document(html, theme_name).await?,
            OutputFormat::Export => self.render_export(html, theme_name).await?.to_html(),
            OutputFormat::Report => self.report(html, theme_name).await?.to_json()?,
        })
    }
}

/// Run a pipeline future to completion on a fresh current-thread runtime.
pub fn block_on<F: std::future::Future>(future: F) -> std::io::Result<F::Output> {
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()?;
    Ok(rt.block_on(future))
}
