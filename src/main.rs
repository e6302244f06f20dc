//! pageforge – paginate Markdown-rendered HTML into themed A4 pages.
//!
//! Usage:
//!   pageforge <input.html> [-o out.html] [-t Theme] [-f preview|document|export|report]
//!
//! Without `-o` the result is written to stdout.

use std::{fs, path::PathBuf, process};

use clap::{Parser, ValueEnum};

use page_forge::pipeline::{OutputFormat, Pipeline, PipelineConfig};
use page_forge::theme::{ThemeCatalog, DEFAULT_THEME};

#[derive(Parser)]
#[command(name = "pageforge")]
#[command(version)]
#[command(about = "Split Markdown-rendered HTML into themed, print-ready A4 pages", long_about = None)]
struct Cli {
    /// HTML body fragment or full document
    #[arg(value_name = "INPUT", required_unless_present = "list_themes")]
    input: Option<PathBuf>,

    /// Output file (stdout if not specified)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Theme id or label
    #[arg(short, long, default_value = DEFAULT_THEME)]
    theme: String,

    /// Output shape
    #[arg(short, long, value_enum, default_value = "document")]
    format: Format,

    /// JSON pipeline configuration
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Directory holding the chrome images
    #[arg(long, value_name = "DIR", env = "PAGEFORGE_ASSETS")]
    assets: Option<PathBuf>,

    /// Print the available themes and exit
    #[arg(long)]
    list_themes: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    /// JSON array of standalone pages
    Preview,
    /// One HTML document with page gaps
    Document,
    /// Rasterizer container and style
    Export,
    /// JSON pagination report
    Report,
}

impl From<Format> for OutputFormat {
    fn from(f: Format) -> Self {
        match f {
            Format::Preview => OutputFormat::Preview,
            Format::Document => OutputFormat::Document,
            Format::Export => OutputFormat::Export,
            Format::Report => OutputFormat::Report,
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    // Unknown-theme and missing-asset warnings show without RUST_LOG.
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    if cli.list_themes {
        for record in ThemeCatalog::global().iter() {
            let marker = if record.id == DEFAULT_THEME { " (default)" } else { "" };
            println!("{:<10} {}  {}{marker}", record.id, record.background, record.description);
        }
        return;
    }

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

async fn run(cli: Cli) -> page_forge::Result<()> {
    let Some(input) = cli.input else {
        return Ok(());
    };

    let mut config = match &cli.config {
        Some(path) => PipelineConfig::from_json_file(path)?,
        None => PipelineConfig::default(),
    };
    if let Some(dir) = cli.assets {
        config.asset_dir = dir;
    }

    let html = fs::read_to_string(&input)?;

    let pipeline = Pipeline::new(config)?;
    let rendered = pipeline.render(&html, &cli.theme, cli.format.into()).await?;

    match cli.output {
        Some(path) => {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    fs::create_dir_all(parent)?;
                }
            }
            fs::write(&path, &rendered)?;
            eprintln!("Wrote '{}' ({} bytes)", path.display(), rendered.len());
        }
        None => print!("{rendered}"),
    }
    Ok(())
}
