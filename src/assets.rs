//! Branding assets – header band, footer logo and flag, embedded in the
//! page chrome as base64 data URIs.
//!
//! Assets are fetched lazily through an [`AssetSource`] and memoised by an
//! [`AssetCache`]. A missing or undecodable asset becomes an empty string so
//! the chrome still renders.

use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use base64::{engine::general_purpose::STANDARD as BASE64_STD, Engine as _};
use tokio::sync::OnceCell;

use crate::error::AssetError;

pub const BANNER_FILE: &str = "sp-faixa.png";
pub const LOGO_FILE: &str = "logo-sp.png";
pub const FLAG_FILE: &str = "bandeira-sp.png";

/// Environment variable overriding the default asset directory.
pub const ASSETS_ENV: &str = "PAGEFORGE_ASSETS";
pub const DEFAULT_ASSET_DIR: &str = "assets";

/// Where asset bytes come from.
#[allow(async_fn_in_trait)]
pub trait AssetSource {
    async fn fetch(&self, name: &str) -> Result<Vec<u8>, AssetError>;
}

/// Reads assets from a directory on disk.
#[derive(Debug, Clone)]
pub struct DirSource {
    root: PathBuf,
}

impl DirSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl AssetSource for DirSource {
    async fn fetch(&self, name: &str) -> Result<Vec<u8>, AssetError> {
        let path = self.root.join(name);
        tokio::fs::read(&path).await.map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                AssetError::NotFound(path.display().to_string())
            } else {
                AssetError::Io { path, source }
            }
        })
    }
}

/// The three chrome images as data URIs; empty when unavailable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BrandAssets {
    pub banner: String,
    pub logo: String,
    pub flag: String,
}

/// Encode `bytes` as a data URI, sniffing the MIME type from the content
/// (or the `.svg` extension, which has no magic number).
pub fn data_uri(name: &str, bytes: &[u8]) -> Result<String, AssetError> {
    let mime = if name.to_ascii_lowercase().ends_with(".svg") {
        "image/svg+xml"
    } else {
        let format = image::guess_format(bytes)
            .map_err(|e| AssetError::Decode(format!("{name}: {e}")))?;
        format.to_mime_type()
    };
    Ok(format!("data:{mime};base64,{}", BASE64_STD.encode(bytes)))
}

async fn load_one<S: AssetSource + ?Sized>(source: &S, name: &str) -> String {
    let result = match source.fetch(name).await {
        Ok(bytes) => data_uri(name, &bytes),
        Err(e) => Err(e),
    };
    result.unwrap_or_else(|e| {
        log::warn!("failed to load asset: {e}");
        String::new()
    })
}

/// Fetch every chrome asset, absorbing failures.
pub async fn load_brand_assets<S: AssetSource + ?Sized>(source: &S) -> BrandAssets {
    BrandAssets {
        banner: load_one(source, BANNER_FILE).await,
        logo: load_one(source, LOGO_FILE).await,
        flag: load_one(source, FLAG_FILE).await,
    }
}

/// Lazily loaded, never invalidated assets. Concurrent callers of
/// [`get`](Self::get) share a single fetch.
pub struct AssetCache<S> {
    source: S,
    cell: OnceCell<BrandAssets>,
}

impl<S: AssetSource> AssetCache<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            cell: OnceCell::new(),
        }
    }

    pub async fn get(&self) -> &BrandAssets {
        self.cell
            .get_or_init(|| load_brand_assets(&self.source))
            .await
    }

    pub fn is_loaded(&self) -> bool {
        self.cell.initialized()
    }

    pub fn source(&self) -> &S {
        &self.source
    }
}

static GLOBAL: OnceLock<Arc<AssetCache<DirSource>>> = OnceLock::new();

/// The process-wide cache. `dir` only takes effect on the first call.
pub fn global(dir: &Path) -> Arc<AssetCache<DirSource>> {
    GLOBAL
        .get_or_init(|| {
            log::debug!("asset cache rooted at {}", dir.display());
            Arc::new(AssetCache::new(DirSource::new(dir)))
        })
        .clone()
}

/// `$PAGEFORGE_ASSETS`, or `assets` relative to the working directory.
pub fn default_asset_dir() -> PathBuf {
    std::env::var_os(ASSETS_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_ASSET_DIR))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const PNG_MAGIC: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";

    struct Counting {
        calls: AtomicUsize,
    }

    impl AssetSource for Counting {
        async fn fetch(&self, _name: &str) -> Result<Vec<u8>, AssetError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::task::yield_now().await;
            Ok(PNG_MAGIC.to_vec())
        }
    }

    #[test]
    fn png_bytes_become_png_data_uri() {
        let uri = data_uri("logo.png", PNG_MAGIC).unwrap();
        assert!(uri.starts_with("data:image/png;base64,"));
    }

    #[test]
    fn svg_is_detected_by_extension() {
        let uri = data_uri("flag.SVG", b"<svg/>").unwrap();
        assert!(uri.starts_with("data:image/svg+xml;base64,"));
    }

    #[test]
    fn unknown_bytes_fail_to_decode() {
        assert!(matches!(
            data_uri("x.png", b"not an image"),
            Err(AssetError::Decode(_))
        ));
    }

    #[tokio::test]
    async fn concurrent_callers_share_one_fetch() {
        let cache = AssetCache::new(Counting {
            calls: AtomicUsize::new(0),
        });
        let (a, b) = tokio::join!(cache.get(), cache.get());
        assert_eq!(a, b);
        assert!(!a.logo.is_empty());
        // One fetch per asset file, not per caller.
        assert_eq!(cache.source().calls.load(Ordering::SeqCst), 3);
        assert!(cache.is_loaded());
    }

    #[tokio::test]
    async fn missing_files_become_empty_strings() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(LOGO_FILE), PNG_MAGIC).unwrap();
        let assets = load_brand_assets(&DirSource::new(dir.path())).await;
        assert!(assets.banner.is_empty());
        assert!(assets.logo.starts_with("data:image/png"));
        assert!(assets.flag.is_empty());
    }

    #[tokio::test]
    async fn dir_source_reports_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = DirSource::new(dir.path()).fetch("nope.png").await.unwrap_err();
        assert!(matches!(err, AssetError::NotFound(_)));
    }
}
