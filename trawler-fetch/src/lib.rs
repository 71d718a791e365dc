pub mod content;
pub mod error;
pub mod fallback;
pub mod fetcher;
pub mod links;
pub mod options;
pub mod page;
pub mod plain;
pub mod rendered;

#[cfg(feature = "chromium")]
pub mod chromium;

pub use content::{PageParser, ParsedPage};
pub use error::{FetchFailure, FetchSetupError, UrlError};
pub use fallback::{DegradeCause, FallbackEvent, FallbackFetcher, FetchMode, next_mode};
pub use fetcher::{PageFetcher, build_fetcher};
pub use links::{normalize, normalize_url};
pub use options::FetchOptions;
pub use page::{FetchMethod, FetchedPage};
pub use plain::PlainFetcher;
pub use rendered::{
    RenderTab, RenderedDocument, RenderedFetcher, Renderer, TAB_CLOSE_GRACE, UnavailableRenderer,
};

/// Browser backend used when rendering is requested.
#[cfg(feature = "chromium")]
pub type DefaultRenderer = chromium::ChromiumRenderer;

#[cfg(not(feature = "chromium"))]
pub type DefaultRenderer = UnavailableRenderer;

