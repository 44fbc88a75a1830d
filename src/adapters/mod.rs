// Adapters layer: concrete page renderers behind the `PageRenderer` port.

pub mod chrome_renderer;
pub mod http_renderer;

pub use chrome_renderer::ChromeRenderer;
pub use http_renderer::HttpRenderer;

use crate::config::{RendererKind, ScrapeSettings};
use crate::domain::ports::PageRenderer;
use crate::utils::error::Result;
use std::sync::Arc;

pub fn build_renderer(settings: &ScrapeSettings) -> Result<Arc<dyn PageRenderer>> {
    Ok(match settings.renderer {
        RendererKind::Http => Arc::new(HttpRenderer::new(settings)?),
        RendererKind::Chrome => Arc::new(ChromeRenderer::new(settings)),
    })
}
