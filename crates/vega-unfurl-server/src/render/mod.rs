//! On-demand rendering of encoded specifications.
//!
//! A render request names an output format and carries the same
//! `{kind}/{payload}` suffix as an editor link. Vega-Lite documents are
//! compiled to Vega before anything that needs the low-level dialect;
//! compiling and drawing are delegated to [`SpecCompiler`] and
//! [`SvgRenderer`] implementations.

pub mod cli;
pub mod raster;

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use vega_unfurl_core::{DecodedSpec, EncodedReference, SpecKind};

use crate::error::RenderError;

pub use cli::CliRenderer;
pub use raster::Rasterizer;

/// Output formats served by the render routes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderFormat {
    /// Compiled Vega JSON.
    VegaJson,
    /// The decoded document text, verbatim.
    VegaLiteJson,
    /// SVG image.
    Svg,
    /// PNG image rasterized from the SVG.
    Png,
}

impl RenderFormat {
    /// Route prefix for this format.
    pub fn route(self) -> &'static str {
        match self {
            Self::VegaJson => "vg.json",
            Self::VegaLiteJson => "vl.json",
            Self::Svg => "svg",
            Self::Png => "png",
        }
    }

    /// Media type of the response body.
    pub fn content_type(self) -> &'static str {
        match self {
            Self::VegaJson | Self::VegaLiteJson => "application/json; charset=utf-8",
            Self::Svg => "image/svg+xml",
            Self::Png => "image/png",
        }
    }
}

/// Compiles Vega-Lite documents to Vega.
#[async_trait]
pub trait SpecCompiler: Send + Sync {
    /// Compile a Vega-Lite document.
    async fn compile(&self, vega_lite: &Value) -> Result<Value, RenderError>;
}

/// Draws Vega documents as SVG.
#[async_trait]
pub trait SvgRenderer: Send + Sync {
    /// Render a Vega document to SVG markup.
    async fn render_svg(&self, vega: &Value) -> Result<String, RenderError>;
}

/// A rendered artifact ready to be sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendered {
    /// Media type.
    pub content_type: &'static str,
    /// Response body.
    pub body: Vec<u8>,
}

impl Rendered {
    fn new(format: RenderFormat, body: impl Into<Vec<u8>>) -> Self {
        Self {
            content_type: format.content_type(),
            body: body.into(),
        }
    }
}

/// Routes render requests to the compiler, renderer and rasterizer.
#[derive(Clone)]
pub struct Dispatcher {
    compiler: Arc<dyn SpecCompiler>,
    renderer: Arc<dyn SvgRenderer>,
    rasterizer: Rasterizer,
}

impl Dispatcher {
    /// Create a dispatcher over a compiler, an SVG renderer and a rasterizer.
    pub fn new(
        compiler: Arc<dyn SpecCompiler>,
        renderer: Arc<dyn SvgRenderer>,
        rasterizer: Rasterizer,
    ) -> Self {
        Self {
            compiler,
            renderer,
            rasterizer,
        }
    }

    /// Decode a `{kind}/{payload}` suffix and render it as `format`.
    pub async fn render(&self, format: RenderFormat, suffix: &str) -> Result<Rendered, RenderError> {
        let spec = EncodedReference::parse(suffix)?.decode()?;
        tracing::debug!(format = format.route(), kind = %spec.kind, "rendering specification");

        match format {
            RenderFormat::VegaLiteJson => Ok(Rendered::new(format, spec.source)),
            RenderFormat::VegaJson => match spec.kind {
                SpecKind::Vega => Ok(Rendered::new(format, spec.source)),
                SpecKind::VegaLite => {
                    let vega = self.compiler.compile(&spec.document).await?;
                    Ok(Rendered::new(format, serde_json::to_string_pretty(&vega)?))
                }
            },
            RenderFormat::Svg => {
                let svg = self.svg(spec).await?;
                Ok(Rendered::new(format, svg))
            }
            RenderFormat::Png => {
                let svg = self.svg(spec).await?;
                Ok(Rendered::new(format, self.rasterizer.rasterize(svg).await?))
            }
        }
    }

    async fn svg(&self, spec: DecodedSpec) -> Result<String, RenderError> {
        let vega = if spec.kind.needs_compile() {
            self.compiler.compile(&spec.document).await?
        } else {
            spec.document
        };
        self.renderer.render_svg(&vega).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use vega_unfurl_core::DecodeError;
    use vega_unfurl_core::codec::{compress_text, encode};

    const SVG: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" width="20" height="10"><rect width="20" height="10" fill="#4c78a8"/></svg>"##;

    #[derive(Default)]
    struct CountingCompiler {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl SpecCompiler for CountingCompiler {
        async fn compile(&self, vega_lite: &Value) -> Result<Value, RenderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(json!({"compiled_from": vega_lite.clone(), "marks": []}))
        }
    }

    #[derive(Default)]
    struct FixedRenderer {
        seen: std::sync::Mutex<Vec<Value>>,
    }

    #[async_trait]
    impl SvgRenderer for FixedRenderer {
        async fn render_svg(&self, vega: &Value) -> Result<String, RenderError> {
            self.seen.lock().unwrap().push(vega.clone());
            Ok(SVG.to_string())
        }
    }

    fn dispatcher() -> (Dispatcher, Arc<CountingCompiler>, Arc<FixedRenderer>) {
        let compiler = Arc::new(CountingCompiler::default());
        let renderer = Arc::new(FixedRenderer::default());
        (
            Dispatcher::new(compiler.clone(), renderer.clone(), Rasterizer::default()),
            compiler,
            renderer,
        )
    }

    fn suffix(kind: SpecKind, doc: &Value) -> String {
        format!("{kind}/{}", encode(doc))
    }

    #[tokio::test]
    async fn test_vega_lite_compiled_before_render() {
        let (dispatcher, compiler, renderer) = dispatcher();
        let doc = json!({"mark": "bar"});

        let rendered = dispatcher
            .render(RenderFormat::Svg, &suffix(SpecKind::VegaLite, &doc))
            .await
            .unwrap();

        assert_eq!(rendered.content_type, "image/svg+xml");
        assert_eq!(rendered.body, SVG.as_bytes());
        assert_eq!(compiler.calls.load(Ordering::SeqCst), 1);
        assert_eq!(renderer.seen.lock().unwrap()[0]["compiled_from"], doc);
    }

    #[tokio::test]
    async fn test_vega_rendered_without_compile() {
        let (dispatcher, compiler, renderer) = dispatcher();
        let doc = json!({"marks": [{"type": "rect"}]});

        dispatcher
            .render(RenderFormat::Svg, &suffix(SpecKind::Vega, &doc))
            .await
            .unwrap();

        assert_eq!(compiler.calls.load(Ordering::SeqCst), 0);
        assert_eq!(renderer.seen.lock().unwrap()[0], doc);
    }

    #[tokio::test]
    async fn test_png_is_rasterized_svg() {
        let (dispatcher, _, _) = dispatcher();
        let rendered = dispatcher
            .render(RenderFormat::Png, &suffix(SpecKind::Vega, &json!({})))
            .await
            .unwrap();

        assert_eq!(rendered.content_type, "image/png");
        assert!(rendered.body.starts_with(b"\x89PNG"));
    }

    #[tokio::test]
    async fn test_vega_json_formats() {
        let (dispatcher, compiler, _) = dispatcher();

        let vega = json!({"marks": []});
        let rendered = dispatcher
            .render(RenderFormat::VegaJson, &suffix(SpecKind::Vega, &vega))
            .await
            .unwrap();
        assert_eq!(serde_json::from_slice::<Value>(&rendered.body).unwrap(), vega);
        assert_eq!(compiler.calls.load(Ordering::SeqCst), 0);

        let lite = json!({"mark": "point"});
        let rendered = dispatcher
            .render(RenderFormat::VegaJson, &suffix(SpecKind::VegaLite, &lite))
            .await
            .unwrap();
        let compiled: Value = serde_json::from_slice(&rendered.body).unwrap();
        assert_eq!(compiled["compiled_from"], lite);
        assert_eq!(compiler.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_vega_lite_json_is_verbatim() {
        let (dispatcher, compiler, _) = dispatcher();
        let text = "{ \"mark\" :  \"area\" }";
        let payload = compress_text(text);

        let rendered = dispatcher
            .render(RenderFormat::VegaLiteJson, &format!("vega-lite/{payload}"))
            .await
            .unwrap();
        assert_eq!(rendered.body, text.as_bytes());
        assert_eq!(rendered.content_type, "application/json; charset=utf-8");
        assert_eq!(compiler.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_bad_suffix_is_decode_error() {
        let (dispatcher, _, _) = dispatcher();
        let err = dispatcher
            .render(RenderFormat::Svg, "vega-9/abc")
            .await
            .unwrap_err();
        assert!(matches!(err, RenderError::Decode(DecodeError::UnknownKind(_))));
    }
}
