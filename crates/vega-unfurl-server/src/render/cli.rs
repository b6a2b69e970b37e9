//! Vega command line tools as compiler and renderer.
//!
//! `vl2vg` reads a Vega-Lite document on stdin and writes Vega JSON;
//! `vg2svg --base {data}` reads Vega JSON and writes SVG markup. Relative
//! data URLs inside a document load against the dataset base.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use super::{SpecCompiler, SvgRenderer};
use crate::error::RenderError;

/// Runs the Vega command line tools as child processes.
#[derive(Debug, Clone)]
pub struct CliRenderer {
    vl2vg_bin: String,
    vg2svg_bin: String,
    data_base_url: String,
    timeout: Duration,
}

/// Which stage a tool run belongs to, for error reporting.
#[derive(Clone, Copy)]
enum Stage {
    Compile,
    Render,
}

impl CliRenderer {
    pub fn new(
        vl2vg_bin: impl Into<String>,
        vg2svg_bin: impl Into<String>,
        data_base_url: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            vl2vg_bin: vl2vg_bin.into(),
            vg2svg_bin: vg2svg_bin.into(),
            data_base_url: data_base_url.into(),
            timeout,
        }
    }

    async fn run_tool(
        &self,
        stage: Stage,
        program: &str,
        args: &[&str],
        input: Vec<u8>,
    ) -> Result<Vec<u8>, RenderError> {
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        // stdin is written from its own task while stdout drains below.
        if let Some(mut stdin) = child.stdin.take() {
            let program = program.to_string();
            tokio::spawn(async move {
                if let Err(e) = stdin.write_all(&input).await {
                    tracing::debug!(program = %program, error = %e, "tool closed stdin early");
                }
            });
        }

        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| RenderError::Timeout {
                program: program.to_string(),
                secs: self.timeout.as_secs(),
            })??;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let message = format!("{program} exited with {}: {stderr}", output.status);
            tracing::warn!(program = %program, status = %output.status, "vega tool failed");
            return Err(match stage {
                Stage::Compile => RenderError::Compile(message),
                Stage::Render => RenderError::Render(message),
            });
        }

        Ok(output.stdout)
    }
}

#[async_trait]
impl SpecCompiler for CliRenderer {
    async fn compile(&self, vega_lite: &Value) -> Result<Value, RenderError> {
        let stdout = self
            .run_tool(Stage::Compile, &self.vl2vg_bin, &[], serde_json::to_vec(vega_lite)?)
            .await?;
        serde_json::from_slice(&stdout)
            .map_err(|e| RenderError::Compile(format!("{} wrote invalid JSON: {e}", self.vl2vg_bin)))
    }
}

#[async_trait]
impl SvgRenderer for CliRenderer {
    async fn render_svg(&self, vega: &Value) -> Result<String, RenderError> {
        let stdout = self
            .run_tool(
                Stage::Render,
                &self.vg2svg_bin,
                &["--base", &self.data_base_url],
                serde_json::to_vec(vega)?,
            )
            .await?;
        String::from_utf8(stdout)
            .map_err(|e| RenderError::Render(format!("{} wrote non-UTF-8 output: {e}", self.vg2svg_bin)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn renderer(vl2vg: &str, vg2svg: &str) -> CliRenderer {
        CliRenderer::new(
            vl2vg,
            vg2svg,
            "https://vega.github.io/vega-datasets/",
            Duration::from_secs(5),
        )
    }

    #[tokio::test]
    async fn test_compile_reads_tool_stdout() {
        // cat echoes the document back, standing in for an identity compiler.
        let doc = json!({"mark": "bar", "data": {"url": "data/cars.json"}});
        let compiled = renderer("cat", "cat").compile(&doc).await.unwrap();
        assert_eq!(compiled, doc);
    }

    #[tokio::test]
    async fn test_missing_binary_is_io_error() {
        let err = renderer("vega-unfurl-no-such-tool", "cat")
            .compile(&json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, RenderError::Io(_)));
    }

    #[tokio::test]
    async fn test_failing_tools_map_to_stage() {
        let err = renderer("false", "false").compile(&json!({})).await.unwrap_err();
        assert!(matches!(err, RenderError::Compile(_)));

        let err = renderer("false", "false").render_svg(&json!({})).await.unwrap_err();
        assert!(matches!(err, RenderError::Render(_)));
    }

    #[tokio::test]
    async fn test_non_json_compiler_output_rejected() {
        let err = renderer("true", "true").compile(&json!({})).await.unwrap_err();
        assert!(matches!(err, RenderError::Compile(_)));
    }
}
