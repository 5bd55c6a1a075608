//! JSON-lines transport over stdin/stdout.
//!
//! Each input line is `{"tool": "<name>", "params": {...}}`; each answer is a
//! single line, `{"tool", "result"}` on success or `{"tool", "error"}` on
//! failure. `{"tool": "manifest"}` lists the registered tools. Blank lines
//! are skipped. Logs never go to stdout.

use anyhow::Result;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, warn};

use crate::tools::ToolRegistry;

pub const MANIFEST_REQUEST: &str = "manifest";

#[derive(Debug, Deserialize)]
struct Request {
    tool: String,
    #[serde(default)]
    params: Value,
}

/// Answer one request line. `None` for blank input.
pub async fn handle_line(registry: &ToolRegistry, line: &str) -> Option<Value> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    let request: Request = match serde_json::from_str(line) {
        Ok(r) => r,
        Err(e) => {
            warn!(error = %e, "Malformed request line");
            return Some(json!({ "error": format!("Invalid request: {e}") }));
        }
    };

    if request.tool == MANIFEST_REQUEST {
        return Some(json!({ "tool": MANIFEST_REQUEST, "result": registry.manifest() }));
    }

    debug!(tool = %request.tool, "Dispatching request");
    Some(match registry.invoke(&request.tool, request.params).await {
        Ok(result) => json!({ "tool": request.tool, "result": result }),
        Err(e) => {
            warn!(tool = %request.tool, error = %e, "Tool invocation failed");
            json!({ "tool": request.tool, "error": e.to_string() })
        }
    })
}

/// Serve requests until `reader` reaches EOF.
pub async fn serve<R, W>(registry: &ToolRegistry, reader: R, mut writer: W) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = reader.lines();
    while let Some(line) = lines.next_line().await? {
        if let Some(response) = handle_line(registry, &line).await {
            let mut out = serde_json::to_string(&response)?;
            out.push('\n');
            writer.write_all(out.as_bytes()).await?;
            writer.flush().await?;
        }
    }
    Ok(())
}
