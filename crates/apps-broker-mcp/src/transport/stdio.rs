//! Stdio transport — reads JSON-RPC from stdin, writes to stdout.
//!
//! One message is handled end-to-end at a time; stdout carries only
//! protocol frames, all logging goes to stderr.

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use crate::protocol::ProtocolHandler;
use crate::types::{JsonRpcError, JsonRpcMessage, McpError, McpResult, RequestId};

pub struct StdioTransport {
    handler: ProtocolHandler,
}

impl StdioTransport {
    pub fn new(handler: ProtocolHandler) -> Self {
        Self { handler }
    }

    /// Run the transport loop until EOF or a shutdown/exit request.
    pub async fn run(&self) -> McpResult<()> {
        let stdin = tokio::io::stdin();
        let mut stdout = tokio::io::stdout();
        let mut reader = BufReader::new(stdin);
        let mut line = String::new();

        tracing::info!("Stdio transport started");

        loop {
            line.clear();
            let bytes_read = reader.read_line(&mut line).await.map_err(McpError::Io)?;

            if bytes_read == 0 {
                tracing::info!("EOF on stdin, shutting down");
                break;
            }

            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            match super::framing::parse_message(trimmed) {
                Ok(msg) => {
                    let exit = matches!(
                        &msg,
                        JsonRpcMessage::Request(r) if ProtocolHandler::is_exit_method(&r.method)
                    );

                    if let Some(response) = self.handler.handle_message(msg).await {
                        write_frame(&mut stdout, &response).await?;
                    }

                    if exit {
                        tracing::info!("Shutdown requested, leaving stdio loop");
                        break;
                    }
                }
                Err(e) => {
                    tracing::warn!("Parse error: {e}");
                    let error = e.to_json_rpc_error(RequestId::Null);
                    let value = serde_json::to_value::<JsonRpcError>(error)
                        .map_err(|e| McpError::InternalError(e.to_string()))?;
                    write_frame(&mut stdout, &value).await?;
                }
            }
        }

        Ok(())
    }
}

async fn write_frame(
    stdout: &mut tokio::io::Stdout,
    value: &serde_json::Value,
) -> McpResult<()> {
    let framed = super::framing::frame_message(value)?;
    stdout
        .write_all(framed.as_bytes())
        .await
        .map_err(McpError::Io)?;
    stdout.flush().await.map_err(McpError::Io)
}
