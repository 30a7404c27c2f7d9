//! Stdio transport: one JSON-RPC object per line on stdin, one response
//! object per line on stdout. Stdout is reserved for frames — all
//! diagnostics go to stderr via `tracing` (spec §4.8, §6).

use crate::dispatcher::Dispatcher;
use crate::jsonrpc::{JsonRpcError, JsonRpcResponse, METHOD_NOT_FOUND};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

/// Runs the stdio read-dispatch-write loop until stdin closes. Each line
/// is handled independently — a malformed line yields a parse-error
/// response but does not abort the loop.
pub async fn serve(dispatcher: Arc<Dispatcher>) -> std::io::Result<()> {
    let stdin = tokio::io::stdin();
    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(stdin).lines();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }

        let response = match crate::jsonrpc::parse_request(&line) {
            Ok(request) => {
                let id = request.id.clone();
                match dispatcher.dispatch(&request.method, &request.params).await {
                    Some(envelope) => JsonRpcResponse::success(
                        id,
                        serde_json::to_value(envelope).unwrap_or(serde_json::Value::Null),
                    ),
                    None => JsonRpcResponse::failure(
                        id,
                        JsonRpcError::new(METHOD_NOT_FOUND, format!("unknown tool '{}'", request.method)),
                    ),
                }
            }
            Err(e) => {
                tracing::warn!(error = %e.message, "malformed JSON-RPC frame on stdin");
                JsonRpcResponse::failure(None, e)
            }
        };

        let mut payload = serde_json::to_vec(&response).unwrap_or_default();
        payload.push(b'\n');
        stdout.write_all(&payload).await?;
        stdout.flush().await?;
    }

    Ok(())
}
