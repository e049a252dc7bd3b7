use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::debug;

use super::{Codec, Dispatcher};

/// Serves newline-delimited JSON-RPC text on a reader/writer pair.
///
/// Every non-blank line is dispatched to `service`/`version`; non-empty
/// outputs are written back one per line. Returns when the reader reaches EOF.
pub async fn serve_lines<C: Codec>(
    dispatcher: &Dispatcher<C>,
    service: &str,
    version: &str,
    reader: impl AsyncBufRead + Unpin,
    mut writer: impl AsyncWrite + Unpin,
) -> std::io::Result<()> {
    let mut lines = reader.lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let output = dispatcher.dispatch_text(service, version, &line).await;
        if output.is_empty() {
            continue;
        }
        writer.write_all(output.as_bytes()).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;
    }
    debug!(service, version, "input closed");
    Ok(())
}

/// [`serve_lines`] over the process's standard input and output.
pub async fn serve_stdio<C: Codec>(
    dispatcher: &Dispatcher<C>,
    service: &str,
    version: &str,
) -> std::io::Result<()> {
    serve_lines(
        dispatcher,
        service,
        version,
        BufReader::new(tokio::io::stdin()),
        tokio::io::stdout(),
    )
    .await
}
