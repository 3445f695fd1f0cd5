use mova_core::LogPayload;
use tokio::io::AsyncWriteExt;

use super::HandlerOutcome;
use crate::interpolate::stringify;

pub(crate) async fn log(payload: LogPayload) -> HandlerOutcome {
    let line = match &payload.message {
        Some(message) => stringify(message),
        None => "No message provided.".to_string(),
    };

    let mut stdout = tokio::io::stdout();
    stdout.write_all(line.as_bytes()).await.ok();
    stdout.write_all(b"\n").await.ok();
    stdout.flush().await.ok();

    HandlerOutcome::Success
}
