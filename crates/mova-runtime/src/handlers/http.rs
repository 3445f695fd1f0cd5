use mova_core::{Context, EngineError, HttpPayload, Result};
use reqwest::Client;
use serde_json::{json, Value};

use super::HandlerOutcome;
use crate::interpolate::stringify;

const DEFAULT_RESULT_VARIABLE: &str = "response";
const ERROR_VARIABLE: &str = "http_error";

/// Performs the HTTP call and stores `{status, body}` at `result_in`.
/// Transport errors and non-2xx statuses do not raise: the description is
/// recorded at `http_error` and the action yields `Failure` so `on_error`
/// continuations can react.
pub(crate) async fn request(
    client: &Client,
    payload: HttpPayload,
    dry_run: bool,
    ctx: &mut Context,
) -> Result<HandlerOutcome> {
    let method = payload.method.as_deref().unwrap_or("GET").to_uppercase();
    let result_in = payload.result_in.as_deref().unwrap_or(DEFAULT_RESULT_VARIABLE);

    if dry_run {
        tracing::info!(%method, url = %payload.url, "dry-run: not sending http request");
        ctx.set_path(result_in, json!({ "status": 0, "body": null }));
        return Ok(HandlerOutcome::Success);
    }

    let mut request = match method.as_str() {
        "GET" => client.get(&payload.url),
        "POST" => client.post(&payload.url),
        "PUT" => client.put(&payload.url),
        "DELETE" => client.delete(&payload.url),
        "PATCH" => client.patch(&payload.url),
        "HEAD" => client.head(&payload.url),
        other => {
            return Err(EngineError::Http {
                url: payload.url.clone(),
                message: format!("unknown HTTP method: {other}"),
            })
        }
    };

    if let Some(body) = &payload.body {
        request = match body {
            Value::String(raw) => request.body(raw.clone()),
            other => request.json(other),
        };
    }

    // headers go after the body so a caller-supplied Content-Type wins
    for (key, value) in &payload.headers {
        request = request.header(key.as_str(), stringify(value));
    }

    let response = match request.send().await {
        Ok(response) => response,
        Err(e) => return Ok(record_failure(ctx, &payload.url, &e.to_string())),
    };

    let status = response.status();
    let text = match response.text().await {
        Ok(text) => text,
        Err(e) => return Ok(record_failure(ctx, &payload.url, &e.to_string())),
    };

    if !status.is_success() {
        return Ok(record_failure(
            ctx,
            &payload.url,
            &format!("HTTP {}", status.as_u16()),
        ));
    }

    let body = serde_json::from_str(&text).unwrap_or(Value::String(text));
    ctx.set_path(result_in, json!({ "status": status.as_u16(), "body": body }));
    Ok(HandlerOutcome::Success)
}

fn record_failure(ctx: &mut Context, url: &str, message: &str) -> HandlerOutcome {
    tracing::warn!(%url, %message, "http request failed");
    ctx.set_path(ERROR_VARIABLE, Value::String(format!("{url}: {message}")));
    HandlerOutcome::Failure
}
