use thiserror::Error;
use tracing::error;

pub mod paynpro_client;
pub mod razorpay_client;
pub mod signing;

/// Structured failure from a provider call. Carries the HTTP status and the
/// raw response body so failure diagnostics survive log rotation and stay
/// queryable next to the affected payment/payout row.
#[derive(Debug, Error)]
#[error("{context} failed (status {status:?}): {message}")]
pub struct GatewayError {
    pub context: &'static str,
    pub status: Option<u16>,
    pub body: String,
    pub message: String,
}

impl GatewayError {
    pub fn malformed(context: &'static str, body: String, message: String) -> Self {
        Self {
            context,
            status: None,
            body,
            message,
        }
    }
}

/// Passes a 2xx response through; otherwise drains the body, pulls the
/// provider's error description out of the common envelope shapes and returns
/// a `GatewayError` with the raw body attached.
pub(crate) async fn ensure_success(
    resp: reqwest::Response,
    context: &'static str,
) -> Result<reqwest::Response, GatewayError> {
    if resp.status().is_success() {
        return Ok(resp);
    }

    let status = resp.status();
    let body = match resp.text().await {
        Ok(text) if !text.is_empty() => text,
        Ok(_) => "<empty response body>".to_string(),
        Err(err) => format!("<failed to read response body: {err}>"),
    };

    let message = parse_provider_error(&body).unwrap_or_else(|| format!("{context} failed"));

    error!(
        status = status.as_u16(),
        response_body = %body,
        context,
        "gateway request failed"
    );

    Err(GatewayError {
        context,
        status: Some(status.as_u16()),
        body,
        message,
    })
}

/// Providers wrap errors differently: `{"error": {"description": …}}` on one
/// side, a flat `{"message": …}` on the other.
fn parse_provider_error(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;

    value
        .pointer("/error/description")
        .or_else(|| value.pointer("/message"))
        .and_then(|v| v.as_str())
        .map(|v| v.to_string())
}
