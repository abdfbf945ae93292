use roomhub_core::{AppError, ErrorMetadata};
use tracing_subscriber::{fmt::format::Format, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// JSON body printed on stdout when a pipeline command fails. Carries the
/// client-safe message only; the full error goes to the log.
pub fn error_body(err: &AppError) -> serde_json::Value {
    serde_json::json!({
        "error": {
            "code": err.error_code(),
            "status": err.http_status_code(),
            "message": err.client_message(),
        }
    })
}

/// Shorten a data URL for display: keeps the `data:<type>;base64,` header
/// and the first `max_payload` characters of the payload.
pub fn preview_data_url(data_url: &str, max_payload: usize) -> String {
    match data_url.split_once(',') {
        Some((header, payload)) if payload.len() > max_payload => {
            let cut = payload
                .char_indices()
                .nth(max_payload)
                .map(|(i, _)| i)
                .unwrap_or(payload.len());
            format!("{},{}... ({} chars)", header, &payload[..cut], payload.len())
        }
        _ => data_url.to_string(),
    }
}

/// Initialize tracing for the CLI. Logs go to stderr so stdout stays
/// machine-readable. `json` switches to one JSON object per event.
pub fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .event_format(Format::default().compact().with_target(false))
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}
