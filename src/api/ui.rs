use super::envelope::Envelope;
use super::AppState;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use serde_json::json;

/// Where `uiautomator dump` leaves its output.
const DUMP_PATH: &str = "/sdcard/window_dump.xml";

pub(crate) async fn dump_xml(State(manager): State<AppState>) -> Response {
    let dump = match manager
        .execute_shell(&format!("uiautomator dump {DUMP_PATH}"))
        .await
    {
        Ok(output) => output,
        Err(e) => return Envelope::upstream(e.to_string()),
    };

    // uiautomator reports its own failures on stdout.
    if !dump.contains("dumped to") {
        return Envelope::unexpected_shape(
            "uiautomator did not confirm the dump",
            json!({ "output": dump }),
        );
    }

    let xml = match manager.pull_file_text(DUMP_PATH).await {
        Ok(content) => content,
        Err(e) => return Envelope::upstream(e.to_string()),
    };

    if !xml.contains("<?xml") {
        return Envelope::unexpected_shape(
            "dump file carries no XML marker",
            json!({ "output": truncate_for_diagnostics(&xml) }),
        );
    }

    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/xml")],
        xml,
    )
        .into_response()
}

pub(crate) async fn screenshot(State(manager): State<AppState>) -> Response {
    match manager.execute_exec_raw("screencap -p").await {
        Ok(png) if !png.is_empty() => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "image/png")],
            png,
        )
            .into_response(),
        Ok(_) => Envelope::unexpected_shape("screencap produced no output", json!({})),
        Err(e) => Envelope::upstream(e.to_string()),
    }
}

fn truncate_for_diagnostics(output: &str) -> String {
    const LIMIT: usize = 512;
    if output.len() <= LIMIT {
        return output.to_string();
    }
    let mut end = LIMIT;
    while !output.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}…", &output[..end])
}
