use super::envelope::Envelope;
use super::AppState;
use axum::extract::State;
use axum::response::Response;
use serde_json::{json, Value};

pub(crate) async fn health() -> Response {
    Envelope::ok(json!({ "status": "up" }))
}

pub(crate) async fn info(State(manager): State<AppState>) -> Response {
    let status = manager.status().await;

    let mut data = json!({
        "adb": {
            "connected": status.connected,
            "tls": status.tls,
            "banner": status.banner,
        },
        "device": Value::Null,
        "display": Value::Null,
        "clickRange": Value::Null,
    });

    if status.connected {
        data["device"] = device_info(&manager).await;
        if let Some((width, height)) = display_size(&manager).await {
            data["display"] = json!({ "width": width, "height": height });
            data["clickRange"] = json!({
                "maxX": width.saturating_sub(1),
                "maxY": height.saturating_sub(1),
            });
        }
    }

    Envelope::ok(data)
}

async fn device_info(manager: &AppState) -> Value {
    let model = getprop(manager, "ro.product.model").await;
    let manufacturer = getprop(manager, "ro.product.manufacturer").await;
    let release = getprop(manager, "ro.build.version.release").await;
    let sdk = getprop(manager, "ro.build.version.sdk").await;

    json!({
        "model": model,
        "manufacturer": manufacturer,
        "androidVersion": release,
        "sdk": sdk,
    })
}

async fn getprop(manager: &AppState, prop: &str) -> Option<String> {
    manager
        .execute_shell(&format!("getprop {prop}"))
        .await
        .ok()
        .filter(|v| !v.is_empty())
}

/// Parse `wm size` output: `Physical size: 1080x2400` (an override line
/// wins when present).
async fn display_size(manager: &AppState) -> Option<(u32, u32)> {
    let output = manager.execute_shell("wm size").await.ok()?;

    let mut parsed = None;
    for line in output.lines() {
        if let Some((_, dims)) = line.rsplit_once(": ") {
            if let Some((w, h)) = dims.trim().split_once('x') {
                if let (Ok(w), Ok(h)) = (w.trim().parse(), h.trim().parse()) {
                    parsed = Some((w, h));
                }
            }
        }
    }
    parsed
}
