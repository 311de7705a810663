use super::envelope::{codes, Envelope};
use super::AppState;
use axum::extract::State;
use axum::response::Response;
use axum::Json;
use serde::Deserialize;
use serde_json::json;

/// Duration bounds for a swipe gesture, milliseconds.
const SWIPE_DURATION_MIN: i64 = 1;
const SWIPE_DURATION_MAX: i64 = 60_000;

/// Length cap on injected text.
const INPUT_TEXT_MAX: usize = 4096;

const ENTER_ACTIONS: &[&str] = &[
    "auto", "search", "send", "done", "go", "next", "enter", "none",
];

#[derive(Debug, Deserialize)]
pub(crate) struct ClickRequest {
    x: i64,
    y: i64,
}

pub(crate) async fn click(
    State(manager): State<AppState>,
    Json(request): Json<ClickRequest>,
) -> Response {
    if request.x < 0 || request.y < 0 {
        return Envelope::validation(
            codes::CLICK_NEGATIVE,
            format!("coordinates must be non-negative, got ({}, {})", request.x, request.y),
        );
    }

    let command = format!("input tap {} {}", request.x, request.y);
    let outcome = manager.dispatch_shell(&command).await;
    if !outcome.success {
        return Envelope::upstream(outcome.message);
    }

    Envelope::ok(json!({ "command": command }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SwipeRequest {
    start_x: i64,
    start_y: i64,
    end_x: i64,
    end_y: i64,
    #[serde(default = "default_swipe_duration")]
    duration_ms: i64,
}

fn default_swipe_duration() -> i64 {
    300
}

pub(crate) async fn swipe(
    State(manager): State<AppState>,
    Json(request): Json<SwipeRequest>,
) -> Response {
    if request.start_x < 0 || request.start_y < 0 || request.end_x < 0 || request.end_y < 0 {
        return Envelope::validation(
            codes::SWIPE_NEGATIVE,
            "swipe coordinates must be non-negative",
        );
    }

    let duration = request
        .duration_ms
        .clamp(SWIPE_DURATION_MIN, SWIPE_DURATION_MAX);

    let command = format!(
        "input swipe {} {} {} {} {}",
        request.start_x, request.start_y, request.end_x, request.end_y, duration
    );
    let outcome = manager.dispatch_shell(&command).await;
    if !outcome.success {
        return Envelope::upstream(outcome.message);
    }

    Envelope::ok(json!({ "command": command, "durationMs": duration }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct InputRequest {
    text: String,
    #[serde(default)]
    press_enter: bool,
    #[serde(default = "default_enter_action")]
    enter_action: String,
}

fn default_enter_action() -> String {
    "auto".to_string()
}

pub(crate) async fn input(
    State(manager): State<AppState>,
    Json(request): Json<InputRequest>,
) -> Response {
    if request.text.is_empty() {
        return Envelope::validation(codes::INPUT_EMPTY, "text must not be empty");
    }
    if request.text.chars().count() > INPUT_TEXT_MAX {
        return Envelope::validation(
            codes::INPUT_TOO_LONG,
            format!("text exceeds {INPUT_TEXT_MAX} characters"),
        );
    }
    if !ENTER_ACTIONS.contains(&request.enter_action.as_str()) {
        return Envelope::validation(
            codes::INPUT_BAD_ACTION,
            format!("unknown enterAction {:?}", request.enter_action),
        );
    }

    let command = format!("input text '{}'", escape_input_text(&request.text));
    let outcome = manager.dispatch_shell(&command).await;
    if !outcome.success {
        return Envelope::upstream(outcome.message);
    }

    let mut data = json!({ "command": command });
    if request.press_enter && request.enter_action != "none" {
        let enter_command = format!("input keyevent {}", enter_keycode(&request.enter_action));
        let outcome = manager.dispatch_shell(&enter_command).await;
        if !outcome.success {
            return Envelope::upstream(outcome.message);
        }
        data["enterCommand"] = json!(enter_command);
    }

    Envelope::ok(data)
}

/// `input text` quoting: spaces become `%s`, single quotes close and
/// reopen the quoted span.
fn escape_input_text(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            ' ' => escaped.push_str("%s"),
            '\'' => escaped.push_str(r"'\''"),
            c => escaped.push(c),
        }
    }
    escaped
}

/// The keyevent each editor action maps to. Only search has a dedicated
/// keycode; the rest fall back to plain enter.
fn enter_keycode(action: &str) -> u32 {
    match action {
        "search" => 84,
        _ => 66,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spaces_become_percent_s() {
        assert_eq!(escape_input_text("hello world"), "hello%sworld");
    }

    #[test]
    fn single_quotes_are_shell_escaped() {
        assert_eq!(escape_input_text("it's"), r"it'\''s");
    }

    #[test]
    fn search_gets_its_own_keycode() {
        assert_eq!(enter_keycode("search"), 84);
        assert_eq!(enter_keycode("auto"), 66);
        assert_eq!(enter_keycode("send"), 66);
    }
}
