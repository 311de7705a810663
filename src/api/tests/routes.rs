use crate::api;
use crate::connection::SessionManager;
use crate::testing::{shared_identity, MockDaemon, MockDaemonConfig};
use crate::types::AdbLinkConfig;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::Value;
use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;
use tower::util::ServiceExt;

fn detached_manager() -> Arc<SessionManager> {
    Arc::new(SessionManager::new(
        shared_identity(),
        AdbLinkConfig::builder().build(),
    ))
}

async fn connected_manager(config: MockDaemonConfig) -> (MockDaemon, Arc<SessionManager>) {
    let mut daemon = MockDaemon::new(config);
    let addr = daemon.start().await.unwrap();

    let manager = detached_manager();
    manager
        .connect(IpAddr::V4(Ipv4Addr::LOCALHOST), addr.port(), false)
        .await
        .unwrap();
    (daemon, manager)
}

fn json_post(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn health_reports_up() {
    let app = api::router(detached_manager());

    let response = app
        .oneshot(Request::get("/v1/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["code"], 0);
    assert_eq!(body["message"], "ok");
    assert_eq!(body["data"]["status"], "up");
}

#[tokio::test]
async fn click_dispatches_input_tap() {
    let (daemon, manager) = connected_manager(MockDaemonConfig::default()).await;
    let app = api::router(manager);

    let response = app
        .oneshot(json_post("/v1/control/click", r#"{"x":300,"y":800}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["data"]["command"], "input tap 300 800");

    assert_eq!(
        daemon.opened_services().await,
        vec!["shell:input tap 300 800".to_string()]
    );
}

#[tokio::test]
async fn click_rejects_negative_coordinates() {
    let app = api::router(detached_manager());

    let response = app
        .oneshot(json_post("/v1/control/click", r#"{"x":-1,"y":800}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = body_json(response).await;
    assert_eq!(body["code"], 40002);
}

#[tokio::test]
async fn click_without_a_session_is_service_unavailable() {
    let app = api::router(detached_manager());

    let response = app
        .oneshot(json_post("/v1/control/click", r#"{"x":1,"y":2}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    let body = body_json(response).await;
    assert_eq!(body["code"], 50002);
}

#[tokio::test]
async fn swipe_clamps_the_duration() {
    let (daemon, manager) = connected_manager(MockDaemonConfig::default()).await;
    let app = api::router(manager);

    let response = app
        .oneshot(json_post(
            "/v1/control/swipe",
            r#"{"startX":0,"startY":0,"endX":100,"endY":100,"durationMs":120000}"#,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["data"]["command"], "input swipe 0 0 100 100 60000");
    assert_eq!(body["data"]["durationMs"], 60000);

    assert_eq!(
        daemon.opened_services().await,
        vec!["shell:input swipe 0 0 100 100 60000".to_string()]
    );
}

#[tokio::test]
async fn swipe_rejects_negative_coordinates() {
    let app = api::router(detached_manager());

    let response = app
        .oneshot(json_post(
            "/v1/control/swipe",
            r#"{"startX":-5,"startY":0,"endX":100,"endY":100,"durationMs":300}"#,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], 40012);
}

#[tokio::test]
async fn input_validation_codes() {
    let app = api::router(detached_manager());
    let response = app
        .oneshot(json_post(
            "/v1/control/input",
            r#"{"text":"","enterAction":"auto"}"#,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], 40032);

    let app = api::router(detached_manager());
    let response = app
        .oneshot(json_post(
            "/v1/control/input",
            r#"{"text":"hi","enterAction":"foo"}"#,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], 40035);

    let app = api::router(detached_manager());
    let long = "a".repeat(4097);
    let response = app
        .oneshot(json_post(
            "/v1/control/input",
            &format!(r#"{{"text":"{long}","enterAction":"auto"}}"#),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], 40033);
}

#[tokio::test]
async fn input_escapes_text_and_presses_enter() {
    let (daemon, manager) = connected_manager(MockDaemonConfig::default()).await;
    let app = api::router(manager);

    let response = app
        .oneshot(json_post(
            "/v1/control/input",
            r#"{"text":"hello world","pressEnter":true,"enterAction":"search"}"#,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["data"]["command"], "input text 'hello%sworld'");
    assert_eq!(body["data"]["enterCommand"], "input keyevent 84");

    assert_eq!(
        daemon.opened_services().await,
        vec![
            "shell:input text 'hello%sworld'".to_string(),
            "shell:input keyevent 84".to_string(),
        ]
    );
}

#[tokio::test]
async fn ui_xml_round_trips_through_sync_pull() {
    let xml = "<?xml version='1.0' encoding='UTF-8'?><hierarchy rotation=\"0\"/>";

    let mut shell_outputs = HashMap::new();
    shell_outputs.insert(
        "uiautomator dump /sdcard/window_dump.xml".to_string(),
        b"UI hierchary dumped to: /sdcard/window_dump.xml\n".to_vec(),
    );
    let mut files = HashMap::new();
    files.insert("/sdcard/window_dump.xml".to_string(), xml.as_bytes().to_vec());

    let (_daemon, manager) = connected_manager(MockDaemonConfig {
        shell_outputs,
        files,
        ..MockDaemonConfig::default()
    })
    .await;
    let app = api::router(manager);

    let response = app
        .oneshot(json_post("/v1/ui/xml", "{}"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "application/xml"
    );

    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(bytes.as_ref(), xml.as_bytes());
}

#[tokio::test]
async fn ui_xml_with_no_marker_is_a_diagnostic_500() {
    let mut shell_outputs = HashMap::new();
    shell_outputs.insert(
        "uiautomator dump /sdcard/window_dump.xml".to_string(),
        b"ERROR: could not get idle state.\n".to_vec(),
    );

    let (_daemon, manager) = connected_manager(MockDaemonConfig {
        shell_outputs,
        ..MockDaemonConfig::default()
    })
    .await;
    let app = api::router(manager);

    let response = app
        .oneshot(json_post("/v1/ui/xml", "{}"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body = body_json(response).await;
    assert_eq!(body["code"], 50001);
    assert!(body["data"]["output"]
        .as_str()
        .unwrap()
        .contains("could not get idle state"));
}

#[tokio::test]
async fn screenshot_streams_png_bytes() {
    let png = vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 1, 2, 3];
    let mut shell_outputs = HashMap::new();
    shell_outputs.insert("screencap -p".to_string(), png.clone());

    let (daemon, manager) = connected_manager(MockDaemonConfig {
        shell_outputs,
        ..MockDaemonConfig::default()
    })
    .await;
    let app = api::router(manager);

    let response = app
        .oneshot(json_post("/v1/ui/screenshot", "{}"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "image/png");

    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(bytes.as_ref(), png.as_slice());

    // screencap must go through exec:, not shell:.
    assert_eq!(
        daemon.opened_services().await,
        vec!["exec:screencap -p".to_string()]
    );
}

#[tokio::test]
async fn system_info_reports_link_and_device_state() {
    let mut shell_outputs = HashMap::new();
    shell_outputs.insert("getprop ro.product.model".to_string(), b"Pixel 8\n".to_vec());
    shell_outputs.insert(
        "getprop ro.product.manufacturer".to_string(),
        b"Google\n".to_vec(),
    );
    shell_outputs.insert(
        "getprop ro.build.version.release".to_string(),
        b"14\n".to_vec(),
    );
    shell_outputs.insert("getprop ro.build.version.sdk".to_string(), b"34\n".to_vec());
    shell_outputs.insert("wm size".to_string(), b"Physical size: 1080x2400\n".to_vec());

    let (_daemon, manager) = connected_manager(MockDaemonConfig {
        shell_outputs,
        ..MockDaemonConfig::default()
    })
    .await;
    let app = api::router(manager);

    let response = app
        .oneshot(Request::get("/v1/system/info").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["data"]["adb"]["connected"], true);
    assert_eq!(body["data"]["device"]["model"], "Pixel 8");
    assert_eq!(body["data"]["display"]["width"], 1080);
    assert_eq!(body["data"]["clickRange"]["maxX"], 1079);
    assert_eq!(body["data"]["clickRange"]["maxY"], 2399);
}

#[tokio::test]
async fn system_info_without_a_session_still_answers() {
    let app = api::router(detached_manager());

    let response = app
        .oneshot(Request::get("/v1/system/info").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["data"]["adb"]["connected"], false);
    assert!(body["data"]["device"].is_null());
}
