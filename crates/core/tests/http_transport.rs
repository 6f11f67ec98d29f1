use axum::{
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use flightdeck_api::{config::Config, *};
use flightdeck_core::{factories::*, *};
use flightdeck_test_utils::{collab::*, enable_tracing};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

static STALLED_CALLS: AtomicUsize = AtomicUsize::new(0);

async fn serve() -> String {
    let app = Router::new()
        .route(
            "/api/hosts",
            get(|| async {
                Json(json!({
                    "result": true,
                    "bk_error_code": 0,
                    "bk_error_msg": null,
                    "data": ["web-1", "web-2"],
                }))
            }),
        )
        .route(
            "/api/missing-host",
            get(|| async {
                Json(json!({
                    "result": false,
                    "bk_error_code": 1101,
                    "bk_error_msg": "host not found",
                    "data": null,
                }))
            }),
        )
        .route(
            "/api/acl",
            get(|| async {
                Json(json!({
                    "result": false,
                    "bk_error_code": 9900403,
                    "bk_error_msg": "no permission",
                    "data": null,
                    "permission": [{ "action": "edit", "resource": "host" }],
                }))
            }),
        )
        .route(
            "/api/stalled",
            get(|| async {
                STALLED_CALLS.fetch_add(1, Ordering::SeqCst);
                std::future::pending::<StatusCode>().await
            }),
        )
        .route(
            "/api/echo",
            post(|Json(body): Json<Value>| async move {
                Json(json!({ "result": true, "data": body }))
            }),
        )
        .route("/api/empty", get(|| async { StatusCode::NO_CONTENT }))
        .route(
            "/api/broken",
            get(|| async {
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({
                        "result": false,
                        "bk_error_code": 1199,
                        "bk_error_msg": "database is down",
                    })),
                )
            }),
        )
        .route(
            "/api/crash",
            get(|| async { (StatusCode::BAD_GATEWAY, "bad gateway") }),
        )
        .route("/api/session", get(|| async { StatusCode::UNAUTHORIZED }));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}/api/")
}

struct Case {
    orch: Orchestrator,
    notifier: Arc<RecordingNotifier>,
    navigator: Arc<RecordingNavigator>,
}

async fn setup() -> Case {
    enable_tracing();
    let base_url = serve().await;
    let notifier = RecordingNotifier::create();
    let navigator = RecordingNavigator::create();
    let transport = HttpTransport::new(
        flightdeck_core::factories::http_transport::HttpTransportConfig {
            base_url: Some(base_url),
            ..Default::default()
        },
    )
    .unwrap();
    let orch = Orchestrator::new(
        OrchestratorConfig::default(),
        Arc::new(transport),
        notifier.clone(),
        navigator.clone(),
    );
    Case {
        orch,
        notifier,
        navigator,
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn success_envelope_resolves_with_data() {
    let c = setup().await;
    assert_eq!(
        Outcome::Success(Payload::Data(json!(["web-1", "web-2"]))),
        c.orch.get("hosts", RequestOptions::default()).await
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn original_response_carries_status() {
    let c = setup().await;
    let out = c
        .orch
        .get("hosts", RequestOptions::default().original_response(true))
        .await;
    match out {
        Outcome::Success(Payload::Response(r)) => {
            assert_eq!(200, r.status);
            assert_eq!(Some(true), r.envelope.result);
        }
        oth => panic!("unexpected {oth:?}"),
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn application_failure_is_notified() {
    let c = setup().await;
    let out = c.orch.get("missing-host", RequestOptions::default()).await;
    match out {
        Outcome::AppFailure(e) => assert_eq!(1101, e.code),
        oth => panic!("unexpected {oth:?}"),
    }
    assert_eq!(vec!["host not found"], c.notifier.messages());
}

#[tokio::test(flavor = "multi_thread")]
async fn permission_failure_is_recognized() {
    let c = setup().await;
    let out = c.orch.get("acl", RequestOptions::default()).await;
    match out {
        Outcome::AppFailure(e) => {
            assert_eq!(9900403, e.code);
            assert_eq!(
                Some(json!([{ "action": "edit", "resource": "host" }])),
                e.permission
            );
        }
        oth => panic!("unexpected {oth:?}"),
    }
    assert_eq!(vec!["no permission"], c.notifier.messages());
}

#[tokio::test(flavor = "multi_thread")]
async fn cancelling_aborts_the_http_call() {
    let c = setup().await;
    let fut = c
        .orch
        .submit(
            Method::Get,
            "stalled",
            None,
            RequestOptions::default().with_request_id("stalled"),
        )
        .await;

    // wait until the server is actually handling the call
    flightdeck_test_utils::iter_check!(5000, {
        if STALLED_CALLS.load(Ordering::SeqCst) > 0 {
            break;
        }
    });
    assert!(c.orch.queue().is_loading("stalled"));

    c.orch.cancel_request("stalled").await.unwrap();

    assert_eq!(
        Outcome::Cancelled(Cancelled::new("Request cancelled")),
        fut.await
    );
    assert!(c.orch.queue().is_empty());
    assert!(c.notifier.messages().is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn post_sends_json_body() {
    let c = setup().await;
    let body = json!({ "name": "web-3", "cpus": 4 });
    assert_eq!(
        Outcome::Success(Payload::Data(body.clone())),
        c.orch.post("echo", body, RequestOptions::default()).await
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn empty_body_is_success() {
    let c = setup().await;
    assert_eq!(
        Outcome::Success(Payload::Data(Value::Null)),
        c.orch.get("empty", RequestOptions::default()).await
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn server_errors() {
    let c = setup().await;

    let out = c.orch.get("broken", RequestOptions::default()).await;
    match out {
        Outcome::TransportFailure(e) => {
            assert_eq!(Some(500), e.status);
            assert_eq!("database is down", &*e.message);
        }
        oth => panic!("unexpected {oth:?}"),
    }

    let out = c.orch.get("crash", RequestOptions::default()).await;
    match out {
        Outcome::TransportFailure(e) => {
            assert_eq!(Some(502), e.status);
            assert_eq!(
                OrchestratorConfig::default().server_error_message,
                &*e.message
            );
        }
        oth => panic!("unexpected {oth:?}"),
    }

    let out = c.orch.get("nope", RequestOptions::default()).await;
    match out {
        Outcome::TransportFailure(e) => {
            assert_eq!("Request failed with status code 404", &*e.message);
        }
        oth => panic!("unexpected {oth:?}"),
    }

    assert_eq!(3, c.notifier.messages().len());
}

#[tokio::test(flavor = "multi_thread")]
async fn unauthorized_redirects_to_login() {
    let c = setup().await;
    let out = c.orch.get("session", RequestOptions::default()).await;
    assert!(matches!(
        out,
        Outcome::TransportFailure(e) if e.status == Some(401)
    ));
    assert_eq!(vec!["/login"], c.navigator.redirects());
    assert!(c.notifier.messages().is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn connection_refused_is_a_network_failure() {
    enable_tracing();
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let transport = HttpTransport::new(Default::default()).unwrap();
    let err = transport
        .call(TransportRequest {
            method: Method::Get,
            url: format!("http://{addr}/"),
            body: None,
            config: Arc::new(RequestConfig::merge(
                Method::Get,
                "/",
                RequestOptions::default(),
            )),
        })
        .await
        .unwrap_err();
    assert_eq!(TransportErrorKind::Network, err.kind);
    assert_eq!(None, err.status);
}

#[tokio::test(flavor = "multi_thread")]
async fn default_builder_with_base_url() {
    enable_tracing();
    let base_url = serve().await;

    let mut builder = default_builder().unwrap();
    builder
        .config
        .set_module_config(
            "httpTransport".into(),
            &flightdeck_core::factories::http_transport::HttpTransportConfig {
                base_url: Some(base_url),
                ..Default::default()
            },
        )
        .unwrap();

    let orch = Orchestrator::create(builder.build()).await.unwrap();
    assert_eq!(
        Outcome::Success(Payload::Data(json!(["web-1", "web-2"]))),
        orch.get("hosts", RequestOptions::default()).await
    );
}

#[test]
fn default_builder_config_holds_every_module() {
    let builder = default_builder().unwrap();
    let json = serde_json::to_value(&builder.config).unwrap();
    assert!(json.get("orchestrator").is_some());
    assert!(json.get("httpTransport").is_some());

    // loading a config file with only some keys still works
    let config = Config::from_json(r#"{"orchestrator":{"loginUrl":"/sso"}}"#)
        .unwrap();
    let c: OrchestratorConfig =
        config.get_module_config("orchestrator").unwrap();
    assert_eq!("/sso", c.login_url);
}
