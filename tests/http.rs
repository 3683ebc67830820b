use axum::{
    extract::{Path, Query},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use once_cell::sync::Lazy;
use reqwest::Client;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::net::TcpListener;
use std::process::{Child, Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::time::sleep;

struct TestServer {
    base_url: String,
    child: Child,
}

impl Drop for TestServer {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

static TEST_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));
static SERVER: Lazy<Mutex<Option<Arc<TestServer>>>> = Lazy::new(|| Mutex::new(None));
static FAIL_MONTHS: AtomicBool = AtomicBool::new(false);
static UPSTREAM: Lazy<String> = Lazy::new(spawn_upstream);

#[cfg(unix)]
mod cleanup {
    use std::sync::atomic::{AtomicI32, Ordering};
    use std::sync::Once;

    static REGISTER: Once = Once::new();
    static PID: AtomicI32 = AtomicI32::new(0);

    pub fn register(pid: u32) {
        REGISTER.call_once(|| {
            PID.store(pid as i32, Ordering::SeqCst);
            unsafe {
                libc::atexit(on_exit);
            }
        });
    }

    extern "C" fn on_exit() {
        let pid = PID.load(Ordering::SeqCst);
        if pid > 0 {
            unsafe {
                libc::kill(pid, libc::SIGTERM);
            }
        }
    }
}

fn week_id(params: &HashMap<String, String>) -> i64 {
    params
        .get("week_id")
        .and_then(|value| value.parse().ok())
        .unwrap_or(0)
}

fn upstream_router() -> Router {
    Router::new()
        .route(
            "/api/weeks",
            get(|| async {
                Json(json!([
                    {"week_id": 5, "iso_year": 2025, "iso_week": 51, "label": "2025-W51"},
                    {"week_id": 4, "iso_year": 2025, "iso_week": 50, "label": "2025-W50"},
                    {"week_id": 3, "iso_year": 2025, "iso_week": 49, "label": "2025-W49"}
                ]))
            }),
        )
        .route(
            "/api/weeks/months",
            get(|| async {
                if FAIL_MONTHS.load(Ordering::SeqCst) {
                    return Err(StatusCode::INTERNAL_SERVER_ERROR);
                }
                Ok(Json(json!([
                    {"year": 2025, "month": 12, "label": "Dec 2025", "week_ids": [5, 4, 3]}
                ])))
            }),
        )
        .route(
            "/api/revenue",
            get(|Query(params): Query<HashMap<String, String>>| async move {
                let id = week_id(&params);
                Json(json!({
                    "week": {"week_id": id, "iso_year": 2025, "iso_week": 46 + id, "label": "ignored"},
                    "total_inbound": id * 50,
                    "total_outbound": id * 100,
                    "by_product": [
                        {"product_group": "Valves", "direction": "outbound", "revenue": id * 100, "order_count": 2, "target_margin": "0.30"},
                        {"product_group": "Valves", "direction": "inbound", "revenue": id * 50, "order_count": 1}
                    ]
                }))
            }),
        )
        .route(
            "/api/revenue/trend",
            get(|| async {
                Json(json!([
                    {"week_id": 3, "iso_year": 2025, "iso_week": 49, "inbound_revenue": "150", "outbound_revenue": "300", "total_revenue": "450"},
                    {"week_id": 4, "iso_year": 2025, "iso_week": 50, "inbound_revenue": "200", "outbound_revenue": "400", "total_revenue": "600"}
                ]))
            }),
        )
        .route(
            "/api/margin",
            get(|Query(params): Query<HashMap<String, String>>| async move {
                let id = week_id(&params);
                Json(json!({
                    "total_revenue": id * 100,
                    "total_cost": id * 60,
                    "overall_margin": id * 40,
                    "overall_margin_percent": "40.00",
                    "by_product": [
                        {"product_group": "Valves", "revenue": id * 100, "total_cost": id * 60, "gross_margin": id * 40, "margin_percent": "40.00", "target_margin": "0.35", "variance": "5.00"}
                    ]
                }))
            }),
        )
        .route(
            "/api/margin/trend",
            get(|| async {
                Json(json!([
                    {"week_id": 4, "label": "2025-W50", "margin_percent": "38.5"},
                    {"week_id": 5, "label": "2025-W51", "margin_percent": "40.0"}
                ]))
            }),
        )
        .route(
            "/api/labor",
            get(|Query(params): Query<HashMap<String, String>>| async move {
                let id = week_id(&params);
                let closed = params.get("status").map(String::as_str) == Some("completed");
                Json(json!({
                    "total_direct_labor": id * 10,
                    "total_labor_hours": 40,
                    "total_burden": id * 5,
                    "total_burden_hours": 40,
                    "total_labor_cost": id * 15,
                    "job_count": 2,
                    "by_job": [
                        {"job_num": "J-1", "sales_order_num": "SO-1", "job_closed": closed, "labor_hours": 20, "burden_hours": 20, "direct_labor": id * 4, "burden": id * 2, "total_labor": id * 6},
                        {"job_num": "J-2", "job_closed": closed, "labor_hours": 20, "burden_hours": 20, "direct_labor": id * 6, "burden": id * 3, "total_labor": id * 9}
                    ]
                }))
            }),
        )
        .route(
            "/api/drill/category/:category",
            get(|Path(category): Path<String>, Query(params): Query<HashMap<String, String>>| async move {
                let id = week_id(&params);
                Json(json!([
                    {"job_id": 1, "job_num": "J-1", "category": category, "direct_labor": id * 4, "burden": id * 2, "material_cost": id * 4, "total_cost": id * 10},
                    {"job_id": 2, "job_num": "J-2", "category": category, "total_cost": id * 3}
                ]))
            }),
        )
        .route(
            "/api/drill/job/:job_num",
            get(|Path(job_num): Path<String>, Query(params): Query<HashMap<String, String>>| async move {
                let id = week_id(&params);
                Json(json!({
                    "job_id": 1, "job_num": job_num, "direct_labor": id * 4, "burden": id * 2,
                    "material_cost": id * 4, "total_cost": id * 10, "revenue": id * 16
                }))
            }),
        )
        .route(
            "/api/drill/product/:group",
            get(|Path(group): Path<String>| async move {
                Json(json!({
                    "product_group": group,
                    "total_revenue": 500,
                    "total_cost": 300,
                    "total_margin": 200,
                    "margin_percent": "40.00",
                    "categories": [
                        {"category": "Ball", "revenue": 300, "cost": 200, "margin": 100, "margin_percent": "33.33", "job_count": 2},
                        {"category": "Gate", "revenue": 200, "cost": 100, "margin": 100, "margin_percent": "50.00", "job_count": 1}
                    ]
                }))
            }),
        )
}

fn spawn_upstream() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind upstream");
    let addr = listener.local_addr().unwrap();
    listener.set_nonblocking(true).unwrap();
    std::thread::spawn(move || {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .expect("upstream runtime");
        runtime.block_on(async move {
            let listener = tokio::net::TcpListener::from_std(listener).unwrap();
            axum::serve(listener, upstream_router()).await.unwrap();
        });
    });
    format!("http://{addr}")
}

fn pick_free_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind random port");
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    port
}

async fn wait_until_ready(base_url: &str) {
    let client = Client::new();
    let deadline = Instant::now() + Duration::from_secs(3);
    loop {
        if let Ok(resp) = client.get(format!("{base_url}/api/health")).send().await {
            if resp.status().is_success() {
                return;
            }
        }
        if Instant::now() > deadline {
            panic!("server did not become ready");
        }
        sleep(Duration::from_millis(100)).await;
    }
}

async fn spawn_server() -> TestServer {
    let port = pick_free_port();
    let child = Command::new(env!("CARGO_BIN_EXE_kpi_dashboard"))
        .env("PORT", port.to_string())
        .env("KPI_API_BASE_URL", UPSTREAM.as_str())
        .env("KPI_TREND_WEEKS", "2")
        .env("RUST_LOG", "info")
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .spawn()
        .expect("failed to spawn server");

    #[cfg(unix)]
    cleanup::register(child.id());

    let base_url = format!("http://127.0.0.1:{port}");
    wait_until_ready(&base_url).await;

    TestServer { base_url, child }
}

async fn shared_server() -> Arc<TestServer> {
    let mut guard = SERVER.lock().await;
    if let Some(server) = guard.as_ref() {
        return Arc::clone(server);
    }
    let server = Arc::new(spawn_server().await);
    *guard = Some(Arc::clone(&server));
    server
}

async fn post(client: &Client, url: String, body: Value) -> reqwest::Response {
    client.post(url).json(&body).send().await.unwrap()
}

async fn open(client: &Client, server: &TestServer, page: &str) -> Value {
    let response = client
        .post(format!("{}/api/session/open/{page}", server.base_url))
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success(), "open {page}: {}", response.status());
    response.json().await.unwrap()
}

fn number(value: &Value) -> f64 {
    match value {
        Value::String(text) => text.parse().unwrap(),
        other => other.as_f64().unwrap(),
    }
}

fn card(response: &Value, key: &str) -> f64 {
    let card = response["view"]["cards"]
        .as_array()
        .unwrap()
        .iter()
        .find(|card| card["key"] == key)
        .unwrap_or_else(|| panic!("missing card {key}"));
    number(&card["value"])
}

#[tokio::test]
async fn http_open_overview_selects_latest_week() {
    let _guard = TEST_LOCK.lock().await;
    FAIL_MONTHS.store(false, Ordering::SeqCst);
    let server = shared_server().await;
    let client = Client::new();

    let body = open(&client, &server, "overview").await;

    assert_eq!(body["page"], "overview");
    assert_eq!(body["selector"]["granularity"], "weekly");
    assert_eq!(body["selector"]["selected"], "5");
    assert_eq!(body["selector"]["slider"]["index"], 0);
    assert_eq!(body["selector"]["slider"]["max"], 2);
    assert_eq!(body["selector"]["slider"]["label"], "2025-W51");
    assert_eq!(body["view"]["page"], "overview");
    assert_eq!(card(&body, "outbound_revenue"), 500.0);
    assert_eq!(card(&body, "margin_percent"), 40.0);
    assert_eq!(body["view"]["margin_trend"]["points"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn http_slider_pins_week_and_mirrors_dropdown() {
    let _guard = TEST_LOCK.lock().await;
    FAIL_MONTHS.store(false, Ordering::SeqCst);
    let server = shared_server().await;
    let client = Client::new();
    open(&client, &server, "revenue").await;

    let response = post(
        &client,
        format!("{}/api/session/slider", server.base_url),
        json!({ "index": 1 }),
    )
    .await;
    assert!(response.status().is_success());
    let body: Value = response.json().await.unwrap();

    assert_eq!(body["selector"]["week_id"], 4);
    assert_eq!(body["selector"]["selected"], "4");
    assert_eq!(body["selector"]["slider"]["label"], "2025-W50");
    assert_eq!(body["view"]["week_ids"], json!([4]));
    assert_eq!(card(&body, "outbound_revenue"), 400.0);
}

#[tokio::test]
async fn http_monthly_selection_aggregates_group() {
    let _guard = TEST_LOCK.lock().await;
    FAIL_MONTHS.store(false, Ordering::SeqCst);
    let server = shared_server().await;
    let client = Client::new();
    open(&client, &server, "revenue").await;

    let response = post(
        &client,
        format!("{}/api/session/granularity", server.base_url),
        json!({ "mode": "monthly" }),
    )
    .await;
    assert!(response.status().is_success());
    let body: Value = response.json().await.unwrap();

    assert_eq!(body["selector"]["granularity"], "monthly");
    assert_eq!(body["selector"]["group_week_ids"], json!([5, 4, 3]));
    assert_eq!(body["selector"]["week_id"], 5);
    assert_eq!(body["selector"]["selected"], "5,4,3");
    assert_eq!(card(&body, "outbound_revenue"), 1200.0);
    assert_eq!(card(&body, "order_count"), 9.0);
}

#[tokio::test]
async fn http_invalid_dropdown_value_keeps_selection() {
    let _guard = TEST_LOCK.lock().await;
    FAIL_MONTHS.store(false, Ordering::SeqCst);
    let server = shared_server().await;
    let client = Client::new();
    let before = open(&client, &server, "margin").await;

    let response = post(
        &client,
        format!("{}/api/session/period", server.base_url),
        json!({ "value": "not-a-week" }),
    )
    .await;
    assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);

    let after: Value = client
        .get(format!("{}/api/session", server.base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(after["selector"], before["selector"]);
}

#[tokio::test]
async fn http_failed_period_load_keeps_previous_session() {
    let _guard = TEST_LOCK.lock().await;
    FAIL_MONTHS.store(false, Ordering::SeqCst);
    let server = shared_server().await;
    let client = Client::new();
    open(&client, &server, "labor").await;

    FAIL_MONTHS.store(true, Ordering::SeqCst);
    let response = client
        .post(format!("{}/api/session/open/margin", server.base_url))
        .send()
        .await
        .unwrap();
    FAIL_MONTHS.store(false, Ordering::SeqCst);
    assert_eq!(response.status(), reqwest::StatusCode::BAD_GATEWAY);

    let session: Value = client
        .get(format!("{}/api/session", server.base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(session["page"], "labor");
}

#[tokio::test]
async fn http_labor_status_and_sort() {
    let _guard = TEST_LOCK.lock().await;
    FAIL_MONTHS.store(false, Ordering::SeqCst);
    let server = shared_server().await;
    let client = Client::new();
    open(&client, &server, "labor").await;

    let body: Value = post(
        &client,
        format!("{}/api/session/labor-status", server.base_url),
        json!({ "status": "completed" }),
    )
    .await
    .json()
    .await
    .unwrap();
    assert_eq!(body["labor_status"], "completed");
    assert_eq!(body["view"]["table"]["rows"][0][3]["value"], "completed");

    let body: Value = post(
        &client,
        format!("{}/api/session/sort", server.base_url),
        json!({ "table": "labor_by_job", "column": "job_num", "order": "asc" }),
    )
    .await
    .json()
    .await
    .unwrap();
    assert_eq!(body["view"]["table"]["sort"]["column"], "job_num");
    assert_eq!(body["view"]["table"]["rows"][0][0]["value"], "J-1");
}

async fn get_json(client: &Client, url: String) -> Value {
    let response = client.get(url).send().await.unwrap();
    assert!(response.status().is_success(), "{}", response.status());
    response.json().await.unwrap()
}

#[tokio::test]
async fn http_drill_walks_product_category_and_job_for_current_week() {
    let _guard = TEST_LOCK.lock().await;
    FAIL_MONTHS.store(false, Ordering::SeqCst);
    let server = shared_server().await;
    let client = Client::new();
    open(&client, &server, "margin").await;
    post(
        &client,
        format!("{}/api/session/slider", server.base_url),
        json!({ "index": 1 }),
    )
    .await;

    let product = get_json(
        &client,
        format!("{}/api/session/drill/product/Valves", server.base_url),
    )
    .await;
    assert_eq!(product["week_id"], 4);
    assert_eq!(product["level"], "product");
    assert_eq!(product["subject"], "Valves");
    assert_eq!(product["drill_into"], "category");
    assert_eq!(product["table"]["rows"].as_array().unwrap().len(), 2);

    let category = get_json(
        &client,
        format!("{}/api/session/drill/category/Ball%20Valves", server.base_url),
    )
    .await;
    assert_eq!(category["level"], "category");
    assert_eq!(category["subject"], "Ball Valves");
    assert_eq!(category["drill_into"], "job");
    assert_eq!(category["table"]["rows"][0][0]["value"], "J-1");
    assert_eq!(number(&category["table"]["rows"][0][6]["value"]), 40.0);
    assert_eq!(number(&category["table"]["rows"][1][3]["value"]), 0.0);

    let job = get_json(
        &client,
        format!("{}/api/session/drill/job/J-1", server.base_url),
    )
    .await;
    assert_eq!(job["level"], "job");
    assert_eq!(job["subject"], "J-1");
    assert_eq!(job["drill_into"], Value::Null);
    assert_eq!(card(&json!({ "view": job }), "revenue"), 64.0);
}

#[tokio::test]
async fn http_monthly_value_must_name_a_listed_month() {
    let _guard = TEST_LOCK.lock().await;
    FAIL_MONTHS.store(false, Ordering::SeqCst);
    let server = shared_server().await;
    let client = Client::new();
    open(&client, &server, "revenue").await;
    let monthly: Value = post(
        &client,
        format!("{}/api/session/granularity", server.base_url),
        json!({ "mode": "monthly" }),
    )
    .await
    .json()
    .await
    .unwrap();

    for value in ["5,5,5", "0,999", "5,999"] {
        let response = post(
            &client,
            format!("{}/api/session/period", server.base_url),
            json!({ "value": value }),
        )
        .await;
        assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST, "{value}");
    }

    let session = get_json(&client, format!("{}/api/session", server.base_url)).await;
    assert_eq!(session["selector"], monthly["selector"]);
    assert_eq!(card(&session, "outbound_revenue"), 1200.0);
}

#[tokio::test]
async fn http_pages_render_and_unknown_page_is_404() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();

    let html = client
        .get(format!("{}/labor", server.base_url))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(html.contains("Labor &amp; Burden") || html.contains("Labor & Burden"));

    let missing = client
        .get(format!("{}/upload", server.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(missing.status(), reqwest::StatusCode::NOT_FOUND);
}
