use std::fs;
use std::path::PathBuf;

use axum::{
    Router,
    body::{Body, to_bytes},
    response::Response,
};
use tower::util::ServiceExt;

use pelagos_core::{AppConfig, FerryStore, importer};

use crate::{WebState, app_router};

/// Two-leg dataset: Piraeus to Paros and Paros to Naxos, sailing on
/// 2026-07-01.
pub(super) const DATASET_FEED: &str = r#"[{
    "route_id": "R200",
    "company": "Blue Star Ferries",
    "company_code": "BSF",
    "origin_port": "Piraeus",
    "origin_port_code": "PIR",
    "destination_port": "Paros",
    "destination_port_code": "PAS",
    "departure_time": "07:30",
    "arrival_time": "11:45",
    "origin_port_stop": 1,
    "destination_port_stop": 2,
    "departure_offset": 0,
    "arrival_offset": 0,
    "duration": 255,
    "dates_and_vessels": {"2026-07-01": "BSD___Blue Star Delos"},
    "vessels_and_indicative_prices": {"BSD___Blue Star Delos": 3950},
    "vessels_and_accommodation_prices": {"BSD___Blue Star Delos": {"DECK___Deck": 3950}}
}, {
    "route_id": "R310",
    "company": "SeaJets",
    "company_code": "SJT",
    "origin_port": "Paros",
    "origin_port_code": "PAS",
    "destination_port": "Naxos",
    "destination_port_code": "NAX",
    "departure_time": "13:15",
    "arrival_time": "14:00",
    "origin_port_stop": 1,
    "destination_port_stop": 2,
    "departure_offset": 0,
    "arrival_offset": 0,
    "duration": 45,
    "dates_and_vessels": {"2026-07-01": "WJ2___WorldChampion Jet 2"},
    "vessels_and_indicative_prices": {"WJ2___WorldChampion Jet 2": 2400},
    "vessels_and_accommodation_prices": {}
}]"#;

pub(super) struct TestHarness {
    temp: tempfile::TempDir,
    pub(super) state: WebState,
    pub(super) router: Router,
}

impl TestHarness {
    pub(super) fn setup() -> Self {
        let temp = tempfile::tempdir().expect("tempdir");
        let store = FerryStore::open(temp.path().join("gtfs.db")).expect("store");
        let feed = temp.path().join("seed.json");
        fs::write(&feed, DATASET_FEED).expect("seed feed");
        importer::import_dataset_file(&store, &feed).expect("seed import");
        store.ensure_bootstrap_admin().expect("bootstrap admin");

        let mut config = AppConfig::default();
        config.update.enabled = false;
        config.update.update_dir = temp.path().join("updates");
        let state = WebState::new(store, &config).expect("web state");
        let router = app_router(state.clone());
        Self {
            temp,
            state,
            router,
        }
    }

    pub(super) fn update_dir(&self) -> PathBuf {
        self.temp.path().join("updates")
    }

    pub(super) fn seed_update_file(&self, name: &str, content: &str) -> PathBuf {
        let dir = self.update_dir();
        fs::create_dir_all(&dir).expect("updates dir");
        let path = dir.join(name);
        fs::write(&path, content).expect("update file");
        path
    }

    pub(super) async fn send(&self, request: axum::http::Request<Body>) -> Response {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router response")
    }

    /// Logs in as the bootstrap admin and returns the `Cookie` header value.
    pub(super) async fn login_admin(&self) -> String {
        self.login("admin", "admin123").await
    }

    pub(super) async fn login(&self, username: &str, password: &str) -> String {
        let response = self
            .send(json_request(
                "/api/login",
                serde_json::json!({"username": username, "password": password}),
            ))
            .await;
        assert_eq!(response.status(), axum::http::StatusCode::OK, "login");
        let set_cookie =
            header_value(response.headers(), "set-cookie").expect("set-cookie header");
        set_cookie
            .split(';')
            .next()
            .expect("cookie pair")
            .to_string()
    }
}

pub(super) async fn decode_json<T: serde::de::DeserializeOwned>(response: Response) -> T {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body bytes");
    serde_json::from_slice(&bytes).expect("decode json")
}

pub(super) async fn body_text(response: Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body bytes");
    String::from_utf8(bytes.to_vec()).expect("utf8 body")
}

pub(super) fn header_value<'a>(headers: &'a axum::http::HeaderMap, key: &str) -> Option<&'a str> {
    headers.get(key).and_then(|value| value.to_str().ok())
}

#[expect(
    clippy::needless_pass_by_value,
    reason = "tests usually pass temporary `json!` values directly"
)]
pub(super) fn json_request(path: &str, body: serde_json::Value) -> axum::http::Request<Body> {
    axum::http::Request::builder()
        .method("POST")
        .uri(path)
        .header("content-type", "application/json")
        .body(Body::from(
            serde_json::to_vec(&body).expect("json request body"),
        ))
        .expect("json request")
}

#[expect(
    clippy::needless_pass_by_value,
    reason = "tests usually pass temporary `json!` values directly"
)]
pub(super) fn admin_json_request(
    path: &str,
    cookie: &str,
    body: serde_json::Value,
) -> axum::http::Request<Body> {
    axum::http::Request::builder()
        .method("POST")
        .uri(path)
        .header("content-type", "application/json")
        .header("cookie", cookie)
        .body(Body::from(
            serde_json::to_vec(&body).expect("json request body"),
        ))
        .expect("json request")
}

pub(super) fn get_request(path: &str, cookie: Option<&str>) -> axum::http::Request<Body> {
    let mut builder = axum::http::Request::builder().method("GET").uri(path);
    if let Some(cookie) = cookie {
        builder = builder.header("cookie", cookie);
    }
    builder.body(Body::empty()).expect("get request")
}

pub(super) fn delete_request(path: &str, cookie: &str) -> axum::http::Request<Body> {
    axum::http::Request::builder()
        .method("DELETE")
        .uri(path)
        .header("cookie", cookie)
        .body(Body::empty())
        .expect("delete request")
}

pub(super) fn multipart_request(
    path: &str,
    cookie: &str,
    file_name: &str,
    content: &str,
) -> axum::http::Request<Body> {
    let boundary = "pelagos-test-boundary";
    let body = format!(
        "--{boundary}\r\n\
         content-disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\n\
         content-type: application/json\r\n\r\n\
         {content}\r\n\
         --{boundary}--\r\n"
    );
    axum::http::Request::builder()
        .method("POST")
        .uri(path)
        .header(
            "content-type",
            format!("multipart/form-data; boundary={boundary}"),
        )
        .header("cookie", cookie)
        .body(Body::from(body))
        .expect("multipart request")
}
