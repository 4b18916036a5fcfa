//! In-process mock of the gateway, auth and media hosts.
#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use axum::Router;
use axum::extract::{Path, Query, State};
use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{any, get, post};
use axum::Json;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde_json::{Value, json};
use tokio::net::TcpListener;

use deezer_api::{ClientConfig, DeviceInfo};
use dzcrypt::{KeyStore, MasterKeys};

pub const API_KEY: &str = "api-key-fixture";
pub const KEYBAG_BLOB: &str = "21be173dd1ac7fef2d46555b9472d727112a92575983decb1980b099163c1a7b\
b08227b3f30183ddf9533f1bf1cbe7422e2f173cf16d6b0709f9109634bec5ae\
470c7d36ca859309fcc4d81c32870f25efd0d6c257d293f924541fb3dbc6e3b0\
7f720869371574a844ec2ea437fb2c20";
pub const GATEWAY_TOKEN: &str = "a58a1fb153984450a52542f74e50803c449d24c09b182a3e948979a397ea6334\
83c1bdb5564b10290d7ac42cc98f0dc9094f65c772a55e4a5342e6842605610b";
pub const SID: &str = "sid-fixture";
/// `encrypt_param("hunter2")` with the fixture user key.
pub const ENCRYPTED_PASSWORD: &str = "a32382d6cea1b2d9abd39ee20947a085";
pub const EMAIL: &str = "listener@example.com";
pub const PASSWORD: &str = "hunter2";
pub const ARL: &str = "arl-fixture";
pub const USER_ID: u64 = 1001;
pub const SERIAL: &str = "fixture-serial";
pub const DESCRIPTION: &str = "fixture-description";
pub const LICENSE_BLOB: &str = "502035751aceea6fa4eb29dff03a93d0c4f4c8e59333a3955463cf00374e2faa\
99c9adc0fb32826a0833099576957065a90af32d8113abd2d3e5be6e25c04d21";
pub const LICENSE_TOKEN: &str = "lt-fixture-0001";
pub const SONG_ID: &str = "3135556";
pub const ASSET_LEN: usize = 5000;

#[derive(Debug, Default)]
pub struct Counters {
    pub mobile_auth: AtomicUsize,
    pub renew: AtomicUsize,
    pub logout: AtomicUsize,
    pub get_url: AtomicUsize,
}

impl Counters {
    pub fn get(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }
}

struct ServerState {
    addr: SocketAddr,
    counters: Arc<Counters>,
}

pub struct Mock {
    pub addr: SocketAddr,
    pub counters: Arc<Counters>,
}

impl Mock {
    pub fn start() -> Self {
        let counters = Arc::new(Counters::default());
        let shared = counters.clone();
        let addr = spawn(move |addr| {
            let state = Arc::new(ServerState {
                addr,
                counters: shared,
            });
            Router::new()
                .route("/gateway.php", any(gateway))
                .route("/auth/login/anonymous", get(login_anonymous))
                .route("/auth/login/arl", post(login_arl))
                .route("/auth/login/renew", post(login_renew))
                .route("/auth/logout", post(logout))
                .route("/media/v1/get_url", post(get_url))
                .route("/asset/:name", get(asset))
                .with_state(state)
        });
        Self { addr, counters }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }

    pub fn config(&self) -> ClientConfig {
        ClientConfig {
            gateway_url: self.url("/gateway.php"),
            auth_url: self.url("/auth"),
            media_url: self.url("/media"),
            device: DeviceInfo {
                serial: SERIAL.into(),
                ..DeviceInfo::default()
            },
            ..ClientConfig::default()
        }
    }
}

pub fn keys() -> Arc<KeyStore> {
    Arc::new(KeyStore::from_keys(MasterKeys {
        legacy_url_key: Some("legacy-url-key16".into()),
        track_xor_key: Some("track-xor-key-16".into()),
        mobile_gw_key: Some("gw-fixture-key!!".into()),
        mobile_api_key: Some(API_KEY.into()),
    }))
}

/// Serve `build(addr)` on an ephemeral port from a dedicated runtime thread.
///
/// The blocking client must not run inside a tokio runtime, so the server
/// gets its own.
pub fn spawn(build: impl FnOnce(SocketAddr) -> Router + Send + 'static) -> SocketAddr {
    let (tx, rx) = std::sync::mpsc::channel();
    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async move {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            let addr = listener.local_addr().unwrap();
            tx.send(addr).unwrap();
            axum::serve(listener, build(addr)).await.unwrap();
        });
    });
    rx.recv().unwrap()
}

pub fn jwt(claims: &Value) -> String {
    format!(
        "{}.{}.signature",
        URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#),
        URL_SAFE_NO_PAD.encode(claims.to_string())
    )
}

pub fn in_one_hour() -> i64 {
    chrono::Utc::now().timestamp() + 3600
}

/// Bytes served by `/asset/*`.
pub fn asset_bytes() -> Vec<u8> {
    (0..ASSET_LEN).map(|i| u8::try_from(i % 251).unwrap()).collect()
}

fn ok(results: Value) -> Value {
    json!({ "results": results, "error": [] })
}

fn failure(key: &str, message: &str) -> Value {
    json!({ "results": [], "error": { key: message } })
}

fn account() -> Value {
    json!({
        "ARL": ARL,
        "USER_ID": USER_ID.to_string(),
        "BLOG_NAME": "listener",
        "EMAIL": EMAIL,
        "DESCRIPTION": DESCRIPTION,
        "PREMIUM": { "RANDOM": LICENSE_BLOB },
    })
}

async fn gateway(
    State(state): State<Arc<ServerState>>,
    method: Method,
    Query(query): Query<HashMap<String, String>>,
    body: String,
) -> Json<Value> {
    let param = |key: &str| query.get(key).map(String::as_str).unwrap_or_default();
    if param("api_key") != API_KEY || param("output") != "3" {
        return Json(failure("API_KEY_ERROR", "invalid api key"));
    }
    let body: Value = serde_json::from_str(&body).unwrap_or(Value::Null);

    let reply = match param("method") {
        "mobile_auth" if method == Method::GET && param("uniq_id").len() == 32 => {
            state.counters.mobile_auth.fetch_add(1, Ordering::SeqCst);
            // widen the window for concurrent handshakes
            tokio::time::sleep(Duration::from_millis(100)).await;
            ok(json!({ "TOKEN": KEYBAG_BLOB }))
        }
        "api_checkToken" if param("auth_token") == GATEWAY_TOKEN => ok(json!(SID)),
        "api_checkToken" => failure("VALID_TOKEN_REQUIRED", "invalid auth token"),
        _ if method != Method::POST || param("input") != "3" || param("sid") != SID => {
            failure("VALID_TOKEN_REQUIRED", "invalid session")
        }
        "mobile_userAuth" if body["mail"] == "locked@example.com" => {
            failure("ACCOUNT_LOCKED", "too many attempts")
        }
        "mobile_userAuth"
            if body["mail"] == EMAIL
                && body["password"] == ENCRYPTED_PASSWORD
                && body["device_serial"] == SERIAL
                && body["device_os"] == "Android" =>
        {
            ok(account())
        }
        "mobile_userAuth" => failure("USER_AUTH_ERROR", "wrong credentials"),
        "mobile_userAutoLog" if body["ARL"] == ARL && body["ACCOUNT_ID"] == USER_ID => ok(account()),
        "mobile_userAutoLog" => failure("USER_AUTH_ERROR", "invalid arl"),
        "song_getData" => ok(json!({
            "SNG_ID": body["SNG_ID"],
            "SNG_TITLE": "Fixture Song",
            "TRACK_TOKEN": format!("tt-{}", body["SNG_ID"].as_str().unwrap_or_default()),
            "MD5_ORIGIN": "d0f8c4b4b5c9d3a1e2f6a7b8c9d0e1f2",
            "MEDIA_VERSION": "8",
        })),
        "mobile.pageAlbum" => ok(json!({
            "DATA": { "ALB_ID": body["alb_id"], "LANG": body["lang"] },
            "SONGS": { "data": [] },
        })),
        _ => failure("METHOD_ERROR", "unknown method"),
    };
    Json(reply)
}

fn has_default_query(query: &HashMap<String, String>) -> bool {
    ["i", "jo", "rto"]
        .iter()
        .all(|k| query.get(*k).map(String::as_str) == Some("p"))
}

async fn login_anonymous(Query(query): Query<HashMap<String, String>>) -> Response {
    if !has_default_query(&query) {
        return StatusCode::BAD_REQUEST.into_response();
    }
    Json(json!({ "jwt": jwt(&json!({ "exp": in_one_hour() })) })).into_response()
}

async fn login_arl(Query(query): Query<HashMap<String, String>>, Json(body): Json<Value>) -> Response {
    if !has_default_query(&query) || body["arl"] != ARL {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    Json(json!({
        "jwt": jwt(&json!({ "exp": in_one_hour(), "userId": USER_ID })),
        "refresh_token": "rt-1",
    }))
    .into_response()
}

async fn login_renew(State(state): State<Arc<ServerState>>, Json(body): Json<Value>) -> Response {
    let Some(current) = body["refresh_token"].as_str() else {
        return StatusCode::UNAUTHORIZED.into_response();
    };
    let n = state.counters.renew.fetch_add(1, Ordering::SeqCst) + 1;
    Json(json!({
        "jwt": jwt(&json!({ "exp": in_one_hour(), "userId": USER_ID, "generation": n })),
        "refresh_token": format!("{current}-renewed"),
    }))
    .into_response()
}

async fn logout(State(state): State<Arc<ServerState>>, Json(body): Json<Value>) -> StatusCode {
    if body["jwt"].as_str().is_none() {
        return StatusCode::BAD_REQUEST;
    }
    state.counters.logout.fetch_add(1, Ordering::SeqCst);
    StatusCode::OK
}

async fn get_url(State(state): State<Arc<ServerState>>, Json(body): Json<Value>) -> Response {
    state.counters.get_url.fetch_add(1, Ordering::SeqCst);
    if body["license_token"] != LICENSE_TOKEN {
        return (
            StatusCode::FORBIDDEN,
            Json(json!({ "errors": [{ "code": 2002, "message": "invalid license token" }] })),
        )
            .into_response();
    }
    let media_type = body["media"][0]["type"].clone();
    let cipher = body["media"][0]["formats"][0]["cipher"].clone();
    let format = body["media"][0]["formats"][0]["format"].clone();
    let base = format!("http://{}", state.addr);

    let data: Vec<Value> = body["track_tokens"]
        .as_array()
        .map(Vec::as_slice)
        .unwrap_or_default()
        .iter()
        .map(|token| match token.as_str() {
            Some("tt-missing") => json!({ "errors": [{ "code": 2001, "message": "not found" }] }),
            _ => {
                let name = if cipher == "NONE" { "plain" } else { "protected" };
                json!({
                    "media": [{
                        "media_type": media_type,
                        "cipher": { "type": cipher },
                        "format": format,
                        "sources": [
                            { "url": format!("{base}/asset/{name}"), "provider": "ak" },
                            { "url": format!("{base}/asset/{name}?mirror=1"), "provider": "ec" },
                        ],
                        "nbf": 1_700_000_000,
                        "exp": 1_700_003_600,
                    }]
                })
            }
        })
        .collect();
    Json(json!({ "data": data })).into_response()
}

async fn asset(Path(name): Path<String>) -> Response {
    match name.as_str() {
        "plain" | "protected" => asset_bytes().into_response(),
        _ => StatusCode::NOT_FOUND.into_response(),
    }
}
