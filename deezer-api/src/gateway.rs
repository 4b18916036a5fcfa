//! Shared gateway call.
//!
//! Every gateway request is a GET or POST to one URL, with the RPC method
//! name and client-specific parameters in the query string:
//!
//! ```text
//! GET  gateway.php?method=mobile_auth&api_key=...&output=3&uniq_id=...
//! POST gateway.php?method=song_getData&api_key=...&output=3&input=3&sid=...
//! ```
//!
//! POST bodies are JSON. Responses always use this envelope:
//!
//! ```json
//! { "results": ..., "error": [] }
//! { "results": [], "error": { "USER_AUTH_ERROR": "..." } }
//! ```
//!
//! A non-empty `error` object becomes [`DeezerError::Gateway`].

use std::fmt::Write as _;

use reqwest::blocking::Client;
use reqwest::header::HeaderMap;
use serde_json::Value;

use crate::error::{DeezerError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

/// One gateway request, fully decorated by the calling client.
#[derive(Debug)]
pub struct GatewayRequest<'a> {
    pub method: &'a str,
    pub http_method: HttpMethod,
    /// Query parameters besides `method`.
    pub params: Vec<(&'static str, String)>,
    pub headers: HeaderMap,
    /// JSON body, sent for POST only.
    pub body: Option<&'a Value>,
}

/// Gateway endpoint plus the HTTP client used to reach it.
#[derive(Debug, Clone)]
pub struct Gateway {
    http: Client,
    url: String,
}

impl Gateway {
    pub fn new(http: Client, url: impl Into<String>) -> Self {
        Self {
            http,
            url: url.into(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Send `request` and unwrap the response envelope into its `results`.
    pub fn call(&self, request: GatewayRequest<'_>) -> Result<Value> {
        let mut query = Vec::with_capacity(request.params.len() + 1);
        query.push(("method", request.method.to_owned()));
        query.extend(request.params);

        let req = match request.http_method {
            HttpMethod::Get => self.http.get(&self.url),
            HttpMethod::Post => {
                let empty = Value::Object(serde_json::Map::new());
                self.http
                    .post(&self.url)
                    .json(request.body.unwrap_or(&empty))
            }
        };

        log::trace!("gateway call {}", request.method);
        let resp = req.headers(request.headers).query(&query).send()?;
        let status = resp.status();
        if status != reqwest::StatusCode::OK {
            return Err(DeezerError::Gateway {
                message: format!(
                    "gateway returned non-success status code {}",
                    status.as_u16()
                ),
                errors: serde_json::Map::new(),
            });
        }
        parse_envelope(resp.json()?)
    }
}

/// Extract `results`, or fail with the structured `error` map.
pub fn parse_envelope(mut json: Value) -> Result<Value> {
    if let Some(Value::Object(errors)) = json.get("error") {
        if !errors.is_empty() {
            let mut message = String::from("gateway returned errors:");
            for (key, value) in errors {
                let value = value
                    .as_str()
                    .map_or_else(|| value.to_string(), str::to_owned);
                let _ = write!(message, "\n\t{key}: {value}");
            }
            return Err(DeezerError::Gateway {
                message,
                errors: errors.clone(),
            });
        }
    }
    Ok(json.get_mut("results").map(Value::take).unwrap_or(Value::Null))
}
