//! Bearer tokens from the auth service.
//!
//! The auth host issues compact JWTs plus, for signed-in users, a refresh
//! token. All endpoints take the fixed query `i=p&jo=p&rto=p` and answer
//! with:
//!
//! ```json
//! { "jwt": "xxxxx.yyyyy.zzzzz", "refresh_token": "..." }
//! ```
//!
//! | Operation                       | Endpoint                 | Body                          |
//! |---------------------------------|--------------------------|-------------------------------|
//! | [`AuthToken::from_anonymous`]   | `GET /login/anonymous`   |                               |
//! | [`AuthToken::from_credential`]  | `POST /login/arl`        | `{ arl }`                     |
//! | [`AuthToken::refresh`]          | `POST /login/renew`      | `{ refresh_token }`           |
//! | [`AuthToken::logout`]           | `POST /logout`           | `{ jwt, refresh_token }`      |
//!
//! [`AuthToken`] is immutable: `refresh` returns a new token. [`TokenSlot`]
//! holds the current token for a client and models the signed-out state.

use base64::Engine;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use parking_lot::Mutex;
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::error::{DeezerError, Result};

const DEFAULT_QUERY: [(&str, &str); 3] = [("i", "p"), ("jo", "p"), ("rto", "p")];

/// base64url that accepts the segment with or without `=` padding.
const BASE64_URL: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Decoded JWT payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// Expiry, epoch seconds. A token without one never needs a refresh.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<f64>,
    /// Present for signed-in users only.
    #[serde(rename = "userId", default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// HTTP client for the auth host.
#[derive(Debug, Clone)]
pub struct AuthClient {
    http: Client,
    base_url: String,
}

#[derive(Deserialize)]
struct TokenResponse {
    jwt: String,
    #[serde(default)]
    refresh_token: Option<String>,
}

impl AuthClient {
    pub fn new(http: Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url.trim_end_matches('/'))
    }

    fn get_token(&self, path: &str) -> Result<TokenResponse> {
        let resp = self
            .http
            .get(self.url(path))
            .query(&DEFAULT_QUERY)
            .send()?
            .error_for_status()?;
        Ok(resp.json()?)
    }

    fn post(&self, path: &str, body: &Value) -> Result<Value> {
        let resp = self
            .http
            .post(self.url(path))
            .query(&DEFAULT_QUERY)
            .json(body)
            .send()?
            .error_for_status()?;
        let text = resp.text()?;
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&text)?)
    }

    fn post_token(&self, path: &str, body: &Value) -> Result<TokenResponse> {
        Ok(serde_json::from_value(self.post(path, body)?)?)
    }
}

/// A compact JWT with its decoded claims and optional refresh token.
#[derive(Clone)]
pub struct AuthToken {
    jwt: String,
    claims: Claims,
    refresh_token: Option<String>,
}

impl AuthToken {
    /// Decode `jwt` once. Exactly three dot-separated segments are required.
    pub fn new(jwt: impl Into<String>, refresh_token: Option<String>) -> Result<Self> {
        let jwt = jwt.into();
        let claims = decode_claims(&jwt)?;
        Ok(Self {
            jwt,
            claims,
            refresh_token,
        })
    }

    /// Anonymous grant. The result has no refresh token.
    pub fn from_anonymous(client: &AuthClient) -> Result<Self> {
        let resp = client.get_token("/login/anonymous")?;
        log::debug!("obtained anonymous auth token");
        Self::new(resp.jwt, None)
    }

    /// Exchange an account credential (ARL) for a token pair.
    pub fn from_credential(client: &AuthClient, arl: &str) -> Result<Self> {
        let resp = client.post_token("/login/arl", &json!({ "arl": arl }))?;
        log::debug!("obtained auth token from credential");
        Self::new(resp.jwt, resp.refresh_token)
    }

    pub fn jwt(&self) -> &str {
        &self.jwt
    }

    pub fn claims(&self) -> &Claims {
        &self.claims
    }

    pub fn refresh_token(&self) -> Option<&str> {
        self.refresh_token.as_deref()
    }

    pub fn user_id(&self) -> Option<&Value> {
        self.claims.user_id.as_ref()
    }

    /// True once `exp` (seconds) is at or before the current time.
    pub fn needs_refresh(&self) -> bool {
        self.needs_refresh_at(chrono::Utc::now().timestamp_millis())
    }

    #[allow(clippy::cast_precision_loss)]
    pub fn needs_refresh_at(&self, now_millis: i64) -> bool {
        self.claims
            .exp
            .is_some_and(|exp| exp * 1000.0 <= now_millis as f64)
    }

    /// Renew with the refresh token, returning the replacement pair.
    ///
    /// Fails without any network call when there is no refresh token.
    pub fn refresh(&self, client: &AuthClient) -> Result<Self> {
        let Some(refresh_token) = self.refresh_token.as_deref() else {
            return Err(DeezerError::AuthToken("no refresh token".into()));
        };
        let resp = client.post_token("/login/renew", &json!({ "refresh_token": refresh_token }))?;
        log::debug!("auth token renewed");
        Self::new(resp.jwt, resp.refresh_token)
    }

    /// `self` if still valid, otherwise a refreshed token.
    pub fn ensure(self, client: &AuthClient) -> Result<Self> {
        if self.needs_refresh() {
            self.refresh(client)
        } else {
            Ok(self)
        }
    }

    /// Revoke this token pair.
    pub fn logout(self, client: &AuthClient) -> Result<()> {
        client.post(
            "/logout",
            &json!({ "jwt": self.jwt, "refresh_token": self.refresh_token }),
        )?;
        log::debug!("auth token revoked");
        Ok(())
    }
}

impl std::fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthToken")
            .field("claims", &self.claims)
            .field("refresh_token", &self.refresh_token.is_some())
            .finish_non_exhaustive()
    }
}

/// The current token of a client, or nothing after sign-out.
#[derive(Debug, Default)]
pub struct TokenSlot {
    token: Mutex<Option<AuthToken>>,
}

impl TokenSlot {
    pub fn new(token: Option<AuthToken>) -> Self {
        Self {
            token: Mutex::new(token),
        }
    }

    pub fn get(&self) -> Option<AuthToken> {
        self.token.lock().clone()
    }

    pub fn replace(&self, token: AuthToken) -> Option<AuthToken> {
        self.token.lock().replace(token)
    }

    pub fn is_active(&self) -> bool {
        self.token.lock().is_some()
    }

    /// A valid compact token, refreshing first if expired.
    pub fn ensure(&self, client: &AuthClient) -> Result<String> {
        let mut guard = self.token.lock();
        let current = guard
            .as_ref()
            .ok_or_else(|| DeezerError::AuthToken("no active token".into()))?;
        if current.needs_refresh() {
            let refreshed = current.refresh(client)?;
            *guard = Some(refreshed);
        }
        Ok(guard.as_ref().map(|t| t.jwt.clone()).unwrap_or_default())
    }

    /// Refresh unconditionally; both tokens are replaced together.
    pub fn refresh(&self, client: &AuthClient) -> Result<()> {
        let mut guard = self.token.lock();
        let current = guard
            .as_ref()
            .ok_or_else(|| DeezerError::AuthToken("no active token".into()))?;
        let refreshed = current.refresh(client)?;
        *guard = Some(refreshed);
        Ok(())
    }

    /// Revoke, then clear. The token stays in the slot if the revoke fails.
    /// A second call after success fails with an auth token error.
    pub fn logout(&self, client: &AuthClient) -> Result<()> {
        let mut guard = self.token.lock();
        let token = guard
            .clone()
            .ok_or_else(|| DeezerError::AuthToken("no active token".into()))?;
        token.logout(client)?;
        *guard = None;
        Ok(())
    }
}

/// Split a compact token and decode the payload segment as JSON claims.
pub fn decode_claims(jwt: &str) -> Result<Claims> {
    let segments: Vec<&str> = jwt.split('.').collect();
    let [_, payload, _] = segments.as_slice() else {
        return Err(DeezerError::MalformedToken(format!(
            "expected 3 segments, got {}",
            segments.len()
        )));
    };
    let bytes = BASE64_URL
        .decode(payload)
        .map_err(|e| DeezerError::MalformedToken(format!("payload is not base64url: {e}")))?;
    serde_json::from_slice(&bytes)
        .map_err(|e| DeezerError::MalformedToken(format!("payload is not valid claims: {e}")))
}
