//! Mobile gateway client.
//!
//! # Handshake
//!
//! Every session-scoped gateway call needs a `sid`. It is obtained in two
//! unauthenticated GET calls:
//!
//! 1. `mobile_auth` with a random `uniq_id` returns `{ "TOKEN": "<hex>" }`,
//!    which decrypts into a [`KeyBag`].
//! 2. `api_checkToken` with `auth_token = KeyBag::gateway_token()` returns the
//!    `sid` string.
//!
//! The handshake runs under a lock, so concurrent callers that find no `sid`
//! wait for one handshake instead of racing their own.
//!
//! # Sign-in
//!
//! `mobile_userAuth` (email + encrypted password) and `mobile_userAutoLog`
//! (saved ARL) both answer with the account:
//!
//! ```json
//! {
//!   "ARL": "...", "USER_ID": "123", "BLOG_NAME": "...", "EMAIL": "...",
//!   "DESCRIPTION": "...",
//!   "PREMIUM": { "RANDOM": "<hex license blob>" }
//! }
//! ```

use std::fmt;
use std::sync::Arc;

use dzcrypt::{KeyBag, KeyName, KeyStore, License};
use parking_lot::Mutex;
use rand::Rng;
use reqwest::blocking::Client;
use reqwest::header::{self, HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use serde_json::{Value, json};

use crate::auth::{AuthClient, AuthToken, TokenSlot};
use crate::config::ClientConfig;
use crate::error::{DeezerError, Result};
use crate::gateway::{Gateway, GatewayRequest, HttpMethod};
use crate::media::MediaClient;
use crate::types::UserInfo;

const NONCE_ALPHABET: &[u8] = b"012345689abdef";
const NONCE_LEN: usize = 32;

#[derive(Default)]
enum Handshake {
    #[default]
    Uninitialized,
    KeysDerived(KeyBag),
    SidObtained { keys: KeyBag, sid: String },
}

#[derive(Default)]
struct Account {
    user: Option<UserInfo>,
    license: Option<License>,
}

/// Blocking client for the mobile gateway.
///
/// Shareable across threads. Catalog queries live in a separate
/// `impl MobileClient` block.
pub struct MobileClient {
    keys: Arc<KeyStore>,
    config: ClientConfig,
    http: Client,
    gateway: Gateway,
    auth: AuthClient,
    handshake: Mutex<Handshake>,
    account: Mutex<Account>,
    token: TokenSlot,
}

impl MobileClient {
    pub fn new(keys: Arc<KeyStore>, config: ClientConfig) -> Result<Self> {
        let http = config.http_client()?;
        Ok(Self {
            gateway: Gateway::new(http.clone(), config.gateway_url.clone()),
            auth: AuthClient::new(http.clone(), config.auth_url.clone()),
            keys,
            config,
            http,
            handshake: Mutex::new(Handshake::Uninitialized),
            account: Mutex::new(Account::default()),
            token: TokenSlot::default(),
        })
    }

    /// Client for a saved account. Call [`restore_session`](Self::restore_session)
    /// before anything that needs the license.
    pub fn with_user_info(keys: Arc<KeyStore>, config: ClientConfig, user: UserInfo) -> Result<Self> {
        let client = Self::new(keys, config)?;
        client.account.lock().user = Some(user);
        Ok(client)
    }

    pub fn keys(&self) -> &Arc<KeyStore> {
        &self.keys
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// HTTP client shared by all endpoints, also used to fetch media.
    pub fn http(&self) -> &Client {
        &self.http
    }

    pub fn auth_client(&self) -> &AuthClient {
        &self.auth
    }

    /// Run the full handshake, replacing any previous key bag and `sid`.
    pub fn initialize_keys(&self) -> Result<String> {
        let mut state = self.handshake.lock();
        self.run_handshake(&mut state)
    }

    /// Current `sid`, if the handshake has completed.
    pub fn sid(&self) -> Option<String> {
        match &*self.handshake.lock() {
            Handshake::SidObtained { sid, .. } => Some(sid.clone()),
            _ => None,
        }
    }

    /// Current `sid`, running the handshake first if there is none.
    pub fn ensure_sid(&self) -> Result<String> {
        self.with_session(|_, sid| Ok(sid.to_owned()))
    }

    /// Sign in with email and password.
    ///
    /// Returns `Ok(false)` when the gateway rejects the credentials. Any other
    /// failure is an error.
    pub fn sign_in_with_email(&self, email: &str, password: &str) -> Result<bool> {
        let (sid, encrypted) =
            self.with_session(|keys, sid| Ok((sid.to_owned(), keys.encrypt_param(password)?)))?;
        let body = self.with_device_params(json!({
            "mail": email,
            "password": encrypted,
        }));
        match self.call("mobile_userAuth", HttpMethod::Post, Some(&sid), Vec::new(), Some(&body)) {
            Ok(result) => {
                self.update_account(&result)?;
                log::info!("signed in as {email}");
                Ok(true)
            }
            Err(e) if e.has_gateway_error("USER_AUTH_ERROR") => {
                log::warn!("sign-in rejected for {email}");
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    /// Re-establish a session from the saved ARL and refresh the license.
    pub fn restore_session(&self) -> Result<()> {
        let user = self
            .user_info()
            .filter(is_complete)
            .ok_or_else(|| DeezerError::State("not signed in".into()))?;
        let body = self.with_device_params(json!({
            "ARL": user.arl,
            "ACCOUNT_ID": user.id,
        }));
        let result = self.call_sid_method("mobile_userAutoLog", &body)?;
        self.update_account(&result)?;
        log::info!("restored session for user {}", user.id);
        Ok(())
    }

    /// Whether user info with an ARL and id is held.
    pub fn signed_in(&self) -> bool {
        self.account.lock().user.as_ref().is_some_and(is_complete)
    }

    pub fn user_info(&self) -> Option<UserInfo> {
        self.account.lock().user.clone()
    }

    /// `license_token` from the decrypted license, after sign-in or restore.
    pub fn license_token(&self) -> Option<String> {
        self.account
            .lock()
            .license
            .as_ref()
            .and_then(License::license_token)
            .map(str::to_owned)
    }

    /// Forget the account and revoke the auth token, if one is held.
    pub fn sign_out(&self) -> Result<()> {
        match self.token.logout(&self.auth) {
            Ok(()) | Err(DeezerError::AuthToken(_)) => {}
            Err(e) => return Err(e),
        }
        *self.account.lock() = Account::default();
        log::info!("signed out");
        Ok(())
    }

    /// Obtain a fresh auth token: credential grant when signed in, anonymous
    /// grant otherwise. The token is kept in [`token_slot`](Self::token_slot).
    pub fn retrieve_auth_token(&self) -> Result<AuthToken> {
        let token = match self.user_info().filter(is_complete) {
            Some(user) => AuthToken::from_credential(&self.auth, &user.arl)?,
            None => AuthToken::from_anonymous(&self.auth)?,
        };
        self.token.replace(token.clone());
        Ok(token)
    }

    pub fn token_slot(&self) -> &TokenSlot {
        &self.token
    }

    /// Media client bound to the account's license token.
    pub fn media_client(&self) -> Result<MediaClient> {
        let license_token = self
            .license_token()
            .ok_or_else(|| DeezerError::State("no license token; sign in first".into()))?;
        Ok(MediaClient::new(
            self.http.clone(),
            self.config.media_url.clone(),
            license_token,
        ))
    }

    /// POST a session-scoped gateway method, handshaking first if needed.
    pub fn call_sid_method(&self, method: &str, body: &Value) -> Result<Value> {
        let sid = self.ensure_sid()?;
        self.call(method, HttpMethod::Post, Some(&sid), Vec::new(), Some(body))
    }

    fn with_session<T>(&self, f: impl FnOnce(&KeyBag, &str) -> Result<T>) -> Result<T> {
        let mut state = self.handshake.lock();
        if !matches!(*state, Handshake::SidObtained { .. }) {
            self.run_handshake(&mut state)?;
        }
        match &*state {
            Handshake::SidObtained { keys, sid } => f(keys, sid),
            _ => Err(DeezerError::State("handshake did not complete".into())),
        }
    }

    fn run_handshake(&self, state: &mut Handshake) -> Result<String> {
        *state = Handshake::Uninitialized;
        let auth = self.call(
            "mobile_auth",
            HttpMethod::Get,
            None,
            vec![("uniq_id", nonce())],
            None,
        )?;
        let blob = auth["TOKEN"]
            .as_str()
            .ok_or_else(|| DeezerError::Other("mobile_auth returned no TOKEN".into()))?;
        let keys = KeyBag::decrypt(&self.keys, blob)?;
        let gateway_token = keys.gateway_token()?;
        *state = Handshake::KeysDerived(keys);
        log::debug!("gateway keys derived");

        let sid = self.call(
            "api_checkToken",
            HttpMethod::Get,
            None,
            vec![("auth_token", gateway_token)],
            None,
        )?;
        let sid = sid
            .as_str()
            .ok_or_else(|| DeezerError::Other("api_checkToken returned no sid".into()))?
            .to_owned();
        if let Handshake::KeysDerived(keys) = std::mem::take(state) {
            *state = Handshake::SidObtained {
                keys,
                sid: sid.clone(),
            };
        }
        log::debug!("gateway session established");
        Ok(sid)
    }

    fn call(
        &self,
        method: &str,
        http_method: HttpMethod,
        sid: Option<&str>,
        extra: Vec<(&'static str, String)>,
        body: Option<&Value>,
    ) -> Result<Value> {
        let api_key = self.keys.resolve(KeyName::MobileApiKey)?;
        let mut params = vec![
            ("api_key", api_key.expose_secret().clone()),
            ("output", "3".to_owned()),
        ];
        if http_method == HttpMethod::Post {
            params.push(("input", "3".to_owned()));
        }
        if let Some(sid) = sid {
            params.push(("sid", sid.to_owned()));
        }
        params.extend(extra);

        self.gateway.call(GatewayRequest {
            method,
            http_method,
            params,
            headers: self.headers()?,
            body,
        })
    }

    fn headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        let agent = HeaderValue::from_str(&self.config.user_agent)
            .map_err(|e| DeezerError::InvalidInput(format!("user agent: {e}")))?;
        headers.insert(header::USER_AGENT, agent);
        Ok(headers)
    }

    fn with_device_params(&self, mut body: Value) -> Value {
        let device = &self.config.device;
        let params = json!({
            "device_serial": device.serial,
            "platform": device.platform,
            "custo_version_id": "",
            "custo_partner": "",
            "model": device.model,
            "device_name": device.name,
            "device_os": device.os,
            "device_type": device.device_type,
            "google_play_services_availability": "1",
            "consent_string": "",
        });
        if let (Some(body), Value::Object(params)) = (body.as_object_mut(), params) {
            body.extend(params);
        }
        body
    }

    fn update_account(&self, result: &Value) -> Result<()> {
        let user = UserInfo {
            arl: required_str(result, "ARL")?.to_owned(),
            id: user_id(&result["USER_ID"])?,
            username: result["BLOG_NAME"].as_str().map(str::to_owned),
            email: result["EMAIL"].as_str().map(str::to_owned),
        };
        let license = License::decrypt(
            result["PREMIUM"]["RANDOM"]
                .as_str()
                .ok_or_else(|| DeezerError::Other("account has no PREMIUM.RANDOM".into()))?,
            required_str(result, "DESCRIPTION")?,
            &self.config.device.serial,
        )?;
        let mut account = self.account.lock();
        account.user = Some(user);
        account.license = Some(license);
        Ok(())
    }
}

impl fmt::Debug for MobileClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MobileClient")
            .field("gateway", &self.gateway.url())
            .field("has_sid", &self.sid().is_some())
            .field("signed_in", &self.signed_in())
            .finish_non_exhaustive()
    }
}

fn is_complete(user: &UserInfo) -> bool {
    user.id != 0 && !user.arl.is_empty()
}

fn nonce() -> String {
    let mut rng = rand::rng();
    (0..NONCE_LEN)
        .map(|_| char::from(NONCE_ALPHABET[rng.random_range(0..NONCE_ALPHABET.len())]))
        .collect()
}

fn required_str<'a>(value: &'a Value, key: &str) -> Result<&'a str> {
    value[key]
        .as_str()
        .ok_or_else(|| DeezerError::Other(format!("account has no {key}")))
}

fn user_id(value: &Value) -> Result<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
    .ok_or_else(|| DeezerError::Other(format!("unexpected USER_ID: {value}")))
}
