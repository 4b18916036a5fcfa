use std::time::Duration;

use crate::types::DeviceInfo;

pub const GATEWAY_URL: &str = "https://api.deezer.com/1.0/gateway.php";
pub const AUTH_URL: &str = "https://auth.deezer.com";
pub const MEDIA_URL: &str = "https://media.deezer.com";
const USER_AGENT: &str = "Deezer/6.1.22.49 (Android; 9; Tablet; us) innotek GmbH VirtualBox";

/// Endpoints and client identity for [`MobileClient`](crate::MobileClient).
///
/// The defaults mimic the Android tablet app. Override the URLs to point the
/// client at a proxy or a test server.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub gateway_url: String,
    pub auth_url: String,
    pub media_url: String,
    pub user_agent: String,
    pub lang: String,
    pub device: DeviceInfo,
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            gateway_url: GATEWAY_URL.into(),
            auth_url: AUTH_URL.into(),
            media_url: MEDIA_URL.into(),
            user_agent: USER_AGENT.into(),
            lang: "en".into(),
            device: DeviceInfo::default(),
            timeout: Duration::from_secs(30),
        }
    }
}

impl ClientConfig {
    pub(crate) fn http_client(&self) -> reqwest::Result<reqwest::blocking::Client> {
        reqwest::blocking::Client::builder()
            .user_agent(&self.user_agent)
            .timeout(self.timeout)
            .build()
    }
}
