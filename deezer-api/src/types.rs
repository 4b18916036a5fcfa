//! Plain data types shared by the clients.

use serde::{Deserialize, Serialize};

/// Signed-in account, enough to restore a session later.
///
/// Gateway fields: `ARL`, `USER_ID`, `BLOG_NAME`, `EMAIL`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    /// Long-lived account credential, also accepted by the auth service.
    pub arl: String,
    pub id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// Device description merged into sign-in requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub os: String,
    pub name: String,
    #[serde(rename = "type")]
    pub device_type: String,
    pub model: String,
    pub platform: String,
    /// Also one of the license key inputs.
    pub serial: String,
}

impl Default for DeviceInfo {
    fn default() -> Self {
        Self {
            os: "Android".into(),
            name: "VirtualBox".into(),
            device_type: "tablet".into(),
            model: "VirtualBox".into(),
            platform: "innotek GmbH_x86_64_9".into(),
            serial: String::new(),
        }
    }
}

/// Formats accepted by the media endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MediaFormat {
    #[serde(rename = "AAC_64")]
    Aac64,
    #[serde(rename = "AAC_96")]
    Aac96,
    Flac,
    Mp3Misc,
    #[serde(rename = "MP3_32")]
    Mp332,
    #[serde(rename = "MP3_64")]
    Mp364,
    #[serde(rename = "MP3_128")]
    Mp3128,
    #[serde(rename = "MP3_192")]
    Mp3192,
    #[serde(rename = "MP3_256")]
    Mp3256,
    #[serde(rename = "MP3_320")]
    Mp3320,
    #[serde(rename = "SBC_256")]
    Sbc256,
}

/// Stream cipher requested from the media endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MediaCipher {
    #[default]
    BfCbcStripe,
    None,
}

/// Full track or 30-second preview.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MediaType {
    #[default]
    Full,
    Preview,
}

/// Numeric format codes of the legacy URL scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum LegacyFormat {
    Mp3Misc = 0,
    Mp3128 = 1,
    Mp3320 = 3,
    Mp3256 = 5,
    Aac64 = 6,
    Mp3192 = 7,
    Aac96 = 8,
    Flac = 9,
    Mp364 = 10,
    Mp332 = 11,
    Sbc = 12,
    Mp4Ra1 = 13,
    Mp4Ra2 = 14,
    Mp4Ra3 = 15,
}

impl LegacyFormat {
    pub fn code(self) -> u8 {
        self as u8
    }
}
