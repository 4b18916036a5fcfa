//! Cover and picture URLs on the image CDN.
//!
//! ```text
//! https://e-cdns-images.dzcdn.net/images/{type}/{id}/{w}x{h}-{bg}-{quality}-0-0.{format}
//! ```

use std::fmt;

use serde_json::Value;

pub const IMAGE_BASE_URL: &str = "https://e-cdns-images.dzcdn.net/images";
/// Largest size the CDN serves.
pub const MAX_SIZE: (u32, u32) = (1500, 1500);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImageFormat {
    #[default]
    Jpeg,
    Png,
}

impl ImageFormat {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
        }
    }
}

/// Builder for image CDN URLs. Render with `to_string()`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageUrl {
    pub base_url: String,
    pub kind: String,
    pub id: String,
    pub width: u32,
    pub height: u32,
    /// Hex RGB without `#`.
    pub background: String,
    pub quality: u8,
    pub format: ImageFormat,
}

impl Default for ImageUrl {
    fn default() -> Self {
        Self {
            base_url: IMAGE_BASE_URL.into(),
            kind: "misc".into(),
            id: String::new(),
            width: 100,
            height: 100,
            background: "000000".into(),
            quality: 80,
            format: ImageFormat::Jpeg,
        }
    }
}

impl ImageUrl {
    /// Pick type and id from a gateway object's `__TYPE__`.
    ///
    /// Unknown types reset to `misc` with an empty id.
    #[must_use]
    pub fn for_object(mut self, object: &Value) -> Self {
        let text = |key: &str| object[key].as_str().unwrap_or_default().to_owned();
        let (kind, id) = match object["__TYPE__"].as_str() {
            Some("artist") => ("artist".to_owned(), text("ART_PICTURE")),
            Some("album") => ("cover".to_owned(), text("ALB_PICTURE")),
            Some("playlist") => {
                let kind = object["PICTURE_TYPE"]
                    .as_str()
                    .filter(|s| !s.is_empty())
                    .unwrap_or("playlist");
                (kind.to_owned(), text("PLAYLIST_PICTURE"))
            }
            _ => ("misc".to_owned(), String::new()),
        };
        self.kind = kind;
        self.id = id;
        self
    }

    #[must_use]
    pub fn size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    #[must_use]
    pub fn format(mut self, format: ImageFormat) -> Self {
        self.format = format;
        self
    }
}

impl fmt::Display for ImageUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}/{}x{}-{}-{}-0-0.{}",
            self.base_url,
            self.kind,
            self.id,
            self.width,
            self.height,
            self.background,
            self.quality,
            self.format.extension()
        )
    }
}
