//! Deezer mobile gateway, auth and media client built on [`dzcrypt`].
//!
//! Three hosts are involved:
//!
//! | Host                | Module                   | Purpose                                  |
//! |---------------------|--------------------------|------------------------------------------|
//! | gateway (`api.`)    | [`client`], [`gateway`]  | handshake, sign-in, catalog queries      |
//! | auth (`auth.`)      | [`auth`]                 | JWT bearer tokens                        |
//! | media (`media.`)    | [`media`]                | stream URLs for a license token          |
//!
//! All calls are blocking.
//!
//! ```no_run
//! use std::sync::Arc;
//! use deezer_api::{ClientConfig, MediaFormat, MobileClient, SongRef, StreamOptions};
//! use dzcrypt::KeyStore;
//!
//! let keys = Arc::new(KeyStore::new());
//! let client = MobileClient::new(keys.clone(), ClientConfig::default()).unwrap();
//! if client.sign_in_with_email("me@example.com", "hunter2").unwrap() {
//!     let song = SongRef::from_json(&client.song(3135556).unwrap()).unwrap();
//!     let media = client.media_client().unwrap();
//!     let streams = media
//!         .get_song_streams(&[song], &[MediaFormat::Mp3128], &StreamOptions::default())
//!         .unwrap();
//!     for descriptor in streams.values().flatten() {
//!         let mut reader = descriptor.open(client.http(), &keys).unwrap();
//!         std::io::copy(&mut reader, &mut std::io::sink()).unwrap();
//!     }
//! }
//! ```

pub mod auth;
mod catalog;
pub mod client;
pub mod config;
pub mod error;
pub mod gateway;
pub mod image;
pub mod media;
pub mod session;
pub mod types;

pub use auth::{AuthClient, AuthToken, Claims, TokenSlot};
pub use client::MobileClient;
pub use config::ClientConfig;
pub use error::{DeezerError, Result};
pub use image::{ImageFormat, ImageUrl};
pub use media::{LegacySong, MediaClient, SongRef, StreamDescriptor, StreamOptions};
pub use session::Session;
pub use types::{DeviceInfo, LegacyFormat, MediaCipher, MediaFormat, MediaType, UserInfo};
