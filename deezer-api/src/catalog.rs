//! Catalog queries over the gateway.
//!
//! Results are returned as raw [`Value`]s; field names follow the gateway
//! (`SNG_ID`, `ALB_TITLE`, `TRACK_TOKEN`, ...). Songs returned here can be
//! fed to [`SongRef::from_json`](crate::SongRef::from_json) or
//! [`LegacySong::from_json`](crate::LegacySong::from_json).
//!
//! | Method                                   | Gateway method              |
//! |------------------------------------------|-----------------------------|
//! | [`MobileClient::song`]                   | `song_getData`              |
//! | [`MobileClient::song_lyrics`]            | `song.getLyrics`            |
//! | [`MobileClient::album`]                  | `mobile.pageAlbum`          |
//! | [`MobileClient::artist_sections`]        | `mobile.pageArtistSections` |
//! | [`MobileClient::playlist_info`]          | `mobile.pagePlaylist`       |
//! | [`MobileClient::playlist_songs`]         | `playlist.getSongs`         |
//! | [`MobileClient::search_suggestions`]     | `mobile_suggest`            |
//! | [`MobileClient::search_results`]         | `search_music`              |
//! | [`MobileClient::favorite_albums`]        | `album.getFavorites`        |
//! | [`MobileClient::favorite_artists`]       | `artist.getFavorites`       |
//! | [`MobileClient::favorite_playlists`]     | `playlist.getFavorites`     |
//! | [`MobileClient::user_playlists`]         | `playlist.getList`          |

use serde_json::{Value, json};

use crate::client::MobileClient;
use crate::error::Result;

const FAVORITE_PLAYLIST_FIELDS: [&str; 16] = [
    "PLAYLIST_ID",
    "TITLE",
    "PICTURE_TYPE",
    "PARENT_USERNAME",
    "PARENT_USER_ID",
    "PARENT_USER_PICTURE",
    "PLAYLIST_PICTURE",
    "DATE_ADD",
    "DATE_MOD",
    "DATE_CREATE",
    "DATE_FAVORITE",
    "UNSEEN_TRACK_COUNT",
    "TYPE",
    "NB_SONG",
    "PLAYLIST_LINKED_ARTIST",
    "HAS_ARTIST_LINKED",
];

const USER_PLAYLIST_FIELDS: [&str; 10] = [
    "PLAYLIST_ID",
    "TITLE",
    "PICTURE_TYPE",
    "PLAYLIST_PICTURE",
    "STATUS",
    "TYPE",
    "DATE_CREATE",
    "DATE_ADD",
    "DATE_MOD",
    "NB_SONG",
];

impl MobileClient {
    pub fn song(&self, id: u64) -> Result<Value> {
        self.call_sid_method("song_getData", &json!({ "SNG_ID": id.to_string() }))
    }

    pub fn song_lyrics(&self, id: u64) -> Result<Value> {
        self.call_sid_method("song.getLyrics", &json!({ "SNG_ID": id.to_string() }))
    }

    /// Album header plus its songs.
    pub fn album(&self, id: u64) -> Result<Value> {
        let user_id = self.user_info().map(|u| u.id.to_string()).unwrap_or_default();
        let body = json!({
            "alb_id": id.to_string(),
            "user_id": user_id,
            "lang": self.config().lang,
            "header": true,
            "tab": 0,
        });
        self.call_sid_method("mobile.pageAlbum", &body)
    }

    /// Selected sections of an artist page.
    ///
    /// `sections` maps section names (`MASTHEAD`, `TOP_TRACKS`, `HIGHLIGHT`,
    /// `DISCOGRAPHY`, `SIMILAR_ARTISTS`, `PLAYLISTS`, `FEATURED_IN`) to their
    /// options, e.g. `{ "TOP_TRACKS": { "count": 10 } }`.
    pub fn artist_sections(&self, id: u64, sections: &Value) -> Result<Value> {
        let body = json!({ "ART_ID": id.to_string(), "sections": sections });
        self.call_sid_method("mobile.pageArtistSections", &body)
    }

    pub fn playlist_info(&self, id: u64) -> Result<Value> {
        self.call_sid_method("mobile.pagePlaylist", &json!({ "playlist_id": id.to_string() }))
    }

    pub fn playlist_songs(&self, id: u64, start: u32, count: u32) -> Result<Value> {
        let body = json!({
            "playlist_id": id.to_string(),
            "start": start.to_string(),
            "nb": count.to_string(),
        });
        self.call_sid_method("playlist.getSongs", &body)
    }

    /// Suggestions filtered by `types` (`ALBUM`, `ARTIST`, `TRACK`, ...).
    pub fn search_suggestions(&self, query: &str, types: &[&str], count: u32) -> Result<Value> {
        let body = json!({
            "NB": count.to_string(),
            "TYPES": types,
            "QUERY": query,
        });
        self.call_sid_method("mobile_suggest", &body)
    }

    pub fn search_results(&self, query: &str, kind: &str, start: u32, count: u32) -> Result<Value> {
        let body = json!({
            "FILTER": kind,
            "NB": count.to_string(),
            "START": start,
            "QUERY": query,
            "OUTPUT": kind,
        });
        self.call_sid_method("search_music", &body)
    }

    pub fn favorite_albums(&self, user_id: u64, count: u32) -> Result<Value> {
        let body = json!({ "user_id": user_id.to_string(), "NB": count.to_string() });
        self.call_sid_method("album.getFavorites", &body)
    }

    pub fn favorite_artists(&self, user_id: u64, count: u32) -> Result<Value> {
        let body = json!({ "user_id": user_id.to_string(), "NB": count.to_string() });
        self.call_sid_method("artist.getFavorites", &body)
    }

    pub fn favorite_playlists(&self, user_id: u64, count: u32) -> Result<Value> {
        let body = json!({
            "user_id": user_id.to_string(),
            "nb": count.to_string(),
            "ARRAY_DEFAULT": FAVORITE_PLAYLIST_FIELDS,
        });
        self.call_sid_method("playlist.getFavorites", &body)
    }

    /// Playlists created by a user. For the signed-in user this includes the
    /// favorite tracks playlist (`TYPE == 4`).
    pub fn user_playlists(&self, user_id: u64, count: u32) -> Result<Value> {
        let body = json!({
            "user_id": user_id.to_string(),
            "nb": count.to_string(),
            "ARRAY_DEFAULT": USER_PLAYLIST_FIELDS,
        });
        self.call_sid_method("playlist.getList", &body)
    }
}
