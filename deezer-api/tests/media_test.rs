mod common;

use std::io::Read;

use common::{Counters, Mock};
use deezer_api::{
    DeezerError, LegacyFormat, LegacySong, MediaCipher, MediaClient, MediaFormat, MediaType,
    MobileClient, SongRef, StreamDescriptor, StreamOptions,
};
use dzcrypt::StreamDecryptor;
use reqwest::blocking::Client;

fn media_client(mock: &Mock) -> MediaClient {
    MediaClient::new(Client::new(), mock.url("/media"), common::LICENSE_TOKEN)
}

fn song(id: &str) -> SongRef {
    SongRef {
        id: id.into(),
        track_token: format!("tt-{id}"),
    }
}

fn expected_plain(song_id: &str) -> Vec<u8> {
    let mut decryptor = StreamDecryptor::new(&common::keys(), song_id).unwrap();
    let mut out = Vec::new();
    decryptor.update(&common::asset_bytes(), &mut out).unwrap();
    out.extend(decryptor.finish());
    out
}

#[test]
fn test_get_song_streams() {
    let mock = Mock::start();
    let streams = media_client(&mock)
        .get_song_streams(&[song(common::SONG_ID)], &[MediaFormat::Mp3128], &StreamOptions::default())
        .unwrap();

    let descriptors = &streams[common::SONG_ID];
    assert_eq!(descriptors.len(), 1);
    let d = &descriptors[0];
    assert_eq!(d.url, mock.url("/asset/protected"));
    assert_eq!(d.format, "MP3_128");
    assert!(d.protected);
    assert!(d.full);
    assert_eq!(d.song_id, common::SONG_ID);
    assert_eq!(d.not_before.unwrap().timestamp(), 1_700_000_000);
    assert_eq!(d.expiry.unwrap().timestamp(), 1_700_003_600);
}

#[test]
fn test_all_sources_and_missing_tracks() {
    let mock = Mock::start();
    let options = StreamOptions {
        first_url_only: false,
        ..StreamOptions::default()
    };
    let songs = [
        song(common::SONG_ID),
        SongRef {
            id: "404".into(),
            track_token: "tt-missing".into(),
        },
    ];
    let streams = media_client(&mock)
        .get_song_streams(&songs, &[MediaFormat::Flac, MediaFormat::Mp3320], &options)
        .unwrap();

    assert_eq!(streams.len(), 1);
    assert!(!streams.contains_key("404"));
    let urls: Vec<_> = streams[common::SONG_ID].iter().map(|d| d.url.as_str()).collect();
    assert_eq!(
        urls,
        [
            mock.url("/asset/protected"),
            mock.url("/asset/protected?mirror=1")
        ]
    );
}

#[test]
fn test_invalid_license_is_media_error() {
    let mock = Mock::start();
    let client = MediaClient::new(Client::new(), mock.url("/media"), "revoked");
    let err = client
        .get_song_streams(&[song(common::SONG_ID)], &[MediaFormat::Mp3128], &StreamOptions::default())
        .unwrap_err();

    let DeezerError::Media { status, message, errors } = err else {
        panic!("expected a media error");
    };
    assert_eq!(status, 403);
    assert_eq!(errors["errors"][0]["code"], 2002);
    assert!(message.contains("invalid license token"), "{message}");
}

#[test]
fn test_empty_request_never_reaches_server() {
    let mock = Mock::start();
    let err = media_client(&mock)
        .get_song_streams(&[], &[MediaFormat::Mp3128], &StreamOptions::default())
        .unwrap_err();
    assert!(matches!(err, DeezerError::InvalidInput(_)));
    assert_eq!(Counters::get(&mock.counters.get_url), 0);
}

#[test]
fn test_open_protected_stream() {
    let mock = Mock::start();
    let keys = common::keys();
    let streams = media_client(&mock)
        .get_song_streams(&[song(common::SONG_ID)], &[MediaFormat::Mp3128], &StreamOptions::default())
        .unwrap();

    let mut reader = streams[common::SONG_ID][0].open(&Client::new(), &keys).unwrap();
    let mut plain = Vec::new();
    reader.read_to_end(&mut plain).unwrap();

    let raw = common::asset_bytes();
    assert_eq!(plain.len(), raw.len());
    assert_eq!(plain, expected_plain(common::SONG_ID));
    assert_ne!(plain[..2048], raw[..2048]);
    assert_eq!(plain[2048..], raw[2048..]);
}

#[test]
fn test_open_preview_stream_passes_through() {
    let mock = Mock::start();
    let options = StreamOptions {
        media_type: MediaType::Preview,
        cipher: MediaCipher::None,
        first_url_only: true,
    };
    let streams = media_client(&mock)
        .get_song_streams(&[song(common::SONG_ID)], &[MediaFormat::Mp3128], &options)
        .unwrap();
    let d = &streams[common::SONG_ID][0];
    assert!(!d.protected);
    assert!(!d.full);

    let mut reader = d.open(&Client::new(), &common::keys()).unwrap();
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes).unwrap();
    assert_eq!(bytes, common::asset_bytes());
}

#[test]
fn test_legacy_descriptor_from_song() {
    let mock = Mock::start();
    let client = MobileClient::new(common::keys(), mock.config()).unwrap();
    let song = LegacySong::from_json(&client.song(3_135_556).unwrap()).unwrap();

    let d = StreamDescriptor::for_legacy_stream(client.keys(), &song, LegacyFormat::Mp3128).unwrap();
    assert!(d.protected);
    assert!(d.url.starts_with("https://e-cdns-proxy-d.dzcdn.net/mobile/1/"));
    assert!(d.url.ends_with("86a5d4f22116728732807516745d83632f189d6742be105ffd2fd95c88b60240309b86881"));
}

#[test]
fn test_signed_in_client_streams_end_to_end() {
    let mock = Mock::start();
    let client = MobileClient::new(common::keys(), mock.config()).unwrap();
    assert!(client.sign_in_with_email(common::EMAIL, common::PASSWORD).unwrap());

    let song = SongRef::from_json(&client.song(3_135_556).unwrap()).unwrap();
    let streams = client
        .media_client()
        .unwrap()
        .get_song_streams(&[song], &[MediaFormat::Mp3128], &StreamOptions::default())
        .unwrap();

    let mut reader = streams[common::SONG_ID][0].open(client.http(), client.keys()).unwrap();
    let mut plain = Vec::new();
    reader.read_to_end(&mut plain).unwrap();
    assert_eq!(plain, expected_plain(common::SONG_ID));
}
