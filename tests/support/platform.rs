//! Wiremock stand-in for the platform API and its media CDN.

use std::path::Path;

use bilidown_core::DownloaderConfig;
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Metadata endpoint path.
pub const VIEW_PATH: &str = "/x/web-interface/view";

/// Playback-info endpoint path.
pub const PLAY_URL_PATH: &str = "/x/player/playurl";

/// Body served for one elementary stream of `cid`.
#[must_use]
pub fn media_body(cid: u64, kind: &str) -> Vec<u8> {
    format!("{kind}-stream-of-{cid}").into_bytes()
}

/// Mounts the metadata response for `bvid` with the given `(cid, part)` pages.
pub async fn mount_view(server: &MockServer, bvid: &str, title: &str, pages: &[(u64, &str)]) {
    let pages: Vec<_> = pages
        .iter()
        .map(|(cid, part)| json!({"cid": cid, "part": part}))
        .collect();
    Mock::given(method("GET"))
        .and(path(VIEW_PATH))
        .and(query_param("bvid", bvid))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 0,
            "message": "0",
            "data": {"title": title, "pages": pages}
        })))
        .mount(server)
        .await;
}

/// Mounts playback info for `cid` pointing at media routes on the same server.
pub async fn mount_play_url(server: &MockServer, bvid: &str, cid: u64) {
    let media = |kind: &str| format!("{}/media/{cid}/{kind}.m4s", server.uri());
    Mock::given(method("GET"))
        .and(path(PLAY_URL_PATH))
        .and(query_param("fnval", "16"))
        .and(query_param("bvid", bvid))
        .and(query_param("cid", cid.to_string()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 0,
            "data": {"dash": {
                "audio": [{"baseUrl": media("audio")}, {"baseUrl": format!("{}/worse", server.uri())}],
                "video": [{"baseUrl": media("video")}]
            }}
        })))
        .mount(server)
        .await;
}

/// Mounts both media bodies for `cid`.
pub async fn mount_media(server: &MockServer, cid: u64) {
    for kind in ["audio", "video"] {
        Mock::given(method("GET"))
            .and(path(format!("/media/{cid}/{kind}.m4s")))
            .respond_with(ResponseTemplate::new(206).set_body_bytes(media_body(cid, kind)))
            .mount(server)
            .await;
    }
}

/// Mounts metadata, playback info and media for a whole video.
pub async fn mount_video(server: &MockServer, bvid: &str, title: &str, pages: &[(u64, &str)]) {
    mount_view(server, bvid, title, pages).await;
    for (cid, _) in pages {
        mount_play_url(server, bvid, *cid).await;
        mount_media(server, *cid).await;
    }
}

/// Configuration pointed at `server` with every delay disabled.
#[must_use]
pub fn test_config(server: &MockServer, temp_parent: &Path) -> DownloaderConfig {
    DownloaderConfig {
        api_base_url: server.uri(),
        temp_parent: Some(temp_parent.to_path_buf()),
        ..DownloaderConfig::default()
    }
    .without_delays()
}
