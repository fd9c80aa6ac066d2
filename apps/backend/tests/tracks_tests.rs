//! Integration tests for track and slot endpoints.

mod common;

use axum::http::StatusCode;
use axum_test::multipart::MultipartForm;
use common::{audio_part, TestApp};
use std::path::PathBuf;

fn object_path(app: &TestApp, url: &str) -> PathBuf {
    let key = url.strip_prefix("local://").expect("local object url");
    app.objects_root().join(key)
}

#[tokio::test]
async fn test_create_slot_is_open_without_audio() {
    let app = TestApp::new().await;
    let (user_id, alice) = app.create_user("alice").await;
    let song_id = app.create_song(&alice, "Song").await;

    let response = app
        .server()
        .post(&format!("/api/songs/{}/slots", song_id))
        .add_header(alice.0, alice.1)
        .json(&serde_json::json!({ "instrument": " bass " }))
        .await;

    response.assert_status(StatusCode::CREATED);
    let body: serde_json::Value = response.json();
    assert_eq!(body["instrument"], "bass");
    assert_eq!(body["public"], true);
    assert!(body["audio"].is_null());
    assert_eq!(body["created_by"], user_id);
    assert!(body["contributed_by"].is_null());
}

#[tokio::test]
async fn test_create_track_stores_audio() {
    let app = TestApp::new().await;
    let (_, alice) = app.create_user("alice").await;
    let song_id = app.create_song(&alice, "Song").await;

    let form = MultipartForm::new()
        .add_text("instrument", "guitar")
        .add_part("audio", audio_part("Guitar Take.mp3", b"riff"));
    let response = app
        .server()
        .post(&format!("/api/songs/{}/tracks", song_id))
        .add_header(alice.0, alice.1)
        .multipart(form)
        .await;

    response.assert_status(StatusCode::CREATED);
    let body: serde_json::Value = response.json();
    assert_eq!(body["public"], false);
    assert_eq!(body["audio"]["name"], "Guitar Take.mp3");
    assert_eq!(body["audio"]["content_type"], "audio/mpeg");
    assert_eq!(body["audio"]["size"], 4);

    let url = body["audio"]["url"].as_str().unwrap();
    assert!(url.ends_with(".mp3"));
    assert_eq!(std::fs::read(object_path(&app, url)).unwrap(), b"riff");
}

#[tokio::test]
async fn test_create_track_requires_audio() {
    let app = TestApp::new().await;
    let (_, alice) = app.create_user("alice").await;
    let song_id = app.create_song(&alice, "Song").await;

    let form = MultipartForm::new().add_text("instrument", "guitar");
    let response = app
        .server()
        .post(&format!("/api/songs/{}/tracks", song_id))
        .add_header(alice.0, alice.1)
        .multipart(form)
        .await;

    response.assert_status_bad_request();
    assert_eq!(app.count("tracks").await, 0);
}

#[tokio::test]
async fn test_track_mutations_owner_only() {
    let app = TestApp::new().await;
    let (_, alice) = app.create_user("alice").await;
    let (_, bob) = app.create_user("bob").await;
    let song_id = app.create_song(&alice, "Song").await;
    let track_id = app.create_slot(&alice, song_id, "drums").await;

    app.server()
        .post(&format!("/api/songs/{}/slots", song_id))
        .add_header(bob.0.clone(), bob.1.clone())
        .json(&serde_json::json!({ "instrument": "kazoo" }))
        .await
        .assert_status_forbidden();

    app.server()
        .delete(&format!("/api/songs/{}/tracks/{}", song_id, track_id))
        .add_header(bob.0.clone(), bob.1.clone())
        .await
        .assert_status_forbidden();

    app.server()
        .post(&format!("/api/songs/{}/tracks/{}/reopen", song_id, track_id))
        .add_header(bob.0, bob.1)
        .await
        .assert_status_forbidden();

    assert_eq!(app.count("tracks").await, 1);
}

#[tokio::test]
async fn test_update_slot_with_audio_fills_it() {
    let app = TestApp::new().await;
    let (_, alice) = app.create_user("alice").await;
    let song_id = app.create_song(&alice, "Song").await;
    let track_id = app.create_slot(&alice, song_id, "keys").await;

    let form = MultipartForm::new()
        .add_text("instrument", "synth")
        .add_part("audio", audio_part("synth.mp3", b"pad"));
    let response = app
        .server()
        .put(&format!("/api/songs/{}/tracks/{}", song_id, track_id))
        .add_header(alice.0, alice.1)
        .multipart(form)
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["instrument"], "synth");
    assert_eq!(body["public"], false);
    assert_eq!(body["audio"]["name"], "synth.mp3");
    assert!(body["contributed_by"].is_null());
}

#[tokio::test]
async fn test_update_track_replaces_audio_and_removes_old_object() {
    let app = TestApp::new().await;
    let (_, alice) = app.create_user("alice").await;
    let song_id = app.create_song(&alice, "Song").await;
    let track_id = app
        .create_track(&alice, song_id, "guitar", "take1.wav", b"first")
        .await;

    let tracks: serde_json::Value = app
        .server()
        .get(&format!("/api/songs/{}/tracks", song_id))
        .await
        .json();
    let old_url = tracks[0]["audio"]["url"].as_str().unwrap().to_string();

    let form = MultipartForm::new().add_part("audio", audio_part("take2.mp3", b"second"));
    let response = app
        .server()
        .put(&format!("/api/songs/{}/tracks/{}", song_id, track_id))
        .add_header(alice.0, alice.1)
        .multipart(form)
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    let new_url = body["audio"]["url"].as_str().unwrap();
    assert_ne!(new_url, old_url);
    assert_eq!(body["instrument"], "guitar");
    assert!(!object_path(&app, &old_url).exists());
    assert_eq!(std::fs::read(object_path(&app, new_url)).unwrap(), b"second");
}

#[tokio::test]
async fn test_update_track_with_same_extension_uses_new_object() {
    let app = TestApp::new().await;
    let (_, alice) = app.create_user("alice").await;
    let song_id = app.create_song(&alice, "Song").await;
    let track_id = app
        .create_track(&alice, song_id, "bass", "bass.mp3", b"take one")
        .await;

    let tracks: serde_json::Value = app
        .server()
        .get(&format!("/api/songs/{}/tracks", song_id))
        .await
        .json();
    let old_url = tracks[0]["audio"]["url"].as_str().unwrap().to_string();

    let form = MultipartForm::new().add_part("audio", audio_part("bass.mp3", b"take two"));
    let response = app
        .server()
        .put(&format!("/api/songs/{}/tracks/{}", song_id, track_id))
        .add_header(alice.0, alice.1)
        .multipart(form)
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    let new_url = body["audio"]["url"].as_str().unwrap();
    assert_ne!(new_url, old_url);
    assert!(new_url.ends_with(".mp3"));
    assert!(!object_path(&app, &old_url).exists());
    assert_eq!(std::fs::read(object_path(&app, new_url)).unwrap(), b"take two");
}

#[tokio::test]
async fn test_update_track_without_changes_is_rejected() {
    let app = TestApp::new().await;
    let (_, alice) = app.create_user("alice").await;
    let song_id = app.create_song(&alice, "Song").await;
    let track_id = app.create_slot(&alice, song_id, "keys").await;

    let response = app
        .server()
        .put(&format!("/api/songs/{}/tracks/{}", song_id, track_id))
        .add_header(alice.0, alice.1)
        .multipart(MultipartForm::new())
        .await;

    response.assert_status_bad_request();
}

#[tokio::test]
async fn test_reopen_track_clears_audio() {
    let app = TestApp::new().await;
    let (_, alice) = app.create_user("alice").await;
    let song_id = app.create_song(&alice, "Song").await;
    let track_id = app
        .create_track(&alice, song_id, "cello", "cello.mp3", b"low")
        .await;

    let tracks: serde_json::Value = app
        .server()
        .get(&format!("/api/songs/{}/tracks", song_id))
        .await
        .json();
    let url = tracks[0]["audio"]["url"].as_str().unwrap().to_string();

    let response = app
        .server()
        .post(&format!("/api/songs/{}/tracks/{}/reopen", song_id, track_id))
        .add_header(alice.0, alice.1)
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["public"], true);
    assert!(body["audio"].is_null());
    assert!(!object_path(&app, &url).exists());
}

#[tokio::test]
async fn test_delete_track_removes_object() {
    let app = TestApp::new().await;
    let (_, alice) = app.create_user("alice").await;
    let song_id = app.create_song(&alice, "Song").await;
    let track_id = app
        .create_track(&alice, song_id, "flute", "flute.mp3", b"toot")
        .await;

    let tracks: serde_json::Value = app
        .server()
        .get(&format!("/api/songs/{}/tracks", song_id))
        .await
        .json();
    let url = tracks[0]["audio"]["url"].as_str().unwrap().to_string();

    let response = app
        .server()
        .delete(&format!("/api/songs/{}/tracks/{}", song_id, track_id))
        .add_header(alice.0, alice.1)
        .await;

    response.assert_status(StatusCode::NO_CONTENT);
    assert_eq!(app.count("tracks").await, 0);
    assert!(!object_path(&app, &url).exists());
}

#[tokio::test]
async fn test_track_from_another_song_not_found() {
    let app = TestApp::new().await;
    let (_, alice) = app.create_user("alice").await;
    let first = app.create_song(&alice, "First").await;
    let second = app.create_song(&alice, "Second").await;
    let track_id = app.create_slot(&alice, first, "horns").await;

    app.server()
        .delete(&format!("/api/songs/{}/tracks/{}", second, track_id))
        .add_header(alice.0, alice.1)
        .await
        .assert_status_not_found();
}

#[tokio::test]
async fn test_tracks_keep_audio_invariant() {
    let app = TestApp::new().await;
    let (_, alice) = app.create_user("alice").await;
    let song_id = app.create_song(&alice, "Song").await;
    app.create_slot(&alice, song_id, "vocals").await;
    app.create_track(&alice, song_id, "drums", "drums.mp3", b"boom")
        .await;

    let tracks: serde_json::Value = app
        .server()
        .get(&format!("/api/songs/{}/tracks", song_id))
        .await
        .json();

    let tracks = tracks.as_array().unwrap();
    assert_eq!(tracks.len(), 2);
    for track in tracks {
        assert_eq!(track["public"].as_bool().unwrap(), track["audio"].is_null());
    }
}
