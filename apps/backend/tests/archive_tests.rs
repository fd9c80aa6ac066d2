//! Integration tests for song archive downloads.

mod common;

use std::io::{Cursor, Read};

use common::TestApp;

fn zip_entries(bytes: &[u8]) -> Vec<(String, Vec<u8>)> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes.to_vec())).expect("valid zip");
    (0..archive.len())
        .map(|i| {
            let mut file = archive.by_index(i).unwrap();
            let mut data = Vec::new();
            file.read_to_end(&mut data).unwrap();
            (file.name().to_string(), data)
        })
        .collect()
}

fn work_dir_is_empty(app: &TestApp) -> bool {
    std::fs::read_dir(app.work_dir())
        .map(|mut entries| entries.next().is_none())
        .unwrap_or(true)
}

#[tokio::test]
async fn test_download_song_zip() {
    let app = TestApp::new().await;
    let (_, alice) = app.create_user("alice").await;
    let song_id = app.create_song(&alice, "Demo").await;
    app.create_track(&alice, song_id, "guitar", "guitar.mp3", b"riff")
        .await;
    app.create_slot(&alice, song_id, "vocals").await;

    let response = app
        .server()
        .get(&format!("/api/songs/{}/download", song_id))
        .add_header(alice.0, alice.1)
        .await;

    response.assert_status_ok();
    assert_eq!(response.header("content-type"), "application/zip");
    assert_eq!(
        response.header("content-disposition"),
        "attachment; filename=\"Demo.zip\""
    );

    let entries = zip_entries(response.as_bytes());
    assert_eq!(entries, vec![("guitar.mp3".to_string(), b"riff".to_vec())]);
    assert!(work_dir_is_empty(&app));
}

#[tokio::test]
async fn test_download_includes_approved_contribution() {
    let app = TestApp::new().await;
    let (_, alice) = app.create_user("alice").await;
    let (_, bob) = app.create_user("bob").await;
    let song_id = app.create_song(&alice, "Demo").await;
    app.create_track(&alice, song_id, "drums", "drums.mp3", b"boom")
        .await;
    let slot = app.create_slot(&alice, song_id, "bass").await;

    let request: serde_json::Value = app
        .submit_request(&bob, slot, "bass.mp3", b"thump")
        .await
        .json();
    app.server()
        .post(&format!("/api/track-requests/{}/approve", request["id"]))
        .add_header(alice.0.clone(), alice.1.clone())
        .await
        .assert_status_ok();

    let response = app
        .server()
        .get(&format!("/api/songs/{}/download", song_id))
        .add_header(alice.0, alice.1)
        .await;

    response.assert_status_ok();
    let mut names: Vec<String> = zip_entries(response.as_bytes())
        .into_iter()
        .map(|(name, _)| name)
        .collect();
    names.sort();
    assert_eq!(names, vec!["bass.mp3", "drums.mp3"]);
}

#[tokio::test]
async fn test_download_song_non_owner_forbidden() {
    let app = TestApp::new().await;
    let (_, alice) = app.create_user("alice").await;
    let (_, bob) = app.create_user("bob").await;
    let song_id = app.create_song(&alice, "Demo").await;

    app.server()
        .get(&format!("/api/songs/{}/download", song_id))
        .add_header(bob.0, bob.1)
        .await
        .assert_status_forbidden();

    app.server()
        .get(&format!("/api/songs/{}/download", song_id))
        .await
        .assert_status_unauthorized();
}

#[tokio::test]
async fn test_download_missing_object_cleans_up() {
    let app = TestApp::new().await;
    let (_, alice) = app.create_user("alice").await;
    let song_id = app.create_song(&alice, "Demo").await;
    app.create_track(&alice, song_id, "guitar", "guitar.mp3", b"riff")
        .await;

    let tracks: serde_json::Value = app
        .server()
        .get(&format!("/api/songs/{}/tracks", song_id))
        .await
        .json();
    let url = tracks[0]["audio"]["url"].as_str().unwrap();
    std::fs::remove_file(app.objects_root().join(url.strip_prefix("local://").unwrap())).unwrap();

    let response = app
        .server()
        .get(&format!("/api/songs/{}/download", song_id))
        .add_header(alice.0, alice.1)
        .await;

    assert!(response.status_code().is_server_error());
    assert!(work_dir_is_empty(&app));
}
