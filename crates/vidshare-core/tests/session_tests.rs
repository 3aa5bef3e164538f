//! Share session lifecycle and descriptor wire format.

mod common;

use std::net::TcpListener;
use std::time::Duration;

use reqwest::StatusCode;

use vidshare_core::descriptor;
use vidshare_core::session::ShareRequest;
use vidshare_core::Error;

use common::{create_temp_dir, create_test_file, random_bytes, test_manager};

#[tokio::test]
async fn test_new_share_replaces_old_one() {
    let dir = create_temp_dir();
    let first = create_test_file(dir.path(), "first.mp4", b"first video");
    let second = create_test_file(dir.path(), "second.mp4", b"second video");
    let (manager, _) = test_manager();

    let a = manager
        .start_sharing(ShareRequest::new(&first, "First"))
        .await
        .unwrap();
    let b = manager
        .start_sharing(ShareRequest::new(&second, "Second"))
        .await
        .unwrap();

    assert_ne!(a.session.session_id(), b.session.session_id());
    assert!(!a.session.is_active());
    assert!(b.session.is_active());

    let body = reqwest::get(&b.descriptor.video.server_url)
        .await
        .unwrap()
        .bytes()
        .await
        .unwrap();
    assert_eq!(body.as_ref(), b"second video");

    assert!(manager.resolve_link(&a.descriptor.link()).await.is_err());
    assert_eq!(
        manager.resolve_link(&b.descriptor.link()).await.unwrap(),
        b.descriptor
    );

    manager.stop_sharing().await;
}

#[tokio::test]
async fn test_replacing_offline_share_releases_port_and_hotspot() {
    let dir = create_temp_dir();
    let first = create_test_file(dir.path(), "first.mp4", &random_bytes(2048));
    let second = create_test_file(dir.path(), "second.mp4", &random_bytes(2048));
    let (manager, transport) = test_manager();

    let a = manager
        .start_sharing(ShareRequest::new(&first, "First").offline(true))
        .await
        .unwrap();
    let a_ssid = a.descriptor.hotspot.as_ref().map(|h| h.ssid.clone());
    assert!(a_ssid.is_some());
    assert_eq!(transport.active_ssid(), a_ssid);

    let b = manager
        .start_sharing(ShareRequest::new(&second, "Second"))
        .await
        .unwrap();

    assert_ne!(a.descriptor, b.descriptor);
    assert!(b.descriptor.hotspot.is_none());
    assert_eq!(transport.active_ssid(), None);
    assert_eq!(transport.stop_count(), 1);
    assert!(!manager.hotspot_status().is_active);

    let a_port = a.session.server_port();
    assert!(
        a_port == b.session.server_port() || TcpListener::bind(("127.0.0.1", a_port)).is_ok(),
        "port {a_port} of the replaced share is still bound"
    );

    manager.stop_sharing().await;
}

#[tokio::test]
async fn test_dropping_manager_releases_hotspot() {
    let dir = create_temp_dir();
    let source = create_test_file(dir.path(), "clip.mp4", &random_bytes(1024));
    let (manager, transport) = test_manager();

    let shared = manager
        .start_sharing(ShareRequest::new(&source, "Clip").offline(true))
        .await
        .unwrap();
    assert!(transport.active_ssid().is_some());
    let port = shared.session.server_port();

    drop(manager);

    tokio::time::timeout(Duration::from_secs(5), async {
        while transport.active_ssid().is_some() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("access point still up after the manager was dropped");
    assert_eq!(transport.stop_count(), 1);

    tokio::time::timeout(Duration::from_secs(5), async {
        while TcpListener::bind(("127.0.0.1", port)).is_err() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("port still bound after the manager was dropped");
}

#[tokio::test]
async fn test_stop_releases_everything() {
    let dir = create_temp_dir();
    let source = create_test_file(dir.path(), "clip.mp4", &random_bytes(4096));
    let (manager, transport) = test_manager();

    let shared = manager
        .start_sharing(ShareRequest::new(&source, "Clip").offline(true))
        .await
        .unwrap();
    assert!(transport.active_ssid().is_some());
    assert!(manager.hotspot_status().is_active);

    manager.stop_sharing().await;

    assert!(transport.active_ssid().is_none());
    assert!(!manager.hotspot_status().is_active);
    assert!(manager.descriptor().await.is_none());
    assert!(reqwest::get(&shared.descriptor.video.server_url).await.is_err());
}

#[tokio::test]
async fn test_request_count_tracks_video_requests() {
    let dir = create_temp_dir();
    let source = create_test_file(dir.path(), "clip.mp4", &random_bytes(1024));
    let (manager, _) = test_manager();
    let shared = manager
        .start_sharing(ShareRequest::new(&source, "Clip"))
        .await
        .unwrap();
    let url = &shared.descriptor.video.server_url;
    let client = reqwest::Client::new();

    client.get(url).send().await.unwrap().bytes().await.unwrap();
    let ranged = client
        .get(url)
        .header(reqwest::header::RANGE, "bytes=0-9")
        .send()
        .await
        .unwrap();
    assert_eq!(ranged.status(), StatusCode::PARTIAL_CONTENT);
    ranged.bytes().await.unwrap();
    client
        .get(url.replace("/video", "/status"))
        .send()
        .await
        .unwrap();

    assert_eq!(shared.session.request_count(), 2);
    assert_eq!(manager.status().await.request_count, 2);
    manager.stop_sharing().await;
}

#[tokio::test]
async fn test_failed_start_leaves_previous_share_stopped() {
    let dir = create_temp_dir();
    let source = create_test_file(dir.path(), "clip.mp4", b"ok");
    let (manager, _) = test_manager();

    let first = manager
        .start_sharing(ShareRequest::new(&source, "Clip"))
        .await
        .unwrap();
    let err = manager
        .start_sharing(ShareRequest::new(dir.path().join("missing.mp4"), "Gone"))
        .await
        .unwrap_err();

    assert_eq!(err.code(), Some("E001"));
    assert!(!first.session.is_active());
    assert!(!manager.status().await.is_active);
}

#[tokio::test]
async fn test_descriptor_survives_wire_roundtrip() {
    let dir = create_temp_dir();
    let source = create_test_file(dir.path(), "clip.mp4", &random_bytes(2048));
    let (manager, _) = test_manager();

    for offline in [false, true] {
        let shared = manager
            .start_sharing(ShareRequest::new(&source, "Clip").offline(offline))
            .await
            .unwrap();

        let encoded = descriptor::encode(&shared.session);
        assert_eq!(encoded, shared.descriptor);

        let decoded = descriptor::decode(&encoded.to_json().unwrap()).unwrap();
        assert_eq!(decoded, encoded);

        let json: serde_json::Value = serde_json::from_str(&encoded.to_json().unwrap()).unwrap();
        assert_eq!(json.get("hotspot").is_some(), offline);
    }
    manager.stop_sharing().await;
}

#[test]
fn test_malformed_descriptors_are_rejected() {
    let valid: serde_json::Value = serde_json::json!({
        "schemaType": "video_share",
        "schemaVersion": "1.0",
        "video": {
            "id": "abc", "title": "Clip", "filePath": "/clip.mp4", "fileSize": 10,
            "serverUrl": "http://10.0.0.2:8080/video", "serverPort": 8080, "timestamp": 1
        },
        "senderDevice": {"name": "Phone", "platform": "android"}
    });
    assert!(descriptor::decode(&valid.to_string()).is_ok());

    let mutations: Vec<(&str, Box<dyn Fn(&mut serde_json::Value)>)> = vec![
        ("wrong type", Box::new(|v| v["schemaType"] = "photo_share".into())),
        ("wrong version", Box::new(|v| v["schemaVersion"] = "2.0".into())),
        ("empty id", Box::new(|v| v["video"]["id"] = "".into())),
        ("empty title", Box::new(|v| v["video"]["title"] = "".into())),
        ("empty sender", Box::new(|v| v["senderDevice"]["name"] = "".into())),
        ("string size", Box::new(|v| v["video"]["fileSize"] = "10".into())),
        ("no url", Box::new(|v| {
            v["video"].as_object_mut().unwrap().remove("serverUrl");
        })),
        ("no port", Box::new(|v| {
            v["video"].as_object_mut().unwrap().remove("serverPort");
        })),
        ("no timestamp", Box::new(|v| {
            v["video"].as_object_mut().unwrap().remove("timestamp");
        })),
    ];

    for (name, mutate) in mutations {
        let mut candidate = valid.clone();
        mutate(&mut candidate);
        let rejected = descriptor::decode(&candidate.to_string());
        assert!(rejected.is_err(), "{name} was accepted");
        let err: Error = rejected.unwrap_err().into();
        assert_eq!(err.code(), Some("E005"), "{name}");
    }

    for garbage in ["", "not json", "[]", "{}", "null"] {
        assert!(descriptor::decode(garbage).is_err(), "{garbage:?} was accepted");
    }
}

#[test]
fn test_share_link_format() {
    let link = descriptor::share_link("abc-123");
    assert_eq!(link, "app-share://share/abc-123");
    assert_eq!(descriptor::parse_share_link(&link), Some("abc-123"));
    assert_eq!(descriptor::parse_share_link("https://share/abc"), None);
}
