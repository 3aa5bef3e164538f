//! End-to-end transfers between a share session and the download client.

mod common;

use std::sync::Arc;
use std::time::Duration;

use vidshare_core::checksum::Verification;
use vidshare_core::client::{DownloadStatus, TransferClient};
use vidshare_core::device::DirectorySink;
use vidshare_core::hotspot::SimulatedTransport;
use vidshare_core::session::ShareRequest;
use vidshare_core::Error;

use common::{
    assert_files_equal, create_temp_dir, create_test_file, random_bytes, stalling_server,
    test_config, test_manager,
};

fn client() -> TransferClient {
    TransferClient::new(&test_config(), Arc::new(SimulatedTransport::new()))
        .expect("Failed to build client")
}

#[tokio::test]
async fn test_share_and_receive() {
    let dir = create_temp_dir();
    let source = create_test_file(dir.path(), "send/holiday.mp4", &random_bytes(3 * 1024 * 1024));
    let (manager, _) = test_manager();

    let shared = manager
        .start_sharing(ShareRequest::new(&source, "Holiday"))
        .await
        .unwrap();
    let payload = shared.descriptor.to_json().unwrap();

    let inbox = dir.path().join("inbox");
    let client = client().with_sink(Arc::new(DirectorySink::new(&inbox)));
    let descriptor = client.accept_descriptor(&payload).unwrap();
    let result = client
        .download(&descriptor, &dir.path().join("partial/holiday.part"))
        .await
        .unwrap();

    assert_eq!(result.path, inbox.join("Holiday.mp4"));
    assert!(result.verification.is_verified());
    assert_files_equal(&source, &result.path);
    assert_eq!(client.state().status, DownloadStatus::Completed);
    assert_eq!(manager.status().await.request_count, 1);

    manager.stop_sharing().await;
}

#[tokio::test]
async fn test_two_part_resume_matches_source() {
    let dir = create_temp_dir();
    let data = random_bytes(5 * 1024 * 1024);
    let source = create_test_file(dir.path(), "clip.mp4", &data);
    let (manager, _) = test_manager();
    let shared = manager
        .start_sharing(ShareRequest::new(&source, "Clip"))
        .await
        .unwrap();

    // First attempt stopped after 2 MiB.
    let offset = 2 * 1024 * 1024;
    let remaining = (data.len() - offset) as u64;
    let dest = dir.path().join("received.mp4");
    std::fs::write(&dest, &data[..offset]).unwrap();

    let mut served = manager.subscribe_progress();
    let client = client();
    let result = client.download(&shared.descriptor, &dest).await.unwrap();

    assert_eq!(result.resumed_from, offset as u64);
    assert_eq!(result.bytes, data.len() as u64);
    assert!(matches!(result.verification, Verification::Matched(_)));
    assert_files_equal(&source, &dest);

    // One request, answered with only the missing tail.
    assert_eq!(manager.status().await.request_count, 1);
    let mut events = 0;
    while let Ok(progress) = served.try_recv() {
        assert_eq!(progress.total_bytes, remaining);
        events += 1;
    }
    assert!(events > 0);

    let tail = reqwest::Client::new()
        .get(&shared.descriptor.video.server_url)
        .header(reqwest::header::RANGE, format!("bytes={offset}-"))
        .send()
        .await
        .unwrap();
    assert_eq!(tail.status(), reqwest::StatusCode::PARTIAL_CONTENT);
    assert_eq!(
        tail.headers()[reqwest::header::CONTENT_RANGE],
        format!("bytes {offset}-{}/{}", data.len() - 1, data.len()).as_str()
    );

    manager.stop_sharing().await;
}

#[tokio::test]
async fn test_corrupt_partial_fails_integrity_and_is_removed() {
    let dir = create_temp_dir();
    let data = random_bytes(64 * 1024);
    let source = create_test_file(dir.path(), "clip.mp4", &data);
    let (manager, _) = test_manager();
    let shared = manager
        .start_sharing(ShareRequest::new(&source, "Clip"))
        .await
        .unwrap();

    let dest = dir.path().join("received.mp4");
    std::fs::write(&dest, vec![0u8; 1000]).unwrap();

    let client = client();
    let err = client.download(&shared.descriptor, &dest).await.unwrap_err();
    assert!(matches!(err, Error::Integrity { .. }));
    assert!(!dest.exists());

    // A clean retry succeeds.
    let result = client.download(&shared.descriptor, &dest).await.unwrap();
    assert_eq!(result.resumed_from, 0);
    assert_files_equal(&source, &dest);

    manager.stop_sharing().await;
}

#[tokio::test]
async fn test_progress_is_published() {
    let dir = create_temp_dir();
    let source = create_test_file(dir.path(), "clip.mp4", &random_bytes(2 * 1024 * 1024));
    let (manager, _) = test_manager();
    let shared = manager
        .start_sharing(ShareRequest::new(&source, "Clip"))
        .await
        .unwrap();

    let client = client();
    let mut rx = client.subscribe();
    let watcher = tokio::spawn(async move {
        let mut seen = Vec::new();
        while rx.changed().await.is_ok() {
            let state = rx.borrow_and_update().clone();
            let done = state.status.is_terminal();
            seen.push(state);
            if done {
                break;
            }
        }
        seen
    });

    client
        .download(&shared.descriptor, &dir.path().join("out.mp4"))
        .await
        .unwrap();
    let seen = watcher.await.unwrap();

    let last = seen.last().unwrap();
    assert_eq!(last.status, DownloadStatus::Completed);
    assert_eq!(last.bytes_written, 2 * 1024 * 1024);
    assert!((last.percentage() - 100.0).abs() < f64::EPSILON);
    let written: Vec<u64> = seen.iter().map(|s| s.bytes_written).collect();
    assert!(written.windows(2).all(|w| w[0] <= w[1]));

    manager.stop_sharing().await;
}

#[tokio::test]
async fn test_stalled_sender_times_out() {
    let (url, task) = stalling_server(vec![7u8; 100], 1000).await;
    let mut config = test_config();
    config.transfer.read_timeout = Duration::from_millis(300);
    let client = TransferClient::new(&config, Arc::new(SimulatedTransport::new())).unwrap();

    let payload = serde_json::json!({
        "schemaType": "video_share",
        "schemaVersion": "1.0",
        "video": {
            "id": "s1", "title": "Clip", "filePath": "/clip.mp4", "fileSize": 1000,
            "serverUrl": url, "serverPort": 1, "timestamp": 1
        },
        "senderDevice": {"name": "Phone", "platform": "android"}
    })
    .to_string();
    let descriptor = client.accept_descriptor(&payload).unwrap();

    let dir = create_temp_dir();
    let dest = dir.path().join("clip.mp4");
    let err = client.download(&descriptor, &dest).await.unwrap_err();

    assert!(matches!(err, Error::Timeout(_)));
    assert!(err.is_recoverable());
    assert_eq!(std::fs::metadata(&dest).unwrap().len(), 100);
    task.abort();
}

#[tokio::test]
async fn test_cancel_keeps_or_deletes_partial() {
    let (url, task) = stalling_server(vec![1u8; 500], 10_000).await;
    let payload = serde_json::json!({
        "schemaType": "video_share",
        "schemaVersion": "1.0",
        "video": {
            "id": "s1", "title": "Clip", "filePath": "/clip.mp4", "fileSize": 10_000,
            "serverUrl": url, "serverPort": 1, "timestamp": 1
        },
        "senderDevice": {"name": "Phone", "platform": "android"}
    })
    .to_string();
    let dir = create_temp_dir();

    for delete_partial in [false, true] {
        let client = Arc::new(client());
        let descriptor = client.accept_descriptor(&payload).unwrap();
        let dest = dir.path().join(format!("clip-{delete_partial}.mp4"));

        let mut rx = client.subscribe();
        let canceller = {
            let client = client.clone();
            tokio::spawn(async move {
                rx.wait_for(|s| s.status == DownloadStatus::Downloading)
                    .await
                    .unwrap();
                tokio::time::sleep(Duration::from_millis(100)).await;
                client.cancel(delete_partial).await;
            })
        };

        let err = client.download(&descriptor, &dest).await.unwrap_err();
        canceller.await.unwrap();

        assert!(matches!(err, Error::Cancelled));
        let state = client.state();
        assert_eq!(state.status, DownloadStatus::Failed);
        assert_eq!(state.last_error.as_deref(), Some("cancelled"));
        assert_eq!(dest.exists(), !delete_partial);
    }
    task.abort();
}
