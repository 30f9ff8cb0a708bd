mod support;

use chatdesk::api::FileUpload;
use chatdesk::event::AppEvent;
use chatdesk::files::FileRoster;
use chatdesk::system;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use support::{drain, file, payload_error, sink, FakeBackend};

fn upload(name: &str) -> FileUpload {
    FileUpload {
        filename: name.to_string(),
        bytes: b"contents".to_vec(),
    }
}

#[tokio::test]
async fn second_upload_is_rejected_while_first_is_in_flight() {
    let backend = Arc::new(FakeBackend::gated());
    let (events, rx) = sink();
    let roster = Arc::new(FileRoster::new(backend.clone(), events));

    let first = tokio::spawn({
        let roster = Arc::clone(&roster);
        async move { roster.upload(upload("a.txt")).await }
    });
    backend.upload_entered.notified().await;
    assert!(roster.is_uploading());

    assert!(!roster.upload(upload("b.txt")).await);
    assert_eq!(backend.upload_calls.load(Ordering::SeqCst), 1);

    backend
        .upload_gate
        .as_ref()
        .expect("backend should be gated")
        .notify_one();
    assert!(first.await.expect("upload task should join"));
    assert!(!roster.is_uploading());

    let names: Vec<String> = roster.files().await.into_iter().map(|f| f.filename).collect();
    assert_eq!(names, vec!["a.txt".to_string()]);

    let upload_events: Vec<String> = drain(&rx)
        .into_iter()
        .filter_map(|event| match event {
            AppEvent::UploadStarted(name) => Some(format!("started {name}")),
            AppEvent::UploadRejected(name) => Some(format!("rejected {name}")),
            AppEvent::UploadFinished { filename, ok } => Some(format!("finished {filename} {ok}")),
            _ => None,
        })
        .collect();
    assert_eq!(
        upload_events,
        vec!["started a.txt", "rejected b.txt", "finished a.txt true"]
    );
}

#[tokio::test]
async fn failed_upload_returns_false_and_releases_the_flag() {
    let backend = Arc::new(FakeBackend::default());
    backend.upload_fails.store(true, Ordering::SeqCst);
    let (events, _rx) = sink();
    let roster = FileRoster::new(backend.clone(), events);

    assert!(!roster.upload(upload("a.txt")).await);
    assert!(!roster.is_uploading());
    assert_eq!(backend.list_calls.load(Ordering::SeqCst), 0);

    backend.upload_fails.store(false, Ordering::SeqCst);
    assert!(roster.upload(upload("a.txt")).await);
}

#[tokio::test]
async fn delete_removes_file_even_when_refetch_is_stale() {
    let backend = Arc::new(FakeBackend::with_files(vec![
        file("f1", "one.pdf"),
        file("f2", "two.pdf"),
    ]));
    let (events, rx) = sink();
    let roster = FileRoster::new(backend.clone(), events);
    roster.fetch().await;

    backend.script_list(Ok(vec![file("f1", "one.pdf"), file("f2", "two.pdf")]));
    assert!(roster.delete("f1").await);

    assert_eq!(roster.files().await, vec![file("f2", "two.pdf")]);
    let last = drain(&rx).into_iter().rev().find_map(|event| match event {
        AppEvent::FilesChanged(files) => Some(files),
        _ => None,
    });
    assert_eq!(last, Some(vec![file("f2", "two.pdf")]));
}

#[tokio::test]
async fn delete_with_fresh_refetch_leaves_remaining_files() {
    let backend = Arc::new(FakeBackend::with_files(vec![
        file("f1", "one.pdf"),
        file("f2", "two.pdf"),
    ]));
    let (events, _rx) = sink();
    let roster = FileRoster::new(backend.clone(), events);
    roster.fetch().await;

    assert!(roster.delete("f1").await);
    assert_eq!(roster.files().await, vec![file("f2", "two.pdf")]);
}

#[tokio::test]
async fn failed_delete_keeps_roster() {
    let backend = Arc::new(FakeBackend::with_files(vec![file("f1", "one.pdf")]));
    backend.delete_fails.store(true, Ordering::SeqCst);
    let (events, _rx) = sink();
    let roster = FileRoster::new(backend.clone(), events);
    roster.fetch().await;

    assert!(!roster.delete("f1").await);
    assert_eq!(roster.files().await, vec![file("f1", "one.pdf")]);
}

#[tokio::test]
async fn fetch_failure_empties_the_roster() {
    let backend = Arc::new(FakeBackend::with_files(vec![file("f1", "one.pdf")]));
    let (events, _rx) = sink();
    let roster = FileRoster::new(backend.clone(), events);
    roster.fetch().await;
    assert_eq!(roster.files().await.len(), 1);

    backend.script_list(Err(payload_error("list-files")));
    assert!(roster.fetch().await.is_empty());
    assert!(roster.files().await.is_empty());
}

#[tokio::test]
async fn delete_all_clears_roster() {
    let backend = Arc::new(FakeBackend::with_files(vec![
        file("f1", "one.pdf"),
        file("f2", "two.pdf"),
    ]));
    let (events, _rx) = sink();
    let roster = FileRoster::new(backend.clone(), events);
    roster.fetch().await;

    assert!(roster.delete_all().await);
    assert!(roster.files().await.is_empty());
}

#[tokio::test]
async fn download_writes_into_directory() {
    let backend = Arc::new(FakeBackend::default());
    backend
        .downloads
        .lock()
        .expect("downloads lock should not be poisoned")
        .push(("f1".to_string(), b"a,b\n1,2\n".to_vec()));
    let (events, _rx) = sink();
    let roster = FileRoster::new(backend.clone(), events);
    let dir = tempfile::tempdir().expect("tempdir should be created");

    let path = roster
        .download(&file("f1", "../table.csv"), dir.path())
        .await
        .expect("download should succeed");
    assert_eq!(path, dir.path().join("table.csv"));
    assert_eq!(
        std::fs::read(&path).expect("downloaded file should read"),
        b"a,b\n1,2\n"
    );
}

#[tokio::test]
async fn system_initialization_requires_both_ids() {
    let backend = FakeBackend::default();
    *backend
        .system_info
        .lock()
        .expect("system info lock should not be poisoned") = chatdesk::api::SystemInfo {
        assistant_id: Some("asst_1".to_string()),
        vector_store_id: None,
    };
    assert!(system::initialize(&backend).await.is_err());

    backend
        .system_info
        .lock()
        .expect("system info lock should not be poisoned")
        .vector_store_id = Some("vs_1".to_string());
    let info = system::initialize(&backend)
        .await
        .expect("initialization should succeed");
    assert_eq!(info.vector_store_id.as_deref(), Some("vs_1"));
}
