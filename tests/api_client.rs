use chatdesk::api::{ApiClient, ApiError, Backend, ChatReply, ChatRequest, FileUpload};
use chatdesk::dispatch::ChatEvent;
use chatdesk::media::DataUrl;
use chatdesk::session::ImageDetailLevel;
use chatdesk::stream::decode_records;
use futures::StreamExt;
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{body_json, body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer) -> ApiClient {
    ApiClient::new(server.uri(), Duration::from_secs(5)).expect("client should build")
}

fn upload() -> FileUpload {
    FileUpload {
        filename: "notes.txt".to_string(),
        bytes: b"hello notes".to_vec(),
    }
}

#[tokio::test]
async fn upload_posts_multipart_file_field() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/upload"))
        .and(body_string_contains("name=\"file\""))
        .and(body_string_contains("filename=\"notes.txt\""))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"message": "File uploaded successfully"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    client(&server)
        .upload_file(upload())
        .await
        .expect("upload should succeed");
}

#[tokio::test]
async fn upload_without_success_marker_fails() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/upload"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "queued"})))
        .mount(&server)
        .await;

    let err = client(&server)
        .upload_file(upload())
        .await
        .expect_err("upload should fail without the marker");
    assert!(matches!(err, ApiError::UnexpectedPayload { stage: "upload-file", .. }));
}

#[tokio::test]
async fn list_files_reads_files_array() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/files"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "files": [
                {"file_id": "f1", "filename": "one.pdf", "path": "/data/one.pdf"},
                {"file_id": "f2", "filename": "two.pdf"}
            ]
        })))
        .mount(&server)
        .await;

    let files = client(&server).list_files().await.expect("list should succeed");
    assert_eq!(files.len(), 2);
    assert_eq!(files[0].path, "/data/one.pdf");
    assert_eq!(files[1].file_id, "f2");
    assert_eq!(files[1].path, "");
}

#[tokio::test]
async fn list_files_without_array_is_unexpected() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/files"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"items": []})))
        .mount(&server)
        .await;

    let err = client(&server)
        .list_files()
        .await
        .expect_err("list should fail without `files`");
    assert!(matches!(err, ApiError::UnexpectedPayload { .. }));
}

#[tokio::test]
async fn server_error_maps_to_status() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/api/files/f1"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let err = client(&server)
        .delete_file("f1")
        .await
        .expect_err("delete should fail on 500");
    match err {
        ApiError::Status { stage, status, body } => {
            assert_eq!(stage, "delete-file");
            assert_eq!(status, 500);
            assert_eq!(body, "boom");
        }
        other => panic!("expected status error, got {other:?}"),
    }
}

#[tokio::test]
async fn delete_and_delete_all_check_their_markers() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/api/files/f1"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"message": "File deleted successfully"})),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/api/files"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"message": "All files deleted successfully"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server);
    client.delete_file("f1").await.expect("delete should succeed");
    client.delete_all_files().await.expect("delete all should succeed");
}

#[tokio::test]
async fn upload_image_returns_assigned_url() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/upload-image"))
        .and(body_string_contains("filename=\"image.png\""))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"url": "https://cdn.test/img/1"})),
        )
        .mount(&server)
        .await;

    let image = DataUrl::parse(&DataUrl::encode("image/jpeg", b"jpeg-bytes"))
        .expect("data url should parse");
    let url = client(&server)
        .upload_image(image)
        .await
        .expect("image upload should succeed");
    assert_eq!(url, "https://cdn.test/img/1");
}

#[tokio::test]
async fn download_returns_raw_bytes() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/files/f1/download"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"%PDF-1.7".to_vec()))
        .mount(&server)
        .await;

    let bytes = client(&server)
        .download_file("f1")
        .await
        .expect("download should succeed");
    assert_eq!(&bytes[..], b"%PDF-1.7");
}

#[tokio::test]
async fn chat_streams_event_records() {
    let server = MockServer::start().await;
    let request = ChatRequest::new("hello", Vec::new(), ImageDetailLevel::Auto);
    let body = concat!(
        "{\"type\":\"thinking\",\"data\":\"Reading files\"}\n",
        "{\"type\":\"complete\",\"data\":{\"text\":\"Hi\",\"isDxaResponse\":false}}\n",
    );
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .and(body_json(json!({
            "text": "hello",
            "content": [{"type": "text", "text": "hello"}]
        })))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(body.as_bytes().to_vec(), "text/event-stream"),
        )
        .mount(&server)
        .await;

    let reply = client(&server).chat(&request).await.expect("chat should succeed");
    let body = match reply {
        ChatReply::Stream(body) => body,
        other => panic!("expected a streamed reply, got {other:?}"),
    };
    let events: Vec<ChatEvent> = decode_records(body)
        .collect::<Vec<_>>()
        .await
        .into_iter()
        .map(|record| record.expect("record should decode"))
        .filter_map(|record| ChatEvent::from_record(record).expect("record should be valid"))
        .collect();

    assert_eq!(events.len(), 2);
    assert_eq!(events[0], ChatEvent::Thinking("Reading files".to_string()));
    match &events[1] {
        ChatEvent::Complete(payload) => {
            assert_eq!(payload.text, "Hi");
            assert_eq!(payload.is_dxa_response, Some(false));
        }
        other => panic!("expected complete, got {other:?}"),
    }
}

#[tokio::test]
async fn chat_json_reply_is_complete() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "text": "no stream",
            "token_usage": {"prompt_tokens": 1, "completion_tokens": 2, "total_tokens": 3}
        })))
        .mount(&server)
        .await;

    let request = ChatRequest::new("hi", Vec::new(), ImageDetailLevel::Auto);
    let reply = client(&server).chat(&request).await.expect("chat should succeed");
    match reply {
        ChatReply::Complete(payload) => {
            assert_eq!(payload.text, "no stream");
            assert_eq!(payload.token_usage.map(|usage| usage.total_tokens), Some(3));
        }
        other => panic!("expected a complete reply, got {other:?}"),
    }
}

#[tokio::test]
async fn legacy_paths_resolve_under_api() {
    let server = MockServer::start().await;
    let client = client(&server);
    assert_eq!(
        client.url_for("/files/f1"),
        format!("{}/api/files/f1", server.uri())
    );
    assert_eq!(
        client.url_for("/api/chat"),
        format!("{}/api/chat", server.uri())
    );
}

#[tokio::test]
async fn file_ids_with_reserved_characters_stay_in_one_segment() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/api/files/dir%2Fname%3F"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"message": "File deleted successfully"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    client(&server)
        .delete_file("dir/name?")
        .await
        .expect("delete should reach the encoded route");
}
