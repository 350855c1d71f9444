use mailcal_core::{Mailbox, MailcalError, MessageFilter};
use mailcal_provider_google::GmailMailbox;
use serde_json::json;
use wiremock::matchers::{bearer_token, method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn full_message(id: &str, subject: &str, body_b64: &str) -> serde_json::Value {
    json!({
        "id": id,
        "threadId": id,
        "payload": {
            "mimeType": "multipart/alternative",
            "headers": [{"name": "Subject", "value": subject}],
            "parts": [
                {"mimeType": "text/plain", "body": {"data": body_b64}},
                {"mimeType": "text/html", "body": {"data": ""}}
            ]
        }
    })
}

async fn mount_message(server: &MockServer, id: &str, subject: &str) {
    Mock::given(method("GET"))
        .and(path(format!("/gmail/v1/users/me/messages/{id}")))
        .and(query_param("format", "full"))
        .respond_with(ResponseTemplate::new(200).set_body_json(full_message(id, subject, "aGVsbG8")))
        .mount(server)
        .await;
}

fn mailbox(server: &MockServer) -> GmailMailbox {
    GmailMailbox::with_base_url("test-token", format!("{}/gmail/v1", server.uri()))
}

#[tokio::test]
async fn test_lists_and_fetches_across_pages() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/gmail/v1/users/me/messages"))
        .and(bearer_token("test-token"))
        .and(query_param("q", "from:events@example.com is:unread"))
        .and(query_param_is_missing("pageToken"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "messages": [{"id": "m1", "threadId": "m1"}, {"id": "m2", "threadId": "m2"}],
            "nextPageToken": "page-2",
            "resultSizeEstimate": 3
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/gmail/v1/users/me/messages"))
        .and(query_param("pageToken", "page-2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "messages": [{"id": "m3", "threadId": "m3"}],
            "resultSizeEstimate": 3
        })))
        .expect(1)
        .mount(&server)
        .await;

    for (id, subject) in [("m1", "One"), ("m2", "Two"), ("m3", "Three")] {
        mount_message(&server, id, subject).await;
    }

    let messages = mailbox(&server)
        .list_messages(&MessageFilter::unread_from("events@example.com"), 50)
        .await
        .unwrap();

    let ids: Vec<&str> = messages.iter().map(|m| m.id.as_str()).collect();
    assert_eq!(ids, ["m1", "m2", "m3"]);
    assert_eq!(messages[2].header("Subject"), Some("Three"));
    assert_eq!(
        messages[0].plain_text_part().unwrap().decode_text().unwrap(),
        "hello"
    );
}

#[tokio::test]
async fn test_stops_at_max_results() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/gmail/v1/users/me/messages"))
        .and(query_param("maxResults", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "messages": [{"id": "m1"}, {"id": "m2"}],
            "nextPageToken": "more"
        })))
        .expect(1)
        .mount(&server)
        .await;

    mount_message(&server, "m1", "One").await;
    mount_message(&server, "m2", "Two").await;

    let messages = mailbox(&server)
        .list_messages(&MessageFilter::unread_from("events@example.com"), 2)
        .await
        .unwrap();

    assert_eq!(messages.len(), 2);
}

#[tokio::test]
async fn test_empty_inbox() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/gmail/v1/users/me/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"resultSizeEstimate": 0})))
        .mount(&server)
        .await;

    let messages = mailbox(&server)
        .list_messages(&MessageFilter::unread_from("events@example.com"), 50)
        .await
        .unwrap();

    assert!(messages.is_empty());
}

#[tokio::test]
async fn test_unfetchable_message_is_skipped() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/gmail/v1/users/me/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "messages": [{"id": "gone"}, {"id": "m2"}]
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/gmail/v1/users/me/messages/gone"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    mount_message(&server, "m2", "Two").await;

    let messages = mailbox(&server)
        .list_messages(&MessageFilter::unread_from("events@example.com"), 50)
        .await
        .unwrap();

    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].id, "m2");
}

#[tokio::test]
async fn test_list_failure_is_a_provider_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/gmail/v1/users/me/messages"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid credentials"))
        .mount(&server)
        .await;

    let err = mailbox(&server)
        .list_messages(&MessageFilter::unread_from("events@example.com"), 50)
        .await
        .unwrap_err();

    match err {
        MailcalError::Provider(message) => assert!(message.contains("401")),
        other => panic!("unexpected error: {other:?}"),
    }
}
