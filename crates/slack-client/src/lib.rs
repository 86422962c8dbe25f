//! Slack Web API client.

mod client;
mod error;
mod types;

pub use client::SlackClient;
pub use error::SlackError;
pub use types::*;

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn create_test_client(mock_server: &MockServer) -> SlackClient {
        SlackClient::new(mock_server.uri(), "xoxb-test", Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_post_message_to_thread() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat.postMessage"))
            .and(header("Authorization", "Bearer xoxb-test"))
            .and(body_json(serde_json::json!({
                "channel": "C1",
                "text": "done",
                "thread_ts": "1700000000.000100",
                "reply_broadcast": true
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "ok": true,
                "channel": "C1",
                "ts": "1700000001.000200"
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = create_test_client(&mock_server);
        let message = PostMessage::new("C1", "done")
            .in_thread("1700000000.000100")
            .broadcast();
        let response = client.post_message(&message).await.unwrap();
        assert_eq!(response.ts.as_deref(), Some("1700000001.000200"));
    }

    #[tokio::test]
    async fn test_post_message_plain_omits_thread_fields() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat.postMessage"))
            .and(body_json(serde_json::json!({ "channel": "D1", "text": "hi" })))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "ok": true })),
            )
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = create_test_client(&mock_server);
        assert!(client.post_message(&PostMessage::new("D1", "hi")).await.is_ok());
    }

    #[tokio::test]
    async fn test_post_message_api_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat.postMessage"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "ok": false,
                "error": "channel_not_found"
            })))
            .mount(&mock_server)
            .await;

        let client = create_test_client(&mock_server);
        let err = client
            .post_message(&PostMessage::new("C404", "hi"))
            .await
            .unwrap_err();
        assert!(matches!(err, SlackError::Api { ref error, .. } if error == "channel_not_found"));
    }

    #[tokio::test]
    async fn test_latest_message_ts() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/conversations.history"))
            .and(query_param("channel", "C1"))
            .and(query_param("limit", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "ok": true,
                "messages": [{ "ts": "1700000005.000000", "user": "U9", "text": "later" }]
            })))
            .mount(&mock_server)
            .await;

        let client = create_test_client(&mock_server);
        let ts = client.latest_message_ts("C1", 1).await.unwrap();
        assert_eq!(ts.as_deref(), Some("1700000005.000000"));
    }

    #[tokio::test]
    async fn test_history_http_failure() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/conversations.history"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&mock_server)
            .await;

        let client = create_test_client(&mock_server);
        let err = client.latest_message_ts("C1", 1).await.unwrap_err();
        assert!(matches!(err, SlackError::Status { status: 503, .. }));
    }

    #[tokio::test]
    async fn test_rate_limited() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/conversations.history"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&mock_server)
            .await;

        let client = create_test_client(&mock_server);
        assert!(matches!(
            client.conversation_history("C1", 1).await,
            Err(SlackError::RateLimit)
        ));
    }

    #[tokio::test]
    async fn test_user_info() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/users.info"))
            .and(query_param("user", "U1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "ok": true,
                "user": { "id": "U1", "name": "ada", "real_name": "Ada Lovelace" }
            })))
            .mount(&mock_server)
            .await;

        let client = create_test_client(&mock_server);
        let user = client.user_info("U1").await.unwrap();
        assert_eq!(user.display(), Some("Ada Lovelace"));
    }

    #[tokio::test]
    async fn test_user_info_not_found() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/users.info"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "ok": false,
                "error": "user_not_found"
            })))
            .mount(&mock_server)
            .await;

        let client = create_test_client(&mock_server);
        assert!(matches!(
            client.user_info("U404").await,
            Err(SlackError::Api { .. })
        ));
    }
}
