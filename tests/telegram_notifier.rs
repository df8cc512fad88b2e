// Tests for the Bot API notifier against a mock server.
use calremind::client::TelegramNotifier;
use calremind::error::DeliveryError;
use calremind::notifier::Notifier;
use mockito::{Matcher, Server};
use serde_json::json;

#[tokio::test]
async fn test_send_posts_chat_id_and_text() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/botTESTTOKEN/sendMessage")
        .match_header("content-type", "application/json")
        .match_body(Matcher::PartialJson(json!({
            "chat_id": "4711",
            "text": "Termin: Sportfest\nDatum: 02-06-2024 08:00"
        })))
        .with_status(200)
        .with_body(r#"{"ok":true,"result":{}}"#)
        .create_async()
        .await;

    let notifier = TelegramNotifier::new(&server.url(), "TESTTOKEN").unwrap();
    notifier
        .send("4711", "Termin: Sportfest\nDatum: 02-06-2024 08:00")
        .await
        .expect("send should succeed");

    mock.assert_async().await;
}

#[tokio::test]
async fn test_blocked_chat_is_rejected() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/botTESTTOKEN/sendMessage")
        .with_status(403)
        .with_body(r#"{"ok":false,"description":"Forbidden: bot was blocked by the user"}"#)
        .create_async()
        .await;

    let notifier = TelegramNotifier::new(&server.url(), "TESTTOKEN").unwrap();
    let err = notifier.send("4711", "hallo").await.unwrap_err();
    match err {
        DeliveryError::Rejected { subscriber, reason } => {
            assert_eq!(subscriber, "4711");
            assert!(reason.contains("403"));
        }
        other => panic!("expected Rejected, got {:?}", other),
    }
    mock.assert_async().await;
}

#[tokio::test]
async fn test_unreachable_api_is_transport_error() {
    // Nothing listens on port 1.
    let notifier = TelegramNotifier::new("http://127.0.0.1:1", "TESTTOKEN").unwrap();
    let err = notifier.send("4711", "hallo").await.unwrap_err();
    assert!(matches!(err, DeliveryError::Transport(_)));
}
