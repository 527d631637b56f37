use skiff_core::{ActivityEvent, ArchiveClient, ArchiveError};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const KEY: &str = "8c4f3a9b";

#[tokio::test]
async fn subscribe_activity_streams_events_until_feed_ends() {
    let server = MockServer::start().await;

    let body = concat!(
        "{\"type\":\"network-changed\",\"connections\":3}\n",
        "{\"type\":\"download\",\"block\":0,\"bytes\":8192}\n",
        "{\"type\":\"download\",\"block\":1,\"bytes\":8192}\n",
    );
    Mock::given(method("GET"))
        .and(path(format!("/v1/archives/{KEY}/activity")))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "application/x-ndjson"))
        .mount(&server)
        .await;

    let client = ArchiveClient::with_base_url(&server.uri(), KEY).unwrap();
    let mut activity = client.subscribe_activity().await.unwrap();

    assert_eq!(
        activity.recv().await.unwrap(),
        Some(ActivityEvent::NetworkChanged { connections: 3 })
    );
    assert_eq!(
        activity.recv().await.unwrap(),
        Some(ActivityEvent::Download {
            block: 0,
            bytes: 8192
        })
    );
    assert_eq!(
        activity.recv().await.unwrap(),
        Some(ActivityEvent::Download {
            block: 1,
            bytes: 8192
        })
    );
    assert_eq!(activity.recv().await.unwrap(), None);
}

#[tokio::test]
async fn subscribe_activity_fails_on_error_status() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(format!("/v1/archives/{KEY}/activity")))
        .respond_with(ResponseTemplate::new(503).set_body_string("swarm unavailable"))
        .mount(&server)
        .await;

    let client = ArchiveClient::with_base_url(&server.uri(), KEY).unwrap();
    let err = client
        .subscribe_activity()
        .await
        .expect_err("expected subscription failure");

    assert!(matches!(err, ArchiveError::Api { .. }));
}
