//! HTTP Adapter Tests - Twitter Client and Stream Connector
//!
//! Runs the reqwest-based adapters against a wiremock server standing
//! in for api.twitter.com.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use twiver::adapters::twitter::{BearerAuth, HttpStreamConnector, TwitterClient, TwitterClientConfig};
use twiver::domain::{MatchRule, Target};
use twiver::error::{AdapterError, ApiError};
use twiver::ports::{LineStream, RuleApi, StreamConnector, TweetLookup};
use twiver::usecases::{StreamSettings, TweetStream};

const RULES: &str = "/2/tweets/search/stream/rules";
const STREAM: &str = "/2/tweets/search/stream";

fn auth() -> Arc<BearerAuth> {
    Arc::new(BearerAuth::new("test-token").unwrap())
}

fn client(server: &MockServer) -> TwitterClient {
    let config = TwitterClientConfig {
        base_url: server.uri(),
        timeout: Duration::from_secs(5),
        max_retries: 2,
        retry_base_delay: Duration::from_millis(1),
    };
    TwitterClient::new(auth(), config).unwrap()
}

fn tweet_line(id: &str, rule_id: &str) -> String {
    json!({
        "data": {
            "id": id,
            "text": format!("tweet {id}"),
            "created_at": "2021-06-01T10:00:00.000Z",
            "public_metrics": {"retweet_count": 1, "reply_count": 2, "like_count": 3, "quote_count": 4}
        },
        "includes": {"users": [{"username": "someone", "public_metrics": {"followers_count": 99}}]},
        "matching_rules": [{"id": rule_id}]
    })
    .to_string()
}

// ---- Rules endpoint ----

#[tokio::test]
async fn test_list_rules_sends_bearer_header() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(RULES))
        .and(header("Authorization", "Bearer test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [
                {"id": "1", "value": "paris lang:fr", "tag": "Paris fr"},
                {"id": "2", "value": "rust"}
            ],
            "meta": {"sent": "2021-06-01T10:00:00.000Z", "result_count": 2}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let rules = client(&server).list_rules().await.unwrap();
    assert_eq!(rules.len(), 2);
    assert_eq!(rules[0].tag.as_deref(), Some("Paris fr"));
    assert_eq!(rules[1].tag, None);
}

#[tokio::test]
async fn test_list_rules_empty_has_no_data() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(RULES))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "meta": {"sent": "2021-06-01T10:00:00.000Z", "result_count": 0}
        })))
        .mount(&server)
        .await;

    assert!(client(&server).list_rules().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_delete_and_add_rule_bodies() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(RULES))
        .and(body_json(json!({"delete": {"ids": ["1", "2"]}})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "meta": {"summary": {"deleted": 2, "not_deleted": 0}}
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(RULES))
        .and(body_json(json!({"add": [{"value": "paris lang:fr", "tag": "Paris fr"}]})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "data": [{"id": "10", "value": "paris lang:fr", "tag": "Paris fr"}],
            "meta": {"summary": {"created": 1, "not_created": 0, "valid": 1, "invalid": 0}}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server);
    let deleted = client
        .delete_rules(&["1".to_string(), "2".to_string()])
        .await
        .unwrap();
    assert_eq!(deleted, 2);

    let created = client
        .add_rules(&[MatchRule::new("paris lang:fr", "Paris fr")])
        .await
        .unwrap();
    assert_eq!(created.len(), 1);
    assert_eq!(created[0].id, "10");
}

#[tokio::test]
async fn test_add_rules_reports_rejections() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(RULES))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "meta": {"summary": {"created": 0, "not_created": 1}},
            "errors": [{"title": "DuplicateRule", "value": "paris lang:fr"}]
        })))
        .mount(&server)
        .await;

    let err = client(&server)
        .add_rules(&[MatchRule::new("paris lang:fr", "Paris fr")])
        .await
        .unwrap_err();
    match err {
        ApiError::Rejected(msg) => assert!(msg.contains("DuplicateRule"), "{msg}"),
        other => panic!("expected Rejected, got {other:?}"),
    }
}

#[tokio::test]
async fn test_server_error_is_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(RULES))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(RULES))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"meta": {"result_count": 0}})))
        .expect(1)
        .mount(&server)
        .await;

    assert!(client(&server).list_rules().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_unauthorized_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(RULES))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "title": "Unauthorized",
            "type": "about:blank",
            "status": 401,
            "detail": "Unauthorized"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let err = client(&server).list_rules().await.unwrap_err();
    assert!(err.is_auth_failure());
    assert_eq!(err.status(), Some(401));
}

// ---- Tweet lookup ----

#[tokio::test]
async fn test_lookup_returns_present_tweets() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/2/tweets"))
        .and(query_param("ids", "1,2"))
        .and(query_param("tweet.fields", "public_metrics"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{"id": "1", "text": "hi", "public_metrics": {"retweet_count": 8, "like_count": 40}}],
            "errors": [{"value": "2", "detail": "Could not find tweet with ids: [2].", "title": "Not Found Error"}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let counts = client(&server)
        .engagement(&["1".to_string(), "2".to_string()])
        .await
        .unwrap();
    assert_eq!(counts.len(), 1);
    assert_eq!(counts["1"].get(Target::LikeCount), 40);
    assert_eq!(counts["1"].get(Target::RetweetCount), 8);
}

// ---- Stream connection ----

#[tokio::test]
async fn test_stream_yields_lines_then_closes() {
    let server = MockServer::start().await;
    let body = format!("{}\r\n\r\n{}\r\n", tweet_line("1", "r1"), tweet_line("2", "r1"));
    Mock::given(method("GET"))
        .and(path(STREAM))
        .and(query_param("expansions", "author_id"))
        .and(header("Authorization", "Bearer test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(&server)
        .await;

    let connector = HttpStreamConnector::new(auth(), &server.uri()).unwrap();
    let mut lines = connector.connect().await.unwrap();

    assert_eq!(lines.next_line().await.unwrap(), Some(tweet_line("1", "r1")));
    assert_eq!(lines.next_line().await.unwrap(), Some(String::new()));
    assert_eq!(lines.next_line().await.unwrap(), Some(tweet_line("2", "r1")));
    assert_eq!(lines.next_line().await.unwrap(), None);
}

#[tokio::test]
async fn test_stream_unauthorized() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(STREAM))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "title": "Unauthorized",
            "detail": "Unauthorized",
            "status": 401
        })))
        .mount(&server)
        .await;

    let connector = HttpStreamConnector::new(auth(), &server.uri()).unwrap();
    let err = connector.connect().await.err().unwrap();
    assert!(err.is_auth_failure());
}

// ---- End to end ----

#[tokio::test]
async fn test_stream_adapter_over_http() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(RULES))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{"id": "old", "value": "cats"}]
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(RULES))
        .and(body_json(json!({"delete": {"ids": ["old"]}})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "meta": {"summary": {"deleted": 1}}
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(RULES))
        .and(body_json(json!({"add": [{"value": "paris lang:fr", "tag": "Paris fr"}]})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "data": [{"id": "r1", "value": "paris lang:fr"}],
            "meta": {"summary": {"created": 1}}
        })))
        .expect(1)
        .mount(&server)
        .await;
    let body = format!("{}\r\n{}\r\n", tweet_line("1", "r1"), tweet_line("2", "r1"));
    Mock::given(method("GET"))
        .and(path(STREAM))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .expect(1)
        .mount(&server)
        .await;

    let connector = HttpStreamConnector::new(auth(), &server.uri()).unwrap();
    let settings = StreamSettings::new(vec![MatchRule::new("paris lang:fr", "Paris fr")], "quote_count");
    let mut stream = TweetStream::new(connector, Arc::new(client(&server)), settings).unwrap();

    let first = stream.next_observation().await.unwrap();
    let second = stream.next_observation().await.unwrap();

    // Tag comes from the local rule set: neither the API nor the event carried it.
    assert_eq!((first.index, first.tag.as_str(), first.label), (0, "Paris fr", 4));
    assert_eq!(second.index, 1);
    assert_eq!(second.features.username, "someone");
}

#[tokio::test]
async fn test_blank_token_fails_before_any_request() {
    let result = BearerAuth::new("   ");
    assert!(matches!(result, Err(AdapterError::AuthConfiguration)));
}
