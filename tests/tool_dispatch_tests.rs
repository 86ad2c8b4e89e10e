//! Tool registry integration tests against mocked provider APIs.

use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use almanac_backend::models::{Mode, ToolCallRecord, Topic};
use almanac_backend::test_helpers::test_config;
use almanac_backend::tools::{DispatchContext, default_registry};

fn call(call_id: &str, name: &str, arguments: serde_json::Value) -> ToolCallRecord {
    ToolCallRecord {
        call_id: call_id.to_string(),
        name: name.to_string(),
        arguments,
    }
}

fn context(topic: Topic, mode: Mode) -> DispatchContext {
    DispatchContext { topic, mode }
}

#[tokio::test]
async fn unknown_tool_is_skipped_but_batch_continues() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/simple/price"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "bitcoin": {"usd": 60000.0, "usd_market_cap": 1.0e12}
        })))
        .mount(&server)
        .await;

    let mut config = test_config();
    config.crypto_api_base_url = server.uri();
    let registry = default_registry(&config).unwrap();

    let calls = vec![
        call("c1", "summon_dragon", json!({})),
        call("c2", "get_crypto_price", json!({"coin_id": "bitcoin"})),
    ];
    let outcomes = registry
        .dispatch_batch(&calls, &context(Topic::Finance, Mode::Informative))
        .await;

    assert_eq!(outcomes.len(), 1);
    assert_eq!(outcomes[0].name, "get_crypto_price");
    assert_eq!(outcomes[0].call_id, "c2");
    assert_eq!(outcomes[0].content["price"], json!(60000.0));
}

#[tokio::test]
async fn failed_invocation_becomes_error_shaped_outcome() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let mut config = test_config();
    config.search_api_base_url = server.uri();
    let registry = default_registry(&config).unwrap();

    let calls = vec![call("c1", "web_search", json!({"query": "anything"}))];
    let outcomes = registry
        .dispatch_batch(&calls, &context(Topic::General, Mode::Informative))
        .await;

    assert_eq!(outcomes.len(), 1);
    assert!(
        outcomes[0].content.get("error").is_some(),
        "failure should be captured in the outcome content: {:?}",
        outcomes[0].content
    );
}

#[tokio::test]
async fn timeline_mode_injects_largest_search_budget() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/search"))
        .and(body_partial_json(json!({"max_results": 25})))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"results": [], "images": []})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let mut config = test_config();
    config.search_api_base_url = server.uri();
    let registry = default_registry(&config).unwrap();

    let calls = vec![call("c1", "web_search", json!({"query": "crisis"}))];
    // Timeline mode outranks the news-topic bound of 20.
    let outcomes = registry
        .dispatch_batch(&calls, &context(Topic::News, Mode::Timeline))
        .await;

    assert_eq!(outcomes.len(), 1);
}

#[tokio::test]
async fn news_topic_injects_mid_search_budget() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/search"))
        .and(body_partial_json(json!({"max_results": 20})))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"results": [], "images": []})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let mut config = test_config();
    config.search_api_base_url = server.uri();
    let registry = default_registry(&config).unwrap();

    let calls = vec![call("c1", "web_search", json!({"query": "headlines"}))];
    registry
        .dispatch_batch(&calls, &context(Topic::News, Mode::Informative))
        .await;
}

#[tokio::test]
async fn weather_tool_extracts_current_conditions() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/London"))
        .and(query_param("format", "j1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "current_condition": [{
                "temp_C": "18",
                "temp_F": "64",
                "weatherDesc": [{"value": "Partly cloudy"}],
                "humidity": "60",
                "windspeedKmph": "12",
                "FeelsLikeC": "17",
                "visibility": "10"
            }]
        })))
        .mount(&server)
        .await;

    let mut config = test_config();
    config.weather_api_base_url = server.uri();
    let registry = default_registry(&config).unwrap();

    let calls = vec![call("c1", "get_weather", json!({"city": "London"}))];
    let outcomes = registry
        .dispatch_batch(&calls, &context(Topic::General, Mode::Informative))
        .await;

    assert_eq!(outcomes[0].content["city"], json!("London"));
    assert_eq!(outcomes[0].content["condition"], json!("Partly cloudy"));
    assert_eq!(outcomes[0].content["temperature_c"], json!("18"));
}

#[tokio::test]
async fn sibling_calls_all_produce_outcomes() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [{"title": "t", "url": "https://example.com", "content": "c"}],
            "images": []
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/simple/price"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ethereum": {"usd": 3000.0}
        })))
        .mount(&server)
        .await;

    let mut config = test_config();
    config.search_api_base_url = server.uri();
    config.crypto_api_base_url = server.uri();
    let registry = default_registry(&config).unwrap();

    let calls = vec![
        call("c1", "web_search", json!({"query": "eth"})),
        call("c2", "get_crypto_price", json!({"coin_id": "ethereum"})),
        call("c3", "get_date", json!({})),
    ];
    let mut outcomes = registry
        .dispatch_batch(&calls, &context(Topic::Finance, Mode::Informative))
        .await;

    assert_eq!(outcomes.len(), 3);
    outcomes.sort_by(|a, b| a.call_id.cmp(&b.call_id));
    assert_eq!(outcomes[0].name, "web_search");
    assert_eq!(outcomes[1].name, "get_crypto_price");
    assert_eq!(outcomes[2].name, "get_date");
    assert!(outcomes[2].content.get("date").is_some());
}
