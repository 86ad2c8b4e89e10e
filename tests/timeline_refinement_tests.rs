//! Refinement sub-workflow tests: acceptance, iteration bound, retry.

use std::sync::Arc;

use serde_json::{Value as JsonValue, json};

use almanac_backend::errors::AppError;
use almanac_backend::llm::AiClient;
use almanac_backend::services::orchestrator::timeline::TimelineRefinery;
use almanac_backend::test_helpers::{MockAiClient, json_response, test_config, text_response};

fn events_payload(titles: &[(&str, &str)]) -> JsonValue {
    let events: Vec<JsonValue> = titles
        .iter()
        .map(|(date, title)| {
            json!({
                "start_date": date,
                "end_date": null,
                "title": title,
                "content": format!("{title} happened")
            })
        })
        .collect();
    json!({ "events": events })
}

fn six_events(tag: &str) -> JsonValue {
    events_payload(&[
        ("2008-09-15", tag),
        ("2007-08-09", "BNP freezes funds"),
        ("2008-03-16", "Bear Stearns sold"),
        ("2008-10-03", "TARP signed"),
        ("2009-03-09", "Market bottom"),
        ("2008-09-29", "House rejects bailout"),
    ])
}

fn evaluation(score: f64, improvements: &str) -> JsonValue {
    json!({ "score": score, "improvements": improvements })
}

fn refinery(mock: &Arc<MockAiClient>, max_iterations: u32) -> TimelineRefinery {
    let mut config = test_config();
    config.refinement_max_iterations = max_iterations;
    let client: Arc<dyn AiClient> = mock.clone();
    TimelineRefinery::new(client, &config)
}

#[tokio::test]
async fn accepted_first_candidate_is_returned_sorted() {
    let mock = Arc::new(MockAiClient::new());
    let model = test_config().timeline_model;
    mock.queue_response(&model, Ok(json_response(&six_events("Lehman collapses"))));
    mock.queue_response(&model, Ok(json_response(&evaluation(0.9, ""))));

    let events = refinery(&mock, 4)
        .run("2008 financial crisis", "search content")
        .await
        .unwrap();

    assert_eq!(events.len(), 6);
    let dates: Vec<&str> = events.iter().map(|e| e.start_date.as_str()).collect();
    let mut sorted = dates.clone();
    sorted.sort();
    assert_eq!(dates, sorted, "timeline must be sorted by start date");
    // One generation plus one evaluation.
    assert_eq!(mock.exec_calls().len(), 2);
}

#[tokio::test]
async fn iteration_bound_forces_best_candidate() {
    let mock = Arc::new(MockAiClient::new());
    let model = test_config().timeline_model;
    // Three iterations, none reaching the threshold; the second scores best.
    mock.queue_response(&model, Ok(json_response(&six_events("candidate one"))));
    mock.queue_response(&model, Ok(json_response(&evaluation(0.5, "add dates"))));
    mock.queue_response(&model, Ok(json_response(&six_events("candidate two"))));
    mock.queue_response(&model, Ok(json_response(&evaluation(0.7, "more detail"))));
    mock.queue_response(&model, Ok(json_response(&six_events("candidate three"))));
    mock.queue_response(&model, Ok(json_response(&evaluation(0.6, ""))));

    let events = refinery(&mock, 3)
        .run("2008 financial crisis", "search content")
        .await
        .unwrap();

    assert!(
        events.iter().any(|e| e.title == "candidate two"),
        "best-scoring candidate should win at the bound"
    );
    assert_eq!(mock.exec_calls().len(), 6);
}

#[tokio::test]
async fn mid_loop_acceptance_stops_iterating() {
    let mock = Arc::new(MockAiClient::new());
    let model = test_config().timeline_model;
    mock.queue_response(&model, Ok(json_response(&six_events("first try"))));
    mock.queue_response(&model, Ok(json_response(&evaluation(0.5, "fix order"))));
    mock.queue_response(&model, Ok(json_response(&six_events("second try"))));
    mock.queue_response(&model, Ok(json_response(&evaluation(0.85, ""))));

    let events = refinery(&mock, 4)
        .run("2008 financial crisis", "search content")
        .await
        .unwrap();

    assert!(events.iter().any(|e| e.title == "second try"));
    assert_eq!(mock.exec_calls().len(), 4);
}

#[tokio::test]
async fn malformed_structured_output_is_retried_once() {
    let mock = Arc::new(MockAiClient::new());
    let model = test_config().timeline_model;
    mock.queue_response(&model, Ok(text_response("not json at all")));
    mock.queue_response(&model, Ok(json_response(&six_events("after retry"))));
    mock.queue_response(&model, Ok(json_response(&evaluation(0.9, ""))));

    let events = refinery(&mock, 4)
        .run("2008 financial crisis", "search content")
        .await
        .unwrap();

    assert!(events.iter().any(|e| e.title == "after retry"));
    assert_eq!(mock.exec_calls().len(), 3);
}

#[tokio::test]
async fn unknown_dates_sort_last() {
    let mock = Arc::new(MockAiClient::new());
    let model = test_config().timeline_model;
    mock.queue_response(
        &model,
        Ok(json_response(&events_payload(&[
            ("Date unknown", "undated event"),
            ("2008-09-15", "Lehman collapses"),
            ("2007-08-09", "BNP freezes funds"),
            ("2008-03-16", "Bear Stearns sold"),
            ("2008-10-03", "TARP signed"),
            ("2009-03-09", "Market bottom"),
        ]))),
    );
    mock.queue_response(&model, Ok(json_response(&evaluation(0.9, ""))));

    let events = refinery(&mock, 4)
        .run("2008 financial crisis", "search content")
        .await
        .unwrap();

    assert_eq!(events.last().unwrap().start_date, "Date unknown");
    assert_eq!(events.first().unwrap().start_date, "2007-08-09");
}

#[tokio::test]
async fn model_failure_surfaces_as_sub_workflow_error() {
    let mock = Arc::new(MockAiClient::new());
    let model = test_config().timeline_model;
    mock.queue_response(&model, Err(AppError::GeminiError("quota exceeded".into())));

    let err = refinery(&mock, 4)
        .run("2008 financial crisis", "search content")
        .await
        .unwrap_err();

    assert!(
        matches!(err, AppError::SubWorkflowFailed(_)),
        "expected a sub-workflow error, got {err:?}"
    );
}
