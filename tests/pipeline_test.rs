//! 分類段階からマージ段階までの統合テスト。Anthropic APIはwiremockで代替する。
use std::path::Path;
use std::time::Duration;

use publisher_locator::{
    classifier::{PublisherClassifier, prompt::user_prompt},
    clients::{AnthropicClient, AnthropicConfig},
    dataset::Dataset,
    pipeline::{run_classification, run_merge},
    util::retry::RetryPolicy,
};
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn answer(text: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(serde_json::json!({
        "content": [{"type": "text", "text": text}]
    }))
}

async fn mock_publisher(server: &MockServer, publisher: &str, text: &str, calls: u64) {
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .and(body_partial_json(serde_json::json!({
            "messages": [{"role": "user", "content": user_prompt(publisher)}]
        })))
        .respond_with(answer(text))
        .expect(calls)
        .mount(server)
        .await;
}

fn classifier_for(server: &MockServer) -> PublisherClassifier<AnthropicClient> {
    let client = AnthropicClient::new(AnthropicConfig {
        base_url: server.uri(),
        api_key: "test-key".to_string(),
        model: "claude-test".to_string(),
        max_tokens: 10,
        timeout: Duration::from_secs(5),
    })
    .expect("client should build");
    PublisherClassifier::new(client, RetryPolicy::new(3, Duration::from_millis(10)))
}

fn read(path: &Path) -> Dataset {
    Dataset::read_csv(path).expect("readable csv")
}

#[tokio::test]
async fn classify_then_merge_produces_enriched_dataset() {
    let server = MockServer::start().await;
    mock_publisher(&server, "Reuters", "UK", 1).await;
    mock_publisher(&server, "Mystery Outlet", "Unknown", 1).await;
    mock_publisher(&server, "Der Spiegel", " Germany\n", 1).await;

    let dir = tempfile::tempdir().expect("tempdir");
    let data = dir.path().join("Data.csv");
    let locations = dir.path().join("publisher_locations.csv");
    let enriched = dir.path().join("Data_with_location.csv");
    std::fs::write(
        &data,
        "title,source\n\
         Markets rally,Reuters\n\
         Orphan story,\n\
         Strange news,Mystery Outlet\n\
         Markets rally,Reuters\n\
         Koalition streitet,Der Spiegel\n\
         Oil slips,Reuters\n",
    )
    .expect("write dataset");

    let report = run_classification(&data, &locations, &classifier_for(&server))
        .await
        .expect("classification succeeds");

    assert_eq!(report.rows, 6);
    assert_eq!(report.null_sources, 1);
    assert_eq!(report.unique_publishers, 3);
    assert_eq!(report.resolved_publishers, 2);

    let labels = read(&locations);
    assert_eq!(labels.headers(), &["source", "final_country"]);
    let label_column: Vec<&str> = labels.rows().iter().map(|row| row[1].as_str()).collect();
    assert_eq!(
        label_column,
        vec!["UK", "Unknown", "Unknown", "UK", "Germany", "UK"]
    );

    let merge = run_merge(&data, &locations, &enriched).expect("merge succeeds");
    assert_eq!(merge.input_rows, 6);
    assert_eq!(merge.duplicate_rows, 1);

    let output = read(&enriched);
    assert_eq!(output.headers(), &["title", "source", "location"]);
    assert_eq!(
        output.rows(),
        &[
            ["Markets rally", "Reuters", "UK"],
            ["Koalition streitet", "Der Spiegel", "Germany"],
            ["Oil slips", "Reuters", "UK"],
        ]
        .map(|row| row.map(str::to_string).to_vec())
    );
}

#[tokio::test]
async fn failing_service_degrades_to_unknown_after_three_attempts() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(500).set_body_string("internal error"))
        .expect(3)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().expect("tempdir");
    let data = dir.path().join("Data.csv");
    let locations = dir.path().join("publisher_locations.csv");
    std::fs::write(&data, "source,title\nAP,one\nAP,two\n").expect("write dataset");

    let report = run_classification(&data, &locations, &classifier_for(&server))
        .await
        .expect("batch still completes");

    assert_eq!(report.resolved_publishers, 0);
    let labels = read(&locations);
    assert!(labels.rows().iter().all(|row| row[1] == "Unknown"));
}

#[tokio::test]
async fn missing_source_column_aborts_before_any_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(answer("USA"))
        .expect(0)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().expect("tempdir");
    let data = dir.path().join("Data.csv");
    let locations = dir.path().join("publisher_locations.csv");
    std::fs::write(&data, "publisher,title\nAP,one\n").expect("write dataset");

    let error = run_classification(&data, &locations, &classifier_for(&server))
        .await
        .expect_err("missing column is fatal");

    assert!(format!("{error:#}").contains("'source'"));
    assert!(!locations.exists());
}
