mod support;

use reqwest::{Client, StatusCode};
use serde_json::json;

#[tokio::test]
async fn http_endpoints_smoke() {
    let server = support::TestServer::spawn().await;
    let client = Client::new();

    let health = client
        .get(format!("{}/health", server.base_url()))
        .send()
        .await
        .expect("health request");
    assert!(health.status().is_success());
    let body = health.text().await.expect("health body");
    assert_eq!(body, "ok");

    let index = client
        .get(format!("{}/", server.base_url()))
        .send()
        .await
        .expect("index request");
    assert!(index.status().is_success());
    let body = index.text().await.expect("index body");
    assert!(body.contains("refreshRate"));
    assert!(body.contains("id=\"logList\""));

    let pins: serde_json::Value = client
        .get(format!("{}/all_pins", server.base_url()))
        .send()
        .await
        .expect("all_pins request")
        .json()
        .await
        .expect("all_pins json");
    assert_eq!(pins.as_array().map(Vec::len), Some(5));
    assert_eq!(pins[0]["name"], "counter");
    assert_eq!(pins[4]["type"], "event");
    assert_eq!(pins[4]["readable"], false);
}

#[tokio::test]
async fn pin_value_round_trips_over_http() {
    let server = support::TestServer::spawn().await;
    let client = Client::new();
    let url = format!("{}/pin_value", server.base_url());

    let response: serde_json::Value = client
        .post(&url)
        .json(&json!({ "write_pins": { "greeting": "hey" }, "read_pins": ["greeting"] }))
        .send()
        .await
        .expect("pin_value request")
        .json()
        .await
        .expect("pin_value json");
    assert_eq!(response, json!({ "read_pins": { "greeting": "hey" } }));

    let missing = client
        .post(&url)
        .json(&json!({ "read_pins": ["ghost"] }))
        .send()
        .await
        .expect("pin_value request");
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);

    let logs: serde_json::Value = client
        .get(format!("{}/logs?timestamp=0", server.base_url()))
        .send()
        .await
        .expect("logs request")
        .json()
        .await
        .expect("logs json");
    assert!(logs.is_array());
}

#[tokio::test]
async fn demo_ticker_moves_the_counter() {
    let server = support::TestServer::spawn_with_env(&[("DEMO_TICK_MS", "50")]).await;
    let client = Client::new();
    let url = format!("{}/pin_value", server.base_url());

    let mut seen = std::collections::HashSet::new();
    for _ in 0..40 {
        let response: serde_json::Value = client
            .post(&url)
            .json(&json!({ "read_pins": ["counter"] }))
            .send()
            .await
            .expect("pin_value request")
            .json()
            .await
            .expect("pin_value json");
        let counter = response["read_pins"]["counter"].as_f64().expect("numeric counter");
        assert!((0.0..10.0).contains(&counter));
        seen.insert(counter as i64);
        if seen.len() > 1 {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    }
    assert!(seen.len() > 1, "counter never advanced");

    let logs: Vec<serde_json::Value> = client
        .get(format!("{}/logs", server.base_url()))
        .send()
        .await
        .expect("logs request")
        .json()
        .await
        .expect("logs json");
    assert!(logs
        .iter()
        .any(|entry| entry["message"].as_str().unwrap_or_default().contains("demo ticker started")));
}
