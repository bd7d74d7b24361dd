mod support;

use std::time::Duration;

use pin_scanner::models::PinDescriptor;
use pin_scanner::runtime::TokioScheduler;
use pin_scanner::service::HttpPinService;
use pin_scanner::view::{HeadlessTable, RowView};
use pin_scanner::{ClientConfig, Dashboard, ReadOutcome};
use reqwest::Client;
use tokio::task::LocalSet;
use tokio::time::sleep;

async fn fetch_pin(base_url: &str, name: &str) -> PinDescriptor {
    Client::new()
        .get(format!("{}/pin/{}", base_url, name))
        .send()
        .await
        .expect("pin request")
        .json()
        .await
        .expect("pin json")
}

fn listening(lines: &[String]) -> usize {
    lines
        .iter()
        .filter(|line| line.contains("listening on"))
        .count()
}

#[tokio::test]
async fn dashboard_reconciles_and_writes_against_live_server() {
    let server = support::TestServer::spawn().await;
    let base_url = server.base_url().to_string();

    LocalSet::new()
        .run_until(async move {
            let config = ClientConfig::default().with_base_url(base_url.clone());
            let service = HttpPinService::from_config(&config).expect("service");
            let dashboard = Dashboard::new(HeadlessTable::new(), service, TokioScheduler, &config);

            let first = dashboard.run_cycle().await.expect("first cycle");
            assert_eq!(first.snapshot.created.len(), 5);
            assert_eq!(first.read, ReadOutcome::Skipped);
            assert_eq!(
                dashboard.table().names(),
                vec!["counter", "greeting", "enabled", "uptime_s", "reset_counter"]
            );
            assert!(first.logs > 0);
            assert_eq!(listening(&dashboard.table().log_lines()), 1);
            let greeting = dashboard.table().row("greeting").expect("greeting row");
            assert_eq!(greeting.value_text(), "Hello World");
            assert!(greeting.has_edit_trigger());
            assert!(!dashboard.table().row("uptime_s").expect("uptime row").has_edit_trigger());

            dashboard.begin_edit("greeting").expect("begin edit");
            greeting.type_input("hi there");
            dashboard.commit_edit("greeting").expect("commit edit");
            assert_eq!(greeting.value_text(), "hi there");

            let mut landed = false;
            for _ in 0..50 {
                sleep(Duration::from_millis(50)).await;
                let pin = fetch_pin(&base_url, "greeting").await;
                if pin.value.map(|value| value.to_string()).as_deref() == Some("hi there") {
                    landed = true;
                    break;
                }
            }
            assert!(landed, "write never reached the server");

            let second = dashboard.run_cycle().await.expect("second cycle");
            assert!(second.snapshot.created.is_empty());
            match second.read {
                // reset_counter is write-only and never read
                ReadOutcome::Applied(names) => {
                    assert_eq!(names.len(), 4);
                    assert!(!names.iter().any(|name| name == "reset_counter"));
                }
                other => panic!("unexpected read outcome {:?}", other),
            }
            let lines = dashboard.table().log_lines();
            assert_eq!(listening(&lines), 1);
            assert!(lines.iter().any(|line| line.contains("pin written")));
            assert_eq!(greeting.value_text(), "hi there");
            assert_eq!(
                dashboard.table().row("counter").expect("counter row").value_text(),
                "0"
            );

            let reset = dashboard.table().row("reset_counter").expect("reset row");
            assert_eq!(reset.value_text(), "");
            assert!(reset.has_edit_trigger());
        })
        .await;
}

#[tokio::test]
async fn timer_driven_polling_fills_the_table() {
    let server = support::TestServer::spawn().await;
    let base_url = server.base_url().to_string();

    LocalSet::new()
        .run_until(async move {
            let config = ClientConfig::default()
                .with_base_url(base_url)
                .with_refresh_ms(100);
            let service = HttpPinService::from_config(&config).expect("service");
            let dashboard = Dashboard::new(HeadlessTable::new(), service, TokioScheduler, &config);
            dashboard.start(config.refresh_ms);
            assert!(dashboard.is_polling());

            let mut rows = 0;
            for _ in 0..40 {
                sleep(Duration::from_millis(50)).await;
                rows = dashboard.table().rows().len();
                if rows == 5 {
                    break;
                }
            }
            assert_eq!(rows, 5);

            dashboard.set_interval(0);
            assert!(!dashboard.is_polling());
            assert_eq!(dashboard.interval_ms(), 0);
        })
        .await;
}
