use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use uptime_core::target::targets_from_urls;
use uptime_core::{
    run_cycle, CancelHandle, ConfigError, DeliveryResult, HttpProber, Monitor, MonitorConfig,
    Notifier, ProbeOutcome, Prober, Target, WebhookConfig, WebhookNotifier,
};
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TIMEOUT: Duration = Duration::from_secs(5);

fn up(ms: u64) -> ProbeOutcome {
    ProbeOutcome::Up {
        latency: Duration::from_millis(ms),
    }
}

/// Returns canned outcomes per URL, optionally after a delay.
#[derive(Default)]
struct ScriptedProber {
    outcomes: HashMap<String, (ProbeOutcome, Duration)>,
    calls: Mutex<Vec<String>>,
    cancel_after_first: OnceLock<CancelHandle>,
}

impl ScriptedProber {
    fn with(mut self, url: &str, outcome: ProbeOutcome) -> Self {
        self.outcomes.insert(url.to_string(), (outcome, Duration::ZERO));
        self
    }

    fn with_delay(mut self, url: &str, outcome: ProbeOutcome, delay: Duration) -> Self {
        self.outcomes.insert(url.to_string(), (outcome, delay));
        self
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Prober for ScriptedProber {
    async fn probe(&self, url: &str, _timeout: Duration) -> ProbeOutcome {
        self.calls.lock().unwrap().push(url.to_string());
        let (outcome, delay) = self
            .outcomes
            .get(url)
            .cloned()
            .unwrap_or((ProbeOutcome::ConnectionFailure, Duration::ZERO));
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if let Some(handle) = self.cancel_after_first.get() {
            handle.cancel();
        }
        outcome
    }
}

#[derive(Default)]
struct RecordingNotifier {
    messages: Mutex<Vec<String>>,
    fail: bool,
}

impl RecordingNotifier {
    fn failing() -> Self {
        Self {
            messages: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, message: &str) -> DeliveryResult {
        self.messages.lock().unwrap().push(message.to_string());
        if self.fail {
            DeliveryResult::failed(Some(500), "internal error")
        } else {
            DeliveryResult::delivered(204)
        }
    }
}

#[tokio::test]
async fn one_entry_per_target_in_input_order() {
    let urls = [
        "https://a.example",
        "https://b.example",
        "https://c.example",
        "https://d.example",
    ];
    let prober = ScriptedProber::default()
        .with(urls[0], ProbeOutcome::Timeout)
        .with(urls[1], up(10))
        .with(urls[2], ProbeOutcome::WrongStatus { code: 404 })
        .with(urls[3], up(20));
    let notifier = RecordingNotifier::default();
    let targets = targets_from_urls(urls);

    let results = run_cycle(&targets, TIMEOUT, &prober, &notifier).await;

    assert_eq!(results.len(), 4);
    let seen: Vec<&str> = results.iter().map(|r| r.target.url.as_str()).collect();
    assert_eq!(seen, urls);
    assert_eq!(prober.calls(), urls);
    assert_eq!(results[0].outcome, ProbeOutcome::Timeout);
    assert!(results[1].outcome.is_up());
}

#[tokio::test]
async fn exactly_one_alert_per_failed_target() {
    let prober = ScriptedProber::default()
        .with("https://ok.example", up(5))
        .with("https://down.example", ProbeOutcome::WrongStatus { code: 502 })
        .with("https://gone.example", ProbeOutcome::ConnectionFailure)
        .with("https://slow.example", ProbeOutcome::Timeout)
        .with(
            "https://tls.example",
            ProbeOutcome::OtherError {
                detail: "certificate expired".into(),
            },
        );
    let notifier = RecordingNotifier::default();
    let targets = targets_from_urls([
        "https://ok.example",
        "https://down.example",
        "https://gone.example",
        "https://slow.example",
        "https://tls.example",
    ]);

    let results = run_cycle(&targets, TIMEOUT, &prober, &notifier).await;

    assert_eq!(
        notifier.messages(),
        vec![
            "ALERT: https://down.example is DOWN! Status Code: 502",
            "CRITICAL: https://gone.example is UNREACHABLE (Connection Error)",
            "WARNING: https://slow.example is TIMING OUT (>5s)",
            "ERROR: https://tls.example failed with: certificate expired",
        ]
    );
    assert!(results[0].delivery.is_none());
    for r in &results[1..] {
        assert_eq!(r.delivery, Some(DeliveryResult::delivered(204)));
    }
}

#[tokio::test]
async fn all_up_sends_nothing() {
    let prober = ScriptedProber::default()
        .with("https://a.example", up(1))
        .with("https://b.example", up(2));
    let notifier = RecordingNotifier::default();
    let targets = targets_from_urls(["https://a.example", "https://b.example"]);

    let results = run_cycle(&targets, TIMEOUT, &prober, &notifier).await;

    assert_eq!(results.len(), 2);
    assert!(notifier.messages().is_empty());
}

#[tokio::test]
async fn delivery_failure_does_not_stop_the_cycle() {
    let prober = ScriptedProber::default()
        .with("https://a.example", ProbeOutcome::WrongStatus { code: 500 })
        .with("https://b.example", ProbeOutcome::Timeout)
        .with("https://c.example", up(3));
    let notifier = RecordingNotifier::failing();
    let targets = targets_from_urls(["https://a.example", "https://b.example", "https://c.example"]);

    let results = run_cycle(&targets, TIMEOUT, &prober, &notifier).await;

    assert_eq!(results.len(), 3);
    assert_eq!(prober.calls().len(), 3);
    assert_eq!(notifier.messages().len(), 2);
    assert!(results[0].delivery_failed());
    assert!(results[1].delivery_failed());
    assert!(results[2].outcome.is_up());
}

#[tokio::test]
async fn end_to_end_ok_and_503() {
    let site = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ok"))
        .respond_with(ResponseTemplate::new(200).set_body_string("fine"))
        .mount(&site)
        .await;
    Mock::given(method("GET"))
        .and(path("/down"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&site)
        .await;

    let ok_url = format!("{}/ok", site.uri());
    let down_url = format!("{}/down", site.uri());

    let hook = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/hook"))
        .and(body_json(serde_json::json!({
            "content": format!("ALERT: {} is DOWN! Status Code: 503", down_url)
        })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&hook)
        .await;

    let config = MonitorConfig::default();
    let prober = HttpProber::from_config(&config).unwrap();
    let notifier = WebhookNotifier::new(
        WebhookConfig::new(format!("{}/hook", hook.uri())),
        Client::new(),
    );
    let targets = targets_from_urls([ok_url.clone(), down_url.clone()]);

    let results = run_cycle(&targets, config.request_timeout, &prober, &notifier).await;

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].target.url, ok_url);
    assert!(results[0].outcome.is_up());
    assert!(results[0].delivery.is_none());
    assert_eq!(results[1].target.url, down_url);
    assert_eq!(results[1].outcome, ProbeOutcome::WrongStatus { code: 503 });
    assert_eq!(results[1].delivery, Some(DeliveryResult::delivered(204)));
}

#[tokio::test]
async fn end_to_end_timeout_alert() {
    let site = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(4)))
        .mount(&site)
        .await;

    let prober = HttpProber::from_config(&MonitorConfig::default()).unwrap();
    let notifier = RecordingNotifier::default();
    let targets = targets_from_urls([site.uri()]);

    let results = run_cycle(&targets, Duration::from_secs(1), &prober, &notifier).await;

    assert_eq!(results[0].outcome, ProbeOutcome::Timeout);
    let messages = notifier.messages();
    assert_eq!(messages.len(), 1);
    assert!(messages[0].contains("TIMING OUT (>1s)"), "{}", messages[0]);
}

#[tokio::test]
async fn monitor_rejects_empty_target_list() {
    let result = Monitor::new(
        vec![],
        MonitorConfig::default(),
        Arc::new(ScriptedProber::default()),
        Arc::new(RecordingNotifier::default()),
    );
    assert!(matches!(result, Err(ConfigError::NoTargets)));
}

#[tokio::test]
async fn monitor_rejects_zero_timeout() {
    let result = Monitor::new(
        targets_from_urls(["https://a.example"]),
        MonitorConfig::default().with_request_timeout(Duration::ZERO),
        Arc::new(ScriptedProber::default()),
        Arc::new(RecordingNotifier::default()),
    );
    assert!(matches!(result, Err(ConfigError::ZeroTimeout)));
}

#[tokio::test]
async fn concurrent_cycle_keeps_target_order() {
    let prober = ScriptedProber::default()
        .with_delay("https://a.example", up(300), Duration::from_millis(300))
        .with_delay(
            "https://b.example",
            ProbeOutcome::WrongStatus { code: 500 },
            Duration::from_millis(150),
        )
        .with_delay("https://c.example", up(1), Duration::from_millis(1));
    let notifier = Arc::new(RecordingNotifier::default());

    let monitor = Monitor::new(
        targets_from_urls(["https://a.example", "https://b.example", "https://c.example"]),
        MonitorConfig::default().with_max_concurrent_probes(3),
        Arc::new(prober),
        notifier.clone(),
    )
    .unwrap();

    let report = monitor.run_cycle().await;

    assert!(!report.cancelled);
    let seen: Vec<&str> = report.results.iter().map(|r| r.target.id.as_str()).collect();
    assert_eq!(seen, ["target_1", "target_2", "target_3"]);
    assert_eq!(report.up_count(), 2);
    assert_eq!(report.down_count(), 1);
    assert_eq!(notifier.messages().len(), 1);
}

#[tokio::test]
async fn cancelled_monitor_skips_all_targets() {
    let prober = Arc::new(ScriptedProber::default().with("https://a.example", up(1)));
    let monitor = Monitor::new(
        targets_from_urls(["https://a.example"]),
        MonitorConfig::default(),
        prober.clone(),
        Arc::new(RecordingNotifier::default()),
    )
    .unwrap();

    monitor.cancel_handle().cancel();
    let report = monitor.run_cycle().await;

    assert!(report.cancelled);
    assert!(report.results.is_empty());
    assert!(prober.calls().is_empty());
}

#[tokio::test]
async fn cancellation_takes_effect_between_targets() {
    let prober = Arc::new(
        ScriptedProber::default()
            .with("https://a.example", ProbeOutcome::WrongStatus { code: 500 })
            .with("https://b.example", up(1)),
    );
    let notifier = Arc::new(RecordingNotifier::default());
    let monitor = Monitor::new(
        vec![
            Target::new("first", "https://a.example"),
            Target::new("second", "https://b.example"),
        ],
        MonitorConfig::default(),
        prober.clone(),
        notifier.clone(),
    )
    .unwrap();
    prober
        .cancel_after_first
        .set(monitor.cancel_handle())
        .unwrap();

    let report = monitor.run_cycle().await;

    assert!(report.cancelled);
    assert_eq!(report.results.len(), 1);
    assert_eq!(report.results[0].target.id, "first");
    // The in-flight target still completes, including its alert.
    assert_eq!(notifier.messages().len(), 1);
    assert_eq!(prober.calls(), ["https://a.example"]);
}

fn assert_send<T: Send>(_: &T) {}

#[test]
fn monitor_cycle_future_is_send() {
    let monitor = Monitor::new(
        targets_from_urls(["https://a.example"]),
        MonitorConfig::default(),
        Arc::new(ScriptedProber::default()),
        Arc::new(RecordingNotifier::default()),
    )
    .unwrap();

    let cycle = monitor.run_cycle();
    assert_send(&cycle);
}

#[tokio::test]
async fn monitor_cycle_runs_on_a_spawned_task() {
    let prober = ScriptedProber::default()
        .with("https://a.example", up(1))
        .with("https://b.example", ProbeOutcome::WrongStatus { code: 503 });
    let notifier = Arc::new(RecordingNotifier::default());
    let monitor = Arc::new(
        Monitor::new(
            targets_from_urls(["https://a.example", "https://b.example"]),
            MonitorConfig::default().with_max_concurrent_probes(2),
            Arc::new(prober),
            notifier.clone(),
        )
        .unwrap(),
    );

    let task = {
        let monitor = Arc::clone(&monitor);
        tokio::spawn(async move { monitor.run_cycle().await })
    };
    let report = task.await.unwrap();

    assert!(!report.cancelled);
    assert_eq!(report.results.len(), 2);
    assert_eq!(report.down_count(), 1);
    assert_eq!(
        notifier.messages(),
        ["ALERT: https://b.example is DOWN! Status Code: 503"]
    );
}
