use std::fmt::Write;

use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;

use crate::state::AppState;

pub async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    let mut out = String::with_capacity(2048);
    let results = state.latest_results();

    let _ = writeln!(out, "# TYPE uptime_target_up gauge");
    let _ = writeln!(out, "# HELP uptime_target_up Whether the last probe returned HTTP 200");
    for r in &results {
        let _ = writeln!(
            out,
            "uptime_target_up{{target_id=\"{}\",url=\"{}\",outcome=\"{}\"}} {}",
            escape_label(&r.target.id),
            escape_label(&r.target.url),
            r.outcome.kind(),
            u8::from(r.outcome.is_up())
        );
    }

    let _ = writeln!(out, "# TYPE uptime_target_latency_seconds gauge");
    let _ = writeln!(
        out,
        "# HELP uptime_target_latency_seconds Latency of the last successful probe"
    );
    for r in &results {
        if let Some(latency) = r.outcome.latency() {
            let _ = writeln!(
                out,
                "uptime_target_latency_seconds{{target_id=\"{}\"}} {:.3}",
                escape_label(&r.target.id),
                latency.as_secs_f64()
            );
        }
    }

    let _ = writeln!(out, "# TYPE uptime_alert_delivery_success gauge");
    let _ = writeln!(
        out,
        "# HELP uptime_alert_delivery_success Whether the last alert for a target was delivered"
    );
    for r in &results {
        if let Some(delivery) = &r.delivery {
            let _ = writeln!(
                out,
                "uptime_alert_delivery_success{{target_id=\"{}\"}} {}",
                escape_label(&r.target.id),
                u8::from(delivery.success)
            );
        }
    }

    let _ = writeln!(out, "# TYPE uptime_cycles counter");
    let _ = writeln!(out, "# HELP uptime_cycles Check cycles completed since startup");
    let _ = writeln!(out, "uptime_cycles_total {}", state.cycles_total());

    if let Some(summary) = state.last_cycle.read().await.as_ref() {
        let t = summary.finished_at;
        let secs = t.timestamp() as f64 + (t.timestamp_subsec_millis() as f64 / 1000.0);
        let _ = writeln!(out, "# TYPE uptime_last_cycle_timestamp_seconds gauge");
        let _ = writeln!(
            out,
            "# HELP uptime_last_cycle_timestamp_seconds Unix timestamp of the last finished cycle"
        );
        let _ = writeln!(out, "uptime_last_cycle_timestamp_seconds {:.3}", secs);
    }

    let _ = writeln!(out, "# EOF");

    (
        [(
            header::CONTENT_TYPE,
            "application/openmetrics-text; version=1.0.0; charset=utf-8",
        )],
        out,
    )
}

fn escape_label(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}
