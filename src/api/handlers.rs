use super::{ApiError, AppState};
use crate::types::{ComponentHealth, HealthStatus, LatestResponse, MarketRecord};
use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse},
    Json,
};
use chrono::{SecondsFormat, Utc};
use std::collections::HashMap;

/// `GET /latest`: the current snapshot with its scrape time
pub async fn get_latest(
    State(state): State<AppState>,
) -> Result<Json<LatestResponse>, ApiError> {
    let snapshot = state.load_snapshot().await?;
    Ok(Json(LatestResponse::from(snapshot)))
}

/// `GET /health`: snapshot freshness plus update loop metrics
pub async fn get_health(State(state): State<AppState>) -> impl IntoResponse {
    let mut details = HashMap::new();

    let metrics = state.metrics.get_metrics().await;
    details.insert(
        "cycles".to_string(),
        serde_json::to_value(&metrics).unwrap_or_default(),
    );

    let snapshot = state.load_snapshot().await;
    let status = match &snapshot {
        Ok(snapshot) => {
            details.insert("records".to_string(), serde_json::json!(snapshot.len()));
            details.insert(
                "captured_at".to_string(),
                serde_json::json!(snapshot.captured_at),
            );
            details.insert(
                "age_secs".to_string(),
                serde_json::json!(snapshot.age().as_secs()),
            );

            if snapshot.is_stale(state.stale_after) {
                HealthStatus::Degraded
            } else {
                HealthStatus::Healthy
            }
        }
        Err(_) => HealthStatus::Unhealthy,
    };

    let message = match (&status, &snapshot) {
        (HealthStatus::Healthy, _) => "Serving a fresh snapshot".to_string(),
        (HealthStatus::Degraded, _) => format!(
            "Snapshot is older than {}s",
            state.stale_after.as_secs()
        ),
        (HealthStatus::Unhealthy, Err(e)) => e.to_string(),
        (HealthStatus::Unhealthy, Ok(_)) => "Snapshot unavailable".to_string(),
    };

    let code = match status {
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::OK,
    };

    let health = ComponentHealth {
        name: "market_scraper".to_string(),
        status,
        message: Some(message),
        details,
        last_checked: Utc::now(),
    };

    (code, Json(health))
}

/// `GET /htmlpage`: the snapshot as a self-refreshing HTML table
pub async fn get_html_page(State(state): State<AppState>) -> Result<Html<String>, ApiError> {
    let snapshot = state.load_snapshot().await?;
    let timestamp = snapshot
        .captured_at
        .to_rfc3339_opts(SecondsFormat::Secs, true);
    Ok(Html(render_table(&timestamp, &snapshot.records)))
}

fn render_table(timestamp: &str, records: &[MarketRecord]) -> String {
    let rows: String = records
        .iter()
        .map(|r| {
            format!(
                "<tr><td>{}</td><td>{}</td><td>{}</td></tr>\n",
                escape_html(&r.pair),
                escape_html(&r.price),
                escape_html(&r.change_24h)
            )
        })
        .collect();

    format!(
        r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"><meta http-equiv="refresh" content="1"><title>Crypto Market Data</title></head>
<body>
<h2>Crypto Market Data</h2>
<p>Last updated: {timestamp}</p>
<table border="1" cellpadding="5" cellspacing="0">
<tr><th>Pair</th><th>Price</th><th>Change (24h)</th></tr>
{rows}</table>
</body>
</html>
"#
    )
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
