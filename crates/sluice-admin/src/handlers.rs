//! REST API endpoint handlers for the admin server.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/` | Minimal HTML status page |
//! | `GET` | `/api/status` | Relay limits and retention counters |
//! | `POST` | `/api/retention/purge` | Run the age purge now |
//! | `POST` | `/api/retention/trim` | Trim one `(identity, category)` pair |
//! | `GET` | `/api/identities/{identity}/categories/{category}` | Stored count for a pair |
//! | `POST` | `/api/admission/check` | Dry-run the admission gate |

use std::sync::Arc;

use axum::Json;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::response::{Html, IntoResponse};
use sluice_core::{Admission, TrimOutcome};
use sluice_db::EventStore;
use sluice_types::{Category, Event, Identity};

use crate::error::AdminError;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

/// Request body for `POST /api/retention/trim`.
#[derive(Debug, serde::Deserialize)]
pub struct TrimRequest {
    /// Owner of the events to trim.
    pub identity: String,
    /// Event kind to trim.
    pub category: u16,
}

// ---------------------------------------------------------------------------
// GET / -- minimal HTML status page
// ---------------------------------------------------------------------------

/// Serve a minimal HTML page naming the relay, its limits and counters.
pub async fn index(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let policy = &state.policy;
    let name = escape_html(policy.name());
    let backend = policy.store().kind();
    let max_bytes = policy.gate().max_event_bytes();
    let retention_count = policy.enforcer().retention_count();
    let age_months = policy.enforcer().retention_age_months();
    let interval = policy.purge_interval().as_secs();
    let stats = policy.stats().snapshot();
    let last_purge = stats
        .last_purge_at
        .map_or_else(|| String::from("never"), |at| at.to_rfc3339());

    Html(format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="utf-8">
    <title>{name} -- Sluice</title>
    <style>
        body {{
            background: #0d1117;
            color: #c9d1d9;
            font-family: 'Cascadia Code', 'Fira Code', 'Consolas', monospace;
            padding: 2rem;
            max-width: 800px;
            margin: 0 auto;
        }}
        h1 {{ color: #58a6ff; margin-bottom: 0.25rem; }}
        .subtitle {{ color: #8b949e; margin-top: 0; }}
        .metric {{
            display: inline-block;
            background: #161b22;
            border: 1px solid #30363d;
            border-radius: 6px;
            padding: 1rem 1.5rem;
            margin: 0.5rem 0.5rem 0.5rem 0;
            min-width: 120px;
        }}
        .metric .label {{ color: #8b949e; font-size: 0.85rem; }}
        .metric .value {{ color: #58a6ff; font-size: 1.5rem; font-weight: bold; }}
        a {{ color: #58a6ff; text-decoration: none; }}
        ul {{ list-style: none; padding: 0; }}
        li {{ padding: 0.3rem 0; }}
        .status {{ color: #3fb950; font-weight: bold; }}
        hr {{ border: none; border-top: 1px solid #30363d; margin: 1.5rem 0; }}
    </style>
</head>
<body>
    <h1>{name}</h1>
    <p class="subtitle">Sluice relay retention -- {backend} store</p>

    <p>Status: <span class="status">RUNNING</span></p>

    <div>
        <div class="metric">
            <div class="label">Max event bytes</div>
            <div class="value">{max_bytes}</div>
        </div>
        <div class="metric">
            <div class="label">Kept per pair</div>
            <div class="value">{retention_count}</div>
        </div>
        <div class="metric">
            <div class="label">Max age (months)</div>
            <div class="value">{age_months}</div>
        </div>
        <div class="metric">
            <div class="label">Purge every (s)</div>
            <div class="value">{interval}</div>
        </div>
    </div>
    <div>
        <div class="metric">
            <div class="label">Accepted</div>
            <div class="value">{accepted}</div>
        </div>
        <div class="metric">
            <div class="label">Rejected</div>
            <div class="value">{rejected}</div>
        </div>
        <div class="metric">
            <div class="label">Trimmed</div>
            <div class="value">{trimmed}</div>
        </div>
        <div class="metric">
            <div class="label">Purged</div>
            <div class="value">{purged}</div>
        </div>
    </div>
    <p class="subtitle">Last purge: {last_purge}</p>

    <hr>

    <h2>API Endpoints</h2>
    <ul>
        <li>GET <a href="/api/status">/api/status</a> -- Limits and counters</li>
        <li>POST /api/retention/purge -- Run the age purge now</li>
        <li>POST /api/retention/trim -- Trim one pair</li>
        <li>GET /api/identities/{{identity}}/categories/{{category}} -- Stored count</li>
        <li>POST /api/admission/check -- Dry-run admission</li>
    </ul>
</body>
</html>"#,
        accepted = stats.accepted,
        rejected = stats.rejected,
        trimmed = stats.events_trimmed,
        purged = stats.events_purged,
    ))
}

// ---------------------------------------------------------------------------
// GET /api/status
// ---------------------------------------------------------------------------

/// Return relay identity, configured limits and the retention counters.
pub async fn status(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let policy = &state.policy;
    let categories: Vec<u16> = policy
        .gate()
        .allowed_categories()
        .iter()
        .map(|c| c.get())
        .collect();

    Json(serde_json::json!({
        "relay": policy.name(),
        "backend": policy.store().kind(),
        "uptime_secs": state.uptime_secs(),
        "limits": {
            "max_event_bytes": policy.gate().max_event_bytes(),
            "allowed_categories": categories,
            "retention_count": policy.enforcer().retention_count(),
            "retention_age_months": policy.enforcer().retention_age_months(),
            "purge_interval_secs": policy.purge_interval().as_secs(),
        },
        "stats": policy.stats().snapshot(),
    }))
}

// ---------------------------------------------------------------------------
// POST /api/retention/purge
// ---------------------------------------------------------------------------

/// Run the global age purge immediately.
pub async fn purge(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, AdminError> {
    let outcome = state.policy.enforcer().purge_expired().await?;
    Ok(Json(serde_json::json!({
        "cutoff": outcome.cutoff,
        "deleted": outcome.deleted,
    })))
}

// ---------------------------------------------------------------------------
// POST /api/retention/trim
// ---------------------------------------------------------------------------

/// Trim one `(identity, category)` pair to the retention count.
pub async fn trim(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<impl IntoResponse, AdminError> {
    let req: TrimRequest = serde_json::from_slice(&body)?;
    let identity = parse_identity(req.identity)?;
    let category = Category(req.category);

    let outcome = state
        .policy
        .enforcer()
        .trim_identity(&identity, category)
        .await?;

    let body = match outcome {
        TrimOutcome::Skipped => serde_json::json!({
            "identity": identity,
            "category": category,
            "outcome": "skipped",
            "deleted": 0,
        }),
        TrimOutcome::Trimmed { boundary, deleted } => serde_json::json!({
            "identity": identity,
            "category": category,
            "outcome": "trimmed",
            "boundary": boundary,
            "deleted": deleted,
        }),
    };
    Ok(Json(body))
}

// ---------------------------------------------------------------------------
// GET /api/identities/{identity}/categories/{category}
// ---------------------------------------------------------------------------

/// Return how many events the store holds for a pair.
pub async fn pair_count(
    State(state): State<Arc<AppState>>,
    Path((identity, category)): Path<(String, String)>,
) -> Result<impl IntoResponse, AdminError> {
    let identity = parse_identity(identity)?;
    let category = parse_category(&category)?;

    let count = state.policy.store().count_for(&identity, category).await?;

    Ok(Json(serde_json::json!({
        "identity": identity,
        "category": category,
        "count": count,
        "retention_count": state.policy.enforcer().retention_count(),
    })))
}

// ---------------------------------------------------------------------------
// POST /api/admission/check
// ---------------------------------------------------------------------------

/// Run the admission gate against an event without storing it or
/// touching the counters.
pub async fn check_admission(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<impl IntoResponse, AdminError> {
    let event: Event = serde_json::from_slice(&body)?;
    let admission = state.policy.gate().admit(&event);

    let body = match admission {
        Admission::Accepted => serde_json::json!({
            "accepted": true,
            "size": event.encoded_len().ok(),
        }),
        Admission::Rejected(reason) => serde_json::json!({
            "accepted": false,
            "reason": reason.to_string(),
            "size": event.encoded_len().ok(),
        }),
    };
    Ok(Json(body))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Escape text for interpolation into HTML element content.
fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

fn parse_identity(raw: String) -> Result<Identity, AdminError> {
    if raw.trim().is_empty() {
        return Err(AdminError::BadRequest(String::from("identity must not be empty")));
    }
    Ok(Identity::new(raw))
}

fn parse_category(raw: &str) -> Result<Category, AdminError> {
    raw.parse::<u16>()
        .map(Category)
        .map_err(|e| AdminError::BadRequest(format!("invalid category {raw:?}: {e}")))
}
