//! Admin endpoints for ledger maintenance and secret rotation.
//!
//! Mounted behind the admin key middleware.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;

use shoplist_store::UserDirectory;

use super::blocking;
use crate::error::ApiError;
use crate::state::SharedState;

/// Response for `GET /v1/admin/ledger`.
#[derive(Debug, Serialize)]
pub struct LedgerStatusResponse {
    /// Tokens held in the ledger.
    pub tracked_tokens: usize,
}

/// Response for `POST /v1/admin/ledger/compact`.
#[derive(Debug, Serialize)]
pub struct CompactResponse {
    /// Tokens that still verify.
    pub retained: usize,
    /// Tokens removed.
    pub dropped: usize,
}

/// Response for `POST /v1/admin/secrets/reload`.
#[derive(Debug, Serialize)]
pub struct ReloadResponse {
    /// End of the session secret's validity window after the reload.
    pub secret_valid_until: DateTime<Utc>,
}

/// Report the ledger size.
pub async fn ledger_status<D>(State(state): State<SharedState<D>>) -> Json<LedgerStatusResponse>
where
    D: UserDirectory + 'static,
{
    Json(LedgerStatusResponse {
        tracked_tokens: state.auth.ledger().len(),
    })
}

/// Drop ledger entries that no longer verify.
///
/// # Errors
///
/// `Unauthorized` if the session secret has expired (the ledger is left
/// untouched), `Internal` if the ledger cannot be rewritten.
pub async fn compact_ledger<D>(
    State(state): State<SharedState<D>>,
) -> Result<Json<CompactResponse>, ApiError>
where
    D: UserDirectory + 'static,
{
    let auth = Arc::clone(&state.auth);
    let outcome = blocking(move || Ok(auth.compact_ledger()?)).await?;

    Ok(Json(CompactResponse {
        retained: outcome.retained,
        dropped: outcome.dropped,
    }))
}

/// Re-read the secret files from disk.
///
/// # Errors
///
/// `Internal` if any file fails to load; stores whose file failed keep their
/// previous secret.
pub async fn reload_secrets<D>(
    State(state): State<SharedState<D>>,
) -> Result<Json<ReloadResponse>, ApiError>
where
    D: UserDirectory + 'static,
{
    let auth = Arc::clone(&state.auth);
    blocking(move || Ok(auth.reload_secrets()?)).await?;

    Ok(Json(ReloadResponse {
        secret_valid_until: state.auth.secrets().valid_until(),
    }))
}
