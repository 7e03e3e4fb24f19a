//! Route handlers. Each one hands the blocking monitor work to
//! [`AppState::with_monitor`] and returns JSON (or CSV for the export).

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use common::{ResultRow, RunStatus, Target};
use monitor::{
    export_csv, overview, HistoryEntry, HistoryFilter, Overview, RunOptions, RunReport,
    SyncDirection, SyncSummary,
};
use serde::Deserialize;

use crate::error::ApiError;
use crate::state::AppState;

/// Identifies a target by its (company, role) slot.
#[derive(Debug, Deserialize)]
pub(crate) struct SlotParams {
    company: String,
    role: String,
}

/// Comma-separated filters: `?company=Acme,Globex&status=changed,error`.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct HistoryParams {
    company: Option<String>,
    status: Option<String>,
}

impl HistoryParams {
    fn into_filter(self) -> Result<HistoryFilter, ApiError> {
        let statuses = split_list(self.status.as_deref())
            .into_iter()
            .map(|s| {
                s.parse::<RunStatus>()
                    .map_err(|err| ApiError::new(StatusCode::BAD_REQUEST, err.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(HistoryFilter {
            companies: split_list(self.company.as_deref()),
            statuses,
        })
    }
}

fn split_list(raw: Option<&str>) -> Vec<String> {
    raw.unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty() && !s.eq_ignore_ascii_case("all"))
        .map(String::from)
        .collect()
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct RunRequest {
    #[serde(default)]
    archive: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum SyncRequestDirection {
    Pull,
    Push,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SyncRequest {
    direction: SyncRequestDirection,
}

/// Strips whitespace the way targets typed into the CLI are.
fn normalized(target: Target) -> Target {
    let clean = Target::new(&target.company, &target.url, &target.role);
    match target.external_key {
        Some(key) => clean.with_external_key(key.trim()),
        None => clean,
    }
}

/// GET /
pub(crate) async fn root_handler() -> &'static str {
    "📋 Career Page Monitor API\n\nEndpoints:\n  \
     GET    /overview              - Summary metrics\n  \
     GET    /targets               - List targets\n  \
     PUT    /targets               - Replace all targets\n  \
     POST   /targets               - Add a target\n  \
     PATCH  /targets?company=&role= - Edit a target\n  \
     DELETE /targets?company=&role= - Delete a target\n  \
     POST   /targets/sync          - Sync with the reference manager\n  \
     POST   /runs                  - Run monitoring now\n  \
     GET    /history               - Result history (?company=&status=)\n  \
     GET    /history.csv           - History as CSV\n  \
     DELETE /history/{index}       - Delete a history row\n"
}

/// GET /health
pub(crate) async fn health_handler() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

/// GET /overview
pub(crate) async fn overview_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Overview>, ApiError> {
    let summary = state
        .with_monitor(|monitor| {
            let targets = monitor.registry().load()?;
            let rows = monitor.results().read_all()?;
            Ok(overview(&targets, &rows))
        })
        .await?;
    Ok(Json(summary))
}

/// GET /targets
pub(crate) async fn list_targets(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Target>>, ApiError> {
    let targets = state
        .with_monitor(|monitor| monitor.registry().load())
        .await?;
    Ok(Json(targets))
}

/// PUT /targets
pub(crate) async fn replace_targets(
    State(state): State<Arc<AppState>>,
    Json(targets): Json<Vec<Target>>,
) -> Result<Json<Vec<Target>>, ApiError> {
    let targets: Vec<Target> = targets.into_iter().map(normalized).collect();
    let saved = state
        .with_monitor(move |monitor| {
            monitor.registry().save(&targets)?;
            Ok(targets)
        })
        .await?;
    Ok(Json(saved))
}

/// POST /targets
pub(crate) async fn add_target(
    State(state): State<Arc<AppState>>,
    Json(target): Json<Target>,
) -> Result<(StatusCode, Json<Vec<Target>>), ApiError> {
    let target = normalized(target);
    let targets = state
        .with_monitor(move |monitor| monitor.registry().add(target))
        .await?;
    Ok((StatusCode::CREATED, Json(targets)))
}

/// PATCH /targets?company=..&role=..
pub(crate) async fn edit_target(
    State(state): State<Arc<AppState>>,
    Query(slot): Query<SlotParams>,
    Json(replacement): Json<Target>,
) -> Result<Json<Vec<Target>>, ApiError> {
    let replacement = normalized(replacement);
    let targets = state
        .with_monitor(move |monitor| {
            monitor
                .registry()
                .edit(&slot.company, &slot.role, replacement)
        })
        .await?;
    Ok(Json(targets))
}

/// DELETE /targets?company=..&role=..
pub(crate) async fn delete_target(
    State(state): State<Arc<AppState>>,
    Query(slot): Query<SlotParams>,
) -> Result<Json<Target>, ApiError> {
    let removed = state
        .with_monitor(move |monitor| monitor.registry().remove(&slot.company, &slot.role))
        .await?;
    Ok(Json(removed))
}

/// POST /targets/sync
pub(crate) async fn sync_targets(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SyncRequest>,
) -> Result<Json<SyncSummary>, ApiError> {
    let direction = match request.direction {
        SyncRequestDirection::Pull => SyncDirection::Pull,
        SyncRequestDirection::Push => SyncDirection::Push,
    };
    let summary = state
        .with_monitor(move |monitor| monitor.sync_targets(direction))
        .await?;
    Ok(Json(summary))
}

/// POST /runs
pub(crate) async fn run_handler(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<RunReport>, ApiError> {
    // An empty body means "run without archiving".
    let request: RunRequest = if body.is_empty() {
        RunRequest::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|err| ApiError::new(StatusCode::BAD_REQUEST, err.to_string()))?
    };
    let options = RunOptions {
        archive: request.archive,
    };
    let report = state.with_monitor(move |monitor| monitor.run(options)).await?;
    Ok(Json(report))
}

/// GET /history
pub(crate) async fn history_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<HistoryParams>,
) -> Result<Json<Vec<HistoryEntry>>, ApiError> {
    let filter = params.into_filter()?;
    let entries = state
        .with_monitor(move |monitor| monitor.results().history(&filter))
        .await?;
    Ok(Json(entries))
}

/// GET /history.csv
pub(crate) async fn history_csv_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<HistoryParams>,
) -> Result<impl IntoResponse, ApiError> {
    let filter = params.into_filter()?;
    let entries = state
        .with_monitor(move |monitor| monitor.results().history(&filter))
        .await?;
    let rows: Vec<ResultRow> = entries.into_iter().map(|e| e.row).collect();

    let mut body = Vec::new();
    export_csv(&rows, &mut body).map_err(|err| ApiError::internal(err.to_string()))?;

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"job_monitor_history.csv\"",
            ),
        ],
        body,
    ))
}

/// DELETE /history/{index}
pub(crate) async fn delete_history_row(
    State(state): State<Arc<AppState>>,
    Path(index): Path<usize>,
) -> Result<Json<ResultRow>, ApiError> {
    let removed = state
        .with_monitor(move |monitor| monitor.results().delete_row(index))
        .await?;
    Ok(Json(removed))
}

/// Fallback for unmatched routes.
pub(crate) async fn not_found_handler() -> ApiError {
    ApiError::new(StatusCode::NOT_FOUND, "not found")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Credentials;
    use monitor::MonitorConfig;

    fn state(dir: &std::path::Path) -> Arc<AppState> {
        Arc::new(AppState::new(
            MonitorConfig::default().with_data_dir(dir),
            Credentials::new("me", "s3cret"),
        ))
    }

    fn acme() -> Target {
        Target::new("Acme", "http://127.0.0.1:1/jobs", "Engineer")
    }

    #[tokio::test]
    async fn test_add_list_and_delete_targets() {
        let dir = tempfile::tempdir().unwrap();
        let state = state(dir.path());

        let padded = Target {
            company: "  Acme ".into(),
            ..acme()
        };
        let (status, Json(targets)) = add_target(State(state.clone()), Json(padded))
            .await
            .unwrap();
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(targets, vec![acme()]);

        let Json(listed) = list_targets(State(state.clone())).await.unwrap();
        assert_eq!(listed, vec![acme()]);

        let Json(removed) = delete_target(
            State(state.clone()),
            Query(SlotParams {
                company: "Acme".into(),
                role: "Engineer".into(),
            }),
        )
        .await
        .unwrap();
        assert_eq!(removed, acme());
    }

    #[tokio::test]
    async fn test_duplicate_save_is_unprocessable() {
        let dir = tempfile::tempdir().unwrap();
        let state = state(dir.path());

        let err = replace_targets(State(state), Json(vec![acme(), acme()]))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_edit_unknown_target_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let state = state(dir.path());

        let err = edit_target(
            State(state),
            Query(SlotParams {
                company: "Nobody".into(),
                role: "None".into(),
            }),
            Json(acme()),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_run_then_filter_history() {
        let dir = tempfile::tempdir().unwrap();
        let state = state(dir.path());
        add_target(State(state.clone()), Json(acme())).await.unwrap();

        let Json(report) = run_handler(State(state.clone()), Bytes::new()).await.unwrap();
        assert_eq!(report.rows.len(), 1);
        assert_eq!(report.rows[0].status, RunStatus::Error);

        let Json(errors) = history_handler(
            State(state.clone()),
            Query(HistoryParams {
                company: Some("All".into()),
                status: Some("error".into()),
            }),
        )
        .await
        .unwrap();
        assert_eq!(errors.len(), 1);

        let Json(changed) = history_handler(
            State(state.clone()),
            Query(HistoryParams {
                company: None,
                status: Some("changed,first-snapshot".into()),
            }),
        )
        .await
        .unwrap();
        assert!(changed.is_empty());

        let Json(summary) = overview_handler(State(state)).await.unwrap();
        assert_eq!(summary.errors, 1);
        assert_eq!(summary.runs, 1);
    }

    #[tokio::test]
    async fn test_bad_status_filter_is_bad_request() {
        let dir = tempfile::tempdir().unwrap();
        let err = history_handler(
            State(state(dir.path())),
            Query(HistoryParams {
                company: None,
                status: Some("sometimes".into()),
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_delete_missing_history_row() {
        let dir = tempfile::tempdir().unwrap();
        let err = delete_history_row(State(state(dir.path())), Path(3))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_sync_without_reference_manager_conflicts() {
        let dir = tempfile::tempdir().unwrap();
        let err = sync_targets(
            State(state(dir.path())),
            Json(SyncRequest {
                direction: SyncRequestDirection::Pull,
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_malformed_run_body_is_bad_request() {
        let dir = tempfile::tempdir().unwrap();
        let err = run_handler(State(state(dir.path())), Bytes::from_static(b"{archive"))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_split_list_drops_all_and_blanks() {
        assert_eq!(
            split_list(Some("Acme, ,All,Globex")),
            vec!["Acme".to_string(), "Globex".to_string()]
        );
        assert!(split_list(None).is_empty());
    }
}
