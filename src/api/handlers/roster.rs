//! Project roster handlers.
//!
//! All routes sit behind the JWT middleware; the token subject is recorded
//! as the uploader or annotator.

use std::future::Future;

use axum::{
    body::Bytes,
    extract::{Multipart, Query, State},
    response::{IntoResponse, Response},
    Extension, Json,
};
use validator::Validate;

use crate::api::middlewares::AuthUser;
use crate::api::schemas::{
    AnnotationRequest, AnnotationResponse, EmployeeCountView, LowHoursResponse, LowHoursView,
    MonthsResponse, RosterRowView, SearchAction, SearchQuery, ShiftsResponse, TeamsResponse,
    UploadResponse,
};
use crate::api::state::AppState;
use crate::config::{cache_get, cache_invalidate_prefix, cache_set, APP_CONFIG};
use crate::error::{AppError, AppResult, ValidationErrorExt};
use crate::models::{low_hour_entries, summarize_attendance, RosterRepository};
use crate::utils::{file_hash, parse_roster};

/// Prefix shared by every roster cache key.
pub const ROSTER_CACHE_PREFIX: &str = "roster:";

const UPLOAD_FIELD: &str = "file";

/// Width of `roster_uploads.file_name`.
const FILE_NAME_MAX_CHARS: usize = 255;

/// Width of the `uploaded_by` and `annotated_by` columns.
const USER_REF_MAX_CHARS: usize = 64;

/// Cuts `value` to at most `max` characters.
fn clamp_chars(value: &str, max: usize) -> &str {
    value
        .char_indices()
        .nth(max)
        .map_or(value, |(idx, _)| &value[..idx])
}

fn cache_key(suffix: &str) -> String {
    format!("{ROSTER_CACHE_PREFIX}{suffix}")
}

/// Returns the cached list under `key`, loading and caching it on a miss.
async fn cached_list<F, Fut>(state: &AppState, key: &str, load: F) -> AppResult<Vec<String>>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = AppResult<Vec<String>>>,
{
    if let Some(values) = cache_get::<Vec<String>>(&state.cache, key).await {
        return Ok(values);
    }

    let values = load().await?;
    cache_set(&state.cache, key, &values).await;
    Ok(values)
}

/// Reads the `file` field of a multipart form.
async fn read_upload(multipart: &mut Multipart) -> AppResult<(String, Bytes)> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let file_name = field.file_name().map_or_else(
            || "roster.csv".to_string(),
            |name| clamp_chars(name, FILE_NAME_MAX_CHARS).to_string(),
        );
        let bytes = field.bytes().await?;
        return Ok((file_name, bytes));
    }

    Err(AppError::BadRequest("No file uploaded".to_string()))
}

/// Roster upload handler.
///
/// Imports a CSV roster, skipping bad rows. A file whose content was already
/// imported is reported as a duplicate.
///
/// # Route
///
/// `POST /projectRoster/upload/`
pub async fn file_upload(
    State(state): State<AppState>,
    Extension(AuthUser(claims)): Extension<AuthUser>,
    mut multipart: Multipart,
) -> AppResult<Json<UploadResponse>> {
    // 1. Read file
    let (file_name, bytes) = read_upload(&mut multipart).await?;
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Err(AppError::BadRequest("Uploaded file is empty".to_string()));
    }

    // 2. Parse rows
    let parsed = parse_roster(&bytes)?;
    if parsed.entries.is_empty() && parsed.errors.is_empty() {
        return Err(AppError::BadRequest("Roster file has no rows".to_string()));
    }

    // 3. Skip repeated uploads
    let hash = file_hash(&bytes);
    if RosterRepository::upload_exists(&state.db, &hash).await? {
        tracing::info!(file_name = %file_name, file_hash = %hash, "Duplicate roster upload");
        return Ok(Json(UploadResponse::duplicate(file_name)));
    }

    // 4. Import
    let uploaded_by = clamp_chars(&claims.sub, USER_REF_MAX_CHARS);
    let Some(outcome) =
        RosterRepository::import(&state.db, &parsed.entries, &file_name, &hash, uploaded_by)
            .await?
    else {
        return Ok(Json(UploadResponse::duplicate(file_name)));
    };

    if let Err(e) = cache_invalidate_prefix(&state.cache, ROSTER_CACHE_PREFIX).await {
        tracing::error!(error = %e, "Failed to invalidate roster cache");
    }

    tracing::info!(
        file_name = %file_name,
        inserted = outcome.inserted,
        updated = outcome.updated,
        skipped = parsed.errors.len(),
        uploaded_by = %uploaded_by,
        level = claims.level.as_deref().unwrap_or("-"),
        "Roster imported"
    );

    Ok(Json(UploadResponse {
        message: "File uploaded successfully".to_string(),
        file_name,
        inserted: outcome.inserted,
        updated: outcome.updated,
        skipped: parsed.errors.len(),
        errors: parsed.errors,
        duplicate: false,
    }))
}

/// Roster search handler.
///
/// Without `action` returns matching rows; the actions return lookup lists,
/// per-employee counts or short working days instead.
///
/// # Route
///
/// `GET /projectRoster/search/`
pub async fn data_search(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> AppResult<Response> {
    let action = query.action()?;
    let filter = query.filter()?;

    let response = match action {
        Some(SearchAction::GetTeams) => {
            let teams = cached_list(&state, &cache_key("teams"), || {
                RosterRepository::distinct_teams(&state.db)
            })
            .await?;
            Json(TeamsResponse { teams }).into_response()
        }
        Some(SearchAction::GetShifts) => {
            let shifts = cached_list(&state, &cache_key("shifts"), || {
                RosterRepository::distinct_shifts(&state.db)
            })
            .await?;
            Json(ShiftsResponse { shifts }).into_response()
        }
        Some(SearchAction::GetMonths) => {
            let key = cache_key(&format!("months:{}", filter.cache_key()?));
            let months =
                cached_list(&state, &key, || RosterRepository::months(&state.db, &filter)).await?;
            Json(MonthsResponse { months }).into_response()
        }
        Some(SearchAction::Count) => {
            let entries = RosterRepository::search(&state.db, &filter, None).await?;
            let counts: Vec<EmployeeCountView> = summarize_attendance(&entries, &filter)
                .into_iter()
                .map(EmployeeCountView::from)
                .collect();
            Json(counts).into_response()
        }
        Some(SearchAction::LowHours) => {
            let entries = RosterRepository::search(&state.db, &filter, None).await?;
            let employees_with_low_hours = low_hour_entries(
                &entries,
                APP_CONFIG.low_hours_threshold_minutes,
            )
            .into_iter()
            .map(LowHoursView::from)
            .collect();
            Json(LowHoursResponse {
                employees_with_low_hours,
            })
            .into_response()
        }
        None => {
            let entries = RosterRepository::search(
                &state.db,
                &filter,
                Some(APP_CONFIG.roster_search_limit),
            )
            .await?;
            let rows: Vec<RosterRowView> = entries.into_iter().map(RosterRowView::from).collect();
            Json(rows).into_response()
        }
    };

    Ok(response)
}

/// Roster annotation handler.
///
/// # Route
///
/// `POST /projectRoster/update_annotation/`
pub async fn update_annotation(
    State(state): State<AppState>,
    Extension(AuthUser(claims)): Extension<AuthUser>,
    Json(req_body): Json<AnnotationRequest>,
) -> AppResult<Json<AnnotationResponse>> {
    req_body.validate().map_err(|e| e.to_validation_error())?;
    let (roster_id, comment, status) = req_body.parts()?;

    let annotated_by = clamp_chars(&claims.sub, USER_REF_MAX_CHARS);
    if !RosterRepository::annotate(&state.db, roster_id, &comment, status, annotated_by).await? {
        return Err(AppError::NotFound(format!(
            "Roster entry {roster_id} not found"
        )));
    }

    tracing::info!(
        roster_id,
        status,
        annotated_by = %annotated_by,
        level = claims.level.as_deref().unwrap_or("-"),
        "Roster annotation updated"
    );

    Ok(Json(AnnotationResponse {
        message: "Annotation updated successfully",
        roster_id,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RosterFilter;

    #[test]
    fn test_cache_keys_share_prefix() {
        assert_eq!(cache_key("teams"), "roster:teams");
        let months = cache_key(&format!(
            "months:{}",
            RosterFilter::default().cache_key().unwrap()
        ));
        assert!(months.starts_with(ROSTER_CACHE_PREFIX));
    }

    #[test]
    fn test_clamp_chars() {
        assert_eq!(clamp_chars("roster.csv", 255), "roster.csv");
        assert_eq!(clamp_chars("abcdef", 3), "abc");
        assert_eq!(clamp_chars("", 3), "");

        // 멀티바이트 문자 경계에서 잘라야 함
        let name = "가".repeat(300);
        let clamped = clamp_chars(&name, FILE_NAME_MAX_CHARS);
        assert_eq!(clamped.chars().count(), FILE_NAME_MAX_CHARS);
    }
}
