//! Team handover model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::error::AppResult;
use crate::models::AuthenticatedUser;

/// A handover joined with its team.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TeamHandover {
    pub handover_id: i64,
    pub team_id: i64,
    pub team_name: String,
    pub team_lead_id: Option<i64>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
}

/// Handover repository.
pub struct HandoverRepository;

impl HandoverRepository {
    /// Lists handovers visible to `user`, newest first.
    pub async fn list_visible(
        pool: &sqlx::PgPool,
        user: &AuthenticatedUser,
        active_only: bool,
    ) -> AppResult<Vec<TeamHandover>> {
        let team_filter = match user.team_scope() {
            None => None,
            Some(Some(team_id)) => Some(team_id),
            Some(None) => return Ok(Vec::new()),
        };

        let handovers = sqlx::query_as::<_, TeamHandover>(
            r"
            SELECT h.handover_id, h.team_id, t.team_name, t.team_lead_id,
                   h.is_active, h.created_at, h.closed_at
            FROM handovers h
            JOIN teams t ON t.team_id = h.team_id
            WHERE ($1::BIGINT IS NULL OR h.team_id = $1)
              AND ($2 = FALSE OR h.is_active = TRUE)
            ORDER BY h.created_at DESC, h.handover_id DESC
            ",
        )
        .bind(team_filter)
        .bind(active_only)
        .fetch_all(pool)
        .await?;

        Ok(handovers)
    }

    pub async fn find_by_id(
        pool: &sqlx::PgPool,
        handover_id: i64,
    ) -> AppResult<Option<TeamHandover>> {
        let handover = sqlx::query_as::<_, TeamHandover>(
            r"
            SELECT h.handover_id, h.team_id, t.team_name, t.team_lead_id,
                   h.is_active, h.created_at, h.closed_at
            FROM handovers h
            JOIN teams t ON t.team_id = h.team_id
            WHERE h.handover_id = $1
            ",
        )
        .bind(handover_id)
        .fetch_optional(pool)
        .await?;

        Ok(handover)
    }
}
