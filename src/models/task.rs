//! Handover task model.
//!
//! Contains the task entity, its acknowledgement history, the status enums
//! and the repository for database operations.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::error::{AppError, AppResult};

/// Task workflow status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TaskStatus {
    #[default]
    #[serde(rename = "open")]
    Open,
    #[serde(rename = "pending")]
    Pending,
    #[serde(rename = "in progress", alias = "in-progress")]
    InProgress,
    #[serde(rename = "completed")]
    Completed,
    #[serde(rename = "closed")]
    Closed,
}

impl TaskStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Pending => "pending",
            Self::InProgress => "in progress",
            Self::Completed => "completed",
            Self::Closed => "closed",
        }
    }

    /// Completed and closed tasks belong to the history view.
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Closed)
    }
}

impl FromStr for TaskStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "open" => Ok(Self::Open),
            "pending" => Ok(Self::Pending),
            "in progress" | "in-progress" | "in_progress" => Ok(Self::InProgress),
            "completed" => Ok(Self::Completed),
            "closed" => Ok(Self::Closed),
            other => Err(AppError::Validation(format!("Invalid task status '{other}'"))),
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Task priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

impl Priority {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
            Self::Critical => "Critical",
        }
    }
}

impl FromStr for Priority {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            "critical" => Ok(Self::Critical),
            other => Err(AppError::Validation(format!("Invalid priority '{other}'"))),
        }
    }
}

/// Acknowledgement state of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AckStatus {
    #[default]
    Pending,
    Acknowledged,
}

impl AckStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Acknowledged => "Acknowledged",
        }
    }
}

impl FromStr for AckStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "acknowledged" => Ok(Self::Acknowledged),
            other => Err(AppError::Validation(format!(
                "Invalid acknowledge status '{other}'"
            ))),
        }
    }
}

/// Parses an optional, possibly blank, client value falling back to the default.
pub fn parse_or_default<T>(value: Option<&str>) -> AppResult<T>
where
    T: FromStr<Err = AppError> + Default,
{
    match value.map(str::trim) {
        None | Some("") => Ok(T::default()),
        Some(v) => v.parse(),
    }
}

/// Task row as stored in `tasks`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Task {
    pub task_id: i64,
    pub handover_id: i64,
    pub task_title: String,
    pub task_desc: String,
    pub status: String,
    pub priority: String,
    pub acknowledge_status: String,
    pub ack_desc: String,
    pub user_created_id: Option<i64>,
    pub creation_time: DateTime<Utc>,
    pub status_update_time: Option<DateTime<Utc>>,
    pub acknowledge_time: Option<DateTime<Utc>>,
}

impl Task {
    /// Parsed status; rows written by older clients may carry unknown values.
    pub fn parsed_status(&self) -> Option<TaskStatus> {
        self.status.parse().ok()
    }
}

/// One entry of a task's acknowledgement history.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Acknowledgement {
    pub ack_id: i64,
    pub task_id: i64,
    pub user_acknowledged_id: i64,
    pub ack_desc: String,
    pub acknowledge_time: DateTime<Utc>,
}

/// Struct for creating a new task.
#[derive(Debug, Clone)]
pub struct NewTask {
    pub handover_id: i64,
    pub task_title: String,
    pub task_desc: String,
    pub status: TaskStatus,
    pub priority: Priority,
    pub acknowledge_status: AckStatus,
    pub ack_desc: String,
    pub user_created_id: i64,
}

/// Full replacement of a task's editable fields.
#[derive(Debug, Clone)]
pub struct TaskUpdate {
    pub task_title: String,
    pub task_desc: String,
    pub status: TaskStatus,
    pub priority: Priority,
    pub acknowledge_status: AckStatus,
    pub ack_desc: String,
}

impl TaskUpdate {
    /// An acknowledgement row is recorded only for acknowledged tasks with a note.
    pub fn records_acknowledgement(&self) -> bool {
        self.acknowledge_status == AckStatus::Acknowledged && !self.ack_desc.trim().is_empty()
    }
}

const TASK_COLUMNS: &str = "task_id, handover_id, task_title, task_desc, status, priority, \
     acknowledge_status, ack_desc, user_created_id, creation_time, status_update_time, \
     acknowledge_time";

/// Task repository.
pub struct TaskRepository;

impl TaskRepository {
    pub async fn list_for_handovers(
        pool: &sqlx::PgPool,
        handover_ids: &[i64],
    ) -> AppResult<Vec<Task>> {
        if handover_ids.is_empty() {
            return Ok(Vec::new());
        }

        let tasks = sqlx::query_as::<_, Task>(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE handover_id = ANY($1) \
             ORDER BY creation_time ASC, task_id ASC"
        ))
        .bind(handover_ids)
        .fetch_all(pool)
        .await?;

        Ok(tasks)
    }

    /// Loads acknowledgement history for the given tasks, oldest first.
    pub async fn acknowledgements_for(
        pool: &sqlx::PgPool,
        task_ids: &[i64],
    ) -> AppResult<Vec<Acknowledgement>> {
        if task_ids.is_empty() {
            return Ok(Vec::new());
        }

        let acks = sqlx::query_as::<_, Acknowledgement>(
            r"
            SELECT ack_id, task_id, user_acknowledged_id, ack_desc, acknowledge_time
            FROM task_acknowledgements
            WHERE task_id = ANY($1)
            ORDER BY acknowledge_time ASC, ack_id ASC
            ",
        )
        .bind(task_ids)
        .fetch_all(pool)
        .await?;

        Ok(acks)
    }

    /// Returns the team owning the task's handover.
    pub async fn team_of(pool: &sqlx::PgPool, task_id: i64) -> AppResult<Option<i64>> {
        let team_id = sqlx::query_scalar::<_, i64>(
            r"
            SELECT h.team_id
            FROM tasks t
            JOIN handovers h ON h.handover_id = t.handover_id
            WHERE t.task_id = $1
            ",
        )
        .bind(task_id)
        .fetch_optional(pool)
        .await?;

        Ok(team_id)
    }

    pub async fn create(pool: &sqlx::PgPool, new_task: &NewTask) -> AppResult<Task> {
        let task = sqlx::query_as::<_, Task>(&format!(
            r"
            INSERT INTO tasks (
                handover_id, task_title, task_desc, status, priority,
                acknowledge_status, ack_desc, user_created_id,
                creation_time, status_update_time
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, NOW(), NOW())
            RETURNING {TASK_COLUMNS}
            "
        ))
        .bind(new_task.handover_id)
        .bind(&new_task.task_title)
        .bind(&new_task.task_desc)
        .bind(new_task.status.as_str())
        .bind(new_task.priority.as_str())
        .bind(new_task.acknowledge_status.as_str())
        .bind(&new_task.ack_desc)
        .bind(new_task.user_created_id)
        .fetch_one(pool)
        .await?;

        Ok(task)
    }

    /// Applies `update` and, when it acknowledges the task, appends a history
    /// row for `acknowledger`. Both writes share one transaction.
    pub async fn update(
        pool: &sqlx::PgPool,
        task_id: i64,
        update: &TaskUpdate,
        acknowledger: i64,
    ) -> AppResult<Task> {
        let acknowledged = update.records_acknowledgement();
        let mut tx = pool.begin().await?;

        let task = sqlx::query_as::<_, Task>(&format!(
            r"
            UPDATE tasks SET
                task_title = $2,
                task_desc = $3,
                status_update_time = CASE WHEN status <> $4 THEN NOW() ELSE status_update_time END,
                status = $4,
                priority = $5,
                acknowledge_status = $6,
                ack_desc = $7,
                acknowledge_time = CASE WHEN $8 THEN NOW() ELSE acknowledge_time END
            WHERE task_id = $1
            RETURNING {TASK_COLUMNS}
            "
        ))
        .bind(task_id)
        .bind(&update.task_title)
        .bind(&update.task_desc)
        .bind(update.status.as_str())
        .bind(update.priority.as_str())
        .bind(update.acknowledge_status.as_str())
        .bind(&update.ack_desc)
        .bind(acknowledged)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Task {task_id} not found")))?;

        if acknowledged {
            sqlx::query(
                r"
                INSERT INTO task_acknowledgements (task_id, user_acknowledged_id, ack_desc, acknowledge_time)
                VALUES ($1, $2, $3, NOW())
                ",
            )
            .bind(task_id)
            .bind(acknowledger)
            .bind(update.ack_desc.trim())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(task)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_status_parse_aliases() {
        assert_eq!(
            "in-progress".parse::<TaskStatus>().unwrap(),
            TaskStatus::InProgress
        );
        assert_eq!(
            "In Progress".parse::<TaskStatus>().unwrap(),
            TaskStatus::InProgress
        );
        assert_eq!(" OPEN ".parse::<TaskStatus>().unwrap(), TaskStatus::Open);
        assert!("done".parse::<TaskStatus>().is_err());
    }

    #[test]
    fn test_task_status_serializes_with_space() {
        let json = serde_json::to_string(&TaskStatus::InProgress).unwrap();
        assert_eq!(json, "\"in progress\"");
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(TaskStatus::Completed.is_terminal());
        assert!(TaskStatus::Closed.is_terminal());
        assert!(!TaskStatus::Open.is_terminal());
        assert!(!TaskStatus::Pending.is_terminal());
        assert!(!TaskStatus::InProgress.is_terminal());
    }

    #[test]
    fn test_priority_parse_and_order() {
        assert_eq!("critical".parse::<Priority>().unwrap(), Priority::Critical);
        assert_eq!("HIGH".parse::<Priority>().unwrap().as_str(), "High");
        assert!(Priority::Critical > Priority::High);
        assert!(Priority::Medium > Priority::Low);
        assert!("urgent".parse::<Priority>().is_err());
    }

    #[test]
    fn test_parse_or_default() {
        assert_eq!(
            parse_or_default::<Priority>(None).unwrap(),
            Priority::Medium
        );
        assert_eq!(
            parse_or_default::<TaskStatus>(Some("  ")).unwrap(),
            TaskStatus::Open
        );
        assert_eq!(
            parse_or_default::<AckStatus>(Some("acknowledged")).unwrap(),
            AckStatus::Acknowledged
        );
        assert!(parse_or_default::<AckStatus>(Some("maybe")).is_err());
    }

    #[test]
    fn test_records_acknowledgement_requires_note() {
        let mut update = TaskUpdate {
            task_title: "Restart MQ".to_string(),
            task_desc: String::new(),
            status: TaskStatus::InProgress,
            priority: Priority::High,
            acknowledge_status: AckStatus::Acknowledged,
            ack_desc: "picked up".to_string(),
        };
        assert!(update.records_acknowledgement());

        update.ack_desc = "   ".to_string();
        assert!(!update.records_acknowledgement());

        update.ack_desc = "note".to_string();
        update.acknowledge_status = AckStatus::Pending;
        assert!(!update.records_acknowledgement());
    }
}
