//! Shift handover request and response shapes.
//!
//! Field names follow the handover desk client, which mixes camelCase with
//! a few legacy `_id` suffixes.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::api::schemas::non_blank;
use crate::error::{AppError, AppResult, ValidationErrorExt};
use crate::models::{
    parse_or_default, Acknowledgement, BrokerRestartRun, NewTask, Task, TaskUpdate, TeamHandover,
};

/// Login fields every handover request carries.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct Credentials {
    #[validate(
        required(message = "uid is required"),
        length(min = 1, message = "uid is required")
    )]
    #[serde(default)]
    pub uid: Option<String>,

    #[validate(
        required(message = "password is required"),
        length(min = 1, message = "password is required")
    )]
    #[serde(default)]
    pub password: Option<String>,
}

impl Credentials {
    /// Validates presence and returns `(uid, password)`.
    pub fn pair(&self) -> AppResult<(&str, &str)> {
        self.validate().map_err(|e| e.to_validation_error())?;
        match (self.uid.as_deref().map(str::trim), self.password.as_deref()) {
            (Some(uid), Some(password)) if !uid.is_empty() => Ok((uid, password)),
            _ => Err(AppError::Validation("uid and password are required".to_string())),
        }
    }
}

/// Task create/update request.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct SaveTaskRequest {
    #[serde(flatten)]
    pub credentials: Credentials,

    /// Present when updating an existing task
    #[serde(default)]
    pub task_id: Option<i64>,

    /// Target handover for a new task
    #[serde(default, rename = "handover_id_id")]
    pub handover_id: Option<i64>,

    #[validate(length(max = 255, message = "taskTitle must be at most 255 characters"))]
    #[serde(default, rename = "taskTitle")]
    pub task_title: Option<String>,

    #[validate(length(max = 5000, message = "taskDesc must be at most 5000 characters"))]
    #[serde(default, rename = "taskDesc")]
    pub task_desc: Option<String>,

    #[serde(default)]
    pub status: Option<String>,

    #[serde(default)]
    pub priority: Option<String>,

    #[serde(default, rename = "acknowledgeStatus")]
    pub acknowledge_status: Option<String>,

    #[validate(length(max = 2000, message = "ackDesc must be at most 2000 characters"))]
    #[serde(default, rename = "ackDesc")]
    pub ack_desc: Option<String>,
}

impl SaveTaskRequest {
    fn title(&self) -> String {
        non_blank(self.task_title.as_deref()).unwrap_or_default()
    }

    fn desc(&self) -> String {
        non_blank(self.task_desc.as_deref()).unwrap_or_default()
    }

    /// Builds a new task for `handover_id_id`, created by `user_id`.
    pub fn to_new_task(&self, user_id: i64) -> AppResult<NewTask> {
        let handover_id = self
            .handover_id
            .ok_or_else(|| AppError::Validation("handover_id_id is required".to_string()))?;

        let task_title = self.title();
        let task_desc = self.desc();
        if task_title.is_empty() && task_desc.is_empty() {
            return Err(AppError::Validation(
                "taskTitle or taskDesc is required".to_string(),
            ));
        }

        Ok(NewTask {
            handover_id,
            task_title,
            task_desc,
            status: parse_or_default(self.status.as_deref())?,
            priority: parse_or_default(self.priority.as_deref())?,
            acknowledge_status: parse_or_default(self.acknowledge_status.as_deref())?,
            ack_desc: non_blank(self.ack_desc.as_deref()).unwrap_or_default(),
            user_created_id: user_id,
        })
    }

    /// Builds the replacement values for an existing task.
    pub fn to_update(&self) -> AppResult<TaskUpdate> {
        Ok(TaskUpdate {
            task_title: self.title(),
            task_desc: self.desc(),
            status: parse_or_default(self.status.as_deref())?,
            priority: parse_or_default(self.priority.as_deref())?,
            acknowledge_status: parse_or_default(self.acknowledge_status.as_deref())?,
            ack_desc: non_blank(self.ack_desc.as_deref()).unwrap_or_default(),
        })
    }
}

/// Response for task create/update.
#[derive(Debug, Serialize)]
pub struct SaveTaskResponse {
    pub message: &'static str,
    #[serde(rename = "Taskid")]
    pub task_id: i64,
}

impl SaveTaskResponse {
    pub const fn created(task_id: i64) -> Self {
        Self {
            message: "Task created successfully",
            task_id,
        }
    }

    pub const fn updated(task_id: i64) -> Self {
        Self {
            message: "Task updated successfully",
            task_id,
        }
    }
}

/// Handover header as shown to the desk client.
#[derive(Debug, Clone, Serialize)]
pub struct HandoverDetailView {
    #[serde(rename = "handover_id_id")]
    pub handover_id: i64,
    #[serde(rename = "TeamId")]
    pub team_id: i64,
    #[serde(rename = "teamName")]
    pub team_name: String,
    pub role: String,
    #[serde(rename = "teamLead_id")]
    pub team_lead_id: Option<i64>,
    #[serde(rename = "isActive")]
    pub is_active: bool,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

impl From<&TeamHandover> for HandoverDetailView {
    fn from(h: &TeamHandover) -> Self {
        Self {
            handover_id: h.handover_id,
            team_id: h.team_id,
            team_name: h.team_name.clone(),
            role: h.team_name.clone(),
            team_lead_id: h.team_lead_id,
            is_active: h.is_active,
            created_at: h.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AcknowledgementView {
    #[serde(rename = "ackId")]
    pub ack_id: i64,
    // Client spells it this way.
    #[serde(rename = "userAcknowleged_id")]
    pub user_acknowledged_id: i64,
    #[serde(rename = "ackDesc")]
    pub ack_desc: String,
    #[serde(rename = "acknowledgeTime")]
    pub acknowledge_time: DateTime<Utc>,
}

impl From<Acknowledgement> for AcknowledgementView {
    fn from(a: Acknowledgement) -> Self {
        Self {
            ack_id: a.ack_id,
            user_acknowledged_id: a.user_acknowledged_id,
            ack_desc: a.ack_desc,
            acknowledge_time: a.acknowledge_time,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TaskView {
    #[serde(rename = "Taskid")]
    pub task_id: i64,
    #[serde(rename = "handover_id_id")]
    pub handover_id: i64,
    #[serde(rename = "taskTitle")]
    pub task_title: String,
    #[serde(rename = "taskDesc")]
    pub task_desc: String,
    pub status: String,
    pub priority: String,
    #[serde(rename = "acknowledgeStatus")]
    pub acknowledge_status: String,
    #[serde(rename = "ackDesc")]
    pub ack_desc: String,
    #[serde(rename = "userCreated_id")]
    pub user_created_id: Option<i64>,
    #[serde(rename = "creationTime")]
    pub creation_time: DateTime<Utc>,
    #[serde(rename = "statusUpdateTime")]
    pub status_update_time: Option<DateTime<Utc>>,
    #[serde(rename = "acknowledgeTime")]
    pub acknowledge_time: Option<DateTime<Utc>>,
    #[serde(rename = "acknowledgeDetails")]
    pub acknowledge_details: Vec<AcknowledgementView>,
}

impl TaskView {
    fn new(task: Task, acknowledge_details: Vec<AcknowledgementView>) -> Self {
        Self {
            task_id: task.task_id,
            handover_id: task.handover_id,
            task_title: task.task_title,
            task_desc: task.task_desc,
            status: task.status,
            priority: task.priority,
            acknowledge_status: task.acknowledge_status,
            ack_desc: task.ack_desc,
            user_created_id: task.user_created_id,
            creation_time: task.creation_time,
            status_update_time: task.status_update_time,
            acknowledge_time: task.acknowledge_time,
            acknowledge_details,
        }
    }
}

/// Attaches each task's acknowledgement history, keeping task order.
pub fn build_task_views(tasks: Vec<Task>, acks: Vec<Acknowledgement>) -> Vec<TaskView> {
    let mut by_task: HashMap<i64, Vec<AcknowledgementView>> = HashMap::new();
    for ack in acks {
        by_task.entry(ack.task_id).or_default().push(ack.into());
    }

    tasks
        .into_iter()
        .map(|task| {
            let details = by_task.remove(&task.task_id).unwrap_or_default();
            TaskView::new(task, details)
        })
        .collect()
}

/// Splits tasks into one list per handover, in `handovers` order.
///
/// Handovers without tasks still get an (empty) list.
pub fn group_by_handover(handovers: &[TeamHandover], tasks: Vec<TaskView>) -> Vec<Vec<TaskView>> {
    let mut by_handover: HashMap<i64, Vec<TaskView>> = HashMap::new();
    for task in tasks {
        by_handover.entry(task.handover_id).or_default().push(task);
    }

    handovers
        .iter()
        .map(|h| by_handover.remove(&h.handover_id).unwrap_or_default())
        .collect()
}

/// Task row in the history view.
#[derive(Debug, Clone, Serialize)]
pub struct HistoryTaskView {
    #[serde(rename = "historyTaskId")]
    pub history_task_id: i64,
    pub task: String,
    #[serde(flatten)]
    pub details: TaskView,
}

impl From<TaskView> for HistoryTaskView {
    fn from(details: TaskView) -> Self {
        Self {
            history_task_id: details.task_id,
            task: details.task_desc.clone(),
            details,
        }
    }
}

/// Response of the handover and history views.
#[derive(Debug, Serialize)]
pub struct HandoverResponse<T> {
    #[serde(rename = "TeamHandoverDetails")]
    pub team_handover_details: Vec<HandoverDetailView>,
    #[serde(rename = "Tasksdata")]
    pub tasks_data: Vec<T>,
}

#[derive(Debug, Serialize)]
pub struct HandoverAllResponse {
    #[serde(rename = "TeamHandoverDetailsTask")]
    pub team_handover_details_task: Vec<Vec<TaskView>>,
}

/// Broker restart start request.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct BrokerRestartRequest {
    #[serde(flatten)]
    pub credentials: Credentials,

    #[validate(
        required(message = "setName is required"),
        length(min = 1, max = 100, message = "setName must be 1-100 characters")
    )]
    #[serde(default, rename = "setName")]
    pub set_name: Option<String>,

    /// Comma separated server list
    #[validate(required(message = "servers is required"))]
    #[serde(default)]
    pub servers: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct BrokerRestartResponse {
    pub message: String,
    #[serde(rename = "runId")]
    pub run_id: i64,
    #[serde(rename = "ackCode")]
    pub ack_code: String,
    #[serde(rename = "setName")]
    pub set_name: String,
    pub servers: Vec<String>,
    #[serde(rename = "startedAt")]
    pub started_at: DateTime<Utc>,
}

impl From<&BrokerRestartRun> for BrokerRestartResponse {
    fn from(run: &BrokerRestartRun) -> Self {
        Self {
            message: format!("Night Broker Restart Activity Started for {}", run.set_name),
            run_id: run.run_id,
            ack_code: run.ack_code.clone(),
            set_name: run.set_name.clone(),
            servers: run.servers.clone(),
            started_at: run.started_at,
        }
    }
}
