//! Shift handover handlers.
//!
//! Every view authenticates with the `uid`/`password` pair carried in the
//! JSON body and scopes results to the user's team unless they are an admin.

use axum::{extract::State, Json};
use validator::Validate;

use crate::api::schemas::{
    build_task_views, group_by_handover, non_blank, BrokerRestartRequest, BrokerRestartResponse,
    Credentials, HandoverAllResponse, HandoverDetailView, HandoverResponse, HistoryTaskView,
    SaveTaskRequest, SaveTaskResponse, TaskView,
};
use crate::api::state::AppState;
use crate::error::{AppError, AppResult, ValidationErrorExt};
use crate::models::{
    parse_server_list, AuthenticatedUser, BrokerRestartRepository, HandoverRepository,
    NewBrokerRestartRun, TaskRepository, TeamHandover, UserRepository,
};

async fn authenticate(state: &AppState, credentials: &Credentials) -> AppResult<AuthenticatedUser> {
    let (uid, password) = credentials.pair()?;
    UserRepository::authenticate(&state.db, uid, password).await
}

fn ensure_team_access(user: &AuthenticatedUser, team_id: i64) -> AppResult<()> {
    if user.can_access_team(team_id) {
        Ok(())
    } else {
        tracing::warn!(uid = %user.uid, team_id, "Cross-team handover access rejected");
        Err(AppError::Forbidden(
            "Handover belongs to another team".to_string(),
        ))
    }
}

/// Loads tasks of `handovers` with their acknowledgement history.
async fn load_task_views(
    state: &AppState,
    handovers: &[TeamHandover],
    terminal_only: bool,
) -> AppResult<Vec<TaskView>> {
    let handover_ids: Vec<i64> = handovers.iter().map(|h| h.handover_id).collect();
    let mut tasks = TaskRepository::list_for_handovers(&state.db, &handover_ids).await?;
    if terminal_only {
        tasks.retain(|t| t.parsed_status().is_some_and(|s| s.is_terminal()));
    }

    let task_ids: Vec<i64> = tasks.iter().map(|t| t.task_id).collect();
    let acks = TaskRepository::acknowledgements_for(&state.db, &task_ids).await?;

    Ok(build_task_views(tasks, acks))
}

/// Task create/update handler.
///
/// Creates a task when `task_id` is absent, otherwise replaces the task's
/// fields and records an acknowledgement when one is given.
///
/// # Route
///
/// `POST /shiftHandover/saveNew_task/`
pub async fn save_task(
    State(state): State<AppState>,
    Json(req_body): Json<SaveTaskRequest>,
) -> AppResult<Json<SaveTaskResponse>> {
    // 1. Validation
    req_body.credentials.pair()?;
    req_body.validate().map_err(|e| e.to_validation_error())?;

    // 2. Authentication
    let user = authenticate(&state, &req_body.credentials).await?;

    // 3. Update
    if let Some(task_id) = req_body.task_id {
        let update = req_body.to_update()?;
        let team_id = TaskRepository::team_of(&state.db, task_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Task {task_id} not found")))?;
        ensure_team_access(&user, team_id)?;

        let task = TaskRepository::update(&state.db, task_id, &update, user.user_id).await?;
        tracing::info!(
            task_id = task.task_id,
            status = %task.status,
            acknowledged = update.records_acknowledgement(),
            uid = %user.uid,
            "Task updated"
        );
        return Ok(Json(SaveTaskResponse::updated(task.task_id)));
    }

    // 4. Create
    let new_task = req_body.to_new_task(user.user_id)?;
    let handover = HandoverRepository::find_by_id(&state.db, new_task.handover_id)
        .await?
        .ok_or_else(|| {
            AppError::NotFound(format!("Handover {} not found", new_task.handover_id))
        })?;
    ensure_team_access(&user, handover.team_id)?;
    if !handover.is_active {
        return Err(AppError::BadRequest(format!(
            "Handover {} is closed",
            handover.handover_id
        )));
    }

    let task = TaskRepository::create(&state.db, &new_task).await?;
    tracing::info!(
        task_id = task.task_id,
        handover_id = task.handover_id,
        uid = %user.uid,
        "Task created"
    );

    Ok(Json(SaveTaskResponse::created(task.task_id)))
}

/// Active handovers and their tasks.
///
/// # Route
///
/// `POST /shiftHandover/get_Handover/`
pub async fn get_handover(
    State(state): State<AppState>,
    Json(credentials): Json<Credentials>,
) -> AppResult<Json<HandoverResponse<TaskView>>> {
    let user = authenticate(&state, &credentials).await?;

    let handovers = HandoverRepository::list_visible(&state.db, &user, true).await?;
    let tasks = load_task_views(&state, &handovers, false).await?;

    Ok(Json(HandoverResponse {
        team_handover_details: handovers.iter().map(HandoverDetailView::from).collect(),
        tasks_data: tasks,
    }))
}

/// Every visible handover with its tasks, one list per handover.
///
/// # Route
///
/// `POST /shiftHandover/get_Handover_All/`
pub async fn get_handover_all(
    State(state): State<AppState>,
    Json(credentials): Json<Credentials>,
) -> AppResult<Json<HandoverAllResponse>> {
    let user = authenticate(&state, &credentials).await?;

    let handovers = HandoverRepository::list_visible(&state.db, &user, false).await?;
    let tasks = load_task_views(&state, &handovers, false).await?;

    Ok(Json(HandoverAllResponse {
        team_handover_details_task: group_by_handover(&handovers, tasks),
    }))
}

/// Completed and closed tasks of every visible handover.
///
/// # Route
///
/// `POST /shiftHandover/get_historyHandover/`
pub async fn get_history_handover(
    State(state): State<AppState>,
    Json(credentials): Json<Credentials>,
) -> AppResult<Json<HandoverResponse<HistoryTaskView>>> {
    let user = authenticate(&state, &credentials).await?;

    let handovers = HandoverRepository::list_visible(&state.db, &user, false).await?;
    let tasks = load_task_views(&state, &handovers, true).await?;

    Ok(Json(HandoverResponse {
        team_handover_details: handovers.iter().map(HandoverDetailView::from).collect(),
        tasks_data: tasks.into_iter().map(HistoryTaskView::from).collect(),
    }))
}

/// Starts a night broker restart and notifies support.
///
/// # Route
///
/// `POST /shiftHandover/startBrokerRestartTask/`
pub async fn start_broker_restart(
    State(state): State<AppState>,
    Json(req_body): Json<BrokerRestartRequest>,
) -> AppResult<Json<BrokerRestartResponse>> {
    // 1. Validation
    req_body.credentials.pair()?;
    req_body.validate().map_err(|e| e.to_validation_error())?;

    let set_name = non_blank(req_body.set_name.as_deref())
        .ok_or_else(|| AppError::Validation("setName is required".to_string()))?;
    let servers = parse_server_list(req_body.servers.as_deref().unwrap_or_default());
    if servers.is_empty() {
        return Err(AppError::Validation(
            "servers must list at least one server".to_string(),
        ));
    }

    // 2. Authentication
    let user = authenticate(&state, &req_body.credentials).await?;

    // 3. Record run
    let new_run = NewBrokerRestartRun {
        set_name,
        servers,
        operator_id: user.user_id,
    };
    let run = BrokerRestartRepository::create(&state.db, &new_run).await?;

    tracing::info!(
        run_id = run.run_id,
        set_name = %run.set_name,
        ack_code = %run.ack_code,
        servers = run.servers.len(),
        uid = %user.uid,
        "Broker restart started"
    );

    // 4. Respond first, notify support in the background
    let response = BrokerRestartResponse::from(&run);
    run.spawn_support_notification(user.uid);

    Ok(Json(response))
}
