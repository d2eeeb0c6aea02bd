//! 라우트 설정 모듈.
//!
//! The route table is declared once as [`RouteSpec`] constants. The router
//! and the name lookups ([`reverse`], [`resolve`]) both read from it.

use axum::{
    extract::DefaultBodyLimit,
    http::Method,
    middleware,
    routing::{get, post},
    Router,
};

use crate::api::handlers::{
    data_search, file_upload, get_handover, get_handover_all, get_history_handover,
    health_handler, readiness_handler, save_task, start_broker_restart, update_annotation,
};
use crate::api::middlewares::jwt_auth;
use crate::api::state::AppState;
use crate::config::APP_CONFIG;

/// Mount point of the shift handover views.
pub const HANDOVER_MOUNT: &str = "/shiftHandover";

/// Mount point of the project roster views.
pub const ROSTER_MOUNT: &str = "/projectRoster";

/// One named route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteSpec {
    /// Name used for reverse lookup
    pub name: &'static str,
    /// Prefix the route is nested under, empty for top-level routes
    pub mount: &'static str,
    /// Path inside the mount
    pub path: &'static str,
    pub method: Method,
    /// Handler bound to the route
    pub view: &'static str,
}

impl RouteSpec {
    /// Full request path, mount included.
    pub fn full_path(&self) -> String {
        format!("{}{}", self.mount, self.path)
    }
}

pub const SAVE_NEW_TASK: RouteSpec = RouteSpec {
    name: "saveNewTask",
    mount: HANDOVER_MOUNT,
    path: "/saveNew_task/",
    method: Method::POST,
    view: "save_task",
};

pub const GET_HANDOVER: RouteSpec = RouteSpec {
    name: "getHandover",
    mount: HANDOVER_MOUNT,
    path: "/get_Handover/",
    method: Method::POST,
    view: "get_handover",
};

pub const GET_HANDOVER_ALL: RouteSpec = RouteSpec {
    name: "getHandoverAll",
    mount: HANDOVER_MOUNT,
    path: "/get_Handover_All/",
    method: Method::POST,
    view: "get_handover_all",
};

pub const GET_HISTORY_HANDOVER: RouteSpec = RouteSpec {
    name: "getHistoryHandover",
    mount: HANDOVER_MOUNT,
    path: "/get_historyHandover/",
    method: Method::POST,
    view: "get_history_handover",
};

pub const START_BROKER_RESTART: RouteSpec = RouteSpec {
    name: "startBrokerRestart",
    mount: HANDOVER_MOUNT,
    path: "/startBrokerRestartTask/",
    method: Method::POST,
    view: "start_broker_restart",
};

pub const FILE_UPLOAD: RouteSpec = RouteSpec {
    name: "file-upload",
    mount: ROSTER_MOUNT,
    path: "/upload/",
    method: Method::POST,
    view: "file_upload",
};

pub const DATA_SEARCH: RouteSpec = RouteSpec {
    name: "data-search",
    mount: ROSTER_MOUNT,
    path: "/search/",
    method: Method::GET,
    view: "data_search",
};

pub const UPDATE_ANNOTATION: RouteSpec = RouteSpec {
    name: "update_annotation",
    mount: ROSTER_MOUNT,
    path: "/update_annotation/",
    method: Method::POST,
    view: "update_annotation",
};

pub const HEALTH: RouteSpec = RouteSpec {
    name: "health",
    mount: "",
    path: "/health",
    method: Method::GET,
    view: "health_handler",
};

pub const READY: RouteSpec = RouteSpec {
    name: "ready",
    mount: "",
    path: "/ready",
    method: Method::GET,
    view: "readiness_handler",
};

/// Every declared route.
pub static ROUTES: [RouteSpec; 10] = [
    SAVE_NEW_TASK,
    GET_HANDOVER,
    GET_HANDOVER_ALL,
    GET_HISTORY_HANDOVER,
    START_BROKER_RESTART,
    FILE_UPLOAD,
    DATA_SEARCH,
    UPDATE_ANNOTATION,
    HEALTH,
    READY,
];

/// Full path of the route called `name`.
pub fn reverse(name: &str) -> Option<String> {
    ROUTES
        .iter()
        .find(|route| route.name == name)
        .map(RouteSpec::full_path)
}

/// Route bound to the full request path `path`.
pub fn resolve(path: &str) -> Option<&'static RouteSpec> {
    ROUTES.iter().find(|route| {
        path.strip_prefix(route.mount)
            .is_some_and(|rest| rest == route.path)
    })
}

/// Creates and configures all application routes.
///
/// # Routes
///
/// ## Health Check Routes
/// - `GET /health` - Liveness probe
/// - `GET /ready` - Readiness probe
///
/// ## Shift Handover (credentials in body)
/// - `POST /shiftHandover/saveNew_task/`
/// - `POST /shiftHandover/get_Handover/`
/// - `POST /shiftHandover/get_Handover_All/`
/// - `POST /shiftHandover/get_historyHandover/`
/// - `POST /shiftHandover/startBrokerRestartTask/`
///
/// ## Project Roster (requires JWT authentication)
/// - `POST /projectRoster/upload/`
/// - `GET /projectRoster/search/`
/// - `POST /projectRoster/update_annotation/`
pub fn create_routes(state: AppState) -> Router {
    let handover_routes = Router::new()
        .route(SAVE_NEW_TASK.path, post(save_task))
        .route(GET_HANDOVER.path, post(get_handover))
        .route(GET_HANDOVER_ALL.path, post(get_handover_all))
        .route(GET_HISTORY_HANDOVER.path, post(get_history_handover))
        .route(START_BROKER_RESTART.path, post(start_broker_restart));

    let roster_routes = Router::new()
        .route(
            FILE_UPLOAD.path,
            post(file_upload).layer(DefaultBodyLimit::max(APP_CONFIG.upload_max_bytes)),
        )
        .route(DATA_SEARCH.path, get(data_search))
        .route(UPDATE_ANNOTATION.path, post(update_annotation))
        .route_layer(middleware::from_fn(jwt_auth));

    Router::new()
        // Health check routes (no auth required)
        .route(HEALTH.path, get(health_handler))
        .route(READY.path, get(readiness_handler))
        .nest(HANDOVER_MOUNT, handover_routes)
        .nest(ROSTER_MOUNT, roster_routes)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_reverse_known_names() {
        assert_eq!(
            reverse("saveNewTask").as_deref(),
            Some("/shiftHandover/saveNew_task/")
        );
        assert_eq!(
            reverse("file-upload").as_deref(),
            Some("/projectRoster/upload/")
        );
        assert_eq!(reverse("health").as_deref(), Some("/health"));
    }

    #[test]
    fn test_reverse_unknown_name() {
        assert!(reverse("deleteEverything").is_none());
    }

    #[test]
    fn test_resolve_round_trips_every_route() {
        for route in &ROUTES {
            let path = reverse(route.name).unwrap();
            let resolved = resolve(&path).unwrap();
            assert_eq!(resolved.name, route.name);
            assert_eq!(resolved.view, route.view);
        }
    }

    #[test]
    fn test_resolve_requires_exact_path() {
        // 끝 슬래시까지 일치해야 함
        assert!(resolve("/shiftHandover/saveNew_task").is_none());
        assert!(resolve("/shiftHandover/savenew_task/").is_none());
        assert!(resolve("/saveNew_task/").is_none());
    }

    #[test]
    fn test_route_names_and_paths_unique() {
        let names: HashSet<&str> = ROUTES.iter().map(|r| r.name).collect();
        let paths: HashSet<String> = ROUTES.iter().map(RouteSpec::full_path).collect();
        assert_eq!(names.len(), ROUTES.len());
        assert_eq!(paths.len(), ROUTES.len());
    }

    #[test]
    fn test_handover_routes_are_post() {
        for route in ROUTES.iter().filter(|r| r.mount == HANDOVER_MOUNT) {
            assert_eq!(route.method, Method::POST, "{}", route.name);
        }
        assert_eq!(DATA_SEARCH.method, Method::GET);
    }
}
