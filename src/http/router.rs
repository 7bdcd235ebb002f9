//! Router configuration for the HTTP API.

use axum::{
    routing::{delete, get, post, put},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{self, accounts, attendance, auth, dashboard, directory, events, reports};
use super::state::AppState;

/// Create the main application router with all routes and middleware.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api = Router::new()
        // Authentication
        .route("/auth/login", post(auth::login))
        .route("/auth/me", get(auth::me))
        // Directory
        .route("/students", get(directory::list_students).post(directory::create_student))
        .route(
            "/students/{id}",
            get(directory::get_student)
                .put(directory::update_student)
                .delete(directory::delete_student),
        )
        .route("/students/{id}/parents", post(directory::add_student_parent))
        .route("/student-parents/{id}", delete(directory::remove_student_parent))
        .route("/teachers", get(directory::list_teachers).post(directory::create_teacher))
        .route(
            "/teachers/{id}",
            get(directory::get_teacher)
                .put(directory::update_teacher)
                .delete(directory::delete_teacher),
        )
        .route("/groups", get(directory::list_groups).post(directory::create_group))
        .route(
            "/groups/{id}",
            get(directory::get_group)
                .put(directory::update_group)
                .delete(directory::delete_group),
        )
        .route("/parents", get(directory::list_parents).post(directory::create_parent))
        .route(
            "/parents/{id}",
            get(directory::get_parent)
                .put(directory::update_parent)
                .delete(directory::delete_parent),
        )
        .route("/search", get(directory::search))
        // Attendance
        .route("/attendance", get(attendance::list_attendance).post(attendance::mark_attendance))
        .route("/attendance/roster", get(attendance::roster))
        .route("/attendance/bulk", post(attendance::bulk_mark))
        .route(
            "/attendance/{id}",
            get(attendance::get_attendance)
                .put(attendance::update_attendance)
                .delete(attendance::delete_attendance),
        )
        .route("/attendance/{id}/status", put(attendance::set_attendance_status))
        // Events
        .route("/events", get(events::list_events).post(events::create_event))
        .route(
            "/events/{id}",
            get(events::get_event).put(events::update_event).delete(events::delete_event),
        )
        // Reports and dashboards
        .route("/reports/{kind}", get(reports::get_report))
        .route("/dashboard", get(dashboard::dashboard))
        .route("/dashboard/charts", get(dashboard::charts))
        .route("/stats", get(dashboard::statistics))
        .route("/home", get(dashboard::home))
        // Account administration
        .route("/accounts", get(accounts::list_accounts).post(accounts::create_account))
        .route(
            "/accounts/{id}",
            get(accounts::get_account)
                .put(accounts::update_account)
                .delete(accounts::delete_account),
        )
        .route("/accounts/{id}/password", put(accounts::change_password))
        .route("/accounts/{id}/activate", post(accounts::activate_account))
        .route("/accounts/{id}/deactivate", post(accounts::deactivate_account));

    Router::new()
        .route("/health", get(handlers::health_check))
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
