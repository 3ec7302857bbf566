pub mod admin;
pub mod contacts;
pub mod dashboard;
pub mod estimates;
pub mod health;
pub mod projects;
pub mod quotations;
pub mod settings;
pub mod tasks;

use axum::{
    routing::{get, patch, post, put},
    Router,
};
use std::sync::Arc;

use crate::app::AppState;

/// Build the API router with all routes
pub fn api_router() -> Router<Arc<AppState>> {
    Router::new()
        // Public routes
        .route("/health", get(health::health_check))
        .route("/settings", get(settings::get_public_settings))
        .route("/contacts", post(contacts::submit_contact))
        .route("/estimates", post(estimates::submit_estimate))
        .route("/estimates/preview", post(estimates::preview_estimate))
        // Public quotation share link
        .route("/q/:token", get(quotations::view_shared_quotation))
        .route("/q/:token/pdf", get(quotations::shared_quotation_pdf))
        .route("/q/:token/respond", post(quotations::respond_to_quotation))
        .nest("/admin", admin_router())
}

/// Back-office routes; everything but login requires an admin session
fn admin_router() -> Router<Arc<AppState>> {
    Router::new()
        // Session and accounts
        .route("/login", post(admin::login))
        .route("/me", get(admin::get_me))
        .route("/me/password", put(admin::change_password))
        .route("/users", get(admin::list_admins).post(admin::create_admin))
        .route("/users/:id", patch(admin::update_admin))
        .route("/dashboard", get(dashboard::dashboard_stats))
        // Contacts
        .route("/contacts", get(contacts::list_contacts))
        .route(
            "/contacts/:id",
            get(contacts::get_contact).delete(contacts::delete_contact),
        )
        .route("/contacts/:id/status", patch(contacts::update_contact_status))
        // Estimates
        .route("/estimates", get(estimates::list_estimates))
        .route(
            "/estimates/:id",
            get(estimates::get_estimate).delete(estimates::delete_estimate),
        )
        .route(
            "/estimates/:id/status",
            patch(estimates::update_estimate_status),
        )
        // Quotations
        .route(
            "/quotations",
            get(quotations::list_quotations).post(quotations::create_quotation),
        )
        .route(
            "/quotations/:id",
            get(quotations::get_quotation)
                .patch(quotations::update_quotation)
                .delete(quotations::delete_quotation),
        )
        .route(
            "/quotations/:id/status",
            patch(quotations::update_quotation_status),
        )
        .route("/quotations/:id/pdf", get(quotations::quotation_pdf))
        .route("/quotations/:id/send", post(quotations::send_quotation))
        .route(
            "/quotations/:id/share-link",
            post(quotations::regenerate_share_link),
        )
        .route(
            "/quotations/:id/project",
            post(projects::create_project_from_quotation),
        )
        // Projects and their tasks
        .route(
            "/projects",
            get(projects::list_projects).post(projects::create_project),
        )
        .route(
            "/projects/:id",
            get(projects::get_project)
                .patch(projects::update_project)
                .delete(projects::delete_project),
        )
        .route(
            "/projects/:id/tasks",
            get(tasks::list_project_tasks).post(tasks::create_task),
        )
        .route("/tasks", get(tasks::list_all_tasks))
        .route(
            "/tasks/:id",
            get(tasks::get_task)
                .patch(tasks::update_task)
                .delete(tasks::delete_task),
        )
        // Site settings
        .route(
            "/settings",
            get(settings::get_settings).put(settings::update_settings),
        )
}
