//! The product table dashboard.
//!
//! All routes are nested under [`PREFIX`] and require a superuser token
//! (see [`auth::RequireStaff`]). Responses are JSON documents:
//!
//! - `GET  /`                                  grid of all browsable products
//! - `GET  /category/{slug}`                   grid of a category and its descendants
//! - `GET  /cell/{product_id}/{code}`          edit form of one cell
//! - `POST /cell/{product_id}/{code}/{action}` bind the form; `save` writes it
//! - `GET  /export`, `GET /export/{slug}`      display strings per row
//!
//! Grid routes accept `?page=N`.

pub mod auth;
pub mod handlers;
pub mod types;

use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;

use crate::catalogue::CatalogueStorage;
use crate::grid::TableOptions;

pub use auth::{ISSUER, RequireStaff, StaffClaims, issue_staff_token};

pub const PREFIX: &str = "/dashboard/product_table";

/// Application state shared by the dashboard handlers.
#[derive(Clone)]
pub struct AppState<S> {
    pub storage: S,
    pub options: Arc<TableOptions>,
}

impl<S> AppState<S> {
    pub fn new(storage: S, options: TableOptions) -> Self {
        Self {
            storage,
            options: Arc::new(options),
        }
    }
}

pub fn routes<S>() -> Router<AppState<S>>
where
    S: CatalogueStorage,
{
    Router::new()
        .route("/", get(handlers::grid::<S>))
        .route("/category/{slug}", get(handlers::category_grid::<S>))
        .route("/cell/{product_id}/{code}", get(handlers::cell_form::<S>))
        .route(
            "/cell/{product_id}/{code}/{action}",
            post(handlers::cell_submit::<S>),
        )
        .route("/export", get(handlers::export::<S>))
        .route("/export/{slug}", get(handlers::export_category::<S>))
}
