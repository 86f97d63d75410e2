use axum::{
    Form, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::info;

use super::auth::RequireStaff;
use super::types::{ApiError, GridDocument, SaveDocument};
use super::{AppState, PREFIX};
use crate::catalogue::{CatalogueStorage, ProductId};
use crate::grid::{CellForm, FormDocument, GridCell, RawFormData, Table, TableScope};

/// The POST action that writes the cell; any other action only re-renders.
pub const SAVE_ACTION: &str = "save";

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub page: Option<u64>,
}

impl PageQuery {
    fn apply(&self, scope: TableScope) -> TableScope {
        match self.page {
            Some(page) => scope.page(page),
            None => scope,
        }
    }
}

pub fn cell_url(product_id: ProductId, code: &str) -> String {
    format!("{PREFIX}/cell/{product_id}/{code}/{SAVE_ACTION}")
}

fn check_cell_path(product_id: ProductId, code: &str) -> Result<(), ApiError> {
    if product_id <= 0 {
        return Err(ApiError::BadRequest(format!(
            "Invalid product id: {product_id}"
        )));
    }
    if code.trim().is_empty() {
        return Err(ApiError::BadRequest("Column code is required".to_string()));
    }
    Ok(())
}

pub async fn grid<S: CatalogueStorage>(
    _staff: RequireStaff,
    State(state): State<AppState<S>>,
    Query(query): Query<PageQuery>,
) -> Result<Json<GridDocument>, ApiError> {
    let scope = query.apply(TableScope::all());
    let table = Table::build(&state.storage, &state.options, scope).await?;
    Ok(Json(GridDocument::from_table(&table)?))
}

pub async fn category_grid<S: CatalogueStorage>(
    _staff: RequireStaff,
    State(state): State<AppState<S>>,
    Path(slug): Path<String>,
    Query(query): Query<PageQuery>,
) -> Result<Json<GridDocument>, ApiError> {
    let scope = query.apply(TableScope::category(slug));
    let table = Table::build(&state.storage, &state.options, scope).await?;
    Ok(Json(GridDocument::from_table(&table)?))
}

pub async fn cell_form<S: CatalogueStorage>(
    _staff: RequireStaff,
    State(state): State<AppState<S>>,
    Path((product_id, code)): Path<(ProductId, String)>,
) -> Result<Json<FormDocument>, ApiError> {
    check_cell_path(product_id, &code)?;
    let cell = Table::get_field(&state.storage, &state.options, product_id, &code).await?;
    let form = CellForm::new(cell, cell_url(product_id, &code))?;
    Ok(Json(form.document()?))
}

/// Binds the submitted form to the cell. With the `save` action a valid form
/// is written and the refreshed cell returned; an invalid one comes back
/// with its errors as 422.
pub async fn cell_submit<S: CatalogueStorage>(
    staff: RequireStaff,
    State(state): State<AppState<S>>,
    Path((product_id, code, action)): Path<(ProductId, String, String)>,
    Form(pairs): Form<Vec<(String, String)>>,
) -> Result<Response, ApiError> {
    check_cell_path(product_id, &code)?;
    let url = cell_url(product_id, &code);
    let cell = Table::get_field(&state.storage, &state.options, product_id, &code).await?;
    let mut form = CellForm::new(cell, url.clone())?;
    let valid = form.bind(RawFormData::from(pairs));

    if action != SAVE_ACTION {
        return Ok(Json(form.document()?).into_response());
    }
    if !valid {
        return Ok((StatusCode::UNPROCESSABLE_ENTITY, Json(form.document()?)).into_response());
    }

    let previous_value = form.cell().data()?;
    let outcome = form.save(&state.storage).await?;
    info!(
        product_id,
        code = %code,
        ?outcome,
        staff = %staff.username(),
        "Saved product table cell"
    );

    let cell = Table::get_field(&state.storage, &state.options, product_id, &code).await?;
    let value = cell.data()?;
    let form = CellForm::new(cell, url)?;

    Ok(Json(SaveDocument {
        productid: product_id,
        code,
        outcome,
        display: value.display(),
        value,
        previous_display: previous_value.display(),
        previous_value,
        form: form.document()?,
    })
    .into_response())
}

pub async fn export<S: CatalogueStorage>(
    _staff: RequireStaff,
    State(state): State<AppState<S>>,
    Query(query): Query<PageQuery>,
) -> Result<Json<Vec<Map<String, Value>>>, ApiError> {
    let scope = query.apply(TableScope::all());
    let table = Table::build(&state.storage, &state.options, scope).await?;
    Ok(Json(table.export_rows()?))
}

pub async fn export_category<S: CatalogueStorage>(
    _staff: RequireStaff,
    State(state): State<AppState<S>>,
    Path(slug): Path<String>,
    Query(query): Query<PageQuery>,
) -> Result<Json<Vec<Map<String, Value>>>, ApiError> {
    let scope = query.apply(TableScope::category(slug));
    let table = Table::build(&state.storage, &state.options, scope).await?;
    Ok(Json(table.export_rows()?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cell_paths_are_checked() {
        assert!(check_cell_path(1, "title").is_ok());
        assert!(matches!(check_cell_path(0, "title"), Err(ApiError::BadRequest(_))));
        assert!(matches!(check_cell_path(-4, "title"), Err(ApiError::BadRequest(_))));
        assert!(matches!(check_cell_path(1, "  "), Err(ApiError::BadRequest(_))));
    }

    #[test]
    fn cell_url_points_at_the_save_action() {
        assert_eq!(cell_url(7, "ACME"), "/dashboard/product_table/cell/7/ACME/save");
    }

    #[test]
    fn page_query_overrides_the_first_page() {
        let query = PageQuery { page: Some(3) };
        assert_eq!(query.apply(TableScope::all()).page, 3);
        let query = PageQuery { page: None };
        assert_eq!(query.apply(TableScope::all()).page, 1);
    }
}
