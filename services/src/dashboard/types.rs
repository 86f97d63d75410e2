//! Response documents and error mapping for the dashboard routes.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::catalogue::ProductId;
use crate::grid::{
    Cell, CellValue, Column, FormDocument, GridCell, GridError, Page, Row, SaveOutcome, Table,
};

/// Generic error body for dashboard routes.
#[derive(Debug, Serialize)]
pub struct DashboardErrorResponse {
    pub error: String,
    pub message: String,
}

impl DashboardErrorResponse {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            error: "not_found".to_string(),
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            error: "bad_request".to_string(),
            message: message.into(),
        }
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self {
            error: "forbidden".to_string(),
            message: message.into(),
        }
    }

    pub fn unprocessable(message: impl Into<String>) -> Self {
        Self {
            error: "invalid_form".to_string(),
            message: message.into(),
        }
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self {
            error: "internal_error".to_string(),
            message: message.into(),
        }
    }
}

/// Handler error: either a bad request or a grid fault.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Grid(GridError),
}

impl From<GridError> for ApiError {
    fn from(err: GridError) -> Self {
        Self::Grid(err)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Grid(err) => match err {
                GridError::ProductNotFound(_)
                | GridError::ColumnNotFound(_)
                | GridError::CategoryNotFound(_)
                | GridError::InvalidPage(_) => StatusCode::NOT_FOUND,
                GridError::CellNotEditable(_) | GridError::ReadOnly(_) => StatusCode::FORBIDDEN,
                GridError::InvalidValue { .. } | GridError::InvalidForm => {
                    StatusCode::UNPROCESSABLE_ENTITY
                }
                GridError::Storage(_)
                | GridError::NotPrefetched(_)
                | GridError::MissingAttribute(_)
                | GridError::MissingPartner(_)
                | GridError::RowShape { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            ApiError::BadRequest(message) => DashboardErrorResponse::bad_request(message),
            ApiError::Grid(err) => match status {
                StatusCode::NOT_FOUND => DashboardErrorResponse::not_found(err.to_string()),
                StatusCode::FORBIDDEN => DashboardErrorResponse::forbidden(err.to_string()),
                StatusCode::UNPROCESSABLE_ENTITY => {
                    DashboardErrorResponse::unprocessable(err.to_string())
                }
                _ => {
                    tracing::error!(error = %err, "Product table request failed");
                    DashboardErrorResponse::internal_error("Failed to process product table")
                }
            },
        };
        (status, Json(body)).into_response()
    }
}

#[derive(Debug, Serialize)]
pub struct CellDocument {
    pub code: String,
    pub value: CellValue,
    pub display: String,
    pub enabled: bool,
    pub read_only: bool,
}

impl CellDocument {
    pub fn from_cell(cell: &Cell) -> Result<Self, GridError> {
        let value = cell.data()?;
        Ok(Self {
            code: cell.code().to_owned(),
            display: value.display(),
            value,
            enabled: cell.enabled()?,
            read_only: cell.read_only(),
        })
    }
}

#[derive(Debug, Serialize)]
pub struct RowDocument {
    pub productid: ProductId,
    pub cells: Vec<CellDocument>,
}

impl RowDocument {
    pub fn from_row(row: &Row) -> Result<Self, GridError> {
        Ok(Self {
            productid: row.product_id(),
            cells: row
                .cells()
                .iter()
                .map(CellDocument::from_cell)
                .collect::<Result<_, _>>()?,
        })
    }
}

/// The whole grid for one page.
#[derive(Debug, Serialize)]
pub struct GridDocument {
    pub columns: Vec<Column>,
    pub rows: Vec<RowDocument>,
    pub page: Page,
}

impl GridDocument {
    pub fn from_table(table: &Table) -> Result<Self, GridError> {
        Ok(Self {
            columns: table.columns().to_vec(),
            rows: table
                .rows()
                .iter()
                .map(RowDocument::from_row)
                .collect::<Result<_, _>>()?,
            page: table.page(),
        })
    }
}

/// Answer to a successful save: the refreshed cell and its form.
#[derive(Debug, Serialize)]
pub struct SaveDocument {
    pub productid: ProductId,
    pub code: String,
    pub outcome: SaveOutcome,
    pub value: CellValue,
    pub display: String,
    pub previous_value: CellValue,
    pub previous_display: String,
    pub form: FormDocument,
}
