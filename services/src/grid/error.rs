use crate::catalogue::{CatalogueStorageError, ProductId};

/// Error type for building the grid and saving cells.
#[derive(Debug, thiserror::Error)]
pub enum GridError {
    #[error(transparent)]
    Storage(#[from] CatalogueStorageError),

    #[error("Product {0} not found")]
    ProductNotFound(ProductId),

    #[error("Column '{0}' not found")]
    ColumnNotFound(String),

    #[error("Category '{0}' not found")]
    CategoryNotFound(String),

    #[error("Page {0} does not exist")]
    InvalidPage(u64),

    /// The product's class does not declare the attribute behind this cell.
    #[error("Cell '{0}' is not editable for this product")]
    CellNotEditable(String),

    #[error("Column '{0}' is read-only")]
    ReadOnly(String),

    /// A cell read a relation the product query did not load.
    #[error("Relation '{0}' was not prefetched")]
    NotPrefetched(&'static str),

    #[error("Attribute '{0}' no longer exists")]
    MissingAttribute(String),

    #[error("Partner '{0}' no longer exists")]
    MissingPartner(String),

    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },

    /// A form was saved without binding valid data first.
    #[error("Form is not valid")]
    InvalidForm,

    #[error("Row for product {product_id} has cells {actual:?}, expected {expected:?}")]
    RowShape {
        product_id: ProductId,
        expected: Vec<String>,
        actual: Vec<String>,
    },
}

impl GridError {
    pub(crate) fn invalid_value(field: &str, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.to_owned(),
            message: message.into(),
        }
    }
}
