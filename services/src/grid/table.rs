use super::cell::{Cell, GridCell};
use super::column::Column;
use super::error::GridError;
use super::plugin::{PluginKind, PluginMode, load_plugins};
use super::row::Row;
use crate::catalogue::{CatalogueStorage, ProductField, ProductId, ProductQuery};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashMap;

pub const DEFAULT_PAGE_SIZE: u64 = 1000;

/// Site switches for building a table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableOptions {
    /// Product fields shown after `upc` and `title`.
    pub attached_fields: Vec<ProductField>,
    pub modes: HashMap<PluginKind, PluginMode>,
    pub page_size: u64,
}

impl Default for TableOptions {
    fn default() -> Self {
        Self {
            attached_fields: Vec::new(),
            modes: HashMap::new(),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl TableOptions {
    pub fn mode(&self, kind: PluginKind) -> PluginMode {
        self.modes.get(&kind).copied().unwrap_or_default()
    }

    pub fn with_mode(mut self, kind: PluginKind, mode: PluginMode) -> Self {
        self.modes.insert(kind, mode);
        self
    }

    pub fn with_attached_fields(mut self, fields: Vec<ProductField>) -> Self {
        self.attached_fields = fields;
        self
    }

    pub fn with_page_size(mut self, page_size: u64) -> Self {
        self.page_size = page_size;
        self
    }
}

/// Which products a table covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableScope {
    pub category_slug: Option<String>,
    pub product_id: Option<ProductId>,
    /// 1-based page number.
    pub page: u64,
}

impl Default for TableScope {
    fn default() -> Self {
        Self {
            category_slug: None,
            product_id: None,
            page: 1,
        }
    }
}

impl TableScope {
    /// Every browsable product. A grid opened without a category lists the
    /// whole catalogue rather than coming up empty.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn category(slug: impl Into<String>) -> Self {
        Self {
            category_slug: Some(slug.into()),
            ..Self::default()
        }
    }

    pub fn product(product_id: ProductId) -> Self {
        Self {
            product_id: Some(product_id),
            ..Self::default()
        }
    }

    pub fn page(mut self, page: u64) -> Self {
        self.page = page;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Page {
    pub number: u64,
    pub num_pages: u64,
    pub count: u64,
    /// Percentage of pages up to and including this one.
    pub progress: u64,
}

impl Page {
    /// The first page always exists, even without products.
    pub fn new(number: u64, count: u64, page_size: u64) -> Result<Self, GridError> {
        let num_pages = count.div_ceil(page_size.max(1)).max(1);
        if number == 0 || number > num_pages {
            return Err(GridError::InvalidPage(number));
        }
        Ok(Self {
            number,
            num_pages,
            count,
            progress: number * 100 / num_pages,
        })
    }

    pub fn offset(&self, page_size: u64) -> u64 {
        (self.number - 1) * page_size
    }
}

/// Columns and rows of one query scope.
#[derive(Debug)]
pub struct Table {
    columns: Vec<Column>,
    rows: Vec<Row>,
    page: Page,
}

impl Table {
    pub async fn build<S: CatalogueStorage>(
        storage: &S,
        options: &TableOptions,
        scope: TableScope,
    ) -> Result<Self, GridError> {
        let mut query = ProductQuery::browsable();
        if let Some(slug) = &scope.category_slug {
            let category = storage
                .category_by_slug(slug)
                .await?
                .ok_or_else(|| GridError::CategoryNotFound(slug.clone()))?;
            query = query.in_categories(storage.category_descendants(category.id).await?);
        }
        if let Some(product_id) = scope.product_id {
            query = query.with_product(product_id);
        }

        let plugins = load_plugins(storage, options).await?;
        for plugin in &plugins {
            plugin.widen_query(&mut query);
        }

        let count = storage.products_count(&query).await?;
        let page = Page::new(scope.page, count, options.page_size)?;
        let query = query.paginate(page.offset(options.page_size), options.page_size);

        let mut rows: Vec<Row> = storage
            .products_list(&query)
            .await?
            .into_iter()
            .map(Row::new)
            .collect();
        let columns: Vec<Column> = plugins
            .iter()
            .flat_map(|plugin| plugin.columns().iter().cloned())
            .collect();
        for plugin in &plugins {
            plugin.add_cells_to_rows(&mut rows);
        }

        let table = Self {
            columns,
            rows,
            page,
        };
        table.validate()?;

        tracing::debug!(
            rows = table.rows.len(),
            columns = table.columns.len(),
            page = page.number,
            num_pages = page.num_pages,
            "Built product table"
        );
        Ok(table)
    }

    /// The cell of `product_id` under `code`, without loading the whole grid.
    pub async fn get_field<S: CatalogueStorage>(
        storage: &S,
        options: &TableOptions,
        product_id: ProductId,
        code: &str,
    ) -> Result<Cell, GridError> {
        let table = Self::build(storage, options, TableScope::product(product_id)).await?;
        let row = table
            .rows
            .into_iter()
            .next()
            .ok_or(GridError::ProductNotFound(product_id))?;
        row.into_cell(code)
            .ok_or_else(|| GridError::ColumnNotFound(code.to_owned()))
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn page(&self) -> Page {
        self.page
    }

    pub fn column_by_code(&self, code: &str) -> Option<&Column> {
        self.columns.iter().find(|column| column.code() == code)
    }

    /// Checks that every row has one cell per column, in column order.
    pub fn validate(&self) -> Result<(), GridError> {
        let expected: Vec<&str> = self.columns.iter().map(Column::code).collect();
        for row in &self.rows {
            let actual: Vec<&str> = row.cells().iter().map(|cell| cell.code()).collect();
            if actual != expected {
                return Err(GridError::RowShape {
                    product_id: row.product_id(),
                    expected: expected.iter().map(|code| (*code).to_owned()).collect(),
                    actual: actual.iter().map(|code| (*code).to_owned()).collect(),
                });
            }
        }
        Ok(())
    }

    /// One object per row: `productid` plus the display string of every column.
    pub fn export_rows(&self) -> Result<Vec<Map<String, Value>>, GridError> {
        self.rows
            .iter()
            .map(|row| -> Result<Map<String, Value>, GridError> {
                let mut object = Map::new();
                object.insert("productid".to_owned(), Value::from(row.product_id()));
                for cell in row.cells() {
                    object.insert(cell.code().to_owned(), Value::String(cell.display()?));
                }
                Ok(object)
            })
            .collect()
    }
}
