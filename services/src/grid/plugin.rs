//! Column groups. Each plugin owns some columns, tells the product query
//! which relations its cells read, and attaches one cell per row per column.

use super::cell::{AttachedCell, AttributeCell, Cell, PartnerCell};
use super::column::Column;
use super::error::GridError;
use super::row::Row;
use super::table::TableOptions;
use crate::catalogue::{CatalogueStorage, ProductAttribute, ProductClass, ProductField, ProductQuery};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt::Display;
use std::str::FromStr;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PluginKind {
    Attached,
    Attribute,
    Partner,
}

impl PluginKind {
    /// Plugins in column order.
    pub const ALL: [Self; 3] = [Self::Attached, Self::Attribute, Self::Partner];

    pub fn code(&self) -> &'static str {
        match self {
            Self::Attached => "attached",
            Self::Attribute => "attribute",
            Self::Partner => "partner",
        }
    }
}

impl FromStr for PluginKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.code() == s)
            .ok_or_else(|| format!("unknown plugin: {s}"))
    }
}

impl Display for PluginKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PluginMode {
    #[default]
    Enabled,
    ReadOnly,
    Disabled,
}

pub trait FieldsPlugin: Send + Sync {
    fn kind(&self) -> PluginKind;

    fn read_only(&self) -> bool;

    fn columns(&self) -> &[Column];

    /// Requests the relations this plugin's cells read.
    fn widen_query(&self, query: &mut ProductQuery);

    fn add_cells_to_rows(&self, rows: &mut [Row]);
}

/// Product fields: `upc`, `title`, then the configured extra fields.
pub struct AttachedFieldsPlugin {
    fields: Vec<ProductField>,
    columns: Vec<Column>,
    read_only: bool,
    product_classes: Arc<[ProductClass]>,
}

impl AttachedFieldsPlugin {
    pub async fn load<S: CatalogueStorage>(
        storage: &S,
        extra_fields: &[ProductField],
        read_only: bool,
    ) -> Result<Self, GridError> {
        let mut fields = vec![ProductField::Upc, ProductField::Title];
        for field in extra_fields {
            if !fields.contains(field) {
                fields.push(*field);
            }
        }

        let product_classes: Arc<[ProductClass]> = if fields.iter().any(ProductField::is_relation) {
            storage.product_classes_list().await?.into()
        } else {
            Arc::from(Vec::new())
        };
        let columns = fields
            .iter()
            .map(|field| Column::new(field.code(), field.label(), PluginKind::Attached))
            .collect();

        Ok(Self {
            fields,
            columns,
            read_only,
            product_classes,
        })
    }
}

impl FieldsPlugin for AttachedFieldsPlugin {
    fn kind(&self) -> PluginKind {
        PluginKind::Attached
    }

    fn read_only(&self) -> bool {
        self.read_only
    }

    fn columns(&self) -> &[Column] {
        &self.columns
    }

    fn widen_query(&self, query: &mut ProductQuery) {
        if self.fields.iter().any(ProductField::is_relation) {
            query.prefetch.product_class = true;
        }
    }

    fn add_cells_to_rows(&self, rows: &mut [Row]) {
        for row in rows {
            for (field, column) in self.fields.iter().zip(&self.columns) {
                let cell = AttachedCell::new(
                    column.clone(),
                    *field,
                    Arc::clone(row.product()),
                    self.read_only,
                    Arc::clone(&self.product_classes),
                );
                row.add_cell(Cell::Attached(cell));
            }
        }
    }
}

/// One column per distinct attribute code across all product classes.
pub struct AttributeFieldsPlugin {
    columns: Vec<Column>,
    attributes: Vec<Arc<ProductAttribute>>,
    read_only: bool,
}

impl AttributeFieldsPlugin {
    pub async fn load<S: CatalogueStorage>(storage: &S, read_only: bool) -> Result<Self, GridError> {
        let mut seen = HashSet::new();
        // Listed by code then id, so the first declaration of a code names the column.
        let attributes: Vec<Arc<ProductAttribute>> = storage
            .attributes_list()
            .await?
            .into_iter()
            .filter(|attribute| seen.insert(attribute.code.clone()))
            .map(Arc::new)
            .collect();
        let columns = attributes
            .iter()
            .map(|attribute| {
                Column::new(attribute.code.clone(), attribute.name.clone(), PluginKind::Attribute)
            })
            .collect();

        Ok(Self {
            columns,
            attributes,
            read_only,
        })
    }
}

impl FieldsPlugin for AttributeFieldsPlugin {
    fn kind(&self) -> PluginKind {
        PluginKind::Attribute
    }

    fn read_only(&self) -> bool {
        self.read_only
    }

    fn columns(&self) -> &[Column] {
        &self.columns
    }

    fn widen_query(&self, query: &mut ProductQuery) {
        query.prefetch.product_class = true;
        query.prefetch.class_attributes = true;
        query.prefetch.attribute_values = true;
    }

    fn add_cells_to_rows(&self, rows: &mut [Row]) {
        for row in rows {
            for (attribute, column) in self.attributes.iter().zip(&self.columns) {
                let cell = AttributeCell::new(
                    column.clone(),
                    Arc::clone(row.product()),
                    self.read_only,
                    Arc::clone(attribute),
                );
                row.add_cell(Cell::Attribute(cell));
            }
        }
    }
}

/// One price column per partner, ordered by partner name.
pub struct PartnerFieldsPlugin {
    columns: Vec<Column>,
    read_only: bool,
}

impl PartnerFieldsPlugin {
    pub async fn load<S: CatalogueStorage>(storage: &S, read_only: bool) -> Result<Self, GridError> {
        let columns = storage
            .partners_list()
            .await?
            .into_iter()
            .map(|partner| Column::new(partner.code, partner.name, PluginKind::Partner))
            .collect();

        Ok(Self { columns, read_only })
    }
}

impl FieldsPlugin for PartnerFieldsPlugin {
    fn kind(&self) -> PluginKind {
        PluginKind::Partner
    }

    fn read_only(&self) -> bool {
        self.read_only
    }

    fn columns(&self) -> &[Column] {
        &self.columns
    }

    fn widen_query(&self, query: &mut ProductQuery) {
        query.prefetch.stockrecords = true;
    }

    fn add_cells_to_rows(&self, rows: &mut [Row]) {
        for row in rows {
            for column in &self.columns {
                let cell = PartnerCell::new(column.clone(), Arc::clone(row.product()), self.read_only);
                row.add_cell(Cell::Partner(cell));
            }
        }
    }
}

/// Loads every plugin that is not disabled, in column order.
pub async fn load_plugins<S: CatalogueStorage>(
    storage: &S,
    options: &TableOptions,
) -> Result<Vec<Box<dyn FieldsPlugin>>, GridError> {
    let mut plugins: Vec<Box<dyn FieldsPlugin>> = Vec::new();
    for kind in PluginKind::ALL {
        let read_only = match options.mode(kind) {
            PluginMode::Disabled => continue,
            PluginMode::ReadOnly => true,
            PluginMode::Enabled => false,
        };
        let plugin: Box<dyn FieldsPlugin> = match kind {
            PluginKind::Attached => Box::new(
                AttachedFieldsPlugin::load(storage, &options.attached_fields, read_only).await?,
            ),
            PluginKind::Attribute => Box::new(AttributeFieldsPlugin::load(storage, read_only).await?),
            PluginKind::Partner => Box::new(PartnerFieldsPlugin::load(storage, read_only).await?),
        };
        plugins.push(plugin);
    }
    Ok(plugins)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalogue::{AttributeType, MockCatalogueStorage};

    #[test]
    fn plugin_codes_parse() {
        for kind in PluginKind::ALL {
            assert_eq!(kind.code().parse::<PluginKind>(), Ok(kind));
        }
        assert!("prices".parse::<PluginKind>().is_err());
    }

    #[tokio::test]
    async fn attached_columns_start_with_upc_and_title() {
        let storage = MockCatalogueStorage::new();
        let plugin = AttachedFieldsPlugin::load(
            &storage,
            &[ProductField::Title, ProductField::ProductClass, ProductField::IsPublic],
            false,
        )
        .await
        .unwrap();

        let codes: Vec<_> = plugin.columns().iter().map(Column::code).collect();
        assert_eq!(codes, ["upc", "title", "product_class", "is_public"]);
        assert_eq!(plugin.columns()[2].name(), "Product type");

        let mut query = ProductQuery::browsable();
        plugin.widen_query(&mut query);
        assert!(query.prefetch.product_class);
        assert!(!query.prefetch.stockrecords);
    }

    #[tokio::test]
    async fn attribute_columns_are_distinct_by_code() {
        let storage = MockCatalogueStorage::new();
        let shoe = storage.add_product_class("Shoe");
        let shirt = storage.add_product_class("Shirt");
        storage.add_attribute(shoe, "size", "Shoe size", AttributeType::Integer, &[]);
        storage.add_attribute(shirt, "size", "Shirt size", AttributeType::Text, &[]);
        storage.add_attribute(shirt, "color", "Color", AttributeType::Text, &[]);

        let plugin = AttributeFieldsPlugin::load(&storage, false).await.unwrap();
        let columns: Vec<_> = plugin
            .columns()
            .iter()
            .map(|column| (column.code(), column.name()))
            .collect();
        assert_eq!(columns, [("color", "Color"), ("size", "Shoe size")]);
    }

    #[tokio::test]
    async fn disabled_plugins_are_skipped() {
        let storage = MockCatalogueStorage::new();
        storage.add_partner("ACME", "Acme");
        let options = TableOptions::default()
            .with_mode(PluginKind::Partner, PluginMode::Disabled)
            .with_mode(PluginKind::Attribute, PluginMode::ReadOnly);

        let plugins = load_plugins(&storage, &options).await.unwrap();
        let kinds: Vec<_> = plugins.iter().map(|plugin| (plugin.kind(), plugin.read_only())).collect();
        assert_eq!(
            kinds,
            [(PluginKind::Attached, false), (PluginKind::Attribute, true)]
        );
    }
}
