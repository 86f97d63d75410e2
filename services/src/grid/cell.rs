//! Cells: the read/write view of one product under one column.
//!
//! Every cell kind answers the same three questions through [`GridCell`]:
//! what is the current value (`data`), which inputs edit it (`fields`) and
//! how a cleaned submission is written back (`save`).

use super::column::Column;
use super::display::CellValue;
use super::error::GridError;
use super::field::{Choice, CleanedData, FieldSet, FieldValue, FormField, Widget};
use super::plugin::PluginKind;
use super::row::RowProduct;
use crate::catalogue::{
    AttributeType, AttributeValueData, CatalogueStorage, ProductAttribute, ProductClass,
    ProductField, ProductFieldValue, ProductId, StockRecordWrite,
};
use rust_decimal::Decimal;
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;

pub const PRICE_FIELD: &str = "price";
pub const PARTNER_SKU_FIELD: &str = "partner_sku";

/// What a save did to the stored data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SaveOutcome {
    Unchanged,
    Updated,
    Created,
    Deleted,
}

pub trait GridCell {
    fn column(&self) -> &Column;

    fn product(&self) -> &RowProduct;

    fn read_only(&self) -> bool;

    fn code(&self) -> &str {
        self.column().code()
    }

    fn name(&self) -> &str {
        self.column().name()
    }

    fn kind(&self) -> PluginKind {
        self.column().kind()
    }

    fn product_id(&self) -> ProductId {
        self.product().id()
    }

    /// Whether the cell applies to its product at all.
    fn enabled(&self) -> Result<bool, GridError> {
        Ok(true)
    }

    fn data(&self) -> Result<CellValue, GridError>;

    /// Inputs editing this cell, pre-populated with the current value.
    fn fields(&self) -> Result<FieldSet, GridError>;

    fn save<S: CatalogueStorage>(
        &self,
        storage: &S,
        cleaned: &CleanedData,
    ) -> impl Future<Output = Result<SaveOutcome, GridError>> + Send;
}

fn ensure_writable(cell: &impl GridCell) -> Result<(), GridError> {
    if cell.read_only() {
        return Err(GridError::ReadOnly(cell.code().to_owned()));
    }
    if !cell.enabled()? {
        return Err(GridError::CellNotEditable(cell.code().to_owned()));
    }
    Ok(())
}

fn submitted<'a>(cleaned: &'a CleanedData, name: &str) -> &'a FieldValue {
    cleaned.get(name).unwrap_or(&FieldValue::Null)
}

/// A product field stored on the product row itself.
#[derive(Debug, Clone)]
pub struct AttachedCell {
    column: Column,
    field: ProductField,
    product: Arc<RowProduct>,
    read_only: bool,
    product_classes: Arc<[ProductClass]>,
}

impl AttachedCell {
    pub(crate) fn new(
        column: Column,
        field: ProductField,
        product: Arc<RowProduct>,
        read_only: bool,
        product_classes: Arc<[ProductClass]>,
    ) -> Self {
        Self {
            column,
            field,
            product,
            read_only,
            product_classes,
        }
    }

    pub fn field(&self) -> ProductField {
        self.field
    }

    fn widget(&self) -> Widget {
        match self.field {
            ProductField::Upc => Widget::Text {
                max_length: Some(64),
            },
            ProductField::Title | ProductField::Slug => Widget::Text {
                max_length: Some(255),
            },
            ProductField::Description => Widget::Textarea,
            ProductField::IsPublic | ProductField::IsDiscountable => Widget::Checkbox,
            ProductField::Rating => Widget::Float,
            ProductField::ProductClass => Widget::Select {
                choices: self
                    .product_classes
                    .iter()
                    .map(|class| Choice::new(class.id, class.name.clone()))
                    .collect(),
            },
        }
    }

    fn to_field_value(&self, value: &FieldValue) -> Result<ProductFieldValue, GridError> {
        let invalid = || GridError::invalid_value(self.code(), format!("unexpected value {value:?}"));
        let text = || match value {
            FieldValue::Text(text) => Ok(text.clone()),
            FieldValue::Null => Ok(String::new()),
            _ => Err(invalid()),
        };
        let flag = || match value {
            FieldValue::Boolean(flag) => Ok(*flag),
            FieldValue::Null => Ok(false),
            _ => Err(invalid()),
        };

        Ok(match self.field {
            ProductField::Upc => ProductFieldValue::Upc(text()?),
            ProductField::Title => {
                let title = text()?;
                if title.trim().is_empty() {
                    return Err(GridError::invalid_value(self.code(), "title cannot be blank"));
                }
                ProductFieldValue::Title(title)
            }
            ProductField::Slug => ProductFieldValue::Slug(text()?),
            ProductField::Description => ProductFieldValue::Description(text()?),
            ProductField::IsPublic => ProductFieldValue::IsPublic(flag()?),
            ProductField::IsDiscountable => ProductFieldValue::IsDiscountable(flag()?),
            ProductField::Rating => ProductFieldValue::Rating(match value {
                FieldValue::Null => None,
                FieldValue::Float(rating) => Some(*rating),
                FieldValue::Integer(rating) => Some(*rating as f64),
                _ => return Err(invalid()),
            }),
            ProductField::ProductClass => ProductFieldValue::ProductClass(match value {
                FieldValue::Null => None,
                FieldValue::Choice(id) => Some(*id),
                _ => return Err(invalid()),
            }),
        })
    }
}

impl GridCell for AttachedCell {
    fn column(&self) -> &Column {
        &self.column
    }

    fn product(&self) -> &RowProduct {
        &self.product
    }

    fn read_only(&self) -> bool {
        self.read_only
    }

    fn data(&self) -> Result<CellValue, GridError> {
        Ok(match self.product.product().field_value(self.field) {
            ProductFieldValue::Upc(text)
            | ProductFieldValue::Title(text)
            | ProductFieldValue::Slug(text)
            | ProductFieldValue::Description(text) => CellValue::Text(text),
            ProductFieldValue::IsPublic(flag) | ProductFieldValue::IsDiscountable(flag) => {
                CellValue::Boolean(flag)
            }
            ProductFieldValue::Rating(rating) => rating.map_or(CellValue::Null, CellValue::Float),
            // Relations show the related entity's name.
            ProductFieldValue::ProductClass(_) => self
                .product
                .product_class()?
                .map_or(CellValue::Null, |class| CellValue::Text(class.name.clone())),
        })
    }

    fn fields(&self) -> Result<FieldSet, GridError> {
        let initial = match self.product.product().field_value(self.field) {
            ProductFieldValue::Upc(text)
            | ProductFieldValue::Title(text)
            | ProductFieldValue::Slug(text)
            | ProductFieldValue::Description(text) => FieldValue::Text(text),
            ProductFieldValue::IsPublic(flag) | ProductFieldValue::IsDiscountable(flag) => {
                FieldValue::Boolean(flag)
            }
            ProductFieldValue::Rating(rating) => rating.map_or(FieldValue::Null, FieldValue::Float),
            ProductFieldValue::ProductClass(id) => id.map_or(FieldValue::Null, FieldValue::Choice),
        };
        let field = FormField::new(self.name(), self.widget())
            .required(self.field == ProductField::Title)
            .initial(initial);

        Ok(FieldSet::from([(self.code().to_owned(), field)]))
    }

    async fn save<S: CatalogueStorage>(
        &self,
        storage: &S,
        cleaned: &CleanedData,
    ) -> Result<SaveOutcome, GridError> {
        ensure_writable(self)?;
        let value = self.to_field_value(submitted(cleaned, self.code()))?;
        if self.product.product().field_value(self.field) == value {
            tracing::debug!(product_id = self.product_id(), code = self.code(), "Attached field unchanged");
            return Ok(SaveOutcome::Unchanged);
        }

        storage.product_update_field(self.product_id(), value).await?;
        tracing::info!(product_id = self.product_id(), code = self.code(), "Updated attached field");
        Ok(SaveOutcome::Updated)
    }
}

/// A class-scoped dynamic attribute.
#[derive(Debug, Clone)]
pub struct AttributeCell {
    column: Column,
    product: Arc<RowProduct>,
    read_only: bool,
    /// Declaration the column was created from; used for the inputs when the
    /// product's own class does not declare the code.
    column_attribute: Arc<ProductAttribute>,
}

impl AttributeCell {
    pub(crate) fn new(
        column: Column,
        product: Arc<RowProduct>,
        read_only: bool,
        column_attribute: Arc<ProductAttribute>,
    ) -> Self {
        Self {
            column,
            product,
            read_only,
            column_attribute,
        }
    }

    /// The product's own declaration of the code, else the column's.
    pub fn attribute(&self) -> Result<&ProductAttribute, GridError> {
        Ok(self
            .product
            .declared_attribute(self.code())?
            .unwrap_or(self.column_attribute.as_ref()))
    }

    fn to_value_data(
        &self,
        attribute: &ProductAttribute,
        value: &FieldValue,
    ) -> Result<Option<AttributeValueData>, GridError> {
        if value.is_empty() {
            return Ok(None);
        }
        let option = |id: i64| {
            attribute.option_by_id(id).cloned().ok_or_else(|| {
                GridError::invalid_value(self.code(), format!("option {id} does not exist"))
            })
        };

        let data = match (attribute.attribute_type, value) {
            (AttributeType::Text, FieldValue::Text(text)) => AttributeValueData::Text(text.clone()),
            (AttributeType::Richtext, FieldValue::Text(text)) => {
                AttributeValueData::Richtext(text.clone())
            }
            (AttributeType::Integer, FieldValue::Integer(number)) => {
                AttributeValueData::Integer(*number)
            }
            (AttributeType::Float, FieldValue::Float(number)) => AttributeValueData::Float(*number),
            (AttributeType::Float, FieldValue::Integer(number)) => {
                AttributeValueData::Float(*number as f64)
            }
            (AttributeType::Boolean, FieldValue::Boolean(flag)) => {
                AttributeValueData::Boolean(*flag)
            }
            (AttributeType::Date, FieldValue::Date(date)) => AttributeValueData::Date(*date),
            (AttributeType::Datetime, FieldValue::Datetime(datetime)) => {
                AttributeValueData::Datetime(*datetime)
            }
            (AttributeType::Option, FieldValue::Choice(id)) => {
                AttributeValueData::Option(option(*id)?)
            }
            (AttributeType::MultiOption, FieldValue::Choices(ids)) => {
                AttributeValueData::MultiOption(
                    ids.iter().map(|id| option(*id)).collect::<Result<_, _>>()?,
                )
            }
            (attribute_type, value) => {
                return Err(GridError::invalid_value(
                    self.code(),
                    format!("expected a {attribute_type} value, got {value:?}"),
                ));
            }
        };
        Ok(Some(data))
    }
}

impl GridCell for AttributeCell {
    fn column(&self) -> &Column {
        &self.column
    }

    fn product(&self) -> &RowProduct {
        &self.product
    }

    fn read_only(&self) -> bool {
        self.read_only
    }

    fn enabled(&self) -> Result<bool, GridError> {
        Ok(self.product.declared_attribute(self.code())?.is_some())
    }

    fn data(&self) -> Result<CellValue, GridError> {
        let Some(value) = self.product.attribute_value(self.code())? else {
            return Ok(CellValue::Null);
        };
        Ok(match &value.value {
            AttributeValueData::Text(text) | AttributeValueData::Richtext(text) => {
                CellValue::Text(text.clone())
            }
            AttributeValueData::Integer(number) => CellValue::Integer(*number),
            AttributeValueData::Float(number) => CellValue::Float(*number),
            AttributeValueData::Boolean(flag) => CellValue::Boolean(*flag),
            AttributeValueData::Date(date) => CellValue::Date(*date),
            AttributeValueData::Datetime(datetime) => CellValue::Datetime(*datetime),
            AttributeValueData::Option(option) => CellValue::Text(option.option.clone()),
            AttributeValueData::MultiOption(options) if options.is_empty() => CellValue::Null,
            AttributeValueData::MultiOption(options) => CellValue::Text(
                options
                    .iter()
                    .map(|option| option.option.as_str())
                    .collect::<Vec<_>>()
                    .join(", "),
            ),
        })
    }

    fn fields(&self) -> Result<FieldSet, GridError> {
        let attribute = self.attribute()?;
        let choices = || {
            attribute
                .options
                .iter()
                .map(|option| Choice::new(option.id, option.option.clone()))
                .collect()
        };
        let widget = match attribute.attribute_type {
            AttributeType::Text => Widget::Text { max_length: None },
            AttributeType::Richtext => Widget::Textarea,
            AttributeType::Integer => Widget::Integer,
            AttributeType::Float => Widget::Float,
            AttributeType::Boolean => Widget::Checkbox,
            AttributeType::Date => Widget::Date,
            AttributeType::Datetime => Widget::Datetime,
            AttributeType::Option => Widget::Select { choices: choices() },
            AttributeType::MultiOption => Widget::SelectMultiple { choices: choices() },
        };
        let initial = match self.product.attribute_value(self.code())?.map(|value| &value.value) {
            None => FieldValue::Null,
            Some(AttributeValueData::Text(text) | AttributeValueData::Richtext(text)) => {
                FieldValue::Text(text.clone())
            }
            Some(AttributeValueData::Integer(number)) => FieldValue::Integer(*number),
            Some(AttributeValueData::Float(number)) => FieldValue::Float(*number),
            Some(AttributeValueData::Boolean(flag)) => FieldValue::Boolean(*flag),
            Some(AttributeValueData::Date(date)) => FieldValue::Date(*date),
            Some(AttributeValueData::Datetime(datetime)) => FieldValue::Datetime(*datetime),
            Some(AttributeValueData::Option(option)) => FieldValue::Choice(option.id),
            Some(AttributeValueData::MultiOption(options)) => {
                FieldValue::Choices(options.iter().map(|option| option.id).collect())
            }
        };
        // An unticked box is a value, so checkboxes are never required.
        let required = attribute.required && attribute.attribute_type != AttributeType::Boolean;
        let field = FormField::new(attribute.name.clone(), widget)
            .required(required)
            .initial(initial);

        Ok(FieldSet::from([(self.code().to_owned(), field)]))
    }

    async fn save<S: CatalogueStorage>(
        &self,
        storage: &S,
        cleaned: &CleanedData,
    ) -> Result<SaveOutcome, GridError> {
        ensure_writable(self)?;
        let attribute = self
            .product
            .declared_attribute(self.code())?
            .ok_or_else(|| GridError::MissingAttribute(self.code().to_owned()))?;
        let existed = self.product.attribute_value(self.code())?.is_some();
        let product_id = self.product_id();

        let outcome = match self.to_value_data(attribute, submitted(cleaned, self.code()))? {
            None => {
                if storage.attribute_value_delete(product_id, attribute.id).await? {
                    SaveOutcome::Deleted
                } else {
                    SaveOutcome::Unchanged
                }
            }
            Some(data) => {
                storage
                    .attribute_value_upsert(product_id, attribute.id, data)
                    .await?;
                if existed {
                    SaveOutcome::Updated
                } else {
                    SaveOutcome::Created
                }
            }
        };

        tracing::info!(product_id, code = self.code(), ?outcome, "Saved attribute value");
        Ok(outcome)
    }
}

/// The price a partner sells the product at.
#[derive(Debug, Clone)]
pub struct PartnerCell {
    column: Column,
    product: Arc<RowProduct>,
    read_only: bool,
}

impl PartnerCell {
    pub(crate) fn new(column: Column, product: Arc<RowProduct>, read_only: bool) -> Self {
        Self {
            column,
            product,
            read_only,
        }
    }
}

impl GridCell for PartnerCell {
    fn column(&self) -> &Column {
        &self.column
    }

    fn product(&self) -> &RowProduct {
        &self.product
    }

    fn read_only(&self) -> bool {
        self.read_only
    }

    fn data(&self) -> Result<CellValue, GridError> {
        Ok(self
            .product
            .stockrecord(self.code())?
            .and_then(|record| record.price)
            .map_or(CellValue::Null, CellValue::Decimal))
    }

    fn fields(&self) -> Result<FieldSet, GridError> {
        let record = self.product.stockrecord(self.code())?;
        let price = FormField::new(
            "Price",
            Widget::Decimal {
                max_digits: 12,
                decimal_places: 2,
            },
        )
        .initial(
            record
                .and_then(|record| record.price)
                .map_or(FieldValue::Null, FieldValue::Decimal),
        );
        let sku = FormField::new(
            "Partner SKU",
            Widget::Text {
                max_length: Some(128),
            },
        )
        .initial(record.map_or(FieldValue::Null, |record| {
            FieldValue::Text(record.partner_sku.clone())
        }));

        Ok(FieldSet::from([
            (PRICE_FIELD.to_owned(), price),
            (PARTNER_SKU_FIELD.to_owned(), sku),
        ]))
    }

    async fn save<S: CatalogueStorage>(
        &self,
        storage: &S,
        cleaned: &CleanedData,
    ) -> Result<SaveOutcome, GridError> {
        ensure_writable(self)?;
        let price = match submitted(cleaned, PRICE_FIELD) {
            FieldValue::Null => None,
            FieldValue::Decimal(price) => Some(*price),
            FieldValue::Integer(price) => Some(Decimal::from(*price)),
            other => {
                return Err(GridError::invalid_value(
                    PRICE_FIELD,
                    format!("expected a decimal, got {other:?}"),
                ));
            }
        };
        let existing_sku = self
            .product
            .stockrecord(self.code())?
            .map(|record| record.partner_sku.clone());
        let product_id = self.product_id();

        let partner = storage
            .partner_by_code(self.code())
            .await?
            .ok_or_else(|| GridError::MissingPartner(self.code().to_owned()))?;

        let outcome = match price {
            None => {
                if storage.stockrecord_delete(product_id, partner.id).await? {
                    SaveOutcome::Deleted
                } else {
                    SaveOutcome::Unchanged
                }
            }
            Some(price) => {
                let partner_sku = match submitted(cleaned, PARTNER_SKU_FIELD) {
                    FieldValue::Text(sku) if !sku.trim().is_empty() => sku.trim().to_owned(),
                    _ => existing_sku
                        .clone()
                        .filter(|sku| !sku.is_empty())
                        .unwrap_or_else(|| self.product.product().identifier()),
                };
                storage
                    .stockrecord_upsert(product_id, partner.id, StockRecordWrite { partner_sku, price })
                    .await?;
                if existing_sku.is_some() {
                    SaveOutcome::Updated
                } else {
                    SaveOutcome::Created
                }
            }
        };

        tracing::info!(product_id, partner = self.code(), ?outcome, "Saved stock record");
        Ok(outcome)
    }
}

/// A cell of any kind.
#[derive(Debug, Clone)]
pub enum Cell {
    Attached(AttachedCell),
    Attribute(AttributeCell),
    Partner(PartnerCell),
}

impl Cell {
    pub fn display(&self) -> Result<String, GridError> {
        Ok(self.data()?.display())
    }
}

impl GridCell for Cell {
    fn column(&self) -> &Column {
        match self {
            Self::Attached(cell) => cell.column(),
            Self::Attribute(cell) => cell.column(),
            Self::Partner(cell) => cell.column(),
        }
    }

    fn product(&self) -> &RowProduct {
        match self {
            Self::Attached(cell) => cell.product(),
            Self::Attribute(cell) => cell.product(),
            Self::Partner(cell) => cell.product(),
        }
    }

    fn read_only(&self) -> bool {
        match self {
            Self::Attached(cell) => cell.read_only(),
            Self::Attribute(cell) => cell.read_only(),
            Self::Partner(cell) => cell.read_only(),
        }
    }

    fn enabled(&self) -> Result<bool, GridError> {
        match self {
            Self::Attached(cell) => cell.enabled(),
            Self::Attribute(cell) => cell.enabled(),
            Self::Partner(cell) => cell.enabled(),
        }
    }

    fn data(&self) -> Result<CellValue, GridError> {
        match self {
            Self::Attached(cell) => cell.data(),
            Self::Attribute(cell) => cell.data(),
            Self::Partner(cell) => cell.data(),
        }
    }

    fn fields(&self) -> Result<FieldSet, GridError> {
        match self {
            Self::Attached(cell) => cell.fields(),
            Self::Attribute(cell) => cell.fields(),
            Self::Partner(cell) => cell.fields(),
        }
    }

    async fn save<S: CatalogueStorage>(
        &self,
        storage: &S,
        cleaned: &CleanedData,
    ) -> Result<SaveOutcome, GridError> {
        match self {
            Self::Attached(cell) => cell.save(storage, cleaned).await,
            Self::Attribute(cell) => cell.save(storage, cleaned).await,
            Self::Partner(cell) => cell.save(storage, cleaned).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalogue::{MockCatalogueStorage, Prefetch, ProductQuery};

    async fn load(storage: &MockCatalogueStorage, product_id: ProductId) -> Arc<RowProduct> {
        let mut query = ProductQuery::browsable().with_product(product_id);
        query.prefetch = Prefetch {
            product_class: true,
            class_attributes: true,
            attribute_values: true,
            stockrecords: true,
        };
        let entry = storage.products_list(&query).await.unwrap().remove(0);
        Arc::new(RowProduct::new(entry))
    }

    fn cleaned(pairs: &[(&str, FieldValue)]) -> CleanedData {
        pairs
            .iter()
            .map(|(name, value)| ((*name).to_owned(), value.clone()))
            .collect()
    }

    #[tokio::test]
    async fn attached_save_only_writes_changes() {
        let storage = MockCatalogueStorage::new();
        let id = storage.add_product("U1", "Boot", None);
        let cell = AttachedCell::new(
            Column::new("title", "Title", PluginKind::Attached),
            ProductField::Title,
            load(&storage, id).await,
            false,
            Arc::from(Vec::new()),
        );

        let same = cleaned(&[("title", FieldValue::Text("Boot".into()))]);
        assert_eq!(cell.save(&storage, &same).await.unwrap(), SaveOutcome::Unchanged);
        assert_eq!(storage.write_count(), 0);

        let renamed = cleaned(&[("title", FieldValue::Text("Hiking boot".into()))]);
        assert_eq!(cell.save(&storage, &renamed).await.unwrap(), SaveOutcome::Updated);
        assert_eq!(storage.write_count(), 1);
        assert_eq!(storage.product(id).unwrap().title, "Hiking boot");
        assert_eq!(storage.product(id).unwrap().upc, "U1");
    }

    #[tokio::test]
    async fn relation_shows_related_name() {
        let storage = MockCatalogueStorage::new();
        let class = storage.add_product_class("Shoe");
        let id = storage.add_product("U1", "Boot", Some(class));
        let classes: Arc<[ProductClass]> = storage.product_classes_list().await.unwrap().into();
        let cell = AttachedCell::new(
            Column::new("product_class", "Product type", PluginKind::Attached),
            ProductField::ProductClass,
            load(&storage, id).await,
            false,
            classes,
        );

        assert_eq!(cell.data().unwrap(), CellValue::Text("Shoe".into()));
        let fields = cell.fields().unwrap();
        assert_eq!(fields["product_class"].initial, FieldValue::Choice(class));
    }

    #[tokio::test]
    async fn undeclared_attribute_is_not_editable() {
        let storage = MockCatalogueStorage::new();
        let shoe = storage.add_product_class("Shoe");
        let book = storage.add_product_class("Book");
        let color = storage.add_attribute(shoe, "color", "Color", AttributeType::Text, &[]);
        let id = storage.add_product("B1", "Novel", Some(book));
        let cell = AttributeCell::new(
            Column::new("color", "Color", PluginKind::Attribute),
            load(&storage, id).await,
            false,
            Arc::new(color),
        );

        assert!(!cell.enabled().unwrap());
        assert_eq!(cell.data().unwrap(), CellValue::Null);
        let result = cell
            .save(&storage, &cleaned(&[("color", FieldValue::Text("Red".into()))]))
            .await;
        assert!(matches!(result, Err(GridError::CellNotEditable(code)) if code == "color"));
        assert_eq!(storage.write_count(), 0);
    }

    #[tokio::test]
    async fn read_only_cells_refuse_saves() {
        let storage = MockCatalogueStorage::new();
        storage.add_partner("ACME", "Acme");
        let id = storage.add_product("U1", "Boot", None);
        let cell = PartnerCell::new(
            Column::new("ACME", "Acme", PluginKind::Partner),
            load(&storage, id).await,
            true,
        );

        let result = cell
            .save(&storage, &cleaned(&[(PRICE_FIELD, FieldValue::Decimal(Decimal::ONE))]))
            .await;
        assert!(matches!(result, Err(GridError::ReadOnly(_))));
        assert_eq!(storage.write_count(), 0);
    }

    #[tokio::test]
    async fn multi_option_labels_are_joined() {
        let storage = MockCatalogueStorage::new();
        let shoe = storage.add_product_class("Shoe");
        let sizes = storage.add_attribute(
            shoe,
            "sizes",
            "Sizes",
            AttributeType::MultiOption,
            &["41", "42", "43"],
        );
        let id = storage.add_product("U1", "Boot", Some(shoe));
        storage.seed_attribute_value(
            id,
            &sizes,
            AttributeValueData::MultiOption(sizes.options[..2].to_vec()),
        );
        let cell = AttributeCell::new(
            Column::new("sizes", "Sizes", PluginKind::Attribute),
            load(&storage, id).await,
            false,
            Arc::new(sizes.clone()),
        );

        assert_eq!(cell.data().unwrap(), CellValue::Text("41, 42".into()));
        assert_eq!(
            cell.fields().unwrap()["sizes"].initial,
            FieldValue::Choices(vec![sizes.options[0].id, sizes.options[1].id])
        );
    }

    #[tokio::test]
    async fn missing_partner_is_a_fault() {
        let storage = MockCatalogueStorage::new();
        let id = storage.add_product("U1", "Boot", None);
        let cell = PartnerCell::new(
            Column::new("GONE", "Gone", PluginKind::Partner),
            load(&storage, id).await,
            false,
        );

        let result = cell
            .save(&storage, &cleaned(&[(PRICE_FIELD, FieldValue::Decimal(Decimal::ONE))]))
            .await;
        assert!(matches!(result, Err(GridError::MissingPartner(code)) if code == "GONE"));
    }
}
