//! Catalogue entities the product grid reads and writes.
//!
//! The catalogue itself (categories, product classes, attributes, partners)
//! is administered elsewhere; this module only models what the grid needs:
//! - `Product` and its editable "attached" fields
//! - class-scoped dynamic attributes and their values
//! - per-partner stock records
//! - `ProductQuery`, the filter + prefetch description a storage executes
//!
//! Storage access goes through the [`storage::CatalogueStorage`] trait with a
//! PostgreSQL implementation ([`pg::PgCatalogueStorage`]) and an in-memory one
//! ([`mock::MockCatalogueStorage`]).

pub mod mock;
pub mod pg;
pub mod storage;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::fmt::Display;
use std::str::FromStr;

pub use mock::MockCatalogueStorage;
pub use pg::PgCatalogueStorage;
pub use storage::{CatalogueStorage, CatalogueStorageError};

pub type ProductId = i64;
pub type CategoryId = i64;
pub type ProductClassId = i64;
pub type AttributeId = i64;
pub type OptionId = i64;
pub type PartnerId = i64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub slug: String,
    pub parent_id: Option<CategoryId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProductClass {
    pub id: ProductClassId,
    pub name: String,
}

/// Value type of a dynamic attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeType {
    Text,
    Richtext,
    Integer,
    Float,
    Boolean,
    Date,
    Datetime,
    Option,
    MultiOption,
}

impl AttributeType {
    pub fn as_db_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Richtext => "richtext",
            Self::Integer => "integer",
            Self::Float => "float",
            Self::Boolean => "boolean",
            Self::Date => "date",
            Self::Datetime => "datetime",
            Self::Option => "option",
            Self::MultiOption => "multi_option",
        }
    }
}

impl FromStr for AttributeType {
    type Err = CatalogueStorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(Self::Text),
            "richtext" => Ok(Self::Richtext),
            "integer" => Ok(Self::Integer),
            "float" => Ok(Self::Float),
            "boolean" => Ok(Self::Boolean),
            "date" => Ok(Self::Date),
            "datetime" => Ok(Self::Datetime),
            "option" => Ok(Self::Option),
            "multi_option" => Ok(Self::MultiOption),
            other => Err(CatalogueStorageError::Db(format!(
                "unknown attribute type: {other}"
            ))),
        }
    }
}

impl Display for AttributeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_db_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttributeOption {
    pub id: OptionId,
    pub option: String,
}

/// An attribute declared by one product class.
///
/// The same `code` may be declared by several classes; each declaration is its
/// own row with its own id and option group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProductAttribute {
    pub id: AttributeId,
    pub product_class_id: ProductClassId,
    pub code: String,
    pub name: String,
    pub attribute_type: AttributeType,
    pub required: bool,
    /// Options of the attribute's option group, empty for non-option types.
    pub options: Vec<AttributeOption>,
}

impl ProductAttribute {
    pub fn option_by_id(&self, id: OptionId) -> Option<&AttributeOption> {
        self.options.iter().find(|option| option.id == id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AttributeValueData {
    Text(String),
    Richtext(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Date(NaiveDate),
    Datetime(DateTime<Utc>),
    Option(AttributeOption),
    MultiOption(Vec<AttributeOption>),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductAttributeValue {
    pub attribute_id: AttributeId,
    pub attribute_code: String,
    pub value: AttributeValueData,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Partner {
    pub id: PartnerId,
    pub code: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StockRecord {
    pub partner_id: PartnerId,
    pub partner_code: String,
    pub partner_sku: String,
    pub price: Option<Decimal>,
    pub num_in_stock: Option<i32>,
}

/// Input for creating or replacing a stock record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockRecordWrite {
    pub partner_sku: String,
    pub price: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductStructure {
    Standalone,
    Parent,
    Child,
}

impl ProductStructure {
    pub fn as_db_str(&self) -> &'static str {
        match self {
            Self::Standalone => "standalone",
            Self::Parent => "parent",
            Self::Child => "child",
        }
    }

    /// Children (variants) are edited through their parent and never listed.
    pub fn is_browsable(&self) -> bool {
        !matches!(self, Self::Child)
    }
}

impl FromStr for ProductStructure {
    type Err = CatalogueStorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "standalone" => Ok(Self::Standalone),
            "parent" => Ok(Self::Parent),
            "child" => Ok(Self::Child),
            other => Err(CatalogueStorageError::Db(format!(
                "unknown product structure: {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Product {
    pub id: ProductId,
    pub structure: ProductStructure,
    pub upc: String,
    pub title: String,
    pub slug: String,
    pub description: String,
    pub is_public: bool,
    pub is_discountable: bool,
    pub rating: Option<f64>,
    pub product_class_id: Option<ProductClassId>,
    pub date_created: DateTime<Utc>,
    pub date_updated: DateTime<Utc>,
}

impl Product {
    pub fn field_value(&self, field: ProductField) -> ProductFieldValue {
        match field {
            ProductField::Upc => ProductFieldValue::Upc(self.upc.clone()),
            ProductField::Title => ProductFieldValue::Title(self.title.clone()),
            ProductField::Slug => ProductFieldValue::Slug(self.slug.clone()),
            ProductField::Description => ProductFieldValue::Description(self.description.clone()),
            ProductField::IsPublic => ProductFieldValue::IsPublic(self.is_public),
            ProductField::IsDiscountable => ProductFieldValue::IsDiscountable(self.is_discountable),
            ProductField::Rating => ProductFieldValue::Rating(self.rating),
            ProductField::ProductClass => ProductFieldValue::ProductClass(self.product_class_id),
        }
    }

    pub fn apply(&mut self, value: ProductFieldValue) {
        match value {
            ProductFieldValue::Upc(upc) => self.upc = upc,
            ProductFieldValue::Title(title) => self.title = title,
            ProductFieldValue::Slug(slug) => self.slug = slug,
            ProductFieldValue::Description(description) => self.description = description,
            ProductFieldValue::IsPublic(is_public) => self.is_public = is_public,
            ProductFieldValue::IsDiscountable(is_discountable) => {
                self.is_discountable = is_discountable;
            }
            ProductFieldValue::Rating(rating) => self.rating = rating,
            ProductFieldValue::ProductClass(class_id) => self.product_class_id = class_id,
        }
    }

    /// Identifier used where a human readable product key is needed: the UPC,
    /// or the database id when the UPC is blank.
    pub fn identifier(&self) -> String {
        if self.upc.trim().is_empty() {
            self.id.to_string()
        } else {
            self.upc.clone()
        }
    }
}

/// Product fields that can be shown as attached grid columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductField {
    Upc,
    Title,
    Slug,
    Description,
    IsPublic,
    IsDiscountable,
    Rating,
    ProductClass,
}

impl ProductField {
    pub const ALL: [Self; 8] = [
        Self::Upc,
        Self::Title,
        Self::Slug,
        Self::Description,
        Self::IsPublic,
        Self::IsDiscountable,
        Self::Rating,
        Self::ProductClass,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            Self::Upc => "upc",
            Self::Title => "title",
            Self::Slug => "slug",
            Self::Description => "description",
            Self::IsPublic => "is_public",
            Self::IsDiscountable => "is_discountable",
            Self::Rating => "rating",
            Self::ProductClass => "product_class",
        }
    }

    /// Column label. Relation fields are labelled with the related entity.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Upc => "UPC",
            Self::Title => "Title",
            Self::Slug => "Slug",
            Self::Description => "Description",
            Self::IsPublic => "Is public",
            Self::IsDiscountable => "Is discountable?",
            Self::Rating => "Rating",
            Self::ProductClass => "Product type",
        }
    }

    pub fn is_relation(&self) -> bool {
        matches!(self, Self::ProductClass)
    }
}

impl FromStr for ProductField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|field| field.code() == s)
            .ok_or_else(|| format!("unknown product field: {s}"))
    }
}

impl Display for ProductField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// A typed value for one [`ProductField`].
#[derive(Debug, Clone, PartialEq)]
pub enum ProductFieldValue {
    Upc(String),
    Title(String),
    Slug(String),
    Description(String),
    IsPublic(bool),
    IsDiscountable(bool),
    Rating(Option<f64>),
    ProductClass(Option<ProductClassId>),
}

impl ProductFieldValue {
    pub fn field(&self) -> ProductField {
        match self {
            Self::Upc(_) => ProductField::Upc,
            Self::Title(_) => ProductField::Title,
            Self::Slug(_) => ProductField::Slug,
            Self::Description(_) => ProductField::Description,
            Self::IsPublic(_) => ProductField::IsPublic,
            Self::IsDiscountable(_) => ProductField::IsDiscountable,
            Self::Rating(_) => ProductField::Rating,
            Self::ProductClass(_) => ProductField::ProductClass,
        }
    }
}

/// A relation that is only present when the query asked for it.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Prefetched<T> {
    #[default]
    NotLoaded,
    Loaded(T),
}

impl<T> Prefetched<T> {
    pub fn get(&self) -> Option<&T> {
        match self {
            Self::Loaded(value) => Some(value),
            Self::NotLoaded => None,
        }
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self, Self::Loaded(_))
    }
}

/// A product together with the relations its query prefetched.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogueProduct {
    pub product: Product,
    pub product_class: Prefetched<Option<ProductClass>>,
    /// Attributes declared by the product's class (empty without a class).
    pub class_attributes: Prefetched<Vec<ProductAttribute>>,
    pub attribute_values: Prefetched<Vec<ProductAttributeValue>>,
    pub stockrecords: Prefetched<Vec<StockRecord>>,
}

impl CatalogueProduct {
    pub fn new(product: Product) -> Self {
        Self {
            product,
            product_class: Prefetched::NotLoaded,
            class_attributes: Prefetched::NotLoaded,
            attribute_values: Prefetched::NotLoaded,
            stockrecords: Prefetched::NotLoaded,
        }
    }
}

/// Relations to load alongside the products, in batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Prefetch {
    pub product_class: bool,
    pub class_attributes: bool,
    pub attribute_values: bool,
    pub stockrecords: bool,
}

/// Filter, ordering and prefetch description for listing products.
///
/// Products are always restricted to browsable ones and ordered by
/// `title, id`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProductQuery {
    /// `Some(ids)` keeps products assigned to any of `ids`; `Some([])` matches nothing.
    pub category_ids: Option<Vec<CategoryId>>,
    pub product_id: Option<ProductId>,
    pub offset: u64,
    pub limit: Option<u64>,
    pub prefetch: Prefetch,
}

impl ProductQuery {
    pub fn browsable() -> Self {
        Self::default()
    }

    pub fn in_categories(mut self, ids: Vec<CategoryId>) -> Self {
        self.category_ids = Some(ids);
        self
    }

    pub fn with_product(mut self, id: ProductId) -> Self {
        self.product_id = Some(id);
        self
    }

    pub fn paginate(mut self, offset: u64, limit: u64) -> Self {
        self.offset = offset;
        self.limit = Some(limit);
        self
    }

    /// Whether `product` passes the filter part of this query (not pagination).
    pub fn matches(&self, product: &Product, category_ids: &[CategoryId]) -> bool {
        if !product.structure.is_browsable() {
            return false;
        }
        if let Some(id) = self.product_id
            && product.id != id
        {
            return false;
        }
        match &self.category_ids {
            Some(wanted) => category_ids.iter().any(|id| wanted.contains(id)),
            None => true,
        }
    }
}
