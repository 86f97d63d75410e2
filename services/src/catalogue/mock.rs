//! In-memory `CatalogueStorage` for tests and local demos.
//!
//! Besides the trait, the mock exposes builder methods to seed a catalogue and
//! inspectors to assert on what a save did. Every successful write bumps
//! [`MockCatalogueStorage::write_count`].

use super::{
    AttributeId, AttributeOption, AttributeType, AttributeValueData, CatalogueProduct,
    CatalogueStorage, CatalogueStorageError, Category, CategoryId, Partner, PartnerId, Prefetched,
    Product, ProductAttribute, ProductAttributeValue, ProductClass, ProductClassId,
    ProductFieldValue, ProductId, ProductQuery, ProductStructure, StockRecord, StockRecordWrite,
};
use chrono::Utc;
use std::sync::{Arc, RwLock};

#[derive(Debug, Default)]
struct Catalogue {
    next_id: i64,
    categories: Vec<Category>,
    classes: Vec<ProductClass>,
    attributes: Vec<ProductAttribute>,
    products: Vec<Product>,
    product_categories: Vec<(ProductId, CategoryId)>,
    values: Vec<(ProductId, ProductAttributeValue)>,
    partners: Vec<Partner>,
    stockrecords: Vec<(ProductId, StockRecord)>,
    writes: usize,
}

/// Multi-option sets read back ordered by label, then id.
fn normalized(value: AttributeValueData) -> AttributeValueData {
    match value {
        AttributeValueData::MultiOption(mut options) => {
            options.sort_by(|a, b| a.option.cmp(&b.option).then(a.id.cmp(&b.id)));
            AttributeValueData::MultiOption(options)
        }
        other => other,
    }
}

impl Catalogue {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn categories_of(&self, product_id: ProductId) -> Vec<CategoryId> {
        self.product_categories
            .iter()
            .filter(|(product, _)| *product == product_id)
            .map(|(_, category)| *category)
            .collect()
    }

    fn filtered(&self, query: &ProductQuery) -> Vec<&Product> {
        let mut products: Vec<&Product> = self
            .products
            .iter()
            .filter(|product| query.matches(product, &self.categories_of(product.id)))
            .collect();
        products.sort_by(|a, b| a.title.cmp(&b.title).then(a.id.cmp(&b.id)));
        products
    }

    fn attribute(&self, id: AttributeId) -> Result<&ProductAttribute, CatalogueStorageError> {
        self.attributes
            .iter()
            .find(|attribute| attribute.id == id)
            .ok_or_else(|| CatalogueStorageError::NotFound(format!("attribute {id}")))
    }

    fn ensure_product(&self, id: ProductId) -> Result<(), CatalogueStorageError> {
        if self.products.iter().any(|product| product.id == id) {
            Ok(())
        } else {
            Err(CatalogueStorageError::NotFound(format!("product {id}")))
        }
    }

    fn load(&self, product: &Product, query: &ProductQuery) -> CatalogueProduct {
        let mut entry = CatalogueProduct::new(product.clone());
        let prefetch = query.prefetch;

        if prefetch.product_class {
            let class = product
                .product_class_id
                .and_then(|id| self.classes.iter().find(|class| class.id == id).cloned());
            entry.product_class = Prefetched::Loaded(class);
        }
        if prefetch.class_attributes {
            let attributes = match product.product_class_id {
                Some(class_id) => self
                    .attributes
                    .iter()
                    .filter(|attribute| attribute.product_class_id == class_id)
                    .cloned()
                    .collect(),
                None => Vec::new(),
            };
            entry.class_attributes = Prefetched::Loaded(attributes);
        }
        if prefetch.attribute_values {
            entry.attribute_values = Prefetched::Loaded(
                self.values
                    .iter()
                    .filter(|(id, _)| *id == product.id)
                    .map(|(_, value)| value.clone())
                    .collect(),
            );
        }
        if prefetch.stockrecords {
            entry.stockrecords = Prefetched::Loaded(
                self.stockrecords
                    .iter()
                    .filter(|(id, _)| *id == product.id)
                    .map(|(_, record)| record.clone())
                    .collect(),
            );
        }
        entry
    }
}

/// In-memory catalogue shared between clones.
#[derive(Clone, Debug)]
pub struct MockCatalogueStorage {
    inner: Arc<RwLock<Catalogue>>,
    connected: bool,
}

impl Default for MockCatalogueStorage {
    fn default() -> Self {
        Self {
            inner: Arc::default(),
            connected: true,
        }
    }
}

impl MockCatalogueStorage {
    /// Creates a new empty, connected storage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a storage whose health check fails.
    pub fn disconnected() -> Self {
        Self {
            connected: false,
            ..Self::default()
        }
    }

    pub fn add_category(&self, name: &str, slug: &str, parent_id: Option<CategoryId>) -> CategoryId {
        let mut catalogue = self.inner.write().expect("lock poisoned");
        let id = catalogue.next_id();
        catalogue.categories.push(Category {
            id,
            name: name.to_owned(),
            slug: slug.to_owned(),
            parent_id,
        });
        id
    }

    pub fn add_product_class(&self, name: &str) -> ProductClassId {
        let mut catalogue = self.inner.write().expect("lock poisoned");
        let id = catalogue.next_id();
        catalogue.classes.push(ProductClass {
            id,
            name: name.to_owned(),
        });
        id
    }

    /// Declares an attribute on a class. `options` seeds its option group.
    pub fn add_attribute(
        &self,
        product_class_id: ProductClassId,
        code: &str,
        name: &str,
        attribute_type: AttributeType,
        options: &[&str],
    ) -> ProductAttribute {
        let mut catalogue = self.inner.write().expect("lock poisoned");
        let id = catalogue.next_id();
        let options = options
            .iter()
            .map(|option| AttributeOption {
                id: catalogue.next_id(),
                option: (*option).to_owned(),
            })
            .collect();
        let attribute = ProductAttribute {
            id,
            product_class_id,
            code: code.to_owned(),
            name: name.to_owned(),
            attribute_type,
            required: false,
            options,
        };
        catalogue.attributes.push(attribute.clone());
        attribute
    }

    pub fn add_partner(&self, code: &str, name: &str) -> PartnerId {
        let mut catalogue = self.inner.write().expect("lock poisoned");
        let id = catalogue.next_id();
        catalogue.partners.push(Partner {
            id,
            code: code.to_owned(),
            name: name.to_owned(),
        });
        id
    }

    /// Adds a standalone public product.
    pub fn add_product(
        &self,
        upc: &str,
        title: &str,
        product_class_id: Option<ProductClassId>,
    ) -> ProductId {
        self.add_product_with_structure(upc, title, product_class_id, ProductStructure::Standalone)
    }

    pub fn add_product_with_structure(
        &self,
        upc: &str,
        title: &str,
        product_class_id: Option<ProductClassId>,
        structure: ProductStructure,
    ) -> ProductId {
        let mut catalogue = self.inner.write().expect("lock poisoned");
        let id = catalogue.next_id();
        let now = Utc::now();
        catalogue.products.push(Product {
            id,
            structure,
            upc: upc.to_owned(),
            title: title.to_owned(),
            slug: title.to_lowercase().replace(' ', "-"),
            description: String::new(),
            is_public: true,
            is_discountable: true,
            rating: None,
            product_class_id,
            date_created: now,
            date_updated: now,
        });
        id
    }

    pub fn assign_category(&self, product_id: ProductId, category_id: CategoryId) {
        let mut catalogue = self.inner.write().expect("lock poisoned");
        catalogue.product_categories.push((product_id, category_id));
    }

    /// Seeds a value without counting it as a write.
    pub fn seed_attribute_value(
        &self,
        product_id: ProductId,
        attribute: &ProductAttribute,
        value: AttributeValueData,
    ) {
        let mut catalogue = self.inner.write().expect("lock poisoned");
        catalogue.values.retain(|(id, existing)| {
            !(*id == product_id && existing.attribute_id == attribute.id)
        });
        catalogue.values.push((
            product_id,
            ProductAttributeValue {
                attribute_id: attribute.id,
                attribute_code: attribute.code.clone(),
                value: normalized(value),
            },
        ));
    }

    /// Seeds a stock record without counting it as a write.
    pub fn seed_stockrecord(
        &self,
        product_id: ProductId,
        partner_id: PartnerId,
        partner_sku: &str,
        price: Option<rust_decimal::Decimal>,
    ) {
        let mut catalogue = self.inner.write().expect("lock poisoned");
        let partner_code = catalogue
            .partners
            .iter()
            .find(|partner| partner.id == partner_id)
            .map(|partner| partner.code.clone())
            .expect("partner must be seeded before its stock records");
        catalogue.stockrecords.push((
            product_id,
            StockRecord {
                partner_id,
                partner_code,
                partner_sku: partner_sku.to_owned(),
                price,
                num_in_stock: None,
            },
        ));
    }

    /// Number of successful writes since creation.
    pub fn write_count(&self) -> usize {
        self.inner.read().expect("lock poisoned").writes
    }

    pub fn product(&self, id: ProductId) -> Option<Product> {
        let catalogue = self.inner.read().expect("lock poisoned");
        catalogue.products.iter().find(|product| product.id == id).cloned()
    }

    pub fn attribute_value(&self, product_id: ProductId, code: &str) -> Option<AttributeValueData> {
        let catalogue = self.inner.read().expect("lock poisoned");
        catalogue
            .values
            .iter()
            .find(|(id, value)| *id == product_id && value.attribute_code == code)
            .map(|(_, value)| value.value.clone())
    }

    pub fn stockrecord(&self, product_id: ProductId, partner_code: &str) -> Option<StockRecord> {
        let catalogue = self.inner.read().expect("lock poisoned");
        catalogue
            .stockrecords
            .iter()
            .find(|(id, record)| *id == product_id && record.partner_code == partner_code)
            .map(|(_, record)| record.clone())
    }
}

impl CatalogueStorage for MockCatalogueStorage {
    async fn is_connected(&self) -> bool {
        self.connected
    }

    async fn category_by_slug(&self, slug: &str) -> Result<Option<Category>, CatalogueStorageError> {
        let catalogue = self.inner.read().expect("lock poisoned");
        Ok(catalogue
            .categories
            .iter()
            .find(|category| category.slug == slug)
            .cloned())
    }

    async fn category_descendants(
        &self,
        category_id: CategoryId,
    ) -> Result<Vec<CategoryId>, CatalogueStorageError> {
        let catalogue = self.inner.read().expect("lock poisoned");
        let mut ids = vec![category_id];
        let mut cursor = 0;
        while let Some(&parent) = ids.get(cursor) {
            ids.extend(
                catalogue
                    .categories
                    .iter()
                    .filter(|category| category.parent_id == Some(parent))
                    .map(|category| category.id),
            );
            cursor += 1;
        }
        Ok(ids)
    }

    async fn products_count(&self, query: &ProductQuery) -> Result<u64, CatalogueStorageError> {
        let catalogue = self.inner.read().expect("lock poisoned");
        Ok(catalogue.filtered(query).len() as u64)
    }

    async fn products_list(
        &self,
        query: &ProductQuery,
    ) -> Result<Vec<CatalogueProduct>, CatalogueStorageError> {
        let catalogue = self.inner.read().expect("lock poisoned");
        let offset = usize::try_from(query.offset).unwrap_or(usize::MAX);
        let limit = query
            .limit
            .map(|limit| usize::try_from(limit).unwrap_or(usize::MAX))
            .unwrap_or(usize::MAX);
        Ok(catalogue
            .filtered(query)
            .into_iter()
            .skip(offset)
            .take(limit)
            .map(|product| catalogue.load(product, query))
            .collect())
    }

    async fn product_classes_list(&self) -> Result<Vec<ProductClass>, CatalogueStorageError> {
        let catalogue = self.inner.read().expect("lock poisoned");
        let mut classes = catalogue.classes.clone();
        classes.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(classes)
    }

    async fn attributes_list(&self) -> Result<Vec<ProductAttribute>, CatalogueStorageError> {
        let catalogue = self.inner.read().expect("lock poisoned");
        let mut attributes = catalogue.attributes.clone();
        attributes.sort_by(|a, b| a.code.cmp(&b.code).then(a.id.cmp(&b.id)));
        Ok(attributes)
    }

    async fn partners_list(&self) -> Result<Vec<Partner>, CatalogueStorageError> {
        let catalogue = self.inner.read().expect("lock poisoned");
        let mut partners = catalogue.partners.clone();
        partners.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(partners)
    }

    async fn partner_by_code(&self, code: &str) -> Result<Option<Partner>, CatalogueStorageError> {
        let catalogue = self.inner.read().expect("lock poisoned");
        Ok(catalogue
            .partners
            .iter()
            .find(|partner| partner.code == code)
            .cloned())
    }

    async fn product_update_field(
        &self,
        product_id: ProductId,
        value: ProductFieldValue,
    ) -> Result<(), CatalogueStorageError> {
        let mut catalogue = self.inner.write().expect("lock poisoned");
        let product = catalogue
            .products
            .iter_mut()
            .find(|product| product.id == product_id)
            .ok_or_else(|| CatalogueStorageError::NotFound(format!("product {product_id}")))?;
        product.apply(value);
        product.date_updated = Utc::now();
        catalogue.writes += 1;
        Ok(())
    }

    async fn attribute_value_upsert(
        &self,
        product_id: ProductId,
        attribute_id: AttributeId,
        value: AttributeValueData,
    ) -> Result<(), CatalogueStorageError> {
        let mut guard = self.inner.write().expect("lock poisoned");
        let catalogue = &mut *guard;
        catalogue.ensure_product(product_id)?;
        let code = catalogue.attribute(attribute_id)?.code.clone();
        let value = ProductAttributeValue {
            attribute_id,
            attribute_code: code,
            value: normalized(value),
        };
        match catalogue
            .values
            .iter_mut()
            .find(|(id, existing)| *id == product_id && existing.attribute_id == attribute_id)
        {
            Some((_, existing)) => *existing = value,
            None => catalogue.values.push((product_id, value)),
        }
        catalogue.writes += 1;
        Ok(())
    }

    async fn attribute_value_delete(
        &self,
        product_id: ProductId,
        attribute_id: AttributeId,
    ) -> Result<bool, CatalogueStorageError> {
        let mut catalogue = self.inner.write().expect("lock poisoned");
        let before = catalogue.values.len();
        catalogue
            .values
            .retain(|(id, value)| !(*id == product_id && value.attribute_id == attribute_id));
        let deleted = catalogue.values.len() < before;
        if deleted {
            catalogue.writes += 1;
        }
        Ok(deleted)
    }

    async fn stockrecord_upsert(
        &self,
        product_id: ProductId,
        partner_id: PartnerId,
        record: StockRecordWrite,
    ) -> Result<(), CatalogueStorageError> {
        let mut guard = self.inner.write().expect("lock poisoned");
        let catalogue = &mut *guard;
        catalogue.ensure_product(product_id)?;
        let partner_code = catalogue
            .partners
            .iter()
            .find(|partner| partner.id == partner_id)
            .map(|partner| partner.code.clone())
            .ok_or_else(|| CatalogueStorageError::NotFound(format!("partner {partner_id}")))?;
        match catalogue
            .stockrecords
            .iter_mut()
            .find(|(id, existing)| *id == product_id && existing.partner_id == partner_id)
        {
            Some((_, existing)) => {
                existing.partner_sku = record.partner_sku;
                existing.price = Some(record.price);
            }
            None => catalogue.stockrecords.push((
                product_id,
                StockRecord {
                    partner_id,
                    partner_code,
                    partner_sku: record.partner_sku,
                    price: Some(record.price),
                    num_in_stock: None,
                },
            )),
        }
        catalogue.writes += 1;
        Ok(())
    }

    async fn stockrecord_delete(
        &self,
        product_id: ProductId,
        partner_id: PartnerId,
    ) -> Result<bool, CatalogueStorageError> {
        let mut catalogue = self.inner.write().expect("lock poisoned");
        let before = catalogue.stockrecords.len();
        catalogue
            .stockrecords
            .retain(|(id, record)| !(*id == product_id && record.partner_id == partner_id));
        let deleted = catalogue.stockrecords.len() < before;
        if deleted {
            catalogue.writes += 1;
        }
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalogue::Prefetch;

    #[tokio::test]
    async fn descendants_walk_the_whole_subtree() {
        let storage = MockCatalogueStorage::new();
        let shoes = storage.add_category("Shoes", "shoes", None);
        let sneakers = storage.add_category("Sneakers", "sneakers", Some(shoes));
        let retro = storage.add_category("Retro", "retro", Some(sneakers));
        let books = storage.add_category("Books", "books", None);

        let ids = storage.category_descendants(shoes).await.unwrap();
        assert_eq!(ids, vec![shoes, sneakers, retro]);
        assert!(!ids.contains(&books));
    }

    #[tokio::test]
    async fn relations_are_only_loaded_when_requested() {
        let storage = MockCatalogueStorage::new();
        let class = storage.add_product_class("Shoe");
        storage.add_product("u1", "Boot", Some(class));

        let plain = storage
            .products_list(&ProductQuery::browsable())
            .await
            .unwrap();
        assert!(!plain[0].product_class.is_loaded());
        assert!(!plain[0].stockrecords.is_loaded());

        let mut query = ProductQuery::browsable();
        query.prefetch = Prefetch {
            product_class: true,
            stockrecords: true,
            ..Prefetch::default()
        };
        let loaded = storage.products_list(&query).await.unwrap();
        assert_eq!(
            loaded[0].product_class.get().cloned().flatten().map(|c| c.name),
            Some("Shoe".to_owned())
        );
        assert_eq!(loaded[0].stockrecords.get().map(Vec::len), Some(0));
        assert!(!loaded[0].attribute_values.is_loaded());
    }

    #[tokio::test]
    async fn listing_is_ordered_by_title_and_paginated() {
        let storage = MockCatalogueStorage::new();
        storage.add_product("c", "Charlie", None);
        storage.add_product("a", "Alpha", None);
        storage.add_product("b", "Bravo", None);
        storage.add_product_with_structure("v", "Aardvark variant", None, ProductStructure::Child);

        let query = ProductQuery::browsable();
        assert_eq!(storage.products_count(&query).await.unwrap(), 3);

        let page = storage
            .products_list(&query.clone().paginate(1, 1))
            .await
            .unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].product.title, "Bravo");
    }

    #[tokio::test]
    async fn deletes_report_whether_anything_was_removed() {
        let storage = MockCatalogueStorage::new();
        let partner = storage.add_partner("ACME", "Acme");
        let product = storage.add_product("u1", "Boot", None);

        assert!(!storage.stockrecord_delete(product, partner).await.unwrap());
        assert_eq!(storage.write_count(), 0);

        storage
            .stockrecord_upsert(
                product,
                partner,
                StockRecordWrite {
                    partner_sku: "u1".to_owned(),
                    price: rust_decimal::Decimal::new(999, 2),
                },
            )
            .await
            .unwrap();
        assert!(storage.stockrecord_delete(product, partner).await.unwrap());
        assert_eq!(storage.write_count(), 2);
    }

    #[tokio::test]
    async fn multi_options_read_back_by_label() {
        let storage = MockCatalogueStorage::new();
        let class = storage.add_product_class("Shoe");
        let tags = storage.add_attribute(
            class,
            "tags",
            "Tags",
            AttributeType::MultiOption,
            &["Sale", "New", "Eco"],
        );
        let product = storage.add_product("u1", "Boot", Some(class));

        let submitted = vec![tags.options[1].clone(), tags.options[2].clone()];
        storage
            .attribute_value_upsert(product, tags.id, AttributeValueData::MultiOption(submitted))
            .await
            .unwrap();

        let Some(AttributeValueData::MultiOption(options)) = storage.attribute_value(product, "tags")
        else {
            panic!("tags should hold a multi option value");
        };
        let labels: Vec<_> = options.iter().map(|option| option.option.as_str()).collect();
        assert_eq!(labels, ["Eco", "New"]);
    }
}
