//! PostgreSQL implementation of [`CatalogueStorage`].
//!
//! Products are listed with one query; each requested relation is then loaded
//! for the whole page with one `= ANY($1)` query, so the cost of a grid does not
//! grow with the number of rows. The schema lives in `migrations/`.

use super::{
    AttributeId, AttributeOption, AttributeType, AttributeValueData, CatalogueProduct,
    CatalogueStorage, CatalogueStorageError, Category, CategoryId, Partner, PartnerId, Prefetched,
    Product, ProductAttribute, ProductAttributeValue, ProductClass, ProductField,
    ProductFieldValue, ProductId, ProductQuery, StockRecord, StockRecordWrite,
};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use std::collections::HashMap;

#[derive(Clone)]
pub struct PgCatalogueStorage {
    pool: PgPool,
}

impl PgCatalogueStorage {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[derive(FromRow)]
struct CategoryRow {
    id: i64,
    name: String,
    slug: String,
    parent_id: Option<i64>,
}

#[derive(FromRow)]
struct ProductClassRow {
    id: i64,
    name: String,
}

#[derive(FromRow)]
struct ProductRow {
    id: i64,
    structure: String,
    upc: String,
    title: String,
    slug: String,
    description: String,
    is_public: bool,
    is_discountable: bool,
    rating: Option<f64>,
    product_class_id: Option<i64>,
    date_created: DateTime<Utc>,
    date_updated: DateTime<Utc>,
}

impl TryFrom<ProductRow> for Product {
    type Error = CatalogueStorageError;

    fn try_from(row: ProductRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            structure: row.structure.parse()?,
            upc: row.upc,
            title: row.title,
            slug: row.slug,
            description: row.description,
            is_public: row.is_public,
            is_discountable: row.is_discountable,
            rating: row.rating,
            product_class_id: row.product_class_id,
            date_created: row.date_created,
            date_updated: row.date_updated,
        })
    }
}

#[derive(FromRow)]
struct AttributeRow {
    id: i64,
    product_class_id: i64,
    code: String,
    name: String,
    attribute_type: String,
    required: bool,
    option_group_id: Option<i64>,
}

#[derive(FromRow)]
struct OptionRow {
    id: i64,
    group_id: i64,
    option: String,
}

#[derive(FromRow)]
struct ValueRow {
    id: i64,
    product_id: i64,
    attribute_id: i64,
    code: String,
    attribute_type: String,
    value_text: Option<String>,
    value_richtext: Option<String>,
    value_integer: Option<i64>,
    value_float: Option<f64>,
    value_boolean: Option<bool>,
    value_date: Option<NaiveDate>,
    value_datetime: Option<DateTime<Utc>>,
    value_option_id: Option<i64>,
    value_option: Option<String>,
}

#[derive(FromRow)]
struct MultiOptionRow {
    value_id: i64,
    id: i64,
    option: String,
}

#[derive(FromRow)]
struct StockRecordRow {
    product_id: i64,
    partner_id: i64,
    partner_code: String,
    partner_sku: String,
    price: Option<Decimal>,
    num_in_stock: Option<i32>,
}

#[derive(FromRow)]
struct PartnerRow {
    id: i64,
    code: String,
    name: String,
}

impl From<PartnerRow> for Partner {
    fn from(row: PartnerRow) -> Self {
        Self {
            id: row.id,
            code: row.code,
            name: row.name,
        }
    }
}

/// Column backing each attached product field.
fn product_column(field: ProductField) -> &'static str {
    match field {
        ProductField::ProductClass => "product_class_id",
        other => other.code(),
    }
}

/// `SELECT ... FROM products p` plus the filter part of `query`.
fn filtered_products(select: &str, query: &ProductQuery) -> QueryBuilder<'static, Postgres> {
    let mut builder = QueryBuilder::new(select);
    builder.push(" WHERE p.structure <> 'child'");
    if let Some(id) = query.product_id {
        builder.push(" AND p.id = ").push_bind(id);
    }
    if let Some(ids) = &query.category_ids {
        builder
            .push(
                " AND EXISTS (SELECT 1 FROM product_categories pc \
                 WHERE pc.product_id = p.id AND pc.category_id = ANY(",
            )
            .push_bind(ids.clone())
            .push("))");
    }
    builder
}

fn value_data(row: &ValueRow, multi: &HashMap<i64, Vec<AttributeOption>>) -> Option<AttributeValueData> {
    let attribute_type: AttributeType = row.attribute_type.parse().ok()?;
    let data = match attribute_type {
        AttributeType::Text => AttributeValueData::Text(row.value_text.clone()?),
        AttributeType::Richtext => AttributeValueData::Richtext(row.value_richtext.clone()?),
        AttributeType::Integer => AttributeValueData::Integer(row.value_integer?),
        AttributeType::Float => AttributeValueData::Float(row.value_float?),
        AttributeType::Boolean => AttributeValueData::Boolean(row.value_boolean?),
        AttributeType::Date => AttributeValueData::Date(row.value_date?),
        AttributeType::Datetime => AttributeValueData::Datetime(row.value_datetime?),
        AttributeType::Option => AttributeValueData::Option(AttributeOption {
            id: row.value_option_id?,
            option: row.value_option.clone()?,
        }),
        AttributeType::MultiOption => {
            AttributeValueData::MultiOption(multi.get(&row.id).cloned().unwrap_or_default())
        }
    };
    Some(data)
}

impl PgCatalogueStorage {
    /// Attribute declarations with their options, optionally restricted to classes.
    async fn load_attributes(
        &self,
        class_ids: Option<Vec<i64>>,
    ) -> Result<Vec<ProductAttribute>, CatalogueStorageError> {
        let rows = sqlx::query_as::<_, AttributeRow>(
            r#"
            SELECT id, product_class_id, code, name, type AS attribute_type, required, option_group_id
            FROM product_attributes
            WHERE $1::bigint[] IS NULL OR product_class_id = ANY($1)
            ORDER BY code, id
            "#,
        )
        .bind(class_ids)
        .fetch_all(&self.pool)
        .await?;

        let group_ids: Vec<i64> = rows.iter().filter_map(|row| row.option_group_id).collect();
        let mut options_by_group: HashMap<i64, Vec<AttributeOption>> = HashMap::new();
        if !group_ids.is_empty() {
            let options = sqlx::query_as::<_, OptionRow>(
                r#"
                SELECT id, group_id, option
                FROM attribute_options
                WHERE group_id = ANY($1)
                ORDER BY option, id
                "#,
            )
            .bind(group_ids)
            .fetch_all(&self.pool)
            .await?;
            for option in options {
                options_by_group
                    .entry(option.group_id)
                    .or_default()
                    .push(AttributeOption {
                        id: option.id,
                        option: option.option,
                    });
            }
        }

        rows.into_iter()
            .map(|row| -> Result<ProductAttribute, CatalogueStorageError> {
                Ok(ProductAttribute {
                    id: row.id,
                    product_class_id: row.product_class_id,
                    code: row.code,
                    name: row.name,
                    attribute_type: row.attribute_type.parse()?,
                    required: row.required,
                    options: row
                        .option_group_id
                        .and_then(|group| options_by_group.get(&group).cloned())
                        .unwrap_or_default(),
                })
            })
            .collect()
    }

    async fn load_values(
        &self,
        product_ids: &[i64],
    ) -> Result<HashMap<i64, Vec<ProductAttributeValue>>, CatalogueStorageError> {
        let rows = sqlx::query_as::<_, ValueRow>(
            r#"
            SELECT v.id, v.product_id, v.attribute_id, a.code, a.type AS attribute_type,
                   v.value_text, v.value_richtext, v.value_integer, v.value_float,
                   v.value_boolean, v.value_date, v.value_datetime,
                   v.value_option_id, o.option AS value_option
            FROM product_attribute_values v
            JOIN product_attributes a ON a.id = v.attribute_id
            LEFT JOIN attribute_options o ON o.id = v.value_option_id
            WHERE v.product_id = ANY($1)
            ORDER BY v.product_id, a.code, v.id
            "#,
        )
        .bind(product_ids.to_vec())
        .fetch_all(&self.pool)
        .await?;

        let multi_ids: Vec<i64> = rows
            .iter()
            .filter(|row| row.attribute_type == AttributeType::MultiOption.as_db_str())
            .map(|row| row.id)
            .collect();
        let mut multi: HashMap<i64, Vec<AttributeOption>> = HashMap::new();
        if !multi_ids.is_empty() {
            let options = sqlx::query_as::<_, MultiOptionRow>(
                r#"
                SELECT m.value_id, o.id, o.option
                FROM product_attribute_value_multi_options m
                JOIN attribute_options o ON o.id = m.option_id
                WHERE m.value_id = ANY($1)
                ORDER BY o.option, o.id
                "#,
            )
            .bind(multi_ids)
            .fetch_all(&self.pool)
            .await?;
            for option in options {
                multi.entry(option.value_id).or_default().push(AttributeOption {
                    id: option.id,
                    option: option.option,
                });
            }
        }

        let mut by_product: HashMap<i64, Vec<ProductAttributeValue>> = HashMap::new();
        for row in &rows {
            // Values whose column is empty (e.g. a deleted option) read as absent.
            if let Some(value) = value_data(row, &multi) {
                by_product
                    .entry(row.product_id)
                    .or_default()
                    .push(ProductAttributeValue {
                        attribute_id: row.attribute_id,
                        attribute_code: row.code.clone(),
                        value,
                    });
            }
        }
        Ok(by_product)
    }

    async fn load_stockrecords(
        &self,
        product_ids: &[i64],
    ) -> Result<HashMap<i64, Vec<StockRecord>>, CatalogueStorageError> {
        let rows = sqlx::query_as::<_, StockRecordRow>(
            r#"
            SELECT s.product_id, s.partner_id, pa.code AS partner_code,
                   s.partner_sku, s.price, s.num_in_stock
            FROM stockrecords s
            JOIN partners pa ON pa.id = s.partner_id
            WHERE s.product_id = ANY($1)
            ORDER BY pa.name, pa.id
            "#,
        )
        .bind(product_ids.to_vec())
        .fetch_all(&self.pool)
        .await?;

        let mut by_product: HashMap<i64, Vec<StockRecord>> = HashMap::new();
        for row in rows {
            by_product.entry(row.product_id).or_default().push(StockRecord {
                partner_id: row.partner_id,
                partner_code: row.partner_code,
                partner_sku: row.partner_sku,
                price: row.price,
                num_in_stock: row.num_in_stock,
            });
        }
        Ok(by_product)
    }
}

impl CatalogueStorage for PgCatalogueStorage {
    async fn is_connected(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }

    async fn category_by_slug(&self, slug: &str) -> Result<Option<Category>, CatalogueStorageError> {
        let row = sqlx::query_as::<_, CategoryRow>(
            "SELECT id, name, slug, parent_id FROM categories WHERE slug = $1",
        )
        .bind(slug)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| Category {
            id: row.id,
            name: row.name,
            slug: row.slug,
            parent_id: row.parent_id,
        }))
    }

    async fn category_descendants(
        &self,
        category_id: CategoryId,
    ) -> Result<Vec<CategoryId>, CatalogueStorageError> {
        let ids = sqlx::query_scalar::<_, i64>(
            r#"
            WITH RECURSIVE tree AS (
                SELECT id FROM categories WHERE id = $1
                UNION ALL
                SELECT c.id FROM categories c JOIN tree t ON c.parent_id = t.id
            )
            SELECT id FROM tree
            "#,
        )
        .bind(category_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(ids)
    }

    async fn products_count(&self, query: &ProductQuery) -> Result<u64, CatalogueStorageError> {
        let count: i64 = filtered_products("SELECT COUNT(*) FROM products p", query)
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?;

        Ok(u64::try_from(count).unwrap_or_default())
    }

    async fn products_list(
        &self,
        query: &ProductQuery,
    ) -> Result<Vec<CatalogueProduct>, CatalogueStorageError> {
        let mut builder = filtered_products(
            "SELECT p.id, p.structure, p.upc, p.title, p.slug, p.description, p.is_public, \
             p.is_discountable, p.rating, p.product_class_id, p.date_created, p.date_updated \
             FROM products p",
            query,
        );
        builder.push(" ORDER BY p.title ASC, p.id ASC");
        if let Some(limit) = query.limit {
            builder
                .push(" LIMIT ")
                .push_bind(i64::try_from(limit).unwrap_or(i64::MAX));
        }
        builder
            .push(" OFFSET ")
            .push_bind(i64::try_from(query.offset).unwrap_or(i64::MAX));

        let rows = builder
            .build_query_as::<ProductRow>()
            .fetch_all(&self.pool)
            .await?;
        let mut products = rows
            .into_iter()
            .map(|row| Product::try_from(row).map(CatalogueProduct::new))
            .collect::<Result<Vec<_>, _>>()?;
        if products.is_empty() {
            return Ok(products);
        }

        let prefetch = query.prefetch;
        let product_ids: Vec<i64> = products.iter().map(|entry| entry.product.id).collect();
        let class_ids: Vec<i64> = products
            .iter()
            .filter_map(|entry| entry.product.product_class_id)
            .collect();

        if prefetch.product_class {
            let classes: HashMap<i64, ProductClass> = sqlx::query_as::<_, ProductClassRow>(
                "SELECT id, name FROM product_classes WHERE id = ANY($1)",
            )
            .bind(class_ids.clone())
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(|row| (row.id, ProductClass { id: row.id, name: row.name }))
            .collect();
            for entry in &mut products {
                let class = entry
                    .product
                    .product_class_id
                    .and_then(|id| classes.get(&id).cloned());
                entry.product_class = Prefetched::Loaded(class);
            }
        }

        if prefetch.class_attributes {
            let mut by_class: HashMap<i64, Vec<ProductAttribute>> = HashMap::new();
            for attribute in self.load_attributes(Some(class_ids)).await? {
                by_class
                    .entry(attribute.product_class_id)
                    .or_default()
                    .push(attribute);
            }
            for entry in &mut products {
                let attributes = entry
                    .product
                    .product_class_id
                    .and_then(|id| by_class.get(&id).cloned())
                    .unwrap_or_default();
                entry.class_attributes = Prefetched::Loaded(attributes);
            }
        }

        if prefetch.attribute_values {
            let mut values = self.load_values(&product_ids).await?;
            for entry in &mut products {
                let loaded = values.remove(&entry.product.id).unwrap_or_default();
                entry.attribute_values = Prefetched::Loaded(loaded);
            }
        }

        if prefetch.stockrecords {
            let mut records = self.load_stockrecords(&product_ids).await?;
            for entry in &mut products {
                let loaded = records.remove(&entry.product.id).unwrap_or_default();
                entry.stockrecords = Prefetched::Loaded(loaded);
            }
        }

        tracing::debug!(
            products = products.len(),
            ?prefetch,
            "Loaded product page"
        );

        Ok(products)
    }

    async fn product_classes_list(&self) -> Result<Vec<ProductClass>, CatalogueStorageError> {
        let rows = sqlx::query_as::<_, ProductClassRow>(
            "SELECT id, name FROM product_classes ORDER BY name, id",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| ProductClass {
                id: row.id,
                name: row.name,
            })
            .collect())
    }

    async fn attributes_list(&self) -> Result<Vec<ProductAttribute>, CatalogueStorageError> {
        self.load_attributes(None).await
    }

    async fn partners_list(&self) -> Result<Vec<Partner>, CatalogueStorageError> {
        let rows = sqlx::query_as::<_, PartnerRow>(
            "SELECT id, code, name FROM partners ORDER BY name, id",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Partner::from).collect())
    }

    async fn partner_by_code(&self, code: &str) -> Result<Option<Partner>, CatalogueStorageError> {
        let row = sqlx::query_as::<_, PartnerRow>(
            "SELECT id, code, name FROM partners WHERE code = $1",
        )
        .bind(code)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Partner::from))
    }

    async fn product_update_field(
        &self,
        product_id: ProductId,
        value: ProductFieldValue,
    ) -> Result<(), CatalogueStorageError> {
        let column = product_column(value.field());
        let sql = format!("UPDATE products SET {column} = $1, date_updated = now() WHERE id = $2");
        let query = sqlx::query(&sql);
        let query = match value {
            ProductFieldValue::Upc(text)
            | ProductFieldValue::Title(text)
            | ProductFieldValue::Slug(text)
            | ProductFieldValue::Description(text) => query.bind(text),
            ProductFieldValue::IsPublic(flag) | ProductFieldValue::IsDiscountable(flag) => {
                query.bind(flag)
            }
            ProductFieldValue::Rating(rating) => query.bind(rating),
            ProductFieldValue::ProductClass(class_id) => query.bind(class_id),
        };
        let result = query.bind(product_id).execute(&self.pool).await?;

        if result.rows_affected() == 0 {
            return Err(CatalogueStorageError::NotFound(format!(
                "product {product_id}"
            )));
        }
        Ok(())
    }

    async fn attribute_value_upsert(
        &self,
        product_id: ProductId,
        attribute_id: AttributeId,
        value: AttributeValueData,
    ) -> Result<(), CatalogueStorageError> {
        let mut text = None;
        let mut richtext = None;
        let mut integer = None;
        let mut float = None;
        let mut boolean = None;
        let mut date = None;
        let mut datetime = None;
        let mut option_id = None;
        let mut multi_ids = None;
        match value {
            AttributeValueData::Text(value) => text = Some(value),
            AttributeValueData::Richtext(value) => richtext = Some(value),
            AttributeValueData::Integer(value) => integer = Some(value),
            AttributeValueData::Float(value) => float = Some(value),
            AttributeValueData::Boolean(value) => boolean = Some(value),
            AttributeValueData::Date(value) => date = Some(value),
            AttributeValueData::Datetime(value) => datetime = Some(value),
            AttributeValueData::Option(option) => option_id = Some(option.id),
            AttributeValueData::MultiOption(options) => {
                multi_ids = Some(options.iter().map(|option| option.id).collect::<Vec<i64>>());
            }
        }

        let mut tx = self.pool.begin().await?;
        let value_id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO product_attribute_values
                (product_id, attribute_id, value_text, value_richtext, value_integer,
                 value_float, value_boolean, value_date, value_datetime, value_option_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (product_id, attribute_id) DO UPDATE SET
                value_text = EXCLUDED.value_text,
                value_richtext = EXCLUDED.value_richtext,
                value_integer = EXCLUDED.value_integer,
                value_float = EXCLUDED.value_float,
                value_boolean = EXCLUDED.value_boolean,
                value_date = EXCLUDED.value_date,
                value_datetime = EXCLUDED.value_datetime,
                value_option_id = EXCLUDED.value_option_id
            RETURNING id
            "#,
        )
        .bind(product_id)
        .bind(attribute_id)
        .bind(text)
        .bind(richtext)
        .bind(integer)
        .bind(float)
        .bind(boolean)
        .bind(date)
        .bind(datetime)
        .bind(option_id)
        .fetch_one(&mut *tx)
        .await?;

        if let Some(ids) = multi_ids {
            sqlx::query("DELETE FROM product_attribute_value_multi_options WHERE value_id = $1")
                .bind(value_id)
                .execute(&mut *tx)
                .await?;
            sqlx::query(
                r#"
                INSERT INTO product_attribute_value_multi_options (value_id, option_id)
                SELECT $1, UNNEST($2::bigint[])
                "#,
            )
            .bind(value_id)
            .bind(ids)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn attribute_value_delete(
        &self,
        product_id: ProductId,
        attribute_id: AttributeId,
    ) -> Result<bool, CatalogueStorageError> {
        let result = sqlx::query(
            "DELETE FROM product_attribute_values WHERE product_id = $1 AND attribute_id = $2",
        )
        .bind(product_id)
        .bind(attribute_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn stockrecord_upsert(
        &self,
        product_id: ProductId,
        partner_id: PartnerId,
        record: StockRecordWrite,
    ) -> Result<(), CatalogueStorageError> {
        sqlx::query(
            r#"
            INSERT INTO stockrecords (product_id, partner_id, partner_sku, price)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (product_id, partner_id) DO UPDATE SET
                partner_sku = EXCLUDED.partner_sku,
                price = EXCLUDED.price,
                date_updated = now()
            "#,
        )
        .bind(product_id)
        .bind(partner_id)
        .bind(record.partner_sku)
        .bind(record.price)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn stockrecord_delete(
        &self,
        product_id: ProductId,
        partner_id: PartnerId,
    ) -> Result<bool, CatalogueStorageError> {
        let result =
            sqlx::query("DELETE FROM stockrecords WHERE product_id = $1 AND partner_id = $2")
                .bind(product_id)
                .bind(partner_id)
                .execute(&self.pool)
                .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn product_class_maps_to_its_foreign_key_column() {
        assert_eq!(product_column(ProductField::ProductClass), "product_class_id");
        assert_eq!(product_column(ProductField::Title), "title");
        assert_eq!(product_column(ProductField::IsPublic), "is_public");
    }

    #[test]
    fn filters_are_appended_in_order() {
        let query = ProductQuery::browsable().in_categories(vec![1, 2]).with_product(9);
        let builder = filtered_products("SELECT COUNT(*) FROM products p", &query);
        let sql = builder.sql();
        assert!(sql.starts_with("SELECT COUNT(*) FROM products p WHERE p.structure <> 'child'"));
        assert!(sql.contains("AND p.id = $1"));
        assert!(sql.contains("pc.category_id = ANY($2))"));
    }

    #[test]
    fn empty_option_columns_read_as_absent() {
        let row = ValueRow {
            id: 1,
            product_id: 1,
            attribute_id: 1,
            code: "color".to_owned(),
            attribute_type: "option".to_owned(),
            value_text: None,
            value_richtext: None,
            value_integer: None,
            value_float: None,
            value_boolean: None,
            value_date: None,
            value_datetime: None,
            value_option_id: None,
            value_option: None,
        };
        assert_eq!(value_data(&row, &HashMap::new()), None);
    }
}
