//! Shared test utilities for integration tests.
//!
//! This module provides common test infrastructure including:
//! - `seed_catalogue` - a small catalogue in a `MockCatalogueStorage`
//! - staff token helpers signed with the test configuration's secret
//! - `create_test_app` / `create_test_server`

use axum_test::TestServer;
use product_tables_services::{
    catalogue::{
        AttributeType, AttributeValueData, MockCatalogueStorage, ProductAttribute, ProductId,
        ProductStructure,
    },
    config::Config,
    dashboard::issue_staff_token,
    routes,
};
use rust_decimal::Decimal;

/// JWT secret used for test token generation.
pub const TEST_JWT_SECRET: &str = "test-jwt-secret-key-for-local-development";

pub const GRID_URL: &str = "/dashboard/product_table";

/// Ids of the seeded catalogue.
///
/// Categories: `shoes` > {`sneakers`, `boots`}, and `books`.
/// Runner is only in `sneakers`, Boot only in `boots`, Sandal in `shoes`,
/// Novel in `books`. A child variant of Runner is never listed.
#[allow(dead_code)]
pub struct SeededCatalogue {
    pub storage: MockCatalogueStorage,
    pub runner: ProductId,
    pub boot: ProductId,
    pub sandal: ProductId,
    pub novel: ProductId,
    pub variant: ProductId,
    pub color: ProductAttribute,
    pub size: ProductAttribute,
    pub material: ProductAttribute,
    pub tags: ProductAttribute,
}

#[allow(dead_code)]
impl SeededCatalogue {
    /// Option id of `label` for an option attribute.
    pub fn option_id(attribute: &ProductAttribute, label: &str) -> i64 {
        attribute
            .options
            .iter()
            .find(|option| option.option == label)
            .map(|option| option.id)
            .expect("option is seeded")
    }
}

pub fn seed_catalogue() -> SeededCatalogue {
    let storage = MockCatalogueStorage::new();

    let shoes = storage.add_category("Shoes", "shoes", None);
    let sneakers = storage.add_category("Sneakers", "sneakers", Some(shoes));
    let boots = storage.add_category("Boots", "boots", Some(shoes));
    let books = storage.add_category("Books", "books", None);

    let shoe = storage.add_product_class("Shoe");
    let color = storage.add_attribute(shoe, "color", "Color", AttributeType::Text, &[]);
    let size = storage.add_attribute(shoe, "size", "Size", AttributeType::Integer, &[]);
    let material = storage.add_attribute(
        shoe,
        "material",
        "Material",
        AttributeType::Option,
        &["Leather", "Canvas"],
    );
    let tags = storage.add_attribute(
        shoe,
        "tags",
        "Tags",
        AttributeType::MultiOption,
        &["Sale", "New", "Eco"],
    );
    let book = storage.add_product_class("Book");
    storage.add_attribute(book, "author", "Author", AttributeType::Text, &[]);

    let acme = storage.add_partner("ACME", "Acme");
    storage.add_partner("GLOBEX", "Globex");

    let runner = storage.add_product("S1", "Runner", Some(shoe));
    storage.assign_category(runner, sneakers);
    let boot = storage.add_product("S2", "Boot", Some(shoe));
    storage.assign_category(boot, boots);
    let sandal = storage.add_product("S3", "Sandal", Some(shoe));
    storage.assign_category(sandal, shoes);
    let novel = storage.add_product("B1", "Novel", Some(book));
    storage.assign_category(novel, books);
    let variant = storage.add_product_with_structure(
        "S1-42",
        "Runner 42",
        Some(shoe),
        ProductStructure::Child,
    );
    storage.assign_category(variant, sneakers);

    storage.seed_attribute_value(runner, &color, AttributeValueData::Text("Red".to_string()));
    let sale = tags.options[0].clone();
    storage.seed_attribute_value(runner, &tags, AttributeValueData::MultiOption(vec![sale]));
    storage.seed_stockrecord(runner, acme, "ACME-RUN", Some(Decimal::new(4999, 2)));

    SeededCatalogue {
        storage,
        runner,
        boot,
        sandal,
        novel,
        variant,
        color,
        size,
        material,
        tags,
    }
}

/// A valid superuser token.
pub fn staff_token() -> String {
    issue_staff_token("admin", true, TEST_JWT_SECRET).unwrap()
}

/// A valid token for staff without superuser rights.
#[allow(dead_code)]
pub fn non_superuser_token() -> String {
    issue_staff_token("clerk", false, TEST_JWT_SECRET).unwrap()
}

/// Create the test app router with default test configuration.
#[allow(dead_code)]
pub async fn create_test_app(storage: MockCatalogueStorage) -> axum::Router {
    routes(storage, Config::new_for_test()).await
}

#[allow(dead_code)]
pub async fn create_test_server(storage: MockCatalogueStorage) -> TestServer {
    create_test_server_with_config(storage, Config::new_for_test()).await
}

#[allow(dead_code)]
pub async fn create_test_server_with_config(
    storage: MockCatalogueStorage,
    config: Config,
) -> TestServer {
    TestServer::new(routes(storage, config).await).unwrap()
}

#[allow(dead_code)]
pub fn cell_url(product_id: ProductId, code: &str) -> String {
    format!("{GRID_URL}/cell/{product_id}/{code}")
}

#[allow(dead_code)]
pub fn save_url(product_id: ProductId, code: &str) -> String {
    format!("{}/save", cell_url(product_id, code))
}
