//! The per-cell edit form.
//!
//! A form carries two hidden fields identifying the cell it was built for
//! (`productid` and `code`) followed by the cell's own fields. Binding cleans
//! every field; only a valid form can be saved, and only the cell's own
//! values reach the storage.

use super::cell::{Cell, GridCell, SaveOutcome};
use super::error::GridError;
use super::field::{
    CleanedData, FieldSet, FieldValue, FormErrors, FormField, RawFormData, Widget, clean_fields,
};
use super::plugin::PluginKind;
use crate::catalogue::{CatalogueStorage, ProductId};
use serde::Serialize;
use std::collections::BTreeMap;

pub const PRODUCT_ID_FIELD: &str = "productid";
pub const CODE_FIELD: &str = "code";

/// Prefix given to a cell input whose name is taken by a hidden field.
pub const CELL_FIELD_PREFIX: &str = "cell_";

const MISMATCH_MESSAGE: &str = "Does not match the edited cell.";

/// Form name of the cell input `name`.
fn form_field_name(name: &str) -> String {
    if name == PRODUCT_ID_FIELD || name == CODE_FIELD {
        format!("{CELL_FIELD_PREFIX}{name}")
    } else {
        name.to_owned()
    }
}

#[derive(Debug, Clone)]
enum Binding {
    Unbound,
    Valid(CleanedData),
    Invalid(FormErrors),
}

#[derive(Debug)]
pub struct CellForm {
    cell: Cell,
    url: String,
    fields: FieldSet,
    /// `(form name, cell name)` of every cell input.
    cell_fields: Vec<(String, String)>,
    submitted: Option<RawFormData>,
    binding: Binding,
}

/// Serializable view of a form, bound or not.
#[derive(Debug, Clone, Serialize)]
pub struct FormDocument {
    pub id: String,
    pub auto_id: String,
    pub url: String,
    pub code: String,
    pub name: String,
    pub kind: PluginKind,
    pub productid: ProductId,
    pub read_only: bool,
    pub enabled: bool,
    pub fields: FieldSet,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<BTreeMap<String, Vec<String>>>,
    pub errors: FormErrors,
}

impl CellForm {
    pub fn new(cell: Cell, url: impl Into<String>) -> Result<Self, GridError> {
        let cell_fields = cell.fields()?;
        let mut fields = FieldSet::new();
        fields.insert(
            PRODUCT_ID_FIELD.to_owned(),
            FormField::new("Productid", Widget::Integer)
                .required(true)
                .hidden()
                .initial(FieldValue::Integer(cell.product_id())),
        );
        fields.insert(
            CODE_FIELD.to_owned(),
            FormField::new("Code", Widget::Text { max_length: None })
                .required(true)
                .hidden()
                .initial(FieldValue::Text(cell.code().to_owned())),
        );
        let mut names = Vec::with_capacity(cell_fields.len());
        for (name, field) in cell_fields {
            let form_name = form_field_name(&name);
            fields.insert(form_name.clone(), field);
            names.push((form_name, name));
        }

        Ok(Self {
            cell,
            url: url.into(),
            fields,
            cell_fields: names,
            submitted: None,
            binding: Binding::Unbound,
        })
    }

    pub fn cell(&self) -> &Cell {
        &self.cell
    }

    pub fn into_cell(self) -> Cell {
        self.cell
    }

    /// `form_id_{code}_{productid}`
    pub fn id(&self) -> String {
        format!("form_id_{}_{}", self.cell.code(), self.cell.product_id())
    }

    /// Pattern for input ids; `%s` is replaced by the field name.
    pub fn auto_id(&self) -> String {
        format!("id_%s_{}", self.cell.product_id())
    }

    pub fn fields(&self) -> &FieldSet {
        &self.fields
    }

    /// Cleans the submission. Returns whether the form is valid.
    pub fn bind(&mut self, raw: RawFormData) -> bool {
        let mut errors = FormErrors::new();
        let cleaned = match clean_fields(&self.fields, &raw) {
            Ok(cleaned) => Some(cleaned),
            Err(field_errors) => {
                errors = field_errors;
                None
            }
        };

        if let Some(cleaned) = &cleaned {
            if cleaned.get(PRODUCT_ID_FIELD) != Some(&FieldValue::Integer(self.cell.product_id())) {
                errors
                    .entry(PRODUCT_ID_FIELD.to_owned())
                    .or_default()
                    .push(MISMATCH_MESSAGE.to_owned());
            }
            if cleaned.get(CODE_FIELD) != Some(&FieldValue::Text(self.cell.code().to_owned())) {
                errors
                    .entry(CODE_FIELD.to_owned())
                    .or_default()
                    .push(MISMATCH_MESSAGE.to_owned());
            }
        }

        self.binding = match cleaned {
            Some(cleaned) if errors.is_empty() => Binding::Valid(cleaned),
            _ => Binding::Invalid(errors),
        };
        self.submitted = Some(raw);
        self.is_valid()
    }

    pub fn is_bound(&self) -> bool {
        !matches!(self.binding, Binding::Unbound)
    }

    pub fn is_valid(&self) -> bool {
        matches!(self.binding, Binding::Valid(_))
    }

    pub fn errors(&self) -> FormErrors {
        match &self.binding {
            Binding::Invalid(errors) => errors.clone(),
            Binding::Unbound | Binding::Valid(_) => FormErrors::new(),
        }
    }

    /// Saves the cell's own cleaned values.
    pub async fn save<S: CatalogueStorage>(&self, storage: &S) -> Result<SaveOutcome, GridError> {
        let Binding::Valid(cleaned) = &self.binding else {
            return Err(GridError::InvalidForm);
        };
        let values: CleanedData = self
            .cell_fields
            .iter()
            .filter_map(|(form_name, name)| {
                cleaned
                    .get(form_name)
                    .map(|value| (name.clone(), value.clone()))
            })
            .collect();

        self.cell.save(storage, &values).await
    }

    pub fn document(&self) -> Result<FormDocument, GridError> {
        let data = self.submitted.as_ref().map(|raw| {
            self.fields
                .keys()
                .map(|name| {
                    let values = raw.values(name).into_iter().map(str::to_owned).collect();
                    (name.clone(), values)
                })
                .collect()
        });

        Ok(FormDocument {
            id: self.id(),
            auto_id: self.auto_id(),
            url: self.url.clone(),
            code: self.cell.code().to_owned(),
            name: self.cell.name().to_owned(),
            kind: self.cell.kind(),
            productid: self.cell.product_id(),
            read_only: self.cell.read_only(),
            enabled: self.cell.enabled()?,
            fields: self.fields.clone(),
            data,
            errors: self.errors(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalogue::MockCatalogueStorage;
    use crate::grid::table::{Table, TableOptions};

    async fn partner_form(storage: &MockCatalogueStorage) -> (ProductId, CellForm) {
        storage.add_partner("ACME", "Acme");
        let product_id = storage.add_product("U1", "Boot", None);
        let cell = Table::get_field(storage, &TableOptions::default(), product_id, "ACME")
            .await
            .unwrap();
        (product_id, CellForm::new(cell, "/cell").unwrap())
    }

    #[tokio::test]
    async fn form_ids_follow_the_cell() {
        let storage = MockCatalogueStorage::new();
        let (product_id, form) = partner_form(&storage).await;

        assert_eq!(form.id(), format!("form_id_ACME_{product_id}"));
        assert_eq!(form.auto_id(), format!("id_%s_{product_id}"));
        let names: Vec<_> = form.fields().keys().map(String::as_str).collect();
        assert_eq!(names, ["code", "partner_sku", "price", "productid"]);
        assert!(form.fields()["productid"].hidden);
    }

    #[tokio::test]
    async fn hidden_fields_must_match_the_cell() {
        let storage = MockCatalogueStorage::new();
        let (product_id, mut form) = partner_form(&storage).await;

        let valid = form.bind(RawFormData::from([
            ("productid", "12345"),
            ("code", "ACME"),
            ("price", "9.99"),
        ]));
        assert!(!valid);
        assert_eq!(form.errors()["productid"], vec![MISMATCH_MESSAGE.to_owned()]);

        let id = product_id.to_string();
        let valid = form.bind(RawFormData::from([
            ("productid", id.as_str()),
            ("code", "ACME"),
            ("price", "9.99"),
        ]));
        assert!(valid);
    }

    #[tokio::test]
    async fn invalid_forms_never_write() {
        let storage = MockCatalogueStorage::new();
        let (product_id, mut form) = partner_form(&storage).await;

        let id = product_id.to_string();
        form.bind(RawFormData::from([
            ("productid", id.as_str()),
            ("code", "ACME"),
            ("price", "cheap"),
        ]));
        assert!(!form.is_valid());
        assert!(matches!(form.save(&storage).await, Err(GridError::InvalidForm)));
        assert_eq!(storage.write_count(), 0);

        let document = form.document().unwrap();
        assert_eq!(document.errors["price"], vec!["Enter a number.".to_owned()]);
        assert_eq!(document.data.unwrap()["price"], vec!["cheap".to_owned()]);
    }

    #[tokio::test]
    async fn valid_form_saves_through_the_cell() {
        let storage = MockCatalogueStorage::new();
        let (product_id, mut form) = partner_form(&storage).await;

        let id = product_id.to_string();
        assert!(form.bind(RawFormData::from([
            ("productid", id.as_str()),
            ("code", "ACME"),
            ("price", "9.99"),
        ])));
        assert_eq!(form.save(&storage).await.unwrap(), SaveOutcome::Created);

        let record = storage.stockrecord(product_id, "ACME").unwrap();
        assert_eq!(record.partner_sku, "U1");
        assert_eq!(record.price, Some(rust_decimal::Decimal::new(999, 2)));
    }

    #[tokio::test]
    async fn attribute_named_like_a_hidden_field_can_be_saved() {
        let storage = MockCatalogueStorage::new();
        let class = storage.add_product_class("Part");
        storage.add_attribute(class, "code", "Code", crate::catalogue::AttributeType::Text, &[]);
        let product_id = storage.add_product("P1", "Bolt", Some(class));
        let cell = Table::get_field(&storage, &TableOptions::default(), product_id, "code")
            .await
            .unwrap();
        let mut form = CellForm::new(cell, "/cell").unwrap();

        let names: Vec<_> = form.fields().keys().map(String::as_str).collect();
        assert_eq!(names, ["cell_code", "code", "productid"]);
        assert!(form.fields()["code"].hidden);

        let id = product_id.to_string();
        assert!(form.bind(RawFormData::from([
            ("productid", id.as_str()),
            ("code", "code"),
            ("cell_code", "X-1"),
        ])));
        assert_eq!(form.save(&storage).await.unwrap(), SaveOutcome::Created);
        assert_eq!(
            storage.attribute_value(product_id, "code"),
            Some(crate::catalogue::AttributeValueData::Text("X-1".to_owned()))
        );
    }
}
