use super::cell::{Cell, GridCell};
use super::error::GridError;
use crate::catalogue::{
    AttributeId, CatalogueProduct, Product, ProductAttribute, ProductAttributeValue, ProductClass, ProductId,
    StockRecord,
};
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::{Arc, OnceLock};

/// A loaded product shared by every cell of its row.
///
/// Lookups by attribute code and by partner code go through indexes that are
/// built on first use and then reused by every cell of the row.
#[derive(Debug)]
pub struct RowProduct {
    entry: CatalogueProduct,
    values_by_code: OnceLock<HashMap<String, usize>>,
    stockrecords_by_partner: OnceLock<HashMap<String, usize>>,
}

impl RowProduct {
    pub fn new(entry: CatalogueProduct) -> Self {
        Self {
            entry,
            values_by_code: OnceLock::new(),
            stockrecords_by_partner: OnceLock::new(),
        }
    }

    pub fn id(&self) -> ProductId {
        self.entry.product.id
    }

    pub fn product(&self) -> &Product {
        &self.entry.product
    }

    pub fn product_class(&self) -> Result<Option<&ProductClass>, GridError> {
        self.entry
            .product_class
            .get()
            .map(Option::as_ref)
            .ok_or(GridError::NotPrefetched("product_class"))
    }

    /// Attributes declared by the product's class.
    pub fn class_attributes(&self) -> Result<&[ProductAttribute], GridError> {
        self.entry
            .class_attributes
            .get()
            .map(Vec::as_slice)
            .ok_or(GridError::NotPrefetched("class_attributes"))
    }

    /// The declaration of `code` on the product's own class, if any.
    pub fn declared_attribute(&self, code: &str) -> Result<Option<&ProductAttribute>, GridError> {
        Ok(self
            .class_attributes()?
            .iter()
            .find(|attribute| attribute.code == code))
    }

    pub fn attribute_value(&self, code: &str) -> Result<Option<&ProductAttributeValue>, GridError> {
        let values = self
            .entry
            .attribute_values
            .get()
            .ok_or(GridError::NotPrefetched("attribute_values"))?;
        let index = self.values_by_code.get_or_init(|| {
            // A product that changed class may hold values for several
            // declarations of one code; the own class declaration wins.
            let declared: Vec<AttributeId> = self
                .entry
                .class_attributes
                .get()
                .map(|attributes| attributes.iter().map(|attribute| attribute.id).collect())
                .unwrap_or_default();
            let mut index = HashMap::new();
            for (position, value) in values.iter().enumerate() {
                match index.entry(value.attribute_code.clone()) {
                    Entry::Vacant(slot) => {
                        slot.insert(position);
                    }
                    Entry::Occupied(mut slot) => {
                        if declared.contains(&value.attribute_id) {
                            slot.insert(position);
                        }
                    }
                }
            }
            index
        });
        Ok(index.get(code).and_then(|&position| values.get(position)))
    }

    pub fn stockrecord(&self, partner_code: &str) -> Result<Option<&StockRecord>, GridError> {
        let records = self
            .entry
            .stockrecords
            .get()
            .ok_or(GridError::NotPrefetched("stockrecords"))?;
        let index = self.stockrecords_by_partner.get_or_init(|| {
            records
                .iter()
                .enumerate()
                .map(|(position, record)| (record.partner_code.clone(), position))
                .collect()
        });
        Ok(index.get(partner_code).and_then(|&position| records.get(position)))
    }
}

/// One product of the grid and its cells, in column order.
#[derive(Debug)]
pub struct Row {
    product: Arc<RowProduct>,
    cells: Vec<Cell>,
}

impl Row {
    pub fn new(entry: CatalogueProduct) -> Self {
        Self {
            product: Arc::new(RowProduct::new(entry)),
            cells: Vec::new(),
        }
    }

    pub fn product(&self) -> &Arc<RowProduct> {
        &self.product
    }

    pub fn product_id(&self) -> ProductId {
        self.product.id()
    }

    pub fn add_cell(&mut self, cell: Cell) {
        self.cells.push(cell);
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn cell(&self, code: &str) -> Option<&Cell> {
        self.cells.iter().find(|cell| cell.code() == code)
    }

    pub fn into_cell(self, code: &str) -> Option<Cell> {
        self.cells.into_iter().find(|cell| cell.code() == code)
    }
}
