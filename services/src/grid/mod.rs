//! The editable product grid.
//!
//! A [`Table`] is built per request from a [`TableScope`] and explicit
//! [`TableOptions`]:
//!
//! 1. the scope becomes a [`crate::catalogue::ProductQuery`];
//! 2. every enabled plugin loads its side table once and widens the query with
//!    the relations its cells read;
//! 3. the query runs, one [`Row`] is built per product and each plugin
//!    attaches one [`Cell`] per row per column.
//!
//! Single-cell edits go through [`Table::get_field`] and a [`CellForm`].

pub mod cell;
pub mod column;
pub mod display;
pub mod error;
pub mod field;
pub mod form;
pub mod plugin;
pub mod row;
pub mod table;

pub use cell::{AttachedCell, AttributeCell, Cell, GridCell, PartnerCell, SaveOutcome};
pub use column::Column;
pub use display::{CellValue, display};
pub use error::GridError;
pub use field::{CleanedData, FieldSet, FieldValue, FormErrors, FormField, RawFormData, Widget};
pub use form::{CellForm, FormDocument};
pub use plugin::{FieldsPlugin, PluginKind, PluginMode, load_plugins};
pub use row::{Row, RowProduct};
pub use table::{Page, Table, TableOptions, TableScope};
