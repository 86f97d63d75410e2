//! Current cell values and the display filter used by the grid and the export.

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

pub const CHECK_ICON: &str = r#"<i class="fas fa-check text-success"></i>"#;
pub const CROSS_ICON: &str = r#"<i class="fas fa-times text-danger"></i>"#;

/// The value a cell currently shows.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CellValue {
    Null,
    Text(String),
    Integer(i64),
    Float(f64),
    Decimal(Decimal),
    Boolean(bool),
    Date(NaiveDate),
    Datetime(DateTime<Utc>),
}

impl CellValue {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn display(&self) -> String {
        display(self)
    }
}

/// Renders a value for the grid: null is blank and booleans become icons.
pub fn display(value: &CellValue) -> String {
    match value {
        CellValue::Null => String::new(),
        CellValue::Boolean(true) => CHECK_ICON.to_owned(),
        CellValue::Boolean(false) => CROSS_ICON.to_owned(),
        CellValue::Text(text) => text.clone(),
        CellValue::Integer(number) => number.to_string(),
        CellValue::Float(number) => number.to_string(),
        CellValue::Decimal(number) => number.to_string(),
        CellValue::Date(date) => date.format("%Y-%m-%d").to_string(),
        CellValue::Datetime(datetime) => datetime.to_rfc3339_opts(SecondsFormat::Secs, true),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn null_is_blank_and_booleans_are_icons() {
        assert_eq!(display(&CellValue::Null), "");
        assert_eq!(display(&CellValue::Boolean(true)), CHECK_ICON);
        assert_eq!(display(&CellValue::Boolean(false)), CROSS_ICON);
    }

    #[test]
    fn scalars_keep_their_string_form() {
        assert_eq!(display(&CellValue::Text("Red".into())), "Red");
        assert_eq!(display(&CellValue::Integer(-3)), "-3");
        assert_eq!(display(&CellValue::Decimal(Decimal::new(990, 2))), "9.90");
        assert_eq!(
            display(&CellValue::Date(NaiveDate::from_ymd_opt(2024, 2, 29).unwrap())),
            "2024-02-29"
        );
        assert_eq!(
            display(&CellValue::Datetime(
                Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap()
            )),
            "2024-01-02T03:04:05Z"
        );
    }

    #[test]
    fn null_serializes_as_json_null() {
        assert_eq!(serde_json::to_value(CellValue::Null).unwrap(), serde_json::Value::Null);
        assert_eq!(
            serde_json::to_value(CellValue::Decimal(Decimal::new(999, 2))).unwrap(),
            serde_json::json!("9.99")
        );
    }
}
