//! Form field descriptors and validation of submitted values.
//!
//! A cell describes its inputs as a [`FieldSet`]; a submitted form arrives as
//! [`RawFormData`] and is cleaned field by field into [`CleanedData`] or a
//! per-field list of error messages.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;
use std::str::FromStr;

pub type FieldSet = BTreeMap<String, FormField>;
pub type CleanedData = BTreeMap<String, FieldValue>;
pub type FormErrors = BTreeMap<String, Vec<String>>;

pub const REQUIRED_MESSAGE: &str = "This field is required.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Choice {
    pub value: String,
    pub label: String,
}

impl Choice {
    pub fn new(value: impl ToString, label: impl Into<String>) -> Self {
        Self {
            value: value.to_string(),
            label: label.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Widget {
    Text { max_length: Option<usize> },
    Textarea,
    Integer,
    Float,
    Decimal { max_digits: u32, decimal_places: u32 },
    Checkbox,
    Date,
    Datetime,
    Select { choices: Vec<Choice> },
    SelectMultiple { choices: Vec<Choice> },
}

/// A typed form value, used both as a field's initial value and as the
/// cleaned result of a submission.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Null,
    Text(String),
    Integer(i64),
    Float(f64),
    Decimal(Decimal),
    Boolean(bool),
    Date(NaiveDate),
    Datetime(DateTime<Utc>),
    Choice(i64),
    Choices(Vec<i64>),
}

impl FieldValue {
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Null => true,
            Self::Text(text) => text.is_empty(),
            Self::Choices(ids) => ids.is_empty(),
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FormField {
    pub label: String,
    pub widget: Widget,
    pub required: bool,
    pub hidden: bool,
    pub initial: FieldValue,
}

impl FormField {
    pub fn new(label: impl Into<String>, widget: Widget) -> Self {
        Self {
            label: label.into(),
            widget,
            required: false,
            hidden: false,
            initial: FieldValue::Null,
        }
    }

    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    pub fn initial(mut self, initial: FieldValue) -> Self {
        self.initial = initial;
        self
    }

    /// Validates the submitted value(s) of `name`.
    pub fn clean(&self, name: &str, raw: &RawFormData) -> Result<FieldValue, String> {
        match &self.widget {
            Widget::Checkbox => {
                let checked = raw.last(name).is_some_and(|value| {
                    !(value.is_empty() || value.eq_ignore_ascii_case("false"))
                });
                if self.required && !checked {
                    return Err(REQUIRED_MESSAGE.to_owned());
                }
                Ok(FieldValue::Boolean(checked))
            }
            Widget::SelectMultiple { choices } => {
                let values: Vec<&str> = raw
                    .values(name)
                    .into_iter()
                    .map(str::trim)
                    .filter(|value| !value.is_empty())
                    .collect();
                if values.is_empty() {
                    return if self.required {
                        Err(REQUIRED_MESSAGE.to_owned())
                    } else {
                        Ok(FieldValue::Choices(Vec::new()))
                    };
                }
                let mut ids = Vec::with_capacity(values.len());
                for value in values {
                    let id = choice_id(choices, value)?;
                    if !ids.contains(&id) {
                        ids.push(id);
                    }
                }
                Ok(FieldValue::Choices(ids))
            }
            widget => {
                let value = raw.last(name).map(str::trim).unwrap_or_default();
                if value.is_empty() {
                    return if self.required {
                        Err(REQUIRED_MESSAGE.to_owned())
                    } else {
                        Ok(FieldValue::Null)
                    };
                }
                clean_single(widget, value)
            }
        }
    }
}

fn clean_single(widget: &Widget, value: &str) -> Result<FieldValue, String> {
    match widget {
        Widget::Text { max_length } => {
            let length = value.chars().count();
            match max_length {
                Some(max) if length > *max => Err(format!(
                    "Ensure this value has at most {max} characters (it has {length})."
                )),
                _ => Ok(FieldValue::Text(value.to_owned())),
            }
        }
        Widget::Textarea => Ok(FieldValue::Text(value.to_owned())),
        Widget::Integer => value
            .parse::<i64>()
            .map(FieldValue::Integer)
            .map_err(|_| "Enter a whole number.".to_owned()),
        Widget::Float => match value.parse::<f64>() {
            Ok(number) if number.is_finite() => Ok(FieldValue::Float(number)),
            _ => Err("Enter a number.".to_owned()),
        },
        Widget::Decimal {
            max_digits,
            decimal_places,
        } => {
            let number = Decimal::from_str(value).map_err(|_| "Enter a number.".to_owned())?;
            check_digits(number, *max_digits, *decimal_places)?;
            Ok(FieldValue::Decimal(number))
        }
        Widget::Date => NaiveDate::parse_from_str(value, "%Y-%m-%d")
            .map(FieldValue::Date)
            .map_err(|_| "Enter a valid date.".to_owned()),
        Widget::Datetime => parse_datetime(value)
            .map(FieldValue::Datetime)
            .ok_or_else(|| "Enter a valid date/time.".to_owned()),
        Widget::Select { choices } => choice_id(choices, value).map(FieldValue::Choice),
        Widget::SelectMultiple { choices } => {
            choice_id(choices, value).map(|id| FieldValue::Choices(vec![id]))
        }
        Widget::Checkbox => Ok(FieldValue::Boolean(!value.eq_ignore_ascii_case("false"))),
    }
}

fn choice_id(choices: &[Choice], value: &str) -> Result<i64, String> {
    let invalid = || format!("Select a valid choice. {value} is not one of the available choices.");
    if !choices.iter().any(|choice| choice.value == value) {
        return Err(invalid());
    }
    value.parse::<i64>().map_err(|_| invalid())
}

fn parse_datetime(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed.with_timezone(&Utc));
    }
    ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .map(|naive| naive.and_utc())
}

/// Digit limits of a fixed-precision column, counted on the value as typed.
fn check_digits(number: Decimal, max_digits: u32, decimal_places: u32) -> Result<(), String> {
    let mantissa_digits = {
        let mut rest = number.mantissa().unsigned_abs();
        let mut count = 1;
        while rest >= 10 {
            rest /= 10;
            count += 1;
        }
        count
    };
    let decimals = number.scale();
    let digits = mantissa_digits.max(decimals);
    let whole_digits = digits - decimals;

    if digits > max_digits {
        return Err(format!(
            "Ensure that there are no more than {max_digits} digits in total."
        ));
    }
    if decimals > decimal_places {
        return Err(format!(
            "Ensure that there are no more than {decimal_places} decimal places."
        ));
    }
    if whole_digits > max_digits - decimal_places {
        return Err(format!(
            "Ensure that there are no more than {} digits before the decimal point.",
            max_digits - decimal_places
        ));
    }
    Ok(())
}

/// A submitted form body as name/value pairs; names may repeat.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawFormData {
    pairs: Vec<(String, String)>,
}

impl RawFormData {
    pub fn new(pairs: Vec<(String, String)>) -> Self {
        Self { pairs }
    }

    pub fn values(&self, name: &str) -> Vec<&str> {
        self.pairs
            .iter()
            .filter(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
            .collect()
    }

    /// The last value submitted for `name`.
    pub fn last(&self, name: &str) -> Option<&str> {
        self.pairs
            .iter()
            .rev()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

impl From<Vec<(String, String)>> for RawFormData {
    fn from(pairs: Vec<(String, String)>) -> Self {
        Self::new(pairs)
    }
}

impl<const N: usize> From<[(&str, &str); N]> for RawFormData {
    fn from(pairs: [(&str, &str); N]) -> Self {
        Self::new(
            pairs
                .into_iter()
                .map(|(key, value)| (key.to_owned(), value.to_owned()))
                .collect(),
        )
    }
}

/// Cleans every field of `fields`, collecting all errors.
pub fn clean_fields(fields: &FieldSet, raw: &RawFormData) -> Result<CleanedData, FormErrors> {
    let mut cleaned = CleanedData::new();
    let mut errors = FormErrors::new();
    for (name, field) in fields {
        match field.clean(name, raw) {
            Ok(value) => {
                cleaned.insert(name.clone(), value);
            }
            Err(message) => errors.entry(name.clone()).or_default().push(message),
        }
    }
    if errors.is_empty() {
        Ok(cleaned)
    } else {
        Err(errors)
    }
}
