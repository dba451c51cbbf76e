//! Field validators used by the request schemas.
//!
//! A [`Field`] is a typed slot with `required` / `nullable` flags and a
//! [`Validator`] supplying the format predicate. Assignment goes through
//! [`Field::set`], which checks the rules in a fixed order:
//!
//! 1. absent (missing key or JSON `null`) on a required field: [`FieldError::Missing`]
//! 2. empty on a non-nullable field: [`FieldError::Empty`]
//! 3. present value failing the format check: [`FieldError::InvalidFormat`]
//!
//! A rejected assignment leaves the slot untouched.

use chrono::{Local, NaiveDate};
use regex::Regex;
use serde_json::{Map, Value};
use std::fmt;
use std::sync::OnceLock;

/// Date layout accepted by date fields (`DD.MM.YYYY`).
pub const DATE_FORMAT: &str = "%d.%m.%Y";

/// Oldest accepted age for a birthday, in 365-day years.
pub const MAX_AGE_YEARS: f64 = 70.0;

/// Reason a field rejected a value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldError {
    /// Value is absent but the field is required.
    Missing,
    /// Value is empty but the field is not nullable.
    Empty,
    /// Value is present but has the wrong type or format.
    InvalidFormat(String),
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldError::Missing => write!(f, "missing required value"),
            FieldError::Empty => write!(f, "empty value not permitted"),
            FieldError::InvalidFormat(reason) => write!(f, "invalid format: {}", reason),
        }
    }
}

impl std::error::Error for FieldError {}

/// Type and format predicate for one kind of field.
pub trait Validator {
    /// Parsed value stored in the slot.
    type Output;

    /// Whether `raw` counts as empty for the nullable check.
    fn is_empty(&self, raw: &Value) -> bool {
        is_blank(raw)
    }

    /// Checks and converts a present, non-empty value.
    fn parse(&self, raw: &Value) -> Result<Self::Output, String>;
}

/// `null`, `""`, `[]` and `{}` are blank.
pub fn is_blank(raw: &Value) -> bool {
    match raw {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        Value::Bool(_) | Value::Number(_) => false,
    }
}

/// A validated slot on a request schema.
pub struct Field<V: Validator> {
    name: &'static str,
    required: bool,
    nullable: bool,
    validator: V,
    value: Option<V::Output>,
}

impl<V: Validator> Field<V> {
    pub fn new(name: &'static str, validator: V, required: bool, nullable: bool) -> Self {
        Self {
            name,
            required,
            nullable,
            validator,
            value: None,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Validates `raw` and stores it on success.
    ///
    /// `None` and `Some(Value::Null)` are both treated as an absent value.
    /// Accepted empty values leave the slot unset.
    pub fn set(&mut self, raw: Option<&Value>) -> Result<(), FieldError> {
        let next = self.check(raw)?;
        self.value = next;
        Ok(())
    }

    fn check(&self, raw: Option<&Value>) -> Result<Option<V::Output>, FieldError> {
        let Some(raw) = raw.filter(|value| !value.is_null()) else {
            if self.required {
                return Err(FieldError::Missing);
            }
            if !self.nullable {
                return Err(FieldError::Empty);
            }
            return Ok(None);
        };

        if self.validator.is_empty(raw) {
            if !self.nullable {
                return Err(FieldError::Empty);
            }
            return Ok(None);
        }

        self.validator
            .parse(raw)
            .map(Some)
            .map_err(FieldError::InvalidFormat)
    }

    pub fn get(&self) -> Option<&V::Output> {
        self.value.as_ref()
    }

    pub fn is_set(&self) -> bool {
        self.value.is_some()
    }
}

fn phone_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^7\d{10}$").expect("phone pattern compiles"))
}

fn date_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^\d{2}\.\d{2}\.\d{4}$").expect("date pattern compiles"))
}

/// Plain string.
#[derive(Debug, Clone, Copy, Default)]
pub struct CharField;

impl Validator for CharField {
    type Output = String;

    fn parse(&self, raw: &Value) -> Result<String, String> {
        raw.as_str()
            .map(str::to_owned)
            .ok_or_else(|| format!("expected a string, got {}", kind_of(raw)))
    }
}

/// String containing `@`.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmailField;

impl Validator for EmailField {
    type Output = String;

    fn parse(&self, raw: &Value) -> Result<String, String> {
        let email = CharField.parse(raw)?;
        if !email.contains('@') {
            return Err("email must contain '@'".to_string());
        }
        Ok(email)
    }
}

/// Phone number as it arrived on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Phone {
    Number(u64),
    Text(String),
}

impl Phone {
    /// Decimal digits of the number.
    pub fn digits(&self) -> String {
        match self {
            Phone::Number(n) => n.to_string(),
            Phone::Text(s) => s.clone(),
        }
    }
}

impl fmt::Display for Phone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phone::Number(n) => write!(f, "{}", n),
            Phone::Text(s) => f.write_str(s),
        }
    }
}

/// Integer or string of 11 digits starting with `7`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PhoneField;

impl Validator for PhoneField {
    type Output = Phone;

    fn parse(&self, raw: &Value) -> Result<Phone, String> {
        let phone = match raw {
            Value::Number(n) => n
                .as_u64()
                .map(Phone::Number)
                .ok_or_else(|| format!("phone must be a non-negative integer, got {}", n))?,
            Value::String(s) => Phone::Text(s.clone()),
            other => {
                return Err(format!(
                    "phone must be a number or string, got {}",
                    kind_of(other)
                ))
            }
        };

        if !phone_pattern().is_match(&phone.digits()) {
            return Err("phone must have 11 digits starting with 7".to_string());
        }
        Ok(phone)
    }
}

/// `DD.MM.YYYY` calendar date.
#[derive(Debug, Clone, Copy, Default)]
pub struct DateField;

impl Validator for DateField {
    type Output = NaiveDate;

    fn parse(&self, raw: &Value) -> Result<NaiveDate, String> {
        let text = CharField.parse(raw)?;
        if !date_pattern().is_match(&text) {
            return Err(format!("date '{}' does not match DD.MM.YYYY", text));
        }
        NaiveDate::parse_from_str(&text, DATE_FORMAT)
            .map_err(|e| format!("date '{}' is not a calendar date: {}", text, e))
    }
}

/// Date of birth no more than [`MAX_AGE_YEARS`] before `today`.
#[derive(Debug, Clone, Copy)]
pub struct BirthdayField {
    today: NaiveDate,
}

impl BirthdayField {
    /// Measures age against the local calendar date.
    pub fn new() -> Self {
        Self::at(Local::now().date_naive())
    }

    pub fn at(today: NaiveDate) -> Self {
        Self { today }
    }
}

impl Default for BirthdayField {
    fn default() -> Self {
        Self::new()
    }
}

impl Validator for BirthdayField {
    type Output = NaiveDate;

    fn parse(&self, raw: &Value) -> Result<NaiveDate, String> {
        let date = DateField.parse(raw)?;
        let age = (self.today - date).num_days() as f64 / 365.0;
        if age > MAX_AGE_YEARS {
            return Err(format!("age {:.2} exceeds {} years", age, MAX_AGE_YEARS));
        }
        Ok(date)
    }
}

/// Gender code carried by scoring requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Gender {
    Unknown = 0,
    Male = 1,
    Female = 2,
}

impl TryFrom<i64> for Gender {
    type Error = String;

    fn try_from(code: i64) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(Gender::Unknown),
            1 => Ok(Gender::Male),
            2 => Ok(Gender::Female),
            other => Err(format!("gender must be 0, 1 or 2, got {}", other)),
        }
    }
}

/// Integer gender code; only `null` counts as empty since `0` is meaningful.
#[derive(Debug, Clone, Copy, Default)]
pub struct GenderField;

impl Validator for GenderField {
    type Output = Gender;

    fn is_empty(&self, raw: &Value) -> bool {
        raw.is_null()
    }

    fn parse(&self, raw: &Value) -> Result<Gender, String> {
        let code = raw
            .as_i64()
            .ok_or_else(|| format!("gender must be an integer, got {}", kind_of(raw)))?;
        Gender::try_from(code)
    }
}

/// JSON object with the method arguments.
#[derive(Debug, Clone, Copy, Default)]
pub struct ArgumentsField;

impl Validator for ArgumentsField {
    type Output = Map<String, Value>;

    fn is_empty(&self, raw: &Value) -> bool {
        matches!(raw, Value::Object(map) if map.is_empty())
    }

    fn parse(&self, raw: &Value) -> Result<Map<String, Value>, String> {
        raw.as_object()
            .cloned()
            .ok_or_else(|| format!("arguments must be an object, got {}", kind_of(raw)))
    }
}

/// Non-empty list of integer client ids.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClientIdsField;

impl Validator for ClientIdsField {
    type Output = Vec<i64>;

    fn parse(&self, raw: &Value) -> Result<Vec<i64>, String> {
        let items = raw
            .as_array()
            .ok_or_else(|| format!("client_ids must be a list, got {}", kind_of(raw)))?;
        if items.is_empty() {
            return Err("client_ids must not be empty".to_string());
        }
        items
            .iter()
            .map(|item| {
                item.as_i64()
                    .ok_or_else(|| format!("client id {} is not an integer", item))
            })
            .collect()
    }
}

fn kind_of(raw: &Value) -> &'static str {
    match raw {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "object",
    }
}
