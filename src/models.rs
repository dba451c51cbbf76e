//! Request schemas.
//!
//! Each schema is built from a raw JSON object by assigning every declared
//! field in order. Failures are collected rather than short-circuited, so a
//! single [`InvalidFields`] names every bad field at once.

use crate::fields::{
    ArgumentsField, BirthdayField, CharField, ClientIdsField, DateField, EmailField, Field,
    Gender, GenderField, Phone, PhoneField, Validator,
};
use crate::store::ScoreQuery;
use chrono::NaiveDate;
use serde_json::{Map, Value};
use std::fmt;

/// Login that takes the admin authentication path.
pub const ADMIN_LOGIN: &str = "admin";

/// Names of the fields rejected while building a schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidFields {
    pub fields: Vec<&'static str>,
}

impl fmt::Display for InvalidFields {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.fields.join(", "))
    }
}

impl std::error::Error for InvalidFields {}

/// Assigns raw values to fields and remembers which ones failed.
struct FieldCollector<'a> {
    raw: &'a Map<String, Value>,
    invalid: Vec<&'static str>,
}

impl<'a> FieldCollector<'a> {
    fn new(raw: &'a Map<String, Value>) -> Self {
        Self {
            raw,
            invalid: Vec::new(),
        }
    }

    fn assign<V: Validator>(&mut self, field: &mut Field<V>) {
        if let Err(err) = field.set(self.raw.get(field.name())) {
            tracing::debug!(field = field.name(), error = %err, "Field rejected");
            self.invalid.push(field.name());
        }
    }

    fn finish(self) -> Result<(), InvalidFields> {
        if self.invalid.is_empty() {
            Ok(())
        } else {
            Err(InvalidFields {
                fields: self.invalid,
            })
        }
    }
}

/// Outer request record: who is calling, which method, and its arguments.
pub struct MethodEnvelope {
    account: Field<CharField>,
    login: Field<CharField>,
    token: Field<CharField>,
    arguments: Field<ArgumentsField>,
    method: Field<CharField>,
}

impl MethodEnvelope {
    pub fn from_body(body: &Map<String, Value>) -> Result<Self, InvalidFields> {
        let mut envelope = Self {
            account: Field::new("account", CharField, false, true),
            login: Field::new("login", CharField, true, true),
            token: Field::new("token", CharField, true, true),
            arguments: Field::new("arguments", ArgumentsField, true, true),
            method: Field::new("method", CharField, true, false),
        };

        let mut collector = FieldCollector::new(body);
        collector.assign(&mut envelope.account);
        collector.assign(&mut envelope.login);
        collector.assign(&mut envelope.token);
        collector.assign(&mut envelope.arguments);
        collector.assign(&mut envelope.method);
        collector.finish()?;

        Ok(envelope)
    }

    pub fn account(&self) -> Option<&str> {
        self.account.get().map(String::as_str)
    }

    pub fn login(&self) -> Option<&str> {
        self.login.get().map(String::as_str)
    }

    pub fn token(&self) -> Option<&str> {
        self.token.get().map(String::as_str)
    }

    /// Method arguments; `None` when the caller sent an empty object.
    pub fn arguments(&self) -> Option<&Map<String, Value>> {
        self.arguments.get()
    }

    pub fn method(&self) -> &str {
        self.method.get().map(String::as_str).unwrap_or_default()
    }

    pub fn is_admin(&self) -> bool {
        self.login() == Some(ADMIN_LOGIN)
    }
}

/// Arguments of `online_score`.
pub struct ScoreArguments {
    phone: Field<PhoneField>,
    email: Field<EmailField>,
    birthday: Field<BirthdayField>,
    gender: Field<GenderField>,
    first_name: Field<CharField>,
    last_name: Field<CharField>,
}

impl ScoreArguments {
    pub fn from_arguments(arguments: &Map<String, Value>) -> Result<Self, InvalidFields> {
        Self::build(arguments, BirthdayField::new())
    }

    /// Same as [`ScoreArguments::from_arguments`], measuring age against `today`.
    pub fn from_arguments_at(
        arguments: &Map<String, Value>,
        today: NaiveDate,
    ) -> Result<Self, InvalidFields> {
        Self::build(arguments, BirthdayField::at(today))
    }

    fn build(arguments: &Map<String, Value>, birthday: BirthdayField) -> Result<Self, InvalidFields> {
        let mut score = Self {
            phone: Field::new("phone", PhoneField, false, true),
            email: Field::new("email", EmailField, false, true),
            birthday: Field::new("birthday", birthday, false, true),
            gender: Field::new("gender", GenderField, false, true),
            first_name: Field::new("first_name", CharField, false, true),
            last_name: Field::new("last_name", CharField, false, true),
        };

        let mut collector = FieldCollector::new(arguments);
        collector.assign(&mut score.phone);
        collector.assign(&mut score.email);
        collector.assign(&mut score.birthday);
        collector.assign(&mut score.gender);
        collector.assign(&mut score.first_name);
        collector.assign(&mut score.last_name);
        collector.finish()?;

        Ok(score)
    }

    pub fn phone(&self) -> Option<&Phone> {
        self.phone.get()
    }

    pub fn email(&self) -> Option<&str> {
        self.email.get().map(String::as_str)
    }

    pub fn birthday(&self) -> Option<NaiveDate> {
        self.birthday.get().copied()
    }

    pub fn gender(&self) -> Option<Gender> {
        self.gender.get().copied()
    }

    pub fn first_name(&self) -> Option<&str> {
        self.first_name.get().map(String::as_str)
    }

    pub fn last_name(&self) -> Option<&str> {
        self.last_name.get().map(String::as_str)
    }

    /// True when phone & email, first & last name, or birthday & gender are all set.
    pub fn has_any_required_pair(&self) -> bool {
        (self.phone.is_set() && self.email.is_set())
            || (self.first_name.is_set() && self.last_name.is_set())
            || (self.birthday.is_set() && self.gender.is_set())
    }

    /// Names of the fields carrying a value, in declaration order.
    pub fn populated_fields(&self) -> Vec<&'static str> {
        [
            (self.phone.name(), self.phone.is_set()),
            (self.email.name(), self.email.is_set()),
            (self.birthday.name(), self.birthday.is_set()),
            (self.gender.name(), self.gender.is_set()),
            (self.first_name.name(), self.first_name.is_set()),
            (self.last_name.name(), self.last_name.is_set()),
        ]
        .into_iter()
        .filter_map(|(name, set)| set.then_some(name))
        .collect()
    }

    pub fn as_query(&self) -> ScoreQuery<'_> {
        ScoreQuery {
            phone: self.phone(),
            email: self.email(),
            birthday: self.birthday(),
            gender: self.gender(),
            first_name: self.first_name(),
            last_name: self.last_name(),
        }
    }
}

/// Arguments of `clients_interests`.
pub struct InterestsArguments {
    client_ids: Field<ClientIdsField>,
    date: Field<DateField>,
}

impl InterestsArguments {
    pub fn from_arguments(arguments: &Map<String, Value>) -> Result<Self, InvalidFields> {
        let mut interests = Self {
            client_ids: Field::new("client_ids", ClientIdsField, true, false),
            date: Field::new("date", DateField, false, true),
        };

        let mut collector = FieldCollector::new(arguments);
        collector.assign(&mut interests.client_ids);
        collector.assign(&mut interests.date);
        collector.finish()?;

        Ok(interests)
    }

    pub fn client_ids(&self) -> &[i64] {
        self.client_ids.get().map(Vec::as_slice).unwrap_or_default()
    }

    pub fn date(&self) -> Option<NaiveDate> {
        self.date.get().copied()
    }
}
