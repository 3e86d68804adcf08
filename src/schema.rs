//! Declarative document schemas.
//!
//! A [`Schema`] is plain data: an ordered list of field descriptors plus a
//! list of rules keyed by field name. [`Schema::validate`] walks them in
//! order against anything implementing [`Document`], so entities, active
//! models and request payloads are all checked by the same routine.

use std::fmt;

use email_address::EmailAddress;
use sea_orm::{ActiveValue, DbErr, SqlErr};
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Integer,
    Bool,
    Reference,
    List,
}

/// A borrowed view of one field of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldValue<'a> {
    Text(&'a str),
    Integer(i64),
    Bool(bool),
    Reference(Uuid),
    /// Lists are only ever checked for presence, so only their length is exposed.
    List(usize),
}

impl FieldValue<'_> {
    pub fn kind(&self) -> FieldKind {
        match self {
            FieldValue::Text(_) => FieldKind::Text,
            FieldValue::Integer(_) => FieldKind::Integer,
            FieldValue::Bool(_) => FieldKind::Bool,
            FieldValue::Reference(_) => FieldKind::Reference,
            FieldValue::List(_) => FieldKind::List,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldDefault {
    Text(&'static str),
    Integer(i64),
    Bool(bool),
    EmptyList,
}

#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    /// Message reported when the field is absent; `None` makes it optional.
    pub required: Option<&'static str>,
    pub default: Option<FieldDefault>,
}

impl FieldSpec {
    pub const fn required(name: &'static str, kind: FieldKind, message: &'static str) -> Self {
        Self {
            name,
            kind,
            required: Some(message),
            default: None,
        }
    }

    pub const fn optional(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            required: None,
            default: None,
        }
    }

    pub const fn with_default(self, default: FieldDefault) -> Self {
        Self {
            default: Some(default),
            ..self
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    MinLength(usize),
    MaxLength(usize),
    Alphanumeric,
    Email,
    Min(i64),
    OneOf(&'static [&'static str]),
    /// Enforced by a unique index in the store, see [`Schema::unique_violation`].
    Unique,
}

impl Rule {
    /// Rules that do not apply to the value's kind pass.
    fn accepts(&self, value: &FieldValue<'_>) -> bool {
        match (self, value) {
            (Rule::MinLength(min), FieldValue::Text(text)) => text.chars().count() >= *min,
            (Rule::MaxLength(max), FieldValue::Text(text)) => text.chars().count() <= *max,
            (Rule::Alphanumeric, FieldValue::Text(text)) => {
                !text.is_empty() && text.chars().all(|c| c.is_ascii_alphanumeric())
            }
            (Rule::Email, FieldValue::Text(text)) => EmailAddress::is_valid(text),
            (Rule::Min(min), FieldValue::Integer(value)) => value >= min,
            (Rule::OneOf(allowed), FieldValue::Text(text)) => allowed.iter().any(|a| a == text),
            _ => true,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FieldRule {
    pub field: &'static str,
    pub rule: Rule,
    pub message: &'static str,
}

impl FieldRule {
    pub const fn new(field: &'static str, rule: Rule, message: &'static str) -> Self {
        Self {
            field,
            rule,
            message,
        }
    }
}

#[derive(Debug)]
pub struct Schema {
    /// Collection name, also the prefix of the store's unique constraints.
    pub name: &'static str,
    pub fields: &'static [FieldSpec],
    pub rules: &'static [FieldRule],
}

pub trait Document {
    fn field(&self, name: &str) -> Option<FieldValue<'_>>;

    fn fill_default(&mut self, _name: &str, _default: FieldDefault) {}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

/// One or more offending fields, in schema order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationError {
    pub errors: Vec<FieldError>,
}

impl ValidationError {
    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            errors: vec![FieldError {
                field: field.into(),
                message: message.into(),
            }],
        }
    }

    pub fn message(&self) -> &str {
        self.errors
            .first()
            .map(|e| e.message.as_str())
            .unwrap_or("validation failed")
    }

    pub fn has_field(&self, field: &str) -> bool {
        self.errors.iter().any(|e| e.field == field)
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

impl std::error::Error for ValidationError {}

impl Schema {
    pub fn apply_defaults<D: Document + ?Sized>(&self, doc: &mut D) {
        for spec in self.fields {
            if let Some(default) = spec.default {
                if doc.field(spec.name).is_none() {
                    doc.fill_default(spec.name, default);
                }
            }
        }
    }

    pub fn validate<D: Document + ?Sized>(&self, doc: &D) -> Result<(), ValidationError> {
        let mut errors = Vec::new();
        for spec in self.fields {
            if let Some(message) = self.check_field(spec, doc) {
                errors.push(FieldError {
                    field: spec.name.to_string(),
                    message,
                });
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { errors })
        }
    }

    fn check_field<D: Document + ?Sized>(&self, spec: &FieldSpec, doc: &D) -> Option<String> {
        let value = match doc.field(spec.name) {
            None | Some(FieldValue::Text("")) => {
                return spec.required.map(str::to_string);
            }
            Some(value) => value,
        };

        if value.kind() != spec.kind {
            return Some(format!("invalid {}", spec.name));
        }

        self.rules
            .iter()
            .filter(|r| r.field == spec.name)
            .find(|r| !r.rule.accepts(&value))
            .map(|r| r.message.to_string())
    }

    /// Unwrap a required field, reporting it with the schema's message when
    /// absent.
    pub fn require<V>(&self, field: &str, value: Option<V>) -> Result<V, ValidationError> {
        value.ok_or_else(|| {
            let message = self
                .fields
                .iter()
                .find(|spec| spec.name == field)
                .and_then(|spec| spec.required)
                .map(str::to_string)
                .unwrap_or_else(|| format!("missing {field}"));
            ValidationError::single(field, message)
        })
    }

    /// Translate a unique-constraint violation on this collection into a
    /// validation error for the offending field.
    pub fn unique_violation(&self, err: &DbErr) -> Option<ValidationError> {
        let Some(SqlErr::UniqueConstraintViolation(detail)) = err.sql_err() else {
            return None;
        };
        self.rules
            .iter()
            .filter(|r| r.rule == Rule::Unique)
            .find(|r| detail.contains(&format!("{}_{}_key", self.name, r.field)))
            .map(|r| ValidationError::single(r.field, r.message))
    }
}

/// The value an active model would write, whether freshly set or loaded.
pub fn current<V>(value: &ActiveValue<V>) -> Option<&V>
where
    V: Into<sea_orm::Value>,
{
    match value {
        ActiveValue::Set(v) | ActiveValue::Unchanged(v) => Some(v),
        ActiveValue::NotSet => None,
    }
}

/// `Some` becomes a pending write, `None` leaves the column untouched.
pub fn provided<V>(value: Option<V>) -> ActiveValue<V>
where
    V: Into<sea_orm::Value>,
{
    match value {
        Some(v) => ActiveValue::Set(v),
        None => ActiveValue::NotSet,
    }
}
