//! Shape validation for raw gateway responses.
//!
//! The gateway's API is undocumented and changes between firmware versions.
//! Instead of deserializing responses directly into structs (which either
//! fails opaquely or silently drops data), every endpoint declares a
//! [`Shape`]: the set of required and optional keys the client understands.
//! [`Shape::map`] checks an incoming JSON object against that declaration
//! and reports exactly which required keys are missing and which undeclared
//! keys have appeared, so schema drift shows up as a precise
//! [`Error::SchemaDrift`] instead of a crash somewhere down the line.
//!
//! Mapping is a pure function of its inputs: no I/O, no shared state, safe
//! to call from any number of threads.

use serde_json::{Map, Value};

use crate::error::{Error, Result};

/// How strictly a response is checked against its shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationMode {
    /// Fail with [`Error::SchemaDrift`] when any required field is missing.
    Strict,
    /// Tolerate missing required fields; they stay unset on the output.
    /// Useful for probing an endpoint after a firmware update, before the
    /// shape declaration has caught up.
    Lenient,
}

/// Declarative schema for one endpoint response.
///
/// Required and optional field names must be disjoint. Shapes are `'static`
/// data, initialized once and never mutated.
#[derive(Debug)]
pub struct Shape {
    pub name: &'static str,
    pub required: &'static [&'static str],
    pub optional: &'static [&'static str],
}

/// Tri-state presence of an optional field.
///
/// The wire format distinguishes a key that is absent from a key that is
/// present with a `null` value, and some endpoints rely on the difference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence<T> {
    Absent,
    Null,
    Value(T),
}

impl<T> Presence<T> {
    pub fn is_absent(&self) -> bool {
        matches!(self, Presence::Absent)
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            Presence::Value(v) => Some(v),
            _ => None,
        }
    }

    /// Collapses the tri-state into an `Option`, folding `Null` into `None`.
    pub fn into_option(self) -> Option<T> {
        match self {
            Presence::Value(v) => Some(v),
            _ => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Presence<U> {
        match self {
            Presence::Absent => Presence::Absent,
            Presence::Null => Presence::Null,
            Presence::Value(v) => Presence::Value(f(v)),
        }
    }
}

impl Shape {
    /// Validates `raw` against this shape and returns the extracted view.
    ///
    /// A non-object payload is a protocol violation (the transport handed us
    /// something that cannot match any shape) and reported as [`Error::Api`],
    /// not as drift. Undeclared keys never fail validation by themselves;
    /// they are collected for diagnostics only.
    pub fn map(&'static self, raw: &Value, mode: ValidationMode) -> Result<Mapped> {
        let obj = raw.as_object().ok_or_else(|| {
            Error::Api(format!(
                "expected a JSON object for '{}', got {}",
                self.name,
                json_kind(raw)
            ))
        })?;

        // Collect every missing required field, not just the first one.
        let missing: Vec<&'static str> = self
            .required
            .iter()
            .copied()
            .filter(|field| !obj.contains_key(*field))
            .collect();
        let added: Vec<String> = obj
            .keys()
            .filter(|key| !self.declares(key))
            .cloned()
            .collect();

        if !missing.is_empty() || !added.is_empty() {
            log::warn!(
                "schema drift in '{}': missing fields {:?}, new fields {:?}",
                self.name,
                missing,
                added
            );
        }

        if mode == ValidationMode::Strict && !missing.is_empty() {
            return Err(Error::SchemaDrift {
                shape: self.name,
                missing,
                added,
                raw: raw.clone(),
            });
        }

        Ok(Mapped {
            shape: self,
            raw: obj.clone(),
            missing,
            added,
        })
    }

    fn declares(&self, key: &str) -> bool {
        self.required.iter().any(|f| *f == key) || self.optional.iter().any(|f| *f == key)
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// A validated view over one raw response.
///
/// Field access is lossless: values come back exactly as they appeared on
/// the wire. Typed accessors (`req_f64` and friends) report coercion
/// failures as [`Error::Derivation`], keeping them distinct from drift.
#[derive(Debug, Clone)]
pub struct Mapped {
    shape: &'static Shape,
    raw: Map<String, Value>,
    missing: Vec<&'static str>,
    added: Vec<String>,
}

impl Mapped {
    pub fn shape_name(&self) -> &'static str {
        self.shape.name
    }

    /// Required fields that were absent (only populated in lenient mode;
    /// strict mapping fails before a `Mapped` is built).
    pub fn missing(&self) -> &[&'static str] {
        &self.missing
    }

    /// Keys present on the wire but not declared in the shape.
    pub fn added(&self) -> &[String] {
        &self.added
    }

    pub fn raw(&self) -> &Map<String, Value> {
        &self.raw
    }

    /// The raw payload as an owned value, for keeping a back-reference on
    /// typed responses.
    pub fn to_value(&self) -> Value {
        Value::Object(self.raw.clone())
    }

    /// Looks up a required field.
    ///
    /// This can only fail on a leniently mapped response; the error is a
    /// single-field [`Error::SchemaDrift`] pointing at exactly what the
    /// firmware dropped.
    pub fn required(&self, field: &'static str) -> Result<&Value> {
        self.raw.get(field).ok_or_else(|| Error::SchemaDrift {
            shape: self.shape.name,
            missing: vec![field],
            added: self.added.clone(),
            raw: Value::Object(self.raw.clone()),
        })
    }

    /// Looks up an optional field, preserving the absent/null distinction.
    pub fn optional(&self, field: &str) -> Presence<&Value> {
        match self.raw.get(field) {
            None => Presence::Absent,
            Some(Value::Null) => Presence::Null,
            Some(value) => Presence::Value(value),
        }
    }

    pub fn req_f64(&self, field: &'static str) -> Result<f64> {
        let value = self.required(field)?;
        value
            .as_f64()
            .ok_or_else(|| self.type_error(field, "a number", value))
    }

    pub fn req_i64(&self, field: &'static str) -> Result<i64> {
        let value = self.required(field)?;
        value
            .as_i64()
            .ok_or_else(|| self.type_error(field, "an integer", value))
    }

    /// Required integer field whose value may be `null` on newer firmware.
    pub fn req_nullable_i64(&self, field: &'static str) -> Result<Option<i64>> {
        let value = self.required(field)?;
        if value.is_null() {
            return Ok(None);
        }
        value
            .as_i64()
            .map(Some)
            .ok_or_else(|| self.type_error(field, "an integer or null", value))
    }

    pub fn req_bool(&self, field: &'static str) -> Result<bool> {
        let value = self.required(field)?;
        value
            .as_bool()
            .ok_or_else(|| self.type_error(field, "a boolean", value))
    }

    pub fn req_str(&self, field: &'static str) -> Result<&str> {
        let value = self.required(field)?;
        value
            .as_str()
            .ok_or_else(|| self.type_error(field, "a string", value))
    }

    pub fn req_string(&self, field: &'static str) -> Result<String> {
        self.req_str(field).map(str::to_string)
    }

    pub fn req_array(&self, field: &'static str) -> Result<&Vec<Value>> {
        let value = self.required(field)?;
        value
            .as_array()
            .ok_or_else(|| self.type_error(field, "an array", value))
    }

    pub fn opt_f64(&self, field: &'static str) -> Result<Presence<f64>> {
        match self.optional(field) {
            Presence::Absent => Ok(Presence::Absent),
            Presence::Null => Ok(Presence::Null),
            Presence::Value(value) => value
                .as_f64()
                .map(Presence::Value)
                .ok_or_else(|| self.type_error(field, "a number", value)),
        }
    }

    pub fn opt_i64(&self, field: &'static str) -> Result<Presence<i64>> {
        match self.optional(field) {
            Presence::Absent => Ok(Presence::Absent),
            Presence::Null => Ok(Presence::Null),
            Presence::Value(value) => value
                .as_i64()
                .map(Presence::Value)
                .ok_or_else(|| self.type_error(field, "an integer", value)),
        }
    }

    pub fn opt_string(&self, field: &'static str) -> Result<Presence<String>> {
        match self.optional(field) {
            Presence::Absent => Ok(Presence::Absent),
            Presence::Null => Ok(Presence::Null),
            Presence::Value(value) => value
                .as_str()
                .map(|s| Presence::Value(s.to_string()))
                .ok_or_else(|| self.type_error(field, "a string", value)),
        }
    }

    /// Builds a derivation error for this shape, for use by catalog code
    /// computing derived fields.
    pub fn derivation_error(&self, field: &str, reason: impl Into<String>) -> Error {
        let reason = reason.into();
        log::warn!(
            "could not derive '{}' of '{}': {}",
            field,
            self.shape.name,
            reason
        );
        Error::Derivation {
            shape: self.shape.name,
            field: field.to_string(),
            reason,
        }
    }

    fn type_error(&self, field: &str, expected: &str, got: &Value) -> Error {
        self.derivation_error(field, format!("expected {}, got {}", expected, json_kind(got)))
    }
}
