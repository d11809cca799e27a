//! Field checks for request bodies.
//!
//! A [`Validator`] collects at most one error per field and turns them into a
//! single 400 response with a `field_errors` map.

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::database::models::StringEnum;
use crate::database::record::{value_as_f64, Record};
use crate::error::ApiError;

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap());
static PHONE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\+?[0-9]{8,15}$").unwrap());

pub fn is_valid_email(value: &str) -> bool {
    EMAIL_RE.is_match(value.trim())
}

/// Spaces, dashes and dots are separators, not part of the number
pub fn normalize_phone(value: &str) -> String {
    value.chars().filter(|c| !matches!(c, ' ' | '-' | '.')).collect()
}

pub fn is_valid_phone(value: &str) -> bool {
    PHONE_RE.is_match(&normalize_phone(value))
}

fn is_blank(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.trim().is_empty(),
        Some(Value::Array(a)) => a.is_empty(),
        _ => false,
    }
}

pub struct Validator<'a> {
    data: &'a Record,
    partial: bool,
    errors: BTreeMap<String, String>,
}

impl<'a> Validator<'a> {
    /// Validator for a create body: required fields must be present
    pub fn new(data: &'a Record) -> Self {
        Self { data, partial: false, errors: BTreeMap::new() }
    }

    /// Validator for an update patch: absent fields are left alone
    pub fn for_update(data: &'a Record) -> Self {
        Self { data, partial: true, errors: BTreeMap::new() }
    }

    fn has_error(&self, field: &str) -> bool {
        self.errors.contains_key(field)
    }

    /// Present and not null; checks below skip absent values
    fn value(&self, field: &str) -> Option<&'a Value> {
        if self.has_error(field) {
            return None;
        }
        self.data.get(field).filter(|v| !v.is_null())
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) -> &mut Self {
        self.errors.entry(field.to_string()).or_insert_with(|| message.into());
        self
    }

    pub fn required(&mut self, field: &str) -> &mut Self {
        let present = self.data.contains_key(field);
        if (self.partial && !present) || !is_blank(self.data.get(field)) {
            return self;
        }
        self.add(field, format!("Le champ '{}' est requis", field))
    }

    pub fn email(&mut self, field: &str) -> &mut Self {
        if let Some(value) = self.value(field) {
            let ok = value.as_str().map(is_valid_email).unwrap_or(false);
            if !ok {
                self.add(field, "Format d'email invalide");
            }
        }
        self
    }

    pub fn phone(&mut self, field: &str) -> &mut Self {
        if let Some(value) = self.value(field) {
            let ok = value.as_str().map(is_valid_phone).unwrap_or(false);
            if !ok {
                self.add(field, "Format de numéro de téléphone invalide");
            }
        }
        self
    }

    pub fn one_of<E: StringEnum>(&mut self, field: &str) -> &mut Self {
        if let Some(value) = self.value(field) {
            let ok = value.as_str().and_then(E::parse).is_some();
            if !ok {
                self.add(
                    field,
                    format!("Valeur invalide pour '{}'. Valeurs acceptées: {}", field, E::VALUES.join(", ")),
                );
            }
        }
        self
    }

    pub fn non_negative(&mut self, field: &str) -> &mut Self {
        if let Some(value) = self.value(field) {
            match value_as_f64(value) {
                Some(n) if n >= 0.0 => {}
                Some(_) => {
                    self.add(field, format!("Le champ '{}' ne peut pas être négatif", field));
                }
                None => {
                    self.add(field, format!("Le champ '{}' doit être un nombre", field));
                }
            }
        }
        self
    }

    pub fn positive(&mut self, field: &str) -> &mut Self {
        if let Some(value) = self.value(field) {
            match value_as_f64(value) {
                Some(n) if n > 0.0 => {}
                Some(_) => {
                    self.add(field, format!("Le champ '{}' doit être supérieur à zéro", field));
                }
                None => {
                    self.add(field, format!("Le champ '{}' doit être un nombre", field));
                }
            }
        }
        self
    }

    pub fn integer(&mut self, field: &str) -> &mut Self {
        if let Some(value) = self.value(field) {
            let ok = match value {
                Value::Number(n) => n.is_i64() || n.is_u64(),
                Value::String(s) => s.trim().parse::<i64>().is_ok(),
                _ => false,
            };
            if !ok {
                self.add(field, format!("Le champ '{}' doit être un nombre entier", field));
            }
        }
        self
    }

    pub fn min_len(&mut self, field: &str, min: usize) -> &mut Self {
        if let Some(value) = self.value(field) {
            let len = value.as_str().map(|s| s.chars().count()).unwrap_or(0);
            if len < min {
                self.add(field, format!("Le champ '{}' doit contenir au moins {} caractères", field, min));
            }
        }
        self
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// First error becomes the message; all of them go in `field_errors`
    pub fn finish(&mut self) -> Result<(), ApiError> {
        if self.errors.is_empty() {
            return Ok(());
        }
        let errors = std::mem::take(&mut self.errors);
        let message = errors.values().next().cloned().unwrap_or_else(|| "Données invalides".to_string());
        Err(ApiError::validation_error(message, Some(errors)))
    }
}
