//! Request body validation against discovered table metadata.

use crate::error::AppError;
use crate::metadata::TableMetadata;
use serde_json::{Map, Value};

pub struct RequestValidator;

impl RequestValidator {
    /// The body must be a non-empty JSON object.
    pub fn body_object(table: &str, body: Value) -> Result<Map<String, Value>, AppError> {
        match body {
            Value::Object(map) if !map.is_empty() => Ok(map),
            _ => Err(AppError::NoDataProvided(table.to_string())),
        }
    }

    /// Full validation (POST, PUT): known columns only and every required column present.
    pub fn validate(table: &TableMetadata, body: &Map<String, Value>) -> Result<(), AppError> {
        Self::validate_partial(table, body)?;
        let missing: Vec<&str> = table
            .required_columns()
            .into_iter()
            .filter(|c| body.get(*c).map_or(true, Value::is_null))
            .collect();
        if !missing.is_empty() {
            return Err(AppError::InvalidFields {
                table: table.name.clone(),
                fields: missing.join(", "),
                reason: "missing required fields",
            });
        }
        Ok(())
    }

    /// Validate only the fields present in body (PATCH). Required columns are not enforced.
    pub fn validate_partial(table: &TableMetadata, body: &Map<String, Value>) -> Result<(), AppError> {
        let unknown: Vec<&str> = body
            .keys()
            .filter(|k| !table.has_column(k))
            .map(String::as_str)
            .collect();
        if !unknown.is_empty() {
            return Err(AppError::InvalidFields {
                table: table.name.clone(),
                fields: unknown.join(", "),
                reason: "unknown fields",
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::ColumnMetadata;
    use serde_json::json;

    fn users() -> TableMetadata {
        let mut id = ColumnMetadata::new("id", "INTEGER");
        id.primary_key = true;
        id.auto_increment = true;
        let mut email = ColumnMetadata::new("email", "TEXT");
        email.nullable = false;
        TableMetadata::new("users", vec![id, email, ColumnMetadata::new("bio", "TEXT")])
    }

    fn obj(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn empty_or_non_object_bodies_are_rejected() {
        assert!(matches!(
            RequestValidator::body_object("users", json!({})),
            Err(AppError::NoDataProvided(_))
        ));
        assert!(matches!(
            RequestValidator::body_object("users", json!([1, 2])),
            Err(AppError::NoDataProvided(_))
        ));
        assert!(RequestValidator::body_object("users", json!({"email": "a@b"})).is_ok());
    }

    #[test]
    fn unknown_fields_are_listed() {
        let err = RequestValidator::validate_partial(&users(), &obj(json!({"email": "x", "age": 3}))).unwrap_err();
        match err {
            AppError::InvalidFields { fields, reason, .. } => {
                assert_eq!(fields, "age");
                assert_eq!(reason, "unknown fields");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn required_fields_must_be_present_and_non_null() {
        let t = users();
        assert!(RequestValidator::validate(&t, &obj(json!({"bio": "hi"}))).is_err());
        assert!(RequestValidator::validate(&t, &obj(json!({"email": null}))).is_err());
        assert!(RequestValidator::validate(&t, &obj(json!({"email": "a@b"}))).is_ok());
        assert!(RequestValidator::validate_partial(&t, &obj(json!({"bio": "hi"}))).is_ok());
    }
}
