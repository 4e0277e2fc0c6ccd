//! Discovered table and column metadata.

use serde::Serialize;
use serde_json::Value;

/// How loosely typed input (query strings, path ids) is coerced for a column.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ColumnKind {
    Integer,
    Float,
    Boolean,
    Text,
}

/// PostgreSQL user-defined type name (`udt_schema`.`udt_name`), used as the bind cast.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct UdtName {
    pub schema: String,
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ColumnMetadata {
    pub name: String,
    /// Declared type as reported by the engine, e.g. `int(11) unsigned`, `character varying`, `INTEGER`.
    pub data_type: String,
    pub nullable: bool,
    pub has_default: bool,
    pub auto_increment: bool,
    pub primary_key: bool,
    pub unique: bool,
    #[serde(skip)]
    pub udt: Option<UdtName>,
}

impl ColumnMetadata {
    /// A plain nullable text column; the retrievers fill in the rest.
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            nullable: true,
            has_default: false,
            auto_increment: false,
            primary_key: false,
            unique: false,
            udt: None,
        }
    }

    /// Declared type without length, precision or modifiers, lowercased.
    pub fn base_type(&self) -> String {
        let lower = self.data_type.to_lowercase();
        let end = lower.find(['(', ' ']).unwrap_or(lower.len());
        lower[..end].to_string()
    }

    pub fn kind(&self) -> ColumnKind {
        let t = self.data_type.to_lowercase();
        if t.contains("bool") || t.starts_with("tinyint(1)") {
            ColumnKind::Boolean
        } else if t.contains("interval") || t.contains("point") {
            ColumnKind::Text
        } else if t.contains("int") || t.contains("serial") {
            ColumnKind::Integer
        } else if ["real", "floa", "doub", "dec", "numeric"].iter().any(|p| t.contains(p)) {
            ColumnKind::Float
        } else {
            ColumnKind::Text
        }
    }

    /// Must be supplied on insert: not nullable, no default, not generated.
    pub fn is_required(&self) -> bool {
        !self.nullable && !self.has_default && !self.auto_increment
    }

    /// Coerce a raw string into the JSON value best matching this column. Unparsable input stays a string.
    pub fn coerce(&self, raw: &str) -> Value {
        let trimmed = raw.trim();
        match self.kind() {
            ColumnKind::Integer => trimmed
                .parse::<i64>()
                .map(|n| Value::Number(n.into()))
                .unwrap_or_else(|_| Value::String(raw.to_string())),
            ColumnKind::Float => trimmed
                .parse::<f64>()
                .ok()
                .and_then(serde_json::Number::from_f64)
                .map(Value::Number)
                .unwrap_or_else(|| Value::String(raw.to_string())),
            ColumnKind::Boolean => match trimmed.to_lowercase().as_str() {
                "true" | "1" => Value::Bool(true),
                "false" | "0" => Value::Bool(false),
                _ => Value::String(raw.to_string()),
            },
            ColumnKind::Text => Value::String(raw.to_string()),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TableMetadata {
    pub name: String,
    pub columns: Vec<ColumnMetadata>,
    /// The single primary key column; `None` for tables without one or with a composite key.
    pub primary_key: Option<String>,
}

impl TableMetadata {
    pub fn new(name: impl Into<String>, columns: Vec<ColumnMetadata>) -> Self {
        let mut pks = columns.iter().filter(|c| c.primary_key);
        let primary_key = match (pks.next(), pks.next()) {
            (Some(pk), None) => Some(pk.name.clone()),
            _ => None,
        };
        Self {
            name: name.into(),
            columns,
            primary_key,
        }
    }

    pub fn column(&self, name: &str) -> Option<&ColumnMetadata> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn primary_key_column(&self) -> Option<&ColumnMetadata> {
        self.primary_key.as_deref().and_then(|pk| self.column(pk))
    }

    pub fn required_columns(&self) -> Vec<&str> {
        self.columns
            .iter()
            .filter(|c| c.is_required())
            .map(|c| c.name.as_str())
            .collect()
    }

    /// Single-column unique constraints, primary key excluded.
    pub fn unique_columns(&self) -> Vec<&str> {
        self.columns
            .iter()
            .filter(|c| c.unique && !c.primary_key)
            .map(|c| c.name.as_str())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn col(name: &str, data_type: &str) -> ColumnMetadata {
        ColumnMetadata::new(name, data_type)
    }

    #[test]
    fn kinds_from_declared_types() {
        assert_eq!(col("a", "int(11) unsigned").kind(), ColumnKind::Integer);
        assert_eq!(col("a", "INTEGER").kind(), ColumnKind::Integer);
        assert_eq!(col("a", "bigint").kind(), ColumnKind::Integer);
        assert_eq!(col("a", "tinyint(1)").kind(), ColumnKind::Boolean);
        assert_eq!(col("a", "boolean").kind(), ColumnKind::Boolean);
        assert_eq!(col("a", "decimal(10,2)").kind(), ColumnKind::Float);
        assert_eq!(col("a", "double precision").kind(), ColumnKind::Float);
        assert_eq!(col("a", "interval").kind(), ColumnKind::Text);
        assert_eq!(col("a", "point").kind(), ColumnKind::Text);
        assert_eq!(col("a", "character varying").kind(), ColumnKind::Text);
    }

    #[test]
    fn base_type_strips_modifiers() {
        assert_eq!(col("a", "INT(11) UNSIGNED").base_type(), "int");
        assert_eq!(col("a", "decimal(10,2)").base_type(), "decimal");
        assert_eq!(col("a", "timestamp with time zone").base_type(), "timestamp");
    }

    #[test]
    fn coercion_falls_back_to_string() {
        assert_eq!(col("a", "integer").coerce("42"), json!(42));
        assert_eq!(col("a", "integer").coerce("abc"), json!("abc"));
        assert_eq!(col("a", "real").coerce("1.5"), json!(1.5));
        assert_eq!(col("a", "boolean").coerce("TRUE"), json!(true));
        assert_eq!(col("a", "boolean").coerce("0"), json!(false));
        assert_eq!(col("a", "boolean").coerce("maybe"), json!("maybe"));
        assert_eq!(col("a", "text").coerce("007"), json!("007"));
    }

    #[test]
    fn single_primary_key_is_detected() {
        let mut id = col("id", "INTEGER");
        id.primary_key = true;
        id.auto_increment = true;
        id.nullable = false;
        let mut email = col("email", "TEXT");
        email.unique = true;
        email.nullable = false;
        let t = TableMetadata::new("users", vec![id, email, col("bio", "TEXT")]);
        assert_eq!(t.primary_key.as_deref(), Some("id"));
        assert_eq!(t.required_columns(), vec!["email"]);
        assert_eq!(t.unique_columns(), vec!["email"]);
        assert!(t.has_column("bio"));
        assert!(!t.has_column("missing"));
    }

    #[test]
    fn composite_primary_key_is_not_addressable() {
        let mut a = col("a", "INTEGER");
        a.primary_key = true;
        let mut b = col("b", "INTEGER");
        b.primary_key = true;
        let t = TableMetadata::new("pairs", vec![a, b]);
        assert_eq!(t.primary_key, None);
    }
}
