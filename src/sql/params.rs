//! Convert serde_json::Value to values the engine adapters can bind.

use serde_json::Value;

/// A statement parameter. Built from JSON; each engine adapter decides how to bind it.
#[derive(Clone, Debug, PartialEq)]
pub enum BindValue {
    Null,
    Bool(bool),
    I64(i64),
    F64(f64),
    Text(String),
    Json(Value),
}

impl BindValue {
    pub fn from_json(v: &Value) -> Self {
        match v {
            Value::Null => BindValue::Null,
            Value::Bool(b) => BindValue::Bool(*b),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    BindValue::I64(i)
                } else if let Some(f) = n.as_f64() {
                    BindValue::F64(f)
                } else {
                    BindValue::Text(n.to_string())
                }
            }
            Value::String(s) => BindValue::Text(s.clone()),
            Value::Array(_) | Value::Object(_) => BindValue::Json(v.clone()),
        }
    }

    /// Text form, used by PostgreSQL where every placeholder carries an explicit cast.
    pub fn to_text(&self) -> Option<String> {
        match self {
            BindValue::Null => None,
            BindValue::Bool(b) => Some(b.to_string()),
            BindValue::I64(n) => Some(n.to_string()),
            BindValue::F64(n) => Some(n.to_string()),
            BindValue::Text(s) => Some(s.clone()),
            BindValue::Json(v) => Some(v.to_string()),
        }
    }
}

impl From<&Value> for BindValue {
    fn from(v: &Value) -> Self {
        BindValue::from_json(v)
    }
}
