//! Query-string arguments for table selects.

use crate::error::AppError;
use crate::metadata::TableMetadata;
use crate::sql::{SelectArgs, SortOrder};
use serde_json::{Map, Value};

/// Raw arguments echoed back in the envelope.
pub fn arguments_map(params: &[(String, String)]) -> Map<String, Value> {
    params
        .iter()
        .map(|(k, v)| (k.clone(), Value::String(v.clone())))
        .collect()
}

/// Build select arguments from the query string, validated against the table's columns.
pub fn parse_select_args(
    table: &TableMetadata,
    params: &[(String, String)],
    default_limit: Option<u64>,
) -> Result<SelectArgs, AppError> {
    let mut args = SelectArgs::default();
    // None: absent; Some(None): explicitly unlimited.
    let mut limit: Option<Option<u64>> = None;

    for (key, raw) in params {
        match key.as_str() {
            "where" => args.filters.extend(parse_where(table, raw)?),
            "order_by" => {
                let col = raw.trim();
                if !table.has_column(col) {
                    return Err(unknown_column("order_by", col, &table.name));
                }
                args.order_by = Some(col.to_string());
            }
            "sort" => args.sort = SortOrder::parse(raw),
            "limit" => limit = Some(parse_limit(raw)?),
            "offset" => args.offset = Some(parse_offset(raw)?),
            _ => match table.column(key) {
                Some(c) => args.filters.push((key.clone(), c.coerce(raw))),
                None => tracing::warn!(
                    target: "api",
                    table = %table.name,
                    argument = %key,
                    "ignoring unknown query argument"
                ),
            },
        }
    }

    match limit {
        None => {
            args.offset = None;
            args.limit = default_limit;
        }
        Some(None) => {
            args.offset = None;
            args.limit = None;
        }
        Some(Some(n)) => args.limit = Some(n),
    }
    Ok(args)
}

fn unknown_column(arg: &str, column: &str, table: &str) -> AppError {
    AppError::InvalidQueryArg {
        arg: arg.to_string(),
        reason: format!("Column `{}` does not exist in `{}`.", column, table),
    }
}

/// `0` and `-1` mean no limit.
fn parse_limit(raw: &str) -> Result<Option<u64>, AppError> {
    match raw.trim().parse::<i64>() {
        Ok(0) | Ok(-1) => Ok(None),
        Ok(n) if n > 0 => Ok(Some(n as u64)),
        _ => Err(AppError::InvalidQueryArg {
            arg: "limit".into(),
            reason: format!("`{}` is not a valid limit; use a positive integer, 0 or -1.", raw),
        }),
    }
}

fn parse_offset(raw: &str) -> Result<u64, AppError> {
    raw.trim().parse::<u64>().map_err(|_| AppError::InvalidQueryArg {
        arg: "offset".into(),
        reason: format!("`{}` is not a valid offset; use a non-negative integer.", raw),
    })
}

/// Parse `col=value [AND col=value ...]`; values may be single or double quoted.
pub fn parse_where(table: &TableMetadata, raw: &str) -> Result<Vec<(String, Value)>, AppError> {
    let mut out = Vec::new();
    for cond in split_and(raw) {
        let cond = cond.trim();
        if cond.is_empty() {
            continue;
        }
        let Some((col, value)) = cond.split_once('=') else {
            return Err(AppError::InvalidQueryArg {
                arg: "where".into(),
                reason: format!("`{}` is not a `column=value` condition.", cond),
            });
        };
        let col = col.trim();
        let Some(column) = table.column(col) else {
            return Err(unknown_column("where", col, &table.name));
        };
        out.push((col.to_string(), column.coerce(unquote(value.trim()))));
    }
    Ok(out)
}

/// Split on ` AND ` (any case) outside quotes.
fn split_and(raw: &str) -> Vec<&str> {
    let lower = raw.to_ascii_lowercase();
    let bytes = raw.as_bytes();
    let lower = lower.as_bytes();
    let mut parts = Vec::new();
    let mut quote: Option<u8> = None;
    let mut start = 0;
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        match quote {
            Some(q) if b == q => quote = None,
            Some(_) => {}
            None if b == b'\'' || b == b'"' => quote = Some(b),
            None if lower[i..].starts_with(b" and ") => {
                parts.push(&raw[start..i]);
                i += " and ".len();
                start = i;
                continue;
            }
            None => {}
        }
        i += 1;
    }
    parts.push(&raw[start..]);
    parts
}

fn unquote(v: &str) -> &str {
    for q in ['\'', '"'] {
        if v.len() >= 2 && v.starts_with(q) && v.ends_with(q) {
            return &v[1..v.len() - 1];
        }
    }
    v
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::ColumnMetadata;
    use serde_json::json;

    fn users() -> TableMetadata {
        let mut id = ColumnMetadata::new("id", "INTEGER");
        id.primary_key = true;
        TableMetadata::new(
            "users",
            vec![
                id,
                ColumnMetadata::new("name", "TEXT"),
                ColumnMetadata::new("active", "BOOLEAN"),
            ],
        )
    }

    fn params(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn column_arguments_become_coerced_filters() {
        let args = parse_select_args(&users(), &params(&[("id", "3"), ("color", "red")]), Some(100)).unwrap();
        assert_eq!(args.filters, vec![("id".to_string(), json!(3))]);
        assert_eq!(args.limit, Some(100));
    }

    #[test]
    fn where_splits_on_and_in_any_case() {
        let f = parse_where(&users(), "name='Ann and Bo' and active=true AND id = \"2\"").unwrap();
        assert_eq!(
            f,
            vec![
                ("name".to_string(), json!("Ann and Bo")),
                ("active".to_string(), json!(true)),
                ("id".to_string(), json!(2)),
            ]
        );
    }

    #[test]
    fn where_rejects_unknown_columns_and_bad_conditions() {
        assert!(matches!(
            parse_where(&users(), "age=3"),
            Err(AppError::InvalidQueryArg { .. })
        ));
        assert!(parse_where(&users(), "name").is_err());
    }

    #[test]
    fn order_by_must_be_a_column() {
        let err = parse_select_args(&users(), &params(&[("order_by", "age")]), None).unwrap_err();
        assert!(matches!(err, AppError::InvalidQueryArg { ref arg, .. } if arg == "order_by"));
        let args = parse_select_args(&users(), &params(&[("order_by", "name"), ("sort", "DESC")]), None).unwrap();
        assert_eq!(args.order_by.as_deref(), Some("name"));
        assert_eq!(args.sort, SortOrder::Desc);
    }

    #[test]
    fn offset_without_limit_is_dropped() {
        let args = parse_select_args(&users(), &params(&[("offset", "10")]), Some(100)).unwrap();
        assert_eq!(args.limit, Some(100));
        assert_eq!(args.offset, None);
    }

    #[test]
    fn unlimited_drops_offset_and_default() {
        for raw in ["0", "-1"] {
            let args = parse_select_args(&users(), &params(&[("limit", raw), ("offset", "5")]), Some(100)).unwrap();
            assert_eq!(args.limit, None);
            assert_eq!(args.offset, None);
        }
    }

    #[test]
    fn explicit_limit_keeps_offset() {
        let args = parse_select_args(&users(), &params(&[("limit", "10"), ("offset", "20")]), Some(100)).unwrap();
        assert_eq!(args.limit, Some(10));
        assert_eq!(args.offset, Some(20));
    }

    #[test]
    fn non_numeric_paging_is_rejected() {
        assert!(parse_select_args(&users(), &params(&[("limit", "ten")]), None).is_err());
        assert!(parse_select_args(&users(), &params(&[("limit", "-5")]), None).is_err());
        assert!(parse_select_args(&users(), &params(&[("limit", "5"), ("offset", "x")]), None).is_err());
    }
}
