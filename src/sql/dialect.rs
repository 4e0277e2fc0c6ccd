//! Per-backend quoting, placeholders and select expressions.

use crate::database::Backend;
use crate::metadata::ColumnMetadata;

/// PostgreSQL types the adapter decodes natively; everything else is selected as text.
const PG_NATIVE: &[&str] = &[
    "bool", "int2", "int4", "int8", "float4", "float8", "uuid", "json", "jsonb", "timestamptz",
    "timestamp", "date", "time", "text", "varchar", "bpchar", "name",
];

/// MySQL types selected through `CAST(.. AS CHAR)`.
const MYSQL_AS_CHAR: &[&str] = &[
    "decimal",
    "numeric",
    "bit",
    "year",
    "enum",
    "set",
    "geometry",
    "point",
    "linestring",
    "polygon",
    "multipoint",
    "multilinestring",
    "multipolygon",
    "geometrycollection",
];

/// Quote an identifier. Identifiers only ever come from discovered metadata.
pub fn quote_ident(backend: Backend, name: &str) -> String {
    match backend {
        Backend::MySql => format!("`{}`", name.replace('`', "``")),
        Backend::Postgres | Backend::Sqlite => format!("\"{}\"", name.replace('"', "\"\"")),
    }
}

/// Placeholder for the `n`th (1-based) parameter, bound against `column` when known.
pub fn placeholder(backend: Backend, n: usize, column: Option<&ColumnMetadata>) -> String {
    match backend {
        Backend::Postgres => match column.and_then(|c| c.udt.as_ref()) {
            Some(udt) => format!(
                "${}::{}.{}",
                n,
                quote_ident(backend, &udt.schema),
                quote_ident(backend, &udt.name)
            ),
            None => format!("${}", n),
        },
        Backend::MySql | Backend::Sqlite => "?".to_string(),
    }
}

/// Select-list expression for one column, cast to text where the driver has no decoder.
pub fn select_expr(backend: Backend, column: &ColumnMetadata) -> String {
    let q = quote_ident(backend, &column.name);
    match backend {
        Backend::Postgres => {
            let native = column
                .udt
                .as_ref()
                .map_or(true, |u| u.schema == "pg_catalog" && PG_NATIVE.contains(&u.name.as_str()));
            if native {
                q
            } else {
                format!("{}::text AS {}", q, q)
            }
        }
        Backend::MySql => {
            if MYSQL_AS_CHAR.contains(&column.base_type().as_str()) {
                format!("CAST({} AS CHAR) AS {}", q, q)
            } else {
                q
            }
        }
        Backend::Sqlite => q,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::UdtName;

    fn pg_col(name: &str, udt_schema: &str, udt: &str) -> ColumnMetadata {
        let mut c = ColumnMetadata::new(name, udt);
        c.udt = Some(UdtName {
            schema: udt_schema.into(),
            name: udt.into(),
        });
        c
    }

    #[test]
    fn quoting_doubles_embedded_quotes() {
        assert_eq!(quote_ident(Backend::Postgres, "we\"ird"), "\"we\"\"ird\"");
        assert_eq!(quote_ident(Backend::MySql, "we`ird"), "`we``ird`");
        assert_eq!(quote_ident(Backend::Sqlite, "users"), "\"users\"");
    }

    #[test]
    fn postgres_placeholders_carry_casts() {
        let c = pg_col("id", "pg_catalog", "int4");
        assert_eq!(
            placeholder(Backend::Postgres, 1, Some(&c)),
            "$1::\"pg_catalog\".\"int4\""
        );
        assert_eq!(placeholder(Backend::Postgres, 2, None), "$2");
        assert_eq!(placeholder(Backend::MySql, 3, Some(&c)), "?");
    }

    #[test]
    fn non_native_types_select_as_text() {
        assert_eq!(select_expr(Backend::Postgres, &pg_col("n", "pg_catalog", "int4")), "\"n\"");
        assert_eq!(
            select_expr(Backend::Postgres, &pg_col("p", "pg_catalog", "numeric")),
            "\"p\"::text AS \"p\""
        );
        assert_eq!(
            select_expr(Backend::Postgres, &pg_col("s", "public", "mood")),
            "\"s\"::text AS \"s\""
        );
        assert_eq!(
            select_expr(Backend::MySql, &ColumnMetadata::new("price", "decimal(10,2)")),
            "CAST(`price` AS CHAR) AS `price`"
        );
        assert_eq!(
            select_expr(Backend::MySql, &ColumnMetadata::new("name", "varchar(40)")),
            "`name`"
        );
    }
}
