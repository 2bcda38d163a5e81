//! Functions generated code may call.
//!
//! Only side-effect free scalar, aggregate and window functions are listed.
//! Anything else is rejected by the access check and rated at least mutating
//! by the classifier: some functions run SQL text of their own
//! (`query_to_xml`, `dblink`), others change state (`setval`,
//! `pg_terminate_backend`, `load_extension`).

use sqlparser::ast::ObjectName;

use crate::db::DatabaseBackend;

const COMMON: &[&str] = &[
    "abs",
    "avg",
    "coalesce",
    "count",
    "cume_dist",
    "current_date",
    "current_time",
    "current_timestamp",
    "date",
    "dense_rank",
    "first_value",
    "lag",
    "last_value",
    "lead",
    "length",
    "lower",
    "ltrim",
    "max",
    "min",
    "nth_value",
    "ntile",
    "nullif",
    "percent_rank",
    "rank",
    "replace",
    "round",
    "row_number",
    "rtrim",
    "substr",
    "sum",
    "upper",
];

const SQLITE: &[&str] = &[
    "datetime",
    "group_concat",
    "ifnull",
    "iif",
    "instr",
    "julianday",
    "printf",
    "strftime",
    "time",
    "total",
    "typeof",
    "unixepoch",
];

const POSTGRES: &[&str] = &[
    "age",
    "array_agg",
    "bool_and",
    "bool_or",
    "ceil",
    "ceiling",
    "char_length",
    "character_length",
    "concat",
    "concat_ws",
    "date_part",
    "date_trunc",
    "floor",
    "greatest",
    "initcap",
    "least",
    "left",
    "lpad",
    "now",
    "right",
    "rpad",
    "split_part",
    "string_agg",
    "strpos",
    "to_char",
    "to_date",
    "to_timestamp",
];

/// Returns true if `name` is an unqualified function known to be pure on `backend`.
pub fn is_allowed_function(name: &ObjectName, backend: DatabaseBackend) -> bool {
    let [ident] = name.0.as_slice() else {
        return false;
    };
    let name = ident.value.to_ascii_lowercase();
    let backend_specific = match backend {
        DatabaseBackend::Sqlite => SQLITE,
        DatabaseBackend::Postgres => POSTGRES,
    };
    COMMON.contains(&name.as_str()) || backend_specific.contains(&name.as_str())
}
