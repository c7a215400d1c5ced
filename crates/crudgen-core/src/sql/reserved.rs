use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;

/// MySQL 8 reserved words. An alias equal to one of these cannot be used
/// unquoted in generated code, so it gets a `field_` prefix.
static RESERVED: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "accessible", "add", "all", "alter", "analyze", "and", "as", "asc", "asensitive",
        "before", "between", "bigint", "binary", "blob", "both", "by", "call", "cascade",
        "case", "change", "char", "character", "check", "collate", "column", "condition",
        "constraint", "continue", "convert", "create", "cross", "cube", "cume_dist",
        "current_date", "current_time", "current_timestamp", "current_user", "cursor",
        "database", "databases", "day_hour", "day_microsecond", "day_minute", "day_second",
        "dec", "decimal", "declare", "default", "delayed", "delete", "dense_rank", "desc",
        "describe", "deterministic", "distinct", "distinctrow", "div", "double", "drop",
        "dual", "each", "else", "elseif", "empty", "enclosed", "escaped", "except", "exists",
        "exit", "explain", "false", "fetch", "first_value", "float", "for", "force",
        "foreign", "from", "fulltext", "function", "generated", "get", "grant", "group",
        "grouping", "groups", "having", "high_priority", "hour_microsecond", "hour_minute",
        "hour_second", "if", "ignore", "in", "index", "infile", "inner", "inout",
        "insensitive", "insert", "int", "integer", "interval", "into", "is", "iterate",
        "join", "json_table", "key", "keys", "kill", "lag", "last_value", "lateral", "lead",
        "leading", "leave", "left", "like", "limit", "linear", "lines", "load", "localtime",
        "localtimestamp", "lock", "long", "longblob", "longtext", "loop", "low_priority",
        "match", "maxvalue", "mediumblob", "mediumint", "mediumtext", "middleint",
        "minute_microsecond", "minute_second", "mod", "modifies", "natural", "not",
        "no_write_to_binlog", "nth_value", "ntile", "null", "numeric", "of", "on",
        "optimize", "option", "optionally", "or", "order", "out", "outer", "outfile", "over",
        "partition", "percent_rank", "precision", "primary", "procedure", "purge", "range",
        "rank", "read", "reads", "read_write", "real", "recursive", "references", "regexp",
        "release", "rename", "repeat", "replace", "require", "resignal", "restrict",
        "return", "revoke", "right", "rlike", "row", "rows", "row_number", "schema",
        "schemas", "second_microsecond", "select", "sensitive", "separator", "set", "show",
        "signal", "smallint", "spatial", "specific", "sql", "sqlexception", "sqlstate",
        "sqlwarning", "sql_big_result", "sql_calc_found_rows", "sql_small_result", "ssl",
        "starting", "stored", "straight_join", "system", "table", "terminated", "then",
        "tinyblob", "tinyint", "tinytext", "to", "trailing", "trigger", "true", "undo",
        "union", "unique", "unlock", "unsigned", "update", "usage", "use", "using",
        "utc_date", "utc_time", "utc_timestamp", "values", "varbinary", "varchar",
        "varcharacter", "varying", "virtual", "when", "where", "while", "window", "with",
        "write", "xor", "year_month", "zerofill",
    ]
    .into_iter()
    .collect()
});

pub fn is_reserved(word: &str) -> bool {
    RESERVED.contains(word.to_ascii_lowercase().as_str())
}

/// Make an alias safe to use as a generated identifier.
pub fn sanitize_alias(alias: &str) -> String {
    let alias = alias.trim();
    if alias.is_empty() {
        return "field_result".to_string();
    }
    if is_reserved(alias) {
        return format!("field_{alias}");
    }
    alias.to_string()
}

/// Reduce arbitrary expression text to an identifier fragment:
/// `COUNT(*)` -> `count_all`, `o.total_amount` -> `o_total_amount`.
pub fn identifier_fragment(text: &str) -> String {
    static NON_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-z0-9_]+").unwrap());
    static REPEATED: Lazy<Regex> = Lazy::new(|| Regex::new(r"_{2,}").unwrap());

    let lowered = text.to_ascii_lowercase().replace('*', "all");
    let replaced = NON_WORD.replace_all(&lowered, "_");
    let collapsed = REPEATED.replace_all(&replaced, "_");
    collapsed.trim_matches('_').to_string()
}

/// Append `_2`, `_3`, ... until `alias` is not in `used`, then record it.
pub fn unique_alias(alias: String, used: &mut HashSet<String>) -> String {
    if used.insert(alias.to_ascii_lowercase()) {
        return alias;
    }
    let mut n = 2;
    loop {
        let candidate = format!("{alias}_{n}");
        if used.insert(candidate.to_ascii_lowercase()) {
            return candidate;
        }
        n += 1;
    }
}
