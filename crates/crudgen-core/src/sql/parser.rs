//! Single `SELECT` statement parsing and schema reconciliation.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use sqlparser::ast::{
    Join, JoinConstraint, JoinOperator, ObjectName, Query, SelectItem, SetExpr, Statement,
    TableFactor, TableWithJoins,
};
use sqlparser::dialect::MySqlDialect;
use sqlparser::parser::Parser;
use crudgen_shared::GeneratorMetrics;
use tracing::{debug, info, instrument};

use crate::enhancer::FieldEnhancer;
use crate::error::{ErrorCode, GeneratorError, Result};
use crate::model::{
    EnhancedField, FieldDef, FormType, JoinType, ParseResult, SchemaColumnMeta, TableRef, TypeTag,
};
use crate::schema::SchemaProvider;
use crate::sql::expr::{column_parts, default_alias, infer_type, is_boolean_name, stringify};
use crate::sql::reserved::{sanitize_alias, unique_alias};

/// Tables and fields of a statement, before any schema lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedStatement {
    pub tables: Vec<TableRef>,
    pub fields: Vec<FieldDef>,
}

/// Parse one `SELECT` statement into tables and fields.
///
/// Rejects empty input, multiple statements, anything but a plain `SELECT`,
/// and bare `*` projections.
pub fn parse_statement(sql: &str) -> Result<ParsedStatement> {
    if sql.trim().is_empty() {
        return Err(GeneratorError::empty_sql());
    }

    let mut statements = Parser::parse_sql(&MySqlDialect {}, sql)
        .map_err(|e| GeneratorError::invalid_sql(format!("SQL syntax error: {e}")))?;

    let statement = match statements.len() {
        0 => return Err(GeneratorError::empty_sql()),
        1 => statements.remove(0),
        _ => return Err(GeneratorError::invalid_sql("unsupported: multiple statements")),
    };

    let Statement::Query(query) = statement else {
        return Err(GeneratorError::unsupported_sql(
            "only SELECT statements are supported",
        ));
    };
    let SetExpr::Select(select) = *query.body else {
        return Err(GeneratorError::unsupported_sql(
            "only a plain SELECT is supported (no UNION or VALUES)",
        ));
    };

    if select.from.is_empty() {
        return Err(GeneratorError::invalid_sql("SELECT without FROM has no table to scaffold"));
    }

    let tables = extract_tables(&select.from)?;
    let fields = extract_fields(&select.projection)?;

    Ok(ParsedStatement { tables, fields })
}

fn object_name(name: &ObjectName) -> String {
    name.0
        .iter()
        .map(|ident| ident.value.as_str())
        .collect::<Vec<_>>()
        .join(".")
}

fn derived_name(subquery: &Query) -> String {
    format!("({subquery})")
}

fn table_ref(
    factor: &TableFactor,
    join_type: JoinType,
    on_condition: Option<String>,
) -> Result<TableRef> {
    match factor {
        TableFactor::Table { name, alias, .. } => Ok(TableRef {
            name: object_name(name),
            alias: alias.as_ref().map(|a| a.name.value.clone()),
            join_type,
            on_condition,
            derived: false,
        }),
        TableFactor::Derived {
            subquery, alias, ..
        } => Ok(TableRef {
            name: derived_name(subquery),
            alias: alias.as_ref().map(|a| a.name.value.clone()),
            join_type,
            on_condition,
            derived: true,
        }),
        other => Err(GeneratorError::unsupported_sql(format!(
            "unsupported table source: {other}"
        ))),
    }
}

fn join_keyword(operator: &JoinOperator) -> (&'static str, Option<&JoinConstraint>) {
    match operator {
        JoinOperator::Inner(JoinConstraint::Natural) => ("NATURAL", None),
        JoinOperator::Inner(constraint) => ("INNER", Some(constraint)),
        JoinOperator::LeftOuter(constraint) => ("LEFT OUTER", Some(constraint)),
        JoinOperator::RightOuter(constraint) => ("RIGHT OUTER", Some(constraint)),
        JoinOperator::FullOuter(constraint) => ("FULL OUTER", Some(constraint)),
        JoinOperator::CrossJoin => ("CROSS", None),
        _ => ("CROSS", None),
    }
}

fn join_condition(constraint: Option<&JoinConstraint>) -> Result<Option<String>> {
    match constraint {
        Some(JoinConstraint::On(expr)) => stringify(expr).map(Some),
        Some(JoinConstraint::Using(columns)) => Ok(Some(format!(
            "USING ({})",
            columns
                .iter()
                .map(|c| c.value.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        ))),
        _ => Ok(None),
    }
}

fn joined_table(join: &Join) -> Result<TableRef> {
    let (keyword, constraint) = join_keyword(&join.join_operator);
    table_ref(
        &join.relation,
        JoinType::from_keyword(keyword),
        join_condition(constraint)?,
    )
}

fn extract_tables(from: &[TableWithJoins]) -> Result<Vec<TableRef>> {
    let mut tables = Vec::new();
    for (i, source) in from.iter().enumerate() {
        // `FROM a, b` lists extra sources without a join keyword
        let join_type = if i == 0 { JoinType::Main } else { JoinType::Cross };
        tables.push(table_ref(&source.relation, join_type, None)?);
        for join in &source.joins {
            tables.push(joined_table(join)?);
        }
    }
    Ok(tables)
}

fn extract_fields(projection: &[SelectItem]) -> Result<Vec<FieldDef>> {
    let mut used = HashSet::new();
    let mut fields = Vec::with_capacity(projection.len());

    for item in projection {
        let (expr, explicit) = match item {
            SelectItem::UnnamedExpr(expr) => (expr, None),
            SelectItem::ExprWithAlias { expr, alias } => (expr, Some(alias.value.clone())),
            _ => {
                return Err(GeneratorError::invalid_sql(
                    "SELECT * is not allowed, list the columns explicitly",
                ))
            }
        };

        let original = stringify(expr)?;
        let alias = sanitize_alias(&explicit.unwrap_or_else(|| default_alias(expr)));
        let alias = unique_alias(alias, &mut used);

        let mut field = FieldDef::new(original, alias, infer_type(expr))?;
        if let Some((qualifier, column)) = column_parts(expr) {
            field = field.with_column(qualifier, column);
        }
        fields.push(field);
    }

    Ok(fields)
}

/// Find the schema entry for a plain column reference.
///
/// A qualified column is looked up in its own table first; otherwise the
/// first table declaring a column of that name wins.
fn match_column<'a>(
    field: &FieldDef,
    tables: &[TableRef],
    columns: &'a BTreeMap<String, Vec<SchemaColumnMeta>>,
) -> Option<&'a SchemaColumnMeta> {
    let column = field.column.as_deref()?;
    let find = |table: &str| {
        columns
            .get(table)
            .and_then(|cols| cols.iter().find(|c| c.field.eq_ignore_ascii_case(column)))
    };

    if let Some(qualifier) = field.qualifier.as_deref() {
        let owner = tables
            .iter()
            .filter(|t| !t.derived)
            .find(|t| {
                t.qualifier().eq_ignore_ascii_case(qualifier)
                    || t.name.eq_ignore_ascii_case(qualifier)
            });
        if let Some(meta) = owner.and_then(|t| find(t.name.as_str())) {
            return Some(meta);
        }
    }

    let mut seen = HashSet::new();
    tables
        .iter()
        .filter(|t| !t.derived && seen.insert(t.name.as_str()))
        .find_map(|t| find(t.name.as_str()))
}

/// Parses statements and reconciles them against live column metadata.
pub struct SqlParser {
    schema: Arc<dyn SchemaProvider>,
    enhancer: FieldEnhancer,
}

impl SqlParser {
    pub fn new(schema: Arc<dyn SchemaProvider>) -> Self {
        Self {
            schema,
            enhancer: FieldEnhancer::new(),
        }
    }

    /// Parse `sql`, load the schema of every referenced table and enhance
    /// each selected field.
    #[instrument(skip(self, sql), fields(sql_len = sql.len()))]
    pub async fn parse(&self, sql: &str) -> Result<ParseResult> {
        let result = self.parse_and_enhance(sql).await;
        GeneratorMetrics::sql_parsed(result.is_ok());
        result
    }

    async fn parse_and_enhance(&self, sql: &str) -> Result<ParseResult> {
        let ParsedStatement { tables, fields } = parse_statement(sql)?;
        debug!(tables = tables.len(), fields = fields.len(), "statement parsed");

        let table_fields_by_name = self.load_columns(&tables).await?;

        let mut enhanced: Vec<EnhancedField> = Vec::with_capacity(fields.len());
        for mut field in fields {
            let meta = match_column(&field, &tables, &table_fields_by_name);
            if let (Some(meta), Some(column)) = (meta, field.column.as_deref()) {
                if !is_boolean_name(column) {
                    field.inferred_type = TypeTag::from_column_type(&meta.column_type);
                }
            }
            enhanced.push(self.enhancer.enhance(&field, meta)?);
        }

        let rich_editor_fields: Vec<EnhancedField> = enhanced
            .iter()
            .filter(|f| f.form_type == FormType::RichEditor)
            .cloned()
            .collect();

        info!(
            tables = tables.len(),
            fields = enhanced.len(),
            rich_editor = rich_editor_fields.len(),
            "SQL parsed"
        );

        Ok(ParseResult {
            tables,
            fields: enhanced,
            has_rich_editor: !rich_editor_fields.is_empty(),
            rich_editor_fields,
            table_fields_by_name,
            original_sql: sql.to_string(),
        })
    }

    /// One sequential lookup per distinct physical table.
    async fn load_columns(
        &self,
        tables: &[TableRef],
    ) -> Result<BTreeMap<String, Vec<SchemaColumnMeta>>> {
        let mut by_name = BTreeMap::new();
        for table in tables.iter().filter(|t| !t.derived) {
            if by_name.contains_key(&table.name) {
                continue;
            }
            let columns = self.schema.columns(&table.name).await.map_err(|e| {
                e.wrap(
                    ErrorCode::TableFieldsError,
                    format!("failed to load columns of `{}`", table.name),
                )
            })?;
            if columns.is_empty() {
                return Err(GeneratorError::new(
                    ErrorCode::TableFieldsError,
                    format!("table `{}` does not exist or has no columns", table.name),
                ));
            }
            debug!(table = %table.name, columns = columns.len(), "schema loaded");
            by_name.insert(table.name.clone(), columns);
        }
        Ok(by_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{HtmlType, SearchMode};
    use crate::schema::{MockSchemaProvider, StaticSchema};
    use mockall::predicate::eq;

    fn users() -> Vec<SchemaColumnMeta> {
        vec![
            SchemaColumnMeta::new("id", "int(11)").primary(),
            SchemaColumnMeta::new("name", "varchar(64)").not_null(),
            SchemaColumnMeta::new("email", "varchar(128)"),
            SchemaColumnMeta::new("is_admin", "int(11)"),
            SchemaColumnMeta::new("bio", "text"),
        ]
    }

    fn orders() -> Vec<SchemaColumnMeta> {
        vec![
            SchemaColumnMeta::new("id", "bigint(20)").primary(),
            SchemaColumnMeta::new("customer_id", "int(11)").not_null(),
            SchemaColumnMeta::new("total_amount", "decimal(10,2)"),
            SchemaColumnMeta::new("name", "varchar(64)").with_comment("Order label"),
        ]
    }

    fn parser() -> SqlParser {
        SqlParser::new(Arc::new(
            StaticSchema::new()
                .with_table("users", users())
                .with_table("customers", users())
                .with_table("orders", orders()),
        ))
    }

    #[test]
    fn parse_outcomes_are_counted() {
        let recorder = crate::testing::CapturingRecorder::default();
        metrics::with_local_recorder(&recorder, || {
            let parser = parser();
            assert!(tokio_test::block_on(parser.parse("SELECT id FROM users")).is_ok());
            assert!(tokio_test::block_on(parser.parse("SELECT * FROM users")).is_err());
        });

        assert_eq!(
            recorder.counters(),
            [
                "crudgen_sql_parsed_total{status=success}",
                "crudgen_sql_parsed_total{status=error}",
            ]
        );
    }

    #[tokio::test]
    async fn simple_select_against_schema() {
        let result = parser().parse("SELECT id, name, email FROM users").await.unwrap();

        let id = &result.fields[0];
        assert!(id.required && !id.editable && !id.searchable);
        assert_eq!(id.inferred_type, TypeTag::Integer);

        let name = &result.fields[1];
        assert!(name.required && name.searchable);

        let email = &result.fields[2];
        assert!(!email.required);
        assert!(email.searchable);
        assert_eq!(email.html_type, HtmlType::Email);
        assert_eq!(email.search_mode, Some(SearchMode::Like));

        assert_eq!(result.primary_key().map(|f| f.name.as_str()), Some("id"));
        assert!(!result.has_rich_editor);
        assert_eq!(result.original_sql, "SELECT id, name, email FROM users");
    }

    #[tokio::test]
    async fn aliased_columns_and_table() {
        let result = parser()
            .parse("SELECT u.id as user_id, u.name as user_name FROM users u")
            .await
            .unwrap();

        assert_eq!(
            result.tables,
            vec![TableRef {
                name: "users".into(),
                alias: Some("u".into()),
                join_type: JoinType::Main,
                on_condition: None,
                derived: false,
            }]
        );
        let aliases: Vec<&str> = result.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(aliases, ["user_id", "user_name"]);
        assert_eq!(result.fields[0].original, "u.id");
    }

    #[tokio::test]
    async fn left_join_condition_is_stringified() {
        let result = parser()
            .parse(
                "SELECT o.id, c.name, o.total_amount FROM orders o \
                 LEFT JOIN customers c ON c.id = o.customer_id",
            )
            .await
            .unwrap();

        assert_eq!(result.tables.len(), 2);
        assert_eq!(result.tables[1].join_type, JoinType::Left);
        assert_eq!(
            result.tables[1].on_condition.as_deref(),
            Some("c.id = o.customer_id")
        );
        assert_eq!(result.table_fields_by_name.len(), 2);

        // qualified lookup picks customers.name, not orders.name
        assert_eq!(result.fields[1].comment, "Name");
        assert!(result.fields[1].required);
        assert_eq!(result.fields[2].inferred_type, TypeTag::Decimal);
    }

    #[test]
    fn join_keywords() {
        let parsed = parse_statement(
            "SELECT a.id FROM a \
             JOIN b ON a.id = b.a_id \
             INNER JOIN c USING (id) \
             RIGHT OUTER JOIN d ON d.x = a.x \
             CROSS JOIN e \
             NATURAL JOIN f",
        )
        .unwrap();

        let types: Vec<JoinType> = parsed.tables.iter().map(|t| t.join_type).collect();
        assert_eq!(
            types,
            [
                JoinType::Main,
                JoinType::Inner,
                JoinType::Inner,
                JoinType::Right,
                JoinType::Cross,
                JoinType::Inner
            ]
        );
        assert_eq!(parsed.tables[2].on_condition.as_deref(), Some("USING (id)"));
        assert_eq!(parsed.tables[4].on_condition, None);
    }

    #[test]
    fn comma_sources_are_cross() {
        let parsed = parse_statement("SELECT a.id FROM a, b").unwrap();
        assert_eq!(parsed.tables[1].join_type, JoinType::Cross);
    }

    #[test]
    fn derived_tables_are_parenthesised() {
        let parsed =
            parse_statement("SELECT t.total FROM (SELECT SUM(x) AS total FROM y) AS t").unwrap();
        let table = &parsed.tables[0];
        assert!(table.derived);
        assert!(table.name.starts_with("(SELECT"));
        assert!(table.name.ends_with(')'));
        assert_eq!(table.alias.as_deref(), Some("t"));
    }

    #[tokio::test]
    async fn derived_tables_skip_schema() {
        let mut schema = MockSchemaProvider::new();
        schema
            .expect_columns()
            .with(eq("users"))
            .times(1)
            .returning(|_| Ok(users()));

        let result = SqlParser::new(Arc::new(schema))
            .parse("SELECT u.name, t.n FROM users u JOIN (SELECT 1 AS n) t ON t.n = u.id")
            .await
            .unwrap();
        assert_eq!(result.fields.len(), 2);
        assert_eq!(result.table_names(), ["users"]);
    }

    #[test]
    fn star_is_rejected_but_count_star_is_not() {
        let err = parse_statement("SELECT * FROM users").unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidSql);

        let err = parse_statement("SELECT u.* FROM users u").unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidSql);

        let parsed = parse_statement("SELECT COUNT(*) FROM users").unwrap();
        assert_eq!(parsed.fields[0].original, "COUNT(*)");
        assert_eq!(parsed.fields[0].alias, "count_all");
        assert_eq!(parsed.fields[0].inferred_type, TypeTag::Integer);
    }

    #[test]
    fn unaliased_columns_keep_their_names() {
        let columns = ["title", "price", "stock", "sku", "created_at"];
        let sql = format!("SELECT {} FROM products", columns.join(", "));
        let parsed = parse_statement(&sql).unwrap();

        assert_eq!(parsed.fields.len(), columns.len());
        for (field, column) in parsed.fields.iter().zip(columns) {
            assert_eq!(field.alias, column);
            assert_eq!(field.original, column);
        }
    }

    #[test]
    fn reserved_and_duplicate_aliases() {
        let parsed =
            parse_statement("SELECT o.status AS `order`, a + b, a + b, o.id FROM orders o")
                .unwrap();
        let aliases: Vec<&str> = parsed.fields.iter().map(|f| f.alias.as_str()).collect();
        assert_eq!(aliases, ["field_order", "a_plus_b", "a_plus_b_2", "id"]);
    }

    #[test]
    fn rejections() {
        assert_eq!(parse_statement("   ").unwrap_err().code, ErrorCode::EmptySql);
        assert_eq!(
            parse_statement("SELECT id FROM a; SELECT id FROM b")
                .unwrap_err()
                .code,
            ErrorCode::InvalidSql
        );
        assert_eq!(
            parse_statement("DELETE FROM users WHERE id = 1")
                .unwrap_err()
                .code,
            ErrorCode::UnsupportedSql
        );
        assert_eq!(
            parse_statement("SELECT id FROM a UNION SELECT id FROM b")
                .unwrap_err()
                .code,
            ErrorCode::UnsupportedSql
        );

        let err = parse_statement("SELEC id FROM users").unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidSql);
        assert!(err.message.starts_with("SQL syntax error:"));
    }

    #[tokio::test]
    async fn missing_table_is_an_error() {
        let err = parser().parse("SELECT id FROM nope").await.unwrap_err();
        assert_eq!(err.code, ErrorCode::TableFieldsError);
    }

    #[tokio::test]
    async fn provider_failures_are_wrapped() {
        let mut schema = MockSchemaProvider::new();
        schema.expect_columns().returning(|_| {
            Err(GeneratorError::new(ErrorCode::DatabaseError, "connection refused"))
        });

        let err = SqlParser::new(Arc::new(schema))
            .parse("SELECT id FROM users")
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::TableFieldsError);
        assert_eq!(err.root_cause().code, ErrorCode::DatabaseError);
    }

    #[tokio::test]
    async fn boolean_names_beat_declared_types() {
        let result = parser()
            .parse("SELECT is_admin, bio FROM users")
            .await
            .unwrap();
        assert_eq!(result.fields[0].inferred_type, TypeTag::Boolean);
        assert_eq!(result.fields[1].form_type, FormType::RichEditor);
        assert!(result.has_rich_editor);
        assert_eq!(result.rich_editor_fields.len(), 1);
        assert_eq!(result.rich_editor_fields[0].name, "bio");
    }

    #[tokio::test]
    async fn each_table_is_queried_once() {
        let mut schema = MockSchemaProvider::new();
        schema
            .expect_columns()
            .with(eq("users"))
            .times(1)
            .returning(|_| Ok(users()));

        let result = SqlParser::new(Arc::new(schema))
            .parse("SELECT a.id, b.name FROM users a JOIN users b ON a.id = b.id")
            .await
            .unwrap();
        assert_eq!(result.tables.len(), 2);
    }
}
