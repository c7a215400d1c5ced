//! Canonical rendering and coarse type inference for parsed SQL expressions.

use sqlparser::ast::{
    BinaryOperator, DataType, Expr, Function, FunctionArg, FunctionArgExpr, Ident, UnaryOperator,
    Value,
};

use crate::error::{ErrorCode, GeneratorError, Result};
use crate::model::TypeTag;
use crate::sql::reserved::identifier_fragment;

const AGGREGATES: &[&str] = &["COUNT", "SUM", "AVG", "MIN", "MAX"];
const DATE_FUNCTIONS: &[&str] = &[
    "DATE_FORMAT",
    "DATE",
    "TIME",
    "TIMESTAMP",
    "NOW",
    "CURDATE",
    "CURTIME",
    "FROM_UNIXTIME",
    "STR_TO_DATE",
];
const BOOLEAN_FUNCTIONS: &[&str] = &["IF", "IFNULL", "CASE"];

/// Render an expression back to SQL text.
///
/// Multiplicative operands that are additive expressions are parenthesised so
/// the text keeps the precedence of the tree.
pub fn stringify(expr: &Expr) -> Result<String> {
    match expr {
        Expr::Identifier(ident) => Ok(ident.value.clone()),
        Expr::CompoundIdentifier(parts) => Ok(join_idents(parts)),
        Expr::Value(value) => stringify_value(value),
        Expr::Nested(inner) => Ok(format!("({})", stringify(inner)?)),
        Expr::UnaryOp { op, expr } => {
            let inner = stringify(expr)?;
            Ok(match op {
                UnaryOperator::Not => format!("NOT {inner}"),
                other => format!("{other}{inner}"),
            })
        }
        Expr::BinaryOp { left, op, right } => Ok(format!(
            "{} {op} {}",
            operand(left, op)?,
            operand(right, op)?
        )),
        Expr::Function(func) => stringify_function(func),
        Expr::Case {
            operand,
            conditions,
            results,
            else_result,
            ..
        } => {
            let mut out = String::from("CASE");
            if let Some(operand) = operand {
                out.push(' ');
                out.push_str(&stringify(operand)?);
            }
            for (condition, result) in conditions.iter().zip(results) {
                out.push_str(&format!(
                    " WHEN {} THEN {}",
                    stringify(condition)?,
                    stringify(result)?
                ));
            }
            if let Some(else_result) = else_result {
                out.push_str(&format!(" ELSE {}", stringify(else_result)?));
            }
            out.push_str(" END");
            Ok(out)
        }
        Expr::Cast {
            expr, data_type, ..
        } => Ok(format!("CAST({} AS {data_type})", stringify(expr)?)),
        Expr::IsNull(inner) => Ok(format!("{} IS NULL", stringify(inner)?)),
        Expr::IsNotNull(inner) => Ok(format!("{} IS NOT NULL", stringify(inner)?)),
        Expr::InList {
            expr,
            list,
            negated,
        } => {
            let items = list.iter().map(stringify).collect::<Result<Vec<_>>>()?;
            Ok(format!(
                "{} {}IN ({})",
                stringify(expr)?,
                not(*negated),
                items.join(", ")
            ))
        }
        Expr::Between {
            expr,
            negated,
            low,
            high,
        } => Ok(format!(
            "{} {}BETWEEN {} AND {}",
            stringify(expr)?,
            not(*negated),
            stringify(low)?,
            stringify(high)?
        )),
        Expr::Like {
            negated,
            expr,
            pattern,
            ..
        } => Ok(format!(
            "{} {}LIKE {}",
            stringify(expr)?,
            not(*negated),
            stringify(pattern)?
        )),
        other => Err(GeneratorError::new(
            ErrorCode::ExprStringifyError,
            format!("unsupported expression `{other}`"),
        )),
    }
}

fn not(negated: bool) -> &'static str {
    if negated {
        "NOT "
    } else {
        ""
    }
}

fn join_idents(parts: &[Ident]) -> String {
    parts
        .iter()
        .map(|p| p.value.as_str())
        .collect::<Vec<_>>()
        .join(".")
}

fn stringify_value(value: &Value) -> Result<String> {
    match value {
        Value::Number(n, _) => Ok(n.to_string()),
        Value::SingleQuotedString(s) => Ok(format!("'{}'", s.replace('\'', "''"))),
        Value::DoubleQuotedString(s) => Ok(format!("\"{s}\"")),
        Value::Boolean(true) => Ok("TRUE".to_string()),
        Value::Boolean(false) => Ok("FALSE".to_string()),
        Value::Null => Ok("NULL".to_string()),
        Value::Placeholder(p) => Ok(p.clone()),
        other => Err(GeneratorError::new(
            ErrorCode::ExprStringifyError,
            format!("unsupported literal `{other}`"),
        )),
    }
}

fn precedence(op: &BinaryOperator) -> u8 {
    match op {
        BinaryOperator::Or | BinaryOperator::Xor => 1,
        BinaryOperator::And => 2,
        BinaryOperator::Eq
        | BinaryOperator::NotEq
        | BinaryOperator::Lt
        | BinaryOperator::LtEq
        | BinaryOperator::Gt
        | BinaryOperator::GtEq => 4,
        BinaryOperator::Plus | BinaryOperator::Minus => 6,
        BinaryOperator::Multiply | BinaryOperator::Divide | BinaryOperator::Modulo => 7,
        _ => 5,
    }
}

fn operand(child: &Expr, parent: &BinaryOperator) -> Result<String> {
    let text = stringify(child)?;
    match child {
        Expr::BinaryOp { op, .. } if precedence(op) < precedence(parent) => Ok(format!("({text})")),
        _ => Ok(text),
    }
}

fn function_name(func: &Function) -> String {
    func.name
        .0
        .last()
        .map(|ident| ident.value.to_ascii_uppercase())
        .unwrap_or_default()
}

fn function_args(func: &Function) -> Result<Vec<String>> {
    func.args
        .iter()
        .map(|arg| match arg {
            FunctionArg::Unnamed(arg) | FunctionArg::Named { arg, .. } => match arg {
                FunctionArgExpr::Expr(expr) => stringify(expr),
                FunctionArgExpr::QualifiedWildcard(name) => Ok(format!("{name}.*")),
                FunctionArgExpr::Wildcard => Ok("*".to_string()),
            },
        })
        .collect()
}

fn stringify_function(func: &Function) -> Result<String> {
    let distinct = if func.distinct { "DISTINCT " } else { "" };
    Ok(format!(
        "{}({distinct}{})",
        func.name,
        function_args(func)?.join(", ")
    ))
}

/// Names that denote flags whatever their declared column type.
pub fn is_boolean_name(name: &str) -> bool {
    let name = name.to_ascii_lowercase();
    name.starts_with("is_") || name.starts_with("has_") || name == "active" || name == "enabled"
}

/// Infer a coarse type. Never fails: unknown shapes are `string`.
pub fn infer_type(expr: &Expr) -> TypeTag {
    match expr {
        Expr::Identifier(ident) => column_type(&ident.value),
        Expr::CompoundIdentifier(parts) => parts
            .last()
            .map(|ident| column_type(&ident.value))
            .unwrap_or(TypeTag::String),
        Expr::Value(value) => value_type(value),
        Expr::Nested(inner) => infer_type(inner),
        Expr::UnaryOp {
            op: UnaryOperator::Not,
            ..
        } => TypeTag::Boolean,
        Expr::UnaryOp { expr, .. } => infer_type(expr),
        Expr::BinaryOp { op, .. } => binary_type(op),
        Expr::IsNull(_)
        | Expr::IsNotNull(_)
        | Expr::InList { .. }
        | Expr::Between { .. }
        | Expr::Like { .. } => TypeTag::Boolean,
        Expr::Function(func) => function_type(func),
        Expr::Case { results, .. } => results
            .first()
            .map(infer_type)
            .unwrap_or(TypeTag::Boolean),
        Expr::Cast { data_type, .. } => cast_type(data_type),
        _ => TypeTag::String,
    }
}

fn column_type(name: &str) -> TypeTag {
    if is_boolean_name(name) {
        TypeTag::Boolean
    } else {
        TypeTag::String
    }
}

fn value_type(value: &Value) -> TypeTag {
    match value {
        Value::Number(n, _) => {
            let text = n.to_string();
            if text.contains(['.', 'e', 'E']) {
                TypeTag::Decimal
            } else {
                TypeTag::Integer
            }
        }
        Value::Boolean(_) => TypeTag::Boolean,
        _ => TypeTag::String,
    }
}

fn binary_type(op: &BinaryOperator) -> TypeTag {
    match op {
        BinaryOperator::Eq
        | BinaryOperator::NotEq
        | BinaryOperator::Lt
        | BinaryOperator::LtEq
        | BinaryOperator::Gt
        | BinaryOperator::GtEq
        | BinaryOperator::And
        | BinaryOperator::Or
        | BinaryOperator::Xor => TypeTag::Boolean,
        BinaryOperator::Plus
        | BinaryOperator::Minus
        | BinaryOperator::Multiply
        | BinaryOperator::Divide
        | BinaryOperator::Modulo => TypeTag::Decimal,
        _ => TypeTag::String,
    }
}

fn function_type(func: &Function) -> TypeTag {
    let name = function_name(func);
    match name.as_str() {
        "COUNT" => TypeTag::Integer,
        n if AGGREGATES.contains(&n) => TypeTag::Decimal,
        n if DATE_FUNCTIONS.contains(&n) => TypeTag::Datetime,
        n if BOOLEAN_FUNCTIONS.contains(&n) => TypeTag::Boolean,
        _ => TypeTag::String,
    }
}

fn cast_keyword(data_type: &DataType) -> String {
    data_type
        .to_string()
        .to_ascii_lowercase()
        .chars()
        .take_while(|c| c.is_ascii_alphabetic())
        .collect()
}

fn cast_type(data_type: &DataType) -> TypeTag {
    match cast_keyword(data_type).as_str() {
        "signed" | "unsigned" | "int" | "integer" | "bigint" | "smallint" => TypeTag::Integer,
        "decimal" | "float" | "double" | "numeric" | "real" => TypeTag::Decimal,
        "datetime" | "timestamp" | "date" | "time" => TypeTag::Datetime,
        "bool" | "boolean" | "tinyint" => TypeTag::Boolean,
        _ => TypeTag::String,
    }
}

fn operator_word(op: &BinaryOperator) -> String {
    match op {
        BinaryOperator::Plus => "plus".to_string(),
        BinaryOperator::Minus => "minus".to_string(),
        BinaryOperator::Multiply => "times".to_string(),
        BinaryOperator::Divide => "div".to_string(),
        BinaryOperator::Modulo => "mod".to_string(),
        BinaryOperator::Eq => "eq".to_string(),
        BinaryOperator::NotEq => "ne".to_string(),
        BinaryOperator::Lt => "lt".to_string(),
        BinaryOperator::LtEq => "lte".to_string(),
        BinaryOperator::Gt => "gt".to_string(),
        BinaryOperator::GtEq => "gte".to_string(),
        other => identifier_fragment(&other.to_string()),
    }
}

fn alias_fragment(expr: &Expr) -> String {
    match expr {
        Expr::Identifier(ident) => ident.value.clone(),
        Expr::CompoundIdentifier(parts) => parts
            .last()
            .map(|ident| ident.value.clone())
            .unwrap_or_default(),
        other => match stringify(other) {
            Ok(text) => identifier_fragment(&text),
            Err(_) => "expr".to_string(),
        },
    }
}

/// Name for an expression selected without `AS`.
pub fn default_alias(expr: &Expr) -> String {
    match expr {
        Expr::Identifier(_) | Expr::CompoundIdentifier(_) => alias_fragment(expr),
        Expr::Nested(inner) => default_alias(inner),
        Expr::Function(func) if AGGREGATES.contains(&function_name(func).as_str()) => {
            let args = function_args(func)
                .map(|args| identifier_fragment(&args.join("_")))
                .unwrap_or_default();
            identifier_fragment(&format!("{}_{args}", function_name(func)))
        }
        Expr::BinaryOp { left, op, right } => format!(
            "{}_{}_{}",
            alias_fragment(left),
            operator_word(op),
            alias_fragment(right)
        ),
        Expr::Cast {
            expr, data_type, ..
        } => format!("{}_as_{}", alias_fragment(expr), cast_keyword(data_type)),
        Expr::Case { .. } => "case_result".to_string(),
        _ => "expr_result".to_string(),
    }
}

/// `(qualifier, column)` of a plain column reference.
pub fn column_parts(expr: &Expr) -> Option<(Option<String>, String)> {
    match expr {
        Expr::Identifier(ident) => Some((None, ident.value.clone())),
        Expr::CompoundIdentifier(parts) if !parts.is_empty() => {
            let (last, rest) = parts.split_last()?;
            let qualifier = if rest.is_empty() {
                None
            } else {
                Some(join_idents(rest))
            };
            Some((qualifier, last.value.clone()))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlparser::dialect::MySqlDialect;
    use sqlparser::parser::Parser;

    fn expr(sql: &str) -> Expr {
        Parser::new(&MySqlDialect {})
            .try_with_sql(sql)
            .unwrap()
            .parse_expr()
            .unwrap()
    }

    #[test]
    fn column_references_round_trip() {
        for text in ["id", "t.col", "db.t.col"] {
            assert_eq!(stringify(&expr(text)).unwrap(), text);
        }
    }

    #[test]
    fn binary_operators_are_space_padded() {
        assert_eq!(
            stringify(&expr("c.id=o.customer_id")).unwrap(),
            "c.id = o.customer_id"
        );
        assert_eq!(
            stringify(&expr("a.x = b.x AND a.y > 1")).unwrap(),
            "a.x = b.x AND a.y > 1"
        );
    }

    #[test]
    fn precedence_is_preserved() {
        assert_eq!(stringify(&expr("(a + b) * c")).unwrap(), "(a + b) * c");
        assert_eq!(stringify(&expr("a + b * c")).unwrap(), "a + b * c");

        let synthetic = Expr::BinaryOp {
            left: Box::new(expr("a - b")),
            op: BinaryOperator::Divide,
            right: Box::new(expr("c")),
        };
        assert_eq!(stringify(&synthetic).unwrap(), "(a - b) / c");
    }

    #[test]
    fn aggregates_render_star() {
        assert_eq!(stringify(&expr("COUNT(*)")).unwrap(), "COUNT(*)");
        assert_eq!(
            stringify(&expr("COUNT(DISTINCT o.user_id)")).unwrap(),
            "COUNT(DISTINCT o.user_id)"
        );
    }

    #[test]
    fn case_and_cast_render() {
        assert_eq!(
            stringify(&expr("CASE WHEN status = 1 THEN 'on' ELSE 'off' END")).unwrap(),
            "CASE WHEN status = 1 THEN 'on' ELSE 'off' END"
        );
        assert_eq!(
            stringify(&expr("CAST(price AS DECIMAL(10,2))")).unwrap(),
            "CAST(price AS DECIMAL(10,2))"
        );
    }

    #[test]
    fn predicates_render() {
        assert_eq!(
            stringify(&expr("deleted_at IS NULL")).unwrap(),
            "deleted_at IS NULL"
        );
        assert_eq!(
            stringify(&expr("status NOT IN (1, 2)")).unwrap(),
            "status NOT IN (1, 2)"
        );
        assert_eq!(
            stringify(&expr("name LIKE 'a%'")).unwrap(),
            "name LIKE 'a%'"
        );
    }

    #[test]
    fn unsupported_nodes_raise() {
        let err = stringify(&expr("EXISTS (SELECT 1)")).unwrap_err();
        assert_eq!(err.code, ErrorCode::ExprStringifyError);
    }

    #[test]
    fn type_inference_rules() {
        assert_eq!(infer_type(&expr("a = b")), TypeTag::Boolean);
        assert_eq!(infer_type(&expr("price * qty")), TypeTag::Decimal);
        assert_eq!(infer_type(&expr("COUNT(*)")), TypeTag::Integer);
        assert_eq!(infer_type(&expr("SUM(amount)")), TypeTag::Decimal);
        assert_eq!(infer_type(&expr("MAX(amount)")), TypeTag::Decimal);
        assert_eq!(
            infer_type(&expr("DATE_FORMAT(created_at, '%Y-%m')")),
            TypeTag::Datetime
        );
        assert_eq!(infer_type(&expr("IFNULL(a, b)")), TypeTag::Boolean);
        assert_eq!(infer_type(&expr("CONCAT(a, b)")), TypeTag::String);
        assert_eq!(infer_type(&expr("u.is_admin")), TypeTag::Boolean);
        assert_eq!(infer_type(&expr("enabled")), TypeTag::Boolean);
        assert_eq!(infer_type(&expr("name")), TypeTag::String);
        assert_eq!(infer_type(&expr("42")), TypeTag::Integer);
        assert_eq!(infer_type(&expr("4.2")), TypeTag::Decimal);
    }

    #[test]
    fn case_defers_to_first_result() {
        assert_eq!(
            infer_type(&expr("CASE WHEN a > 1 THEN COUNT(*) ELSE 0 END")),
            TypeTag::Integer
        );
        assert_eq!(
            infer_type(&expr("CASE WHEN a > 1 THEN 'x' ELSE 'y' END")),
            TypeTag::String
        );
    }

    #[test]
    fn cast_targets_map() {
        assert_eq!(infer_type(&expr("CAST(a AS SIGNED)")), TypeTag::Integer);
        assert_eq!(infer_type(&expr("CAST(a AS DECIMAL(10,2))")), TypeTag::Decimal);
        assert_eq!(infer_type(&expr("CAST(a AS DATETIME)")), TypeTag::Datetime);
        assert_eq!(infer_type(&expr("CAST(a AS CHAR)")), TypeTag::String);
    }

    #[test]
    fn default_aliases() {
        assert_eq!(default_alias(&expr("u.name")), "name");
        assert_eq!(default_alias(&expr("COUNT(*)")), "count_all");
        assert_eq!(default_alias(&expr("SUM(o.amount)")), "sum_o_amount");
        assert_eq!(default_alias(&expr("price * qty")), "price_times_qty");
        assert_eq!(default_alias(&expr("CAST(a AS SIGNED)")), "a_as_signed");
        assert_eq!(
            default_alias(&expr("CASE WHEN a THEN 1 END")),
            "case_result"
        );
        assert_eq!(default_alias(&expr("CONCAT(a, b)")), "expr_result");
    }

    #[test]
    fn column_parts_split_qualifier() {
        assert_eq!(
            column_parts(&expr("u.name")),
            Some((Some("u".to_string()), "name".to_string()))
        );
        assert_eq!(column_parts(&expr("name")), Some((None, "name".to_string())));
        assert_eq!(column_parts(&expr("COUNT(*)")), None);
    }
}
