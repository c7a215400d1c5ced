//! Directive evaluation over a scope stack.
//!
//! Supported directives:
//!
//! - `<% if cond %>`, `<% elseif cond %>`, `<% else %>`, `<% endif %>`
//! - `<% each item in path %>` ... `<% endeach %>`
//! - `${path}` and `${path|filter|filter}`
//!
//! A condition is a path (truthiness), `!path`, or `path == literal` /
//! `path != literal`. Missing paths resolve to an empty value.

use serde_json::{Map, Value};

use crate::error::{ErrorCode, GeneratorError, Result};
use crate::template::filters;
use crate::template::lexer::{tokenize, Token, TokenKind};

#[derive(Debug, Clone, PartialEq)]
enum Directive<'a> {
    If(&'a str),
    ElseIf(&'a str),
    Else,
    EndIf,
    Each { item: &'a str, items: &'a str },
    EndEach,
}

fn parse_directive(body: &str) -> Option<Directive<'_>> {
    let (keyword, rest) = match body.split_once(char::is_whitespace) {
        Some((keyword, rest)) => (keyword, rest.trim()),
        None => (body, ""),
    };
    match (keyword, rest.is_empty()) {
        ("if", false) => Some(Directive::If(rest)),
        ("elseif", false) => Some(Directive::ElseIf(rest)),
        ("else", true) => Some(Directive::Else),
        ("endif", true) => Some(Directive::EndIf),
        ("endeach", true) => Some(Directive::EndEach),
        ("each", false) => {
            let mut parts = rest.split_whitespace();
            match (parts.next(), parts.next(), parts.next(), parts.next()) {
                (Some(item), Some("in"), Some(items), None) if is_identifier(item) => {
                    Some(Directive::Each { item, items })
                }
                _ => None,
            }
        }
        _ => None,
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Open block record.
enum Frame {
    If {
        /// Whether the enclosing block renders.
        parent: bool,
        /// Whether the current branch renders.
        active: bool,
        /// Whether any branch has been taken yet.
        taken: bool,
        seen_else: bool,
    },
    Each {
        item: String,
        items: Vec<Value>,
        /// Raw tokens between `each` and its `endeach`.
        body: Vec<Token>,
        /// Nesting depth of inner `each` blocks inside `body`.
        depth: usize,
    },
}

pub fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

/// Text form of a value as it appears in output.
pub fn display(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}

fn literal(text: &str) -> Option<Value> {
    let text = text.trim();
    let quoted = |q: char| text.len() >= 2 && text.starts_with(q) && text.ends_with(q);
    if quoted('\'') || quoted('"') {
        return Some(Value::String(text[1..text.len() - 1].to_string()));
    }
    match text {
        "true" => Some(Value::Bool(true)),
        "false" => Some(Value::Bool(false)),
        "null" => Some(Value::Null),
        _ if text.starts_with(|c: char| c.is_ascii_digit() || c == '-') => text
            .parse::<i64>()
            .ok()
            .map(Value::from)
            .or_else(|| text.parse::<f64>().ok().map(Value::from)),
        _ => None,
    }
}

/// Split `left == right` or `left != right` at the first operator outside a
/// quoted literal. The flag is set for `!=`.
fn split_comparison(expr: &str) -> Option<(&str, bool, &str)> {
    let bytes = expr.as_bytes();
    let mut quote: Option<u8> = None;
    for (i, &b) in bytes.iter().enumerate() {
        match quote {
            Some(q) if b == q => quote = None,
            Some(_) => {}
            None if b == b'\'' || b == b'"' => quote = Some(b),
            None if (b == b'=' || b == b'!') && bytes.get(i + 1) == Some(&b'=') => {
                return Some((&expr[..i], b == b'!', &expr[i + 2..]));
            }
            None => {}
        }
    }
    None
}

/// Reject unknown directives, unmatched closers and unclosed blocks.
///
/// Runs over every token regardless of which branches or loop bodies the
/// data would reach.
fn check_structure(source: &str, tokens: &[Token]) -> Result<()> {
    enum Open {
        If { seen_else: bool },
        Each { offset: usize },
    }
    let syntax = |message: String, offset: usize| {
        GeneratorError::template(ErrorCode::TemplateSyntaxError, message, source, offset)
    };

    let mut open: Vec<Open> = Vec::new();
    for token in tokens {
        let TokenKind::Directive(body) = &token.kind else {
            continue;
        };
        let directive = parse_directive(body)
            .ok_or_else(|| syntax(format!("unknown directive `{body}`"), token.offset))?;
        match directive {
            Directive::If(_) => open.push(Open::If { seen_else: false }),
            Directive::Each { .. } => open.push(Open::Each {
                offset: token.offset,
            }),
            Directive::ElseIf(_) => match open.last() {
                Some(Open::If { seen_else: false }) => {}
                _ => return Err(syntax("`elseif` without a matching `if`".into(), token.offset)),
            },
            Directive::Else => match open.last_mut() {
                Some(Open::If { seen_else }) if !*seen_else => *seen_else = true,
                _ => return Err(syntax("`else` without a matching `if`".into(), token.offset)),
            },
            Directive::EndIf => match open.last() {
                Some(Open::If { .. }) => {
                    open.pop();
                }
                _ => return Err(syntax("`endif` without a matching `if`".into(), token.offset)),
            },
            Directive::EndEach => match open.last() {
                Some(Open::Each { .. }) => {
                    open.pop();
                }
                _ => {
                    return Err(syntax(
                        "`endeach` without a matching `each`".into(),
                        token.offset,
                    ))
                }
            },
        }
    }

    if let Some(first) = open.first() {
        let names: Vec<&str> = open
            .iter()
            .map(|block| match block {
                Open::If { .. } => "if",
                Open::Each { .. } => "each",
            })
            .collect();
        let offset = match first {
            Open::Each { offset } => *offset,
            Open::If { .. } => source.len(),
        };
        return Err(syntax(format!("unclosed blocks: {}", names.join(", ")), offset));
    }
    Ok(())
}

/// Renders one template source against a stack of scopes.
///
/// Expects tokens that passed [`check_structure`].
struct Renderer<'s> {
    source: &'s str,
    scopes: Vec<Value>,
}

impl<'s> Renderer<'s> {
    fn error(&self, code: ErrorCode, message: impl Into<String>, offset: usize) -> GeneratorError {
        GeneratorError::template(code, message, self.source, offset)
    }

    fn resolve(&self, path: &str) -> Value {
        let mut segments = path.split('.');
        let Some(head) = segments.next().filter(|s| !s.is_empty()) else {
            return Value::Null;
        };
        let Some(mut current) = self.scopes.iter().rev().find_map(|scope| scope.get(head)) else {
            return Value::Null;
        };
        for segment in segments {
            let next = match current {
                Value::Object(map) => map.get(segment),
                Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
                _ => None,
            };
            match next {
                Some(value) => current = value,
                None => return Value::Null,
            }
        }
        current.clone()
    }

    fn operand(&self, text: &str) -> Value {
        literal(text).unwrap_or_else(|| self.resolve(text.trim()))
    }

    fn condition(&self, expr: &str) -> bool {
        if let Some((left, negated, right)) = split_comparison(expr) {
            let equal = display(&self.operand(left)) == display(&self.operand(right));
            return equal != negated;
        }
        match expr.trim().strip_prefix('!') {
            Some(negated) => !truthy(&self.operand(negated)),
            None => truthy(&self.operand(expr)),
        }
    }

    fn interpolate(&self, expr: &str, offset: usize) -> Result<String> {
        let mut parts = expr.split('|');
        let head = parts.next().unwrap_or_default();
        let mut value = display(&self.operand(head));
        for filter in parts {
            value = filters::apply(filter.trim(), &value)
                .map_err(|e| self.error(e.code, e.message, offset))?;
        }
        Ok(value)
    }

    fn render(&mut self, tokens: &[Token], out: &mut String) -> Result<()> {
        let mut frames: Vec<Frame> = Vec::new();

        for token in tokens {
            let directive = match &token.kind {
                TokenKind::Directive(body) => Some(parse_directive(body).ok_or_else(|| {
                    self.error(
                        ErrorCode::TemplateSyntaxError,
                        format!("unknown directive `{body}`"),
                        token.offset,
                    )
                })?),
                _ => None,
            };

            if let Some(Frame::Each { body, depth, .. }) = frames.last_mut() {
                match directive {
                    Some(Directive::Each { .. }) => *depth += 1,
                    Some(Directive::EndEach) if *depth > 0 => *depth -= 1,
                    Some(Directive::EndEach) => {
                        if let Some(Frame::Each {
                            item, items, body, ..
                        }) = frames.pop()
                        {
                            self.render_each(&item, &items, &body, out)?;
                        }
                        continue;
                    }
                    _ => {}
                }
                body.push(token.clone());
                continue;
            }

            let active = match frames.last() {
                Some(Frame::If { active, .. }) => *active,
                _ => true,
            };

            match (&token.kind, directive) {
                (TokenKind::Text(text), _) => {
                    if active {
                        out.push_str(text);
                    }
                }
                (TokenKind::Interp(expr), _) => {
                    if active {
                        out.push_str(&self.interpolate(expr, token.offset)?);
                    }
                }
                (_, Some(Directive::If(cond))) => {
                    let value = active && self.condition(cond);
                    frames.push(Frame::If {
                        parent: active,
                        active: value,
                        taken: value,
                        seen_else: false,
                    });
                }
                (_, Some(Directive::ElseIf(cond))) => {
                    let value = self.condition(cond);
                    match frames.last_mut() {
                        Some(Frame::If {
                            parent,
                            active,
                            taken,
                            seen_else: false,
                        }) => {
                            let value = *parent && !*taken && value;
                            *active = value;
                            *taken |= value;
                        }
                        _ => {
                            return Err(self.error(
                                ErrorCode::TemplateSyntaxError,
                                "`elseif` without a matching `if`",
                                token.offset,
                            ))
                        }
                    }
                }
                (_, Some(Directive::Else)) => match frames.last_mut() {
                    Some(Frame::If {
                        parent,
                        active,
                        taken,
                        seen_else,
                    }) if !*seen_else => {
                        *active = *parent && !*taken;
                        *taken = true;
                        *seen_else = true;
                    }
                    _ => {
                        return Err(self.error(
                            ErrorCode::TemplateSyntaxError,
                            "`else` without a matching `if`",
                            token.offset,
                        ))
                    }
                },
                (_, Some(Directive::EndIf)) => match frames.last() {
                    Some(Frame::If { .. }) => {
                        frames.pop();
                    }
                    _ => {
                        return Err(self.error(
                            ErrorCode::TemplateSyntaxError,
                            "`endif` without a matching `if`",
                            token.offset,
                        ))
                    }
                },
                (_, Some(Directive::Each { item, items })) => {
                    let values = if active {
                        match self.resolve(items) {
                            Value::Array(values) => values,
                            Value::Null => Vec::new(),
                            other => {
                                return Err(self.error(
                                    ErrorCode::TemplateRenderError,
                                    format!("`{items}` is not a list (found {})", kind_of(&other)),
                                    token.offset,
                                ))
                            }
                        }
                    } else {
                        Vec::new()
                    };
                    frames.push(Frame::Each {
                        item: item.to_string(),
                        items: values,
                        body: Vec::new(),
                        depth: 0,
                    });
                }
                (_, Some(Directive::EndEach)) => {
                    return Err(self.error(
                        ErrorCode::TemplateSyntaxError,
                        "`endeach` without a matching `each`",
                        token.offset,
                    ))
                }
                (TokenKind::Directive(_), None) => {}
            }
        }

        Ok(())
    }

    fn render_each(
        &mut self,
        item: &str,
        items: &[Value],
        body: &[Token],
        out: &mut String,
    ) -> Result<()> {
        let last = items.len().saturating_sub(1);
        for (index, value) in items.iter().enumerate() {
            let mut scope = Map::new();
            scope.insert(item.to_string(), value.clone());
            scope.insert("index".to_string(), Value::from(index));
            scope.insert(
                "loop".to_string(),
                serde_json::json!({
                    "index": index,
                    "number": index + 1,
                    "first": index == 0,
                    "last": index == last,
                }),
            );
            self.scopes.push(Value::Object(scope));
            let rendered = self.render(body, out);
            self.scopes.pop();
            rendered?;
        }
        Ok(())
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Render `source` with `context` as the outermost scope.
pub fn render(source: &str, context: &Value) -> Result<String> {
    let tokens = tokenize(source)?;
    check_structure(source, &tokens)?;
    let mut renderer = Renderer {
        source,
        scopes: vec![context.clone()],
    };
    let mut out = String::with_capacity(source.len());
    renderer.render(&tokens, &mut out)?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn if_else_flag() {
        let template = "<% if flag %>A<% else %>B<% endif %>";
        assert_eq!(render(template, &json!({"flag": false})).unwrap(), "B");
        assert_eq!(render(template, &json!({"flag": true})).unwrap(), "A");
    }

    #[test]
    fn elseif_chain_takes_first_match() {
        let template = "<% if a %>1<% elseif b %>2<% elseif c %>3<% else %>4<% endif %>";
        assert_eq!(render(template, &json!({"b": 1, "c": 1})).unwrap(), "2");
        assert_eq!(render(template, &json!({"c": "x"})).unwrap(), "3");
        assert_eq!(render(template, &json!({})).unwrap(), "4");
    }

    #[test]
    fn comparisons_and_negation() {
        let ctx = json!({"field": {"formType": "select", "required": false}});
        assert_eq!(
            render("<% if field.formType == 'select' %>S<% endif %>", &ctx).unwrap(),
            "S"
        );
        assert_eq!(
            render("<% if field.formType != \"select\" %>S<% endif %>", &ctx).unwrap(),
            ""
        );
        assert_eq!(render("<% if !field.required %>opt<% endif %>", &ctx).unwrap(), "opt");
    }

    #[test]
    fn interpolation_with_filters() {
        let ctx = json!({"module": {"name": "order_items"}, "count": 3});
        assert_eq!(
            render("${module.name|pascal}Controller x${count}", &ctx).unwrap(),
            "OrderItemsController x3"
        );
        assert_eq!(render("[${missing.path}]", &ctx).unwrap(), "[]");
    }

    #[test]
    fn each_iterates_with_loop_scope() {
        let ctx = json!({"fields": [{"name": "id"}, {"name": "title"}, {"name": "body"}]});
        let template = "<% each f in fields %>${index}:${f.name}<% if !loop.last %>,<% endif %><% endeach %>";
        assert_eq!(render(template, &ctx).unwrap(), "0:id,1:title,2:body");
    }

    #[test]
    fn nested_each_and_shadowing() {
        let ctx = json!({
            "name": "outer",
            "groups": [
                {"name": "a", "items": [1, 2]},
                {"name": "b", "items": []},
            ]
        });
        let template = "<% each name in groups %><% each i in name.items %>${name.name}${i};<% endeach %><% endeach %>${name}";
        assert_eq!(render(template, &ctx).unwrap(), "a1;a2;outer");
    }

    #[test]
    fn inactive_branches_do_not_resolve_loops() {
        let ctx = json!({"show": false, "items": "not a list"});
        let template = "<% if show %><% each i in items %>${i}<% endeach %><% endif %>done";
        assert_eq!(render(template, &ctx).unwrap(), "done");
    }

    #[test]
    fn multiline_blocks_leave_no_blank_lines() {
        let ctx = json!({"fields": [{"name": "id"}, {"name": "title"}]});
        let template = "fields:\n<% each f in fields %>\n  - ${f.name}\n<% endeach %>\nend\n";
        assert_eq!(render(template, &ctx).unwrap(), "fields:\n  - id\n  - title\nend\n");
    }

    #[test]
    fn each_over_non_list_fails() {
        let err = render("<% each x in name %>${x}<% endeach %>", &json!({"name": "abc"}))
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::TemplateRenderError);
    }

    #[test]
    fn unmatched_closers() {
        for template in ["<% endif %>", "<% else %>", "<% elseif x %>", "<% endeach %>"] {
            let err = render(template, &json!({})).unwrap_err();
            assert_eq!(err.code, ErrorCode::TemplateSyntaxError, "{template}");
        }
        let err = render("<% if a %><% else %><% else %><% endif %>", &json!({})).unwrap_err();
        assert_eq!(err.code, ErrorCode::TemplateSyntaxError);
    }

    #[test]
    fn unclosed_blocks_are_listed() {
        let err = render("<% if a %><% each x in xs %>", &json!({"xs": []})).unwrap_err();
        assert_eq!(err.code, ErrorCode::TemplateSyntaxError);
        assert_eq!(err.message, "unclosed blocks: if, each");

        let err = render("x\n<% if a %>\ny", &json!({})).unwrap_err();
        assert_eq!(err.message, "unclosed blocks: if");
    }

    #[test]
    fn structure_is_checked_without_data() {
        let empty = json!({"fields": [], "show": false});
        for template in [
            "<% each f in fields %><% endif %><% endeach %>",
            "<% each f in fields %><% if f %>x<% endeach %>",
            "<% each f in fields %><% else %><% endeach %>",
            "<% if show %><% each f in fields %><% elseif f %><% endeach %><% endif %>",
            "<% if show %><% each f in fields %><% if a %><% else %><% else %><% endif %><% endeach %><% endif %>",
        ] {
            let err = render(template, &empty).unwrap_err();
            assert_eq!(err.code, ErrorCode::TemplateSyntaxError, "{template}");
        }

        let err = render("<% each f in fields %><% if f %>x<% endeach %>", &empty).unwrap_err();
        assert!(err.location.is_some());
    }

    #[test]
    fn unknown_directive_in_skipped_loop_fails() {
        let err = render("<% each f in fields %><% loop f %><% endeach %>", &json!({"fields": []}))
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::TemplateSyntaxError);
    }

    #[test]
    fn comparison_operators_inside_quotes() {
        let ctx = json!({"x": "a != b", "y": "a == b"});
        assert_eq!(render("<% if x == 'a != b' %>eq<% endif %>", &ctx).unwrap(), "eq");
        assert_eq!(render("<% if y != \"a == b\" %>ne<% else %>same<% endif %>", &ctx).unwrap(), "same");
        assert_eq!(split_comparison("a == 'x'"), Some(("a ", false, " 'x'")));
        assert_eq!(split_comparison("'!=' != b"), Some(("'!=' ", true, " b")));
        assert_eq!(split_comparison("!flag"), None);
    }

    #[test]
    fn unknown_directive_is_located() {
        let err = render("ok\n  <% loop x %>", &json!({})).unwrap_err();
        assert_eq!(err.code, ErrorCode::TemplateSyntaxError);
        let location = err.location.unwrap();
        assert_eq!(location.line, 2);
        assert_eq!(location.position, 3);
    }

    #[test]
    fn unknown_filter_is_a_render_error() {
        let err = render("${name|shout}", &json!({"name": "x"})).unwrap_err();
        assert_eq!(err.code, ErrorCode::TemplateRenderError);
        assert!(err.location.is_some());
    }
}
