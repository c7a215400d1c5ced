//! Template tokenizer.
//!
//! `<% directive %>` blocks and `${expression}` interpolations are cut out of
//! the surrounding text. A directive that sits alone on its line consumes that
//! line, so block structure does not leave blank lines in the output.

use crate::error::{ErrorCode, GeneratorError, Result};

const DIRECTIVE_OPEN: &str = "<%";
const DIRECTIVE_CLOSE: &str = "%>";
const INTERP_OPEN: &str = "${";
const INTERP_CLOSE: char = '}';

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    Text(String),
    Directive(String),
    Interp(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    /// Byte offset of the token in the template source.
    pub offset: usize,
}

impl Token {
    fn new(kind: TokenKind, offset: usize) -> Self {
        Self { kind, offset }
    }
}

/// Bounds of the line around `[start, end)` when only whitespace shares it.
fn standalone_line(source: &str, start: usize, end: usize) -> Option<(usize, usize)> {
    let line_start = source[..start].rfind('\n').map(|i| i + 1).unwrap_or(0);
    if !source[line_start..start].chars().all(|c| c == ' ' || c == '\t') {
        return None;
    }
    let rest = &source[end..];
    let line_end = match rest.find('\n') {
        Some(i) => end + i + 1,
        None => source.len(),
    };
    let trailing = source[end..line_end].trim_end_matches('\n').trim_end_matches('\r');
    if !trailing.chars().all(|c| c == ' ' || c == '\t') {
        return None;
    }
    Some((line_start, line_end))
}

pub fn tokenize(source: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut pos = 0;

    while pos < source.len() {
        let rest = &source[pos..];
        let next = match (rest.find(DIRECTIVE_OPEN), rest.find(INTERP_OPEN)) {
            (Some(d), Some(i)) => Some(d.min(i)),
            (d, i) => d.or(i),
        };
        let Some(rel) = next else {
            tokens.push(Token::new(TokenKind::Text(rest.to_string()), pos));
            break;
        };
        let start = pos + rel;

        if source[start..].starts_with(DIRECTIVE_OPEN) {
            let body_start = start + DIRECTIVE_OPEN.len();
            let close = source[body_start..].find(DIRECTIVE_CLOSE).ok_or_else(|| {
                GeneratorError::template(
                    ErrorCode::TemplateSyntaxError,
                    "unterminated directive, expected `%>`",
                    source,
                    start,
                )
            })?;
            let end = body_start + close + DIRECTIVE_CLOSE.len();
            let body = source[body_start..body_start + close].trim().to_string();

            let (text_end, resume) = match standalone_line(source, start, end) {
                Some((line_start, line_end)) if line_start >= pos => (line_start, line_end),
                _ => (start, end),
            };
            if text_end > pos {
                tokens.push(Token::new(TokenKind::Text(source[pos..text_end].to_string()), pos));
            }
            tokens.push(Token::new(TokenKind::Directive(body), start));
            pos = resume;
        } else {
            if start > pos {
                tokens.push(Token::new(TokenKind::Text(source[pos..start].to_string()), pos));
            }
            let body_start = start + INTERP_OPEN.len();
            let close = source[body_start..].find(INTERP_CLOSE).ok_or_else(|| {
                GeneratorError::template(
                    ErrorCode::TemplateSyntaxError,
                    "unterminated interpolation, expected `}`",
                    source,
                    start,
                )
            })?;
            let body = source[body_start..body_start + close].trim().to_string();
            tokens.push(Token::new(TokenKind::Interp(body), start));
            pos = body_start + close + 1;
        }
    }

    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        tokenize(source).unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn splits_text_directives_and_interpolations() {
        assert_eq!(
            kinds("a ${ name|pascal } <% if x %>b<% endif %>"),
            vec![
                TokenKind::Text("a ".into()),
                TokenKind::Interp("name|pascal".into()),
                TokenKind::Text(" ".into()),
                TokenKind::Directive("if x".into()),
                TokenKind::Text("b".into()),
                TokenKind::Directive("endif".into()),
            ]
        );
    }

    #[test]
    fn standalone_directives_consume_their_line() {
        let source = "start\n  <% if x %>\nbody\n<% endif %>\nend";
        assert_eq!(
            kinds(source),
            vec![
                TokenKind::Text("start\n".into()),
                TokenKind::Directive("if x".into()),
                TokenKind::Text("body\n".into()),
                TokenKind::Directive("endif".into()),
                TokenKind::Text("end".into()),
            ]
        );
    }

    #[test]
    fn offsets_point_into_source() {
        let tokens = tokenize("ab${c}").unwrap();
        assert_eq!(tokens[1].offset, 2);
    }

    #[test]
    fn unterminated_blocks_are_located() {
        let err = tokenize("line one\nx <% if y").unwrap_err();
        assert_eq!(err.code, ErrorCode::TemplateSyntaxError);
        let location = err.location.unwrap();
        assert_eq!(location.line, 2);
        assert_eq!(location.position, 3);

        let err = tokenize("${oops").unwrap_err();
        assert_eq!(err.code, ErrorCode::TemplateSyntaxError);
    }
}
