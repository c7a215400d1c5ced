use heck::{ToKebabCase, ToLowerCamelCase, ToSnakeCase, ToTitleCase, ToUpperCamelCase};

use crate::error::{ErrorCode, GeneratorError, Result};

/// First character upper-cased, the rest untouched.
pub fn capitalize(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Apply a named filter.
pub fn apply(name: &str, value: &str) -> Result<String> {
    Ok(match name {
        "pascal" => value.to_upper_camel_case(),
        "capitalize" => capitalize(value),
        "camel" => value.to_lower_camel_case(),
        "snake" => value.to_snake_case(),
        "kebab" => value.to_kebab_case(),
        "title" => value.to_title_case(),
        "upper" => value.to_uppercase(),
        "lower" => value.to_lowercase(),
        other => {
            return Err(GeneratorError::new(
                ErrorCode::TemplateRenderError,
                format!("unknown filter `{other}`"),
            ))
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn casings() {
        assert_eq!(apply("pascal", "order_items").unwrap(), "OrderItems");
        assert_eq!(apply("camel", "order_items").unwrap(), "orderItems");
        assert_eq!(apply("kebab", "OrderItems").unwrap(), "order-items");
        assert_eq!(apply("snake", "orderItems").unwrap(), "order_items");
        assert_eq!(apply("title", "order_items").unwrap(), "Order Items");
        assert_eq!(apply("capitalize", "order_items").unwrap(), "Order_items");
        assert_eq!(apply("upper", "abc").unwrap(), "ABC");
        assert_eq!(apply("lower", "ABC").unwrap(), "abc");
    }

    #[test]
    fn unknown_filter() {
        let err = apply("reverse", "abc").unwrap_err();
        assert_eq!(err.code, ErrorCode::TemplateRenderError);
    }

    #[test]
    fn capitalize_empty() {
        assert_eq!(capitalize(""), "");
    }
}
