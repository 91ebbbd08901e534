//! Validation utilities shared by the routing core and the CLI
//!
//! Routing-key segments travel inside a dot-delimited topic grammar, so any
//! literal value that becomes a segment must be free of separators and
//! wildcard characters.

/// Characters with meaning in the topic and bind-pattern grammars
pub const RESERVED_SEGMENT_CHARS: [char; 3] = ['.', '*', '#'];

/// Validate positive integer value
pub fn validate_positive_int(value: &str) -> Result<usize, String> {
    match value.trim().parse::<usize>() {
        Ok(0) => Err("Value must be greater than 0".to_string()),
        Ok(n) => Ok(n),
        Err(_) => Err(format!("'{}' is not a valid positive integer", value)),
    }
}

/// Validate a literal value that will become one topic segment
///
/// Returns the value unchanged on success. `field` names the value in the
/// error message.
pub fn validate_segment<'a>(field: &str, value: &'a str) -> Result<&'a str, String> {
    if value.is_empty() {
        return Err(format!("{} must not be empty", field));
    }

    if let Some(c) = value.chars().find(|c| RESERVED_SEGMENT_CHARS.contains(c)) {
        return Err(format!(
            "{} '{}' contains reserved character '{}'",
            field, value, c
        ));
    }

    if value.chars().any(char::is_whitespace) {
        return Err(format!("{} '{}' must not contain whitespace", field, value));
    }

    Ok(value)
}
