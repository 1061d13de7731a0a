use std::fmt;

pub const PAYABLE_TYPE_MAX_LEN: usize = 255;
pub const IDENTIFIER_MAX_LEN: usize = 63;
pub const SEARCH_TERM_MAX_LEN: usize = 255;
pub const SORT_DIRECTIONS: &[&str] = &["asc", "desc"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

pub type ValidationResult = Result<(), ValidationError>;

pub fn sanitize_string(value: &str) -> String {
    value
        .chars()
        .filter(|ch| !ch.is_control())
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn validate_required(field: &'static str, value: &str) -> ValidationResult {
    if value.trim().is_empty() {
        return Err(ValidationError::new(field, "must not be empty"));
    }

    Ok(())
}

pub fn validate_max_len(field: &'static str, value: &str, max_len: usize) -> ValidationResult {
    if value.len() > max_len {
        return Err(ValidationError::new(
            field,
            format!("must be at most {} characters", max_len),
        ));
    }

    Ok(())
}

pub fn validate_enum(field: &'static str, value: &str, allowed: &[&str]) -> ValidationResult {
    if allowed.iter().all(|candidate| value != *candidate) {
        return Err(ValidationError::new(
            field,
            format!("must be one of: {}", allowed.join(", ")),
        ));
    }

    Ok(())
}

/// Table and column names end up spliced into SQL text, so only plain
/// lowercase identifiers are accepted.
pub fn validate_sql_identifier(field: &'static str, value: &str) -> ValidationResult {
    validate_required(field, value)?;
    validate_max_len(field, value, IDENTIFIER_MAX_LEN)?;

    let mut chars = value.chars();
    let starts_ok = chars
        .next()
        .map(|ch| ch.is_ascii_lowercase() || ch == '_')
        .unwrap_or(false);

    if !starts_ok
        || !value
            .chars()
            .all(|ch| ch.is_ascii_lowercase() || ch.is_ascii_digit() || ch == '_')
    {
        return Err(ValidationError::new(
            field,
            "must contain only lowercase letters, digits and underscores",
        ));
    }

    Ok(())
}

pub fn validate_payable_type(payable_type: &str) -> ValidationResult {
    validate_required("payable_type", payable_type)?;
    validate_max_len("payable_type", payable_type, PAYABLE_TYPE_MAX_LEN)?;

    if payable_type != sanitize_string(payable_type) {
        return Err(ValidationError::new(
            "payable_type",
            "must not contain control characters or padding",
        ));
    }

    Ok(())
}

pub fn validate_search_term(term: &str) -> Result<String, ValidationError> {
    let term = sanitize_string(term);
    validate_required("search", &term)?;
    validate_max_len("search", &term, SEARCH_TERM_MAX_LEN)?;
    Ok(term)
}

pub fn validate_meta(meta: &serde_json::Value) -> ValidationResult {
    if !(meta.is_object() || meta.is_null()) {
        return Err(ValidationError::new("meta", "must be a JSON object"));
    }

    Ok(())
}
