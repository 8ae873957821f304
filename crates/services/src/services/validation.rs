/// Trimmed `value` when it has between 1 and `max` characters.
pub(crate) fn bounded_text(field: &str, value: &str, max: usize) -> Result<String, String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(format!("{field} is required"));
    }
    if trimmed.chars().count() > max {
        return Err(format!("{field} must be at most {max} characters"));
    }
    Ok(trimmed.to_string())
}

pub(crate) fn email(value: &str) -> Result<String, String> {
    let trimmed = value.trim();
    let valid = trimmed.split_once('@').is_some_and(|(local, domain)| {
        !local.is_empty()
            && !domain.contains('@')
            && domain.contains('.')
            && !domain.starts_with('.')
            && !domain.ends_with('.')
    });
    if !valid || trimmed.chars().any(char::is_whitespace) {
        return Err("email is not a valid address".to_string());
    }
    Ok(trimmed.to_lowercase())
}

pub(crate) fn order_index(value: i32) -> Result<i32, String> {
    if value < 0 {
        return Err("order_index must be zero or greater".to_string());
    }
    Ok(value)
}
