use crate::error::{AppError, Result};

pub const USERNAME_MIN: usize = 3;
pub const USERNAME_MAX: usize = 32;
pub const PASSWORD_MAX: usize = 128;

/// Validates a username: 3 to 32 letters, digits, underscores or hyphens.
pub fn validate_username(username: &str) -> Result<()> {
    let length = username.chars().count();
    if length < USERNAME_MIN {
        return Err(AppError::Validation(format!(
            "Username must be at least {} characters long",
            USERNAME_MIN
        )));
    }

    if length > USERNAME_MAX {
        return Err(AppError::Validation(format!(
            "Username must be at most {} characters",
            USERNAME_MAX
        )));
    }

    if !username
        .chars()
        .all(|c| c.is_alphanumeric() || c == '_' || c == '-')
    {
        return Err(AppError::Validation(
            "Username can only contain letters, numbers, underscores, and hyphens".to_string(),
        ));
    }

    Ok(())
}

/// Validates an email address shape: one `@`, a non-empty local part and a dotted domain.
pub fn validate_email(email: &str) -> Result<()> {
    let invalid = || AppError::Validation("Email address is not valid".to_string());

    if email.chars().any(char::is_whitespace) {
        return Err(invalid());
    }

    let (local, domain) = email.split_once('@').ok_or_else(invalid)?;
    let dotted = domain
        .split('.')
        .filter(|label| !label.is_empty())
        .count()
        >= 2;

    if local.is_empty()
        || domain.contains('@')
        || !dotted
        || domain.starts_with('.')
        || domain.ends_with('.')
    {
        return Err(invalid());
    }

    Ok(())
}

/// Validates a password. Only emptiness and an upper bound are enforced.
pub fn validate_password(password: &str) -> Result<()> {
    if password.is_empty() {
        return Err(AppError::Validation("Password cannot be empty".to_string()));
    }

    if password.chars().count() > PASSWORD_MAX {
        return Err(AppError::Validation(format!(
            "Password must be at most {} characters",
            PASSWORD_MAX
        )));
    }

    Ok(())
}

pub fn validate_price(price: f64) -> Result<()> {
    if !price.is_finite() || price < 0.0 {
        return Err(AppError::Validation(
            "Price must be a non-negative number".to_string(),
        ));
    }
    Ok(())
}

/// Every line item must name a product and order at least one unit.
pub fn validate_line_items(items: &[crate::models::LineItem]) -> Result<()> {
    for item in items {
        if item.product_id.trim().is_empty() {
            return Err(AppError::Validation(
                "Every line item needs a productId".to_string(),
            ));
        }
        if item.quantity == 0 {
            return Err(AppError::Validation(
                "Quantity must be at least 1".to_string(),
            ));
        }
    }
    Ok(())
}
