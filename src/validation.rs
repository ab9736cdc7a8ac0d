use iso_currency::Currency;
use validator::ValidationError;

use crate::models::suggestion::DayOfMonth;

/// Validates that a currency code is a valid ISO 4217 currency code
pub fn validate_currency_code(code: &str) -> Result<(), ValidationError> {
    Currency::from_code(code).ok_or_else(|| {
        let mut error = ValidationError::new("invalid_currency");
        error.message = Some(format!("'{}' is not a valid ISO 4217 currency code", code).into());
        error
    })?;
    Ok(())
}

/// Validates that an amount is positive (greater than 0)
pub fn validate_positive_amount(amount: &rust_decimal::Decimal) -> Result<(), ValidationError> {
    if *amount <= rust_decimal::Decimal::ZERO {
        let mut error = ValidationError::new("invalid_amount");
        error.message = Some("Amount must be greater than 0".into());
        return Err(error);
    }
    Ok(())
}

/// Validates that a day is an integer between 1 and 31 (inclusive)
pub fn validate_day_of_month(day: i64) -> Result<(), ValidationError> {
    DayOfMonth::try_from(day).map(|_| ()).map_err(|e| {
        let mut error = ValidationError::new("invalid_day");
        error.message = Some(e.to_string().into());
        error
    })
}

/// Longest look-back accepted by the monthly average
pub const MAX_AVERAGE_MONTHS: i64 = 120;

/// Validates a month count between 1 and 120 (inclusive)
pub fn validate_month_count(months: i64) -> Result<(), ValidationError> {
    if (1..=MAX_AVERAGE_MONTHS).contains(&months) {
        return Ok(());
    }
    let mut error = ValidationError::new("invalid_month_count");
    error.message = Some(
        format!("The value provided should be an integer between 1 and {}", MAX_AVERAGE_MONTHS).into(),
    );
    Err(error)
}

/// Validates password strength: at least 8 characters with a digit, a lowercase and an
/// uppercase letter, no whitespace, and only ASCII characters.
pub fn validate_password_strength(password: &str) -> Result<(), ValidationError> {
    let long_enough = password.chars().count() >= 8;
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    let has_lowercase = password.chars().any(|c| c.is_ascii_lowercase());
    let has_uppercase = password.chars().any(|c| c.is_ascii_uppercase());
    let allowed = password
        .chars()
        .all(|c| c.is_ascii_graphic() && !"{}()|~".contains(c));

    if long_enough && has_digit && has_lowercase && has_uppercase && allowed {
        return Ok(());
    }

    let mut error = ValidationError::new("weak_password");
    error.message = Some(
        "Password must be at least 8 characters and contain a digit, a lowercase and an uppercase letter, without spaces"
            .into(),
    );
    Err(error)
}
