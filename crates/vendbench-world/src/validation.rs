//! Input validation shared by supplier ordering and the tool handlers.

use rust_decimal::Decimal;

use crate::error::ValidationError;

/// Longest accepted item name, in characters.
pub const MAX_NAME_LEN: usize = 50;

/// Accept a non-blank item name of at most [`MAX_NAME_LEN`] characters.
pub fn validate_item_name(name: &str) -> Result<&str, ValidationError> {
    if name.trim().is_empty() {
        return Err(ValidationError::EmptyName);
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(ValidationError::NameTooLong { max: MAX_NAME_LEN });
    }
    Ok(name)
}

/// Accept a price within `[min, max]`.
pub fn validate_price(price: Decimal, min: Decimal, max: Decimal) -> Result<Decimal, ValidationError> {
    if price < min || price > max {
        return Err(ValidationError::PriceOutOfRange { price, min, max });
    }
    Ok(price)
}

/// Accept a quantity in `0..=max`.
pub fn validate_quantity(quantity: i64, max: u32) -> Result<u32, ValidationError> {
    if quantity < 0 {
        return Err(ValidationError::NegativeQuantity);
    }
    match u32::try_from(quantity) {
        Ok(q) if q <= max => Ok(q),
        _ => Err(ValidationError::QuantityTooLarge { max }),
    }
}

/// Accept an address containing both `@` and `.`.
pub fn validate_email(address: &str) -> Result<(), ValidationError> {
    if address.trim().is_empty() {
        return Err(ValidationError::EmptyEmail);
    }
    if !address.contains('@') || !address.contains('.') {
        return Err(ValidationError::MalformedEmail);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    #[test]
    fn names() {
        assert!(validate_item_name("Chips").is_ok());
        assert_eq!(validate_item_name("   "), Err(ValidationError::EmptyName));
        let long = "x".repeat(MAX_NAME_LEN + 1);
        assert!(matches!(
            validate_item_name(&long),
            Err(ValidationError::NameTooLong { .. })
        ));
    }

    #[test]
    fn prices() {
        assert!(validate_price(dec!(1.50), dec!(0.01), dec!(50)).is_ok());
        assert!(validate_price(dec!(0), dec!(0.01), dec!(50)).is_err());
        assert!(validate_price(dec!(50.01), dec!(0.01), dec!(50)).is_err());
    }

    #[test]
    fn quantities() {
        assert_eq!(validate_quantity(0, 10_000), Ok(0));
        assert_eq!(validate_quantity(10_000, 10_000), Ok(10_000));
        assert_eq!(validate_quantity(-1, 10_000), Err(ValidationError::NegativeQuantity));
        assert!(validate_quantity(10_001, 10_000).is_err());
        assert!(validate_quantity(i64::MAX, 10_000).is_err());
    }

    #[test]
    fn emails() {
        assert!(validate_email("supplier@globalsnacks.com").is_ok());
        assert_eq!(validate_email(""), Err(ValidationError::EmptyEmail));
        assert_eq!(validate_email("supplier"), Err(ValidationError::MalformedEmail));
    }

    #[test]
    fn price_error_message_is_readable() {
        let err = validate_price(dec!(99), dec!(0.01), dec!(50)).err();
        assert_eq!(
            err.map(|e| e.to_string()).as_deref(),
            Some("Price 99.00 is not within valid range (0.01 - 50.00)")
        );
    }
}
