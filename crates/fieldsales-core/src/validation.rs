//! # Validation Module
//!
//! Input validation for the field sales tracker.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: axum extractors                                              │
//! │  └── Type validation (JSON deserialization)                            │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                  │
//! │  ├── Coordinates: two finite numbers within WGS84 bounds               │
//! │  ├── Sale lines: quantity, price, line_total, amount                   │
//! │  └── Identity fields: email, contact, SIM, password                    │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: SQLite                                                       │
//! │  ├── NOT NULL / CHECK constraints                                      │
//! │  ├── UNIQUE indexes                                                    │
//! │  └── Foreign keys                                                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use fieldsales_core::validation::{normalize_sim_number, validate_coordinates};
//!
//! assert_eq!(normalize_sim_number("+92 300-1234567").unwrap(), "923001234567");
//! assert!(validate_coordinates(&[73.04, 33.68]).is_ok());
//! assert!(validate_coordinates(&[73.04]).is_err());
//! ```

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::geo::GeoPoint;
use crate::money::Money;
use crate::types::SaleLine;
use crate::{MAX_LINE_QUANTITY, MAX_SALE_AMOUNT_CENTS, MAX_UNIT_PRICE_CENTS};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Minimum password length for salesmen and admins.
pub const MIN_PASSWORD_LENGTH: usize = 6;

const MIN_SIM_DIGITS: usize = 10;
const MAX_SIM_DIGITS: usize = 15;
const MAX_NAME_LENGTH: usize = 200;
const MAX_CONTACT_LENGTH: usize = 20;

// =============================================================================
// String Validators
// =============================================================================

/// Trims `value` and rejects it when empty or longer than 200 characters.
///
/// Returns the trimmed value.
pub fn validate_required(field: &str, value: &str) -> ValidationResult<String> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::required(field));
    }

    if value.chars().count() > MAX_NAME_LENGTH {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: MAX_NAME_LENGTH,
        });
    }

    Ok(value.to_string())
}

/// Trims an optional value; blank becomes `None`.
pub fn normalize_optional(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Validates a phone/contact number.
///
/// ## Rules
/// - Must not be empty after trimming
/// - At most 20 characters
/// - Digits, spaces, dashes, parentheses and a leading `+` only
/// - At least one digit
pub fn validate_contact_number(field: &str, value: &str) -> ValidationResult<String> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::required(field));
    }

    if value.len() > MAX_CONTACT_LENGTH {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: MAX_CONTACT_LENGTH,
        });
    }

    let body = value.strip_prefix('+').unwrap_or(value);
    let allowed = body
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, ' ' | '-' | '(' | ')'));

    if !allowed || !body.chars().any(|c| c.is_ascii_digit()) {
        return Err(ValidationError::invalid_format(
            field,
            "must contain digits, spaces, dashes or a leading +",
        ));
    }

    Ok(value.to_string())
}

/// Trims and lowercases an email address, rejecting obvious malformations.
///
/// ## Example
/// ```rust
/// use fieldsales_core::validation::normalize_email;
///
/// assert_eq!(normalize_email(" Ali@Example.COM ").unwrap(), "ali@example.com");
/// assert!(normalize_email("ali@localhost").is_err());
/// ```
pub fn normalize_email(value: &str) -> ValidationResult<String> {
    let email = value.trim().to_lowercase();

    if email.is_empty() {
        return Err(ValidationError::required("email"));
    }

    let invalid = || ValidationError::invalid_format("email", "must look like name@domain.tld");

    if email.chars().any(char::is_whitespace) {
        return Err(invalid());
    }

    let (local, domain) = email.split_once('@').ok_or_else(invalid)?;
    if local.is_empty() || domain.contains('@') {
        return Err(invalid());
    }

    let well_formed_domain = domain
        .split_once('.')
        .map(|(host, tld)| !host.is_empty() && !tld.is_empty() && !tld.ends_with('.'))
        .unwrap_or(false);
    if !well_formed_domain || domain.starts_with('.') {
        return Err(invalid());
    }

    Ok(email)
}

/// Validates a password's length (minimum 6 characters).
pub fn validate_password(value: &str) -> ValidationResult<()> {
    if value.is_empty() {
        return Err(ValidationError::required("password"));
    }

    if value.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(ValidationError::TooShort {
            field: "password".to_string(),
            min: MIN_PASSWORD_LENGTH,
        });
    }

    Ok(())
}

/// Strips every non-digit from a franchise master SIM number.
///
/// The result must be 10 to 15 digits.
pub fn normalize_sim_number(value: &str) -> ValidationResult<String> {
    let digits: String = value.chars().filter(char::is_ascii_digit).collect();

    if digits.is_empty() {
        return Err(ValidationError::required("masterSimNo"));
    }

    if !(MIN_SIM_DIGITS..=MAX_SIM_DIGITS).contains(&digits.len()) {
        return Err(ValidationError::invalid_format(
            "masterSimNo",
            format!("must be {MIN_SIM_DIGITS}-{MAX_SIM_DIGITS} digits"),
        ));
    }

    Ok(digits)
}

// =============================================================================
// Geo Validators
// =============================================================================

/// Validates a GeoJSON `[longitude, latitude]` pair.
pub fn validate_coordinates(pair: &[f64]) -> ValidationResult<GeoPoint> {
    if pair.len() != 2 {
        return Err(ValidationError::invalid_format(
            "coordinates",
            "must be [longitude, latitude]",
        ));
    }

    let point = GeoPoint::new(pair[0], pair[1]);

    if !point.is_finite() {
        return Err(ValidationError::invalid_format(
            "coordinates",
            "must be finite numbers",
        ));
    }

    if !(-180.0..=180.0).contains(&point.longitude) {
        return Err(ValidationError::OutOfRange {
            field: "longitude".to_string(),
            min: -180.0,
            max: 180.0,
        });
    }

    if !(-90.0..=90.0).contains(&point.latitude) {
        return Err(ValidationError::OutOfRange {
            field: "latitude".to_string(),
            min: -90.0,
            max: 90.0,
        });
    }

    Ok(point)
}

/// Validates a search radius in kilometers.
pub fn validate_radius_km(radius_km: f64) -> ValidationResult<f64> {
    if !radius_km.is_finite() || radius_km <= 0.0 {
        return Err(ValidationError::MustBePositive {
            field: "radius".to_string(),
        });
    }
    Ok(radius_km)
}

// =============================================================================
// Sale Validators
// =============================================================================

/// Builds a validated sale line.
///
/// When `line_total` is omitted it is computed; when supplied it must equal
/// `unit_price × quantity` exactly.
pub fn build_sale_line(
    product: &str,
    quantity: i64,
    unit_price: Money,
    line_total: Option<Money>,
) -> CoreResult<SaleLine> {
    let product = product.trim();
    if product.is_empty() {
        return Err(ValidationError::required("product name").into());
    }

    if quantity <= 0 {
        return Err(ValidationError::MustBePositive {
            field: format!("quantity of '{product}'"),
        }
        .into());
    }

    if quantity > MAX_LINE_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: format!("quantity of '{product}'"),
            min: 1.0,
            max: MAX_LINE_QUANTITY as f64,
        }
        .into());
    }

    validate_unit_price(&format!("price of '{product}'"), unit_price)?;

    let expected = unit_price
        .checked_multiply_quantity(quantity)
        .filter(|total| total.cents() <= MAX_SALE_AMOUNT_CENTS)
        .ok_or_else(|| ValidationError::OutOfRange {
            field: format!("total of '{product}'"),
            min: 0.0,
            max: Money::from_cents(MAX_SALE_AMOUNT_CENTS).units() as f64,
        })?;

    if let Some(line_total) = line_total {
        if line_total != expected {
            return Err(CoreError::LineTotalMismatch {
                product: product.to_string(),
                line_total: line_total.cents(),
                expected: expected.cents(),
            });
        }
    }

    Ok(SaleLine {
        product: product.to_string(),
        quantity,
        unit_price,
        line_total: expected,
    })
}

/// Rejects negative prices and prices above [`MAX_UNIT_PRICE_CENTS`].
pub fn validate_unit_price(field: &str, price: Money) -> CoreResult<()> {
    if price.is_negative() {
        return Err(ValidationError::MustNotBeNegative {
            field: field.to_string(),
        }
        .into());
    }
    if price.cents() > MAX_UNIT_PRICE_CENTS {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0.0,
            max: Money::from_cents(MAX_UNIT_PRICE_CENTS).units() as f64,
        }
        .into());
    }
    Ok(())
}

/// Checks the sale-level invariants and returns the sale amount.
///
/// ## Rules
/// - At least one line
/// - Product names unique within the sale
/// - `amount`, when supplied, equals the sum of line totals
pub fn resolve_sale_amount(lines: &[SaleLine], amount: Option<Money>) -> CoreResult<Money> {
    if lines.is_empty() {
        return Err(ValidationError::required("products").into());
    }

    for (i, line) in lines.iter().enumerate() {
        if lines[..i].iter().any(|other| other.product == line.product) {
            return Err(ValidationError::invalid_format(
                "products",
                format!("'{}' appears more than once", line.product),
            )
            .into());
        }
    }

    let expected = lines
        .iter()
        .try_fold(Money::zero(), |acc, line| acc.checked_add(line.line_total))
        .filter(|total| total.cents() <= MAX_SALE_AMOUNT_CENTS)
        .ok_or_else(|| ValidationError::OutOfRange {
            field: "amount".to_string(),
            min: 0.0,
            max: Money::from_cents(MAX_SALE_AMOUNT_CENTS).units() as f64,
        })?;

    match amount {
        Some(amount) if amount != expected => Err(CoreError::AmountMismatch {
            amount: amount.cents(),
            expected: expected.cents(),
        }),
        _ => Ok(expected),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_required() {
        assert_eq!(validate_required("shopName", "  Ali Store ").unwrap(), "Ali Store");
        assert_eq!(
            validate_required("shopName", "   "),
            Err(ValidationError::required("shopName"))
        );
        assert!(validate_required("shopName", &"x".repeat(201)).is_err());
    }

    #[test]
    fn test_contact_number() {
        assert!(validate_contact_number("contactNo", "0300-1234567").is_ok());
        assert!(validate_contact_number("contactNo", "+92 300 1234567").is_ok());
        assert!(validate_contact_number("contactNo", "call me").is_err());
        assert!(validate_contact_number("contactNo", "+").is_err());
        assert!(validate_contact_number("contactNo", "").is_err());
    }

    #[test]
    fn test_email() {
        assert_eq!(normalize_email("A@B.io").unwrap(), "a@b.io");
        assert!(normalize_email("no-at-sign.com").is_err());
        assert!(normalize_email("@example.com").is_err());
        assert!(normalize_email("a@@example.com").is_err());
        assert!(normalize_email("a b@example.com").is_err());
        assert!(normalize_email("a@example.").is_err());
    }

    #[test]
    fn test_password() {
        assert!(validate_password("secret").is_ok());
        assert!(matches!(
            validate_password("12345"),
            Err(ValidationError::TooShort { min: 6, .. })
        ));
    }

    #[test]
    fn test_sim_number() {
        assert_eq!(normalize_sim_number("0300 123 4567").unwrap(), "03001234567");
        assert!(normalize_sim_number("123456789").is_err());
        assert!(normalize_sim_number("1234567890123456").is_err());
        assert_eq!(
            normalize_sim_number("abc"),
            Err(ValidationError::required("masterSimNo"))
        );
    }

    #[test]
    fn test_coordinates() {
        assert_eq!(validate_coordinates(&[1.0, 2.0]).unwrap(), GeoPoint::new(1.0, 2.0));
        assert!(validate_coordinates(&[]).is_err());
        assert!(validate_coordinates(&[1.0, 2.0, 3.0]).is_err());
        assert!(validate_coordinates(&[f64::NAN, 2.0]).is_err());
        assert!(validate_coordinates(&[200.0, 2.0]).is_err());
        assert!(validate_coordinates(&[0.0, -91.0]).is_err());
    }

    #[test]
    fn test_build_sale_line_computes_total() {
        let line = build_sale_line(" Tea ", 3, Money::from_cents(250), None).unwrap();
        assert_eq!(line.product, "Tea");
        assert_eq!(line.line_total, Money::from_cents(750));
    }

    #[test]
    fn test_build_sale_line_rejects_bad_input() {
        assert!(build_sale_line("Tea", 0, Money::from_cents(250), None).is_err());
        assert!(build_sale_line("Tea", 1, Money::from_cents(-1), None).is_err());
        assert!(build_sale_line("", 1, Money::from_cents(1), None).is_err());
        assert!(build_sale_line("Tea", MAX_LINE_QUANTITY + 1, Money::from_cents(1), None).is_err());

        let err = build_sale_line("Tea", 2, Money::from_cents(250), Some(Money::from_cents(400)))
            .unwrap_err();
        assert!(matches!(err, CoreError::LineTotalMismatch { expected: 500, .. }));
    }

    #[test]
    fn test_resolve_sale_amount() {
        let lines = vec![
            build_sale_line("Tea", 2, Money::from_cents(250), None).unwrap(),
            build_sale_line("Sugar", 1, Money::from_cents(1000), None).unwrap(),
        ];

        assert_eq!(resolve_sale_amount(&lines, None).unwrap(), Money::from_cents(1500));
        assert_eq!(
            resolve_sale_amount(&lines, Some(Money::from_cents(1500))).unwrap(),
            Money::from_cents(1500)
        );
        assert!(matches!(
            resolve_sale_amount(&lines, Some(Money::from_cents(1400))),
            Err(CoreError::AmountMismatch { amount: 1400, expected: 1500 })
        ));
        assert!(resolve_sale_amount(&[], None).is_err());
    }

    #[test]
    fn test_build_sale_line_caps_unit_price() {
        let huge = Money::from_cents(4_611_686_018_427_387_904);
        assert!(matches!(
            build_sale_line("Tea", 1, huge, None),
            Err(CoreError::Validation(ValidationError::OutOfRange { .. }))
        ));

        let ceiling = Money::from_cents(MAX_UNIT_PRICE_CENTS);
        assert!(build_sale_line("Tea", 1, ceiling, None).is_ok());
        assert!(build_sale_line("Tea", 1, ceiling + Money::from_cents(1), None).is_err());
        // Price and quantity both legal, product above the sale ceiling.
        assert!(build_sale_line("Tea", 100, ceiling, None).is_err());
    }

    #[test]
    fn test_resolve_sale_amount_caps_total() {
        let ceiling = Money::from_cents(MAX_UNIT_PRICE_CENTS);
        let lines: Vec<SaleLine> = (0..11)
            .map(|i| build_sale_line(&format!("Item {i}"), 1, ceiling, None).unwrap())
            .collect();
        assert!(resolve_sale_amount(&lines[..10], None).is_ok());
        assert!(matches!(
            resolve_sale_amount(&lines, None),
            Err(CoreError::Validation(ValidationError::OutOfRange { .. }))
        ));
    }

    #[test]
    fn test_resolve_sale_amount_rejects_duplicate_products() {
        let line = build_sale_line("Tea", 1, Money::from_cents(100), None).unwrap();
        assert!(resolve_sale_amount(&[line.clone(), line], None).is_err());
    }
}
