//! # Validation Module
//!
//! Boundary validation of caller-supplied input. Each operation in the
//! service layer validates its inputs here before touching the store; the
//! database constraints (NOT NULL, UNIQUE, CHECK) remain the last line of
//! defense.

use crate::error::ValidationError;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Identity Validators
// =============================================================================

/// Validates a guest session token.
///
/// Opaque to us - the only rule is that a guest caller must present one.
pub fn validate_session_id(session_id: &str) -> ValidationResult<()> {
    if session_id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "session_id".to_string(),
        });
    }
    Ok(())
}

/// Validates an email address.
///
/// Deliberately loose: one `@` with something on both sides, no whitespace.
/// Deliverability is the mail dispatcher's problem, not ours.
pub fn validate_email(email: &str) -> ValidationResult<()> {
    let email = email.trim();

    if email.is_empty() {
        return Err(ValidationError::Required {
            field: "email".to_string(),
        });
    }

    if email.len() > 254 {
        return Err(ValidationError::TooLong {
            field: "email".to_string(),
            max: 254,
        });
    }

    let mut parts = email.splitn(2, '@');
    let local = parts.next().unwrap_or("");
    let domain = parts.next().unwrap_or("");
    if local.is_empty() || domain.is_empty() || !domain.contains('.') || email.contains(' ') {
        return Err(ValidationError::InvalidFormat {
            field: "email".to_string(),
            reason: "expected name@domain.tld".to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Order Input Validators
// =============================================================================

/// Validates an address line.
pub fn validate_address_line(address_line: &str) -> ValidationResult<()> {
    let line = address_line.trim();

    if line.is_empty() {
        return Err(ValidationError::Required {
            field: "address_line".to_string(),
        });
    }

    if line.len() > 500 {
        return Err(ValidationError::TooLong {
            field: "address_line".to_string(),
            max: 500,
        });
    }

    Ok(())
}

/// Validates a caller-supplied delivery fee in cents. The fee is not
/// server-computed; the only rule is that it must not be negative.
pub fn validate_delivery_fee(fee_cents: i64) -> ValidationResult<()> {
    if fee_cents < 0 {
        return Err(ValidationError::Negative {
            field: "delivery_fee".to_string(),
        });
    }
    Ok(())
}

/// Validates a cancellation reason: present and non-empty.
pub fn validate_cancellation_reason(reason: &str) -> ValidationResult<()> {
    if reason.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "cancellation_reason".to_string(),
        });
    }

    if reason.len() > 1000 {
        return Err(ValidationError::TooLong {
            field: "cancellation_reason".to_string(),
            max: 1000,
        });
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_id_required() {
        assert!(validate_session_id("sess-abc").is_ok());
        assert!(validate_session_id("").is_err());
        assert!(validate_session_id("   ").is_err());
    }

    #[test]
    fn test_email_shapes() {
        assert!(validate_email("buyer@example.com").is_ok());
        assert!(validate_email("").is_err());
        assert!(validate_email("no-at-sign").is_err());
        assert!(validate_email("@example.com").is_err());
        assert!(validate_email("buyer@nodot").is_err());
        assert!(validate_email("two words@example.com").is_err());
    }

    #[test]
    fn test_delivery_fee_nonnegative() {
        assert!(validate_delivery_fee(0).is_ok());
        assert!(validate_delivery_fee(1_500).is_ok());
        assert!(validate_delivery_fee(-1).is_err());
    }

    #[test]
    fn test_cancellation_reason() {
        assert!(validate_cancellation_reason("duplicate order").is_ok());
        assert!(validate_cancellation_reason("").is_err());
        assert!(validate_cancellation_reason("  ").is_err());
    }

    #[test]
    fn test_address_line() {
        assert!(validate_address_line("12 Canal Road, Lahore").is_ok());
        assert!(validate_address_line("").is_err());
    }
}
