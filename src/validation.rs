use std::sync::OnceLock;

use regex::Regex;

use crate::error::{CobranzaError, Result};
use crate::models::PaymentDraft;

pub const CREDIT_NUMBER_MIN_LEN: usize = 6;
pub const CREDIT_NUMBER_MAX_LEN: usize = 20;

fn credit_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Za-z0-9-]+$").expect("static pattern"))
}

pub fn check_credit_number(credit_number: &str) -> Option<String> {
    let len = credit_number.chars().count();
    if credit_number.is_empty() {
        Some("credit number is required".to_string())
    } else if !credit_pattern().is_match(credit_number) {
        Some(format!("credit number '{credit_number}' may only contain letters, digits and '-'"))
    } else if !(CREDIT_NUMBER_MIN_LEN..=CREDIT_NUMBER_MAX_LEN).contains(&len) {
        Some(format!(
            "credit number must be {CREDIT_NUMBER_MIN_LEN}-{CREDIT_NUMBER_MAX_LEN} characters, got {len}"
        ))
    } else {
        None
    }
}

/// Check a payment form before it is staged. Every problem is reported at
/// once, joined into a single `Validation` error.
pub fn validate_draft(draft: &PaymentDraft, payment_types: &[String]) -> Result<()> {
    let mut problems = Vec::new();

    if let Some(problem) = check_credit_number(&draft.credit_number) {
        problems.push(problem);
    }
    if draft.cycle.trim().is_empty() {
        problems.push("cycle is required".to_string());
    }
    if !draft.amount.is_finite() || draft.amount <= 0.0 {
        problems.push(format!("amount must be greater than zero, got {}", draft.amount));
    }
    if draft.payment_type.trim().is_empty() {
        problems.push("payment type is required".to_string());
    } else if !payment_types.iter().any(|t| t == &draft.payment_type) {
        problems.push(format!("unknown payment type '{}'", draft.payment_type));
    }
    match (draft.latitude, draft.longitude) {
        (Some(lat), Some(lon)) => {
            if !(-90.0..=90.0).contains(&lat) {
                problems.push(format!("latitude {lat} out of range"));
            }
            if !(-180.0..=180.0).contains(&lon) {
                problems.push(format!("longitude {lon} out of range"));
            }
        }
        (None, None) => {}
        _ => problems.push("latitude and longitude must be given together".to_string()),
    }

    if problems.is_empty() {
        Ok(())
    } else {
        Err(CobranzaError::Validation(problems.join("; ")))
    }
}
