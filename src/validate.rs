// Turns raw form text into an `AssignmentRequest`.

use crate::error::ValidationError;
use crate::types::{AssignmentForm, AssignmentRequest, Credentials};

/// Result of a successful validation: who logs in, and what to assign.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedForm {
    pub credentials: Credentials,
    pub request: AssignmentRequest,
}

/// Validate the whole form. Checks run in form order: credentials, coupon id,
/// then member ids.
pub fn validate(form: &AssignmentForm) -> Result<ValidatedForm, ValidationError> {
    let username = form.username.trim();
    let password = form.password.trim();
    if username.is_empty() || password.is_empty() {
        return Err(ValidationError::MissingCredentials);
    }

    let coupon_id = parse_coupon_id(&form.coupon_id)?;
    let member_ids = parse_member_ids(&form.member_ids)?;

    Ok(ValidatedForm {
        credentials: Credentials {
            username: username.to_string(),
            password: password.to_string(),
        },
        request: AssignmentRequest {
            coupon_id,
            member_ids,
            allow_duplicates: form.allow_duplicates,
        },
    })
}

pub fn parse_coupon_id(raw: &str) -> Result<u64, ValidationError> {
    parse_positive_id(raw.trim()).ok_or(ValidationError::InvalidCouponId)
}

/// Split on commas and newlines, keep numeric tokens in order. Duplicates are
/// kept; everything else is silently dropped.
pub fn parse_member_ids(blob: &str) -> Result<Vec<u64>, ValidationError> {
    let ids: Vec<u64> = blob
        .split(|c: char| c == ',' || c == '\n')
        .filter_map(|token| parse_positive_id(token.trim()))
        .collect();
    if ids.is_empty() {
        return Err(ValidationError::NoValidMemberIds);
    }
    Ok(ids)
}

fn parse_positive_id(token: &str) -> Option<u64> {
    if token.is_empty() || !token.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    // digits only, so a parse failure means overflow
    token.parse::<u64>().ok().filter(|id| *id > 0)
}
