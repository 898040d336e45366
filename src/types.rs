// Data types shared by the validator, client, dispatcher and session:
// credentials and token, the raw form, the validated request, and the
// result and progress values reported back to the shell.

use std::fmt;

/// Login credentials. Only held for the duration of one login call.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Opaque session token returned by the login endpoint.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthToken(String);

impl AuthToken {
    pub fn new(token: impl Into<String>) -> Self {
        AuthToken(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AuthToken(<redacted>)")
    }
}

/// Raw text exactly as the operator typed it into the form.
#[derive(Debug, Clone, Default)]
pub struct AssignmentForm {
    pub username: String,
    pub password: String,
    pub coupon_id: String,
    pub member_ids: String,
    pub allow_duplicates: bool,
}

/// A validated assignment. Only `validate::validate` builds one, so the coupon
/// id is always positive and `member_ids` is never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssignmentRequest {
    pub(crate) coupon_id: u64,
    pub(crate) member_ids: Vec<u64>,
    pub(crate) allow_duplicates: bool,
}

impl AssignmentRequest {
    pub fn coupon_id(&self) -> u64 {
        self.coupon_id
    }

    pub fn member_ids(&self) -> &[u64] {
        &self.member_ids
    }

    pub fn allow_duplicates(&self) -> bool {
        self.allow_duplicates
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignmentStatus {
    Scheduled,
    Created,
    Failed,
}

impl fmt::Display for AssignmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scheduled => write!(f, "scheduled"),
            Self::Created => write!(f, "created"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Message the schedule endpoint returns in `data` when it accepted the batch.
pub const SCHEDULED_MESSAGE: &str = "Coupons have been scheduled for creation";

/// Outcome of one assignment call, with the backend payload kept as-is.
#[derive(Debug, Clone, PartialEq)]
pub struct AssignmentResult {
    pub status: AssignmentStatus,
    pub raw_payload: serde_json::Value,
}

impl AssignmentResult {
    /// Classify a successful HTTP response. A payload reporting
    /// `"success": false` is a failure even on a 2xx status.
    pub fn from_payload(raw_payload: serde_json::Value, on_success: AssignmentStatus) -> Self {
        let status = match raw_payload.get("success").and_then(|v| v.as_bool()) {
            Some(false) => AssignmentStatus::Failed,
            _ => on_success,
        };
        AssignmentResult {
            status,
            raw_payload,
        }
    }

    pub fn is_scheduled_message(&self) -> bool {
        self.raw_payload.get("data").and_then(|v| v.as_str()) == Some(SCHEDULED_MESSAGE)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressStage {
    Started,
    Completed,
}

/// Progress notification emitted by the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressEvent {
    pub stage: ProgressStage,
    /// 0.0 to 1.0
    pub fraction: f32,
    pub processed: usize,
    pub total: usize,
}

impl ProgressEvent {
    pub fn started(total: usize) -> Self {
        ProgressEvent {
            stage: ProgressStage::Started,
            fraction: 0.0,
            processed: 0,
            total,
        }
    }

    pub fn completed(total: usize) -> Self {
        ProgressEvent {
            stage: ProgressStage::Completed,
            fraction: 1.0,
            processed: total,
            total,
        }
    }
}

impl fmt::Display for ProgressEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.stage {
            ProgressStage::Started => write!(f, "Processing coupon assignments..."),
            ProgressStage::Completed => write!(
                f,
                "Progress: {}/{} ({:.1}%)",
                self.processed,
                self.total,
                self.fraction * 100.0
            ),
        }
    }
}
