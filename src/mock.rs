// Recording `CouponApi` for tests.
//
// Records every call, answers with configurable results, and can hold
// `authenticate` until the test releases a gate so an attempt stays in flight.
//
// # Example
// ```ignore
// let api = MockCouponApi::new();
// api.fail_authentication("401 Unauthorized - bad password");
// let gate = api.gate_authentication();
// // ... attempt is now blocked inside authenticate ...
// gate.send(()).unwrap();
// ```

use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};

use serde_json::{json, Value};

use crate::api::CouponApi;
use crate::error::ApiError;
use crate::types::{AssignmentResult, AssignmentStatus, AuthToken, Credentials};

/// One recorded call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockCall {
    Authenticate {
        username: String,
    },
    AssignSingle {
        token: String,
        coupon_id: u64,
        member_ids: Vec<u64>,
    },
    AssignWithDuplicates {
        token: String,
        coupon_id: u64,
        member_ids: Vec<u64>,
        allow_duplicates: Option<bool>,
    },
}

#[derive(Default)]
struct MockState {
    calls: Vec<MockCall>,
    auth_error: Option<String>,
    assign_error: Option<String>,
    auth_gate: Option<Receiver<()>>,
}

#[derive(Clone, Default)]
pub struct MockCouponApi {
    state: Arc<Mutex<MockState>>,
}

impl MockCouponApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `authenticate` fail with the given reason.
    pub fn fail_authentication(&self, reason: &str) {
        self.lock().auth_error = Some(reason.to_string());
    }

    /// Make both assignment calls fail with the given reason.
    pub fn fail_assignment(&self, reason: &str) {
        self.lock().assign_error = Some(reason.to_string());
    }

    /// Block the next `authenticate` call until the returned sender fires or
    /// is dropped.
    pub fn gate_authentication(&self) -> Sender<()> {
        let (tx, rx) = mpsc::channel();
        self.lock().auth_gate = Some(rx);
        tx
    }

    pub fn calls(&self) -> Vec<MockCall> {
        self.lock().calls.clone()
    }

    pub fn call_count(&self) -> usize {
        self.lock().calls.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        // a panicking test thread must not hide the calls from the others
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn record(&self, call: MockCall) {
        self.lock().calls.push(call);
    }
}

impl CouponApi for MockCouponApi {
    fn authenticate(&self, credentials: &Credentials) -> Result<AuthToken, ApiError> {
        self.record(MockCall::Authenticate {
            username: credentials.username.clone(),
        });
        // take the gate out before waiting so other calls can still lock
        let gate = self.lock().auth_gate.take();
        if let Some(rx) = gate {
            let _ = rx.recv();
        }
        match self.lock().auth_error.clone() {
            Some(reason) => Err(ApiError::Authentication(reason)),
            None => Ok(AuthToken::new(format!("token-{}", credentials.username))),
        }
    }

    fn assign_single(
        &self,
        token: &AuthToken,
        coupon_id: u64,
        member_ids: &[u64],
    ) -> Result<AssignmentResult, ApiError> {
        self.record(MockCall::AssignSingle {
            token: token.as_str().to_string(),
            coupon_id,
            member_ids: member_ids.to_vec(),
        });
        match self.lock().assign_error.clone() {
            Some(reason) => Err(ApiError::Assignment(reason)),
            None => Ok(AssignmentResult::from_payload(
                created_payload(member_ids),
                AssignmentStatus::Created,
            )),
        }
    }

    fn assign_with_duplicates(
        &self,
        token: &AuthToken,
        coupon_id: u64,
        member_ids: &[u64],
        allow_duplicates: Option<bool>,
    ) -> Result<AssignmentResult, ApiError> {
        self.record(MockCall::AssignWithDuplicates {
            token: token.as_str().to_string(),
            coupon_id,
            member_ids: member_ids.to_vec(),
            allow_duplicates,
        });
        match self.lock().assign_error.clone() {
            Some(reason) => Err(ApiError::Assignment(reason)),
            None => Ok(AssignmentResult::from_payload(
                json!({ "data": crate::types::SCHEDULED_MESSAGE }),
                AssignmentStatus::Scheduled,
            )),
        }
    }
}

fn created_payload(member_ids: &[u64]) -> Value {
    json!({ "data": member_ids.iter().map(|id| json!({ "MemberID": id })).collect::<Vec<_>>() })
}
