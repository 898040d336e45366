// Endpoint selection for a validated assignment.
//
// All member ids go out in a single request; "batch" only names the fact
// that one request covers many members.

use crate::api::CouponApi;
use crate::error::DispatchError;
use crate::types::{AssignmentRequest, AssignmentResult, AuthToken, ProgressEvent};

pub struct Dispatcher<'a, A: CouponApi + ?Sized> {
    api: &'a A,
}

impl<'a, A: CouponApi + ?Sized> Dispatcher<'a, A> {
    pub fn new(api: &'a A) -> Self {
        Dispatcher { api }
    }

    /// Send `request` to `schedule` when duplicates are allowed, to `create`
    /// otherwise. Reports `Started` before the call and `Completed` after a
    /// successful one.
    pub fn dispatch<F>(
        &self,
        token: &AuthToken,
        request: &AssignmentRequest,
        mut on_progress: F,
    ) -> Result<Vec<AssignmentResult>, DispatchError>
    where
        F: FnMut(ProgressEvent),
    {
        let total = request.member_ids().len();
        tracing::info!(
            coupon_id = request.coupon_id(),
            members = total,
            allow_duplicates = request.allow_duplicates(),
            "Dispatching coupon assignment"
        );
        on_progress(ProgressEvent::started(total));

        let outcome = if request.allow_duplicates() {
            self.api.assign_with_duplicates(
                token,
                request.coupon_id(),
                request.member_ids(),
                Some(true),
            )
        } else {
            self.api
                .assign_single(token, request.coupon_id(), request.member_ids())
        };
        let result = outcome.map_err(|e| {
            tracing::warn!(coupon_id = request.coupon_id(), error = %e, "Assignment failed");
            DispatchError::BatchAssignment(e)
        })?;

        on_progress(ProgressEvent::completed(total));
        Ok(vec![result])
    }
}
