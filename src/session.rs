// Session module: runs one assignment attempt at a time on a worker thread.
// The shell submits the raw form and reads `SessionEvent`s back from a
// channel; the worker never touches the terminal itself.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::api::CouponApi;
use crate::config::FeatureFlags;
use crate::dispatch::Dispatcher;
use crate::error::SessionError;
use crate::types::{AssignmentForm, AssignmentResult, ProgressEvent};
use crate::validate::validate;

/// Where the current attempt is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Validating,
    Authenticating,
    Dispatching,
    Succeeded,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Phase(Phase),
    Log { level: LogLevel, message: String },
    Progress(ProgressEvent),
    /// Last event of an attempt. The busy flag is already released.
    Finished(Result<AssignmentSummary, SessionError>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct AssignmentSummary {
    pub coupon_id: u64,
    pub members: usize,
    pub results: Vec<AssignmentResult>,
}

/// Clears the busy flag when the attempt ends, however it ends.
struct BusyGuard(Arc<AtomicBool>);

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

pub struct Session<A> {
    api: Arc<A>,
    features: FeatureFlags,
    busy: Arc<AtomicBool>,
    events: Sender<SessionEvent>,
}

impl<A: CouponApi + 'static> Session<A> {
    /// Build a session and the receiving end of its event channel.
    pub fn new(api: A, features: FeatureFlags) -> (Self, Receiver<SessionEvent>) {
        let (tx, rx) = mpsc::channel();
        let session = Session {
            api: Arc::new(api),
            features,
            busy: Arc::new(AtomicBool::new(false)),
            events: tx,
        };
        (session, rx)
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    /// Start an attempt on a worker thread. Returns `None` without doing
    /// anything when an attempt is already in flight.
    pub fn submit(&self, form: AssignmentForm) -> Option<JoinHandle<()>> {
        if self
            .busy
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            tracing::debug!("Assignment already in progress, ignoring submit");
            return None;
        }
        let guard = BusyGuard(self.busy.clone());
        let api = self.api.clone();
        let features = self.features.clone();
        let tx = self.events.clone();

        Some(thread::spawn(move || {
            let outcome = {
                let _guard = guard;
                let reporter = Reporter { tx: &tx };
                let outcome = run_attempt(api.as_ref(), &features, &form, &reporter);
                match &outcome {
                    Ok(_) => reporter.phase(Phase::Succeeded),
                    Err(e) => {
                        reporter.log(LogLevel::Error, format!("Error: {}", e));
                        reporter.phase(Phase::Failed);
                    }
                }
                reporter.phase(Phase::Idle);
                outcome
            };
            let _ = tx.send(SessionEvent::Finished(outcome));
        }))
    }
}

struct Reporter<'a> {
    tx: &'a Sender<SessionEvent>,
}

impl Reporter<'_> {
    // the shell may have gone away; the attempt still runs to completion
    fn send(&self, event: SessionEvent) {
        let _ = self.tx.send(event);
    }

    fn phase(&self, phase: Phase) {
        self.send(SessionEvent::Phase(phase));
    }

    fn log(&self, level: LogLevel, message: impl Into<String>) {
        self.send(SessionEvent::Log {
            level,
            message: message.into(),
        });
    }
}

fn run_attempt<A: CouponApi + ?Sized>(
    api: &A,
    features: &FeatureFlags,
    form: &AssignmentForm,
    reporter: &Reporter<'_>,
) -> Result<AssignmentSummary, SessionError> {
    reporter.phase(Phase::Validating);
    reporter.log(LogLevel::Info, "Validating inputs...");
    let validated = validate(form)?;
    let request = validated.request;
    let members = request.member_ids().len();
    if members > features.max_batch_size {
        reporter.log(
            LogLevel::Warning,
            format!(
                "{} members exceeds the configured batch size of {}; sending them in one request",
                members, features.max_batch_size
            ),
        );
    }

    reporter.phase(Phase::Authenticating);
    reporter.log(LogLevel::Info, "Authenticating...");
    let token = api.authenticate(&validated.credentials)?;
    drop(validated.credentials);
    reporter.log(LogLevel::Success, "Authentication successful");

    reporter.phase(Phase::Dispatching);
    reporter.log(
        LogLevel::Info,
        format!(
            "Assigning coupon {} to {} members...",
            request.coupon_id(),
            members
        ),
    );
    reporter.log(
        LogLevel::Info,
        format!(
            "Allow duplicates: {}",
            if request.allow_duplicates() { "Yes" } else { "No" }
        ),
    );
    let results = Dispatcher::new(api).dispatch(&token, &request, |event| {
        reporter.log(LogLevel::Info, event.to_string());
        reporter.send(SessionEvent::Progress(event));
    })?;

    reporter.log(LogLevel::Success, "Coupon assignment completed successfully!");
    reporter.log(
        LogLevel::Info,
        format!("Total assignments processed: {}", members),
    );
    for (i, result) in results.iter().enumerate() {
        let line = if result.is_scheduled_message() {
            format!("Batch {}: Coupons scheduled for creation", i + 1)
        } else {
            format!("Batch {} ({}): {}", i + 1, result.status, result.raw_payload)
        };
        reporter.log(LogLevel::Success, line);
    }

    Ok(AssignmentSummary {
        coupon_id: request.coupon_id(),
        members,
        results,
    })
}
