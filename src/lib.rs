// Library root
// -----------
// This crate exposes the coupon assigner as a library. The binary
// (`main.rs`) wires config, client and session together and hands them to
// the interactive menu.
//
// Module responsibilities:
// - `config`: loads `config.json` (or built-in defaults).
// - `api`: blocking HTTP client for login, create and schedule.
// - `validate`: raw form text to a typed assignment request.
// - `dispatch`: picks the endpoint and reports progress.
// - `session`: one attempt at a time on a worker thread, events out.
// - `ui`: terminal menu, prompts, progress bar and activity log.
pub mod api;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod mock;
pub mod session;
pub mod types;
pub mod ui;
pub mod validate;

pub use api::{ApiClient, CouponApi};
pub use config::AppConfig;
pub use error::{ApiError, DispatchError, SessionError, ValidationError};
pub use session::{Session, SessionEvent};
pub use types::{AssignmentForm, AssignmentRequest, AssignmentResult, AssignmentStatus};
