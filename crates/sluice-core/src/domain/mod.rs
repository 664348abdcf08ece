//! Domain model (records, triggers, task snapshots, decisions, responses).

pub mod decision;
pub mod errors;
pub mod ids;
pub mod record;
pub mod response;
pub mod task;
pub mod trigger;

pub use self::decision::{TerminationDecider, TerminationDecision, TimeoutDecider};
pub use self::errors::{ErrorKind, SluiceError};
pub use self::ids::{ReapRunId, TriggerRunId};
pub use self::record::{ChangeNotification, ChangeRecord, RawChangeRecord, S3_EVENT_SOURCE};
pub use self::response::InvocationResponse;
pub use self::task::{ContainerStatus, RunningTaskSnapshot};
pub use self::trigger::{ContainerTrigger, DispatchDetail, DispatchEvent};
