use std::time::Duration;

use crate::{InvokeRequest, JobStatus};

#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    OpenStream { url: String },
    CloseConnection,
    Invoke { request: InvokeRequest },
    SchedulePoll { delay: Duration },
    PersistResult { key: String, payload: String },
    ClearActiveJob,
    ScheduleRedirect { delay: Duration },
    Navigate { route: String },
    StatusChanged(JobStatus),
}
