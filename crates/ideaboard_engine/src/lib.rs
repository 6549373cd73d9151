//! Ideaboard engine: transports, local storage and the tracker runtime.
mod client;
mod credentials;
mod navigate;
mod runtime;
mod sse;
mod store;
mod subscribe;
mod types;

pub use client::{
    new_thread_id, ClientSettings, HttpJobClient, IdeaReader, JobInvoker, RunCreator,
    RUN_PERSONA_COUNT,
};
pub use credentials::{CredentialProvider, StaticCredentials, StoreCredentials};
pub use navigate::{LogNavigator, Navigator};
pub use runtime::{LogStatusSink, StatusSink, Tracker, TrackerDeps};
pub use sse::{SseDecoder, SseEvent};
pub use store::{
    key_filename, FileStore, LocalStore, MemoryStore, StoreError, ACTIVE_THREAD_KEY,
    AUTH_TOKEN_KEY,
};
pub use subscribe::{
    ChannelEventSink, EventSink, ReqwestSubscriber, StreamSubscriber, SubscribeSettings,
};
pub use types::{FailureKind, TransportError};
