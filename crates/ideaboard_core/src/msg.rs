#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// Begin tracking. `credential` is the bearer token, if one is available.
    Start { credential: Option<String> },
    /// One `data` payload from the event stream.
    StreamMessage(String),
    /// The subscription or the invoke call failed at the transport level.
    TransportError(String),
    /// Raw body of one invoke response.
    PollResponse(String),
    /// Poll interval elapsed; time to re-invoke.
    PollDue,
    /// Post-success delay elapsed; time to navigate.
    RedirectDue,
    /// Caller left the view; close everything.
    Teardown,
}
