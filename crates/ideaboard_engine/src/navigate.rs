use tracker_logging::tracker_info;

/// Client-side navigation, invoked once when a job succeeds.
pub trait Navigator: Send + Sync {
    fn navigate(&self, route: &str);
}

/// Navigator that only records the route in the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNavigator;

impl Navigator for LogNavigator {
    fn navigate(&self, route: &str) {
        tracker_info!("Navigate to {}", route);
    }
}
