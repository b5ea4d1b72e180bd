//! Navigation seam so teardown can redirect without knowing the UI router.

use std::time::Duration;

/// Login entry point users are sent to after a session teardown.
pub const LOGIN_PATH: &str = "/login";

/// Pause between the teardown notice and the redirect so the notice renders.
pub const REDIRECT_DELAY: Duration = Duration::from_millis(1000);

pub trait Navigator: Send + Sync {
    /// Current location, compared against [`LOGIN_PATH`] to avoid redirect
    /// loops.
    fn current_path(&self) -> String;

    fn navigate(&self, path: &str);
}

/// Navigator for headless contexts; reports no location and goes nowhere.
#[derive(Debug, Default)]
pub struct NoopNavigator;

impl Navigator for NoopNavigator {
    fn current_path(&self) -> String {
        String::new()
    }

    fn navigate(&self, _path: &str) {}
}
