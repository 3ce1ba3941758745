//! Desktop notifications via `notify-send`

use breather_host_api::{HostError, HostResult, Notice, Notifier};
use std::process::Command;
use tracing::debug;

const APP_NAME: &str = "breather";

/// Sends notices through the freedesktop notification service
#[derive(Debug, Default, Clone, Copy)]
pub struct DesktopNotifier;

impl DesktopNotifier {
    pub fn new() -> Self {
        Self
    }

    /// Check if `notify-send` can be run
    pub fn is_available() -> bool {
        Command::new("notify-send")
            .arg("--version")
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }
}

impl Notifier for DesktopNotifier {
    fn notify(&self, notice: &Notice) -> HostResult<()> {
        let output = Command::new("notify-send")
            .args(["--app-name", APP_NAME])
            .arg(&notice.title)
            .arg(&notice.body)
            .output()?;

        if !output.status.success() {
            return Err(HostError::Internal(format!(
                "notify-send exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        debug!(title = %notice.title, "Notification sent");
        Ok(())
    }
}
