//! Process shutdown signals
//!
//! Both the daemon and the foreground CLI loop stop on SIGINT or SIGTERM.
//! Platforms without unix signals fall back to Ctrl-C.

use std::io;
use tracing::info;

/// Installed handlers for the signals that end the scheduler loop
pub struct ShutdownSignals {
    #[cfg(unix)]
    interrupt: tokio::signal::unix::Signal,
    #[cfg(unix)]
    terminate: tokio::signal::unix::Signal,
}

impl ShutdownSignals {
    /// Register the handlers; must be called inside a tokio runtime
    #[cfg(unix)]
    pub fn install() -> io::Result<Self> {
        use tokio::signal::unix::{signal, SignalKind};

        Ok(Self {
            interrupt: signal(SignalKind::interrupt())?,
            terminate: signal(SignalKind::terminate())?,
        })
    }

    #[cfg(not(unix))]
    pub fn install() -> io::Result<Self> {
        Ok(Self {})
    }

    /// Wait for the next shutdown signal and return its name
    #[cfg(unix)]
    pub async fn recv(&mut self) -> io::Result<&'static str> {
        let name = tokio::select! {
            _ = self.interrupt.recv() => "SIGINT",
            _ = self.terminate.recv() => "SIGTERM",
        };
        info!(signal = name, "Received shutdown signal");
        Ok(name)
    }

    #[cfg(not(unix))]
    pub async fn recv(&mut self) -> io::Result<&'static str> {
        tokio::signal::ctrl_c().await?;
        info!(signal = "Ctrl-C", "Received shutdown signal");
        Ok("Ctrl-C")
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::process::Command;
    use std::time::Duration;

    #[tokio::test]
    async fn test_sigterm_ends_wait() {
        let mut signals = ShutdownSignals::install().unwrap();

        let status = Command::new("kill")
            .args(["-TERM", &std::process::id().to_string()])
            .status()
            .unwrap();
        assert!(status.success());

        let name = tokio::time::timeout(Duration::from_secs(5), signals.recv())
            .await
            .expect("no shutdown signal observed")
            .unwrap();
        assert_eq!(name, "SIGTERM");
    }
}
