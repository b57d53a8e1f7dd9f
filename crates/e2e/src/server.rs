//! Site server management - serving the site under test for a run

use std::process::{Child, Command, Stdio};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, warn};

use pagecheck_common::config::join_url;
use pagecheck_common::SiteServerConfig;

use crate::error::{E2eError, E2eResult};

/// Handle to a running site server process; stopped on drop
pub struct SiteServer {
    child: Child,
    base_url: String,
}

impl SiteServer {
    /// Spawn the configured command and wait until `base_url` answers
    pub async fn spawn(config: &SiteServerConfig, base_url: &str) -> E2eResult<Self> {
        info!("Starting site server: {} {}", config.command, config.args.join(" "));

        let mut cmd = Command::new(&config.command);
        cmd.args(&config.args)
            .stdout(Stdio::null())
            .stderr(Stdio::inherit());
        if let Some(cwd) = &config.cwd {
            cmd.current_dir(cwd);
        }

        let child = cmd.spawn().map_err(|e| {
            E2eError::ServerStartup(format!("Failed to spawn {}: {}", config.command, e))
        })?;

        let handle = SiteServer {
            child,
            base_url: base_url.to_string(),
        };

        let health_url = join_url(base_url, &config.health_path);
        wait_for_healthy(&health_url, config.startup_timeout()).await?;

        info!("Site is serving at {}", base_url);
        Ok(handle)
    }

    /// Get the base URL for this server
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Stop the server
    pub fn stop(&mut self) -> E2eResult<()> {
        if let Ok(Some(_)) = self.child.try_wait() {
            return Ok(());
        }

        info!("Stopping site server (pid: {})", self.child.id());

        // Try graceful shutdown first
        #[cfg(unix)]
        {
            use nix::sys::signal::{kill, Signal};
            use nix::unistd::Pid;

            let pid = Pid::from_raw(self.child.id() as i32);
            if kill(pid, Signal::SIGTERM).is_ok() {
                std::thread::sleep(Duration::from_millis(500));
            }
        }

        // Force kill if still running
        let _ = self.child.kill();
        let _ = self.child.wait();

        Ok(())
    }
}

impl Drop for SiteServer {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}

/// Poll `url` until it answers 2xx or `limit` elapses
pub async fn wait_for_healthy(url: &str, limit: Duration) -> E2eResult<()> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(2))
        .build()?;

    let start = std::time::Instant::now();
    let mut attempts = 0;

    while start.elapsed() < limit {
        attempts += 1;

        match client.get(url).send().await {
            Ok(resp) if resp.status().is_success() => {
                return Ok(());
            }
            Ok(resp) => {
                warn!("Health check returned {}", resp.status());
            }
            Err(e) => {
                if attempts == 1 {
                    info!("Waiting for site to start...");
                }
                // Connection refused is expected while the server is starting
                if !e.is_connect() {
                    warn!("Health check error: {}", e);
                }
            }
        }

        sleep(Duration::from_millis(100)).await;
    }

    Err(E2eError::ServerHealthCheck(attempts))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_health_check_gives_up() {
        // Port 9 (discard) is not expected to serve HTTP
        let err = wait_for_healthy("http://127.0.0.1:9/", Duration::from_millis(300))
            .await
            .unwrap_err();
        assert!(matches!(err, E2eError::ServerHealthCheck(n) if n >= 1));
    }

    #[tokio::test]
    async fn test_spawn_failure_reported() {
        let config = SiteServerConfig {
            command: "definitely-not-a-real-binary-pagecheck".to_string(),
            args: vec![],
            cwd: None,
            health_path: "/".to_string(),
            startup_timeout_ms: 100,
        };
        let result = SiteServer::spawn(&config, "http://127.0.0.1:9").await;
        assert!(matches!(result, Err(E2eError::ServerStartup(_))));
    }
}
