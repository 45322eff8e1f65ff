//! Supervised collector process
//!
//! An [`ExecRunner`] owns one collector. Once started, a supervision task
//! waits on the child; an unexpected exit marks the backend failing and the
//! child is respawned after a backoff delay. Stopping cancels the task,
//! which signals the child and reaps it.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use sc_core::config::BackoffConfig;
use sc_core::error::SupervisorError;
use sc_core::{BackendDefinition, BackendStatus, StatusCell, StatusInfo};

use super::backoff::ExponentialBackoff;

/// Time a collector gets to exit after SIGTERM before it is killed
const STOP_GRACE: Duration = Duration::from_secs(5);

/// Upper bound on waiting for the supervision task to wind down
const STOP_TIMEOUT: Duration = Duration::from_secs(10);

/// How to launch one collector
#[derive(Debug, Clone)]
struct CommandSpec {
    name: String,
    program: PathBuf,
    args: Vec<String>,
}

impl CommandSpec {
    fn spawn(&self) -> Result<Child, SupervisorError> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| SupervisorError::Spawn {
                name: self.name.clone(),
                source,
            })?;

        tracing::debug!(
            "[{}] Started {} {:?} (pid {:?})",
            self.name,
            self.program.display(),
            self.args,
            child.id()
        );

        if let Some(stdout) = child.stdout.take() {
            tokio::spawn(forward_output(self.name.clone(), "stdout", stdout));
        }
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(forward_output(self.name.clone(), "stderr", stderr));
        }
        Ok(child)
    }
}

/// Relay collector output into the agent log
async fn forward_output<R>(name: String, stream: &'static str, reader: R)
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(reader).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                tracing::info!(target: "collector", backend = %name, stream, "{}", line);
            }
            Ok(None) => break,
            Err(e) => {
                tracing::debug!("[{}] Stopped reading {}: {}", name, stream, e);
                break;
            }
        }
    }
}

struct Supervision {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

/// One collector process and its supervision task
pub struct ExecRunner {
    definition: Arc<BackendDefinition>,
    config_path: PathBuf,
    status: Arc<StatusCell>,
    backoff: BackoffConfig,
    supervision: Option<Supervision>,
}

impl ExecRunner {
    pub fn new(
        definition: Arc<BackendDefinition>,
        config_dir: &Path,
        status: Arc<StatusCell>,
        backoff: BackoffConfig,
    ) -> Self {
        let config_path = definition.configuration_path(config_dir);
        Self {
            definition,
            config_path,
            status,
            backoff,
            supervision: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.definition.name
    }

    pub fn definition(&self) -> &BackendDefinition {
        &self.definition
    }

    /// Whether a supervision task is alive
    pub fn is_running(&self) -> bool {
        self.supervision
            .as_ref()
            .map(|s| !s.task.is_finished())
            .unwrap_or(false)
    }

    /// Spawn the collector and start supervising it.
    ///
    /// The first spawn happens inline so a bad executable is reported to
    /// the caller instead of being retried in the background.
    pub fn start(&mut self) -> Result<(), SupervisorError> {
        let spec = CommandSpec {
            name: self.definition.name.clone(),
            program: self.definition.executable_path.clone(),
            args: self.definition.command_args(&self.config_path),
        };
        let child = spec.spawn()?;
        self.status.update(BackendStatus::Running, "Running");

        let cancel = CancellationToken::new();
        let task = tokio::spawn(supervise(
            spec,
            child,
            Arc::clone(&self.status),
            ExponentialBackoff::from_config(&self.backoff),
            cancel.clone(),
        ));
        self.supervision = Some(Supervision { cancel, task });
        Ok(())
    }

    /// Stop the collector, if started
    pub async fn stop(&mut self) {
        let Some(supervision) = self.supervision.take() else {
            return;
        };
        supervision.cancel.cancel();

        let abort = supervision.task.abort_handle();
        if tokio::time::timeout(STOP_TIMEOUT, supervision.task)
            .await
            .is_err()
        {
            tracing::warn!("[{}] Collector did not stop in time, aborting", self.name());
            abort.abort();
        }
        self.status.update(BackendStatus::Stopped, "Stopped");
        tracing::info!("[{}] Stopped collector", self.name());
    }
}

async fn supervise(
    spec: CommandSpec,
    mut child: Child,
    status: Arc<StatusCell>,
    mut backoff: ExponentialBackoff,
    cancel: CancellationToken,
) {
    loop {
        let started = Instant::now();
        let exit = tokio::select! {
            _ = cancel.cancelled() => None,
            exit = child.wait() => Some(exit),
        };
        let Some(exit) = exit else {
            terminate(&mut child, &spec.name).await;
            return;
        };

        let detail = match exit {
            Ok(code) => format!("exited with {}", code),
            Err(e) => format!("could not be waited on: {}", e),
        };
        if started.elapsed() > backoff.max() {
            backoff.reset();
        }
        status.set(
            StatusInfo::new(BackendStatus::Failing, "Collector exited unexpectedly")
                .with_detail(detail.clone()),
        );
        tracing::warn!("[{}] Collector {}", spec.name, detail);

        child = match respawn(&spec, &status, &mut backoff, &cancel).await {
            Some(child) => child,
            None => return,
        };
    }
}

/// Wait out the backoff and spawn again until it works or `cancel` fires
async fn respawn(
    spec: &CommandSpec,
    status: &StatusCell,
    backoff: &mut ExponentialBackoff,
    cancel: &CancellationToken,
) -> Option<Child> {
    loop {
        let delay = backoff.next_delay();
        tracing::info!(
            "[{}] Restarting collector in {:?} (attempt {})",
            spec.name,
            delay,
            backoff.attempts()
        );
        tokio::select! {
            _ = cancel.cancelled() => return None,
            _ = tokio::time::sleep(delay) => {}
        }

        match spec.spawn() {
            Ok(child) => {
                status.update(BackendStatus::Running, "Running");
                return Some(child);
            }
            Err(e) => {
                tracing::error!("[{}] {}", spec.name, e);
                status.set(
                    StatusInfo::new(BackendStatus::Failing, "Failed to restart collector")
                        .with_detail(e.to_string()),
                );
            }
        }
    }
}

/// Ask the child to exit, then kill it
async fn terminate(child: &mut Child, name: &str) {
    #[cfg(unix)]
    {
        if let Some(pid) = child.id() {
            // SAFETY: pid belongs to a child we spawned and have not reaped yet
            unsafe {
                libc::kill(pid as libc::pid_t, libc::SIGTERM);
            }
            if let Ok(Ok(code)) = tokio::time::timeout(STOP_GRACE, child.wait()).await {
                tracing::debug!("[{}] Collector exited with {}", name, code);
                return;
            }
        }
    }

    if let Err(e) = child.kill().await {
        tracing::warn!("[{}] Failed to kill collector: {}", name, e);
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::testing::definition;

    fn fast_backoff() -> BackoffConfig {
        BackoffConfig {
            initial: Duration::from_millis(10),
            max: Duration::from_millis(50),
            multiplier: 2.0,
            jitter: 0.0,
        }
    }

    fn runner(program: &str, args: &[&str], dir: &Path) -> ExecRunner {
        let mut def = definition("c1", "test-collector");
        def.executable_path = PathBuf::from(program);
        def.execute_parameters = args.iter().map(|a| a.to_string()).collect();
        ExecRunner::new(Arc::new(def), dir, Arc::new(StatusCell::new()), fast_backoff())
    }

    #[tokio::test]
    async fn test_start_and_stop() {
        let dir = tempfile::tempdir().unwrap();
        let mut runner = runner("/bin/sleep", &["30"], dir.path());

        runner.start().unwrap();
        assert!(runner.is_running());
        assert_eq!(runner.status.get().status, BackendStatus::Running);

        runner.stop().await;
        assert!(!runner.is_running());
        assert_eq!(runner.status.get().status, BackendStatus::Stopped);
    }

    #[tokio::test]
    async fn test_missing_executable_fails_start() {
        let dir = tempfile::tempdir().unwrap();
        let mut runner = runner("/nonexistent/collector", &[], dir.path());

        let err = runner.start().unwrap_err();
        assert!(matches!(err, SupervisorError::Spawn { .. }));
        assert!(!runner.is_running());
    }

    #[tokio::test]
    async fn test_crashed_collector_is_respawned() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("runs");
        let script = format!("echo run >> {}; exit 1", marker.display());
        let mut runner = runner("/bin/sh", &["-c", &script], dir.path());

        runner.start().unwrap();
        tokio::time::sleep(Duration::from_millis(500)).await;
        runner.stop().await;

        let runs = std::fs::read_to_string(&marker).unwrap();
        assert!(runs.lines().count() >= 2, "collector ran {} times", runs.lines().count());
    }

    #[tokio::test]
    async fn test_config_path_substituted_into_args() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("args");
        let script = format!("echo \"$0\" > {}; sleep 30", marker.display());
        let mut runner = runner("/bin/sh", &["-c", &script, "%s"], dir.path());

        runner.start().unwrap();
        for _ in 0..50 {
            if marker.exists() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
        runner.stop().await;

        let arg = std::fs::read_to_string(&marker).unwrap();
        assert_eq!(arg.trim(), dir.path().join("test-collector.conf").display().to_string());
    }
}
