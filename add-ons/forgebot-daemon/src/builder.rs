//! Build adapter over the external builder CLI.
//!
//! Spawns the configured command with the sanitized idea as its argument,
//! working directory set to the allocated project dir. The invocation is
//! bounded: a hard wall-clock timeout and a cap on combined stdout/stderr.
//! Both pipes are drained incrementally and the child is killed the moment
//! either bound trips — termination is the only cancellation primitive the
//! tool understands. On success the adapter summarizes what landed in the
//! project directory rather than trusting the tool's own output.

use std::path::Path;
use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use forgebot_core::{BuildAdapter, BuildError, ExecutionEnv};
use futures_util::future::try_join;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt};
use tracing::{debug, warn};

const SUMMARY_README_LINES: usize = 20;
const STDERR_SNIPPET_BYTES: usize = 512;
const READ_CHUNK_BYTES: usize = 8192;

enum DrainStop {
    Capped,
    Io(std::io::Error),
}

/// Reads one pipe to EOF, charging every chunk against the shared running
/// total. Stops as soon as the combined total passes the cap, so at most one
/// extra chunk per pipe is ever buffered.
async fn drain_capped<R>(
    pipe: Option<R>,
    total: &AtomicU64,
    cap: u64,
) -> Result<Vec<u8>, DrainStop>
where
    R: AsyncRead + Unpin,
{
    let Some(mut pipe) = pipe else {
        return Ok(Vec::new());
    };
    let mut data = Vec::new();
    let mut buf = [0u8; READ_CHUNK_BYTES];
    loop {
        let n = pipe.read(&mut buf).await.map_err(DrainStop::Io)?;
        if n == 0 {
            return Ok(data);
        }
        let seen = total.fetch_add(n as u64, Ordering::Relaxed) + n as u64;
        if seen > cap {
            return Err(DrainStop::Capped);
        }
        data.extend_from_slice(&buf[..n]);
    }
}

/// Invokes the external builder command for each admitted idea.
pub struct BuilderCli {
    command: String,
}

impl BuilderCli {
    pub fn new(command: String) -> Self {
        Self { command }
    }
}

#[async_trait::async_trait]
impl BuildAdapter for BuilderCli {
    async fn generate(
        &self,
        idea: &str,
        project_dir: &Path,
        env: &ExecutionEnv,
    ) -> Result<String, BuildError> {
        let mut cmd = tokio::process::Command::new(&self.command);
        cmd.arg(idea)
            .current_dir(project_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            // Backstop: if this future is dropped mid-build the child goes too.
            .kill_on_drop(true);
        for (key, value) in &env.env_vars {
            cmd.env(key, value);
        }

        debug!(command = %self.command, dir = %project_dir.display(), "builder starting");
        let mut child = cmd.spawn().map_err(BuildError::Spawn)?;
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let total = AtomicU64::new(0);

        // Drain both pipes concurrently; try_join resolves on the first cap
        // or io error, at which point the child is still running and must be
        // killed rather than left to finish.
        let bounded = tokio::time::timeout(Duration::from_millis(env.timeout_ms), async {
            let pipes = try_join(
                drain_capped(stdout, &total, env.max_output_bytes),
                drain_capped(stderr, &total, env.max_output_bytes),
            )
            .await?;
            let status = child.wait().await.map_err(DrainStop::Io)?;
            Ok::<_, DrainStop>((status, pipes.1))
        })
        .await;

        let (status, stderr_bytes) = match bounded {
            Ok(Ok(done)) => done,
            Ok(Err(DrainStop::Capped)) => {
                let _ = child.kill().await;
                return Err(BuildError::OutputTooLarge(env.max_output_bytes));
            }
            Ok(Err(DrainStop::Io(error))) => {
                let _ = child.kill().await;
                return Err(BuildError::Io(error));
            }
            Err(_) => {
                let _ = child.kill().await;
                return Err(BuildError::Timeout(env.timeout_ms));
            }
        };

        if !status.success() {
            let stderr = String::from_utf8_lossy(&stderr_bytes);
            let snippet = stderr
                .chars()
                .take(STDERR_SNIPPET_BYTES)
                .collect::<String>()
                .trim()
                .to_string();
            return Err(BuildError::Failed {
                status: status.code().unwrap_or(-1),
                stderr: snippet,
            });
        }

        summarize(project_dir).await
    }
}

/// Human-readable summary of the project directory: file listing plus the
/// head of the README when one exists.
async fn summarize(project_dir: &Path) -> Result<String, BuildError> {
    let mut names = Vec::new();
    match tokio::fs::read_dir(project_dir).await {
        Ok(mut entries) => {
            while let Ok(Some(entry)) = entries.next_entry().await {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        Err(error) => {
            warn!(%error, dir = %project_dir.display(), "could not list project directory");
        }
    }
    names.sort();

    let mut summary = format!("作成されたファイル:\n{}", names.join("\n"));

    let readme = project_dir.join("README.md");
    if let Ok(file) = tokio::fs::File::open(&readme).await {
        let mut lines = tokio::io::BufReader::new(file).lines();
        let mut head = Vec::new();
        while let Ok(Some(line)) = lines.next_line().await {
            head.push(line);
            if head.len() >= SUMMARY_README_LINES {
                break;
            }
        }
        if !head.is_empty() {
            summary.push_str("\n\nREADME:\n");
            summary.push_str(&head.join("\n"));
        }
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quick_env(timeout_ms: u64) -> ExecutionEnv {
        ExecutionEnv {
            timeout_ms,
            ..ExecutionEnv::default()
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn failing_builder_reports_exit_status() {
        let dir = tempfile::tempdir().unwrap();
        let builder = BuilderCli::new("false".into());
        let err = builder
            .generate("todo app", dir.path(), &quick_env(5_000))
            .await
            .unwrap_err();
        assert!(matches!(err, BuildError::Failed { status: 1, .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn builder_is_killed_on_timeout() {
        let dir = tempfile::tempdir().unwrap();
        // `sleep 5`: the idea is the argument, so this sleeps far past the
        // 100 ms budget.
        let builder = BuilderCli::new("sleep".into());
        let err = builder
            .generate("5", dir.path(), &quick_env(100))
            .await
            .unwrap_err();
        assert!(matches!(err, BuildError::Timeout(100)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn successful_builder_yields_a_directory_summary() {
        let dir = tempfile::tempdir().unwrap();
        tokio::fs::write(dir.path().join("README.md"), "# demo\nhello")
            .await
            .unwrap();
        let builder = BuilderCli::new("true".into());
        let summary = builder
            .generate("todo app", dir.path(), &quick_env(5_000))
            .await
            .unwrap();
        assert!(summary.contains("README.md"));
        assert!(summary.contains("# demo"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn oversized_output_kills_the_builder_at_the_cap() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        // Floods stdout, then records that it survived to the end.
        let script = dir.path().join("flood.sh");
        std::fs::write(
            &script,
            "#!/bin/sh\nhead -c 1048576 /dev/zero\ntouch finished\n",
        )
        .unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let env = ExecutionEnv {
            max_output_bytes: 16,
            ..ExecutionEnv::default()
        };
        let builder = BuilderCli::new(script.to_string_lossy().into_owned());
        let err = builder
            .generate("todo app", dir.path(), &env)
            .await
            .unwrap_err();
        assert!(matches!(err, BuildError::OutputTooLarge(16)));
        // The child was stopped at the cap, not allowed to run to completion.
        assert!(!dir.path().join("finished").exists());
    }

    #[tokio::test]
    async fn missing_command_is_a_spawn_error() {
        let dir = tempfile::tempdir().unwrap();
        let builder = BuilderCli::new("definitely-not-a-real-command-xyz".into());
        let err = builder
            .generate("todo app", dir.path(), &quick_env(5_000))
            .await
            .unwrap_err();
        assert!(matches!(err, BuildError::Spawn(_)));
    }
}
