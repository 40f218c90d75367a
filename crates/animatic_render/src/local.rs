//! Local process sandbox: one temporary directory per session.

use crate::SandboxConfig;
use animatic_error::{SandboxError, SandboxErrorKind};
use animatic_interface::{CommandOutput, Sandbox, SandboxCommand, SandboxProvider, SandboxResult};
use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;

/// Maximum stdout or stderr size captured per stream (10 MiB).
const MAX_OUTPUT_BYTES: usize = 10 * 1024 * 1024;

/// Creates [`LocalSandbox`] sessions under the configured work root.
#[derive(Debug, Clone)]
pub struct LocalSandboxProvider {
    config: SandboxConfig,
}

impl LocalSandboxProvider {
    /// Provider using `config`.
    pub fn new(config: SandboxConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl SandboxProvider for LocalSandboxProvider {
    #[tracing::instrument(skip(self), fields(work_root = %self.config.work_root().display()))]
    async fn create_sandbox(&self) -> SandboxResult<Box<dyn Sandbox>> {
        let id = uuid::Uuid::new_v4().to_string();
        let root = self.config.work_root().join(&id);
        tokio::fs::create_dir_all(&root).await.map_err(|e| {
            SandboxError::new(SandboxErrorKind::Create(format!(
                "{}: {}",
                root.display(),
                e
            )))
        })?;
        tracing::debug!(session_id = %id, "Created local sandbox");
        Ok(Box::new(LocalSandbox {
            id,
            root,
            default_timeout: self.config.command_timeout(),
            destroyed: AtomicBool::new(false),
        }))
    }
}

/// Runs commands as local child processes inside a private directory.
///
/// Not an isolation boundary: it keeps sessions apart on disk and bounds
/// runtime and captured output, nothing more.
#[derive(Debug)]
pub struct LocalSandbox {
    id: String,
    root: PathBuf,
    default_timeout: Duration,
    destroyed: AtomicBool,
}

impl LocalSandbox {
    /// Directory backing this session.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> SandboxResult<PathBuf> {
        let relative = Path::new(path);
        let escapes = relative.components().any(|c| {
            matches!(
                c,
                Component::ParentDir | Component::RootDir | Component::Prefix(_)
            )
        });
        if escapes {
            return Err(SandboxError::new(SandboxErrorKind::InvalidPath(
                path.to_string(),
            )));
        }
        Ok(self.root.join(relative))
    }

    fn io_error(path: &str, e: std::io::Error) -> SandboxError {
        SandboxError::new(SandboxErrorKind::FileIo {
            path: path.to_string(),
            message: e.to_string(),
        })
    }
}

#[async_trait]
impl Sandbox for LocalSandbox {
    fn id(&self) -> &str {
        &self.id
    }

    #[tracing::instrument(skip(self, command), fields(session_id = %self.id, program = %command.program))]
    async fn run(&self, command: &SandboxCommand) -> SandboxResult<CommandOutput> {
        let display = command.display();
        let cwd = match &command.cwd {
            Some(dir) => self.resolve(dir)?,
            None => self.root.clone(),
        };

        let mut cmd = Command::new(&command.program);
        cmd.args(&command.args)
            .current_dir(&cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        for (key, value) in &command.env {
            cmd.env(key, value);
        }

        let start = Instant::now();
        let mut child = cmd.spawn().map_err(|e| {
            SandboxError::new(SandboxErrorKind::Command {
                command: display.clone(),
                message: e.to_string(),
            })
        })?;

        // Read both pipes concurrently so a full pipe cannot stall `wait`.
        let stdout_task = tokio::spawn(read_stream(child.stdout.take()));
        let stderr_task = tokio::spawn(read_stream(child.stderr.take()));

        let limit = command.timeout.unwrap_or(self.default_timeout);
        match tokio::time::timeout(limit, child.wait()).await {
            Ok(Ok(status)) => {
                let stdout = stdout_task.await.unwrap_or_default();
                let stderr = stderr_task.await.unwrap_or_default();
                Ok(CommandOutput {
                    stdout: String::from_utf8_lossy(&stdout).into_owned(),
                    stderr: String::from_utf8_lossy(&stderr).into_owned(),
                    exit_code: status.code(),
                    duration_ms: start.elapsed().as_millis() as u64,
                })
            }
            Ok(Err(e)) => Err(SandboxError::new(SandboxErrorKind::Command {
                command: display,
                message: e.to_string(),
            })),
            // Dropping `child` kills the process.
            Err(_) => Err(SandboxError::new(SandboxErrorKind::Timeout {
                command: display,
                elapsed_ms: start.elapsed().as_millis() as u64,
            })),
        }
    }

    async fn write_file(&self, path: &str, contents: &[u8]) -> SandboxResult<()> {
        let target = self.resolve(path)?;
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| Self::io_error(path, e))?;
        }
        tokio::fs::write(&target, contents)
            .await
            .map_err(|e| Self::io_error(path, e))
    }

    async fn read_file(&self, path: &str) -> SandboxResult<Vec<u8>> {
        let target = self.resolve(path)?;
        tokio::fs::read(&target)
            .await
            .map_err(|e| Self::io_error(path, e))
    }

    async fn file_exists(&self, path: &str) -> SandboxResult<bool> {
        let target = self.resolve(path)?;
        tokio::fs::try_exists(&target)
            .await
            .map_err(|e| Self::io_error(path, e))
    }

    async fn list_files(&self, dir: &str) -> SandboxResult<Vec<String>> {
        let start = self.resolve(dir)?;
        let mut files = Vec::new();
        let mut pending = vec![start];

        while let Some(current) = pending.pop() {
            let mut entries = match tokio::fs::read_dir(&current).await {
                Ok(entries) => entries,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => return Err(Self::io_error(dir, e)),
            };
            while let Some(entry) = entries
                .next_entry()
                .await
                .map_err(|e| Self::io_error(dir, e))?
            {
                let path = entry.path();
                let file_type = entry
                    .file_type()
                    .await
                    .map_err(|e| Self::io_error(dir, e))?;
                if file_type.is_dir() {
                    pending.push(path);
                } else if let Ok(relative) = path.strip_prefix(&self.root) {
                    let parts: Vec<String> = relative
                        .components()
                        .map(|c| c.as_os_str().to_string_lossy().into_owned())
                        .collect();
                    files.push(parts.join("/"));
                }
            }
        }

        files.sort();
        Ok(files)
    }

    #[tracing::instrument(skip(self), fields(session_id = %self.id))]
    async fn destroy(&self) -> SandboxResult<()> {
        if self.destroyed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        match tokio::fs::remove_dir_all(&self.root).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(SandboxError::new(SandboxErrorKind::Destroy(format!(
                "{}: {}",
                self.root.display(),
                e
            )))),
        }
    }
}

/// Read an entire output stream, keeping the first [`MAX_OUTPUT_BYTES`].
///
/// The rest is drained and discarded so the child never sees a closed pipe.
async fn read_stream<R: AsyncRead + Unpin>(handle: Option<R>) -> Vec<u8> {
    let mut buf = Vec::new();
    if let Some(h) = handle {
        let mut capped = h.take(MAX_OUTPUT_BYTES as u64);
        let _ = capped.read_to_end(&mut buf).await;
        let mut rest = capped.into_inner();
        if let Ok(discarded) = tokio::io::copy(&mut rest, &mut tokio::io::sink()).await
            && discarded > 0
        {
            tracing::debug!(discarded, "Output beyond capture limit discarded");
        }
    }
    buf
}
