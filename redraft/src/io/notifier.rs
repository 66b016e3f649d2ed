//! Outbound progress channels.
//!
//! Two capabilities live here. A [`Notifier`] receives a one-line message
//! whenever a workspace checkpoint is saved. A [`ReportSink`] publishes a
//! rendered progress report under a stable key; publishing the same key
//! again updates the same external record in place instead of creating a
//! duplicate.

use std::fs;
use std::io::Write as _;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use tracing::{debug, instrument};
use wait_timeout::ChildExt;

use crate::core::report::ProgressReport;
use crate::io::process::command_from_argv;

/// Side channel for human-readable checkpoint notifications.
///
/// Invoked at most once per save; failures must propagate to the caller of
/// `save`, never be swallowed.
pub trait Notifier {
    fn notify(&self, message: &str) -> Result<()>;
}

/// Key-addressed, idempotent publisher for rendered report bodies.
pub trait ReportSink {
    fn publish(&self, key: &str, body: &str) -> Result<()>;
}

/// Sink that writes the body to `<dir>/<key>.md`, overwriting in place.
pub struct FileSink {
    pub dir: PathBuf,
}

impl ReportSink for FileSink {
    fn publish(&self, key: &str, body: &str) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("create {}", self.dir.display()))?;
        let path = self.dir.join(format!("{key}.md"));
        fs::write(&path, body).with_context(|| format!("write {}", path.display()))?;
        debug!(path = %path.display(), "published report");
        Ok(())
    }
}

/// Sink that pipes the body to an external command (the key is appended as
/// the final argument). Useful for wrapping `gh` or similar CLIs.
pub struct CommandSink {
    pub command: Vec<String>,
    pub timeout: Duration,
}

impl ReportSink for CommandSink {
    #[instrument(skip_all, fields(key))]
    fn publish(&self, key: &str, body: &str) -> Result<()> {
        let mut cmd = command_from_argv(&self.command)?;
        cmd.arg(key)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        let mut child = cmd.spawn().context("spawn publish command")?;
        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| anyhow!("stdin was not piped"))?;
        stdin.write_all(body.as_bytes()).context("write report body")?;
        drop(stdin);
        let status = match child
            .wait_timeout(self.timeout)
            .context("wait for publish command")?
        {
            Some(status) => status,
            None => {
                child.kill().context("kill publish command")?;
                child.wait().context("wait publish command after kill")?;
                return Err(anyhow!("publish command timed out after {:?}", self.timeout));
            }
        };
        if !status.success() {
            return Err(anyhow!(
                "publish command failed with status {:?}",
                status.code()
            ));
        }
        Ok(())
    }
}

/// Notifier that stages each message as a completed task on a progress
/// report and publishes it through a sink. This is how checkpoint saves end
/// up on the externally visible report.
pub struct ReportNotifier {
    key: String,
    report: Mutex<ProgressReport>,
    sink: Box<dyn ReportSink>,
}

impl ReportNotifier {
    pub fn new(key: impl Into<String>, report: ProgressReport, sink: Box<dyn ReportSink>) -> Self {
        Self {
            key: key.into(),
            report: Mutex::new(report),
            sink,
        }
    }
}

impl Notifier for ReportNotifier {
    fn notify(&self, message: &str) -> Result<()> {
        let body = {
            let mut report = self
                .report
                .lock()
                .map_err(|_| anyhow!("report lock poisoned"))?;
            report.start_task(message, message, "✅");
            report.render()
        };
        self.sink.publish(&self.key, &body)
    }
}
