//! Two-phase progress report builder.
//!
//! Mutations (`write_title`, `write_summary`, `append_summary`,
//! `start_task`, `update_task`) only stage changes on the in-memory value;
//! nothing leaves the process until the rendered body is handed to a
//! [`ReportSink`](crate::io::notifier::ReportSink). Staging cannot fail
//! (except updating an unknown task key); only publishing can.

use anyhow::{Result, anyhow};
use chrono::{DateTime, Local};

/// One row of the report's task table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskEntry {
    /// Stable key for later status updates. Not rendered.
    pub key: String,
    /// First table column.
    pub description: String,
    /// Second table column (typically a status glyph plus text).
    pub status: String,
}

/// Staged progress report: optional title, optional summary, task table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgressReport {
    title: String,
    summary: String,
    tasks: Vec<TaskEntry>,
}

impl ProgressReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite the title.
    pub fn write_title(&mut self, title: &str) {
        self.title = title.to_string();
    }

    /// Overwrite the summary.
    pub fn write_summary(&mut self, summary: &str) {
        self.summary = summary.to_string();
    }

    /// Append to the summary without overwriting it, avoiding doubled
    /// newlines at the seam.
    pub fn append_summary(&mut self, summary: &str) {
        if self.summary.is_empty() {
            self.summary = summary.to_string();
            return;
        }
        let sep = if self.summary.ends_with('\n') { "" } else { "\n" };
        self.summary = format!("{}{}{}", self.summary.trim(), sep, summary);
    }

    /// Stage a new task row.
    pub fn start_task(&mut self, key: &str, description: &str, status: &str) {
        self.tasks.push(TaskEntry {
            key: key.to_string(),
            description: description.to_string(),
            status: status.to_string(),
        });
    }

    /// Update the status of a previously started task.
    pub fn update_task(&mut self, key: &str, status: &str) -> Result<()> {
        for task in &mut self.tasks {
            if task.key == key {
                task.status = status.to_string();
                return Ok(());
            }
        }
        Err(anyhow!("no task at key {key}"))
    }

    pub fn tasks(&self) -> &[TaskEntry] {
        &self.tasks
    }

    pub fn summary(&self) -> &str {
        &self.summary
    }

    /// Render the report body as markdown, stamped with the current time.
    pub fn render(&self) -> String {
        self.render_at(Local::now())
    }

    /// Render with an explicit timestamp. Layout: optional H2 title,
    /// optional summary block, optional two-column task table, trailing
    /// last-update line.
    pub fn render_at(&self, at: DateTime<Local>) -> String {
        let mut contents = String::new();
        if !self.title.is_empty() {
            contents.push_str(&format!("## {}\n\n", self.title));
        }
        if !self.summary.is_empty() {
            contents.push_str(&format!("{}\n\n", self.summary));
        }
        if !self.tasks.is_empty() {
            contents.push_str("### Tasks\n\n");
            contents.push_str("<table>\n<tr><th>Description</th><th>Status</th></tr>\n");
            for task in &self.tasks {
                contents.push_str(&format!(
                    "<tr><td>{}</td><td>{}</td></tr>\n",
                    task.description, task.status
                ));
            }
            contents.push_str("</table>\n");
        }
        contents.push_str(&format!(
            "\n<sub>*Last update: {}*<sub>\n",
            at.format("%Y-%m-%d %H:%M:%S %Z")
        ));
        contents
    }
}
