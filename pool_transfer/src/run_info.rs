//! Metadata about the current run, written at the top of the report.
use anyhow::{Context, Result};
use chrono::Local;
use serde::Serialize;
use std::path::PathBuf;

const UNKNOWN: &str = "<unknown>";

pub fn hostname() -> String {
    if let Ok(n) = ::hostname::get() {
        return n.to_string_lossy().into_owned();
    }
    format!("{UNKNOWN} hostname")
}

fn username() -> String {
    ["USER", "LOGNAME", "USERNAME"]
        .iter()
        .find_map(|var| std::env::var(var).ok().filter(|v| !v.is_empty()))
        .unwrap_or_else(|| format!("{UNKNOWN} user"))
}

/// Captured once when the run starts and only read afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunContext {
    pub command_line: String,
    pub working_dir: PathBuf,
    pub date: String,
    pub user: String,
    pub host: String,
    /// The resolved options, as JSON.
    pub options: String,
}

impl RunContext {
    /// Record the command line, environment and `options` of this process.
    pub fn capture(options: &impl Serialize) -> Result<Self> {
        let command_line = std::env::args()
            .map(|arg| shell_escape::escape(arg.into()).into_owned())
            .collect::<Vec<_>>()
            .join(" ");
        Ok(RunContext {
            command_line,
            working_dir: std::env::current_dir().context("reading the working directory")?,
            date: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            user: username(),
            host: hostname(),
            options: serde_json::to_string(options)?,
        })
    }

    /// Header lines for the report, without the leading `# `.
    pub fn header_lines(&self) -> Vec<String> {
        vec![
            format!(
                "Command line this file was generated with: {}",
                self.command_line
            ),
            format!("Path: {}", self.working_dir.display()),
            format!("Date: {}, user {}, host {}", self.date, self.user, self.host),
            format!("Full options: {}", self.options),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capture() {
        #[derive(Serialize)]
        struct Opts {
            mirror: bool,
        }
        let ctx = RunContext::capture(&Opts { mirror: true }).unwrap();
        assert_eq!(ctx.options, r#"{"mirror":true}"#);
        assert!(!ctx.command_line.is_empty());
        assert_eq!(ctx.date.len(), "2011-07-01 12:00:00".len());
        assert!(!ctx.host.is_empty());
    }

    #[test]
    fn test_header_lines() {
        let ctx = RunContext {
            command_line: "robotic_plate_transfer -n 7 -N 3 out".to_string(),
            working_dir: PathBuf::from("/data/pools"),
            date: "2011-07-01 12:00:00".to_string(),
            user: "lab".to_string(),
            host: "bench1".to_string(),
            options: "{}".to_string(),
        };
        assert_eq!(
            ctx.header_lines(),
            vec![
                "Command line this file was generated with: robotic_plate_transfer -n 7 -N 3 out",
                "Path: /data/pools",
                "Date: 2011-07-01 12:00:00, user lab, host bench1",
                "Full options: {}",
            ]
        );
    }
}
