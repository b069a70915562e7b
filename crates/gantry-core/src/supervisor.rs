//! Process supervisor: eager concurrent execution of a job batch.
//!
//! Every descriptor in a batch is launched immediately as its own child
//! process; the supervisor then blocks until all of them have terminated
//! and their output has drained. Results come back in submission order.

use crate::error::{OrchestratorError, Result};
use crate::invocation::RunnerConfig;
use crate::job::{BatchReport, JobDescriptor, JobResult};
use colored::Colorize;
use futures::future::join_all;
use std::io::{Read, Write};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info};

/// Supervises one batch of concurrently running job processes.
pub struct ProcessSupervisor {
    config: RunnerConfig,
}

impl ProcessSupervisor {
    pub fn new(config: RunnerConfig) -> Self {
        Self { config }
    }

    /// Launch every job, wait for all of them, and aggregate the results.
    ///
    /// A multi-job batch has each child's stderr redirected into its
    /// stdout and captured as one combined stream, so lines come back in
    /// the order the child wrote them. A single-job batch inherits the
    /// parent's streams, so an interactive job behaves like a direct
    /// terminal invocation.
    ///
    /// A job exiting nonzero is a recorded result; failure to launch a
    /// child at all is fatal and aborts the batch.
    pub async fn run(&self, jobs: Vec<JobDescriptor>) -> Result<BatchReport> {
        if jobs.is_empty() {
            return Ok(BatchReport::from_results(Vec::new()));
        }

        let capture = jobs.len() > 1;
        info!(jobs = jobs.len(), capture, "Launching batch");

        let mut children = Vec::with_capacity(jobs.len());
        for (i, job) in jobs.iter().enumerate() {
            // Podman races on resolving a shared local tag when many
            // containers start at once; space its launches out.
            if i > 0 {
                if let Some(delay) = self.config.runtime.launch_stagger() {
                    tokio::time::sleep(delay).await;
                }
            }

            let mut command = Command::new(&job.argv[0]);
            command.args(&job.argv[1..]);

            // Both streams write to one pipe, so stdout and stderr lines
            // interleave in write order like they would on a terminal.
            let reader = if capture {
                let (reader, stdout_writer) = std::io::pipe()?;
                let stderr_writer = stdout_writer.try_clone()?;
                command
                    .stdin(Stdio::null())
                    .stdout(stdout_writer)
                    .stderr(stderr_writer);
                Some(reader)
            } else {
                None
            };

            debug!(label = %job.label.trim_end(), argv = ?job.argv, "Spawning job");
            let child = command.spawn().map_err(|source| OrchestratorError::Launch {
                command: job.argv[0].clone(),
                source,
            })?;
            children.push((job.label.clone(), child, reader));
            // `command` drops here, closing the parent's copies of the
            // pipe writers; the reader hits EOF once the child exits.
        }

        let waits = children.into_iter().map(|(label, mut child, reader)| async move {
            let drain = reader.map(|mut reader| {
                tokio::task::spawn_blocking(move || -> std::io::Result<Vec<u8>> {
                    let mut buf = Vec::new();
                    reader.read_to_end(&mut buf)?;
                    Ok(buf)
                })
            });

            let status = child.wait().await?;
            let combined_output = match drain {
                Some(task) => task.await.map_err(std::io::Error::other)??,
                None => Vec::new(),
            };

            Ok::<JobResult, std::io::Error>(JobResult {
                label,
                exit_code: status.code().unwrap_or(-1),
                combined_output,
            })
        });

        let mut results = Vec::with_capacity(jobs.len());
        for result in join_all(waits).await {
            results.push(result?);
        }

        let report = BatchReport::from_results(results);
        info!(
            passed = report.passed_count(),
            failed = report.failed_count(),
            exit_code = report.exit_code,
            "Batch complete"
        );
        Ok(report)
    }

    /// Print the report to stdout. See [`ProcessSupervisor::write_report`].
    pub fn print_report(&self, report: &BatchReport) {
        let stdout = std::io::stdout();
        self.write_report(report, &mut stdout.lock()).ok();
    }

    /// Write captured output and the final status table.
    ///
    /// Successful jobs' output comes first; failed jobs' output is grouped
    /// after it so failures are not interleaved with unrelated noise. The
    /// status table is always written, colorized only under a TTY.
    pub fn write_report(
        &self,
        report: &BatchReport,
        out: &mut impl Write,
    ) -> std::io::Result<()> {
        for result in report.results.iter().filter(|r| r.passed()) {
            self.write_output(result, out)?;
        }
        for result in report.results.iter().filter(|r| !r.passed()) {
            self.write_output(result, out)?;
        }

        for result in &report.results {
            writeln!(out, "{}  {}", result.label, self.status_marker(result))?;
        }
        Ok(())
    }

    fn write_output(&self, result: &JobResult, out: &mut impl Write) -> std::io::Result<()> {
        if result.combined_output.is_empty() {
            return Ok(());
        }
        let text = String::from_utf8_lossy(&result.combined_output);
        for line in text.lines() {
            writeln!(out, "{} | {}", result.label, line)?;
        }
        Ok(())
    }

    fn status_marker(&self, result: &JobResult) -> String {
        if result.passed() {
            if self.config.tty {
                "SUCCESS".green().to_string()
            } else {
                "SUCCESS".to_string()
            }
        } else {
            let marker = format!("FAILED (exit {})", result.exit_code);
            if self.config.tty {
                marker.red().to_string()
            } else {
                marker
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invocation::ContainerRuntime;

    fn supervisor(tty: bool) -> ProcessSupervisor {
        let mut config = RunnerConfig::new(ContainerRuntime::Docker, "gantry");
        config.tty = tty;
        ProcessSupervisor::new(config)
    }

    fn result(label: &str, exit_code: i32, output: &str) -> JobResult {
        JobResult {
            label: label.to_string(),
            exit_code,
            combined_output: output.as_bytes().to_vec(),
        }
    }

    #[test]
    fn test_status_marker_plain_without_tty() {
        let sup = supervisor(false);
        assert_eq!(sup.status_marker(&result("a-unit", 0, "")), "SUCCESS");
        assert_eq!(
            sup.status_marker(&result("b-unit", 2, "")),
            "FAILED (exit 2)"
        );
    }

    #[test]
    fn test_status_marker_colorized_with_tty() {
        colored::control::set_override(true);
        let sup = supervisor(true);
        let marker = sup.status_marker(&result("a-unit", 0, ""));
        assert!(marker.contains("SUCCESS"));
        assert_ne!(marker, "SUCCESS", "expected ANSI escapes");
        colored::control::unset_override();
    }

    #[test]
    fn test_report_groups_failed_output_after_successes() {
        let report = BatchReport::from_results(vec![
            result("a-unit", 1, "boom\n"),
            result("b-unit", 0, "fine\n"),
            result("c-unit", 0, "also fine\n"),
        ]);

        let mut buf = Vec::new();
        supervisor(false)
            .write_report(&report, &mut buf)
            .expect("write failed");
        let text = String::from_utf8(buf).unwrap();

        let failed_output = text.find("a-unit | boom").unwrap();
        assert!(text.find("b-unit | fine").unwrap() < failed_output);
        assert!(text.find("c-unit | also fine").unwrap() < failed_output);
        // Status table comes last, in submission order.
        assert!(failed_output < text.find("a-unit  FAILED (exit 1)").unwrap());
        assert!(text.ends_with("a-unit  FAILED (exit 1)\nb-unit  SUCCESS\nc-unit  SUCCESS\n"));
    }

    #[test]
    fn test_report_without_output_still_prints_status() {
        let report = BatchReport::from_results(vec![result("a-build", 0, "")]);
        let mut buf = Vec::new();
        supervisor(false)
            .write_report(&report, &mut buf)
            .expect("write failed");
        assert_eq!(String::from_utf8(buf).unwrap(), "a-build  SUCCESS\n");
    }

    #[tokio::test]
    async fn test_empty_batch_reports_success() {
        let report = supervisor(false).run(Vec::new()).await.unwrap();
        assert!(report.success());
        assert!(report.results.is_empty());
    }

    #[tokio::test]
    async fn test_launch_failure_is_fatal() {
        let jobs = vec![
            JobDescriptor::new("a", vec!["true".to_string()]),
            JobDescriptor::new(
                "b",
                vec!["gantry-no-such-executable-xyz".to_string()],
            ),
        ];
        let err = supervisor(false).run(jobs).await.unwrap_err();
        assert!(matches!(err, OrchestratorError::Launch { .. }));
    }
}
