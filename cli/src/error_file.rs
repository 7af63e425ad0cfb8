use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use chrono::{DateTime, Local};
use stackline_core::executor::types::UnitFailure;

/// Append one line per failed stack to `path`.
///
/// The error file is a side channel: write errors are logged and otherwise
/// ignored.
pub fn append_failures(path: &Path, failures: &[UnitFailure]) {
    if failures.is_empty() {
        return;
    }
    if let Err(e) = write_failures(path, failures, Local::now()) {
        tracing::warn!(path = %path.display(), error = %e, "failed to write error file");
    }
}

fn write_failures(
    path: &Path,
    failures: &[UnitFailure],
    now: DateTime<Local>,
) -> std::io::Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    let ts = now.to_rfc3339();
    for failure in failures {
        let error = failure.error.to_string();
        let error: Vec<&str> = error.lines().map(str::trim).filter(|l| !l.is_empty()).collect();
        writeln!(file, "{} {}: {}", ts, failure.vertex, error.join("; "))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;
    use stackline_core::error::RunnerError;
    use stackline_core::executor::types::VertexId;

    fn failure(project: &str, error: RunnerError) -> UnitFailure {
        UnitFailure {
            vertex: VertexId::new(project, "prod"),
            stage: 1,
            error,
        }
    }

    #[test]
    fn appends_one_line_per_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("errors.log");
        std::fs::write(&path, "earlier\n").unwrap();
        let now = Local.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();

        write_failures(
            &path,
            &[
                failure("app", RunnerError::operation("pulumi up exited with 1:\nboom\n  bad")),
                failure("db", RunnerError::Cancelled),
            ],
            now,
        )
        .unwrap();

        let ts = now.to_rfc3339();
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            format!(
                "earlier\n{ts} app:prod: pulumi up exited with 1:; boom; bad\n{ts} db:prod: cancelled\n"
            )
        );
    }

    #[test]
    fn nothing_written_without_failures() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("errors.log");
        append_failures(&path, &[]);
        assert!(!path.exists());
    }

    #[test]
    fn unwritable_path_is_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("errors.log");
        append_failures(&path, &[failure("app", RunnerError::Cancelled)]);
        assert!(!path.exists());
    }
}
