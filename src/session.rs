//! Artifact directories for finished test runs.
//!
//! A session owns one directory holding everything a run produced:
//! - One PNG per step that captured a screenshot
//! - The generated Playwright script (`generated.spec.ts`)
//! - The full result as `result.json`
//!
//! Runs saved under the configured artifact directory are pruned by age with
//! [`cleanup_old_sessions`]; user-specified directories are never pruned.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::intent::JobId;
use crate::runner::TestResult;

/// File name of the saved script
pub const SCRIPT_FILE: &str = "generated.spec.ts";

/// File name of the saved result
pub const RESULT_FILE: &str = "result.json";

/// Artifact directory for one test run
#[derive(Debug)]
pub struct Session {
    /// Session name (the test id unless given a directory)
    pub id: String,
    /// Root directory for this session
    pub dir: PathBuf,
}

impl Session {
    /// Session for `test_id` under the configured artifact directory
    pub fn for_test(test_id: &JobId) -> Self {
        Self::under(crate::config::artifact_dir(), test_id)
    }

    /// Session for `test_id` under `base`
    pub fn under(base: impl AsRef<Path>, test_id: &JobId) -> Self {
        let id = sanitize_name(test_id.as_str());
        Self {
            dir: base.as_ref().join(&id),
            id,
        }
    }

    /// Session in a specific directory
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        let id = dir
            .file_name()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "session".to_string());

        Self { id, dir }
    }

    /// Create the directory and write session metadata
    pub fn init(&self, test_id: &JobId) -> std::io::Result<()> {
        fs::create_dir_all(&self.dir)?;

        let metadata = serde_json::json!({
            "id": self.id,
            "test_id": test_id,
            "created": chrono::Utc::now().to_rfc3339(),
        });
        fs::write(
            self.dir.join(".session.json"),
            serde_json::to_string_pretty(&metadata)?,
        )?;
        Ok(())
    }

    /// Path for the screenshot of step `index`
    pub fn step_path(&self, index: usize, action: &str) -> PathBuf {
        self.dir
            .join(format!("step_{:02}_{}.png", index, sanitize_name(action)))
    }

    /// Write screenshots, script and result; returns the files written
    pub fn save_result(&self, result: &TestResult) -> std::io::Result<Vec<PathBuf>> {
        self.init(&result.test_id)?;
        let mut written = Vec::new();

        for (index, step) in result.steps.iter().enumerate() {
            if let Some(png) = &step.screenshot {
                let path = self.step_path(index, &step.action);
                fs::write(&path, png)?;
                written.push(path);
            }
        }

        let script_path = self.dir.join(SCRIPT_FILE);
        fs::write(&script_path, &result.generated_script)?;
        written.push(script_path);

        let result_path = self.dir.join(RESULT_FILE);
        fs::write(&result_path, serde_json::to_string_pretty(result)?)?;
        written.push(result_path);

        Ok(written)
    }

    /// List all PNG files in the session
    pub fn list_captures(&self) -> std::io::Result<Vec<PathBuf>> {
        let mut captures = Vec::new();
        if self.dir.exists() {
            for entry in fs::read_dir(&self.dir)? {
                let path = entry?.path();
                if path.extension().map(|e| e == "png").unwrap_or(false) {
                    captures.push(path);
                }
            }
        }
        captures.sort();
        Ok(captures)
    }
}

/// Sanitize a name for use in filenames
fn sanitize_name(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            'a'..='z' | 'A'..='Z' | '0'..='9' | '-' | '_' => c,
            _ => '_',
        })
        .collect()
}

/// Remove session directories under `base` older than `max_age`
pub fn cleanup_old_sessions(
    base: impl AsRef<Path>,
    max_age: std::time::Duration,
) -> std::io::Result<usize> {
    let base = base.as_ref();
    if !base.exists() {
        return Ok(0);
    }

    let now = SystemTime::now();
    let mut cleaned = 0;
    for entry in fs::read_dir(base)? {
        let entry = entry?;
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        let age = entry
            .metadata()
            .and_then(|m| m.modified())
            .ok()
            .and_then(|modified| now.duration_since(modified).ok());
        if age.is_some_and(|age| age > max_age) && fs::remove_dir_all(&path).is_ok() {
            cleaned += 1;
        }
    }
    Ok(cleaned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::StepResult;
    use chrono::Utc;
    use std::time::Duration;

    fn result_with_screenshot() -> TestResult {
        TestResult::finished(
            JobId::from("job-1"),
            true,
            vec![
                StepResult::success("navigate to https://example.com", vec![])
                    .with_screenshot(Some(vec![0x89, b'P', b'N', b'G'])),
                StepResult::success("verify page_loaded", vec![]),
            ],
            "test('Generated UI Test', async ({ page }) => {\n});".to_string(),
            Utc::now(),
            Duration::from_millis(1500),
        )
    }

    #[test]
    fn test_sanitize_name() {
        assert_eq!(sanitize_name("navigate to https://a.b"), "navigate_to_https___a_b");
        assert_eq!(sanitize_name("type 'x'"), "type__x_");
    }

    #[test]
    fn test_step_path() {
        let session = Session::in_dir("/tmp/testpilot-unit");
        assert!(session.step_path(3, "screenshot").ends_with("step_03_screenshot.png"));
    }

    #[test]
    fn test_save_result_writes_artifacts() {
        let tmp = tempfile::tempdir().unwrap();
        let session = Session::in_dir(tmp.path().join("run"));
        let written = session.save_result(&result_with_screenshot()).unwrap();

        assert_eq!(written.len(), 3);
        assert_eq!(session.list_captures().unwrap().len(), 1);
        let script = fs::read_to_string(session.dir.join(SCRIPT_FILE)).unwrap();
        assert!(script.starts_with("test('Generated UI Test'"));
        let saved: TestResult =
            serde_json::from_str(&fs::read_to_string(session.dir.join(RESULT_FILE)).unwrap())
                .unwrap();
        assert_eq!(saved.test_id, JobId::from("job-1"));
    }

    #[test]
    fn test_for_test_uses_artifact_dir() {
        let session = Session::under("/tmp/artifacts", &JobId::from("job/2"));
        assert_eq!(session.id, "job_2");
        assert_eq!(session.dir, PathBuf::from("/tmp/artifacts/job_2"));

        let session = Session::for_test(&JobId::from("job-3"));
        assert_eq!(
            session.dir,
            Path::new(&crate::config::artifact_dir()).join("job-3")
        );
    }

    #[test]
    fn test_cleanup_old_sessions_prunes_by_age() {
        let tmp = tempfile::tempdir().unwrap();
        let session = Session::under(tmp.path(), &JobId::from("job-4"));
        session.save_result(&result_with_screenshot()).unwrap();
        fs::write(tmp.path().join("stray.txt"), "not a session").unwrap();

        assert_eq!(cleanup_old_sessions(tmp.path(), Duration::from_secs(3600)).unwrap(), 0);
        assert!(session.dir.exists());

        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(cleanup_old_sessions(tmp.path(), Duration::from_millis(1)).unwrap(), 1);
        assert!(!session.dir.exists());
        assert!(tmp.path().join("stray.txt").exists());
        assert_eq!(cleanup_old_sessions(tmp.path().join("missing"), Duration::ZERO).unwrap(), 0);
    }
}
