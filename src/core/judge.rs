use std::path::Path;

use crate::config::JudgeConfig;
use crate::core::compare::{compare, normalize};
use crate::core::domain::{JudgeVerdict, RunOutcome};
use crate::core::errors::{JudgeError, LaunchFailure};
use crate::core::traits::launcher::Launcher;
use crate::native::harness::Harness;

/// Turns one test case into one verdict.
#[derive(Clone, Debug, Default)]
pub struct Judge {
    config: JudgeConfig,
}

impl Judge {
    pub fn new(config: JudgeConfig) -> Self {
        Judge { config }
    }

    pub fn config(&self) -> &JudgeConfig {
        &self.config
    }

    /// Runs `executable_path` on a fresh harness against one input/expected pair.
    pub async fn evaluate(
        &self,
        input_path: &Path,
        expected_path: &Path,
        executable_path: &Path,
        time_limit_ms: u64,
    ) -> JudgeVerdict {
        let harness = Harness::new(executable_path, self.config.harness.clone());
        self.evaluate_with(&harness, input_path, expected_path, time_limit_ms)
            .await
    }

    #[tracing::instrument(skip(self, launcher))]
    pub async fn evaluate_with(
        &self,
        launcher: &dyn Launcher,
        input_path: &Path,
        expected_path: &Path,
        time_limit_ms: u64,
    ) -> JudgeVerdict {
        let input = match read_bytes(input_path).await {
            Ok(input) => input,
            Err(e) => return JudgeVerdict::StartFailed(e.to_string()),
        };
        let expected = match read_text(expected_path).await {
            Ok(expected) => expected,
            Err(e) => return JudgeVerdict::StartFailed(e.to_string()),
        };

        let outcome = launcher.launch(&input, time_limit_ms).await;
        let verdict = self.classify(outcome, &expected);
        tracing::debug!(verdict = verdict.label(), "case judged");
        verdict
    }

    fn classify(&self, outcome: RunOutcome, expected: &str) -> JudgeVerdict {
        match outcome {
            RunOutcome::LaunchFailed { reason } => JudgeVerdict::StartFailed(reason.to_string()),
            RunOutcome::TimedOut { reason } => JudgeVerdict::TimeLimitExceeded(reason),
            RunOutcome::Completed { exit_code, .. } if exit_code != 0 => {
                JudgeVerdict::StartFailed(LaunchFailure::NonZeroExit(exit_code).to_string())
            }
            RunOutcome::Completed {
                captured_output,
                cpu_time_ms,
                wall_time_ms,
                ..
            } => {
                let actual = normalize(&captured_output);
                match compare(expected, &actual, self.config.strict) {
                    Ok(()) => JudgeVerdict::Accepted(cpu_time_ms.min(wall_time_ms)),
                    Err(diff) => JudgeVerdict::WrongAnswer(diff),
                }
            }
        }
    }
}

async fn read_bytes(path: &Path) -> Result<Vec<u8>, JudgeError> {
    tokio::fs::read(path).await.map_err(|source| JudgeError::Read {
        path: path.to_path_buf(),
        source,
    })
}

async fn read_text(path: &Path) -> Result<String, JudgeError> {
    let bytes = read_bytes(path).await?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use tokio::fs;
    use uuid::Uuid;

    use super::*;
    use crate::core::domain::TimeoutReason;
    use crate::core::traits::launcher::MockLauncher;

    async fn case_files(input: impl AsRef<[u8]>, expected: &str) -> (PathBuf, PathBuf) {
        let dir = std::env::temp_dir().join(format!("localjudge_{}", Uuid::new_v4()));
        fs::create_dir_all(&dir).await.unwrap();
        let input_path = dir.join("1.in");
        let expected_path = dir.join("1.out");
        fs::write(&input_path, input).await.unwrap();
        fs::write(&expected_path, expected).await.unwrap();
        (input_path, expected_path)
    }

    fn completed(output: &str, cpu_time_ms: u64, wall_time_ms: u64, exit_code: i32) -> RunOutcome {
        RunOutcome::Completed {
            captured_output: output.to_string(),
            cpu_time_ms,
            wall_time_ms,
            exit_code,
        }
    }

    #[tokio::test]
    async fn test_accepted_reports_smaller_cost() {
        let (input, expected) = case_files("3 4\n", "7\n").await;
        let mut launcher = MockLauncher::new();
        launcher
            .expect_launch()
            .withf(|stdin, limit| stdin.to_vec() == b"3 4\n" && *limit == 500)
            .times(1)
            .returning(|_, _| completed("7\r\n", 12, 30, 0));

        let verdict = Judge::default()
            .evaluate_with(&launcher, &input, &expected, 500)
            .await;
        assert_eq!(verdict, JudgeVerdict::Accepted(12));
    }

    #[tokio::test]
    async fn test_wrong_answer_carries_diff() {
        let (input, expected) = case_files("3 4\n", "7\n").await;
        let mut launcher = MockLauncher::new();
        launcher
            .expect_launch()
            .returning(|_, _| completed("3 4\n", 1, 1, 0));

        let verdict = Judge::default()
            .evaluate_with(&launcher, &input, &expected, 1000)
            .await;
        let JudgeVerdict::WrongAnswer(diff) = verdict else {
            panic!("expected WA, got {verdict:?}");
        };
        assert_eq!(diff.line, Some(1));
        assert_eq!(diff.expected.visible_text(), "7");
    }

    #[tokio::test]
    async fn test_strict_mode_rejects_trailing_spaces() {
        let (input, expected) = case_files("", "7\n").await;
        let mut launcher = MockLauncher::new();
        launcher
            .expect_launch()
            .times(2)
            .returning(|_, _| completed("7 \n", 1, 1, 0));

        let lenient = Judge::default()
            .evaluate_with(&launcher, &input, &expected, 1000)
            .await;
        assert!(lenient.is_accepted());

        let strict = Judge::new(JudgeConfig {
            strict: true,
            ..JudgeConfig::default()
        })
        .evaluate_with(&launcher, &input, &expected, 1000)
        .await;
        assert_eq!(strict.label(), "WA");
    }

    #[tokio::test]
    async fn test_outcomes_map_to_verdicts() {
        let (input, expected) = case_files("1\n", "1\n").await;
        let mut launcher = MockLauncher::new();
        let mut outcomes = vec![
            RunOutcome::TimedOut {
                reason: TimeoutReason::JudgeOverloaded,
            },
            RunOutcome::LaunchFailed {
                reason: LaunchFailure::NonZeroExit(2),
            },
            completed("1\n", 1, 1, 3),
        ]
        .into_iter();
        launcher
            .expect_launch()
            .times(3)
            .returning(move |_, _| outcomes.next().unwrap());

        let judge = Judge::default();
        assert_eq!(
            judge.evaluate_with(&launcher, &input, &expected, 1000).await,
            JudgeVerdict::TimeLimitExceeded(TimeoutReason::JudgeOverloaded)
        );
        assert_eq!(
            judge.evaluate_with(&launcher, &input, &expected, 1000).await,
            JudgeVerdict::StartFailed("non-zero exit 2".to_string())
        );
        assert_eq!(
            judge.evaluate_with(&launcher, &input, &expected, 1000).await,
            JudgeVerdict::StartFailed("non-zero exit 3".to_string())
        );
    }

    #[tokio::test]
    async fn test_input_bytes_reach_launcher_unchanged() {
        let (input, expected) = case_files([0xff, b'\n'], "ff\n").await;
        let mut launcher = MockLauncher::new();
        launcher
            .expect_launch()
            .withf(|stdin, _| stdin.to_vec() == [0xff, b'\n'])
            .times(1)
            .returning(|_, _| completed("ff\n", 1, 1, 0));

        let verdict = Judge::default()
            .evaluate_with(&launcher, &input, &expected, 1000)
            .await;
        assert!(verdict.is_accepted(), "{verdict}");
    }

    #[tokio::test]
    async fn test_unreadable_file_is_start_failed() {
        let (input, _) = case_files("1\n", "1\n").await;
        let mut launcher = MockLauncher::new();
        launcher.expect_launch().never();

        let missing = input.with_extension("missing");
        let verdict = Judge::default()
            .evaluate_with(&launcher, &input, &missing, 1000)
            .await;
        let JudgeVerdict::StartFailed(reason) = verdict else {
            panic!("expected START FAILED, got {verdict:?}");
        };
        assert!(reason.starts_with("cannot read"), "{reason}");
    }
}
