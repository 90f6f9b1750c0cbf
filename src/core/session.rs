use crate::core::domain::{JudgeVerdict, TestCase};
use crate::core::judge::Judge;
use crate::core::traits::launcher::Launcher;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CaseResult {
    pub case: TestCase,
    pub verdict: JudgeVerdict,
}

/// Verdicts of one pass over a set of test cases, in evaluation order.
#[derive(Clone, Debug, Default)]
pub struct Session {
    results: Vec<CaseResult>,
}

impl Session {
    /// Evaluates `cases` one after another. A failing case never stops the
    /// cases after it.
    #[tracing::instrument(skip_all, fields(cases = cases.len()))]
    pub async fn run(judge: &Judge, launcher: &dyn Launcher, cases: &[TestCase]) -> Self {
        let time_limit_ms = judge.config().time_limit_ms;
        let mut session = Session {
            results: Vec::with_capacity(cases.len()),
        };

        for case in cases {
            let verdict = judge
                .evaluate_with(launcher, &case.input, &case.expected, time_limit_ms)
                .await;
            session.push(case.clone(), verdict);
        }

        session
    }

    /// Records the verdict of a case judged outside [`Session::run`].
    pub fn push(&mut self, case: TestCase, verdict: JudgeVerdict) {
        tracing::info!(case = %case.name, verdict = verdict.label(), "case finished");
        self.results.push(CaseResult { case, verdict });
    }

    pub fn results(&self) -> &[CaseResult] {
        &self.results
    }

    pub fn accepted(&self) -> usize {
        self.results
            .iter()
            .filter(|result| result.verdict.is_accepted())
            .count()
    }

    /// Result of the `index`-th case, counting from 1.
    pub fn detail(&self, index: usize) -> Option<&CaseResult> {
        self.results.get(index.checked_sub(1)?)
    }
}
