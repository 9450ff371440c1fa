use reqwest::Url;

use crate::model::{
    Course, Judgement, Problem, ProblemDescription, ProblemSet, ProblemSetId, SolutionId,
    Submission, Verdict,
};
use crate::{Console, Result};

/// Operations a client of the portal offers to commands.
pub trait Act {
    /// Logs in with the configured credential.
    ///
    /// Returns `false` when the portal rejected the credential.
    fn login(&self, cnsl: &mut Console) -> Result<bool>;

    fn course(&self, cnsl: &mut Console) -> Result<Course>;

    fn problem_sets(&self, cnsl: &mut Console) -> Result<Vec<ProblemSet>>;

    /// Problems of a set in listing order, with the last status of the user.
    fn problems(&self, set_id: &ProblemSetId, cnsl: &mut Console) -> Result<Vec<Problem>>;

    /// Statement of a problem with every image inlined.
    fn description(&self, problem: &Problem, cnsl: &mut Console) -> Result<ProblemDescription>;

    fn submit(&self, submission: &Submission, cnsl: &mut Console) -> Result<SolutionId>;

    /// Current verdict of a solution, possibly still processing.
    fn solution(&self, solution_id: &SolutionId, cnsl: &mut Console) -> Result<Verdict>;

    /// Polls until the verdict of a solution is terminal.
    fn wait_verdict(&self, solution_id: &SolutionId, cnsl: &mut Console) -> Result<Verdict>;

    /// Submits and waits for the terminal verdict.
    fn judge(&self, submission: &Submission, cnsl: &mut Console) -> Result<Judgement>;

    /// Page of a problem as shown in a browser.
    fn problem_url(&self, problem: &Problem) -> Result<Url>;
}
