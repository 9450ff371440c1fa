use std::fmt;
use std::io::Read as _;
use std::path::PathBuf;

use anyhow::{anyhow, Context as _};
use serde::Serialize;
use structopt::StructOpt;

use crate::abs_path::AbsPathBuf;
use crate::cmd::{find_problem, status_label, Outcome, Run};
use crate::config::Config;
use crate::model::{CodeTemplate, Judgement, Problem, ProblemSetId, SolutionId, Submission};
use crate::service::Act as _;
use crate::{Console, GlobalOpt, Result};

#[derive(StructOpt, Debug, Clone, PartialEq, Eq, Hash)]
#[structopt(rename_all = "kebab")]
pub struct SubmitOpt {
    #[structopt(name = "set")]
    set_id: ProblemSetId,
    /// Problem id, its position in the set or its title
    problem: String,
    /// Source file to submit
    source: PathBuf,
    /// Template of a fill-in-the-blank problem. Its blank is marked by a line containing `@@ blank @@`
    #[structopt(long, short = "t")]
    template: Option<PathBuf>,
    /// Returns right after submitting, without waiting for the verdict
    #[structopt(long)]
    no_wait: bool,
}

impl SubmitOpt {
    fn load_submission(&self, problem: &Problem, cnsl: &mut Console) -> Result<Submission> {
        let cwd = AbsPathBuf::cwd()?;
        let source = cwd
            .join(&self.source)
            .load_pretty(
                |mut file| {
                    let mut buf = String::new();
                    file.read_to_string(&mut buf)?;
                    Ok(buf)
                },
                Some(&cwd),
                cnsl,
            )
            .context("Could not load source file")?;
        let template = match &self.template {
            Some(path) => {
                let text = cwd
                    .join(path)
                    .load_string()
                    .context("Could not load template file")?;
                Some(CodeTemplate::parse(&text)?)
            }
            None => None,
        };
        Ok(Submission::new(
            problem.set_id().clone(),
            problem.id().clone(),
            source,
            template,
        ))
    }
}

impl Run for SubmitOpt {
    fn run(
        &self,
        global_opt: &GlobalOpt,
        conf: &Config,
        cnsl: &mut Console,
    ) -> Result<Box<dyn Outcome>> {
        let actor = conf.build_actor(global_opt.course_id.as_ref(), conf.env_credential())?;
        let problems = actor.problems(&self.set_id, cnsl)?;
        let problem = find_problem(problems, &self.problem)?;
        let submission = self.load_submission(&problem, cnsl)?;

        let message = format!(
            "Submit {} to {}. {} in {}?",
            self.source.display(),
            problem.index(),
            problem.title(),
            problem.set_id()
        );
        if !cnsl.confirm(&message, true)? {
            return Err(anyhow!("Canceled submitting"));
        }

        if self.no_wait {
            let solution_id = actor.submit(&submission, cnsl)?;
            return Ok(Box::new(SubmitOutcome {
                solution_id,
                judgement: None,
                problems: Vec::new(),
            }));
        }

        let judgement = actor.judge(&submission, cnsl)?;
        let problems = match actor.problems(judgement.refresh_set(), cnsl) {
            Ok(problems) => problems,
            Err(err) => {
                cnsl.warn(&format!("Could not refresh problems : {:#}", err))?;
                Vec::new()
            }
        };
        Ok(Box::new(SubmitOutcome {
            solution_id: judgement.solution_id().clone(),
            judgement: Some(judgement),
            problems,
        }))
    }
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubmitOutcome {
    solution_id: SolutionId,
    #[serde(skip_serializing_if = "Option::is_none")]
    judgement: Option<Judgement>,
    /// Problems of the set refreshed after the verdict.
    problems: Vec<Problem>,
}

impl fmt::Display for SubmitOutcome {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let judgement = match &self.judgement {
            Some(judgement) => judgement,
            None => {
                return write!(
                    f,
                    "Submitted as solution {}. Check it later by `pgrid status {}`",
                    self.solution_id, self.solution_id
                )
            }
        };
        let verdict = judgement.verdict();
        write!(
            f,
            "Solution {} : {} ({})",
            self.solution_id,
            verdict.raw_status(),
            judgement.performance()
        )?;
        if !verdict.status().is_accepted() && !verdict.details().trim().is_empty() {
            write!(f, "\n{}", verdict.details().trim_end())?;
        }
        for problem in &self.problems {
            write!(
                f,
                "\n{:>3}. {:20}  {}",
                problem.index(),
                status_label(problem),
                problem.title()
            )?;
        }
        Ok(())
    }
}

impl Outcome for SubmitOutcome {
    fn is_error(&self) -> bool {
        match &self.judgement {
            Some(judgement) => !judgement.verdict().status().is_accepted(),
            None => false,
        }
    }
}
