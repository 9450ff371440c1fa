use std::fmt;

use serde::Serialize;
use structopt::StructOpt;

use crate::cmd::{status_label, Outcome, Run};
use crate::config::Config;
use crate::model::{Problem, ProblemSetId};
use crate::service::Act as _;
use crate::{Console, GlobalOpt, Result};

#[derive(StructOpt, Debug, Clone, PartialEq, Eq, Hash)]
#[structopt(rename_all = "kebab")]
pub struct ProblemsOpt {
    #[structopt(name = "set")]
    set_id: ProblemSetId,
}

impl Run for ProblemsOpt {
    fn run(
        &self,
        global_opt: &GlobalOpt,
        conf: &Config,
        cnsl: &mut Console,
    ) -> Result<Box<dyn Outcome>> {
        let actor = conf.build_actor(global_opt.course_id.as_ref(), conf.env_credential())?;
        let problems = actor.problems(&self.set_id, cnsl)?;
        Ok(Box::new(ProblemsOutcome {
            set_id: self.set_id.clone(),
            problems,
        }))
    }
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProblemsOutcome {
    set_id: ProblemSetId,
    problems: Vec<Problem>,
}

impl ProblemsOutcome {
    fn accepted_count(&self) -> usize {
        self.problems
            .iter()
            .filter(|problem| problem.status().map_or(false, |status| status.is_accepted()))
            .count()
    }
}

impl fmt::Display for ProblemsOutcome {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for problem in &self.problems {
            writeln!(
                f,
                "{:>3}. {:32}  {:20}  {}",
                problem.index(),
                problem.id().to_string(),
                status_label(problem),
                problem.title()
            )?;
        }
        write!(
            f,
            "Accepted {} of {} problem(s) in {}",
            self.accepted_count(),
            self.problems.len(),
            self.set_id
        )
    }
}

impl Outcome for ProblemsOutcome {
    fn is_error(&self) -> bool {
        false
    }
}
