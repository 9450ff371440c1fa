use std::fmt;

use serde::Serialize;
use structopt::StructOpt;

use crate::cmd::{Outcome, Run};
use crate::config::Config;
use crate::model::{Performance, SolutionId, Verdict};
use crate::service::Act as _;
use crate::{Console, GlobalOpt, Result};

#[derive(StructOpt, Debug, Clone, PartialEq, Eq, Hash)]
#[structopt(rename_all = "kebab")]
pub struct StatusOpt {
    #[structopt(name = "solution")]
    solution_id: SolutionId,
    /// Waits until the judge finishes
    #[structopt(long, short = "w")]
    wait: bool,
}

impl Run for StatusOpt {
    fn run(
        &self,
        global_opt: &GlobalOpt,
        conf: &Config,
        cnsl: &mut Console,
    ) -> Result<Box<dyn Outcome>> {
        let actor = conf.build_actor(global_opt.course_id.as_ref(), conf.env_credential())?;
        let verdict = if self.wait {
            actor.wait_verdict(&self.solution_id, cnsl)?
        } else {
            actor.solution(&self.solution_id, cnsl)?
        };
        Ok(Box::new(StatusOutcome {
            solution_id: self.solution_id.clone(),
            performance: verdict.performance(),
            verdict,
        }))
    }
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq, Hash)]
pub struct StatusOutcome {
    solution_id: SolutionId,
    verdict: Verdict,
    performance: Performance,
}

impl fmt::Display for StatusOutcome {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "Solution {} : {} ({})",
            self.solution_id,
            self.verdict.raw_status(),
            self.performance
        )?;
        if !self.verdict.details().trim().is_empty() {
            write!(f, "\n{}", self.verdict.details().trim_end())?;
        }
        Ok(())
    }
}

impl Outcome for StatusOutcome {
    fn is_error(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let verdict = Verdict::new(
            "Accepted",
            "Case 1: Time = 100ms, Memory = 200kB.\nCase 2: Time = 201ms, Memory = 300kB.\n",
        );
        let outcome = StatusOutcome {
            solution_id: "42".into(),
            performance: verdict.performance(),
            verdict,
        };
        assert_eq!(
            outcome.to_string(),
            "Solution 42 : Accepted (151ms/250kB)\n\
             Case 1: Time = 100ms, Memory = 200kB.\n\
             Case 2: Time = 201ms, Memory = 300kB."
        );
    }
}
