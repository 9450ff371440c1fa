use std::fmt;
use std::io::Write as _;

use serde::Serialize;
use structopt::StructOpt;

use crate::cmd::{find_problem, Outcome, Run};
use crate::config::Config;
use crate::model::ProblemSetId;
use crate::service::Act as _;
use crate::{Console, GlobalOpt, Result};

#[derive(StructOpt, Debug, Clone, PartialEq, Eq, Hash)]
#[structopt(rename_all = "kebab")]
pub struct OpenOpt {
    #[structopt(name = "set")]
    set_id: ProblemSetId,
    /// Problem id, its position in the set or its title
    problem: String,
}

impl Run for OpenOpt {
    fn run(
        &self,
        global_opt: &GlobalOpt,
        conf: &Config,
        cnsl: &mut Console,
    ) -> Result<Box<dyn Outcome>> {
        let actor = conf.build_actor(global_opt.course_id.as_ref(), conf.env_credential())?;
        let problems = actor.problems(&self.set_id, cnsl)?;
        let problem = find_problem(problems, &self.problem)?;
        let url = actor.problem_url(&problem)?;
        writeln!(cnsl, "Opening {} in the browser", url)?;
        pgrid_util::web::open_in_browser(&url)?;
        Ok(Box::new(OpenOutcome {
            url: url.to_string(),
        }))
    }
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq, Hash)]
pub struct OpenOutcome {
    url: String,
}

impl fmt::Display for OpenOutcome {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Opened {}", self.url)
    }
}

impl Outcome for OpenOutcome {
    fn is_error(&self) -> bool {
        false
    }
}
