use std::fmt;

use serde::Serialize;
use structopt::StructOpt;

use crate::cmd::{Outcome, Run};
use crate::config::Config;
use crate::model::Course;
use crate::service::Act as _;
use crate::{Console, GlobalOpt, Result};

#[derive(StructOpt, Debug, Clone, PartialEq, Eq, Hash)]
#[structopt(rename_all = "kebab")]
pub struct CourseOpt {}

impl Run for CourseOpt {
    fn run(
        &self,
        global_opt: &GlobalOpt,
        conf: &Config,
        cnsl: &mut Console,
    ) -> Result<Box<dyn Outcome>> {
        let actor = conf.build_actor(global_opt.course_id.as_ref(), conf.env_credential())?;
        let course = actor.course(cnsl)?;
        Ok(Box::new(CourseOutcome { course }))
    }
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq, Hash)]
pub struct CourseOutcome {
    course: Course,
}

impl fmt::Display for CourseOutcome {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} ({})", self.course.title(), self.course.id())
    }
}

impl Outcome for CourseOutcome {
    fn is_error(&self) -> bool {
        false
    }
}
