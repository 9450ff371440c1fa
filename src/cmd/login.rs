use std::fmt;

use serde::Serialize;
use structopt::StructOpt;

use crate::cmd::{Outcome, Run};
use crate::config::Config;
use crate::service::Act as _;
use crate::{Console, GlobalOpt, Result};

#[derive(StructOpt, Debug, Clone, PartialEq, Eq, Hash)]
#[structopt(rename_all = "kebab")]
pub struct LoginOpt {}

impl Run for LoginOpt {
    fn run(
        &self,
        global_opt: &GlobalOpt,
        conf: &Config,
        cnsl: &mut Console,
    ) -> Result<Box<dyn Outcome>> {
        let credential = conf.prompt_credential(cnsl)?;
        let username = credential.username().clone();
        let actor = conf.build_actor(global_opt.course_id.as_ref(), Some(credential))?;
        let is_logged_in = actor.login(cnsl)?;
        Ok(Box::new(LoginOutcome {
            username,
            is_logged_in,
        }))
    }
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq, Hash)]
pub struct LoginOutcome {
    username: String,
    is_logged_in: bool,
}

impl fmt::Display for LoginOutcome {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.is_logged_in {
            write!(f, "Logged in as {}", self.username)
        } else {
            write!(
                f,
                "Could not log in as {}. Check your username and password.",
                self.username
            )
        }
    }
}

impl Outcome for LoginOutcome {
    fn is_error(&self) -> bool {
        !self.is_logged_in
    }
}
