use std::fmt;

use serde::Serialize;
use structopt::StructOpt;

use crate::cmd::{Outcome, Run};
use crate::config::Config;
use crate::{Console, GlobalOpt, Result};

#[derive(StructOpt, Debug, Clone, PartialEq, Eq, Hash)]
#[structopt(rename_all = "kebab")]
pub struct LogoutOpt {}

impl LogoutOpt {
    fn logout(&self, conf: &Config, cnsl: &mut Console) -> Result<LogoutOutcome> {
        let cookies_path = conf.session().resolve_cookies_path()?;
        let is_removed = cookies_path.remove_file_pretty(Some(conf.base_dir()), cnsl)?;
        Ok(LogoutOutcome { is_removed })
    }
}

impl Run for LogoutOpt {
    fn run(
        &self,
        _global_opt: &GlobalOpt,
        conf: &Config,
        cnsl: &mut Console,
    ) -> Result<Box<dyn Outcome>> {
        Ok(Box::new(self.logout(conf, cnsl)?))
    }
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq, Hash)]
pub struct LogoutOutcome {
    is_removed: bool,
}

impl fmt::Display for LogoutOutcome {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.is_removed {
            f.write_str("Successfully logged out")
        } else {
            f.write_str("No saved session found")
        }
    }
}

impl Outcome for LogoutOutcome {
    fn is_error(&self) -> bool {
        false
    }
}
