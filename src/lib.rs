#![warn(clippy::all)]

#[macro_use]
extern crate strum;

use std::io;

use structopt::StructOpt;
use strum::VariantNames;

mod cmd;
mod config;

use pgrid_util::{abs_path, model, service};

use crate::model::CourseId;
use cmd::OutcomeSerialize as _;
pub use cmd::{Cmd, Outcome};
pub use config::{Config, ConfigBody};
pub use pgrid_util::{Console, ConsoleConfig};

pub type Error = anyhow::Error;
pub type Result<T> = anyhow::Result<T>;

#[derive(
    EnumString, EnumVariantNames, IntoStaticStr, Debug, Copy, Clone, PartialEq, Eq, Hash,
)]
#[strum(serialize_all = "kebab-case")]
pub enum OutputFormat {
    Default,
    Debug,
    Json,
    Yaml,
}

#[derive(StructOpt, Debug, Clone, PartialEq, Eq, Hash)]
#[structopt(about, rename_all = "kebab")]
pub struct Opt {
    #[structopt(flatten)]
    global_opt: GlobalOpt,
    #[structopt(subcommand)]
    cmd: Cmd,
}

#[derive(StructOpt, Debug, Clone, PartialEq, Eq, Hash)]
#[structopt(rename_all = "kebab")]
pub struct GlobalOpt {
    /// Course id or the url of the course page. Overrides `course_id` in config
    #[structopt(name = "course", long, global = true, env = "PGRID_COURSE")]
    course_id: Option<CourseId>,
    #[structopt(
        long,
        global = true,
        default_value = OutputFormat::Default.into(),
        possible_values = &OutputFormat::VARIANTS,
    )]
    output: OutputFormat,
    /// Assumes yes to every confirmation
    #[structopt(long, short = "y", global = true)]
    assume_yes: bool,
}

impl GlobalOpt {
    pub fn console_config(&self) -> ConsoleConfig {
        ConsoleConfig {
            assume_yes: self.assume_yes,
        }
    }
}

impl Opt {
    pub fn global_opt(&self) -> &GlobalOpt {
        &self.global_opt
    }

    /// Runs the command and prints its outcome to `stdout`.
    ///
    /// Returns `false` when the outcome reports a failure, such as a rejected
    /// solution.
    pub fn run(&self, cnsl: &mut Console, stdout: &mut dyn io::Write) -> Result<bool> {
        let outcome = self.cmd.run(&self.global_opt, cnsl)?;
        outcome.print(stdout, self.global_opt.output)?;
        Ok(!outcome.is_error())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use pgrid_util::assert_matches;

    #[test]
    fn test_parse_global_opt() -> anyhow::Result<()> {
        let opt = Opt::from_iter_safe(&[
            "pgrid",
            "sets",
            "--course",
            "0123456789ABCDEF0123456789abcdef",
            "--output",
            "json",
            "-y",
        ])?;
        assert_eq!(
            opt.global_opt.course_id,
            Some(CourseId::from("0123456789abcdef0123456789abcdef"))
        );
        assert_eq!(opt.global_opt.output, OutputFormat::Json);
        assert!(opt.global_opt.console_config().assume_yes);
        Ok(())
    }

    #[test]
    fn test_parse_invalid_course() {
        let res = Opt::from_iter_safe(&["pgrid", "sets", "--course", "week1"]);
        assert_matches!(res => Err(_));
    }
}
