use std::{fmt, io};

use anyhow::{anyhow, Context as _};
use serde::Serialize;
use structopt::StructOpt;

use crate::config::Config;
use crate::model::Problem;
use crate::{Console, GlobalOpt, OutputFormat, Result};

mod course;
mod init;
mod login;
mod logout;
mod open;
mod problems;
mod sets;
mod show;
mod status;
mod submit;

pub use course::{CourseOpt, CourseOutcome};
pub use init::{InitOpt, InitOutcome};
pub use login::{LoginOpt, LoginOutcome};
pub use logout::{LogoutOpt, LogoutOutcome};
pub use open::{OpenOpt, OpenOutcome};
pub use problems::{ProblemsOpt, ProblemsOutcome};
pub use sets::{SetsOpt, SetsOutcome};
pub use show::{ShowOpt, ShowOutcome};
pub use status::{StatusOpt, StatusOutcome};
pub use submit::{SubmitOpt, SubmitOutcome};

pub trait Outcome: OutcomeSerialize {
    fn is_error(&self) -> bool;
}

pub trait OutcomeSerialize: fmt::Display + fmt::Debug {
    fn write_json(&self, writer: &mut dyn io::Write) -> Result<()>;

    fn write_yaml(&self, writer: &mut dyn io::Write) -> Result<()>;

    fn print(&self, stdout: &mut dyn io::Write, format: OutputFormat) -> Result<()> {
        match format {
            OutputFormat::Default => writeln!(stdout, "{}", self)?,
            OutputFormat::Debug => writeln!(stdout, "{:?}", self)?,
            OutputFormat::Json => {
                self.write_json(stdout)?;
                writeln!(stdout)?;
            }
            OutputFormat::Yaml => self.write_yaml(stdout)?,
        }
        Ok(())
    }
}

impl<T: Serialize + fmt::Display + fmt::Debug> OutcomeSerialize for T {
    fn write_json(&self, writer: &mut dyn io::Write) -> Result<()> {
        serde_json::to_writer_pretty(writer, self).context("Could not print outcome as json")
    }

    fn write_yaml(&self, writer: &mut dyn io::Write) -> Result<()> {
        serde_yaml::to_writer(writer, self).context("Could not print outcome as yaml")
    }
}

pub trait Run {
    fn run(
        &self,
        global_opt: &GlobalOpt,
        conf: &Config,
        cnsl: &mut Console,
    ) -> Result<Box<dyn Outcome>>;
}

#[derive(StructOpt, Debug, Clone, PartialEq, Eq, Hash)]
#[structopt(rename_all = "kebab")]
pub enum Cmd {
    /// Creates config file
    Init(InitOpt),
    /// Logs in to the portal and saves the session
    Login(LoginOpt),
    /// Removes the saved session
    Logout(LogoutOpt),
    /// Shows the course
    Course(CourseOpt),
    /// Lists problem sets of the course
    Sets(SetsOpt),
    /// Lists problems of a problem set with your results
    Problems(ProblemsOpt),
    /// Shows the statement of a problem
    Show(ShowOpt),
    /// Submits source code and waits for the verdict
    Submit(SubmitOpt),
    /// Shows the verdict of a solution
    Status(StatusOpt),
    /// Opens the page of a problem in the browser
    Open(OpenOpt),
}

impl Cmd {
    pub fn run(&self, global_opt: &GlobalOpt, cnsl: &mut Console) -> Result<Box<dyn Outcome>> {
        let opt: &dyn Run = match self {
            Self::Init(opt) => return Ok(Box::new(opt.run(global_opt, cnsl)?)),
            Self::Login(opt) => opt,
            Self::Logout(opt) => opt,
            Self::Course(opt) => opt,
            Self::Sets(opt) => opt,
            Self::Problems(opt) => opt,
            Self::Show(opt) => opt,
            Self::Submit(opt) => opt,
            Self::Status(opt) => opt,
            Self::Open(opt) => opt,
        };
        let conf = Config::search(cnsl).context("Could not load config")?;
        opt.run(global_opt, &conf, cnsl)
    }
}

/// Finds a problem by its id, its 1-based index or its title.
fn find_problem(mut problems: Vec<Problem>, key: &str) -> Result<Problem> {
    let key = key.trim();
    let index = key.parse::<usize>().ok();
    let pos = problems
        .iter()
        .position(|problem| problem.id().as_ref() == key)
        .or_else(|| problems.iter().position(|problem| Some(problem.index()) == index))
        .or_else(|| {
            problems
                .iter()
                .position(|problem| problem.title().trim().eq_ignore_ascii_case(key))
        })
        .ok_or_else(|| anyhow!("Could not find problem : {}", key))?;
    Ok(problems.swap_remove(pos))
}

fn status_label(problem: &Problem) -> String {
    match problem.status() {
        Some(status) => status.to_string(),
        None => "-".into(),
    }
}
