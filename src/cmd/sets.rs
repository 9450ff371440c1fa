use std::fmt;

use chrono::{DateTime, Local, Utc};
use serde::Serialize;
use structopt::StructOpt;

use crate::cmd::{Outcome, Run};
use crate::config::Config;
use crate::model::ProblemSet;
use crate::service::Act as _;
use crate::{Console, GlobalOpt, Result};

#[derive(StructOpt, Debug, Clone, PartialEq, Eq, Hash)]
#[structopt(rename_all = "kebab")]
pub struct SetsOpt {
    /// Lists closed problem sets too
    #[structopt(long, short = "a")]
    all: bool,
}

impl Run for SetsOpt {
    fn run(
        &self,
        global_opt: &GlobalOpt,
        conf: &Config,
        cnsl: &mut Console,
    ) -> Result<Box<dyn Outcome>> {
        let actor = conf.build_actor(global_opt.course_id.as_ref(), conf.env_credential())?;
        let sets = actor.problem_sets(cnsl)?;
        let show_closed = self.all || conf.body().show_closed();
        Ok(Box::new(SetsOutcome::new(sets, show_closed, Utc::now())))
    }
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq, Hash)]
pub struct SetsOutcome {
    sets: Vec<ProblemSet>,
    hidden: usize,
    #[serde(skip)]
    now: DateTime<Utc>,
}

impl SetsOutcome {
    fn new(sets: Vec<ProblemSet>, show_closed: bool, now: DateTime<Utc>) -> Self {
        let total = sets.len();
        let sets = sets
            .into_iter()
            .filter(|set| show_closed || set.is_available_at(now))
            .collect::<Vec<_>>();
        Self {
            hidden: total - sets.len(),
            sets,
            now,
        }
    }
}

fn format_time(time: Option<DateTime<Utc>>) -> String {
    match time {
        Some(time) => time.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string(),
        None => "?".into(),
    }
}

impl fmt::Display for SetsOutcome {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.sets.is_empty() {
            f.write_str("No problem set is open")?;
        }
        for (i, set) in self.sets.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(
                f,
                "{:32}  {} ~ {}  {:6}  {}",
                set.id().to_string(),
                format_time(set.open()),
                format_time(set.close()),
                if set.is_available_at(self.now) { "open" } else { "closed" },
                set.title()
            )?;
        }
        if self.hidden > 0 {
            write!(f, "\n({} closed set(s) hidden, pass --all to list them)", self.hidden)?;
        }
        Ok(())
    }
}

impl Outcome for SetsOutcome {
    fn is_error(&self) -> bool {
        false
    }
}
