use std::fmt;
use std::io::Write as _;
use std::path::PathBuf;

use anyhow::Context as _;
use lazy_static::lazy_static;
use serde::Serialize;
use structopt::StructOpt;
use tera::Tera;

use crate::abs_path::AbsPathBuf;
use crate::cmd::{find_problem, status_label, Outcome, Run};
use crate::config::Config;
use crate::model::{Problem, ProblemDescription, ProblemSetId};
use crate::service::scrape::fragment_to_text;
use crate::service::Act as _;
use crate::{Console, GlobalOpt, Result};

static STATEMENT_TEMPLATE: &str = "problem.html";

lazy_static! {
    static ref RENDERER: Tera = {
        let mut renderer = Tera::default();
        renderer
            .add_raw_template(
                STATEMENT_TEMPLATE,
                include_str!("../../resources/problem.html.tera"),
            )
            .unwrap();
        renderer
    };
}

#[derive(StructOpt, Debug, Clone, PartialEq, Eq, Hash)]
#[structopt(rename_all = "kebab")]
pub struct ShowOpt {
    #[structopt(name = "set")]
    set_id: ProblemSetId,
    /// Problem id, its position in the set or its title
    problem: String,
    /// Saves the statement with its images as a standalone html file
    #[structopt(long)]
    html: Option<PathBuf>,
}

impl Run for ShowOpt {
    fn run(
        &self,
        global_opt: &GlobalOpt,
        conf: &Config,
        cnsl: &mut Console,
    ) -> Result<Box<dyn Outcome>> {
        let actor = conf.build_actor(global_opt.course_id.as_ref(), conf.env_credential())?;
        let problems = actor.problems(&self.set_id, cnsl)?;
        let problem = find_problem(problems, &self.problem)?;
        let description = actor.description(&problem, cnsl)?;

        let html_path = match &self.html {
            Some(path) => {
                let cwd = AbsPathBuf::cwd()?;
                let html_path = cwd.join(path);
                let document = render_html(&description)?;
                html_path.save_pretty(
                    |mut file| Ok(file.write_all(document.as_bytes())?),
                    true,
                    Some(&cwd),
                    cnsl,
                )?;
                Some(html_path)
            }
            None => None,
        };

        Ok(Box::new(ShowOutcome {
            problem,
            description,
            html_path,
        }))
    }
}

#[derive(Serialize)]
struct Section<'a> {
    name: &'a str,
    html: &'a str,
}

#[derive(Serialize)]
struct StatementContext<'a> {
    title: &'a str,
    sections: Vec<Section<'a>>,
    sample_input: &'a str,
    sample_output: &'a str,
}

/// Standalone html page of a statement whose images are already inlined.
fn render_html(desc: &ProblemDescription) -> Result<String> {
    let sections = desc.html_sections();
    let context = StatementContext {
        title: desc.title(),
        sections: sections
            .iter()
            .filter(|(_, html)| !html.trim().is_empty())
            .map(|&(name, html)| Section { name, html })
            .collect(),
        sample_input: desc.sample_input(),
        sample_output: desc.sample_output(),
    };
    let ctx =
        tera::Context::from_serialize(&context).context("Could not create template context")?;
    RENDERER
        .render(STATEMENT_TEMPLATE, &ctx)
        .context("Could not render problem statement")
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq, Hash)]
pub struct ShowOutcome {
    problem: Problem,
    description: ProblemDescription,
    #[serde(skip_serializing_if = "Option::is_none")]
    html_path: Option<AbsPathBuf>,
}

impl fmt::Display for ShowOutcome {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(
            f,
            "{}. {} [{}]",
            self.problem.index(),
            self.description.title(),
            status_label(&self.problem)
        )?;
        for (name, html) in self.description.html_sections().iter() {
            let text = fragment_to_text(html);
            if !text.trim().is_empty() {
                write!(f, "\n## {}\n{}\n", name, text.trim_end())?;
            }
        }
        write!(
            f,
            "\n## Sample Input\n{}\n\n## Sample Output\n{}",
            self.description.sample_input().trim_end(),
            self.description.sample_output().trim_end()
        )?;
        if let Some(path) = &self.html_path {
            write!(f, "\n\nSaved statement to {}", path)?;
        }
        Ok(())
    }
}

impl Outcome for ShowOutcome {
    fn is_error(&self) -> bool {
        false
    }
}
