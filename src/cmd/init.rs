use std::fmt;
use std::fs;
use std::path::PathBuf;

use anyhow::{anyhow, Context as _};
use serde::Serialize;
use structopt::StructOpt;

use crate::abs_path::{AbsPathBuf, Saved};
use crate::cmd::Outcome;
use crate::config::ConfigBody;
use crate::model::CourseId;
use crate::{Console, GlobalOpt, Result};

#[derive(StructOpt, Debug, Clone, PartialEq, Eq, Hash)]
#[structopt(rename_all = "kebab")]
pub struct InitOpt {
    /// Directory to create the config file in. Defaults to the current directory
    base_dir: Option<PathBuf>,
    /// Replaces an existing config file
    #[structopt(long, short = "w")]
    overwrite: bool,
}

impl InitOpt {
    pub fn run(&self, global_opt: &GlobalOpt, cnsl: &mut Console) -> Result<InitOutcome> {
        let cwd = AbsPathBuf::cwd()?;
        let base_dir = match &self.base_dir {
            Some(dir) => cwd.join(dir),
            None => cwd.clone(),
        };
        let config_path = create_config(
            &base_dir,
            global_opt.course_id.as_ref(),
            self.overwrite,
            &cwd,
            cnsl,
        )?;
        Ok(InitOutcome {
            config_path,
            course_id: global_opt.course_id.clone(),
        })
    }
}

fn create_config(
    base_dir: &AbsPathBuf,
    course_id: Option<&CourseId>,
    overwrite: bool,
    cwd: &AbsPathBuf,
    cnsl: &mut Console,
) -> Result<AbsPathBuf> {
    if !base_dir.as_ref().is_dir() {
        return Err(anyhow!("Could not find directory : {}", base_dir));
    }
    let config_path = base_dir.join(ConfigBody::FILE_NAME);
    let write = |mut file: fs::File| {
        ConfigBody::generate_to(&mut file, course_id).context("Could not write config file")
    };
    match config_path.save_pretty(write, overwrite, Some(cwd), cnsl)? {
        Saved::Kept => Err(anyhow!(
            "Config file already exists : {} (pass --overwrite to replace it)",
            config_path
        )),
        Saved::Created | Saved::Overwritten => Ok(config_path),
    }
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq, Hash)]
pub struct InitOutcome {
    config_path: AbsPathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    course_id: Option<CourseId>,
}

impl fmt::Display for InitOutcome {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Created {}", self.config_path)?;
        if self.course_id.is_none() {
            f.write_str("\nSet course_id in it, or pass --course to every command")?;
        }
        Ok(())
    }
}

impl Outcome for InitOutcome {
    fn is_error(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;
    use crate::config::Config;
    use crate::ConsoleConfig;

    #[test]
    fn test_create_config() -> anyhow::Result<()> {
        let test_dir = tempdir()?;
        let base_dir = AbsPathBuf::try_new(test_dir.path())?;
        let course_id = CourseId::from("0123456789abcdef0123456789abcdef");
        let mut cnsl = Console::buf(ConsoleConfig::default());

        let path = create_config(&base_dir, Some(&course_id), false, &base_dir, &mut cnsl)?;
        assert_eq!(path, base_dir.join("pgrid.yaml"));
        let conf = Config::load(base_dir.clone(), &mut cnsl)?;
        assert_eq!(conf.course_id(None), Some(course_id));

        assert!(create_config(&base_dir, None, false, &base_dir, &mut cnsl).is_err());
        create_config(&base_dir, None, true, &base_dir, &mut cnsl)?;
        let conf = Config::load(base_dir.clone(), &mut cnsl)?;
        assert_eq!(conf.course_id(None), None);

        let missing = base_dir.join("missing");
        assert!(create_config(&missing, None, false, &base_dir, &mut cnsl).is_err());

        let output = cnsl.take_output()?;
        assert!(output.contains("Saving pgrid.yaml ... saved\n"));
        assert!(output.contains("Saving pgrid.yaml ... already exists\n"));
        assert!(output.contains("Saving pgrid.yaml ... overwritten\n"));
        Ok(())
    }
}
