use std::env;
use std::fmt;
use std::io::Write;

use anyhow::{anyhow, Context as _};
use getset::{CopyGetters, Getters};
use lazy_static::lazy_static;
use semver::{Version, VersionReq};
use serde::{Deserialize, Serialize};

use pgrid_portal::{JudgeConfig, PortalActor, SchemaKind, SessionConfig};

use crate::abs_path::AbsPathBuf;
use crate::model::{string as string_serde, CourseId, Credential};
use crate::{Console, Result};

lazy_static! {
    static ref VERSION: Version = Version::parse(env!("CARGO_PKG_VERSION")).unwrap();
}

static ENV_USERNAME: &str = "PGRID_USERNAME";
static ENV_PASSWORD: &str = "PGRID_PASSWORD";

#[derive(Serialize, Getters, Debug, Clone, PartialEq, Eq, Hash)]
pub struct Config {
    #[get = "pub"]
    base_dir: AbsPathBuf,
    #[get = "pub"]
    body: ConfigBody,
}

impl Config {
    /// Loads the config file found in the current directory or its parents.
    pub fn search(cnsl: &mut Console) -> Result<Self> {
        let base_dir = ConfigBody::search(cnsl)?;
        Self::load(base_dir, cnsl)
    }

    pub fn load(base_dir: AbsPathBuf, cnsl: &mut Console) -> Result<Self> {
        let body = ConfigBody::load(&base_dir, cnsl)?;
        Ok(Self { base_dir, body })
    }

    pub fn session(&self) -> &SessionConfig {
        &self.body.session
    }

    pub fn judge(&self) -> &JudgeConfig {
        &self.body.judge
    }

    /// Course given on the command line, falling back to the config file.
    pub fn course_id(&self, course_id: Option<&CourseId>) -> Option<CourseId> {
        course_id.or_else(|| self.body.course_id.as_ref()).cloned()
    }

    fn username(&self) -> Option<String> {
        env::var(ENV_USERNAME)
            .ok()
            .or_else(|| self.body.username.clone())
            .filter(|name| !name.trim().is_empty())
    }

    /// Credential available without asking, used to log in again when the
    /// saved session has expired.
    pub fn env_credential(&self) -> Option<Credential> {
        let username = self.username()?;
        let password = env::var(ENV_PASSWORD).ok()?;
        Some(Credential::new(username, password))
    }

    /// Credential from env and config, asking for whatever is missing.
    pub fn prompt_credential(&self, cnsl: &mut Console) -> Result<Credential> {
        let username = match env::var(ENV_USERNAME).ok() {
            Some(_) => cnsl.env_or_prompt(ENV_USERNAME, "username: ", false)?,
            None => match &self.body.username {
                Some(username) => {
                    writeln!(cnsl, "username: {} (from config)", username)?;
                    username.clone()
                }
                None => cnsl.prompt("username: ", false)?,
            },
        };
        let password = cnsl.env_or_prompt(ENV_PASSWORD, "password: ", true)?;
        if username.trim().is_empty() || password.is_empty() {
            return Err(anyhow!("Username and password must not be empty"));
        }
        Ok(Credential::new(username.trim(), password))
    }

    pub fn build_actor(
        &self,
        course_id: Option<&CourseId>,
        credential: Option<Credential>,
    ) -> Result<PortalActor> {
        let actor = PortalActor::open(
            self.body.schema,
            self.body.session.clone(),
            self.body.judge.clone(),
        )
        .context("Could not setup portal client")?
        .with_credential(credential);
        Ok(match self.course_id(course_id) {
            Some(course_id) => actor.with_course(course_id),
            None => actor,
        })
    }

    pub fn default_in_dir(base_dir: AbsPathBuf) -> Self {
        let body = ConfigBody::default_in_dir(&base_dir);
        Self { base_dir, body }
    }
}

impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let yaml_str = serde_yaml::to_string(self).map_err(|_| fmt::Error)?;
        write!(f, "{}", yaml_str)
    }
}

#[derive(Serialize, Deserialize, Getters, CopyGetters, Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConfigBody {
    #[serde(with = "string_serde")]
    version: Version,
    #[serde(default)]
    #[get = "pub"]
    course_id: Option<CourseId>,
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    #[get_copy = "pub"]
    schema: SchemaKind,
    #[serde(default)]
    #[get_copy = "pub"]
    show_closed: bool,
    #[serde(default)]
    session: SessionConfig,
    #[serde(default)]
    judge: JudgeConfig,
}

impl ConfigBody {
    pub const FILE_NAME: &'static str = "pgrid.yaml";

    /// Writes the commented config file `pgrid init` creates.
    pub fn generate_to(writer: &mut dyn Write, course_id: Option<&CourseId>) -> Result<()> {
        let course = match course_id {
            Some(course_id) => format!("course_id: {}", course_id),
            None => "# course_id: 0123456789abcdef0123456789abcdef".into(),
        };
        writeln!(
            writer,
            include_str!("../resources/pgrid.yaml.txt"),
            version = &*VERSION,
            course = course,
        )
        .context("Could not write config")
    }

    fn default_in_dir(base_dir: &AbsPathBuf) -> Self {
        Self {
            session: SessionConfig::default_in_dir(base_dir),
            ..Self::default()
        }
    }

    fn search(cnsl: &mut Console) -> Result<AbsPathBuf> {
        let cwd = AbsPathBuf::cwd()?;
        let base_dir = cwd.search_dir_contains(Self::FILE_NAME).with_context(|| {
            format!(
                "Could not find config file ({}) in {} or any of the parent directories. \
                 Create config file first by `pgrid init` command.",
                Self::FILE_NAME,
                cwd
            )
        })?;
        writeln!(cnsl, "Found config file in base_dir: {}", base_dir)?;
        Ok(base_dir)
    }

    fn load(base_dir: &AbsPathBuf, cnsl: &mut Console) -> Result<Self> {
        let body: Self = base_dir.join(Self::FILE_NAME).load_pretty(
            |file| serde_yaml::from_reader(file).context("Could not read config file as yaml"),
            Some(base_dir),
            cnsl,
        )?;
        body.validate()?;
        Ok(body)
    }

    fn validate(&self) -> Result<()> {
        let version_req = VersionReq::parse(&self.version.to_string())
            .context("Could not parse version requirement")?;
        if !version_req.matches(&VERSION) {
            return Err(anyhow!(
                r#"Found mismatched version in config file.
    config version: {}
    pgrid version : {}
Fix the config file so that it is compatible with the current version of pgrid."#,
                self.version,
                &*VERSION
            ));
        }
        if let Some(course_id) = &self.course_id {
            if !course_id.is_valid() {
                return Err(anyhow!(
                    "Found invalid course_id in config file : {} (expected 32 hex digits)",
                    course_id
                ));
            }
        }
        Ok(())
    }
}

impl Default for ConfigBody {
    fn default() -> Self {
        Self {
            version: VERSION.clone(),
            course_id: None,
            username: None,
            schema: SchemaKind::default(),
            show_closed: false,
            session: SessionConfig::default(),
            judge: JudgeConfig::default(),
        }
    }
}
