use std::env;
use std::fmt;
use std::fs;
use std::io::{self, Read as _, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{anyhow, Context as _};
use serde::{de, Deserialize, Deserializer, Serialize};

use crate::{Error, Result};

/// An absolute path to a file pgrid reads or writes, such as the config file,
/// the cookies file or a source file.
#[derive(Serialize, Debug, Clone, PartialEq, Eq, Hash)]
pub struct AbsPathBuf(PathBuf);

/// What `AbsPathBuf::save` did to the file.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Saved {
    Created,
    Overwritten,
    /// The file exists and overwriting was not asked for.
    Kept,
}

impl AbsPathBuf {
    pub fn try_new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path.is_absolute() {
            Ok(Self(path.components().collect()))
        } else {
            Err(anyhow!("Path is not absolute : {}", path.display()))
        }
    }

    /// Absolute path from text that may start with `~` or contain env variables.
    pub fn from_shell_path(path: &str) -> Result<Self> {
        let expanded = shellexpand::full(path)
            .with_context(|| format!("Could not expand path : {}", path))?;
        Self::try_new(&*expanded)
    }

    pub fn cwd() -> Result<Self> {
        let cwd = env::current_dir().context("Could not get current directory")?;
        Ok(Self(cwd))
    }

    /// Joins `path`; an absolute `path` replaces `self`.
    pub fn join<P: AsRef<Path>>(&self, path: P) -> Self {
        Self(self.0.join(path))
    }

    /// Nearest directory among `self` and its ancestors holding a file named `file_name`.
    pub fn search_dir_contains(&self, file_name: &str) -> Option<Self> {
        self.0
            .ancestors()
            .find(|dir| dir.join(file_name).is_file())
            .map(|dir| Self(dir.to_owned()))
    }

    /// Opens the file for writing without truncating it, creating it and its
    /// parent directories when missing.
    pub fn open_create(&self) -> io::Result<fs::File> {
        if let Some(dir) = self.0.parent() {
            fs::create_dir_all(dir)?;
        }
        fs::OpenOptions::new()
            .write(true)
            .create(true)
            .open(&self.0)
    }

    /// Writes the file with `write` unless it exists and `overwrite` is false.
    pub fn save(
        &self,
        write: impl FnOnce(fs::File) -> Result<()>,
        overwrite: bool,
    ) -> Result<Saved> {
        let existed = self.0.is_file();
        if existed && !overwrite {
            return Ok(Saved::Kept);
        }
        let file = self
            .open_create()
            .and_then(|file| file.set_len(0).map(|_| file))
            .with_context(|| format!("Could not open file : {}", self))?;
        write(file)?;
        Ok(if existed {
            Saved::Overwritten
        } else {
            Saved::Created
        })
    }

    /// Same as `save`, reporting the result to `cnsl`.
    pub fn save_pretty(
        &self,
        write: impl FnOnce(fs::File) -> Result<()>,
        overwrite: bool,
        base_dir: Option<&AbsPathBuf>,
        cnsl: &mut dyn Write,
    ) -> Result<Saved> {
        self.report("Saving", base_dir, cnsl, self.save(write, overwrite), |saved| {
            match saved {
                Saved::Created => "saved",
                Saved::Overwritten => "overwritten",
                Saved::Kept => "already exists",
            }
        })
    }

    pub fn load<T>(&self, read: impl FnOnce(fs::File) -> Result<T>) -> Result<T> {
        let file =
            fs::File::open(&self.0).with_context(|| format!("Could not open file : {}", self))?;
        read(file)
    }

    pub fn load_string(&self) -> Result<String> {
        self.load(|mut file| {
            let mut text = String::new();
            file.read_to_string(&mut text)?;
            Ok(text)
        })
    }

    /// Same as `load`, reporting the result to `cnsl`.
    pub fn load_pretty<T>(
        &self,
        read: impl FnOnce(fs::File) -> Result<T>,
        base_dir: Option<&AbsPathBuf>,
        cnsl: &mut dyn Write,
    ) -> Result<T> {
        self.report("Loading", base_dir, cnsl, self.load(read), |_| "loaded")
    }

    /// Removes the file if it exists, reporting the result to `cnsl`.
    ///
    /// Returns whether there was a file to remove.
    pub fn remove_file_pretty(
        &self,
        base_dir: Option<&AbsPathBuf>,
        cnsl: &mut dyn Write,
    ) -> Result<bool> {
        let result = match fs::remove_file(&self.0) {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(err) => Err(Error::from(err).context(format!("Could not remove file : {}", self))),
        };
        self.report("Removing", base_dir, cnsl, result, |&removed| {
            if removed {
                "removed"
            } else {
                "not found"
            }
        })
    }

    /// Path relative to `base`, or the whole path if it is not under `base`.
    pub fn strip_prefix(&self, base: &AbsPathBuf) -> &Path {
        self.0.strip_prefix(&base.0).unwrap_or(&self.0)
    }

    fn report<T>(
        &self,
        action: &str,
        base_dir: Option<&AbsPathBuf>,
        cnsl: &mut dyn Write,
        result: Result<T>,
        describe: impl FnOnce(&T) -> &'static str,
    ) -> Result<T> {
        let shown: &Path = match base_dir {
            Some(base) => self.strip_prefix(base),
            None => &self.0,
        };
        let status = match &result {
            Ok(value) => describe(value),
            Err(_) => "failed",
        };
        writeln!(cnsl, "{} {} ... {}", action, shown.display(), status)?;
        result
    }
}

impl AsRef<PathBuf> for AbsPathBuf {
    fn as_ref(&self) -> &PathBuf {
        &self.0
    }
}

impl FromStr for AbsPathBuf {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::from_shell_path(s)
    }
}

impl<'de> Deserialize<'de> for AbsPathBuf {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let text = String::deserialize(deserializer)?;
        Self::from_shell_path(&text).map_err(de::Error::custom)
    }
}

impl fmt::Display for AbsPathBuf {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0.display())
    }
}
