use std::time::Duration;

use anyhow::Context as _;
use getset::{CopyGetters, Getters};
use reqwest::blocking::Client;
use reqwest::redirect::Policy;
use serde::{Deserialize, Serialize};

use crate::abs_path::AbsPathBuf;
use crate::Result;

/// Browser user agent; the portal serves reduced pages to unknown agents.
pub static USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
    (KHTML, like Gecko) Chrome/92.0.4515.131 Safari/537.36 Edg/92.0.902.73";

static COOKIES_FILE_NAME: &str = "cookies.json";

#[derive(Serialize, Deserialize, Getters, CopyGetters, Debug, Clone, PartialEq, Eq, Hash)]
#[serde(default)]
pub struct SessionConfig {
    #[serde(with = "humantime_serde")]
    #[get_copy = "pub"]
    timeout: Duration,
    /// Extra attempts after a 404, a server error or a network error.
    #[get_copy = "pub"]
    retry_limit: usize,
    #[serde(with = "humantime_serde")]
    #[get_copy = "pub"]
    retry_interval: Duration,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[get = "pub"]
    cookies_path: Option<AbsPathBuf>,
}

impl SessionConfig {
    pub fn build_client(&self) -> Result<Client> {
        Client::builder()
            .referer(false)
            .redirect(Policy::none()) // redirects manually
            .user_agent(USER_AGENT)
            .timeout(self.timeout)
            .build()
            .context("Could not setup http client")
    }

    /// Cookies file, under the local data directory unless configured.
    pub fn resolve_cookies_path(&self) -> Result<AbsPathBuf> {
        match &self.cookies_path {
            Some(path) => Ok(path.clone()),
            None => Ok(pgrid_util::data_local_dir()?.join(COOKIES_FILE_NAME)),
        }
    }

    /// Settings whose cookies file lives under `base_dir`.
    pub fn default_in_dir(base_dir: &AbsPathBuf) -> Self {
        Self {
            cookies_path: Some(base_dir.join(".pgrid").join(COOKIES_FILE_NAME)),
            ..Self::default()
        }
    }

    #[cfg(test)]
    pub(crate) fn for_test() -> Self {
        Self {
            retry_limit: 2,
            retry_interval: Duration::from_millis(0),
            ..Self::default()
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            retry_limit: 4,
            retry_interval: Duration::from_millis(500),
            cookies_path: None,
        }
    }
}

#[derive(Serialize, Deserialize, Getters, CopyGetters, Debug, Clone, PartialEq, Eq, Hash)]
#[serde(default)]
pub struct JudgeConfig {
    /// Language tag sent with every submission.
    #[get = "pub"]
    language: String,
    /// Comment prepended to submitted source, unless the problem has a template.
    #[get = "pub"]
    attribution: Option<String>,
    #[serde(with = "humantime_serde")]
    #[get_copy = "pub"]
    poll_interval: Duration,
    /// Polls after the first one before giving up on a processing solution.
    #[get_copy = "pub"]
    poll_limit: usize,
    /// Substrings the portal refuses to accept in source code.
    #[get = "pub"]
    forbidden: Vec<String>,
}

impl JudgeConfig {
    #[cfg(test)]
    pub(crate) fn for_test() -> Self {
        Self {
            poll_interval: Duration::from_millis(0),
            poll_limit: 3,
            ..Self::default()
        }
    }
}

impl Default for JudgeConfig {
    fn default() -> Self {
        Self {
            language: "C++".into(),
            attribution: Some("// Submitted by pgrid".into()),
            poll_interval: Duration::from_millis(100),
            poll_limit: 600,
            forbidden: vec!["system(".into(), "fork(".into()],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_partial() -> anyhow::Result<()> {
        let conf: SessionConfig = serde_json::from_str(r#"{"retry_limit": 1, "timeout": "5s"}"#)?;
        assert_eq!(conf.retry_limit(), 1);
        assert_eq!(conf.timeout(), Duration::from_secs(5));
        assert_eq!(conf.retry_interval(), SessionConfig::default().retry_interval());
        assert!(conf.cookies_path().is_none());

        let conf: JudgeConfig = serde_json::from_str(r#"{"attribution": null}"#)?;
        assert_eq!(conf.attribution(), &None);
        assert_eq!(conf.language(), "C++");
        Ok(())
    }

    #[test]
    fn test_resolve_cookies_path() -> anyhow::Result<()> {
        let path = SessionConfig::default().resolve_cookies_path()?;
        assert!(path.as_ref().ends_with("pgrid/cookies.json"));
        Ok(())
    }
}
