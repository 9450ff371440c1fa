use std::io::{BufReader, Seek as _, SeekFrom};
use std::sync::{Mutex, MutexGuard};

use anyhow::Context as _;
use cookie::Cookie as RawCookie;
use cookie_store::CookieStore;
use fs2::FileExt as _;
use reqwest::Url;
use serde::{Deserialize, Serialize};

use crate::abs_path::AbsPathBuf;
use crate::{Error, Result};

/// Holds the session cookies of the portal.
///
/// Only the authenticator replaces the session. When opened with a path the
/// received `Set-Cookie` values are written back to that json file after every
/// change so that a session outlives the process.
#[derive(Debug)]
pub struct SessionStore {
    inner: Mutex<Inner>,
    path: Option<AbsPathBuf>,
}

#[derive(Debug, Default)]
struct Inner {
    store: CookieStore,
    saved: SavedSession,
}

#[derive(Serialize, Deserialize, Debug, Default, Clone, PartialEq, Eq)]
struct SavedSession {
    url: Option<String>,
    set_cookies: Vec<String>,
}

impl Inner {
    fn from_saved(saved: SavedSession) -> Result<Self> {
        let mut inner = Self::default();
        if let Some(url) = &saved.url {
            let url = Url::parse(url).context("Could not parse url in cookies file")?;
            inner.replace(&saved.set_cookies, &url);
        }
        Ok(inner)
    }

    fn replace(&mut self, set_cookies: &[String], url: &Url) -> usize {
        let cookies = set_cookies
            .iter()
            .filter_map(|cookie_str| RawCookie::parse(cookie_str.to_owned()).ok())
            .collect::<Vec<_>>();
        let count = cookies.len();
        self.store = CookieStore::default();
        self.store.store_response_cookies(cookies.into_iter(), url);
        self.saved = SavedSession {
            url: Some(url.to_string()),
            set_cookies: set_cookies.to_vec(),
        };
        count
    }
}

impl SessionStore {
    pub fn in_memory() -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            path: None,
        }
    }

    pub fn open(path: AbsPathBuf) -> Result<Self> {
        let inner = if path.as_ref().is_file() {
            let saved = path
                .load(|file| {
                    file.try_lock_exclusive()
                        .context("Could not lock cookies file")?;
                    let saved = serde_json::from_reader(BufReader::new(&file))
                        .context("Could not read cookies file as json");
                    file.unlock()?;
                    saved
                })
                .context("Could not load cookies file")?;
            Inner::from_saved(saved)?
        } else {
            Inner::default()
        };
        Ok(Self {
            inner: Mutex::new(inner),
            path: Some(path),
        })
    }

    fn lock(&self) -> Result<MutexGuard<Inner>> {
        self.inner
            .lock()
            .map_err(|_| Error::msg("Session store was poisoned by a panicked thread"))
    }

    /// Replaces the session with the cookies of `set_cookies` (values of
    /// `Set-Cookie` headers received from `url`).
    ///
    /// Returns the number of cookies stored.
    pub fn set_session(&self, set_cookies: &[String], url: &Url) -> Result<usize> {
        let mut inner = self.lock()?;
        let count = inner.replace(set_cookies, url);
        self.save(&inner.saved)?;
        Ok(count)
    }

    /// Value of the `Cookie` header for a request to `url`, if any cookie applies.
    pub fn get_session(&self, url: &Url) -> Result<Option<String>> {
        let inner = self.lock()?;
        let pairs = inner
            .store
            .get_request_cookies(url)
            .map(|cookie| format!("{}={}", cookie.name(), cookie.value()))
            .collect::<Vec<_>>();
        if pairs.is_empty() {
            Ok(None)
        } else {
            Ok(Some(pairs.join("; ")))
        }
    }

    pub fn clear(&self) -> Result<()> {
        let mut inner = self.lock()?;
        *inner = Inner::default();
        self.save(&inner.saved)
    }

    pub fn path(&self) -> Option<&AbsPathBuf> {
        self.path.as_ref()
    }

    fn save(&self, saved: &SavedSession) -> Result<()> {
        let path = match &self.path {
            Some(path) => path,
            None => return Ok(()),
        };
        let mut file = path
            .open_create()
            .context("Could not open cookies file")?;
        file.try_lock_exclusive()
            .context("Could not lock cookies file")?;
        file.seek(SeekFrom::Start(0))?;
        file.set_len(0)?;
        serde_json::to_writer(&mut file, saved).context("Could not save cookies to json file")?;
        file.unlock()?;
        Ok(())
    }
}
