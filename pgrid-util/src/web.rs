use anyhow::{anyhow, Context as _};
use reqwest::Url;

use crate::Result;

/// Opens `url` with the default browser of the desktop.
pub fn open_in_browser(url: &Url) -> Result<()> {
    let output = webbrowser::open(url.as_str())
        .with_context(|| format!("Could not start a browser for {}", url))?;
    if !output.status.success() {
        return Err(anyhow!("Browser exited with {} while opening {}", output.status, url));
    }
    Ok(())
}
