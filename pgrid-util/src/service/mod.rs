use std::borrow::Cow;

use anyhow::Context as _;
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT_LANGUAGE, CONTENT_TYPE, COOKIE, LOCATION, SET_COOKIE};
use reqwest::{Method, StatusCode, Url};

use crate::Result;

pub mod act;
pub mod scrape;
mod session;

pub use act::Act;
pub use session::SessionStore;

pub static ACCEPT_LANGUAGE_VALUE: &str = "zh-CN,zh;q=0.9,en;q=0.8,en-GB;q=0.7,en-US;q=0.6";

/// What the caller is going to do with the response body.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Expect {
    /// A document to decode as text.
    Page,
    /// Raw bytes such as an image.
    Binary,
}

/// A request to the portal, rebuilt for every attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    method: Method,
    url: Url,
    form: Option<Vec<(String, String)>>,
    cookie: Option<String>,
    expect: Expect,
    charset: &'static str,
    secret_query: bool,
}

impl PageRequest {
    pub fn get(url: Url) -> Self {
        Self {
            method: Method::GET,
            url,
            form: None,
            cookie: None,
            expect: Expect::Page,
            charset: "utf-8",
            secret_query: false,
        }
    }

    pub fn post_form<K, V>(url: Url, form: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let form = form
            .into_iter()
            .map(|(key, val)| (key.into(), val.into()))
            .collect();
        Self {
            method: Method::POST,
            form: Some(form),
            ..Self::get(url)
        }
    }

    pub fn binary(mut self) -> Self {
        self.expect = Expect::Binary;
        self
    }

    /// Charset used to decode the page when the response does not declare one.
    pub fn charset(mut self, charset: &'static str) -> Self {
        self.charset = charset;
        self
    }

    /// Keeps the query string, which carries a token, out of logs and errors.
    pub fn secret_query(mut self) -> Self {
        self.secret_query = true;
        self
    }

    pub fn with_cookie(mut self, cookie: Option<String>) -> Self {
        self.cookie = cookie;
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Url as it may be shown to the user.
    pub fn shown_url(&self) -> Cow<str> {
        match self.url.query() {
            Some(_) if self.secret_query => {
                let mut url = self.url.clone();
                url.set_query(Some("..."));
                Cow::Owned(url.into())
            }
            _ => Cow::Borrowed(self.url.as_str()),
        }
    }

    pub fn form(&self) -> Option<&[(String, String)]> {
        self.form.as_deref()
    }

    pub fn cookie(&self) -> Option<&str> {
        self.cookie.as_deref()
    }

    pub fn expect(&self) -> Expect {
        self.expect
    }

    pub fn form_value(&self, key: &str) -> Option<&str> {
        self.form()?
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Response with its body already read.
///
/// Pages are stored as UTF-8 regardless of the charset they were sent in.
#[derive(Debug, Clone)]
pub struct RawResponse {
    status: StatusCode,
    url: Url,
    headers: HeaderMap,
    body: Vec<u8>,
}

impl RawResponse {
    pub fn new(status: StatusCode, url: Url) -> Self {
        Self {
            status,
            url,
            headers: HeaderMap::new(),
            body: Vec::new(),
        }
    }

    pub fn header(mut self, name: reqwest::header::HeaderName, value: &'static str) -> Self {
        self.headers.append(name, HeaderValue::from_static(value));
        self
    }

    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    fn read(res: reqwest::blocking::Response, req: &PageRequest) -> Result<Self> {
        let status = res.status();
        let url = res.url().clone();
        let headers = res.headers().clone();
        let body = match req.expect {
            Expect::Page => res.text_with_charset(req.charset)?.into_bytes(),
            Expect::Binary => res.bytes()?.to_vec(),
        };
        Ok(Self {
            status,
            url,
            headers,
            body,
        })
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn bytes(&self) -> &[u8] {
        &self.body
    }

    pub fn text(&self) -> Cow<str> {
        String::from_utf8_lossy(&self.body)
    }

    /// Mime type without parameters, lowercased.
    pub fn content_type(&self) -> Option<String> {
        let value = self.headers.get(CONTENT_TYPE)?.to_str().ok()?;
        let mime = value.split(';').next().unwrap_or(value).trim();
        Some(mime.to_lowercase())
    }

    pub fn is_html(&self) -> bool {
        self.content_type().map_or(false, |mime| mime == "text/html")
    }

    pub fn is_json(&self) -> bool {
        self.content_type()
            .map_or(false, |mime| mime == "application/json" || mime.ends_with("+json"))
    }

    pub fn set_cookies(&self) -> Vec<String> {
        self.headers
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|val| val.to_str().ok().map(str::to_owned))
            .collect()
    }

    pub fn location_url(&self) -> Result<Url> {
        let loc_str = self
            .headers
            .get(LOCATION)
            .context("Could not find location header in response")?
            .to_str()?;
        self.url
            .join(loc_str)
            .context("Could not parse redirection url")
    }
}

/// Sends one request and reads the whole response.
///
/// Implemented by the blocking http client. Tests substitute a scripted fake.
pub trait Transport: Send + Sync {
    fn execute(&self, request: &PageRequest) -> Result<RawResponse>;
}

impl Transport for Client {
    fn execute(&self, request: &PageRequest) -> Result<RawResponse> {
        let mut builder = self
            .request(request.method.clone(), request.url.clone())
            .header(ACCEPT_LANGUAGE, ACCEPT_LANGUAGE_VALUE);
        if let Some(cookie) = &request.cookie {
            builder = builder.header(COOKIE, cookie.as_str());
        }
        if let Some(form) = &request.form {
            builder = builder.form(form);
        }
        let res = builder.send()?;
        RawResponse::read(res, request)
    }
}
