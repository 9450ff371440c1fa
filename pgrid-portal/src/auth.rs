use std::io::Write as _;

use reqwest::{StatusCode, Url};
use scraper::Html;
use serde::Deserialize;

use crate::fetch::Sender;
use crate::model::Credential;
use crate::schema::BASE_URL;
use crate::service::scrape::Scrape as _;
use crate::service::{PageRequest, RawResponse, SessionStore};
use crate::{Console, PortalError, Result};
use pgrid_util::select;

/// Exchanges a credential for a session.
///
/// Returns `Ok(false)` when the portal rejects the credential or does not hand
/// out a session; errors are reserved for transport and content failures.
pub trait Authenticate: Send + Sync {
    fn login(
        &self,
        sender: &Sender,
        session: &SessionStore,
        fixed_cookie: Option<String>,
        credential: &Credential,
        cnsl: &mut Console,
    ) -> Result<bool>;
}

fn store_session(
    session: &SessionStore,
    res: &RawResponse,
    cnsl: &mut Console,
) -> Result<bool> {
    let cookies = res.set_cookies();
    if cookies.is_empty() {
        cnsl.warn("Portal did not start a session")?;
        return Ok(false);
    }
    let count = session.set_session(&cookies, res.url())?;
    writeln!(cnsl, "Stored {} session cookie(s)", count)?;
    Ok(count > 0)
}

/// Single sign-on through the university identity provider.
///
/// The provider answers a form post with a token which the portal's callback
/// turns into session cookies.
#[derive(Debug, Default, Clone)]
pub struct IaaaAuth;

#[derive(Deserialize, Debug)]
struct IaaaReply {
    #[serde(default)]
    success: bool,
    token: Option<String>,
    errors: Option<IaaaErrors>,
}

#[derive(Deserialize, Debug)]
struct IaaaErrors {
    msg: Option<String>,
}

impl IaaaAuth {
    const LOGIN_URL: &'static str = "https://iaaa.pku.edu.cn/iaaa/oauthlogin.do";
    const APP_ID: &'static str = "ProgrammingGrid";
    const CALLBACK_PATH: &'static str = "/authcallback";

    fn callback_url() -> Result<Url> {
        Ok(BASE_URL.join(Self::CALLBACK_PATH)?)
    }
}

impl Authenticate for IaaaAuth {
    fn login(
        &self,
        sender: &Sender,
        session: &SessionStore,
        fixed_cookie: Option<String>,
        credential: &Credential,
        cnsl: &mut Console,
    ) -> Result<bool> {
        let callback = Self::callback_url()?;
        let form = vec![
            ("appid", Self::APP_ID),
            ("userName", credential.username().as_str()),
            ("password", credential.password().as_str()),
            ("randCode", ""),
            ("smsCode", ""),
            ("otpCode", ""),
            ("redirUrl", callback.as_str()),
        ];
        let req = PageRequest::post_form(Url::parse(Self::LOGIN_URL)?, form);
        let res = sender.retry_send(&req, cnsl)?;
        let reply: IaaaReply = serde_json::from_slice(res.bytes()).map_err(|err| {
            PortalError::MalformedResponse(format!("identity provider reply : {}", err))
        })?;
        let token = match reply.token {
            Some(token) if reply.success && !token.is_empty() => token,
            _ => {
                let reason = reply
                    .errors
                    .and_then(|errors| errors.msg)
                    .unwrap_or_else(|| String::from("no reason given"));
                cnsl.warn(&format!("Identity provider rejected the login ({})", reason))?;
                return Ok(false);
            }
        };

        let nonce = rand::random::<f64>().to_string();
        let url = Url::parse_with_params(
            callback.as_str(),
            &[("_rand", nonce.as_str()), ("token", token.as_str())],
        )?;
        let req = PageRequest::get(url)
            .secret_query()
            .with_cookie(fixed_cookie);
        let res = sender.retry_send(&req, cnsl)?;
        store_session(session, &res, cnsl)
    }
}

/// Form login of the old portal pages.
#[derive(Debug, Default, Clone)]
pub struct FormAuth;

impl FormAuth {
    const LOGIN_PATH: &'static str = "/programming/login.do";
}

impl Authenticate for FormAuth {
    fn login(
        &self,
        sender: &Sender,
        session: &SessionStore,
        fixed_cookie: Option<String>,
        credential: &Credential,
        cnsl: &mut Console,
    ) -> Result<bool> {
        let form = vec![
            ("username", credential.username().as_str()),
            ("password", credential.password().as_str()),
        ];
        let req = PageRequest::post_form(BASE_URL.join(Self::LOGIN_PATH)?, form)
            .charset("gbk")
            .with_cookie(fixed_cookie);
        let res = sender.retry_send(&req, cnsl)?;
        let shows_login_form = Html::parse_document(&res.text())
            .find_first(select!("input[type=\"password\"]"))
            .is_some();
        if shows_login_form || !(res.status().is_success() || res.status() == StatusCode::FOUND) {
            cnsl.warn("Portal rejected the username or password")?;
            return Ok(false);
        }
        store_session(session, &res, cnsl)
    }
}
