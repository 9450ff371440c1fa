use std::io::Write as _;
use std::time::Duration;

use reqwest::StatusCode;
use retry::{delay, retry, OperationResult};

use crate::config::SessionConfig;
use crate::service::{PageRequest, RawResponse, Transport};
use crate::{Console, Error, PortalError, Result};

/// Sends requests through a transport, logging one line per attempt.
///
/// Not found, server errors and network failures are retried with a fixed
/// delay. Everything else is returned to the caller as is.
pub struct Sender<'a> {
    transport: &'a dyn Transport,
    retry_limit: usize,
    retry_interval: Duration,
}

impl<'a> Sender<'a> {
    pub fn new(transport: &'a dyn Transport, conf: &SessionConfig) -> Self {
        Self {
            transport,
            retry_limit: conf.retry_limit(),
            retry_interval: conf.retry_interval(),
        }
    }

    pub fn send_pretty(&self, req: &PageRequest, cnsl: &mut Console) -> Result<RawResponse> {
        write!(cnsl, "{:7} {} ... ", req.method().as_str(), req.shown_url()).unwrap_or(());
        let result = self.transport.execute(req).map_err(|err| {
            Error::from(PortalError::TransportFailure(format!(
                "{} {} : {:#}",
                req.method(),
                req.shown_url(),
                err
            )))
        });
        match &result {
            Ok(res) => writeln!(cnsl, "{}", res.status()),
            Err(_) => writeln!(cnsl, "failed"),
        }
        .unwrap_or(());
        result
    }

    pub fn retry_send(&self, req: &PageRequest, cnsl: &mut Console) -> Result<RawResponse> {
        let retry_interval = self.retry_interval.as_millis() as u64;
        let durations = delay::Fixed::from_millis(retry_interval).take(self.retry_limit);
        retry(durations, || match self.send_pretty(req, cnsl) {
            Ok(res) if res.status() == StatusCode::NOT_FOUND => OperationResult::Retry(
                PortalError::TransientNotFound(req.shown_url().into_owned()).into(),
            ),
            Ok(res) if res.status().is_server_error() => {
                OperationResult::Retry(PortalError::TransportFailure(format!(
                    "{} answered {}",
                    req.shown_url(),
                    res.status()
                ))
                .into())
            }
            Ok(res) => OperationResult::Ok(res),
            Err(err) => OperationResult::Retry(err),
        })
        .map_err(|err| match err {
            retry::Error::Operation { error, tries, .. } => {
                match error.downcast_ref::<PortalError>() {
                    Some(PortalError::TransientNotFound(url)) => PortalError::Timeout(format!(
                        "{} answered not found {} times",
                        url, tries
                    ))
                    .into(),
                    _ => error,
                }
            }
            retry::Error::Internal(msg) => Error::msg(msg),
        })
    }
}
