use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use anyhow::anyhow;
use reqwest::header::{HeaderName, CONTENT_TYPE, LOCATION, SET_COOKIE};
use reqwest::StatusCode;

use crate::service::{PageRequest, RawResponse, Transport};
use crate::Result;

#[derive(Debug, Clone)]
struct Canned {
    status: StatusCode,
    headers: Vec<(HeaderName, &'static str)>,
    body: Vec<u8>,
}

#[derive(Debug)]
struct Route {
    pattern: &'static str,
    responses: VecDeque<Canned>,
    always: bool,
}

/// Transport answering from a script instead of the network.
///
/// A request is matched against routes in the order they were added, by url
/// substring. One-shot responses are consumed in order. A request no route
/// answers fails like a network error. Clones share the script and the log
/// of requests.
#[derive(Debug, Default, Clone)]
pub struct FakeTransport {
    routes: Arc<Mutex<Vec<Route>>>,
    requests: Arc<Mutex<Vec<PageRequest>>>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(self, pattern: &'static str, canned: Canned, always: bool) -> Self {
        {
            let mut routes = self.routes.lock().unwrap();
            let existing = routes
                .iter()
                .position(|route| route.pattern == pattern && !route.always);
            match existing {
                Some(pos) if !always => routes[pos].responses.push_back(canned),
                _ => routes.push(Route {
                    pattern,
                    responses: vec![canned].into(),
                    always,
                }),
            }
        }
        self
    }

    fn canned(status: StatusCode, content_type: &'static str, body: &str) -> Canned {
        let mut headers = Vec::new();
        if !content_type.is_empty() {
            headers.push((CONTENT_TYPE, content_type));
        }
        Canned {
            status,
            headers,
            body: body.as_bytes().to_vec(),
        }
    }

    pub fn respond(
        self,
        pattern: &'static str,
        status: StatusCode,
        content_type: &'static str,
        body: &str,
    ) -> Self {
        self.push(pattern, Self::canned(status, content_type, body), false)
    }

    pub fn respond_always(
        self,
        pattern: &'static str,
        status: StatusCode,
        content_type: &'static str,
        body: &str,
    ) -> Self {
        self.push(pattern, Self::canned(status, content_type, body), true)
    }

    pub fn json(self, pattern: &'static str, body: &str) -> Self {
        self.respond(pattern, StatusCode::OK, "application/json;charset=UTF-8", body)
    }

    pub fn html(self, pattern: &'static str, body: &str) -> Self {
        self.respond(pattern, StatusCode::OK, "text/html;charset=GBK", body)
    }

    /// Binary response; an empty `content_type` leaves the header out.
    pub fn image(self, pattern: &'static str, content_type: &'static str, bytes: &[u8]) -> Self {
        let mut canned = Self::canned(StatusCode::OK, content_type, "");
        canned.body = bytes.to_vec();
        self.push(pattern, canned, false)
    }

    pub fn set_cookie(self, pattern: &'static str, status: StatusCode, cookies: &[&'static str]) -> Self {
        let mut canned = Self::canned(status, "text/html", "");
        canned
            .headers
            .extend(cookies.iter().map(|cookie| (SET_COOKIE, *cookie)));
        self.push(pattern, canned, false)
    }

    pub fn redirect(self, pattern: &'static str, location: &'static str) -> Self {
        let mut canned = Self::canned(StatusCode::FOUND, "text/html", "");
        canned.headers.push((LOCATION, location));
        self.push(pattern, canned, false)
    }

    /// Number of requests sent to urls containing `pattern`.
    pub fn count(&self, pattern: &str) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|req| req.url().as_str().contains(pattern))
            .count()
    }

    pub fn total(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<PageRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl Transport for FakeTransport {
    fn execute(&self, request: &PageRequest) -> Result<RawResponse> {
        self.requests.lock().unwrap().push(request.clone());
        let url = request.url().as_str();
        let mut routes = self.routes.lock().unwrap();
        let route = routes
            .iter_mut()
            .find(|route| url.contains(route.pattern) && !route.responses.is_empty())
            .ok_or_else(|| anyhow!("connection refused : {}", url))?;
        let canned = if route.always {
            route.responses[0].clone()
        } else {
            route
                .responses
                .pop_front()
                .ok_or_else(|| anyhow!("no response left"))?
        };
        let res = canned
            .headers
            .iter()
            .fold(
                RawResponse::new(canned.status, request.url().clone()),
                |res, (name, value)| res.header(name.clone(), *value),
            )
            .body(canned.body);
        Ok(res)
    }
}
