//! Scripted in-memory transport.
//!
//! Routes are matched by method and URL prefix relative to the test base URL
//! (the longest matching prefix wins). Each route plays back a script of
//! responses; the last entry repeats once the script is exhausted. Unmatched
//! requests get a 404.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use webdrops::{HttpRequest, HttpResponse, Result, Transport, WebdropsError};

use crate::fixtures::{self, AUTH_URL, BASE_URL};

/// One scripted reply.
#[derive(Debug, Clone)]
pub enum Scripted {
    Respond(HttpResponse),
    /// Network failure with no response
    Fail(String),
    /// Wait, then respond
    Delayed(Duration, HttpResponse),
}

impl Scripted {
    pub fn ok_json(body: impl Into<String>) -> Self {
        Scripted::Respond(HttpResponse::new(
            StatusCode::OK,
            Some("application/json"),
            body.into(),
        ))
    }

    pub fn ok_binary(body: &[u8]) -> Self {
        Scripted::Respond(HttpResponse::new(
            StatusCode::OK,
            Some("application/octet-stream"),
            body.to_vec(),
        ))
    }

    pub fn status(status: u16) -> Self {
        Scripted::Respond(HttpResponse::new(
            StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            Some("text/plain"),
            format!("scripted status {}", status),
        ))
    }
}

struct Route {
    method: Method,
    url: String,
    script: VecDeque<Scripted>,
}

/// Fake webdrops upstream.
#[derive(Default)]
pub struct FakeTransport {
    routes: Mutex<Vec<Route>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// A fake whose token endpoint always grants a 300 s token.
    pub fn with_login() -> Self {
        let fake = Self::new();
        fake.script_auth(vec![Scripted::ok_json(fixtures::token_response(
            "access-1", "refresh-1", 300,
        ))]);
        fake
    }

    /// Script the token endpoint.
    pub fn script_auth(&self, script: Vec<Scripted>) {
        self.add_route(Method::POST, AUTH_URL.to_string(), script);
    }

    /// Script a route; `path` is relative to the base URL.
    pub fn script(&self, method: &str, path: &str, script: Vec<Scripted>) {
        let method = Method::from_bytes(method.as_bytes()).unwrap_or(Method::GET);
        self.add_route(method, format!("{}{}", BASE_URL, path), script);
    }

    /// Always answer `path` with a JSON body.
    pub fn respond_json(&self, method: &str, path: &str, body: impl Into<String>) {
        self.script(method, path, vec![Scripted::ok_json(body)]);
    }

    /// Always answer `path` with a binary body.
    pub fn respond_binary(&self, method: &str, path: &str, body: &[u8]) {
        self.script(method, path, vec![Scripted::ok_binary(body)]);
    }

    fn add_route(&self, method: Method, url: String, script: Vec<Scripted>) {
        let mut routes = self.routes.lock().unwrap();
        routes.retain(|r| !(r.method == method && r.url == url));
        routes.push(Route {
            method,
            url,
            script: script.into(),
        });
    }

    /// Every request received so far.
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Number of requests whose URL starts with base URL + `path`.
    pub fn count(&self, method: &str, path: &str) -> usize {
        let prefix = format!("{}{}", BASE_URL, path);
        self.count_url(method, &prefix)
    }

    /// Number of requests to the token endpoint.
    pub fn auth_count(&self) -> usize {
        self.count_url("POST", AUTH_URL)
    }

    fn count_url(&self, method: &str, prefix: &str) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.method.as_str() == method && r.url.starts_with(prefix))
            .count()
    }

    fn next_reply(&self, request: &HttpRequest) -> Option<Scripted> {
        let mut routes = self.routes.lock().unwrap();
        let route = routes
            .iter_mut()
            .filter(|r| r.method == request.method && request.url.starts_with(&r.url))
            .max_by_key(|r| r.url.len())?;

        if route.script.len() > 1 {
            route.script.pop_front()
        } else {
            route.script.front().cloned()
        }
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        self.requests.lock().unwrap().push(request.clone());

        match self.next_reply(&request) {
            Some(Scripted::Respond(response)) => Ok(response),
            Some(Scripted::Delayed(delay, response)) => {
                tokio::time::sleep(delay).await;
                Ok(response)
            }
            Some(Scripted::Fail(message)) => Err(WebdropsError::Transport {
                url: request.url,
                status: None,
                message,
            }),
            None => Ok(HttpResponse::new(
                StatusCode::NOT_FOUND,
                Some("text/plain"),
                format!("no route for {} {}", request.method, request.url),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::assert_ok;

    #[tokio::test]
    async fn test_script_plays_in_order_then_repeats() {
        let fake = FakeTransport::new();
        fake.script("GET", "a", vec![Scripted::status(500), Scripted::ok_json("[]")]);

        let url = format!("{}a", BASE_URL);
        let first = assert_ok!(fake.execute(HttpRequest::get(&url)).await);
        let second = assert_ok!(fake.execute(HttpRequest::get(&url)).await);
        let third = assert_ok!(fake.execute(HttpRequest::get(&url)).await);

        assert_eq!(first.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(second.status, StatusCode::OK);
        assert_eq!(third.status, StatusCode::OK);
        assert_eq!(fake.count("GET", "a"), 3);
    }

    #[tokio::test]
    async fn test_longest_prefix_wins() {
        let fake = FakeTransport::new();
        fake.respond_json("GET", "coverages/X/", "[\"timeline\"]");
        fake.respond_binary("GET", "coverages/X/2023", b"data");

        let data = assert_ok!(
            fake.execute(HttpRequest::get(format!("{}coverages/X/202306011200/X/-/all", BASE_URL)))
                .await
        );
        assert_eq!(&data.body[..], b"data");

        let missing =
            assert_ok!(fake.execute(HttpRequest::get(format!("{}elsewhere", BASE_URL))).await);
        assert_eq!(missing.status, StatusCode::NOT_FOUND);
    }
}
