use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use super::transport::{HttpReply, HttpRequest, HttpTransport, TransportError};

#[derive(Debug, Clone)]
pub enum Scripted {
    Reply(HttpReply),
    Fail(String),
    /// Never resolves; exercises the per-attempt timeout.
    Hang,
}

struct Route {
    pattern: String,
    replies: VecDeque<Scripted>,
}

/// Deterministic upstream: the first route whose pattern is a substring of the
/// request URL answers. Queued replies are consumed in order and the last one
/// repeats forever.
#[derive(Default)]
pub struct ScriptedTransport {
    routes: Mutex<Vec<Route>>,
    calls: Mutex<Vec<HttpRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(self, pattern: &str, reply: Scripted) -> Self {
        {
            let mut routes = self.routes.lock().unwrap();
            match routes.iter_mut().find(|route| route.pattern == pattern) {
                Some(route) => route.replies.push_back(reply),
                None => routes.push(Route {
                    pattern: pattern.to_string(),
                    replies: VecDeque::from([reply]),
                }),
            }
        }
        self
    }

    pub fn json(self, pattern: &str, body: Value) -> Self {
        self.on(pattern, Scripted::Reply(HttpReply::new(200, body.to_string())))
    }

    pub fn status(self, pattern: &str, status: u16, body: &str) -> Self {
        self.on(pattern, Scripted::Reply(HttpReply::new(status, body)))
    }

    pub fn fail(self, pattern: &str, message: &str) -> Self {
        self.on(pattern, Scripted::Fail(message.to_string()))
    }

    pub fn calls(&self) -> Vec<HttpRequest> {
        self.calls.lock().unwrap().clone()
    }

    pub fn urls(&self) -> Vec<String> {
        self.calls().into_iter().map(|request| request.url).collect()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    fn next_reply(&self, url: &str) -> Option<Scripted> {
        let mut routes = self.routes.lock().unwrap();
        let route = routes
            .iter_mut()
            .find(|route| url.contains(&route.pattern))?;
        if route.replies.len() > 1 {
            route.replies.pop_front()
        } else {
            route.replies.front().cloned()
        }
    }
}

#[async_trait]
impl HttpTransport for ScriptedTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpReply, TransportError> {
        let url = request.url.clone();
        self.calls.lock().unwrap().push(request);

        match self.next_reply(&url) {
            Some(Scripted::Reply(reply)) => Ok(reply),
            Some(Scripted::Fail(message)) => Err(TransportError::new(message)),
            Some(Scripted::Hang) => std::future::pending().await,
            None => Err(TransportError::new(format!("no scripted reply for {url}"))),
        }
    }
}
