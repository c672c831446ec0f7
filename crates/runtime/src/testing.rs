//! Scripted transport for workflow tests

use async_trait::async_trait;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Mutex;

use crate::error::ApiError;
use crate::transport::{ApiRequest, ApiResponse, ApiTransport, HttpMethod};

struct Route {
    method: HttpMethod,
    path: String,
    responses: VecDeque<ApiResponse>,
}

/// Answers requests from per-route queues and records every request.
///
/// The last queued response of a route is repeated; unknown routes get a 404.
#[derive(Default)]
pub struct MockTransport {
    routes: Mutex<Vec<Route>>,
    requests: Mutex<Vec<ApiRequest>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(self, method: HttpMethod, path: &str, status: u16, body: Value) -> Self {
        self.push(method, path, ApiResponse::from_json(status, &body));
        self
    }

    pub fn push(&self, method: HttpMethod, path: &str, response: ApiResponse) {
        let mut routes = self.routes.lock().unwrap();
        match routes
            .iter_mut()
            .find(|r| r.method == method && r.path == path)
        {
            Some(route) => route.responses.push_back(response),
            None => routes.push(Route {
                method,
                path: path.to_string(),
                responses: VecDeque::from([response]),
            }),
        }
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// `"METHOD path"` of every request, in order.
    pub fn calls(&self) -> Vec<String> {
        self.requests()
            .iter()
            .map(|r| format!("{} {}", r.method, r.path))
            .collect()
    }

    pub fn find(&self, method: HttpMethod, path: &str) -> Option<ApiRequest> {
        self.requests()
            .into_iter()
            .find(|r| r.method == method && r.path == path)
    }
}

#[async_trait]
impl ApiTransport for MockTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, ApiError> {
        self.requests.lock().unwrap().push(request.clone());

        let mut routes = self.routes.lock().unwrap();
        let response = routes
            .iter_mut()
            .find(|r| r.method == request.method && r.path == request.path)
            .and_then(|route| {
                if route.responses.len() > 1 {
                    route.responses.pop_front()
                } else {
                    route.responses.front().cloned()
                }
            });

        Ok(response.unwrap_or_else(|| ApiResponse::new(404, r#"{"title":"Not Found"}"#)))
    }
}
