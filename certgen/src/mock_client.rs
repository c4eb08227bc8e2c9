// SPDX-License-Identifier: MIT

//! A `kube::Client` backed by an in-process handler instead of an API server.
//!
//! Every request is recorded so tests can assert on what was written and in
//! which order.

use std::convert::Infallible;
use std::sync::{Arc, Mutex};

use http::{Method, Request, Response, StatusCode};
use http_body_util::BodyExt;
use kube::{Client, client::Body, error::ErrorResponse};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tower::service_fn;

macro_rules! assert_kube_api_error {
    ($err:expr, $code:expr) => {{
        let source = std::error::Error::source(&$err)
            .and_then(|s| s.downcast_ref::<kube::Error>())
            .unwrap_or_else(|| panic!("Expected a kube::Error source, got: {:?}", $err));

        if let kube::Error::Api(error_response) = source {
            assert_eq!(error_response.code, $code);
            assert_eq!(error_response.status, "Failure");
        } else {
            panic!("Expected kube::Error::Api, got: {:?}", source);
        }
    }};
}

pub(crate) use assert_kube_api_error;

#[derive(Clone, Debug)]
pub struct Recorded {
    pub method: Method,
    pub path: String,
    pub body: Vec<u8>,
}

impl Recorded {
    pub fn is(&self, method: Method, path: &str) -> bool {
        self.method == method && self.path == path
    }

    pub fn json<T: DeserializeOwned>(&self) -> T {
        serde_json::from_slice(&self.body).expect("request body is not the expected JSON")
    }
}

#[derive(Clone, Default)]
pub struct Recorder(Arc<Mutex<Vec<Recorded>>>);

impl Recorder {
    pub fn requests(&self) -> Vec<Recorded> {
        self.0.lock().unwrap().clone()
    }

    /// Recorded POST, PUT and PATCH requests, in order.
    pub fn writes(&self) -> Vec<Recorded> {
        self.requests()
            .into_iter()
            .filter(|r| [Method::POST, Method::PUT, Method::PATCH].contains(&r.method))
            .collect()
    }

    fn push(&self, request: Recorded) {
        self.0.lock().unwrap().push(request);
    }
}

fn create_response(response: Result<String, StatusCode>) -> Result<Response<Body>, Infallible> {
    let (body, status_code) = match response {
        Ok(response_data) => (Body::from(response_data.into_bytes()), StatusCode::OK),
        Err(status_code) => {
            let unknown_msg = format!("error with status code {status_code}");
            let (message, reason) = match status_code {
                StatusCode::CONFLICT => ("resource already exists", "AlreadyExists"),
                StatusCode::INTERNAL_SERVER_ERROR => ("internal server error", "ServerTimeout"),
                StatusCode::NOT_FOUND => ("resource not found", "NotFound"),
                StatusCode::BAD_REQUEST => ("bad request", "BadRequest"),
                _ => (unknown_msg.as_str(), "Unknown"),
            };
            let error_response = ErrorResponse {
                status: "Failure".to_string(),
                message: message.to_string(),
                reason: reason.to_string(),
                code: status_code.as_u16(),
            };
            let error_json = serde_json::to_string(&error_response).unwrap();
            (Body::from(error_json.into_bytes()), status_code)
        }
    };
    Ok(Response::builder().status(status_code).body(body).unwrap())
}

/// Answer with `value` serialized as JSON.
pub fn to_json<T: Serialize>(value: &T) -> Result<String, StatusCode> {
    Ok(serde_json::to_string(value).unwrap())
}

/// Answer a write with the object that was sent, like a successful update.
pub fn echo(request: &Recorded) -> Result<String, StatusCode> {
    Ok(String::from_utf8(request.body.clone()).unwrap())
}

pub struct MockClient<F>
where
    F: Fn(&Recorded) -> Result<String, StatusCode> + Send + Sync + 'static,
{
    handler: F,
    namespace: String,
}

impl<F> MockClient<F>
where
    F: Fn(&Recorded) -> Result<String, StatusCode> + Send + Sync + 'static,
{
    pub fn new(handler: F, namespace: &str) -> Self {
        Self {
            handler,
            namespace: namespace.to_string(),
        }
    }

    pub fn into_client(self) -> (Client, Recorder) {
        let recorder = Recorder::default();
        let requests = recorder.clone();
        let handler = Arc::new(self.handler);
        let mock_svc = service_fn(move |req: Request<Body>| {
            let handler = handler.clone();
            let requests = requests.clone();
            async move {
                let (parts, body) = req.into_parts();
                let body = match body.collect().await {
                    Ok(collected) => collected.to_bytes().to_vec(),
                    Err(_) => Vec::new(),
                };
                let request = Recorded {
                    method: parts.method,
                    path: parts.uri.path().to_string(),
                    body,
                };
                let response = handler(&request);
                requests.push(request);
                create_response(response)
            }
        });
        (Client::new(mock_svc, self.namespace), recorder)
    }
}
