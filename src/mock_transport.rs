//! In-memory transport for unit tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::{OrshotError, Result};
use crate::transport::{HttpRequest, HttpResponse, OrshotTransport, ResponseBody, ResponseEncoding};
use crate::types::Credentials;

/// Replays queued responses in order and records every request.
pub(crate) struct MockTransport {
    credentials: Credentials,
    responses: Mutex<VecDeque<Result<(u16, Vec<u8>)>>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl MockTransport {
    pub(crate) fn new() -> Self {
        Self {
            credentials: Credentials::new("test-token", "https://api.orshot.test"),
            responses: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn respond(self, status: u16, body: impl AsRef<[u8]>) -> Self {
        self.responses
            .lock()
            .unwrap()
            .push_back(Ok((status, body.as_ref().to_vec())));
        self
    }

    pub(crate) fn fail(self, message: &str) -> Self {
        self.responses
            .lock()
            .unwrap()
            .push_back(Err(OrshotError::transport(message)));
        self
    }

    pub(crate) fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl OrshotTransport for MockTransport {
    fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    async fn request(&self, request: HttpRequest) -> Result<HttpResponse> {
        let encoding = request.encoding;
        self.requests.lock().unwrap().push(request);

        let (status, body) = self
            .responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(OrshotError::transport("no response queued")))?;

        let body = match encoding {
            ResponseEncoding::Binary => ResponseBody::Binary(Bytes::from(body)),
            ResponseEncoding::Text => {
                ResponseBody::Text(String::from_utf8_lossy(&body).into_owned())
            }
        };

        Ok(HttpResponse {
            status,
            status_text: String::new(),
            body,
        })
    }
}
