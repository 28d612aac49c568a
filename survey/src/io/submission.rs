//! Delivery of finished surveys to the collection endpoint.
//!
//! The [`Endpoint`] trait decouples the flow from the HTTP transport. Tests
//! use scripted endpoints that replay predetermined results without touching
//! the network.

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::blocking::Client;
use reqwest::blocking::multipart::Form;
use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;
use tracing::{debug, info, instrument, warn};

use crate::core::error::SubmissionError;
use crate::core::types::{Ack, SubmissionPayload};
use crate::io::config::{PayloadEncoding, SurveyConfig};

/// Form field carrying the JSON payload in [`PayloadEncoding::FormField`] mode.
pub const PAYLOAD_FIELD: &str = "payload";

const SUCCESS_STATUS: &str = "success";

/// Abstraction over collection endpoints.
pub trait Endpoint {
    /// Deliver `payload` once. Only an explicit success report is `Ok`.
    fn deliver(&self, payload: &SubmissionPayload) -> Result<Ack, SubmissionError>;
}

impl<E: Endpoint + ?Sized> Endpoint for &E {
    fn deliver(&self, payload: &SubmissionPayload) -> Result<Ack, SubmissionError> {
        (**self).deliver(payload)
    }
}

/// Sends submissions and retries of the exact payload previously built.
pub struct SubmissionClient<E> {
    endpoint: E,
}

impl<E: Endpoint> SubmissionClient<E> {
    pub fn new(endpoint: E) -> Self {
        Self { endpoint }
    }

    /// First delivery of a freshly built payload.
    #[instrument(skip_all, fields(set_id = %payload.set_id(), answers = payload.answers().len()))]
    pub fn submit(&self, payload: &SubmissionPayload) -> Result<Ack, SubmissionError> {
        info!("submitting answers");
        self.send(payload)
    }

    /// Resend the payload retained from the failed attempt.
    ///
    /// The payload is never rebuilt from answer state, so what is resent is
    /// exactly what failed.
    #[instrument(skip_all, fields(set_id = %last_payload.set_id(), answers = last_payload.answers().len()))]
    pub fn retry(&self, last_payload: &SubmissionPayload) -> Result<Ack, SubmissionError> {
        info!("retrying submission");
        self.send(last_payload)
    }

    fn send(&self, payload: &SubmissionPayload) -> Result<Ack, SubmissionError> {
        let result = self.endpoint.deliver(payload);
        match &result {
            Ok(ack) => debug!(message = ?ack.message, "endpoint acknowledged submission"),
            Err(err) => warn!(error = %err, "submission failed"),
        }
        result
    }
}

/// Endpoint reached over HTTP POST.
pub struct HttpEndpoint {
    client: Client,
    url: String,
    encoding: PayloadEncoding,
}

impl HttpEndpoint {
    pub fn new(url: &str, encoding: PayloadEncoding, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("build http client")?;
        Ok(Self {
            client,
            url: url.to_string(),
            encoding,
        })
    }

    pub fn from_config(cfg: &SurveyConfig) -> Result<Self> {
        let url = cfg.require_endpoint()?;
        Self::new(url, cfg.encoding, cfg.request_timeout())
    }
}

impl Endpoint for HttpEndpoint {
    fn deliver(&self, payload: &SubmissionPayload) -> Result<Ack, SubmissionError> {
        let body = payload
            .to_json()
            .map_err(|err| SubmissionError::Encoding(err.to_string()))?;
        let request = match self.encoding {
            PayloadEncoding::Json => self
                .client
                .post(&self.url)
                .header(CONTENT_TYPE, "application/json")
                .body(body),
            PayloadEncoding::FormField => self
                .client
                .post(&self.url)
                .multipart(Form::new().text(PAYLOAD_FIELD, body)),
        };
        debug!(url = %self.url, encoding = ?self.encoding, "posting submission");
        let response = request
            .send()
            .map_err(|err| SubmissionError::Transport(err.to_string()))?;
        let status = response.status().as_u16();
        let text = response
            .text()
            .map_err(|err| SubmissionError::Transport(err.to_string()))?;
        interpret_response(status, &text)
    }
}

#[derive(Debug, Deserialize)]
struct EndpointReply {
    status: Option<String>,
    message: Option<String>,
}

/// Map an HTTP status and body to an acknowledgement.
///
/// Success requires a 2xx status and a JSON body whose `status` is
/// `"success"`; anything else is an error, including a missing `status`.
pub fn interpret_response(status: u16, body: &str) -> Result<Ack, SubmissionError> {
    if !(200..300).contains(&status) {
        return Err(SubmissionError::HttpStatus(status));
    }
    let reply: EndpointReply = serde_json::from_str(body)
        .map_err(|err| SubmissionError::MalformedResponse(err.to_string()))?;
    match reply.status.as_deref() {
        Some(SUCCESS_STATUS) => Ok(Ack {
            message: reply.message,
        }),
        Some(other) => Err(SubmissionError::Rejected {
            status: other.to_string(),
            message: reply.message,
        }),
        None => Err(SubmissionError::MalformedResponse(
            "response has no status field".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use std::io::{Read, Write};
    use std::net::{TcpListener, TcpStream};
    use std::thread::{self, JoinHandle};

    use super::*;
    use crate::test_support::{ScriptedEndpoint, sample_payload};

    /// Serve one canned JSON reply on loopback; the handle yields the raw request.
    fn serve_once(reply_body: &'static str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind loopback");
        let url = format!("http://{}/collect", listener.local_addr().expect("addr"));
        let handle = thread::spawn(move || {
            let (mut stream, _) = listener.accept().expect("accept");
            let request = read_request(&mut stream);
            let reply = format!(
                "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                reply_body.len(),
                reply_body
            );
            stream.write_all(reply.as_bytes()).expect("write reply");
            request
        });
        (url, handle)
    }

    fn read_request(stream: &mut TcpStream) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let read = stream.read(&mut chunk).expect("read request");
            if read == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..read]);
            let text = String::from_utf8_lossy(&buf);
            let Some(head_end) = text.find("\r\n\r\n") else {
                continue;
            };
            let head = text[..head_end].to_ascii_lowercase();
            let body_len = buf.len() - (head_end + 4);
            let content_length = head
                .lines()
                .find_map(|line| line.strip_prefix("content-length:"))
                .and_then(|value| value.trim().parse::<usize>().ok());
            let complete = match content_length {
                Some(expected) => body_len >= expected,
                None if head.contains("transfer-encoding: chunked") => text.ends_with("0\r\n\r\n"),
                None => true,
            };
            if complete {
                break;
            }
        }
        String::from_utf8_lossy(&buf).into_owned()
    }

    #[test]
    fn success_requires_explicit_indicator() {
        let ack = interpret_response(200, r#"{"status":"success","message":"saved"}"#)
            .expect("success");
        assert_eq!(ack.message.as_deref(), Some("saved"));
    }

    #[test]
    fn other_status_values_are_rejections() {
        let err = interpret_response(200, r#"{"status":"error","message":"quota"}"#).unwrap_err();
        assert_eq!(
            err,
            SubmissionError::Rejected {
                status: "error".to_string(),
                message: Some("quota".to_string()),
            }
        );
    }

    #[test]
    fn ok_status_without_indicator_is_not_success() {
        assert!(matches!(
            interpret_response(200, "{}"),
            Err(SubmissionError::MalformedResponse(_))
        ));
        assert!(matches!(
            interpret_response(200, "<html>moved</html>"),
            Err(SubmissionError::MalformedResponse(_))
        ));
    }

    #[test]
    fn non_success_http_status_wins_over_body() {
        let err = interpret_response(502, r#"{"status":"success"}"#).unwrap_err();
        assert_eq!(err, SubmissionError::HttpStatus(502));
    }

    #[test]
    fn retry_delivers_the_same_bytes() {
        let endpoint = ScriptedEndpoint::new(vec![
            Err(SubmissionError::Transport("connection reset".to_string())),
            Ok(Ack::default()),
        ]);
        let client = SubmissionClient::new(&endpoint);
        let payload = sample_payload();

        assert!(client.submit(&payload).is_err());
        assert!(client.retry(&payload).is_ok());

        let bodies = endpoint.bodies();
        assert_eq!(bodies.len(), 2);
        assert_eq!(bodies[0], bodies[1]);
        assert_eq!(bodies[0], payload.to_json().expect("json"));
    }

    #[test]
    fn form_field_encoding_posts_payload_field() {
        let (url, server) = serve_once(r#"{"status":"success","message":"ok"}"#);
        let endpoint = HttpEndpoint::new(&url, PayloadEncoding::FormField, Duration::from_secs(5))
            .expect("endpoint");
        let payload = sample_payload();

        let ack = endpoint.deliver(&payload).expect("delivered");
        assert_eq!(ack.message.as_deref(), Some("ok"));

        let request = server.join().expect("server thread");
        assert!(request.starts_with("POST /collect"), "{request}");
        assert!(
            request
                .to_ascii_lowercase()
                .contains("content-type: multipart/form-data")
        );
        assert!(request.contains(r#"name="payload""#), "{request}");
        assert!(request.contains(&payload.to_json().expect("json")));
    }

    #[test]
    fn json_encoding_posts_raw_body_and_maps_rejection() {
        let (url, server) = serve_once(r#"{"status":"error"}"#);
        let endpoint = HttpEndpoint::new(&url, PayloadEncoding::Json, Duration::from_secs(5))
            .expect("endpoint");
        let payload = sample_payload();

        let err = endpoint.deliver(&payload).unwrap_err();
        assert_eq!(
            err,
            SubmissionError::Rejected {
                status: "error".to_string(),
                message: None,
            }
        );

        let request = server.join().expect("server thread");
        assert!(
            request
                .to_ascii_lowercase()
                .contains("content-type: application/json")
        );
        assert!(request.ends_with(&payload.to_json().expect("json")), "{request}");
    }

    #[test]
    fn http_endpoint_requires_configured_url() {
        let cfg = SurveyConfig::default();
        assert!(HttpEndpoint::from_config(&cfg).is_err());
    }
}
