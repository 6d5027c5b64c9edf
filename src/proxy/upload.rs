//! # Multipart Upload Forwarder
//!
//! Food images arrive as `multipart/form-data` with a single `file` field. The
//! gateway reads that field, rebuilds a fresh one-part form around it and posts
//! it to the foods service. Rebuilding is what lets the outbound request carry
//! its own boundary and length instead of the caller's.

use axum::extract::multipart::{Multipart, MultipartError};
use axum::http::{header, HeaderMap, Method, StatusCode};
use axum::response::Response;
use bytes::Bytes;
use reqwest::multipart::{Form, Part};
use tracing::debug;

use crate::core::error::{GatewayError, GatewayResult};
use crate::proxy::forward::{relay_response, transport_failure, ReverseProxy};
use crate::proxy::headers::relay_headers;

/// Path the foods service accepts uploads on
pub const UPLOAD_PATH: &str = "/api/foods/upload";

/// Name of the form field carrying the file
pub const FILE_FIELD: &str = "file";

const DEFAULT_FILE_NAME: &str = "upload";

/// The `file` part of an inbound upload
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

impl UploadedFile {
    /// Read fields until the `file` field is found
    ///
    /// Other fields are skipped. A form without a `file` field, or one that fails
    /// to parse, is a bad request; `limit` is reported when the body is too large.
    pub async fn from_multipart(mut multipart: Multipart, limit: usize) -> GatewayResult<Self> {
        let read_error = |err: MultipartError| multipart_error(err, limit);
        while let Some(field) = multipart.next_field().await.map_err(read_error)? {
            if field.name() != Some(FILE_FIELD) {
                continue;
            }

            let file_name = field
                .file_name()
                .filter(|name| !name.is_empty())
                .unwrap_or(DEFAULT_FILE_NAME)
                .to_string();
            let content_type = field.content_type().map(str::to_string);
            let bytes = field.bytes().await.map_err(read_error)?;

            return Ok(Self {
                file_name,
                content_type,
                bytes,
            });
        }

        Err(GatewayError::validation(FILE_FIELD, "multipart field is required"))
    }

    fn into_part(self) -> GatewayResult<Part> {
        let part = Part::bytes(self.bytes.to_vec()).file_name(self.file_name);
        match self.content_type {
            Some(content_type) => part
                .mime_str(&content_type)
                .map_err(|e| GatewayError::validation(FILE_FIELD, format!("invalid content type: {}", e))),
            None => Ok(part),
        }
    }
}

fn multipart_error(err: MultipartError, limit: usize) -> GatewayError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        GatewayError::PayloadTooLarge { limit }
    } else {
        GatewayError::validation("multipart", err.body_text())
    }
}

/// Re-posts uploads to the owning service
#[derive(Debug, Clone)]
pub struct UploadForwarder {
    proxy: ReverseProxy,
}

impl UploadForwarder {
    pub fn new(proxy: ReverseProxy) -> Self {
        Self { proxy }
    }

    pub async fn forward(&self, file: UploadedFile, headers: &HeaderMap, service: &str) -> GatewayResult<Response> {
        let url = self.proxy.target_url(service, UPLOAD_PATH)?;
        debug!(
            service = %service,
            target = %url,
            file_name = %file.file_name,
            size = file.bytes.len(),
            "Forwarding upload"
        );

        // The form sets its own content type with a new boundary.
        let mut outbound = relay_headers(headers);
        outbound.remove(header::CONTENT_TYPE);

        let form = Form::new().part(FILE_FIELD, file.into_part()?);
        let upstream = self
            .proxy
            .client()
            .post(&url)
            .headers(outbound)
            .multipart(form)
            .send()
            .await
            .map_err(|e| transport_failure(service, &url, &e))?;

        relay_response(&Method::POST, service, &url, upstream).await
    }
}
