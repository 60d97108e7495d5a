//! Typed view over a completed HTTP response.

use std::any::type_name;
use std::fmt;
use std::marker::PhantomData;

use bytes::Bytes;
use serde::de::DeserializeOwned;

use crate::error::ApiError;
use crate::http::{HttpResponse, ResponseFormat};

/// A response body decoded according to its `ResponseFormat`.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    Json(serde_json::Value),
    Text(String),
    Bytes(Bytes),
}

/// The result of one endpoint call.
///
/// `T` is the success shape and `E` the declared error shape. The body is
/// kept as raw bytes and decoded only when an accessor asks for it.
pub struct ApiResponse<T, E> {
    status: u16,
    headers: Vec<(String, String)>,
    body: Bytes,
    format: ResponseFormat,
    _shape: PhantomData<fn() -> (T, E)>,
}

impl<T, E> fmt::Debug for ApiResponse<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiResponse")
            .field("status", &self.status)
            .field("format", &self.format)
            .field("body_len", &self.body.len())
            .finish()
    }
}

impl<T, E> ApiResponse<T, E> {
    pub fn new(response: HttpResponse, format: ResponseFormat) -> Self {
        Self {
            status: response.status,
            headers: response.headers,
            body: response.body,
            format,
            _shape: PhantomData,
        }
    }

    /// True when the status is in `200..300`.
    pub fn ok(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn format(&self) -> ResponseFormat {
        self.format
    }

    pub fn bytes(&self) -> &Bytes {
        &self.body
    }

    pub fn text(&self) -> Result<String, ApiError> {
        String::from_utf8(self.body.to_vec()).map_err(|e| ApiError::SchemaMismatch {
            expected: "UTF-8 text",
            message: e.to_string(),
        })
    }

    /// Decode the body according to the declared response format. An empty
    /// JSON body decodes to `null`.
    pub fn body(&self) -> Result<ResponseBody, ApiError> {
        match self.format {
            ResponseFormat::Json if self.body.is_empty() => {
                Ok(ResponseBody::Json(serde_json::Value::Null))
            }
            ResponseFormat::Json => serde_json::from_slice(&self.body)
                .map(ResponseBody::Json)
                .map_err(|e| ApiError::SchemaMismatch {
                    expected: "JSON",
                    message: e.to_string(),
                }),
            ResponseFormat::Text => self.text().map(ResponseBody::Text),
            ResponseFormat::Bytes => Ok(ResponseBody::Bytes(self.body.clone())),
        }
    }

    /// Reinterpret the same response under another declared contract.
    pub fn cast<U, F>(self) -> ApiResponse<U, F> {
        ApiResponse {
            status: self.status,
            headers: self.headers,
            body: self.body,
            format: self.format,
            _shape: PhantomData,
        }
    }

    fn decode<V: DeserializeOwned>(&self) -> Result<V, ApiError> {
        serde_json::from_slice(&self.body).map_err(|e| ApiError::SchemaMismatch {
            expected: type_name::<V>(),
            message: e.to_string(),
        })
    }
}

impl<T: DeserializeOwned, E> ApiResponse<T, E> {
    /// Decode the success payload. A non-2xx status yields `ApiError::Http`
    /// carrying the raw body.
    pub fn data(&self) -> Result<T, ApiError> {
        if !self.ok() {
            return Err(ApiError::Http {
                status: self.status,
                body: String::from_utf8_lossy(&self.body).into_owned(),
            });
        }
        self.decode()
    }
}

impl<T, E: DeserializeOwned> ApiResponse<T, E> {
    /// Decode the declared error payload. `None` for 2xx responses.
    pub fn error(&self) -> Result<Option<E>, ApiError> {
        if self.ok() {
            return Ok(None);
        }
        self.decode().map(Some)
    }
}
