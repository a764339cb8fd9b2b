//! Typed client for the document-management service's OTP endpoints.
//!
//! The remote API exposes two calls used by the login flow: `generateOTP`
//! (issue a code to a mobile number) and `validateOTP` (exchange number +
//! code for a session token). Both speak JSON. The service reports
//! application failures two ways: a non-2xx HTTP status, or a 200 body
//! carrying `status: "error"` with a message. Both surface here as
//! [`ApiError`] variants so callers never have to inspect raw responses.

use serde::{Deserialize, Serialize};

pub use reqwest::StatusCode;

/// Production endpoint. Override with `DMS_API_URL`.
pub const DEFAULT_BASE_URL: &str = "https://apis.allsoft.co/api/documentManagement";

/// Error type for API operations
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The server answered with a non-2xx status. Carries the body's
    /// `message` field when the body was decodable.
    #[error("server returned {code}")]
    Status {
        code: StatusCode,
        message: Option<String>,
    },

    /// A 2xx response whose body reported `status: "error"`.
    #[error("server reported an error")]
    ErrorStatus { message: Option<String> },

    /// A validate response that did not carry a non-empty `token` field.
    /// The token is a required part of the contract; an ambiguous response
    /// is rejected rather than guessed at.
    #[error("response did not carry a session token")]
    MissingToken,

    /// No response was received at all.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
}

impl ApiError {
    /// HTTP status of the response, when there was one.
    pub fn status_code(&self) -> Option<StatusCode> {
        match self {
            ApiError::Status { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Message supplied by the server, when there was one.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            ApiError::Status { message, .. } | ApiError::ErrorStatus { message } => {
                message.as_deref()
            }
            _ => None,
        }
    }
}

#[derive(Debug, Serialize)]
struct GenerateOtpRequest<'a> {
    mobile_number: &'a str,
}

#[derive(Debug, Serialize)]
struct ValidateOtpRequest<'a> {
    mobile_number: &'a str,
    otp: &'a str,
}

/// Response envelope shared by both endpoints. Every field is optional on
/// the wire; which ones must be present is enforced per operation.
#[derive(Debug, Default, Deserialize)]
struct ApiEnvelope {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    token: Option<String>,
}

/// Client for the document-management service.
#[derive(Debug, Clone)]
pub struct DmsClient {
    http: reqwest::Client,
    base_url: String,
}

impl DmsClient {
    /// Create a client against the given base URL.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }

    /// Create a client from the `DMS_API_URL` environment variable,
    /// falling back to the production endpoint.
    pub fn from_env() -> Self {
        let url = std::env::var("DMS_API_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        Self::new(url)
    }

    /// Ask the service to send an OTP to `mobile_number`.
    pub async fn generate_otp(&self, mobile_number: &str) -> Result<(), ApiError> {
        tracing::debug!(mobile_number, "requesting OTP generation");
        self.post("generateOTP", &GenerateOtpRequest { mobile_number })
            .await
            .map(|_| ())
    }

    /// Exchange `mobile_number` + `otp` for a session token. The token is
    /// required; a success-shaped response without one is an error.
    pub async fn validate_otp(&self, mobile_number: &str, otp: &str) -> Result<String, ApiError> {
        tracing::debug!(mobile_number, "validating OTP");
        let envelope = self
            .post("validateOTP", &ValidateOtpRequest { mobile_number, otp })
            .await?;
        match envelope.token {
            Some(token) if !token.is_empty() => Ok(token),
            _ => Err(ApiError::MissingToken),
        }
    }

    async fn post<B: Serialize>(&self, path: &str, body: &B) -> Result<ApiEnvelope, ApiError> {
        let url = format!("{}/{}", self.base_url.trim_end_matches('/'), path);
        let response = self.http.post(&url).json(body).send().await?;
        let code = response.status();
        let text = response.text().await?;
        // Undecodable bodies degrade to an envelope with no fields; the
        // status code still decides the outcome.
        let envelope: ApiEnvelope = serde_json::from_str(&text).unwrap_or_default();
        if !code.is_success() {
            tracing::warn!(%code, path, "API call failed");
            return Err(ApiError::Status {
                code,
                message: envelope.message,
            });
        }
        if envelope.status.as_deref() == Some("error") {
            tracing::warn!(path, message = ?envelope.message, "API reported an error");
            return Err(ApiError::ErrorStatus {
                message: envelope.message,
            });
        }
        Ok(envelope)
    }
}
