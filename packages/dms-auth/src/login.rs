//! Login step: mobile-number capture and OTP issuance.

use std::sync::Arc;

use crate::api::OtpApi;
use crate::messages;

/// Local check used before any network call: exactly 10 digits, first
/// digit 6-9 (Indian mobile numbering).
pub fn validate_mobile_number(number: &str) -> bool {
    let bytes = number.as_bytes();
    bytes.len() == 10
        && matches!(bytes[0], b'6'..=b'9')
        && bytes.iter().all(u8::is_ascii_digit)
}

/// State behind the login screen: the number field, the last error and
/// the issuance call. On success the validated number is handed forward
/// to the OTP entry screen.
pub struct LoginFlow {
    api: Arc<dyn OtpApi>,
    mobile_number: String,
    error_message: Option<String>,
}

impl LoginFlow {
    pub fn new(api: Arc<dyn OtpApi>) -> Self {
        Self {
            api,
            mobile_number: String::new(),
            error_message: None,
        }
    }

    pub fn mobile_number(&self) -> &str {
        &self.mobile_number
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    /// Editing the field clears the previous error.
    pub fn set_mobile_number(&mut self, number: impl Into<String>) {
        self.mobile_number = number.into();
        self.error_message = None;
    }

    /// Validate locally, then ask the server to issue an OTP. Returns the
    /// mobile number to carry into the OTP entry screen on success; on
    /// any failure the user-facing message is set and `None` is returned.
    /// Failures are terminal for the attempt, the user must resubmit.
    pub async fn request_otp(&mut self) -> Option<String> {
        self.error_message = None;
        if self.mobile_number.is_empty() {
            self.error_message = Some(messages::EMPTY_MOBILE.to_string());
            return None;
        }
        if !validate_mobile_number(&self.mobile_number) {
            self.error_message = Some(messages::INVALID_MOBILE.to_string());
            return None;
        }
        match self.api.generate_otp(&self.mobile_number).await {
            Ok(()) => {
                tracing::info!(mobile_number = %self.mobile_number, "OTP issued");
                Some(self.mobile_number.clone())
            }
            Err(e) => {
                tracing::warn!("OTP issuance failed: {e}");
                self.error_message = Some(messages::issuance_error(&e));
                None
            }
        }
    }
}
