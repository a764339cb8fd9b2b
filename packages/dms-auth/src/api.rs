//! Seam between the auth flows and the remote API client.
//!
//! Flows talk to [`OtpApi`] rather than to `DmsClient` directly so tests
//! can substitute a scripted implementation.

use async_trait::async_trait;
use dms_api::{ApiError, DmsClient};

/// The two OTP calls the login flow needs from the service.
#[async_trait]
pub trait OtpApi: Send + Sync {
    /// Ask the server to issue (or re-issue) an OTP for a mobile number.
    async fn generate_otp(&self, mobile_number: &str) -> Result<(), ApiError>;

    /// Exchange mobile number + code for a session token.
    async fn validate_otp(&self, mobile_number: &str, otp: &str) -> Result<String, ApiError>;
}

#[async_trait]
impl OtpApi for DmsClient {
    async fn generate_otp(&self, mobile_number: &str) -> Result<(), ApiError> {
        DmsClient::generate_otp(self, mobile_number).await
    }

    async fn validate_otp(&self, mobile_number: &str, otp: &str) -> Result<String, ApiError> {
        DmsClient::validate_otp(self, mobile_number, otp).await
    }
}
