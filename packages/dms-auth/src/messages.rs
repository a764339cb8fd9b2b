//! User-facing message mapping.
//!
//! Every failure an auth operation can hit ends up as one string shown
//! under the form. The mapping from [`ApiError`] to text differs per
//! operation (a 401 on issuance means "not registered", a 401 on
//! verification means "wrong code"), so each operation has its own
//! mapping function here and nowhere else.

use dms_api::{ApiError, StatusCode};

pub const EMPTY_MOBILE: &str = "Please enter your mobile number";
pub const INVALID_MOBILE: &str = "Please enter a valid 10-digit mobile number";
pub const TOO_MANY_ATTEMPTS: &str = "Too many attempts. Please try again later.";
pub const INVALID_MOBILE_FORMAT: &str = "Invalid mobile number format. Please check and try again.";
pub const NOT_REGISTERED: &str =
    "This mobile number is not registered. Please contact your administrator to register.";
pub const GENERATE_FAILED: &str = "Failed to send OTP. Please try again.";
pub const NETWORK_ERROR: &str = "Network error. Please check your internet connection.";
pub const INVALID_OTP_LENGTH: &str = "Please enter a valid 6-digit OTP";
pub const INVALID_OTP: &str = "Invalid OTP. Please check and try again.";
pub const OTP_EXPIRED: &str = "OTP expired or not found. Please request a new OTP.";
pub const VERIFY_FAILED: &str = "Failed to verify OTP. Please try again.";
pub const RESEND_FAILED: &str = "Failed to resend OTP. Please try again.";
pub const OTP_RESENT: &str = "OTP has been resent to your mobile number";
pub const SIGN_IN_FAILED: &str = "Could not save your session. Please try again.";

/// Message for a failed OTP issuance (login step).
pub fn issuance_error(err: &ApiError) -> String {
    match err {
        ApiError::Status { code, .. } if *code == StatusCode::TOO_MANY_REQUESTS => {
            TOO_MANY_ATTEMPTS.to_string()
        }
        ApiError::Status { code, .. } if *code == StatusCode::BAD_REQUEST => {
            INVALID_MOBILE_FORMAT.to_string()
        }
        ApiError::Status { code, .. } if *code == StatusCode::UNAUTHORIZED => {
            NOT_REGISTERED.to_string()
        }
        ApiError::Status { message, .. } | ApiError::ErrorStatus { message } => message
            .clone()
            .unwrap_or_else(|| GENERATE_FAILED.to_string()),
        ApiError::Network(_) => NETWORK_ERROR.to_string(),
        ApiError::MissingToken => GENERATE_FAILED.to_string(),
    }
}

/// Message for a failed OTP verification.
pub fn verification_error(err: &ApiError) -> String {
    match err {
        ApiError::Status { code, .. } if *code == StatusCode::UNAUTHORIZED => {
            INVALID_OTP.to_string()
        }
        ApiError::Status { code, .. } if *code == StatusCode::NOT_FOUND => OTP_EXPIRED.to_string(),
        ApiError::Status { message, .. } | ApiError::ErrorStatus { message } => message
            .clone()
            .unwrap_or_else(|| VERIFY_FAILED.to_string()),
        ApiError::Network(_) => NETWORK_ERROR.to_string(),
        // Success-shaped response without a token: treated as a server
        // error, never as a token.
        ApiError::MissingToken => VERIFY_FAILED.to_string(),
    }
}

/// Message for a failed OTP resend.
pub fn resend_error(err: &ApiError) -> String {
    match err {
        ApiError::Status { message, .. } | ApiError::ErrorStatus { message } => message
            .clone()
            .unwrap_or_else(|| RESEND_FAILED.to_string()),
        ApiError::Network(_) => NETWORK_ERROR.to_string(),
        ApiError::MissingToken => RESEND_FAILED.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(code: StatusCode, message: Option<&str>) -> ApiError {
        ApiError::Status {
            code,
            message: message.map(String::from),
        }
    }

    #[test]
    fn test_issuance_taxonomy() {
        assert_eq!(
            issuance_error(&status(StatusCode::TOO_MANY_REQUESTS, None)),
            TOO_MANY_ATTEMPTS
        );
        assert_eq!(
            issuance_error(&status(StatusCode::BAD_REQUEST, None)),
            INVALID_MOBILE_FORMAT
        );
        assert_eq!(
            issuance_error(&status(StatusCode::UNAUTHORIZED, None)),
            NOT_REGISTERED
        );
        // Other server errors surface the server's message...
        assert_eq!(
            issuance_error(&status(StatusCode::INTERNAL_SERVER_ERROR, Some("down"))),
            "down"
        );
        // ...or the generic fallback when there is none.
        assert_eq!(
            issuance_error(&status(StatusCode::INTERNAL_SERVER_ERROR, None)),
            GENERATE_FAILED
        );
        assert_eq!(
            issuance_error(&ApiError::ErrorStatus {
                message: Some("nope".into())
            }),
            "nope"
        );
    }

    #[test]
    fn test_verification_taxonomy() {
        assert_eq!(
            verification_error(&status(StatusCode::UNAUTHORIZED, Some("ignored"))),
            INVALID_OTP
        );
        assert_eq!(
            verification_error(&status(StatusCode::NOT_FOUND, None)),
            OTP_EXPIRED
        );
        assert_eq!(
            verification_error(&ApiError::ErrorStatus {
                message: Some("bad code".into())
            }),
            "bad code"
        );
        assert_eq!(verification_error(&ApiError::MissingToken), VERIFY_FAILED);
    }

    #[test]
    fn test_resend_taxonomy() {
        assert_eq!(
            resend_error(&ApiError::ErrorStatus { message: None }),
            RESEND_FAILED
        );
        assert_eq!(
            resend_error(&status(StatusCode::SERVICE_UNAVAILABLE, Some("busy"))),
            "busy"
        );
    }
}
