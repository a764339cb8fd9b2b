//! Session and OTP-login core for the DMS mobile client.
//!
//! This crate owns the pieces of the client with real state-transition
//! logic; screens are thin views over it. The shape mirrors the runtime
//! flow:
//!
//! ```text
//! LoginFlow ──issue OTP──► OtpFlow ──verify──► SessionStore.sign_in
//!                                                    │
//!                                      watch channel │
//!                                                    ▼
//!                                               RouteGuard ──► Navigator
//! ```
//!
//! - [`session::SessionStore`] holds the authoritative token, persisted
//!   through a [`storage::TokenStorage`] backend.
//! - [`guard::RouteGuard`] re-evaluates the login/app redirect rule on
//!   every session or location change.
//! - [`login::LoginFlow`] validates the mobile number and asks the server
//!   to issue a code.
//! - [`otp::OtpFlow`] owns the six-slot entry buffer, the resend cooldown
//!   timer and the verification call.

pub mod api;
pub mod guard;
pub mod login;
pub mod messages;
pub mod otp;
pub mod session;
pub mod storage;

pub use api::OtpApi;
pub use guard::{LocationCategory, Navigator, RouteGuard};
pub use login::{validate_mobile_number, LoginFlow};
pub use otp::{OtpEntry, OtpFlow, OtpPhase, ResendOutcome, VerifyOutcome};
pub use session::{SessionState, SessionStore, SignInError};
pub use storage::{FileTokenStorage, MemoryTokenStorage, StorageError, TokenStorage};
