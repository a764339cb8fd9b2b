//! OTP entry: the six-slot code buffer and the screen-scoped flow that
//! drives verification, resend and the cooldown timer over it.

mod entry;
mod flow;

pub use entry::{OtpEntry, OtpPhase, OTP_LEN, RESEND_COOLDOWN_SECS};
pub use flow::{OtpFlow, ResendOutcome, VerifyOutcome};
