//! Six-slot OTP entry buffer.
//!
//! Pure synchronous state: every transition happens on an input event
//! (keystroke, paste, backspace, timer tick). The async side lives in
//! [`super::OtpFlow`].

/// Number of code slots.
pub const OTP_LEN: usize = 6;

/// Seconds until resend becomes available again.
pub const RESEND_COOLDOWN_SECS: u32 = 30;

/// Where the buffer stands relative to submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtpPhase {
    /// 0-5 digits filled.
    Entering,
    /// All six slots filled; the code can be submitted.
    Complete,
}

/// The entry buffer behind the OTP screen: six single-digit slots, a
/// focus cursor, the resend cooldown and the last user-facing error.
#[derive(Debug, Clone)]
pub struct OtpEntry {
    digits: [Option<char>; OTP_LEN],
    active_index: usize,
    countdown: u32,
    resend_disabled: bool,
    error_message: Option<String>,
    mobile_number: String,
}

impl OtpEntry {
    /// Fresh buffer for a number that just had a code issued: all slots
    /// empty, focus on slot 0, cooldown running.
    pub fn new(mobile_number: impl Into<String>) -> Self {
        Self {
            digits: [None; OTP_LEN],
            active_index: 0,
            countdown: RESEND_COOLDOWN_SECS,
            resend_disabled: true,
            error_message: None,
            mobile_number: mobile_number.into(),
        }
    }

    pub fn mobile_number(&self) -> &str {
        &self.mobile_number
    }

    /// Slot currently holding input focus, 0..5.
    pub fn active_index(&self) -> usize {
        self.active_index
    }

    pub fn digit(&self, slot: usize) -> Option<char> {
        self.digits.get(slot).copied().flatten()
    }

    pub fn countdown(&self) -> u32 {
        self.countdown
    }

    pub fn resend_disabled(&self) -> bool {
        self.resend_disabled
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    pub fn phase(&self) -> OtpPhase {
        if self.digits.iter().all(Option::is_some) {
            OtpPhase::Complete
        } else {
            OtpPhase::Entering
        }
    }

    /// Concatenated code, only once all six slots are filled.
    pub fn code(&self) -> Option<String> {
        if self.phase() == OtpPhase::Complete {
            Some(self.digits.iter().flatten().collect())
        } else {
            None
        }
    }

    /// Text arriving at `slot`. A single numeral fills the slot and moves
    /// focus forward; an empty string clears the slot in place; anything
    /// longer is treated as a paste. Non-numerals are rejected with no
    /// state change.
    pub fn input(&mut self, slot: usize, text: &str) {
        if slot >= OTP_LEN {
            return;
        }
        if text.chars().count() > 1 {
            self.paste(slot, text);
            return;
        }
        match text.chars().next() {
            None => {
                self.digits[slot] = None;
                self.error_message = None;
            }
            Some(c) if c.is_ascii_digit() => {
                self.digits[slot] = Some(c);
                self.error_message = None;
                if slot < OTP_LEN - 1 {
                    self.active_index = slot + 1;
                }
            }
            Some(_) => {}
        }
    }

    /// Distribute pasted text into slots starting at `slot`, keeping only
    /// numerals and discarding whatever does not fit before slot 5.
    /// Focus lands on the first remaining empty slot, or slot 5 if none.
    fn paste(&mut self, slot: usize, text: &str) {
        let mut index = slot;
        let mut placed = false;
        for c in text.chars().filter(char::is_ascii_digit) {
            if index >= OTP_LEN {
                break;
            }
            self.digits[index] = Some(c);
            index += 1;
            placed = true;
        }
        if !placed {
            return;
        }
        self.error_message = None;
        self.active_index = self
            .digits
            .iter()
            .position(Option::is_none)
            .unwrap_or(OTP_LEN - 1);
    }

    /// Backspace at `slot`: clear in place when filled, otherwise chain
    /// back to the previous slot. Backspace on an empty slot 0 is a no-op.
    pub fn backspace(&mut self, slot: usize) {
        if slot >= OTP_LEN {
            return;
        }
        if self.digits[slot].is_some() {
            self.digits[slot] = None;
            self.error_message = None;
        } else if slot > 0 {
            self.digits[slot - 1] = None;
            self.active_index = slot - 1;
            self.error_message = None;
        }
    }

    /// One second of resend cooldown elapsed. Reaching zero enables
    /// resend; further ticks are no-ops.
    pub fn tick(&mut self) {
        if !self.resend_disabled {
            return;
        }
        if self.countdown > 0 {
            self.countdown -= 1;
        }
        if self.countdown == 0 {
            self.resend_disabled = false;
        }
    }

    /// A fresh code is on its way: clear the buffer, move focus back to
    /// slot 0 and restart the cooldown.
    pub fn reset_for_resend(&mut self) {
        self.digits = [None; OTP_LEN];
        self.active_index = 0;
        self.countdown = RESEND_COOLDOWN_SECS;
        self.resend_disabled = true;
    }

    pub fn set_error(&mut self, message: impl Into<String>) {
        self.error_message = Some(message.into());
    }

    pub fn clear_error(&mut self) {
        self.error_message = None;
    }
}
