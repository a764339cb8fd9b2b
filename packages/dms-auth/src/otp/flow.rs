//! Screen-scoped OTP flow.
//!
//! Owns the entry buffer behind a lock, the one-second cooldown task and
//! the two network operations (verify, resend). The flow is created when
//! the OTP screen is entered and dropped when it is left; dropping it
//! aborts the cooldown task so nothing ticks a disposed screen.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use tokio::sync::{Mutex, Notify};
use tokio::task::JoinHandle;

use crate::api::OtpApi;
use crate::messages;
use crate::session::SessionStore;

use super::entry::OtpEntry;

/// Outcome of a submit action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifyOutcome {
    /// Token accepted and handed to the session store; the OTP flow is
    /// over and the route guard takes it from here.
    Verified,
    /// Rejected locally or by the server. The entry keeps its digits and
    /// carries the user-facing message.
    Failed,
    /// A verification was already in flight; this submission was dropped.
    Ignored,
}

/// Outcome of a resend action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResendOutcome {
    /// A fresh code was issued: slots cleared, cooldown restarted. The
    /// caller should show a transient notice ([`messages::OTP_RESENT`]).
    Resent,
    /// The server refused; existing digits and cooldown are untouched.
    Failed,
    /// Resend is still cooling down or already in flight.
    Ignored,
}

/// Aborts the cooldown task when the flow is torn down.
struct CountdownGuard(JoinHandle<()>);

impl Drop for CountdownGuard {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Orchestrator behind the OTP screen.
pub struct OtpFlow {
    entry: Mutex<OtpEntry>,
    api: Arc<dyn OtpApi>,
    session: Arc<SessionStore>,
    verifying: AtomicBool,
    resending: AtomicBool,
    cooldown_restarted: Arc<Notify>,
    countdown: OnceLock<CountdownGuard>,
}

impl OtpFlow {
    /// Create the flow for a number that just had a code issued and start
    /// its cooldown timer.
    pub fn start(
        mobile_number: impl Into<String>,
        api: Arc<dyn OtpApi>,
        session: Arc<SessionStore>,
    ) -> Arc<Self> {
        let flow = Arc::new(Self {
            entry: Mutex::new(OtpEntry::new(mobile_number)),
            api,
            session,
            verifying: AtomicBool::new(false),
            resending: AtomicBool::new(false),
            cooldown_restarted: Arc::new(Notify::new()),
            countdown: OnceLock::new(),
        });
        let handle = Self::spawn_countdown(&flow);
        let _ = flow.countdown.set(CountdownGuard(handle));
        flow
    }

    /// Text arriving at a slot; see [`OtpEntry::input`].
    pub async fn input(&self, slot: usize, text: &str) {
        self.entry.lock().await.input(slot, text);
    }

    /// Backspace at a slot; see [`OtpEntry::backspace`].
    pub async fn backspace(&self, slot: usize) {
        self.entry.lock().await.backspace(slot);
    }

    /// Copy of the entry state for rendering.
    pub async fn snapshot(&self) -> OtpEntry {
        self.entry.lock().await.clone()
    }

    /// Submit the code. At most one verification is in flight at a time;
    /// a submission while one is pending is dropped, not queued.
    pub async fn verify(&self) -> VerifyOutcome {
        if self.verifying.swap(true, Ordering::SeqCst) {
            return VerifyOutcome::Ignored;
        }
        let outcome = self.verify_inner().await;
        self.verifying.store(false, Ordering::SeqCst);
        outcome
    }

    async fn verify_inner(&self) -> VerifyOutcome {
        let (mobile, code) = {
            let mut entry = self.entry.lock().await;
            match entry.code() {
                Some(code) => {
                    entry.clear_error();
                    (entry.mobile_number().to_string(), code)
                }
                None => {
                    entry.set_error(messages::INVALID_OTP_LENGTH);
                    return VerifyOutcome::Failed;
                }
            }
        };
        tracing::debug!(mobile_number = %mobile, "verifying OTP");
        match self.api.validate_otp(&mobile, &code).await {
            Ok(token) => {
                if let Err(e) = self.session.sign_in(token).await {
                    tracing::error!("could not persist session: {e}");
                    self.entry.lock().await.set_error(messages::SIGN_IN_FAILED);
                    return VerifyOutcome::Failed;
                }
                VerifyOutcome::Verified
            }
            Err(e) => {
                tracing::warn!("OTP verification failed: {e}");
                self.entry
                    .lock()
                    .await
                    .set_error(messages::verification_error(&e));
                VerifyOutcome::Failed
            }
        }
    }

    /// Ask for a fresh code. Only available once the cooldown has run
    /// out; at most one resend is in flight at a time.
    pub async fn resend(&self) -> ResendOutcome {
        if self.entry.lock().await.resend_disabled() {
            return ResendOutcome::Ignored;
        }
        if self.resending.swap(true, Ordering::SeqCst) {
            return ResendOutcome::Ignored;
        }
        let outcome = self.resend_inner().await;
        self.resending.store(false, Ordering::SeqCst);
        outcome
    }

    async fn resend_inner(&self) -> ResendOutcome {
        let mobile = self.entry.lock().await.mobile_number().to_string();
        match self.api.generate_otp(&mobile).await {
            Ok(()) => {
                {
                    let mut entry = self.entry.lock().await;
                    entry.clear_error();
                    entry.reset_for_resend();
                }
                // Wake the parked cooldown task for the new countdown.
                self.cooldown_restarted.notify_one();
                tracing::info!(mobile_number = %mobile, "OTP resent");
                ResendOutcome::Resent
            }
            Err(e) => {
                tracing::warn!("OTP resend failed: {e}");
                self.entry.lock().await.set_error(messages::resend_error(&e));
                ResendOutcome::Failed
            }
        }
    }

    /// One-second tick loop. Holds only a `Weak` to the flow so a torn
    /// down screen is not kept alive; the guard's abort ends it promptly
    /// either way. While resend is available the task parks instead of
    /// ticking.
    fn spawn_countdown(flow: &Arc<Self>) -> JoinHandle<()> {
        let weak = Arc::downgrade(flow);
        tokio::spawn(async move {
            loop {
                let parked = {
                    let Some(flow) = weak.upgrade() else { return };
                    if flow.entry.lock().await.resend_disabled() {
                        None
                    } else {
                        Some(flow.cooldown_restarted.clone())
                    }
                };
                if let Some(restarted) = parked {
                    restarted.notified().await;
                    continue;
                }
                tokio::time::sleep(Duration::from_secs(1)).await;
                let Some(flow) = weak.upgrade() else { return };
                flow.entry.lock().await.tick();
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::otp::entry::{OtpPhase, RESEND_COOLDOWN_SECS};
    use crate::storage::{MemoryTokenStorage, StorageError, TokenStorage};

    use async_trait::async_trait;
    use dms_api::{ApiError, StatusCode};
    use std::collections::VecDeque;
    use std::sync::atomic::AtomicUsize;

    /// Scripted API: replies are popped per call; calls and the last
    /// validate arguments are recorded. An optional gate holds a validate
    /// reply back until released.
    struct MockApi {
        generate: Mutex<VecDeque<Result<(), ApiError>>>,
        validate: Mutex<VecDeque<Result<String, ApiError>>>,
        generate_calls: AtomicUsize,
        validate_calls: AtomicUsize,
        last_validate: std::sync::Mutex<Option<(String, String)>>,
        gate: Option<Arc<Notify>>,
    }

    impl MockApi {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                generate: Mutex::new(VecDeque::new()),
                validate: Mutex::new(VecDeque::new()),
                generate_calls: AtomicUsize::new(0),
                validate_calls: AtomicUsize::new(0),
                last_validate: std::sync::Mutex::new(None),
                gate: None,
            })
        }

        fn gated(gate: Arc<Notify>) -> Arc<Self> {
            let mut api = Self::new();
            Arc::get_mut(&mut api).unwrap().gate = Some(gate);
            api
        }

        async fn push_generate(&self, result: Result<(), ApiError>) {
            self.generate.lock().await.push_back(result);
        }

        async fn push_validate(&self, result: Result<String, ApiError>) {
            self.validate.lock().await.push_back(result);
        }

        fn validate_calls(&self) -> usize {
            self.validate_calls.load(Ordering::SeqCst)
        }

        fn generate_calls(&self) -> usize {
            self.generate_calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl OtpApi for MockApi {
        async fn generate_otp(&self, _mobile_number: &str) -> Result<(), ApiError> {
            self.generate_calls.fetch_add(1, Ordering::SeqCst);
            self.generate
                .lock()
                .await
                .pop_front()
                .unwrap_or(Err(ApiError::MissingToken))
        }

        async fn validate_otp(&self, mobile_number: &str, otp: &str) -> Result<String, ApiError> {
            self.validate_calls.fetch_add(1, Ordering::SeqCst);
            *self.last_validate.lock().unwrap() =
                Some((mobile_number.to_string(), otp.to_string()));
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            self.validate
                .lock()
                .await
                .pop_front()
                .unwrap_or(Err(ApiError::MissingToken))
        }
    }

    fn session() -> Arc<SessionStore> {
        Arc::new(SessionStore::new(Arc::new(MemoryTokenStorage::new())))
    }

    async fn fill(flow: &OtpFlow, code: &str) {
        flow.input(0, code).await;
    }

    #[tokio::test]
    async fn test_verify_requires_a_complete_code() {
        let api = MockApi::new();
        let flow = OtpFlow::start("9876543210", api.clone(), session());
        flow.input(0, "1").await;

        assert_eq!(flow.verify().await, VerifyOutcome::Failed);
        let entry = flow.snapshot().await;
        assert_eq!(entry.error_message(), Some(messages::INVALID_OTP_LENGTH));
        assert_eq!(api.validate_calls(), 0);
    }

    #[tokio::test]
    async fn test_successful_verify_hands_the_token_to_the_session() {
        let api = MockApi::new();
        api.push_validate(Ok("abc123".to_string())).await;
        let session = session();
        session.restore().await;
        let flow = OtpFlow::start("9876543210", api.clone(), session.clone());
        fill(&flow, "123456").await;

        assert_eq!(flow.verify().await, VerifyOutcome::Verified);
        assert_eq!(session.token().as_deref(), Some("abc123"));
        assert_eq!(
            *api.last_validate.lock().unwrap(),
            Some(("9876543210".to_string(), "123456".to_string()))
        );
    }

    #[tokio::test]
    async fn test_verify_failure_keeps_the_digits() {
        let api = MockApi::new();
        api.push_validate(Err(ApiError::ErrorStatus {
            message: Some("bad code".to_string()),
        }))
        .await;
        let session = session();
        session.restore().await;
        let flow = OtpFlow::start("9876543210", api, session.clone());
        fill(&flow, "123456").await;

        assert_eq!(flow.verify().await, VerifyOutcome::Failed);
        let entry = flow.snapshot().await;
        assert_eq!(entry.error_message(), Some("bad code"));
        assert_eq!(entry.phase(), OtpPhase::Complete);
        assert_eq!(entry.code().as_deref(), Some("123456"));
        assert!(!session.is_authenticated());
    }

    #[tokio::test]
    async fn test_verify_401_maps_to_invalid_otp() {
        let api = MockApi::new();
        api.push_validate(Err(ApiError::Status {
            code: StatusCode::UNAUTHORIZED,
            message: None,
        }))
        .await;
        let flow = OtpFlow::start("9876543210", api, session());
        fill(&flow, "123456").await;

        flow.verify().await;
        assert_eq!(
            flow.snapshot().await.error_message(),
            Some(messages::INVALID_OTP)
        );
    }

    #[tokio::test]
    async fn test_tokenless_success_response_is_rejected() {
        let api = MockApi::new();
        api.push_validate(Err(ApiError::MissingToken)).await;
        let session = session();
        let flow = OtpFlow::start("9876543210", api, session.clone());
        fill(&flow, "123456").await;

        assert_eq!(flow.verify().await, VerifyOutcome::Failed);
        assert!(!session.is_authenticated());
    }

    #[tokio::test]
    async fn test_second_submission_while_verifying_is_ignored() {
        let gate = Arc::new(Notify::new());
        let api = MockApi::gated(gate.clone());
        api.push_validate(Ok("abc123".to_string())).await;
        let session = session();
        session.restore().await;
        let flow = OtpFlow::start("9876543210", api.clone(), session);
        fill(&flow, "123456").await;

        let first = {
            let flow = flow.clone();
            tokio::spawn(async move { flow.verify().await })
        };
        // Let the first submission reach the gate.
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(flow.verify().await, VerifyOutcome::Ignored);
        assert_eq!(api.validate_calls(), 1);

        gate.notify_one();
        assert_eq!(first.await.unwrap(), VerifyOutcome::Verified);
    }

    #[tokio::test]
    async fn test_unpersistable_sign_in_fails_the_verify() {
        struct FailingStorage;

        #[async_trait]
        impl TokenStorage for FailingStorage {
            async fn load(&self) -> Result<Option<String>, StorageError> {
                Ok(None)
            }

            async fn store(&self, _token: &str) -> Result<(), StorageError> {
                Err(std::io::Error::new(std::io::ErrorKind::Other, "full").into())
            }

            async fn clear(&self) -> Result<(), StorageError> {
                Ok(())
            }
        }

        let api = MockApi::new();
        api.push_validate(Ok("abc123".to_string())).await;
        let session = Arc::new(SessionStore::new(Arc::new(FailingStorage)));
        session.restore().await;
        let flow = OtpFlow::start("9876543210", api, session.clone());
        fill(&flow, "123456").await;

        assert_eq!(flow.verify().await, VerifyOutcome::Failed);
        assert_eq!(
            flow.snapshot().await.error_message(),
            Some(messages::SIGN_IN_FAILED)
        );
        assert!(!session.is_authenticated());
    }

    #[tokio::test]
    async fn test_resend_during_cooldown_is_ignored() {
        let api = MockApi::new();
        let flow = OtpFlow::start("9876543210", api.clone(), session());

        assert_eq!(flow.resend().await, ResendOutcome::Ignored);
        assert_eq!(api.generate_calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cooldown_counts_thirty_seconds() {
        let api = MockApi::new();
        let flow = OtpFlow::start("9876543210", api, session());

        // 5 ticks have fired at +5.5s.
        tokio::time::sleep(Duration::from_millis(5500)).await;
        let entry = flow.snapshot().await;
        assert_eq!(entry.countdown(), RESEND_COOLDOWN_SECS - 5);
        assert!(entry.resend_disabled());

        // The remaining 25 fire by +30.5s.
        tokio::time::sleep(Duration::from_secs(25)).await;
        let entry = flow.snapshot().await;
        assert_eq!(entry.countdown(), 0);
        assert!(!entry.resend_disabled());
    }

    #[tokio::test(start_paused = true)]
    async fn test_successful_resend_clears_slots_and_restarts_the_cooldown() {
        let api = MockApi::new();
        api.push_generate(Ok(())).await;
        let flow = OtpFlow::start("9876543210", api.clone(), session());
        fill(&flow, "123456").await;

        tokio::time::sleep(Duration::from_millis(30_500)).await;
        assert_eq!(flow.resend().await, ResendOutcome::Resent);
        assert_eq!(api.generate_calls(), 1);

        let entry = flow.snapshot().await;
        assert_eq!(entry.code(), None);
        assert_eq!(entry.active_index(), 0);
        assert_eq!(entry.countdown(), RESEND_COOLDOWN_SECS);
        assert!(entry.resend_disabled());

        // The restarted cooldown ticks again.
        tokio::time::sleep(Duration::from_millis(30_500)).await;
        assert!(!flow.snapshot().await.resend_disabled());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_resend_leaves_everything_but_the_message() {
        let api = MockApi::new();
        api.push_generate(Err(ApiError::ErrorStatus {
            message: Some("try later".to_string()),
        }))
        .await;
        let flow = OtpFlow::start("9876543210", api, session());
        fill(&flow, "123456").await;

        tokio::time::sleep(Duration::from_millis(30_500)).await;
        assert_eq!(flow.resend().await, ResendOutcome::Failed);

        let entry = flow.snapshot().await;
        assert_eq!(entry.error_message(), Some("try later"));
        assert_eq!(entry.code().as_deref(), Some("123456"));
        // Resend stays available; the cooldown only restarts on success.
        assert!(!entry.resend_disabled());
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_the_flow_stops_the_timer() {
        let api = MockApi::new();
        let flow = OtpFlow::start("9876543210", api, session());
        let weak = Arc::downgrade(&flow);
        drop(flow);

        // The cooldown task held only a weak reference, so the flow is
        // really gone and nothing is left ticking it.
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(weak.upgrade().is_none());
    }
}
