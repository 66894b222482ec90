//! Learning-check orchestrator.
//!
//! Drives the ready -> hairCheck -> call -> ready cycle, owns the single
//! active conversation handle, and is the only component allowed to
//! mutate it. Session creation errors are stored for the UI; teardown is
//! fire-and-forget.

use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tracing::{info, warn};
use uuid::Uuid;

use crate::hair_check::{DeviceError, HairCheckScreen};
use crate::state::ScreenState;
use learncheck_core::{Error, Result};
use learncheck_session::{
    ChapterContext, ConversationApi, ConversationHandle, CreateConversationRequest, SessionError,
};

/// Outcome of a join attempt
#[derive(Debug)]
pub enum JoinOutcome {
    /// Session created; the flow is now in the call screen
    Joined(ConversationHandle),
    /// A prior join is still in flight; no request was issued
    AlreadyPending,
    /// The local device gate blocked the join; no request was issued
    DeviceBlocked(DeviceError),
    /// Session creation failed; the flow returned to ready with this message
    Failed(String),
    /// Join is only valid from the hair-check screen
    InvalidState(ScreenState),
}

struct Inner {
    state: ScreenState,
    handle: Option<ConversationHandle>,
    error_message: Option<String>,
    join_pending: bool,
}

/// Orchestrator for one learning-check flow instance.
///
/// Cloneable; clones share state so UI callbacks can each hold one. The
/// lock is never held across a network await.
#[derive(Clone)]
pub struct LearningCheck {
    inner: Arc<Mutex<Inner>>,
    api: Arc<dyn ConversationApi>,
    screen: Arc<HairCheckScreen>,
    chapter: ChapterContext,
    time_limit_secs: Option<u32>,
    state_tx: watch::Sender<ScreenState>,
}

impl LearningCheck {
    /// Create an orchestrator for the given chapter.
    ///
    /// The chapter context is explicit input, not ambient state, so the
    /// flow can be driven and tested without any surrounding UI.
    pub fn new(
        chapter: ChapterContext,
        api: Arc<dyn ConversationApi>,
        screen: HairCheckScreen,
    ) -> Self {
        let (state_tx, _) = watch::channel(ScreenState::Ready);
        Self {
            inner: Arc::new(Mutex::new(Inner {
                state: ScreenState::Ready,
                handle: None,
                error_message: None,
                join_pending: false,
            })),
            api,
            screen: Arc::new(screen),
            chapter,
            time_limit_secs: None,
            state_tx,
        }
    }

    /// Override the session time limit for this flow
    pub fn with_time_limit(mut self, seconds: u32) -> Self {
        self.time_limit_secs = Some(seconds);
        self
    }

    /// Current screen state
    pub fn state(&self) -> ScreenState {
        self.lock().state
    }

    /// Handle of the active conversation, present iff the state is call
    pub fn handle(&self) -> Option<ConversationHandle> {
        self.lock().handle.clone()
    }

    /// URL for the conversation renderer, present iff the state is call
    pub fn conversation_url(&self) -> Option<String> {
        self.lock()
            .handle
            .as_ref()
            .map(|h| h.conversation_url.clone())
    }

    /// Error from the most recent failed session creation, if any
    pub fn error_message(&self) -> Option<String> {
        self.lock().error_message.clone()
    }

    /// Subscribe to screen-state changes (for loading indicators etc.)
    pub fn subscribe(&self) -> watch::Receiver<ScreenState> {
        self.state_tx.subscribe()
    }

    /// Enter the hair-check screen. Clears any stored error.
    pub fn start(&self) -> Result<()> {
        let mut inner = self.lock();
        self.transition(&mut inner, ScreenState::HairCheck)?;
        inner.error_message = None;
        Ok(())
    }

    /// Cancel out of the hair-check screen. No side effects beyond the
    /// state reset; there is no handle to discard yet.
    pub fn cancel(&self) -> Result<()> {
        let mut inner = self.lock();
        if inner.state != ScreenState::HairCheck {
            return Err(Error::State(format!(
                "cancel is only valid from hairCheck, current state is {}",
                inner.state
            )));
        }
        self.transition(&mut inner, ScreenState::Ready)?;
        inner.error_message = None;
        Ok(())
    }

    /// Attempt to join: run the local device gate, then create the remote
    /// conversation. A single attempt; duplicate joins while one is in
    /// flight are suppressed without issuing a second request.
    pub async fn join(&self) -> JoinOutcome {
        let attempt_id = Uuid::new_v4();

        {
            let mut inner = self.lock();
            if inner.join_pending {
                return JoinOutcome::AlreadyPending;
            }
            if inner.state != ScreenState::HairCheck {
                return JoinOutcome::InvalidState(inner.state);
            }
            // Stale errors never linger across attempts.
            inner.error_message = None;
            inner.join_pending = true;
        }

        // Local gate first; a device failure never reaches the network
        // and is never stored on the orchestrator.
        if let Err(err) = self.screen.ensure_ready() {
            info!(%attempt_id, %err, "Hair check blocked join");
            self.lock().join_pending = false;
            return JoinOutcome::DeviceBlocked(err);
        }

        let mut request = CreateConversationRequest::from_chapter(&self.chapter);
        if let Some(seconds) = self.time_limit_secs {
            request = request.with_time_limit(seconds);
        }

        info!(
            %attempt_id,
            chapter_id = %self.chapter.chapter_id,
            "Creating conversation session"
        );
        let result = self.api.create_conversation(request).await;

        let mut inner = self.lock();
        inner.join_pending = false;
        match result {
            Ok(handle) => {
                inner.state = ScreenState::Call;
                inner.handle = Some(handle.clone());
                drop(inner);
                self.state_tx.send_replace(ScreenState::Call);
                info!(%attempt_id, conversation_id = %handle.conversation_id, "Joined call");
                JoinOutcome::Joined(handle)
            }
            Err(err) => {
                let message = match err {
                    SessionError::Creation(m) | SessionError::Teardown(m) => m,
                };
                inner.state = ScreenState::Ready;
                inner.handle = None;
                inner.error_message = Some(message.clone());
                drop(inner);
                self.state_tx.send_replace(ScreenState::Ready);
                warn!(%attempt_id, %message, "Session creation failed");
                JoinOutcome::Failed(message)
            }
        }
    }

    /// Leave the call. Ends the remote conversation best-effort and
    /// discards the handle unconditionally; the flow always lands in
    /// ready, whatever the remote teardown outcome.
    pub async fn leave(&self) {
        let handle = {
            let mut inner = self.lock();
            let handle = inner.handle.take();
            inner.state = ScreenState::Ready;
            inner.error_message = None;
            handle
        };
        self.state_tx.send_replace(ScreenState::Ready);

        if let Some(handle) = handle {
            if let Err(err) = self.api.end_conversation(&handle.conversation_id).await {
                // Fire-and-forget cleanup: a failed remote teardown must
                // never trap the user in the call state.
                warn!(
                    conversation_id = %handle.conversation_id,
                    %err,
                    "Failed to end conversation session"
                );
            } else {
                info!(conversation_id = %handle.conversation_id, "Conversation session ended");
            }
        }
    }

    fn transition(&self, inner: &mut Inner, target: ScreenState) -> Result<()> {
        if !inner.state.can_transition_to(&target) {
            return Err(Error::State(format!(
                "invalid transition: {} -> {}",
                inner.state, target
            )));
        }
        info!("Screen state: {} -> {}", inner.state, target);
        inner.state = target;
        self.state_tx.send_replace(target);
        Ok(())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().expect("orchestrator mutex poisoned")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hair_check::{DeviceInfo, MediaProbe};
    use async_trait::async_trait;
    use learncheck_core::config::schema::DevicesConfig;
    use learncheck_session::SessionResult;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Notify;

    struct FakeProbe {
        camera: Option<DeviceError>,
        microphone: Option<DeviceError>,
    }

    impl FakeProbe {
        fn ok() -> Self {
            Self {
                camera: None,
                microphone: None,
            }
        }

        fn no_camera() -> Self {
            Self {
                camera: Some(DeviceError::NotFound("no camera".to_string())),
                microphone: None,
            }
        }
    }

    impl MediaProbe for FakeProbe {
        fn probe_camera(&self) -> std::result::Result<DeviceInfo, DeviceError> {
            match &self.camera {
                Some(err) => Err(err.clone()),
                None => Ok(DeviceInfo {
                    name: "video0".to_string(),
                }),
            }
        }

        fn probe_microphone(&self) -> std::result::Result<DeviceInfo, DeviceError> {
            match &self.microphone {
                Some(err) => Err(err.clone()),
                None => Ok(DeviceInfo {
                    name: "pcmC0D0c".to_string(),
                }),
            }
        }
    }

    struct FakeApi {
        create_calls: AtomicUsize,
        create_error: Option<String>,
        end_calls: AtomicUsize,
        end_error: Option<String>,
    }

    impl FakeApi {
        fn succeeding() -> Self {
            Self {
                create_calls: AtomicUsize::new(0),
                create_error: None,
                end_calls: AtomicUsize::new(0),
                end_error: None,
            }
        }

        fn failing_create(message: &str) -> Self {
            Self {
                create_error: Some(message.to_string()),
                ..Self::succeeding()
            }
        }

        fn failing_end(message: &str) -> Self {
            Self {
                end_error: Some(message.to_string()),
                ..Self::succeeding()
            }
        }

        fn handle() -> ConversationHandle {
            ConversationHandle {
                conversation_url: "https://x".to_string(),
                conversation_id: "abc".to_string(),
                expires_at: None,
            }
        }
    }

    #[async_trait]
    impl ConversationApi for FakeApi {
        async fn create_conversation(
            &self,
            _request: CreateConversationRequest,
        ) -> SessionResult<ConversationHandle> {
            self.create_calls.fetch_add(1, Ordering::SeqCst);
            match &self.create_error {
                Some(message) => Err(SessionError::Creation(message.clone())),
                None => Ok(Self::handle()),
            }
        }

        async fn end_conversation(&self, _conversation_id: &str) -> SessionResult<()> {
            self.end_calls.fetch_add(1, Ordering::SeqCst);
            match &self.end_error {
                Some(message) => Err(SessionError::Teardown(message.clone())),
                None => Ok(()),
            }
        }
    }

    /// Blocks inside create_conversation until released, to exercise the
    /// in-flight join gate.
    struct BlockingApi {
        started: Notify,
        release: Notify,
        create_calls: AtomicUsize,
    }

    impl BlockingApi {
        fn new() -> Self {
            Self {
                started: Notify::new(),
                release: Notify::new(),
                create_calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl ConversationApi for BlockingApi {
        async fn create_conversation(
            &self,
            _request: CreateConversationRequest,
        ) -> SessionResult<ConversationHandle> {
            self.create_calls.fetch_add(1, Ordering::SeqCst);
            self.started.notify_one();
            self.release.notified().await;
            Ok(FakeApi::handle())
        }

        async fn end_conversation(&self, _conversation_id: &str) -> SessionResult<()> {
            Ok(())
        }
    }

    fn screen(probe: FakeProbe) -> HairCheckScreen {
        HairCheckScreen::new(Box::new(probe), &DevicesConfig::default())
    }

    fn flow(api: Arc<dyn ConversationApi>, probe: FakeProbe) -> LearningCheck {
        LearningCheck::new(
            ChapterContext::new("ch-1", "Photosynthesis"),
            api,
            screen(probe),
        )
    }

    #[tokio::test]
    async fn test_start_enters_hair_check() {
        let lc = flow(Arc::new(FakeApi::succeeding()), FakeProbe::ok());
        assert_eq!(lc.state(), ScreenState::Ready);
        lc.start().unwrap();
        assert_eq!(lc.state(), ScreenState::HairCheck);
    }

    #[tokio::test]
    async fn test_join_success_enters_call_with_handle() {
        let lc = flow(Arc::new(FakeApi::succeeding()), FakeProbe::ok());
        lc.start().unwrap();

        let outcome = lc.join().await;
        assert!(matches!(outcome, JoinOutcome::Joined(_)));
        assert_eq!(lc.state(), ScreenState::Call);

        let handle = lc.handle().unwrap();
        assert_eq!(handle.conversation_url, "https://x");
        assert_eq!(handle.conversation_id, "abc");
        assert_eq!(lc.conversation_url().unwrap(), "https://x");
    }

    #[tokio::test]
    async fn test_join_failure_returns_to_ready_with_error() {
        let lc = flow(
            Arc::new(FakeApi::failing_create("quota exceeded")),
            FakeProbe::ok(),
        );
        lc.start().unwrap();

        let outcome = lc.join().await;
        assert!(matches!(outcome, JoinOutcome::Failed(_)));
        assert_eq!(lc.state(), ScreenState::Ready);
        assert!(lc.handle().is_none());
        assert_eq!(lc.error_message().unwrap(), "quota exceeded");
    }

    #[tokio::test]
    async fn test_leave_discards_handle_even_when_end_fails() {
        let api = Arc::new(FakeApi::failing_end("connection reset"));
        let lc = flow(api.clone(), FakeProbe::ok());
        lc.start().unwrap();
        lc.join().await;
        assert_eq!(lc.state(), ScreenState::Call);

        lc.leave().await;
        assert_eq!(lc.state(), ScreenState::Ready);
        assert!(lc.handle().is_none());
        assert_eq!(api.end_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_leave_calls_end_with_active_conversation() {
        let api = Arc::new(FakeApi::succeeding());
        let lc = flow(api.clone(), FakeProbe::ok());
        lc.start().unwrap();
        lc.join().await;
        lc.leave().await;

        assert_eq!(api.end_calls.load(Ordering::SeqCst), 1);
        assert_eq!(lc.state(), ScreenState::Ready);
    }

    #[tokio::test]
    async fn test_leave_without_handle_is_a_no_op_reset() {
        let api = Arc::new(FakeApi::succeeding());
        let lc = flow(api.clone(), FakeProbe::ok());
        lc.leave().await;
        assert_eq!(lc.state(), ScreenState::Ready);
        assert_eq!(api.end_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_cancel_returns_to_ready_and_clears_error() {
        let lc = flow(
            Arc::new(FakeApi::failing_create("quota exceeded")),
            FakeProbe::ok(),
        );
        lc.start().unwrap();
        lc.join().await;
        assert!(lc.error_message().is_some());

        lc.start().unwrap();
        lc.cancel().unwrap();
        assert_eq!(lc.state(), ScreenState::Ready);
        assert!(lc.error_message().is_none());
    }

    #[tokio::test]
    async fn test_start_clears_previous_error() {
        let lc = flow(
            Arc::new(FakeApi::failing_create("quota exceeded")),
            FakeProbe::ok(),
        );
        lc.start().unwrap();
        lc.join().await;
        assert!(lc.error_message().is_some());

        lc.start().unwrap();
        assert!(lc.error_message().is_none());
    }

    #[tokio::test]
    async fn test_join_clears_error_before_outcome_is_known() {
        let blocking = Arc::new(BlockingApi::new());
        let lc = LearningCheck::new(
            ChapterContext::new("ch-1", "Photosynthesis"),
            {
                let api: Arc<dyn ConversationApi> = blocking.clone();
                api
            },
            screen(FakeProbe::ok()),
        );
        lc.start().unwrap();
        // Plant a stale error to observe the clear while the attempt is
        // still in flight.
        lc.lock().error_message = Some("stale".to_string());

        let pending = {
            let lc = lc.clone();
            tokio::spawn(async move { lc.join().await })
        };
        blocking.started.notified().await;
        assert!(lc.error_message().is_none());
        blocking.release.notify_one();
        pending.await.unwrap();
    }

    #[tokio::test]
    async fn test_duplicate_join_is_suppressed() {
        let api = Arc::new(BlockingApi::new());
        let lc = LearningCheck::new(
            ChapterContext::new("ch-1", "Photosynthesis"),
            {
                let shared: Arc<dyn ConversationApi> = api.clone();
                shared
            },
            screen(FakeProbe::ok()),
        );
        lc.start().unwrap();

        let first = {
            let lc = lc.clone();
            tokio::spawn(async move { lc.join().await })
        };
        api.started.notified().await;

        let second = lc.join().await;
        assert!(matches!(second, JoinOutcome::AlreadyPending));
        assert_eq!(api.create_calls.load(Ordering::SeqCst), 1);

        api.release.notify_one();
        let outcome = first.await.unwrap();
        assert!(matches!(outcome, JoinOutcome::Joined(_)));
        assert_eq!(lc.state(), ScreenState::Call);
    }

    #[tokio::test]
    async fn test_device_failure_blocks_join_locally() {
        let api = Arc::new(FakeApi::succeeding());
        let lc = flow(api.clone(), FakeProbe::no_camera());
        lc.start().unwrap();

        let outcome = lc.join().await;
        assert!(matches!(outcome, JoinOutcome::DeviceBlocked(_)));
        // Local failure: still on the hair-check screen, no stored error,
        // no network call.
        assert_eq!(lc.state(), ScreenState::HairCheck);
        assert!(lc.error_message().is_none());
        assert_eq!(api.create_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_handle_exists_iff_in_call() {
        let lc = flow(Arc::new(FakeApi::succeeding()), FakeProbe::ok());
        assert!(lc.handle().is_none());
        lc.start().unwrap();
        assert!(lc.handle().is_none());
        lc.join().await;
        assert_eq!(lc.state(), ScreenState::Call);
        assert!(lc.handle().is_some());
        lc.leave().await;
        assert_eq!(lc.state(), ScreenState::Ready);
        assert!(lc.handle().is_none());
    }

    #[tokio::test]
    async fn test_join_from_ready_is_rejected() {
        let api = Arc::new(FakeApi::succeeding());
        let lc = flow(api.clone(), FakeProbe::ok());
        let outcome = lc.join().await;
        assert!(matches!(
            outcome,
            JoinOutcome::InvalidState(ScreenState::Ready)
        ));
        assert_eq!(api.create_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_start_from_hair_check_is_rejected() {
        let lc = flow(Arc::new(FakeApi::succeeding()), FakeProbe::ok());
        lc.start().unwrap();
        assert!(lc.start().is_err());
    }

    #[tokio::test]
    async fn test_state_watch_reports_transitions() {
        let lc = flow(Arc::new(FakeApi::succeeding()), FakeProbe::ok());
        let mut rx = lc.subscribe();
        assert_eq!(*rx.borrow(), ScreenState::Ready);

        lc.start().unwrap();
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow(), ScreenState::HairCheck);

        lc.join().await;
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow(), ScreenState::Call);
    }
}
