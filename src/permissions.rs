//! Shared-storage write permission for the legacy tier.
//!
//! - **Host seam**: [`PermissionHost`] reports whether the permission is held and
//!   shows the platform consent prompt, answering later through a one-shot
//!   [`PermissionResponder`]
//! - **Gate**: [`PermissionGate`] awaits that answer with a bounded wait and an
//!   optional cancellation future; this is the only place a write suspends
//! - **Desktop**: [`AutoGrantHost`] grants without prompting, there is no shared
//!   storage permission to negotiate

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::oneshot;

use crate::error::WriteError;
use crate::types::PermissionState;

/// One-shot channel the host answers a permission prompt through.
/// Dropping it unanswered cancels the waiting write.
#[derive(Debug)]
pub struct PermissionResponder {
    tx: oneshot::Sender<bool>,
}

impl PermissionResponder {
    pub fn respond(self, granted: bool) {
        // The gate may already have given up waiting
        let _ = self.tx.send(granted);
    }

    pub fn grant(self) {
        self.respond(true)
    }

    pub fn deny(self) {
        self.respond(false)
    }
}

pub trait PermissionHost: Send + Sync {
    /// Whether the write permission is already held
    fn is_write_granted(&self) -> bool;

    /// Show the consent prompt. Must not block; the decision is delivered
    /// through `responder`, from any thread.
    fn request_write_permission(&self, responder: PermissionResponder);
}

pub struct PermissionGate {
    host: Arc<dyn PermissionHost>,
    timeout: Duration,
}

impl PermissionGate {
    pub fn new(host: Arc<dyn PermissionHost>, timeout: Duration) -> Self {
        Self { host, timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Resolve the write permission, prompting the user if needed.
    ///
    /// Returns `Granted` or `Denied`; a missing answer is a `PermissionTimeout` error.
    pub async fn ensure_write_permission(&self) -> Result<PermissionState, WriteError> {
        self.ensure_write_permission_until(std::future::pending::<()>())
            .await
    }

    /// Like [`ensure_write_permission`](Self::ensure_write_permission), but
    /// gives up as soon as `cancel` completes.
    pub async fn ensure_write_permission_until<F>(
        &self,
        cancel: F,
    ) -> Result<PermissionState, WriteError>
    where
        F: Future<Output = ()>,
    {
        if self.host.is_write_granted() {
            return Ok(PermissionState::Granted);
        }

        let (tx, rx) = oneshot::channel();
        log::info!("[Permission] Requesting shared storage write permission");
        self.host.request_write_permission(PermissionResponder { tx });

        let state = tokio::select! {
            decision = tokio::time::timeout(self.timeout, rx) => match decision {
                Ok(Ok(true)) => PermissionState::Granted,
                Ok(Ok(false)) => PermissionState::Denied,
                Ok(Err(_)) => {
                    log::warn!("[Permission] Host dropped the permission request");
                    return Err(WriteError::PermissionTimeout(
                        "permission request was abandoned by the host".to_string(),
                    ));
                }
                Err(_) => {
                    log::warn!("[Permission] No answer within {:?}", self.timeout);
                    return Err(WriteError::PermissionTimeout(format!(
                        "no answer within {} ms",
                        self.timeout.as_millis()
                    )));
                }
            },
            _ = cancel => {
                log::warn!("[Permission] Permission request cancelled");
                return Err(WriteError::PermissionTimeout(
                    "permission request cancelled".to_string(),
                ));
            }
        };

        log::info!("[Permission] Host answered: {:?}", state);
        Ok(state)
    }
}

/// Grants every request without prompting
#[derive(Clone, Copy, Debug, Default)]
pub struct AutoGrantHost;

impl PermissionHost for AutoGrantHost {
    fn is_write_granted(&self) -> bool {
        true
    }

    fn request_write_permission(&self, responder: PermissionResponder) {
        responder.grant();
    }
}

/// Host adapter for runtimes that report the permission decision through a
/// callback (e.g. an activity result delivered over JNI).
///
/// The prompt hook is invoked when a write needs the permission; the runtime
/// later calls [`deliver`](Self::deliver) with the user's decision.
pub struct CallbackPermissionHost {
    granted: AtomicBool,
    pending: Mutex<Vec<PermissionResponder>>,
    prompt: Box<dyn Fn() + Send + Sync>,
}

impl CallbackPermissionHost {
    pub fn new<F>(prompt: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        Self {
            granted: AtomicBool::new(false),
            pending: Mutex::new(Vec::new()),
            prompt: Box::new(prompt),
        }
    }

    /// Record a permission already held at startup
    pub fn set_granted(&self, granted: bool) {
        self.granted.store(granted, Ordering::SeqCst);
    }

    /// Deliver the user's decision to every waiting write.
    /// Returns false when no request was waiting.
    pub fn deliver(&self, granted: bool) -> bool {
        if granted {
            self.granted.store(true, Ordering::SeqCst);
        }
        let waiting = std::mem::take(&mut *self.lock_pending());
        if waiting.is_empty() {
            log::debug!("[Permission] Decision delivered with no pending request");
            return false;
        }

        log::debug!("[Permission] Answering {} waiting request(s)", waiting.len());
        for responder in waiting {
            responder.respond(granted);
        }
        true
    }

    pub fn pending_requests(&self) -> usize {
        self.lock_pending().len()
    }

    pub fn has_pending_request(&self) -> bool {
        self.pending_requests() > 0
    }

    fn lock_pending(&self) -> std::sync::MutexGuard<'_, Vec<PermissionResponder>> {
        self.pending.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl PermissionHost for CallbackPermissionHost {
    fn is_write_granted(&self) -> bool {
        self.granted.load(Ordering::SeqCst)
    }

    fn request_write_permission(&self, responder: PermissionResponder) {
        // Overlapping writes share the prompt that is already open
        let first = {
            let mut pending = self.lock_pending();
            pending.retain(|r| !r.tx.is_closed());
            pending.push(responder);
            pending.len() == 1
        };
        if first {
            (self.prompt)();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    struct CountingHost {
        granted: bool,
        answer: Option<bool>,
        prompts: AtomicUsize,
    }

    impl PermissionHost for CountingHost {
        fn is_write_granted(&self) -> bool {
            self.granted
        }

        fn request_write_permission(&self, responder: PermissionResponder) {
            self.prompts.fetch_add(1, Ordering::SeqCst);
            match self.answer {
                Some(granted) => responder.respond(granted),
                // Simulate a host that never answers but keeps the prompt open
                None => std::mem::forget(responder),
            }
        }
    }

    fn gate(granted: bool, answer: Option<bool>) -> (Arc<CountingHost>, PermissionGate) {
        let host = Arc::new(CountingHost {
            granted,
            answer,
            prompts: AtomicUsize::new(0),
        });
        let gate = PermissionGate::new(host.clone(), Duration::from_millis(50));
        (host, gate)
    }

    #[tokio::test]
    async fn test_already_granted_skips_prompt() {
        let (host, gate) = gate(true, None);
        let state = gate.ensure_write_permission().await.unwrap();
        assert_eq!(state, PermissionState::Granted);
        assert_eq!(host.prompts.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_prompt_granted_and_denied() {
        let (host, gate) = gate(false, Some(true));
        assert_eq!(gate.ensure_write_permission().await.unwrap(), PermissionState::Granted);
        assert_eq!(host.prompts.load(Ordering::SeqCst), 1);

        let (_, gate) = self::gate(false, Some(false));
        assert_eq!(gate.ensure_write_permission().await.unwrap(), PermissionState::Denied);
    }

    #[tokio::test]
    async fn test_silent_host_times_out() {
        let (_, gate) = gate(false, None);
        let err = gate.ensure_write_permission().await.unwrap_err();
        assert_eq!(err.kind(), crate::types::ErrorKind::PermissionTimeout);
    }

    #[tokio::test]
    async fn test_cancellation_ends_the_wait() {
        let host = Arc::new(CallbackPermissionHost::new(|| {}));
        let gate = PermissionGate::new(host.clone(), Duration::from_secs(3600));
        let err = gate
            .ensure_write_permission_until(async {})
            .await
            .unwrap_err();
        assert_eq!(err.kind(), crate::types::ErrorKind::PermissionTimeout);
    }

    #[tokio::test]
    async fn test_callback_host_delivers_from_another_task() {
        let host = Arc::new(CallbackPermissionHost::new(|| {}));
        let gate = PermissionGate::new(host.clone(), Duration::from_secs(5));

        let deliverer = host.clone();
        let answer = tokio::spawn(async move {
            while !deliverer.has_pending_request() {
                tokio::task::yield_now().await;
            }
            deliverer.deliver(true)
        });

        assert_eq!(gate.ensure_write_permission().await.unwrap(), PermissionState::Granted);
        assert!(answer.await.unwrap());
        // Remembered for the next write
        assert!(host.is_write_granted());
        assert!(!host.deliver(true));
    }

    #[tokio::test]
    async fn test_dropped_responder_is_not_a_grant() {
        let host = Arc::new(CallbackPermissionHost::new(|| {}));
        let gate = PermissionGate::new(host.clone(), Duration::from_secs(5));

        let clearer = host.clone();
        let clear = tokio::spawn(async move {
            while !clearer.has_pending_request() {
                tokio::task::yield_now().await;
            }
            // Host tears down the prompt without deciding
            clearer.pending.lock().unwrap().clear();
        });

        let err = gate.ensure_write_permission().await.unwrap_err();
        clear.await.unwrap();
        assert_eq!(err.kind(), crate::types::ErrorKind::PermissionTimeout);
        assert!(!host.is_write_granted());
    }

    #[tokio::test]
    async fn test_overlapping_writes_share_one_decision() {
        let prompts = Arc::new(AtomicUsize::new(0));
        let counter = prompts.clone();
        let host = Arc::new(CallbackPermissionHost::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }));
        let gate = Arc::new(PermissionGate::new(host.clone(), Duration::from_secs(5)));

        let waiters: Vec<_> = (0..2)
            .map(|_| {
                let gate = gate.clone();
                tokio::spawn(async move { gate.ensure_write_permission().await })
            })
            .collect();

        while host.pending_requests() < 2 {
            tokio::task::yield_now().await;
        }
        assert_eq!(prompts.load(Ordering::SeqCst), 1);
        assert!(host.deliver(true));

        for waiter in waiters {
            assert_eq!(waiter.await.unwrap().unwrap(), PermissionState::Granted);
        }
        assert!(!host.has_pending_request());
    }

    #[tokio::test]
    async fn test_permission_held_at_startup() {
        let prompts = Arc::new(AtomicUsize::new(0));
        let counter = prompts.clone();
        let host = Arc::new(CallbackPermissionHost::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }));
        host.set_granted(true);

        let gate = PermissionGate::new(host.clone(), Duration::from_millis(50));
        assert_eq!(gate.timeout(), Duration::from_millis(50));
        assert_eq!(gate.ensure_write_permission().await.unwrap(), PermissionState::Granted);
        assert_eq!(prompts.load(Ordering::SeqCst), 0);
        assert!(!host.has_pending_request());
    }
}
