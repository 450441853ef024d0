//! The consent gate.
//!
//! Event submission awaits a general-purpose consent decision. `Pending`
//! suspends callers on a watch channel; a later transition to `In` releases
//! them all, `Out` rejects them. Identity and set-consent requests bypass
//! the gate entirely.

use edgekit_types::{ConsentStatus, Error, Result};
use tokio::sync::watch;
use tracing::debug;

pub struct ConsentGate {
    status: watch::Sender<ConsentStatus>,
}

impl ConsentGate {
    pub fn new(initial: ConsentStatus) -> Self {
        let (status, _) = watch::channel(initial);
        Self { status }
    }

    pub fn current(&self) -> ConsentStatus {
        *self.status.borrow()
    }

    /// Records a new decision, waking suspended waiters.
    pub fn update(&self, status: ConsentStatus) {
        if self.current() != status {
            debug!(status = status.as_str(), "consent updated");
        }
        // send only fails with no receivers, which is fine for a gate
        // nobody is currently awaiting.
        let _ = self.status.send(status);
    }

    /// Resolves once consent is `In`; fails once it is `Out`. Suspends
    /// (indefinitely) while `Pending`.
    pub async fn await_consent(&self) -> Result<()> {
        let mut rx = self.status.subscribe();
        loop {
            match *rx.borrow_and_update() {
                ConsentStatus::In => return Ok(()),
                ConsentStatus::Out => return Err(Error::ConsentDenied),
                ConsentStatus::Pending => {}
            }
            debug!("suspending until a consent decision arrives");
            if rx.changed().await.is_err() {
                // Gate dropped while suspended; treat as a denial.
                return Err(Error::ConsentDenied);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn resolves_immediately_when_in() {
        assert!(ConsentGate::new(ConsentStatus::In).await_consent().await.is_ok());
    }

    #[tokio::test]
    async fn rejects_immediately_when_out() {
        assert!(matches!(
            ConsentGate::new(ConsentStatus::Out).await_consent().await,
            Err(Error::ConsentDenied)
        ));
    }

    #[tokio::test]
    async fn pending_suspends_until_a_decision() {
        let gate = std::sync::Arc::new(ConsentGate::new(ConsentStatus::Pending));
        let waiter = tokio::spawn({
            let gate = std::sync::Arc::clone(&gate);
            async move { gate.await_consent().await }
        });
        tokio::task::yield_now().await;
        assert!(!waiter.is_finished());
        gate.update(ConsentStatus::In);
        assert!(waiter.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn pending_then_out_rejects_waiters() {
        let gate = std::sync::Arc::new(ConsentGate::new(ConsentStatus::Pending));
        let waiter = tokio::spawn({
            let gate = std::sync::Arc::clone(&gate);
            async move { gate.await_consent().await }
        });
        tokio::task::yield_now().await;
        gate.update(ConsentStatus::Out);
        assert!(matches!(waiter.await.unwrap(), Err(Error::ConsentDenied)));
    }
}
