use tokio::sync::oneshot;

/// Create a linked stop trigger / stop signal pair.
///
/// The signal fires when the trigger is fired *or* dropped, so whoever owns
/// the trigger cannot forget to release the work it controls.
pub fn stop_pair() -> (StopTrigger, StopSignal) {
    let (tx, rx) = oneshot::channel();
    (
        StopTrigger { tx: Some(tx) },
        StopSignal {
            rx: Some(rx),
            done: false,
        },
    )
}

/// Sending half: asks an in-flight capture or playback to end early.
#[derive(Debug)]
pub struct StopTrigger {
    tx: Option<oneshot::Sender<()>>,
}

impl StopTrigger {
    /// Fire the signal. Returns `false` if it was already fired or the
    /// other side has gone away.
    pub fn fire(&mut self) -> bool {
        match self.tx.take() {
            Some(tx) => tx.send(()).is_ok(),
            None => false,
        }
    }

    pub fn is_fired(&self) -> bool {
        self.tx.is_none()
    }
}

/// Receiving half, handed to the capture or playback implementation.
#[derive(Debug)]
pub struct StopSignal {
    rx: Option<oneshot::Receiver<()>>,
    done: bool,
}

impl StopSignal {
    /// A signal that never fires, for callers that have nothing to cancel.
    pub fn never() -> Self {
        Self {
            rx: None,
            done: false,
        }
    }

    /// Resolves once the trigger is fired or dropped.
    ///
    /// Cancel-safe, so it can sit in a `tokio::select!` loop; once it has
    /// resolved it keeps resolving immediately.
    pub async fn stopped(&mut self) {
        if self.done {
            return;
        }
        match self.rx.as_mut() {
            Some(rx) => {
                let _ = rx.await;
                self.mark_done();
            }
            None => std::future::pending::<()>().await,
        }
    }

    /// Non-blocking check
    pub fn is_stopped(&mut self) -> bool {
        if self.done {
            return true;
        }
        let Some(rx) = self.rx.as_mut() else {
            return false;
        };
        match rx.try_recv() {
            Err(oneshot::error::TryRecvError::Empty) => false,
            _ => {
                self.mark_done();
                true
            }
        }
    }

    // a completed oneshot receiver must not be polled again
    fn mark_done(&mut self) {
        self.done = true;
        self.rx = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fire_resolves_signal() {
        let (mut trigger, mut signal) = stop_pair();
        assert!(!signal.is_stopped());
        assert!(trigger.fire());
        signal.stopped().await;
        assert!(trigger.is_fired());
    }

    #[tokio::test]
    async fn test_dropping_trigger_resolves_signal() {
        let (trigger, mut signal) = stop_pair();
        drop(trigger);
        signal.stopped().await;
        assert!(signal.is_stopped());
    }

    #[tokio::test(start_paused = true)]
    async fn test_never_signal_does_not_resolve() {
        let mut signal = StopSignal::never();
        let waited =
            tokio::time::timeout(std::time::Duration::from_secs(5), signal.stopped()).await;
        assert!(waited.is_err());
        assert!(!signal.is_stopped());
    }
}
