use tokio::sync::mpsc;

/// Advisory percentage sink for long-running image commits.
///
/// Values are clamped to 100 and only forwarded when they increase, so a
/// receiver always observes a monotonic sequence. Sending never fails the
/// caller; a dropped receiver silently disables reporting.
#[derive(Debug, Default)]
pub struct Progress {
    tx: Option<mpsc::UnboundedSender<u8>>,
    last: u8,
}

impl Progress {
    /// A reporter connected to a fresh channel.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<u8>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx: Some(tx), last: 0 }, rx)
    }

    /// A reporter that discards everything.
    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn report(&mut self, percent: u8) {
        let percent = percent.min(100);
        if percent <= self.last {
            return;
        }
        self.last = percent;
        let closed = self.tx.as_ref().is_some_and(|tx| tx.send(percent).is_err());
        if closed {
            self.tx = None;
        }
    }

    pub fn last(&self) -> u8 {
        self.last
    }
}
