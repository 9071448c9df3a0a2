use std::time::Duration;
use tokio::time::Instant;

/// Tracks search-as-you-type input and decides when the typed text has
/// settled long enough to be submitted.
///
/// Uses tokio's clock so paused-time tests can drive it.
#[derive(Debug, Clone)]
pub struct Debouncer {
    /// Quiet period required after the last edit
    delay: Duration,
    /// Text and time of the most recent unsubmitted edit
    pending: Option<(String, Instant)>,
    /// Last text handed out for submission
    last_submitted: Option<String>,
}

impl Debouncer {
    pub fn new(delay_ms: u64) -> Self {
        Self {
            delay: Duration::from_millis(delay_ms),
            pending: None,
            last_submitted: None,
        }
    }

    /// Record an edit; restarts the quiet period
    pub fn input_changed(&mut self, text: &str) {
        self.pending = Some((text.to_string(), Instant::now()));
    }

    /// Returns the settled text once the quiet period elapsed, unless it is
    /// identical to what was last submitted
    pub fn poll(&mut self) -> Option<String> {
        let ready = matches!(&self.pending, Some((_, at)) if at.elapsed() >= self.delay);
        if !ready {
            return None;
        }

        let (text, _) = self.pending.take()?;
        if self.last_submitted.as_deref() == Some(text.as_str()) {
            return None;
        }
        self.last_submitted = Some(text.clone());
        Some(text)
    }

    /// Note a submission made some other way (e.g. Enter) so the same text
    /// is not submitted again when the timer expires
    pub fn mark_submitted(&mut self, text: &str) {
        self.pending = None;
        self.last_submitted = Some(text.to_string());
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn fires_after_quiet_period() {
        let mut debouncer = Debouncer::new(300);
        debouncer.input_changed("pia");
        assert_eq!(debouncer.poll(), None);

        tokio::time::advance(Duration::from_millis(200)).await;
        debouncer.input_changed("piano");
        tokio::time::advance(Duration::from_millis(200)).await;
        assert_eq!(debouncer.poll(), None, "edit restarted the timer");

        tokio::time::advance(Duration::from_millis(100)).await;
        assert_eq!(debouncer.poll().as_deref(), Some("piano"));
        assert!(!debouncer.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn same_text_not_submitted_twice() {
        let mut debouncer = Debouncer::new(50);
        debouncer.mark_submitted("piano");
        debouncer.input_changed("piano");
        tokio::time::advance(Duration::from_millis(60)).await;
        assert_eq!(debouncer.poll(), None);
        assert!(!debouncer.is_pending());
    }
}
