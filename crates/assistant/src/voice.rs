use std::time::Duration;

use tracing::debug;

/// Stand-in for a speech recognizer: listens for a fixed time, then hears the
/// configured transcript.
#[derive(Clone, Debug)]
pub struct SimulatedVoiceInput {
    listen_for: Duration,
    transcript: String,
}

impl SimulatedVoiceInput {
    pub fn new(listen_for: Duration, transcript: impl Into<String>) -> Self {
        Self { listen_for, transcript: transcript.into() }
    }

    pub fn listen_for(&self) -> Duration {
        self.listen_for
    }

    pub async fn capture(self) -> String {
        debug!(
            event_name = "voice.capture.started",
            listen_ms = self.listen_for.as_millis() as u64,
            "voice capture started"
        );
        tokio::time::sleep(self.listen_for).await;
        debug!(event_name = "voice.capture.finished", transcript = %self.transcript, "voice captured");
        self.transcript
    }
}
