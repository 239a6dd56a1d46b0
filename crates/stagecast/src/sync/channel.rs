use super::{DedupKey, PresenterMessage, SyncSnapshot};
use crate::error::TransportError;
use crate::joke::Joke;

/// Something presenter messages can be pushed into.
pub trait MessageSink {
    fn is_open(&self) -> bool;
    fn send(&mut self, message: &PresenterMessage) -> Result<(), TransportError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    Sent,
    /// Identical to the last state that went out.
    Deduplicated,
    NoSurface,
    /// The transport failed; the error was logged.
    Failed,
}

/// Replicates presenter state to the audience, latest-wins.
///
/// State snapshots are deduplicated against the last one delivered; joke
/// events never are.
#[derive(Debug, Default)]
pub struct SyncChannel {
    last_sent: Option<DedupKey>,
}

impl SyncChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget what was last delivered so the next publish always goes out.
    /// Must run before the publish it is meant to force.
    pub fn mark_ready(&mut self) {
        tracing::debug!("audience ready, forcing full state");
        self.last_sent = None;
    }

    pub fn publish(&mut self, sink: &mut dyn MessageSink, snapshot: &SyncSnapshot) -> SendOutcome {
        if !sink.is_open() {
            return SendOutcome::NoSurface;
        }
        let key = snapshot.dedup_key();
        if self.last_sent.as_ref() == Some(&key) {
            return SendOutcome::Deduplicated;
        }
        let outcome = deliver(sink, &PresenterMessage::SlideState(Box::new(snapshot.clone())));
        if outcome == SendOutcome::Sent {
            self.last_sent = Some(key);
        }
        outcome
    }

    pub fn send_joke(&mut self, sink: &mut dyn MessageSink, joke: &Joke) -> SendOutcome {
        if !sink.is_open() {
            return SendOutcome::NoSurface;
        }
        deliver(sink, &PresenterMessage::ShowJoke { joke: joke.clone() })
    }

    pub fn dismiss_joke(&mut self, sink: &mut dyn MessageSink) -> SendOutcome {
        if !sink.is_open() {
            return SendOutcome::NoSurface;
        }
        deliver(sink, &PresenterMessage::DismissJoke)
    }
}

fn deliver(sink: &mut dyn MessageSink, message: &PresenterMessage) -> SendOutcome {
    match sink.send(message) {
        Ok(()) => SendOutcome::Sent,
        Err(e) => {
            tracing::error!("failed to send to audience: {e}");
            SendOutcome::Failed
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deck::DeckId;
    use crate::joke::{Joke, JokeDef};
    use crate::navigation::Navigator;

    #[derive(Default)]
    struct RecordingSink {
        open: bool,
        fail: bool,
        sent: Vec<PresenterMessage>,
    }

    impl MessageSink for RecordingSink {
        fn is_open(&self) -> bool {
            self.open
        }

        fn send(&mut self, message: &PresenterMessage) -> Result<(), TransportError> {
            if self.fail {
                return Err(TransportError::Disconnected);
            }
            self.sent.push(message.clone());
            Ok(())
        }
    }

    fn open_sink() -> RecordingSink {
        RecordingSink {
            open: true,
            ..RecordingSink::default()
        }
    }

    fn snapshot(index: i64) -> SyncSnapshot {
        let mut nav = Navigator::new();
        nav.select_deck(DeckId::Bundled("a".to_string()), 10);
        nav.go_to(index);
        SyncSnapshot::build(None, &nav, "dark", false, None)
    }

    fn joke() -> Joke {
        Joke::from_def(
            JokeDef {
                id: "j".to_string(),
                hotkey: "1".to_string(),
                kind: "text".to_string(),
                text: Some("ha".to_string()),
                ..JokeDef::default()
            },
            2000,
        )
        .unwrap()
    }

    #[test]
    fn test_identical_state_sent_once() {
        let mut channel = SyncChannel::new();
        let mut sink = open_sink();
        assert_eq!(channel.publish(&mut sink, &snapshot(1)), SendOutcome::Sent);
        assert_eq!(channel.publish(&mut sink, &snapshot(1)), SendOutcome::Deduplicated);
        assert_eq!(sink.sent.len(), 1);
    }

    #[test]
    fn test_ready_forces_resend() {
        let mut channel = SyncChannel::new();
        let mut sink = open_sink();
        channel.publish(&mut sink, &snapshot(1));
        channel.mark_ready();
        assert_eq!(channel.publish(&mut sink, &snapshot(1)), SendOutcome::Sent);
        assert_eq!(sink.sent.len(), 2);
        assert_eq!(sink.sent[0], sink.sent[1]);
    }

    #[test]
    fn test_rapid_changes_all_delivered() {
        let mut channel = SyncChannel::new();
        let mut sink = open_sink();
        for i in 1..=3 {
            channel.publish(&mut sink, &snapshot(i));
        }
        let indices: Vec<usize> = sink
            .sent
            .iter()
            .map(|m| match m {
                PresenterMessage::SlideState(s) => s.current_index,
                other => panic!("unexpected {other:?}"),
            })
            .collect();
        assert_eq!(indices, vec![1, 2, 3]);
    }

    #[test]
    fn test_jokes_never_deduplicated() {
        let mut channel = SyncChannel::new();
        let mut sink = open_sink();
        let joke = joke();
        channel.send_joke(&mut sink, &joke);
        channel.send_joke(&mut sink, &joke);
        channel.dismiss_joke(&mut sink);
        channel.dismiss_joke(&mut sink);
        let shows = sink
            .sent
            .iter()
            .filter(|m| matches!(m, PresenterMessage::ShowJoke { .. }))
            .count();
        assert_eq!(shows, 2);
        assert_eq!(sink.sent.len(), 4);
    }

    #[test]
    fn test_failure_is_retried_on_next_publish() {
        let mut channel = SyncChannel::new();
        let mut sink = open_sink();
        sink.fail = true;
        assert_eq!(channel.publish(&mut sink, &snapshot(1)), SendOutcome::Failed);
        sink.fail = false;
        assert_eq!(channel.publish(&mut sink, &snapshot(1)), SendOutcome::Sent);
    }

    #[test]
    fn test_closed_sink() {
        let mut channel = SyncChannel::new();
        let mut sink = RecordingSink::default();
        assert_eq!(channel.publish(&mut sink, &snapshot(1)), SendOutcome::NoSurface);
        assert_eq!(channel.send_joke(&mut sink, &joke()), SendOutcome::NoSurface);
        sink.open = true;
        assert_eq!(channel.publish(&mut sink, &snapshot(1)), SendOutcome::Sent);
    }
}
