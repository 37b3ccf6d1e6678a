//! Shared typing-indicator state with a keystroke debounce.
//!
//! Local side: the first keystroke publishes `true`; every keystroke
//! re-arms an idle deadline, and once [`TYPING_IDLE`] passes without input
//! (or a message is sent) the flag is published as `false`. Remote side:
//! merged typing documents are reduced to a display label.
//!
//! The tracker is generic over the instant type so tests can drive it with
//! a simulated clock.

use std::ops::Sub;
use std::time::Duration;

use hearth_proto::{TypingDoc, UserId};

/// Idle window after the last keystroke before typing is withdrawn.
pub const TYPING_IDLE: Duration = Duration::from_secs(3);

/// A merge write of `{me: flag}` into the current room's typing document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypingWrite {
    /// The flag value to publish for the local user.
    pub flag: bool,
}

/// Typing state for the local user plus the label derived from peers.
#[derive(Debug)]
pub struct TypingTracker<I> {
    me: UserId,
    /// Whether our last published flag was `true`.
    marked: bool,
    last_keystroke: Option<I>,
    others: Vec<UserId>,
}

impl<I> TypingTracker<I>
where
    I: Copy + Ord + Sub<Output = Duration>,
{
    /// A tracker with no typing state in either direction.
    pub fn new(me: UserId) -> Self {
        Self {
            me,
            marked: false,
            last_keystroke: None,
            others: Vec::new(),
        }
    }

    /// Record a keystroke. Returns a `true` write on the transition from
    /// idle to typing; subsequent keystrokes only re-arm the deadline.
    pub fn keystroke(&mut self, now: I) -> Option<TypingWrite> {
        self.last_keystroke = Some(now);
        if self.marked {
            return None;
        }
        self.marked = true;
        Some(TypingWrite { flag: true })
    }

    /// Check the idle deadline. Returns a `false` write once the window
    /// elapses with no further keystrokes.
    pub fn tick(&mut self, now: I) -> Option<TypingWrite> {
        if !self.marked {
            return None;
        }
        let last = self.last_keystroke?;
        if now - last < TYPING_IDLE {
            return None;
        }
        self.withdraw()
    }

    /// A message was sent: typing stops immediately regardless of the
    /// deadline.
    pub fn message_sent(&mut self) -> Option<TypingWrite> {
        self.withdraw()
    }

    /// Reset both directions for a room switch. No write is emitted; the
    /// old room's flag is left behind, matching the ephemeral, merge-only
    /// nature of typing documents.
    pub fn clear(&mut self) {
        self.marked = false;
        self.last_keystroke = None;
        self.others.clear();
    }

    /// Apply a remote typing document, returning the new label (if it
    /// changed the set of peers shown as typing).
    pub fn apply_remote(&mut self, doc: &TypingDoc) -> Option<String> {
        self.others = doc.others_typing(&self.me).into_iter().cloned().collect();
        self.label()
    }

    /// Display label for peers currently typing. `None` when nobody is.
    pub fn label(&self) -> Option<String> {
        match self.others.as_slice() {
            [] => None,
            [one] => Some(format!("{one} is typing...")),
            _ => Some("Several people are typing...".to_owned()),
        }
    }

    fn withdraw(&mut self) -> Option<TypingWrite> {
        if !self.marked {
            return None;
        }
        self.marked = false;
        self.last_keystroke = None;
        Some(TypingWrite { flag: false })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    /// Millisecond-granularity test clock satisfying the instant bound.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
    struct FakeInstant(u64);

    impl Sub for FakeInstant {
        type Output = Duration;
        fn sub(self, rhs: Self) -> Duration {
            Duration::from_millis(self.0 - rhs.0)
        }
    }

    fn tracker() -> TypingTracker<FakeInstant> {
        TypingTracker::new(UserId::from("me@x.io"))
    }

    #[test]
    fn first_keystroke_publishes_true_once() {
        let mut typing = tracker();
        assert_eq!(
            typing.keystroke(FakeInstant(0)),
            Some(TypingWrite { flag: true })
        );
        assert_eq!(typing.keystroke(FakeInstant(100)), None);
        assert_eq!(typing.keystroke(FakeInstant(200)), None);
    }

    #[test]
    fn idle_window_withdraws_typing() {
        let mut typing = tracker();
        typing.keystroke(FakeInstant(0));
        assert_eq!(typing.tick(FakeInstant(2_999)), None);
        assert_eq!(
            typing.tick(FakeInstant(3_000)),
            Some(TypingWrite { flag: false })
        );
        // Withdrawn once only.
        assert_eq!(typing.tick(FakeInstant(10_000)), None);
    }

    #[test]
    fn keystrokes_rearm_the_deadline() {
        let mut typing = tracker();
        typing.keystroke(FakeInstant(0));
        typing.keystroke(FakeInstant(2_500));
        // 3s after the first keystroke, but only 500ms after the last.
        assert_eq!(typing.tick(FakeInstant(3_000)), None);
        assert_eq!(
            typing.tick(FakeInstant(5_500)),
            Some(TypingWrite { flag: false })
        );
    }

    #[test]
    fn sending_withdraws_immediately() {
        let mut typing = tracker();
        typing.keystroke(FakeInstant(0));
        assert_eq!(typing.message_sent(), Some(TypingWrite { flag: false }));
        assert_eq!(typing.message_sent(), None);
        // Next keystroke starts a fresh cycle.
        assert_eq!(
            typing.keystroke(FakeInstant(100)),
            Some(TypingWrite { flag: true })
        );
    }

    #[test]
    fn label_ignores_self_and_false_flags() {
        let mut typing = tracker();
        let mut doc = TypingDoc::default();
        doc.0.insert(UserId::from("me@x.io"), true);
        doc.0.insert(UserId::from("a@x.io"), false);
        assert_eq!(typing.apply_remote(&doc), None);

        doc.0.insert(UserId::from("a@x.io"), true);
        assert_eq!(
            typing.apply_remote(&doc),
            Some("a@x.io is typing...".to_owned())
        );

        doc.0.insert(UserId::from("b@x.io"), true);
        assert_eq!(
            typing.apply_remote(&doc),
            Some("Several people are typing...".to_owned())
        );
    }

    #[test]
    fn clear_resets_both_directions() {
        let mut typing = tracker();
        typing.keystroke(FakeInstant(0));
        let mut doc = TypingDoc::default();
        doc.0.insert(UserId::from("a@x.io"), true);
        typing.apply_remote(&doc);

        typing.clear();
        assert_eq!(typing.label(), None);
        assert_eq!(typing.tick(FakeInstant(60_000)), None);
        assert_eq!(
            typing.keystroke(FakeInstant(60_001)),
            Some(TypingWrite { flag: true })
        );
    }
}
