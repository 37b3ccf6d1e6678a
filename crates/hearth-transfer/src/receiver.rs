//! Receiver-side transfer state machine.
//!
//! One machine per incoming offer. The driver watches the signaling
//! collection for records addressed to the local user, prompts on a fresh
//! offer, and on accept creates the answer on the transport before feeding
//! it in. Received frames accumulate until the end-of-stream sentinel,
//! which triggers a save action with the assembled bytes.

use hearth_proto::{DocId, SignalDoc, UserId};

use crate::chunker::{Assembler, Frame};

/// Receiver lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiverState {
    /// No offer pending.
    Idle,
    /// An offer addressed to us awaits the user's accept/reject decision.
    OfferReceived,
    /// The answer is published; waiting for the channel.
    AnswerSent,
    /// Binary frames are arriving.
    Receiving,
    /// The file has been assembled and handed off.
    Assembled,
}

/// Side effects the driver must perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReceiverAction {
    /// Ask the user to accept or reject the offered file.
    PromptUser {
        /// Signaling record id.
        id: DocId,
        /// Offering peer.
        from: UserId,
        /// Name of the offered file.
        file_name: String,
    },
    /// Write the answer into the signaling record (merge, in place).
    PublishAnswer {
        /// Signaling record id.
        id: DocId,
        /// Serialized session-description answer.
        answer: String,
    },
    /// Delete the signaling record, cancelling the transfer. The sender is
    /// not notified.
    DeleteSignal(DocId),
    /// Persist the assembled file locally.
    SaveFile {
        /// Name from the offer's metadata.
        file_name: String,
        /// Complete file content.
        bytes: Vec<u8>,
    },
}

/// One incoming transfer.
#[derive(Debug)]
pub struct Receiver {
    me: UserId,
    state: ReceiverState,
    pending: Option<(DocId, SignalDoc)>,
    assembler: Assembler,
}

impl Receiver {
    /// An idle receiver for the local user.
    pub fn new(me: UserId) -> Self {
        Self {
            me,
            state: ReceiverState::Idle,
            pending: None,
            assembler: Assembler::new(),
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ReceiverState {
        self.state
    }

    /// The offer under consideration, for building the answer on the
    /// transport.
    pub fn offer(&self) -> Option<&str> {
        self.pending.as_ref().map(|(_, doc)| doc.offer.as_str())
    }

    /// A signaling record was delivered. Only a pending offer addressed to
    /// the local user while idle starts a transfer; answered records and
    /// records for other users are ignored.
    pub fn offer_observed(&mut self, id: DocId, doc: SignalDoc) -> Vec<ReceiverAction> {
        if self.state != ReceiverState::Idle || !doc.is_pending_offer_for(&self.me) {
            return Vec::new();
        }
        self.state = ReceiverState::OfferReceived;
        let prompt = ReceiverAction::PromptUser {
            id: id.clone(),
            from: doc.from.clone(),
            file_name: doc.file_name.clone(),
        };
        self.pending = Some((id, doc));
        vec![prompt]
    }

    /// The user accepted and the transport produced `answer` from the
    /// stored offer.
    pub fn accepted(&mut self, answer: String) -> Vec<ReceiverAction> {
        if self.state != ReceiverState::OfferReceived {
            return Vec::new();
        }
        let Some((id, _)) = self.pending.as_ref() else {
            return Vec::new();
        };
        self.state = ReceiverState::AnswerSent;
        vec![ReceiverAction::PublishAnswer {
            id: id.clone(),
            answer,
        }]
    }

    /// The user rejected the offer.
    pub fn rejected(&mut self) -> Vec<ReceiverAction> {
        if self.state != ReceiverState::OfferReceived {
            return Vec::new();
        }
        self.state = ReceiverState::Idle;
        match self.pending.take() {
            Some((id, _)) => vec![ReceiverAction::DeleteSignal(id)],
            None => Vec::new(),
        }
    }

    /// A frame arrived on the data channel.
    pub fn frame_received(&mut self, frame: Frame) -> Vec<ReceiverAction> {
        if !matches!(
            self.state,
            ReceiverState::AnswerSent | ReceiverState::Receiving
        ) {
            return Vec::new();
        }
        self.state = ReceiverState::Receiving;
        let Some(bytes) = self.assembler.push(frame) else {
            return Vec::new();
        };
        self.state = ReceiverState::Assembled;
        let file_name = self
            .pending
            .as_ref()
            .map(|(_, doc)| doc.file_name.clone())
            .unwrap_or_default();
        vec![ReceiverAction::SaveFile { file_name, bytes }]
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::chunker::END_OF_STREAM;

    fn offer_doc() -> SignalDoc {
        SignalDoc::offer(
            UserId::from("a@x.io"),
            UserId::from("b@x.io"),
            "offer-sdp".into(),
            "notes.txt",
        )
    }

    fn with_offer() -> Receiver {
        let mut receiver = Receiver::new(UserId::from("b@x.io"));
        receiver.offer_observed(DocId::from("sig-1"), offer_doc());
        receiver
    }

    #[test]
    fn pending_offer_for_self_prompts() {
        let mut receiver = Receiver::new(UserId::from("b@x.io"));
        let actions = receiver.offer_observed(DocId::from("sig-1"), offer_doc());
        assert_eq!(
            actions,
            vec![ReceiverAction::PromptUser {
                id: DocId::from("sig-1"),
                from: UserId::from("a@x.io"),
                file_name: "notes.txt".into(),
            }]
        );
        assert_eq!(receiver.state(), ReceiverState::OfferReceived);
        assert_eq!(receiver.offer(), Some("offer-sdp"));
    }

    #[test]
    fn offers_for_other_users_are_ignored() {
        let mut receiver = Receiver::new(UserId::from("c@x.io"));
        assert!(
            receiver
                .offer_observed(DocId::from("sig-1"), offer_doc())
                .is_empty()
        );
        assert_eq!(receiver.state(), ReceiverState::Idle);
    }

    #[test]
    fn already_answered_records_are_ignored() {
        let mut receiver = Receiver::new(UserId::from("b@x.io"));
        let mut doc = offer_doc();
        doc.answer = Some("answer-sdp".into());
        assert!(
            receiver
                .offer_observed(DocId::from("sig-1"), doc)
                .is_empty()
        );
    }

    #[test]
    fn accept_publishes_the_answer_in_place() {
        let mut receiver = with_offer();
        assert_eq!(
            receiver.accepted("answer-sdp".into()),
            vec![ReceiverAction::PublishAnswer {
                id: DocId::from("sig-1"),
                answer: "answer-sdp".into(),
            }]
        );
        assert_eq!(receiver.state(), ReceiverState::AnswerSent);
    }

    #[test]
    fn reject_deletes_the_record_and_returns_to_idle() {
        let mut receiver = with_offer();
        assert_eq!(
            receiver.rejected(),
            vec![ReceiverAction::DeleteSignal(DocId::from("sig-1"))]
        );
        assert_eq!(receiver.state(), ReceiverState::Idle);
        // A new offer can start over.
        assert!(
            !receiver
                .offer_observed(DocId::from("sig-2"), offer_doc())
                .is_empty()
        );
    }

    #[test]
    fn frames_assemble_on_the_sentinel() {
        let mut receiver = with_offer();
        receiver.accepted("answer-sdp".into());

        assert!(receiver.frame_received(Frame::Binary(vec![1, 2])).is_empty());
        assert_eq!(receiver.state(), ReceiverState::Receiving);
        assert!(receiver.frame_received(Frame::Binary(vec![3])).is_empty());

        let actions = receiver.frame_received(Frame::Text(END_OF_STREAM.to_owned()));
        assert_eq!(
            actions,
            vec![ReceiverAction::SaveFile {
                file_name: "notes.txt".into(),
                bytes: vec![1, 2, 3],
            }]
        );
        assert_eq!(receiver.state(), ReceiverState::Assembled);
    }

    #[test]
    fn frames_before_accept_are_dropped() {
        let mut receiver = with_offer();
        assert!(receiver.frame_received(Frame::Binary(vec![1])).is_empty());
        assert_eq!(receiver.state(), ReceiverState::OfferReceived);
    }
}
