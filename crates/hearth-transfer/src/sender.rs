//! Sender-side transfer state machine.
//!
//! One machine per outgoing file. The driver creates the connection offer
//! on the transport, feeds it in, executes the resulting actions (publish
//! the signaling record, apply the answer, send frames), and reports frame
//! completions back so the next chunk is read only after the previous one
//! was sent.

use hearth_proto::{DocId, SignalDoc, UserId};

use crate::chunker::{Chunker, Frame};

/// Sender lifecycle. There are no timeouts: a receiver that never answers
/// or a channel that never opens leaves the machine parked forever.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SenderState {
    /// Nothing offered yet.
    Idle,
    /// The offer is published; waiting for the answer and the channel.
    OfferCreated,
    /// The answer has been applied; waiting for the channel to open.
    Connected,
    /// Chunks are streaming over the open channel.
    Streaming,
    /// The sentinel has been sent.
    Done,
}

/// Side effects the driver must perform, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SenderAction {
    /// Append this record to the signaling collection and report the
    /// assigned id via [`Sender::offer_published`].
    PublishOffer(SignalDoc),
    /// Set the peer connection's remote description. Emitted at most once
    /// per transfer.
    ApplyRemoteDescription(String),
    /// Send one frame over the data channel, then call
    /// [`Sender::frame_sent`].
    SendFrame(Frame),
}

/// One outgoing transfer.
#[derive(Debug)]
pub struct Sender {
    me: UserId,
    state: SenderState,
    chunker: Option<Chunker>,
    signal_id: Option<DocId>,
    remote_applied: bool,
}

impl Sender {
    /// An idle sender for the local user.
    pub fn new(me: UserId) -> Self {
        Self {
            me,
            state: SenderState::Idle,
            chunker: None,
            signal_id: None,
            remote_applied: false,
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SenderState {
        self.state
    }

    /// The transport produced a connection offer for `file` addressed to
    /// `to`: publish it as a signaling record.
    pub fn offer_ready(
        &mut self,
        to: UserId,
        file_name: &str,
        offer: String,
        file: Vec<u8>,
    ) -> Vec<SenderAction> {
        if self.state != SenderState::Idle {
            return Vec::new();
        }
        self.state = SenderState::OfferCreated;
        self.chunker = Some(Chunker::new(file));
        vec![SenderAction::PublishOffer(SignalDoc::offer(
            self.me.clone(),
            to,
            offer,
            file_name,
        ))]
    }

    /// The signaling record was written under `id`.
    pub fn offer_published(&mut self, id: DocId) {
        self.signal_id = Some(id);
    }

    /// A signaling record changed. Applies the answer exactly once: the
    /// record is matched against this transfer's id, and later deliveries
    /// of the same (or a re-modified) record are ignored once the remote
    /// description is set.
    pub fn signal_changed(&mut self, id: &DocId, doc: &SignalDoc) -> Vec<SenderAction> {
        if self.signal_id.as_ref() != Some(id) || self.remote_applied {
            return Vec::new();
        }
        let Some(answer) = doc.answer.clone() else {
            return Vec::new();
        };
        self.remote_applied = true;
        if self.state == SenderState::OfferCreated {
            self.state = SenderState::Connected;
        }
        vec![SenderAction::ApplyRemoteDescription(answer)]
    }

    /// The data channel reported open: start streaming.
    pub fn channel_open(&mut self) -> Vec<SenderAction> {
        if !matches!(
            self.state,
            SenderState::OfferCreated | SenderState::Connected
        ) {
            return Vec::new();
        }
        self.state = SenderState::Streaming;
        self.advance()
    }

    /// The previous frame finished sending: read and send the next one.
    pub fn frame_sent(&mut self) -> Vec<SenderAction> {
        if self.state != SenderState::Streaming {
            return Vec::new();
        }
        self.advance()
    }

    fn advance(&mut self) -> Vec<SenderAction> {
        match self.chunker.as_mut().and_then(Chunker::next_frame) {
            Some(frame) => vec![SenderAction::SendFrame(frame)],
            None => {
                self.state = SenderState::Done;
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::chunker::{CHUNK_SIZE, END_OF_STREAM};

    fn offered(file: Vec<u8>) -> Sender {
        let mut sender = Sender::new(UserId::from("a@x.io"));
        sender.offer_ready(UserId::from("b@x.io"), "notes.txt", "offer-sdp".into(), file);
        sender.offer_published(DocId::from("sig-1"));
        sender
    }

    fn answered(doc_answer: &str) -> SignalDoc {
        let mut doc = SignalDoc::offer(
            UserId::from("a@x.io"),
            UserId::from("b@x.io"),
            "offer-sdp".into(),
            "notes.txt",
        );
        doc.answer = Some(doc_answer.to_owned());
        doc
    }

    #[test]
    fn offer_publishes_a_signal_record() {
        let mut sender = Sender::new(UserId::from("a@x.io"));
        let actions = sender.offer_ready(
            UserId::from("b@x.io"),
            "notes.txt",
            "offer-sdp".into(),
            vec![1, 2, 3],
        );
        let SenderAction::PublishOffer(doc) = &actions[0] else {
            panic!("expected publish");
        };
        assert_eq!(doc.to, UserId::from("b@x.io"));
        assert_eq!(doc.offer, "offer-sdp");
        assert!(doc.answer.is_none());
        assert_eq!(sender.state(), SenderState::OfferCreated);
    }

    #[test]
    fn answers_apply_exactly_once() {
        let mut sender = offered(vec![0; 10]);
        let doc = answered("answer-sdp");

        let actions = sender.signal_changed(&DocId::from("sig-1"), &doc);
        assert_eq!(
            actions,
            vec![SenderAction::ApplyRemoteDescription("answer-sdp".into())]
        );
        assert_eq!(sender.state(), SenderState::Connected);

        // A re-delivered or re-modified record is ignored.
        assert!(sender.signal_changed(&DocId::from("sig-1"), &doc).is_empty());
    }

    #[test]
    fn foreign_signal_records_are_ignored() {
        let mut sender = offered(vec![0; 10]);
        let doc = answered("answer-sdp");
        assert!(sender.signal_changed(&DocId::from("sig-2"), &doc).is_empty());
    }

    #[test]
    fn streaming_is_sequential_and_ends_with_the_sentinel() {
        let mut sender = offered(vec![7; CHUNK_SIZE + 1]);
        sender.signal_changed(&DocId::from("sig-1"), &answered("answer-sdp"));

        let mut frames = Vec::new();
        let mut actions = sender.channel_open();
        while let Some(SenderAction::SendFrame(frame)) = actions.first().cloned() {
            frames.push(frame);
            actions = sender.frame_sent();
        }

        assert_eq!(frames.len(), 3);
        assert_eq!(frames[0], Frame::Binary(vec![7; CHUNK_SIZE]));
        assert_eq!(frames[1], Frame::Binary(vec![7]));
        assert_eq!(frames[2], Frame::Text(END_OF_STREAM.to_owned()));
        assert_eq!(sender.state(), SenderState::Done);
    }

    #[test]
    fn channel_open_before_the_answer_still_streams() {
        let mut sender = offered(vec![1]);
        assert!(!sender.channel_open().is_empty());
        assert_eq!(sender.state(), SenderState::Streaming);
    }
}
