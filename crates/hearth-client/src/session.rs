//! The session driver: owns the machines, executes their actions against
//! the store, and routes subscription deliveries back into them.
//!
//! All shared state lives in this object; nothing is global. Subscriptions
//! are held as guards in [`RoomScope`], so replacing the scope on a room
//! switch tears the previous listeners down and at most one live listener
//! set exists per concern.
//!
//! Remote deliveries are processed by [`Session::drain_remote`] (pull
//! everything already queued, deterministic, used directly by tests) and
//! [`Session::pump`] (await the next delivery, then drain).

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;
use tracing::{debug, warn};

use hearth_proto::{
    Document, GENERAL_ROOM, PresenceDoc, RoomDoc, RoomName, TypingDoc, UserId, from_document,
    paths, to_document,
};
use hearth_store::{ChangeBatch, ChangeKind, ConnState, DocStore, Query, Subscription};

use crate::error::ClientError;
use crate::event::SessionEvent;
use crate::feed::{Feed, SendOutcome};
use crate::presence::{Presence, PresenceAction, Roster};
use crate::room::{RoomAction, RoomSync, SetOp};
use crate::typing::TypingTracker;

/// Subscription guards for the current room, one per concern. Dropping the
/// scope unsubscribes everything.
#[derive(Default)]
struct RoomScope {
    room_doc: Option<Subscription>,
    chat: Option<Subscription>,
    typing: Option<Subscription>,
}

/// Which source woke [`Session::pump`].
enum Wake {
    Conn,
    RoomDoc(ChangeBatch),
    Chat(ChangeBatch),
    Typing(ChangeBatch),
    Presence(ChangeBatch),
    Closed,
}

/// One signed-in user's live session against the store.
pub struct Session<S: DocStore> {
    store: Arc<S>,
    me: UserId,
    room: RoomSync,
    feed: Feed,
    typing: TypingTracker<Instant>,
    presence: Presence,
    roster: Roster,
    scope: RoomScope,
    presence_sub: Option<Subscription>,
    conn: watch::Receiver<ConnState>,
    events: mpsc::UnboundedSender<SessionEvent>,
}

impl<S: DocStore> Session<S> {
    /// Sign in: publish presence for the current connectivity state,
    /// subscribe to the presence roster, and enter the default room
    /// (creating it on first ever login).
    ///
    /// Returns the session and the event stream the UI renders from.
    ///
    /// # Errors
    ///
    /// Fails when the initial subscriptions or the default-room entry
    /// cannot be established.
    pub async fn login(
        store: Arc<S>,
        me: UserId,
    ) -> Result<(Self, mpsc::UnboundedReceiver<SessionEvent>), ClientError> {
        let (events, events_rx) = mpsc::unbounded_channel();
        let conn = store.connection();
        let presence_sub = store.subscribe(Query::collection(paths::PRESENCE)).await?;

        let mut session = Self {
            store,
            me: me.clone(),
            room: RoomSync::new(me.clone()),
            feed: Feed::new(me.clone()),
            typing: TypingTracker::new(me.clone()),
            presence: Presence::new(me),
            roster: Roster::new(),
            scope: RoomScope::default(),
            presence_sub: Some(presence_sub),
            conn,
            events,
        };

        let state = *session.conn.borrow_and_update();
        session.apply_connectivity(state).await?;
        session.create_or_join(RoomName::new(GENERAL_ROOM)).await?;
        Ok((session, events_rx))
    }

    /// The signed-in user.
    pub fn me(&self) -> &UserId {
        &self.me
    }

    /// The room currently selected, if any.
    pub fn current_room(&self) -> Option<&RoomName> {
        self.room.current()
    }

    /// The message feed for the current room.
    pub fn feed(&self) -> &Feed {
        &self.feed
    }

    /// The set of users currently online.
    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    /// Switch to an existing room.
    ///
    /// # Errors
    ///
    /// Fails when the new room's subscriptions cannot be established. The
    /// membership write is not fatal; its failure is logged and the switch
    /// proceeds.
    pub async fn join_room(&mut self, room: RoomName) -> Result<(), ClientError> {
        let actions = self.room.join_room(room);
        self.execute(actions).await?;
        self.drain_remote().await
    }

    /// Switch to a room, creating it first if it does not exist yet.
    ///
    /// # Errors
    ///
    /// Fails when the existence check, the create write, or the
    /// subscriptions fail.
    pub async fn create_or_join(&mut self, room: RoomName) -> Result<(), ClientError> {
        let actions = self.room.create_or_join(room);
        self.execute(actions).await?;
        self.drain_remote().await
    }

    /// Ask to leave the current room. Emits either a refusal (default
    /// room) or a confirmation request; no write happens yet.
    pub async fn leave_room(&mut self) -> Result<(), ClientError> {
        let actions = self.room.leave_room();
        self.execute(actions).await?;
        self.drain_remote().await
    }

    /// The user confirmed leaving: membership and admin bit are removed
    /// and the session falls back to the default room. Refused for the
    /// default room itself, even without a preceding [`Session::leave_room`].
    pub async fn confirm_leave(&mut self) -> Result<(), ClientError> {
        let actions = self.room.leave_confirmed();
        self.execute(actions).await?;
        self.drain_remote().await
    }

    /// Add a user to the current room's member set.
    pub async fn add_member(&mut self, user: UserId) -> Result<(), ClientError> {
        let actions = self.room.add_member(user);
        self.execute(actions).await?;
        self.drain_remote().await
    }

    /// Remove a user from the current room, clearing their admin bit too.
    pub async fn remove_member(&mut self, user: UserId) -> Result<(), ClientError> {
        let actions = self.room.remove_member(user);
        self.execute(actions).await?;
        self.drain_remote().await
    }

    /// Promote a member of the current room to admin. Refused locally when
    /// the target is not a member or the admin cap is reached.
    pub async fn promote_member(&mut self, user: UserId) -> Result<(), ClientError> {
        let actions = self.room.promote_member(user);
        self.execute(actions).await?;
        self.drain_remote().await
    }

    /// Send the current draft. A blank draft writes nothing. On success
    /// [`SessionEvent::MessageSent`] tells the UI to clear the input and
    /// the typing flag is withdrawn; on failure the input stays as-is.
    ///
    /// # Errors
    ///
    /// Fails when no room is selected or the append fails. The failure is
    /// also reported as [`SessionEvent::OperationFailed`].
    pub async fn send_message(&mut self, draft: &str) -> Result<(), ClientError> {
        let Some(room) = self.room.current().cloned() else {
            return Err(ClientError::NoRoom);
        };
        let SendOutcome::Write(doc) = self.feed.prepare_send(draft) else {
            return Ok(());
        };
        let doc = to_document(&doc)?;
        match self.store.add(&paths::room_chat(&room), doc).await {
            Ok(id) => {
                debug!(%room, %id, "message sent");
                self.emit(SessionEvent::MessageSent);
                if let Some(write) = self.typing.message_sent() {
                    self.publish_typing(&room, write.flag).await?;
                }
                self.drain_remote().await
            }
            Err(error) => {
                self.emit(SessionEvent::OperationFailed {
                    context: "send message",
                    error: error.to_string(),
                });
                Err(error.into())
            }
        }
    }

    /// Record a keystroke in the message input. The first keystroke of a
    /// burst publishes the typing flag; later ones only re-arm the idle
    /// deadline checked by [`Session::tick`].
    pub async fn keystroke(&mut self) -> Result<(), ClientError> {
        let Some(room) = self.room.current().cloned() else {
            return Ok(());
        };
        if let Some(write) = self.typing.keystroke(Instant::now()) {
            self.publish_typing(&room, write.flag).await?;
        }
        Ok(())
    }

    /// Check the typing idle deadline. Hosts call this periodically; once
    /// the idle window elapses the typing flag is withdrawn.
    pub async fn tick(&mut self) -> Result<(), ClientError> {
        let Some(room) = self.room.current().cloned() else {
            return Ok(());
        };
        if let Some(write) = self.typing.tick(Instant::now()) {
            self.publish_typing(&room, write.flag).await?;
        }
        Ok(())
    }

    /// Sign out: tear down every subscription and mark the user offline.
    pub async fn logout(mut self) -> Result<(), ClientError> {
        self.scope = RoomScope::default();
        self.presence_sub = None;
        let doc = to_document(&PresenceDoc::offline())?;
        self.store
            .set(&paths::presence(&self.me), doc, false)
            .await?;
        Ok(())
    }

    /// Process every remote delivery already queued, until quiescent.
    ///
    /// # Errors
    ///
    /// Fails when executing a resulting action against the store fails.
    pub async fn drain_remote(&mut self) -> Result<(), ClientError> {
        loop {
            let mut progressed = false;

            while self.conn.has_changed().unwrap_or(false) {
                let state = *self.conn.borrow_and_update();
                self.apply_connectivity(state).await?;
                progressed = true;
            }

            for batch in Self::take_batches(&mut self.scope.room_doc) {
                self.apply_room_doc_batch(&batch).await?;
                progressed = true;
            }
            for batch in Self::take_batches(&mut self.scope.chat) {
                self.apply_chat_batch(&batch);
                progressed = true;
            }
            for batch in Self::take_batches(&mut self.scope.typing) {
                self.apply_typing_batch(&batch);
                progressed = true;
            }
            for batch in Self::take_batches(&mut self.presence_sub) {
                self.apply_presence_batch(&batch);
                progressed = true;
            }

            if !progressed {
                return Ok(());
            }
        }
    }

    /// Await the next remote delivery, apply it, then drain whatever else
    /// queued up meanwhile. Returns without work when every source has
    /// closed.
    ///
    /// # Errors
    ///
    /// Fails when executing a resulting action against the store fails.
    pub async fn pump(&mut self) -> Result<(), ClientError> {
        let wake = {
            let scope = &mut self.scope;
            tokio::select! {
                changed = self.conn.changed() => {
                    if changed.is_ok() { Wake::Conn } else { Wake::Closed }
                }
                Some(batch) = Self::next_from(&mut scope.room_doc) => Wake::RoomDoc(batch),
                Some(batch) = Self::next_from(&mut scope.chat) => Wake::Chat(batch),
                Some(batch) = Self::next_from(&mut scope.typing) => Wake::Typing(batch),
                Some(batch) = Self::next_from(&mut self.presence_sub) => Wake::Presence(batch),
            }
        };
        match wake {
            Wake::Conn => {
                let state = *self.conn.borrow_and_update();
                self.apply_connectivity(state).await?;
            }
            Wake::RoomDoc(batch) => self.apply_room_doc_batch(&batch).await?,
            Wake::Chat(batch) => self.apply_chat_batch(&batch),
            Wake::Typing(batch) => self.apply_typing_batch(&batch),
            Wake::Presence(batch) => self.apply_presence_batch(&batch),
            Wake::Closed => return Ok(()),
        }
        self.drain_remote().await
    }

    async fn next_from(sub: &mut Option<Subscription>) -> Option<ChangeBatch> {
        match sub {
            Some(sub) => sub.next_batch().await,
            None => std::future::pending().await,
        }
    }

    fn take_batches(sub: &mut Option<Subscription>) -> Vec<ChangeBatch> {
        let mut batches = Vec::new();
        if let Some(sub) = sub.as_mut() {
            while let Some(batch) = sub.try_next_batch() {
                batches.push(batch);
            }
        }
        batches
    }

    async fn apply_connectivity(&mut self, state: ConnState) -> Result<(), ClientError> {
        self.emit(SessionEvent::Connectivity(state));
        for action in self.presence.connection_changed(state) {
            match action {
                PresenceAction::RegisterOffline(user, doc) => {
                    self.store
                        .on_disconnect_set(&paths::presence(&user), to_document(&doc)?)
                        .await?;
                }
                PresenceAction::WriteOnline(user, doc) => {
                    self.store
                        .set(&paths::presence(&user), to_document(&doc)?, false)
                        .await?;
                }
            }
        }
        Ok(())
    }

    async fn apply_room_doc_batch(&mut self, batch: &ChangeBatch) -> Result<(), ClientError> {
        for change in batch {
            if change.kind == ChangeKind::Removed {
                continue;
            }
            let Ok(doc) = from_document::<RoomDoc>(&change.doc) else {
                warn!(id = %change.id, "malformed room document skipped");
                continue;
            };
            let room = RoomName::new(change.id.as_str());
            let actions = self.room.room_doc_changed(&room, doc);
            self.execute(actions).await?;
        }
        Ok(())
    }

    fn apply_chat_batch(&mut self, batch: &ChangeBatch) {
        for row in self.feed.apply_batch(batch) {
            self.emit(SessionEvent::MessageAppended(row));
        }
    }

    fn apply_typing_batch(&mut self, batch: &ChangeBatch) {
        for change in batch {
            let doc = if change.kind == ChangeKind::Removed {
                TypingDoc::default()
            } else {
                from_document::<TypingDoc>(&change.doc).unwrap_or_default()
            };
            let label = self.typing.apply_remote(&doc);
            self.emit(SessionEvent::TypingLabel(label));
        }
    }

    fn apply_presence_batch(&mut self, batch: &ChangeBatch) {
        if self.roster.apply_batch(batch) {
            let online = self.roster.online().cloned().collect();
            self.emit(SessionEvent::RosterChanged(online));
        }
    }

    /// Execute room actions with a worklist: fetch results feed further
    /// actions back into the queue without recursion.
    async fn execute(&mut self, initial: Vec<RoomAction>) -> Result<(), ClientError> {
        let mut pending = initial;
        while !pending.is_empty() {
            let actions = std::mem::take(&mut pending);
            for action in actions {
                match action {
                    RoomAction::ClearRoomScope => {
                        self.scope = RoomScope::default();
                        self.feed.clear();
                        self.typing.clear();
                        self.emit(SessionEvent::TypingLabel(None));
                    }
                    RoomAction::SetRoomLabel(room) => {
                        self.emit(SessionEvent::RoomChanged(room));
                    }
                    RoomAction::EnsureMembership(room) => {
                        let value = Value::String(self.me.as_str().to_owned());
                        if let Err(error) = self
                            .store
                            .array_union(&paths::room(&room), "members", value)
                            .await
                        {
                            warn!(%room, %error, "membership write failed, join proceeds");
                        }
                    }
                    RoomAction::CreateRoom(room, doc) => {
                        debug!(%room, "creating room");
                        self.write_or_report(
                            "create room",
                            &paths::room(&room),
                            to_document(&doc)?,
                        )
                        .await?;
                    }
                    RoomAction::FetchRoom(room) => {
                        let exists = self.store.get(&paths::room(&room)).await?.is_some();
                        pending.extend(self.room.room_fetched(&room, exists));
                    }
                    RoomAction::SubscribeRoomScope(room) => {
                        self.scope = self.subscribe_scope(&room).await?;
                    }
                    RoomAction::MutateMembers(room, user, op) => {
                        self.mutate_array("update members", &room, "members", &user, op)
                            .await?;
                    }
                    RoomAction::MutateAdmins(room, user, op) => {
                        self.mutate_array("update admins", &room, "admins", &user, op)
                            .await?;
                    }
                    RoomAction::ConfirmLeave(room) => {
                        self.emit(SessionEvent::ConfirmLeave(room));
                    }
                    RoomAction::Refuse(refusal) => {
                        self.emit(SessionEvent::Refused(refusal));
                    }
                    RoomAction::AdminView(view) => {
                        self.emit(SessionEvent::AdminView(view));
                    }
                }
            }
        }
        Ok(())
    }

    async fn subscribe_scope(&self, room: &RoomName) -> Result<RoomScope, ClientError> {
        let room_doc = self.store.subscribe(Query::doc(&paths::room(room))).await?;
        let chat = self
            .store
            .subscribe(Query::collection(paths::room_chat(room)).order_by("ts"))
            .await?;
        let typing = self
            .store
            .subscribe(Query::doc(&paths::typing(room)))
            .await?;
        Ok(RoomScope {
            room_doc: Some(room_doc),
            chat: Some(chat),
            typing: Some(typing),
        })
    }

    async fn mutate_array(
        &mut self,
        context: &'static str,
        room: &RoomName,
        field: &str,
        user: &UserId,
        op: SetOp,
    ) -> Result<(), ClientError> {
        let path = paths::room(room);
        let value = Value::String(user.as_str().to_owned());
        let result = match op {
            SetOp::Add => self.store.array_union(&path, field, value).await,
            SetOp::Remove => self.store.array_remove(&path, field, value).await,
        };
        if let Err(error) = result {
            self.emit(SessionEvent::OperationFailed {
                context,
                error: error.to_string(),
            });
            return Err(error.into());
        }
        Ok(())
    }

    async fn write_or_report(
        &mut self,
        context: &'static str,
        path: &str,
        doc: Document,
    ) -> Result<(), ClientError> {
        if let Err(error) = self.store.set(path, doc, false).await {
            self.emit(SessionEvent::OperationFailed {
                context,
                error: error.to_string(),
            });
            return Err(error.into());
        }
        Ok(())
    }

    async fn publish_typing(&self, room: &RoomName, flag: bool) -> Result<(), ClientError> {
        let doc = to_document(&TypingDoc::entry(self.me.clone(), flag))?;
        self.store.set(&paths::typing(room), doc, true).await?;
        Ok(())
    }

    fn emit(&self, event: SessionEvent) {
        // The UI may have gone away; events are then dropped.
        let _ = self.events.send(event);
    }
}
