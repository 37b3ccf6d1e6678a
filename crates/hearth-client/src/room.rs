//! Room membership and switching state machine.
//!
//! [`RoomSync`] is pure state: user intents go in, [`RoomAction`]s come
//! out, and the driver executes them against the store. Remote room-document
//! snapshots are fed back through [`RoomSync::room_doc_changed`] so the
//! admin view always reflects the latest server state rather than local
//! optimism.

use std::fmt;

use hearth_proto::{GENERAL_ROOM, MAX_ADMINS, RoomDoc, RoomName, UserId};

/// Where the machine is in the join lifecycle of its current room.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinPhase {
    /// No room selected yet (pre-login or between switches).
    Unjoined,
    /// A room is selected and its listeners are being established.
    Joining,
    /// At least one room-document snapshot has arrived for the current room.
    Joined,
}

/// Set-mutation direction for member/admin edits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetOp {
    /// Add to the array field (idempotent union).
    Add,
    /// Remove from the array field (idempotent difference).
    Remove,
}

/// A user-visible refusal: the operation was rejected locally and no write
/// was attempted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Refusal {
    /// Leaving the default room is not allowed.
    LeaveGeneral,
    /// Promotion target is not a member of the current room.
    NotAMember(UserId),
    /// The admin set already holds [`MAX_ADMINS`] entries.
    AdminCapReached,
    /// No room snapshot has arrived yet, so membership cannot be checked.
    RoomStateUnknown,
}

impl fmt::Display for Refusal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LeaveGeneral => write!(f, "you cannot leave the {GENERAL_ROOM} room"),
            Self::NotAMember(user) => {
                write!(f, "{user} must be a member before becoming an admin")
            }
            Self::AdminCapReached => {
                write!(f, "a room can have at most {MAX_ADMINS} admins")
            }
            Self::RoomStateUnknown => write!(f, "room state has not loaded yet"),
        }
    }
}

/// Snapshot of the current room handed to the UI whenever the room
/// document changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminView {
    /// The room this view describes.
    pub room: RoomName,
    /// Whether the local user is the creator or holds an admin bit.
    pub is_privileged: bool,
    /// Room creator.
    pub creator: UserId,
    /// Current admin set, in stored order.
    pub admins: Vec<UserId>,
    /// Current member set, in stored order.
    pub members: Vec<UserId>,
}

/// Side effects the driver must perform, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoomAction {
    /// Tear down every room-scoped subscription before anything else.
    ClearRoomScope,
    /// Update the UI's room label.
    SetRoomLabel(RoomName),
    /// Add the local user to the room's member set. A failure here is
    /// logged and the join proceeds; membership converges on the next
    /// successful join.
    EnsureMembership(RoomName),
    /// Create the room document with the given initial state.
    CreateRoom(RoomName, RoomDoc),
    /// Fetch the room document once, then feed the result back through
    /// [`RoomSync::room_fetched`].
    FetchRoom(RoomName),
    /// Establish the room-document, chat and typing subscriptions for the
    /// room. Always preceded by [`RoomAction::ClearRoomScope`] in the same
    /// batch, so at most one live set exists per concern.
    SubscribeRoomScope(RoomName),
    /// Mutate the room's member array.
    MutateMembers(RoomName, UserId, SetOp),
    /// Mutate the room's admin array.
    MutateAdmins(RoomName, UserId, SetOp),
    /// Ask the user to confirm leaving the room before any write happens.
    ConfirmLeave(RoomName),
    /// Surface a refusal to the user. Nothing was written.
    Refuse(Refusal),
    /// Recompute the admin panel from fresh server state.
    AdminView(AdminView),
}

/// Room membership and switching machine for one signed-in user.
#[derive(Debug)]
pub struct RoomSync {
    me: UserId,
    phase: JoinPhase,
    current: Option<RoomName>,
    /// Latest room-document snapshot for `current`, if one has arrived.
    room_doc: Option<RoomDoc>,
    /// Room awaiting a fetch result from a create-or-join request.
    pending_create: Option<RoomName>,
}

impl RoomSync {
    /// A machine with no room selected.
    pub fn new(me: UserId) -> Self {
        Self {
            me,
            phase: JoinPhase::Unjoined,
            current: None,
            room_doc: None,
            pending_create: None,
        }
    }

    /// The room currently selected, if any.
    pub fn current(&self) -> Option<&RoomName> {
        self.current.as_ref()
    }

    /// Current join lifecycle phase.
    pub fn phase(&self) -> JoinPhase {
        self.phase
    }

    /// Latest room-document snapshot for the current room.
    pub fn room_doc(&self) -> Option<&RoomDoc> {
        self.room_doc.as_ref()
    }

    /// Switch to `room`, assuming it exists.
    ///
    /// Always switches optimistically: listeners move to the new room even
    /// if the membership write later fails.
    pub fn join_room(&mut self, room: RoomName) -> Vec<RoomAction> {
        self.enter(room)
    }

    /// Switch to `room`, creating its document first if absent.
    ///
    /// Emits a fetch; the driver feeds the result to
    /// [`RoomSync::room_fetched`]. The get-then-create pair is not atomic:
    /// two users racing on a new name may both create it, last write wins.
    pub fn create_or_join(&mut self, room: RoomName) -> Vec<RoomAction> {
        self.pending_create = Some(room.clone());
        vec![RoomAction::FetchRoom(room)]
    }

    /// Result of the fetch requested by [`RoomSync::create_or_join`].
    pub fn room_fetched(&mut self, room: &RoomName, exists: bool) -> Vec<RoomAction> {
        if self.pending_create.as_ref() != Some(room) {
            return Vec::new();
        }
        let Some(room) = self.pending_create.take() else {
            return Vec::new();
        };
        let mut actions = Vec::new();
        if !exists {
            actions.push(RoomAction::CreateRoom(
                room.clone(),
                RoomDoc::created_by(self.me.clone()),
            ));
        }
        actions.extend(self.enter(room));
        actions
    }

    /// Request to leave the current room. The default room cannot be left;
    /// any other room asks for confirmation first.
    pub fn leave_room(&mut self) -> Vec<RoomAction> {
        let Some(room) = self.current.clone() else {
            return Vec::new();
        };
        if room.as_str() == GENERAL_ROOM {
            return vec![RoomAction::Refuse(Refusal::LeaveGeneral)];
        }
        vec![RoomAction::ConfirmLeave(room)]
    }

    /// The user confirmed leaving: drop membership and the admin bit, then
    /// fall back to the default room.
    ///
    /// Re-checks the default-room guard, so calling this directly while in
    /// the default room is refused the same way [`RoomSync::leave_room`]
    /// refuses it.
    pub fn leave_confirmed(&mut self) -> Vec<RoomAction> {
        let Some(room) = self.current.clone() else {
            return Vec::new();
        };
        if room.as_str() == GENERAL_ROOM {
            return vec![RoomAction::Refuse(Refusal::LeaveGeneral)];
        }
        let mut actions = vec![
            RoomAction::MutateMembers(room.clone(), self.me.clone(), SetOp::Remove),
            RoomAction::MutateAdmins(room, self.me.clone(), SetOp::Remove),
        ];
        actions.extend(self.enter(RoomName::new(GENERAL_ROOM)));
        actions
    }

    /// Add `user` to the current room's member set.
    pub fn add_member(&mut self, user: UserId) -> Vec<RoomAction> {
        let Some(room) = self.current.clone() else {
            return Vec::new();
        };
        vec![RoomAction::MutateMembers(room, user, SetOp::Add)]
    }

    /// Remove `user` from the current room. The admin bit is removed in the
    /// same breath so admins never outlive membership on this path.
    pub fn remove_member(&mut self, user: UserId) -> Vec<RoomAction> {
        let Some(room) = self.current.clone() else {
            return Vec::new();
        };
        vec![
            RoomAction::MutateMembers(room.clone(), user.clone(), SetOp::Remove),
            RoomAction::MutateAdmins(room, user, SetOp::Remove),
        ]
    }

    /// Promote `user` to admin. Refused when the target is not a member or
    /// the cap is reached; the check runs against the latest snapshot, so
    /// concurrent promotions from different clients can still exceed the
    /// cap.
    pub fn promote_member(&mut self, user: UserId) -> Vec<RoomAction> {
        let Some(room) = self.current.clone() else {
            return Vec::new();
        };
        let Some(doc) = self.room_doc.as_ref() else {
            return vec![RoomAction::Refuse(Refusal::RoomStateUnknown)];
        };
        if !doc.members.contains(&user) {
            return vec![RoomAction::Refuse(Refusal::NotAMember(user))];
        }
        if doc.admins.len() >= MAX_ADMINS {
            return vec![RoomAction::Refuse(Refusal::AdminCapReached)];
        }
        vec![RoomAction::MutateAdmins(room, user, SetOp::Add)]
    }

    /// A room-document snapshot arrived. Snapshots for rooms other than the
    /// current one are stale deliveries from a torn-down listener and are
    /// ignored.
    pub fn room_doc_changed(&mut self, room: &RoomName, doc: RoomDoc) -> Vec<RoomAction> {
        if self.current.as_ref() != Some(room) {
            return Vec::new();
        }
        self.phase = JoinPhase::Joined;
        let view = AdminView {
            room: room.clone(),
            is_privileged: doc.is_privileged(&self.me),
            creator: doc.creator.clone(),
            admins: doc.admins.iter().cloned().collect(),
            members: doc.members.iter().cloned().collect(),
        };
        self.room_doc = Some(doc);
        vec![RoomAction::AdminView(view)]
    }

    /// The fixed action sequence of every room switch: tear down old
    /// listeners, relabel, write membership, re-subscribe.
    fn enter(&mut self, room: RoomName) -> Vec<RoomAction> {
        self.phase = JoinPhase::Joining;
        self.current = Some(room.clone());
        self.room_doc = None;
        vec![
            RoomAction::ClearRoomScope,
            RoomAction::SetRoomLabel(room.clone()),
            RoomAction::EnsureMembership(room.clone()),
            RoomAction::SubscribeRoomScope(room),
        ]
    }
}
