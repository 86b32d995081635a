use crossbeam::channel::{Receiver, Sender};

use crate::{MessageData, RoomData};

pub type EventSender = Sender<PairingEvent>;
pub type EventReceiver = Receiver<PairingEvent>;

/// Events emitted by the pairing system.
#[derive(Debug, Clone)]
pub enum PairingEvent {
    /// A solo room was opened and its invite code is ready to share.
    RoomCreated { room: RoomData },
    /// A second user joined a room, completing the pair.
    UserJoined {
        code: String,
        user_id: String,
        username: String,
    },
    /// A replacement solo room was minted after a pairing completed.
    RoomReissued {
        previous_code: String,
        room: RoomData,
    },
    /// A room and its invite mapping were removed.
    RoomDeleted { code: String },
    /// A message was appended to a room.
    MessageSent {
        room_code: String,
        message: MessageData,
    },
    /// Two users became friends.
    FriendAdded { user_id: String, friend_id: String },
}
