use std::collections::BTreeMap;

use chatconnect_store::Timestamp;
use serde::{Deserialize, Serialize};

/// The number of users a room holds once pairing completes.
pub const ROOM_CAPACITY: usize = 2;

/// A pairing room between one or two users, keyed by its invite code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomData {
    /// The invite code, doubling as the room's document id.
    pub code: String,
    /// The user ids of the occupants, in join order.
    pub users: Vec<String>,
    /// Maps each occupant to their display username.
    pub user_details: BTreeMap<String, String>,
    pub created_at: Timestamp,
}

impl RoomData {
    /// Returns true while the room waits for a second occupant.
    pub fn is_solo(&self) -> bool {
        self.users.len() == 1
    }

    /// Returns true once the room reached capacity.
    pub fn is_full(&self) -> bool {
        self.users.len() >= ROOM_CAPACITY
    }

    pub fn contains(&self, user_id: &str) -> bool {
        self.users.iter().any(|u| u == user_id)
    }

    /// The single occupant of a solo room.
    pub fn solo_occupant(&self) -> Option<&str> {
        match self.users.as_slice() {
            [only] => Some(only),
            _ => None,
        }
    }

    /// The other occupant of a full room, from one member's point of view.
    pub fn partner_of(&self, user_id: &str) -> Option<&str> {
        if !self.is_full() {
            return None;
        }

        self.users
            .iter()
            .map(String::as_str)
            .find(|u| *u != user_id)
    }
}

/// A user account profile. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileData {
    pub user_id: String,
    pub username: String,
    pub email: String,
}

/// A chat message inside a room, ordered by its server-assigned timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageData {
    pub sender_id: String,
    pub sender_username: String,
    pub text: String,
    pub timestamp: Timestamp,
}

/// Provenance record for an issued invite code.
///
/// An audit trail only; joining never consults it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomCodeData {
    pub room_id: String,
    pub created_by: String,
    pub created_at: Timestamp,
}

/// A confirmed friend connection, stored on both sides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FriendData {
    pub user_id: String,
    pub username: String,
    pub added_at: Timestamp,
}

/// A pending friend request. Each side's document describes the other party.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FriendRequestData {
    pub user_id: String,
    pub username: String,
    pub sent_at: Timestamp,
}

#[derive(Debug)]
pub struct NewProfile {
    pub user_id: String,
    pub username: String,
    pub email: String,
}

#[derive(Debug)]
pub struct NewMessage {
    pub sender_id: String,
    pub sender_username: String,
    pub text: String,
}
