mod observer;

use std::collections::BTreeMap;

use chatconnect_store::{to_fields, DocumentStore, Query, StoreError, Transaction};
use log::{info, warn};
use thiserror::Error;

use crate::{util::invite_code, PairingContext, PairingEvent, ProfileData, RoomCodeData, RoomData};

pub use observer::*;

/// Maintains the pairing rules over rooms: capacity, join order, and
/// duplicate-pair suppression.
pub struct RoomManager<S> {
    context: PairingContext<S>,
}

/// Why a join was refused. The display string is shown to the user as-is.
#[derive(Debug, Error)]
pub enum JoinError {
    /// The code belongs to the joiner's own open room.
    #[error("You can't join a room you created")]
    SelfJoin,
    #[error("No room with that code exists")]
    NotFound,
    #[error("That room is already full")]
    RoomFull,
    #[error("You are already in that room")]
    AlreadyMember,
    /// The two users already share a room.
    #[error("You already have a room with that user")]
    DuplicatePair,
    /// The store is unreachable, so the join was refused upfront.
    #[error("You appear to be offline, try again once reconnected")]
    StoreOffline,
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Error)]
pub enum RoomError {
    /// The user has no profile to take a username from.
    #[error("Your profile could not be found")]
    ProfileMissing,
    #[error("You appear to be offline, try again once reconnected")]
    StoreOffline,
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl<S> RoomManager<S>
where
    S: DocumentStore,
{
    pub fn new(context: &PairingContext<S>) -> Self {
        Self {
            context: context.clone(),
        }
    }

    /// Loads every existing room into the local cache on init.
    pub async fn restore(&self) -> Result<(), StoreError> {
        let rooms = self.all_rooms().await?;

        for room in rooms {
            self.context.rooms.insert(room.code.clone(), room);
        }

        Ok(())
    }

    /// Opens a fresh solo room, its code ready to share as an invite.
    pub async fn create_room(&self, user_id: &str, username: &str) -> Result<RoomData, RoomError> {
        if !self.context.store.is_online() {
            return Err(RoomError::StoreOffline);
        }

        let room = self.write_solo_room(user_id, username).await?;

        info!("User {} opened room {}", username, room.code);
        self.context
            .emit(PairingEvent::RoomCreated { room: room.clone() });

        Ok(room)
    }

    /// Joins an existing room by invite code.
    ///
    /// The checks run in a fixed order inside a single store transaction and
    /// the first failing check decides the reported reason. Concurrent joins
    /// against the same room are serialized by the store, so at most one of
    /// them commits the 1 to 2 transition.
    pub async fn join_room(
        &self,
        joiner_id: &str,
        joiner_username: &str,
        code: &str,
    ) -> Result<RoomData, JoinError> {
        if !self.context.store.is_online() {
            return Err(JoinError::StoreOffline);
        }

        let code = normalize_code(code);
        let layout = &self.context.layout;
        let joiner_rooms_query = Query::array_contains(layout.rooms(), "users", joiner_id);

        let result = self
            .context
            .store
            .run_transaction(|tx: &mut Transaction| {
                // Every room the joiner is already part of, read atomically
                // with the join itself.
                let joiner_rooms: Vec<RoomData> = tx
                    .query(&joiner_rooms_query)?
                    .iter()
                    .map(|doc| doc.deserialize())
                    .collect::<Result<_, _>>()?;

                let is_own_solo = joiner_rooms
                    .iter()
                    .any(|r| r.solo_occupant() == Some(joiner_id) && r.code == code);
                if is_own_solo {
                    return Ok(Err(JoinError::SelfJoin));
                }

                let room_doc = match tx.get(&layout.room(&code))? {
                    Some(doc) => doc,
                    None => return Ok(Err(JoinError::NotFound)),
                };
                let mut room: RoomData = room_doc.deserialize()?;

                if room.is_full() {
                    return Ok(Err(JoinError::RoomFull));
                }

                if room.contains(joiner_id) {
                    return Ok(Err(JoinError::AlreadyMember));
                }

                // Two users never hold two separate rooms with each other
                if let Some(occupant) = room.solo_occupant() {
                    let already_paired = joiner_rooms
                        .iter()
                        .any(|r| r.partner_of(joiner_id) == Some(occupant));

                    if already_paired {
                        return Ok(Err(JoinError::DuplicatePair));
                    }
                }

                room.users.push(joiner_id.to_string());
                room.user_details
                    .insert(joiner_id.to_string(), joiner_username.to_string());

                tx.set(&layout.room(&code), to_fields(&room)?);

                Ok(Ok(room))
            })
            .await?;

        let room = result?;

        self.context.rooms.insert(room.code.clone(), room.clone());

        info!("User {} joined room {}", joiner_username, room.code);
        self.context.emit(PairingEvent::UserJoined {
            code: room.code.clone(),
            user_id: joiner_id.to_string(),
            username: joiner_username.to_string(),
        });

        Ok(room)
    }

    /// Mints a replacement solo room for a user whose room just filled, so
    /// they always have an invite code available.
    ///
    /// Also records the issued code in the audit trail.
    pub async fn reissue_solo_room(&self, user_id: &str) -> Result<RoomData, RoomError> {
        if !self.context.store.is_online() {
            return Err(RoomError::StoreOffline);
        }

        let profile: ProfileData = self
            .context
            .store
            .get(&self.context.layout.private_profile(user_id))
            .await?
            .ok_or(RoomError::ProfileMissing)?
            .deserialize()?;

        let room = self.write_solo_room(user_id, &profile.username).await?;

        let provenance = RoomCodeData {
            room_id: room.code.clone(),
            created_by: user_id.to_string(),
            created_at: room.created_at,
        };

        self.context
            .store
            .set(
                &self.context.layout.room_code(&room.code),
                to_fields(&provenance)?,
            )
            .await?;

        info!("Reissued room {} for user {}", room.code, user_id);

        Ok(room)
    }

    /// Deletes a room along with its invite mapping.
    ///
    /// The mapping delete is best effort and never fails the operation.
    /// Returns false when the room is missing or a step errors.
    pub async fn delete_room(&self, code: &str) -> bool {
        if !self.context.store.is_online() {
            warn!("Refusing to delete room {} while offline", code);
            return false;
        }

        let room = self.context.store.get(&self.context.layout.room(code)).await;

        match room {
            Ok(Some(_)) => {}
            Ok(None) => return false,
            Err(e) => {
                warn!("Failed to read room {} for deletion: {}", code, e);
                return false;
            }
        }

        if let Err(e) = self
            .context
            .store
            .delete(&self.context.layout.room_code(code))
            .await
        {
            warn!("Failed to delete invite mapping of room {}: {}", code, e);
        }

        if let Err(e) = self.context.store.delete(&self.context.layout.room(code)).await {
            warn!("Failed to delete room {}: {}", code, e);
            return false;
        }

        self.context.rooms.remove(code);
        self.context.emit(PairingEvent::RoomDeleted {
            code: code.to_string(),
        });

        true
    }

    /// Returns a room by its invite code, if it exists.
    pub async fn room_by_code(&self, code: &str) -> Result<Option<RoomData>, StoreError> {
        let doc = self
            .context
            .store
            .get(&self.context.layout.room(&normalize_code(code)))
            .await?;

        doc.map(|d| d.deserialize()).transpose()
    }

    /// Returns every room the user is part of.
    pub async fn rooms_with_user(&self, user_id: &str) -> Result<Vec<RoomData>, StoreError> {
        let query = Query::array_contains(self.context.layout.rooms(), "users", user_id);

        self.context
            .store
            .query(&query)
            .await?
            .iter()
            .map(|d| d.deserialize())
            .collect()
    }

    /// The rooms currently known to the local cache.
    pub fn cached_rooms(&self) -> Vec<RoomData> {
        self.context.rooms.iter().map(|r| r.value().clone()).collect()
    }

    /// Starts observing the rooms of a user.
    ///
    /// Solo rooms that fill while observed are automatically replaced.
    pub fn observe(&self, user_id: &str) -> RoomObserver<S> {
        RoomObserver::new(&self.context, user_id)
    }

    async fn write_solo_room(&self, user_id: &str, username: &str) -> Result<RoomData, StoreError> {
        let created_at = self.context.store.server_timestamp().await?;

        let room = RoomData {
            code: invite_code(),
            users: vec![user_id.to_string()],
            user_details: BTreeMap::from([(user_id.to_string(), username.to_string())]),
            created_at,
        };

        self.context
            .store
            .set(&self.context.layout.room(&room.code), to_fields(&room)?)
            .await?;

        self.context.rooms.insert(room.code.clone(), room.clone());

        Ok(room)
    }

    async fn all_rooms(&self) -> Result<Vec<RoomData>, StoreError> {
        let query = Query::all(self.context.layout.rooms());

        self.context
            .store
            .query(&query)
            .await?
            .iter()
            .map(|d| d.deserialize())
            .collect()
    }
}

/// Invite codes are case-insensitive on input and stored uppercase.
fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}
