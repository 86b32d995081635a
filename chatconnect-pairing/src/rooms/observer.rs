use chatconnect_store::{DocumentStore, Query, Subscription};
use log::warn;

use crate::{PairingContext, PairingEvent, RoomData};

use super::RoomManager;

/// Follows the rooms of one user through a store subscription, minting a
/// replacement room whenever their solo room fills up.
pub struct RoomObserver<S> {
    user_id: String,
    manager: RoomManager<S>,
    subscription: Subscription,
    /// The snapshot the next update is diffed against.
    previous: Vec<RoomData>,
}

/// One observed change to a user's rooms.
#[derive(Debug, Clone)]
pub struct RoomsUpdate {
    /// Every room the user is part of.
    pub rooms: Vec<RoomData>,
    /// The invite code of the room where the user currently waits alone.
    pub invite_code: Option<String>,
    /// Codes of solo rooms that gained their second user since the last update.
    pub filled: Vec<String>,
    /// The replacement room minted because a solo room filled.
    pub reissued: Option<RoomData>,
}

impl<S> RoomObserver<S>
where
    S: DocumentStore,
{
    pub(crate) fn new(context: &PairingContext<S>, user_id: &str) -> Self {
        let query = Query::array_contains(context.layout.rooms(), "users", user_id);

        Self {
            user_id: user_id.to_string(),
            manager: RoomManager::new(context),
            subscription: context.store.subscribe(&query),
            previous: Vec::new(),
        }
    }

    /// Waits for the next change to the user's rooms.
    ///
    /// Returns [None] once the subscription is gone.
    pub async fn next_update(&mut self) -> Option<RoomsUpdate> {
        let snapshot = self.subscription.next().await?;

        let rooms: Vec<RoomData> = snapshot
            .iter()
            .filter_map(|doc| match doc.deserialize() {
                Ok(room) => Some(room),
                Err(e) => {
                    warn!("Skipping malformed room document: {}", e);
                    None
                }
            })
            .collect();

        self.reconcile_cache(&rooms);

        let filled = filled_solo_rooms(&self.previous, &rooms, &self.user_id);

        let mut reissued = None;

        for code in &filled {
            match self.manager.reissue_solo_room(&self.user_id).await {
                Ok(room) => {
                    self.manager.context.emit(PairingEvent::RoomReissued {
                        previous_code: code.clone(),
                        room: room.clone(),
                    });
                    reissued = Some(room);
                }
                Err(e) => warn!("Failed to reissue a room for user {}: {}", self.user_id, e),
            }
        }

        let invite_code = rooms
            .iter()
            .find(|r| r.solo_occupant() == Some(self.user_id.as_str()))
            .map(|r| r.code.clone());

        self.previous = rooms.clone();

        Some(RoomsUpdate {
            rooms,
            invite_code,
            filled,
            reissued,
        })
    }

    /// Keeps the shared room cache in step with the observed snapshot.
    fn reconcile_cache(&self, rooms: &[RoomData]) {
        let cache = &self.manager.context.rooms;

        for room in rooms {
            cache.insert(room.code.clone(), room.clone());
        }

        for stale in &self.previous {
            if !rooms.iter().any(|r| r.code == stale.code) {
                cache.remove(&stale.code);
            }
        }
    }
}

/// The diff rule behind automatic reissue: a room counts as filled when the
/// previous snapshot had the user waiting in it alone and the current one
/// shows it at capacity. A room that vanished entirely was deleted, not
/// filled.
pub fn filled_solo_rooms(previous: &[RoomData], current: &[RoomData], user_id: &str) -> Vec<String> {
    previous
        .iter()
        .filter(|room| room.solo_occupant() == Some(user_id))
        .filter(|room| current.iter().any(|now| now.code == room.code && now.is_full()))
        .map(|room| room.code.clone())
        .collect()
}
