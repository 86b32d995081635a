use chatconnect_store::{to_fields, DocumentStore, Query, StoreError, Transaction};
use log::info;
use thiserror::Error;

use crate::{FriendData, FriendRequestData, PairingContext, PairingEvent, ProfileData};

/// Manages friend requests and confirmed friendships.
pub struct FriendManager<S> {
    context: PairingContext<S>,
}

#[derive(Debug, Error)]
pub enum FriendError {
    /// The accepting user has no profile.
    #[error("Your profile was not found")]
    ProfileMissing,
    /// There is no pending request between the two users.
    #[error("No pending friend request from this user")]
    RequestMissing,
    #[error("You appear to be offline, try again once reconnected")]
    StoreOffline,
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl<S> FriendManager<S>
where
    S: DocumentStore,
{
    pub fn new(context: &PairingContext<S>) -> Self {
        Self {
            context: context.clone(),
        }
    }

    /// Records a friend request on both sides at once.
    pub async fn send_request(
        &self,
        sender: &ProfileData,
        receiver: &ProfileData,
    ) -> Result<(), FriendError> {
        if !self.context.store.is_online() {
            return Err(FriendError::StoreOffline);
        }

        let sent_at = self.context.store.server_timestamp().await?;

        let incoming = FriendRequestData {
            user_id: sender.user_id.clone(),
            username: sender.username.clone(),
            sent_at,
        };
        let outgoing = FriendRequestData {
            user_id: receiver.user_id.clone(),
            username: receiver.username.clone(),
            sent_at,
        };

        let incoming_path = self
            .context
            .layout
            .friend_request(&receiver.user_id, &sender.user_id);
        let outgoing_path = self
            .context
            .layout
            .outgoing_friend_request(&sender.user_id, &receiver.user_id);

        let incoming_fields = to_fields(&incoming)?;
        let outgoing_fields = to_fields(&outgoing)?;

        self.context
            .store
            .run_transaction(|tx: &mut Transaction| {
                tx.set(&incoming_path, incoming_fields.clone());
                tx.set(&outgoing_path, outgoing_fields.clone());
                Ok(())
            })
            .await?;

        Ok(())
    }

    /// Accepts a pending request: both users gain a friend document and both
    /// request documents are removed, all at once or not at all.
    pub async fn accept_request(
        &self,
        receiver_id: &str,
        sender_id: &str,
        sender_username: &str,
    ) -> Result<(), FriendError> {
        if !self.context.store.is_online() {
            return Err(FriendError::StoreOffline);
        }

        // The receiver's own username comes from their profile
        let receiver: ProfileData = self
            .context
            .store
            .get(&self.context.layout.private_profile(receiver_id))
            .await?
            .ok_or(FriendError::ProfileMissing)?
            .deserialize()?;

        let added_at = self.context.store.server_timestamp().await?;

        let receiver_entry = FriendData {
            user_id: sender_id.to_string(),
            username: sender_username.to_string(),
            added_at,
        };
        let sender_entry = FriendData {
            user_id: receiver_id.to_string(),
            username: receiver.username.clone(),
            added_at,
        };

        let layout = &self.context.layout;
        let receiver_entry_fields = to_fields(&receiver_entry)?;
        let sender_entry_fields = to_fields(&sender_entry)?;

        let result = self
            .context
            .store
            .run_transaction(|tx: &mut Transaction| {
                if tx.get(&layout.friend_request(receiver_id, sender_id))?.is_none() {
                    return Ok(Err(FriendError::RequestMissing));
                }

                tx.set(
                    &layout.friend(receiver_id, sender_id),
                    receiver_entry_fields.clone(),
                );
                tx.set(
                    &layout.friend(sender_id, receiver_id),
                    sender_entry_fields.clone(),
                );
                tx.delete(&layout.friend_request(receiver_id, sender_id));
                tx.delete(&layout.outgoing_friend_request(sender_id, receiver_id));

                Ok(Ok(()))
            })
            .await?;
        result?;

        info!("Users {} and {} are now friends", receiver_id, sender_id);
        self.context.emit(PairingEvent::FriendAdded {
            user_id: receiver_id.to_string(),
            friend_id: sender_id.to_string(),
        });

        Ok(())
    }

    /// Lists a user's pending incoming requests.
    pub async fn incoming_requests(
        &self,
        user_id: &str,
    ) -> Result<Vec<FriendRequestData>, StoreError> {
        let query = Query::all(self.context.layout.friend_requests(user_id));

        self.context
            .store
            .query(&query)
            .await?
            .iter()
            .map(|d| d.deserialize())
            .collect()
    }

    /// Lists a user's confirmed friends.
    pub async fn friends_of(&self, user_id: &str) -> Result<Vec<FriendData>, StoreError> {
        let query = Query::all(self.context.layout.friends(user_id));

        self.context
            .store
            .query(&query)
            .await?
            .iter()
            .map(|d| d.deserialize())
            .collect()
    }
}
