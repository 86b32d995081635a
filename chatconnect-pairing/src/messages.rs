use chatconnect_store::{to_fields, DocumentStore, Query, StoreError, Subscription};
use log::warn;
use thiserror::Error;

use crate::{util::document_id, MessageData, NewMessage, PairingContext, PairingEvent};

/// Appends and reads the messages of rooms.
///
/// Messages are ordered by their server-assigned timestamps; delivery
/// beyond that is the store's business.
pub struct MessageManager<S> {
    context: PairingContext<S>,
}

#[derive(Debug, Error)]
pub enum MessageError {
    #[error("You appear to be offline, try again once reconnected")]
    StoreOffline,
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl<S> MessageManager<S>
where
    S: DocumentStore,
{
    pub fn new(context: &PairingContext<S>) -> Self {
        Self {
            context: context.clone(),
        }
    }

    /// Appends a message to a room.
    pub async fn send(
        &self,
        room_code: &str,
        new_message: NewMessage,
    ) -> Result<MessageData, MessageError> {
        if !self.context.store.is_online() {
            return Err(MessageError::StoreOffline);
        }

        let timestamp = self.context.store.server_timestamp().await?;

        let message = MessageData {
            sender_id: new_message.sender_id,
            sender_username: new_message.sender_username,
            text: new_message.text,
            timestamp,
        };

        let path = self.context.layout.message(room_code, &document_id());
        self.context.store.set(&path, to_fields(&message)?).await?;

        self.context.emit(PairingEvent::MessageSent {
            room_code: room_code.to_string(),
            message: message.clone(),
        });

        Ok(message)
    }

    /// Returns a room's messages, oldest first.
    pub async fn list(&self, room_code: &str) -> Result<Vec<MessageData>, StoreError> {
        let query = Query::all(self.context.layout.messages(room_code));

        let mut messages: Vec<MessageData> = self
            .context
            .store
            .query(&query)
            .await?
            .iter()
            .map(|d| d.deserialize())
            .collect::<Result<_, _>>()?;

        messages.sort_by_key(|m| m.timestamp);
        Ok(messages)
    }

    /// Opens a live feed over a room's messages.
    pub fn feed(&self, room_code: &str) -> MessageFeed {
        let query = Query::all(self.context.layout.messages(room_code));

        MessageFeed {
            subscription: self.context.store.subscribe(&query),
        }
    }
}

/// A live, timestamp-ordered feed of one room's messages.
pub struct MessageFeed {
    subscription: Subscription,
}

impl MessageFeed {
    /// Waits for the next snapshot of the room's messages, oldest first.
    pub async fn next(&mut self) -> Option<Vec<MessageData>> {
        let snapshot = self.subscription.next().await?;

        let mut messages: Vec<MessageData> = snapshot
            .iter()
            .filter_map(|doc| match doc.deserialize() {
                Ok(message) => Some(message),
                Err(e) => {
                    warn!("Skipping malformed message document: {}", e);
                    None
                }
            })
            .collect();

        messages.sort_by_key(|m| m.timestamp);
        Some(messages)
    }
}

#[cfg(test)]
mod test {
    use chatconnect_store::MemoryStore;

    use crate::Pairing;

    use super::*;

    fn message(sender: &str, text: &str) -> NewMessage {
        NewMessage {
            sender_id: sender.to_string(),
            sender_username: sender.to_lowercase(),
            text: text.to_string(),
        }
    }

    #[tokio::test]
    async fn test_messages_are_ordered_by_timestamp() {
        let pairing = Pairing::new(MemoryStore::new());

        pairing
            .messages
            .send("X7K2QT", message("A", "hello"))
            .await
            .unwrap();
        pairing
            .messages
            .send("X7K2QT", message("B", "hey"))
            .await
            .unwrap();
        pairing
            .messages
            .send("X7K2QT", message("A", "how are you?"))
            .await
            .unwrap();

        let messages = pairing.messages.list("X7K2QT").await.unwrap();

        let texts: Vec<_> = messages.iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, vec!["hello", "hey", "how are you?"]);

        assert!(
            messages.windows(2).all(|w| w[0].timestamp < w[1].timestamp),
            "timestamps should strictly increase in send order"
        );
    }

    #[tokio::test]
    async fn test_messages_are_scoped_to_their_room() {
        let pairing = Pairing::new(MemoryStore::new());

        pairing
            .messages
            .send("AAAAAA", message("A", "one"))
            .await
            .unwrap();
        pairing
            .messages
            .send("BBBBBB", message("B", "two"))
            .await
            .unwrap();

        let messages = pairing.messages.list("AAAAAA").await.unwrap();

        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].text, "one");
    }

    #[tokio::test]
    async fn test_feed_follows_new_messages() {
        let pairing = Pairing::new(MemoryStore::new());

        let mut feed = pairing.messages.feed("X7K2QT");

        let initial = feed.next().await.expect("initial snapshot");
        assert!(initial.is_empty());

        pairing
            .messages
            .send("X7K2QT", message("A", "hello"))
            .await
            .unwrap();

        let update = feed.next().await.unwrap();
        assert_eq!(update.len(), 1);
        assert_eq!(update[0].text, "hello");
    }

    #[tokio::test]
    async fn test_send_is_refused_offline() {
        let pairing = Pairing::new(MemoryStore::new());

        pairing.store().set_online(false);

        let result = pairing.messages.send("X7K2QT", message("A", "hello")).await;

        assert!(matches!(result, Err(MessageError::StoreOffline)));
    }
}
