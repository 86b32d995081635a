mod data;
mod events;
mod friends;
mod layout;
mod messages;
mod profiles;
mod rooms;
mod util;
mod view;

use std::sync::Arc;

pub use data::*;
pub use events::*;
pub use friends::*;
pub use layout::*;
pub use messages::*;
pub use profiles::*;
pub use rooms::*;
pub use view::*;

use chatconnect_store::DocumentStore;
use crossbeam::channel::unbounded;
use dashmap::DashMap;

/// The application id every document path is namespaced under.
pub const DEFAULT_APP_ID: &str = "chatconnect-app";

// Reduces verbosity
type Cache<K, T> = Arc<DashMap<K, T>>;

/// The chatconnect pairing system, facilitating rooms, profiles, messages,
/// and friendships over a document store.
pub struct Pairing<S> {
    store: Arc<S>,
    event_receiver: EventReceiver,

    pub rooms: RoomManager<S>,
    pub profiles: ProfileManager<S>,
    pub messages: MessageManager<S>,
    pub friends: FriendManager<S>,
}

/// A type passed to the managers of the pairing system, to access the store,
/// the document layout, the local room cache, and the event channel.
pub struct PairingContext<S> {
    pub store: Arc<S>,
    pub layout: StoreLayout,
    pub rooms: Cache<String, RoomData>,

    event_sender: EventSender,
}

impl<S> Pairing<S>
where
    S: DocumentStore,
{
    pub fn new(store: S) -> Self {
        Self::with_app_id(store, DEFAULT_APP_ID)
    }

    pub fn with_app_id(store: S, app_id: &str) -> Self {
        let store = Arc::new(store);
        let (event_sender, event_receiver) = unbounded();

        let context = PairingContext {
            store: store.clone(),
            layout: StoreLayout::new(app_id),
            rooms: Default::default(),

            event_sender,
        };

        Self {
            store,
            event_receiver,

            rooms: RoomManager::new(&context),
            profiles: ProfileManager::new(&context),
            messages: MessageManager::new(&context),
            friends: FriendManager::new(&context),
        }
    }

    /// The store this system runs against.
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Receive events from the pairing system.
    pub fn wait_for_event(&self) -> PairingEvent {
        self.event_receiver
            .recv()
            .expect("event is received without error")
    }

    /// Returns the next pending event, if any.
    pub fn try_event(&self) -> Option<PairingEvent> {
        self.event_receiver.try_recv().ok()
    }
}

impl<S> PairingContext<S>
where
    S: DocumentStore,
{
    pub fn emit(&self, event: PairingEvent) {
        self.event_sender.send(event).expect("event is sent");
    }
}

impl<S> Clone for PairingContext<S>
where
    S: DocumentStore,
{
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            layout: self.layout.clone(),
            rooms: self.rooms.clone(),

            event_sender: self.event_sender.clone(),
        }
    }
}
