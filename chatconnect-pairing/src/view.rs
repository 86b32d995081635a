/// The screen a client is currently on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum View {
    /// The signup and login screen.
    Login,
    /// The lobby showing the invite code, friends, and the join form.
    Home,
    /// An open two-party chat.
    Chat { room_code: String },
}

/// Something that moves the client between screens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewEvent {
    SignedIn,
    SignedOut,
    RoomOpened { room_code: String },
    RoomClosed,
}

impl View {
    /// Applies one event to the current view.
    ///
    /// Events that make no sense for the current view leave it unchanged.
    pub fn apply(self, event: ViewEvent) -> View {
        match (self, event) {
            (View::Login, ViewEvent::SignedIn) => View::Home,
            (_, ViewEvent::SignedOut) => View::Login,
            (View::Home, ViewEvent::RoomOpened { room_code }) => View::Chat { room_code },
            (View::Chat { .. }, ViewEvent::RoomClosed) => View::Home,
            (view, _) => view,
        }
    }
}
