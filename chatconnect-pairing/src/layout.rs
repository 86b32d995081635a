use chatconnect_store::{CollectionPath, DocumentPath};

/// Builds the document paths of the deployment, namespaced under a fixed
/// application id.
#[derive(Debug, Clone)]
pub struct StoreLayout {
    root: String,
}

impl StoreLayout {
    pub fn new(app_id: &str) -> Self {
        Self {
            root: format!("artifacts/{app_id}"),
        }
    }

    /// The collection of pairing rooms.
    pub fn rooms(&self) -> CollectionPath {
        CollectionPath::new(format!("{}/rooms", self.root))
    }

    pub fn room(&self, code: &str) -> DocumentPath {
        self.rooms().doc(code)
    }

    /// The audit trail of issued invite codes.
    pub fn room_codes(&self) -> CollectionPath {
        CollectionPath::new(format!("{}/roomCodes", self.root))
    }

    pub fn room_code(&self, code: &str) -> DocumentPath {
        self.room_codes().doc(code)
    }

    /// A user's private profile document.
    pub fn private_profile(&self, user_id: &str) -> DocumentPath {
        DocumentPath::new(format!("{}/users/{user_id}/profile/userProfile", self.root))
    }

    /// The queryable public profile collection.
    pub fn public_profiles(&self) -> CollectionPath {
        CollectionPath::new(format!("{}/public/data/userProfiles", self.root))
    }

    pub fn public_profile(&self, user_id: &str) -> DocumentPath {
        self.public_profiles().doc(user_id)
    }

    /// The messages of one room.
    pub fn messages(&self, room_code: &str) -> CollectionPath {
        CollectionPath::new(format!("{}/directMessages/{room_code}/messages", self.root))
    }

    pub fn message(&self, room_code: &str, message_id: &str) -> DocumentPath {
        self.messages(room_code).doc(message_id)
    }

    /// A user's confirmed friends.
    pub fn friends(&self, user_id: &str) -> CollectionPath {
        CollectionPath::new(format!("{}/users/{user_id}/friends", self.root))
    }

    pub fn friend(&self, user_id: &str, friend_id: &str) -> DocumentPath {
        self.friends(user_id).doc(friend_id)
    }

    /// Friend requests awaiting the user's decision, keyed by sender.
    pub fn friend_requests(&self, user_id: &str) -> CollectionPath {
        CollectionPath::new(format!("{}/users/{user_id}/friendRequests", self.root))
    }

    pub fn friend_request(&self, user_id: &str, sender_id: &str) -> DocumentPath {
        self.friend_requests(user_id).doc(sender_id)
    }

    /// Requests the user has sent and not yet had answered, keyed by receiver.
    pub fn outgoing_friend_requests(&self, user_id: &str) -> CollectionPath {
        CollectionPath::new(format!("{}/users/{user_id}/outgoingFriendRequests", self.root))
    }

    pub fn outgoing_friend_request(&self, user_id: &str, receiver_id: &str) -> DocumentPath {
        self.outgoing_friend_requests(user_id).doc(receiver_id)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_paths_are_app_namespaced() {
        let layout = StoreLayout::new("chatconnect-app");

        assert_eq!(
            layout.room("X7K2QT").as_str(),
            "artifacts/chatconnect-app/rooms/X7K2QT"
        );
        assert_eq!(
            layout.room_code("X7K2QT").as_str(),
            "artifacts/chatconnect-app/roomCodes/X7K2QT"
        );
        assert_eq!(
            layout.private_profile("A").as_str(),
            "artifacts/chatconnect-app/users/A/profile/userProfile"
        );
        assert_eq!(
            layout.public_profile("A").as_str(),
            "artifacts/chatconnect-app/public/data/userProfiles/A"
        );
        assert_eq!(
            layout.message("X7K2QT", "m1").as_str(),
            "artifacts/chatconnect-app/directMessages/X7K2QT/messages/m1"
        );
        assert_eq!(
            layout.friend("A", "B").as_str(),
            "artifacts/chatconnect-app/users/A/friends/B"
        );
    }
}
