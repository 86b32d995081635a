use chatconnect_store::{to_fields, DocumentStore, Query, StoreError, Transaction};
use log::info;
use thiserror::Error;

use crate::{NewProfile, PairingContext, ProfileData};

/// Creates and looks up user profiles.
pub struct ProfileManager<S> {
    context: PairingContext<S>,
}

#[derive(Debug, Error)]
pub enum ProfileError {
    /// No profile exists for the user.
    #[error("Profile not found")]
    Missing,
    /// A profile already exists for the user.
    #[error("A profile for this user already exists")]
    AlreadyExists,
    #[error("You appear to be offline, try again once reconnected")]
    StoreOffline,
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl<S> ProfileManager<S>
where
    S: DocumentStore,
{
    pub fn new(context: &PairingContext<S>) -> Self {
        Self {
            context: context.clone(),
        }
    }

    /// Writes the private and public profile documents of a new user at once.
    pub async fn create_profile(&self, new_profile: NewProfile) -> Result<ProfileData, ProfileError> {
        if !self.context.store.is_online() {
            return Err(ProfileError::StoreOffline);
        }

        let profile = ProfileData {
            user_id: new_profile.user_id,
            username: new_profile.username,
            email: new_profile.email,
        };

        let private_path = self.context.layout.private_profile(&profile.user_id);
        let public_path = self.context.layout.public_profile(&profile.user_id);
        let fields = to_fields(&profile)?;

        let result = self
            .context
            .store
            .run_transaction(|tx: &mut Transaction| {
                if tx.get(&private_path)?.is_some() {
                    return Ok(Err(ProfileError::AlreadyExists));
                }

                tx.set(&private_path, fields.clone());
                tx.set(&public_path, fields.clone());

                Ok(Ok(()))
            })
            .await?;
        result?;

        info!("Created profile for user {}", profile.user_id);

        Ok(profile)
    }

    /// Returns a user's profile.
    pub async fn profile_by_id(&self, user_id: &str) -> Result<ProfileData, ProfileError> {
        let doc = self
            .context
            .store
            .get(&self.context.layout.private_profile(user_id))
            .await?
            .ok_or(ProfileError::Missing)?;

        Ok(doc.deserialize()?)
    }

    /// Finds a public profile by exact username.
    pub async fn find_by_username(&self, username: &str) -> Result<Option<ProfileData>, StoreError> {
        self.find_public("username", username).await
    }

    /// Finds a public profile by exact email.
    pub async fn find_by_email(&self, email: &str) -> Result<Option<ProfileData>, StoreError> {
        self.find_public("email", email).await
    }

    async fn find_public(&self, field: &str, value: &str) -> Result<Option<ProfileData>, StoreError> {
        let query = Query::field_equals(self.context.layout.public_profiles(), field, value);
        let docs = self.context.store.query(&query).await?;

        docs.first().map(|d| d.deserialize()).transpose()
    }
}

#[cfg(test)]
mod test {
    use chatconnect_store::MemoryStore;

    use crate::Pairing;

    use super::*;

    fn new_profile(user_id: &str, username: &str) -> NewProfile {
        NewProfile {
            user_id: user_id.to_string(),
            username: username.to_string(),
            email: format!("{username}@example.com"),
        }
    }

    #[tokio::test]
    async fn test_create_and_fetch_profile() {
        let pairing = Pairing::new(MemoryStore::new());

        let created = pairing
            .profiles
            .create_profile(new_profile("A", "alice"))
            .await
            .expect("profile is created");

        let fetched = pairing.profiles.profile_by_id("A").await.unwrap();
        assert_eq!(fetched, created);
    }

    #[tokio::test]
    async fn test_profiles_are_immutable() {
        let pairing = Pairing::new(MemoryStore::new());

        pairing
            .profiles
            .create_profile(new_profile("A", "alice"))
            .await
            .unwrap();

        let result = pairing
            .profiles
            .create_profile(new_profile("A", "malice"))
            .await;

        assert!(matches!(result, Err(ProfileError::AlreadyExists)));

        let kept = pairing.profiles.profile_by_id("A").await.unwrap();
        assert_eq!(kept.username, "alice", "the original profile is kept");
    }

    #[tokio::test]
    async fn test_missing_profile() {
        let pairing = Pairing::new(MemoryStore::new());

        let result = pairing.profiles.profile_by_id("A").await;

        assert!(matches!(result, Err(ProfileError::Missing)));
    }

    #[tokio::test]
    async fn test_public_lookups() {
        let pairing = Pairing::new(MemoryStore::new());

        pairing
            .profiles
            .create_profile(new_profile("A", "alice"))
            .await
            .unwrap();
        pairing
            .profiles
            .create_profile(new_profile("B", "bob"))
            .await
            .unwrap();

        let by_name = pairing
            .profiles
            .find_by_username("bob")
            .await
            .unwrap()
            .expect("bob is findable by username");
        assert_eq!(by_name.user_id, "B");

        let by_email = pairing
            .profiles
            .find_by_email("alice@example.com")
            .await
            .unwrap()
            .expect("alice is findable by email");
        assert_eq!(by_email.user_id, "A");

        assert!(pairing
            .profiles
            .find_by_username("carol")
            .await
            .unwrap()
            .is_none());
    }
}
