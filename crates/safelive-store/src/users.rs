//! In-memory account directory

use async_trait::async_trait;
use dashmap::DashMap;
use safelive_core::repo::{StoreError, UserRepository};
use safelive_core::{UserAccount, UserId, UserRole};

/// Account directory backed by a concurrent map
#[derive(Debug, Default)]
pub struct MemoryUsers {
    map: DashMap<UserId, UserAccount>,
}

impl MemoryUsers {
    /// Empty directory
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored accounts
    #[must_use]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Whether the directory is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

#[async_trait]
impl UserRepository for MemoryUsers {
    async fn insert(&self, user: UserAccount) -> Result<(), StoreError> {
        if self.map.contains_key(&user.id) {
            return Err(StoreError::Duplicate(format!("user {}", user.id)));
        }
        self.map.insert(user.id, user);
        Ok(())
    }

    async fn get(&self, id: UserId) -> Result<Option<UserAccount>, StoreError> {
        Ok(self.map.get(&id).map(|entry| entry.clone()))
    }

    async fn list_by_role(&self, role: UserRole) -> Result<Vec<UserAccount>, StoreError> {
        let mut accounts: Vec<UserAccount> = self
            .map
            .iter()
            .filter(|entry| entry.role == role)
            .map(|entry| entry.clone())
            .collect();
        accounts.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.0.cmp(&b.id.0)));
        Ok(accounts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn role_listing_is_filtered_and_ordered() {
        let store = MemoryUsers::new();
        for (name, role) in [
            ("Zoya", UserRole::Supervisor),
            ("Amit", UserRole::Supervisor),
            ("Rani", UserRole::Worker),
        ] {
            store
                .insert(UserAccount::new(name, role))
                .await
                .unwrap();
        }

        let supervisors = store.list_by_role(UserRole::Supervisor).await.unwrap();
        assert_eq!(supervisors.len(), 2);
        assert_eq!(supervisors[0].name, "Amit");
        assert_eq!(supervisors[1].name, "Zoya");
        assert_eq!(store.list_by_role(UserRole::Citizen).await.unwrap().len(), 0);
    }
}
