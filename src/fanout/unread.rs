use std::collections::HashSet;

use async_trait::async_trait;
use dashmap::DashMap;

use crate::model::*;

use super::StoreError;

/// Per-user unread counters, owned by whatever stores chat membership.
#[async_trait]
pub trait UnreadStore: Send + Sync {
    /// Bump the unread count of every member of `group` except `excluding`.
    /// Returns how many counters were bumped.
    async fn increment(&self, group: ChatGroup, excluding: UserId) -> Result<usize, StoreError>;
}

/// In-process store: group membership plus counters.
pub struct MemoryUnreadStore {
    members: DashMap<ChatGroup, HashSet<UserId>>,
    counts: DashMap<(ChatGroup, UserId), u32>,
}

impl MemoryUnreadStore {
    pub fn new() -> Self {
        Self {
            members: DashMap::new(),
            counts: DashMap::new(),
        }
    }

    pub fn join(&self, group: ChatGroup, user: UserId) {
        self.members.entry(group).or_default().insert(user);
    }

    pub fn leave(&self, group: ChatGroup, user: UserId) {
        if let Some(mut members) = self.members.get_mut(&group) {
            members.remove(&user);
        }
        self.members.remove_if(&group, |_, members| members.is_empty());
        self.counts.remove(&(group, user));
    }

    pub fn is_member(&self, group: ChatGroup, user: UserId) -> bool {
        self.members.get(&group).is_some_and(|m| m.contains(&user))
    }

    pub fn unread(&self, group: ChatGroup, user: UserId) -> u32 {
        self.counts.get(&(group, user)).map_or(0, |c| *c)
    }

    pub fn mark_read(&self, group: ChatGroup, user: UserId) {
        self.counts.remove(&(group, user));
    }
}

impl Default for MemoryUnreadStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UnreadStore for MemoryUnreadStore {
    async fn increment(&self, group: ChatGroup, excluding: UserId) -> Result<usize, StoreError> {
        // Copy the member list out so the membership shard isn't held while
        // touching the counter map.
        let recipients: Vec<UserId> = match self.members.get(&group) {
            Some(members) => members.iter().copied().filter(|u| *u != excluding).collect(),
            None => return Err(StoreError::UnknownGroup(group)),
        };
        for user in &recipients {
            *self.counts.entry((group, *user)).or_insert(0) += 1;
        }
        Ok(recipients.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn increment_skips_author() {
        let store = MemoryUnreadStore::new();
        let group = ChatGroup::new();
        let (sam, heidi, james) = (UserId::new(), UserId::new(), UserId::new());
        for u in [sam, heidi, james] {
            store.join(group, u);
        }

        let bumped = store.increment(group, sam).await.unwrap();
        assert_eq!(bumped, 2);
        store.increment(group, heidi).await.unwrap();

        assert_eq!(store.unread(group, sam), 1);
        assert_eq!(store.unread(group, heidi), 1);
        assert_eq!(store.unread(group, james), 2);
    }

    #[tokio::test]
    async fn mark_read_resets() {
        let store = MemoryUnreadStore::new();
        let group = ChatGroup::new();
        let (sam, heidi) = (UserId::new(), UserId::new());
        store.join(group, sam);
        store.join(group, heidi);
        store.increment(group, sam).await.unwrap();
        store.mark_read(group, heidi);
        assert_eq!(store.unread(group, heidi), 0);
        // Idempotent
        store.mark_read(group, heidi);
        assert_eq!(store.unread(group, heidi), 0);
    }

    #[tokio::test]
    async fn unknown_group_is_an_error() {
        let store = MemoryUnreadStore::new();
        let group = ChatGroup::new();
        let err = store.increment(group, UserId::new()).await.unwrap_err();
        assert_eq!(err, StoreError::UnknownGroup(group));
    }

    #[tokio::test]
    async fn leave_drops_counter_and_membership() {
        let store = MemoryUnreadStore::new();
        let group = ChatGroup::new();
        let (sam, heidi) = (UserId::new(), UserId::new());
        store.join(group, sam);
        store.join(group, heidi);
        store.increment(group, sam).await.unwrap();
        store.leave(group, heidi);
        assert!(!store.is_member(group, heidi));
        assert_eq!(store.unread(group, heidi), 0);
        assert_eq!(store.increment(group, sam).await.unwrap(), 0);
    }
}
