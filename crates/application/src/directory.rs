use async_trait::async_trait;
use domain::{Room, RoomId, UserId, UserProfile};

use crate::error::ApplicationError;

/// 房间、用户与成员关系的只读视图，由外部存储提供
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait MembershipDirectory: Send + Sync {
    async fn find_room(&self, room_id: RoomId) -> Result<Option<Room>, ApplicationError>;
    async fn find_room_by_slug(&self, slug: &str) -> Result<Option<Room>, ApplicationError>;
    async fn is_member(&self, room_id: RoomId, user_id: UserId) -> Result<bool, ApplicationError>;
    async fn find_user(&self, user_id: UserId) -> Result<Option<UserProfile>, ApplicationError>;
}

/// 确认房间存在且调用者是成员：房间不存在为 NotFound，非成员为 Forbidden
pub async fn require_membership(
    directory: &dyn MembershipDirectory,
    room: Option<Room>,
    user_id: UserId,
) -> Result<Room, ApplicationError> {
    let room = room.ok_or_else(|| ApplicationError::not_found("Room not found"))?;
    if !directory.is_member(room.id, user_id).await? {
        return Err(ApplicationError::forbidden("Not a member of this room"));
    }
    Ok(room)
}

pub mod memory {
    use std::collections::{HashMap, HashSet};

    use async_trait::async_trait;
    use domain::{Membership, Room, RoomId, UserId, UserProfile};
    use serde::Deserialize;
    use tokio::sync::RwLock;

    use super::MembershipDirectory;
    use crate::error::ApplicationError;

    /// 目录的初始数据，可从 JSON 文件加载
    #[derive(Debug, Clone, Default, Deserialize)]
    pub struct DirectorySeed {
        #[serde(default)]
        pub rooms: Vec<Room>,
        #[serde(default)]
        pub users: Vec<UserProfile>,
        #[serde(default)]
        pub memberships: Vec<Membership>,
    }

    /// 内存实现，用于独立运行与测试
    #[derive(Default)]
    pub struct MemoryDirectory {
        rooms: RwLock<HashMap<RoomId, Room>>,
        users: RwLock<HashMap<UserId, UserProfile>>,
        memberships: RwLock<HashSet<Membership>>,
    }

    impl MemoryDirectory {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn from_seed(seed: DirectorySeed) -> Self {
            Self {
                rooms: RwLock::new(seed.rooms.into_iter().map(|room| (room.id, room)).collect()),
                users: RwLock::new(seed.users.into_iter().map(|user| (user.id, user)).collect()),
                memberships: RwLock::new(seed.memberships.into_iter().collect()),
            }
        }

        pub async fn add_room(&self, room: Room) {
            self.rooms.write().await.insert(room.id, room);
        }

        pub async fn add_user(&self, user: UserProfile) {
            self.users.write().await.insert(user.id, user);
        }

        pub async fn add_member(&self, room_id: RoomId, user_id: UserId) {
            self.memberships
                .write()
                .await
                .insert(Membership { room_id, user_id });
        }

        pub async fn room_count(&self) -> usize {
            self.rooms.read().await.len()
        }
    }

    #[async_trait]
    impl MembershipDirectory for MemoryDirectory {
        async fn find_room(&self, room_id: RoomId) -> Result<Option<Room>, ApplicationError> {
            Ok(self.rooms.read().await.get(&room_id).cloned())
        }

        async fn find_room_by_slug(&self, slug: &str) -> Result<Option<Room>, ApplicationError> {
            Ok(self
                .rooms
                .read()
                .await
                .values()
                .find(|room| room.slug == slug)
                .cloned())
        }

        async fn is_member(
            &self,
            room_id: RoomId,
            user_id: UserId,
        ) -> Result<bool, ApplicationError> {
            Ok(self
                .memberships
                .read()
                .await
                .contains(&Membership { room_id, user_id }))
        }

        async fn find_user(&self, user_id: UserId) -> Result<Option<UserProfile>, ApplicationError> {
            Ok(self.users.read().await.get(&user_id).cloned())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::memory::{DirectorySeed, MemoryDirectory};
    use super::*;
    use mockall::predicate::eq;
    use uuid::Uuid;

    fn kitchen() -> Room {
        Room {
            id: RoomId::from(Uuid::new_v4()),
            slug: "the-kitchen".into(),
            name: "The Kitchen".into(),
        }
    }

    #[tokio::test]
    async fn memory_directory_answers_lookups() {
        let room = kitchen();
        let member = UserId::from(Uuid::new_v4());
        let directory = MemoryDirectory::new();
        directory.add_room(room.clone()).await;
        directory.add_member(room.id, member).await;

        assert_eq!(directory.find_room(room.id).await.unwrap(), Some(room.clone()));
        assert_eq!(
            directory.find_room_by_slug("the-kitchen").await.unwrap(),
            Some(room.clone())
        );
        assert!(directory.find_room_by_slug("the-porch").await.unwrap().is_none());
        assert!(directory.is_member(room.id, member).await.unwrap());
        assert!(!directory
            .is_member(room.id, UserId::from(Uuid::new_v4()))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn seed_is_loaded_from_json() {
        let room_id = Uuid::new_v4();
        let user_id = Uuid::new_v4();
        let json = serde_json::json!({
            "rooms": [{ "id": room_id, "slug": "porch", "name": "Porch" }],
            "users": [{ "id": user_id, "email": "ada@example.com" }],
            "memberships": [{ "room_id": room_id, "user_id": user_id }]
        });
        let seed: DirectorySeed = serde_json::from_value(json).unwrap();
        let directory = MemoryDirectory::from_seed(seed);

        assert_eq!(directory.room_count().await, 1);
        let user = directory.find_user(UserId::from(user_id)).await.unwrap().unwrap();
        assert_eq!(user.presence_name(), "ada@example.com");
        assert!(directory
            .is_member(RoomId::from(room_id), UserId::from(user_id))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn require_membership_distinguishes_missing_room_from_non_member() {
        let room = kitchen();
        let outsider = UserId::from(Uuid::new_v4());

        let mut directory = MockMembershipDirectory::new();
        directory
            .expect_is_member()
            .with(eq(room.id), eq(outsider))
            .times(1)
            .returning(|_, _| Ok(false));

        let missing = require_membership(&directory, None, outsider).await;
        assert!(matches!(missing, Err(ApplicationError::NotFound(_))));

        let forbidden = require_membership(&directory, Some(room), outsider).await;
        assert!(matches!(forbidden, Err(ApplicationError::Forbidden(_))));
    }

    #[tokio::test]
    async fn require_membership_returns_the_room_for_members() {
        let room = kitchen();
        let member = UserId::from(Uuid::new_v4());

        let mut directory = MockMembershipDirectory::new();
        directory.expect_is_member().returning(|_, _| Ok(true));

        let resolved = require_membership(&directory, Some(room.clone()), member)
            .await
            .unwrap();
        assert_eq!(resolved, room);
    }
}
