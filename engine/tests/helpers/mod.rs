//! Shared fixtures for engine integration tests.
//!
//! `TestEngine` wires an `AccessHandler` to in-memory stores and a frozen
//! clock. `news_site()` builds the content graph most tests use:
//!
//! ```text
//! category 5 (news)
//! └── category 6 (sports)
//!     └── category 7 (football)
//! category 8 (weather)
//!
//! post 10 -> sports        post 11 -> football
//! post 12 (author 3)       page 20
//! └── post 13              └── page 21
//! ```
#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use chrono::{DateTime, Duration, TimeZone, Utc};
use parking_lot::Mutex;
use uam_engine::{
    AccessHandler, Clock, DynamicGroupId, DynamicUserGroup, EngineConfig, FixedClock, GroupStore,
    InMemoryCache, InMemoryGroupStore, MemoryContentStore, ObjectId, ObjectRef, StoreError,
    UserGroup,
};

pub const NEWS: u64 = 5;
pub const SPORTS: u64 = 6;
pub const FOOTBALL: u64 = 7;
pub const WEATHER: u64 = 8;

/// Routes engine logs to the test harness, filtered by `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Instant every test engine is frozen at.
pub fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
}

pub fn yesterday() -> DateTime<Utc> {
    now() - Duration::days(1)
}

pub fn tomorrow() -> DateTime<Utc> {
    now() + Duration::days(1)
}

pub fn config(lock_recursive: bool) -> EngineConfig {
    EngineConfig {
        lock_recursive,
        ..EngineConfig::default()
    }
}

pub fn news_site() -> MemoryContentStore {
    let content = MemoryContentStore::with_defaults();

    content.add_term("category", NEWS, None);
    let sports = content.add_term("category", SPORTS, Some(ObjectId::from(NEWS)));
    let football = content.add_term("category", FOOTBALL, Some(ObjectId::from(SPORTS)));
    content.add_term("category", WEATHER, None);

    let post_10 = content.add_post("post", 10_u64, None, None);
    let post_11 = content.add_post("post", 11_u64, None, None);
    content.attach(&post_10, &sports);
    content.attach(&post_11, &football);

    content.add_post("post", 12_u64, Some(ObjectId::from(3_u64)), None);
    content.add_post("post", 13_u64, None, Some(ObjectId::from(12_u64)));
    content.add_post("page", 20_u64, None, None);
    content.add_post("page", 21_u64, None, Some(ObjectId::from(20_u64)));

    content.add_user(1_u64, &["administrator"]);
    content.add_user(2_u64, &["editor"]);
    content.add_user(3_u64, &["author"]);
    content.add_user(4_u64, &["subscriber"]);

    content
}

pub struct TestEngine {
    pub content: Arc<MemoryContentStore>,
    pub groups: Arc<InMemoryGroupStore>,
    pub cache: Arc<InMemoryCache>,
    pub handler: AccessHandler,
}

impl TestEngine {
    pub fn new(content: MemoryContentStore) -> Self {
        Self::with_config(content, EngineConfig::default())
    }

    pub fn with_config(content: MemoryContentStore, config: EngineConfig) -> Self {
        Self::at(content, config, now())
    }

    pub fn at(content: MemoryContentStore, config: EngineConfig, instant: DateTime<Utc>) -> Self {
        init_tracing();
        let content = Arc::new(content);
        let groups = Arc::new(InMemoryGroupStore::new());
        let cache = Arc::new(InMemoryCache::new());

        let handler = AccessHandler::builder(content.clone(), groups.clone())
            .cache(cache.clone())
            .clock(Arc::new(FixedClock(instant)))
            .config(config)
            .build();

        Self {
            content,
            groups,
            cache,
            handler,
        }
    }

    /// Saves the group through the handler and returns its id.
    pub fn save(&self, mut group: UserGroup) -> u64 {
        self.handler.save_user_group(&mut group).unwrap()
    }

    pub fn save_dynamic(&self, group: DynamicUserGroup) {
        self.handler.save_dynamic_user_group(&group).unwrap();
    }
}

/// Group with `read_access = group` holding the given objects permanently.
pub fn group_with(name: &str, objects: &[ObjectRef]) -> UserGroup {
    let mut group = UserGroup::new(name);
    for object in objects {
        group.add_object(object.object_type.clone(), object.id.clone(), None, None);
    }
    group
}

pub fn category(id: u64) -> ObjectRef {
    ObjectRef::new("category", id)
}

pub fn post(id: u64) -> ObjectRef {
    ObjectRef::new("post", id)
}

pub fn user(id: u64) -> ObjectRef {
    ObjectRef::new("_user_", id)
}

/// Group store whose every call fails.
#[derive(Debug, Default)]
pub struct FailingGroupStore;

impl GroupStore for FailingGroupStore {
    fn load(&self, _id: u64) -> Result<Option<UserGroup>, StoreError> {
        Err(StoreError("connection refused".to_string()))
    }

    fn load_all(&self) -> Result<Vec<UserGroup>, StoreError> {
        Err(StoreError("connection refused".to_string()))
    }

    fn load_dynamic_groups(&self) -> Result<Vec<DynamicUserGroup>, StoreError> {
        Err(StoreError("connection refused".to_string()))
    }

    fn persist(&self, _group: &UserGroup) -> Result<u64, StoreError> {
        Err(StoreError("connection refused".to_string()))
    }

    fn persist_dynamic(&self, _group: &DynamicUserGroup) -> Result<(), StoreError> {
        Err(StoreError("connection refused".to_string()))
    }

    fn delete(&self, _id: u64) -> Result<(), StoreError> {
        Err(StoreError("connection refused".to_string()))
    }

    fn delete_dynamic(&self, _id: &DynamicGroupId) -> Result<(), StoreError> {
        Err(StoreError("connection refused".to_string()))
    }
}

/// Clock a test can move forward.
#[derive(Debug)]
pub struct ManualClock(Mutex<DateTime<Utc>>);

impl ManualClock {
    pub fn new(instant: DateTime<Utc>) -> Self {
        Self(Mutex::new(instant))
    }

    pub fn set(&self, instant: DateTime<Utc>) {
        *self.0.lock() = instant;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.0.lock()
    }
}

/// In-memory group store whose reads fail while `offline` is set.
#[derive(Debug, Default)]
pub struct FlakyGroupStore {
    pub inner: InMemoryGroupStore,
    pub offline: AtomicBool,
}

impl FlakyGroupStore {
    fn check(&self) -> Result<(), StoreError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(StoreError("connection reset".to_string()));
        }
        Ok(())
    }
}

impl GroupStore for FlakyGroupStore {
    fn load(&self, id: u64) -> Result<Option<UserGroup>, StoreError> {
        self.check()?;
        self.inner.load(id)
    }

    fn load_all(&self) -> Result<Vec<UserGroup>, StoreError> {
        self.check()?;
        self.inner.load_all()
    }

    fn load_dynamic_groups(&self) -> Result<Vec<DynamicUserGroup>, StoreError> {
        self.check()?;
        self.inner.load_dynamic_groups()
    }

    fn persist(&self, group: &UserGroup) -> Result<u64, StoreError> {
        self.inner.persist(group)
    }

    fn persist_dynamic(&self, group: &DynamicUserGroup) -> Result<(), StoreError> {
        self.inner.persist_dynamic(group)
    }

    fn delete(&self, id: u64) -> Result<(), StoreError> {
        self.inner.delete(id)
    }

    fn delete_dynamic(&self, id: &DynamicGroupId) -> Result<(), StoreError> {
        self.inner.delete_dynamic(id)
    }
}

/// Group store that, during its first `load_all`, lets another writer add
/// a group and invalidate the handler after the snapshot was taken.
#[derive(Debug, Default)]
pub struct ConcurrentWriterGroupStore {
    pub inner: InMemoryGroupStore,
    pub handler: Mutex<Weak<AccessHandler>>,
    pub late_group: Mutex<Option<UserGroup>>,
}

impl GroupStore for ConcurrentWriterGroupStore {
    fn load(&self, id: u64) -> Result<Option<UserGroup>, StoreError> {
        self.inner.load(id)
    }

    fn load_all(&self) -> Result<Vec<UserGroup>, StoreError> {
        let snapshot = self.inner.load_all()?;

        if let Some(group) = self.late_group.lock().take() {
            self.inner.persist(&group)?;
            if let Some(handler) = self.handler.lock().upgrade() {
                handler.invalidate_all();
            }
        }

        Ok(snapshot)
    }

    fn load_dynamic_groups(&self) -> Result<Vec<DynamicUserGroup>, StoreError> {
        self.inner.load_dynamic_groups()
    }

    fn persist(&self, group: &UserGroup) -> Result<u64, StoreError> {
        self.inner.persist(group)
    }

    fn persist_dynamic(&self, group: &DynamicUserGroup) -> Result<(), StoreError> {
        self.inner.persist_dynamic(group)
    }

    fn delete(&self, id: u64) -> Result<(), StoreError> {
        self.inner.delete(id)
    }

    fn delete_dynamic(&self, id: &DynamicGroupId) -> Result<(), StoreError> {
        self.inner.delete_dynamic(id)
    }
}
