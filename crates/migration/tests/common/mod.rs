//! In-memory fakes of the legacy and target collaborators.

#![allow(dead_code, reason = "each test binary uses a different subset")]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use nutrilog_core::{
    EntityKind, FoodKey, LegacyRecord, StageSet, TargetFood, TargetFoodLog, TargetIdentity, normalize_email,
};
use nutrilog_legacy::{LegacyError, LegacySource};
use nutrilog_migration::{AssetMigrator, Orchestrator, RunSettings, Transformer};
use nutrilog_target::{BlobStore, IdentityStore, NewIdentity, RecordStore, TargetError};
use serde_json::{Map, Value, json};
use uuid::Uuid;

pub fn unavailable() -> LegacyError {
    LegacyError::HttpStatus { code: 503, body: "maintenance".into() }
}

#[derive(Default)]
pub struct FakeSource {
    pub records: HashMap<EntityKind, Vec<LegacyRecord>>,
    /// Overrides the reported count per kind.
    pub counts: HashMap<EntityKind, usize>,
    pub failing: Mutex<HashSet<EntityKind>>,
    pub unreachable: AtomicBool,
}

impl FakeSource {
    pub fn with(mut self, kind: EntityKind, records: Vec<LegacyRecord>) -> Self {
        self.records.insert(kind, records);
        self
    }

    pub fn fail(&self, kind: EntityKind) {
        self.failing.lock().unwrap().insert(kind);
    }
}

#[async_trait]
impl LegacySource for FakeSource {
    async fn fetch(&self, kind: EntityKind, limit: usize) -> Result<Vec<LegacyRecord>, LegacyError> {
        if self.unreachable.load(Ordering::SeqCst) || self.failing.lock().unwrap().contains(&kind) {
            return Err(unavailable());
        }
        Ok(self.records.get(&kind).map(|r| r.iter().take(limit).cloned().collect()).unwrap_or_default())
    }

    async fn count(&self, kind: EntityKind) -> Result<usize, LegacyError> {
        if self.unreachable.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        Ok(self.counts.get(&kind).copied().unwrap_or_else(|| self.records.get(&kind).map_or(0, Vec::len)))
    }
}

#[derive(Default)]
pub struct MemoryIdentities {
    pub identities: Mutex<Vec<TargetIdentity>>,
    pub creates: AtomicUsize,
    pub updates: AtomicUsize,
    pub down: AtomicBool,
    /// Emails whose create call fails.
    pub rejected: Mutex<HashSet<String>>,
    /// Identities another writer adds just before our next create call.
    pub racing: Mutex<Vec<TargetIdentity>>,
    /// Emails reported as taken although no listed identity has them.
    pub hidden: Mutex<HashSet<String>>,
    /// Listing fails while pings still succeed.
    pub listing_down: AtomicBool,
}

impl MemoryIdentities {
    pub fn seed(&self, email: &str, metadata: Map<String, Value>) -> Uuid {
        let id = Uuid::new_v4();
        self.identities.lock().unwrap().push(TargetIdentity { id, email: Some(email.to_owned()), metadata });
        id
    }

    /// Makes an identity with `email` appear once the user stage has loaded
    /// its index.
    pub fn race(&self, email: &str, metadata: Map<String, Value>) -> Uuid {
        let id = Uuid::new_v4();
        self.racing.lock().unwrap().push(TargetIdentity { id, email: Some(email.to_owned()), metadata });
        id
    }

    pub fn count(&self) -> usize {
        self.identities.lock().unwrap().len()
    }

    pub fn ids(&self) -> HashSet<Uuid> {
        self.identities.lock().unwrap().iter().map(|i| i.id).collect()
    }

    pub fn get(&self, id: Uuid) -> Option<TargetIdentity> {
        self.identities.lock().unwrap().iter().find(|i| i.id == id).cloned()
    }
}

#[async_trait]
impl IdentityStore for MemoryIdentities {
    async fn list_identities(&self) -> Result<Vec<TargetIdentity>, TargetError> {
        if self.listing_down.load(Ordering::SeqCst) {
            return Err(TargetError::HttpStatus { code: 502, body: "bad gateway".into() });
        }
        Ok(self.identities.lock().unwrap().clone())
    }

    async fn create_identity(&self, identity: &NewIdentity) -> Result<TargetIdentity, TargetError> {
        if self.rejected.lock().unwrap().contains(&identity.email) {
            return Err(TargetError::HttpStatus { code: 400, body: "invalid email".into() });
        }
        if self.hidden.lock().unwrap().contains(&identity.email) {
            return Err(TargetError::Duplicate(identity.email.clone()));
        }
        let mut identities = self.identities.lock().unwrap();
        identities.append(&mut self.racing.lock().unwrap());
        let key = normalize_email(&identity.email);
        if identities.iter().any(|i| i.email_key().as_deref() == Some(key.as_str())) {
            return Err(TargetError::Duplicate(identity.email.clone()));
        }
        let created =
            TargetIdentity { id: identity.id, email: Some(identity.email.clone()), metadata: identity.metadata.clone() };
        identities.push(created.clone());
        self.creates.fetch_add(1, Ordering::SeqCst);
        Ok(created)
    }

    async fn update_metadata(&self, id: Uuid, metadata: &Map<String, Value>) -> Result<(), TargetError> {
        let mut identities = self.identities.lock().unwrap();
        let identity = identities
            .iter_mut()
            .find(|i| i.id == id)
            .ok_or_else(|| TargetError::HttpStatus { code: 404, body: "user not found".into() })?;
        identity.metadata = metadata.clone();
        self.updates.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn ping(&self) -> Result<(), TargetError> {
        if self.down.load(Ordering::SeqCst) {
            return Err(TargetError::HttpStatus { code: 503, body: "down".into() });
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryRecords {
    pub foods: Mutex<Vec<TargetFood>>,
    pub logs: Mutex<Vec<TargetFoodLog>>,
    /// Any batch containing one of these legacy ids is rejected whole.
    pub poisoned: Mutex<HashSet<String>>,
    pub batches: AtomicUsize,
    pub listing_down: AtomicBool,
}

impl MemoryRecords {
    pub fn poison(&self, legacy_id: &str) {
        self.poisoned.lock().unwrap().insert(legacy_id.to_owned());
    }

    pub fn food_ids(&self) -> HashSet<Uuid> {
        self.foods.lock().unwrap().iter().map(|f| f.id).collect()
    }

    pub fn logs(&self) -> Vec<TargetFoodLog> {
        self.logs.lock().unwrap().clone()
    }

    fn check(&self, legacy_ids: impl IntoIterator<Item = String>) -> Result<(), TargetError> {
        self.batches.fetch_add(1, Ordering::SeqCst);
        let poisoned = self.poisoned.lock().unwrap();
        if legacy_ids.into_iter().any(|id| poisoned.contains(&id)) {
            return Err(TargetError::HttpStatus { code: 400, body: "constraint violation".into() });
        }
        Ok(())
    }
}

#[async_trait]
impl RecordStore for MemoryRecords {
    async fn insert_foods(&self, foods: &[TargetFood]) -> Result<(), TargetError> {
        self.check(foods.iter().map(|f| f.legacy_id.clone()))?;
        self.foods.lock().unwrap().extend_from_slice(foods);
        Ok(())
    }

    async fn insert_food_logs(&self, logs: &[TargetFoodLog]) -> Result<(), TargetError> {
        self.check(logs.iter().map(|l| l.legacy_id.clone()))?;
        self.logs.lock().unwrap().extend_from_slice(logs);
        Ok(())
    }

    async fn list_food_keys(&self) -> Result<Vec<FoodKey>, TargetError> {
        if self.listing_down.load(Ordering::SeqCst) {
            return Err(TargetError::HttpStatus { code: 500, body: "relation locked".into() });
        }
        Ok(self
            .foods
            .lock()
            .unwrap()
            .iter()
            .map(|f| FoodKey { id: f.id, name: f.name.clone(), brand: f.brand.clone() })
            .collect())
    }

    async fn ping(&self) -> Result<(), TargetError> {
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryBlobs {
    pub objects: Mutex<HashMap<String, Vec<u8>>>,
    pub fail: AtomicBool,
}

#[async_trait]
impl BlobStore for MemoryBlobs {
    async fn upload(&self, name: &str, bytes: Vec<u8>, _content_type: &str) -> Result<(), TargetError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(TargetError::HttpStatus { code: 503, body: "storage offline".into() });
        }
        self.objects.lock().unwrap().insert(name.to_owned(), bytes);
        Ok(())
    }

    fn public_url(&self, name: &str) -> String {
        format!("https://cdn.example/public/{name}")
    }
}

/// Shared handles to the fakes behind one orchestrator.
pub struct Harness {
    pub source: Arc<FakeSource>,
    pub identities: Arc<MemoryIdentities>,
    pub records: Arc<MemoryRecords>,
    pub blobs: Arc<MemoryBlobs>,
    pub settings: RunSettings,
}

impl Harness {
    pub fn new(source: FakeSource) -> Self {
        Self {
            source: Arc::new(source),
            identities: Arc::new(MemoryIdentities::default()),
            records: Arc::new(MemoryRecords::default()),
            blobs: Arc::new(MemoryBlobs::default()),
            settings: RunSettings {
                fetch_limit: 10_000,
                batch_size: 3,
                concurrency: 2,
                timeout: Duration::from_secs(5),
            },
        }
    }

    /// Fresh orchestrator over the same stores.
    pub fn orchestrator(&self) -> Orchestrator {
        let assets = AssetMigrator::new(self.blobs.clone(), self.settings.timeout).unwrap();
        Orchestrator::new(
            self.source.clone(),
            self.identities.clone(),
            self.records.clone(),
            assets,
            Transformer::default(),
            self.settings,
        )
    }

    pub async fn run(&self, stages: StageSet) -> nutrilog_core::MigrationReport {
        self.orchestrator().run(stages).await.unwrap()
    }
}

pub fn user(id: &str, email: &str) -> LegacyRecord {
    LegacyRecord::new(EntityKind::User, id)
        .with_field("email", email)
        .with_field("username", id)
        .with_field("emailVerified", true)
        .with_field("createdAt", "2023-01-01T00:00:00.000Z")
}

pub fn food(id: &str, name: &str) -> LegacyRecord {
    LegacyRecord::new(EntityKind::Food, id)
        .with_field("name", name)
        .with_field("calories", 120)
        .with_field("protein", 4.5)
        .with_field("createdAt", "2023-01-02T00:00:00.000Z")
}

pub fn food_log(id: &str, user_id: &str, food_id: &str) -> LegacyRecord {
    LegacyRecord::new(EntityKind::FoodLog, id)
        .with_field("user", json!({"__type": "Pointer", "className": "_User", "objectId": user_id}))
        .with_field("food", json!({"__type": "Pointer", "className": "Food", "objectId": food_id}))
        .with_field("consumedAt", json!({"__type": "Date", "iso": "2024-02-03T12:30:00.000Z"}))
        .with_field("servings", 2)
}

/// Three users, five foods, eight logs, all resolvable.
pub fn dataset() -> FakeSource {
    let users = vec![user("u1", "ann@example.com"), user("u2", "bob@example.com"), user("u3", "cy@example.com")];
    let foods = vec![
        food("f1", "Chicken Breast (Perdue)"),
        food("f2", "Tomato"),
        food("f3", "Oats (Quaker)"),
        food("f4", "Greek Yogurt (Fage)"),
        food("f5", "Banana"),
    ];
    let logs = (1..=8)
        .map(|i| food_log(&format!("l{i}"), &format!("u{}", (i % 3) + 1), &format!("f{}", (i % 5) + 1)))
        .collect();
    FakeSource::default()
        .with(EntityKind::User, users)
        .with(EntityKind::Food, foods)
        .with(EntityKind::FoodLog, logs)
}
