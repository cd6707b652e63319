//! In-memory policy mapping backed by a `Store`

use complexratio_api::{PolicyDocument, PolicyRecord, DEFAULT_GROUP};
use std::sync::Arc;
use tracing::{debug, info};

use crate::{Store, StoreResult};

/// Group name -> policy record, as seen by the engine.
///
/// Mutations only touch the in-memory map; callers decide when a batch of
/// mutations is persisted with [`ConfigStore::save`]. If a save fails the
/// in-memory state stays authoritative and the next successful save
/// reconciles storage.
pub struct ConfigStore {
    policies: PolicyDocument,
    store: Arc<dyn Store>,
}

impl ConfigStore {
    /// Load the persisted document, creating it on first use.
    ///
    /// The result always contains the `"default"` group.
    pub fn load(store: Arc<dyn Store>) -> StoreResult<Self> {
        Self::load_seeded(store, &PolicyDocument::new())
    }

    /// Load the persisted document and fill in groups that have no stored
    /// record from `seeds`.
    ///
    /// Stored records always win over seeds. A `"default"` group missing from
    /// both gets the inactive default record. Saves once if anything was added.
    pub fn load_seeded(store: Arc<dyn Store>, seeds: &PolicyDocument) -> StoreResult<Self> {
        let stored = store.load_policies()?;
        let mut changed = stored.is_none();
        if changed {
            info!("No stored policies, creating policy document");
        }

        let mut policies = stored.unwrap_or_default();
        for (group, record) in seeds {
            if !policies.contains_key(group) {
                debug!(group = %group, "Seeding policy record from config");
                policies.insert(group.clone(), *record);
                changed = true;
            }
        }

        if !policies.contains_key(DEFAULT_GROUP) {
            policies.insert(DEFAULT_GROUP.to_string(), PolicyRecord::default());
            changed = true;
        }

        let config = Self { policies, store };
        if changed {
            config.save()?;
        }

        debug!(groups = config.policies.len(), "Policy document loaded");
        Ok(config)
    }

    pub fn get(&self, group: &str) -> Option<&PolicyRecord> {
        self.policies.get(group)
    }

    pub fn contains(&self, group: &str) -> bool {
        self.policies.contains_key(group)
    }

    /// Get the group's record, inserting the default record if it has none.
    ///
    /// Returns the record and whether it was just created.
    pub fn ensure_group(&mut self, group: &str) -> (PolicyRecord, bool) {
        if let Some(record) = self.policies.get(group) {
            return (*record, false);
        }

        debug!(group, "No policy for group yet, creating it");
        let record = PolicyRecord::default();
        self.policies.insert(group.to_string(), record);
        (record, true)
    }

    /// Overwrite or insert every group in `update`; other groups are untouched.
    ///
    /// Returns the group names that were applied.
    pub fn set(&mut self, update: PolicyDocument) -> Vec<String> {
        let groups: Vec<String> = update.keys().cloned().collect();
        self.policies.extend(update);
        groups
    }

    /// Persist the current mapping
    pub fn save(&self) -> StoreResult<()> {
        self.store.save_policies(&self.policies)
    }

    /// Owned copy of the current mapping
    pub fn snapshot(&self) -> PolicyDocument {
        self.policies.clone()
    }

    pub fn len(&self) -> usize {
        self.policies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SqliteStore;
    use complexratio_api::default_policy_document;

    fn open() -> (Arc<dyn Store>, ConfigStore) {
        let store: Arc<dyn Store> = Arc::new(SqliteStore::in_memory().unwrap());
        let config = ConfigStore::load(store.clone()).unwrap();
        (store, config)
    }

    #[test]
    fn first_load_creates_and_persists_default() {
        let (store, config) = open();

        assert_eq!(config.snapshot(), default_policy_document());
        assert_eq!(store.load_policies().unwrap(), Some(default_policy_document()));
    }

    #[test]
    fn load_restores_missing_default_group() {
        let store: Arc<dyn Store> = Arc::new(SqliteStore::in_memory().unwrap());
        let mut doc = PolicyDocument::new();
        doc.insert("tv".into(), PolicyRecord::activated(1.0, 1.0, 1.0));
        store.save_policies(&doc).unwrap();

        let config = ConfigStore::load(store.clone()).unwrap();
        assert_eq!(config.len(), 2);
        assert!(config.contains(DEFAULT_GROUP));
        assert!(store.load_policies().unwrap().unwrap().contains_key(DEFAULT_GROUP));
    }

    #[test]
    fn load_keeps_existing_records() {
        let store: Arc<dyn Store> = Arc::new(SqliteStore::in_memory().unwrap());
        let mut doc = default_policy_document();
        doc.insert(DEFAULT_GROUP.into(), PolicyRecord::activated(3.0, 2.0, 1.0));
        store.save_policies(&doc).unwrap();

        let config = ConfigStore::load(store).unwrap();
        assert_eq!(config.get(DEFAULT_GROUP), Some(&PolicyRecord::activated(3.0, 2.0, 1.0)));
    }

    #[test]
    fn ensure_group_creates_once() {
        let (_, mut config) = open();

        let (record, created) = config.ensure_group("seedbox");
        assert!(created);
        assert_eq!(record, PolicyRecord::default());

        let (_, created) = config.ensure_group("seedbox");
        assert!(!created);
        assert_eq!(config.len(), 2);
    }

    #[test]
    fn set_merges_and_leaves_other_groups() {
        let (_, mut config) = open();
        config.ensure_group("a");
        config.ensure_group("b");

        let mut update = PolicyDocument::new();
        update.insert("b".into(), PolicyRecord::activated(2.0, 3.0, 4.0));
        update.insert("c".into(), PolicyRecord::activated(1.0, 1.0, 1.0));

        let applied = config.set(update);
        assert_eq!(applied, vec!["b".to_string(), "c".to_string()]);
        assert_eq!(config.get("a"), Some(&PolicyRecord::default()));
        assert_eq!(config.get("b"), Some(&PolicyRecord::activated(2.0, 3.0, 4.0)));
        assert_eq!(config.len(), 4);
    }

    #[test]
    fn seeds_fill_missing_groups_only() {
        let store: Arc<dyn Store> = Arc::new(SqliteStore::in_memory().unwrap());
        let mut doc = default_policy_document();
        doc.insert("tv".into(), PolicyRecord::activated(5.0, 5.0, 5.0));
        store.save_policies(&doc).unwrap();

        let mut seeds = PolicyDocument::new();
        seeds.insert(DEFAULT_GROUP.into(), PolicyRecord::activated(1.0, 1.0, 1.0));
        seeds.insert("tv".into(), PolicyRecord::activated(1.0, 1.0, 1.0));
        seeds.insert("books".into(), PolicyRecord::activated(2.0, 2.0, 2.0));

        let config = ConfigStore::load_seeded(store.clone(), &seeds).unwrap();
        assert!(!config.get(DEFAULT_GROUP).unwrap().activated);
        assert_eq!(config.get("tv"), Some(&PolicyRecord::activated(5.0, 5.0, 5.0)));
        assert_eq!(config.get("books"), Some(&PolicyRecord::activated(2.0, 2.0, 2.0)));
        assert!(store.load_policies().unwrap().unwrap().contains_key("books"));
    }

    #[test]
    fn seeds_apply_to_default_on_fresh_store() {
        let store: Arc<dyn Store> = Arc::new(SqliteStore::in_memory().unwrap());
        let mut seeds = PolicyDocument::new();
        seeds.insert(DEFAULT_GROUP.into(), PolicyRecord::activated(1.0, 10.0, 100.0));

        let config = ConfigStore::load_seeded(store.clone(), &seeds).unwrap();
        assert_eq!(config.snapshot(), seeds);
        assert_eq!(store.load_policies().unwrap(), Some(seeds));
    }

    #[test]
    fn mutations_persist_only_on_save() {
        let (store, mut config) = open();
        config.ensure_group("pending");
        assert!(!store.load_policies().unwrap().unwrap().contains_key("pending"));

        config.save().unwrap();
        assert!(store.load_policies().unwrap().unwrap().contains_key("pending"));
    }
}
