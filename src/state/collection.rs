use crate::model::Entity;
use crate::repo::Repository;
use crate::sync::ChangeNotifier;
use crate::{utils, Result};
use tracing::debug;

/// The in-memory copy of one persisted collection.
///
/// Every mutation builds the new collection, persists it and only then replaces the in-memory
/// copy, so a failed write leaves both where they were.
#[derive(Debug)]
pub struct CollectionStore<T: Entity> {
    repo: Repository,
    notifier: ChangeNotifier,
    items: Vec<T>,
    loaded: bool,
}

impl<T: Entity> CollectionStore<T> {
    pub fn new(repo: Repository, notifier: ChangeNotifier) -> Self {
        Self {
            repo,
            notifier,
            items: Vec::new(),
            loaded: false,
        }
    }

    /// Reads the collection from storage unless it has been read already.
    pub fn load(&mut self) {
        if !self.loaded {
            self.reload();
        }
    }

    /// Reads the collection from storage, replacing whatever is held in memory.
    pub fn reload(&mut self) {
        self.items = self.repo.collection();
        self.loaded = true;
        debug!("Loaded {} {}(s)", self.items.len(), T::NAME);
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn all(&self) -> &[T] {
        &self.items
    }

    pub fn get(&self, id: &str) -> Option<&T> {
        self.items.iter().find(|item| item.id() == id)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Gives `item` a fresh id, appends it and persists the collection. Any id already set on
    /// `item` is replaced.
    pub fn add(&mut self, mut item: T) -> Result<&T> {
        self.load();
        let mut id = utils::new_id();
        while self.get(&id).is_some() {
            id = utils::new_id();
        }
        item.set_id(id);

        let mut next = self.items.clone();
        next.push(item);
        self.commit(next)?;
        let added = self.items.len() - 1;
        Ok(&self.items[added])
    }

    /// Replaces the item with the same id. Returns `false`, without writing, if there is none.
    pub fn update(&mut self, item: T) -> Result<bool> {
        self.load();
        let Some(index) = self.position(item.id()) else {
            debug!("No {} with id '{}' to update", T::NAME, item.id());
            return Ok(false);
        };
        let mut next = self.items.clone();
        next[index] = item;
        self.commit(next)?;
        Ok(true)
    }

    /// Removes the item with `id`. Returns `false`, without writing, if there is none.
    pub fn remove(&mut self, id: &str) -> Result<bool> {
        self.load();
        let Some(index) = self.position(id) else {
            debug!("No {} with id '{id}' to remove", T::NAME);
            return Ok(false);
        };
        let mut next = self.items.clone();
        next.remove(index);
        self.commit(next)?;
        Ok(true)
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.items.iter().position(|item| item.id() == id)
    }

    fn commit(&mut self, next: Vec<T>) -> Result<()> {
        self.repo.save_collection(&next)?;
        self.items = next;
        self.notifier.notify(T::COLLECTION);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::{KvStore, MemoryKv};
    use crate::model::{Category, List, PaymentMethod};
    use std::collections::HashSet;
    use std::sync::Arc;

    fn store<T: Entity>() -> (Arc<MemoryKv>, CollectionStore<T>) {
        let kv = Arc::new(MemoryKv::new());
        let repo = Repository::new(kv.clone());
        (kv, CollectionStore::new(repo, ChangeNotifier::disconnected()))
    }

    #[test]
    fn test_add_assigns_unique_ids_and_persists() {
        let (kv, mut lists) = store::<List>();
        let mut ids = HashSet::new();
        for name in ["Family", "Work", "Family"] {
            let before = lists.len();
            let added = lists.add(List::new(name)).unwrap();
            assert!(!added.id.is_empty());
            assert!(ids.insert(added.id.clone()));
            assert_eq!(lists.len(), before + 1);
            let stored: Vec<List> = serde_json::from_str(&kv.get("lists").unwrap().unwrap()).unwrap();
            assert_eq!(stored, lists.all());
        }
    }

    #[test]
    fn test_add_replaces_given_id() {
        let (_, mut methods) = store::<PaymentMethod>();
        let mut method = PaymentMethod::new("Visa");
        method.id = "mine".to_string();
        let id = methods.add(method.clone()).unwrap().id.clone();
        method.id = id.clone();
        let mut again = PaymentMethod::new("Amex");
        again.id = id.clone();
        let second = methods.add(again).unwrap().id.clone();
        assert_ne!(second, id);
        assert_eq!(methods.get(&id), Some(&method));
    }

    #[test]
    fn test_update_and_remove() {
        let (_, mut categories) = store::<Category>();
        let id = categories
            .add(Category::new("Video", "#000000"))
            .unwrap()
            .id
            .clone();

        let mut changed = categories.get(&id).unwrap().clone();
        changed.color = "#E50914".to_string();
        assert!(categories.update(changed.clone()).unwrap());
        assert_eq!(categories.get(&id), Some(&changed));

        assert!(categories.remove(&id).unwrap());
        assert!(categories.is_empty());
    }

    #[test]
    fn test_unknown_id_is_a_no_op_without_write() {
        let (kv, mut lists) = store::<List>();
        lists.add(List::new("Family")).unwrap();
        let before = kv.get("lists").unwrap();

        kv.fail_writes(true);
        assert!(!lists.remove("missing").unwrap());
        let mut ghost = List::new("Ghost");
        ghost.id = "missing".to_string();
        assert!(!lists.update(ghost).unwrap());

        assert_eq!(lists.len(), 1);
        assert_eq!(kv.get("lists").unwrap(), before);
    }

    #[test]
    fn test_failed_write_leaves_memory_unchanged() {
        let (kv, mut lists) = store::<List>();
        let id = lists.add(List::new("Family")).unwrap().id.clone();
        let before = lists.all().to_vec();

        kv.fail_writes(true);
        assert!(lists.add(List::new("Work")).is_err());
        assert!(lists.remove(&id).is_err());
        let mut renamed = before[0].clone();
        renamed.name = "Relatives".to_string();
        assert!(lists.update(renamed).is_err());

        assert_eq!(lists.all(), before);
        kv.fail_writes(false);
        lists.reload();
        assert_eq!(lists.all(), before);
    }

    #[test]
    fn test_load_is_idempotent_and_reload_is_fresh() {
        let kv = Arc::new(MemoryKv::new());
        let repo = Repository::new(kv.clone());
        let mut first: CollectionStore<List> =
            CollectionStore::new(repo.clone(), ChangeNotifier::disconnected());
        assert!(!first.is_loaded());
        first.load();
        assert!(first.is_loaded());
        assert!(first.is_empty());

        let mut other: CollectionStore<List> =
            CollectionStore::new(repo, ChangeNotifier::disconnected());
        other.add(List::new("Work")).unwrap();

        first.load();
        assert!(first.is_empty());
        first.reload();
        assert_eq!(first.all(), other.all());
    }
}
