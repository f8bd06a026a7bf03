//! World state storage.

use tokio::sync::RwLock;

use faramita_domain::WorldState;

/// The world state behind an async lock.
pub struct WorldStore {
    inner: RwLock<WorldState>,
}

impl WorldStore {
    pub fn new(world: WorldState) -> Self {
        Self {
            inner: RwLock::new(world),
        }
    }

    /// Run `f` against a shared view of the world.
    pub async fn read<R>(&self, f: impl FnOnce(&WorldState) -> R) -> R {
        let guard = self.inner.read().await;
        f(&guard)
    }

    /// Run `f` with exclusive access to the world.
    pub async fn write<R>(&self, f: impl FnOnce(&mut WorldState) -> R) -> R {
        let mut guard = self.inner.write().await;
        f(&mut guard)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use faramita_domain::{CardId, WorldTemplate};

    #[tokio::test]
    async fn writes_are_visible_to_later_reads() {
        let store = WorldStore::new(WorldState::from_template(WorldTemplate::oort()));
        store
            .write(|w| w.update_active_characters(&[], &[CardId::new("char-001").unwrap()]))
            .await;
        let active = store.read(|w| w.active_character_ids().len()).await;
        assert_eq!(active, 0);
    }
}
