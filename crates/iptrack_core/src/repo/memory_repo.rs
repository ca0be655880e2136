//! In-process asset store.
//!
//! Backs the CLI and tests where no database file is wanted. Every method
//! takes one lock, so id allocation and insert are a single step.

use crate::model::asset::{Asset, AssetId, NewAsset};
use crate::model::error::{NotFoundError, ValidationError};
use crate::repo::asset_repo::{AssetListQuery, AssetRepository, RepoError, RepoResult};
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Debug, Default)]
struct MemoryState {
    /// Insertion order.
    assets: Vec<Asset>,
    index: HashMap<AssetId, usize>,
    /// Last allocated sequence per year.
    sequences: HashMap<i32, u32>,
}

impl MemoryState {
    fn push(&mut self, asset: Asset) {
        let slot = self.sequences.entry(asset.id.year()).or_insert(0);
        *slot = (*slot).max(asset.id.sequence());
        self.index.insert(asset.id.clone(), self.assets.len());
        self.assets.push(asset);
    }

    /// Fails when a deadline of `asset` is already owned by another asset.
    fn ensure_deadlines_unclaimed(&self, asset: &Asset) -> RepoResult<()> {
        for deadline in &asset.deadlines {
            let claimed = self
                .assets
                .iter()
                .filter(|owner| owner.id != asset.id)
                .any(|owner| owner.deadline(deadline.id).is_some());
            if claimed {
                return Err(ValidationError::DuplicateDeadline(deadline.id).into());
            }
        }
        Ok(())
    }

    fn next_id(&mut self, year: i32) -> RepoResult<AssetId> {
        loop {
            let slot = self.sequences.entry(year).or_insert(0);
            *slot += 1;
            let id = AssetId::from_parts(year, *slot)?;
            if !self.index.contains_key(&id) {
                return Ok(id);
            }
        }
    }
}

/// `RwLock`-guarded asset store.
#[derive(Debug, Default)]
pub struct InMemoryAssetRepository {
    state: RwLock<MemoryState>,
}

impl InMemoryAssetRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a store pre-loaded with `assets`, keeping their order.
    pub fn with_assets(assets: impl IntoIterator<Item = Asset>) -> RepoResult<Self> {
        let repo = Self::new();
        for asset in assets {
            repo.insert_asset(asset)?;
        }
        Ok(repo)
    }

    /// Loads `assets` in order, skipping each one the store refuses.
    ///
    /// Returns the store and one error per skipped asset.
    pub fn import(assets: impl IntoIterator<Item = Asset>) -> (Self, Vec<RepoError>) {
        let repo = Self::new();
        let rejected = assets
            .into_iter()
            .filter_map(|asset| repo.insert_asset(asset).err())
            .collect();
        (repo, rejected)
    }

    fn read(&self) -> RepoResult<RwLockReadGuard<'_, MemoryState>> {
        self.state.read().map_err(|_| RepoError::LockPoisoned)
    }

    fn write(&self) -> RepoResult<RwLockWriteGuard<'_, MemoryState>> {
        self.state.write().map_err(|_| RepoError::LockPoisoned)
    }
}

impl AssetRepository for InMemoryAssetRepository {
    fn create_asset(&self, new_asset: NewAsset, year: i32) -> RepoResult<Asset> {
        let mut state = self.write()?;
        let previous_sequence = state.sequences.get(&year).copied();
        let id = state.next_id(year)?;
        let asset = match Asset::from_new(id, new_asset) {
            Ok(asset) => asset,
            Err(err) => {
                // Failed commits must not burn a sequence number.
                match previous_sequence {
                    Some(sequence) => state.sequences.insert(year, sequence),
                    None => state.sequences.remove(&year),
                };
                return Err(err.into());
            }
        };
        state.push(asset.clone());
        Ok(asset)
    }

    fn insert_asset(&self, asset: Asset) -> RepoResult<()> {
        asset.validate()?;
        let mut state = self.write()?;
        if state.index.contains_key(&asset.id) {
            return Err(RepoError::AlreadyExists(asset.id));
        }
        state.ensure_deadlines_unclaimed(&asset)?;
        state.push(asset);
        Ok(())
    }

    fn get_asset(&self, id: &AssetId) -> RepoResult<Option<Asset>> {
        let state = self.read()?;
        Ok(state
            .index
            .get(id)
            .map(|position| state.assets[*position].clone()))
    }

    fn list_assets(&self, query: &AssetListQuery) -> RepoResult<Vec<Asset>> {
        let state = self.read()?;
        Ok(state
            .assets
            .iter()
            .filter(|asset| query.matches(asset))
            .cloned()
            .collect())
    }

    fn update_with(
        &self,
        id: &AssetId,
        edit: &mut dyn FnMut(&mut Asset) -> RepoResult<()>,
    ) -> RepoResult<Asset> {
        let mut state = self.write()?;
        let position = *state
            .index
            .get(id)
            .ok_or_else(|| RepoError::NotFound(NotFoundError::Asset(id.clone())))?;

        let mut next = state.assets[position].clone();
        edit(&mut next)?;
        next.validate_update_of(&state.assets[position])?;
        state.ensure_deadlines_unclaimed(&next)?;
        state.assets[position] = next.clone();
        Ok(next)
    }
}
