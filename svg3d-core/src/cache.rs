//! Mesh cache shared by render calls

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use crate::error::LoadError;
use crate::geometry::Mesh;
use crate::loaders::{DefaultFetcher, MeshSource, SourceFetcher};

/// Loaded meshes keyed by source, plus the fetcher used to load missing ones.
///
/// The cache is owned by the host and lives as long as it does. Only fully
/// decoded meshes are stored; failed loads are not remembered, so a later
/// render retries them. Two threads missing the same key at once may both
/// fetch it, and the first insert wins.
pub struct MeshCache {
    meshes: RwLock<HashMap<MeshSource, Arc<Mesh>>>,
    fetcher: Box<dyn SourceFetcher>,
}

impl MeshCache {
    /// Cache backed by [`DefaultFetcher`]
    pub fn new() -> Self {
        Self::with_fetcher(DefaultFetcher::new())
    }

    pub fn with_fetcher(fetcher: impl SourceFetcher + 'static) -> Self {
        Self {
            meshes: RwLock::new(HashMap::new()),
            fetcher: Box::new(fetcher),
        }
    }

    pub fn get(&self, source: &MeshSource) -> Option<Arc<Mesh>> {
        let meshes = self.meshes.read().unwrap_or_else(PoisonError::into_inner);
        meshes.get(source).map(Arc::clone)
    }

    /// Return the cached mesh, or fetch, decode and cache it
    pub fn load(&self, source: &MeshSource) -> Result<Arc<Mesh>, LoadError> {
        if let Some(mesh) = self.get(source) {
            tracing::trace!(%source, "mesh cache hit");
            return Ok(mesh);
        }

        let mesh = source.load(self.fetcher.as_ref())?;
        tracing::debug!(%source, triangles = mesh.triangles.len(), "loaded mesh");
        Ok(self.insert(source.clone(), mesh))
    }

    /// Store a mesh under `source` unless one is already present
    pub fn insert(&self, source: MeshSource, mesh: Mesh) -> Arc<Mesh> {
        let mut meshes = self.meshes.write().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(meshes.entry(source).or_insert_with(|| Arc::new(mesh)))
    }

    pub fn len(&self) -> usize {
        self.meshes.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.meshes
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl Default for MeshCache {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for MeshCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MeshCache")
            .field("meshes", &self.len())
            .finish_non_exhaustive()
    }
}
