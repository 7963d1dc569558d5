//! Per-mesh color overlays and their create/replace/remove lifecycle.
//!
//! An [`Overlay`] never touches the mesh it belongs to; the host renders it as a separate
//! artifact and drops it on [`OverlayUpdate::Removed`], which restores the original look.
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::analysis::classify::Rgba;
use crate::analysis::ExposureResult;
use crate::geometry::MeshId;

/// Vertex colors for one mesh, indexed 1:1 with its vertex buffer.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Overlay {
    pub owner: MeshId,
    pub colors: Vec<Rgba>,
    /// Orchestrator generation that produced the overlay; 0 outside an orchestrator.
    pub generation: u64,
}

impl Overlay {
    pub fn new(owner: impl Into<MeshId>, colors: Vec<Rgba>) -> Self {
        Self {
            owner: owner.into(),
            colors,
            generation: 0,
        }
    }

    pub fn with_generation(mut self, generation: u64) -> Self {
        self.generation = generation;
        self
    }

    pub fn vertex_count(&self) -> usize {
        self.colors.len()
    }

    /// Colors quantized to RGBA8, flattened.
    pub fn to_rgba8(&self) -> Vec<u8> {
        self.colors.iter().flat_map(|c| c.to_rgba8()).collect()
    }
}

/// Builds a color buffer of `vertex_count` entries from classified results.
///
/// Vertices without a result (skipped during sampling) are neutral grey. Results whose
/// vertex index is out of range are ignored.
pub fn build_color_buffer(vertex_count: usize, results: &[ExposureResult]) -> Vec<Rgba> {
    let mut colors = vec![Rgba::NEUTRAL_GREY; vertex_count];
    for result in results {
        if let Some(slot) = colors.get_mut(result.sample.vertex_index) {
            *slot = result.classification.color();
        }
    }
    colors
}

/// Whether a mesh currently carries an overlay.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayState {
    Absent,
    Active,
}

/// A change the host must mirror in its scene.
#[derive(Debug, Clone, PartialEq)]
pub enum OverlayUpdate {
    /// Create the overlay, or replace the existing one in a single step.
    Applied(Arc<Overlay>),
    Removed(MeshId),
}

impl OverlayUpdate {
    pub fn mesh_id(&self) -> &str {
        match self {
            OverlayUpdate::Applied(overlay) => &overlay.owner,
            OverlayUpdate::Removed(id) => id,
        }
    }
}

/// Current overlays keyed by mesh id, plus the pending update log.
///
/// The log keeps only the latest update per mesh id, so it never holds more entries than
/// there are meshes. Hosts must still call [`OverlayStore::drain_updates`] to release the
/// overlays it references.
#[derive(Debug, Default)]
pub struct OverlayStore {
    overlays: HashMap<MeshId, Arc<Overlay>>,
    updates: Vec<OverlayUpdate>,
}

impl OverlayStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates or atomically replaces the overlay of `overlay.owner`.
    pub fn apply(&mut self, overlay: Overlay) -> Arc<Overlay> {
        let overlay = Arc::new(overlay);
        self.overlays
            .insert(overlay.owner.clone(), Arc::clone(&overlay));
        self.record(OverlayUpdate::Applied(Arc::clone(&overlay)));
        overlay
    }

    /// Removes the overlay of `mesh_id`. Removing an absent overlay is a no-op.
    pub fn remove(&mut self, mesh_id: &str) -> Option<Arc<Overlay>> {
        let removed = self.overlays.remove(mesh_id)?;
        self.record(OverlayUpdate::Removed(removed.owner.clone()));
        Some(removed)
    }

    /// Replaces any pending update for the same mesh.
    fn record(&mut self, update: OverlayUpdate) {
        self.updates.retain(|u| u.mesh_id() != update.mesh_id());
        self.updates.push(update);
    }

    /// Removes every overlay. Returns how many were removed.
    pub fn clear(&mut self) -> usize {
        let mut ids: Vec<MeshId> = self.overlays.keys().cloned().collect();
        ids.sort();
        for id in &ids {
            self.remove(id);
        }
        ids.len()
    }

    /// Removes overlays whose mesh is not in `keep`.
    pub fn retain_meshes<'a>(&mut self, keep: impl IntoIterator<Item = &'a str>) -> usize {
        let keep: HashSet<&str> = keep.into_iter().collect();
        let mut stale: Vec<MeshId> = self
            .overlays
            .keys()
            .filter(|id| !keep.contains(id.as_str()))
            .cloned()
            .collect();
        stale.sort();
        for id in &stale {
            self.remove(id);
        }
        stale.len()
    }

    pub fn get(&self, mesh_id: &str) -> Option<&Arc<Overlay>> {
        self.overlays.get(mesh_id)
    }

    pub fn state(&self, mesh_id: &str) -> OverlayState {
        if self.overlays.contains_key(mesh_id) {
            OverlayState::Active
        } else {
            OverlayState::Absent
        }
    }

    pub fn len(&self) -> usize {
        self.overlays.len()
    }

    pub fn is_empty(&self) -> bool {
        self.overlays.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Overlay>> {
        self.overlays.values()
    }

    /// Takes the latest update per mesh recorded since the last call, oldest first.
    pub fn drain_updates(&mut self) -> Vec<OverlayUpdate> {
        std::mem::take(&mut self.updates)
    }
}
