//! # Transform System
//!
//! Resolves local and world matrices for every [`Transform`].
//!
//! ```text
//! Pass 1: dirty locals      local = T * R(yxz) * S
//! Pass 2: depth sort        depth(root) = 0, depth(child) = depth(parent) + 1
//! Pass 3: worlds by depth   world = parent.world * local
//! ```
//!
//! Worlds are resolved in depth order rather than dense-array order, so a
//! parent stored after its child is still resolved first.

use tracing::{debug, warn};
use vireo_core::{CpuSystem, EntityId, EntityManager, System, SystemStage};

use crate::components::Transform;

const UNVISITED: u32 = u32::MAX;
const VISITING: u32 = u32::MAX - 1;

/// Parent-first world matrix resolution.
#[derive(Debug, Default)]
pub struct TransformSystem {
    parent_slot: Vec<Option<usize>>,
    depth: Vec<u32>,
    changed: Vec<bool>,
    order: Vec<usize>,
    path: Vec<usize>,
    /// Parent each entity's world was last resolved against, by entity index.
    resolved_parent: Vec<EntityId>,
}

impl TransformSystem {
    /// Creates a system with empty scratch buffers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs all passes and returns how many world matrices were rewritten.
    pub fn resolve(&mut self, manager: &mut EntityManager) -> usize {
        let Some(transforms) = manager.component_array_mut::<Transform>() else {
            return 0;
        };
        let count = transforms.count();

        self.parent_slot.clear();
        self.changed.clear();
        for transform in transforms.data_mut() {
            let dirty = transform.is_dirty();
            if dirty {
                transform.refresh_local();
            }
            self.changed.push(dirty);
        }

        for (entity, transform) in transforms.iter() {
            let parent = transform.parent;
            let slot = if parent.is_valid() {
                let slot = transforms.dense_index_of(parent);
                if slot.is_none() {
                    debug!(entity = %entity, parent = %parent, "parent has no transform, treated as root");
                }
                slot
            } else {
                None
            };
            self.parent_slot.push(slot);
        }

        self.compute_depths(transforms.index());
        self.track_parent_changes(transforms.index());

        self.order.clear();
        self.order.extend(0..count);
        let depth = &self.depth;
        self.order.sort_by_key(|&slot| depth[slot]);

        let data = transforms.data_mut();
        let mut rewritten = 0;
        for &slot in &self.order {
            let parent = self.parent_slot[slot];
            if let Some(parent) = parent {
                self.changed[slot] |= self.changed[parent];
            }
            if !self.changed[slot] {
                continue;
            }
            let world = match parent {
                Some(parent) => data[parent].world_matrix() * data[slot].local_matrix(),
                None => data[slot].local_matrix(),
            };
            data[slot].set_world(world);
            rewritten += 1;
        }
        for transform in data.iter_mut() {
            transform.mark_clean();
        }
        rewritten
    }

    /// Marks slots whose effective parent differs from the one their world
    /// was last resolved against, such as a parent that was destroyed.
    fn track_parent_changes(&mut self, entities: &[EntityId]) {
        for (slot, &entity) in entities.iter().enumerate() {
            let parent = self.parent_slot[slot].map_or(EntityId::INVALID, |parent| entities[parent]);
            let cell = entity.index();
            if cell >= self.resolved_parent.len() {
                self.resolved_parent.resize(cell + 1, EntityId::INVALID);
            }
            if self.resolved_parent[cell] != parent {
                self.resolved_parent[cell] = parent;
                self.changed[slot] = true;
            }
        }
    }

    /// Fills `depth` for every slot, breaking parent cycles.
    fn compute_depths(&mut self, entities: &[EntityId]) {
        let count = self.parent_slot.len();
        self.depth.clear();
        self.depth.resize(count, UNVISITED);

        for start in 0..count {
            if self.depth[start] != UNVISITED {
                continue;
            }

            self.path.clear();
            let mut current = start;
            let mut next_depth = loop {
                match self.depth[current] {
                    VISITING => {
                        // `current` is on the path; the last entity pushed closes the cycle.
                        let Some(closer) = self.path.pop() else {
                            break 0;
                        };
                        warn!(entity = %entities[closer], "transform parent cycle, treated as root");
                        self.parent_slot[closer] = None;
                        self.depth[closer] = 0;
                        break 1;
                    }
                    UNVISITED => {
                        self.depth[current] = VISITING;
                        self.path.push(current);
                        match self.parent_slot[current] {
                            Some(parent) => current = parent,
                            None => {
                                self.path.pop();
                                self.depth[current] = 0;
                                break 1;
                            }
                        }
                    }
                    known => break known + 1,
                }
            };

            while let Some(slot) = self.path.pop() {
                self.depth[slot] = next_depth;
                next_depth += 1;
            }
        }
    }
}

impl System for TransformSystem {
    fn name(&self) -> &'static str {
        "TransformSystem"
    }

    fn stage(&self) -> SystemStage {
        SystemStage::Transform
    }
}

impl CpuSystem for TransformSystem {
    fn on_update(&mut self, manager: &mut EntityManager, _delta_time: f32) {
        self.resolve(manager);
    }
}
