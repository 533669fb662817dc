//! Typed, append-only data models built from the event stream.
//!
//! Every domain model follows the same two-phase lifecycle:
//!
//! 1. **Building** - a handler appends rows to growable buffers
//!    ([`EntityBuffer`], plain `Vec`s) in event arrival order.
//! 2. **Finalized** - the buffers are materialized once into read-only
//!    [`Table`]s / [`EntityTable`]s with their lookup indexes.
//!
//! [`ModelSlot`] owns that transition; it is one-way and queries can only
//! reach a model after it happened.
//!
//! Entities are never keyed by handle alone: handles are process-local and
//! get reused once the original object is destroyed, so rows are keyed by
//! [`EntityKey`] `(handle, created_at)` and looked up "as of" a timestamp.

pub mod cpu_time;
pub mod memory_usage;
pub mod profile;
pub mod ros2;

use crate::parser::Handle;
use serde::Serialize;
use std::collections::HashMap;

pub use cpu_time::{CpuTimeBuilder, CpuTimeDataModel, SchedSwitch};
pub use memory_usage::{MemorySample, MemoryUsageBuilder, MemoryUsageDataModel};
pub use profile::{ProfileBuilder, ProfileDataModel, ProfileRecord, ProfileRecordKind};
pub use ros2::{Ros2Builder, Ros2DataModel};

/// Identity of one entity version: the handle plus its creation timestamp
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct EntityKey {
    pub handle: Handle,
    pub created_at: u64,
}

impl EntityKey {
    pub fn new(handle: Handle, created_at: u64) -> Self {
        Self { handle, created_at }
    }
}

/// A row that represents an entity with a creation time
pub trait Entity {
    fn key(&self) -> EntityKey;

    /// Record the end of life of this entity version
    ///
    /// Entities without a destroy event keep the default no-op.
    fn mark_destroyed(&mut self, _at: u64) {}
}

/// Kinds of entities a reference can point to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Context,
    Node,
    Publisher,
    RmwPublisher,
    Subscription,
    RmwSubscription,
    SubscriptionObject,
    Service,
    Client,
    Timer,
    Callback,
    StateMachine,
    /// Anything an executor can run (subscription, timer, service, client)
    Executable,
}

/// Reference to another entity, resolved as of a timestamp
///
/// `resolved` is `None` when no entity with that handle existed at `at`;
/// the edge is kept so the dangling reference can be inspected later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EntityRef {
    pub handle: Handle,
    pub at: u64,
    pub resolved: Option<EntityKey>,
}

impl EntityRef {
    pub fn is_resolved(&self) -> bool {
        self.resolved.is_some()
    }

    /// The anomaly to report when this reference is dangling
    pub fn anomaly(&self, kind: EntityKind) -> Option<Anomaly> {
        match self.resolved {
            Some(_) => None,
            None => Some(Anomaly::UnresolvedReference {
                kind,
                handle: self.handle,
                at: self.at,
            }),
        }
    }
}

/// Unmatched start/end (or entry/exit) pairing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PairingAnomaly {
    /// An end event arrived with no open instance
    UnmatchedEnd,
    /// A second start arrived before the previous instance ended
    RestartedBeforeEnd,
}

/// Non-fatal data-quality flag recorded on a row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum Anomaly {
    UnresolvedReference {
        kind: EntityKind,
        handle: Handle,
        at: u64,
    },
    Pairing {
        kind: PairingAnomaly,
        handle: Handle,
        at: u64,
    },
}

/// Finalized, read-only table of rows in arrival order
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Table<R> {
    rows: Box<[R]>,
}

impl<R> Table<R> {
    pub fn rows(&self) -> &[R] {
        &self.rows
    }

    pub fn iter(&self) -> std::slice::Iter<'_, R> {
        self.rows.iter()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&R> {
        self.rows.get(index)
    }
}

impl<R> Default for Table<R> {
    fn default() -> Self {
        Self {
            rows: Vec::new().into_boxed_slice(),
        }
    }
}

impl<R> From<Vec<R>> for Table<R> {
    fn from(rows: Vec<R>) -> Self {
        Self {
            rows: rows.into_boxed_slice(),
        }
    }
}

impl<'a, R> IntoIterator for &'a Table<R> {
    type Item = &'a R;
    type IntoIter = std::slice::Iter<'a, R>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}

/// Row buffer for one entity kind during processing
///
/// Keeps a per-handle list of `(created_at, row)` sorted by creation time
/// so references can be resolved while the stream is still being read.
#[derive(Debug)]
pub struct EntityBuffer<R> {
    rows: Vec<R>,
    versions: HashMap<Handle, Vec<(u64, usize)>>,
    duplicates: usize,
}

impl<R> Default for EntityBuffer<R> {
    fn default() -> Self {
        Self {
            rows: Vec::new(),
            versions: HashMap::new(),
            duplicates: 0,
        }
    }
}

impl<R: Entity> EntityBuffer<R> {
    /// Append a row; returns `false` if its key already exists
    ///
    /// The first row with a given `(handle, created_at)` wins, later ones
    /// are counted in [`duplicates`](Self::duplicates) and dropped.
    pub fn insert(&mut self, row: R) -> bool {
        let key = row.key();
        let versions = self.versions.entry(key.handle).or_default();
        let pos = versions.partition_point(|(ts, _)| *ts < key.created_at);
        if versions.get(pos).is_some_and(|(ts, _)| *ts == key.created_at) {
            self.duplicates += 1;
            return false;
        }
        versions.insert(pos, (key.created_at, self.rows.len()));
        self.rows.push(row);
        true
    }

    fn resolve_index(&self, handle: Handle, at: u64) -> Option<usize> {
        let versions = self.versions.get(&handle)?;
        let pos = versions.partition_point(|(ts, _)| *ts <= at);
        pos.checked_sub(1).map(|i| versions[i].1)
    }

    /// The version of `handle` with the latest creation time `<= at`
    pub fn resolve(&self, handle: Handle, at: u64) -> Option<&R> {
        self.resolve_index(handle, at).map(|i| &self.rows[i])
    }

    pub fn resolve_mut(&mut self, handle: Handle, at: u64) -> Option<&mut R> {
        self.resolve_index(handle, at).map(move |i| &mut self.rows[i])
    }

    /// Build a reference to `handle` as of `at`
    pub fn reference(&self, handle: Handle, at: u64) -> EntityRef {
        EntityRef {
            handle,
            at,
            resolved: self.resolve(handle, at).map(Entity::key),
        }
    }

    /// Set the end-of-life field of the version alive at `at`
    ///
    /// Returns `false` when no such version exists.
    pub fn mark_destroyed(&mut self, handle: Handle, at: u64) -> bool {
        match self.resolve_mut(handle, at) {
            Some(row) => {
                row.mark_destroyed(at);
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn duplicates(&self) -> usize {
        self.duplicates
    }

    /// Materialize into the final table and its sorted as-of index
    pub fn finish(self) -> EntityTable<R> {
        let mut index: Vec<(Handle, u64, usize)> = self
            .versions
            .into_iter()
            .flat_map(|(handle, versions)| {
                versions
                    .into_iter()
                    .map(move |(created_at, row)| (handle, created_at, row))
            })
            .collect();
        index.sort_unstable();

        EntityTable {
            rows: self.rows.into_boxed_slice(),
            index: index.into_boxed_slice(),
        }
    }
}

/// Finalized entity table with an as-of index sorted by handle then time
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityTable<R> {
    rows: Box<[R]>,
    #[serde(skip)]
    index: Box<[(Handle, u64, usize)]>,
}

impl<R> Default for EntityTable<R> {
    fn default() -> Self {
        Self {
            rows: Vec::new().into_boxed_slice(),
            index: Vec::new().into_boxed_slice(),
        }
    }
}

impl<R> EntityTable<R> {
    /// Rows in arrival order
    pub fn rows(&self) -> &[R] {
        &self.rows
    }

    pub fn iter(&self) -> std::slice::Iter<'_, R> {
        self.rows.iter()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// As-of lookup in O(log n)
    ///
    /// Selects the row with matching handle and the greatest creation
    /// timestamp not exceeding `at`.
    pub fn resolve(&self, handle: Handle, at: u64) -> Option<&R> {
        let pos = self
            .index
            .partition_point(|&(h, ts, _)| (h, ts) <= (handle, at));
        let (h, _, row) = *self.index.get(pos.checked_sub(1)?)?;
        (h == handle).then(|| &self.rows[row])
    }

    /// Exact lookup by key
    pub fn get(&self, key: EntityKey) -> Option<&R> {
        self.index
            .binary_search_by(|&(h, ts, _)| (h, ts).cmp(&(key.handle, key.created_at)))
            .ok()
            .map(|i| &self.rows[self.index[i].2])
    }

    /// Most recent version of a handle
    pub fn latest(&self, handle: Handle) -> Option<&R> {
        self.resolve(handle, u64::MAX)
    }

    /// All versions of a handle, oldest first
    pub fn versions(&self, handle: Handle) -> impl Iterator<Item = &R> + '_ {
        let start = self.index.partition_point(|&(h, _, _)| h < handle);
        self.index[start..]
            .iter()
            .take_while(move |&&(h, _, _)| h == handle)
            .map(move |&(_, _, row)| &self.rows[row])
    }
}

/// Converts buffered rows into a finalized model
pub trait ModelBuilder: Default {
    type Model;

    fn build(self) -> Self::Model;
}

enum SlotState<B: ModelBuilder> {
    Building(B),
    Finalized(B::Model),
    /// Only observable if `build` panicked mid-transition
    Poisoned,
}

/// Owner of one data model across its building -> finalized transition
pub struct ModelSlot<B: ModelBuilder> {
    state: SlotState<B>,
}

impl<B: ModelBuilder> std::fmt::Debug for ModelSlot<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelSlot")
            .field("finalized", &self.is_finalized())
            .finish()
    }
}

impl<B: ModelBuilder> Default for ModelSlot<B> {
    fn default() -> Self {
        Self {
            state: SlotState::Building(B::default()),
        }
    }
}

impl<B: ModelBuilder> ModelSlot<B> {
    /// Mutable access to the buffers, only while building
    pub fn builder_mut(&mut self) -> Option<&mut B> {
        match &mut self.state {
            SlotState::Building(builder) => Some(builder),
            _ => None,
        }
    }

    /// Read access to the buffers, only while building
    pub fn builder(&self) -> Option<&B> {
        match &self.state {
            SlotState::Building(builder) => Some(builder),
            _ => None,
        }
    }

    /// One-way transition to the finalized model; a no-op when repeated
    pub fn finalize(&mut self) {
        if !matches!(self.state, SlotState::Building(_)) {
            return;
        }
        if let SlotState::Building(builder) =
            std::mem::replace(&mut self.state, SlotState::Poisoned)
        {
            self.state = SlotState::Finalized(builder.build());
        }
    }

    /// Drop everything buffered so far and start over
    pub fn discard(&mut self) {
        self.state = SlotState::Building(B::default());
    }

    /// The finalized model, if finalization happened
    pub fn model(&self) -> Option<&B::Model> {
        match &self.state {
            SlotState::Finalized(model) => Some(model),
            _ => None,
        }
    }

    pub fn into_model(self) -> Option<B::Model> {
        match self.state {
            SlotState::Finalized(model) => Some(model),
            _ => None,
        }
    }

    pub fn is_finalized(&self) -> bool {
        matches!(self.state, SlotState::Finalized(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Thing {
        handle: Handle,
        timestamp: u64,
        destroyed_at: Option<u64>,
    }

    impl Thing {
        fn new(handle: Handle, timestamp: u64) -> Self {
            Self {
                handle,
                timestamp,
                destroyed_at: None,
            }
        }
    }

    impl Entity for Thing {
        fn key(&self) -> EntityKey {
            EntityKey::new(self.handle, self.timestamp)
        }

        fn mark_destroyed(&mut self, at: u64) {
            self.destroyed_at = Some(at);
        }
    }

    #[test]
    fn test_as_of_resolution_with_reused_handle() {
        let mut buffer = EntityBuffer::default();
        buffer.insert(Thing::new(0xa, 10));
        buffer.insert(Thing::new(0xb, 15));
        buffer.insert(Thing::new(0xa, 20));

        assert!(buffer.resolve(0xa, 5).is_none());
        assert_eq!(buffer.resolve(0xa, 10).unwrap().timestamp, 10);
        assert_eq!(buffer.resolve(0xa, 19).unwrap().timestamp, 10);
        assert_eq!(buffer.resolve(0xa, 25).unwrap().timestamp, 20);

        let table = buffer.finish();
        assert!(table.resolve(0xa, 5).is_none());
        assert_eq!(table.resolve(0xa, 19).unwrap().timestamp, 10);
        assert_eq!(table.resolve(0xa, 20).unwrap().timestamp, 20);
        assert_eq!(table.resolve(0xb, 100).unwrap().timestamp, 15);
        assert!(table.resolve(0xc, 100).is_none());
        assert_eq!(table.versions(0xa).count(), 2);
        assert_eq!(table.get(EntityKey::new(0xa, 20)).unwrap().timestamp, 20);
        assert!(table.get(EntityKey::new(0xa, 21)).is_none());
    }

    #[test]
    fn test_duplicate_key_rejected() {
        let mut buffer = EntityBuffer::default();
        assert!(buffer.insert(Thing::new(1, 10)));
        assert!(!buffer.insert(Thing::new(1, 10)));
        assert_eq!(buffer.len(), 1);
        assert_eq!(buffer.duplicates(), 1);
    }

    #[test]
    fn test_rows_keep_arrival_order() {
        let mut buffer = EntityBuffer::default();
        buffer.insert(Thing::new(3, 30));
        buffer.insert(Thing::new(1, 10));
        buffer.insert(Thing::new(2, 20));

        let table = buffer.finish();
        let handles: Vec<Handle> = table.iter().map(|t| t.handle).collect();
        assert_eq!(handles, vec![3, 1, 2]);
    }

    #[test]
    fn test_destroy_marks_without_removing() {
        let mut buffer = EntityBuffer::default();
        buffer.insert(Thing::new(1, 10));
        assert!(buffer.mark_destroyed(1, 50));
        assert!(!buffer.mark_destroyed(2, 50));

        let table = buffer.finish();
        assert_eq!(table.len(), 1);
        assert_eq!(table.latest(1).unwrap().destroyed_at, Some(50));
    }

    #[test]
    fn test_dangling_reference() {
        let buffer: EntityBuffer<Thing> = EntityBuffer::default();
        let reference = buffer.reference(7, 100);
        assert!(!reference.is_resolved());
        assert_eq!(
            reference.anomaly(EntityKind::Node),
            Some(Anomaly::UnresolvedReference {
                kind: EntityKind::Node,
                handle: 7,
                at: 100
            })
        );
    }

    #[derive(Default)]
    struct CountBuilder(Vec<u32>);

    impl ModelBuilder for CountBuilder {
        type Model = Table<u32>;

        fn build(self) -> Table<u32> {
            self.0.into()
        }
    }

    #[test]
    fn test_model_slot_is_one_way() {
        let mut slot: ModelSlot<CountBuilder> = ModelSlot::default();
        slot.builder_mut().unwrap().0.push(1);
        assert!(slot.model().is_none());

        slot.finalize();
        assert!(slot.is_finalized());
        assert!(slot.builder_mut().is_none());
        assert_eq!(slot.model().unwrap().rows(), &[1]);

        slot.finalize();
        assert_eq!(slot.model().unwrap().len(), 1);
    }

    #[test]
    fn test_model_slot_discard() {
        let mut slot: ModelSlot<CountBuilder> = ModelSlot::default();
        slot.builder_mut().unwrap().0.push(1);
        slot.discard();
        slot.finalize();
        assert!(slot.model().unwrap().is_empty());
    }
}
