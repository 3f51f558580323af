//! The repository: named storage plus change propagation.
//!
//! # Invariants
//!
//! - Handles are case-insensitive everywhere. The spelling used at first
//!   store is the one listings and dumps report until the object is deleted
//!   outright.
//! - The dependency graph always mirrors the stored snapshots: an object's
//!   graph precedents are exactly its snapshot's precedent handles.
//! - Nothing is mutated before validation. A store that fails leaves the
//!   repository exactly as it was.
//! - Rebuild failures during propagation are logged, never escalated. The
//!   triggering store still succeeds.

use std::collections::hash_map::Entry;
use std::collections::{BTreeSet, HashMap};
use std::fmt::{self, Write as _};
use std::sync::RwLock;

use depot_graph::{DependencyGraph, GraphError, NodeState};
use depot_types::{Handle, PropertyValue, Timestamp};
use depot_values::{ValueObject, PROP_CLASS_NAME, PROP_OBJECT_ID, PROP_PERMANENT};
use regex::{Regex, RegexBuilder};
use tracing::{debug, warn};

use crate::entry::RepositoryEntry;
use crate::error::{StoreError, StoreResult};
use crate::object::{FromObject, ObjectRef};

/// Nesting allowed while expanding groups inside groups.
pub const MAX_EXPANSION_DEPTH: usize = 10;

#[derive(Default)]
struct RepoState {
    entries: HashMap<Handle, RepositoryEntry>,
    graph: DependencyGraph,
}

/// Read-only view of the repository handed to [`ManagedObject::rebuild`].
///
/// A rebuilding object uses this to fetch the current incarnation of each
/// of its precedents without taking the repository lock again.
pub struct Precedents<'a> {
    state: &'a RepoState,
}

impl<'a> Precedents<'a> {
    fn new(state: &'a RepoState) -> Self {
        Self { state }
    }

    /// Fetch a precedent object, untyped.
    pub fn get(&self, id: &Handle) -> StoreResult<ObjectRef> {
        self.state
            .entries
            .get(id)
            .map(|entry| entry.object().clone())
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    /// Fetch a precedent through a typed view.
    pub fn get_as<T: FromObject>(&self, id: &Handle) -> StoreResult<T> {
        let object = self.get(id)?;
        T::from_object(&object)
    }

    pub fn contains(&self, id: &Handle) -> bool {
        self.state.entries.contains_key(id)
    }
}

/// Thread-safe object repository keyed by case-insensitive handles.
pub struct Repository {
    inner: RwLock<RepoState>,
}

impl Repository {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(RepoState::default()),
        }
    }

    // ---------------------------------------------------------------
    // Storing
    // ---------------------------------------------------------------

    /// Store a fresh object under `object_id`, refusing to overwrite.
    ///
    /// The snapshot is taken from the object itself. Returns the handle the
    /// object is stored under, which keeps the spelling of the first store.
    pub fn store(&self, object_id: impl Into<Handle>, object: ObjectRef) -> StoreResult<Handle> {
        self.store_with(object_id, object, false, None)
    }

    /// Store an object with full control over overwriting and the snapshot.
    ///
    /// When `value_object` is `None` the object's own snapshot is used.
    /// Overwriting rewires the dependency edges to the new snapshot's
    /// precedents and then notifies every transitive dependent, depth
    /// first, each exactly once. A fresh store notifies too: dependents
    /// recorded before this object existed are rebuilt now that it does.
    pub fn store_with(
        &self,
        object_id: impl Into<Handle>,
        object: ObjectRef,
        overwrite: bool,
        value_object: Option<ValueObject>,
    ) -> StoreResult<Handle> {
        let id: Handle = object_id.into();
        let value_object = value_object.unwrap_or_else(|| object.value_object().clone());
        if value_object.precedent_ids().contains(&id) {
            return Err(StoreError::Graph(GraphError::SelfObservation(id)));
        }
        let precedents = value_object.precedent_ids().clone();
        let class = value_object.class_name().to_string();

        let mut state = self.inner.write().expect("lock poisoned");
        let stored_id = match state.entries.entry(id.clone()) {
            Entry::Occupied(mut slot) => {
                if !overwrite {
                    return Err(StoreError::DuplicateHandle(id.to_string()));
                }
                slot.get_mut().replace(object, value_object);
                slot.key().clone()
            }
            Entry::Vacant(slot) => {
                let stored_id = slot.key().clone();
                slot.insert(RepositoryEntry::new(object, value_object));
                stored_id
            }
        };
        state.graph.wire(&stored_id, &precedents)?;
        debug!(object = %stored_id, class = %class, overwrite, "stored object");

        Self::propagate_from(&mut state, &stored_id);
        Ok(stored_id)
    }

    /// Rebuild everything downstream of `start`, each dependent once.
    fn propagate_from(state: &mut RepoState, start: &Handle) {
        for id in state.graph.propagation_order(start) {
            if !state.entries.contains_key(&id) {
                // Placeholder dependents have nothing to rebuild.
                continue;
            }
            state.graph.set_state(&id, NodeState::Notifying);
            let outcome = Self::rebuild_entry(state, &id);
            state.graph.set_state(&id, NodeState::Wired);
            if let Err(e) = outcome {
                warn!(object = %id, error = %e, "dependent rebuild failed, continuing");
            }
        }
    }

    fn rebuild_entry(state: &mut RepoState, id: &Handle) -> StoreResult<()> {
        let (object, value_object) = {
            let entry = state
                .entries
                .get(id)
                .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
            (entry.object().clone(), entry.value_object().clone())
        };
        let rebuilt = {
            let view = Precedents::new(state);
            object.rebuild(&value_object, &view)?
        };
        let entry = state
            .entries
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        entry.replace_object(rebuilt);
        Ok(())
    }

    // ---------------------------------------------------------------
    // Retrieval
    // ---------------------------------------------------------------

    /// Fetch an object by handle.
    pub fn retrieve(&self, id: impl Into<Handle>) -> StoreResult<ObjectRef> {
        let id = id.into();
        let state = self.inner.read().expect("lock poisoned");
        state
            .entries
            .get(&id)
            .map(|entry| entry.object().clone())
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    /// Fetch an object through a typed view.
    ///
    /// Succeeds for any stored object exposing the capability `T` is built
    /// from, whatever class the object reports.
    pub fn retrieve_as<T: FromObject>(&self, id: impl Into<Handle>) -> StoreResult<T> {
        let object = self.retrieve(id)?;
        T::from_object(&object)
    }

    /// The stored snapshot for one object.
    pub fn value_object(&self, id: impl Into<Handle>) -> StoreResult<ValueObject> {
        let id = id.into();
        let state = self.inner.read().expect("lock poisoned");
        state
            .entries
            .get(&id)
            .map(|entry| entry.value_object().clone())
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    // ---------------------------------------------------------------
    // Deletion
    // ---------------------------------------------------------------

    /// Remove one object. Returns whether anything was removed.
    ///
    /// The graph node survives as a detached placeholder while other
    /// objects still observe the deleted one, so re-storing the handle
    /// later renotifies them.
    pub fn delete(&self, id: impl Into<Handle>) -> bool {
        let id = id.into();
        let mut state = self.inner.write().expect("lock poisoned");
        Self::remove_entry(&mut state, &id)
    }

    /// Remove several objects. Returns how many were actually removed.
    pub fn delete_many<I, H>(&self, ids: I) -> usize
    where
        I: IntoIterator<Item = H>,
        H: Into<Handle>,
    {
        let mut state = self.inner.write().expect("lock poisoned");
        ids.into_iter()
            .map(Into::into)
            .filter(|id| Self::remove_entry(&mut state, id))
            .count()
    }

    /// Remove every object, or every non-permanent object.
    ///
    /// With `delete_permanent` false, objects flagged permanent survive.
    pub fn delete_all(&self, delete_permanent: bool) -> usize {
        let mut state = self.inner.write().expect("lock poisoned");
        let removed = if delete_permanent {
            let count = state.entries.len();
            state.entries.clear();
            state.graph.clear();
            count
        } else {
            let doomed: Vec<Handle> = state
                .entries
                .iter()
                .filter(|(_, entry)| !entry.is_permanent())
                .map(|(id, _)| id.clone())
                .collect();
            for id in &doomed {
                Self::remove_entry(&mut state, id);
            }
            doomed.len()
        };
        debug!(removed, delete_permanent, "cleared repository");
        removed
    }

    fn remove_entry(state: &mut RepoState, id: &Handle) -> bool {
        let removed = state.entries.remove(id).is_some();
        if removed {
            state.graph.detach(id);
            debug!(object = %id, "deleted object");
        }
        removed
    }

    // ---------------------------------------------------------------
    // Listing and existence
    // ---------------------------------------------------------------

    pub fn exists(&self, id: impl Into<Handle>) -> bool {
        let id = id.into();
        let state = self.inner.read().expect("lock poisoned");
        state.entries.contains_key(&id)
    }

    pub fn exists_many<I, H>(&self, ids: I) -> Vec<bool>
    where
        I: IntoIterator<Item = H>,
        H: Into<Handle>,
    {
        let state = self.inner.read().expect("lock poisoned");
        ids.into_iter()
            .map(|id| state.entries.contains_key(&id.into()))
            .collect()
    }

    pub fn object_count(&self) -> usize {
        let state = self.inner.read().expect("lock poisoned");
        state.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.object_count() == 0
    }

    /// Every stored handle, in case-insensitive order, as first spelled.
    pub fn ids(&self) -> Vec<String> {
        let state = self.inner.read().expect("lock poisoned");
        let mut ids: Vec<Handle> = state.entries.keys().cloned().collect();
        ids.sort();
        ids.into_iter().map(Handle::into_string).collect()
    }

    /// Handles matching `pattern`, in case-insensitive order.
    ///
    /// An empty pattern is no filter and lists every handle. Any other
    /// pattern must match a whole handle, case-insensitively: `".*"` lists
    /// everything; `"curve"` matches only an object named exactly that.
    pub fn list_ids(&self, pattern: &str) -> StoreResult<Vec<String>> {
        if pattern.is_empty() {
            return Ok(self.ids());
        }
        let regex = compile_pattern(pattern)?;
        let state = self.inner.read().expect("lock poisoned");
        let mut ids: Vec<String> = state
            .entries
            .keys()
            .filter(|id| regex.is_match(id.as_str()))
            .map(|id| id.as_str().to_string())
            .collect();
        ids.sort_by_key(|id| id.to_lowercase());
        Ok(ids)
    }

    // ---------------------------------------------------------------
    // Precedent interrogation
    // ---------------------------------------------------------------

    /// Direct precedents of one object, with groups expanded to leaves.
    ///
    /// This is one hop of the graph: precedents of precedents are not
    /// listed. A precedent that is a group stands for its members, nested
    /// groups expanding up to [`MAX_EXPANSION_DEPTH`] levels. Precedents
    /// that were recorded but never stored are listed as they stand.
    pub fn precedent_ids(&self, id: impl Into<Handle>) -> StoreResult<Vec<String>> {
        let id = id.into();
        let state = self.inner.read().expect("lock poisoned");
        if !state.entries.contains_key(&id) {
            return Err(StoreError::NotFound(id.to_string()));
        }
        let mut leaves = BTreeSet::new();
        for precedent in state.graph.precedents_of(&id) {
            Self::expand_precedent(&state, &precedent, 0, &mut leaves)?;
        }
        Ok(leaves.into_iter().map(Handle::into_string).collect())
    }

    fn expand_precedent(
        state: &RepoState,
        id: &Handle,
        depth: usize,
        leaves: &mut BTreeSet<Handle>,
    ) -> StoreResult<()> {
        if id.is_empty() {
            return Ok(());
        }
        if depth > MAX_EXPANSION_DEPTH {
            return Err(StoreError::RecursionLimitExceeded {
                handle: id.to_string(),
                limit: MAX_EXPANSION_DEPTH,
            });
        }
        match state.entries.get(id) {
            Some(entry) => match entry.object().member_handles() {
                Some(members) => {
                    for member in members {
                        Self::expand_precedent(state, member, depth + 1, leaves)?;
                    }
                }
                None => {
                    leaves.insert(id.clone());
                }
            },
            None => {
                leaves.insert(id.clone());
            }
        }
        Ok(())
    }

    // ---------------------------------------------------------------
    // Attributes
    // ---------------------------------------------------------------

    fn map_entries<I, H, T>(&self, ids: I, f: impl Fn(&RepositoryEntry) -> T) -> StoreResult<Vec<T>>
    where
        I: IntoIterator<Item = H>,
        H: Into<Handle>,
    {
        let state = self.inner.read().expect("lock poisoned");
        ids.into_iter()
            .map(|id| {
                let id = id.into();
                state
                    .entries
                    .get(&id)
                    .map(&f)
                    .ok_or_else(|| StoreError::NotFound(id.to_string()))
            })
            .collect()
    }

    /// Creation stamps for each handle. Fails on the first unknown handle.
    pub fn creation_times<I, H>(&self, ids: I) -> StoreResult<Vec<Timestamp>>
    where
        I: IntoIterator<Item = H>,
        H: Into<Handle>,
    {
        self.map_entries(ids, RepositoryEntry::created_at)
    }

    /// Update stamps for each handle. Fails on the first unknown handle.
    pub fn update_times<I, H>(&self, ids: I) -> StoreResult<Vec<Timestamp>>
    where
        I: IntoIterator<Item = H>,
        H: Into<Handle>,
    {
        self.map_entries(ids, RepositoryEntry::updated_at)
    }

    /// Permanence flags for each handle. Fails on the first unknown handle.
    pub fn permanent_flags<I, H>(&self, ids: I) -> StoreResult<Vec<bool>>
    where
        I: IntoIterator<Item = H>,
        H: Into<Handle>,
    {
        self.map_entries(ids, RepositoryEntry::is_permanent)
    }

    /// Class names for each handle. Fails on the first unknown handle.
    pub fn class_names<I, H>(&self, ids: I) -> StoreResult<Vec<String>>
    where
        I: IntoIterator<Item = H>,
        H: Into<Handle>,
    {
        self.map_entries(ids, |entry| entry.value_object().class_name().to_string())
    }

    /// How many times one object has been overwritten or rebuilt.
    pub fn update_count(&self, id: impl Into<Handle>) -> StoreResult<u64> {
        Ok(self.map_entries([id.into()], RepositoryEntry::update_count)?[0])
    }

    // ---------------------------------------------------------------
    // Properties
    // ---------------------------------------------------------------

    /// Every property name one object answers to.
    pub fn property_names(&self, id: impl Into<Handle>) -> StoreResult<Vec<String>> {
        Ok(self.value_object(id)?.property_names())
    }

    /// Look up one property on one object.
    pub fn property_value(
        &self,
        id: impl Into<Handle>,
        name: &str,
    ) -> StoreResult<PropertyValue> {
        Ok(self.value_object(id)?.get_property(name)?)
    }

    /// Edit one property on one object's snapshot.
    ///
    /// System property edits rewire the dependency edges to the new
    /// precedent set; edits never trigger propagation and never touch the
    /// update stamp or count. The live object is not rebuilt until the next
    /// notification reaches it.
    pub fn set_object_property(
        &self,
        id: impl Into<Handle>,
        name: &str,
        value: impl Into<PropertyValue>,
    ) -> StoreResult<()> {
        let id = id.into();
        let value = value.into();
        let mut state = self.inner.write().expect("lock poisoned");
        let mut vo = state
            .entries
            .get(&id)
            .map(|entry| entry.value_object().clone())
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        vo.set_property(name, value)?;
        if vo.precedent_ids().contains(&id) {
            return Err(StoreError::Graph(GraphError::SelfObservation(id)));
        }
        let new_precedents = vo.precedent_ids().clone();
        let rewire = state
            .graph
            .node(&id)
            .map(|node| node.precedents != new_precedents)
            .unwrap_or(true);
        if let Some(entry) = state.entries.get_mut(&id) {
            entry.set_value_object(vo);
        }
        if rewire {
            state.graph.wire(&id, &new_precedents)?;
        }
        Ok(())
    }

    // ---------------------------------------------------------------
    // Collection
    // ---------------------------------------------------------------

    /// Resolve a list of handles to objects, flattening groups.
    ///
    /// Empty handles are skipped. A group contributes its members, nested
    /// groups expanding up to [`MAX_EXPANSION_DEPTH`] levels; with
    /// `include_groups` the group object itself follows its members.
    pub fn collect_objects<I, H>(&self, ids: I, include_groups: bool) -> StoreResult<Vec<ObjectRef>>
    where
        I: IntoIterator<Item = H>,
        H: Into<Handle>,
    {
        let state = self.inner.read().expect("lock poisoned");
        let mut collected = Vec::new();
        for id in ids {
            Self::collect_into(&state, &id.into(), include_groups, 0, &mut collected)?;
        }
        Ok(collected)
    }

    fn collect_into(
        state: &RepoState,
        id: &Handle,
        include_groups: bool,
        depth: usize,
        collected: &mut Vec<ObjectRef>,
    ) -> StoreResult<()> {
        if id.is_empty() {
            return Ok(());
        }
        if depth > MAX_EXPANSION_DEPTH {
            return Err(StoreError::RecursionLimitExceeded {
                handle: id.to_string(),
                limit: MAX_EXPANSION_DEPTH,
            });
        }
        let entry = state
            .entries
            .get(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        let object = entry.object().clone();
        match object.member_handles() {
            Some(members) => {
                for member in members {
                    Self::collect_into(state, member, include_groups, depth + 1, collected)?;
                }
                if include_groups {
                    collected.push(object);
                }
            }
            None => collected.push(object),
        }
        Ok(())
    }

    /// Snapshot the stored value objects for `ids`, in collection order.
    ///
    /// Expansion follows [`collect_objects`](Self::collect_objects), and
    /// each object contributes the snapshot its entry currently holds.
    /// Every snapshot is cloned under one read guard, so the returned set
    /// reflects a single instant even while other threads store.
    pub fn collect_value_objects<I, H>(
        &self,
        ids: I,
        include_groups: bool,
    ) -> StoreResult<Vec<ValueObject>>
    where
        I: IntoIterator<Item = H>,
        H: Into<Handle>,
    {
        let state = self.inner.read().expect("lock poisoned");
        let mut collected = Vec::new();
        for id in ids {
            Self::collect_into(&state, &id.into(), include_groups, 0, &mut collected)?;
        }
        collected
            .into_iter()
            .map(|object| {
                let id = object.value_object().handle();
                state
                    .entries
                    .get(&id)
                    .map(|entry| entry.value_object().clone())
                    .ok_or_else(|| StoreError::NotFound(id.to_string()))
            })
            .collect()
    }

    // ---------------------------------------------------------------
    // Diagnostics
    // ---------------------------------------------------------------

    /// Human-readable listing of every object, case-insensitively sorted.
    pub fn dump(&self) -> String {
        let state = self.inner.read().expect("lock poisoned");
        let mut ids: Vec<Handle> = state.entries.keys().cloned().collect();
        ids.sort();
        let mut out = String::new();
        let _ = writeln!(out, "{} objects in repository", ids.len());
        for id in &ids {
            out.push('\n');
            Self::write_entry(&state, id, &mut out);
        }
        out
    }

    /// Human-readable listing of one object.
    pub fn dump_object(&self, id: impl Into<Handle>) -> StoreResult<String> {
        let id = id.into();
        let state = self.inner.read().expect("lock poisoned");
        if !state.entries.contains_key(&id) {
            return Err(StoreError::NotFound(id.to_string()));
        }
        let mut out = String::new();
        Self::write_entry(&state, &id, &mut out);
        Ok(out)
    }

    fn write_entry(state: &RepoState, id: &Handle, out: &mut String) {
        let Some(entry) = state.entries.get(id) else {
            return;
        };
        let vo = entry.value_object();
        let _ = writeln!(out, "object id = {}", vo.object_id());
        let _ = writeln!(out, "class name = {}", vo.class_name());
        let _ = writeln!(out, "permanent = {}", entry.is_permanent());
        let _ = writeln!(out, "created = {}", entry.created_at().clock_time());
        let _ = writeln!(out, "updated = {}", entry.updated_at().clock_time());
        let _ = writeln!(out, "update count = {}", entry.update_count());
        for name in vo.property_names() {
            let pseudo = name.eq_ignore_ascii_case(PROP_OBJECT_ID)
                || name.eq_ignore_ascii_case(PROP_CLASS_NAME)
                || name.eq_ignore_ascii_case(PROP_PERMANENT);
            if pseudo {
                continue;
            }
            if let Ok(value) = vo.get_property(&name) {
                let _ = writeln!(out, "{name} = {value}");
            }
        }
    }
}

impl Default for Repository {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Repository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.read().expect("lock poisoned");
        f.debug_struct("Repository")
            .field("object_count", &state.entries.len())
            .field("graph_nodes", &state.graph.len())
            .finish_non_exhaustive()
    }
}

/// Whole-handle, case-insensitive matching.
fn compile_pattern(pattern: &str) -> StoreResult<Regex> {
    RegexBuilder::new(&format!(r"\A(?:{pattern})\z"))
        .case_insensitive(true)
        .build()
        .map_err(|e| StoreError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })
}
