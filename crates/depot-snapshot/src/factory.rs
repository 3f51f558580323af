//! Class creators and the save/load machinery.
//!
//! # Invariants
//!
//! - Saving validates and collects every record before touching the target,
//!   so a failed save never leaves a half-written or empty file behind.
//! - Loading is per-record: one bad record is reported and skipped, the
//!   rest land. Only a load that stores nothing at all is an error.
//! - Records are replayed in file order through the ordinary store path,
//!   so loaded objects wire dependencies and notify exactly as if a caller
//!   had stored them by hand.

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::Path;
use std::sync::{Arc, RwLock};

use depot_store::{
    Group, ObjectRef, Range, Repository, StoreResult, GROUP_CLASS, RANGE_CLASS,
};
use depot_types::Handle;
use depot_values::ValueObject;
use regex::{Regex, RegexBuilder};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::error::{SnapshotError, SnapshotResult};
use crate::record::ObjectRecord;

/// Builds a live object from a rehydrated snapshot.
pub type Creator = Arc<dyn Fn(&ValueObject) -> StoreResult<ObjectRef> + Send + Sync>;

/// Registry of class creators plus the save/load front ends.
///
/// [`Group`] and [`Range`] are registered out of the box. Registering a
/// class name again replaces the previous creator.
pub struct SerializationFactory {
    creators: RwLock<HashMap<String, Creator>>,
}

impl SerializationFactory {
    /// A factory with the built-in classes pre-registered.
    pub fn new() -> Self {
        let factory = Self {
            creators: RwLock::new(HashMap::new()),
        };
        factory.register_creator(GROUP_CLASS, |vo: &ValueObject| {
            let object: ObjectRef = Arc::new(Group::from_value_object(vo)?);
            Ok(object)
        });
        factory.register_creator(RANGE_CLASS, |vo: &ValueObject| {
            let object: ObjectRef = Arc::new(Range::from_value_object(vo)?);
            Ok(object)
        });
        factory
    }

    /// Register (or replace) the creator for one class.
    pub fn register_creator<F>(&self, class_name: impl Into<String>, creator: F)
    where
        F: Fn(&ValueObject) -> StoreResult<ObjectRef> + Send + Sync + 'static,
    {
        let class_name = class_name.into();
        debug!(class = %class_name, "registered class creator");
        let mut creators = self.creators.write().expect("lock poisoned");
        creators.insert(class_name, Arc::new(creator));
    }

    pub fn has_creator(&self, class_name: &str) -> bool {
        let creators = self.creators.read().expect("lock poisoned");
        creators.contains_key(class_name)
    }

    /// Registered class names, sorted.
    pub fn registered_classes(&self) -> Vec<String> {
        let creators = self.creators.read().expect("lock poisoned");
        let mut classes: Vec<String> = creators.keys().cloned().collect();
        classes.sort();
        classes
    }

    /// Build a live object from a snapshot via its class creator.
    pub fn recreate(&self, value_object: &ValueObject) -> SnapshotResult<ObjectRef> {
        let creator = {
            let creators = self.creators.read().expect("lock poisoned");
            creators
                .get(value_object.class_name())
                .cloned()
                .ok_or_else(|| {
                    SnapshotError::UnknownClass(value_object.class_name().to_string())
                })?
        };
        Ok(creator(value_object)?)
    }

    // ---------------------------------------------------------------
    // Saving
    // ---------------------------------------------------------------

    /// Pull the records for `ids` out of the repository.
    ///
    /// Groups flatten to their members, the group itself following them
    /// when `include_groups` is set. Empty handles are skipped and
    /// case-variant duplicates collapse to the first occurrence. An id
    /// that names nothing fails the whole save. The snapshots come out
    /// of one repository read guard, so the set is consistent even while
    /// other threads store.
    fn collect_records<I, H>(
        repository: &Repository,
        ids: I,
        include_groups: bool,
    ) -> SnapshotResult<Vec<ObjectRecord>>
    where
        I: IntoIterator<Item = H>,
        H: Into<Handle>,
    {
        let mut seen = BTreeSet::new();
        let mut records = Vec::new();
        for vo in repository.collect_value_objects(ids, include_groups)? {
            if !seen.insert(vo.handle()) {
                continue;
            }
            records.push(ObjectRecord::from_value_object(&vo));
        }
        if records.is_empty() {
            return Err(SnapshotError::EmptyObjectList);
        }
        Ok(records)
    }

    fn write_records<W: Write>(records: &[ObjectRecord], writer: W) -> SnapshotResult<()> {
        serde_json::to_writer_pretty(writer, records)
            .map_err(|e| SnapshotError::Encode(e.to_string()))
    }

    /// Save the named objects as pretty JSON into `writer`.
    ///
    /// Returns how many records were written.
    pub fn save<W, I, H>(
        &self,
        repository: &Repository,
        ids: I,
        writer: W,
        include_groups: bool,
    ) -> SnapshotResult<usize>
    where
        W: Write,
        I: IntoIterator<Item = H>,
        H: Into<Handle>,
    {
        let records = Self::collect_records(repository, ids, include_groups)?;
        Self::write_records(&records, writer)?;
        Ok(records.len())
    }

    /// Save the named objects to a string.
    pub fn save_string<I, H>(
        &self,
        repository: &Repository,
        ids: I,
        include_groups: bool,
    ) -> SnapshotResult<String>
    where
        I: IntoIterator<Item = H>,
        H: Into<Handle>,
    {
        let records = Self::collect_records(repository, ids, include_groups)?;
        serde_json::to_string_pretty(&records).map_err(|e| SnapshotError::Encode(e.to_string()))
    }

    /// Save the named objects to a file.
    ///
    /// Records are collected before the file is created. An existing target
    /// is refused unless `force_overwrite` is set; the parent directory
    /// must already exist.
    pub fn save_file<I, H>(
        &self,
        repository: &Repository,
        ids: I,
        path: impl AsRef<Path>,
        force_overwrite: bool,
        include_groups: bool,
    ) -> SnapshotResult<usize>
    where
        I: IntoIterator<Item = H>,
        H: Into<Handle>,
    {
        let path = path.as_ref();
        let records = Self::collect_records(repository, ids, include_groups)?;
        match path.parent() {
            Some(parent) if parent.as_os_str().is_empty() || parent.is_dir() => {}
            Some(parent) => {
                return Err(SnapshotError::InvalidDirectory(
                    parent.display().to_string(),
                ));
            }
            None => {
                return Err(SnapshotError::InvalidDirectory(path.display().to_string()));
            }
        }
        if path.exists() && !force_overwrite {
            return Err(SnapshotError::TargetExists(path.display().to_string()));
        }
        let file = File::create(path)?;
        let mut writer = std::io::BufWriter::new(file);
        Self::write_records(&records, &mut writer)?;
        writer.flush()?;
        info!(path = %path.display(), objects = records.len(), "saved object records");
        Ok(records.len())
    }

    // ---------------------------------------------------------------
    // Loading
    // ---------------------------------------------------------------

    fn read_records<R: Read>(reader: R) -> SnapshotResult<Vec<ObjectRecord>> {
        serde_json::from_reader(reader).map_err(|e| SnapshotError::Decode(e.to_string()))
    }

    /// Load records from `reader` into the repository.
    ///
    /// Returns the per-record outcome. Fails only when the stream cannot be
    /// decoded at all or when not a single record could be stored.
    pub fn load<R: Read>(
        &self,
        repository: &Repository,
        reader: R,
        overwrite: bool,
    ) -> SnapshotResult<LoadReport> {
        let records = Self::read_records(reader)?;
        let report = self.replay(repository, records, overwrite);
        if report.handles.is_empty() {
            return Err(SnapshotError::NoObjectsLoaded);
        }
        Ok(report)
    }

    /// Load records from a string.
    pub fn load_string(
        &self,
        repository: &Repository,
        text: &str,
        overwrite: bool,
    ) -> SnapshotResult<LoadReport> {
        self.load(repository, text.as_bytes(), overwrite)
    }

    /// Load records from a file.
    pub fn load_file(
        &self,
        repository: &Repository,
        path: impl AsRef<Path>,
        overwrite: bool,
    ) -> SnapshotResult<LoadReport> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let report = self.load(repository, BufReader::new(file), overwrite)?;
        info!(
            path = %path.display(),
            loaded = report.handles.len(),
            failed = report.failures.len(),
            "loaded object records"
        );
        Ok(report)
    }

    /// Load every matching records file under `dir`.
    ///
    /// File names are matched whole against `pattern`, case-insensitively.
    /// Files are visited in name order, subdirectories only when `recurse`
    /// is set. A file that cannot be read or decoded becomes a failure with
    /// ordinal 0 and the rest still load.
    pub fn load_dir(
        &self,
        repository: &Repository,
        dir: impl AsRef<Path>,
        pattern: &str,
        recurse: bool,
        overwrite: bool,
    ) -> SnapshotResult<LoadReport> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            return Err(SnapshotError::InvalidDirectory(dir.display().to_string()));
        }
        let regex = compile_file_pattern(pattern)?;
        let max_depth = if recurse { usize::MAX } else { 1 };

        let mut report = LoadReport::default();
        let mut matched = 0usize;
        for entry in WalkDir::new(dir).max_depth(max_depth).sort_by_file_name() {
            let entry = entry.map_err(std::io::Error::from)?;
            if !entry.file_type().is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy();
            if !regex.is_match(&name) {
                continue;
            }
            matched += 1;
            let path = entry.path();
            let outcome = File::open(path)
                .map_err(SnapshotError::from)
                .and_then(|file| Self::read_records(BufReader::new(file)));
            match outcome {
                Ok(records) => {
                    let partial = self.replay(repository, records, overwrite);
                    report.merge(partial, path);
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "skipping unreadable records file");
                    report.failures.push(RecordFailure {
                        ordinal: 0,
                        message: format!("{}: {e}", path.display()),
                    });
                }
            }
        }
        if matched == 0 {
            return Err(SnapshotError::NoFilesMatched {
                dir: dir.display().to_string(),
                pattern: pattern.to_string(),
            });
        }
        if report.handles.is_empty() {
            return Err(SnapshotError::NoObjectsLoaded);
        }
        info!(
            dir = %dir.display(),
            files = matched,
            loaded = report.handles.len(),
            failed = report.failures.len(),
            "loaded object records from directory"
        );
        Ok(report)
    }

    /// Replay records through the ordinary store path, one by one.
    fn replay(
        &self,
        repository: &Repository,
        records: Vec<ObjectRecord>,
        overwrite: bool,
    ) -> LoadReport {
        let mut report = LoadReport::default();
        for (index, record) in records.into_iter().enumerate() {
            let ordinal = index + 1;
            match self.replay_record(repository, record, overwrite) {
                Ok(handle) => report.handles.push(handle.into_string()),
                Err(e) => {
                    warn!(ordinal, error = %e, "skipping object record");
                    report.failures.push(RecordFailure {
                        ordinal,
                        message: e.to_string(),
                    });
                }
            }
        }
        report
    }

    fn replay_record(
        &self,
        repository: &Repository,
        record: ObjectRecord,
        overwrite: bool,
    ) -> SnapshotResult<Handle> {
        let value_object = record.into_value_object();
        let object = self.recreate(&value_object)?;
        let id = value_object.handle();
        Ok(repository.store_with(id, object, overwrite, Some(value_object))?)
    }
}

impl Default for SerializationFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SerializationFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SerializationFactory")
            .field("classes", &self.registered_classes())
            .finish()
    }
}

/// Per-record outcome of a load.
#[derive(Debug, Default)]
pub struct LoadReport {
    /// Handles stored, in record order, spelled as the repository keeps them.
    pub handles: Vec<String>,
    /// Records that could not be replayed.
    pub failures: Vec<RecordFailure>,
}

impl LoadReport {
    /// `true` when every record was replayed.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    fn merge(&mut self, other: LoadReport, path: &Path) {
        self.handles.extend(other.handles);
        for failure in other.failures {
            self.failures.push(RecordFailure {
                ordinal: failure.ordinal,
                message: format!("{}: {}", path.display(), failure.message),
            });
        }
    }
}

/// One record that failed to load.
#[derive(Debug)]
pub struct RecordFailure {
    /// 1-based position within its file; 0 when the whole file failed.
    pub ordinal: usize,
    pub message: String,
}

/// Whole-file-name, case-insensitive matching.
fn compile_file_pattern(pattern: &str) -> SnapshotResult<Regex> {
    RegexBuilder::new(&format!(r"\A(?:{pattern})\z"))
        .case_insensitive(true)
        .build()
        .map_err(|e| SnapshotError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use depot_store::{ManagedObject, Precedents, StoreError};
    use serde_json::json;

    /// Minimal registrable class used throughout these tests.
    struct Widget {
        value_object: ValueObject,
    }

    impl Widget {
        fn new(id: &str, size: i64) -> Self {
            let value_object = ValueObject::new(id, "Widget", false).with_property("Size", size);
            Self { value_object }
        }

        fn from_value_object(vo: &ValueObject) -> StoreResult<Self> {
            vo.get_property("Size")?.as_int()?;
            Ok(Self {
                value_object: vo.clone(),
            })
        }
    }

    impl ManagedObject for Widget {
        fn value_object(&self) -> &ValueObject {
            &self.value_object
        }

        fn rebuild(
            &self,
            value_object: &ValueObject,
            _precedents: &Precedents<'_>,
        ) -> StoreResult<ObjectRef> {
            Ok(Arc::new(Self {
                value_object: value_object.clone(),
            }))
        }
    }

    fn factory() -> SerializationFactory {
        let factory = SerializationFactory::new();
        factory.register_creator("Widget", |vo: &ValueObject| {
            let object: ObjectRef = Arc::new(Widget::from_value_object(vo)?);
            Ok(object)
        });
        factory
    }

    fn seeded_repo() -> Repository {
        let repo = Repository::new();
        repo.store(
            "Grid",
            Arc::new(Range::new("Grid", vec![vec![1.0, 2.0]]).unwrap()),
        )
        .unwrap();
        repo.store("W1", Arc::new(Widget::new("W1", 7))).unwrap();
        repo
    }

    fn widget_json(id: &str, size: i64) -> serde_json::Value {
        json!({
            "object_id": id,
            "class_name": "Widget",
            "system_properties": [["Size", { "int": size }]],
        })
    }

    // ----------------------------------------------------------
    // Registration
    // ----------------------------------------------------------

    #[test]
    fn builtin_classes_are_preregistered() {
        let factory = SerializationFactory::new();
        assert!(factory.has_creator("Group"));
        assert!(factory.has_creator("Range"));
        assert_eq!(factory.registered_classes(), vec!["Group", "Range"]);
    }

    #[test]
    fn reregistering_a_class_replaces_the_creator() {
        let factory = factory();
        let vo = Widget::new("W", 3).value_object.clone();
        assert!(factory.recreate(&vo).is_ok());

        factory.register_creator("Widget", |_vo: &ValueObject| {
            Err(StoreError::NotFound("creator disabled".to_string()))
        });
        assert!(matches!(
            factory.recreate(&vo),
            Err(SnapshotError::Store(_))
        ));
    }

    #[test]
    fn unknown_classes_are_refused() {
        let factory = SerializationFactory::new();
        let vo = ValueObject::new("X", "Mystery", false);
        assert!(matches!(
            factory.recreate(&vo),
            Err(SnapshotError::UnknownClass(class)) if class == "Mystery"
        ));
    }

    // ----------------------------------------------------------
    // String round trips
    // ----------------------------------------------------------

    #[test]
    fn save_then_load_reproduces_every_property() {
        let factory = factory();
        let source = seeded_repo();
        let text = factory.save_string(&source, ["Grid", "W1"], false).unwrap();

        let target = Repository::new();
        let report = factory.load_string(&target, &text, false).unwrap();
        assert!(report.is_clean());
        assert_eq!(report.handles, vec!["Grid", "W1"]);

        let fetched: Range = target.retrieve_as("grid").unwrap();
        assert_eq!(fetched.values(), &[vec![1.0, 2.0]]);
        assert_eq!(
            target.property_value("W1", "Size").unwrap().as_int().unwrap(),
            7
        );

        // Saving the reloaded repository gives byte-identical records.
        let text_again = factory.save_string(&target, ["Grid", "W1"], false).unwrap();
        assert_eq!(text, text_again);
    }

    #[test]
    fn writer_and_reader_front_ends_round_trip() {
        let factory = factory();
        let source = seeded_repo();
        let mut buffer = Vec::new();
        let saved = factory.save(&source, ["W1"], &mut buffer, false).unwrap();
        assert_eq!(saved, 1);

        let target = Repository::new();
        let report = factory.load(&target, buffer.as_slice(), false).unwrap();
        assert_eq!(report.handles, vec!["W1"]);
    }

    #[test]
    fn save_deduplicates_case_variant_handles() {
        let factory = factory();
        let repo = seeded_repo();
        let text = factory
            .save_string(&repo, ["Grid", "GRID", "grid"], false)
            .unwrap();
        let records: Vec<ObjectRecord> = serde_json::from_str(&text).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].object_id, "Grid");
    }

    #[test]
    fn save_writes_the_edited_snapshot() {
        let factory = factory();
        let repo = seeded_repo();
        repo.set_object_property("Grid", "Note", "calibrated").unwrap();

        let text = factory.save_string(&repo, ["Grid"], false).unwrap();
        let target = Repository::new();
        factory.load_string(&target, &text, false).unwrap();
        let note = target.property_value("Grid", "Note").unwrap();
        assert_eq!(note.as_str().unwrap(), "calibrated");
    }

    #[test]
    fn saving_a_group_writes_its_members() {
        let factory = factory();
        let repo = seeded_repo();
        repo.store(
            "Pack",
            Arc::new(Group::new("Pack", vec!["Grid".into(), "W1".into()])),
        )
        .unwrap();

        let text = factory.save_string(&repo, ["Pack"], false).unwrap();
        let records: Vec<ObjectRecord> = serde_json::from_str(&text).unwrap();
        let ids: Vec<&str> = records.iter().map(|r| r.object_id.as_str()).collect();
        assert_eq!(ids, ["Grid", "W1"]);

        let text = factory.save_string(&repo, ["Pack"], true).unwrap();
        let records: Vec<ObjectRecord> = serde_json::from_str(&text).unwrap();
        let ids: Vec<&str> = records.iter().map(|r| r.object_id.as_str()).collect();
        assert_eq!(ids, ["Grid", "W1", "Pack"]);

        let target = Repository::new();
        let report = factory.load_string(&target, &text, false).unwrap();
        assert!(report.is_clean());
        let pack: Group = target.retrieve_as("pack").unwrap();
        assert_eq!(pack.members(), &[Handle::new("Grid"), Handle::new("W1")]);
    }

    #[test]
    fn saving_nothing_is_an_error() {
        let factory = factory();
        let repo = seeded_repo();
        let none: [&str; 0] = [];
        assert!(matches!(
            factory.save_string(&repo, none, false),
            Err(SnapshotError::EmptyObjectList)
        ));
        assert!(matches!(
            factory.save_string(&repo, [""], false),
            Err(SnapshotError::EmptyObjectList)
        ));
    }

    #[test]
    fn saving_a_missing_object_fails_the_save() {
        let factory = factory();
        let repo = seeded_repo();
        assert!(matches!(
            factory.save_string(&repo, ["Grid", "Ghost"], false),
            Err(SnapshotError::Store(StoreError::NotFound(_)))
        ));
    }

    // ----------------------------------------------------------
    // Partial loads
    // ----------------------------------------------------------

    #[test]
    fn one_bad_record_is_reported_and_the_rest_load() {
        let factory = factory();
        let repo = Repository::new();
        let text = json!([
            widget_json("R1", 1),
            widget_json("R2", 2),
            { "object_id": "R3", "class_name": "Mystery" },
            widget_json("R4", 4),
            widget_json("R5", 5),
        ])
        .to_string();

        let report = factory.load_string(&repo, &text, false).unwrap();
        assert_eq!(report.handles, vec!["R1", "R2", "R4", "R5"]);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].ordinal, 3);
        assert!(report.failures[0].message.contains("Mystery"));
        assert_eq!(repo.object_count(), 4);
    }

    #[test]
    fn a_load_that_stores_nothing_is_an_error() {
        let factory = SerializationFactory::new();
        let repo = Repository::new();
        let text = json!([{ "object_id": "X", "class_name": "Mystery" }]).to_string();
        assert!(matches!(
            factory.load_string(&repo, &text, false),
            Err(SnapshotError::NoObjectsLoaded)
        ));
        assert!(repo.is_empty());
    }

    #[test]
    fn undecodable_input_is_an_error() {
        let factory = factory();
        let repo = Repository::new();
        assert!(matches!(
            factory.load_string(&repo, "not json at all", false),
            Err(SnapshotError::Decode(_))
        ));
    }

    #[test]
    fn load_honors_the_overwrite_flag() {
        let factory = factory();
        let source = Repository::new();
        source
            .store(
                "Grid",
                Arc::new(Range::new("Grid", vec![vec![9.0]]).unwrap()),
            )
            .unwrap();
        source.store("Fresh", Arc::new(Widget::new("Fresh", 1))).unwrap();
        let text = factory.save_string(&source, ["Grid", "Fresh"], false).unwrap();

        let target = seeded_repo();
        let report = factory.load_string(&target, &text, false).unwrap();
        assert_eq!(report.handles, vec!["Fresh"]);
        assert_eq!(report.failures[0].ordinal, 1);
        // The existing Grid was left alone.
        let kept: Range = target.retrieve_as("Grid").unwrap();
        assert_eq!(kept.values(), &[vec![1.0, 2.0]]);

        let report = factory.load_string(&target, &text, true).unwrap();
        assert!(report.is_clean());
        let replaced: Range = target.retrieve_as("Grid").unwrap();
        assert_eq!(replaced.values(), &[vec![9.0]]);
        assert_eq!(target.update_count("Grid").unwrap(), 1);
    }

    #[test]
    fn loaded_records_wire_forward_references() {
        let factory = factory();
        let repo = Repository::new();
        // B names A as a source before A's record arrives.
        let text = json!([
            {
                "object_id": "B",
                "class_name": "Widget",
                "system_properties": [["Size", { "int": 1 }], ["Source", { "str": "A" }]],
            },
            widget_json("A", 2),
        ])
        .to_string();

        let report = factory.load_string(&repo, &text, false).unwrap();
        assert!(report.is_clean());
        assert_eq!(repo.precedent_ids("B").unwrap(), vec!["A"]);
        // Storing A renotified B.
        assert_eq!(repo.update_count("B").unwrap(), 1);
    }

    // ----------------------------------------------------------
    // Files and directories
    // ----------------------------------------------------------

    #[test]
    fn file_round_trip_and_overwrite_protection() {
        let factory = factory();
        let source = seeded_repo();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("objects.json");

        let saved = factory
            .save_file(&source, ["Grid", "W1"], &path, false, false)
            .unwrap();
        assert_eq!(saved, 2);

        assert!(matches!(
            factory.save_file(&source, ["Grid"], &path, false, false),
            Err(SnapshotError::TargetExists(_))
        ));
        factory
            .save_file(&source, ["Grid"], &path, true, false)
            .unwrap();

        let target = Repository::new();
        let report = factory.load_file(&target, &path, false).unwrap();
        assert_eq!(report.handles, vec!["Grid"]);
    }

    #[test]
    fn save_file_validates_before_creating_anything() {
        let factory = factory();
        let repo = seeded_repo();
        let dir = tempfile::tempdir().unwrap();

        let missing_parent = dir.path().join("no_such_dir").join("objects.json");
        assert!(matches!(
            factory.save_file(&repo, ["Grid"], &missing_parent, false, false),
            Err(SnapshotError::InvalidDirectory(_))
        ));

        // A save with nothing to write must not leave a file behind.
        let path = dir.path().join("empty.json");
        let none: [&str; 0] = [];
        assert!(matches!(
            factory.save_file(&repo, none, &path, false, false),
            Err(SnapshotError::EmptyObjectList)
        ));
        assert!(!path.exists());
    }

    #[test]
    fn load_dir_merges_matching_files_in_name_order() {
        let factory = factory();
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("a.json"),
            json!([widget_json("A1", 1), widget_json("A2", 2)]).to_string(),
        )
        .unwrap();
        fs::write(
            dir.path().join("b.json"),
            json!([widget_json("B1", 3)]).to_string(),
        )
        .unwrap();
        fs::write(dir.path().join("notes.txt"), "ignore me").unwrap();

        let repo = Repository::new();
        let report = factory
            .load_dir(&repo, dir.path(), r".*\.json", false, false)
            .unwrap();
        assert!(report.is_clean());
        assert_eq!(report.handles, vec!["A1", "A2", "B1"]);
    }

    #[test]
    fn load_dir_recurses_only_on_request() {
        let factory = factory();
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("top.json"),
            json!([widget_json("Top", 1)]).to_string(),
        )
        .unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(
            dir.path().join("sub").join("deep.json"),
            json!([widget_json("Deep", 2)]).to_string(),
        )
        .unwrap();

        let flat = Repository::new();
        let report = factory
            .load_dir(&flat, dir.path(), r".*\.json", false, false)
            .unwrap();
        assert_eq!(report.handles, vec!["Top"]);

        let nested = Repository::new();
        let report = factory
            .load_dir(&nested, dir.path(), r".*\.json", true, false)
            .unwrap();
        assert_eq!(report.handles.len(), 2);
        assert!(nested.exists("Deep"));
    }

    #[test]
    fn load_dir_reports_missing_matches_and_bad_directories() {
        let factory = factory();
        let repo = Repository::new();
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            factory.load_dir(&repo, dir.path(), r".*\.json", false, false),
            Err(SnapshotError::NoFilesMatched { .. })
        ));
        assert!(matches!(
            factory.load_dir(&repo, dir.path().join("absent"), ".*", false, false),
            Err(SnapshotError::InvalidDirectory(_))
        ));
    }

    #[test]
    fn load_dir_survives_one_corrupt_file() {
        let factory = factory();
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("good.json"),
            json!([widget_json("Good", 1)]).to_string(),
        )
        .unwrap();
        fs::write(dir.path().join("broken.json"), "{{{").unwrap();

        let repo = Repository::new();
        let report = factory
            .load_dir(&repo, dir.path(), r".*\.json", false, false)
            .unwrap();
        assert_eq!(report.handles, vec!["Good"]);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].ordinal, 0);
        assert!(report.failures[0].message.contains("broken.json"));
    }
}
