//! Durable storage behind the [`EventStore`](crate::store::EventStore).
//!
//! The store keeps its working set in memory and writes every change through
//! a [`StorageBackend`]. Backends only persist and reload; merge rules live in
//! the store, which replays everything loaded through the same merge.

use crate::{
    error::StorageError,
    record::{Profile, StorageRecord},
    snapshot::StoreSnapshot,
};
use serde::Serialize;
use std::{
    fs,
    path::{Path, PathBuf},
};

/// Persistence for the `events` and `profiles` collections.
pub trait StorageBackend: Send + Sync {
    /// Load everything persisted so far.
    fn load(&self) -> Result<StoreSnapshot, StorageError>;

    /// Insert or overwrite a record, keyed by its event id.
    fn save_record(&self, record: &StorageRecord) -> Result<(), StorageError>;

    /// Remove a record by event id. Removing a missing record is not an error.
    fn remove_record(&self, id: &str) -> Result<(), StorageError>;

    /// Insert or overwrite an author's profile.
    fn save_profile(&self, profile: &Profile) -> Result<(), StorageError>;

    /// Remove an author's profile. Removing a missing profile is not an error.
    fn remove_profile(&self, author: &str) -> Result<(), StorageError>;
}

/// Keeps nothing; state lives only as long as the store.
#[derive(Debug, Default, Clone, Copy)]
pub struct MemoryBackend;

impl StorageBackend for MemoryBackend {
    fn load(&self) -> Result<StoreSnapshot, StorageError> {
        Ok(StoreSnapshot::new())
    }

    fn save_record(&self, _record: &StorageRecord) -> Result<(), StorageError> {
        Ok(())
    }

    fn remove_record(&self, _id: &str) -> Result<(), StorageError> {
        Ok(())
    }

    fn save_profile(&self, _profile: &Profile) -> Result<(), StorageError> {
        Ok(())
    }

    fn remove_profile(&self, _author: &str) -> Result<(), StorageError> {
        Ok(())
    }
}

/// One JSON file per record and per profile under `root`.
///
/// ```text
/// root/
///   events/ab/cd/abcd....json
///   profiles/<pubkey>.json
/// ```
///
/// Files are written to a temporary sibling and renamed into place.
#[derive(Debug, Clone)]
pub struct FileBackend {
    root: PathBuf,
}

impl FileBackend {
    /// Open (and create if needed) a file store rooted at `root`.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let root = root.into();
        fs::create_dir_all(root.join("events"))?;
        fs::create_dir_all(root.join("profiles"))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn event_path(&self, id: &str) -> Result<PathBuf, StorageError> {
        if id.len() < 4 || !id.bytes().all(|b| b.is_ascii_alphanumeric()) {
            return Err(StorageError::Corrupt(format!(
                "event id {id:?} cannot be used as a file name"
            )));
        }
        Ok(self
            .root
            .join("events")
            .join(&id[0..2])
            .join(&id[2..4])
            .join(format!("{id}.json")))
    }

    fn profile_path(&self, author: &str) -> Result<PathBuf, StorageError> {
        if author.is_empty() || !author.bytes().all(|b| b.is_ascii_alphanumeric()) {
            return Err(StorageError::Corrupt(format!(
                "author {author:?} cannot be used as a file name"
            )));
        }
        Ok(self.root.join("profiles").join(format!("{author}.json")))
    }

    fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), StorageError> {
        let parent = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        fs::create_dir_all(&parent)?;
        let tmp = tempfile::NamedTempFile::new_in(&parent)?;
        serde_json::to_writer(&tmp, value)?;
        tmp.as_file().sync_all()?;
        tmp.persist(path).map_err(|e| StorageError::from(e.error))?;
        Ok(())
    }

    fn remove_file(path: &Path) -> Result<(), StorageError> {
        match fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn json_files(dir: &Path) -> Result<Vec<PathBuf>, StorageError> {
        let mut paths = Vec::new();
        for entry in walkdir::WalkDir::new(dir) {
            let entry = entry.map_err(|e| StorageError::Io(e.to_string()))?;
            let is_json = entry.path().extension().is_some_and(|ext| ext == "json");
            if entry.file_type().is_file() && is_json {
                paths.push(entry.into_path());
            }
        }
        paths.sort();
        Ok(paths)
    }
}

impl StorageBackend for FileBackend {
    fn load(&self) -> Result<StoreSnapshot, StorageError> {
        let mut snapshot = StoreSnapshot::new();
        for path in Self::json_files(&self.root.join("events"))? {
            let data = fs::read_to_string(&path)?;
            let record: StorageRecord = serde_json::from_str(&data).map_err(|e| {
                StorageError::Corrupt(format!("{}: {e}", path.display()))
            })?;
            snapshot.add_record(record);
        }
        for path in Self::json_files(&self.root.join("profiles"))? {
            let data = fs::read_to_string(&path)?;
            let profile: Profile = serde_json::from_str(&data).map_err(|e| {
                StorageError::Corrupt(format!("{}: {e}", path.display()))
            })?;
            snapshot.add_profile(profile);
        }
        Ok(snapshot)
    }

    fn save_record(&self, record: &StorageRecord) -> Result<(), StorageError> {
        Self::write_json(&self.event_path(&record.event.id)?, record)
    }

    fn remove_record(&self, id: &str) -> Result<(), StorageError> {
        Self::remove_file(&self.event_path(id)?)
    }

    fn save_profile(&self, profile: &Profile) -> Result<(), StorageError> {
        Self::write_json(&self.profile_path(&profile.author)?, profile)
    }

    fn remove_profile(&self, author: &str) -> Result<(), StorageError> {
        Self::remove_file(&self.profile_path(author)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{Event, Tag, UnsignedEvent};
    use crate::record::PublicationState;
    use tempfile::TempDir;

    fn record(d: &str) -> StorageRecord {
        let ev = Event::from_unsigned(
            UnsignedEvent::new("a".repeat(64), 30000, 5, vec![Tag::new(["d", d])], ""),
            "",
        );
        StorageRecord::new(ev, PublicationState::Unpublished)
    }

    #[test]
    fn memory_backend_loads_empty() {
        let backend = MemoryBackend;
        backend.save_record(&record("x")).unwrap();
        assert_eq!(backend.load().unwrap().record_count(), 0);
    }

    #[test]
    fn file_backend_roundtrip() {
        let dir = TempDir::new().unwrap();
        let backend = FileBackend::open(dir.path()).unwrap();
        let rec = record("friends");
        backend.save_record(&rec).unwrap();

        let id = &rec.event.id;
        let path = dir
            .path()
            .join("events")
            .join(&id[0..2])
            .join(&id[2..4])
            .join(format!("{id}.json"));
        assert!(path.exists());

        let snapshot = backend.load().unwrap();
        assert_eq!(snapshot.events.get(id), Some(&rec));
    }

    #[test]
    fn file_backend_remove_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let backend = FileBackend::open(dir.path()).unwrap();
        let rec = record("friends");
        backend.save_record(&rec).unwrap();
        backend.remove_record(&rec.event.id).unwrap();
        backend.remove_record(&rec.event.id).unwrap();
        assert_eq!(backend.load().unwrap().record_count(), 0);
    }

    #[test]
    fn file_backend_profiles() {
        let dir = TempDir::new().unwrap();
        let backend = FileBackend::open(dir.path()).unwrap();
        let profile = Profile {
            author: "b".repeat(64),
            event_id: "c".repeat(64),
            created_at: 9,
            name: Some("bob".into()),
            ..Profile::default()
        };
        backend.save_profile(&profile).unwrap();
        let snapshot = backend.load().unwrap();
        assert_eq!(snapshot.profiles.get(&profile.author), Some(&profile));

        backend.remove_profile(&profile.author).unwrap();
        assert!(backend.load().unwrap().profiles.is_empty());
    }

    #[test]
    fn corrupt_file_is_reported() {
        let dir = TempDir::new().unwrap();
        let backend = FileBackend::open(dir.path()).unwrap();
        let bad = dir.path().join("events/aa/bb");
        fs::create_dir_all(&bad).unwrap();
        fs::write(bad.join("aabbcc.json"), "{oops").unwrap();
        assert!(matches!(backend.load(), Err(StorageError::Corrupt(_))));
    }

    #[test]
    fn rejects_path_like_ids() {
        let dir = TempDir::new().unwrap();
        let backend = FileBackend::open(dir.path()).unwrap();
        assert!(backend.remove_record("../../etc").is_err());
    }
}
