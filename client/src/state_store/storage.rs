use std::{
    collections::HashMap,
    fs, io,
    path::PathBuf,
    sync::{Mutex, PoisonError},
    time::{SystemTime, UNIX_EPOCH},
};

use anyhow::Context;

/// KeyValueStorage is the durable per-device record store, one string value per key
pub trait KeyValueStorage: Send + Sync {
    fn get(&self, key: &str) -> anyhow::Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> anyhow::Result<()>;
    /// Removing a missing key is not an error
    fn remove(&self, key: &str) -> anyhow::Result<()>;
}

/// [FileStorage] keeps every key in its own `<key>.json` file under a directory
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        FileStorage { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    fn temp_path_for(&self, key: &str) -> PathBuf {
        let now_nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|duration| duration.as_nanos())
            .unwrap_or(0);

        self.dir.join(format!(".{key}.{now_nanos}.tmp"))
    }
}

impl KeyValueStorage for FileStorage {
    fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        let path = self.path_for(key);

        match fs::read_to_string(&path) {
            Ok(raw) => Ok(Some(raw)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err).with_context(|| format!("failed reading {}", path.display())),
        }
    }

    fn set(&self, key: &str, value: &str) -> anyhow::Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("failed creating directory {}", self.dir.display()))?;

        let path = self.path_for(key);
        let temp_path = self.temp_path_for(key);
        fs::write(&temp_path, value)
            .with_context(|| format!("failed writing temp file {}", temp_path.display()))?;

        // the record is replaced in a single rename so readers never see a partial write
        if let Err(rename_err) = fs::rename(&temp_path, &path) {
            // Windows does not allow replacing existing files via rename.
            match fs::remove_file(&path) {
                Ok(()) => {}
                Err(err) if err.kind() == io::ErrorKind::NotFound => {}
                Err(err) => {
                    let _ = fs::remove_file(&temp_path);
                    return Err(err).with_context(|| {
                        format!(
                            "failed replacing {} after rename error ({rename_err})",
                            path.display()
                        )
                    });
                }
            }

            fs::rename(&temp_path, &path).map_err(|err| {
                let _ = fs::remove_file(&temp_path);
                anyhow::Error::new(err).context(format!("failed writing {}", path.display()))
            })?;
        }

        Ok(())
    }

    fn remove(&self, key: &str) -> anyhow::Result<()> {
        let path = self.path_for(key);

        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err).with_context(|| format!("failed deleting {}", path.display())),
        }
    }
}

/// [MemoryStorage] is a process local storage, nothing survives a restart
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl KeyValueStorage for MemoryStorage {
    fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        Ok(self.entries().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> anyhow::Result<()> {
        self.entries().insert(key.to_string(), value.to_string());

        Ok(())
    }

    fn remove(&self, key: &str) -> anyhow::Result<()> {
        self.entries().remove(key);

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    fn unique_temp_dir(label: &str) -> PathBuf {
        let now_nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0);
        env::temp_dir().join(format!("chat-rooms-{label}-{now_nanos}"))
    }

    #[test]
    fn test_file_storage_round_trip() {
        let dir = unique_temp_dir("storage-round-trip");
        let storage = FileStorage::new(&dir);

        assert_eq!(storage.get("chat-state").unwrap(), None);

        storage.set("chat-state", r#"{"a":1}"#).unwrap();
        storage.set("chat-state", r#"{"a":2}"#).unwrap();
        assert_eq!(
            storage.get("chat-state").unwrap().as_deref(),
            Some(r#"{"a":2}"#)
        );
        assert!(dir.join("chat-state.json").exists());

        storage.remove("chat-state").unwrap();
        assert_eq!(storage.get("chat-state").unwrap(), None);

        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn test_removing_missing_key_is_ok() {
        let storage = FileStorage::new(unique_temp_dir("storage-missing"));

        assert!(storage.remove("never-written").is_ok());
        assert!(MemoryStorage::new().remove("never-written").is_ok());
    }

    #[test]
    fn test_memory_storage_round_trip() {
        let storage = MemoryStorage::new();

        storage.set("k", "v").unwrap();
        assert_eq!(storage.get("k").unwrap().as_deref(), Some("v"));

        storage.remove("k").unwrap();
        assert_eq!(storage.get("k").unwrap(), None);
    }
}
