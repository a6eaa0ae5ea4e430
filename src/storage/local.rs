use crate::error::PvaError;
use crate::storage::match_glob;
use crate::storage::ObjectStorage;
use crate::storage::StorageError;
use crate::storage::StoredObject;
use glob::Pattern;
use std::fs;
use std::path::Path;
use std::path::PathBuf;
use tracing::info;

/// Object storage on a local directory; object paths map to files below it.
pub struct LocalStorage {
    root: PathBuf,
}

impl LocalStorage {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        LocalStorage {
            root: root.as_ref().to_path_buf(),
        }
    }

    fn file_path(&self, path: &str) -> PathBuf {
        path.split('/')
            .filter(|segment| !segment.is_empty())
            .fold(self.root.clone(), |file, segment| file.join(segment))
    }

    fn object_name(&self, file: &Path) -> Option<String> {
        let relative = file.strip_prefix(&self.root).ok()?;
        let segments: Vec<String> = relative
            .components()
            .map(|component| component.as_os_str().to_string_lossy().into_owned())
            .collect();
        Some(segments.join("/"))
    }
}

impl ObjectStorage for LocalStorage {
    fn upload_file(&self, content: &[u8], path: &str, _content_type: &str) -> Result<String, PvaError> {
        let file = self.file_path(path);
        if let Some(parent) = file.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&file, content)?;
        info!(file = %file.display(), "stored file");
        Ok(file.display().to_string())
    }

    fn get_file(&self, path: &str) -> Result<Vec<u8>, PvaError> {
        let file = self.file_path(path);
        if !file.is_file() {
            return Err(StorageError::NotFound(path.to_owned()).into());
        }
        Ok(fs::read(file)?)
    }

    fn list_files(&self, prefix: &str) -> Result<Vec<StoredObject>, PvaError> {
        let pattern = format!(
            "{}/{}",
            Pattern::escape(&self.root.to_string_lossy()),
            match_glob(&Pattern::escape(prefix))
        );
        let mut objects = Vec::new();
        for entry in glob::glob(&pattern)? {
            let file = entry.map_err(|e| e.into_error())?;
            if !file.is_file() {
                continue;
            }
            if let Some(name) = self.object_name(&file) {
                objects.push(StoredObject { name });
            }
        }
        objects.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(objects)
    }
}
