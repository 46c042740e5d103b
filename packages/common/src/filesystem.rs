use crate::{CommonError, CommonResult};
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// File system abstraction for config lookup and testing
pub trait FileSystem {
    /// Check if a file exists
    fn exists(&self, path: &Path) -> bool;

    /// Read a file to a string
    fn read_to_string(&self, path: &Path) -> Result<String, std::io::Error>;
}

/// Real file system implementation
pub struct RealFileSystem;

impl FileSystem for RealFileSystem {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn read_to_string(&self, path: &Path) -> Result<String, std::io::Error> {
        std::fs::read_to_string(path)
    }
}

/// Mock file system for testing
pub struct MockFileSystem {
    pub files: HashMap<PathBuf, String>,
}

impl MockFileSystem {
    pub fn new() -> Self {
        Self {
            files: HashMap::new(),
        }
    }

    pub fn add_file(&mut self, path: PathBuf, contents: impl Into<String>) {
        self.files.insert(path, contents.into());
    }
}

impl Default for MockFileSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl FileSystem for MockFileSystem {
    fn exists(&self, path: &Path) -> bool {
        self.files.contains_key(path)
    }

    fn read_to_string(&self, path: &Path) -> Result<String, std::io::Error> {
        self.files.get(path).cloned().ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::NotFound, path.display().to_string())
        })
    }
}

/// Load a JSON config file named `file_name` from `dir`.
///
/// Returns `T::default()` when the file does not exist.
pub fn load_json_config<T, F>(fs: &F, dir: &Path, file_name: &str) -> CommonResult<T>
where
    T: DeserializeOwned + Default,
    F: FileSystem + ?Sized,
{
    let path = dir.join(file_name);

    if !fs.exists(&path) {
        return Ok(T::default());
    }

    let content = fs.read_to_string(&path)?;
    serde_json::from_str(&content).map_err(|source| CommonError::Json {
        path: path.display().to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Default, Deserialize, PartialEq)]
    #[serde(rename_all = "camelCase")]
    struct Sample {
        #[serde(default)]
        api_url: String,
    }

    #[test]
    fn test_missing_file_yields_default() {
        let fs = MockFileSystem::new();
        let loaded: Sample = load_json_config(&fs, Path::new("/cfg"), "app.json").unwrap();
        assert_eq!(loaded, Sample::default());
    }

    #[test]
    fn test_reads_existing_file() {
        let mut fs = MockFileSystem::new();
        fs.add_file(PathBuf::from("/cfg/app.json"), r#"{ "apiUrl": "http://shop" }"#);

        let loaded: Sample = load_json_config(&fs, Path::new("/cfg"), "app.json").unwrap();
        assert_eq!(loaded.api_url, "http://shop");
    }

    #[test]
    fn test_invalid_json_reports_path() {
        let mut fs = MockFileSystem::new();
        fs.add_file(PathBuf::from("/cfg/app.json"), "{ nope");

        let err = load_json_config::<Sample, _>(&fs, Path::new("/cfg"), "app.json").unwrap_err();
        assert!(err.to_string().contains("/cfg/app.json"));
    }

    #[test]
    fn test_real_file_system_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("app.json"), r#"{ "apiUrl": "http://disk" }"#).unwrap();

        let loaded: Sample = load_json_config(&RealFileSystem, dir.path(), "app.json").unwrap();
        assert_eq!(loaded.api_url, "http://disk");
    }
}
