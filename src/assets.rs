//! Static dashboard assets.
//!
//! The console serves a small bundled UI. Files are loaded once at
//! startup into a name → content map: either the embedded defaults
//! compiled into the binary, or the contents of a directory override.
//! A failing directory read aborts startup.

use std::collections::HashMap;
use std::path::Path;

/// Name of the dashboard root document.
pub const INDEX_FILE: &str = "index.html";

/// Immutable name → content mapping built at startup.
pub struct StaticFiles {
    files: HashMap<String, String>,
}

impl StaticFiles {
    /// The default dashboard bundled into the binary.
    #[must_use]
    pub fn embedded() -> Self {
        let mut files = HashMap::new();
        files.insert(
            INDEX_FILE.to_string(),
            include_str!("../ui/index.html").to_string(),
        );
        files.insert(
            "script.js".to_string(),
            include_str!("../ui/script.js").to_string(),
        );
        files.insert(
            "style.css".to_string(),
            include_str!("../ui/style.css").to_string(),
        );
        files.insert(
            "favicon.svg".to_string(),
            include_str!("../ui/favicon.svg").to_string(),
        );
        Self { files }
    }

    /// Loads every regular file in `dir` (non-recursive).
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error if the directory or any file in
    /// it cannot be read; callers treat this as fatal.
    pub fn from_dir(dir: &Path) -> std::io::Result<Self> {
        let mut files = HashMap::new();
        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            files.insert(name, std::fs::read_to_string(entry.path())?);
        }
        Ok(Self { files })
    }

    /// Content of the named file, if bundled.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.files.get(name).map(String::as_str)
    }

    /// Whether the named file is bundled.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.files.contains_key(name)
    }

    /// Number of bundled files.
    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Whether the bundle is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl std::fmt::Debug for StaticFiles {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<&str> = self.files.keys().map(String::as_str).collect();
        names.sort_unstable();
        f.debug_struct("StaticFiles").field("files", &names).finish()
    }
}
