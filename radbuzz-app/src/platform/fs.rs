//! Cold store on the host filesystem

use std::fs;
use std::path::{Component, Path, PathBuf};

use radbuzz_core::traits::Filesystem;

/// [`Filesystem`] rooted at a directory
///
/// Paths leaving the root are treated as missing.
#[derive(Debug, Clone)]
pub struct DirFilesystem {
    root: PathBuf,
}

impl DirFilesystem {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> Option<PathBuf> {
        let relative = Path::new(path);
        let contained = relative
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
        contained.then(|| self.root.join(relative))
    }
}

impl Filesystem for DirFilesystem {
    fn read_file(&self, path: &str) -> Option<Vec<u8>> {
        fs::read(self.resolve(path)?).ok()
    }

    fn write_file(&self, path: &str, data: &[u8]) -> bool {
        let Some(full) = self.resolve(path) else {
            tracing::warn!(path, "refusing to write outside the data directory");
            return false;
        };

        // Write then rename, readers never see a partial file
        let tmp = full.with_extension("part");
        let result = full
            .parent()
            .map_or(Ok(()), fs::create_dir_all)
            .and_then(|()| fs::write(&tmp, data))
            .and_then(|()| fs::rename(&tmp, &full));

        match result {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(path, error = %e, "write failed");
                let _ = fs::remove_file(&tmp);
                false
            }
        }
    }

    fn file_exists(&self, path: &str) -> bool {
        self.resolve(path).is_some_and(|p| p.is_file())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch(name: &str) -> DirFilesystem {
        let root = std::env::temp_dir().join(format!("radbuzz-{}-{}", name, std::process::id()));
        let _ = fs::remove_dir_all(&root);
        DirFilesystem::new(root)
    }

    #[test]
    fn test_write_creates_directories() {
        let fs = scratch("write");

        assert!(!fs.file_exists("tiles/15/1/2.png"));
        assert!(fs.write_file("tiles/15/1/2.png", b"data"));
        assert!(fs.file_exists("tiles/15/1/2.png"));
        assert_eq!(fs.read_file("tiles/15/1/2.png").unwrap(), b"data");
        assert!(!fs.file_exists("tiles/15/1/2.part"));

        assert!(fs.write_file("tiles/15/1/2.png", b"new"));
        assert_eq!(fs.read_file("tiles/15/1/2.png").unwrap(), b"new");

        let _ = std::fs::remove_dir_all(fs.root());
    }

    #[test]
    fn test_missing_file() {
        let fs = scratch("missing");
        assert!(fs.read_file("nothing.bin").is_none());
        assert!(!fs.file_exists("nothing.bin"));
    }

    #[test]
    fn test_paths_outside_root_are_rejected() {
        let fs = scratch("escape");
        assert!(!fs.write_file("../escape.bin", b"x"));
        assert!(!fs.write_file("/tmp/escape.bin", b"x"));
        assert!(fs.read_file("../escape.bin").is_none());
    }
}
