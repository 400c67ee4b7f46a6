//! The in-memory overlay the compilation host reads through.
//!
//! Two synthetic files always exist: the current cell and the accumulated
//! declarations. Registered in-memory modules come next, and everything else
//! falls through to real storage.

use std::cell::RefCell;
use std::fs;
use std::path::Path;
use std::rc::Rc;

use indexmap::{IndexMap, IndexSet};
use tracing::trace;

/// The synthetic file holding the cell currently being compiled.
pub const CELL_FILE: &str = "__cell__.ink";
/// The synthetic file holding the accumulated declarations of prior cells.
pub const DECLS_FILE: &str = "__decls__.ink";

pub trait FileSystem {
    fn read_file(&self, path: &str) -> Option<String>;
    fn file_exists(&self, path: &str) -> bool;
    fn directory_exists(&self, path: &str) -> bool;
    fn read_directory(&self, path: &str) -> Vec<String>;
}

/// Pass-through to the real file system.
#[derive(Debug, Clone, Copy, Default)]
pub struct RealFs;

impl FileSystem for RealFs {
    fn read_file(&self, path: &str) -> Option<String> {
        fs::read_to_string(path).ok()
    }

    fn file_exists(&self, path: &str) -> bool {
        Path::new(path).is_file()
    }

    fn directory_exists(&self, path: &str) -> bool {
        Path::new(path).is_dir()
    }

    fn read_directory(&self, path: &str) -> Vec<String> {
        let Ok(entries) = fs::read_dir(path) else {
            return vec![];
        };
        entries
            .filter_map(|entry| Some(entry.ok()?.path().to_string_lossy().into_owned()))
            .collect()
    }
}

/// A purely in-memory storage backend. Handles are cheap clones of the same
/// underlying file map, so a test can keep one and mutate files while the
/// session holds another.
#[derive(Debug, Clone, Default)]
pub struct MemoryFs {
    files: Rc<RefCell<IndexMap<String, String>>>,
}

impl MemoryFs {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn insert(&self, path: impl Into<String>, content: impl Into<String>) {
        self.files.borrow_mut().insert(path.into(), content.into());
    }
}

impl FileSystem for MemoryFs {
    fn read_file(&self, path: &str) -> Option<String> {
        self.files.borrow().get(path).cloned()
    }

    fn file_exists(&self, path: &str) -> bool {
        self.files.borrow().contains_key(path)
    }

    fn directory_exists(&self, path: &str) -> bool {
        let prefix = format!("{path}/");
        self.files
            .borrow()
            .keys()
            .any(|file| file.starts_with(&prefix))
    }

    fn read_directory(&self, path: &str) -> Vec<String> {
        let prefix = format!("{path}/");
        self.files
            .borrow()
            .keys()
            .filter(|file| file.starts_with(&prefix))
            .cloned()
            .collect()
    }
}

/// The overlay itself. Only the watch host writes the synthetic files; the
/// session registers modules and queues change notifications.
pub struct Vfs<F> {
    storage: F,
    cell: String,
    decls: String,
    modules: IndexMap<String, String>,
    changed: IndexSet<String>,
}

impl<F: FileSystem> Vfs<F> {
    pub fn new(storage: F) -> Self {
        Self {
            storage,
            cell: String::new(),
            decls: String::new(),
            modules: IndexMap::new(),
            changed: IndexSet::new(),
        }
    }

    pub fn set_cell(&mut self, content: String) {
        self.cell = content;
    }

    pub fn set_decls(&mut self, content: String) {
        self.decls = content;
    }

    pub fn cell(&self) -> &str {
        &self.cell
    }

    pub fn decls(&self) -> &str {
        &self.decls
    }

    /// Registers (or replaces) an in-memory module. Replacing existing
    /// content counts as a change event for the module's path.
    pub fn add_module(&mut self, name: &str, content: String) {
        if self.modules.insert(name.to_owned(), content).is_some() {
            trace!(name, "in-memory module replaced");
            self.changed.insert(name.to_owned());
        }
    }

    pub fn module(&self, name: &str) -> Option<&str> {
        self.modules.get(name).map(String::as_str)
    }

    pub fn clear_modules(&mut self) {
        self.modules.clear();
    }

    /// Queues a file-watch change event. The effect (invalidating converted
    /// dependencies) is applied when the session drains the queue, never
    /// concurrently with a compile.
    pub fn notify_changed(&mut self, path: &str) {
        self.changed.insert(path.to_owned());
    }

    pub fn take_changed(&mut self) -> Vec<String> {
        self.changed.drain(..).collect()
    }

    pub fn read_file(&self, path: &str) -> Option<String> {
        match path {
            CELL_FILE => Some(self.cell.clone()),
            DECLS_FILE => Some(self.decls.clone()),
            _ => self
                .modules
                .get(path)
                .cloned()
                .or_else(|| self.storage.read_file(path)),
        }
    }

    pub fn file_exists(&self, path: &str) -> bool {
        matches!(path, CELL_FILE | DECLS_FILE)
            || self.modules.contains_key(path)
            || self.storage.file_exists(path)
    }

    pub fn directory_exists(&self, path: &str) -> bool {
        self.storage.directory_exists(path)
    }

    pub fn read_directory(&self, path: &str) -> Vec<String> {
        self.storage.read_directory(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn synthetic_files_shadow_storage() {
        let storage = MemoryFs::new();
        storage.insert(CELL_FILE, "on disk");
        let mut vfs = Vfs::new(storage);
        vfs.set_cell("in memory".to_owned());
        assert_eq!(vfs.read_file(CELL_FILE).as_deref(), Some("in memory"));
    }

    #[test]
    fn modules_shadow_storage_but_not_synthetics() {
        let storage = MemoryFs::new();
        storage.insert("util.ink", "let a = 1;");
        let mut vfs = Vfs::new(storage);
        assert_eq!(vfs.read_file("util.ink").as_deref(), Some("let a = 1;"));
        vfs.add_module("util.ink", "let a = 2;".to_owned());
        assert_eq!(vfs.read_file("util.ink").as_deref(), Some("let a = 2;"));
    }

    #[test]
    fn replacing_a_module_queues_a_change() {
        let mut vfs = Vfs::new(MemoryFs::new());
        vfs.add_module("util", "let a = 1;".to_owned());
        assert!(vfs.take_changed().is_empty());
        vfs.add_module("util", "let a = 2;".to_owned());
        assert_eq!(vfs.take_changed(), vec!["util".to_owned()]);
    }
}
