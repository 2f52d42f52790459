//! Workspace sandbox: path resolution confined to one project root.
//!
//! Every file operation a tool performs goes through [`Workspace::resolve`],
//! which guarantees the target is the root itself or a descendant of it.
//! Escape attempts (`..` traversal, absolute paths, symlinks pointing out)
//! fail with [`WorkspaceError::PathEscape`] before anything touches the
//! filesystem.

use std::fs;
use std::path::{Component, Path, PathBuf};

use serde::Serialize;

use crate::errors::WorkspaceError;

/// Receipt for a successful write.
#[derive(Debug, Clone, Serialize)]
pub struct WriteReceipt {
    pub path: String,
    pub size: usize,
}

/// Contents of a read file.
#[derive(Debug, Clone, Serialize)]
pub struct FileContents {
    pub path: String,
    pub size: usize,
    pub content: String,
}

/// One entry in a workspace listing.
#[derive(Debug, Clone, Serialize)]
pub struct FileEntry {
    pub path: String,
    pub size: u64,
}

/// A sandboxed filesystem root, exclusively owned by one session.
#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    /// Create (if needed) and canonicalize the workspace root.
    pub fn new(root: impl AsRef<Path>) -> Result<Self, WorkspaceError> {
        let root = root.as_ref();
        fs::create_dir_all(root).map_err(|e| WorkspaceError::Io {
            path: root.to_path_buf(),
            source: e,
        })?;
        let root = root.canonicalize().map_err(|e| WorkspaceError::Io {
            path: root.to_path_buf(),
            source: e,
        })?;
        Ok(Self { root })
    }

    /// The canonical root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a path to an absolute location inside the root.
    ///
    /// Leading `./` and `/` are stripped, so both `"src/main.py"` and
    /// `"/src/main.py"` name the same file. `..` components are normalized
    /// lexically and rejected when they would climb above the root; if any
    /// ancestor of the result already exists, it is canonicalized and
    /// re-checked so a symlink inside the workspace cannot point outside it.
    pub fn resolve(&self, path: &str) -> Result<PathBuf, WorkspaceError> {
        let mut trimmed = path.trim();
        loop {
            if let Some(rest) = trimmed.strip_prefix("./") {
                trimmed = rest;
            } else if let Some(rest) = trimmed.strip_prefix('/') {
                trimmed = rest;
            } else {
                break;
            }
        }

        let mut resolved = self.root.clone();
        let mut depth: usize = 0;
        for component in Path::new(trimmed).components() {
            match component {
                Component::Normal(part) => {
                    resolved.push(part);
                    depth += 1;
                }
                Component::CurDir => {}
                Component::ParentDir => {
                    if depth == 0 {
                        return Err(WorkspaceError::PathEscape(path.to_string()));
                    }
                    resolved.pop();
                    depth -= 1;
                }
                // Prefix/RootDir cannot appear after the strip above.
                _ => return Err(WorkspaceError::PathEscape(path.to_string())),
            }
        }

        // Symlink check: canonicalize the nearest existing ancestor and make
        // sure it still lives under the root.
        let mut existing = resolved.clone();
        while !existing.exists() {
            if !existing.pop() {
                break;
            }
        }
        if existing.exists() {
            let canonical = existing.canonicalize().map_err(|e| WorkspaceError::Io {
                path: existing.clone(),
                source: e,
            })?;
            if canonical != self.root && !canonical.starts_with(&self.root) {
                return Err(WorkspaceError::PathEscape(path.to_string()));
            }
        }

        Ok(resolved)
    }

    /// Workspace-relative display form of a resolved path.
    fn relative(&self, resolved: &Path) -> String {
        resolved
            .strip_prefix(&self.root)
            .unwrap_or(resolved)
            .to_string_lossy()
            .to_string()
    }

    /// Write a file, creating parent directories as needed.
    ///
    /// With `overwrite == false` an existing target is an error.
    pub fn write(
        &self,
        path: &str,
        content: &str,
        overwrite: bool,
    ) -> Result<WriteReceipt, WorkspaceError> {
        let target = self.resolve(path)?;
        let rel = self.relative(&target);

        if !overwrite && target.exists() {
            return Err(WorkspaceError::AlreadyExists(rel));
        }

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|e| WorkspaceError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        fs::write(&target, content).map_err(|e| WorkspaceError::Io {
            path: target.clone(),
            source: e,
        })?;

        Ok(WriteReceipt {
            path: rel,
            size: content.len(),
        })
    }

    /// Read a file's contents.
    pub fn read(&self, path: &str) -> Result<FileContents, WorkspaceError> {
        let target = self.resolve(path)?;
        let rel = self.relative(&target);

        if !target.is_file() {
            return Err(WorkspaceError::NotFound(rel));
        }

        let content = fs::read_to_string(&target).map_err(|e| WorkspaceError::Io {
            path: target.clone(),
            source: e,
        })?;

        Ok(FileContents {
            size: content.len(),
            path: rel,
            content,
        })
    }

    /// List regular files under the root in lexicographic order.
    ///
    /// `pattern` filters by a glob over the workspace-relative path (e.g.
    /// `"src/*.py"`); results are truncated at `max_results`.
    pub fn list(
        &self,
        pattern: Option<&str>,
        max_results: usize,
    ) -> Result<Vec<FileEntry>, WorkspaceError> {
        let matcher = match pattern {
            Some(p) => Some(
                glob::Pattern::new(p)
                    .map_err(|e| WorkspaceError::NotFound(format!("bad pattern '{}': {}", p, e)))?,
            ),
            None => None,
        };

        let mut entries = Vec::new();
        self.collect_files(&self.root, &mut entries)?;
        entries.sort_by(|a, b| a.path.cmp(&b.path));

        let filtered: Vec<FileEntry> = entries
            .into_iter()
            .filter(|entry| {
                matcher
                    .as_ref()
                    .map(|m| m.matches(&entry.path))
                    .unwrap_or(true)
            })
            .take(max_results)
            .collect();

        Ok(filtered)
    }

    fn collect_files(&self, dir: &Path, out: &mut Vec<FileEntry>) -> Result<(), WorkspaceError> {
        let read_dir = fs::read_dir(dir).map_err(|e| WorkspaceError::Io {
            path: dir.to_path_buf(),
            source: e,
        })?;
        for entry in read_dir {
            let entry = entry.map_err(|e| WorkspaceError::Io {
                path: dir.to_path_buf(),
                source: e,
            })?;
            let path = entry.path();
            if path.is_dir() {
                self.collect_files(&path, out)?;
            } else if path.is_file() {
                let size = entry.metadata().map(|m| m.len()).unwrap_or(0);
                out.push(FileEntry {
                    path: self.relative(&path),
                    size,
                });
            }
        }
        Ok(())
    }

    /// Depth-indented text tree of the workspace, truncated at `max_lines`.
    pub fn describe(&self, max_lines: usize) -> Result<String, WorkspaceError> {
        let mut lines = Vec::new();
        self.describe_dir(&self.root, 0, &mut lines)?;

        if lines.is_empty() {
            return Ok("(workspace is empty)".to_string());
        }

        let total = lines.len();
        if total > max_lines {
            lines.truncate(max_lines);
            lines.push(format!("... ({} more entries)", total - max_lines));
        }
        Ok(lines.join("\n"))
    }

    fn describe_dir(
        &self,
        dir: &Path,
        depth: usize,
        out: &mut Vec<String>,
    ) -> Result<(), WorkspaceError> {
        let read_dir = fs::read_dir(dir).map_err(|e| WorkspaceError::Io {
            path: dir.to_path_buf(),
            source: e,
        })?;
        let mut children: Vec<PathBuf> = read_dir
            .filter_map(|e| e.ok().map(|e| e.path()))
            .collect();
        children.sort();

        let indent = "  ".repeat(depth);
        for child in children {
            let name = child
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            if child.is_dir() {
                out.push(format!("{}{}/", indent, name));
                self.describe_dir(&child, depth + 1, out)?;
            } else {
                out.push(format!("{}{}", indent, name));
            }
        }
        Ok(())
    }
}
