//! Directory listing with filtering and sorting

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::io;
use std::path::Path;
use std::time::UNIX_EPOCH;

/// One entry of a directory listing
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileInfo {
    pub name: String,
    pub is_dir: bool,
    pub size: u64,
    /// Modification time as fractional Unix seconds
    pub modified: f64,
}

/// Query string of `GET /files`
#[derive(Debug, Clone, Deserialize)]
pub struct ListQuery {
    /// Case-insensitive substring filter on names
    #[serde(default)]
    pub q: String,
    #[serde(default = "default_sort")]
    pub sort: String,
    #[serde(default = "default_order")]
    pub order: String,
    /// Directory relative to the file root
    #[serde(default)]
    pub path: String,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            q: String::new(),
            sort: default_sort(),
            order: default_order(),
            path: String::new(),
        }
    }
}

fn default_sort() -> String {
    "name".to_string()
}

fn default_order() -> String {
    "asc".to_string()
}

/// List `dir`, skipping hidden entries
///
/// Unknown sort keys keep the order the filesystem returned.
pub async fn list_directory(dir: &Path, query: &ListQuery) -> io::Result<Vec<FileInfo>> {
    let needle = query.q.to_lowercase();
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut files = Vec::new();

    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with('.') || !name.to_lowercase().contains(&needle) {
            continue;
        }

        // Follow symlinks so links report their target's metadata
        let metadata = match tokio::fs::metadata(entry.path()).await {
            Ok(m) => m,
            Err(e) => {
                tracing::debug!("Skipping {}: {}", name, e);
                continue;
            }
        };

        let modified = metadata
            .modified()
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map(|d| d.as_secs_f64())
            .unwrap_or_default();

        files.push(FileInfo {
            name,
            is_dir: metadata.is_dir(),
            size: metadata.len(),
            modified,
        });
    }

    let descending = query.order == "desc";
    let compare: Option<fn(&FileInfo, &FileInfo) -> Ordering> = match query.sort.as_str() {
        "name" => Some(by_name),
        "modified" => Some(by_modified),
        _ => None,
    };

    if let Some(compare) = compare {
        if descending {
            files.sort_by(|a, b| compare(b, a));
        } else {
            files.sort_by(compare);
        }
    }

    Ok(files)
}

fn by_name(a: &FileInfo, b: &FileInfo) -> Ordering {
    a.name.cmp(&b.name)
}

fn by_modified(a: &FileInfo, b: &FileInfo) -> Ordering {
    a.modified.total_cmp(&b.modified)
}
