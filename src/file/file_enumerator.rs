use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

use crate::logging::syslog::{trace, warn};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EnumeratedFile {
    // Forward-slash separated, relative to the enumerated root
    pub relative_path: String,
    pub full_path: PathBuf,
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.depth() > 0 && entry.file_name().to_str().is_some_and(|name| name.starts_with('.'))
}

/// Lists every regular file below `root`, skipping hidden files and
/// everything inside hidden directories. Entries that cannot be read are
/// logged and skipped; only an unreadable root is an error.
pub fn enumerate_files(root: &Path) -> Result<Vec<EnumeratedFile>, std::io::Error> {
    std::fs::read_dir(root)?;

    let mut files = Vec::new();
    let walker = WalkDir::new(root).follow_links(true).into_iter().filter_entry(|entry| !is_hidden(entry));

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn(format!("Skipping unreadable entry while enumerating {}: {}", root.display(), e));
                continue;
            }
        };

        if !entry.file_type().is_file() {
            continue;
        }

        let relative = match entry.path().strip_prefix(root) {
            Ok(relative) => relative,
            Err(_) => continue,
        };

        let mut segments = Vec::new();
        for component in relative.components() {
            match component.as_os_str().to_str() {
                Some(segment) => segments.push(segment),
                None => {
                    warn(format!("Skipping file with non UTF-8 name: {}", entry.path().display()));
                    segments.clear();
                    break;
                }
            }
        }
        if segments.is_empty() {
            continue;
        }

        files.push(EnumeratedFile {
            relative_path: segments.join("/"),
            full_path: entry.path().to_path_buf(),
        });
    }

    trace(format!("Enumerated {} files below {}", files.len(), root.display()));
    Ok(files)
}
