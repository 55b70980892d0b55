// # File Hosts Store
//
// File-based implementation of HostsStore with crash-safe atomic writes.
//
// ## Managed block
//
// The store owns exactly the region of the file between the two marker
// lines. Everything outside the markers is foreign content owned by other
// writers and is carried through every rewrite byte-for-byte.
//
// ## Crash safety
//
// Every write builds the complete new file content, writes it to a
// temporary file in the same directory, flushes and syncs it, then renames
// it over the target. A reader never observes a torn file; a crash before
// the rename leaves the original untouched.
//
// ## File format
//
// ```text
// 127.0.0.1 localhost          <- foreign content, preserved
// # Begin hostsync
// 172.18.0.2	web
// 172.18.0.2	web-server
// # End hostsync
// ::1 ip6-localhost            <- foreign content, preserved
// ```

use async_trait::async_trait;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, trace, warn};

use crate::Error;
use crate::model::HostEntry;
use crate::traits::HostsStore;

/// Start marker of the managed block
pub const BEGIN_MARKER: &str = "# Begin hostsync";

/// End marker of the managed block
pub const END_MARKER: &str = "# End hostsync";

/// Hosts file split around its managed block.
///
/// `before` and `after` hold raw file bytes including line terminators, so
/// reassembling `before + block + after` preserves foreign content exactly.
#[derive(Debug, Default)]
struct ParsedFile {
    before: String,
    block_lines: Vec<String>,
    after: String,
    has_block: bool,
}

/// File-backed hosts store
///
/// # Example
///
/// ```rust,no_run
/// use hostsync_core::store::FileHostsStore;
/// use hostsync_core::traits::HostsStore;
/// use hostsync_core::model::HostEntry;
/// use std::collections::BTreeSet;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = FileHostsStore::new("/etc/hosts");
///
///     let mut entries = BTreeSet::new();
///     entries.insert(HostEntry::new("172.18.0.2".parse()?, "web"));
///     store.write_entries(&entries).await?;
///
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct FileHostsStore {
    path: PathBuf,
}

impl FileHostsStore {
    /// Create a store for the given hosts file path.
    ///
    /// The file does not need to exist yet; the first write creates it.
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Path of the managed file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the current file content, treating a missing file as empty.
    async fn read_content(&self) -> Result<String, Error> {
        match fs::read_to_string(&self.path).await {
            Ok(content) => Ok(content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "hosts file does not exist yet");
                Ok(String::new())
            }
            Err(e) => Err(Error::store(format!(
                "failed to read {}: {}",
                self.path.display(),
                e
            ))),
        }
    }

    /// Split file content around the managed block.
    fn parse(content: &str) -> ParsedFile {
        let mut parsed = ParsedFile::default();
        let mut section = Section::Before;

        for line in content.split_inclusive('\n') {
            let trimmed = line.trim_end_matches(['\n', '\r']);
            match section {
                Section::Before => {
                    if trimmed == BEGIN_MARKER {
                        section = Section::Block;
                        parsed.has_block = true;
                    } else {
                        parsed.before.push_str(line);
                    }
                }
                Section::Block => {
                    if trimmed == END_MARKER {
                        section = Section::After;
                    } else {
                        parsed.block_lines.push(trimmed.to_string());
                    }
                }
                Section::After => parsed.after.push_str(line),
            }
        }

        if parsed.has_block && section == Section::Block {
            // Unterminated block (end marker lost): consume to end of file
            // so the rewrite restores a well-formed marker pair.
            warn!("managed block is missing its end marker, reclaiming to end of file");
        }

        parsed
    }

    /// Assemble the new file content for the given desired entry set.
    fn render(parsed: &ParsedFile, entries: Option<&BTreeSet<HostEntry>>) -> String {
        let mut content = String::with_capacity(parsed.before.len() + parsed.after.len() + 256);
        content.push_str(&parsed.before);

        if let Some(entries) = entries {
            if !content.is_empty() && !content.ends_with('\n') {
                content.push('\n');
            }
            content.push_str(BEGIN_MARKER);
            content.push('\n');
            for entry in entries {
                content.push_str(&entry.to_line());
                content.push('\n');
            }
            content.push_str(END_MARKER);
            content.push('\n');
        }

        content.push_str(&parsed.after);
        content
    }

    /// Commit new content atomically: temp file, flush, sync, rename.
    async fn commit(&self, content: &str) -> Result<(), Error> {
        let temp_path = self.temp_path();

        {
            let mut file = fs::File::create(&temp_path).await.map_err(|e| {
                Error::store(format!(
                    "failed to create temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;

            file.write_all(content.as_bytes()).await.map_err(|e| {
                Error::store(format!(
                    "failed to write temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;

            file.flush().await.map_err(|e| {
                Error::store(format!(
                    "failed to flush temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;

            file.sync_all().await.map_err(|e| {
                Error::store(format!(
                    "failed to sync temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;
        }

        fs::rename(&temp_path, &self.path).await.map_err(|e| {
            Error::store(format!(
                "failed to rename {} to {}: {}",
                temp_path.display(),
                self.path.display(),
                e
            ))
        })?;

        trace!(path = %self.path.display(), "hosts file committed");
        Ok(())
    }

    /// Path of the temporary file used for atomic writes.
    ///
    /// Lives in the same directory as the target so the rename cannot
    /// cross a filesystem boundary.
    fn temp_path(&self) -> PathBuf {
        let mut temp = self.path.clone();
        temp.as_mut_os_string().push(".tmp");
        temp
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Before,
    Block,
    After,
}

#[async_trait]
impl HostsStore for FileHostsStore {
    async fn read_entries(&self) -> Result<Vec<HostEntry>, Error> {
        let content = self.read_content().await?;
        let parsed = Self::parse(&content);

        let entries = parsed
            .block_lines
            .iter()
            .filter_map(|line| HostEntry::parse_line(line))
            .collect();
        Ok(entries)
    }

    async fn write_entries(&self, entries: &BTreeSet<HostEntry>) -> Result<(), Error> {
        let content = self.read_content().await?;
        let parsed = Self::parse(&content);

        let new_content = Self::render(&parsed, Some(entries));
        self.commit(&new_content).await?;

        debug!(
            path = %self.path.display(),
            entries = entries.len(),
            "managed block rewritten"
        );
        Ok(())
    }

    async fn clear(&self) -> Result<(), Error> {
        let content = self.read_content().await?;
        let parsed = Self::parse(&content);

        if !parsed.has_block {
            return Ok(());
        }

        let new_content = Self::render(&parsed, None);
        self.commit(&new_content).await?;

        debug!(path = %self.path.display(), "managed block removed");
        Ok(())
    }
}
