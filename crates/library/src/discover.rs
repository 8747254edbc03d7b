//! Finding importable photos below a source directory.

use crate::error::{ErrorKind, Result};
use crate::{Context, ImportItem};
use async_stream::stream;
use exn::ResultExt;
use futures::{Stream, StreamExt, TryStreamExt};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::instrument;

enum WalkEntry {
    File(PathBuf),
    Descend(PathBuf),
    Skip,
}

/// Streams an [`ImportItem`] for every importable photo below `root`, sorted
/// by path.
///
/// Hidden files and directories (leading `.`) are skipped, as is anything
/// whose extension is not in [`Context::raw_formats`]. Symlinks are not
/// followed. Each photo is hashed and, when [`Context::exiftool`] is set,
/// probed for its capture date; up to [`Context::concurrency`] files are
/// described at once.
///
/// Directories that cannot be read are yielded as errors without ending the
/// stream.
pub fn discover<'a>(ctx: &'a Context, root: impl Into<PathBuf>) -> impl Stream<Item = Result<ImportItem>> + 'a {
    let root = root.into();
    stream! {
        let mut candidates = Vec::new();
        for await found in walk(ctx, root) {
            match found {
                Ok(path) => candidates.push(path),
                Err(e) => yield Err(e),
            }
        }
        candidates.sort();
        tracing::debug!(count = candidates.len(), "Discovered importable files");

        let mut described = futures::stream::iter(candidates)
            .map(|path| describe(ctx, path))
            .buffered(ctx.effective_concurrency());
        while let Some(item) = described.next().await {
            yield item;
        }
    }
}

/// Collects [`discover`], failing on the first unreadable directory or file.
pub async fn discover_all(ctx: &Context, root: impl Into<PathBuf>) -> Result<Vec<ImportItem>> {
    discover(ctx, root).try_collect().await
}

/// Builds the [`ImportItem`] for a single file: content hash plus capture date.
///
/// A failed date probe is logged and leaves the date empty.
#[instrument(skip_all, fields(path = %path.display()))]
pub async fn describe(ctx: &Context, path: PathBuf) -> Result<ImportItem> {
    let hash = hash_file(path.clone()).await?;
    let captured_at = match &ctx.exiftool {
        Some(exiftool) => match exiftool.shot_date(&path).await {
            Ok(date) => date,
            Err(e) => {
                tracing::warn!(error = ?e, "Could not read capture date");
                None
            },
        },
        None => None,
    };
    Ok(ImportItem::new(path, captured_at, hash))
}

fn walk<'a>(ctx: &'a Context, root: PathBuf) -> impl Stream<Item = Result<PathBuf>> + 'a {
    let mut stack = vec![root];
    stream! {
        'dirs: while let Some(current) = stack.pop() {
            let mut entries = match fs::read_dir(&current).await {
                Ok(entries) => entries,
                Err(e) => {
                    yield Err(e).or_raise(|| ErrorKind::ReadDir(current.clone()));
                    continue 'dirs;
                },
            };
            loop {
                let entry = match entries.next_entry().await {
                    Ok(Some(entry)) => entry,
                    Ok(None) => break,
                    Err(e) => {
                        yield Err(e).or_raise(|| ErrorKind::ReadDir(current.clone()));
                        break;
                    },
                };
                match classify(ctx, &entry).await {
                    WalkEntry::File(path) => yield Ok(path),
                    WalkEntry::Descend(path) => stack.push(path),
                    WalkEntry::Skip => {},
                }
            }
        }
    }
}

async fn classify(ctx: &Context, entry: &fs::DirEntry) -> WalkEntry {
    let path = entry.path();
    if is_hidden(&path) {
        return WalkEntry::Skip;
    }
    match entry.file_type().await {
        Ok(kind) if kind.is_dir() => WalkEntry::Descend(path),
        Ok(kind) if kind.is_file() && ctx.raw_formats.is_importable(&path) => WalkEntry::File(path),
        Ok(_) => WalkEntry::Skip,
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "Skipping entry with unreadable file type");
            WalkEntry::Skip
        },
    }
}

fn is_hidden(path: &Path) -> bool {
    path.file_name().is_some_and(|name| name.as_encoded_bytes().starts_with(b"."))
}

/// BLAKE3 of the file's content, as lower-case hex.
async fn hash_file(path: PathBuf) -> Result<String> {
    let error_path = path.clone();
    tokio::task::spawn_blocking(move || -> std::io::Result<String> {
        let mut hasher = blake3::Hasher::new();
        hasher.update_reader(std::fs::File::open(&path)?)?;
        Ok(hasher.finalize().to_hex().to_string())
    })
    .await
    .or_raise(|| ErrorKind::Hash(error_path.clone()))?
    .or_raise(|| ErrorKind::Hash(error_path))
}
