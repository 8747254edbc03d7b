use crate::plan::PathPlanner;
use crate::transfer::error::{Error, ErrorKind, Result, Stage};
use crate::transfer::{Status, TransferOutcome};
use crate::{Context, ConversionFallback, ImportItem, ImportOptions};
use derive_more::Display;
use exn::{OptionExt, ResultExt};
use photo_import_tools::{ConverterHandle, DngSettings};
use std::io;
use std::ops::Deref;
use std::path::{Path, PathBuf};
use tempfile::TempPath;
use tokio::fs;
use tracing::instrument;

/// Prefix of the hidden temporary files and directories created next to a
/// destination while it is being written.
const STAGING_PREFIX: &str = ".photo-import-";

/// Where a transfer is. Only used for tracing; the final state is recorded as
/// a [`Status`].
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq)]
enum TransferState {
    #[display("copying")]
    Copying,
    #[display("converting")]
    Converting,
    #[display("verifying")]
    Verifying,
    #[display("done")]
    Done,
    #[display("failed")]
    Failed,
}

/// Copies or converts `item` to `destination`, then deletes the original if
/// `options` ask for it.
///
/// `destination` must have been claimed from `planner`, which is consulted
/// again only when a failed conversion falls back to a plain copy.
///
/// The original is deleted only after the written file has been verified. A
/// file is never written to its final path partially: copies are persisted
/// from a temporary file, and conversions happen in a staging directory next
/// to the destination.
#[instrument(skip_all, fields(source = %item.source.display()))]
pub async fn transfer(
    ctx: &Context,
    planner: &PathPlanner,
    item: ImportItem,
    destination: PathBuf,
    options: &ImportOptions,
) -> TransferOutcome {
    let (status, destination, fallback_error) = match planner.converts(&item, options) {
        false => match copy_file(&item.source, &destination).await {
            Ok(()) => (Status::Copied, destination, None),
            Err(e) => return failed(item, destination, e),
        },
        true => match convert_file(ctx.converter.as_ref(), &item.source, &destination, &options.dng_settings()).await {
            Ok(()) => (Status::Converted, destination, None),
            Err(e) if ctx.fallback == ConversionFallback::Copy && matches!(e.deref(), ErrorKind::Conversion { .. }) => {
                tracing::warn!(error = %e.deref(), "Conversion failed; copying the original instead");
                let fallback = match planner.resolve_original(&item, options).await {
                    Ok(path) => path,
                    Err(plan) => return failed(item, destination, plan),
                };
                match copy_file(&item.source, &fallback).await {
                    Ok(()) => (Status::Copied, fallback, Some(e)),
                    Err(copy) => return failed(item, fallback, copy),
                }
            },
            Err(e) => return failed(item, destination, e),
        },
    };
    tracing::debug!(state = %TransferState::Done, %status, destination = %destination.display());

    let fell_back = fallback_error.is_some();
    let (original_deleted, error) = match options.delete_original {
        false => (false, fallback_error),
        true => match fs::remove_file(&item.source).await.or_raise(|| ErrorKind::Io(Stage::Delete)) {
            Ok(()) => (true, fallback_error),
            Err(e) => (false, Some(delete_failed(fallback_error, e))),
        },
    };
    TransferOutcome { item, destination: Some(destination), status, error, original_deleted, fell_back }
}

/// Error kept by a verified transfer whose original could not be deleted. The
/// conversion error behind a fallback explains `fell_back` and wins; the
/// deletion error is then only logged.
fn delete_failed(fallback: Option<Error>, delete: Error) -> Error {
    tracing::warn!(error = ?delete, "Could not delete original after a verified transfer");
    fallback.unwrap_or(delete)
}

fn failed(item: ImportItem, destination: PathBuf, error: Error) -> TransferOutcome {
    tracing::error!(
        state = %TransferState::Failed,
        destination = %destination.display(),
        error = ?error,
        "Transfer failed"
    );
    TransferOutcome::failed(item, Some(destination), error)
}

/// Size of `source`, and creates the directory `destination` goes in.
async fn prepare(source: &Path, destination: &Path) -> Result<(u64, PathBuf)> {
    let metadata = fs::metadata(source).await.or_raise(|| ErrorKind::Io(Stage::Read))?;
    if !metadata.is_file() {
        exn::bail!(ErrorKind::Io(Stage::Read));
    }
    let directory = destination.parent().ok_or_raise(|| ErrorKind::Io(Stage::CreateDir))?.to_path_buf();
    fs::create_dir_all(&directory).await.or_raise(|| ErrorKind::Io(Stage::CreateDir))?;
    Ok((metadata.len(), directory))
}

async fn copy_file(source: &Path, destination: &Path) -> Result<()> {
    let (expected, directory) = prepare(source, destination).await?;
    tracing::debug!(state = %TransferState::Copying, destination = %destination.display());
    let (from, to) = (source.to_path_buf(), destination.to_path_buf());
    let written = tokio::task::spawn_blocking(move || copy_blocking(&from, &directory, &to))
        .await
        .or_raise(|| ErrorKind::Io(Stage::Copy))??;
    if written != expected {
        tracing::warn!(expected, written, "Source changed size while it was being copied");
    }
    verify(destination, expected).await
}

/// Streams `source` into a temporary file inside `directory`, syncs it, then
/// persists it at `destination` unless something already exists there.
fn copy_blocking(source: &Path, directory: &Path, destination: &Path) -> Result<u64> {
    let mut reader = std::fs::File::open(source).or_raise(|| ErrorKind::Io(Stage::Read))?;
    let mut staged = tempfile::Builder::new()
        .prefix(STAGING_PREFIX)
        .suffix(".part")
        .tempfile_in(directory)
        .or_raise(|| ErrorKind::Io(Stage::Copy))?;
    let written = io::copy(&mut reader, staged.as_file_mut()).or_raise(|| ErrorKind::Io(Stage::Copy))?;
    staged.as_file().sync_all().or_raise(|| ErrorKind::Io(Stage::Copy))?;
    // Dropping the rejected temporary file deletes it.
    staged.persist_noclobber(destination).map_err(|e| e.error).or_raise(|| ErrorKind::Io(Stage::Rename))?;
    Ok(written)
}

async fn convert_file(
    converter: Option<&ConverterHandle>,
    source: &Path,
    destination: &Path,
    settings: &DngSettings,
) -> Result<()> {
    let converter = converter.ok_or_raise(|| ErrorKind::Conversion {
        reason: "no converter configured".into(),
        exit_code: None,
    })?;
    let (_, directory) = prepare(source, destination).await?;
    // Same filesystem as the destination, so the final move is a rename.
    let staging = tempfile::Builder::new()
        .prefix(STAGING_PREFIX)
        .tempdir_in(&directory)
        .or_raise(|| ErrorKind::Io(Stage::Convert))?;

    tracing::debug!(state = %TransferState::Converting, converter = converter.name());
    let produced = converter.convert(source, staging.path(), settings).await.map_err(|e| {
        let kind = ErrorKind::Conversion { reason: e.deref().to_string(), exit_code: e.exit_code() };
        e.raise(kind)
    })?;

    tracing::debug!(state = %TransferState::Verifying, produced = %produced.display());
    let size = match fs::metadata(&produced).await {
        Ok(metadata) => metadata.len(),
        Err(e) => {
            return Err(e).or_raise(|| ErrorKind::VerificationFailed("converter output is missing".into()));
        },
    };
    if size == 0 {
        exn::bail!(ErrorKind::VerificationFailed("converter produced an empty file".into()));
    }
    move_noclobber(produced, destination).await?;
    verify(destination, size).await?;
    if let Err(e) = staging.close() {
        tracing::debug!(error = %e, "Could not remove staging directory");
    }
    Ok(())
}

/// Moves `from` to `to`, failing instead of replacing anything that exists
/// at `to` by the time of the move.
async fn move_noclobber(from: PathBuf, to: &Path) -> Result<()> {
    let to = to.to_path_buf();
    tokio::task::spawn_blocking(move || TempPath::from_path(from).persist_noclobber(to).map_err(|e| e.error))
        .await
        .or_raise(|| ErrorKind::Io(Stage::Rename))?
        .or_raise(|| ErrorKind::Io(Stage::Rename))
}

/// Checks the file at `destination` has the `expected` size. A mismatching
/// file is removed so that it cannot be mistaken for a good import.
async fn verify(destination: &Path, expected: u64) -> Result<()> {
    tracing::debug!(state = %TransferState::Verifying, destination = %destination.display());
    let actual = fs::metadata(destination).await.or_raise(|| ErrorKind::Io(Stage::Verify))?.len();
    if actual != expected {
        _ = fs::remove_file(destination).await;
        exn::bail!(ErrorKind::VerificationFailed(format!("expected {expected} bytes, found {actual}")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use photo_import_tools::MockConverter;
    use std::sync::Arc;

    fn staged_files(directory: &Path) -> Vec<String> {
        std::fs::read_dir(directory)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .filter(|name| name.starts_with(STAGING_PREFIX))
            .collect()
    }

    #[tokio::test]
    async fn test_copy_creates_directories() {
        let temp_dir = tempfile::tempdir().unwrap();
        let source = temp_dir.path().join("IMG_0001.CR2");
        std::fs::write(&source, b"raw").unwrap();
        let destination = temp_dir.path().join("out/2024/IMG_0001.CR2");

        copy_file(&source, &destination).await.unwrap();
        assert_eq!(std::fs::read(&destination).unwrap(), b"raw");
        assert!(staged_files(destination.parent().unwrap()).is_empty());
    }

    #[tokio::test]
    async fn test_copy_never_clobbers() {
        let temp_dir = tempfile::tempdir().unwrap();
        let source = temp_dir.path().join("IMG_0001.CR2");
        let destination = temp_dir.path().join("taken.CR2");
        std::fs::write(&source, b"new").unwrap();
        std::fs::write(&destination, b"old").unwrap();

        let err = copy_file(&source, &destination).await.unwrap_err();
        assert!(matches!(err.deref(), ErrorKind::Io(Stage::Rename)));
        assert_eq!(std::fs::read(&destination).unwrap(), b"old");
        assert!(staged_files(temp_dir.path()).is_empty());
    }

    #[tokio::test]
    async fn test_copy_rejects_directory_source() {
        let temp_dir = tempfile::tempdir().unwrap();
        let err = copy_file(temp_dir.path(), &temp_dir.path().join("out/x")).await.unwrap_err();
        assert!(matches!(err.deref(), ErrorKind::Io(Stage::Read)));
    }

    #[tokio::test]
    async fn test_verify_removes_mismatched_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let destination = temp_dir.path().join("short.CR2");
        std::fs::write(&destination, b"abc").unwrap();

        let err = verify(&destination, 10).await.unwrap_err();
        assert!(matches!(err.deref(), ErrorKind::VerificationFailed(_)));
        assert!(!destination.exists());
    }

    #[tokio::test]
    async fn test_convert_without_converter() {
        let temp_dir = tempfile::tempdir().unwrap();
        let source = temp_dir.path().join("IMG_0001.CR2");
        std::fs::write(&source, b"raw").unwrap();
        let err = convert_file(None, &source, &temp_dir.path().join("IMG_0001.dng"), &DngSettings::default())
            .await
            .unwrap_err();
        assert!(matches!(err.deref(), ErrorKind::Conversion { exit_code: None, .. }));
    }

    #[tokio::test]
    async fn test_convert_never_clobbers() {
        let temp_dir = tempfile::tempdir().unwrap();
        let source = temp_dir.path().join("IMG_0001.CR2");
        let destination = temp_dir.path().join("IMG_0001.dng");
        std::fs::write(&source, b"raw").unwrap();
        std::fs::write(&destination, b"old").unwrap();

        let converter: ConverterHandle = Arc::new(MockConverter::new());
        let err = convert_file(Some(&converter), &source, &destination, &DngSettings::default()).await.unwrap_err();
        assert!(matches!(err.deref(), ErrorKind::Io(Stage::Rename)));
        assert_eq!(std::fs::read(&destination).unwrap(), b"old");
        assert!(staged_files(temp_dir.path()).is_empty());
    }

    #[tokio::test]
    async fn test_move_noclobber() {
        let temp_dir = tempfile::tempdir().unwrap();
        let (from, to) = (temp_dir.path().join("produced.dng"), temp_dir.path().join("final.dng"));
        std::fs::write(&from, b"dng").unwrap();

        move_noclobber(from.clone(), &to).await.unwrap();
        assert!(!from.exists());
        assert_eq!(std::fs::read(&to).unwrap(), b"dng");

        std::fs::write(&from, b"second").unwrap();
        let err = move_noclobber(from, &to).await.unwrap_err();
        assert!(matches!(err.deref(), ErrorKind::Io(Stage::Rename)));
        assert_eq!(std::fs::read(&to).unwrap(), b"dng");
    }

    #[test]
    fn test_delete_failure_keeps_conversion_error() {
        let conversion = || Error::new(ErrorKind::Conversion { reason: "exit 3".into(), exit_code: Some(3) });
        let delete = || Error::new(ErrorKind::Io(Stage::Delete));

        let kept = delete_failed(Some(conversion()), delete());
        assert!(matches!(kept.deref(), ErrorKind::Conversion { exit_code: Some(3), .. }));
        let kept = delete_failed(None, delete());
        assert_eq!(kept.stage(), Some(Stage::Delete));
    }
}
