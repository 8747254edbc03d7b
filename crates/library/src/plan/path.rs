//! Keeps rendered folder names inside the destination root.

use std::path::{Component, Path, PathBuf};

/// Normalizes a relative folder path, resolving `.` and `..` without ever
/// leaving the root it will be joined onto.
///
/// Returns `None` for paths that would escape the root, contain null bytes or
/// a platform prefix, or that normalize to nothing.
pub(crate) fn normalize(path: impl AsRef<Path>) -> Option<PathBuf> {
    let mut components = Vec::new();
    for component in path.as_ref().components() {
        match component {
            Component::Normal(s) => {
                // Null bytes survive Path::components() on Unix but truncate in syscalls.
                if s.as_encoded_bytes().contains(&0) {
                    return None;
                }
                components.push(s)
            },
            Component::CurDir | Component::RootDir => {},
            Component::Prefix(_) => return None,
            Component::ParentDir => {
                components.pop()?;
            },
        }
    }
    match components.is_empty() {
        true => None,
        false => Some(components.into_iter().collect()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("2024/March", Some("2024/March"))]
    #[case("trips//./iceland", Some("trips/iceland"))]
    #[case("/absolute/folder", Some("absolute/folder"))]
    #[case("a/b/..", Some("a"))]
    #[case("wrong/../right/", Some("right"))]
    #[case("../outside", None)]
    #[case("a/../../b", None)]
    #[case(".", None)]
    #[case("", None)]
    #[case("a\0b", None)]
    fn test_normalize(#[case] input: &str, #[case] expected: Option<&str>) {
        assert_eq!(normalize(input), expected.map(PathBuf::from));
    }
}
