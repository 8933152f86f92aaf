// Copyright (c) The simtest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Resolving the photo (checkpoint) a test case restarts from.
//!
//! Photos live in a small set of conventional directories inside a test case's working directory.
//! A [`CheckpointPolicy`] names a photo either directly, by model number, or leaves the choice to
//! the `auto` heuristic: the third-most-recent photo, or the oldest if fewer than three exist. The
//! most recent photos may still have been in flight when the run stopped.

use crate::{catalog::CheckpointPolicy, errors::TestCaseSetupError};
use camino::{Utf8Path, Utf8PathBuf};
use std::{io, time::SystemTime};
use tracing::debug;

/// A photo found on disk.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PhotoFile {
    dir: Utf8PathBuf,
    file_name: String,
}

impl PhotoFile {
    /// Returns the file name of the photo, which is what the restart program is passed.
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Returns the full path to the photo.
    pub fn path(&self) -> Utf8PathBuf {
        self.dir.join(&self.file_name)
    }
}

/// Resolves `policy` to a photo under `work_dir`.
///
/// Returns `Ok(None)` if the policy doesn't request a restart or if no matching photo exists.
/// Directories that don't exist are treated as empty.
pub fn resolve_photo<'a>(
    work_dir: &Utf8Path,
    photo_dirs: impl IntoIterator<Item = &'a str> + Clone,
    policy: &CheckpointPolicy,
) -> Result<Option<PhotoFile>, TestCaseSetupError> {
    match policy {
        CheckpointPolicy::None => Ok(None),
        CheckpointPolicy::Named(id) => Ok(find_named(work_dir, photo_dirs, [id.as_str()])),
        CheckpointPolicy::NumericIndex(n) => {
            let candidates = [n.to_string(), format!("x{n}"), format!("x{:03}", n % 1000)];
            Ok(find_named(
                work_dir,
                photo_dirs,
                candidates.iter().map(String::as_str),
            ))
        }
        CheckpointPolicy::Auto => {
            let candidates = list_photos(work_dir, photo_dirs)?;
            debug!(
                "found {} {} for auto restart in {work_dir}",
                candidates.len(),
                crate::helpers::plural::files_str(candidates.len()),
            );
            Ok(select_auto(candidates))
        }
    }
}

/// Removes every file inside the photo directories under `work_dir`, leaving the directories.
pub(crate) fn clear_photos<'a>(
    work_dir: &Utf8Path,
    photo_dirs: impl IntoIterator<Item = &'a str>,
) -> Result<(), TestCaseSetupError> {
    for dir in photo_dirs {
        let dir = work_dir.join(dir);
        let entries = match dir.read_dir_utf8() {
            Ok(entries) => entries,
            Err(err) if err.kind() == io::ErrorKind::NotFound => continue,
            Err(err) => return Err(TestCaseSetupError::PhotoDirReadFailed { dir, err }),
        };
        for entry in entries {
            let entry = entry.map_err(|err| TestCaseSetupError::PhotoDirReadFailed {
                dir: dir.clone(),
                err,
            })?;
            let path = entry.path();
            if path.is_file() {
                std::fs::remove_file(path).map_err(|err| TestCaseSetupError::CleanRemoveFailed {
                    path: path.to_owned(),
                    err,
                })?;
            }
        }
    }
    Ok(())
}

fn find_named<'a, 'b>(
    work_dir: &Utf8Path,
    photo_dirs: impl IntoIterator<Item = &'a str> + Clone,
    candidates: impl IntoIterator<Item = &'b str>,
) -> Option<PhotoFile> {
    for file_name in candidates {
        for dir in photo_dirs.clone() {
            let dir = work_dir.join(dir);
            if dir.join(file_name).is_file() {
                return Some(PhotoFile {
                    dir,
                    file_name: file_name.to_owned(),
                });
            }
        }
    }
    None
}

#[derive(Clone, Debug)]
struct PhotoCandidate {
    created: SystemTime,
    photo: PhotoFile,
}

fn list_photos<'a>(
    work_dir: &Utf8Path,
    photo_dirs: impl IntoIterator<Item = &'a str>,
) -> Result<Vec<PhotoCandidate>, TestCaseSetupError> {
    let mut candidates = Vec::new();
    for dir in photo_dirs {
        let dir = work_dir.join(dir);
        let entries = match dir.read_dir_utf8() {
            Ok(entries) => entries,
            Err(err) if err.kind() == io::ErrorKind::NotFound => continue,
            Err(err) => return Err(TestCaseSetupError::PhotoDirReadFailed { dir, err }),
        };

        for entry in entries {
            let entry = entry.map_err(|err| TestCaseSetupError::PhotoDirReadFailed {
                dir: dir.clone(),
                err,
            })?;
            let metadata = entry
                .metadata()
                .map_err(|err| TestCaseSetupError::PhotoDirReadFailed {
                    dir: dir.clone(),
                    err,
                })?;
            if !metadata.is_file() {
                continue;
            }

            // Not every filesystem records creation times.
            let created = metadata
                .created()
                .or_else(|_| metadata.modified())
                .unwrap_or(SystemTime::UNIX_EPOCH);
            candidates.push(PhotoCandidate {
                created,
                photo: PhotoFile {
                    dir: dir.clone(),
                    file_name: entry.file_name().to_owned(),
                },
            });
        }
    }
    Ok(candidates)
}

fn select_auto(mut candidates: Vec<PhotoCandidate>) -> Option<PhotoFile> {
    candidates.sort_by(|a, b| {
        a.created
            .cmp(&b.created)
            .then_with(|| a.photo.file_name.cmp(&b.photo.file_name))
    });

    let index = if candidates.len() >= 3 {
        candidates.len() - 3
    } else {
        0
    };
    // Index 0 on an empty list yields None.
    candidates.into_iter().nth(index).map(|c| c.photo)
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino_tempfile::tempdir;
    use std::time::Duration;
    use test_case::test_case;

    const PHOTO_DIRS: [&str; 3] = ["photos", "photos1", "binary_photos"];

    fn candidate(name: &str, secs: u64) -> PhotoCandidate {
        PhotoCandidate {
            created: SystemTime::UNIX_EPOCH + Duration::from_secs(secs),
            photo: PhotoFile {
                dir: "photos".into(),
                file_name: name.to_owned(),
            },
        }
    }

    #[test_case(&[("x100", 1), ("x200", 2), ("x300", 3), ("x400", 4)], Some("x200"); "four picks second oldest")]
    #[test_case(&[("x300", 3), ("x100", 1), ("x200", 2)], Some("x100"); "three picks oldest")]
    #[test_case(&[("x200", 2), ("x100", 1)], Some("x100"); "two picks oldest")]
    #[test_case(&[("x100", 1)], Some("x100"); "one picks only")]
    #[test_case(&[], None; "none")]
    #[test_case(&[("b", 5), ("a", 5), ("c", 5), ("d", 5)], Some("b"); "ties broken by name")]
    fn auto_selection(files: &[(&str, u64)], expected: Option<&str>) {
        let candidates = files
            .iter()
            .map(|&(name, secs)| candidate(name, secs))
            .collect();
        let selected = select_auto(candidates);
        assert_eq!(selected.as_ref().map(PhotoFile::file_name), expected);
    }

    #[test]
    fn numeric_index_tries_conventional_names() {
        let dir = tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("photos1")).unwrap();
        std::fs::write(dir.path().join("photos1/x050"), b"").unwrap();

        let photo = resolve_photo(dir.path(), PHOTO_DIRS, &CheckpointPolicy::NumericIndex(2050))
            .unwrap()
            .expect("photo found");
        assert_eq!(photo.file_name(), "x050");
        assert_eq!(photo.path(), dir.path().join("photos1/x050"));

        let missing =
            resolve_photo(dir.path(), PHOTO_DIRS, &CheckpointPolicy::NumericIndex(7)).unwrap();
        assert_eq!(missing, None);
    }

    #[test]
    fn named_photo_and_missing_dirs() {
        let dir = tempdir().unwrap();
        let policy = CheckpointPolicy::Named("x100".to_owned());
        assert_eq!(resolve_photo(dir.path(), PHOTO_DIRS, &policy).unwrap(), None);

        std::fs::create_dir_all(dir.path().join("binary_photos")).unwrap();
        std::fs::write(dir.path().join("binary_photos/x100"), b"").unwrap();
        let photo = resolve_photo(dir.path(), PHOTO_DIRS, &policy)
            .unwrap()
            .expect("photo found");
        assert_eq!(photo.path(), dir.path().join("binary_photos/x100"));
    }

    #[test]
    fn auto_with_two_files_on_disk() {
        let dir = tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("photos")).unwrap();
        std::fs::write(dir.path().join("photos/x100"), b"first").unwrap();
        std::thread::sleep(Duration::from_millis(20));
        std::fs::write(dir.path().join("photos/x200"), b"second").unwrap();

        let photo = resolve_photo(dir.path(), PHOTO_DIRS, &CheckpointPolicy::Auto)
            .unwrap()
            .expect("photo found");
        assert_eq!(photo.file_name(), "x100");
    }

    #[test]
    fn clear_photos_keeps_directories() {
        let dir = tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("photos")).unwrap();
        std::fs::write(dir.path().join("photos/x100"), b"").unwrap();

        clear_photos(dir.path(), PHOTO_DIRS).unwrap();
        clear_photos(dir.path(), PHOTO_DIRS).unwrap();
        assert!(dir.path().join("photos").is_dir());
        assert_eq!(dir.path().join("photos").read_dir().unwrap().count(), 0);
    }
}
