//! Native library staging and dependency classification.
//!
//! The repair tools resolve the extension's shared-library dependencies from
//! the build directory, so configured system libraries are copied next to
//! the project before bundling and removed again before the wheel is
//! reinstalled.

use crate::bundler::{Error, Result, error::ErrorExt, utils::fs};
use serde::{Deserialize, Serialize};
use std::io;
use std::path::{Path, PathBuf};

/// File in the dist directory listing the library copies this tool put next
/// to the build. Only names listed here are ever deleted from the project.
pub const STAGED_MANIFEST: &str = ".staged-libraries.json";

/// Location of the staging manifest for a dist directory.
pub fn manifest_path(dist_dir: &Path) -> PathBuf {
    dist_dir.join(STAGED_MANIFEST)
}

/// A library copied into the project directory for bundling.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StagedLibrary {
    /// Where the library was found.
    pub source: PathBuf,
    /// Copy next to the build.
    pub staged: PathBuf,
    /// Whether the file parses as a shared library (Mach-O dylib or ELF DSO).
    pub shared: bool,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct StagedManifest {
    libraries: Vec<String>,
}

/// Copies every match of `patterns` into `dest_dir`.
///
/// Directories are skipped; symlinks are followed. Every pattern must match
/// at least one file. The names of the copies are recorded in `manifest`
/// before anything is copied, so an aborted run can still be cleaned up.
/// A match whose name is already taken in `dest_dir` fails the step instead
/// of overwriting a project file.
pub async fn stage_libraries(
    patterns: &[String],
    dest_dir: &Path,
    manifest: &Path,
) -> Result<Vec<StagedLibrary>> {
    let mut planned = Vec::new();

    for pattern in patterns {
        let mut matched = false;
        for entry in glob::glob(pattern)? {
            let source = entry
                .map_err(io::Error::from)
                .fs_context("reading native library directory", pattern)?;
            if source.is_dir() {
                continue;
            }
            matched = true;

            let file_name = source.file_name().ok_or_else(|| {
                Error::GenericError(format!("Invalid library path: {}", source.display()))
            })?;
            let dest = dest_dir.join(file_name);
            if source != dest && tokio::fs::symlink_metadata(&dest).await.is_ok() {
                return Err(Error::StagingConflict {
                    library: source,
                    existing: dest,
                });
            }

            let shared = is_shared_library(&source).await;
            if !shared {
                log::warn!(
                    "{} is not a shared library; copying it anyway",
                    source.display()
                );
            }
            planned.push(StagedLibrary {
                source,
                staged: dest,
                shared,
            });
        }

        if !matched {
            return Err(Error::NativeLibraryNotFound {
                pattern: pattern.clone(),
            });
        }
    }

    // Libraries already inside the project are used in place and never tracked
    let copies: Vec<&StagedLibrary> = planned.iter().filter(|lib| lib.source != lib.staged).collect();
    let record = StagedManifest {
        libraries: copies
            .iter()
            .filter_map(|lib| lib.staged.file_name())
            .map(|name| name.to_string_lossy().into_owned())
            .collect(),
    };
    write_manifest(manifest, &record).await?;

    for lib in copies {
        tokio::fs::copy(&lib.source, &lib.staged)
            .await
            .fs_context("failed to copy native library", &lib.source)?;
        log::debug!("Staged {} -> {}", lib.source.display(), lib.staged.display());
    }

    Ok(planned)
}

async fn write_manifest(manifest: &Path, record: &StagedManifest) -> Result<()> {
    if let Some(parent) = manifest.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .fs_context("creating manifest directory", parent)?;
    }
    let json = serde_json::to_vec_pretty(record)
        .map_err(|e| Error::GenericError(format!("serializing staging manifest: {}", e)))?;
    tokio::fs::write(manifest, json)
        .await
        .fs_context("writing staging manifest", manifest)
}

async fn read_manifest(manifest: &Path) -> Result<StagedManifest> {
    let bytes = match tokio::fs::read(manifest).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(StagedManifest::default()),
        Err(e) => return Err(e).fs_context("reading staging manifest", manifest),
    };
    serde_json::from_slice(&bytes).map_err(|e| {
        Error::GenericError(format!(
            "corrupt staging manifest {}: {}",
            manifest.display(),
            e
        ))
    })
}

/// Deletes the library copies recorded in `manifest` from `dir`, then the
/// manifest itself.
///
/// Only regular files directly inside `dir` whose names are listed are
/// removed; nothing else in the project is touched.
pub async fn remove_stale_libraries(dir: &Path, manifest: &Path) -> Result<Vec<PathBuf>> {
    let record = read_manifest(manifest).await?;
    if record.libraries.is_empty() {
        fs::remove_file(manifest).await?;
        return Ok(Vec::new());
    }

    let mut removed = Vec::new();
    for entry in walkdir::WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(false)
    {
        let entry = entry.map_err(|e| {
            Error::GenericError(format!("scanning {} for stale libraries: {}", dir.display(), e))
        })?;
        if !entry.file_type().is_file() && !entry.file_type().is_symlink() {
            continue;
        }

        let name = entry.file_name().to_string_lossy();
        if record.libraries.iter().any(|staged| *staged == name) {
            fs::remove_file(entry.path()).await?;
            log::debug!("Removed stale library {}", entry.path().display());
            removed.push(entry.path().to_path_buf());
        }
    }

    fs::remove_file(manifest).await?;
    Ok(removed)
}

/// Whether `path` parses as a Mach-O dylib, fat Mach-O or ELF shared object.
pub async fn is_shared_library(path: &Path) -> bool {
    let Ok(buffer) = tokio::fs::read(path).await else {
        return false;
    };

    match goblin::Object::parse(&buffer) {
        Ok(goblin::Object::Mach(goblin::mach::Mach::Binary(macho))) => {
            macho.header.filetype == goblin::mach::header::MH_DYLIB
        }
        Ok(goblin::Object::Mach(goblin::mach::Mach::Fat(_))) => true,
        Ok(goblin::Object::Elf(elf)) => elf.header.e_type == goblin::elf::header::ET_DYN,
        _ => false,
    }
}

/// Whether a dependency path belongs to the operating system or is already
/// relative to the loading binary.
pub fn is_system_library(path: &str) -> bool {
    path == "self"
        || path.starts_with("/System/")
        || path.starts_with("/usr/lib/")
        || path.starts_with("/usr/lib64/")
        || path.starts_with("/lib/")
        || path.starts_with("/lib64/")
        || path.starts_with("@rpath")
        || path.starts_with("@executable_path")
        || path.starts_with("@loader_path")
}

/// Absolute, non-system library paths in a dependency listing.
///
/// Relative paths point inside the wheel and do not count.
pub fn external_dependencies(listing: &str) -> Vec<String> {
    listing
        .lines()
        .map(str::trim)
        .filter(|line| line.starts_with('/') && !is_system_library(line))
        .map(str::to_string)
        .collect()
}

/// Library name up to the first dot, ignoring an auditwheel hash suffix.
///
/// `libssh2.1.dylib` and `libssh2-5f0a1b2c.so.1` are both `libssh2`.
pub fn library_stem(file_name: &str) -> &str {
    let stem = file_name.split('.').next().unwrap_or(file_name);
    match stem.rsplit_once('-') {
        Some((base, hash))
            if hash.len() == 8 && hash.chars().all(|c| c.is_ascii_hexdigit()) =>
        {
            base
        }
        _ => stem,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_paths_are_not_external() {
        let listing = "\
/usr/local/lib/libssh2.1.dylib
/usr/lib/libSystem.B.dylib
@rpath/libfoo.dylib
ssh2/.dylibs/libcrypto.1.1.dylib

/opt/homebrew/opt/openssl@3/lib/libssl.3.dylib
";
        assert_eq!(
            external_dependencies(listing),
            vec![
                "/usr/local/lib/libssh2.1.dylib",
                "/opt/homebrew/opt/openssl@3/lib/libssl.3.dylib"
            ]
        );
    }

    #[test]
    fn delocated_listing_has_no_external_dependencies() {
        assert!(external_dependencies("ssh2/.dylibs/libssh2.1.dylib\n").is_empty());
    }

    #[test]
    fn stems_ignore_versions_and_hashes() {
        assert_eq!(library_stem("libssh2.1.dylib"), "libssh2");
        assert_eq!(library_stem("libssh2-5f0a1b2c.so.1.0.1"), "libssh2");
        assert_eq!(library_stem("libgit2-1.dylib"), "libgit2-1");
    }

    #[tokio::test]
    async fn staging_copies_matches_and_rejects_empty_patterns() {
        let src = tempfile::tempdir().unwrap();
        let dest = tempfile::tempdir().unwrap();
        let manifest = dest.path().join("dist").join(STAGED_MANIFEST);
        std::fs::write(src.path().join("libssh2.1.dylib"), b"not really").unwrap();
        std::fs::write(src.path().join("libssh2.a"), b"archive").unwrap();
        std::fs::write(src.path().join("libz.dylib"), b"z").unwrap();

        let pattern = format!("{}/libssh2*", src.path().display());
        let staged = stage_libraries(&[pattern], dest.path(), &manifest)
            .await
            .unwrap();
        assert_eq!(staged.len(), 2);
        assert!(dest.path().join("libssh2.1.dylib").exists());
        assert!(dest.path().join("libssh2.a").exists());
        assert!(!dest.path().join("libz.dylib").exists());
        assert!(staged.iter().all(|lib| !lib.shared));
        assert_eq!(
            read_manifest(&manifest).await.unwrap().libraries,
            vec!["libssh2.1.dylib", "libssh2.a"]
        );

        let missing = format!("{}/libnope*", src.path().display());
        assert!(matches!(
            stage_libraries(&[missing], dest.path(), &manifest).await,
            Err(Error::NativeLibraryNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn staging_never_overwrites_project_files() {
        let deps = tempfile::tempdir().unwrap();
        let project = tempfile::tempdir().unwrap();
        let manifest = project.path().join("dist").join(STAGED_MANIFEST);
        std::fs::write(deps.path().join("libssh2.1.dylib"), b"lib").unwrap();
        std::fs::write(deps.path().join("setup.py"), b"theirs").unwrap();
        std::fs::write(project.path().join("setup.py"), b"ours").unwrap();

        let pattern = format!("{}/*", deps.path().display());
        let err = stage_libraries(&[pattern], project.path(), &manifest)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::StagingConflict { ref existing, .. }
            if *existing == project.path().join("setup.py")));
        assert_eq!(std::fs::read(project.path().join("setup.py")).unwrap(), b"ours");
        assert!(!project.path().join("libssh2.1.dylib").exists());
        assert!(!manifest.exists());
    }

    #[tokio::test]
    async fn broad_pattern_cleanup_removes_only_staged_copies() {
        let deps = tempfile::tempdir().unwrap();
        let project = tempfile::tempdir().unwrap();
        let manifest = project.path().join("dist").join(STAGED_MANIFEST);
        std::fs::write(deps.path().join("libssh2.1.dylib"), b"lib").unwrap();
        std::fs::write(deps.path().join("libcrypto.3.dylib"), b"lib").unwrap();
        for name in ["setup.py", "requirements.txt", "_ext.cpython-39-x86_64-linux-gnu.so"] {
            std::fs::write(project.path().join(name), b"project").unwrap();
        }
        std::fs::create_dir(project.path().join("sub")).unwrap();
        std::fs::write(project.path().join("sub").join("libssh2.1.dylib"), b"").unwrap();

        let pattern = format!("{}/*", deps.path().display());
        stage_libraries(&[pattern], project.path(), &manifest)
            .await
            .unwrap();

        let mut removed = remove_stale_libraries(project.path(), &manifest)
            .await
            .unwrap();
        removed.sort();
        assert_eq!(
            removed,
            vec![
                project.path().join("libcrypto.3.dylib"),
                project.path().join("libssh2.1.dylib"),
            ]
        );
        for name in ["setup.py", "requirements.txt", "_ext.cpython-39-x86_64-linux-gnu.so"] {
            assert!(project.path().join(name).exists(), "{} was deleted", name);
        }
        assert!(project.path().join("sub").join("libssh2.1.dylib").exists());
        assert!(!manifest.exists());

        // a second cleanup finds nothing to do
        assert!(remove_stale_libraries(project.path(), &manifest)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn manifest_entries_cannot_escape_the_project() {
        let root = tempfile::tempdir().unwrap();
        let project = root.path().join("project");
        std::fs::create_dir(&project).unwrap();
        std::fs::write(root.path().join("outside.dylib"), b"").unwrap();
        let manifest = root.path().join(STAGED_MANIFEST);
        std::fs::write(
            &manifest,
            r#"{"libraries": ["../outside.dylib", "/etc/hosts"]}"#,
        )
        .unwrap();

        let removed = remove_stale_libraries(&project, &manifest).await.unwrap();
        assert!(removed.is_empty());
        assert!(root.path().join("outside.dylib").exists());
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn system_libc_is_a_shared_library() {
        let candidates = [
            "/lib/x86_64-linux-gnu/libc.so.6",
            "/lib/aarch64-linux-gnu/libc.so.6",
            "/lib64/libc.so.6",
            "/usr/lib/libc.so.6",
        ];
        if let Some(libc) = candidates.iter().map(Path::new).find(|p| p.exists()) {
            assert!(is_shared_library(libc).await);
        }
        assert!(!is_shared_library(Path::new("/nonexistent/libc.so.6")).await);
    }
}
