//! Staging the finished wheel into the output directory.

use crate::bundler::{Error, Result, utils::fs};
use std::path::{Path, PathBuf};

/// Moves `wheel` into `output_dir`, replacing a same-named file.
///
/// The output directory is never created: it accumulates artifacts across
/// runs and its absence is a fatal configuration error.
pub async fn stage_wheel(wheel: &Path, output_dir: &Path) -> Result<PathBuf> {
    if !tokio::fs::metadata(output_dir)
        .await
        .map(|m| m.is_dir())
        .unwrap_or(false)
    {
        return Err(Error::OutputDirMissing(output_dir.to_path_buf()));
    }

    let file_name = wheel.file_name().ok_or_else(|| {
        Error::GenericError(format!("Invalid wheel path: {}", wheel.display()))
    })?;
    let dest = output_dir.join(file_name);

    fs::move_file(wheel, &dest).await?;
    log::info!("Staged {}", dest.display());
    Ok(dest)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn moves_wheel_and_overwrites_previous_copy() {
        let root = tempfile::tempdir().unwrap();
        let dist = root.path().join("dist");
        let out = root.path().join("wheels");
        std::fs::create_dir_all(&dist).unwrap();
        std::fs::create_dir_all(&out).unwrap();

        let wheel = dist.join("pkg-1.0-cp39-cp39-macosx_10_9_x86_64.whl");
        std::fs::write(&wheel, b"new").unwrap();
        std::fs::write(out.join("pkg-1.0-cp39-cp39-macosx_10_9_x86_64.whl"), b"old").unwrap();
        std::fs::write(out.join("other-2.0-py3-none-any.whl"), b"kept").unwrap();

        let staged = stage_wheel(&wheel, &out).await.unwrap();
        assert!(!wheel.exists());
        assert_eq!(std::fs::read(&staged).unwrap(), b"new");
        assert!(out.join("other-2.0-py3-none-any.whl").exists());
    }

    #[tokio::test]
    async fn missing_output_dir_is_fatal_and_not_created() {
        let root = tempfile::tempdir().unwrap();
        let wheel = root.path().join("pkg-1.0-py3-none-any.whl");
        std::fs::write(&wheel, b"w").unwrap();
        let out = root.path().join("wheels");

        let err = stage_wheel(&wheel, &out).await.unwrap_err();
        assert!(matches!(err, Error::OutputDirMissing(ref p) if *p == out));
        assert!(!out.exists());
        assert!(wheel.exists());
    }
}
