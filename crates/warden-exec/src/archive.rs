use std::{
    fs::File,
    io,
    path::{Path, PathBuf},
};

use flate2::{Compression, write::GzEncoder};
use tracing::debug;

use crate::error::ArchiveError;

/// Packs `run_dir` into `archive` (gzip-compressed tar) and removes `run_dir`.
///
/// Entries are rooted at the run directory's own name, so unpacking next to the archive
/// restores the original layout. On failure the partial archive is removed and the run
/// directory is left untouched for inspection.
pub async fn archive_run_dir(run_dir: PathBuf, archive: PathBuf) -> Result<(), ArchiveError> {
    tokio::task::spawn_blocking(move || archive_blocking(&run_dir, &archive))
        .await
        .map_err(|e| ArchiveError::Join(e.to_string()))?
}

fn archive_blocking(run_dir: &Path, archive: &Path) -> Result<(), ArchiveError> {
    let name = run_dir
        .file_name()
        .ok_or_else(|| ArchiveError::Unnamed(run_dir.to_path_buf()))?;
    if archive.starts_with(run_dir) {
        return Err(ArchiveError::InsideRunDir {
            run_dir: run_dir.to_path_buf(),
            archive: archive.to_path_buf(),
        });
    }

    if let Err(source) = pack(run_dir, Path::new(name), archive) {
        let _ = std::fs::remove_file(archive);
        return Err(ArchiveError::Pack {
            run_dir: run_dir.to_path_buf(),
            archive: archive.to_path_buf(),
            source,
        });
    }
    debug!(target: "warden.exec.archive", archive = %archive.display(), "run directory archived");

    std::fs::remove_dir_all(run_dir).map_err(|source| ArchiveError::Remove {
        path: run_dir.to_path_buf(),
        source,
    })
}

fn pack(run_dir: &Path, root: &Path, archive: &Path) -> io::Result<()> {
    let file = File::create(archive)?;
    let mut tar = tar::Builder::new(GzEncoder::new(file, Compression::default()));
    tar.follow_symlinks(false);
    tar.append_dir_all(root, run_dir)?;
    let file = tar.into_inner()?.finish()?;
    file.sync_all()
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::read::GzDecoder;

    fn entries(archive: &Path) -> Vec<String> {
        let mut tar = tar::Archive::new(GzDecoder::new(File::open(archive).unwrap()));
        let mut names: Vec<String> = tar
            .entries()
            .unwrap()
            .map(|e| e.unwrap().path().unwrap().display().to_string())
            .collect();
        names.sort();
        names
    }

    #[tokio::test]
    async fn archives_and_removes_run_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let run_dir = tmp.path().join("runs").join("1619574747231823000");
        std::fs::create_dir_all(run_dir.join("nested")).unwrap();
        std::fs::write(run_dir.join("stdout.log"), "out").unwrap();
        std::fs::write(run_dir.join("nested/stats.json"), "{}").unwrap();

        let archive = tmp.path().join("runs").join("1619574747231823000.tar.gz");
        archive_run_dir(run_dir.clone(), archive.clone()).await.unwrap();

        assert!(!run_dir.exists());
        let names = entries(&archive);
        assert!(names.contains(&"1619574747231823000/stdout.log".to_string()));
        assert!(names.contains(&"1619574747231823000/nested/stats.json".to_string()));
    }

    #[tokio::test]
    async fn refuses_archive_inside_run_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let run_dir = tmp.path().join("1");
        std::fs::create_dir_all(&run_dir).unwrap();
        std::fs::write(run_dir.join("worker.pid"), "42").unwrap();

        let archive = run_dir.join(".tar.gz");
        let err = archive_run_dir(run_dir.clone(), archive.clone()).await.unwrap_err();
        assert!(matches!(err, ArchiveError::InsideRunDir { .. }));
        assert!(!archive.exists());
        assert!(run_dir.join("worker.pid").exists());
    }

    #[tokio::test]
    async fn missing_run_dir_leaves_no_archive() {
        let tmp = tempfile::tempdir().unwrap();
        let run_dir = tmp.path().join("gone");
        let archive = tmp.path().join("gone.tar.gz");

        let err = archive_run_dir(run_dir, archive.clone()).await.unwrap_err();
        assert!(matches!(err, ArchiveError::Pack { .. }));
        assert!(!archive.exists());
    }
}
