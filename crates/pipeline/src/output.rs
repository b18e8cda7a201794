//! Staged output directory. Artifacts are written into a hidden staging
//! directory under the output directory and moved into place on
//! [`StagedOutput::commit`]; an uncommitted stage is deleted on drop.

use campaign_core::{CampaignError, CampaignResult};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use uuid::Uuid;

const BACKUP_DIR_NAME: &str = ".replaced";

/// A file moved into the output directory, and where the file it replaced
/// was parked.
struct Replacement {
    target: PathBuf,
    backup: Option<PathBuf>,
}

pub struct StagedOutput {
    final_dir: PathBuf,
    staging_dir: PathBuf,
    committed: bool,
}

impl StagedOutput {
    pub fn create(output_dir: &Path) -> CampaignResult<Self> {
        std::fs::create_dir_all(output_dir).map_err(|e| write_err(output_dir, e))?;
        let staging_dir = output_dir.join(format!(".staging-{}", Uuid::new_v4()));
        std::fs::create_dir(&staging_dir).map_err(|e| write_err(&staging_dir, e))?;
        debug!(staging = %staging_dir.display(), "Output staging directory created");

        Ok(Self {
            final_dir: output_dir.to_path_buf(),
            staging_dir,
            committed: false,
        })
    }

    pub fn staging_dir(&self) -> &Path {
        &self.staging_dir
    }

    pub fn final_dir(&self) -> &Path {
        &self.final_dir
    }

    /// Where a file staged as `file_name` ends up after commit.
    pub fn final_path(&self, file_name: &str) -> PathBuf {
        self.final_dir.join(file_name)
    }

    /// Move every staged file into the output directory, replacing files of
    /// the same name. `manifest` moves last, after all other files are in
    /// place. Returns the final paths in move order.
    ///
    /// Every target is checked before anything moves. If a move still fails,
    /// the files already moved are removed and the replaced files restored.
    pub fn commit(mut self, manifest: &str) -> CampaignResult<Vec<PathBuf>> {
        let mut staged = Vec::new();
        let entries =
            std::fs::read_dir(&self.staging_dir).map_err(|e| write_err(&self.staging_dir, e))?;
        for entry in entries {
            let entry = entry.map_err(|e| write_err(&self.staging_dir, e))?;
            let is_file = entry
                .file_type()
                .map_err(|e| write_err(&entry.path(), e))?
                .is_file();
            if is_file {
                staged.push(entry.file_name());
            }
        }
        staged.sort_by_key(|name| (name.to_str() == Some(manifest), name.clone()));

        for name in &staged {
            let target = self.final_dir.join(name);
            match std::fs::symlink_metadata(&target) {
                Ok(meta) if !meta.is_file() => {
                    return Err(CampaignError::Write {
                        path: target,
                        reason: "target exists and is not a regular file".into(),
                    });
                }
                Ok(_) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(write_err(&target, e)),
            }
        }

        let backup_dir = self.staging_dir.join(BACKUP_DIR_NAME);
        std::fs::create_dir(&backup_dir).map_err(|e| write_err(&backup_dir, e))?;

        let mut moved: Vec<Replacement> = Vec::with_capacity(staged.len());
        for name in &staged {
            let target = self.final_dir.join(name);
            let backup = if target.exists() {
                let backup = backup_dir.join(name);
                if let Err(e) = std::fs::rename(&target, &backup) {
                    rollback(&moved);
                    return Err(write_err(&target, e));
                }
                Some(backup)
            } else {
                None
            };

            let replacement = Replacement { target, backup };
            if let Err(e) = std::fs::rename(self.staging_dir.join(name), &replacement.target) {
                restore(&replacement);
                rollback(&moved);
                return Err(write_err(&replacement.target, e));
            }
            moved.push(replacement);
        }

        self.committed = true;
        if let Err(e) = std::fs::remove_dir_all(&self.staging_dir) {
            warn!(
                staging = %self.staging_dir.display(),
                error = %e,
                "Failed to remove committed staging directory"
            );
        }
        debug!(files = moved.len(), output = %self.final_dir.display(), "Output committed");
        Ok(moved.into_iter().map(|r| r.target).collect())
    }
}

impl Drop for StagedOutput {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        if let Err(e) = std::fs::remove_dir_all(&self.staging_dir) {
            warn!(
                staging = %self.staging_dir.display(),
                error = %e,
                "Failed to remove output staging directory"
            );
        }
    }
}

/// Undo a single move: drop the new file and put the replaced one back.
fn restore(replacement: &Replacement) {
    if replacement.target.exists() {
        if let Err(e) = std::fs::remove_file(&replacement.target) {
            warn!(path = %replacement.target.display(), error = %e, "Failed to remove partial output");
        }
    }
    if let Some(backup) = &replacement.backup {
        if let Err(e) = std::fs::rename(backup, &replacement.target) {
            warn!(path = %replacement.target.display(), error = %e, "Failed to restore replaced output");
        }
    }
}

fn rollback(moved: &[Replacement]) {
    for replacement in moved.iter().rev() {
        restore(replacement);
    }
}

fn write_err(path: &Path, err: std::io::Error) -> CampaignError {
    CampaignError::Write {
        path: path.to_path_buf(),
        reason: err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn entries(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_commit_moves_files_and_overwrites() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("out");
        std::fs::create_dir_all(&out).unwrap();
        std::fs::write(out.join("a.svg"), "old").unwrap();

        let staged = StagedOutput::create(&out).unwrap();
        std::fs::write(staged.staging_dir().join("a.svg"), "new").unwrap();
        std::fs::write(staged.staging_dir().join("b.json"), "{}").unwrap();
        std::fs::write(staged.staging_dir().join("c.csv"), "x").unwrap();
        assert_eq!(staged.final_path("b.json"), out.join("b.json"));

        let moved = staged.commit("b.json").unwrap();
        assert_eq!(
            moved,
            vec![out.join("a.svg"), out.join("c.csv"), out.join("b.json")]
        );
        assert_eq!(std::fs::read_to_string(out.join("a.svg")).unwrap(), "new");
        assert_eq!(entries(&out), vec!["a.svg", "b.json", "c.csv"]);
    }

    #[test]
    fn test_blocked_target_moves_nothing() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("out");
        std::fs::create_dir_all(out.join("b.svg")).unwrap();
        std::fs::write(out.join("a.svg"), "old").unwrap();

        let staged = StagedOutput::create(&out).unwrap();
        for name in ["a.svg", "b.svg", "report.json"] {
            std::fs::write(staged.staging_dir().join(name), "new").unwrap();
        }

        let err = staged.commit("report.json").unwrap_err();
        match &err {
            CampaignError::Write { path, .. } => assert_eq!(path, &out.join("b.svg")),
            other => panic!("expected write error, got {other:?}"),
        }
        assert_eq!(entries(&out), vec!["a.svg", "b.svg"]);
        assert_eq!(std::fs::read_to_string(out.join("a.svg")).unwrap(), "old");
    }

    #[test]
    fn test_rollback_restores_replaced_files() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("out");
        let parked = dir.path().join("parked");
        std::fs::create_dir_all(&out).unwrap();
        std::fs::create_dir_all(&parked).unwrap();
        std::fs::write(out.join("a.svg"), "new").unwrap();
        std::fs::write(parked.join("a.svg"), "old").unwrap();

        rollback(&[
            Replacement {
                target: out.join("a.svg"),
                backup: Some(parked.join("a.svg")),
            },
            Replacement {
                target: out.join("b.svg"),
                backup: None,
            },
        ]);

        assert_eq!(entries(&out), vec!["a.svg"]);
        assert_eq!(std::fs::read_to_string(out.join("a.svg")).unwrap(), "old");
    }

    #[test]
    fn test_dropped_stage_leaves_nothing_behind() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("out");
        {
            let staged = StagedOutput::create(&out).unwrap();
            std::fs::write(staged.staging_dir().join("half.svg"), "<svg").unwrap();
        }
        assert!(entries(&out).is_empty());
    }

    #[test]
    fn test_uncreatable_output_dir_is_write_error() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, "x").unwrap();
        let err = StagedOutput::create(&blocker.join("out")).err().unwrap();
        assert_eq!(err.kind(), "WriteError");
    }
}
