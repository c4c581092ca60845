//! Project directory allocation.
//!
//! Each admitted idea gets a fresh directory under the configured base path,
//! named from a filesystem-safe rendition of the idea plus a timestamp, and
//! seeded with a settings file that confines the builder tool to the
//! project: no parent-directory access, no executables, only an allow-list
//! of harmless shell commands.

use std::path::{Path, PathBuf};

use chrono::Utc;
use forgebot_core::{AllocateError, ProjectAllocator};
use tracing::debug;

const SETTINGS_DIR: &str = ".forge";
const SETTINGS_FILE: &str = "settings.json";

/// Allocates per-request project directories under one base path.
pub struct ProjectWorkspace {
    base: PathBuf,
}

impl ProjectWorkspace {
    pub fn new(base: PathBuf) -> Self {
        Self { base }
    }

    async fn write_settings(&self, project_dir: &Path) -> Result<(), AllocateError> {
        let settings = serde_json::json!({
            "allowedTools": [
                "Read",
                "WriteFile(*)",
                "Edit(*)",
                "MultiEdit(*)",
                "Write(*)",
                "Bash(ls *)",
                "Bash(cat *)",
                "Bash(grep *)",
                "Bash(mkdir *)",
                "Bash(touch *)",
                "Bash(echo *)",
                "Bash(pwd)",
                "Bash(head *)",
                "Bash(tail *)",
                "Bash(wc *)",
                "Bash(npm init *)",
                "Bash(npm install *)",
                "Bash(git init)",
                "Bash(git add *)",
                "Bash(git commit *)"
            ],
            "security": {
                "preventParentDirAccess": true,
                "restrictToProjectDir": true,
                "blockExecutables": true
            }
        });

        let settings_dir = project_dir.join(SETTINGS_DIR);
        tokio::fs::create_dir_all(&settings_dir).await?;
        let settings_path = settings_dir.join(SETTINGS_FILE);
        let body = serde_json::to_vec_pretty(&settings).map_err(std::io::Error::other)?;
        tokio::fs::write(&settings_path, body).await?;
        debug!(path = %settings_path.display(), "builder settings written");
        Ok(())
    }
}

#[async_trait::async_trait]
impl ProjectAllocator for ProjectWorkspace {
    async fn allocate(&self, idea: &str) -> Result<PathBuf, AllocateError> {
        tokio::fs::create_dir_all(&self.base).await?;

        let timestamp = Utc::now().format("%Y-%m-%dT%H-%M-%S%.3f");
        let name = format!("{}_{timestamp}", safe_name(idea));
        let project_dir = self.base.join(name);

        tokio::fs::create_dir_all(&project_dir).await?;
        self.write_settings(&project_dir).await?;
        Ok(project_dir)
    }
}

/// Keeps ASCII alphanumerics and Japanese scripts (hiragana, katakana with
/// the prolonged-sound mark, CJK ideographs); everything else becomes `_`.
fn safe_name(idea: &str) -> String {
    idea.chars()
        .map(|c| {
            let keep = c.is_ascii_alphanumeric()
                || ('ぁ'..='ん').contains(&c)
                || ('ァ'..='ヶ').contains(&c)
                || c == 'ー'
                || ('一'..='龯').contains(&c);
            if keep {
                c
            } else {
                '_'
            }
        })
        .collect()
}
