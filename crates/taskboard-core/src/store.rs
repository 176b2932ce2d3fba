use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow};
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::task::Task;
use crate::theme::Theme;

#[derive(Debug)]
pub struct TaskStore {
    pub data_dir: PathBuf,
    pub tasks_path: PathBuf,
    pub theme_path: PathBuf,
}

impl TaskStore {
    #[tracing::instrument(skip(data_dir))]
    pub fn open(data_dir: &Path) -> anyhow::Result<Self> {
        let data_dir = data_dir.to_path_buf();
        fs::create_dir_all(&data_dir)
            .with_context(|| format!("failed to create {}", data_dir.display()))?;

        let tasks_path = data_dir.join("tasks.data");
        let theme_path = data_dir.join("theme.data");

        info!(
            data_dir = %data_dir.display(),
            tasks = %tasks_path.display(),
            theme = %theme_path.display(),
            "opened task store"
        );

        Ok(Self {
            data_dir,
            tasks_path,
            theme_path,
        })
    }

    #[tracing::instrument(skip(self))]
    pub fn load_tasks(&self) -> anyhow::Result<Vec<Task>> {
        if !self.tasks_path.exists() {
            debug!(file = %self.tasks_path.display(), "no tasks blob yet; starting empty");
            return Ok(vec![]);
        }

        let raw = fs::read_to_string(&self.tasks_path)
            .with_context(|| format!("failed reading {}", self.tasks_path.display()))?;
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Ok(vec![]);
        }

        let tasks: Vec<Task> = serde_json::from_str(trimmed)
            .with_context(|| format!("failed parsing {}", self.tasks_path.display()))?;

        debug!(count = tasks.len(), "loaded tasks from blob");
        Ok(tasks)
    }

    // Full-overwrite: every save rewrites the entire collection.
    #[tracing::instrument(skip(self, tasks))]
    pub fn save_tasks(&self, tasks: &[Task]) -> anyhow::Result<()> {
        debug!(file = %self.tasks_path.display(), count = tasks.len(), "saving tasks atomically");

        let dir = self.tasks_path.parent().unwrap_or_else(|| Path::new("."));
        let mut temp = NamedTempFile::new_in(dir)?;
        let serialized = serde_json::to_string(tasks)?;
        temp.write_all(serialized.as_bytes())?;
        temp.flush()?;

        temp.persist(&self.tasks_path)
            .map_err(|err| anyhow!("failed to persist {}: {}", self.tasks_path.display(), err))?;

        Ok(())
    }

    #[tracing::instrument(skip(self))]
    pub fn get_theme(&self) -> anyhow::Result<Option<Theme>> {
        if !self.theme_path.exists() {
            return Ok(None);
        }

        let raw = fs::read_to_string(&self.theme_path)
            .with_context(|| format!("failed reading {}", self.theme_path.display()))?;
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            Ok(None)
        } else {
            Ok(Some(trimmed.parse()?))
        }
    }

    #[tracing::instrument(skip(self))]
    pub fn set_theme(&self, theme: Theme) -> anyhow::Result<()> {
        fs::write(&self.theme_path, theme.to_string())
            .with_context(|| format!("failed writing {}", self.theme_path.display()))?;
        Ok(())
    }
}
