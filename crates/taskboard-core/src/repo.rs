use tracing::{debug, info};

use crate::store::TaskStore;
use crate::task::{Task, TaskFields};

#[derive(Debug)]
pub struct Repository<'a> {
    store: &'a TaskStore,
    tasks: Vec<Task>,
}

impl<'a> Repository<'a> {
    #[tracing::instrument(skip(store))]
    pub fn load(store: &'a TaskStore) -> anyhow::Result<Self> {
        let tasks = store.load_tasks()?;
        Ok(Self { store, tasks })
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn get(&self, id: u64) -> Option<&Task> {
        self.tasks.iter().find(|task| task.id == id)
    }

    fn next_id(&self) -> u64 {
        self.tasks.iter().map(|task| task.id).max().unwrap_or(0) + 1
    }

    #[tracing::instrument(skip(self, fields), fields(title = %fields.title))]
    pub fn create(&mut self, fields: TaskFields) -> anyhow::Result<u64> {
        let id = self.next_id();
        self.tasks.push(Task::new(id, fields));
        self.store.save_tasks(&self.tasks)?;
        info!(id, count = self.tasks.len(), "task created");
        Ok(id)
    }

    #[tracing::instrument(skip(self, fields))]
    pub fn update(&mut self, id: u64, fields: TaskFields) -> anyhow::Result<bool> {
        let Some(task) = self.tasks.iter_mut().find(|task| task.id == id) else {
            debug!(id, "update target not found; no-op");
            return Ok(false);
        };

        task.apply_fields(fields);
        self.store.save_tasks(&self.tasks)?;
        info!(id, "task updated");
        Ok(true)
    }

    #[tracing::instrument(skip(self))]
    pub fn toggle_completed(&mut self, id: u64) -> anyhow::Result<bool> {
        let Some(task) = self.tasks.iter_mut().find(|task| task.id == id) else {
            debug!(id, "toggle target not found; no-op");
            return Ok(false);
        };

        task.completed = !task.completed;
        let completed = task.completed;
        self.store.save_tasks(&self.tasks)?;
        info!(id, completed, "task toggled");
        Ok(true)
    }

    #[tracing::instrument(skip(self))]
    pub fn delete(&mut self, id: u64) -> anyhow::Result<bool> {
        let Some(idx) = self.tasks.iter().position(|task| task.id == id) else {
            debug!(id, "delete target not found; no-op");
            return Ok(false);
        };

        self.tasks.remove(idx);
        self.store.save_tasks(&self.tasks)?;
        info!(id, count = self.tasks.len(), "task deleted");
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::Repository;
    use crate::store::TaskStore;
    use crate::task::{Priority, TaskFields};

    fn fields(title: &str) -> TaskFields {
        TaskFields {
            title: title.to_string(),
            ..TaskFields::default()
        }
    }

    #[test]
    fn create_assigns_unique_incrementing_ids() {
        let temp = tempdir().expect("tempdir");
        let store = TaskStore::open(temp.path()).expect("open store");
        let mut repo = Repository::load(&store).expect("load");

        let first = repo.create(fields("one")).expect("create");
        let second = repo.create(fields("two")).expect("create");
        assert_ne!(first, second);

        repo.delete(second).expect("delete");
        let third = repo.create(fields("three")).expect("create");
        assert_ne!(first, third);
        assert_eq!(repo.tasks().len(), 2);
        assert!(repo.tasks().iter().all(|task| !task.completed));
    }

    #[test]
    fn toggle_twice_restores_completion() {
        let temp = tempdir().expect("tempdir");
        let store = TaskStore::open(temp.path()).expect("open store");
        let mut repo = Repository::load(&store).expect("load");

        let id = repo.create(fields("flip me")).expect("create");
        assert!(repo.toggle_completed(id).expect("toggle"));
        assert!(repo.get(id).expect("get").completed);
        assert!(repo.toggle_completed(id).expect("toggle"));
        assert!(!repo.get(id).expect("get").completed);
    }

    #[test]
    fn update_overwrites_fields_but_keeps_completion() {
        let temp = tempdir().expect("tempdir");
        let store = TaskStore::open(temp.path()).expect("open store");
        let mut repo = Repository::load(&store).expect("load");

        let id = repo.create(fields("before")).expect("create");
        repo.toggle_completed(id).expect("toggle");

        let changed = repo
            .update(
                id,
                TaskFields {
                    title: "after".to_string(),
                    priority: Priority::High,
                    ..TaskFields::default()
                },
            )
            .expect("update");
        assert!(changed);

        let task = repo.get(id).expect("get");
        assert_eq!(task.title, "after");
        assert_eq!(task.priority, Priority::High);
        assert!(task.completed);
    }

    #[test]
    fn mutations_on_unknown_ids_are_noops() {
        let temp = tempdir().expect("tempdir");
        let store = TaskStore::open(temp.path()).expect("open store");
        let mut repo = Repository::load(&store).expect("load");

        repo.create(fields("only")).expect("create");
        let before = repo.tasks().to_vec();

        assert!(!repo.update(999, fields("ghost")).expect("update"));
        assert!(!repo.toggle_completed(999).expect("toggle"));
        assert!(!repo.delete(999).expect("delete"));
        assert_eq!(repo.tasks(), before.as_slice());
    }
}
