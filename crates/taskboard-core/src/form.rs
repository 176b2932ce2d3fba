use tracing::debug;

use crate::repo::Repository;
use crate::task::{Task, TaskFields};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormMode {
    Create,
    Editing(u64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Created(u64),
    Updated(u64),
    // valid submit, but the edited task vanished from the collection
    Missing(u64),
    Rejected,
}

#[derive(Debug)]
pub struct TaskForm {
    mode: FormMode,
    fields: TaskFields,
}

impl Default for TaskForm {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskForm {
    pub fn new() -> Self {
        Self {
            mode: FormMode::Create,
            fields: TaskFields::default(),
        }
    }

    pub fn mode(&self) -> FormMode {
        self.mode
    }

    pub fn fields(&self) -> &TaskFields {
        &self.fields
    }

    pub fn fields_mut(&mut self) -> &mut TaskFields {
        &mut self.fields
    }

    pub fn submit_label(&self) -> &'static str {
        match self.mode {
            FormMode::Create => "Add Task",
            FormMode::Editing(_) => "Save",
        }
    }

    pub fn can_cancel(&self) -> bool {
        matches!(self.mode, FormMode::Editing(_))
    }

    #[tracing::instrument(skip(self, task), fields(id = task.id))]
    pub fn begin_edit(&mut self, task: &Task) {
        self.fields = task.fields();
        self.mode = FormMode::Editing(task.id);
        debug!("form switched to edit mode");
    }

    #[tracing::instrument(skip(self))]
    pub fn cancel(&mut self) {
        self.mode = FormMode::Create;
        self.fields = TaskFields::default();
        debug!("edit cancelled; form cleared");
    }

    #[tracing::instrument(skip(self, repo))]
    pub fn submit(&mut self, repo: &mut Repository<'_>) -> anyhow::Result<Outcome> {
        let title = self.fields.title.trim().to_string();
        if title.is_empty() {
            // validation failure: no mutation, state and fields untouched
            debug!("empty title; submit rejected");
            return Ok(Outcome::Rejected);
        }

        let mut fields = self.fields.clone();
        fields.title = title;
        fields.description = fields.description.trim().to_string();

        let outcome = match self.mode {
            FormMode::Create => Outcome::Created(repo.create(fields)?),
            FormMode::Editing(id) => {
                if repo.update(id, fields)? {
                    Outcome::Updated(id)
                } else {
                    Outcome::Missing(id)
                }
            }
        };

        self.mode = FormMode::Create;
        self.fields = TaskFields::default();
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::{FormMode, Outcome, TaskForm};
    use crate::repo::Repository;
    use crate::store::TaskStore;
    use crate::task::{Priority, TaskFields};

    #[test]
    fn create_submit_adds_task_and_clears_form() {
        let temp = tempdir().expect("tempdir");
        let store = TaskStore::open(temp.path()).expect("open store");
        let mut repo = Repository::load(&store).expect("load");

        let mut form = TaskForm::new();
        assert_eq!(form.submit_label(), "Add Task");
        assert!(!form.can_cancel());

        form.fields_mut().title = "  Water plants  ".to_string();
        form.fields_mut().description = " every window sill ".to_string();

        let outcome = form.submit(&mut repo).expect("submit");
        let Outcome::Created(id) = outcome else {
            panic!("expected creation, got {outcome:?}");
        };

        let task = repo.get(id).expect("created task");
        assert_eq!(task.title, "Water plants");
        assert_eq!(task.description, "every window sill");
        assert_eq!(form.mode(), FormMode::Create);
        assert!(form.fields().title.is_empty());
    }

    #[test]
    fn edit_flow_populates_then_overwrites() {
        let temp = tempdir().expect("tempdir");
        let store = TaskStore::open(temp.path()).expect("open store");
        let mut repo = Repository::load(&store).expect("load");

        let id = repo
            .create(TaskFields {
                title: "Draft email".to_string(),
                ..TaskFields::default()
            })
            .expect("create");

        let mut form = TaskForm::new();
        let task = repo.get(id).expect("get").clone();
        form.begin_edit(&task);
        assert_eq!(form.mode(), FormMode::Editing(id));
        assert_eq!(form.submit_label(), "Save");
        assert!(form.can_cancel());
        assert_eq!(form.fields().title, "Draft email");

        form.fields_mut().title = "Send email".to_string();
        form.fields_mut().priority = Priority::High;

        let outcome = form.submit(&mut repo).expect("submit");
        assert_eq!(outcome, Outcome::Updated(id));
        assert_eq!(form.mode(), FormMode::Create);

        let task = repo.get(id).expect("get");
        assert_eq!(task.title, "Send email");
        assert_eq!(task.priority, Priority::High);
    }

    #[test]
    fn cancel_leaves_the_collection_untouched() {
        let temp = tempdir().expect("tempdir");
        let store = TaskStore::open(temp.path()).expect("open store");
        let mut repo = Repository::load(&store).expect("load");

        let id = repo
            .create(TaskFields {
                title: "Keep me".to_string(),
                ..TaskFields::default()
            })
            .expect("create");
        let before = repo.tasks().to_vec();

        let mut form = TaskForm::new();
        let task = repo.get(id).expect("get").clone();
        form.begin_edit(&task);
        form.fields_mut().title = "Discarded".to_string();
        form.cancel();

        assert_eq!(form.mode(), FormMode::Create);
        assert!(form.fields().title.is_empty());
        assert_eq!(repo.tasks(), before.as_slice());
    }

    #[test]
    fn empty_title_submit_keeps_editing_state_and_fields() {
        let temp = tempdir().expect("tempdir");
        let store = TaskStore::open(temp.path()).expect("open store");
        let mut repo = Repository::load(&store).expect("load");

        let id = repo
            .create(TaskFields {
                title: "Original".to_string(),
                description: "unchanged".to_string(),
                ..TaskFields::default()
            })
            .expect("create");
        let before = repo.tasks().to_vec();

        let mut form = TaskForm::new();
        let task = repo.get(id).expect("get").clone();
        form.begin_edit(&task);
        form.fields_mut().title = "   ".to_string();

        let outcome = form.submit(&mut repo).expect("submit");
        assert_eq!(outcome, Outcome::Rejected);
        assert_eq!(form.mode(), FormMode::Editing(id));
        assert_eq!(form.fields().title, "   ");
        assert_eq!(form.fields().description, "unchanged");
        assert_eq!(repo.tasks(), before.as_slice());
    }

    #[test]
    fn editing_a_vanished_task_reports_missing() {
        let temp = tempdir().expect("tempdir");
        let store = TaskStore::open(temp.path()).expect("open store");
        let mut repo = Repository::load(&store).expect("load");

        let id = repo
            .create(TaskFields {
                title: "Doomed".to_string(),
                ..TaskFields::default()
            })
            .expect("create");

        let mut form = TaskForm::new();
        let task = repo.get(id).expect("get").clone();
        form.begin_edit(&task);
        repo.delete(id).expect("delete");

        let outcome = form.submit(&mut repo).expect("submit");
        assert_eq!(outcome, Outcome::Missing(id));
        assert!(repo.tasks().is_empty());
        assert_eq!(form.mode(), FormMode::Create);
    }
}
