//! To-do tasks

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::id::TaskId;
use crate::traits::TaskStore;

/// A to-do task
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Task {
    #[serde(rename = "ID")]
    id: TaskId,
    #[serde(rename = "Title")]
    title: String,
    #[serde(rename = "Completed", default)]
    completed: bool,
    /// E-mail address of the user this task belongs to
    #[serde(rename = "OwnerEmail", default)]
    owner: String,
}

impl Task {
    pub fn new(id: TaskId, title: String, completed: bool, owner: String) -> Self {
        Self { id, title, completed, owner }
    }

    pub fn id(&self) -> &TaskId     { &self.id          }
    pub fn title(&self) -> &str     { &self.title       }
    pub fn completed(&self) -> bool { self.completed    }
    pub fn owner(&self) -> &str     { &self.owner       }

    pub fn set_title(&mut self, title: String) {
        self.title = title;
    }

    pub fn set_completed(&mut self, completed: bool) {
        self.completed = completed;
    }
}

/// The fields of a task to change. `None` means "leave unchanged"
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct TaskPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
}


/// The task list of the authenticated user.
///
/// Contrary to reservations, tasks are only changed once the remote store has answered, and with what it answered.
pub struct TaskList<S: TaskStore> {
    store: S,
    tasks: Vec<Task>,
}

impl<S: TaskStore> TaskList<S> {
    pub fn new(store: S) -> Self {
        Self { store, tasks: Vec::new() }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn get(&self, id: &TaskId) -> Option<&Task> {
        self.tasks.iter().find(|task| task.id() == id)
    }

    /// Tasks that are not completed yet
    pub fn working(&self) -> impl Iterator<Item = &Task> + '_ {
        self.tasks.iter().filter(|task| task.completed() == false)
    }

    pub fn completed(&self) -> impl Iterator<Item = &Task> + '_ {
        self.tasks.iter().filter(|task| task.completed())
    }

    /// Replaces the list with the one of the remote store. In case of error, the list is left untouched
    pub async fn load(&mut self) -> Result<()> {
        let tasks = self.store.list_tasks().await?;
        log::info!("Loaded {} tasks", tasks.len());
        self.tasks = tasks;
        Ok(())
    }

    pub async fn add(&mut self, title: &str) -> Result<TaskId> {
        let title = non_empty_title(title)?;
        let task = self.store.create_task(title).await?;
        let id = task.id().clone();
        self.tasks.push(task);
        Ok(id)
    }

    pub async fn rename(&mut self, id: &TaskId, title: &str) -> Result<()> {
        let title = non_empty_title(title)?;
        self.ensure_known(id)?;
        let patch = TaskPatch { title: Some(title.to_string()), completed: None };
        let saved = self.store.update_task(id, &patch).await?;
        self.replace(id, saved);
        Ok(())
    }

    /// Flips the completion flag of a task, and returns the new value
    pub async fn toggle_completed(&mut self, id: &TaskId) -> Result<bool> {
        let completed = match self.get(id) {
            None => return Err(Error::UnknownTask(id.clone())),
            Some(task) => task.completed(),
        };
        let patch = TaskPatch { title: None, completed: Some(!completed) };
        let saved = self.store.update_task(id, &patch).await?;
        let new_value = saved.completed();
        self.replace(id, saved);
        Ok(new_value)
    }

    pub async fn delete(&mut self, id: &TaskId) -> Result<()> {
        self.ensure_known(id)?;
        self.store.delete_task(id).await?;
        self.tasks.retain(|task| task.id() != id);
        Ok(())
    }

    fn ensure_known(&self, id: &TaskId) -> Result<()> {
        match self.get(id) {
            None => Err(Error::UnknownTask(id.clone())),
            Some(_) => Ok(()),
        }
    }

    fn replace(&mut self, id: &TaskId, saved: Task) {
        match self.tasks.iter_mut().find(|task| task.id() == id) {
            Some(task) => *task = saved,
            None => self.tasks.push(saved),
        }
    }
}

fn non_empty_title(title: &str) -> Result<&str> {
    let title = title.trim();
    if title.is_empty() {
        return Err(Error::Rejected("A task title cannot be empty".to_string()));
    }
    Ok(title)
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tasks_use_the_remote_field_names() {
        let json = r#"{"ID": 4, "CreatedAt": "2024-03-18T10:00:00Z", "OwnerEmail": "a@b.c", "Title": "Buy milk", "Completed": true}"#;
        let task: Task = serde_json::from_str(json).unwrap();
        assert_eq!(task, Task::new(TaskId::from(4), "Buy milk".to_string(), true, "a@b.c".to_string()));
    }

    #[test]
    fn patches_only_carry_the_changed_fields() {
        let patch = TaskPatch { title: None, completed: Some(true) };
        assert_eq!(serde_json::to_string(&patch).unwrap(), r#"{"completed":true}"#);
    }
}
