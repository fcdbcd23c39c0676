// To Do resources on top of the dispatcher: task lists and their tasks.

use crate::api::{ApiMethod, RequestDispatcher};
use crate::error::ApiError;
use crate::models::{NewTask, Page, TaskList, TaskPatch, TaskStatus, TodoTask};
use crate::session::Session;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};

const LISTS_PATH: &str = "/me/todo/lists";

/// Every list with its tasks, in the order the service returned the lists.
pub type TaskGroups = Vec<(TaskList, Vec<TodoTask>)>;

pub struct TodoClient<'a> {
    session: &'a Session,
    dispatcher: &'a RequestDispatcher,
}

impl<'a> TodoClient<'a> {
    pub fn new(session: &'a Session, dispatcher: &'a RequestDispatcher) -> Self {
        TodoClient {
            session,
            dispatcher,
        }
    }

    fn call<T: DeserializeOwned>(
        &self,
        path: &str,
        method: ApiMethod,
        body: Option<&Value>,
    ) -> Result<T, ApiError> {
        let value = self.dispatcher.execute(self.session, path, method, body)?;
        serde_json::from_value(value).map_err(|source| ApiError::Decode {
            url: path.to_string(),
            source,
        })
    }

    fn send<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        method: ApiMethod,
        body: &B,
    ) -> Result<T, ApiError> {
        let body = serde_json::to_value(body).map_err(|source| ApiError::Decode {
            url: path.to_string(),
            source,
        })?;
        self.call(path, method, Some(&body))
    }

    pub fn task_lists(&self) -> Result<Vec<TaskList>, ApiError> {
        let page: Page<TaskList> = self.call(LISTS_PATH, ApiMethod::Get, None)?;
        Ok(page.value)
    }

    pub fn create_task_list(&self, display_name: &str) -> Result<TaskList, ApiError> {
        self.send(
            LISTS_PATH,
            ApiMethod::Post,
            &json!({ "displayName": display_name }),
        )
    }

    pub fn delete_task_list(&self, list_id: &str) -> Result<(), ApiError> {
        self.dispatcher.execute(
            self.session,
            &format!("{LISTS_PATH}/{list_id}"),
            ApiMethod::Delete,
            None,
        )?;
        Ok(())
    }

    pub fn tasks(&self, list_id: &str) -> Result<Vec<TodoTask>, ApiError> {
        let page: Page<TodoTask> =
            self.call(&format!("{LISTS_PATH}/{list_id}/tasks"), ApiMethod::Get, None)?;
        Ok(page.value)
    }

    pub fn create_task(&self, list_id: &str, task: &NewTask) -> Result<TodoTask, ApiError> {
        self.send(
            &format!("{LISTS_PATH}/{list_id}/tasks"),
            ApiMethod::Post,
            task,
        )
    }

    pub fn update_task(
        &self,
        list_id: &str,
        task_id: &str,
        patch: &TaskPatch,
    ) -> Result<TodoTask, ApiError> {
        self.send(
            &format!("{LISTS_PATH}/{list_id}/tasks/{task_id}"),
            ApiMethod::Patch,
            patch,
        )
    }

    pub fn complete_task(&self, list_id: &str, task_id: &str) -> Result<TodoTask, ApiError> {
        let patch = TaskPatch {
            status: Some(TaskStatus::Completed),
            ..Default::default()
        };
        self.update_task(list_id, task_id, &patch)
    }

    pub fn delete_task(&self, list_id: &str, task_id: &str) -> Result<(), ApiError> {
        self.dispatcher.execute(
            self.session,
            &format!("{LISTS_PATH}/{list_id}/tasks/{task_id}"),
            ApiMethod::Delete,
            None,
        )?;
        Ok(())
    }

    /// One call for the lists plus one per list.
    pub fn all_tasks(&self) -> Result<TaskGroups, ApiError> {
        self.task_lists()?
            .into_iter()
            .map(|list| {
                let tasks = self.tasks(&list.id)?;
                Ok((list, tasks))
            })
            .collect()
    }

    /// Exact display-name match.
    pub fn find_list_by_name(&self, name: &str) -> Result<Option<TaskList>, ApiError> {
        Ok(self
            .task_lists()?
            .into_iter()
            .find(|l| l.display_name == name))
    }

    /// Exact title match.
    pub fn find_task_by_title(
        &self,
        list_id: &str,
        title: &str,
    ) -> Result<Option<TodoTask>, ApiError> {
        Ok(self.tasks(list_id)?.into_iter().find(|t| t.title == title))
    }
}
