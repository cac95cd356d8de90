//! Task backends.
//!
//! [`TaskBackend`] is what the task workflow consumes; [`GoogleTasks`]
//! implements it against the Google Tasks v1 REST API.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value, json};
use tracing::{debug, info, instrument};
use url::Url;

use crate::error::{AdapterError, Result};
use crate::http::{build_client, join_segments, parse_base_url, read_json};
use crate::types::{TaskDraft, TaskItem, TaskList, TaskStatus};

/// Default Google Tasks API root.
pub const GOOGLE_TASKS_BASE_URL: &str = "https://tasks.googleapis.com/tasks/v1";

/// Operations the task workflow needs from a to-do service.
#[async_trait]
pub trait TaskBackend: Send + Sync {
    async fn list_task_lists(&self) -> Result<Vec<TaskList>>;

    /// Tasks of one list.  Completed tasks are included only on request.
    async fn list_tasks(&self, list_id: &str, show_completed: bool) -> Result<Vec<TaskItem>>;

    async fn insert_task(&self, list_id: &str, draft: &TaskDraft) -> Result<TaskItem>;

    async fn patch_task_status(
        &self,
        list_id: &str,
        task_id: &str,
        status: TaskStatus,
    ) -> Result<TaskItem>;
}

#[derive(Debug, Deserialize)]
struct Page<T> {
    #[serde(default = "Vec::new")]
    items: Vec<T>,
}

/// Google Tasks v1 client for the token's owner.
pub struct GoogleTasks {
    http: reqwest::Client,
    base_url: Url,
    access_token: String,
}

impl GoogleTasks {
    pub fn new(base_url: &str, access_token: impl Into<String>, timeout: Duration) -> Result<Self> {
        let access_token = access_token.into();
        if access_token.trim().is_empty() {
            return Err(AdapterError::Config("google tasks access token is empty".into()));
        }
        Ok(Self {
            http: build_client(timeout),
            base_url: parse_base_url(base_url)?,
            access_token,
        })
    }

    fn tasks_url(&self, list_id: &str, task_id: Option<&str>) -> Result<Url> {
        let mut segments = vec!["lists", list_id, "tasks"];
        if let Some(id) = task_id {
            segments.push(id);
        }
        join_segments(&self.base_url, &segments)
    }
}

fn draft_body(draft: &TaskDraft) -> Value {
    let mut body = Map::new();
    body.insert("title".into(), json!(draft.title));
    if let Some(notes) = &draft.notes {
        body.insert("notes".into(), json!(notes));
    }
    if let Some(due) = draft.due {
        // Google Tasks stores only the date part of `due`.
        body.insert(
            "due".into(),
            json!(format!("{}T00:00:00.000Z", due.format("%Y-%m-%d"))),
        );
    }
    Value::Object(body)
}

#[async_trait]
impl TaskBackend for GoogleTasks {
    #[instrument(skip(self))]
    async fn list_task_lists(&self) -> Result<Vec<TaskList>> {
        let url = join_segments(&self.base_url, &["users", "@me", "lists"])?;
        let response = self
            .http
            .get(url)
            .bearer_auth(&self.access_token)
            .send()
            .await?;
        let page: Page<TaskList> = read_json(response, "task lists").await?;
        debug!(count = page.items.len(), "listed task lists");
        Ok(page.items)
    }

    #[instrument(skip(self))]
    async fn list_tasks(&self, list_id: &str, show_completed: bool) -> Result<Vec<TaskItem>> {
        let response = self
            .http
            .get(self.tasks_url(list_id, None)?)
            .bearer_auth(&self.access_token)
            .query(&[
                ("showCompleted", show_completed.to_string()),
                ("showHidden", show_completed.to_string()),
                ("maxResults", "100".to_string()),
            ])
            .send()
            .await?;
        let page: Page<TaskItem> = read_json(response, &format!("tasks of {list_id}")).await?;

        let tasks: Vec<TaskItem> = page
            .items
            .into_iter()
            .filter(|task| show_completed || !task.is_completed())
            .map(|mut task| {
                task.list_id = list_id.to_string();
                task
            })
            .collect();
        debug!(count = tasks.len(), "listed tasks");
        Ok(tasks)
    }

    #[instrument(skip(self, draft), fields(title = %draft.title))]
    async fn insert_task(&self, list_id: &str, draft: &TaskDraft) -> Result<TaskItem> {
        let response = self
            .http
            .post(self.tasks_url(list_id, None)?)
            .bearer_auth(&self.access_token)
            .json(&draft_body(draft))
            .send()
            .await?;
        let mut task: TaskItem = read_json(response, "task").await?;
        task.list_id = list_id.to_string();
        info!(task_id = %task.id, "task created");
        Ok(task)
    }

    #[instrument(skip(self))]
    async fn patch_task_status(
        &self,
        list_id: &str,
        task_id: &str,
        status: TaskStatus,
    ) -> Result<TaskItem> {
        let response = self
            .http
            .patch(self.tasks_url(list_id, Some(task_id))?)
            .bearer_auth(&self.access_token)
            .json(&json!({ "status": status }))
            .send()
            .await?;
        let mut task: TaskItem = read_json(response, &format!("task {task_id}")).await?;
        task.list_id = list_id.to_string();
        info!(?status, "task status patched");
        Ok(task)
    }
}
