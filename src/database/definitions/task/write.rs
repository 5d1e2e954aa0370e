/*
 *     Copyright (C) 2023  Fritz Ochsmann
 *
 *     This program is free software: you can redistribute it and/or modify
 *     it under the terms of the GNU Affero General Public License as published
 *     by the Free Software Foundation, either version 3 of the License, or
 *     (at your option) any later version.
 *
 *     This program is distributed in the hope that it will be useful,
 *     but WITHOUT ANY WARRANTY; without even the implied warranty of
 *     MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *     GNU Affero General Public License for more details.
 *
 *     You should have received a copy of the GNU Affero General Public License
 *     along with this program.  If not, see <http://www.gnu.org/licenses/>.
 */

use crate::auth::authz::Authorize;
use crate::database::definitions::task::{
    parse_due, parse_priority, parse_status, present, Task, TaskPriority, TaskStatus,
};
use crate::database::definitions::user::User;
use crate::prelude::*;
use chrono::{DateTime, Utc};
use std::future::{Future, IntoFuture};
use std::pin::Pin;
use surrealdb::sql::{Datetime, Thing};

/// Raw task fields as submitted for creation.
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
    pub priority: Option<String>,
    pub due_date: Option<String>,
    pub assigned_to: Option<String>,
}

/// A creation request that passed validation and may be persisted.
#[derive(Debug, Clone, PartialEq, Getters)]
#[get = "pub"]
pub struct TaskDraft {
    title: String,
    description: Option<String>,
    status: TaskStatus,
    priority: TaskPriority,
    due_date: Option<DateTime<Utc>>,
    assigned_to: Option<Id>,
}

#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
struct WriteTask {
    title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    status: TaskStatus,
    priority: TaskPriority,
    #[serde(skip_serializing_if = "Option::is_none")]
    due_date: Option<Datetime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    image: Option<String>,
    created_by: Thing,
    assigned_to: Thing,
    updated_at: Datetime,
    created_at: Datetime,
}

/// Resolves a user reference given by the client, reporting the field on failure.
#[instrument(skip(connection, errors))]
async fn existing_user(
    field: &str,
    value: &str,
    connection: &DatabaseConnection,
    errors: &mut Vec<FieldError>,
) -> Result<Option<Id>> {
    let id = match Id::try_from(("user", value.trim())) {
        Ok(id) => id,
        Err(_) => {
            errors.push(FieldError::new(field, "Assigned user does not exist"));
            return Ok(None);
        }
    };

    if User::exists(&id, connection).await? {
        Ok(Some(id))
    } else {
        errors.push(FieldError::new(field, "Assigned user does not exist"));
        Ok(None)
    }
}

impl CreateTaskRequest {
    /// Checks every field before anything is written, collecting all failures.
    #[instrument(skip_all)]
    pub async fn validate(self, connection: &DatabaseConnection) -> Result<TaskDraft> {
        let mut errors = Vec::new();

        let title = present(self.title).map(|title| title.trim().to_owned());
        if title.is_none() {
            errors.push(FieldError::new("title", "Title is required"));
        }

        let status = match present(self.status) {
            Some(status) => parse_status(status.as_str(), &mut errors),
            None => Some(TaskStatus::default()),
        };
        let priority = match present(self.priority) {
            Some(priority) => parse_priority(priority.as_str(), &mut errors),
            None => Some(TaskPriority::default()),
        };
        let due_date = match present(self.due_date) {
            Some(due_date) => parse_due(due_date.as_str(), &mut errors),
            None => None,
        };
        let assigned_to = match present(self.assigned_to) {
            Some(assigned_to) => {
                existing_user("assignedTo", assigned_to.as_str(), connection, &mut errors).await?
            }
            None => None,
        };

        match (title, status, priority) {
            (Some(title), Some(status), Some(priority)) if errors.is_empty() => Ok(TaskDraft {
                title,
                description: present(self.description),
                status,
                priority,
                due_date,
                assigned_to,
            }),
            _ => Err(ApplicationError::Validation(errors)),
        }
    }
}

impl TaskDraft {
    /// Persists the draft with the requester as immutable creator.
    #[instrument(skip(self, connection), fields(creator = %creator.id()))]
    pub async fn create(
        self,
        creator: &Identity,
        image: Option<String>,
        connection: &DatabaseConnection,
    ) -> Result<Task> {
        let now = Datetime::from(Utc::now());
        let assigned_to = self.assigned_to.unwrap_or_else(|| creator.id().clone());

        let tasks: Vec<Task> = sql_span!(
            connection
                .create("task")
                .content(WriteTask {
                    title: self.title,
                    description: self.description,
                    status: self.status,
                    priority: self.priority,
                    due_date: self.due_date.map(Datetime::from),
                    image,
                    created_by: creator.id().to_thing(),
                    assigned_to: assigned_to.to_thing(),
                    updated_at: now.clone(),
                    created_at: now,
                })
                .await?,
            "create task"
        );

        tasks
            .into_iter()
            .next()
            .ok_or(ApplicationError::InternalServerError)
    }
}

/// Partial update, absent or empty fields keep their stored value.
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct EditTaskRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
    pub priority: Option<String>,
    pub due_date: Option<String>,
    pub assigned_to: Option<String>,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TaskPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    status: Option<TaskStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    priority: Option<TaskPriority>,
    #[serde(skip_serializing_if = "Option::is_none")]
    due_date: Option<Datetime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    assigned_to: Option<Thing>,
    updated_at: Datetime,
}

impl EditTaskRequest {
    #[instrument(skip_all)]
    pub async fn into_patch(self, connection: &DatabaseConnection) -> Result<TaskPatch> {
        let mut errors = Vec::new();

        let status = present(self.status).and_then(|status| parse_status(&status, &mut errors));
        let priority =
            present(self.priority).and_then(|priority| parse_priority(&priority, &mut errors));
        let due_date = present(self.due_date).and_then(|due_date| parse_due(&due_date, &mut errors));
        let assigned_to = match present(self.assigned_to) {
            Some(assigned_to) => {
                existing_user("assignedTo", assigned_to.as_str(), connection, &mut errors).await?
            }
            None => None,
        };

        if !errors.is_empty() {
            return Err(ApplicationError::Validation(errors));
        }

        Ok(TaskPatch {
            title: present(self.title).map(|title| title.trim().to_owned()),
            description: present(self.description),
            status,
            priority,
            due_date: due_date.map(Datetime::from),
            assigned_to: assigned_to.map(|id| id.to_thing()),
            updated_at: Datetime::from(Utc::now()),
        })
    }
}

#[derive(Debug, Clone)]
pub struct EditTask<'a> {
    identity: &'a Identity,
    target: &'a Id,
    request: EditTaskRequest,
    connection: &'a DatabaseConnection,
}

impl<'a> EditTask<'a> {
    pub fn new(
        identity: &'a Identity,
        target: &'a Id,
        request: EditTaskRequest,
        connection: &'a DatabaseConnection,
    ) -> Self {
        Self {
            identity,
            target,
            request,
            connection,
        }
    }
}

impl<'a> IntoFuture for EditTask<'a> {
    type Output = Result<Task>;
    type IntoFuture = Pin<Box<dyn Future<Output = Self::Output> + Send + 'a>>;

    #[instrument(skip_all, fields(task = %self.target))]
    fn into_future(self) -> Self::IntoFuture {
        Box::pin(async move {
            let task = Task::find(self.target, self.connection)
                .await?
                .ok_or(ApplicationError::NotFound("Task not found".to_owned()))?;
            self.identity.authorize_mutation(task.created_by())?;

            let patch = self.request.into_patch(self.connection).await?;
            apply_patch(self.target, patch, self.connection).await
        })
    }
}

/// Merges the patch into an existing task. A record removed in the meantime is not recreated.
#[instrument(skip(patch, connection))]
pub async fn apply_patch(
    target: &Id,
    patch: TaskPatch,
    connection: &DatabaseConnection,
) -> Result<Task> {
    let task: Option<Task> = sql_span!(
        connection
            .query("UPDATE $task MERGE $patch WHERE createdBy != NONE RETURN AFTER")
            .bind(("task", target.to_thing()))
            .bind(("patch", patch))
            .await?
            .check()?
            .take(0)?,
        "update task"
    );

    task.ok_or(ApplicationError::NotFound("Task not found".to_owned()))
}

#[derive(Debug, Clone)]
pub struct DeleteTask<'a> {
    identity: &'a Identity,
    target: &'a Id,
    connection: &'a DatabaseConnection,
}

impl<'a> DeleteTask<'a> {
    pub fn new(identity: &'a Identity, target: &'a Id, connection: &'a DatabaseConnection) -> Self {
        Self {
            identity,
            target,
            connection,
        }
    }
}

impl<'a> IntoFuture for DeleteTask<'a> {
    type Output = Result<()>;
    type IntoFuture = Pin<Box<dyn Future<Output = Self::Output> + Send + 'a>>;

    #[instrument(skip_all, fields(task = %self.target))]
    fn into_future(self) -> Self::IntoFuture {
        Box::pin(async move {
            let task = Task::find(self.target, self.connection)
                .await?
                .ok_or(ApplicationError::NotFound("Task not found".to_owned()))?;
            self.identity.authorize_mutation(task.created_by())?;

            let _: Option<Task> = sql_span!(
                self.connection.delete(self.target.to_thing()).await?,
                "delete task"
            );

            Ok(())
        })
    }
}
