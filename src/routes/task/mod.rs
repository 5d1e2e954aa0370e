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

use crate::database::definitions::task::leaderboard::{Leaderboard, LeaderboardEntry};
use crate::database::definitions::task::query::{TaskFilter, TaskQuery};
use crate::database::definitions::task::write::{
    CreateTaskRequest, DeleteTask, EditTask, EditTaskRequest,
};
use crate::database::definitions::task::{Task, TaskView};
use crate::prelude::*;
use crate::upload::{PendingUpload, Uploads};
use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::Extension;
use serde_json::Value;

pub async fn list(
    Extension(identity): Extension<Identity>,
    State(state): State<ApplicationState>,
    Query(filter): Query<TaskFilter>,
) -> Result<Json<Vec<TaskView>>> {
    let tasks = TaskQuery::new(&identity, filter, state.connection()).await?;

    Ok(Json(tasks))
}

/// Splits the multipart form into the task fields and the optional image.
async fn read_form(mut multipart: Multipart) -> Result<(CreateTaskRequest, Option<PendingUpload>)> {
    let mut request = CreateTaskRequest::default();
    let mut image = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_owned();

        if name == "image" {
            let file_name = field.file_name().map(str::to_owned);
            let content_type = field.content_type().map(str::to_owned);
            let data = field.bytes().await?;
            // browsers send an empty part for an untouched file input
            if file_name.as_deref().unwrap_or_default().is_empty() && data.is_empty() {
                continue;
            }

            image = Some(Uploads::accept(
                file_name.as_deref(),
                content_type.as_deref(),
                data,
            )?);
            continue;
        }

        let value = Some(field.text().await?);
        match name.as_str() {
            "title" => request.title = value,
            "description" => request.description = value,
            "status" => request.status = value,
            "priority" => request.priority = value,
            "dueDate" => request.due_date = value,
            "assignedTo" => request.assigned_to = value,
            other => debug!("Ignoring unknown form field {other}"),
        }
    }

    Ok((request, image))
}

pub async fn create(
    Extension(identity): Extension<Identity>,
    State(state): State<ApplicationState>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<Task>)> {
    let (request, image) = read_form(multipart).await?;
    let draft = request.validate(state.connection()).await?;

    let image = match image {
        Some(image) => Some(state.uploads().store(image).await?),
        None => None,
    };
    match draft.create(&identity, image.clone(), state.connection()).await {
        Ok(task) => Ok((StatusCode::CREATED, Json(task))),
        Err(error) => {
            // no task references the file
            if let Some(image) = image {
                state.uploads().discard(&image).await;
            }
            Err(error)
        }
    }
}

pub async fn update(
    Extension(identity): Extension<Identity>,
    State(state): State<ApplicationState>,
    Path(id): Path<String>,
    Json(request): Json<EditTaskRequest>,
) -> Result<Json<Task>> {
    let id = Id::try_from(("task", id.as_str()))?;
    let task = EditTask::new(&identity, &id, request, state.connection()).await?;

    Ok(Json(task))
}

pub async fn delete(
    Extension(identity): Extension<Identity>,
    State(state): State<ApplicationState>,
    Path(id): Path<String>,
) -> Result<Json<Value>> {
    let id = Id::try_from(("task", id.as_str()))?;
    DeleteTask::new(&identity, &id, state.connection()).await?;

    Ok(Json(json!({ "message": "Task deleted" })))
}

pub async fn leaderboard(
    State(state): State<ApplicationState>,
) -> Result<Json<Vec<LeaderboardEntry>>> {
    Ok(Json(Leaderboard::compute(state.connection()).await?))
}

#[cfg(test)]
mod tests {
    use crate::database::definitions::task::Task;
    use crate::prelude::*;
    use crate::tests::TestSuite;
    use axum::http::{Method, StatusCode};

    #[tokio::test]
    async fn test_create() -> Result<()> {
        let suite = TestSuite::init().await?;
        let token = suite.token(&suite.fixture.owner).await?;

        let (status, body) = suite
            .multipart(
                "/api/tasks",
                &token,
                &[("title", "write report"), ("priority", "High"), ("dueDate", "2024-06-01")],
                Some(("scan.png", "image/png", &b"png"[..])),
            )
            .await;
        assert_eq!(StatusCode::CREATED, status);
        assert_eq!("write report", body["title"]);
        assert_eq!("High", body["priority"]);
        assert_eq!("To Do", body["status"]);
        assert_eq!(suite.fixture.owner.id().id.as_str(), body["createdBy"]);
        assert_eq!(body["createdBy"], body["assignedTo"]);

        let image = body["image"].as_str().unwrap();
        let name = image.strip_prefix("uploads/").unwrap();
        assert!(suite.uploads().join(name).exists());

        // the stored file is served back
        let (status, _) = suite
            .call(Method::GET, &format!("/{image}"), None, None)
            .await;
        assert_eq!(StatusCode::OK, status);

        Ok(())
    }

    #[tokio::test]
    async fn test_create_rejections() -> Result<()> {
        let suite = TestSuite::init().await?;
        let token = suite.token(&suite.fixture.owner).await?;

        let (status, body) = suite
            .multipart(
                "/api/tasks",
                &token,
                &[("assignedTo", "missing")],
                Some(("scan.png", "image/png", &b"png"[..])),
            )
            .await;
        assert_eq!(StatusCode::BAD_REQUEST, status);
        assert_eq!("title", body["errors"][0]["field"]);
        assert_eq!("assignedTo", body["errors"][1]["field"]);
        // nothing is written when validation fails
        assert_eq!(0, std::fs::read_dir(suite.uploads())?.count());
        assert_eq!(0, suite.fixture.task_count().await?);

        let (status, _) = suite
            .multipart(
                "/api/tasks",
                &token,
                &[("title", "report")],
                Some(("anim.gif", "image/gif", &b"gif"[..])),
            )
            .await;
        assert_eq!(StatusCode::INTERNAL_SERVER_ERROR, status);
        assert_eq!(0, suite.fixture.task_count().await?);

        let (status, _) = suite
            .multipart("/api/tasks", "invalid", &[("title", "report")], None)
            .await;
        assert_eq!(StatusCode::UNAUTHORIZED, status);

        Ok(())
    }

    #[tokio::test]
    async fn test_create_failure_discards_image() -> Result<()> {
        let suite = TestSuite::init().await?;
        let token = suite.token(&suite.fixture.owner).await?;
        // the store refuses the title after validation passed
        suite
            .fixture
            .connection
            .query("DEFINE FIELD title ON TABLE task TYPE int")
            .await?
            .check()?;

        let (status, _) = suite
            .multipart(
                "/api/tasks",
                &token,
                &[("title", "report")],
                Some(("scan.png", "image/png", &b"png"[..])),
            )
            .await;
        assert_eq!(StatusCode::INTERNAL_SERVER_ERROR, status);
        assert_eq!(0, std::fs::read_dir(suite.uploads())?.count());

        Ok(())
    }

    #[tokio::test]
    async fn test_list() -> Result<()> {
        let suite = TestSuite::init().await?;
        let fixture = &suite.fixture;
        fixture.task(&fixture.owner, "own", Some("2024-01-01")).await?;
        fixture.task(&fixture.other, "foreign", None).await?;
        let token = suite.token(&fixture.owner).await?;

        let (status, body) = suite
            .call(Method::GET, "/api/tasks", Some(&token), None)
            .await;
        assert_eq!(StatusCode::OK, status);
        let tasks = body.as_array().unwrap();
        assert_eq!(1, tasks.len());
        assert_eq!("own", tasks[0]["title"]);
        assert_eq!(
            json!({"name": fixture.owner.name(), "email": fixture.owner.email()}),
            tasks[0]["createdBy"]
        );

        let (status, body) = suite
            .call(Method::GET, "/api/tasks?status=Done", Some(&token), None)
            .await;
        assert_eq!(StatusCode::BAD_REQUEST, status);
        assert_eq!("status", body["errors"][0]["field"]);

        let (status, body) = suite
            .call(
                Method::GET,
                "/api/tasks?dueDate=2024-01-01&sort=-dueDate",
                Some(&token),
                None,
            )
            .await;
        assert_eq!(StatusCode::OK, status);
        assert_eq!(1, body.as_array().unwrap().len());

        let (status, _) = suite.call(Method::GET, "/api/tasks", None, None).await;
        assert_eq!(StatusCode::UNAUTHORIZED, status);

        Ok(())
    }

    #[tokio::test]
    async fn test_update_and_delete() -> Result<()> {
        let suite = TestSuite::init().await?;
        let fixture = &suite.fixture;
        let task = fixture.task(&fixture.owner, "report", None).await?;
        let uri = format!("/api/tasks/{}", task.id().id);
        let owner = suite.token(&fixture.owner).await?;
        let other = suite.token(&fixture.other).await?;

        let (status, _) = suite
            .call(Method::PUT, &uri, Some(&other), Some(json!({"title": "hijacked"})))
            .await;
        assert_eq!(StatusCode::FORBIDDEN, status);

        let (status, body) = suite
            .call(Method::PUT, &uri, Some(&owner), Some(json!({"status": "In Progress"})))
            .await;
        assert_eq!(StatusCode::OK, status);
        assert_eq!("In Progress", body["status"]);
        assert_eq!("report", body["title"]);

        let (status, body) = suite
            .call(Method::PUT, &uri, Some(&owner), Some(json!({"title": 3})))
            .await;
        assert_eq!(StatusCode::BAD_REQUEST, status);
        assert!(body["error"].is_string());

        let (status, _) = suite.call(Method::DELETE, &uri, Some(&other), None).await;
        assert_eq!(StatusCode::FORBIDDEN, status);

        let (status, body) = suite.call(Method::DELETE, &uri, Some(&owner), None).await;
        assert_eq!(StatusCode::OK, status);
        assert_eq!("Task deleted", body["message"]);
        assert!(Task::find(task.id(), &fixture.connection).await?.is_none());

        let (status, _) = suite.call(Method::DELETE, &uri, Some(&owner), None).await;
        assert_eq!(StatusCode::NOT_FOUND, status);

        Ok(())
    }

    #[tokio::test]
    async fn test_leaderboard() -> Result<()> {
        let suite = TestSuite::init().await?;
        let fixture = &suite.fixture;
        let task = fixture
            .assigned_task(&fixture.admin, &fixture.other, "review")
            .await?;
        fixture.complete(&task).await?;
        let token = suite.token(&fixture.owner).await?;

        let (status, body) = suite
            .call(Method::GET, "/api/tasks/leaderboard", Some(&token), None)
            .await;
        assert_eq!(StatusCode::OK, status);
        assert_eq!(
            json!([{
                "name": fixture.other.name(),
                "email": fixture.other.email(),
                "completedTasks": 1
            }]),
            body
        );

        Ok(())
    }
}
