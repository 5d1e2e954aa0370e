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

use crate::database::definitions::user::UserSummary;
use crate::prelude::*;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};

pub mod leaderboard;
pub mod query;
pub mod write;

#[derive(
    Deserialize,
    Serialize,
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    strum::EnumString,
    strum::AsRefStr,
    strum::Display,
)]
pub enum TaskStatus {
    #[default]
    #[serde(rename = "To Do")]
    #[strum(serialize = "To Do")]
    ToDo,
    #[serde(rename = "In Progress")]
    #[strum(serialize = "In Progress")]
    InProgress,
    Completed,
}

#[derive(
    Deserialize,
    Serialize,
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    strum::EnumString,
    strum::AsRefStr,
    strum::Display,
)]
pub enum TaskPriority {
    #[default]
    Low,
    Medium,
    High,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Getters)]
#[serde(rename_all = "camelCase")]
#[get = "pub"]
pub struct Task {
    id: Id,
    title: String,
    #[serde(default)]
    description: Option<String>,
    status: TaskStatus,
    priority: TaskPriority,
    #[serde(default)]
    due_date: Option<DateTime<Utc>>,
    #[serde(default)]
    image: Option<String>,
    created_by: Id,
    assigned_to: Id,
    updated_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
}

/// A task as returned by listings, with creator and assignee resolved.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Getters)]
#[serde(rename_all = "camelCase")]
#[get = "pub"]
pub struct TaskView {
    id: Id,
    title: String,
    #[serde(default)]
    description: Option<String>,
    status: TaskStatus,
    priority: TaskPriority,
    #[serde(default)]
    due_date: Option<DateTime<Utc>>,
    #[serde(default)]
    image: Option<String>,
    created_by: UserSummary,
    assigned_to: UserSummary,
    updated_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
}

impl Task {
    #[instrument(skip(connection))]
    pub async fn find(id: &Id, connection: &DatabaseConnection) -> Result<Option<Task>> {
        Ok(sql_span!(connection.select(id.to_thing()).await?, "select task"))
    }
}

/// Parses either a full RFC 3339 timestamp or a calendar date (taken as midnight UTC).
pub fn parse_due_date(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();

    if let Ok(timestamp) = DateTime::parse_from_rfc3339(value) {
        return Some(timestamp.with_timezone(&Utc));
    }

    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|midnight| Utc.from_utc_datetime(&midnight))
}

/// Treats missing and empty inputs alike.
pub(crate) fn present(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.trim().is_empty())
}

pub(crate) fn parse_status(value: &str, errors: &mut Vec<FieldError>) -> Option<TaskStatus> {
    value.trim().parse::<TaskStatus>().map_or_else(
        |_| {
            errors.push(FieldError::new(
                "status",
                "Status must be one of To Do, In Progress, Completed",
            ));
            None
        },
        Some,
    )
}

pub(crate) fn parse_priority(value: &str, errors: &mut Vec<FieldError>) -> Option<TaskPriority> {
    value.trim().parse::<TaskPriority>().map_or_else(
        |_| {
            errors.push(FieldError::new(
                "priority",
                "Priority must be one of Low, Medium, High",
            ));
            None
        },
        Some,
    )
}

pub(crate) fn parse_due(value: &str, errors: &mut Vec<FieldError>) -> Option<DateTime<Utc>> {
    let due_date = parse_due_date(value);
    if due_date.is_none() {
        errors.push(FieldError::new("dueDate", "Due date must be a valid date"));
    }

    due_date
}
