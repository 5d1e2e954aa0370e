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

use crate::database::definitions::task::{
    parse_due, parse_priority, parse_status, present, TaskPriority, TaskStatus, TaskView,
};
use crate::prelude::*;
use chrono::{DateTime, Utc};
use std::cmp::Ordering;
use std::future::{Future, IntoFuture};
use std::pin::Pin;
use surrealdb::sql::{Datetime, Thing};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

impl Direction {
    fn keyword(&self) -> &'static str {
        match self {
            Direction::Ascending => "ASC",
            Direction::Descending => "DESC",
        }
    }

    fn apply(&self, ordering: Ordering) -> Ordering {
        match self {
            Direction::Ascending => ordering,
            Direction::Descending => ordering.reverse(),
        }
    }
}

/// Sortable task fields, named like the stored document fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::EnumString, strum::AsRefStr)]
#[strum(serialize_all = "camelCase")]
pub enum SortField {
    Title,
    Status,
    Priority,
    DueDate,
    CreatedAt,
    UpdatedAt,
}

/// Field and direction of a listing, shared by the store query and the post-ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Getters)]
#[get = "pub"]
pub struct SortDescriptor {
    field: SortField,
    direction: Direction,
}

impl Default for SortDescriptor {
    fn default() -> Self {
        Self {
            field: SortField::CreatedAt,
            direction: Direction::Descending,
        }
    }
}

impl SortDescriptor {
    /// `field` sorts ascending, `-field` descending.
    pub fn parse(value: &str) -> std::result::Result<Self, FieldError> {
        let value = value.trim();
        let (direction, name) = match value.strip_prefix('-') {
            Some(name) => (Direction::Descending, name),
            None => (Direction::Ascending, value),
        };

        name.parse::<SortField>()
            .map(|field| Self { field, direction })
            .map_err(|_| FieldError::new("sort", format!("Cannot sort by {name:?}")))
    }

    pub fn order_clause(&self) -> String {
        let keyword = self.direction.keyword();
        format!("ORDER BY {} {keyword}, id {keyword}", self.field.as_ref())
    }

    /// Due date ordering: dated tasks by date then id in the requested direction,
    /// undated tasks always last in the order the store returned them.
    pub fn reorder<T: DueDated>(&self, items: &mut [T]) {
        if self.field != SortField::DueDate {
            return;
        }

        items.sort_by(|a, b| match (a.due(), b.due()) {
            (Some(left), Some(right)) => self
                .direction
                .apply(left.cmp(right).then_with(|| a.key().id.cmp(&b.key().id))),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        });
    }
}

pub trait DueDated {
    fn due(&self) -> Option<&DateTime<Utc>>;
    fn key(&self) -> &Id;
}

impl DueDated for TaskView {
    fn due(&self) -> Option<&DateTime<Utc>> {
        self.due_date().as_ref()
    }

    fn key(&self) -> &Id {
        self.id()
    }
}

/// Listing parameters, all optional.
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct TaskFilter {
    pub status: Option<String>,
    pub priority: Option<String>,
    pub due_date: Option<String>,
    pub sort: Option<String>,
}

/// A listing translated into a statement plus the values it binds.
#[derive(Debug, Clone, PartialEq, Getters)]
#[get = "pub"]
pub struct ScopedQuery {
    statement: String,
    requester: Option<Thing>,
    status: Option<TaskStatus>,
    priority: Option<TaskPriority>,
    due_date: Option<DateTime<Utc>>,
    sort: SortDescriptor,
}

impl ScopedQuery {
    pub fn build(identity: &Identity, filter: TaskFilter) -> Result<Self> {
        let mut errors = Vec::new();

        let status = present(filter.status).and_then(|status| parse_status(&status, &mut errors));
        let priority =
            present(filter.priority).and_then(|priority| parse_priority(&priority, &mut errors));
        let due_date =
            present(filter.due_date).and_then(|due_date| parse_due(&due_date, &mut errors));
        let sort = match present(filter.sort) {
            Some(sort) => SortDescriptor::parse(&sort).unwrap_or_else(|error| {
                errors.push(error);
                SortDescriptor::default()
            }),
            None => SortDescriptor::default(),
        };

        if !errors.is_empty() {
            return Err(ApplicationError::Validation(errors));
        }

        // admins see everything, everyone else only what they created or got assigned
        let requester = (!identity.is_admin()).then(|| identity.id().to_thing());

        let mut conditions = Vec::new();
        if requester.is_some() {
            conditions.push("(createdBy = $requester OR assignedTo = $requester)");
        }
        if status.is_some() {
            conditions.push("status = $status");
        }
        if priority.is_some() {
            conditions.push("priority = $priority");
        }
        if due_date.is_some() {
            conditions.push("dueDate = $dueDate");
        }

        let mut statement = "SELECT * FROM task".to_owned();
        if !conditions.is_empty() {
            statement.push_str(" WHERE ");
            statement.push_str(conditions.join(" AND ").as_str());
        }
        statement.push(' ');
        statement.push_str(sort.order_clause().as_str());
        statement.push_str(" FETCH createdBy, assignedTo");

        Ok(Self {
            statement,
            requester,
            status,
            priority,
            due_date,
            sort,
        })
    }
}

#[derive(Debug, Clone)]
pub struct TaskQuery<'a> {
    identity: &'a Identity,
    filter: TaskFilter,
    connection: &'a DatabaseConnection,
}

impl<'a> TaskQuery<'a> {
    pub fn new(identity: &'a Identity, filter: TaskFilter, connection: &'a DatabaseConnection) -> Self {
        Self {
            identity,
            filter,
            connection,
        }
    }
}

impl<'a> IntoFuture for TaskQuery<'a> {
    type Output = Result<Vec<TaskView>>;
    type IntoFuture = Pin<Box<dyn Future<Output = Self::Output> + Send + 'a>>;

    #[instrument(skip_all, fields(requester = %self.identity.id()))]
    fn into_future(self) -> Self::IntoFuture {
        Box::pin(async move {
            let query = ScopedQuery::build(self.identity, self.filter)?;
            debug!("Listing tasks with {}", query.statement);

            let mut request = self.connection.query(query.statement.as_str());
            if let Some(requester) = query.requester {
                request = request.bind(("requester", requester));
            }
            if let Some(status) = query.status {
                request = request.bind(("status", status));
            }
            if let Some(priority) = query.priority {
                request = request.bind(("priority", priority));
            }
            if let Some(due_date) = query.due_date {
                request = request.bind(("dueDate", Datetime::from(due_date)));
            }

            let mut tasks: Vec<TaskView> =
                sql_span!(request.await?.check()?.take(0)?, "list tasks");
            query.sort.reorder(&mut tasks);

            Ok(tasks)
        })
    }
}
