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

use crate::database::definitions::task::TaskStatus;
use crate::database::definitions::user::UserSummary;
use crate::prelude::*;
use std::collections::HashMap;

#[derive(Serialize, Debug, Clone, PartialEq, Getters)]
#[serde(rename_all = "camelCase")]
#[get = "pub"]
pub struct LeaderboardEntry {
    #[serde(skip_serializing)]
    id: Id,
    name: String,
    email: String,
    completed_tasks: u64,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct CompletedCount {
    assigned_to: Id,
    completed_tasks: u64,
}

/// Completed tasks per assignee, joined with the assignee's display fields.
pub struct Leaderboard;

impl Leaderboard {
    #[instrument(skip_all)]
    pub async fn compute(connection: &DatabaseConnection) -> Result<Vec<LeaderboardEntry>> {
        let mut response = sql_span!(
            connection
                .query(
                    "SELECT assignedTo, count() AS completedTasks FROM task \
                     WHERE status = $status GROUP BY assignedTo",
                )
                .query(
                    "SELECT id, name, email FROM user WHERE id INSIDE \
                     (SELECT VALUE assignedTo FROM task WHERE status = $status)",
                )
                .bind(("status", TaskStatus::Completed))
                .await?
                .check()?,
            "leaderboard"
        );
        let counts: Vec<CompletedCount> = response.take(0)?;
        let users: Vec<UserSummary> = response.take(1)?;

        Ok(Self::rank(counts, users))
    }

    /// Joins counts with users and orders by count descending, ties by user id ascending.
    /// Counts of assignees without a user record are dropped.
    pub fn rank(counts: Vec<CompletedCount>, users: Vec<UserSummary>) -> Vec<LeaderboardEntry> {
        let users: HashMap<Id, UserSummary> = users
            .into_iter()
            .map(|user| (user.id().clone(), user))
            .collect();

        let mut entries: Vec<LeaderboardEntry> = counts
            .into_iter()
            .filter_map(|count| {
                users.get(&count.assigned_to).map(|user| LeaderboardEntry {
                    id: count.assigned_to,
                    name: user.name().clone(),
                    email: user.email().clone(),
                    completed_tasks: count.completed_tasks,
                })
            })
            .collect();

        entries.sort_by(|a, b| {
            b.completed_tasks
                .cmp(&a.completed_tasks)
                .then_with(|| a.id.id.cmp(&b.id.id))
        });

        entries
    }
}
