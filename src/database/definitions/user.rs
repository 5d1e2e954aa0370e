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

use crate::prelude::*;
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHasher};
use chrono::{DateTime, Utc};
use surrealdb::sql::Datetime;
use std::future::{Future, IntoFuture};
use std::pin::Pin;

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
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Role {
    #[default]
    User,
    Admin,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Getters)]
#[serde(rename_all = "camelCase")]
#[get = "pub"]
pub struct User {
    id: Id,
    name: String,
    email: String,
    #[serde(skip_serializing)]
    password: String,
    #[serde(default)]
    role: Role,
    updated_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
}

/// Display projection of a user, the id is only used internally.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Getters)]
#[get = "pub"]
pub struct UserSummary {
    #[serde(skip_serializing)]
    id: Id,
    name: String,
    email: String,
}

impl UserSummary {
    #[cfg(test)]
    pub fn new(id: Id, name: String, email: String) -> Self {
        Self { id, name, email }
    }
}

impl User {
    #[instrument(skip(connection))]
    pub async fn find(id: &Id, connection: &DatabaseConnection) -> Result<Option<User>> {
        Ok(sql_span!(connection.select(id.to_thing()).await?, "select user"))
    }

    #[instrument(skip(connection))]
    pub async fn from_email(email: &str, connection: &DatabaseConnection) -> Result<Option<User>> {
        let user: Option<User> = sql_span!(
            connection
                .query("SELECT * FROM user WHERE email = $email LIMIT 1")
                .bind(("email", email))
                .await?
                .take(0)?,
            "user by email"
        );

        Ok(user)
    }

    /// Whether a user record with the given id exists.
    #[instrument(skip(connection))]
    pub async fn exists(id: &Id, connection: &DatabaseConnection) -> Result<bool> {
        Ok(User::find(id, connection).await?.is_some())
    }
}

#[derive(Clone, Debug, Serialize, Getters, Setters)]
#[serde(rename_all = "camelCase")]
pub struct WriteUser<'a> {
    #[get = "pub"]
    #[set = "pub"]
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
    #[get = "pub"]
    #[set = "pub"]
    #[serde(skip_serializing_if = "Option::is_none")]
    email: Option<&'a str>,
    #[get = "pub"]
    #[set = "pub"]
    #[serde(skip_serializing_if = "Option::is_none")]
    password: Option<String>,
    #[get = "pub"]
    #[set = "pub"]
    role: Role,
    #[serde(skip)]
    connection: &'a DatabaseConnection,
    #[serde(skip_serializing_if = "Option::is_none")]
    created_at: Option<Datetime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    updated_at: Option<Datetime>,
}

impl<'a> From<&'a DatabaseConnection> for WriteUser<'a> {
    fn from(connection: &'a DatabaseConnection) -> Self {
        Self {
            name: None,
            email: None,
            password: None,
            role: Role::User,
            connection,
            created_at: None,
            updated_at: None,
        }
    }
}

impl<'a> IntoFuture for WriteUser<'a> {
    type Output = Result<User>;
    type IntoFuture = Pin<Box<dyn Future<Output = Self::Output> + Send + 'a>>;

    #[instrument(skip_all)]
    fn into_future(mut self) -> Self::IntoFuture {
        Box::pin(async move {
            let mut errors = Vec::new();
            if self.name.map_or(true, |name| name.trim().is_empty()) {
                errors.push(FieldError::new("name", "Name is required"));
            }
            if self.email.map_or(true, |email| !email.contains('@')) {
                errors.push(FieldError::new("email", "A valid email is required"));
            }
            if self.password.as_deref().map_or(true, str::is_empty) {
                errors.push(FieldError::new("password", "Password is required"));
            }
            if !errors.is_empty() {
                return Err(ApplicationError::Validation(errors));
            }

            // the stored credential is never the plain password
            if let Some(password) = self.password.take() {
                self.password = Some(hash_password(password.as_str())?);
            }

            let now = Datetime::from(Utc::now());
            self.created_at = Some(now.clone());
            self.updated_at = Some(now);

            let connection = self.connection;
            let users: Vec<User> =
                sql_span!(connection.create("user").content(self).await?, "create user");

            users
                .into_iter()
                .next()
                .ok_or(ApplicationError::InternalServerError)
        })
    }
}

pub fn hash_password(password: &str) -> Result<String> {
    Argon2::default()
        .hash_password(password.as_bytes(), &SaltString::generate(&mut OsRng))
        .map(|hash| hash.to_string())
        .map_err(|error| {
            error!("Unable to hash password: {}", error);
            ApplicationError::InternalServerError
        })
}
