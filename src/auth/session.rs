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
use chrono::{DateTime, Duration, Utc};
use std::future::{Future, IntoFuture};
use std::pin::Pin;
use surrealdb::sql::{Datetime, Thing};

const TOKEN_LENGTH: usize = 64;
const SESSION_HOURS: i64 = 24;

/// A login session. Its record key doubles as the bearer token.
#[derive(Clone, Debug, Getters, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
#[get = "pub"]
pub struct Session {
    id: Id,
    user: Id,
    issued_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct NewSession {
    user: Thing,
    issued_at: Datetime,
    expires_at: Datetime,
}

/// 64 alphanumeric characters, usable as a record key without escaping.
fn generate_token() -> String {
    let alphabet: Vec<char> = ('0'..='9').chain('a'..='z').chain('A'..='Z').collect();

    nanoid::nanoid!(TOKEN_LENGTH, &alphabet)
}

impl Session {
    pub fn token(&self) -> &str {
        self.id.id.as_str()
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }

    /// Looks up the session behind a token. Unknown and expired tokens are unauthorized,
    /// expired sessions are removed on the way.
    #[instrument(skip_all)]
    pub async fn resolve(token: &str, connection: &DatabaseConnection) -> Result<Session> {
        let id = Id::try_from(("session", token)).map_err(|_| ApplicationError::Unauthorized)?;
        let session: Option<Session> =
            sql_span!(connection.select(id.to_thing()).await?, "select session");
        let session = session.ok_or(ApplicationError::Unauthorized)?;

        if session.is_expired() {
            debug!("Session of {} expired", session.user);
            session.revoke(connection).await?;
            return Err(ApplicationError::Unauthorized);
        }

        Ok(session)
    }

    #[instrument(skip_all)]
    pub async fn revoke(&self, connection: &DatabaseConnection) -> Result<()> {
        let _: Option<Session> =
            sql_span!(connection.delete(self.id.to_thing()).await?, "delete session");

        Ok(())
    }
}

/// Removes every session of a user.
#[derive(Clone, Debug)]
pub struct RevokeSessions<'a> {
    user: &'a Id,
    connection: &'a DatabaseConnection,
}

impl<'a> RevokeSessions<'a> {
    pub fn new(user: &'a Id, connection: &'a DatabaseConnection) -> Self {
        Self { user, connection }
    }
}

impl<'a> IntoFuture for RevokeSessions<'a> {
    type Output = Result<()>;
    type IntoFuture = Pin<Box<dyn Future<Output = Self::Output> + Send + 'a>>;

    #[instrument(skip_all, fields(user = %self.user))]
    fn into_future(self) -> Self::IntoFuture {
        Box::pin(async move {
            sql_span!(
                self.connection
                    .query("DELETE FROM session WHERE user = $user")
                    .bind(("user", self.user.to_thing()))
                    .await?
                    .check()?,
                "revoke sessions"
            );

            Ok(())
        })
    }
}

/// Opens a fresh session for a user, replacing the ones still open.
#[derive(Clone, Debug)]
pub struct StartSession<'a> {
    user: &'a Id,
    connection: &'a DatabaseConnection,
}

impl<'a> StartSession<'a> {
    pub fn new(user: &'a Id, connection: &'a DatabaseConnection) -> Self {
        Self { user, connection }
    }
}

impl<'a> IntoFuture for StartSession<'a> {
    type Output = Result<Session>;
    type IntoFuture = Pin<Box<dyn Future<Output = Self::Output> + Send + 'a>>;

    #[instrument(skip_all, fields(user = %self.user))]
    fn into_future(self) -> Self::IntoFuture {
        Box::pin(async move {
            RevokeSessions::new(self.user, self.connection).await?;

            let issued_at = Utc::now();
            let token = generate_token();
            let session: Option<Session> = sql_span!(
                self.connection
                    .create(Id::new(("session", token.as_str())).to_thing())
                    .content(NewSession {
                        user: self.user.to_thing(),
                        issued_at: Datetime::from(issued_at),
                        expires_at: Datetime::from(issued_at + Duration::hours(SESSION_HOURS)),
                    })
                    .await?,
                "create session"
            );

            session.ok_or(ApplicationError::InternalServerError)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::definitions::user::WriteUser;
    use crate::database::DatabaseOptions;

    #[test]
    fn test_generate_token() {
        let token = generate_token();
        assert_eq!(TOKEN_LENGTH, token.len());
        assert!(token.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(token, generate_token());
    }

    #[tokio::test]
    async fn test_session_lifecycle() -> Result<()> {
        let connection = crate::database::connect(&DatabaseOptions::memory())
            .await?
            .connection;
        let user = WriteUser::from(&connection)
            .set_name(Some("first"))
            .set_email(Some("first@test.de"))
            .set_password(Some("password".to_owned()))
            .to_owned()
            .await?;

        let session = StartSession::new(user.id(), &connection).await?;
        assert!(!session.is_expired());
        assert_eq!(user.id(), session.user());
        assert_eq!(Duration::hours(SESSION_HOURS), *session.expires_at() - *session.issued_at());

        let resolved = Session::resolve(session.token(), &connection).await?;
        assert_eq!(session.id(), resolved.id());

        // a new login replaces the open session
        let second = StartSession::new(user.id(), &connection).await?;
        assert_ne!(session.id(), second.id());
        assert!(Session::resolve(session.token(), &connection).await.is_err());
        assert!(Session::resolve(second.token(), &connection).await.is_ok());

        RevokeSessions::new(user.id(), &connection).await?;
        assert!(Session::resolve(second.token(), &connection).await.is_err());

        assert!(Session::resolve("user:nope", &connection).await.is_err());

        Ok(())
    }

    #[tokio::test]
    async fn test_expired_session() -> Result<()> {
        let connection = crate::database::connect(&DatabaseOptions::memory())
            .await?
            .connection;
        let issued_at = Utc::now() - Duration::hours(SESSION_HOURS + 1);
        let id = Id::new(("session", "stale"));
        let _: Option<Session> = connection
            .create(id.to_thing())
            .content(NewSession {
                user: Id::new(("user", "someone")).to_thing(),
                issued_at: Datetime::from(issued_at),
                expires_at: Datetime::from(issued_at + Duration::hours(SESSION_HOURS)),
            })
            .await?;

        assert!(matches!(
            Session::resolve("stale", &connection).await,
            Err(ApplicationError::Unauthorized)
        ));
        let remaining: Option<Session> = connection.select(id.to_thing()).await?;
        assert!(remaining.is_none());

        Ok(())
    }
}
