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

use crate::auth::session::{RevokeSessions, Session, StartSession};
use crate::database::definitions::user::{Role, User};
use crate::prelude::*;
use argon2::{Argon2, PasswordHash, PasswordVerifier};
use async_trait::async_trait;

pub mod authz;
pub mod middleware;
pub mod session;

/// The authenticated requester, trusted as-is by everything behind the session middleware.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Getters)]
#[get = "pub"]
pub struct Identity {
    id: Id,
    role: Role,
}

impl Identity {
    pub fn new(id: Id, role: Role) -> Self {
        Self { id, role }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

impl From<&User> for Identity {
    fn from(user: &User) -> Self {
        Self::new(user.id().clone(), *user.role())
    }
}

#[async_trait]
pub trait Authenticate {
    fn login(&self, password: &str) -> Result<()>;
    async fn logout(&self, connection: &DatabaseConnection) -> Result<()>;
    async fn start_session(&self, connection: &DatabaseConnection) -> Result<Session>;
}

#[async_trait]
impl Authenticate for User {
    #[instrument(skip_all)]
    fn login(&self, password: &str) -> Result<()> {
        let hash = PasswordHash::new(self.password().as_str()).map_err(|error| {
            error!("Stored password hash of {} is unreadable: {}", self.id(), error);
            ApplicationError::InternalServerError
        })?;

        Argon2::default()
            .verify_password(password.as_bytes(), &hash)
            .map_err(|_| ApplicationError::Unauthorized)
    }

    async fn logout(&self, connection: &DatabaseConnection) -> Result<()> {
        RevokeSessions::new(self.id(), connection).await
    }

    async fn start_session(&self, connection: &DatabaseConnection) -> Result<Session> {
        StartSession::new(self.id(), connection).await
    }
}

#[cfg(test)]
mod tests {
    use crate::auth::{Authenticate, Identity};
    use crate::database::definitions::user::{Role, WriteUser};
    use crate::database::DatabaseOptions;
    use crate::prelude::*;

    #[tokio::test]
    async fn test_login() -> Result<()> {
        let connection = crate::database::connect(&DatabaseOptions::memory())
            .await?
            .connection;
        let user = WriteUser::from(&connection)
            .set_name(Some("first"))
            .set_email(Some("first@test.de"))
            .set_password(Some("password".to_owned()))
            .set_role(Role::Admin)
            .to_owned()
            .await?;

        assert!(user.login("password").is_ok());
        assert!(matches!(
            user.login("password1"),
            Err(ApplicationError::Unauthorized)
        ));

        let identity = Identity::from(&user);
        assert_eq!(user.id(), identity.id());
        assert!(identity.is_admin());

        Ok(())
    }
}
