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

use surrealdb::engine::any::Any;
use surrealdb::opt::auth::Root;
use surrealdb::Surreal;

pub mod definitions;
pub mod id;

pub type DatabaseConnection = Surreal<Any>;

#[derive(Debug, Clone)]
pub struct DatabaseOptions {
    pub endpoint: String,
    pub credentials: Option<(String, String)>,
    pub namespace: String,
    pub database: String,
}

impl DatabaseOptions {
    /// A fresh embedded in-memory datastore.
    #[cfg(test)]
    pub fn memory() -> Self {
        Self {
            endpoint: "mem://".to_owned(),
            credentials: None,
            namespace: "test".to_owned(),
            database: nanoid::nanoid!(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ConnectionInfo {
    pub connection: DatabaseConnection,
    pub database: String,
    pub namespace: String,
}

pub async fn connect(options: &DatabaseOptions) -> Result<ConnectionInfo> {
    // establish the connection
    let client = surrealdb::engine::any::connect(options.endpoint.as_str()).await?;
    info!("Established connection to surrealdb at {}", options.endpoint);

    // authenticate, the embedded engine does not need it
    if let Some((username, password)) = &options.credentials {
        client
            .signin(Root {
                username: username.as_str(),
                password: password.as_str(),
            })
            .await?;
        info!("Authenticated with surrealdb");
    }

    client
        .use_ns(options.namespace.as_str())
        .use_db(options.database.as_str())
        .await?;

    // execute the up queries
    client
        .query(include_str!("./up.surrealql"))
        .await?
        .check()?;
    info!("Initiated tables");

    Ok(ConnectionInfo {
        database: options.database.clone(),
        namespace: options.namespace.clone(),
        connection: client,
    })
}

#[macro_export]
macro_rules! sql_span {
    ($expr: expr) => {{
        let result = $expr;
        trace!("Surrealdb Request");
        result
    }};
    ($expr: expr, $title: expr) => {{
        let result = $expr;
        trace!(concat!("Surrealdb Request: ", $title));
        result
    }};
}
