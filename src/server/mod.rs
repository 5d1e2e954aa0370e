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

use crate::database::definitions::user::{Role, User, WriteUser};
use crate::database::DatabaseOptions;
use crate::prelude::*;
use crate::upload::Uploads;
use lazy_static::lazy_static;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

pub mod state;

#[derive(Deserialize, Debug, Clone)]
pub struct Config {
    #[serde(default = "default_surrealdb_endpoint")]
    pub surrealdb_endpoint: String,
    pub surrealdb_username: Option<String>,
    pub surrealdb_password: Option<String>,
    #[serde(default = "default_surrealdb_namespace")]
    pub surrealdb_namespace: String,
    #[serde(default = "default_surrealdb_database")]
    pub surrealdb_database: String,
    #[serde(default = "default_upload_directory")]
    pub upload_directory: String,
    #[serde(default = "default_listen_address")]
    pub listen_address: String,
    pub admin_name: Option<String>,
    pub admin_email: Option<String>,
    pub admin_password: Option<String>,
}

fn default_surrealdb_endpoint() -> String {
    "mem://".to_owned()
}

fn default_surrealdb_namespace() -> String {
    "production".to_owned()
}

fn default_surrealdb_database() -> String {
    "taskboard".to_owned()
}

fn default_upload_directory() -> String {
    "uploads".to_owned()
}

fn default_listen_address() -> String {
    "0.0.0.0:8000".to_owned()
}

impl Config {
    pub fn database_options(&self) -> DatabaseOptions {
        DatabaseOptions {
            endpoint: self.surrealdb_endpoint.clone(),
            credentials: self
                .surrealdb_username
                .clone()
                .zip(self.surrealdb_password.clone()),
            namespace: self.surrealdb_namespace.clone(),
            database: self.surrealdb_database.clone(),
        }
    }
}

lazy_static! {
    pub static ref CONFIGURATION: Config = envy::from_env::<Config>().unwrap();
}

pub async fn init() -> std::result::Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    lazy_static::initialize(&CONFIGURATION);

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();

    let (axum_sender, axum_receiver) = kanal::unbounded_async::<()>();

    let info = crate::database::connect(&CONFIGURATION.database_options()).await?;
    ensure_admin(&info.connection).await?;

    let uploads = Uploads::new(CONFIGURATION.upload_directory.as_str());
    uploads.prepare().await?;

    let state = ApplicationState::new(info, uploads);
    let listener = tokio::net::TcpListener::bind(CONFIGURATION.listen_address.as_str()).await?;
    info!("Listening on {}", CONFIGURATION.listen_address);

    let server = tokio::spawn(async move {
        axum::serve(listener, crate::routes::router(state))
            .with_graceful_shutdown(async move {
                axum_receiver.recv().await.ok();
            })
            .await?;

        Ok::<(), ApplicationError>(())
    });

    match tokio::signal::ctrl_c().await {
        Ok(()) => {}
        Err(error) => {
            error!("Unable to listen for shutdown signal: {}", error);
        }
    }

    info!("Received shutdown signal... Shutting down...");
    axum_sender.send(()).await?;
    server.await??;

    Ok(())
}

/// Creates the configured administrator account unless it is already present.
#[instrument(skip_all)]
async fn ensure_admin(connection: &DatabaseConnection) -> Result<()> {
    let (Some(name), Some(email), Some(password)) = (
        CONFIGURATION.admin_name.as_deref(),
        CONFIGURATION.admin_email.as_deref(),
        CONFIGURATION.admin_password.as_deref(),
    ) else {
        return Ok(());
    };

    if User::from_email(email, connection).await?.is_some() {
        return Ok(());
    }

    WriteUser::from(connection)
        .set_name(Some(name))
        .set_email(Some(email))
        .set_password(Some(password.to_owned()))
        .set_role(Role::Admin)
        .to_owned()
        .await?;
    warn!("Created administrator account {email}");

    Ok(())
}
