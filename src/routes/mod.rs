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

use crate::auth::middleware::require_session;
use crate::prelude::*;
use crate::upload::MAX_UPLOAD_SIZE;
use axum::extract::DefaultBodyLimit;
use axum::middleware::from_fn_with_state;
use axum::routing::{get, post, put};
use axum::Router;
use tower_http::compression::CompressionLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

pub mod auth;
pub mod extractor;
pub mod task;

pub fn router(state: ApplicationState) -> Router {
    let uploads = ServeDir::new(state.uploads().directory());

    let protected = Router::new()
        .route("/tasks", post(task::create).get(task::list))
        .route("/tasks/leaderboard", get(task::leaderboard))
        .route("/tasks/:id", put(task::update).delete(task::delete))
        .route("/auth/logout", post(auth::logout))
        .route_layer(from_fn_with_state(state.clone(), require_session));

    let api = Router::new()
        .route("/auth/login", post(auth::login))
        .merge(protected);

    Router::new()
        .nest("/api", api)
        .nest_service("/uploads", uploads)
        // multipart framing on top of the largest accepted file
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_SIZE + 1024 * 1024))
        .layer(CompressionLayer::new().gzip(true))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
