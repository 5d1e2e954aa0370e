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

use crate::auth::session::Session;
use crate::database::definitions::user::User;
use crate::prelude::*;
use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum_extra::extract::CookieJar;

pub const SESSION_COOKIE: &str = "session";

/// Resolves the bearer token or session cookie into an [`Identity`] request extension.
pub async fn require_session(
    State(state): State<ApplicationState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    let token = bearer_token(request.headers())
        .or_else(|| jar.get(SESSION_COOKIE).map(|cookie| cookie.value().to_owned()));

    match token {
        Some(token) => match resolve_identity(token.as_str(), state.connection()).await {
            Ok(identity) => {
                request.extensions_mut().insert(identity);
                next.run(request).await
            }
            Err(error) => error.into_response(),
        },
        None => ApplicationError::Unauthorized.into_response(),
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|token| token.trim().to_owned())
        .filter(|token| !token.is_empty())
}

#[instrument(skip_all)]
async fn resolve_identity(token: &str, connection: &DatabaseConnection) -> Result<Identity> {
    // verify the session
    let session = Session::resolve(token, connection).await?;
    // the account may have been removed while the session was alive
    let user = User::find(session.user(), connection)
        .await?
        .ok_or(ApplicationError::Unauthorized)?;

    Ok(Identity::from(&user))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_bearer_token() {
        let mut headers = HeaderMap::new();
        assert_eq!(None, bearer_token(&headers));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert_eq!(None, bearer_token(&headers));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc"));
        assert_eq!(Some("abc".to_owned()), bearer_token(&headers));
    }
}
