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

use crate::auth::middleware::SESSION_COOKIE;
use crate::auth::Authenticate;
use crate::database::definitions::user::User;
use crate::prelude::*;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Extension;
use axum_extra::extract::cookie::{Cookie, SameSite};
use axum_extra::extract::CookieJar;

#[derive(Deserialize, Debug, Clone)]
pub struct LoginRequest {
    email: String,
    password: String,
}

#[derive(Serialize, Debug, Clone)]
pub struct LoginResponse {
    token: String,
    user: User,
}

pub async fn login(
    State(state): State<ApplicationState>,
    jar: CookieJar,
    Json(data): Json<LoginRequest>,
) -> Result<(CookieJar, Json<LoginResponse>)> {
    // fetch the user
    let user = User::from_email(data.email.trim(), state.connection())
        .await?
        .ok_or(ApplicationError::Unauthorized)?;
    user.login(data.password.as_str())?;

    // start a new session
    let session = user.start_session(state.connection()).await?;
    info!("Started session for {}", user.id());

    let cookie = Cookie::build((SESSION_COOKIE, session.token().to_owned()))
        .path("/")
        .same_site(SameSite::Strict)
        .http_only(true)
        .build();
    let response = LoginResponse {
        token: session.token().to_owned(),
        user,
    };

    Ok((jar.add(cookie), Json(response)))
}

pub async fn logout(
    Extension(identity): Extension<Identity>,
    State(state): State<ApplicationState>,
    jar: CookieJar,
) -> Result<(CookieJar, StatusCode)> {
    let user = User::find(identity.id(), state.connection())
        .await?
        .ok_or(ApplicationError::Unauthorized)?;
    user.logout(state.connection()).await?;

    Ok((jar.remove(Cookie::build(SESSION_COOKIE).path("/")), StatusCode::NO_CONTENT))
}

#[cfg(test)]
mod tests {
    use crate::prelude::*;
    use crate::tests::TestSuite;
    use axum::body::Body;
    use axum::http::header::{COOKIE, SET_COOKIE};
    use axum::http::{Method, Request, StatusCode};

    #[tokio::test]
    async fn test_login() -> Result<()> {
        let suite = TestSuite::init().await?;
        let owner = &suite.fixture.owner;

        let (status, _) = suite
            .call(
                Method::POST,
                "/api/auth/login",
                None,
                Some(json!({"email": owner.email(), "password": "wrong"})),
            )
            .await;
        assert_eq!(StatusCode::UNAUTHORIZED, status);

        let (status, _) = suite
            .call(
                Method::POST,
                "/api/auth/login",
                None,
                Some(json!({"email": "nobody@test.de", "password": "password"})),
            )
            .await;
        assert_eq!(StatusCode::UNAUTHORIZED, status);

        let (status, body) = suite
            .call(
                Method::POST,
                "/api/auth/login",
                None,
                Some(json!({"email": owner.email(), "password": "password"})),
            )
            .await;
        assert_eq!(StatusCode::OK, status);
        assert_eq!(owner.email().as_str(), body["user"]["email"]);
        assert_eq!("user", body["user"]["role"]);
        assert!(body["user"].get("password").is_none());

        // the token works as bearer credential
        let token = body["token"].as_str().unwrap();
        let (status, _) = suite
            .call(Method::GET, "/api/tasks", Some(token), None)
            .await;
        assert_eq!(StatusCode::OK, status);

        Ok(())
    }

    #[tokio::test]
    async fn test_cookie_and_logout() -> Result<()> {
        let suite = TestSuite::init().await?;
        let token = suite.token(&suite.fixture.other).await?;

        let request = Request::builder()
            .method(Method::GET)
            .uri("/api/tasks/leaderboard")
            .header(COOKIE, format!("session={token}"))
            .body(Body::empty())
            .unwrap();
        let (status, _) = suite.send(request).await;
        assert_eq!(StatusCode::OK, status);

        let (status, _) = suite
            .call(Method::POST, "/api/auth/logout", Some(&token), None)
            .await;
        assert_eq!(StatusCode::NO_CONTENT, status);

        let (status, _) = suite
            .call(Method::GET, "/api/tasks", Some(&token), None)
            .await;
        assert_eq!(StatusCode::UNAUTHORIZED, status);

        Ok(())
    }

    #[tokio::test]
    async fn test_login_sets_cookie() -> Result<()> {
        let suite = TestSuite::init().await?;
        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/auth/login")
            .header("content-type", "application/json")
            .body(Body::from(
                json!({"email": suite.fixture.admin.email(), "password": "password"}).to_string(),
            ))
            .unwrap();

        let response = tower::ServiceExt::oneshot(suite.router(), request)
            .await
            .unwrap();
        assert_eq!(StatusCode::OK, response.status());
        let cookie = response
            .headers()
            .get(SET_COOKIE)
            .and_then(|value| value.to_str().ok())
            .unwrap();
        assert!(cookie.starts_with("session="));
        assert!(cookie.contains("HttpOnly"));

        Ok(())
    }
}
