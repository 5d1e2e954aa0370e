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

use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// A single offending input field.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_owned(),
            message: message.into(),
        }
    }
}

#[derive(Error, Debug)]
pub enum ApplicationError {
    #[error("Unauthorized")]
    Unauthorized,
    #[error("{0}")]
    BadRequest(String),
    #[error("Validation failed")]
    Validation(Vec<FieldError>),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
    #[error("Upload rejected: {0}")]
    UploadRejected(String),
    #[error(transparent)]
    SurrealdbError(#[from] surrealdb::Error),
    #[error(transparent)]
    IoError(#[from] std::io::Error),
    #[error(transparent)]
    MultipartError(#[from] MultipartError),
    #[error("Internal error occurred")]
    InternalServerError,
}

impl From<Vec<FieldError>> for ApplicationError {
    fn from(errors: Vec<FieldError>) -> Self {
        Self::Validation(errors)
    }
}

pub type Result<T> = std::result::Result<T, ApplicationError>;

macro_rules! log_test_error {
    ($error:expr) => {
        #[cfg(test)]
        {
            println!("Err: {:?}", $error);
        }
    };
}

impl IntoResponse for ApplicationError {
    fn into_response(self) -> Response {
        match self {
            ApplicationError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                axum::Json(json!({"error": "Unauthorized"})),
            ),
            ApplicationError::BadRequest(error) => {
                log_test_error!(error);
                (StatusCode::BAD_REQUEST, axum::Json(json!({ "error": error })))
            }
            ApplicationError::Validation(errors) => {
                log_test_error!(errors);
                (
                    StatusCode::BAD_REQUEST,
                    axum::Json(json!({ "errors": errors })),
                )
            }
            ApplicationError::Forbidden(error) => {
                log_test_error!(error);
                (StatusCode::FORBIDDEN, axum::Json(json!({ "error": error })))
            }
            ApplicationError::NotFound(error) => {
                log_test_error!(error);
                (StatusCode::NOT_FOUND, axum::Json(json!({ "error": error })))
            }
            _ => {
                error!("Err: {}", self.to_string());

                #[cfg(test)]
                {
                    println!("Err: {:?}", self.to_string());
                }

                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    axum::Json(json!({"error": "Error occurred while processing the request"})),
                )
            }
        }
        .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            StatusCode::UNAUTHORIZED,
            ApplicationError::Unauthorized.into_response().status()
        );
        assert_eq!(
            StatusCode::BAD_REQUEST,
            ApplicationError::Validation(vec![FieldError::new("title", "Title is required")])
                .into_response()
                .status()
        );
        assert_eq!(
            StatusCode::FORBIDDEN,
            ApplicationError::Forbidden("no".to_owned())
                .into_response()
                .status()
        );
        assert_eq!(
            StatusCode::NOT_FOUND,
            ApplicationError::NotFound("gone".to_owned())
                .into_response()
                .status()
        );
        // upload rejections are reported as a generic processing failure
        assert_eq!(
            StatusCode::INTERNAL_SERVER_ERROR,
            ApplicationError::UploadRejected("image/gif".to_owned())
                .into_response()
                .status()
        );
    }
}
