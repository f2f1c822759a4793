//! Conversion from dispatch errors into HTTP errors.

use super::http_error::{Error, ErrorKind};
use crate::ServerError;

/// Tracing target for dispatch error conversion.
const TRACING_TARGET: &str = "papercast_server::handler::error";

impl From<ServerError> for Error<'static> {
    fn from(error: ServerError) -> Self {
        let message = error.to_string();

        match error {
            ServerError::UnknownPipeline(name) => ErrorKind::NotFound
                .with_message(message)
                .with_resource("pipeline")
                .with_context(name),
            ServerError::DuplicatePipeline(name) => ErrorKind::Conflict
                .with_message(message)
                .with_resource("pipeline")
                .with_context(name),
            ServerError::InvalidSeed { pipeline, .. } => ErrorKind::UnprocessableEntity
                .with_message(message)
                .with_resource("seed")
                .with_context(pipeline),
            ServerError::Pipeline(_) | ServerError::Aborted { .. } => {
                tracing::error!(
                    target: TRACING_TARGET,
                    error = %message,
                    "Pipeline dispatch failed"
                );
                ErrorKind::InternalServerError.with_context(message)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use papercast_runtime::PipelineError;

    use super::*;

    #[test]
    fn maps_server_errors_to_status_codes() {
        let cases = [
            (
                ServerError::UnknownPipeline("x".into()),
                StatusCode::NOT_FOUND,
            ),
            (
                ServerError::DuplicatePipeline("x".into()),
                StatusCode::CONFLICT,
            ),
            (
                ServerError::InvalidSeed {
                    pipeline: "x".into(),
                    source: PipelineError::invalid_seed("a", "b", "no such port"),
                },
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (
                ServerError::Pipeline(PipelineError::Internal("closed".into())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (error, status) in cases {
            let error = Error::from(error);
            assert_eq!(error.kind().status_code(), status);
        }
    }

    #[test]
    fn internal_details_stay_in_context() {
        let error = Error::from(ServerError::Pipeline(PipelineError::Internal(
            "semaphore closed".into(),
        )));
        let response = error.into_error_response();

        assert_eq!(response.message, "Internal server error.");
        assert!(response.context.as_deref().unwrap().contains("semaphore closed"));
    }
}
