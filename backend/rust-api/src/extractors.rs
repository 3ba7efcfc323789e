use axum::{
    extract::{FromRequest, Request},
    response::{IntoResponse, Response},
    Json,
};
use validator::Validate;

use crate::error::EngineError;
use crate::handlers::ApiError;

/// JSON body extractor whose rejections use the same JSON error body as
/// every other failure in the API.
pub struct AppJson<T>(pub T);

impl<T, S> FromRequest<S> for AppJson<T>
where
    T: serde::de::DeserializeOwned + 'static,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(AppJson(value)),
            Err(rejection) => Err(ApiError(EngineError::validation(format!(
                "Failed to parse JSON request body: {}",
                rejection.body_text()
            )))
            .into_response()),
        }
    }
}

/// `AppJson` plus `validator` checks on the decoded body.
pub struct ValidJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidJson<T>
where
    T: serde::de::DeserializeOwned + Validate + 'static,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let AppJson(value) = AppJson::<T>::from_request(req, state).await?;
        value
            .validate()
            .map_err(|e| ApiError(EngineError::validation(e.to_string())).into_response())?;
        Ok(ValidJson(value))
    }
}
