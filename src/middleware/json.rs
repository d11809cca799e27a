use axum::{
    extract::{rejection::JsonRejection, FromRequest, Request},
    Json,
};
use serde::de::DeserializeOwned;

use crate::error::ApiError;

/// `Json<T>` with rejections turned into the French error envelope
#[derive(Debug)]
pub struct JsonBody<T>(pub T);

#[axum::async_trait]
impl<T, S> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(JsonBody(value)),
            Err(rejection) => {
                tracing::debug!("Rejected request body: {}", rejection.body_text());
                Err(match rejection {
                    JsonRejection::MissingJsonContentType(_) => {
                        ApiError::invalid_json("Le corps de la requête doit être du JSON (Content-Type: application/json)")
                    }
                    JsonRejection::JsonDataError(_) => ApiError::invalid_json("Format des données invalide"),
                    _ => ApiError::invalid_json("Corps de requête JSON invalide"),
                })
            }
        }
    }
}
