use crate::models::Caption;
use crate::services::CaptionError;
use crate::startup::AppState;
use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, State},
};

/// `POST /api/generate`
///
/// The body is taken raw so a missing or unusual `Content-Type` does not
/// short-circuit into an extractor rejection. A body that cannot be buffered
/// (over the size limit, aborted upload) takes the same 500 path as every
/// other failure.
pub async fn generate_caption(
    State(state): State<AppState>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Caption, CaptionError> {
    let body = body.map_err(|rejection| state.invoker.reject(rejection.into()))?;
    state.invoker.generate(&body).await
}
