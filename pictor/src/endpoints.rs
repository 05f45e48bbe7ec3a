use std::collections::HashMap;

use axum::{
    Json,
    extract::{Multipart, Query, State},
};
use pictor_core::{Error, mime};
use pictor_vision::{Operation, Params, Transform};
use serde::Serialize;
use tracing::instrument;

use crate::{
    api::{ApiResult, ApiState},
    pipeline,
};

type RawQuery = Query<HashMap<String, String>>;

#[derive(Debug, Serialize)]
pub struct Greeting {
    pub message: &'static str,
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub unique_name: String,
}

#[derive(Debug, Serialize)]
pub struct ImageResponse {
    pub image: String,
}

#[derive(Debug, Serialize)]
pub struct TextResponse {
    pub text: String,
    pub regions: usize,
}

#[derive(Debug, Serialize)]
pub struct FacesResponse {
    pub message: &'static str,
    pub faces: usize,
    pub image: String,
}

pub async fn root() -> Json<Greeting> {
    Json(Greeting {
        message: "Hello World",
    })
}

#[instrument(level = "info", skip_all)]
pub async fn upload(
    State(state): State<ApiState>,
    mut multipart: Multipart,
) -> ApiResult<Json<UploadResponse>> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("file") {
            continue;
        }

        let original = field.file_name().map(str::to_string);
        let bytes = field.bytes().await?;
        let kind = mime::validate(&bytes)?;
        let unique_name = state
            .storage()
            .store(original.as_deref(), kind, bytes.to_vec())
            .await?;
        return Ok(Json(UploadResponse { unique_name }));
    }

    Err(Error::invalid("Missing parameter: file").into())
}

/// Numeric parameters are checked before the filename is even looked at.
async fn transform(
    state: &ApiState,
    operation: Operation,
    query: HashMap<String, String>,
) -> ApiResult<Json<ImageResponse>> {
    let params = Params::from(query);
    let transform = Transform::from_params(operation, &params, state.limits())?;
    let filename = params.required("filename")?;

    let image = pipeline::run_transform(state.storage(), filename, transform).await?;
    Ok(Json(ImageResponse { image }))
}

#[instrument(level = "info", skip_all)]
pub async fn resize(
    State(state): State<ApiState>,
    Query(query): RawQuery,
) -> ApiResult<Json<ImageResponse>> {
    transform(&state, Operation::Resize, query).await
}

#[instrument(level = "info", skip_all)]
pub async fn blur(
    State(state): State<ApiState>,
    Query(query): RawQuery,
) -> ApiResult<Json<ImageResponse>> {
    transform(&state, Operation::Blur, query).await
}

#[instrument(level = "info", skip_all)]
pub async fn gaussian_blur(
    State(state): State<ApiState>,
    Query(query): RawQuery,
) -> ApiResult<Json<ImageResponse>> {
    transform(&state, Operation::GaussianBlur, query).await
}

#[instrument(level = "info", skip_all)]
pub async fn median_blur(
    State(state): State<ApiState>,
    Query(query): RawQuery,
) -> ApiResult<Json<ImageResponse>> {
    transform(&state, Operation::MedianBlur, query).await
}

#[instrument(level = "info", skip_all)]
pub async fn grayscale(
    State(state): State<ApiState>,
    Query(query): RawQuery,
) -> ApiResult<Json<ImageResponse>> {
    transform(&state, Operation::Grayscale, query).await
}

#[instrument(level = "info", skip_all)]
pub async fn extract_text(
    State(state): State<ApiState>,
    Query(query): RawQuery,
) -> ApiResult<Json<TextResponse>> {
    let params = Params::from(query);
    let filename = params.required("filename")?;

    let extraction = pipeline::extract_text(state.storage(), state.vision(), filename).await?;
    Ok(Json(TextResponse {
        text: extraction.text,
        regions: extraction.regions.len(),
    }))
}

#[instrument(level = "info", skip_all)]
pub async fn detect_faces(
    State(state): State<ApiState>,
    Query(query): RawQuery,
) -> ApiResult<Json<FacesResponse>> {
    let params = Params::from(query);
    let filename = params.required("filename")?;

    let result = pipeline::detect_faces(state.storage(), state.vision(), filename).await?;
    Ok(Json(FacesResponse {
        message: "Success",
        faces: result.faces.len(),
        image: result.image,
    }))
}
