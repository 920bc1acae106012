use axum::{extract::State, Json};
use db::{cooking::Tag, Error};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    http_server::{extract::ApiPath, ResponseResult},
    AppState,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct TagResponse {
    pub id: Uuid,
    pub name: String,
    pub color: String,
    pub slug: String,
}

impl From<Tag> for TagResponse {
    fn from(tag: Tag) -> Self {
        Self {
            id: tag.tag_id,
            name: tag.name,
            color: tag.color,
            slug: tag.slug,
        }
    }
}

#[axum_macros::debug_handler]
pub(crate) async fn list_tags(
    State(state): State<AppState>,
) -> ResponseResult<Json<Vec<TagResponse>>> {
    let tags = Tag::list_all(&state.db).await?;

    Ok(Json(tags.into_iter().map(TagResponse::from).collect()))
}

#[axum_macros::debug_handler]
pub(crate) async fn get_tag(
    State(state): State<AppState>,
    ApiPath(tag_id): ApiPath<Uuid>,
) -> ResponseResult<Json<TagResponse>> {
    let tag = Tag::get_by_id(&state.db, tag_id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Tag {tag_id} not found")))?;

    Ok(Json(tag.into()))
}
