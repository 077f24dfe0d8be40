//! Public vendor search and vendor pages.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use washday_core::{ServiceCategory, VendorId};

use super::path_id;
use crate::error::{AppError, Result};
use crate::services::{VendorCatalog, VendorDetail, VendorMatch};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SearchQuery {
    pub postal_code: String,
    /// Empty means any category.
    pub category: String,
}

impl SearchQuery {
    fn category(&self) -> Result<Option<ServiceCategory>> {
        match self.category.trim() {
            "" => Ok(None),
            raw => raw.parse().map(Some).map_err(AppError::BadRequest),
        }
    }
}

pub async fn search(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<VendorMatch>>> {
    let category = query.category()?;
    let matches = VendorCatalog::new(state.store()?)
        .search_by_postal_code(&query.postal_code, category)
        .await?;
    Ok(Json(matches))
}

pub async fn vendor(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<VendorDetail>> {
    let id: VendorId = path_id(&id, "vendor")?;
    let detail = VendorCatalog::new(state.store()?).vendor_detail(id).await?;
    Ok(Json(detail))
}
