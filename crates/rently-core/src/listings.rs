//! Listing operations over the backend API.
//!
//! The client only ever creates new listings or deletes its own; existing
//! listings are read-only. Auth-gated calls rely on the bearer token the
//! auth controller installed on the [`ApiClient`].

use chrono::NaiveDateTime;
use serde::Deserialize;

use crate::api::{ApiClient, ApiError};

/// Client-side cap on upload size; the backend rejects larger images.
pub const MAX_IMAGE_BYTES: u64 = 10 * 1024 * 1024;

/// A rental listing as returned by the search and profile endpoints.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Listing {
    pub id: i64,
    #[serde(rename = "type")]
    pub kind: String,
    pub phone_number: String,
    pub district: String,
    pub city: String,
    #[serde(default)]
    pub created_at: Option<NaiveDateTime>,
    #[serde(default)]
    pub has_image: bool,
}

#[derive(Debug, Deserialize)]
struct HousesResponse {
    houses: Vec<Listing>,
}

/// Fields of a new listing. The image is passed separately and is
/// required; the backend stores it alongside the record.
#[derive(Debug, Clone)]
pub struct NewListing {
    pub kind: String,
    pub phone_number: String,
    pub district: String,
    pub city: String,
}

/// Image payload for a new listing.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Subset of the created listing echoed back by the add endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedListing {
    pub id: i64,
    #[serde(rename = "type")]
    pub kind: String,
    pub phone_number: String,
    pub district: String,
    pub city: String,
}

#[derive(Debug, Deserialize)]
struct AddResponse {
    house: CreatedListing,
}

/// Searches listings, optionally narrowed by district and city.
pub async fn search(
    api: &ApiClient,
    district: Option<&str>,
    city: Option<&str>,
) -> Result<Vec<Listing>, ApiError> {
    let mut query: Vec<(&str, &str)> = Vec::new();
    if let Some(district) = district {
        query.push(("district", district));
    }
    if let Some(city) = city {
        query.push(("city", city));
    }

    let response: HousesResponse = api.get_json("/api/houses/search", &query).await?;
    Ok(response.houses)
}

/// Listings owned by the signed-in user.
pub async fn my_listings(api: &ApiClient) -> Result<Vec<Listing>, ApiError> {
    let response: HousesResponse = api.get_json("/api/houses/my", &[]).await?;
    Ok(response.houses)
}

/// Publishes a new listing with its image as a multipart form.
pub async fn add(
    api: &ApiClient,
    listing: &NewListing,
    image: ImageUpload,
) -> Result<CreatedListing, ApiError> {
    let part = reqwest::multipart::Part::bytes(image.bytes)
        .file_name(image.file_name)
        .mime_str(&image.content_type)
        .map_err(|e| ApiError::parse(format!("Invalid image content type: {}", e)))?;

    let form = reqwest::multipart::Form::new()
        .text("type", listing.kind.clone())
        .text("phoneNumber", listing.phone_number.clone())
        .text("district", listing.district.clone())
        .text("city", listing.city.clone())
        .part("image", part);

    let response: AddResponse = api.post_multipart("/api/houses/add", form).await?;
    Ok(response.house)
}

/// Deletes a listing owned by the signed-in user.
pub async fn delete(api: &ApiClient, id: i64) -> Result<(), ApiError> {
    api.delete(&format!("/api/houses/{}", id)).await
}

/// Raw image bytes for a listing.
pub async fn image(api: &ApiClient, id: i64) -> Result<Vec<u8>, ApiError> {
    api.get_bytes(&format!("/api/houses/image/{}", id)).await
}
