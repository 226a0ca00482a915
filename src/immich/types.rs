//! Wire types for the subset of the Immich API this tool touches.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::timestamp::Timestamp;

/// Body of `POST /search/metadata`.
///
/// `page` is advanced by the asset stream as the server hands out next-page
/// tokens; every other field is a filter that is omitted when unset.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataSearch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub taken_before: Option<Timestamp>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub taken_after: Option<Timestamp>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag_ids: Option<Vec<Uuid>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchResponse {
    pub assets: AssetPage,
}

/// One page of search results.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetPage {
    #[serde(default)]
    pub count: u64,
    #[serde(default)]
    pub items: Vec<AssetResponse>,
    #[serde(default)]
    pub next_page: Option<String>,
}

/// An asset as returned by search (summary) or `GET /assets/{id}` (full).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetResponse {
    pub id: Uuid,
    pub original_file_name: String,
    /// Often absent on search summaries; fetch the asset to get it.
    #[serde(default)]
    pub exif_info: Option<ExifInfo>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExifInfo {
    #[serde(default)]
    pub date_time_original: Option<DateTime<FixedOffset>>,
    /// IANA zone name; absent when the server only knows a naive time.
    #[serde(default)]
    pub time_zone: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TagResponse {
    pub id: Uuid,
    pub name: String,
    /// Full hierarchical path, e.g. `Trips/Vacation`.
    pub value: String,
}

/// Body of `PUT /assets/{id}`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAsset<'a> {
    pub date_time_original: &'a str,
}
