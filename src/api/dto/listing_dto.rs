//! Listing and favorite DTOs.

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use super::common_dto::{PaginationMeta, PaginationParams, default_page, default_per_page};
use crate::domain::{Listing, ListingId, ListingStatus, MemberId};
use crate::service::ListingFilter;

/// Query string for `GET /listings`.
///
/// Pagination fields are repeated here rather than flattened because
/// `serde(flatten)` cannot parse numbers out of a query string.
#[derive(Debug, Clone, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListingQuery {
    /// Only listings in this status. Deleted listings are hidden otherwise.
    pub status: Option<ListingStatus>,
    /// Only listings in this category.
    pub category: Option<String>,
    /// Only listings by this seller.
    pub seller_id: Option<MemberId>,
    /// Page number (1-indexed).
    #[serde(default = "default_page")]
    pub page: u32,
    /// Items per page (max 100).
    #[serde(default = "default_per_page")]
    pub per_page: u32,
}

impl ListingQuery {
    /// Splits the query into the service filter and the pagination.
    #[must_use]
    pub fn into_parts(self) -> (ListingFilter, PaginationParams) {
        (
            ListingFilter {
                status: self.status,
                category: self.category,
                seller_id: self.seller_id,
            },
            PaginationParams {
                page: self.page,
                per_page: self.per_page,
            },
        )
    }
}

/// Response body for `GET /listings` and `GET /favorites`.
#[derive(Debug, Serialize, ToSchema)]
pub struct ListingListResponse {
    /// Listings on this page.
    pub data: Vec<Listing>,
    /// Pagination metadata.
    pub pagination: PaginationMeta,
}

/// Response body for `POST /listings/{id}/views`.
#[derive(Debug, Serialize, ToSchema)]
pub struct ViewCountResponse {
    /// Listing viewed.
    pub listing_id: ListingId,
    /// View counter after the increment.
    pub views_count: u64,
}
