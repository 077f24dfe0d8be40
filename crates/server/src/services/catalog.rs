//! Public vendor discovery.

use std::collections::HashSet;

use serde::Serialize;
use tracing::{debug, instrument};

use washday_core::{ServiceCategory, ServiceId, VendorId};

use crate::gateway::{DataGateway, Direction, Query, Relation, select_as, select_one_as};
use crate::models::{Review, ServiceArea, ServiceListing, VendorProfile, non_blank};

use super::error::{ValidationError, WorkflowError};

/// Reviews shown on a vendor page.
const RECENT_REVIEWS: usize = 5;

/// A vendor serving the searched postal code, with its matching listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VendorMatch {
    pub vendor: VendorProfile,
    pub services: Vec<ServiceListing>,
}

/// Everything a vendor page shows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VendorDetail {
    pub vendor: VendorProfile,
    /// Active listings, cheapest first.
    pub services: Vec<ServiceListing>,
    /// Most recent reviews first.
    pub reviews: Vec<Review>,
}

/// Read-only vendor search and detail.
pub struct VendorCatalog<'a> {
    gateway: &'a dyn DataGateway,
}

impl<'a> VendorCatalog<'a> {
    #[must_use]
    pub const fn new(gateway: &'a dyn DataGateway) -> Self {
        Self { gateway }
    }

    /// Vendors serving `postal_code` that have at least one active listing
    /// (in `category`, when given).
    ///
    /// A postal code nobody serves yields an empty list.
    ///
    /// # Errors
    ///
    /// Returns `MissingPostalCode` for a blank postal code, or `Persistence`.
    #[instrument(skip(self))]
    pub async fn search_by_postal_code(
        &self,
        postal_code: &str,
        category: Option<ServiceCategory>,
    ) -> Result<Vec<VendorMatch>, WorkflowError> {
        let postal_code = non_blank(postal_code).ok_or(ValidationError::MissingPostalCode)?;

        let areas: Vec<ServiceArea> = select_as(
            self.gateway,
            Relation::VendorServiceAreas,
            &Query::new().eq("zip_code", postal_code),
        )
        .await?;

        let mut seen = HashSet::new();
        let vendor_ids: Vec<VendorId> = areas
            .into_iter()
            .map(|area| area.vendor_id)
            .filter(|id| seen.insert(*id))
            .collect();
        if vendor_ids.is_empty() {
            debug!("No vendors serve this postal code");
            return Ok(Vec::new());
        }

        let mut listing_query = Query::new()
            .any_of("vendor_id", vendor_ids.iter().copied())
            .eq("is_active", true);
        if let Some(category) = category {
            listing_query = listing_query.eq("service_type", category.as_str());
        }
        let listing_query = listing_query.order_by("price", Direction::Ascending);
        let listings: Vec<ServiceListing> =
            select_as(self.gateway, Relation::Services, &listing_query).await?;

        let vendors: Vec<VendorProfile> = select_as(
            self.gateway,
            Relation::VendorProfiles,
            &Query::new().any_of("id", vendor_ids.iter().copied()),
        )
        .await?;

        Ok(group_by_vendor(vendors, listings))
    }

    /// A vendor's page: profile, active listings and recent reviews.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown vendor, or `Persistence`.
    #[instrument(skip(self))]
    pub async fn vendor_detail(&self, vendor_id: VendorId) -> Result<VendorDetail, WorkflowError> {
        let vendor: VendorProfile = select_one_as(
            self.gateway,
            Relation::VendorProfiles,
            &Query::new().eq("id", vendor_id),
        )
        .await
        .map_err(WorkflowError::lookup("vendor"))?;

        let services = select_as(
            self.gateway,
            Relation::Services,
            &Query::new()
                .eq("vendor_id", vendor_id)
                .eq("is_active", true)
                .order_by("price", Direction::Ascending),
        )
        .await?;

        let reviews = select_as(
            self.gateway,
            Relation::Reviews,
            &Query::new()
                .eq("vendor_id", vendor_id)
                .order_by("created_at", Direction::Descending)
                .limit(RECENT_REVIEWS),
        )
        .await?;

        Ok(VendorDetail {
            vendor,
            services,
            reviews,
        })
    }

    /// An active listing, as loaded for a booking selection.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the listing does not exist or is inactive.
    pub async fn active_listing(&self, id: ServiceId) -> Result<ServiceListing, WorkflowError> {
        select_one_as(
            self.gateway,
            Relation::Services,
            &Query::new().eq("id", id).eq("is_active", true),
        )
        .await
        .map_err(WorkflowError::lookup("service"))
    }
}

/// Attach listings to their vendors, dropping vendors left with none.
/// Vendor order follows `vendors`; listing order follows `listings`.
fn group_by_vendor(vendors: Vec<VendorProfile>, listings: Vec<ServiceListing>) -> Vec<VendorMatch> {
    vendors
        .into_iter()
        .filter_map(|vendor| {
            let services: Vec<ServiceListing> = listings
                .iter()
                .filter(|listing| listing.vendor_id == vendor.id)
                .cloned()
                .collect();
            (!services.is_empty()).then_some(VendorMatch { vendor, services })
        })
        .collect()
}
