//! Vendor dashboard: listings, service areas and business profile.

#![allow(clippy::unwrap_used)]

use axum::http::{Method, StatusCode};
use serde_json::json;

use washday_integration_tests::TestContext;
use washday_server::gateway::Relation;

#[tokio::test]
async fn test_customers_are_forbidden_from_vendor_routes() {
    let ctx = TestContext::new();
    let (_, cookie) = ctx.customer().await;

    for path in [
        "/api/vendor/profile",
        "/api/vendor/services",
        "/api/vendor/service-areas",
        "/api/vendor/bookings",
    ] {
        let response = ctx.request(Method::GET, path, Some(&cookie), None).await;
        assert_eq!(response.status, StatusCode::FORBIDDEN, "{path}");
    }
}

#[tokio::test]
async fn test_invalid_listing_is_rejected_without_writing() {
    let ctx = TestContext::new();
    let (_, cookie) = ctx.vendor().await;

    for form in [
        json!({ "description": "Rinse", "name": "", "service_type": "basic_wash", "price": 20, "duration": 30 }),
        json!({ "description": "Rinse", "name": "Wash", "service_type": "basic_wash", "price": 0, "duration": 30 }),
        json!({ "description": "Rinse", "name": "Wash", "service_type": "basic_wash", "price": 20, "duration": 0 }),
        json!({ "description": "Rinse", "name": "Wash", "price": 20, "duration": 30 }),
    ] {
        let response = ctx
            .request(Method::POST, "/api/vendor/services", Some(&cookie), Some(form))
            .await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST, "{response:?}");
    }
    assert_eq!(ctx.gateway.count(Relation::Services).await, 0);
}

#[tokio::test]
async fn test_listings_are_scoped_to_their_vendor() {
    let ctx = TestContext::new();
    let (_, cookie) = ctx.vendor().await;
    let (_, rival_cookie) = ctx
        .sign_in(washday_core::Role::Vendor, "rival@example.com")
        .await;
    let service_id = ctx.create_service(&cookie, "Express Wash", 25.0).await;

    let own = ctx
        .request(Method::GET, "/api/vendor/services", Some(&cookie), None)
        .await;
    let rival = ctx
        .request(Method::GET, "/api/vendor/services", Some(&rival_cookie), None)
        .await;
    let toggled = ctx
        .request(
            Method::POST,
            &format!("/api/vendor/services/{service_id}/toggle"),
            Some(&rival_cookie),
            None,
        )
        .await;

    assert_eq!(own.body.as_array().unwrap().len(), 1);
    assert_eq!(rival.body, json!([]));
    assert_eq!(toggled.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_toggle_flips_active_flag_both_ways() {
    let ctx = TestContext::new();
    let (_, cookie) = ctx.vendor().await;
    let service_id = ctx.create_service(&cookie, "Express Wash", 25.0).await;
    let path = format!("/api/vendor/services/{service_id}/toggle");

    let off = ctx.request(Method::POST, &path, Some(&cookie), None).await;
    let on = ctx.request(Method::POST, &path, Some(&cookie), None).await;

    assert_eq!(off.body["is_active"], false);
    assert_eq!(on.body["is_active"], true);
}

#[tokio::test]
async fn test_delete_listing_requires_confirmation_and_no_bookings() {
    let ctx = TestContext::new();
    let (vendor_id, cookie) = ctx.vendor().await;
    let booked_id = ctx.create_service(&cookie, "Booked Wash", 25.0).await;
    let free_id = ctx.create_service(&cookie, "Free Wash", 30.0).await;

    let (_, customer_cookie) = ctx.customer().await;
    let vehicle_id = ctx.create_vehicle(&customer_cookie).await;
    let booking = ctx
        .request(
            Method::POST,
            "/api/bookings",
            Some(&customer_cookie),
            Some(TestContext::booking_form(vendor_id, &booked_id, &vehicle_id)),
        )
        .await;
    assert_eq!(booking.status, StatusCode::CREATED);

    let unconfirmed = ctx
        .request(
            Method::DELETE,
            &format!("/api/vendor/services/{free_id}"),
            Some(&cookie),
            None,
        )
        .await;
    let referenced = ctx
        .request(
            Method::DELETE,
            &format!("/api/vendor/services/{booked_id}?confirm=true"),
            Some(&cookie),
            None,
        )
        .await;
    let deleted = ctx
        .request(
            Method::DELETE,
            &format!("/api/vendor/services/{free_id}?confirm=true"),
            Some(&cookie),
            None,
        )
        .await;

    assert_eq!(unconfirmed.status, StatusCode::PRECONDITION_REQUIRED);
    assert_eq!(referenced.status, StatusCode::CONFLICT);
    assert_eq!(deleted.status, StatusCode::NO_CONTENT);
    assert_eq!(ctx.gateway.count(Relation::Services).await, 1);
}

#[tokio::test]
async fn test_service_areas_are_unique_and_removable() {
    let ctx = TestContext::new();
    let (_, cookie) = ctx.vendor().await;

    for postal_code in [" 94107 ", "94107", "10001"] {
        let response = ctx
            .request(
                Method::POST,
                "/api/vendor/service-areas",
                Some(&cookie),
                Some(json!({ "postal_code": postal_code })),
            )
            .await;
        assert!(response.status.is_success(), "{response:?}");
    }
    let areas = ctx
        .request(Method::GET, "/api/vendor/service-areas", Some(&cookie), None)
        .await;
    let codes: Vec<&str> = areas
        .body
        .as_array()
        .unwrap()
        .iter()
        .map(|area| area["zip_code"].as_str().unwrap())
        .collect();
    assert_eq!(codes, vec!["10001", "94107"]);

    let removed = ctx
        .request(
            Method::DELETE,
            "/api/vendor/service-areas/94107",
            Some(&cookie),
            None,
        )
        .await;
    let again = ctx
        .request(
            Method::DELETE,
            "/api/vendor/service-areas/94107",
            Some(&cookie),
            None,
        )
        .await;
    assert_eq!(removed.status, StatusCode::NO_CONTENT);
    assert_eq!(again.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_blank_service_area_is_rejected() {
    let ctx = TestContext::new();
    let (_, cookie) = ctx.vendor().await;

    let response = ctx
        .request(
            Method::POST,
            "/api/vendor/service-areas",
            Some(&cookie),
            Some(json!({ "postal_code": "   " })),
        )
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(ctx.gateway.count(Relation::VendorServiceAreas).await, 0);
}

#[tokio::test]
async fn test_vendor_profile_is_created_then_updated() {
    let ctx = TestContext::new();
    let (vendor_id, cookie) = ctx.vendor().await;

    let created = ctx
        .request(Method::GET, "/api/vendor/profile", Some(&cookie), None)
        .await;
    let negative = ctx
        .request(
            Method::PUT,
            "/api/vendor/profile",
            Some(&cookie),
            Some(json!({ "business_name": "Suds Mobile", "service_radius": -1 })),
        )
        .await;
    let updated = ctx
        .request(
            Method::PUT,
            "/api/vendor/profile",
            Some(&cookie),
            Some(json!({
                "business_name": "Suds Mobile",
                "description": "We come to you",
                "is_mobile": true,
                "service_radius": 15,
            })),
        )
        .await;

    assert_eq!(created.status, StatusCode::OK);
    assert_eq!(created.body["id"], vendor_id.to_string());
    assert_eq!(negative.status, StatusCode::BAD_REQUEST);
    assert_eq!(updated.status, StatusCode::OK, "{updated:?}");
    assert_eq!(updated.body["business_name"], "Suds Mobile");
    assert_eq!(updated.body["service_radius"], 15);
    assert_eq!(ctx.gateway.count(Relation::VendorProfiles).await, 1);
}
