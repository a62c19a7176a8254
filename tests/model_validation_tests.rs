use chrono::Utc;
use guia_puntana::models::{
    ContactEvent, FeedPage, Profile, ProfileRequest, ReviewRequest, ServiceListing, ServiceRequest,
    UploadResponse,
};
use uuid::Uuid;

#[test]
fn test_service_request_defaults_to_active() {
    let json = serde_json::json!({
        "category_id": Uuid::new_v4(),
        "title": "Gasista",
        "description": "Instalaciones y reparaciones",
        "locality": "San Luis"
    });

    let req: ServiceRequest = serde_json::from_value(json).unwrap();

    assert!(req.is_active);
    assert!(req.price_from.is_none());
}

#[test]
fn test_service_request_can_be_paused() {
    let json = serde_json::json!({
        "category_id": Uuid::new_v4(),
        "title": "Gasista",
        "description": "Instalaciones y reparaciones",
        "locality": "San Luis",
        "is_active": false,
        "price_from": 20000
    });

    let req: ServiceRequest = serde_json::from_value(json).unwrap();

    assert!(!req.is_active);
    assert_eq!(req.price_from, Some(20000));
}

#[test]
fn test_profile_request_optional_fields() {
    let req: ProfileRequest =
        serde_json::from_str(r#"{"full_name":"Ana","locality":"Merlo"}"#).unwrap();

    assert!(req.phone.is_none());
    assert!(req.bio.is_none());
    assert!(req.avatar_url.is_none());
}

#[test]
fn test_review_request_requires_rating() {
    let missing = serde_json::from_str::<ReviewRequest>(r#"{"comment":"ok"}"#);
    assert!(missing.is_err());

    let ok: ReviewRequest = serde_json::from_str(r#"{"rating":3}"#).unwrap();
    assert_eq!(ok.rating, 3);
    assert!(ok.comment.is_none());
}

#[test]
fn test_profile_admin_role() {
    let admin = Profile {
        role: "admin".to_string(),
        ..Profile::default()
    };
    let user = Profile {
        role: "user".to_string(),
        ..Profile::default()
    };

    assert!(admin.is_admin());
    assert!(!user.is_admin());
}

#[test]
fn test_listing_serializes_flat_fields() {
    let listing = ServiceListing {
        id: Uuid::new_v4(),
        title: "Fletes".to_string(),
        provider_phone: None,
        average_rating: Some(4.5),
        review_count: 2,
        created_at: Utc::now(),
        ..ServiceListing::default()
    };

    let json = serde_json::to_value(&listing).unwrap();

    assert_eq!(json["title"], "Fletes");
    assert!(json["provider_phone"].is_null());
    assert_eq!(json["average_rating"], 4.5);
    assert_eq!(json["review_count"], 2);
}

#[test]
fn test_feed_page_without_selection() {
    let page = FeedPage {
        page_size: 12,
        ..FeedPage::default()
    };

    let json = serde_json::to_value(&page).unwrap();

    assert!(json["selected"].is_null());
    assert_eq!(json["has_more"], false);
    assert_eq!(json["items"], serde_json::json!([]));
}

#[test]
fn test_upload_response_for_documents_has_no_public_url() {
    let response = UploadResponse {
        upload_url: "http://storage/documents/u/x.pdf?sig".to_string(),
        resource_key: "u/x.pdf".to_string(),
        public_url: None,
    };

    let json = serde_json::to_string(&response).unwrap();

    assert!(json.contains(r#""public_url":null"#));
}

#[test]
fn test_anonymous_contact_event() {
    let event = ContactEvent {
        service_id: Uuid::new_v4(),
        provider_id: Uuid::new_v4(),
        viewer_id: None,
    };

    let json = serde_json::to_value(&event).unwrap();

    assert!(json["viewer_id"].is_null());
}
