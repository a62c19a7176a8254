use std::collections::BTreeMap;

use guia_puntana::{
    forms::{field_error, field_messages, validate_phone},
    models::{
        LoginRequest, ProfileRequest, RegisterRequest, ReportRequest, ReviewRequest,
        ServiceRequest, UpdateEmailRequest, UpdatePasswordRequest,
    },
};
use uuid::Uuid;
use validator::Validate;

fn messages<T: Validate>(form: &T) -> BTreeMap<String, String> {
    field_messages(&form.validate().expect_err("form should be rejected"))
}

fn valid_profile() -> ProfileRequest {
    ProfileRequest {
        full_name: "Juana Pérez".to_string(),
        phone: Some("(0266) 442-1234".to_string()),
        locality: "Merlo".to_string(),
        bio: Some("Costurera con 20 años de experiencia.".to_string()),
        avatar_url: None,
    }
}

fn valid_service() -> ServiceRequest {
    ServiceRequest {
        category_id: Uuid::new_v4(),
        title: "Arreglos de ropa".to_string(),
        description: "Ruedos, cierres y ajustes en el día.".to_string(),
        price_from: Some(5000),
        locality: "San Luis".to_string(),
        is_active: true,
    }
}

fn email(address: &str) -> UpdateEmailRequest {
    UpdateEmailRequest {
        email: address.to_string(),
    }
}

#[test]
fn test_email_shape() {
    assert!(email("ana@example.com").validate().is_ok());
    assert!(email("ana@mail.com.ar").validate().is_ok());
    for bad in ["", "ana", "ana@", "@example.com", "ana maria@example.com"] {
        assert_eq!(
            messages(&email(bad)).get("email").map(String::as_str),
            Some("Ingresá un email válido."),
            "{bad:?}"
        );
    }
}

#[test]
fn test_login_rules() {
    let ok = LoginRequest {
        email: "ana@example.com".to_string(),
        password: "x".to_string(),
    };
    assert!(ok.validate().is_ok());

    let errors = messages(&LoginRequest::default());
    assert!(errors.contains_key("email"));
    assert_eq!(errors["password"], "Ingresá tu contraseña.");
}

#[test]
fn test_register_rules() {
    let ok = RegisterRequest {
        email: "ana@example.com".to_string(),
        password: "12345678".to_string(),
        password_confirmation: "12345678".to_string(),
    };
    assert!(ok.validate().is_ok());

    let errors = messages(&RegisterRequest {
        password: "corta".to_string(),
        password_confirmation: "distinta".to_string(),
        ..ok.clone()
    });
    assert!(errors.contains_key("password"));
    assert!(errors.contains_key("password_confirmation"));
    assert!(!errors.contains_key("email"));
}

#[test]
fn test_profile_rules() {
    assert!(valid_profile().validate().is_ok());
    assert!(
        ProfileRequest {
            phone: None,
            bio: None,
            ..valid_profile()
        }
        .validate()
        .is_ok()
    );

    let errors = messages(&ProfileRequest {
        full_name: "J".to_string(),
        phone: Some("123".to_string()),
        locality: "Merl".to_string(),
        bio: Some("x".repeat(501)),
        avatar_url: None,
    });
    assert_eq!(errors.len(), 4);
    assert_eq!(errors["full_name"], "Ingresá tu nombre.");
    assert_eq!(errors["locality"], "Elegí una localidad de la lista.");

    // Padding does not count towards the name.
    let blank_name = messages(&ProfileRequest {
        full_name: "   ".to_string(),
        ..valid_profile()
    });
    assert!(blank_name.contains_key("full_name"));

    let letters = messages(&ProfileRequest {
        phone: Some("2664-ABC-1234".to_string()),
        ..valid_profile()
    });
    assert!(letters.contains_key("phone"));
}

#[test]
fn test_phone_digit_count() {
    assert!(validate_phone("2664 123456").is_ok());
    assert!(validate_phone("+54 9 266 412-3456").is_ok());
    assert!(validate_phone("").is_ok());
    assert!(validate_phone("1234567").is_err());
    assert!(validate_phone("1234567890123456").is_err());
}

#[test]
fn test_service_rules() {
    assert!(valid_service().validate().is_ok());
    assert!(
        ServiceRequest {
            price_from: None,
            ..valid_service()
        }
        .validate()
        .is_ok()
    );

    let errors = messages(&ServiceRequest {
        title: "ab".to_string(),
        description: "corto".to_string(),
        price_from: Some(-1),
        locality: "".to_string(),
        ..valid_service()
    });
    assert!(errors.contains_key("title"));
    assert!(errors.contains_key("description"));
    assert_eq!(errors["price_from"], "El precio no puede ser negativo.");
    assert_eq!(errors["locality"], "Elegí una localidad.");
}

#[test]
fn test_review_rules() {
    for rating in 1..=5 {
        let review = ReviewRequest {
            rating,
            comment: None,
        };
        assert!(review.validate().is_ok(), "rating {rating}");
    }
    for rating in [0, 6, -1] {
        let review = ReviewRequest {
            rating,
            comment: None,
        };
        assert_eq!(
            messages(&review)["rating"],
            "La calificación va de 1 a 5 estrellas."
        );
    }
    let long = ReviewRequest {
        rating: 5,
        comment: Some("a".repeat(1001)),
    };
    assert!(messages(&long).contains_key("comment"));
}

#[test]
fn test_report_rules() {
    let spam = ReportRequest {
        reason: "spam".to_string(),
        details: None,
    };
    assert!(spam.validate().is_ok());

    let unknown = ReportRequest {
        reason: "me cae mal".to_string(),
        details: None,
    };
    assert_eq!(messages(&unknown)["reason"], "Elegí un motivo.");

    let other_without_details = ReportRequest {
        reason: "otro".to_string(),
        details: Some("   ".to_string()),
    };
    let errors = messages(&other_without_details);
    assert_eq!(errors["details"], "Contanos qué pasó.");
    assert_eq!(errors.len(), 1);

    let other = ReportRequest {
        reason: "otro".to_string(),
        details: Some("Pide pagos por adelantado.".to_string()),
    };
    assert!(other.validate().is_ok());

    let too_long = ReportRequest {
        reason: "fraude".to_string(),
        details: Some("a".repeat(1001)),
    };
    assert!(messages(&too_long).contains_key("details"));
}

#[test]
fn test_password_update_rules() {
    let mismatch = UpdatePasswordRequest {
        password: "12345678".to_string(),
        password_confirmation: "87654321".to_string(),
    };
    assert_eq!(
        messages(&mismatch)["password_confirmation"],
        "Las contraseñas no coinciden."
    );

    let short = UpdatePasswordRequest {
        password: "1234567".to_string(),
        password_confirmation: "1234567".to_string(),
    };
    assert!(messages(&short).contains_key("password"));
}

#[test]
fn test_single_field_error() {
    let errors = field_messages(&field_error("status", "Estado inválido."));
    assert_eq!(errors.len(), 1);
    assert_eq!(errors["status"], "Estado inválido.");
}
