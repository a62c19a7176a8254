use guia_puntana::localidades::{
    LOCALIDADES, canonical_localidad, filter_localidades, is_valid_localidad,
};

#[test]
fn test_empty_filter_returns_full_list_in_order() {
    assert_eq!(filter_localidades(""), LOCALIDADES.to_vec());
    assert_eq!(filter_localidades("   "), LOCALIDADES.to_vec());
}

#[test]
fn test_filter_is_case_insensitive() {
    let expected = vec!["Merlo"];
    assert_eq!(filter_localidades("merlo"), expected);
    assert_eq!(filter_localidades("MERLO"), expected);
    assert_eq!(filter_localidades("mErLo"), expected);
}

#[test]
fn test_filter_matches_substrings_in_list_order() {
    let villas = filter_localidades("villa");
    assert_eq!(villas, vec!["Villa Mercedes", "Villa Larca"]);

    let positions: Vec<usize> = filter_localidades("la")
        .iter()
        .map(|name| LOCALIDADES.iter().position(|l| l == name).unwrap())
        .collect();
    assert!(positions.windows(2).all(|w| w[0] < w[1]));
}

#[test]
fn test_unknown_locality_yields_nothing() {
    assert!(filter_localidades("Córdoba").is_empty());
}

#[test]
fn test_validity_requires_full_match() {
    assert!(is_valid_localidad("Merlo"));
    assert!(is_valid_localidad("merlo"));
    assert!(is_valid_localidad("  VILLA MERCEDES "));
    assert!(!is_valid_localidad("Merl"));
    assert!(!is_valid_localidad(""));
    assert!(!is_valid_localidad("Córdoba"));
}

#[test]
fn test_canonical_spelling() {
    assert_eq!(canonical_localidad("san luis"), Some("San Luis"));
    assert_eq!(canonical_localidad("concarán"), Some("Concarán"));
    assert_eq!(canonical_localidad("Villa"), None);
}
