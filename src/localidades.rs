/// Localities of the province of San Luis offered in the locality pickers.
///
/// Order matters: the empty filter returns this slice as-is.
pub const LOCALIDADES: &[&str] = &[
    "San Luis",
    "Villa Mercedes",
    "Merlo",
    "Juana Koslay",
    "La Punta",
    "Potrero de los Funes",
    "El Trapiche",
    "Justo Daract",
    "La Toma",
    "Quines",
    "Tilisarao",
    "Santa Rosa del Conlara",
    "Concarán",
    "Naschel",
    "San Francisco del Monte de Oro",
    "Buena Esperanza",
    "Unión",
    "Nueva Galia",
    "Luján",
    "Candelaria",
    "Carpintería",
    "Los Molles",
    "Cortaderas",
    "Villa Larca",
    "Papagayos",
    "El Volcán",
    "Estancia Grande",
    "Nogolí",
    "Saladillo",
    "Fraga",
    "La Florida",
    "Carolina",
    "Desaguadero",
    "Beazley",
    "Arizona",
    "Anchorena",
];

/// Case-insensitive substring filter over [`LOCALIDADES`], preserving list order.
///
/// A blank query returns the whole list.
pub fn filter_localidades(query: &str) -> Vec<&'static str> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return LOCALIDADES.to_vec();
    }

    LOCALIDADES
        .iter()
        .copied()
        .filter(|name| name.to_lowercase().contains(&needle))
        .collect()
}

/// Canonical spelling of `name` when it matches a locality exactly, ignoring case.
pub fn canonical_localidad(name: &str) -> Option<&'static str> {
    let wanted = name.trim().to_lowercase();
    if wanted.is_empty() {
        return None;
    }

    LOCALIDADES
        .iter()
        .copied()
        .find(|candidate| candidate.to_lowercase() == wanted)
}

/// Accepts only full (case-insensitive) matches; substrings such as `"Merl"` are rejected.
pub fn is_valid_localidad(name: &str) -> bool {
    canonical_localidad(name).is_some()
}
