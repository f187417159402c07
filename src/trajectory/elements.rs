/// Fallback radius for unknown elements.
const DEFAULT_RADIUS: f32 = 1.5;

/// Van der Waals radius (Å) for an element symbol, case-insensitive.
///
/// Used as the per-particle scalar packed next to each position.
#[must_use]
pub fn element_radius(element: &str) -> f32 {
    match element.trim().to_ascii_uppercase().as_str() {
        "H" => 1.10,
        "C" => 1.70,
        "N" => 1.55,
        "O" => 1.52,
        "F" => 1.47,
        "P" => 1.80,
        "S" => 1.80,
        "CL" => 1.75,
        "NA" => 2.27,
        "MG" => 1.73,
        "K" => 2.75,
        "CA" => 2.31,
        "FE" => 1.94,
        "ZN" => 1.39,
        "AU" => 1.66,
        _ => DEFAULT_RADIUS,
    }
}
