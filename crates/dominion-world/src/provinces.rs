//! The standard province map.

use dominion_types::{Province, ProvinceId, Weather};

/// Build a province.
fn province(name: &str, infrastructure: f64) -> Province {
    Province {
        id: ProvinceId::new(),
        name: name.to_owned(),
        infrastructure,
        weather: Weather::Clear,
        temperature: 20.0,
    }
}

/// The starting map: a spread of infrastructure levels so terrain
/// modifiers actually vary between battlegrounds.
pub(crate) fn standard_map() -> Vec<Province> {
    vec![
        province("Ironhold", 0.9),
        province("Port Meridian", 0.85),
        province("Caldera Basin", 0.6),
        province("Amber Plains", 0.5),
        province("Northreach", 0.4),
        province("Dust Flats", 0.2),
        province("Sable Marsh", 0.15),
        province("Frontier Ridge", 0.25),
    ]
}
