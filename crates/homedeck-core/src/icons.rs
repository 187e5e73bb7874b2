//! Button artwork for device-bound keys.
//!
//! Maps a cloud device type plus its on/off state to a 72x72 SVG, returned as
//! a base64 `data:` URI ready for the host's `setImage` command. The mapping is
//! pure: the same inputs always give the same image.

use base64::Engine as _;

/// Device type used before the real type is known.
pub const UNKNOWN_DEVICE_TYPE: &str = "devices.types.other";

const OFF_BACKGROUND: &str = "#1a1a1a";
const AMBER: &str = "#F59E0B";
const BLUE: &str = "#3B82F6";
const RED: &str = "#EF4444";
const CYAN: &str = "#06B6D4";
const DARK_CYAN: &str = "#0891B2";
const PURPLE: &str = "#A855F7";
const GREEN: &str = "#10B981";

const WHITE_FILL: &str = r##"fill="#ffffff" fill-opacity="0.9""##;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Glyph {
    Bulb,
    Socket,
    Switch,
    Thermometer,
    Snowflake,
    Fan,
    Droplet,
    Kettle,
    Fridge,
    Robot,
    Tv,
    Blinds,
    Door,
    Eye,
    Bolt,
}

impl Glyph {
    fn svg(self) -> String {
        match self {
            Glyph::Bulb => format!(
                r#"<circle cx="36" cy="28" r="10" {WHITE_FILL}/><rect x="33" y="40" width="6" height="8" rx="1" {WHITE_FILL}/><rect x="30" y="50" width="12" height="4" rx="1" {WHITE_FILL}/>"#
            ),
            Glyph::Socket => format!(
                r##"<rect x="18" y="24" width="36" height="24" rx="4" {WHITE_FILL}/><circle cx="30" cy="36" r="3" fill="#1a1a1a"/><circle cx="42" cy="36" r="3" fill="#1a1a1a"/>"##
            ),
            Glyph::Switch => format!(
                r##"<rect x="16" y="28" width="40" height="16" rx="8" fill="#ffffff" fill-opacity="0.3"/><circle cx="28" cy="36" r="6" {WHITE_FILL}/>"##
            ),
            Glyph::Thermometer => format!(
                r##"<rect x="32" y="20" width="8" height="24" rx="4" {WHITE_FILL}/><circle cx="36" cy="50" r="8" {WHITE_FILL}/><rect x="34" y="28" width="4" height="16" fill="#ff4444" fill-opacity="0.8"/>"##
            ),
            Glyph::Snowflake => r##"<path d="M36 18 L36 54 M18 36 L54 36 M24 24 L48 48 M48 24 L24 48" stroke="#ffffff" stroke-width="4" stroke-linecap="round" opacity="0.9"/>"##.to_string(),
            Glyph::Fan => format!(
                r##"<circle cx="36" cy="36" r="4" {WHITE_FILL}/><path d="M36 20 C40 24 40 32 36 36 M52 36 C48 40 40 40 36 36 M36 52 C32 48 32 40 36 36 M20 36 C24 32 32 32 36 36" fill="#ffffff" fill-opacity="0.7"/>"##
            ),
            Glyph::Droplet => format!(
                r#"<path d="M36 20 C32 28 28 32 28 38 C28 44 32 48 36 48 C40 48 44 44 44 38 C44 32 40 28 36 20 Z" {WHITE_FILL}/>"#
            ),
            Glyph::Kettle => format!(
                r##"<path d="M26 22 L46 22 C50 22 52 26 52 30 L54 48 C54 52 50 54 46 54 L26 54 C22 54 18 52 18 48 L20 30 C20 26 22 22 26 22 Z" {WHITE_FILL}/><path d="M52 30 C58 30 58 46 52 46" stroke="#ffffff" stroke-width="4" stroke-linecap="round" fill="none" opacity="0.9"/><path d="M20 32 L14 28" stroke="#ffffff" stroke-width="4" stroke-linecap="round" fill="none" opacity="0.9"/><rect x="33" y="18" width="6" height="4" rx="1" {WHITE_FILL}/>"##
            ),
            Glyph::Fridge => format!(
                r##"<rect x="24" y="18" width="24" height="36" rx="3" {WHITE_FILL}/><line x1="24" y1="36" x2="48" y2="36" stroke="#1a1a1a" stroke-width="2"/><rect x="40" y="24" width="2" height="8" rx="1" fill="#1a1a1a"/>"##
            ),
            Glyph::Robot => format!(
                r##"<rect x="20" y="32" width="32" height="20" rx="3" {WHITE_FILL}/><circle cx="30" cy="42" r="3" fill="#1a1a1a"/><circle cx="42" cy="42" r="3" fill="#1a1a1a"/><rect x="34" y="22" width="4" height="10" {WHITE_FILL}/>"##
            ),
            Glyph::Tv => format!(
                r##"<rect x="16" y="26" width="40" height="28" rx="3" {WHITE_FILL}/><path d="M26 20 L36 26 L46 20" stroke="#ffffff" stroke-width="4" stroke-linecap="round" fill="none" opacity="0.9"/>"##
            ),
            Glyph::Blinds => (0..4)
                .map(|i| {
                    format!(
                        r#"<rect x="20" y="{}" width="32" height="4" rx="1" {WHITE_FILL}/>"#,
                        20 + i * 8
                    )
                })
                .collect(),
            Glyph::Door => format!(
                r##"<rect x="24" y="18" width="24" height="36" rx="2" {WHITE_FILL}/><circle cx="42" cy="36" r="2" fill="#1a1a1a"/>"##
            ),
            Glyph::Eye => format!(
                r##"<ellipse cx="36" cy="36" rx="18" ry="12" {WHITE_FILL}/><circle cx="36" cy="36" r="6" fill="#1a1a1a"/>"##
            ),
            Glyph::Bolt => format!(
                r#"<path d="M36 18 L28 32 L34 32 L32 54 L40 40 L34 40 Z" {WHITE_FILL}/>"#
            ),
        }
    }
}

/// Split a device type like `devices.types.cooking.coffee_maker` into words.
fn type_words(device_type: &str) -> Vec<String> {
    device_type
        .split(['.', '_', '-'])
        .filter(|w| !w.is_empty())
        .map(str::to_ascii_lowercase)
        .collect()
}

fn has_any(words: &[String], candidates: &[&str]) -> bool {
    words.iter().any(|w| candidates.contains(&w.as_str()))
}

fn glyph_for(words: &[String]) -> Glyph {
    const TABLE: &[(&[&str], Glyph)] = &[
        (&["light", "lamp", "strip"], Glyph::Bulb),
        (&["socket"], Glyph::Socket),
        (&["switch"], Glyph::Switch),
        (&["thermostat", "heater"], Glyph::Thermometer),
        (&["ac", "climate"], Glyph::Snowflake),
        (&["fan"], Glyph::Fan),
        (&["humidifier", "purifier", "water", "leak"], Glyph::Droplet),
        (&["kettle", "coffee"], Glyph::Kettle),
        (&["fridge"], Glyph::Fridge),
        (&["vacuum"], Glyph::Robot),
        (&["tv"], Glyph::Tv),
        (&["curtain", "blind", "blinds"], Glyph::Blinds),
        (&["door", "gate"], Glyph::Door),
        (&["sensor", "motion"], Glyph::Eye),
    ];
    TABLE
        .iter()
        .find(|(candidates, _)| has_any(words, candidates))
        .map(|(_, glyph)| *glyph)
        .unwrap_or(Glyph::Bolt)
}

fn background_for(words: &[String], is_on: bool) -> &'static str {
    if !is_on {
        return OFF_BACKGROUND;
    }
    const TABLE: &[(&[&str], &str)] = &[
        (&["socket", "switch"], BLUE),
        (&["kettle", "coffee"], RED),
        (&["thermostat", "ac", "climate"], CYAN),
        (&["fridge"], DARK_CYAN),
        (&["sensor"], PURPLE),
        (&["curtain", "gate"], GREEN),
    ];
    TABLE
        .iter()
        .find(|(candidates, _)| has_any(words, candidates))
        .map(|(_, color)| *color)
        .unwrap_or(AMBER)
}

/// Render the SVG document for a device type and state.
pub fn device_svg(device_type: &str, is_on: bool) -> String {
    let words = type_words(device_type);
    let background = background_for(&words, is_on);
    let glyph = glyph_for(&words).svg();
    format!(
        r#"<svg width="72" height="72" viewBox="0 0 72 72" xmlns="http://www.w3.org/2000/svg"><rect width="72" height="72" rx="8" fill="{background}"/>{glyph}</svg>"#
    )
}

/// Render a device icon as a `data:image/svg+xml;base64,...` URI.
pub fn device_icon(device_type: &str, is_on: bool) -> String {
    let svg = device_svg(device_type, is_on);
    let encoded = base64::engine::general_purpose::STANDARD.encode(svg.as_bytes());
    format!("data:image/svg+xml;base64,{encoded}")
}

/// Neutral artwork shown until the first state read completes.
pub fn unknown_device_icon() -> String {
    device_icon(UNKNOWN_DEVICE_TYPE, false)
}
