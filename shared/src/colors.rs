/// Colors offered by the paint palette, in display order.
pub const PALETTE: &[&str] = &[
    "#FF0000", "#FF8C00", "#FFD700", "#32CD32", "#1E90FF", "#8A2BE2", "#FF69B4", "#000000",
    "#FFFFFF",
];

/// Deterministic starting paint color for a user via CRC32 hash of the user id.
/// The hash picks the hue; saturation and lightness are fixed so every user
/// gets a clearly visible color.
pub fn user_color(user_id: &str) -> (u8, u8, u8) {
    let hash = crc32fast::hash(user_id.as_bytes());
    let hue = (hash % 360) as f64;
    hsl_to_rgb(hue, 0.75, 0.5)
}

/// Format RGB as a `#RRGGBB` CSS color.
pub fn hex_css(r: u8, g: u8, b: u8) -> String {
    format!("#{r:02X}{g:02X}{b:02X}")
}

/// Parse `#RGB` or `#RRGGBB` into (r, g, b).
pub fn parse_hex_color(value: &str) -> Option<(u8, u8, u8)> {
    let hex = value.strip_prefix('#')?;
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    match hex.len() {
        3 => {
            let mut channels = hex.chars().map(|c| {
                let v = c.to_digit(16).unwrap_or(0) as u8;
                v * 17
            });
            Some((channels.next()?, channels.next()?, channels.next()?))
        }
        6 => Some((
            u8::from_str_radix(&hex[0..2], 16).ok()?,
            u8::from_str_radix(&hex[2..4], 16).ok()?,
            u8::from_str_radix(&hex[4..6], 16).ok()?,
        )),
        _ => None,
    }
}

/// Whether a string is a color the paint API accepts: hex, `rgb()` or `rgba()`.
pub fn is_paint_color(value: &str) -> bool {
    let value = value.trim();
    if value.starts_with('#') {
        return parse_hex_color(value).is_some();
    }
    let Some(args) = value
        .strip_prefix("rgba(")
        .or_else(|| value.strip_prefix("rgb("))
        .and_then(|rest| rest.strip_suffix(')'))
    else {
        return false;
    };
    let parts: Vec<&str> = args.split(',').map(str::trim).collect();
    let expected = if value.starts_with("rgba(") { 4 } else { 3 };
    if parts.len() != expected {
        return false;
    }
    let channels_ok = parts[..3].iter().all(|part| part.parse::<u8>().is_ok());
    let alpha_ok = parts
        .get(3)
        .is_none_or(|alpha| alpha.parse::<f64>().is_ok_and(|a| (0.0..=1.0).contains(&a)));
    channels_ok && alpha_ok
}

/// Convert HSL to RGB. `h` in degrees, `s` and `l` in 0..1.
pub fn hsl_to_rgb(h: f64, s: f64, l: f64) -> (u8, u8, u8) {
    if s.abs() < f64::EPSILON {
        let v = (l * 255.0).round() as u8;
        return (v, v, v);
    }

    let q = if l < 0.5 {
        l * (1.0 + s)
    } else {
        l + s - l * s
    };
    let p = 2.0 * l - q;
    let h = h / 360.0;

    let r = hue_to_rgb(p, q, h + 1.0 / 3.0);
    let g = hue_to_rgb(p, q, h);
    let b = hue_to_rgb(p, q, h - 1.0 / 3.0);

    (
        (r * 255.0).round() as u8,
        (g * 255.0).round() as u8,
        (b * 255.0).round() as u8,
    )
}

fn hue_to_rgb(p: f64, q: f64, mut t: f64) -> f64 {
    if t < 0.0 {
        t += 1.0;
    }
    if t > 1.0 {
        t -= 1.0;
    }
    if t < 1.0 / 6.0 {
        p + (q - p) * 6.0 * t
    } else if t < 1.0 / 2.0 {
        q
    } else if t < 2.0 / 3.0 {
        p + (q - p) * (2.0 / 3.0 - t) * 6.0
    } else {
        p
    }
}
