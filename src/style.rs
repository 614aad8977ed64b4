//! Presentation policy
//!
//! Pure functions mapping counts to visual weights and colors. The graph and
//! layout math never depends on these values.

/// Opacity never exceeds this value, however heavy the transition
pub const MAX_EDGE_OPACITY: f64 = 0.8;

/// Node size before the visit bonus
pub const BASE_NODE_SIZE: f64 = 20.0;

/// Largest visit bonus added to a node
pub const MAX_NODE_BONUS: f64 = 30.0;

/// Edge opacity: `min(0.8, count / 10)`
pub fn edge_opacity(count: u64) -> f64 {
    (count as f64 / 10.0).min(MAX_EDGE_OPACITY)
}

/// Edge width: `1 + count / 10`, unbounded
pub fn edge_width(count: u64) -> f64 {
    1.0 + count as f64 / 10.0
}

/// Node size: `20 + min(30, visits / 50)`
pub fn node_size(visits: usize) -> f64 {
    BASE_NODE_SIZE + (visits as f64 / 50.0).min(MAX_NODE_BONUS)
}

/// Parse a `#RRGGBB` color
pub fn parse_hex_color(hex: &str) -> Option<(u8, u8, u8)> {
    let digits = hex.strip_prefix('#')?;
    if digits.len() != 6 || !digits.is_ascii() {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(&digits[i..i + 2], 16).ok();
    Some((channel(0)?, channel(2)?, channel(4)?))
}

/// `rgba(r, g, b, alpha)` for a `#RRGGBB` color; black when unparseable
pub fn rgba(hex: &str, alpha: f64) -> String {
    let (r, g, b) = parse_hex_color(hex).unwrap_or((0, 0, 0));
    format!("rgba({}, {}, {}, {})", r, g, b, alpha)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edge_opacity_saturates() {
        assert!((edge_opacity(1) - 0.1).abs() < 1e-9);
        assert!((edge_opacity(5) - 0.5).abs() < 1e-9);
        assert_eq!(edge_opacity(8), MAX_EDGE_OPACITY);
        assert_eq!(edge_opacity(500), MAX_EDGE_OPACITY);
    }

    #[test]
    fn test_edge_width_grows_linearly() {
        assert!((edge_width(0) - 1.0).abs() < 1e-9);
        assert!((edge_width(10) - 2.0).abs() < 1e-9);
        assert!((edge_width(1000) - 101.0).abs() < 1e-9);
    }

    #[test]
    fn test_node_size_capped() {
        assert_eq!(node_size(0), 20.0);
        assert!((node_size(100) - 22.0).abs() < 1e-9);
        assert_eq!(node_size(1500), 50.0);
        assert_eq!(node_size(1_000_000), 50.0);
    }

    #[test]
    fn test_hex_colors() {
        assert_eq!(parse_hex_color("#FF9E9E"), Some((255, 158, 158)));
        assert_eq!(parse_hex_color("#a2d5a2"), Some((162, 213, 162)));
        assert_eq!(parse_hex_color("FF9E9E"), None);
        assert_eq!(parse_hex_color("#FFF"), None);
        assert_eq!(parse_hex_color("#GG0000"), None);
        assert_eq!(rgba("#FFD580", 0.5), "rgba(255, 213, 128, 0.5)");
    }
}
