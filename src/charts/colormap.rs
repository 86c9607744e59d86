//! Colormaps shared by the heatmap and the choropleth renders.

/// Map a value into [0, 1] within the given range; values outside the
/// range clamp to the endpoints. A degenerate range maps everything to 0.5.
pub fn normalize(value: f64, min: f64, max: f64) -> f64 {
    if max <= min {
        return 0.5;
    }
    ((value - min) / (max - min)).clamp(0.0, 1.0)
}

fn lerp(a: (u8, u8, u8), b: (u8, u8, u8), t: f64) -> (u8, u8, u8) {
    let mix = |x: u8, y: u8| (x as f64 + (y as f64 - x as f64) * t).round() as u8;
    (mix(a.0, b.0), mix(a.1, b.1), mix(a.2, b.2))
}

/// Diverging blue -> white -> red map for the choropleths.
pub fn coolwarm(t: f64) -> (u8, u8, u8) {
    const COOL: (u8, u8, u8) = (59, 76, 192);
    const NEUTRAL: (u8, u8, u8) = (221, 221, 221);
    const WARM: (u8, u8, u8) = (180, 4, 38);

    let t = t.clamp(0.0, 1.0);
    if t < 0.5 {
        lerp(COOL, NEUTRAL, t * 2.0)
    } else {
        lerp(NEUTRAL, WARM, (t - 0.5) * 2.0)
    }
}

/// Diverging blue -> orange map for the heatmap.
pub fn blue_orange(t: f64) -> (u8, u8, u8) {
    const BLUE: (u8, u8, u8) = (33, 102, 172);
    const NEUTRAL: (u8, u8, u8) = (247, 247, 247);
    const ORANGE: (u8, u8, u8) = (230, 126, 34);

    let t = t.clamp(0.0, 1.0);
    if t < 0.5 {
        lerp(BLUE, NEUTRAL, t * 2.0)
    } else {
        lerp(NEUTRAL, ORANGE, (t - 0.5) * 2.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_clamps_and_centers() {
        assert_eq!(normalize(5.0, 0.0, 10.0), 0.5);
        assert_eq!(normalize(-3.0, 0.0, 10.0), 0.0);
        assert_eq!(normalize(42.0, 0.0, 10.0), 1.0);
        // degenerate range
        assert_eq!(normalize(7.0, 3.0, 3.0), 0.5);
    }

    #[test]
    fn endpoints_map_to_endpoint_colors() {
        assert_eq!(coolwarm(0.0), (59, 76, 192));
        assert_eq!(coolwarm(1.0), (180, 4, 38));
        assert_eq!(blue_orange(0.0), (33, 102, 172));
        assert_eq!(blue_orange(1.0), (230, 126, 34));
    }

    #[test]
    fn midpoint_is_the_neutral_color() {
        assert_eq!(coolwarm(0.5), (221, 221, 221));
        assert_eq!(blue_orange(0.5), (247, 247, 247));
    }
}
