/// Parsed geographic point
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Axis {
    Latitude,
    Longitude,
}

impl Coordinates {
    /// Parse "lat, lon" in decimal or degree/minute/second notation.
    ///
    /// Accepts "40.7128, -74.0060", "40° 42′ 46″ N, 74° 0′ 22″ W" and the
    /// comma-less "40°42′46″N 74°0′22″W". Out-of-range values yield None.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let s = raw.trim().replace('−', "-");
        if s.is_empty() {
            return None;
        }

        let (lat_str, lon_str) = split_pair(&s)?;
        let lat = parse_part(lat_str, Axis::Latitude)?;
        let lon = parse_part(lon_str, Axis::Longitude)?;

        if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
            return None;
        }
        Some(Self { lat, lon })
    }
}

impl std::fmt::Display for Coordinates {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}, {}", self.lat, self.lon)
    }
}

fn split_pair(s: &str) -> Option<(&str, &str)> {
    let commas = s.matches(',').count();
    if commas == 1 {
        return s.split_once(',');
    }
    if commas == 0 && s.matches(';').count() == 1 {
        return s.split_once(';');
    }
    // "40°26′46″N 79°58′56″W": split right after the N/S marker
    let idx = s.find(['N', 'S'])?;
    let (lat, lon) = s.split_at(idx + 1);
    Some((lat, lon))
}

fn parse_part(part: &str, axis: Axis) -> Option<f64> {
    let mut s = part.trim();
    let mut negative = false;

    // Direction letter, before or after the number
    let direction = s
        .chars()
        .last()
        .filter(|c| matches!(c, 'N' | 'S' | 'E' | 'W'))
        .or_else(|| s.chars().next().filter(|c| matches!(c, 'N' | 'S' | 'E' | 'W')));
    if let Some(dir) = direction {
        let valid = match axis {
            Axis::Latitude => matches!(dir, 'N' | 'S'),
            Axis::Longitude => matches!(dir, 'E' | 'W'),
        };
        if !valid {
            return None;
        }
        negative = matches!(dir, 'S' | 'W');
        s = s.trim_matches(|c| matches!(c, 'N' | 'S' | 'E' | 'W')).trim();
    }

    if let Some(rest) = s.strip_prefix('-') {
        negative = !negative;
        s = rest.trim();
    }

    let components: Vec<f64> = s
        .split(|c: char| matches!(c, '°' | '′' | '\'' | '″' | '"') || c.is_whitespace())
        .filter(|p| !p.is_empty())
        .map(str::parse::<f64>)
        .collect::<Result<_, _>>()
        .ok()?;

    let value = match components.as_slice() {
        [deg] => *deg,
        [deg, min] => deg + min / 60.0,
        [deg, min, sec] => deg + min / 60.0 + sec / 3600.0,
        _ => return None,
    };
    if components.len() > 1 && components.iter().any(|c| *c < 0.0) {
        return None;
    }

    Some(if negative { -value } else { value })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-4
    }

    #[test]
    fn test_decimal() {
        let c = Coordinates::parse("40.7128, -74.0060").unwrap();
        assert!(close(c.lat, 40.7128));
        assert!(close(c.lon, -74.006));
    }

    #[test]
    fn test_degrees_minutes_seconds() {
        let c = Coordinates::parse("40° 26′ 46″ N, 79° 58′ 56″ W").unwrap();
        assert!(close(c.lat, 40.446_111));
        assert!(close(c.lon, -79.982_222));

        let c = Coordinates::parse("40°26'46\"N 79°58'56\"W").unwrap();
        assert!(close(c.lat, 40.446_111));
        assert!(close(c.lon, -79.982_222));
    }

    #[test]
    fn test_unicode_minus() {
        let c = Coordinates::parse("−33.86, 151.2").unwrap();
        assert!(close(c.lat, -33.86));
    }

    #[test]
    fn test_invalid() {
        assert_eq!(Coordinates::parse(""), None);
        assert_eq!(Coordinates::parse("north pole"), None);
        assert_eq!(Coordinates::parse("95, 10"), None);
        assert_eq!(Coordinates::parse("10, 200"), None);
        assert_eq!(Coordinates::parse("10 E, 20 N"), None);
    }
}
