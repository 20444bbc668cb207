//! Timezone offset resolution
//!
//! Accepts `UTC`/`GMT`/`Z`, offset forms such as `UTC+5`, `GMT-03:30`, `+05:30`,
//! and a fixed table of common IANA zone names. IANA names resolve to their
//! standard (non-daylight) offset.

/// Common IANA zones and their standard UTC offsets in minutes
const ZONE_OFFSETS: &[(&str, i32)] = &[
    ("pacific/honolulu", -600),
    ("america/anchorage", -540),
    ("america/los_angeles", -480),
    ("america/vancouver", -480),
    ("america/tijuana", -480),
    ("america/denver", -420),
    ("america/phoenix", -420),
    ("america/edmonton", -420),
    ("america/chicago", -360),
    ("america/mexico_city", -360),
    ("america/winnipeg", -360),
    ("america/new_york", -300),
    ("america/toronto", -300),
    ("america/bogota", -300),
    ("america/lima", -300),
    ("america/halifax", -240),
    ("america/caracas", -240),
    ("america/santiago", -240),
    ("america/st_johns", -210),
    ("america/sao_paulo", -180),
    ("america/argentina/buenos_aires", -180),
    ("america/buenos_aires", -180),
    ("atlantic/azores", -60),
    ("europe/london", 0),
    ("europe/dublin", 0),
    ("europe/lisbon", 0),
    ("africa/casablanca", 0),
    ("africa/accra", 0),
    ("europe/paris", 60),
    ("europe/berlin", 60),
    ("europe/madrid", 60),
    ("europe/rome", 60),
    ("europe/amsterdam", 60),
    ("europe/brussels", 60),
    ("europe/stockholm", 60),
    ("europe/warsaw", 60),
    ("africa/lagos", 60),
    ("europe/athens", 120),
    ("europe/kiev", 120),
    ("europe/kyiv", 120),
    ("europe/bucharest", 120),
    ("africa/cairo", 120),
    ("africa/johannesburg", 120),
    ("asia/jerusalem", 120),
    ("europe/istanbul", 180),
    ("europe/moscow", 180),
    ("asia/riyadh", 180),
    ("africa/nairobi", 180),
    ("asia/tehran", 210),
    ("asia/dubai", 240),
    ("asia/kabul", 270),
    ("asia/karachi", 300),
    ("asia/tashkent", 300),
    ("asia/kolkata", 330),
    ("asia/calcutta", 330),
    ("asia/colombo", 330),
    ("asia/kathmandu", 345),
    ("asia/dhaka", 360),
    ("asia/yangon", 390),
    ("asia/bangkok", 420),
    ("asia/jakarta", 420),
    ("asia/ho_chi_minh", 420),
    ("asia/manila", 480),
    ("asia/singapore", 480),
    ("asia/kuala_lumpur", 480),
    ("asia/shanghai", 480),
    ("asia/hong_kong", 480),
    ("asia/taipei", 480),
    ("australia/perth", 480),
    ("asia/tokyo", 540),
    ("asia/seoul", 540),
    ("australia/adelaide", 570),
    ("australia/darwin", 570),
    ("australia/sydney", 600),
    ("australia/melbourne", 600),
    ("australia/brisbane", 600),
    ("pacific/guam", 600),
    ("pacific/noumea", 660),
    ("pacific/auckland", 720),
    ("pacific/fiji", 720),
];

/// Resolve a timezone identifier to its UTC offset in minutes
///
/// ```
/// use staffline_match_engine::scoring::timezone::utc_offset_minutes;
///
/// assert_eq!(utc_offset_minutes("UTC"), Some(0));
/// assert_eq!(utc_offset_minutes("UTC-5"), Some(-300));
/// assert_eq!(utc_offset_minutes("+05:30"), Some(330));
/// assert_eq!(utc_offset_minutes("Asia/Manila"), Some(480));
/// assert_eq!(utc_offset_minutes("Nowhere/Special"), None);
/// ```
pub fn utc_offset_minutes(timezone: &str) -> Option<i32> {
    let tz = timezone.trim();
    if tz.is_empty() {
        return None;
    }

    let lowered = tz.to_ascii_lowercase();
    if matches!(lowered.as_str(), "utc" | "gmt" | "z" | "etc/utc" | "etc/gmt") {
        return Some(0);
    }

    let offset_part = lowered
        .strip_prefix("utc")
        .or_else(|| lowered.strip_prefix("gmt"))
        .unwrap_or(&lowered);
    if offset_part.starts_with('+') || offset_part.starts_with('-') {
        return parse_offset(offset_part);
    }

    let key = lowered.replace(' ', "_");
    ZONE_OFFSETS
        .iter()
        .find(|(zone, _)| *zone == key)
        .map(|(_, minutes)| *minutes)
}

/// Parse `+H`, `-HH`, `+HH:MM` or `+HHMM`
fn parse_offset(raw: &str) -> Option<i32> {
    let (sign, rest) = match *raw.as_bytes().first()? {
        b'+' => (1, &raw[1..]),
        b'-' => (-1, &raw[1..]),
        _ => return None,
    };
    if rest.is_empty() || !rest.bytes().all(|b| b.is_ascii_digit() || b == b':') {
        return None;
    }

    let (hours, minutes) = if let Some((h, m)) = rest.split_once(':') {
        (h.parse::<i32>().ok()?, m.parse::<i32>().ok()?)
    } else if rest.len() == 4 {
        (rest[..2].parse::<i32>().ok()?, rest[2..].parse::<i32>().ok()?)
    } else {
        (rest.parse::<i32>().ok()?, 0)
    };

    if !(0..=14).contains(&hours) || !(0..60).contains(&minutes) {
        return None;
    }
    Some(sign * (hours * 60 + minutes))
}

/// Absolute offset difference between two zones in hours
pub fn offset_difference_hours(a: &str, b: &str) -> Option<f64> {
    let a = utc_offset_minutes(a)?;
    let b = utc_offset_minutes(b)?;
    Some(f64::from((a - b).abs()) / 60.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offset_forms() {
        assert_eq!(utc_offset_minutes("GMT+1"), Some(60));
        assert_eq!(utc_offset_minutes("utc-03:30"), Some(-210));
        assert_eq!(utc_offset_minutes("+0545"), Some(345));
        assert_eq!(utc_offset_minutes("UTC+15"), None);
        assert_eq!(utc_offset_minutes("UTC+5:75"), None);
        assert_eq!(utc_offset_minutes(""), None);
    }

    #[test]
    fn test_malformed_offsets_do_not_resolve() {
        assert_eq!(utc_offset_minutes("UTC+1é1"), None);
        assert_eq!(utc_offset_minutes("+é"), None);
        assert_eq!(utc_offset_minutes("UTC++5"), None);
        assert_eq!(utc_offset_minutes("UTC+"), None);
        assert_eq!(offset_difference_hours("UTC+1é1", "UTC"), None);
    }

    #[test]
    fn test_iana_is_case_insensitive() {
        assert_eq!(utc_offset_minutes("america/NEW_YORK"), Some(-300));
    }

    #[test]
    fn test_difference() {
        assert_eq!(offset_difference_hours("America/New_York", "Europe/London"), Some(5.0));
        assert_eq!(offset_difference_hours("Asia/Kolkata", "UTC"), Some(5.5));
        assert_eq!(offset_difference_hours("UTC", "Nowhere"), None);
    }
}
