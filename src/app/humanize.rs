use time::Duration;

const MILLIS_PER_UNIT: [(&str, i128); 6] = [
    ("week", 604_800_000),
    ("day", 86_400_000),
    ("hour", 3_600_000),
    ("minute", 60_000),
    ("second", 1_000),
    ("millisecond", 1),
];

/// Every unit down to milliseconds.
pub const FULL_PRECISION: usize = MILLIS_PER_UNIT.len() + 1;

/// Renders a span such as `1 week, 2 days, 3 hours`, largest unit first.
pub fn humanize(duration: Duration) -> String {
    humanize_with_precision(duration, FULL_PRECISION)
}

/// Like [`humanize`] but stops after `precision` non-zero units.
pub fn humanize_with_precision(duration: Duration, precision: usize) -> String {
    let mut remaining = duration.whole_milliseconds();
    let mut parts = Vec::new();

    for (unit, millis) in MILLIS_PER_UNIT {
        if parts.len() >= precision || remaining <= 0 {
            break;
        }
        let count = remaining / millis;
        if count > 0 {
            remaining -= count * millis;
            let plural = if count == 1 { "" } else { "s" };
            parts.push(format!("{} {}{}", count, unit, plural));
        }
    }

    if parts.is_empty() {
        return "0 seconds".to_string();
    }
    parts.join(", ")
}
