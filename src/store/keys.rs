use chrono::NaiveDate;

const DAY_FORMAT: &str = "%Y-%m-%d";

/// Zero-padded ISO date so lexicographic key order equals calendar order.
pub fn day_key(day: NaiveDate) -> String {
    day.format(DAY_FORMAT).to_string()
}

pub fn parse_day_key(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw, DAY_FORMAT).ok()
}

pub fn content_key(content_id: u64) -> String {
    format!("{:020}", content_id)
}

pub fn counter_key(content_id: u64, day: NaiveDate) -> String {
    format!("{:020}:{}", content_id, day_key(day))
}

pub fn counter_prefix(content_id: u64) -> String {
    format!("{:020}:", content_id)
}

pub fn counter_day_index_key(day: NaiveDate, content_id: u64) -> String {
    format!("{}:{:020}", day_key(day), content_id)
}

/// Inverse of [`counter_day_index_key`].
pub fn parse_counter_day_index_key(key: &[u8]) -> Option<(NaiveDate, u64)> {
    let text = std::str::from_utf8(key).ok()?;
    let (day, content_id) = text.split_once(':')?;
    Some((parse_day_key(day)?, content_id.parse().ok()?))
}

pub fn legacy_total_key(content_id: u64) -> String {
    content_key(content_id)
}
