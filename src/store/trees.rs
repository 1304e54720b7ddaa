pub const READ_COUNTERS: &str = "read_counters";
pub const READ_COUNTERS_BY_DAY: &str = "read_counters_by_day";
pub const CONTENTS: &str = "contents";
pub const LEGACY_READ_TOTALS: &str = "legacy_read_totals";
pub const META: &str = "meta";
