pub const BLOCK_SIZE: usize = 2880;
pub const CARD_SIZE: usize = 80;

/// Julian Day of 1970-01-01T00:00:00 UTC.
pub const JD_UNIX_EPOCH: f64 = 2_440_587.5;

pub const MINUTES_PER_DAY: f64 = 24.0 * 60.0;
