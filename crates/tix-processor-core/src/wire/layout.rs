pub const DAY_TIMESTAMP_RANGE: std::ops::Range<usize> = 0..8;
pub const PACKET_TYPE_OFFSET: usize = 8;
pub const PACKET_SIZE_RANGE: std::ops::Range<usize> = 9..13;
pub const INITIAL_TIMESTAMP_RANGE: std::ops::Range<usize> = 13..21;
pub const RECEPTION_TIMESTAMP_RANGE: std::ops::Range<usize> = 21..29;
pub const SENT_TIMESTAMP_RANGE: std::ops::Range<usize> = 29..37;
pub const FINAL_TIMESTAMP_RANGE: std::ops::Range<usize> = 37..45;

/// Serialized observation size: 8 + 1 + 4 + 4 * 8 bytes.
pub const RECORD_LEN: usize = 45;
