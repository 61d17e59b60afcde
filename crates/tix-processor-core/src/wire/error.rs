use thiserror::Error;

#[derive(Debug, Error)]
pub enum WireError {
    #[error("invalid base64 message: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("message length {length} is not a multiple of the {record_len}-byte record")]
    UnalignedBlock { length: usize, record_len: usize },
    #[error("record too short: need {needed} bytes, got {actual}")]
    TooShort { needed: usize, actual: usize },
    #[error("unknown packet type byte: 0x{value:02x}")]
    UnknownPacketType { value: u8 },
}
