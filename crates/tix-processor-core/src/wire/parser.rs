use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;

use crate::{Observation, PacketType};

use super::error::WireError;
use super::layout;
use super::reader::RecordReader;

/// Decode a report's base64 `message` into observations.
///
/// The decoded block must be a whole number of 45-byte records; an empty
/// message yields an empty batch.
pub fn deserialize_observations(message: &str) -> Result<Vec<Observation>, WireError> {
    let block = BASE64.decode(message)?;
    if block.len() % layout::RECORD_LEN != 0 {
        return Err(WireError::UnalignedBlock {
            length: block.len(),
            record_len: layout::RECORD_LEN,
        });
    }

    let mut observations = Vec::with_capacity(block.len() / layout::RECORD_LEN);
    for record in block.chunks_exact(layout::RECORD_LEN) {
        observations.push(parse_record(record)?);
    }
    Ok(observations)
}

/// Encode observations as the base64 `message` carried by a report.
///
/// Exact inverse of [`deserialize_observations`].
pub fn serialize_observations(observations: &[Observation]) -> String {
    let mut block = Vec::with_capacity(observations.len() * layout::RECORD_LEN);
    for observation in observations {
        block.extend_from_slice(&observation.day_timestamp.to_be_bytes());
        block.push(observation.packet_type.as_byte());
        block.extend_from_slice(&observation.packet_size.to_be_bytes());
        block.extend_from_slice(&observation.initial_timestamp.to_be_bytes());
        block.extend_from_slice(&observation.reception_timestamp.to_be_bytes());
        block.extend_from_slice(&observation.sent_timestamp.to_be_bytes());
        block.extend_from_slice(&observation.final_timestamp.to_be_bytes());
    }
    BASE64.encode(block)
}

fn parse_record(record: &[u8]) -> Result<Observation, WireError> {
    let reader = RecordReader::new(record);

    let type_byte = reader.read_u8(layout::PACKET_TYPE_OFFSET)?;
    let packet_type =
        PacketType::from_byte(type_byte).ok_or(WireError::UnknownPacketType { value: type_byte })?;

    Ok(Observation {
        day_timestamp: reader.read_i64_be(layout::DAY_TIMESTAMP_RANGE)?,
        packet_type,
        packet_size: reader.read_i32_be(layout::PACKET_SIZE_RANGE)?,
        initial_timestamp: reader.read_i64_be(layout::INITIAL_TIMESTAMP_RANGE)?,
        reception_timestamp: reader.read_i64_be(layout::RECEPTION_TIMESTAMP_RANGE)?,
        sent_timestamp: reader.read_i64_be(layout::SENT_TIMESTAMP_RANGE)?,
        final_timestamp: reader.read_i64_be(layout::FINAL_TIMESTAMP_RANGE)?,
    })
}
