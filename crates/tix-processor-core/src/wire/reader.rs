use super::error::WireError;

pub struct RecordReader<'a> {
    record: &'a [u8],
}

impl<'a> RecordReader<'a> {
    pub fn new(record: &'a [u8]) -> Self {
        Self { record }
    }

    pub fn read_i64_be(&self, range: std::ops::Range<usize>) -> Result<i64, WireError> {
        let bytes = self.read_slice(range)?;
        let bytes: [u8; 8] = bytes.try_into().map_err(|_| WireError::TooShort {
            needed: 8,
            actual: bytes.len(),
        })?;
        Ok(i64::from_be_bytes(bytes))
    }

    pub fn read_i32_be(&self, range: std::ops::Range<usize>) -> Result<i32, WireError> {
        let bytes = self.read_slice(range)?;
        let bytes: [u8; 4] = bytes.try_into().map_err(|_| WireError::TooShort {
            needed: 4,
            actual: bytes.len(),
        })?;
        Ok(i32::from_be_bytes(bytes))
    }

    pub fn read_u8(&self, offset: usize) -> Result<u8, WireError> {
        self.record
            .get(offset)
            .copied()
            .ok_or(WireError::TooShort {
                needed: offset + 1,
                actual: self.record.len(),
            })
    }

    pub fn read_slice(&self, range: std::ops::Range<usize>) -> Result<&'a [u8], WireError> {
        self.record
            .get(range.clone())
            .ok_or(WireError::TooShort {
                needed: range.end,
                actual: self.record.len(),
            })
    }
}
