use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReaderError {
    #[error("not enough bytes left in the reader")]
    InvalidSize,
    #[error("invalid value")]
    InvalidValue,
    #[error("invalid hex: {0}")]
    InvalidHex(#[from] hex::FromHexError),
    #[error("invalid string: {0}")]
    InvalidString(#[from] std::string::FromUtf8Error),
}

/// Length-checked cursor over a byte slice.
pub struct Reader<'a> {
    bytes: &'a [u8],
    total: usize,
}

impl<'a> Reader<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Reader { bytes, total: 0 }
    }

    fn take(&mut self, count: usize) -> Result<&'a [u8], ReaderError> {
        if count > self.bytes.len() {
            return Err(ReaderError::InvalidSize);
        }

        let (bytes, rest) = self.bytes.split_at(count);
        self.bytes = rest;
        self.total += count;
        Ok(bytes)
    }

    pub fn read_u8(&mut self) -> Result<u8, ReaderError> {
        Ok(self.take(1)?[0])
    }

    pub fn read_u16(&mut self) -> Result<u16, ReaderError> {
        let bytes = self.take(2)?;
        Ok(u16::from_be_bytes([bytes[0], bytes[1]]))
    }

    pub fn read_u32(&mut self) -> Result<u32, ReaderError> {
        let bytes: [u8; 4] = self.take(4)?.try_into().map_err(|_| ReaderError::InvalidSize)?;
        Ok(u32::from_be_bytes(bytes))
    }

    pub fn read_u64(&mut self) -> Result<u64, ReaderError> {
        let bytes: [u8; 8] = self.take(8)?.try_into().map_err(|_| ReaderError::InvalidSize)?;
        Ok(u64::from_be_bytes(bytes))
    }

    pub fn read_bool(&mut self) -> Result<bool, ReaderError> {
        match self.read_u8()? {
            0 => Ok(false),
            1 => Ok(true),
            _ => Err(ReaderError::InvalidValue),
        }
    }

    // Borrow `count` bytes from the cursor
    pub fn read_bytes_ref(&mut self, count: usize) -> Result<&'a [u8], ReaderError> {
        self.take(count)
    }

    pub fn read_bytes(&mut self, count: usize) -> Result<Vec<u8>, ReaderError> {
        Ok(self.take(count)?.to_vec())
    }

    pub fn read_bytes_array<const N: usize>(&mut self) -> Result<[u8; N], ReaderError> {
        let bytes = self.take(N)?;
        let mut array = [0u8; N];
        array.copy_from_slice(bytes);
        Ok(array)
    }

    pub fn read_bytes_32(&mut self) -> Result<[u8; 32], ReaderError> {
        self.read_bytes_array::<32>()
    }

    pub fn read_string(&mut self) -> Result<String, ReaderError> {
        let size = self.read_u16()? as usize;
        let bytes = self.take(size)?.to_vec();
        Ok(String::from_utf8(bytes)?)
    }

    // Everything left in the cursor
    pub fn read_remaining(&mut self) -> &'a [u8] {
        let bytes = self.bytes;
        self.total += bytes.len();
        self.bytes = &[];
        bytes
    }

    pub fn skip(&mut self, count: usize) -> Result<(), ReaderError> {
        self.take(count).map(|_| ())
    }

    // Bytes left to read
    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    // Bytes consumed so far
    pub fn total_read(&self) -> usize {
        self.total
    }
}
