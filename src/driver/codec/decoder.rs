use crate::core::sortable;
use crate::driver::error::{DriverError, DriverResult};

/// Cursor over an immutable request buffer
#[derive(Debug, Clone)]
pub struct Decoder<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Decoder<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Offset of the next unread byte
    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Bytes consumed since `mark`, a value previously returned by
    /// [`position`](Self::position)
    pub fn slice_since(&self, mark: usize) -> &'a [u8] {
        &self.buf[mark.min(self.pos)..self.pos]
    }

    fn take(&mut self, needed: usize) -> DriverResult<&'a [u8]> {
        if self.remaining() < needed {
            return Err(DriverError::Truncated {
                offset: self.pos,
                needed,
            });
        }
        let bytes = &self.buf[self.pos..self.pos + needed];
        self.pos += needed;
        Ok(bytes)
    }

    fn take_array<const N: usize>(&mut self) -> DriverResult<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    pub fn read_u8(&mut self) -> DriverResult<u8> {
        Ok(self.take(1)?[0])
    }

    pub fn read_i8(&mut self) -> DriverResult<i8> {
        Ok(i8::from_le_bytes(self.take_array()?))
    }

    pub fn read_u16(&mut self) -> DriverResult<u16> {
        Ok(u16::from_le_bytes(self.take_array()?))
    }

    pub fn read_u32(&mut self) -> DriverResult<u32> {
        Ok(u32::from_le_bytes(self.take_array()?))
    }

    /// Any non-zero byte is true
    pub fn read_bool(&mut self) -> DriverResult<bool> {
        Ok(self.read_u8()? != 0)
    }

    pub fn read_f64(&mut self) -> DriverResult<f64> {
        let raw: [u8; sortable::SORTABLE_LEN] = self.take_array()?;
        Ok(sortable::unserialise(&raw))
    }

    pub fn read_bytes(&mut self) -> DriverResult<Vec<u8>> {
        let len = self.read_u32()? as usize;
        Ok(self.take(len)?.to_vec())
    }

    pub fn read_string(&mut self) -> DriverResult<String> {
        let start = self.pos;
        let bytes = self.read_bytes()?;
        String::from_utf8(bytes).map_err(|_| {
            DriverError::BadArgument(format!("String at offset {start} is not valid UTF-8"))
        })
    }
}
