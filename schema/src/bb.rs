/// A KTV byte buffer meant for reading.
///
/// All multi-byte integers in KTV data buffers are big-endian.
///
/// Example usage:
///
/// ```
/// let mut bb = ktv_schema::ByteBuffer::new(&[0x27, 0x11, 0xFF, 0xED, 0x2B, 0x4F]);
/// assert_eq!(bb.read_int2(), Ok(10001));
/// assert_eq!(bb.read_int4(), Ok(-1234097));
/// ```
///
pub struct ByteBuffer<'a> {
    data: &'a [u8],
    index: usize,
}

impl<'a> ByteBuffer<'a> {
    /// Create a new ByteBuffer that wraps the provided byte slice. The lifetime
    /// of the returned ByteBuffer must not outlive the lifetime of the byte
    /// slice.
    pub fn new(data: &[u8]) -> ByteBuffer {
        ByteBuffer { data, index: 0 }
    }

    /// Retrieves the underlying byte slice.
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    /// Retrieves the current index into the underlying byte slice. This starts
    /// off as 0 and ends up as `self.data().len()` when everything has been
    /// read.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Returns `true` once every byte has been consumed.
    pub fn is_exhausted(&self) -> bool {
        self.index >= self.data.len()
    }

    /// Try to read a byte starting at the current index.
    pub fn read_byte(&mut self) -> Result<u8, ()> {
        if self.index >= self.data.len() {
            Err(())
        } else {
            let value = self.data[self.index];
            self.index += 1;
            Ok(value)
        }
    }

    /// Try to read `len` raw bytes starting at the current index.
    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], ()> {
        if self.index + len > self.data.len() {
            Err(())
        } else {
            let value = &self.data[self.index..self.index + len];
            self.index += len;
            Ok(value)
        }
    }

    /// Try to read a one-byte length prefix followed by that many bytes.
    pub fn read_short_bytes(&mut self) -> Result<&'a [u8], ()> {
        let len = self.read_byte()? as usize;
        self.read_bytes(len)
    }

    /// Try to read an unsigned big-endian 16-bit integer. Used for counts and
    /// nested object sizes.
    pub fn read_uint2(&mut self) -> Result<u16, ()> {
        let bytes = self.read_bytes(2)?;
        Ok(u16::from_be_bytes([bytes[0], bytes[1]]))
    }

    /// Try to read a signed big-endian 16-bit integer.
    pub fn read_int2(&mut self) -> Result<i16, ()> {
        let bytes = self.read_bytes(2)?;
        Ok(i16::from_be_bytes([bytes[0], bytes[1]]))
    }

    /// Try to read a signed big-endian 32-bit integer.
    pub fn read_int4(&mut self) -> Result<i32, ()> {
        let bytes = self.read_bytes(4)?;
        Ok(i32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }
}

#[test]
fn read_byte() {
    let read = |bytes| ByteBuffer::new(bytes).read_byte();
    assert_eq!(read(&[]), Err(()));
    assert_eq!(read(&[0]), Ok(0));
    assert_eq!(read(&[1]), Ok(1));
    assert_eq!(read(&[254]), Ok(254));
    assert_eq!(read(&[255]), Ok(255));
}

#[test]
fn read_bytes() {
    let read = |bytes, len| ByteBuffer::new(bytes).read_bytes(len);
    assert_eq!(read(&[], 0), Ok(vec![].as_slice()));
    assert_eq!(read(&[], 1), Err(()));
    assert_eq!(read(&[0], 0), Ok(vec![].as_slice()));
    assert_eq!(read(&[0], 1), Ok(vec![0].as_slice()));
    assert_eq!(read(&[0], 2), Err(()));

    let mut bb = ByteBuffer::new(&[1, 2, 3, 4, 5]);
    assert_eq!(bb.read_bytes(3), Ok(vec![1, 2, 3].as_slice()));
    assert_eq!(bb.read_bytes(2), Ok(vec![4, 5].as_slice()));
    assert_eq!(bb.read_bytes(1), Err(()));
    assert!(bb.is_exhausted());
}

#[test]
fn read_short_bytes() {
    let read = |bytes| ByteBuffer::new(bytes).read_short_bytes();
    assert_eq!(read(&[]), Err(()));
    assert_eq!(read(&[0]), Ok(vec![].as_slice()));
    assert_eq!(read(&[2, 0x69, 0x64]), Ok(b"id".as_slice()));
    assert_eq!(read(&[3, 0x69, 0x64]), Err(()));
}

#[test]
fn read_int2() {
    let read = |bytes| ByteBuffer::new(bytes).read_int2();
    assert_eq!(read(&[0]), Err(()));
    assert_eq!(read(&[0, 0]), Ok(0));
    assert_eq!(read(&[0, 1]), Ok(1));
    assert_eq!(read(&[0xFF, 0xFF]), Ok(-1));
    assert_eq!(read(&[0x80, 0x00]), Ok(i16::MIN));
    assert_eq!(read(&[0xD8, 0xEE]), Ok(-10002));
}

#[test]
fn read_uint2() {
    let read = |bytes| ByteBuffer::new(bytes).read_uint2();
    assert_eq!(read(&[0xFF]), Err(()));
    assert_eq!(read(&[0xFF, 0xFF]), Ok(u16::MAX));
    assert_eq!(read(&[0x01, 0x00]), Ok(256));
}

#[test]
fn read_int4() {
    let read = |bytes| ByteBuffer::new(bytes).read_int4();
    assert_eq!(read(&[0, 0, 0]), Err(()));
    assert_eq!(read(&[0, 0, 0, 0]), Ok(0));
    assert_eq!(read(&[0x00, 0x12, 0xD6, 0x87]), Ok(1234567));
    assert_eq!(read(&[0xFF, 0x8B, 0x34, 0x4F]), Ok(-7654321));
}

/// A KTV byte buffer meant for writing.
///
/// Example usage:
///
/// ```
/// let mut bb = ktv_schema::ByteBufferMut::new();
/// bb.write_short_bytes(b"id").unwrap();
/// bb.write_int2(-1);
/// assert_eq!(bb.data(), [2, 0x69, 0x64, 0xFF, 0xFF]);
/// ```
///
#[derive(Default)]
pub struct ByteBufferMut {
    data: Vec<u8>,
}

impl ByteBufferMut {
    /// Creates an empty ByteBufferMut ready for writing.
    pub fn new() -> ByteBufferMut {
        ByteBufferMut { data: vec![] }
    }

    /// Consumes this buffer and returns the underlying backing store. Use this
    /// to get the data out when you're done writing to the buffer.
    pub fn data(self) -> Vec<u8> {
        self.data
    }

    /// Returns the number of bytes written so far.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if nothing has been written yet.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Write a byte to the end of the buffer.
    pub fn write_byte(&mut self, value: u8) {
        self.data.push(value);
    }

    /// Write a raw byte slice to the end of the buffer.
    pub fn write_bytes(&mut self, value: &[u8]) {
        self.data.extend_from_slice(value);
    }

    /// Write a one-byte length prefix followed by `value`. Fails if `value` is
    /// longer than 255 bytes.
    pub fn write_short_bytes(&mut self, value: &[u8]) -> Result<(), ()> {
        let len = u8::try_from(value.len()).map_err(|_| ())?;
        self.write_byte(len);
        self.write_bytes(value);
        Ok(())
    }

    /// Write an unsigned big-endian 16-bit integer to the end of the buffer.
    pub fn write_uint2(&mut self, value: u16) {
        self.data.extend_from_slice(&value.to_be_bytes());
    }

    /// Write a signed big-endian 16-bit integer to the end of the buffer.
    pub fn write_int2(&mut self, value: i16) {
        self.data.extend_from_slice(&value.to_be_bytes());
    }

    /// Write a signed big-endian 32-bit integer to the end of the buffer.
    pub fn write_int4(&mut self, value: i32) {
        self.data.extend_from_slice(&value.to_be_bytes());
    }
}

#[cfg(test)]
fn write_once(cb: fn(&mut ByteBufferMut)) -> Vec<u8> {
    let mut bb = ByteBufferMut::new();
    cb(&mut bb);
    bb.data()
}

#[test]
fn write_byte() {
    assert_eq!(write_once(|bb| bb.write_byte(0)), [0]);
    assert_eq!(write_once(|bb| bb.write_byte(1)), [1]);
    assert_eq!(write_once(|bb| bb.write_byte(254)), [254]);
    assert_eq!(write_once(|bb| bb.write_byte(255)), [255]);
}

#[test]
fn write_bytes() {
    let mut bb = ByteBufferMut::new();
    bb.write_bytes(&[1, 2, 3]);
    bb.write_bytes(&[]);
    bb.write_bytes(&[4, 5]);
    assert_eq!(bb.len(), 5);
    assert_eq!(bb.data(), [1, 2, 3, 4, 5]);
}

#[test]
fn write_short_bytes() {
    let mut bb = ByteBufferMut::new();
    assert_eq!(bb.write_short_bytes(b"User"), Ok(()));
    assert_eq!(bb.write_short_bytes(&[0; 256]), Err(()));
    assert_eq!(bb.data(), [4, 0x55, 0x73, 0x65, 0x72]);
}

#[test]
fn write_integers() {
    assert_eq!(write_once(|bb| bb.write_uint2(2)), [0, 2]);
    assert_eq!(write_once(|bb| bb.write_int2(10001)), [0x27, 0x11]);
    assert_eq!(write_once(|bb| bb.write_int2(-10002)), [0xD8, 0xEE]);
    assert_eq!(write_once(|bb| bb.write_int4(1234567)), [0x00, 0x12, 0xD6, 0x87]);
    assert_eq!(write_once(|bb| bb.write_int4(-7654321)), [0xFF, 0x8B, 0x34, 0x4F]);
}
