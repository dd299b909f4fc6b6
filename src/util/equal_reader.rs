// Copyright 2026 The reading-archive Contributors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//	http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::io::{Read, Result as IoResult};

/// Size of the scratch buffer used to throw away unread bytes.
const DRAIN_CHUNK: usize = 8 * 1024;

/// A `Read` that yields exactly the number of bytes of a request body.
///
/// If the limit is reached, it returns EOF. If the limit is not reached
/// when the destructor is called, the remaining bytes are read and
/// thrown away so that the next request on the connection starts at the
/// right offset.
pub struct EqualReader<R>
where
    R: Read,
{
    reader: R,
    size: usize,
}

impl<R> EqualReader<R>
where
    R: Read,
{
    pub fn new(reader: R, size: usize) -> EqualReader<R> {
        EqualReader { reader, size }
    }

    /// Number of body bytes that have not been consumed yet.
    pub fn remaining(&self) -> usize {
        self.size
    }
}

impl<R> Read for EqualReader<R>
where
    R: Read,
{
    fn read(&mut self, buf: &mut [u8]) -> IoResult<usize> {
        if self.size == 0 {
            return Ok(0);
        }

        let limit = buf.len().min(self.size);
        let len = self.reader.read(&mut buf[..limit])?;
        self.size -= len;
        Ok(len)
    }
}

impl<R> Drop for EqualReader<R>
where
    R: Read,
{
    fn drop(&mut self) {
        let mut buf = [0; DRAIN_CHUNK];

        while self.remaining() > 0 {
            let limit = self.size.min(DRAIN_CHUNK);
            match self.reader.read(&mut buf[..limit]) {
                Ok(0) | Err(_) => break,
                Ok(len) => self.size -= len,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::EqualReader;
    use std::io::{Cursor, Read};

    #[test]
    fn test_limit() {
        let mut org_reader = Cursor::new("hello world".to_string().into_bytes());

        {
            let mut equal_reader = EqualReader::new(org_reader.by_ref(), 5);

            let mut string = String::new();
            equal_reader.read_to_string(&mut string).unwrap();
            assert_eq!(string, "hello");
            assert_eq!(equal_reader.remaining(), 0);
        }

        let mut string = String::new();
        org_reader.read_to_string(&mut string).unwrap();
        assert_eq!(string, " world");
    }

    #[test]
    fn test_not_enough() {
        let mut org_reader = Cursor::new("hello world".to_string().into_bytes());

        {
            let mut equal_reader = EqualReader::new(org_reader.by_ref(), 5);

            let mut vec = [0];
            equal_reader.read(&mut vec).unwrap();
            assert_eq!(vec[0], b'h');
            assert_eq!(equal_reader.remaining(), 4);
        }

        let mut string = String::new();
        org_reader.read_to_string(&mut string).unwrap();
        assert_eq!(string, " world");
    }

    #[test]
    fn test_source_shorter_than_declared() {
        let mut org_reader = Cursor::new(b"abc".to_vec());

        let mut equal_reader = EqualReader::new(org_reader.by_ref(), 10);
        let mut out = Vec::new();
        equal_reader.read_to_end(&mut out).unwrap();

        assert_eq!(out, b"abc");
        assert_eq!(equal_reader.remaining(), 7);
    }
}
