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

use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use crate::error::SaveError;

/// Initial buffer size when the declared length is large.
const READ_CAPACITY: usize = 64 * 1024;

/// The single flat file the save endpoint overwrites.
///
/// Its content is opaque text. Each save truncates the file and writes the
/// new content in full; writes from several threads are serialized.
#[derive(Debug)]
pub struct Archive {
    path: PathBuf,
    max_body_size: Option<u64>,
    write_lock: Mutex<()>,
}

impl Archive {
    pub fn new<P>(path: P) -> Archive
    where
        P: Into<PathBuf>,
    {
        Archive {
            path: path.into(),
            max_body_size: None,
            write_lock: Mutex::new(()),
        }
    }

    /// Refuses bodies declared larger than `limit` bytes.
    pub fn with_max_body_size(mut self, limit: Option<u64>) -> Archive {
        self.max_body_size = limit;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads exactly `declared` bytes from `body`, decodes them as UTF-8 and
    /// replaces the archive with the result.
    ///
    /// Nothing touches the file unless the whole body arrived and decoded.
    /// Returns the number of bytes written.
    pub fn save_from<R>(&self, body: R, declared: usize) -> Result<usize, SaveError>
    where
        R: Read,
    {
        if let Some(limit) = self.max_body_size {
            if declared as u64 > limit {
                return Err(SaveError::TooLarge { declared, limit });
            }
        }

        let mut bytes = Vec::with_capacity(declared.min(READ_CAPACITY));
        body.take(declared as u64).read_to_end(&mut bytes)?;

        if bytes.len() < declared {
            return Err(SaveError::Truncated {
                expected: declared,
                received: bytes.len(),
            });
        }

        let text = String::from_utf8(bytes)?;
        self.replace(&text)?;
        Ok(text.len())
    }

    /// Truncates the archive and writes `contents` in its place.
    pub fn replace(&self, contents: &str) -> Result<(), SaveError> {
        let _guard = self
            .write_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let mut file = File::create(&self.path)?;
        file.write_all(contents.as_bytes())?;
        file.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::Archive;
    use crate::error::SaveError;
    use std::fs;
    use std::io::Cursor;

    #[test]
    fn save_overwrites_with_exact_body() {
        let dir = tempfile::tempdir().unwrap();
        let archive = Archive::new(dir.path().join("articles.csv"));

        let body = "id,title\n1,Foo\n";
        let written = archive.save_from(Cursor::new(body), body.len()).unwrap();

        assert_eq!(written, 14);
        assert_eq!(fs::read_to_string(archive.path()).unwrap(), body);
    }

    #[test]
    fn shorter_save_leaves_no_trailing_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let archive = Archive::new(dir.path().join("articles.csv"));

        let long = "id,title\n1,Foo\n2,A much longer title\n";
        archive.save_from(Cursor::new(long), long.len()).unwrap();
        archive.save_from(Cursor::new("id\n"), 3).unwrap();

        assert_eq!(fs::read_to_string(archive.path()).unwrap(), "id\n");
    }

    #[test]
    fn reads_no_further_than_declared() {
        let dir = tempfile::tempdir().unwrap();
        let archive = Archive::new(dir.path().join("articles.csv"));

        archive.save_from(Cursor::new("abcdef"), 3).unwrap();
        assert_eq!(fs::read_to_string(archive.path()).unwrap(), "abc");
    }

    #[test]
    fn invalid_utf8_leaves_file_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let archive = Archive::new(dir.path().join("articles.csv"));
        archive.replace("id,title\n").unwrap();

        let body: &[u8] = b"id,\xff\xfe\n";
        let err = archive.save_from(body, body.len()).unwrap_err();

        assert!(matches!(err, SaveError::Decode(_)));
        assert_eq!(err.status_code().as_u16(), 500);
        assert_eq!(fs::read_to_string(archive.path()).unwrap(), "id,title\n");
    }

    #[test]
    fn truncated_body_leaves_file_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let archive = Archive::new(dir.path().join("articles.csv"));

        let err = archive.save_from(Cursor::new("id"), 10).unwrap_err();

        assert!(matches!(
            err,
            SaveError::Truncated {
                expected: 10,
                received: 2
            }
        ));
        assert!(!archive.path().exists());
    }

    #[test]
    fn oversized_body_is_refused_before_reading() {
        let dir = tempfile::tempdir().unwrap();
        let archive =
            Archive::new(dir.path().join("articles.csv")).with_max_body_size(Some(4));

        let err = archive.save_from(Cursor::new("id,title\n"), 9).unwrap_err();

        assert!(matches!(err, SaveError::TooLarge { declared: 9, limit: 4 }));
        assert_eq!(err.status_code().as_u16(), 413);
        assert!(!archive.path().exists());
    }

    #[test]
    fn unwritable_path_reports_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let archive = Archive::new(dir.path().join("missing").join("articles.csv"));

        let err = archive.save_from(Cursor::new("x"), 1).unwrap_err();
        assert!(matches!(err, SaveError::Io(_)));
    }

    #[test]
    fn empty_body_empties_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let archive = Archive::new(dir.path().join("articles.csv"));
        archive.replace("old").unwrap();

        archive.save_from(Cursor::new(""), 0).unwrap();
        assert_eq!(fs::read_to_string(archive.path()).unwrap(), "");
    }
}
