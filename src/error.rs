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

use std::io;
use std::string::FromUtf8Error;

use thiserror::Error;

use crate::common::StatusCode;

/// Why a save request did not replace the archive file.
#[derive(Debug, Error)]
pub enum SaveError {
    #[error("missing Content-Length header")]
    MissingContentLength,

    #[error("invalid Content-Length header: {0:?}")]
    InvalidContentLength(String),

    #[error("unsupported Transfer-Encoding {0:?}, the body must be sent with a Content-Length header")]
    UnsupportedTransferEncoding(String),

    #[error("request body of {declared} bytes exceeds the limit of {limit} bytes")]
    TooLarge { declared: usize, limit: u64 },

    #[error("request body ended after {received} of {expected} bytes")]
    Truncated { expected: usize, received: usize },

    #[error("request body is not valid UTF-8: {0}")]
    Decode(#[from] FromUtf8Error),

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl SaveError {
    /// Status code of the response reporting this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            SaveError::TooLarge { .. } => StatusCode(413),
            _ => StatusCode(500),
        }
    }
}
