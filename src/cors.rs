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

//! Cross-origin headers.
//!
//! The policy is blanket and unconditional: any origin, no credentials.

use std::io::Read;

use crate::common::Header;
use crate::response::Response;

/// Methods announced on a save response.
pub const SAVE_METHODS: &str = "POST, OPTIONS";

/// Methods announced on a preflight response.
pub const PREFLIGHT_METHODS: &str = "POST, GET, OPTIONS";

pub fn allow_any_origin() -> Header {
    Header::from_static("Access-Control-Allow-Origin", "*")
}

/// Headers the server merges into every response it sends, whichever
/// handler produced it.
///
/// A response that already sets the origin keeps a single copy, since
/// browsers reject `Access-Control-Allow-Origin: *, *`.
pub fn blanket_headers() -> Vec<Header> {
    vec![allow_any_origin()]
}

/// Adds the full set of CORS headers a handler sets explicitly.
pub fn annotate<R>(response: Response<R>, methods: &'static str) -> Response<R>
where
    R: Read,
{
    response
        .with_header(allow_any_origin())
        .with_header(Header::from_static("Access-Control-Allow-Methods", methods))
        .with_header(Header::from_static(
            "Access-Control-Allow-Headers",
            "Content-Type",
        ))
}

#[cfg(test)]
mod tests {
    use super::{annotate, PREFLIGHT_METHODS};
    use crate::response::Response;

    #[test]
    fn annotate_sets_all_three_headers() {
        let response = annotate(Response::empty(200), PREFLIGHT_METHODS);

        assert_eq!(response.header("Access-Control-Allow-Origin"), Some("*"));
        assert_eq!(
            response.header("Access-Control-Allow-Methods"),
            Some("POST, GET, OPTIONS")
        );
        assert_eq!(
            response.header("Access-Control-Allow-Headers"),
            Some("Content-Type")
        );
    }
}
