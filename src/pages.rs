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

use std::fmt::Write;

use crate::common::{Header, StatusCode};
use crate::response::{Response, ResponseBox};

const HTML_CONTENT_TYPE: &str = "text/html;charset=utf-8";

/// Escapes the characters that are special in HTML text and attributes.
pub(crate) fn html_escape(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            c => out.push(c),
        }
    }
    out
}

fn html_response(status: StatusCode, body: String) -> ResponseBox {
    Response::from_data(body)
        .with_status_code(status)
        .with_header(Header::from_static("Content-Type", HTML_CONTENT_TYPE))
        .boxed()
}

/// An HTML error page naming the code and `message`.
pub(crate) fn error_page<S>(status: S, message: &str) -> ResponseBox
where
    S: Into<StatusCode>,
{
    let status = status.into();
    let body = format!(
        "<!DOCTYPE HTML>\n\
         <html lang=\"en\">\n\
         \x20   <head>\n\
         \x20       <meta charset=\"utf-8\">\n\
         \x20       <title>Error response</title>\n\
         \x20   </head>\n\
         \x20   <body>\n\
         \x20       <h1>Error response</h1>\n\
         \x20       <p>Error code: {code}</p>\n\
         \x20       <p>Message: {message}.</p>\n\
         \x20       <p>Error code explanation: {code} - {reason}.</p>\n\
         \x20   </body>\n\
         </html>\n",
        code = status.as_u16(),
        message = html_escape(message),
        reason = status.default_reason_phrase(),
    );

    html_response(status, body)
}

/// One line of a directory listing.
pub(crate) struct ListingEntry {
    pub name: String,
    pub is_dir: bool,
}

/// An HTML page listing `entries`, titled after the request path.
pub(crate) fn directory_listing(display_path: &str, entries: &[ListingEntry]) -> ResponseBox {
    let title = format!("Directory listing for {}", html_escape(display_path));

    let mut body = String::new();
    // writing to a String cannot fail
    let _ = write!(
        body,
        "<!DOCTYPE HTML>\n<html lang=\"en\">\n<head>\n\
         <meta charset=\"utf-8\">\n<title>{title}</title>\n</head>\n\
         <body>\n<h1>{title}</h1>\n<hr>\n<ul>\n",
        title = title
    );

    for entry in entries {
        let suffix = if entry.is_dir { "/" } else { "" };
        let _ = writeln!(
            body,
            "<li><a href=\"{href}{suffix}\">{name}{suffix}</a></li>",
            href = urlencoding::encode(&entry.name),
            name = html_escape(&entry.name),
            suffix = suffix
        );
    }

    body.push_str("</ul>\n<hr>\n</body>\n</html>\n");

    html_response(StatusCode(200), body)
}
