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

use serde::Serialize;

use crate::archive::Archive;
use crate::common::{Header, Method};
use crate::config::Config;
use crate::cors;
use crate::error::SaveError;
use crate::log::{error, info};
use crate::pages;
use crate::request::Request;
use crate::response::{Response, ResponseBox};
use crate::static_files::StaticFiles;
use crate::{Server, ServerConfig};

/// Body of a successful save.
#[derive(Debug, Serialize)]
struct SaveReply {
    status: &'static str,
    message: &'static str,
}

const SAVED: SaveReply = SaveReply {
    status: "success",
    message: "CSV saved successfully",
};

/// Routes requests between the save endpoint, CORS preflight and the
/// static files.
#[derive(Debug)]
pub struct ReadingArchive {
    files: StaticFiles,
    archive: Archive,
    save_path: String,
}

impl ReadingArchive {
    pub fn new(config: &Config) -> ReadingArchive {
        ReadingArchive {
            files: StaticFiles::new(config.root.clone()),
            archive: Archive::new(config.archive.clone()).with_max_body_size(config.max_body_size),
            save_path: config.save_path.clone(),
        }
    }

    pub fn archive(&self) -> &Archive {
        &self.archive
    }

    /// Produces the response to `request`.
    ///
    /// - `POST` to the save path overwrites the archive.
    /// - `POST` anywhere else is not found.
    /// - `OPTIONS` anywhere is a successful preflight with an empty body.
    /// - everything else goes to the static files.
    pub fn handle(&self, request: &mut Request) -> ResponseBox {
        match request.method() {
            Method::Post if request.url() == self.save_path => self.save_csv(request),
            Method::Post => pages::error_page(404, "Not Found"),
            Method::Options => cors::annotate(Response::empty(200), cors::PREFLIGHT_METHODS).boxed(),
            _ => self.files.respond(request),
        }
    }

    fn save_csv(&self, request: &mut Request) -> ResponseBox {
        let saved = declared_length(request)
            .and_then(|declared| self.archive.save_from(request.as_reader(), declared));

        match saved {
            Ok(written) => {
                info!(
                    "CSV file saved successfully ({} bytes to {})",
                    written,
                    self.archive.path().display()
                );
                success_response()
            }
            Err(err) => {
                error!("Error saving CSV: {}", err);
                let status = err.status_code();
                pages::error_page(
                    status,
                    &format!("{}: {}", status.default_reason_phrase(), err),
                )
            }
        }
    }
}

/// The length of the body, as framed by `Content-Length`.
///
/// Bodies framed any other way are refused, so the archive only ever receives
/// a body whose exact size was announced.
fn declared_length(request: &Request) -> Result<usize, SaveError> {
    if let Some(encoding) = request.header("Transfer-Encoding") {
        return Err(SaveError::UnsupportedTransferEncoding(encoding.to_owned()));
    }

    match (request.body_length(), request.header("Content-Length")) {
        (Some(length), _) => Ok(length),
        (None, Some(value)) => Err(SaveError::InvalidContentLength(value.to_owned())),
        (None, None) => Err(SaveError::MissingContentLength),
    }
}

fn success_response() -> ResponseBox {
    // serializing two static strings cannot fail
    let body = serde_json::to_vec(&SAVED).unwrap_or_default();

    cors::annotate(Response::from_data(body), cors::SAVE_METHODS)
        .with_header(Header::from_static("Content-Type", "application/json"))
        .boxed()
}

/// Opens the listening socket described by `config`, with the CORS
/// annotator installed on every response.
pub fn bind(config: &Config) -> io::Result<Server> {
    let server_config = ServerConfig::default()
        .with_default_headers(cors::blanket_headers())
        .with_client_timeout(config.client_timeout);

    Server::with_config(config.addr(), server_config)
}

/// Answers requests one after the other until the server is unblocked.
pub fn serve(server: &Server, app: &ReadingArchive) {
    for mut request in server.incoming_requests() {
        let response = app.handle(&mut request);

        let client = request
            .remote_addr()
            .map(|addr| addr.ip().to_string())
            .unwrap_or_else(|| "-".to_owned());
        let length = response
            .data_length()
            .map(|len| len.to_string())
            .unwrap_or_else(|| "-".to_owned());
        info!(
            "{} - - \"{} {} HTTP/{}\" {} {}",
            client,
            request.method(),
            request.url(),
            request.http_version(),
            response.status_code(),
            length
        );

        // failures are logged by `respond`
        let _ = request.respond(response);
    }
}
