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

use crate::common::{HTTPVersion, Header, StatusCode};

use std::fs::File;
use std::io::{self, Cursor, Empty, Read, Result as IoResult, Write};
use std::time::SystemTime;

/// Value of the `Server` header added to every response.
const SERVER_NAME: &str = "reading-archive (Rust)";

/// Object representing an HTTP response whose purpose is to be given to a `Request`.
///
/// Some headers cannot be changed. Trying to define the value
/// of one of these will have no effect:
///
///  - `Connection`
///  - `Trailer`
///  - `Transfer-Encoding`
///  - `Upgrade`
///
/// Some headers have special behaviors:
///
///  - `Content-Length`: sets the length of the body instead of being sent as is.
///  - `Date`: if not specified, the current date is added.
///  - `Server`: if not specified, the name of this server is added.
///
/// When the length of the body is unknown, the body is sent with the chunked
/// transfer encoding to HTTP/1.1 clients and delimited by closing the
/// connection for HTTP/1.0 clients.
pub struct Response<R> {
    reader: R,
    status_code: StatusCode,
    headers: Vec<Header>,
    data_length: Option<usize>,
}

/// A `Response` without a template parameter.
pub type ResponseBox = Response<Box<dyn Read + Send>>;

/// Transfer encoding to use when sending the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TransferEncoding {
    Identity,
    Chunked,
}

fn choose_transfer_encoding(
    http_version: HTTPVersion,
    entity_length: Option<usize>,
) -> TransferEncoding {
    if http_version <= HTTPVersion(1, 0) || entity_length.is_some() {
        TransferEncoding::Identity
    } else {
        TransferEncoding::Chunked
    }
}

fn client_asked_to_close(request_headers: &[Header]) -> bool {
    request_headers
        .iter()
        .filter(|h| h.field.equiv("Connection"))
        .any(|h| h.value.as_str().eq_ignore_ascii_case("close"))
}

impl<R> Response<R>
where
    R: Read,
{
    /// Creates a new Response object.
    ///
    /// `data_length` is the number of bytes `data` will yield, or `None`
    ///  if it is unknown until the reader is exhausted.
    pub fn new(
        status_code: StatusCode,
        headers: Vec<Header>,
        data: R,
        data_length: Option<usize>,
    ) -> Response<R> {
        let mut response = Response {
            reader: data,
            status_code,
            headers: Vec::with_capacity(16),
            data_length,
        };

        for h in headers {
            response.add_header(h)
        }

        response
    }

    /// Adds a header to the list.
    /// Does all the checks.
    pub fn add_header<H>(&mut self, header: H)
    where
        H: Into<Header>,
    {
        let header = header.into();

        // ignoring forbidden headers
        if header.field.equiv("Connection")
            || header.field.equiv("Trailer")
            || header.field.equiv("Transfer-Encoding")
            || header.field.equiv("Upgrade")
        {
            return;
        }

        // if the header is Content-Length, setting the data length
        if header.field.equiv("Content-Length") {
            if let Ok(val) = header.value.as_str().parse::<usize>() {
                self.data_length = Some(val)
            }

            return;
        }

        self.headers.push(header);
    }

    /// Returns the same request, but with an additional header.
    ///
    /// Some headers cannot be modified and some other have a
    ///  special behavior. See the documentation above.
    #[inline]
    pub fn with_header<H>(mut self, header: H) -> Response<R>
    where
        H: Into<Header>,
    {
        self.add_header(header.into());
        self
    }

    /// Returns the same request, but with a different status code.
    #[inline]
    pub fn with_status_code<S>(mut self, code: S) -> Response<R>
    where
        S: Into<StatusCode>,
    {
        self.status_code = code.into();
        self
    }

    /// Appends every header of `defaults` whose field is not set yet.
    ///
    /// This is how server-wide headers reach every response, whichever
    /// code path produced it.
    pub fn with_missing_headers(mut self, defaults: &[Header]) -> Response<R> {
        for default in defaults {
            if !self.headers.iter().any(|h| h.field == default.field) {
                self.add_header(default.clone());
            }
        }
        self
    }

    /// Returns the status code of this response.
    #[inline]
    pub fn status_code(&self) -> StatusCode {
        self.status_code
    }

    /// Returns the length of the body, if known.
    #[inline]
    pub fn data_length(&self) -> Option<usize> {
        self.data_length
    }

    /// Returns the headers that will be sent, minus the ones computed
    /// while printing (`Content-Length`, `Date`, ...).
    #[inline]
    pub fn headers(&self) -> &[Header] {
        &self.headers
    }

    /// Returns the value of the first header named `field`.
    pub fn header(&self, field: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|h| h.field.equiv(field))
            .map(|h| h.value.as_str())
    }

    /// Consumes the response and returns its body.
    #[inline]
    pub fn into_reader(self) -> R {
        self.reader
    }

    /// Prints the HTTP response to a writer.
    ///
    /// This function is the one used to send the response to the client's socket.
    /// Therefore you shouldn't expect anything pretty-printed or even readable.
    ///
    /// The HTTP version and headers passed as arguments are used to
    ///  decide which features (most notably, encoding) to use.
    ///
    /// Note: does not flush the writer.
    pub fn raw_print<W: Write>(
        mut self,
        mut writer: W,
        http_version: HTTPVersion,
        request_headers: &[Header],
        do_not_send_body: bool,
    ) -> IoResult<()> {
        let mut transfer_encoding = choose_transfer_encoding(http_version, self.data_length);

        // 1xx, 204 and 304 never come with a body
        if self.status_code.forbids_body() {
            self.data_length = Some(0);
            transfer_encoding = TransferEncoding::Identity;
        }

        if !self.headers.iter().any(|h| h.field.equiv("Date")) {
            let date = httpdate::fmt_http_date(SystemTime::now());
            if let Some(header) = Header::with_value("Date", date) {
                self.headers.insert(0, header);
            }
        }

        if !self.headers.iter().any(|h| h.field.equiv("Server")) {
            self.headers
                .insert(0, Header::from_static("Server", SERVER_NAME));
        }

        match (transfer_encoding, self.data_length) {
            (TransferEncoding::Chunked, _) => self
                .headers
                .push(Header::from_static("Transfer-Encoding", "chunked")),
            (TransferEncoding::Identity, Some(len)) => {
                if let Some(header) = Header::with_value("Content-Length", len.to_string()) {
                    self.headers.push(header);
                }
            }
            (TransferEncoding::Identity, None) => {
                // the end of the body is the end of the connection
                self.headers.push(Header::from_static("Connection", "close"));
            }
        }

        if client_asked_to_close(request_headers)
            && !self.headers.iter().any(|h| h.field.equiv("Connection"))
        {
            self.headers.push(Header::from_static("Connection", "close"));
        }

        // writing status line
        write!(
            &mut writer,
            "HTTP/{} {} {}\r\n",
            http_version,
            self.status_code.as_u16(),
            self.status_code.default_reason_phrase()
        )?;

        // writing headers
        for header in self.headers.iter() {
            writer.write_all(header.field.as_str().as_bytes())?;
            writer.write_all(b": ")?;
            writer.write_all(header.value.as_str().as_bytes())?;
            writer.write_all(b"\r\n")?;
        }

        // separator between header and data
        writer.write_all(b"\r\n")?;

        if do_not_send_body {
            return Ok(());
        }

        match transfer_encoding {
            TransferEncoding::Chunked => {
                let mut writer = chunked_transfer::Encoder::new(&mut writer);
                io::copy(&mut self.reader, &mut writer)?;
            }
            TransferEncoding::Identity => match self.data_length {
                Some(len) => {
                    io::copy(&mut self.reader.by_ref().take(len as u64), &mut writer)?;
                }
                None => {
                    io::copy(&mut self.reader, &mut writer)?;
                }
            },
        }

        Ok(())
    }
}

impl<R> Response<R>
where
    R: Read + Send + 'static,
{
    /// Turns this response into a `Response<Box<dyn Read + Send>>`.
    pub fn boxed(self) -> ResponseBox {
        Response {
            reader: Box::new(self.reader) as Box<dyn Read + Send>,
            status_code: self.status_code,
            headers: self.headers,
            data_length: self.data_length,
        }
    }
}

impl Response<File> {
    /// Builds a new `Response` from a `File`.
    ///
    /// The `Content-Type` will **not** be automatically detected,
    ///  you must set it yourself.
    pub fn from_file(file: File) -> IoResult<Response<File>> {
        let file_size = file.metadata()?.len() as usize;

        Ok(Response::new(
            StatusCode(200),
            Vec::with_capacity(0),
            file,
            Some(file_size),
        ))
    }
}

impl Response<Cursor<Vec<u8>>> {
    pub fn from_data<D>(data: D) -> Response<Cursor<Vec<u8>>>
    where
        D: Into<Vec<u8>>,
    {
        let data = data.into();
        let data_len = data.len();

        Response::new(
            StatusCode(200),
            Vec::with_capacity(0),
            Cursor::new(data),
            Some(data_len),
        )
    }

    pub fn from_string<S>(data: S) -> Response<Cursor<Vec<u8>>>
    where
        S: Into<String>,
    {
        Response::from_data(data.into().into_bytes()).with_header(Header::from_static(
            "Content-Type",
            "text/plain; charset=UTF-8",
        ))
    }
}

impl Response<Empty> {
    /// Builds an empty `Response` with the given status code.
    pub fn empty<S>(status_code: S) -> Response<Empty>
    where
        S: Into<StatusCode>,
    {
        Response::new(
            status_code.into(),
            Vec::with_capacity(0),
            io::empty(),
            Some(0),
        )
    }

    /// DEPRECATED. Use `empty` instead.
    pub fn new_empty(status_code: StatusCode) -> Response<Empty> {
        Response::empty(status_code)
    }
}
