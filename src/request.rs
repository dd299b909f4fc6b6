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

use std::fmt;
use std::io::{self, Cursor, ErrorKind, Read, Write};
use std::mem;
use std::net::SocketAddr;
use std::sync::mpsc::Sender;
use std::sync::Arc;

use crate::common::{HTTPVersion, Header, Method};
use crate::log::error;
use crate::response::Response;
use crate::util::EqualReader;

/// Bodies up to this size are read while the request is being built.
const EAGER_BODY_LIMIT: usize = 1024;

/// What is handed back to the connection once a request is answered: the
/// unread part of the body, or `None` if the connection must be closed
/// because nobody knows where the next request starts.
pub(crate) type Leftover = Option<Box<dyn Read + Send>>;

/// Represents an HTTP request made by a client.
///
/// A `Request` object is what is produced by the server, and is what
///  your code must analyse and answer.
///
/// This object implements the `Send` trait, therefore you can dispatch your requests to
///  worker threads.
///
/// # One request at a time
///
/// A connection does not parse its next request before the current one has been
///  answered (or dropped). Pipelined requests are therefore answered in order.
///
/// # Automatic cleanup
///
/// If a `Request` object is destroyed without `respond` being called,
///  an empty response with a 500 status code (internal server error) will automatically be
///  sent back to the client.
/// This means that if your code fails during the handling of a request, this "internal server
///  error" response will automatically be sent during the stack unwinding.
pub struct Request {
    // where to read the body from
    data_reader: Box<dyn Read + Send + 'static>,

    // if this writer is empty, then the request has been answered
    response_writer: Option<Box<dyn Write + Send + 'static>>,

    remote_addr: Option<SocketAddr>,

    method: Method,

    path: String,

    http_version: HTTPVersion,

    headers: Vec<Header>,

    body_length: Option<usize>,

    // true if a `100 Continue` response must be sent when `as_reader()` is called
    must_send_continue: bool,

    // true if the client sent a `Content-Length` that is not a number, so the end
    // of the body is unknown and the connection closes after the response
    body_unframed: bool,

    // headers merged into every response sent for this request
    default_headers: Arc<Vec<Header>>,

    // receives the unread body once the request is answered
    notify_when_responded: Option<Sender<Leftover>>,
}

/// Error that can happen when building a `Request` object.
#[derive(Debug)]
pub enum RequestCreationError {
    /// The client sent an `Expect` header that was not recognized by the server.
    ExpectationFailed,

    /// Error while reading data from the socket during the creation of the `Request`.
    CreationIoError(io::Error),
}

impl From<io::Error> for RequestCreationError {
    fn from(err: io::Error) -> RequestCreationError {
        RequestCreationError::CreationIoError(err)
    }
}

/// Builds a new request.
///
/// After the request line and headers have been read from the socket, a new `Request` object
/// is built.
///
/// You must pass a `Read` that will allow the `Request` object to read from the incoming data.
/// It is the responsibility of the `Request` to read only the data of the request and not further.
///
/// The `Write` object will be used by the `Request` to write the response.
#[allow(clippy::too_many_arguments)]
pub(crate) fn new_request<R, W>(
    method: Method,
    path: String,
    version: HTTPVersion,
    headers: Vec<Header>,
    remote_addr: Option<SocketAddr>,
    mut source_data: R,
    writer: W,
    default_headers: Arc<Vec<Header>>,
    notify_when_responded: Option<Sender<Leftover>>,
) -> Result<Request, RequestCreationError>
where
    R: Read + Send + 'static,
    W: Write + Send + 'static,
{
    // finding the transfer-encoding header
    let transfer_encoding = headers
        .iter()
        .find(|h| h.field.equiv("Transfer-Encoding"))
        .map(|h| h.value.clone());

    // finding the content-length header
    let declared_length = if transfer_encoding.is_some() {
        // if transfer-encoding is specified, the Content-Length
        // header must be ignored (RFC2616 #4.4)
        None
    } else {
        headers
            .iter()
            .find(|h| h.field.equiv("Content-Length"))
            .map(|h| h.value.as_str().trim().parse::<usize>())
    };
    let body_unframed = matches!(declared_length, Some(Err(_)));
    let content_length = declared_length.and_then(Result::ok);

    // true if the client sent a `Expect: 100-continue` header
    let expects_continue = match headers.iter().find(|h| h.field.equiv("Expect")) {
        None => false,
        Some(h) if h.value.as_str().eq_ignore_ascii_case("100-continue") => true,
        _ => return Err(RequestCreationError::ExpectationFailed),
    };

    // building the reader depending on
    // transfer-encoding and content-length
    let reader: Box<dyn Read + Send + 'static> = if let Some(content_length) = content_length {
        if content_length == 0 {
            Box::new(io::empty())
        } else if content_length <= EAGER_BODY_LIMIT && !expects_continue {
            // a peer that closes early leaves us with fewer bytes than declared;
            // whoever consumes the body decides whether that is an error
            let mut buffer = Vec::with_capacity(content_length);
            source_data
                .by_ref()
                .take(content_length as u64)
                .read_to_end(&mut buffer)?;
            Box::new(Cursor::new(buffer))
        } else {
            Box::new(EqualReader::new(source_data, content_length))
        }
    } else if transfer_encoding.is_some() {
        // if a transfer-encoding was specified, then "chunked"
        // is ALWAYS applied over the message (RFC2616 #3.6)
        Box::new(chunked_transfer::Decoder::new(source_data))
    } else {
        // if we have neither a Content-Length nor a Transfer-Encoding,
        // assuming that we have no data
        Box::new(io::empty())
    };

    Ok(Request {
        data_reader: reader,
        response_writer: Some(Box::new(writer)),
        remote_addr,
        method,
        path,
        http_version: version,
        headers,
        body_length: content_length,
        must_send_continue: expects_continue,
        body_unframed,
        default_headers,
        notify_when_responded,
    })
}

fn ignore_client_closing_errors(result: io::Result<()>) -> io::Result<()> {
    result.or_else(|err| match err.kind() {
        ErrorKind::BrokenPipe => Ok(()),
        ErrorKind::ConnectionAborted => Ok(()),
        ErrorKind::ConnectionRefused => Ok(()),
        ErrorKind::ConnectionReset => Ok(()),
        _ => Err(err),
    })
}

impl Request {
    /// Returns the method requested by the client (eg. `GET`, `POST`, etc.).
    #[inline]
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Returns the resource requested by the client, exactly as it appeared
    /// on the request line (query string included).
    #[inline]
    pub fn url(&self) -> &str {
        &self.path
    }

    /// Returns a list of all headers sent by the client.
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

    /// Returns the HTTP version of the request.
    #[inline]
    pub fn http_version(&self) -> HTTPVersion {
        self.http_version
    }

    /// Returns the length of the body in bytes.
    ///
    /// Returns `None` if the length is unknown.
    #[inline]
    pub fn body_length(&self) -> Option<usize> {
        self.body_length
    }

    /// Returns the address of the client that sent this request.
    ///
    /// Requests built from a `MockRequest` may have none.
    #[inline]
    pub fn remote_addr(&self) -> Option<&SocketAddr> {
        self.remote_addr.as_ref()
    }

    /// Allows to read the body of the request.
    ///
    /// If the client sent a `Expect: 100-continue` header with the request, calling this
    ///  function will send back a `100 Continue` response.
    #[inline]
    pub fn as_reader(&mut self) -> &mut dyn Read {
        if self.must_send_continue {
            if let Some(writer) = self.response_writer.as_mut() {
                let sent = write!(writer, "HTTP/{} 100 Continue\r\n\r\n", self.http_version)
                    .and_then(|_| writer.flush());
                if let Err(err) = sent {
                    error!("error while sending 100 Continue: {}", err);
                }
            }
            self.must_send_continue = false;
        }

        &mut *self.data_reader
    }

    /// Sends a response to this request.
    #[inline]
    pub fn respond<R>(mut self, response: Response<R>) -> io::Result<()>
    where
        R: Read,
    {
        let res = self.respond_impl(response);
        if let Err(ref err) = res {
            error!("error while sending answer: {}", err);
        }
        res
    }

    fn respond_impl<R>(&mut self, response: Response<R>) -> io::Result<()>
    where
        R: Read,
    {
        let mut writer = match self.response_writer.take() {
            Some(writer) => writer,
            None => return Ok(()),
        };

        let do_not_send_body = self.method == Method::Head;

        // announce the close when the next request cannot be found
        let close = [Header::from_static("Connection", "close")];
        let request_headers: &[Header] = if self.body_unframed {
            &close
        } else {
            &self.headers
        };

        let result = response
            .with_missing_headers(&self.default_headers)
            .raw_print(
                &mut writer,
                self.http_version,
                request_headers,
                do_not_send_body,
            )
            .and_then(|_| writer.flush());

        ignore_client_closing_errors(result)
    }
}

impl fmt::Debug for Request {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        write!(
            formatter,
            "Request({} {} from {:?})",
            self.method, self.path, self.remote_addr
        )
    }
}

impl Drop for Request {
    fn drop(&mut self) {
        if self.response_writer.is_some() {
            let response = Response::empty(500);
            // ignoring the result: the client is probably gone
            self.respond_impl(response).ok();
        }

        let body = mem::replace(&mut self.data_reader, Box::new(io::empty()));

        if let Some(notify) = self.notify_when_responded.take() {
            // a client still waiting for `100 Continue` may or may not send its body,
            // and an unframed body has no known end
            let leftover = if self.must_send_continue || self.body_unframed {
                None
            } else {
                Some(body)
            };
            notify.send(leftover).ok();
        }
    }
}
