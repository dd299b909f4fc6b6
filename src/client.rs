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

use std::io::{self, BufRead, BufReader, BufWriter, ErrorKind, Read, Write};
use std::net::{SocketAddr, TcpStream};
use std::sync::mpsc::{channel, Receiver};
use std::sync::{Arc, Mutex};

use crate::common::{HTTPVersion, Header, Method, StatusCode};
use crate::log::debug;
use crate::request::{new_request, Leftover, RequestCreationError};
use crate::util::{RefinedTcpStream, SequentialReader, SequentialWriter};
use crate::{Request, Response, ServerConfig};

/// Longest request line or header line that is accepted.
const MAX_LINE_LENGTH: usize = 65536;

/// Largest number of headers accepted in one request.
const MAX_HEADERS: usize = 100;

/// A ClientConnection is an object that will store a socket to a client
/// and return Request objects.
pub struct ClientConnection {
    // address of the client
    remote_addr: Option<SocketAddr>,

    // read half of the socket, shared with the body of the current request
    source: Arc<Mutex<BufReader<RefinedTcpStream>>>,

    // write half of the socket, shared with the current request
    sink: Arc<Mutex<BufWriter<RefinedTcpStream>>>,

    // headers every response on this connection carries
    default_headers: Arc<Vec<Header>>,

    // signalled when the request handed out last has been answered
    pending: Option<Receiver<Leftover>>,

    // set to true if we know that the previous request is the last one
    no_more_requests: bool,
}

/// Error that can happen when reading a request.
#[derive(Debug)]
enum ReadError {
    WrongRequestLine,
    WrongHeader(HTTPVersion),
    RequestLineTooLong,
    HeadersTooLarge(HTTPVersion),

    /// the client sent an unrecognized `Expect` header
    ExpectationFailed(HTTPVersion),

    ReadIoError(io::Error),
}

impl From<io::Error> for ReadError {
    fn from(err: io::Error) -> ReadError {
        ReadError::ReadIoError(err)
    }
}

/// Outcome of reading one line off the socket.
enum Line {
    Complete(String),
    TooLong,
    NotText,
}

impl ClientConnection {
    /// Creates a new `ClientConnection` that takes ownership of the `TcpStream`.
    pub fn new(socket: TcpStream, config: &ServerConfig) -> io::Result<ClientConnection> {
        let (read_socket, write_socket) = RefinedTcpStream::new(socket)?;
        read_socket.set_read_timeout(config.client_timeout)?;
        let remote_addr = read_socket.peer_addr().ok();

        Ok(ClientConnection {
            remote_addr,
            source: Arc::new(Mutex::new(BufReader::with_capacity(1024, read_socket))),
            sink: Arc::new(Mutex::new(BufWriter::with_capacity(1024, write_socket))),
            default_headers: config.default_headers.clone(),
            pending: None,
            no_more_requests: false,
        })
    }

    /// Reads the next line from the socket.
    ///
    /// Reads until `LF` is reached and strips the trailing `CRLF` (or bare `LF`).
    /// The next read will start at the first byte of the new line.
    fn read_next_line(&mut self) -> Result<Line, ReadError> {
        let mut buf = Vec::new();

        {
            let mut source = self
                .source
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            (&mut *source)
                .take(MAX_LINE_LENGTH as u64 + 1)
                .read_until(b'\n', &mut buf)?;
        }

        if buf.is_empty() {
            return Err(ReadError::ReadIoError(ErrorKind::UnexpectedEof.into()));
        }

        if buf.last() != Some(&b'\n') {
            if buf.len() > MAX_LINE_LENGTH {
                return Ok(Line::TooLong);
            }
            return Err(ReadError::ReadIoError(ErrorKind::UnexpectedEof.into()));
        }

        buf.pop();
        if buf.last() == Some(&b'\r') {
            buf.pop();
        }

        Ok(match String::from_utf8(buf) {
            Ok(line) => Line::Complete(line),
            Err(_) => Line::NotText,
        })
    }

    /// Reads a request from the stream.
    /// Blocks until the header has been read.
    fn read(&mut self) -> Result<Request, ReadError> {
        let (method, path, version, headers) = {
            // reading the request line, skipping the empty lines some clients
            // leave behind after a body
            let (method, path, version) = loop {
                match self.read_next_line()? {
                    Line::Complete(ref line) if line.trim().is_empty() => continue,
                    Line::Complete(line) => break parse_request_line(line.trim())?,
                    Line::TooLong => return Err(ReadError::RequestLineTooLong),
                    Line::NotText => return Err(ReadError::WrongRequestLine),
                }
            };

            // getting all headers
            let mut headers = Vec::new();
            loop {
                let line = match self.read_next_line()? {
                    Line::Complete(line) => line,
                    Line::TooLong => return Err(ReadError::HeadersTooLarge(version)),
                    Line::NotText => return Err(ReadError::WrongHeader(version)),
                };

                if line.trim().is_empty() {
                    break;
                }

                if headers.len() == MAX_HEADERS {
                    return Err(ReadError::HeadersTooLarge(version));
                }

                match line.parse() {
                    Ok(h) => headers.push(h),
                    Err(_) => return Err(ReadError::WrongHeader(version)),
                }
            }

            (method, path, version, headers)
        };

        let (tx, rx) = channel();

        let request = new_request(
            method,
            path,
            version,
            headers,
            self.remote_addr,
            SequentialReader::new(self.source.clone()),
            SequentialWriter::new(self.sink.clone()),
            self.default_headers.clone(),
            Some(tx),
        )
        .map_err(|e| match e {
            RequestCreationError::CreationIoError(e) => ReadError::ReadIoError(e),
            RequestCreationError::ExpectationFailed => ReadError::ExpectationFailed(version),
        })?;

        self.pending = Some(rx);
        Ok(request)
    }

    /// Blocks until the request handed out last has been answered, then
    /// throws away whatever part of its body was left unread.
    fn wait_for_pending(&mut self) {
        let rx = match self.pending.take() {
            Some(rx) => rx,
            None => return,
        };

        match rx.recv() {
            Ok(Some(mut body)) => {
                if io::copy(&mut body, &mut io::sink()).is_err() {
                    self.no_more_requests = true;
                }
            }
            Ok(None) | Err(_) => self.no_more_requests = true,
        }
    }

    /// Writes a response produced by the connection itself, not by the user.
    fn send_error(&mut self, status: u16, version: HTTPVersion) {
        let response = Response::empty(status).with_missing_headers(&self.default_headers);
        let close = [Header::from_static("Connection", "close")];
        let mut writer = SequentialWriter::new(self.sink.clone());

        response
            .raw_print(&mut writer, version, &close, false)
            .and_then(|_| writer.flush())
            .ok();
    }
}

impl Iterator for ClientConnection {
    type Item = Request;
    /// Blocks until the next Request is available.
    /// Returns None when no new Requests will come from the client.
    fn next(&mut self) -> Option<Request> {
        self.wait_for_pending();

        // the client sent a "connection: close" header in this previous request
        //  or is using HTTP 1.0, meaning that no new request will come
        if self.no_more_requests {
            return None;
        }

        loop {
            let rq = match self.read() {
                Err(ReadError::WrongRequestLine) => {
                    self.send_error(400, HTTPVersion(1, 1));
                    // we don't know where the next request would start,
                    // so we have to close
                    return None;
                }

                Err(ReadError::WrongHeader(ver)) => {
                    self.send_error(400, ver);
                    return None;
                }

                Err(ReadError::RequestLineTooLong) => {
                    self.send_error(414, HTTPVersion(1, 1));
                    return None;
                }

                Err(ReadError::HeadersTooLarge(ver)) => {
                    self.send_error(431, ver);
                    return None;
                }

                Err(ReadError::ReadIoError(ref err))
                    if err.kind() == ErrorKind::TimedOut || err.kind() == ErrorKind::WouldBlock =>
                {
                    // request timeout
                    self.send_error(408, HTTPVersion(1, 1));
                    return None;
                }

                Err(ReadError::ExpectationFailed(ver)) => {
                    // the client is waiting for a verdict on a body we are not going to
                    // read, so the position of the next request is unknown
                    self.send_error(417, ver);
                    return None;
                }

                Err(ReadError::ReadIoError(err)) => {
                    debug!("connection from {:?} ended: {}", self.remote_addr, err);
                    return None;
                }

                Ok(rq) => rq,
            };

            // checking HTTP version
            if rq.http_version() > HTTPVersion(1, 1) {
                let response = Response::from_string(
                    "This server only supports HTTP versions 1.0 and 1.1",
                )
                .with_status_code(StatusCode(505));
                rq.respond(response).ok();
                self.wait_for_pending();
                if self.no_more_requests {
                    return None;
                }
                continue;
            }

            // updating the status of the connection
            let connection_header = rq.header("Connection").map(str::to_owned);

            match connection_header {
                Some(ref val) if val.eq_ignore_ascii_case("close") => self.no_more_requests = true,

                Some(ref val) if val.eq_ignore_ascii_case("upgrade") => {
                    self.no_more_requests = true
                }

                Some(ref val)
                    if !val.eq_ignore_ascii_case("keep-alive")
                        && rq.http_version() == HTTPVersion(1, 0) =>
                {
                    self.no_more_requests = true
                }

                None if rq.http_version() == HTTPVersion(1, 0) => self.no_more_requests = true,

                _ => (),
            };

            // returning the request
            return Some(rq);
        }
    }
}

/// Parses a "HTTP/1.1" string.
fn parse_http_version(version: &str) -> Result<HTTPVersion, ReadError> {
    let (major, minor) = match version
        .strip_prefix("HTTP/")
        .and_then(|v| v.split_once('.'))
    {
        Some(parts) => parts,
        None => return Err(ReadError::WrongRequestLine),
    };

    match (major.parse(), minor.parse()) {
        (Ok(major), Ok(minor)) => Ok(HTTPVersion(major, minor)),
        _ => Err(ReadError::WrongRequestLine),
    }
}

/// Parses the request line of the request.
/// eg. GET / HTTP/1.1
fn parse_request_line(line: &str) -> Result<(Method, String, HTTPVersion), ReadError> {
    let mut parts = line.split(' ').filter(|p| !p.is_empty());

    let (method, path, version) = match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(m), Some(p), Some(v), None) => (m, p, v),
        _ => return Err(ReadError::WrongRequestLine),
    };

    let method: Method = method.parse().map_err(|_| ReadError::WrongRequestLine)?;
    let version = parse_http_version(version)?;

    Ok((method, path.to_owned(), version))
}
