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

/*!
# Reading archive server

A small local HTTP server for the reading archive: it serves the files of a
directory and exposes one endpoint, `POST /api/save-csv`, that overwrites the
archive file (`articles.csv`) with the body of the request. Every response
allows cross-origin access from any origin.

## Running it

```no_run
let config = reading_archive::Config::default();
let server = reading_archive::bind(&config).unwrap();
let app = reading_archive::ReadingArchive::new(&config);

// blocks until `server.unblock()` is called
reading_archive::serve(&server, &app);
```

## The HTTP layer

The `Server` object hands out requests one at a time.
Calling `server.recv()` will block until the next request is available.

```no_run
let server = reading_archive::Server::http("0.0.0.0:8000").unwrap();

loop {
    // blocks until the next request is received
    let request = match server.recv() {
        Ok(rq) => rq,
        Err(e) => { println!("error: {}", e); break }
    };

    // answer it
    let response = reading_archive::Response::from_string("hello world");
    let _ = request.respond(response);
}
```

Each connection is read by its own thread, but a connection does not parse its
next request before the current one has been answered, and all requests come
out of a single queue. Handling requests from one loop therefore processes them
strictly one after the other.

If you don't want to block, you can call `server.try_recv()` or
`server.recv_timeout()` instead.
*/
#![forbid(unsafe_code)]

use std::io::{self, ErrorKind};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, Shutdown, SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use client::ClientConnection;
use util::MessagesQueue;

pub use archive::Archive;
pub use common::{HTTPVersion, Header, HeaderField, Method, StatusCode};
pub use config::Config;
pub use error::SaveError;
pub use handler::{bind, serve, ReadingArchive};
pub use request::Request;
pub use response::{Response, ResponseBox};
pub use static_files::StaticFiles;
pub use test::MockRequest;

mod archive;
mod client;
mod common;
mod config;
pub mod cors;
mod error;
mod handler;
mod log;
mod pages;
mod request;
mod response;
mod static_files;
mod util;

use crate::log::{debug, error, warn};

/// The main class of this library.
///
/// Destroying this object stops the accept thread, so no new connection is accepted.
///  Connections that are already open keep being read by their own threads, and requests
///  that have already been returned by the `recv()` function can still be answered.
pub struct Server {
    // should be false as long as the server exists
    // when set to true, all the subtasks will close within a few hundreds ms
    close: Arc<AtomicBool>,

    // queue for messages received by child threads
    messages: Arc<MessagesQueue<Message>>,

    // result of TcpListener::local_addr()
    listening_addr: SocketAddr,
}

enum Message {
    Request(Request),
    Unblock,
}

impl From<Request> for Message {
    fn from(rq: Request) -> Message {
        Message::Request(rq)
    }
}

/// Settings shared by every connection of a `Server`.
#[derive(Debug, Clone, Default)]
pub struct ServerConfig {
    /// Headers added to every response that does not set them itself.
    pub default_headers: Arc<Vec<Header>>,

    /// How long a connection may stay silent before it gets a 408 and is closed.
    /// `None` waits forever.
    pub client_timeout: Option<Duration>,
}

impl ServerConfig {
    pub fn with_default_headers(mut self, headers: Vec<Header>) -> ServerConfig {
        self.default_headers = Arc::new(headers);
        self
    }

    pub fn with_client_timeout(mut self, timeout: Option<Duration>) -> ServerConfig {
        self.client_timeout = timeout;
        self
    }
}

// this trait is to make sure that Server implements Sync and Send
#[doc(hidden)]
trait MustBeShareDummy: Sync + Send {}
#[doc(hidden)]
impl MustBeShareDummy for Server {}

pub struct IncomingRequests<'a> {
    server: &'a Server,
}

impl Server {
    /// Shortcut for a simple server on a specific address.
    #[inline]
    pub fn http<A>(addr: A) -> io::Result<Server>
    where
        A: ToSocketAddrs,
    {
        Server::with_config(addr, ServerConfig::default())
    }

    /// Builds a new server that listens on the specified address.
    pub fn with_config<A>(addr: A, config: ServerConfig) -> io::Result<Server>
    where
        A: ToSocketAddrs,
    {
        let listener = TcpListener::bind(addr)?;
        Server::from_listener(listener, config)
    }

    /// Builds a new server using the specified TCP listener.
    ///
    /// This is useful if you've constructed TcpListener using some less usual method
    /// such as from systemd. For other cases, you probably want the `with_config()` function.
    pub fn from_listener(listener: TcpListener, config: ServerConfig) -> io::Result<Server> {
        let listening_addr = listener.local_addr()?;
        debug!("server listening on {}", listening_addr);

        let close_trigger = Arc::new(AtomicBool::new(false));
        let messages = MessagesQueue::with_capacity(8);
        let config = Arc::new(config);

        let inside_close_trigger = close_trigger.clone();
        let inside_messages = messages.clone();
        thread::Builder::new()
            .name("reading-archive-acceptor".to_owned())
            .spawn(move || {
                debug!("running accept thread");

                while !inside_close_trigger.load(Ordering::Relaxed) {
                    let socket = match listener.accept() {
                        Ok((sock, _)) => sock,
                        Err(e) => {
                            error!("error on connection accept: {}", e);
                            if e.kind() == ErrorKind::Interrupted {
                                continue;
                            }
                            // usually out of file descriptors, give the
                            // other connections a chance to finish
                            thread::sleep(Duration::from_millis(50));
                            continue;
                        }
                    };

                    if inside_close_trigger.load(Ordering::Relaxed) {
                        break;
                    }

                    let client = match ClientConnection::new(socket, &config) {
                        Ok(client) => client,
                        Err(e) => {
                            warn!("error while setting up connection: {}", e);
                            continue;
                        }
                    };

                    let messages = inside_messages.clone();
                    let spawned = thread::Builder::new()
                        .name("reading-archive-client".to_owned())
                        .spawn(move || {
                            for rq in client {
                                messages.push(rq.into());
                            }
                        });

                    if let Err(e) = spawned {
                        error!("failed to spawn connection thread: {}", e);
                    }
                }

                debug!("terminating accept thread");
            })?;

        Ok(Server {
            messages,
            close: close_trigger,
            listening_addr,
        })
    }

    /// Returns an iterator for all the incoming requests.
    ///
    /// The iterator will return `None` if the server is unblocked.
    #[inline]
    pub fn incoming_requests(&self) -> IncomingRequests<'_> {
        IncomingRequests { server: self }
    }

    /// Returns the address the server is listening to.
    #[inline]
    pub fn server_addr(&self) -> SocketAddr {
        self.listening_addr
    }

    /// Blocks until an HTTP request has been submitted and returns it.
    ///
    /// Returns an error of kind `Interrupted` once `unblock` has been called.
    pub fn recv(&self) -> io::Result<Request> {
        match self.messages.pop() {
            Message::Request(rq) => Ok(rq),
            Message::Unblock => Err(io::Error::new(ErrorKind::Interrupted, "unblocked")),
        }
    }

    /// Same as `recv()` but doesn't block longer than timeout
    pub fn recv_timeout(&self, timeout: Duration) -> io::Result<Option<Request>> {
        match self.messages.pop_timeout(timeout) {
            Some(Message::Request(rq)) => Ok(Some(rq)),
            Some(Message::Unblock) => Err(io::Error::new(ErrorKind::Interrupted, "unblocked")),
            None => Ok(None),
        }
    }

    /// Same as `recv()` but doesn't block.
    pub fn try_recv(&self) -> io::Result<Option<Request>> {
        match self.messages.try_pop() {
            Some(Message::Request(rq)) => Ok(Some(rq)),
            Some(Message::Unblock) => Err(io::Error::new(ErrorKind::Interrupted, "unblocked")),
            None => Ok(None),
        }
    }

    /// Unblocks a thread blocked in `recv()` or `incoming_requests()`.
    ///
    /// This is what makes the server stop on Ctrl-C.
    pub fn unblock(&self) {
        self.messages.push(Message::Unblock);
    }
}

impl Iterator for IncomingRequests<'_> {
    type Item = Request;
    fn next(&mut self) -> Option<Request> {
        self.server.recv().ok()
    }
}

impl Drop for Server {
    fn drop(&mut self) {
        self.close.store(true, Ordering::Relaxed);

        // connect briefly to ourselves to unblock the accept thread
        let mut wake_addr = self.listening_addr;
        if wake_addr.ip().is_unspecified() {
            wake_addr.set_ip(match wake_addr.ip() {
                IpAddr::V4(_) => IpAddr::V4(Ipv4Addr::LOCALHOST),
                IpAddr::V6(_) => IpAddr::V6(Ipv6Addr::LOCALHOST),
            });
        }

        if let Ok(stream) = TcpStream::connect_timeout(&wake_addr, Duration::from_secs(1)) {
            stream.shutdown(Shutdown::Both).ok();
        }
    }
}
