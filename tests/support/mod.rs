use std::io::{Read, Write};
use std::net::{SocketAddr, TcpStream};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use reading_archive::{Config, ReadingArchive, Response, Server};

/// Creates a server and a client connected to the server.
pub fn new_one_server_one_client() -> (Server, TcpStream) {
    let server = Server::http("127.0.0.1:0").unwrap();
    let port = server.server_addr().port();
    let client = TcpStream::connect(("127.0.0.1", port)).unwrap();
    (server, client)
}

/// Creates a "hello world" server with a client connected to the server.
///
/// The server will automatically close after 3 seconds.
pub fn new_client_to_hello_world_server() -> TcpStream {
    let server = Server::http("127.0.0.1:0").unwrap();
    let port = server.server_addr().port();
    let client = TcpStream::connect(("127.0.0.1", port)).unwrap();
    client
        .set_read_timeout(Some(Duration::from_secs(10)))
        .unwrap();

    thread::spawn(move || {
        let mut cycles = 3 * 1000 / 20;

        loop {
            if let Ok(Some(rq)) = server.recv_timeout(Duration::from_millis(20)) {
                let response = Response::from_string("hello world".to_string());
                rq.respond(response).ok();
            }

            cycles -= 1;
            if cycles == 0 {
                break;
            }
        }
    });

    client
}

/// The full reading archive application, served from a background thread.
///
/// Stops when dropped.
pub struct ArchiveServer {
    server: Arc<Server>,
    thread: Option<JoinHandle<()>>,
    pub archive: PathBuf,
}

impl ArchiveServer {
    /// Serves `root`, saving to `root/articles.csv`.
    pub fn start(root: &Path) -> ArchiveServer {
        let config = Config {
            bind: [127, 0, 0, 1].into(),
            port: 0,
            root: root.to_owned(),
            archive: root.join("articles.csv"),
            ..Config::default()
        };

        let server = Arc::new(reading_archive::bind(&config).unwrap());
        let app = ReadingArchive::new(&config);

        let serving = server.clone();
        let thread = thread::spawn(move || reading_archive::serve(&serving, &app));

        ArchiveServer {
            server,
            thread: Some(thread),
            archive: config.archive,
        }
    }

    pub fn addr(&self) -> SocketAddr {
        self.server.server_addr()
    }

    pub fn connect(&self) -> TcpStream {
        let client = TcpStream::connect(self.addr()).unwrap();
        client
            .set_read_timeout(Some(Duration::from_secs(10)))
            .unwrap();
        client
    }

    /// Writes `request` on a new connection and reads until the server closes it.
    pub fn send_raw(&self, request: &[u8]) -> RawResponse {
        let mut client = self.connect();
        client.write_all(request).unwrap();

        let mut data = Vec::new();
        client.read_to_end(&mut data).unwrap();
        RawResponse::parse(&data)
    }
}

impl Drop for ArchiveServer {
    fn drop(&mut self) {
        self.server.unblock();
        if let Some(thread) = self.thread.take() {
            thread.join().ok();
        }
    }
}

/// A response as it came off the wire.
#[derive(Debug)]
pub struct RawResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl RawResponse {
    pub fn parse(data: &[u8]) -> RawResponse {
        let text = String::from_utf8_lossy(data);
        let (head, body) = text.split_once("\r\n\r\n").unwrap();
        let mut lines = head.split("\r\n");

        let status = lines.next().unwrap()[9..12].parse().unwrap();
        let headers = lines
            .map(|line| {
                let (field, value) = line.split_once(':').unwrap();
                (field.trim().to_owned(), value.trim().to_owned())
            })
            .collect();

        RawResponse {
            status,
            headers,
            body: body.to_owned(),
        }
    }

    pub fn header(&self, field: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(f, _)| f.eq_ignore_ascii_case(field))
            .map(|(_, v)| v.as_str())
    }

    pub fn header_count(&self, field: &str) -> usize {
        self.headers
            .iter()
            .filter(|(f, _)| f.eq_ignore_ascii_case(field))
            .count()
    }
}
