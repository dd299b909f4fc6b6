use std::io::{Read, Write};
use std::net::Shutdown;
use std::sync::mpsc;
use std::thread;

#[allow(dead_code)]
mod support;

#[test]
fn basic_string_input() {
    let (server, client) = support::new_one_server_one_client();

    {
        let mut client = client;
        write!(client, "GET / HTTP/1.1\r\nHost: localhost\r\nContent-Type: text/plain; charset=utf8\r\nContent-Length: 5\r\n\r\nhello").unwrap();
    }

    let mut request = server.recv().unwrap();

    let mut output = String::new();
    request.as_reader().read_to_string(&mut output).unwrap();
    assert_eq!(output, "hello");
}

#[test]
fn wrong_content_length() {
    let (server, client) = support::new_one_server_one_client();

    {
        let mut client = client;
        write!(client, "GET / HTTP/1.1\r\nHost: localhost\r\nContent-Type: text/plain; charset=utf8\r\nContent-Length: 3\r\n\r\nhello").unwrap();
    }

    let mut request = server.recv().unwrap();

    let mut output = String::new();
    request.as_reader().read_to_string(&mut output).unwrap();
    assert_eq!(output, "hel");
}

#[test]
fn chunked_input() {
    let (server, client) = support::new_one_server_one_client();

    {
        let mut client = client;
        write!(client, "POST /api/save-csv HTTP/1.1\r\nHost: localhost\r\nTransfer-Encoding: chunked\r\n\r\n9\r\nid,title\n\r\n6\r\n1,Foo\n\r\n0\r\n\r\n").unwrap();
    }

    let mut request = server.recv().unwrap();
    assert_eq!(request.body_length(), None);

    let mut output = String::new();
    request.as_reader().read_to_string(&mut output).unwrap();
    assert_eq!(output, "id,title\n1,Foo\n");
}

#[test]
fn expect_100_continue() {
    let (server, client) = support::new_one_server_one_client();

    let mut client = client;
    write!(client, "GET / HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\nExpect: 100-continue\r\nContent-Type: text/plain; charset=utf8\r\nContent-Length: 5\r\n\r\n").unwrap();
    client.flush().unwrap();

    let (tx, rx) = mpsc::channel();

    thread::spawn(move || {
        let mut request = server.recv().unwrap();
        let mut output = String::new();
        request.as_reader().read_to_string(&mut output).unwrap();
        assert_eq!(output, "hello");
        tx.send(()).unwrap();
    });

    let mut content = vec![0; 12];
    client.read_exact(&mut content).unwrap();
    assert!(content[9..].starts_with(b"100")); // 100 status code

    write!(client, "hello").unwrap();
    client.flush().unwrap();
    client.shutdown(Shutdown::Write).unwrap();

    rx.recv().unwrap();
}

#[test]
fn unsupported_expect_header() {
    let mut client = support::new_client_to_hello_world_server();

    write!(client, "GET / HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\nExpect: 189-dummy\r\nContent-Type: text/plain; charset=utf8\r\n\r\n").unwrap();

    let mut content = String::new();
    client.read_to_string(&mut content).unwrap();
    assert!(content[9..].starts_with("417")); // 417 status code
}

#[test]
fn garbage_request_line() {
    let mut client = support::new_client_to_hello_world_server();

    write!(client, "HELLO\r\n\r\n").unwrap();

    let mut content = String::new();
    client.read_to_string(&mut content).unwrap();
    assert!(content[9..].starts_with("400"));
}

#[test]
fn unsupported_http_version() {
    let mut client = support::new_client_to_hello_world_server();

    write!(client, "GET / HTTP/2.0\r\nHost: localhost\r\n\r\nGET / HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n").unwrap();

    let mut content = String::new();
    client.read_to_string(&mut content).unwrap();
    assert!(content[9..].starts_with("505"));
    assert!(content.ends_with("hello world"));
}

#[test]
fn unparsable_content_length_closes_connection() {
    let mut client = support::new_client_to_hello_world_server();

    // keep-alive, but the end of the body cannot be known
    write!(client, "POST / HTTP/1.1\r\nHost: localhost\r\nContent-Length: 3x\r\n\r\nid\n").unwrap();

    // the server may reset the socket after its answer, keep whatever arrived
    let mut data = Vec::new();
    let _ = client.read_to_end(&mut data);
    let content = String::from_utf8(data).unwrap();

    assert_eq!(content.matches("HTTP/1.1 ").count(), 1);
    assert!(content.contains("Connection: close\r\n"));
    assert!(content.ends_with("hello world"));
}
