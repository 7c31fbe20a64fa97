use light_socket::{Shutdown, Socket, SocketBuilder, SocketError};
use std::thread;
use std::time::Duration;

fn listening() -> (Socket, u16) {
    let mut listener = Socket::new();
    listener.tcp().expect("open listener");
    listener.bind("127.0.0.1", 0).expect("bind");
    listener.listen(0).expect("listen");
    let port = listener.local_address().expect("local address").port();

    (listener, port)
}

fn connected_pair() -> (Socket, Socket, Socket) {
    let (mut listener, port) = listening();

    let mut client = Socket::new();
    client.tcp().expect("open client");
    client.connect("127.0.0.1", port).expect("connect");

    let mut server = Socket::new();
    listener.accept(&mut server).expect("accept");

    (listener, client, server)
}

#[test]
fn tcp_accept_and_echo() {
    let (_listener, mut client, mut server) = connected_pair();

    assert_eq!(client.send(b"ping").expect("send"), 4);
    let mut buf = [0u8; 4];
    let n = server.receive(&mut buf).expect("receive");
    assert_eq!(&buf[..n], b"ping");

    server.send(b"pong").expect("send back");
    let n = client.receive(&mut buf).expect("receive back");
    assert_eq!(&buf[..n], b"pong");
}

#[test]
fn tcp_large_payload_arrives_intact() {
    let (_listener, mut client, mut server) = connected_pair();

    let payload: Vec<u8> = (0..4 * 1024 * 1024).map(|i| (i % 251) as u8).collect();
    let expected = payload.clone();

    let writer = thread::spawn(move || {
        let sent = client.send(&payload).expect("send all");
        assert_eq!(sent, payload.len());
        client.close().expect("close writer");
    });

    let mut received = Vec::with_capacity(expected.len());
    let mut buf = [0u8; 8192];
    loop {
        match server.receive(&mut buf) {
            Ok(n) => received.extend_from_slice(&buf[..n]),
            Err(SocketError::ConnectionClosedByPeer) => break,
            Err(error) => panic!("unexpected receive error: {error}"),
        }
    }

    writer.join().unwrap();
    assert_eq!(received.len(), expected.len());
    assert!(received == expected, "payload differs");
}

#[test]
fn accept_leaves_listener_unchanged() {
    let (mut listener, port) = listening();
    let raw_before = listener.raw();
    let address_before = listener.local_address().unwrap();

    let mut client = Socket::new();
    client.tcp().unwrap();
    client.connect("127.0.0.1", port).unwrap();

    let mut server = Socket::new();
    let peer = listener.accept(&mut server).expect("accept");

    assert_eq!(listener.raw(), raw_before);
    assert_eq!(listener.local_address().unwrap(), address_before);
    assert_ne!(server.raw(), listener.raw());
    assert_eq!(peer, client.local_address().unwrap());
    assert_eq!(server.peer_address().unwrap(), peer);
}

#[test]
fn accept_rejects_open_client() {
    let (mut listener, _port) = listening();

    let mut client = Socket::new();
    client.tcp().unwrap();

    let error = listener.accept(&mut client).unwrap_err();
    assert!(matches!(error, SocketError::InvalidState(_)));
}

#[test]
fn peer_close_is_reported_once() {
    let (_listener, mut client, mut server) = connected_pair();

    assert!(client.close().unwrap());

    let mut buf = [0u8; 16];
    let error = server.receive(&mut buf).unwrap_err();
    assert!(error.is_closed_by_peer());
    assert!(server.shutdown_state().read_closed());

    let error = server.receive(&mut buf).unwrap_err();
    assert!(matches!(error, SocketError::InvalidState(_)));
}

#[test]
fn local_shutdown_write_fails_fast_and_signals_peer() {
    let (_listener, mut client, mut server) = connected_pair();

    client.shutdown(Shutdown::Write).expect("shutdown write");
    assert!(client.shutdown_state().write_closed());
    assert!(!client.shutdown_state().read_closed());

    let error = client.send(b"late").unwrap_err();
    assert!(matches!(error, SocketError::InvalidState(_)));

    let mut buf = [0u8; 4];
    assert!(server.receive(&mut buf).unwrap_err().is_closed_by_peer());

    // The other half still works.
    server.send(b"ok").unwrap();
    let n = client.receive(&mut buf).unwrap();
    assert_eq!(&buf[..n], b"ok");
}

#[test]
fn accepted_socket_inherits_configuration() {
    let mut listener = SocketBuilder::new()
        .buffer_size(64)
        .retry_slice(Duration::from_millis(5))
        .tcp()
        .unwrap();
    listener.bind("127.0.0.1", 0).unwrap();
    listener.listen(4).unwrap();
    let port = listener.local_address().unwrap().port();

    let mut client = Socket::new();
    client.tcp().unwrap();
    client.connect("127.0.0.1", port).unwrap();

    let mut server = Socket::new();
    listener.accept(&mut server).unwrap();
    assert_eq!(server.config(), listener.config());

    client.send(b"buffered").unwrap();
    let data = server.receive_buffered().expect("receive into own buffer");
    assert_eq!(data, b"buffered");
}

#[test]
fn receive_buffered_requires_a_buffer() {
    let (_listener, _client, mut server) = connected_pair();

    let error = server.receive_buffered_now().unwrap_err();
    assert!(matches!(error, SocketError::InvalidState(_)));
}

#[test]
fn connect_to_address_of_other_family_fails() {
    let mut client = Socket::new();
    client.tcp().unwrap();

    let error = client.connect("::1", 80).unwrap_err();
    assert!(matches!(error, SocketError::Resolution { port: 80, .. }));
}
