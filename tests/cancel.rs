use light_socket::{Shutdown, Socket, SocketBuilder, SocketError};
use std::thread;
use std::time::Duration;

fn connected_pair() -> (Socket, Socket, Socket) {
    let mut listener = SocketBuilder::new()
        .retry_slice(Duration::from_millis(5))
        .tcp()
        .unwrap();
    listener.bind("127.0.0.1", 0).unwrap();
    listener.listen(0).unwrap();
    let port = listener.local_address().unwrap().port();

    let mut client = Socket::new();
    client.tcp().unwrap();
    client.connect("127.0.0.1", port).unwrap();

    let mut server = Socket::new();
    listener.accept(&mut server).unwrap();

    (listener, client, server)
}

#[test]
fn shutdown_request_aborts_suspended_receive() {
    let (_listener, _client, mut server) = connected_pair();
    let cancel = server.cancel_handle();

    let canceller = thread::spawn(move || {
        thread::sleep(Duration::from_millis(50));
        cancel.shutdown(Shutdown::Read);
    });

    let mut buf = [0u8; 8];
    let error = server.receive(&mut buf).unwrap_err();
    assert!(matches!(error, SocketError::ConnectionClosedByPeer));
    assert!(server.shutdown_state().read_closed());

    canceller.join().unwrap();
}

#[test]
fn close_request_aborts_suspended_accept() {
    let mut listener = Socket::new();
    listener.tcp().unwrap();
    listener.bind("127.0.0.1", 0).unwrap();
    listener.listen(0).unwrap();
    let cancel = listener.cancel_handle();

    let canceller = thread::spawn(move || {
        thread::sleep(Duration::from_millis(50));
        cancel.close();
    });

    let mut client = Socket::new();
    let error = listener.accept(&mut client).unwrap_err();
    assert!(matches!(error, SocketError::InvalidState(_)));
    assert!(listener.is_closed());
    assert!(client.is_closed());

    canceller.join().unwrap();
}

#[test]
fn requests_are_cleared_on_reopen() {
    let mut socket = Socket::new();
    socket.udp().unwrap();
    let cancel = socket.cancel_handle();
    socket.close().unwrap();

    cancel.close();
    socket.udp().unwrap();
    socket.bind("127.0.0.1", 0).expect("stale close request ignored");
    assert!(!socket.is_closed());
}

#[test]
fn send_interrupted_midway_reports_bytes_already_written() {
    let (_listener, mut client, _server) = connected_pair();
    let cancel = client.cancel_handle();

    // Larger than any loopback send and receive buffers combined; the peer
    // never reads.
    let payload = vec![1u8; 64 * 1024 * 1024];

    let canceller = thread::spawn(move || {
        thread::sleep(Duration::from_millis(200));
        cancel.shutdown(Shutdown::Write);
    });

    let sent = client.send(&payload).expect("partial count instead of an error");
    assert!(sent > 0);
    assert!(sent < payload.len());

    let error = client.send(b"more").unwrap_err();
    assert!(matches!(error, SocketError::InvalidState(_)));

    canceller.join().unwrap();
}
