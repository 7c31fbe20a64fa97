use light_socket::reactor::wait_count;
use light_socket::{MIN_RETRY_SLICE, Socket, SocketBuilder, SocketConfig, SocketError, last_error};
use std::thread;
use std::time::{Duration, Instant};

fn connected_pair() -> (Socket, Socket, Socket) {
    let mut listener = Socket::new();
    listener.tcp().unwrap();
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
fn receive_now_returns_would_block_without_waiting() {
    let (_listener, _client, mut server) = connected_pair();
    let waits = wait_count();

    let start = Instant::now();
    let mut buf = [0u8; 8];
    let error = server.receive_now(&mut buf).unwrap_err();

    assert!(error.is_would_block());
    assert_eq!(wait_count(), waits);
    assert!(start.elapsed() < Duration::from_secs(1));
}

#[test]
fn nonblocking_socket_never_suspends() {
    let (_listener, _client, mut server) = connected_pair();
    server.set_nonblock().unwrap();
    assert!(server.is_nonblocking());
    let waits = wait_count();

    let mut buf = [0u8; 8];
    let error = server.receive(&mut buf).unwrap_err();
    assert!(matches!(error, SocketError::WouldBlock));
    assert_eq!(wait_count(), waits);

    server.set_block().unwrap();
    assert!(!server.is_nonblocking());
}

#[test]
fn suspending_receive_waits_for_data() {
    let (_listener, mut client, mut server) = connected_pair();
    let waits = wait_count();

    let writer = thread::spawn(move || {
        thread::sleep(Duration::from_millis(100));
        client.send(b"late").unwrap();
        client
    });

    let mut buf = [0u8; 8];
    let n = server.receive(&mut buf).expect("receive");
    assert_eq!(&buf[..n], b"late");
    assert!(wait_count() > waits);

    drop(writer.join().unwrap());
}

#[test]
fn accept_now_without_pending_connection_would_block() {
    let mut listener = Socket::new();
    listener.tcp().unwrap();
    listener.bind("127.0.0.1", 0).unwrap();
    listener.listen(0).unwrap();

    let mut client = Socket::new();
    let error = listener.accept_now(&mut client).unwrap_err();
    assert!(error.is_would_block());
    assert!(client.is_closed());
}

#[test]
fn connect_now_completes_on_retry() {
    let mut listener = Socket::new();
    listener.tcp().unwrap();
    listener.bind("127.0.0.1", 0).unwrap();
    listener.listen(0).unwrap();
    let port = listener.local_address().unwrap().port();

    let mut client = Socket::new();
    client.tcp().unwrap();

    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        match client.connect_now("127.0.0.1", port) {
            Ok(()) => break,
            Err(SocketError::WouldBlock) if Instant::now() < deadline => {
                thread::sleep(Duration::from_millis(5));
            }
            Err(error) => panic!("connect_now failed: {error}"),
        }
    }

    let mut server = Socket::new();
    listener.accept(&mut server).unwrap();
    assert_eq!(client.peer_address().unwrap(), server.local_address().unwrap());
}

#[test]
fn refused_connection_records_platform_error() {
    // Grab a free port, then release it so nothing listens there.
    let mut probe = Socket::new();
    probe.tcp().unwrap();
    probe.bind("127.0.0.1", 0).unwrap();
    let port = probe.local_address().unwrap().port();
    probe.close().unwrap();

    let mut client = Socket::new();
    client.tcp().unwrap();

    let error = client.connect("127.0.0.1", port).unwrap_err();
    let code = error.raw_os_error().expect("platform error");
    assert_ne!(code, 0);
    assert_eq!(last_error(), code);
}

#[test]
fn zero_retry_slice_is_raised_to_the_minimum() {
    let builder = SocketBuilder::new().retry_slice(Duration::ZERO);
    assert_eq!(builder.build().config().retry_slice, MIN_RETRY_SLICE);
}

#[test]
fn zero_retry_slice_in_config_does_not_spin() {
    let mut listener = Socket::with_config(SocketConfig {
        retry_slice: Duration::ZERO,
        ..SocketConfig::default()
    });
    listener.tcp().unwrap();
    listener.bind("127.0.0.1", 0).unwrap();
    listener.listen(0).unwrap();
    let port = listener.local_address().unwrap().port();

    let mut client = Socket::new();
    client.tcp().unwrap();
    client.connect("127.0.0.1", port).unwrap();

    // Accepted sockets inherit the listener's zero slice.
    let mut server = Socket::new();
    listener.accept(&mut server).unwrap();
    assert_eq!(server.config().retry_slice, Duration::ZERO);

    let writer = thread::spawn(move || {
        thread::sleep(Duration::from_millis(100));
        client.send(b"late").unwrap();
        client
    });

    let waits = wait_count();
    let mut buf = [0u8; 8];
    let n = server.receive(&mut buf).unwrap();
    assert_eq!(&buf[..n], b"late");
    // Millisecond slices over ~100 ms; a spinning loop would issue far more.
    assert!(wait_count() - waits < 1000);

    drop(writer.join().unwrap());
}
