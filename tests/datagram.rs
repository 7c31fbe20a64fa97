use light_socket::{Kind, Socket, SocketError};

fn bound_udp() -> (Socket, u16) {
    let mut socket = Socket::new();
    socket.udp().expect("open udp");
    socket.bind("127.0.0.1", 0).expect("bind");
    let port = socket.local_address().unwrap().port();

    (socket, port)
}

#[test]
fn datagram_boundaries_are_preserved() {
    let (mut sender, sender_port) = bound_udp();
    let (mut receiver, receiver_port) = bound_udp();
    assert_eq!(receiver.kind(), Some(Kind::Udp));

    sender.send_to("127.0.0.1", receiver_port, b"one").unwrap();
    sender.send_to("127.0.0.1", receiver_port, b"second").unwrap();

    let mut buf = [0u8; 64];
    let first = receiver.receive_from("", 0, &mut buf).unwrap();
    assert_eq!(&buf[..first.len], b"one");
    assert_eq!(first.from.port(), sender_port);

    let second = receiver.receive_from("", 0, &mut buf).unwrap();
    assert_eq!(&buf[..second.len], b"second");
}

#[test]
fn empty_datagram_is_not_a_close() {
    let (mut sender, _) = bound_udp();
    let (mut receiver, receiver_port) = bound_udp();

    sender.send_to("127.0.0.1", receiver_port, b"").unwrap();

    let mut buf = [0u8; 8];
    let datagram = receiver.receive_from("", 0, &mut buf).unwrap();
    assert_eq!(datagram.len, 0);
    assert!(!receiver.shutdown_state().read_closed());
}

#[test]
fn receive_from_filters_by_sender() {
    let (mut expected, expected_port) = bound_udp();
    let (mut noise, _) = bound_udp();
    let (mut receiver, receiver_port) = bound_udp();

    noise.send_to("127.0.0.1", receiver_port, b"noise").unwrap();
    expected.send_to("127.0.0.1", receiver_port, b"data").unwrap();

    let mut buf = [0u8; 16];
    let datagram = receiver
        .receive_from("127.0.0.1", expected_port, &mut buf)
        .unwrap();

    assert_eq!(&buf[..datagram.len], b"data");
    assert_eq!(datagram.from.port(), expected_port);
}

#[test]
fn receive_from_now_reports_would_block_for_other_senders() {
    let (mut noise, _) = bound_udp();
    let (_expected, expected_port) = bound_udp();
    let (mut receiver, receiver_port) = bound_udp();

    let mut buf = [0u8; 16];
    let error = receiver.receive_from_now("", 0, &mut buf).unwrap_err();
    assert!(error.is_would_block());

    noise.send_to("127.0.0.1", receiver_port, b"noise").unwrap();
    // Wait until the datagram is queued, then filter it out.
    {
        let table = [&receiver];
        let ready = light_socket::reactor::select(&table, &[], &[], Some(2.0)).unwrap();
        assert_eq!(ready.read.len(), 1);
    }

    let error = receiver
        .receive_from_now("127.0.0.1", expected_port, &mut buf)
        .unwrap_err();
    assert!(matches!(error, SocketError::WouldBlock));
}

#[test]
fn connected_udp_uses_send_and_receive() {
    let (mut a, a_port) = bound_udp();
    let (mut b, b_port) = bound_udp();

    a.connect("127.0.0.1", b_port).unwrap();
    b.connect("127.0.0.1", a_port).unwrap();

    a.send(b"hello").unwrap();
    let mut buf = [0u8; 16];
    let n = b.receive(&mut buf).unwrap();
    assert_eq!(&buf[..n], b"hello");
}
