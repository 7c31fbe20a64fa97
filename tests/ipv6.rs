use light_socket::reactor;
use light_socket::{Domain, Socket, SocketBuilder, SocketError};
use std::net::{IpAddr, Ipv6Addr};

// Hosts without an IPv6 loopback skip these tests.
fn loopback_listener() -> Option<(Socket, u16)> {
    let mut listener = match SocketBuilder::new().ipv6().tcp() {
        Ok(listener) => listener,
        Err(error) => {
            eprintln!("skipping: no IPv6 sockets ({error})");
            return None;
        }
    };
    if let Err(error) = listener.bind("::1", 0) {
        eprintln!("skipping: no IPv6 loopback ({error})");
        return None;
    }
    listener.listen(0).expect("listen");
    let port = listener.local_address().unwrap().port();

    Some((listener, port))
}

fn loopback_udp() -> Option<(Socket, u16)> {
    let mut socket = SocketBuilder::new().ipv6().udp().ok()?;
    socket.bind("::1", 0).ok()?;
    let port = socket.local_address().unwrap().port();

    Some((socket, port))
}

#[test]
fn stream_echo_over_ipv6_loopback() {
    let Some((mut listener, port)) = loopback_listener() else {
        return;
    };
    assert_eq!(listener.domain(), Some(Domain::Ipv6));

    let mut client = SocketBuilder::new().ipv6().tcp().unwrap();
    client.connect("[::1]", port).expect("connect over ::1");

    let mut server = Socket::new();
    let peer = listener.accept(&mut server).expect("accept");
    assert_eq!(peer.ip(), IpAddr::V6(Ipv6Addr::LOCALHOST));
    assert_eq!(server.domain(), Some(Domain::Ipv6));

    client.send(b"ping6").unwrap();
    let mut buf = [0u8; 8];
    let n = server.receive(&mut buf).unwrap();
    assert_eq!(&buf[..n], b"ping6");

    let mut text = [0u8; 64];
    let info = client.get_address(&mut text).unwrap();
    assert_eq!(&text[..info.len], b"::1");
    assert_eq!(info.port, port);
}

#[test]
fn datagrams_over_ipv6_loopback() {
    let Some((mut sender, sender_port)) = loopback_udp() else {
        return;
    };
    let Some((mut receiver, receiver_port)) = loopback_udp() else {
        return;
    };

    sender.send_to("::1", receiver_port, b"six").unwrap();

    let mut buf = [0u8; 16];
    let datagram = receiver.receive_from("::1", sender_port, &mut buf).unwrap();
    assert_eq!(&buf[..datagram.len], b"six");
    assert_eq!(datagram.from.port(), sender_port);
    assert!(datagram.from.is_ipv6());
}

#[test]
fn ipv6_socket_rejects_ipv4_addresses() {
    let Ok(mut socket) = SocketBuilder::new().ipv6().udp() else {
        return;
    };

    let error = socket.send_to("127.0.0.1", 9, b"x").unwrap_err();
    assert!(matches!(error, SocketError::Resolution { .. }));
}

#[test]
fn ipv6_wildcard_bind_is_unspecified_v6() {
    let Ok(mut socket) = SocketBuilder::new().ipv6().udp() else {
        return;
    };
    if socket.bind("", 0).is_err() {
        return;
    }

    let address = socket.local_address().unwrap();
    assert!(address.is_ipv6());
    assert!(address.ip().is_unspecified());
}

#[test]
fn select_mixes_address_families() {
    let Some((mut receiver6, port6)) = loopback_udp() else {
        return;
    };
    let (mut sender6, _) = loopback_udp().unwrap();

    let mut receiver4 = Socket::new();
    receiver4.udp().unwrap();
    receiver4.bind("*", 0).unwrap();

    sender6.send_to("::1", port6, b"v6").unwrap();

    {
        let table = [&receiver4, &receiver6];
        let ready = reactor::select(&table, &[], &[], Some(2.0)).unwrap();
        assert_eq!(ready.read.len(), 1);
        assert_eq!(ready.read[0].raw(), receiver6.raw());
    }

    let mut buf = [0u8; 4];
    let datagram = receiver6.receive_from_now("", 0, &mut buf).unwrap();
    assert_eq!(&buf[..datagram.len], b"v6");
    assert!(receiver4.receive_from_now("", 0, &mut buf).unwrap_err().is_would_block());
}
