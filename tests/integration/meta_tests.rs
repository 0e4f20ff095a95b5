//! Meta-service: definition stream, version and error frames.

use lrpc::config::ServerConfig;
use lrpc::rpc::chunked::DefinitionAssembler;
use lrpc::rpc::client::{ResponseFrame, encode_request};
use lrpc::rpc::compress::{compress_definition, definition_hash};
use lrpc::rpc::meta::{
    DEFINITION_FUNCTION, Definition, LIBRARY_VERSION, META_SERVICE_ID, MetaErrorKind,
    VERSION_FUNCTION,
};
use lrpc::rpc::server::Server;
use lrpc::rpc::stream::StreamState;

use crate::mock_transport::{MockTransport, hex};

const fn blob<const N: usize>() -> [u8; N] {
    let mut b = [0u8; N];
    let mut i = 0;
    while i < N {
        b[i] = i as u8;
        i += 1;
    }
    b
}

static BLOB: [u8; 420] = blob();

fn server_with(
    definition: Definition,
    tx_buffer_size: u16,
) -> Server<'static, MockTransport, 1> {
    let config = ServerConfig {
        tx_buffer_size,
        ..ServerConfig::default()
    };
    Server::with_config(MockTransport::new(), config)
        .unwrap()
        .with_definition(definition)
}

#[test]
fn definition_streamed_in_tx_sized_chunks() {
    let definition = Definition {
        compressed: &BLOB,
        ..Definition::EMPTY
    };
    let mut server = server_with(definition, 47);
    server.receive_bytes(&hex("04FF0101"));

    let frames = server.transport().frames.clone();
    assert_eq!(frames.len(), 10);
    for (i, frame) in frames.iter().enumerate() {
        assert_eq!(&frame[..4], &[0x2F, 0xFF, 0x01, 0x2A]);
        assert_eq!(&frame[4..46], &BLOB[i * 42..(i + 1) * 42]);
        let last = u8::from(i == frames.len() - 1);
        assert_eq!(frame[46], last);
    }
    assert_eq!(
        server.meta().definition_stream().state(),
        StreamState::Stopped
    );
}

#[test]
fn partial_last_chunk() {
    let definition = Definition {
        compressed: &BLOB[..100],
        ..Definition::EMPTY
    };
    let mut server = server_with(definition, 47);
    server.receive_bytes(&hex("04FF0101"));

    let frames = server.transport().frames.clone();
    assert_eq!(frames.len(), 3);
    let last = &frames[2];
    assert_eq!(last.len(), 3 + 1 + 16 + 1);
    assert_eq!(last[0] as usize, last.len());
    assert_eq!(last[3], 16);
    assert_eq!(*last.last().unwrap(), 1);
}

#[test]
fn empty_definition_is_one_final_chunk() {
    let mut server = server_with(Definition::EMPTY, 256);
    server.receive_bytes(&hex("04FF0101"));
    assert_eq!(server.transport().hex_frames(), ["05FF010001"]);
}

#[test]
fn stop_requests_do_not_send_definition() {
    let definition = Definition {
        compressed: &BLOB[..4],
        ..Definition::EMPTY
    };
    let mut server = server_with(definition, 256);
    server.receive_bytes(&hex("04FF0100 03FF01"));
    assert!(server.transport().frames.is_empty());
    assert_eq!(server.stats().errors, 0);
    assert!(server.meta().definition_stream().stop_requested());
}

#[test]
fn peer_stops_definition_mid_stream() {
    let definition = Definition {
        compressed: &BLOB,
        ..Definition::EMPTY
    };
    let mut server = server_with(definition, 47);
    server.transport_mut().arrive_after(2, &hex("04FF0100"));
    server.receive_bytes(&hex("04FF0101"));

    // The stop arrives while chunk 1 is written; chunk 2 is the last one.
    let frames = server.transport().frames.clone();
    assert_eq!(frames.len(), 3);
    let finals: Vec<u8> = frames.iter().map(|f| f[46]).collect();
    assert_eq!(finals, [0, 0, 1]);
    assert_eq!(&frames[2][4..46], &BLOB[84..126]);
    assert_eq!(
        server.meta().definition_stream().state(),
        StreamState::Stopped
    );
    assert!(server.transport().inbound.is_empty());
}

#[test]
fn empty_stop_frame_ends_definition_stream() {
    let definition = Definition {
        compressed: &BLOB,
        ..Definition::EMPTY
    };
    let mut server = server_with(definition, 47);
    server.transport_mut().arrive_after(5, &hex("03FF01"));
    server.receive_bytes(&hex("04FF0101"));

    let frames = server.transport().frames.clone();
    assert_eq!(frames.len(), 6);
    assert_eq!(frames[5][46], 1);
    assert!(frames[..5].iter().all(|f| f[46] == 0));

    // The stream can be started again after a stop.
    server.transport_mut().frames.clear();
    server.receive_bytes(&hex("04FF0101"));
    assert_eq!(server.transport().frames.len(), 10);
}

#[test]
fn version_reports_three_strings() {
    let definition = Definition {
        version: "1.2",
        hash: "abc",
        ..Definition::EMPTY
    };
    let mut server = server_with(definition, 256);
    server.receive_bytes(&hex("03FF02"));

    let frames = server.transport().frames.clone();
    let frame = ResponseFrame::parse(&frames[0])
        .unwrap()
        .expect(META_SERVICE_ID, VERSION_FUNCTION)
        .unwrap();
    let mut payload = frame.payload();
    let version: &str = payload.decode();
    let hash: &str = payload.decode();
    let library: &str = payload.decode();
    assert_eq!((version, hash, library), ("1.2", "abc", LIBRARY_VERSION));
    assert!(payload.is_empty());
}

#[test]
fn peer_error_frame_is_ignored() {
    let mut server = server_with(Definition::EMPTY, 256);
    server.receive_bytes(&hex("03FF00"));
    assert!(server.transport().frames.is_empty());
    assert_eq!(server.stats().errors, 0);
}

#[test]
fn unknown_meta_function() {
    let mut server = server_with(Definition::EMPTY, 256);
    server.receive_bytes(&hex("03FF09"));
    let frames = server.transport().frames.clone();
    let error = ResponseFrame::parse(&frames[0])
        .unwrap()
        .meta_error()
        .unwrap();
    assert_eq!(error.kind, MetaErrorKind::UnknownFunction);
    assert_eq!(error.params, [0xFF, 9, 0, 0]);
}

#[test]
fn definition_reassembles_on_peer() {
    let text = b"name: demo\nservices:\n  - name: s0\n    id: 0\n    functions:\n".repeat(20);
    let compressed: &'static [u8] = Box::leak(compress_definition(&text).into_boxed_slice());
    let hash = definition_hash(&text);
    let definition = Definition {
        version: "0.1",
        hash: Box::leak(hash.as_str().to_owned().into_boxed_str()),
        compressed,
    };
    let mut server = server_with(definition, 20);

    let mut buf = [0u8; 8];
    let request = encode_request(&mut buf, META_SERVICE_ID, DEFINITION_FUNCTION, |w| {
        w.encode(&true)
    });
    server.receive_bytes(request);

    let frames = server.transport().frames.clone();
    assert!(frames.len() > 1);

    let mut assembler = DefinitionAssembler::new();
    let mut complete = None;
    for bytes in &frames {
        let frame = ResponseFrame::parse(bytes).unwrap();
        if let Some(blob) = assembler.feed_frame(&frame).unwrap() {
            complete = Some(blob);
        }
    }
    let complete = complete.unwrap();
    assert_eq!(complete, compressed);
    let inflated = DefinitionAssembler::finish(&complete, Some(hash.as_str())).unwrap();
    assert_eq!(inflated, text);
}
