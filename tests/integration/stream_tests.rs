//! Server stream start/stop behaviour through the full server.

use std::convert::Infallible;

use lrpc::rpc::client::{ResponseFrame, stop_frame};
use lrpc::rpc::cursor::Reader;
use lrpc::rpc::rx_queue::RxQueue;
use lrpc::rpc::server::Server;
use lrpc::rpc::service::{Call, DispatchError, Handler, Service, ServiceId, dispatch};
use lrpc::rpc::stream::{Next, StreamControl, StreamState};
use lrpc::rpc::transport::Transport;

use crate::mock_transport::{CounterStream, MockTransport, hex, to_hex};

fn run(counter: &mut CounterStream, request: &str) -> Vec<Vec<u8>> {
    run_on(counter, MockTransport::new(), request)
}

fn run_on(counter: &mut CounterStream, transport: MockTransport, request: &str) -> Vec<Vec<u8>> {
    let mut server: Server<'_, MockTransport, 2> = Server::new(transport);
    server.register(counter).unwrap();
    server.receive_bytes(&hex(request));
    server.into_transport().frames
}

/// `(value, final)` of every chunk.
fn chunks(frames: &[Vec<u8>]) -> Vec<(u8, bool)> {
    chunks_of(frames, 1)
}

fn chunks_of(frames: &[Vec<u8>], service: ServiceId) -> Vec<(u8, bool)> {
    frames
        .iter()
        .map(|f| {
            let frame = ResponseFrame::parse(f).unwrap().expect(service, 0).unwrap();
            let mut payload = frame.payload();
            let value: u8 = payload.decode();
            let last: bool = payload.decode();
            (value, last)
        })
        .collect()
}

#[test]
fn stream_runs_until_source_exhausted() {
    let mut counter = CounterStream::new();
    let frames = run(&mut counter, "05010001 03");
    assert_eq!(chunks(&frames), [(0, false), (1, false), (2, true)]);
    assert_eq!(frames[0], hex("0501000000"));
    assert_eq!(counter.control.state(), StreamState::Stopped);
}

#[test]
fn single_chunk_stream_is_final() {
    let mut counter = CounterStream::new();
    let frames = run(&mut counter, "0501000101");
    assert_eq!(chunks(&frames), [(0, true)]);
}

#[test]
fn stop_mid_stream_emits_one_final_chunk() {
    let mut counter = CounterStream::new();
    counter.stop_at = Some(2);
    let frames = run(&mut counter, "0501000164");
    // Stop lands while chunk 2 is produced: it becomes the last chunk.
    assert_eq!(chunks(&frames), [(0, false), (1, false), (2, true)]);
    assert_eq!(counter.control.state(), StreamState::Stopped);
}

#[test]
fn restart_clears_previous_stop() {
    let mut counter = CounterStream::new();
    counter.stop_at = Some(0);
    let first = run(&mut counter, "0501000105");
    assert_eq!(chunks(&first), [(0, true)]);

    counter.stop_at = None;
    let second = run(&mut counter, "0501000102");
    assert_eq!(chunks(&second), [(0, false), (1, true)]);
}

#[test]
fn empty_frame_stops_stream() {
    let mut counter = CounterStream::new();
    let frames = run(&mut counter, &to_hex(&stop_frame(1, 0)));
    assert!(frames.is_empty());
    assert_eq!(counter.stops, 1);
    assert!(counter.control.stop_requested());
}

#[test]
fn false_start_flag_stops_stream() {
    let mut counter = CounterStream::new();
    let frames = run(&mut counter, "04010000");
    assert!(frames.is_empty());
    assert_eq!(counter.stops, 1);
}

#[test]
fn client_stream_never_replies() {
    let mut counter = CounterStream::new();
    let frames = run(&mut counter, "0501013412 0501017856");
    assert!(frames.is_empty());
    assert_eq!(counter.received, [0x1234, 0x5678]);
}

#[test]
fn server_requests_client_stream_stop() {
    let mut server: Server<'_, MockTransport, 2> = Server::new(MockTransport::new());
    server.request_stop(1, CounterStream::UPLOAD);
    assert_eq!(server.transport().frames, [stop_frame(1, CounterStream::UPLOAD)]);
}

#[test]
fn server_push_outside_request() {
    let mut server: Server<'_, MockTransport, 2> = Server::new(MockTransport::new());
    server.push(1, CounterStream::COUNT, |w| {
        w.encode(&7u8);
        w.encode(&true);
    });
    assert_eq!(server.transport().hex_frames(), ["0501000701"]);
}

// ── Stops from the peer while a stream runs ───────────────────

#[test]
fn peer_stop_during_stream_ends_it_after_one_chunk() {
    let mut counter = CounterStream::new();
    let mut transport = MockTransport::new();
    let arriving = [&stop_frame(1, CounterStream::COUNT)[..], &hex("0501013412")].concat();
    transport.arrive_after(2, &arriving);

    let frames = run_on(&mut counter, transport, "0501000164");
    assert_eq!(chunks(&frames), [(0, false), (1, false), (2, true)]);
    assert_eq!(counter.control.state(), StreamState::Stopped);

    // Bytes read during the stream are dispatched afterwards, in order.
    assert_eq!(counter.stops, 1);
    assert_eq!(counter.received, [0x1234]);
}

#[test]
fn false_flag_from_peer_stops_running_stream() {
    let mut counter = CounterStream::new();
    let mut transport = MockTransport::new();
    transport.arrive_after(4, &hex("04010000"));

    let frames = run_on(&mut counter, transport, "0501000164");
    assert_eq!(frames.len(), 5);
    assert_eq!(chunks(&frames)[4], (4, true));
    assert_eq!(counter.stops, 1);
}

#[test]
fn stop_for_other_stream_is_not_applied() {
    let mut counter = CounterStream::new();
    let mut transport = MockTransport::new();
    transport.arrive_after(1, &stop_frame(1, CounterStream::UPLOAD));

    let frames = run_on(&mut counter, transport, "0501000104");
    assert_eq!(
        chunks(&frames),
        [(0, false), (1, false), (2, false), (3, true)]
    );
    assert_eq!(counter.stops, 0);
}

#[test]
fn stop_in_same_read_as_start() {
    let mut counter = CounterStream::new();
    let mut server: Server<'_, MockTransport, 2> = Server::new(MockTransport::new());
    server.register(&mut counter).unwrap();
    server
        .transport_mut()
        .inbound
        .extend(hex("0501000164 030100"));

    assert_eq!(server.poll(), Ok(8));
    let frames = server.into_transport().frames;
    assert_eq!(chunks(&frames), [(0, true)]);
    assert_eq!(counter.stops, 1);
}

/// Ticking stream whose control lives in a static, as the RX interrupt
/// needs it.
struct Ticker {
    control: &'static StreamControl,
    stops: usize,
}

impl Ticker {
    const ID: ServiceId = 2;

    fn tick(&mut self, r: &mut Reader<'_>, call: &mut Call<'_>) {
        let limit: u8 = r.decode();
        let mut i = 0u8;
        call.stream(self.control, |w| {
            w.encode(&i);
            i += 1;
            if i >= limit { Next::Last } else { Next::More }
        });
    }

    fn tick_stop(&mut self) {
        self.stops += 1;
        self.control.request_stop();
    }

    const TABLE: [Handler<Self>; 1] = [Handler::Stream {
        start: Self::tick,
        stop: Self::tick_stop,
    }];
}

impl Service for Ticker {
    fn id(&self) -> ServiceId {
        Self::ID
    }

    fn invoke(&mut self, r: &mut Reader<'_>, call: &mut Call<'_>) -> Result<(), DispatchError> {
        dispatch(self, &Self::TABLE, r, call)
    }
}

/// Write side of a UART whose RX bytes reach the firmware through an
/// interrupt-fed queue. `pending` is pushed into the queue, as the ISR
/// would, once `after` frames were written.
struct InterruptUart {
    frames: Vec<Vec<u8>>,
    after: usize,
    pending: Vec<u8>,
    queue: &'static RxQueue<64>,
}

impl Transport for InterruptUart {
    type Error = Infallible;

    fn read(&mut self, _buf: &mut [u8]) -> Result<usize, Infallible> {
        Ok(0)
    }

    fn write(&mut self, data: &[u8]) -> Result<usize, Infallible> {
        self.frames.push(data.to_vec());
        if self.frames.len() == self.after {
            self.queue.push_slice(&std::mem::take(&mut self.pending));
        }
        Ok(data.len())
    }

    fn flush(&mut self) -> Result<(), Infallible> {
        Ok(())
    }

    fn available(&self) -> bool {
        false
    }
}

#[test]
fn interrupt_queued_stop_ends_running_stream() {
    static RX: RxQueue<64> = RxQueue::new();
    static TICKS: StreamControl = StreamControl::new();
    assert!(RX.watch_stream(Ticker::ID, 0, &TICKS));

    let mut ticker = Ticker {
        control: &TICKS,
        stops: 0,
    };
    let uart = InterruptUart {
        frames: Vec::new(),
        after: 2,
        pending: stop_frame(Ticker::ID, 0).to_vec(),
        queue: &RX,
    };
    let mut server: Server<'_, InterruptUart, 4> = Server::new(uart);
    server.register(&mut ticker).unwrap();

    RX.push_slice(&hex("0502000164"));
    assert_eq!(RX.drain_into(&mut server), 8);
    assert!(RX.is_empty());

    let frames = server.into_transport().frames;
    assert_eq!(
        chunks_of(&frames, Ticker::ID),
        [(0, false), (1, false), (2, true)]
    );
    assert_eq!(TICKS.state(), StreamState::Stopped);
    assert_eq!(ticker.stops, 1);
}
