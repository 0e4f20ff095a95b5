//! Fuzz target: `Server::receive_bytes`
//!
//! Arbitrary bytes go into a server with one registered service. The
//! server must never panic and every frame it writes must be
//! length-prefixed.
//!
//! cargo fuzz run fuzz_server_receive

#![no_main]

use libfuzzer_sys::fuzz_target;
use lrpc::rpc::cursor::{Reader, Writer};
use lrpc::rpc::server::Server;
use lrpc::rpc::service::{Call, DispatchError, Handler, Service, ServiceId, dispatch};
use lrpc::rpc::stream::{Next, StreamControl};
use lrpc::rpc::transport::Transport;
use lrpc::rpc::wire::{StrN, read_bytearray, write_bytearray};

struct Checked;

impl Transport for Checked {
    type Error = core::convert::Infallible;

    fn read(&mut self, _buf: &mut [u8]) -> Result<usize, Self::Error> {
        Ok(0)
    }

    fn write(&mut self, data: &[u8]) -> Result<usize, Self::Error> {
        assert!(data.len() >= 3);
        assert_eq!(data[0] as usize, data.len());
        Ok(data.len())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    fn available(&self) -> bool {
        false
    }
}

struct Target {
    control: StreamControl,
}

impl Target {
    fn echo(&mut self, r: &mut Reader<'_>, w: &mut Writer<'_>) {
        let data = read_bytearray(r);
        write_bytearray(w, data);
    }

    fn mixed(&mut self, r: &mut Reader<'_>, w: &mut Writer<'_>) {
        let value: (u16, StrN<'_, 6>, Option<&str>, [i32; 2]) = r.decode();
        w.encode(&value);
    }

    fn ticks(&mut self, r: &mut Reader<'_>, call: &mut Call<'_>) {
        let limit: u8 = r.decode();
        let mut n = 0u8;
        call.stream(&self.control, |w| {
            w.encode(&n);
            n = n.wrapping_add(1);
            if n >= limit { Next::Last } else { Next::More }
        });
    }

    fn ticks_stop(&mut self) {
        self.control.request_stop();
    }

    const TABLE: [Handler<Self>; 4] = [
        Handler::Function(Self::echo),
        Handler::Missing,
        Handler::Function(Self::mixed),
        Handler::Stream {
            start: Self::ticks,
            stop: Self::ticks_stop,
        },
    ];
}

impl Service for Target {
    fn id(&self) -> ServiceId {
        1
    }

    fn invoke(&mut self, r: &mut Reader<'_>, call: &mut Call<'_>) -> Result<(), DispatchError> {
        dispatch(self, &Self::TABLE, r, call)
    }
}

fuzz_target!(|data: &[u8]| {
    let mut target = Target {
        control: StreamControl::new(),
    };
    let mut server: Server<'_, Checked, 2> = Server::new(Checked);
    if server.register(&mut target).is_err() {
        return;
    }
    server.receive_bytes(data);
});
