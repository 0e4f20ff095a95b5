//! Wire value codec.
//!
//! Every value that crosses the wire has one of a small, closed set of
//! shapes. Each shape has independent read and write rules:
//!
//! ```text
//! ┌──────────────────┬──────────────────────────────────────────────────┐
//! │ Shape            │ Encoding                                         │
//! ├──────────────────┼──────────────────────────────────────────────────┤
//! │ arithmetic       │ fixed width, little endian; bool = 0/1 byte      │
//! │ enum             │ one byte discriminant                            │
//! │ optional<T>      │ bool tag, then T iff the tag is set              │
//! │ array<T, N>      │ N consecutive T                                  │
//! │ auto string      │ bytes + '\0'                                     │
//! │ string<N>        │ bytes, '\0' padding to N, final '\0' (N+1 bytes) │
//! │ bytearray        │ u8 length + bytes                                │
//! │ tuple / struct   │ members back to back, declaration order          │
//! └──────────────────┴──────────────────────────────────────────────────┘
//! ```
//!
//! Encoding and decoding are total: over-long values are truncated,
//! missing values are padded, malformed input decodes to something
//! bounded. Nothing here returns an error or panics.

use super::cursor::{Reader, Writer};

/// Append a value to a response.
pub trait Encode {
    fn encode(&self, w: &mut Writer<'_>);
}

/// Consume a value from a request. Borrowed shapes (strings, bytearrays)
/// point into the request buffer.
pub trait Decode<'a>: Sized {
    fn decode(r: &mut Reader<'a>) -> Self;
}

impl<T: Encode + ?Sized> Encode for &T {
    fn encode(&self, w: &mut Writer<'_>) {
        (**self).encode(w);
    }
}

// ── Arithmetic ───────────────────────────────────────────────

macro_rules! arithmetic {
    ($($t:ty),* $(,)?) => {$(
        impl Encode for $t {
            fn encode(&self, w: &mut Writer<'_>) {
                w.write_bytes(&self.to_le_bytes());
            }
        }

        impl<'a> Decode<'a> for $t {
            fn decode(r: &mut Reader<'a>) -> Self {
                <$t>::from_le_bytes(r.read_array())
            }
        }
    )*};
}

arithmetic!(u8, u16, u32, u64, i8, i16, i32, i64, f32, f64);

impl Encode for bool {
    fn encode(&self, w: &mut Writer<'_>) {
        w.write_u8(u8::from(*self));
    }
}

impl<'a> Decode<'a> for bool {
    fn decode(r: &mut Reader<'a>) -> Self {
        r.read_u8() != 0
    }
}

// ── Optional ─────────────────────────────────────────────────

impl<T: Encode> Encode for Option<T> {
    fn encode(&self, w: &mut Writer<'_>) {
        match self {
            Some(v) => {
                true.encode(w);
                v.encode(w);
            }
            None => false.encode(w),
        }
    }
}

impl<'a, T: Decode<'a>> Decode<'a> for Option<T> {
    fn decode(r: &mut Reader<'a>) -> Self {
        if bool::decode(r) {
            Some(T::decode(r))
        } else {
            None
        }
    }
}

// ── Fixed-count arrays ───────────────────────────────────────

impl<T: Encode, const N: usize> Encode for [T; N] {
    fn encode(&self, w: &mut Writer<'_>) {
        for v in self {
            v.encode(w);
        }
    }
}

impl<'a, T: Decode<'a>, const N: usize> Decode<'a> for [T; N] {
    fn decode(r: &mut Reader<'a>) -> Self {
        core::array::from_fn(|_| T::decode(r))
    }
}

/// Read an `array<T, count>` into a destination of arbitrary capacity.
///
/// Elements that do not fit `dest` are decoded and discarded so the
/// cursor always ends up behind the whole array.
pub fn read_array_into<'a, T: Decode<'a>>(r: &mut Reader<'a>, dest: &mut [T], count: usize) {
    let n = dest.len().min(count);
    for slot in &mut dest[..n] {
        *slot = T::decode(r);
    }
    for _ in n..count {
        let _ = T::decode(r);
    }
}

/// Write `values` as an `array<T, count>`: extra values are dropped,
/// missing ones are written as `T::default()`.
pub fn write_array<T: Encode + Default>(w: &mut Writer<'_>, values: &[T], count: usize) {
    for v in values.iter().take(count) {
        v.encode(w);
    }
    for _ in values.len().min(count)..count {
        T::default().encode(w);
    }
}

// ── Strings ──────────────────────────────────────────────────

/// Longest valid UTF-8 prefix of `bytes`.
fn utf8_prefix(bytes: &[u8]) -> &str {
    match core::str::from_utf8(bytes) {
        Ok(s) => s,
        Err(e) => core::str::from_utf8(&bytes[..e.valid_up_to()]).unwrap_or(""),
    }
}

/// Read an auto string: everything up to the first `'\0'`, which is
/// consumed too. Without a terminator the rest of the buffer is the string.
pub fn read_auto_string<'a>(r: &mut Reader<'a>) -> &'a str {
    let rest = r.remaining();
    match rest.iter().position(|&b| b == 0) {
        Some(end) => {
            r.skip(end + 1);
            utf8_prefix(&rest[..end])
        }
        None => {
            r.skip(rest.len());
            utf8_prefix(rest)
        }
    }
}

pub fn write_auto_string(w: &mut Writer<'_>, s: &str) {
    w.write_bytes(s.as_bytes());
    w.write_u8(0);
}

/// Read a `string<N>`: the auto string rule capped to `n` bytes.
///
/// The cursor moves past the terminator, or past `n` bytes when none is
/// found. Padding left in the `n + 1` byte slot a writer fills is
/// skipped as well, so both padded and unpadded senders decode. A value
/// following an unpadded string must not start with `'\0'` inside that
/// slot.
pub fn read_fixed_string<'a>(r: &mut Reader<'a>, n: usize) -> &'a str {
    let rest = r.remaining();
    let (len, consumed) = match rest.iter().position(|&b| b == 0) {
        Some(end) => (end.min(n), end.min(n) + 1),
        None => {
            let len = rest.len().min(n);
            (len, len)
        }
    };
    let slot_end = (n + 1).min(rest.len());
    let padding = rest
        .get(consumed..slot_end)
        .map_or(0, |tail| tail.iter().take_while(|&&b| b == 0).count());
    r.skip(consumed + padding);
    utf8_prefix(&rest[..len])
}

/// Write a `string<N>`: at most `n` bytes of `s`, `'\0'` padding up to
/// `n`, then the final terminator.
pub fn write_fixed_string(w: &mut Writer<'_>, s: &str, n: usize) {
    let written = w.write_bytes(&s.as_bytes()[..s.len().min(n)]);
    w.write_zeros(n - written.min(n));
    w.write_u8(0);
}

impl Encode for str {
    fn encode(&self, w: &mut Writer<'_>) {
        write_auto_string(w, self);
    }
}

impl<'a> Decode<'a> for &'a str {
    fn decode(r: &mut Reader<'a>) -> Self {
        read_auto_string(r)
    }
}

/// Borrowed fixed-size string, `string<N>` on the wire.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StrN<'a, const N: usize>(pub &'a str);

impl<const N: usize> Encode for StrN<'_, N> {
    fn encode(&self, w: &mut Writer<'_>) {
        write_fixed_string(w, self.0, N);
    }
}

impl<'a, const N: usize> Decode<'a> for StrN<'a, N> {
    fn decode(r: &mut Reader<'a>) -> Self {
        Self(read_fixed_string(r, N))
    }
}

/// Owned fixed-size string, `string<N>` on the wire.
impl<const N: usize> Encode for heapless::String<N> {
    fn encode(&self, w: &mut Writer<'_>) {
        write_fixed_string(w, self.as_str(), N);
    }
}

impl<'a, const N: usize> Decode<'a> for heapless::String<N> {
    fn decode(r: &mut Reader<'a>) -> Self {
        let mut s = heapless::String::new();
        // Cannot fail: the decoded content is capped to N bytes.
        let _ = s.push_str(read_fixed_string(r, N));
        s
    }
}

// ── Bytearray ────────────────────────────────────────────────

/// Largest payload a bytearray length prefix can describe.
pub const MAX_BYTEARRAY_LEN: usize = u8::MAX as usize;

/// Read a bytearray. The declared length is capped to what is left in
/// the buffer.
pub fn read_bytearray<'a>(r: &mut Reader<'a>) -> &'a [u8] {
    let len = r.read_u8() as usize;
    r.take(len)
}

/// Write a bytearray. The length byte is capped to the space left after
/// it, and the payload is truncated to match.
pub fn write_bytearray(w: &mut Writer<'_>, data: &[u8]) {
    let room = w.available().saturating_sub(1);
    let len = data.len().min(MAX_BYTEARRAY_LEN).min(room);
    w.write_u8(len as u8);
    w.write_bytes(&data[..len]);
}

impl Encode for [u8] {
    fn encode(&self, w: &mut Writer<'_>) {
        write_bytearray(w, self);
    }
}

impl<'a> Decode<'a> for &'a [u8] {
    fn decode(r: &mut Reader<'a>) -> Self {
        read_bytearray(r)
    }
}

/// Owned bytearray, truncated to the vector capacity on decode.
impl<const N: usize> Encode for heapless::Vec<u8, N> {
    fn encode(&self, w: &mut Writer<'_>) {
        write_bytearray(w, self.as_slice());
    }
}

impl<'a, const N: usize> Decode<'a> for heapless::Vec<u8, N> {
    fn decode(r: &mut Reader<'a>) -> Self {
        let data = read_bytearray(r);
        let mut v = heapless::Vec::new();
        let _ = v.extend_from_slice(&data[..data.len().min(N)]);
        v
    }
}

// ── Tuples ───────────────────────────────────────────────────

impl Encode for () {
    fn encode(&self, _w: &mut Writer<'_>) {}
}

impl<'a> Decode<'a> for () {
    fn decode(_r: &mut Reader<'a>) -> Self {}
}

macro_rules! tuple {
    ($($name:ident),+) => {
        impl<$($name: Encode),+> Encode for ($($name,)+) {
            #[allow(non_snake_case)]
            fn encode(&self, w: &mut Writer<'_>) {
                let ($($name,)+) = self;
                $($name.encode(w);)+
            }
        }

        impl<'a, $($name: Decode<'a>),+> Decode<'a> for ($($name,)+) {
            fn decode(r: &mut Reader<'a>) -> Self {
                ($($name::decode(r),)+)
            }
        }
    };
}

tuple!(A);
tuple!(A, B);
tuple!(A, B, C);
tuple!(A, B, C, D);
tuple!(A, B, C, D, E);
tuple!(A, B, C, D, E, F);

// ── Enums and structs ────────────────────────────────────────

/// Declare a one-byte wire enum.
///
/// Unknown discriminants decode to the first variant (logged at `warn`).
///
/// ```
/// lrpc::wire_enum! {
///     pub enum DoorState { Open = 0, Closed = 1 }
/// }
/// ```
#[macro_export]
macro_rules! wire_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $(#[$first_meta:meta])* $first:ident = $first_val:literal
            $(, $(#[$vmeta:meta])* $variant:ident = $val:literal)* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
        #[repr(u8)]
        $vis enum $name {
            $(#[$first_meta])*
            #[default]
            $first = $first_val,
            $($(#[$vmeta])* $variant = $val,)*
        }

        impl $crate::rpc::wire::Encode for $name {
            fn encode(&self, w: &mut $crate::rpc::cursor::Writer<'_>) {
                w.write_u8(*self as u8);
            }
        }

        impl<'a> $crate::rpc::wire::Decode<'a> for $name {
            fn decode(r: &mut $crate::rpc::cursor::Reader<'a>) -> Self {
                match r.read_u8() {
                    $first_val => Self::$first,
                    $($val => Self::$variant,)*
                    other => {
                        $crate::__log::warn!(
                            "wire: invalid {} discriminant {}",
                            stringify!($name),
                            other
                        );
                        Self::$first
                    }
                }
            }
        }
    };
}

/// Declare a composite (struct) wire type. Fields are encoded in
/// declaration order; all field types must be owned.
///
/// ```
/// lrpc::wire_struct! {
///     #[derive(Debug, Default, PartialEq)]
///     pub struct Sample { pub channel: u8, pub values: [u16; 2] }
/// }
/// ```
#[macro_export]
macro_rules! wire_struct {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $($(#[$fmeta:meta])* $fvis:vis $field:ident : $ty:ty),* $(,)?
        }
    ) => {
        $(#[$meta])*
        $vis struct $name {
            $($(#[$fmeta])* $fvis $field: $ty,)*
        }

        impl $crate::rpc::wire::Encode for $name {
            fn encode(&self, w: &mut $crate::rpc::cursor::Writer<'_>) {
                $($crate::rpc::wire::Encode::encode(&self.$field, w);)*
            }
        }

        impl<'a> $crate::rpc::wire::Decode<'a> for $name {
            fn decode(r: &mut $crate::rpc::cursor::Reader<'a>) -> Self {
                Self {
                    $($field: <$ty as $crate::rpc::wire::Decode<'a>>::decode(r),)*
                }
            }
        }
    };
}
