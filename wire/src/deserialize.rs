use std::io;

/// Decoding of one received frame body.
///
/// Implementors may borrow from `buf`, which is why the receiver ties
/// the returned value to its internal buffer.
pub trait Deserialize<'a>: Sized {
    /// Decodes the frame body, `InvalidData` on a malformed one.
    fn deserialize(buf: &'a [u8]) -> io::Result<Self>;
}
