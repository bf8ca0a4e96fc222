pub trait Serialize<'a> {
    /// Writes the header and any control bytes into `buf` and optionally
    /// returns a trailing byte slice to be sent without copying.
    fn serialize(&'a self, buf: &mut Vec<u8>) -> Option<&'a [u8]>;
}
