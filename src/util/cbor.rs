use std::io::BufRead;

/// Check whether a CBOR record stream has ended cleanly, i.e. no bytes are
/// left before the next record. Running out of bytes inside a record is left
/// for the decoder to report as an error.
pub fn at_record_boundary_eof<R: BufRead>(reader: &mut R) -> std::io::Result<bool> {
    Ok(reader.fill_buf()?.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_is_eof() {
        assert!(at_record_boundary_eof(&mut &b""[..]).unwrap());
    }

    #[test]
    fn pending_bytes_are_not_eof() {
        let mut bytes = Vec::new();
        ciborium::into_writer(&7u64, &mut bytes).unwrap();
        let mut reader = &bytes[..];
        assert!(!at_record_boundary_eof(&mut reader).unwrap());
        let value: u64 = ciborium::from_reader(&mut reader).unwrap();
        assert_eq!(value, 7);
        assert!(at_record_boundary_eof(&mut reader).unwrap());
    }
}
