use thiserror::Error;

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Codec error: {0}")]
    Codec(#[from] serde_json::Error),

    #[error("Unknown peer: {0}")]
    UnknownPeer(String),

    #[error("Peer unreachable: {0}")]
    Unreachable(String),

    #[error("Datagram too large: {0} bytes")]
    DatagramTooLarge(usize),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_error_kind() {
        let unknown = TransportError::UnknownPeer("n9".to_string());
        assert!(format!("{unknown}").contains("Unknown peer: n9"));

        let big = TransportError::DatagramTooLarge(70_000);
        assert!(format!("{big}").contains("70000"));
    }

    #[test]
    fn from_serde_error_maps_to_codec() {
        let err = serde_json::from_str::<u64>("nope").unwrap_err();
        let err: TransportError = err.into();
        assert!(matches!(err, TransportError::Codec(_)));
    }
}
