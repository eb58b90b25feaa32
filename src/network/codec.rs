//! One JSON document per datagram.

use super::TransportError;
use crate::raft::Message;

/// Largest payload a single UDP datagram can carry over IPv4.
pub const MAX_DATAGRAM_SIZE: usize = 65_507;

pub fn encode(message: &Message) -> Result<Vec<u8>, TransportError> {
    let bytes = serde_json::to_vec(message)?;
    if bytes.len() > MAX_DATAGRAM_SIZE {
        return Err(TransportError::DatagramTooLarge(bytes.len()));
    }
    Ok(bytes)
}

pub fn decode(bytes: &[u8]) -> Result<Message, TransportError> {
    Ok(serde_json::from_slice(bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_reads_what_encode_writes() {
        let msg = Message::vote_response(7, "n3", false);
        let bytes = encode(&msg).expect("encode");
        assert_eq!(decode(&bytes).expect("decode"), msg);
    }

    #[test]
    fn oversized_values_are_refused() {
        let value = "v".repeat(MAX_DATAGRAM_SIZE);
        let msg = Message::replicate_entry(1, "n1", "k", &value);
        assert!(matches!(
            encode(&msg),
            Err(TransportError::DatagramTooLarge(_))
        ));
    }

    #[test]
    fn garbage_is_a_codec_error() {
        assert!(matches!(
            decode(b"\x00\x01not json"),
            Err(TransportError::Codec(_))
        ));
    }
}
