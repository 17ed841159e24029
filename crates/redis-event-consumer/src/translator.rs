//! Raw message to command translation.

use crate::channel::Channel;
use allocation::Command;
use thiserror::Error;

/// Result of translating a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Translation {
    /// The channel is bound and the payload produced a command.
    Command(Command),
    /// No binding exists for the channel. Callers drop the message.
    Unbound,
}

/// A bound channel carried a payload missing a required field or with a
/// field of the wrong type.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Malformed message on channel '{channel}': {reason}")]
pub struct MalformedMessage {
    pub channel: Channel,
    pub payload: Vec<u8>,
    pub reason: String,
}

impl MalformedMessage {
    /// Payload as text for diagnostics.
    pub fn payload_text(&self) -> String {
        String::from_utf8_lossy(&self.payload).into_owned()
    }
}

/// Translate a message received on `channel` into a command.
pub fn translate(channel: &str, payload: &[u8]) -> Result<Translation, MalformedMessage> {
    let Some(bound) = Channel::from_name(channel) else {
        return Ok(Translation::Unbound);
    };

    bound
        .bind(payload)
        .map(Translation::Command)
        .map_err(|e| MalformedMessage {
            channel: bound,
            payload: payload.to_vec(),
            reason: e.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use allocation::Allocate;

    #[test]
    fn translates_bound_channel() {
        let translation = translate("allocate", br#"{"orderid":"o1","sku":"S1","qty":10}"#).unwrap();
        assert_eq!(
            translation,
            Translation::Command(Command::Allocate(Allocate {
                orderid: "o1".to_string(),
                sku: "S1".to_string(),
                qty: 10,
            }))
        );
    }

    #[test]
    fn unbound_channel_is_not_an_error() {
        assert_eq!(
            translate("line_allocated", br#"{"orderid":"o1"}"#),
            Ok(Translation::Unbound)
        );
        assert_eq!(translate("unknown", b"not even json"), Ok(Translation::Unbound));
    }

    #[test]
    fn missing_field_is_malformed_with_diagnostics() {
        let payload = br#"{"orderid":"o1","sku":"S1"}"#;
        let err = translate("allocate", payload).unwrap_err();

        assert_eq!(err.channel, Channel::Allocate);
        assert_eq!(err.payload, payload.to_vec());
        assert!(err.reason.contains("qty"), "reason was {}", err.reason);
        assert_eq!(err.payload_text(), r#"{"orderid":"o1","sku":"S1"}"#);
    }

    #[test]
    fn invalid_json_is_malformed() {
        let err = translate("change_batch_quantity", b"batchref=b1").unwrap_err();
        assert_eq!(err.channel, Channel::ChangeBatchQuantity);
        assert!(err.to_string().starts_with("Malformed message on channel 'change_batch_quantity'"));
    }
}
