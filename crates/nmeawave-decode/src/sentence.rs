use serde::{Deserialize, Serialize};
use std::fmt;

/// Length of a conventional header field: two talker characters plus three type characters.
const HEADER_LEN: usize = 5;

/// A validated payload split into its comma-delimited fields.
///
/// No sentence-specific semantics are applied. `kind` is only derived when the
/// header field has the `<talker><type>` shape, in which case the sentence is
/// marked valid.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sentence {
    pub kind: String,
    pub data: Vec<String>,
    pub count: usize,
    pub valid: bool,
}

impl Sentence {
    /// Decodes a payload (the bytes between `$` and `*`). Never fails; an
    /// empty payload yields one empty field and an invalid sentence.
    pub fn decode(payload: &str) -> Self {
        let data: Vec<String> = payload.split(',').map(str::to_owned).collect();
        let count = data.len();

        let (kind, valid) = match data.first() {
            Some(header) if header.chars().count() == HEADER_LEN => {
                (header.chars().skip(2).collect(), true)
            }
            _ => (String::new(), false),
        };

        Self {
            kind,
            data,
            count,
            valid,
        }
    }

    /// The first field, e.g. `GPGGA`.
    pub fn header(&self) -> &str {
        self.data.first().map(String::as_str).unwrap_or("")
    }

    /// Every field after the header.
    pub fn fields(&self) -> &[String] {
        self.data.get(1..).unwrap_or(&[])
    }

    /// Rejoins the fields into the payload the sentence was decoded from.
    pub fn payload(&self) -> String {
        self.data.join(",")
    }
}

impl From<&str> for Sentence {
    fn from(payload: &str) -> Self {
        Self::decode(payload)
    }
}

impl fmt::Display for Sentence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&crate::frame(&self.payload()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn five_char_header_is_valid() {
        let s = Sentence::decode("GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,");
        assert!(s.valid);
        assert_eq!(s.kind, "GGA");
        assert_eq!(s.count, 15);
        assert_eq!(s.header(), "GPGGA");
        assert_eq!(s.fields()[0], "123519");
        assert_eq!(s.data.last().map(String::as_str), Some(""));
    }

    #[test]
    fn short_header_is_invalid() {
        let s = Sentence::decode("PGGA,123519,4807.03000,E,1,08,0.9,545.4,M,46.9,M,,");
        assert!(!s.valid);
        assert!(s.kind.is_empty());
        assert_eq!(s.header(), "PGGA");
    }

    #[test]
    fn long_header_is_invalid() {
        let s = Sentence::decode("PMTK001,604,3");
        assert!(!s.valid);
        assert!(s.kind.is_empty());
        assert_eq!(s.count, 3);
    }

    #[test]
    fn empty_payload_decodes() {
        let s = Sentence::decode("");
        assert!(!s.valid);
        assert_eq!(s.data, vec![String::new()]);
        assert_eq!(s.count, 1);
        assert!(s.fields().is_empty());
    }

    #[test]
    fn fields_keep_order() {
        let s = Sentence::from("GPGSA,A,3,04,05,,09");
        assert_eq!(s.kind, "GSA");
        assert_eq!(s.data, ["GPGSA", "A", "3", "04", "05", "", "09"]);
        assert_eq!(s.payload(), "GPGSA,A,3,04,05,,09");
    }

    #[test]
    fn display_renders_frame() {
        let s = Sentence::decode("Ja");
        assert_eq!(s.to_string(), "$Ja*2B");
    }

    #[test]
    fn serializes_as_flat_record() {
        let s = Sentence::decode("GPGLL,1,N");
        let json = serde_json::to_string(&s).unwrap();
        assert_eq!(
            json,
            r#"{"kind":"GLL","data":["GPGLL","1","N"],"count":3,"valid":true}"#
        );
        let back: Sentence = serde_json::from_str(&json).unwrap();
        assert_eq!(back, s);
    }
}
