use encoding_rs::{UTF_8, WINDOWS_1252};

use crate::Error;

/// How validated payload bytes become a payload string.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PayloadEncoding {
    /// UTF-8, invalid sequences replaced with U+FFFD.
    #[default]
    Utf8,
    /// 7-bit ASCII, high bytes replaced with `?`.
    Ascii,
    /// ISO-8859-1: every byte is the code point of the same value.
    Latin1,
    /// Windows-1252, the Latin-1 superset most PC software actually emits.
    Windows1252,
}

impl std::str::FromStr for PayloadEncoding {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_ascii_uppercase().as_str() {
            "UTF-8" | "UTF8" => Self::Utf8,
            "ASCII" => Self::Ascii,
            "LATIN1" | "LATIN-1" | "ISO-8859-1" => Self::Latin1,
            "WINDOWS-1252" | "CP1252" => Self::Windows1252,
            _ => {
                return Err(Error::InvalidOption {
                    name: "encoding",
                    value: s.to_string(),
                })
            }
        })
    }
}

impl PayloadEncoding {
    pub fn decode(&self, bytes: &[u8]) -> String {
        match self {
            Self::Utf8 => UTF_8.decode_without_bom_handling(bytes).0.into_owned(),
            Self::Ascii => bytes.iter().map(|&b| if b < 128 { b as char } else { '?' }).collect(),
            Self::Latin1 => bytes.iter().map(|&b| b as char).collect(),
            Self::Windows1252 => WINDOWS_1252.decode_without_bom_handling(bytes).0.into_owned(),
        }
    }
}
