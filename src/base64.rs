use ::base64::{
    engine::{general_purpose::STANDARD, Engine},
    DecodeError,
};

pub(crate) fn encode<T: AsRef<[u8]>>(input: T) -> String {
    STANDARD.encode(input)
}

pub(crate) fn decode<T: AsRef<[u8]>>(input: T) -> Result<Vec<u8>, DecodeError> {
    STANDARD.decode(input)
}

/// Encodes a MIME part payload, wrapping lines at 76 characters
pub(crate) fn encode_wrapped(input: &[u8]) -> String {
    let mut out = String::with_capacity(email_encoding::body::base64::encoded_len(input.len()));
    email_encoding::body::base64::encode(input, &mut out)
        .expect("writing to a String never fails");
    out
}
