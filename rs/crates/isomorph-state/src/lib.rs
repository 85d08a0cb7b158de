//! isomorph-state — the state codec shared by server and client
//!
//! A view state is written as MessagePack with named fields, inside an
//! envelope that also records the state's shape (struct name and field
//! order). The client decodes against its own idea of that shape and refuses
//! the payload if the two disagree, instead of hydrating with garbage.
//!
//! For embedding in HTML the bytes are base64-armored (standard alphabet,
//! padded).

use std::fmt;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::de::{self, DeserializeOwned, IgnoredAny, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use tracing::debug;

/// Anything that can travel from server to client as view state.
pub trait ViewState: Serialize + DeserializeOwned {}

impl<T: Serialize + DeserializeOwned> ViewState for T {}

/// Structural metadata written ahead of the state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shape {
    pub name: String,
    pub fields: Vec<String>,
}

impl Shape {
    /// Shape of `S` as serde sees it. Non-struct states have an empty shape.
    pub fn of<S: DeserializeOwned>() -> Self {
        let mut shape = Shape::default();
        // The probe always errors out; all we want is what it recorded.
        let _ = S::deserialize(Probe(&mut shape));
        shape
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {{ {} }}", self.name, self.fields.join(", "))
    }
}

#[derive(Debug, thiserror::Error)]
#[error("failed to encode state: {0}")]
pub struct EncodeError(#[from] rmp_serde::encode::Error);

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("state shape mismatch: {0}")]
    ShapeMismatch(String),
    #[error("state payload is truncated")]
    Truncated,
    #[error("state payload is not base64: {0}")]
    Armor(#[source] base64::DecodeError),
}

#[derive(Serialize)]
struct EnvelopeRef<'a, S> {
    shape: &'a Shape,
    state: &'a S,
}

#[derive(Deserialize)]
struct EnvelopeHead {
    shape: Shape,
    #[serde(rename = "state")]
    _state: IgnoredAny,
}

#[derive(Deserialize)]
struct Envelope<S> {
    state: S,
}

/// Encode a state value to bytes.
pub fn encode<S: ViewState>(state: &S) -> Result<Vec<u8>, EncodeError> {
    let shape = Shape::of::<S>();
    let bytes = rmp_serde::to_vec_named(&EnvelopeRef { shape: &shape, state })?;
    debug!(shape = %shape, bytes = bytes.len(), "encoded state");
    Ok(bytes)
}

/// Decode bytes produced by [`encode`] into `S`.
pub fn decode<S: ViewState>(bytes: &[u8]) -> Result<S, DecodeError> {
    let expected = Shape::of::<S>();
    let head: EnvelopeHead = rmp_serde::from_slice(bytes).map_err(classify)?;
    if head.shape != expected {
        return Err(DecodeError::ShapeMismatch(format!(
            "expected {}, found {}",
            expected, head.shape
        )));
    }
    let envelope: Envelope<S> = rmp_serde::from_slice(bytes).map_err(classify)?;
    Ok(envelope.state)
}

/// Encode and base64-armor a state value for embedding in markup.
pub fn encode_armored<S: ViewState>(state: &S) -> Result<String, EncodeError> {
    Ok(STANDARD.encode(encode(state)?))
}

/// Decode an armored payload. Surrounding whitespace is ignored.
pub fn decode_armored<S: ViewState>(text: &str) -> Result<S, DecodeError> {
    let bytes = STANDARD.decode(text.trim()).map_err(|e| match e {
        base64::DecodeError::InvalidByte(..) => DecodeError::Armor(e),
        // Bad length, padding or final symbol: the text was cut short.
        _ => DecodeError::Truncated,
    })?;
    decode(&bytes)
}

fn classify(err: rmp_serde::decode::Error) -> DecodeError {
    use rmp_serde::decode::Error;
    match &err {
        Error::InvalidMarkerRead(io) | Error::InvalidDataRead(io) if io.kind() == std::io::ErrorKind::UnexpectedEof => {
            DecodeError::Truncated
        }
        _ => DecodeError::ShapeMismatch(err.to_string()),
    }
}

/// Deserializer that records the struct name and field list it is asked for.
struct Probe<'a>(&'a mut Shape);

impl<'de, 'a> Deserializer<'de> for Probe<'a> {
    type Error = de::value::Error;

    fn deserialize_any<V: Visitor<'de>>(self, _visitor: V) -> Result<V::Value, Self::Error> {
        Err(de::Error::custom("not a struct"))
    }

    fn deserialize_struct<V: Visitor<'de>>(
        self,
        name: &'static str,
        fields: &'static [&'static str],
        _visitor: V,
    ) -> Result<V::Value, Self::Error> {
        self.0.name = name.to_string();
        self.0.fields = fields.iter().map(|f| f.to_string()).collect();
        Err(de::Error::custom("shape recorded"))
    }

    serde::forward_to_deserialize_any! {
        bool i8 i16 i32 i64 i128 u8 u16 u32 u64 u128 f32 f64 char str string
        bytes byte_buf option unit unit_struct newtype_struct seq tuple
        tuple_struct map enum identifier ignored_any
    }
}
