//! Body encoders shared by the client and the serving layer.

use std::fmt;
use std::io::{BufReader, Read, Write};

use serde::{de::DeserializeOwned, Serialize};

pub const JSON_CONTENT_TYPE: &str = "application/json";
pub const XML_CONTENT_TYPE: &str = "application/xml";

#[derive(Debug, thiserror::Error)]
pub enum FormatError {
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("xml: {0}")]
    Xml(String),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Custom(String),
}

impl FormatError {
    pub fn custom(message: impl fmt::Display) -> Self {
        Self::Custom(message.to_string())
    }
}

/// Serializes request bodies and deserializes response bodies.
pub trait Encoder: fmt::Debug + Send + Sync + 'static {
    /// Value for the `Content-Type` header of encoded bodies.
    fn content_type(&self) -> &str;

    /// Value for the `Accept` header.
    fn accept(&self) -> &str;

    fn encode_into<W, T>(&self, writer: W, value: &T) -> Result<(), FormatError>
    where
        W: Write,
        T: Serialize + ?Sized;

    fn decode<R, T>(&self, reader: R) -> Result<T, FormatError>
    where
        R: Read,
        T: DeserializeOwned;

    fn encode<T>(&self, value: &T) -> Result<Vec<u8>, FormatError>
    where
        T: Serialize + ?Sized,
    {
        let mut buf = Vec::new();
        self.encode_into(&mut buf, value)?;
        Ok(buf)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Json;

impl Encoder for Json {
    fn content_type(&self) -> &str {
        JSON_CONTENT_TYPE
    }

    fn accept(&self) -> &str {
        JSON_CONTENT_TYPE
    }

    fn encode_into<W, T>(&self, writer: W, value: &T) -> Result<(), FormatError>
    where
        W: Write,
        T: Serialize + ?Sized,
    {
        serde_json::to_writer(writer, value)?;
        Ok(())
    }

    fn decode<R, T>(&self, reader: R) -> Result<T, FormatError>
    where
        R: Read,
        T: DeserializeOwned,
    {
        Ok(serde_json::from_reader(reader)?)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Xml;

impl Encoder for Xml {
    fn content_type(&self) -> &str {
        XML_CONTENT_TYPE
    }

    fn accept(&self) -> &str {
        XML_CONTENT_TYPE
    }

    fn encode_into<W, T>(&self, mut writer: W, value: &T) -> Result<(), FormatError>
    where
        W: Write,
        T: Serialize + ?Sized,
    {
        let encoded = match quick_xml::se::to_string(value) {
            Ok(encoded) => encoded,
            // unit and `None` have no root element and encode to an empty body
            Err(_) if is_absent(value) => return Ok(()),
            Err(err) => return Err(FormatError::Xml(err.to_string())),
        };
        writer.write_all(encoded.as_bytes())?;
        Ok(())
    }

    fn decode<R, T>(&self, reader: R) -> Result<T, FormatError>
    where
        R: Read,
        T: DeserializeOwned,
    {
        quick_xml::de::from_reader(BufReader::new(reader))
            .map_err(|err| FormatError::Xml(err.to_string()))
    }
}

fn is_absent<T: Serialize + ?Sized>(value: &T) -> bool {
    serde_json::to_value(value).is_ok_and(|value| value.is_null())
}

/// Runtime-selectable format, used where the encoder is swapped while running.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Format {
    #[default]
    Json,
    Xml,
}

impl Encoder for Format {
    fn content_type(&self) -> &str {
        match self {
            Self::Json => JSON_CONTENT_TYPE,
            Self::Xml => XML_CONTENT_TYPE,
        }
    }

    fn accept(&self) -> &str {
        self.content_type()
    }

    fn encode_into<W, T>(&self, writer: W, value: &T) -> Result<(), FormatError>
    where
        W: Write,
        T: Serialize + ?Sized,
    {
        match self {
            Self::Json => Json.encode_into(writer, value),
            Self::Xml => Xml.encode_into(writer, value),
        }
    }

    fn decode<R, T>(&self, reader: R) -> Result<T, FormatError>
    where
        R: Read,
        T: DeserializeOwned,
    {
        match self {
            Self::Json => Json.decode(reader),
            Self::Xml => Xml.decode(reader),
        }
    }
}
