//! Track ids and the hint document a producer republishes to announce
//! its live tracks.

use crate::*;
use std::sync::Arc;

/// Identifies one track of a producer.
///
/// Producers typically number their tracks, the id is kept in its string
/// form since it is only ever used as a name component and a map key.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TrackId(Arc<str>);

impl TrackId {
    /// Construct a track id.
    pub fn new(id: impl std::fmt::Display) -> Self {
        Self(id.to_string().into_boxed_str().into())
    }

    /// Get the string form of this id.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Read a track id from a name component.
    pub fn from_component(c: &NameComponent) -> Option<Self> {
        c.as_str().map(Self::new)
    }
}

impl std::fmt::Display for TrackId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::fmt::Debug for TrackId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "TrackId({})", &self.0)
    }
}

impl From<&TrackId> for NameComponent {
    fn from(id: &TrackId) -> Self {
        NameComponent::from(id.as_str())
    }
}

impl serde::Serialize for TrackId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> serde::Deserialize<'de> for TrackId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct V;

        impl serde::de::Visitor<'_> for V {
            type Value = TrackId;

            fn expecting(
                &self,
                f: &mut std::fmt::Formatter,
            ) -> std::fmt::Result {
                f.write_str("a track id as a string or an integer")
            }

            fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                Ok(TrackId::new(v))
            }

            fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                Ok(TrackId::new(v))
            }

            fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                Ok(TrackId::new(v))
            }
        }

        deserializer.deserialize_any(V)
    }
}

/// One live track as announced by a hint.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct TrackHint {
    /// The track.
    pub id: TrackId,

    /// The latest sequence number the producer knows to exist. Fetching
    /// starts right after it.
    pub seq: u64,
}

/// The hint document.
#[derive(
    Debug, Clone, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize,
)]
pub struct Hint {
    /// The live tracks.
    #[serde(default)]
    pub tracks: Vec<TrackHint>,
}

impl Hint {
    /// Decode a hint from its json content.
    pub fn decode(content: &[u8]) -> TfResult<Self> {
        serde_json::from_slice(content)
            .map_err(|e| TfError::other_src("decode hint", e))
    }

    /// Encode this hint as json content.
    pub fn encode(&self) -> TfResult<bytes::Bytes> {
        serde_json::to_vec(self)
            .map(Into::into)
            .map_err(|e| TfError::other_src("encode hint", e))
    }
}
