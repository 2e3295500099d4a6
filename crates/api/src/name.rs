//! Hierarchical names and exclusion filters.

use crate::*;

/// Offset, counted from the end of a track data name, of the track id
/// component: `<prefix>/<tp>/tracks/<track_id>/<seq>`.
pub const TRACK_ID_OFFSET: isize = -2;

/// Offset, counted from the end of a track data name, of the sequence
/// number component.
pub const TRACK_SEQ_OFFSET: isize = -1;

/// The component following the time partition for track data names.
pub const TRACKS_COMPONENT: &str = "tracks";

/// The component following the time partition for hint names.
pub const TRACK_HINT_COMPONENT: &str = "track_hint";

/// A single opaque name component.
///
/// Components are ordered canonically: a shorter component sorts before
/// a longer one, components of equal length compare bytewise.
#[derive(Clone, PartialEq, Eq, Hash, Default)]
pub struct NameComponent(bytes::Bytes);

impl NameComponent {
    /// Construct a component from raw bytes.
    pub fn new(b: impl Into<bytes::Bytes>) -> Self {
        Self(b.into())
    }

    /// Get the raw bytes of this component.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Interpret this component as a utf8 string, if it is one.
    pub fn as_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.0).ok()
    }

    /// Interpret this component as a decimal sequence number.
    pub fn to_seq(&self) -> Option<u64> {
        self.as_str()?.parse().ok()
    }

    /// Decode one escaped uri component. Three or more periods denote
    /// the component made of the remaining periods.
    pub fn from_escaped(s: &str) -> TfResult<Self> {
        if !s.is_empty() && s.bytes().all(|b| b == b'.') {
            if s.len() < 3 {
                return Err(TfError::other(format!(
                    "illegal name component: {s:?}"
                )));
            }
            return Ok(Self(bytes::Bytes::copy_from_slice(
                &s.as_bytes()[3..],
            )));
        }

        let raw = s.as_bytes();
        let mut out = Vec::with_capacity(raw.len());
        let mut i = 0;
        while i < raw.len() {
            if raw[i] == b'%' {
                let hex = raw
                    .get(i + 1..i + 3)
                    .and_then(|h| std::str::from_utf8(h).ok())
                    .and_then(|h| u8::from_str_radix(h, 16).ok())
                    .ok_or_else(|| {
                        TfError::other(format!("bad escape in component {s:?}"))
                    })?;
                out.push(hex);
                i += 3;
            } else {
                out.push(raw[i]);
                i += 1;
            }
        }
        Ok(Self(out.into()))
    }
}

impl From<&str> for NameComponent {
    fn from(s: &str) -> Self {
        Self(bytes::Bytes::copy_from_slice(s.as_bytes()))
    }
}

impl From<String> for NameComponent {
    fn from(s: String) -> Self {
        Self(s.into_bytes().into())
    }
}

impl From<u64> for NameComponent {
    fn from(n: u64) -> Self {
        Self::from(n.to_string())
    }
}

impl Ord for NameComponent {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0
            .len()
            .cmp(&other.0.len())
            .then_with(|| self.0[..].cmp(&other.0[..]))
    }
}

impl PartialOrd for NameComponent {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl std::fmt::Display for NameComponent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.0.iter().all(|b| *b == b'.') {
            f.write_str("...")?;
        }
        for b in self.0.iter() {
            match b {
                b'a'..=b'z'
                | b'A'..=b'Z'
                | b'0'..=b'9'
                | b'-'
                | b'.'
                | b'_'
                | b'~' => write!(f, "{}", *b as char)?,
                _ => write!(f, "%{b:02X}")?,
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for NameComponent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(self, f)
    }
}

/// A hierarchical name, an ordered list of [NameComponent]s.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Name(Vec<NameComponent>);

impl Name {
    /// Construct the empty (root) name.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a name from its uri form, e.g. `/ndn/edu/ucla/remap/opt`.
    /// An optional `ndn:` scheme is accepted.
    pub fn from_str<S: AsRef<str>>(s: S) -> TfResult<Self> {
        let s = s.as_ref().trim();
        let s = s.strip_prefix("ndn:").unwrap_or(s);
        let s = s.strip_prefix('/').unwrap_or(s);
        let mut out = Vec::new();
        for part in s.split('/').filter(|p| !p.is_empty()) {
            out.push(NameComponent::from_escaped(part)?);
        }
        Ok(Self(out))
    }

    /// The number of components in this name.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if this is the root name.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Get a component by index. Negative indices count from the end,
    /// `-1` being the last component.
    pub fn get(&self, i: isize) -> Option<&NameComponent> {
        let idx = if i < 0 {
            self.0.len().checked_sub(i.unsigned_abs())?
        } else {
            i as usize
        };
        self.0.get(idx)
    }

    /// Get the name made of the first `n` components. A negative `n`
    /// drops that many components from the end.
    pub fn prefix(&self, n: isize) -> Name {
        let n = if n < 0 {
            self.0.len().saturating_sub(n.unsigned_abs())
        } else {
            (n as usize).min(self.0.len())
        };
        Self(self.0[..n].to_vec())
    }

    /// Append a component, builder style.
    pub fn append(mut self, c: impl Into<NameComponent>) -> Self {
        self.0.push(c.into());
        self
    }

    /// Returns true if every component of this name is a leading
    /// component of `other`.
    pub fn is_prefix_of(&self, other: &Name) -> bool {
        self.0.len() <= other.0.len() && self.0[..] == other.0[..self.0.len()]
    }

    /// Iterate the components.
    pub fn iter(&self) -> impl Iterator<Item = &NameComponent> {
        self.0.iter()
    }
}

impl std::fmt::Display for Name {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.0.is_empty() {
            return f.write_str("/");
        }
        for c in self.0.iter() {
            write!(f, "/{c}")?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for Name {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(self, f)
    }
}

impl serde::Serialize for Name {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> serde::Deserialize<'de> for Name {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s: String = serde::Deserialize::deserialize(deserializer)?;
        Name::from_str(s).map_err(serde::de::Error::custom)
    }
}

/// One entry of an [Exclude] filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExcludeEntry {
    /// Everything strictly between the neighbouring components.
    Any,

    /// Exactly this component.
    Component(NameComponent),
}

/// A filter of components that must not be selected as the component
/// directly following an interest name.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Exclude(Vec<ExcludeEntry>);

impl Exclude {
    /// Construct an empty filter, which excludes nothing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an [ExcludeEntry::Any] range, builder style.
    pub fn any(mut self) -> Self {
        self.0.push(ExcludeEntry::Any);
        self
    }

    /// Append a specific component, builder style.
    pub fn component(mut self, c: NameComponent) -> Self {
        self.0.push(ExcludeEntry::Component(c));
        self
    }

    /// The filter that excludes `c` and everything ordered before it.
    pub fn up_to(c: NameComponent) -> Self {
        Self::new().any().component(c)
    }

    /// Access the entries of this filter.
    pub fn entries(&self) -> &[ExcludeEntry] {
        &self.0
    }

    /// Returns true if the component is excluded by this filter.
    pub fn matches(&self, c: &NameComponent) -> bool {
        for (i, entry) in self.0.iter().enumerate() {
            match entry {
                ExcludeEntry::Component(x) => {
                    if x == c {
                        return true;
                    }
                }
                ExcludeEntry::Any => {
                    let lower = match i.checked_sub(1).map(|j| &self.0[j]) {
                        Some(ExcludeEntry::Component(x)) => Some(x),
                        _ => None,
                    };
                    let upper = match self.0.get(i + 1) {
                        Some(ExcludeEntry::Component(x)) => Some(x),
                        _ => None,
                    };
                    let above = lower.map(|l| c > l).unwrap_or(true);
                    let below = upper.map(|u| c < u).unwrap_or(true);
                    if above && below {
                        return true;
                    }
                }
            }
        }
        false
    }
}
