//! Pen identifiers.
//!
//! A document names its pens with free-form strings, and line ends refer
//! to their owner node by that string. Every id is interned once so the
//! rest of the engine passes around a `Copy` handle and compares integers.

use std::borrow::Cow;
use std::fmt;
use std::sync::LazyLock;
use std::sync::atomic::{AtomicU64, Ordering};

use lasso::{Spur, ThreadedRodeo};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

static IDS: LazyLock<ThreadedRodeo> = LazyLock::new(ThreadedRodeo::default);

/// Next suffix tried by [`PenId::fresh`].
static NEXT_FRESH: AtomicU64 = AtomicU64::new(0);

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct PenId(Spur);

impl PenId {
    pub fn intern(name: &str) -> Self {
        Self(IDS.get_or_intern(name))
    }

    pub fn as_str(&self) -> &str {
        IDS.resolve(&self.0)
    }

    /// An id no document or earlier call has used, for new pens, pasted
    /// clones and combine groups.
    pub fn fresh() -> Self {
        loop {
            let name = format!("pen_{:x}", NEXT_FRESH.fetch_add(1, Ordering::Relaxed));
            if IDS.get(&name).is_none() {
                return Self::intern(&name);
            }
        }
    }
}

impl fmt::Debug for PenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.as_str())
    }
}

impl fmt::Display for PenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// On the wire an id is just its string.
impl Serialize for PenId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.as_str().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for PenId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = Cow::<str>::deserialize(deserializer)?;
        Ok(Self::intern(&name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_name_same_handle() {
        let rack = PenId::intern("server_rack");
        assert_eq!(rack, PenId::intern("server_rack"));
        assert_ne!(rack, PenId::intern("server_rack_2"));
        assert_eq!(rack.as_str(), "server_rack");
    }

    #[test]
    fn ids_travel_as_plain_strings() {
        let id: PenId = serde_json::from_str(r#""rack_7""#).unwrap();
        assert_eq!(id, PenId::intern("rack_7"));
        assert_eq!(serde_json::to_string(&id).unwrap(), r#""rack_7""#);
        assert_eq!(format!("{id:?}"), "#rack_7");
    }

    #[test]
    fn fresh_ids_are_unique() {
        let a = PenId::fresh();
        let b = PenId::fresh();
        assert_ne!(a, b);
    }

    #[test]
    fn fresh_skips_taken_names() {
        // Pre-intern the next few candidates the counter could produce.
        let start = NEXT_FRESH.load(Ordering::Relaxed);
        for n in start..start + 4 {
            PenId::intern(&format!("pen_{n:x}"));
        }
        let id = PenId::fresh();
        let taken: Vec<String> = (start..start + 4).map(|n| format!("pen_{n:x}")).collect();
        assert!(!taken.iter().any(|t| t == id.as_str()));
    }
}
