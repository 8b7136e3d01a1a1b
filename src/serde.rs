use crate::id::FloeId;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

impl Serialize for FloeId {
    /// Serializes the id as its raw `u64` representation.
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.to_raw().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for FloeId {
    /// Deserializes an id from its raw `u64` representation.
    ///
    /// # Errors
    ///
    /// Rejects values with the sign bit set, which no generator produces.
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = u64::deserialize(deserializer)?;
        let id = FloeId::from_raw(raw);
        if id.msb() != 0 {
            return Err(serde::de::Error::custom("id has the sign bit set"));
        }
        Ok(id)
    }
}
