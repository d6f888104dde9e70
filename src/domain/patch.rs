use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Tri-state optional field of a transaction body.
///
/// The protocol distinguishes "not specified" from "specified as the default/zero value".
/// `Unset` leaves existing state untouched; `Set(v)` overwrites it, even when `v` is a
/// zero or empty value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Patch<T> {
    Unset,
    Set(T),
}

impl<T> Default for Patch<T> {
    fn default() -> Self {
        Patch::Unset
    }
}

impl<T> Patch<T> {
    pub fn is_set(&self) -> bool {
        matches!(self, Patch::Set(_))
    }

    pub fn as_ref(&self) -> Option<&T> {
        match self {
            Patch::Set(value) => Some(value),
            Patch::Unset => None,
        }
    }

    pub fn into_option(self) -> Option<T> {
        match self {
            Patch::Set(value) => Some(value),
            Patch::Unset => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Patch<U> {
        match self {
            Patch::Set(value) => Patch::Set(f(value)),
            Patch::Unset => Patch::Unset,
        }
    }

    /// Writes the value into `target` only when it was explicitly set.
    pub fn apply_to(&self, target: &mut Option<T>)
    where
        T: Clone,
    {
        if let Patch::Set(value) = self {
            *target = Some(value.clone());
        }
    }
}

impl<T> From<Option<T>> for Patch<T> {
    fn from(value: Option<T>) -> Self {
        value.map_or(Patch::Unset, Patch::Set)
    }
}

impl<T> From<Patch<T>> for Option<T> {
    fn from(value: Patch<T>) -> Self {
        value.into_option()
    }
}

impl<T: Serialize> Serialize for Patch<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Patch::Set(value) => serializer.serialize_some(value),
            Patch::Unset => serializer.serialize_none(),
        }
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Patch<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Option::<T>::deserialize(deserializer).map(Patch::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unset_leaves_target_untouched() {
        let mut memo = Some("existing".to_string());
        Patch::<String>::Unset.apply_to(&mut memo);
        assert_eq!(memo.as_deref(), Some("existing"));
    }

    #[test]
    fn test_set_to_default_value_overwrites() {
        let mut period = Some(7_776_000_i64);
        Patch::Set(0).apply_to(&mut period);
        assert_eq!(period, Some(0));

        let mut memo = Some("existing".to_string());
        Patch::Set(String::new()).apply_to(&mut memo);
        assert_eq!(memo.as_deref(), Some(""));
    }

    #[test]
    fn test_serde_missing_field_is_unset() {
        #[derive(Deserialize, Default)]
        #[serde(default)]
        struct Body {
            memo: Patch<String>,
            period: Patch<i64>,
        }

        let body: Body = serde_json::from_str(r#"{"period": 0}"#).unwrap();
        assert_eq!(body.memo, Patch::Unset);
        assert_eq!(body.period, Patch::Set(0));
    }
}
