//! Tagged optional scalars.
//!
//! The monitoring API encodes optional scalars as a two-field record holding the
//! value and a validity flag (`{"Time": "...", "Valid": true}`). `Nullable<T>`
//! keeps that shape so that "absent" and "present with a zero value" stay
//! distinguishable on the client.

use chrono::{DateTime, Datelike, Utc};
use serde::de::{self, Deserializer, MapAccess, Visitor};
use serde::ser::{SerializeStruct, Serializer};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::marker::PhantomData;

/// Scalar types that can appear inside a [`Nullable`] on the wire.
///
/// `FIELD` is the key the server uses for the value half of the record.
pub trait NullableValue: Default {
    /// Wire name of the value field.
    const FIELD: &'static str;
}

impl NullableValue for String {
    const FIELD: &'static str = "String";
}

impl NullableValue for DateTime<Utc> {
    const FIELD: &'static str = "Time";
}

impl NullableValue for f64 {
    const FIELD: &'static str = "Float64";
}

impl NullableValue for i64 {
    const FIELD: &'static str = "Int64";
}

/// An optional scalar that records presence explicitly.
///
/// # Example
///
/// ```
/// use shared::models::Nullable;
///
/// let ended: Nullable<f64> = Nullable::present(0.0);
/// let running: Nullable<f64> = Nullable::absent();
///
/// assert!(ended.is_present());
/// assert_eq!(ended.get(), Some(&0.0));
/// assert!(running.get().is_none());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Nullable<T> {
    /// The carried value. Meaningless when `present` is false.
    pub value: T,
    /// Whether `value` holds real data.
    pub present: bool,
}

impl<T: Default> Nullable<T> {
    /// Creates a present value.
    #[must_use]
    pub fn present(value: T) -> Self {
        Self {
            value,
            present: true,
        }
    }

    /// Creates an absent value.
    #[must_use]
    pub fn absent() -> Self {
        Self {
            value: T::default(),
            present: false,
        }
    }
}

impl<T> Nullable<T> {
    /// Returns true if a value is present.
    #[must_use]
    pub fn is_present(&self) -> bool {
        self.present
    }

    /// Returns a reference to the value if present.
    #[must_use]
    pub fn get(&self) -> Option<&T> {
        self.present.then_some(&self.value)
    }

    /// Converts into a plain `Option`, dropping the carried value when absent.
    #[must_use]
    pub fn into_option(self) -> Option<T> {
        if self.present {
            Some(self.value)
        } else {
            None
        }
    }
}

impl<T: Default> From<Option<T>> for Nullable<T> {
    fn from(value: Option<T>) -> Self {
        value.map_or_else(Self::absent, Self::present)
    }
}

impl<T> Serialize for Nullable<T>
where
    T: NullableValue + Serialize,
{
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Nullable", 2)?;
        state.serialize_field(T::FIELD, &self.value)?;
        state.serialize_field("Valid", &self.present)?;
        state.end()
    }
}

impl<'de, T> Deserialize<'de> for Nullable<T>
where
    T: NullableValue + Deserialize<'de>,
{
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct NullableVisitor<T>(PhantomData<T>);

        impl<'de, T> Visitor<'de> for NullableVisitor<T>
        where
            T: NullableValue + Deserialize<'de>,
        {
            type Value = Nullable<T>;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "a record with `{}` and `Valid` fields", T::FIELD)
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut value: Option<Option<T>> = None;
                let mut present: Option<bool> = None;

                while let Some(key) = map.next_key::<String>()? {
                    if key == T::FIELD || key == "value" {
                        if value.is_some() {
                            return Err(de::Error::duplicate_field(T::FIELD));
                        }
                        value = Some(map.next_value()?);
                    } else if key == "Valid" || key == "valid" || key == "present" {
                        if present.is_some() {
                            return Err(de::Error::duplicate_field("Valid"));
                        }
                        present = Some(map.next_value()?);
                    } else {
                        map.next_value::<de::IgnoredAny>()?;
                    }
                }

                let present = present.ok_or_else(|| de::Error::missing_field("Valid"))?;
                let value = value.flatten().unwrap_or_default();
                Ok(Nullable { value, present })
            }
        }

        deserializer.deserialize_map(NullableVisitor(PhantomData))
    }
}

/// Deserializes a `Nullable` field that may also be missing or `null`.
///
/// Use together with `#[serde(default)]` so that an absent key maps to
/// [`Nullable::absent`].
///
/// # Errors
///
/// Returns an error if the field is present but malformed.
pub fn or_absent<'de, D, T>(deserializer: D) -> Result<Nullable<T>, D::Error>
where
    D: Deserializer<'de>,
    T: NullableValue + Deserialize<'de>,
{
    Ok(Option::<Nullable<T>>::deserialize(deserializer)?.unwrap_or_else(Nullable::absent))
}

/// Deserializes an optional string, treating `""` as absent.
///
/// # Errors
///
/// Returns an error if the field is not a string or `null`.
pub fn non_empty<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.filter(|s| !s.is_empty()))
}

/// Deserializes a collection that the server may encode as `null` when empty.
///
/// # Errors
///
/// Returns an error if the field is present but malformed.
pub fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Deserializes a timestamp where the zero time (`0001-01-01T00:00:00Z`) or
/// `null` means "not set".
///
/// # Errors
///
/// Returns an error if the field is present but not a valid RFC 3339 timestamp.
pub fn zero_time_as_none<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<DateTime<Utc>>::deserialize(deserializer)?.filter(|t| t.year() > 1))
}
