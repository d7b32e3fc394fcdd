use serde::Deserializer;
use std::fmt::Display;
use std::marker::PhantomData;
use std::str::FromStr;

/// Deserialize any `FromStr` type from a string
pub(crate) fn from_str<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    <T as FromStr>::Err: Display,
{
    struct FromStrVisitor<Inner>(PhantomData<Inner>);

    impl<Inner> serde::de::Visitor<'_> for FromStrVisitor<Inner>
    where
        Inner: FromStr,
        <Inner as FromStr>::Err: Display,
    {
        type Value = Inner;

        fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
            formatter.write_str("a string")
        }

        fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Inner::from_str(value).map_err(|error| E::custom(error.to_string()))
        }
    }

    deserializer.deserialize_str(FromStrVisitor(PhantomData))
}
