use core::fmt::{self, Display, Formatter};
use std::collections::BTreeMap;

use crate::checker::anomaly::{Anomaly, AnomalyKind, Severity};

/// Three-valued verdict.
///
/// `Unknown` covers input-sanity problems, timeouts and other incomplete
/// analyses; it absorbs `True` under conjunction but never `False`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Validity {
    True,
    Unknown,
    False,
}

impl Validity {
    /// Conjunction: any `False` wins, then any `Unknown`.
    #[must_use]
    pub const fn and(self, other: Self) -> Self {
        match (self, other) {
            (Self::False, _) | (_, Self::False) => Self::False,
            (Self::Unknown, _) | (_, Self::Unknown) => Self::Unknown,
            (Self::True, Self::True) => Self::True,
        }
    }

    #[must_use]
    pub const fn is_ok(self) -> bool {
        matches!(self, Self::True)
    }
}

impl Display for Validity {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.write_str(match self {
            Self::True => "true",
            Self::Unknown => "unknown",
            Self::False => "false",
        })
    }
}

#[cfg(feature = "serde")]
impl ::serde::Serialize for Validity {
    fn serialize<S: ::serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::True => serializer.serialize_bool(true),
            Self::False => serializer.serialize_bool(false),
            Self::Unknown => serializer.serialize_str("unknown"),
        }
    }
}

#[cfg(feature = "serde")]
impl<'de> ::serde::Deserialize<'de> for Validity {
    fn deserialize<D: ::serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        use ::serde::de::{self, Visitor};

        struct ValidityVisitor;

        impl Visitor<'_> for ValidityVisitor {
            type Value = Validity;

            fn expecting(&self, f: &mut Formatter) -> fmt::Result {
                f.write_str("a boolean or the string \"unknown\"")
            }

            fn visit_bool<E: de::Error>(self, v: bool) -> Result<Validity, E> {
                Ok(if v { Validity::True } else { Validity::False })
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Validity, E> {
                if v == "unknown" {
                    Ok(Validity::Unknown)
                } else {
                    Err(de::Error::custom("expected \"unknown\""))
                }
            }
        }

        deserializer.deserialize_any(ValidityVisitor)
    }
}

/// The outcome of a single checker: a verdict plus concrete witnesses,
/// grouped by anomaly class in a fixed order.
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckResult {
    #[cfg_attr(feature = "serde", serde(rename = "valid?"))]
    pub validity: Validity,
    #[cfg_attr(
        feature = "serde",
        serde(default, skip_serializing_if = "BTreeMap::is_empty")
    )]
    pub anomalies: BTreeMap<AnomalyKind, Vec<Anomaly>>,
    #[cfg_attr(
        feature = "serde",
        serde(default, skip_serializing_if = "core::ops::Not::not")
    )]
    pub timeout: bool,
    #[cfg_attr(
        feature = "serde",
        serde(default, skip_serializing_if = "Option::is_none")
    )]
    pub error: Option<String>,
}

impl CheckResult {
    /// A clean pass.
    #[must_use]
    pub fn valid() -> Self {
        Self {
            validity: Validity::True,
            anomalies: BTreeMap::new(),
            timeout: false,
            error: None,
        }
    }

    /// An `unknown` verdict with a diagnostic, for sub-checker failures.
    #[must_use]
    pub fn error(detail: impl Into<String>) -> Self {
        Self {
            validity: Validity::Unknown,
            anomalies: BTreeMap::new(),
            timeout: false,
            error: Some(detail.into()),
        }
    }

    /// Derive the verdict from collected anomalies: any fatal anomaly
    /// refutes the model; undetermined anomalies (or a timeout) degrade
    /// the verdict to `unknown`.
    #[must_use]
    pub fn from_anomalies<I: IntoIterator<Item = Anomaly>>(found: I, timeout: bool) -> Self {
        let mut anomalies: BTreeMap<AnomalyKind, Vec<Anomaly>> = BTreeMap::new();
        let mut validity = if timeout {
            Validity::Unknown
        } else {
            Validity::True
        };
        for anomaly in found {
            validity = validity.and(match anomaly.severity() {
                Severity::Fatal => Validity::False,
                Severity::Undetermined => Validity::Unknown,
            });
            anomalies.entry(anomaly.kind()).or_default().push(anomaly);
        }
        Self {
            validity,
            anomalies,
            timeout,
            error: None,
        }
    }

    /// All witnesses in report order.
    pub fn iter_anomalies(&self) -> impl Iterator<Item = (&AnomalyKind, &Anomaly)> {
        self.anomalies
            .iter()
            .flat_map(|(kind, list)| list.iter().map(move |a| (kind, a)))
    }
}

/// Merged output of a [`CheckerSet`](crate::checker::CheckerSet) run.
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposedResult {
    #[cfg_attr(feature = "serde", serde(rename = "valid?"))]
    pub validity: Validity,
    pub results: BTreeMap<String, CheckResult>,
}
