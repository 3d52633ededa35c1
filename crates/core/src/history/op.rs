use core::fmt::{self, Display, Formatter};

use crate::history::value::Value;

/// Logical actor that issued an operation.
///
/// Client processes are numbered; the fault injector appears as the
/// distinguished `Nemesis` actor and is stripped before consistency
/// checking. Wire form is a bare integer or the string `"nemesis"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Process {
    Client(u64),
    Nemesis,
}

impl Process {
    #[must_use]
    pub const fn is_client(self) -> bool {
        matches!(self, Self::Client(_))
    }
}

impl Display for Process {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            Self::Client(p) => write!(f, "{p}"),
            Self::Nemesis => f.write_str("nemesis"),
        }
    }
}

#[cfg(feature = "serde")]
impl ::serde::Serialize for Process {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: ::serde::Serializer,
    {
        match self {
            Self::Client(p) => serializer.serialize_u64(*p),
            Self::Nemesis => serializer.serialize_str("nemesis"),
        }
    }
}

#[cfg(feature = "serde")]
impl<'de> ::serde::Deserialize<'de> for Process {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: ::serde::Deserializer<'de>,
    {
        use ::serde::de::{self, Visitor};

        struct ProcessVisitor;

        impl Visitor<'_> for ProcessVisitor {
            type Value = Process;

            fn expecting(&self, f: &mut Formatter) -> fmt::Result {
                f.write_str("a process number or the string \"nemesis\"")
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Process, E> {
                Ok(Process::Client(v))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Process, E> {
                u64::try_from(v)
                    .map(Process::Client)
                    .map_err(|_| de::Error::custom("process number must be nonnegative"))
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Process, E> {
                if v == "nemesis" {
                    Ok(Process::Nemesis)
                } else {
                    Err(de::Error::custom("expected \"nemesis\""))
                }
            }
        }

        deserializer.deserialize_any(ProcessVisitor)
    }
}

/// Operation phase: issued, or completed with a definite or indeterminate
/// outcome.
///
/// - `Ok`: the operation definitely took effect as described.
/// - `Fail`: the operation definitely had no effect.
/// - `Info`: indeterminate; the operation may or may not have taken effect.
#[cfg_attr(
    feature = "serde",
    derive(::serde::Serialize, ::serde::Deserialize),
    serde(rename_all = "lowercase")
)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Invoke,
    Ok,
    Fail,
    Info,
}

impl Kind {
    /// True for `ok`, `fail` and `info`.
    #[must_use]
    pub const fn is_completion(self) -> bool {
        !matches!(self, Self::Invoke)
    }
}

impl Display for Kind {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.write_str(match self {
            Self::Invoke => "invoke",
            Self::Ok => "ok",
            Self::Fail => "fail",
            Self::Info => "info",
        })
    }
}

/// Operation kind.
///
/// `Txn` payloads are micro-op lists ([`Mop`](crate::history::Mop));
/// the register/counter/set kinds carry scalar payloads; `Start`/`Stop`
/// are emitted by the nemesis and never reach a checker.
#[cfg_attr(
    feature = "serde",
    derive(::serde::Serialize, ::serde::Deserialize),
    serde(rename_all = "lowercase")
)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Fun {
    Read,
    Write,
    Cas,
    Add,
    Acquire,
    Release,
    Txn,
    Start,
    Stop,
}

impl Display for Fun {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.write_str(match self {
            Self::Read => "read",
            Self::Write => "write",
            Self::Cas => "cas",
            Self::Add => "add",
            Self::Acquire => "acquire",
            Self::Release => "release",
            Self::Txn => "txn",
            Self::Start => "start",
            Self::Stop => "stop",
        })
    }
}

/// A single recorded operation.
///
/// Operations are immutable once ingested. `index` is the dense total-order
/// position assigned by [`History::index`](crate::history::History::index);
/// `time` is monotonic nanoseconds since test start. An invocation and its
/// completion share `process` and `f`; read results are nil on invocation
/// and filled in on completion.
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Op {
    pub index: usize,
    pub time: i64,
    pub process: Process,
    #[cfg_attr(feature = "serde", serde(rename = "type"))]
    pub kind: Kind,
    pub f: Fun,
    pub value: Value,
    #[cfg_attr(
        feature = "serde",
        serde(default, skip_serializing_if = "Option::is_none")
    )]
    pub error: Option<String>,
}

impl Op {
    /// Build an unindexed operation; `index` and `time` are filled by ingest.
    #[must_use]
    pub const fn new(process: Process, kind: Kind, f: Fun, value: Value) -> Self {
        Self {
            index: 0,
            time: 0,
            process,
            kind,
            f,
            value,
            error: None,
        }
    }

    #[must_use]
    pub const fn invoke(process: u64, f: Fun, value: Value) -> Self {
        Self::new(Process::Client(process), Kind::Invoke, f, value)
    }

    #[must_use]
    pub const fn ok(process: u64, f: Fun, value: Value) -> Self {
        Self::new(Process::Client(process), Kind::Ok, f, value)
    }

    #[must_use]
    pub const fn fail(process: u64, f: Fun, value: Value) -> Self {
        Self::new(Process::Client(process), Kind::Fail, f, value)
    }

    #[must_use]
    pub const fn info(process: u64, f: Fun, value: Value) -> Self {
        Self::new(Process::Client(process), Kind::Info, f, value)
    }
}

impl Display for Op {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(
            f,
            "{}: {} {} {}",
            self.process, self.kind, self.f, self.value
        )
    }
}
