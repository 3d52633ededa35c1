use core::fmt::{self, Display, Formatter};

/// A dependency relation between two operations.
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Rel {
    /// Write-write: the source's write was overwritten (or extended) by the
    /// target's write on the same key.
    Ww,
    /// Write-read: the target observed the source's write.
    Wr,
    /// Read-write: the target overwrote the version the source observed.
    Rw,
    /// Successive completions by the same process.
    Process,
    /// The source completed before the target was invoked.
    Realtime,
    /// Reads of a per-key monotonic counter, ordered by observed value.
    PerKey,
    /// Version-order edge out of a key's initial (unwritten) state.
    InitialState,
    /// Version-order edge inferred from a read followed by a write within
    /// one transaction.
    Wfr,
}

impl Rel {
    /// All relations, in bit order. Classification picks the first match,
    /// so dependency relations come before ordering relations.
    pub const ALL: [Self; 8] = [
        Self::Ww,
        Self::Wr,
        Self::Rw,
        Self::Process,
        Self::Realtime,
        Self::PerKey,
        Self::InitialState,
        Self::Wfr,
    ];

    const fn bit(self) -> u16 {
        match self {
            Self::Ww => 1,
            Self::Wr => 1 << 1,
            Self::Rw => 1 << 2,
            Self::Process => 1 << 3,
            Self::Realtime => 1 << 4,
            Self::PerKey => 1 << 5,
            Self::InitialState => 1 << 6,
            Self::Wfr => 1 << 7,
        }
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Ww => "ww",
            Self::Wr => "wr",
            Self::Rw => "rw",
            Self::Process => "process",
            Self::Realtime => "realtime",
            Self::PerKey => "per-key",
            Self::InitialState => "initial-state",
            Self::Wfr => "wfr",
        }
    }
}

impl Display for Rel {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A set of relations carried by one edge.
///
/// Multiple relations between the same pair of vertices collapse to a
/// single edge labeled with their union; the set is a bit mask so the
/// project/remove operations are cheap.
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct RelSet(u16);

impl RelSet {
    pub const EMPTY: Self = Self(0);
    /// The dependency relations used for anomaly classification.
    pub const DATA: Self = Self(Rel::Ww.bit() | Rel::Wr.bit() | Rel::Rw.bit());
    /// The ordering relations.
    pub const ORDER: Self = Self(Rel::Process.bit() | Rel::Realtime.bit() | Rel::PerKey.bit());

    #[must_use]
    pub const fn of(rel: Rel) -> Self {
        Self(rel.bit())
    }

    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    #[must_use]
    pub const fn contains(self, rel: Rel) -> bool {
        self.0 & rel.bit() != 0
    }

    #[must_use]
    pub const fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    #[must_use]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    #[must_use]
    pub const fn intersect(self, other: Self) -> Self {
        Self(self.0 & other.0)
    }

    #[must_use]
    pub const fn minus(self, other: Self) -> Self {
        Self(self.0 & !other.0)
    }

    pub fn insert(&mut self, rel: Rel) {
        self.0 |= rel.bit();
    }

    /// Relations present, in [`Rel::ALL`] order.
    pub fn iter(self) -> impl Iterator<Item = Rel> {
        Rel::ALL.into_iter().filter(move |r| self.contains(*r))
    }

    /// The first relation present, in [`Rel::ALL`] order.
    ///
    /// When an edge carries several relations, classification uses the
    /// weakest interpretation (ww before wr before rw), which keeps
    /// reported anomalies as specific as possible.
    #[must_use]
    pub fn primary(self) -> Option<Rel> {
        self.iter().next()
    }
}

impl From<Rel> for RelSet {
    fn from(rel: Rel) -> Self {
        Self::of(rel)
    }
}

impl FromIterator<Rel> for RelSet {
    fn from_iter<I: IntoIterator<Item = Rel>>(iter: I) -> Self {
        let mut set = Self::EMPTY;
        for rel in iter {
            set.insert(rel);
        }
        set
    }
}

impl Display for RelSet {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        let mut first = true;
        for rel in self.iter() {
            if !first {
                f.write_str("+")?;
            }
            write!(f, "{rel}")?;
            first = false;
        }
        if first {
            f.write_str("none")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relset_operations() {
        let mut set = RelSet::of(Rel::Ww);
        set.insert(Rel::Rw);
        assert!(set.contains(Rel::Ww));
        assert!(set.contains(Rel::Rw));
        assert!(!set.contains(Rel::Wr));
        assert!(set.intersects(RelSet::DATA));
        assert_eq!(set.minus(RelSet::of(Rel::Rw)), RelSet::of(Rel::Ww));
        assert_eq!(set.primary(), Some(Rel::Ww));
    }

    #[test]
    fn relset_display() {
        let set: RelSet = [Rel::Wr, Rel::Process].into_iter().collect();
        assert_eq!(set.to_string(), "wr+process");
        assert_eq!(RelSet::EMPTY.to_string(), "none");
    }

    #[test]
    fn primary_prefers_weakest_dependency() {
        let set: RelSet = [Rel::Rw, Rel::Ww].into_iter().collect();
        assert_eq!(set.primary(), Some(Rel::Ww));
    }
}
