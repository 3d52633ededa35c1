use std::collections::BTreeSet;

use crate::history::{Fun, Value};

/// Why a step is illegal. A sentinel value, not an exception: the search
/// prunes on it constantly, so the reason is a static string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Inconsistent {
    pub reason: &'static str,
}

const fn inconsistent(reason: &'static str) -> Inconsistent {
    Inconsistent { reason }
}

/// A pure single-object state machine.
///
/// `step` never mutates; it returns the successor state or an
/// [`Inconsistent`] sentinel. A nil read observation matches any state
/// and leaves it unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Model {
    /// A register supporting write, compare-and-set, and read.
    CasRegister(Option<i64>),
    /// An integer accumulator.
    Counter(i64),
    /// A grow-only set of integers.
    AddSet(BTreeSet<i64>),
    /// A lock: acquire fails when held, release fails when free.
    Mutex(bool),
}

impl Model {
    #[must_use]
    pub const fn cas_register() -> Self {
        Self::CasRegister(None)
    }

    #[must_use]
    pub const fn counter() -> Self {
        Self::Counter(0)
    }

    #[must_use]
    pub const fn add_set() -> Self {
        Self::AddSet(BTreeSet::new())
    }

    #[must_use]
    pub const fn mutex() -> Self {
        Self::Mutex(false)
    }

    /// Apply one operation.
    ///
    /// # Errors
    ///
    /// Returns [`Inconsistent`] when the operation is illegal in this
    /// state or its observation disagrees with the state.
    pub fn step(&self, f: Fun, value: &Value) -> Result<Self, Inconsistent> {
        match self {
            Self::CasRegister(state) => match f {
                Fun::Write => value
                    .as_int()
                    .map(|v| Self::CasRegister(Some(v)))
                    .ok_or(inconsistent("write requires an integer value")),
                Fun::Cas => {
                    let Value::List(pair) = value else {
                        return Err(inconsistent("cas requires an [old, new] pair"));
                    };
                    let [Value::Int(old), Value::Int(new)] = pair.as_slice() else {
                        return Err(inconsistent("cas requires an [old, new] pair"));
                    };
                    if *state == Some(*old) {
                        Ok(Self::CasRegister(Some(*new)))
                    } else {
                        Err(inconsistent("cas precondition does not hold"))
                    }
                }
                Fun::Read => match value {
                    Value::Nil => Ok(self.clone()),
                    Value::Int(v) if *state == Some(*v) => Ok(self.clone()),
                    Value::Int(_) => Err(inconsistent("read observed a different value")),
                    _ => Err(inconsistent("read observation must be an integer")),
                },
                _ => Err(inconsistent("register supports write, cas and read")),
            },
            Self::Counter(state) => match f {
                Fun::Add => value
                    .as_int()
                    .map(|d| Self::Counter(state + d))
                    .ok_or(inconsistent("add requires an integer delta")),
                Fun::Read => match value {
                    Value::Nil => Ok(self.clone()),
                    Value::Int(v) if v == state => Ok(self.clone()),
                    Value::Int(_) => Err(inconsistent("read observed a different count")),
                    _ => Err(inconsistent("read observation must be an integer")),
                },
                _ => Err(inconsistent("counter supports add and read")),
            },
            Self::AddSet(state) => match f {
                Fun::Add => value
                    .as_int()
                    .map(|e| {
                        let mut next = state.clone();
                        next.insert(e);
                        Self::AddSet(next)
                    })
                    .ok_or(inconsistent("add requires an integer element")),
                Fun::Read => match value {
                    Value::Nil => Ok(self.clone()),
                    other => {
                        let observed: Option<BTreeSet<i64>> =
                            other.as_int_list().map(|items| items.into_iter().collect());
                        match observed {
                            Some(observed) if observed == *state => Ok(self.clone()),
                            Some(_) => Err(inconsistent("read observed a different set")),
                            None => Err(inconsistent("read observation must be a list")),
                        }
                    }
                },
                _ => Err(inconsistent("set supports add and read")),
            },
            Self::Mutex(held) => match f {
                Fun::Acquire if !held => Ok(Self::Mutex(true)),
                Fun::Acquire => Err(inconsistent("lock is already held")),
                Fun::Release if *held => Ok(Self::Mutex(false)),
                Fun::Release => Err(inconsistent("lock is not held")),
                _ => Err(inconsistent("mutex supports acquire and release")),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cas_register_steps() {
        let m = Model::cas_register();
        let m = m.step(Fun::Write, &Value::Int(1)).unwrap();
        assert_eq!(m, Model::CasRegister(Some(1)));

        let m = m.step(Fun::Cas, &Value::ints([1, 2])).unwrap();
        assert_eq!(m, Model::CasRegister(Some(2)));

        assert!(m.step(Fun::Cas, &Value::ints([1, 3])).is_err());
        assert!(m.step(Fun::Read, &Value::Int(2)).is_ok());
        assert!(m.step(Fun::Read, &Value::Int(1)).is_err());
        assert!(m.step(Fun::Read, &Value::Nil).is_ok());
    }

    #[test]
    fn cas_on_empty_register_fails() {
        let m = Model::cas_register();
        let err = m.step(Fun::Cas, &Value::ints([1, 2])).unwrap_err();
        assert_eq!(err.reason, "cas precondition does not hold");
    }

    #[test]
    fn counter_steps() {
        let m = Model::counter();
        let m = m.step(Fun::Add, &Value::Int(3)).unwrap();
        let m = m.step(Fun::Add, &Value::Int(-1)).unwrap();
        assert!(m.step(Fun::Read, &Value::Int(2)).is_ok());
        assert!(m.step(Fun::Read, &Value::Int(3)).is_err());
    }

    #[test]
    fn add_set_steps() {
        let m = Model::add_set();
        let m = m.step(Fun::Add, &Value::Int(1)).unwrap();
        let m = m.step(Fun::Add, &Value::Int(2)).unwrap();
        // Order of the observation does not matter.
        assert!(m.step(Fun::Read, &Value::ints([2, 1])).is_ok());
        assert!(m.step(Fun::Read, &Value::ints([1])).is_err());
    }

    #[test]
    fn mutex_steps() {
        let m = Model::mutex();
        let m = m.step(Fun::Acquire, &Value::Nil).unwrap();
        assert!(m.step(Fun::Acquire, &Value::Nil).is_err());
        let m = m.step(Fun::Release, &Value::Nil).unwrap();
        assert!(m.step(Fun::Release, &Value::Nil).is_err());
    }

    #[test]
    fn step_is_pure() {
        let m = Model::cas_register();
        let _ = m.step(Fun::Write, &Value::Int(9)).unwrap();
        assert_eq!(m, Model::CasRegister(None));
    }
}
