//! Wing-Gong/Lowe linearizability search.
//!
//! The history becomes an event list of call and return points. The
//! search walks the list front to back: at a call it may linearize the
//! operation immediately (if the model allows it and the resulting
//! configuration is new); at a return of a not-yet-linearized operation
//! it must backtrack, because an operation has to take effect inside its
//! own window. Operations with no return (crashed, indeterminate) may
//! linearize at any later point or never, so they carry no return event
//! and never force a backtrack.
//!
//! The visited-set is keyed on (model state, linearized-set); the
//! linearized-set is a dense bitset. Everything is iterative; the undo
//! stack is explicit, so long histories cannot overflow the call stack.

use hashbrown::HashSet;

use crate::checker::anomaly::Counterexample;
use crate::checker::compose::CheckCtx;
use crate::history::{Fun, Value};
use crate::linear::model::Model;

/// One operation prepared for search: its window and the payload to step
/// the model with (the completion's observed value when there is one).
#[derive(Debug, Clone)]
pub struct CallRec {
    pub invoke: usize,
    pub ret: Option<usize>,
    pub f: Fun,
    pub value: Value,
}

/// Search outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// A witnessing linearization, as call positions in order.
    Linearizable { order: Vec<usize> },
    Nonlinearizable(Counterexample),
    Timeout,
}

/// Dense bitset over call ids; the memoization key half.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct LinSet(Vec<u64>);

impl LinSet {
    fn new(n: usize) -> Self {
        Self(vec![0; n.div_ceil(64)])
    }

    fn set(&mut self, i: usize) {
        self.0[i / 64] |= 1 << (i % 64);
    }

    fn clear(&mut self, i: usize) {
        self.0[i / 64] &= !(1 << (i % 64));
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Event {
    Call(usize),
    Return(usize),
}

struct EventList {
    events: Vec<Event>,
    next: Vec<usize>,
    prev: Vec<usize>,
    head: usize,
    tail: usize,
    call_event: Vec<usize>,
    return_event: Vec<Option<usize>>,
}

impl EventList {
    fn new(calls: &[CallRec]) -> Self {
        // (history position, event); completed calls contribute a return.
        let mut ordered: Vec<(usize, Event)> = Vec::with_capacity(calls.len() * 2);
        for (i, call) in calls.iter().enumerate() {
            ordered.push((call.invoke, Event::Call(i)));
            if let Some(ret) = call.ret {
                ordered.push((ret, Event::Return(i)));
            }
        }
        ordered.sort_unstable_by_key(|&(pos, _)| pos);

        let events: Vec<Event> = ordered.into_iter().map(|(_, e)| e).collect();
        let n = events.len();
        let head = n;
        let tail = n + 1;
        let mut next = vec![0; n + 2];
        let mut prev = vec![0; n + 2];
        let mut cursor = head;
        for e in 0..n {
            next[cursor] = e;
            prev[e] = cursor;
            cursor = e;
        }
        next[cursor] = tail;
        prev[tail] = cursor;

        let mut call_event = vec![usize::MAX; calls.len()];
        let mut return_event = vec![None; calls.len()];
        for (e, event) in events.iter().enumerate() {
            match *event {
                Event::Call(i) => call_event[i] = e,
                Event::Return(i) => return_event[i] = Some(e),
            }
        }

        Self {
            events,
            next,
            prev,
            head,
            tail,
            call_event,
            return_event,
        }
    }

    fn unlink(&mut self, e: usize) {
        let (p, n) = (self.prev[e], self.next[e]);
        self.next[p] = n;
        self.prev[n] = p;
    }

    fn relink(&mut self, e: usize) {
        let (p, n) = (self.prev[e], self.next[e]);
        self.next[p] = e;
        self.prev[n] = e;
    }

    /// Remove a linearized call's events from the walk.
    fn lift(&mut self, call: usize) {
        self.unlink(self.call_event[call]);
        if let Some(ret) = self.return_event[call] {
            self.unlink(ret);
        }
    }

    /// Undo `lift`; relink order is the reverse of unlink order.
    fn unlift(&mut self, call: usize) {
        if let Some(ret) = self.return_event[call] {
            self.relink(ret);
        }
        self.relink(self.call_event[call]);
    }
}

/// Decide whether some linearization of `calls` is consistent with
/// `initial`. Polls the cancellation flag on every iteration.
#[must_use]
pub fn search(initial: &Model, calls: &[CallRec], ctx: &CheckCtx) -> Outcome {
    let mut list = EventList::new(calls);
    let mut state = initial.clone();
    let mut linearized = LinSet::new(calls.len());
    let mut undo: Vec<(usize, Model)> = Vec::new();
    let mut cache: HashSet<(Model, LinSet)> = HashSet::new();
    cache.insert((state.clone(), linearized.clone()));

    // Deepest failure seen: the longest linearizable prefix makes the
    // most informative counterexample.
    let mut best: Option<Counterexample> = None;
    let mut best_depth = 0usize;

    let mut entry = list.next[list.head];
    loop {
        if ctx.expired() {
            return Outcome::Timeout;
        }
        if entry == list.tail {
            return Outcome::Linearizable {
                order: undo.iter().map(|&(i, _)| calls[i].invoke).collect(),
            };
        }
        match list.events[entry] {
            Event::Call(i) => {
                let call = &calls[i];
                match state.step(call.f, &call.value) {
                    Ok(next_state) => {
                        let mut next_set = linearized.clone();
                        next_set.set(i);
                        if cache.insert((next_state.clone(), next_set.clone())) {
                            undo.push((i, state));
                            state = next_state;
                            linearized = next_set;
                            list.lift(i);
                            entry = list.next[list.head];
                        } else {
                            entry = list.next[entry];
                        }
                    }
                    Err(_) => entry = list.next[entry],
                }
            }
            Event::Return(i) => {
                // `i` must linearize before this point and has not; the
                // first (shallowest) such block is the minimal witness.
                let blocked = calls[i].ret.expect("return events imply a completion");
                if best.is_none() || undo.len() > best_depth {
                    best_depth = undo.len();
                    best = Some(Counterexample {
                        op: blocked,
                        prefix: blocked,
                        linearized: undo
                            .iter()
                            .map(|&(j, _)| calls[j].ret.unwrap_or(calls[j].invoke))
                            .collect(),
                        state: format!("{state:?}"),
                    });
                }
                match undo.pop() {
                    Some((j, previous)) => {
                        state = previous;
                        linearized.clear(j);
                        list.unlift(j);
                        entry = list.next[list.call_event[j]];
                    }
                    None => {
                        return Outcome::Nonlinearizable(best.expect("failure was recorded"));
                    }
                }
            }
        }
    }
}
