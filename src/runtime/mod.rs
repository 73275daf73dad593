//! The cooperative async runtime: promises and the single-threaded
//! event loop. Everything here runs on the evaluation thread; a
//! microtask is just a deferred closure in a FIFO queue.
//!
//! Ordering guarantees, by construction:
//! - continuations registered on a promise run in registration order;
//! - continuations never run before the current synchronous unit
//!   finishes, even when registered on an already-settled promise;
//! - `finally` continuations queue behind the `then`/`catch`
//!   continuations registered before them.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use crate::interpreter::value::Value;

type Microtask = Box<dyn FnOnce()>;

/// Fulfilled-or-rejected outcome delivered to continuations.
pub type Settlement = Result<Value, Value>;

#[derive(Default)]
pub struct EventLoop {
    queue: RefCell<VecDeque<Microtask>>,
}

impl EventLoop {
    pub fn new() -> Rc<EventLoop> {
        Rc::new(EventLoop::default())
    }

    pub fn enqueue(&self, task: Microtask) {
        self.queue.borrow_mut().push_back(task);
    }

    pub fn is_idle(&self) -> bool {
        self.queue.borrow().is_empty()
    }

    /// Run one queued microtask. Returns false when the queue is empty.
    pub fn step(&self) -> bool {
        let task = self.queue.borrow_mut().pop_front();
        match task {
            Some(task) => {
                task();
                true
            }
            None => false,
        }
    }

    /// Drain the queue, running continuations in enqueue order,
    /// including any they enqueue while running.
    pub fn drain(&self) {
        while self.step() {}
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PromiseState {
    Pending,
    Fulfilled,
    Rejected,
}

enum Inner {
    Pending(Vec<Box<dyn FnOnce(Settlement)>>),
    Settled(Settlement),
}

/// A promise-like future. Settling is one-shot: the first resolve or
/// reject wins and later calls are no-ops.
#[derive(Clone)]
pub struct Promise {
    inner: Rc<RefCell<Inner>>,
    event_loop: Rc<EventLoop>,
}

impl Promise {
    pub fn new(event_loop: Rc<EventLoop>) -> Promise {
        Promise {
            inner: Rc::new(RefCell::new(Inner::Pending(Vec::new()))),
            event_loop,
        }
    }

    pub fn fulfilled(event_loop: Rc<EventLoop>, value: Value) -> Promise {
        let promise = Promise::new(event_loop);
        promise.resolve(value);
        promise
    }

    pub fn rejected(event_loop: Rc<EventLoop>, error: Value) -> Promise {
        let promise = Promise::new(event_loop);
        promise.reject(error);
        promise
    }

    pub fn state(&self) -> PromiseState {
        match &*self.inner.borrow() {
            Inner::Pending(_) => PromiseState::Pending,
            Inner::Settled(Ok(_)) => PromiseState::Fulfilled,
            Inner::Settled(Err(_)) => PromiseState::Rejected,
        }
    }

    /// The settled value, if any. Pending promises have none.
    pub fn settlement(&self) -> Option<Settlement> {
        match &*self.inner.borrow() {
            Inner::Pending(_) => None,
            Inner::Settled(settlement) => Some(settlement.clone()),
        }
    }

    pub fn resolve(&self, value: Value) {
        self.settle(Ok(value));
    }

    pub fn reject(&self, error: Value) {
        self.settle(Err(error));
    }

    fn settle(&self, settlement: Settlement) {
        let continuations = {
            let mut inner = self.inner.borrow_mut();
            match &mut *inner {
                Inner::Pending(continuations) => {
                    let continuations = std::mem::take(continuations);
                    *inner = Inner::Settled(settlement.clone());
                    continuations
                }
                // Already settled: first caller won.
                Inner::Settled(_) => return,
            }
        };
        for continuation in continuations {
            let settlement = settlement.clone();
            self.event_loop
                .enqueue(Box::new(move || continuation(settlement)));
        }
    }

    /// Register a continuation for whichever way the promise settles.
    /// Never invoked synchronously: on an already-settled promise the
    /// call goes through the microtask queue.
    pub fn subscribe(&self, continuation: impl FnOnce(Settlement) + 'static) {
        let mut inner = self.inner.borrow_mut();
        match &mut *inner {
            Inner::Pending(continuations) => {
                continuations.push(Box::new(continuation));
            }
            Inner::Settled(settlement) => {
                let settlement = settlement.clone();
                self.event_loop
                    .enqueue(Box::new(move || continuation(settlement)));
            }
        }
    }

    pub fn then(&self, on_fulfilled: impl FnOnce(Value) + 'static) {
        self.subscribe(move |settlement| {
            if let Ok(value) = settlement {
                on_fulfilled(value);
            }
        });
    }

    pub fn catch(&self, on_rejected: impl FnOnce(Value) + 'static) {
        self.subscribe(move |settlement| {
            if let Err(error) = settlement {
                on_rejected(error);
            }
        });
    }

    pub fn finally(&self, on_settled: impl FnOnce() + 'static) {
        self.subscribe(move |_| on_settled());
    }
}

/// Combine promises: fulfills with the values in input order once all
/// inputs fulfilled; rejects with the first rejection observed. The
/// remaining inputs are neither awaited nor cancelled.
pub fn all(event_loop: &Rc<EventLoop>, promises: Vec<Promise>) -> Promise {
    let combined = Promise::new(event_loop.clone());
    if promises.is_empty() {
        combined.resolve(Value::array(Vec::new()));
        return combined;
    }
    let results: Rc<RefCell<Vec<Option<Value>>>> =
        Rc::new(RefCell::new(vec![None; promises.len()]));
    let remaining = Rc::new(RefCell::new(promises.len()));
    for (index, promise) in promises.iter().enumerate() {
        let combined = combined.clone();
        let results = results.clone();
        let remaining = remaining.clone();
        promise.subscribe(move |settlement| match settlement {
            Ok(value) => {
                results.borrow_mut()[index] = Some(value);
                let mut remaining = remaining.borrow_mut();
                *remaining -= 1;
                if *remaining == 0 {
                    let values = results
                        .borrow_mut()
                        .iter_mut()
                        .map(|slot| slot.take().unwrap_or(Value::Void))
                        .collect();
                    combined.resolve(Value::array(values));
                }
            }
            Err(error) => {
                combined.reject(error);
            }
        });
    }
    combined
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn int(n: i32) -> Value {
        Value::Int(n)
    }

    #[test]
    fn settle_is_idempotent_first_caller_wins() {
        let event_loop = EventLoop::new();
        let promise = Promise::new(event_loop.clone());
        promise.resolve(int(1));
        promise.resolve(int(2));
        promise.reject(Value::string("late"));
        assert_eq!(promise.state(), PromiseState::Fulfilled);
        assert!(matches!(promise.settlement(), Some(Ok(Value::Int(1)))));
    }

    #[test]
    fn continuations_on_settled_promise_are_not_synchronous() {
        let event_loop = EventLoop::new();
        let promise = Promise::fulfilled(event_loop.clone(), int(5));
        let ran = Rc::new(Cell::new(false));
        let flag = ran.clone();
        promise.then(move |_| flag.set(true));
        assert!(!ran.get(), "continuation must wait for the queue");
        event_loop.drain();
        assert!(ran.get());
    }

    #[test]
    fn continuations_run_in_registration_order() {
        let event_loop = EventLoop::new();
        let promise = Promise::new(event_loop.clone());
        let order = Rc::new(RefCell::new(Vec::new()));
        for label in ["first", "second", "third"] {
            let order = order.clone();
            promise.subscribe(move |_| order.borrow_mut().push(label));
        }
        promise.resolve(int(0));
        event_loop.drain();
        assert_eq!(*order.borrow(), vec!["first", "second", "third"]);
    }

    #[test]
    fn finally_queues_behind_earlier_continuations() {
        let event_loop = EventLoop::new();
        let promise = Promise::new(event_loop.clone());
        let order = Rc::new(RefCell::new(Vec::new()));
        let o = order.clone();
        promise.then(move |_| o.borrow_mut().push("then"));
        let o = order.clone();
        promise.finally(move || o.borrow_mut().push("finally"));
        promise.resolve(int(0));
        event_loop.drain();
        assert_eq!(*order.borrow(), vec!["then", "finally"]);
    }

    #[test]
    fn all_of_empty_fulfills_with_empty_array() {
        let event_loop = EventLoop::new();
        let combined = all(&event_loop, Vec::new());
        assert_eq!(combined.state(), PromiseState::Fulfilled);
        let Some(Ok(Value::Array(items))) = combined.settlement() else {
            panic!("expected fulfilled array");
        };
        assert!(items.borrow().is_empty());
    }

    #[test]
    fn all_preserves_input_order_not_completion_order() {
        let event_loop = EventLoop::new();
        let first = Promise::new(event_loop.clone());
        let second = Promise::new(event_loop.clone());
        let combined = all(&event_loop, vec![first.clone(), second.clone()]);
        second.resolve(int(2));
        first.resolve(int(1));
        event_loop.drain();
        let Some(Ok(Value::Array(items))) = combined.settlement() else {
            panic!("expected fulfilled array");
        };
        let items = items.borrow();
        assert!(matches!(items[0], Value::Int(1)));
        assert!(matches!(items[1], Value::Int(2)));
    }

    #[test]
    fn all_rejects_on_first_rejection_regardless_of_others() {
        let event_loop = EventLoop::new();
        let slow = Promise::new(event_loop.clone());
        let failing = Promise::new(event_loop.clone());
        let combined = all(&event_loop, vec![slow.clone(), failing.clone()]);
        failing.reject(Value::string("boom"));
        event_loop.drain();
        assert_eq!(combined.state(), PromiseState::Rejected);
        // The other input never settles; the combined outcome stands.
        assert_eq!(slow.state(), PromiseState::Pending);
        let Some(Err(Value::Str(message))) = combined.settlement() else {
            panic!("expected rejection");
        };
        assert_eq!(&*message, "boom");
    }
}
