use crossbeam::channel::{unbounded, Receiver, Sender};
use parking_lot::Mutex;

/// A closed set of transitions over some state
pub trait Reducer {
    type State: Clone + Send + 'static;
    type Action;

    fn reduce(state: Self::State, action: Self::Action) -> Self::State;
}

/// Holds a state, applies actions to it, and tells subscribers about every new state.
pub struct StateStore<R>
where
    R: Reducer,
{
    state: Mutex<R::State>,
    subscribers: Mutex<Vec<Sender<R::State>>>,
}

impl<R> StateStore<R>
where
    R: Reducer,
{
    pub fn new(initial: R::State) -> Self {
        Self {
            state: Mutex::new(initial),
            subscribers: Default::default(),
        }
    }

    /// Returns a snapshot of the current state
    pub fn state(&self) -> R::State {
        self.state.lock().clone()
    }

    /// Reads from the current state without cloning all of it
    pub fn read<T>(&self, f: impl FnOnce(&R::State) -> T) -> T {
        f(&self.state.lock())
    }

    /// Applies an action and returns the new state
    pub fn dispatch(&self, action: R::Action) -> R::State {
        let mut state = self.state.lock();
        let next = R::reduce(state.clone(), action);
        *state = next.clone();

        // Notifying under the state lock keeps subscribers in dispatch order
        self.notify(&next);

        next
    }

    /// Returns a receiver that gets every state produced from now on
    pub fn subscribe(&self) -> Receiver<R::State> {
        let (sender, receiver) = unbounded();
        self.subscribers.lock().push(sender);

        receiver
    }

    fn notify(&self, state: &R::State) {
        self.subscribers
            .lock()
            .retain(|subscriber| subscriber.send(state.clone()).is_ok());
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }
}

impl<R> Default for StateStore<R>
where
    R: Reducer,
    R::State: Default,
{
    fn default() -> Self {
        Self::new(Default::default())
    }
}
