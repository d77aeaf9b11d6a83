use std::sync::atomic::{
    AtomicUsize,
    Ordering,
};



#[derive(Default)]
pub struct SharedState {
    // While this is 0, all tasks keep polling, pricing and printing. When this
    // is set to 1, concurrent tasks should finish their current iteration and
    // return.
    pub shut_down: AtomicUsize,
}



impl SharedState {
    /// Relaxed load, because we do not care on nanosecond shut down
    /// precission. We just have to shut down at some point.
    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::Relaxed) != 0
    }


    pub fn shut_down(&self) {
        self.shut_down.store(1, Ordering::SeqCst);
    }
}
