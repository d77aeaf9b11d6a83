//! Rates are refreshed every few tens of seconds while quotes are printed on
//! their own period, so the rate feed hands its newest snapshot over through
//! an atomic pointer swap instead of a lock.
//!
//! Handoff is single consumer: the reader swaps in an empty box and keeps
//! what it got back.



use std::sync::atomic::{
    AtomicPtr,
    Ordering,
};



/// Struct that allows user to swap heap allocated structs atomically.
#[derive(Debug)]
pub struct AtomicSwap<T> {
    ptr: AtomicPtr<T>,
}



impl<T: Send> AtomicSwap<T> {
    pub fn new(ptr: Box<T>) -> Self {
        Self {
            ptr: AtomicPtr::new(Box::<T>::into_raw(ptr)),
        }
    }



    /// Swaps Box pointers atomically, returns previously held value.
    pub fn swap(&self, ptr: Box<T>) -> Box<T> {
        let ptr_new = Box::<T>::into_raw(ptr);
        let ptr_prev = self.ptr.swap(ptr_new, Ordering::AcqRel);

        // This is safe, because we always swap valid and owned pointer.
        unsafe {
            Box::from_raw(ptr_prev)
        }
    }
}



impl<T> Drop for AtomicSwap<T> {
    fn drop(&mut self) {
        let ptr = *self.ptr.get_mut();

        // The pointer always comes from Box::into_raw and nobody else can hold
        // it while we have &mut self.
        unsafe {
            drop(Box::from_raw(ptr));
        }
    }
}
