//! Correlation handles for planner requests
//!
//! The planner keeps a [`MasterNavRequest`] and hands the matching
//! [`NavRequest`] to the caller. Both refer to the same shared slot, so
//! updates made by the planner are visible to the caller immediately,
//! including partial data while the request is still processing.

use std::cell::RefCell;
use std::rc::Rc;

use crate::NavRequestState;

#[derive(Debug)]
struct RequestSlot<T> {
    state: NavRequestState,
    data: Option<T>,
}

/// Read-only view of a request, held by the caller
#[derive(Debug)]
pub struct NavRequest<T> {
    slot: Rc<RefCell<RequestSlot<T>>>,
}

impl<T> Clone for NavRequest<T> {
    fn clone(&self) -> Self {
        Self {
            slot: Rc::clone(&self.slot),
        }
    }
}

impl<T> NavRequest<T> {
    pub fn state(&self) -> NavRequestState {
        self.slot.borrow().state
    }

    /// True once the request is complete or failed
    pub fn is_finished(&self) -> bool {
        self.state().is_finished()
    }

    /// True if both handles refer to the same request
    pub fn ptr_eq(&self, other: &NavRequest<T>) -> bool {
        Rc::ptr_eq(&self.slot, &other.slot)
    }
}

impl<T: Clone> NavRequest<T> {
    /// A copy of the current request data, if any has been set
    pub fn data(&self) -> Option<T> {
        self.slot.borrow().data.clone()
    }
}

impl<T> PartialEq for NavRequest<T> {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl<T> Eq for NavRequest<T> {}

/// Producer side of a request
#[derive(Debug)]
pub struct MasterNavRequest<T> {
    request: NavRequest<T>,
}

impl<T> Default for MasterNavRequest<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> MasterNavRequest<T> {
    /// A processing request without data
    pub fn new() -> Self {
        Self::with_state(NavRequestState::Processing)
    }

    pub fn with_state(state: NavRequestState) -> Self {
        Self::build(state, None)
    }

    pub fn with_data(state: NavRequestState, data: T) -> Self {
        Self::build(state, Some(data))
    }

    fn build(state: NavRequestState, data: Option<T>) -> Self {
        Self {
            request: NavRequest {
                slot: Rc::new(RefCell::new(RequestSlot { state, data })),
            },
        }
    }

    /// The caller's handle. Every call returns the same handle.
    pub fn request(&self) -> &NavRequest<T> {
        &self.request
    }

    pub fn state(&self) -> NavRequestState {
        self.request.state()
    }

    pub fn is_finished(&self) -> bool {
        self.request.is_finished()
    }

    /// Replaces the state and data in one update
    pub fn set(&self, state: NavRequestState, data: T) {
        let mut slot = self.request.slot.borrow_mut();
        slot.state = state;
        slot.data = Some(data);
    }

    pub fn set_data(&self, data: T) {
        self.request.slot.borrow_mut().data = Some(data);
    }

    pub fn set_state(&self, state: NavRequestState) {
        self.request.slot.borrow_mut().state = state;
    }
}

impl<T: Clone> MasterNavRequest<T> {
    pub fn data(&self) -> Option<T> {
        self.request.data()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let master: MasterNavRequest<u32> = MasterNavRequest::new();
        assert_eq!(master.state(), NavRequestState::Processing);
        assert_eq!(master.data(), None);
        assert!(!master.is_finished());
        assert_eq!(master.request().state(), NavRequestState::Processing);
        assert_eq!(master.request().data(), None);
    }

    #[test]
    fn test_explicit_construction() {
        let master: MasterNavRequest<u32> = MasterNavRequest::with_state(NavRequestState::Failed);
        assert_eq!(master.state(), NavRequestState::Failed);
        assert!(master.request().is_finished());
        assert_eq!(master.data(), None);

        let master = MasterNavRequest::with_data(NavRequestState::Complete, 7u32);
        assert_eq!(master.state(), NavRequestState::Complete);
        assert_eq!(master.request().data(), Some(7));
    }

    #[test]
    fn test_request_is_stable() {
        let master: MasterNavRequest<u32> = MasterNavRequest::new();
        let a = master.request();
        let b = master.request();
        assert!(std::ptr::eq(a, b));
        assert!(a.ptr_eq(b));

        let held = master.request().clone();
        assert_eq!(&held, master.request());

        let other: MasterNavRequest<u32> = MasterNavRequest::new();
        assert_ne!(&held, other.request());
    }

    #[test]
    fn test_updates_visible_to_caller() {
        let master: MasterNavRequest<u32> = MasterNavRequest::new();
        let held = master.request().clone();

        master.set_data(3);
        assert_eq!(held.state(), NavRequestState::Processing);
        assert_eq!(held.data(), Some(3));

        master.set_state(NavRequestState::Failed);
        assert_eq!(held.state(), NavRequestState::Failed);
        assert!(held.is_finished());

        master.set(NavRequestState::Complete, 11);
        assert_eq!(held.state(), NavRequestState::Complete);
        assert_eq!(held.data(), Some(11));
    }
}
