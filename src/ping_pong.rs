//! Front/back pairs for double-buffered GPU resources.

/// Two equally-shaped resources where passes read `front` and write `back`.
///
/// Swapping only flips which slot is the front; the resources never move,
/// so bind groups created per slot stay valid.
#[derive(Debug)]
pub struct PingPong<T> {
    slots: [T; 2],
    front_is_b: bool,
}

impl<T> PingPong<T> {
    /// Create a pair with `a` in front.
    pub fn new(a: T, b: T) -> Self {
        Self {
            slots: [a, b],
            front_is_b: false,
        }
    }

    /// Resource read by passes this frame.
    pub fn front(&self) -> &T {
        &self.slots[self.front_slot()]
    }

    /// Resource written by passes this frame.
    pub fn back(&self) -> &T {
        &self.slots[1 - self.front_slot()]
    }

    /// Slot index (0 or 1) currently in front.
    pub fn front_slot(&self) -> usize {
        usize::from(self.front_is_b)
    }

    /// Exchange front and back.
    pub fn swap(&mut self) {
        self.front_is_b = !self.front_is_b;
    }

    /// Both resources, in slot order.
    pub fn slots(&self) -> &[T; 2] {
        &self.slots
    }
}
