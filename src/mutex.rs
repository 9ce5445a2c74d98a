/// Common interface for mutex implementations guarding the I2C bus.
///
/// The driver never talks to the bus directly.  Every logical operation that
/// needs more than one bus access (bank transitions, read-modify-write,
/// interrupt capture) runs inside a single `lock()` call, so whatever mutex is
/// chosen here is what keeps those sequences from interleaving with other users
/// of the bus.  Implementations exist for:
///
/// | Mutex | Feature Name | Notes |
/// | --- | --- | --- |
/// | [`core::cell::RefCell`] | _always available_ | For sharing within a single execution context. |
/// | [`std::sync::Mutex`] | _always available_ | Needed when interrupts are serviced on other threads. |
/// | [`std::sync::Arc`] | _always available_ | One bus shared by several chips. |
/// | [`critical_section::Mutex`][mutex-cs] | `critical-section` | Wrapping a `RefCell`. |
///
/// [mutex-cs]: https://docs.rs/critical-section/latest/critical_section/struct.Mutex.html
///
/// For other mutex types, a custom implementation is needed.  Due to the orphan rule, it might be
/// necessary to wrap it in a newtype:
///
/// ```
/// struct MyMutex<T>(std::sync::Mutex<T>);
///
/// impl<T> mcp23017_irq::SharedMutex for MyMutex<T> {
///     type Inner = T;
///
///     fn create(v: T) -> Self {
///         Self(std::sync::Mutex::new(v))
///     }
///
///     fn lock<R, F: FnOnce(&mut Self::Inner) -> R>(&self, f: F) -> R {
///         let mut v = self.0.lock().unwrap();
///         f(&mut v)
///     }
/// }
/// ```
pub trait SharedMutex {
    /// The value wrapped inside this mutex, usually the I2C bus.
    type Inner;

    /// Create a new mutex of this type.
    fn create(v: Self::Inner) -> Self;

    /// Lock the mutex and give a closure access to the value inside.
    fn lock<R, F: FnOnce(&mut Self::Inner) -> R>(&self, f: F) -> R;
}

impl<T> SharedMutex for core::cell::RefCell<T> {
    type Inner = T;

    fn create(v: Self::Inner) -> Self {
        core::cell::RefCell::new(v)
    }

    fn lock<R, F: FnOnce(&mut Self::Inner) -> R>(&self, f: F) -> R {
        let mut v = self.borrow_mut();
        f(&mut v)
    }
}

impl<T> SharedMutex for std::sync::Mutex<T> {
    type Inner = T;

    fn create(v: Self::Inner) -> Self {
        std::sync::Mutex::new(v)
    }

    fn lock<R, F: FnOnce(&mut Self::Inner) -> R>(&self, f: F) -> R {
        // A panic while holding the bus leaves nothing half-updated on our side.
        let mut v = self.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        f(&mut v)
    }
}

impl<M: SharedMutex> SharedMutex for std::sync::Arc<M> {
    type Inner = M::Inner;

    fn create(v: Self::Inner) -> Self {
        std::sync::Arc::new(M::create(v))
    }

    fn lock<R, F: FnOnce(&mut Self::Inner) -> R>(&self, f: F) -> R {
        M::lock(self, f)
    }
}

#[cfg(feature = "critical-section")]
impl<T> SharedMutex for critical_section::Mutex<core::cell::RefCell<T>> {
    type Inner = T;

    fn create(v: Self::Inner) -> Self {
        critical_section::Mutex::new(core::cell::RefCell::new(v))
    }

    fn lock<R, F: FnOnce(&mut Self::Inner) -> R>(&self, f: F) -> R {
        critical_section::with(|cs| {
            let mut v = self.borrow_ref_mut(cs);
            f(&mut v)
        })
    }
}
