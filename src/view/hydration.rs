/// A value that becomes available once, after the client environment is known
/// (local time zone, terminal size). Views render a placeholder while pending.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Deferred<T> {
    #[default]
    Pending,
    Ready(T),
}

impl<T> Deferred<T> {
    /// Resolves a pending value. Returns false, leaving the value untouched,
    /// when it was already resolved.
    pub fn resolve(&mut self, value: T) -> bool {
        match self {
            Deferred::Pending => {
                *self = Deferred::Ready(value);
                true
            }
            Deferred::Ready(_) => false,
        }
    }

    /// Resolves with `f` only if still pending; `f` is not called otherwise.
    pub fn resolve_with(&mut self, f: impl FnOnce() -> T) -> bool {
        if self.is_ready() {
            return false;
        }
        self.resolve(f())
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Deferred::Ready(_))
    }

    pub fn get(&self) -> Option<&T> {
        match self {
            Deferred::Ready(v) => Some(v),
            Deferred::Pending => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_exactly_once() {
        let mut d: Deferred<String> = Deferred::default();
        assert!(d.get().is_none());
        assert!(d.resolve("Today 7:30 PM".to_string()));
        assert!(!d.resolve("Tomorrow 1:00 AM".to_string()));
        assert_eq!(d.get().map(String::as_str), Some("Today 7:30 PM"));
    }

    #[test]
    fn resolve_with_skips_work_once_ready() {
        let mut d = Deferred::Pending;
        let mut calls = 0;
        assert!(d.resolve_with(|| {
            calls += 1;
            1
        }));
        assert!(!d.resolve_with(|| {
            calls += 1;
            2
        }));
        assert_eq!(calls, 1);
        assert_eq!(d, Deferred::Ready(1));
    }
}
