use std::time::{Duration, Instant};

pub const SHORT_LIFETIME: Duration = Duration::from_secs(5);
/// Upload and sample dataset outcomes stay a little longer.
pub const LONG_LIFETIME: Duration = Duration::from_secs(6);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastKind {
    Success,
    Error,
    Info,
}

#[derive(Debug, Clone)]
pub struct Toast {
    pub kind: ToastKind,
    pub message: String,
    expires_at: Instant,
}

#[derive(Debug, Default)]
pub struct Toasts {
    items: Vec<Toast>,
}

impl Toasts {
    pub fn push(&mut self, kind: ToastKind, message: impl Into<String>, lifetime: Duration) {
        self.push_at(kind, message, lifetime, Instant::now());
    }

    pub fn push_at(
        &mut self,
        kind: ToastKind,
        message: impl Into<String>,
        lifetime: Duration,
        now: Instant,
    ) {
        self.items.push(Toast {
            kind,
            message: message.into(),
            expires_at: now + lifetime,
        });
    }

    /// Drops expired toasts and returns the time until the next one expires.
    pub fn prune(&mut self, now: Instant) -> Option<Duration> {
        self.items.retain(|t| t.expires_at > now);
        self.items.iter().map(|t| t.expires_at - now).min()
    }

    pub fn dismiss(&mut self, index: usize) {
        if index < self.items.len() {
            self.items.remove(index);
        }
    }

    pub fn items(&self) -> &[Toast] {
        &self.items
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expire_after_lifetime() {
        let t0 = Instant::now();
        let mut toasts = Toasts::default();
        toasts.push_at(ToastKind::Success, "uploaded", LONG_LIFETIME, t0);
        toasts.push_at(ToastKind::Error, "export failed", SHORT_LIFETIME, t0);

        assert_eq!(toasts.prune(t0 + Duration::from_secs(1)), Some(Duration::from_secs(4)));
        assert_eq!(toasts.items().len(), 2);

        assert_eq!(toasts.prune(t0 + Duration::from_secs(5)), Some(Duration::from_secs(1)));
        assert_eq!(toasts.items().len(), 1);
        assert_eq!(toasts.items()[0].message, "uploaded");

        assert_eq!(toasts.prune(t0 + Duration::from_secs(6)), None);
        assert!(toasts.items().is_empty());
    }

    #[test]
    fn dismiss_out_of_range_is_ignored() {
        let mut toasts = Toasts::default();
        toasts.push(ToastKind::Info, "hi", SHORT_LIFETIME);
        toasts.dismiss(3);
        assert_eq!(toasts.items().len(), 1);
        toasts.dismiss(0);
        assert!(toasts.items().is_empty());
    }
}
