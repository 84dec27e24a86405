use std::fmt::Debug;
use std::hash::Hash;
use std::sync::Arc;
use uuid::Uuid;

/// An opaque identifier naming one unit of fetch work (e.g. a challenge ID).
///
/// Blank keys are ignored by `load`.
pub trait QueueKey: Eq + Hash + Clone + Debug + Send + Sync + 'static {
    fn is_blank(&self) -> bool {
        false
    }
}

impl QueueKey for String {
    fn is_blank(&self) -> bool {
        self.is_empty()
    }
}

impl QueueKey for Arc<str> {
    fn is_blank(&self) -> bool {
        self.is_empty()
    }
}

impl QueueKey for &'static str {
    fn is_blank(&self) -> bool {
        self.is_empty()
    }
}

impl QueueKey for Uuid {
    fn is_blank(&self) -> bool {
        self.is_nil()
    }
}

macro_rules! zero_is_blank {
    ($($t:ty),*) => {
        $(impl QueueKey for $t {
            fn is_blank(&self) -> bool {
                *self == 0
            }
        })*
    };
}

zero_is_blank!(u32, u64, i32, i64, usize);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_keys() {
        assert!(String::new().is_blank());
        assert!(!"c1".to_string().is_blank());
        assert!(Arc::<str>::from("").is_blank());
        assert!("".is_blank());
        assert!(Uuid::nil().is_blank());
        assert!(!Uuid::new_v4().is_blank());
        assert!(0u64.is_blank());
        assert!(!30054321u64.is_blank());
    }
}
