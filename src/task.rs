use std::collections::BTreeMap;
use std::sync::Arc;

/// The worker shared by every task in a batch.
///
/// It receives the [`TaskArgs`] registered for one task and produces that
/// task's result. Workers signal failure by panicking; a worker that wants
/// typed errors can return `R = Result<T, E>` and the batch will treat the
/// `Err` as an ordinary resolved value.
pub type WorkerFn<V, R> = Arc<dyn Fn(TaskArgs<V>) -> R + Send + Sync + 'static>;

/// The arguments registered for one task.
///
/// A task carries positional arguments, named arguments, or both. The missing
/// half simply does not exist in the shape, so a worker can match on what it
/// was actually given instead of probing placeholder emptiness.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskArgs<V> {
  /// Positional arguments only.
  Positional(Vec<V>),
  /// Named arguments only.
  Named(BTreeMap<String, V>),
  /// Both positional and named arguments.
  Mixed {
    positional: Vec<V>,
    named: BTreeMap<String, V>,
  },
}

impl<V> TaskArgs<V> {
  /// Positional-only shape.
  pub fn positional(values: impl IntoIterator<Item = V>) -> Self {
    TaskArgs::Positional(values.into_iter().collect())
  }

  /// Named-only shape.
  pub fn named<K, E>(entries: E) -> Self
  where
    K: Into<String>,
    E: IntoIterator<Item = (K, V)>,
  {
    TaskArgs::Named(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
  }

  /// Both-halves shape.
  pub fn mixed<K, E>(positional: impl IntoIterator<Item = V>, named: E) -> Self
  where
    K: Into<String>,
    E: IntoIterator<Item = (K, V)>,
  {
    TaskArgs::Mixed {
      positional: positional.into_iter().collect(),
      named: named.into_iter().map(|(k, v)| (k.into(), v)).collect(),
    }
  }

  /// Wraps a single bare value as a one-element positional shape.
  pub fn single(value: V) -> Self {
    TaskArgs::Positional(vec![value])
  }

  /// The positional arguments, empty when the shape carries none.
  pub fn positional_args(&self) -> &[V] {
    match self {
      TaskArgs::Positional(values) => values,
      TaskArgs::Named(_) => &[],
      TaskArgs::Mixed { positional, .. } => positional,
    }
  }

  /// The named arguments, or `None` when the shape carries none.
  pub fn named_args(&self) -> Option<&BTreeMap<String, V>> {
    match self {
      TaskArgs::Positional(_) => None,
      TaskArgs::Named(named) => Some(named),
      TaskArgs::Mixed { named, .. } => Some(named),
    }
  }

  /// Looks up one named argument by key.
  pub fn get_named(&self, key: &str) -> Option<&V> {
    self.named_args().and_then(|named| named.get(key))
  }

  /// True when the shape holds no arguments at all. Such shapes are rejected
  /// at registration time.
  pub fn is_empty(&self) -> bool {
    match self {
      TaskArgs::Positional(values) => values.is_empty(),
      TaskArgs::Named(named) => named.is_empty(),
      TaskArgs::Mixed { positional, named } => positional.is_empty() && named.is_empty(),
    }
  }

  /// Short shape name for log lines.
  pub(crate) fn shape(&self) -> &'static str {
    match self {
      TaskArgs::Positional(_) => "positional",
      TaskArgs::Named(_) => "named",
      TaskArgs::Mixed { .. } => "mixed",
    }
  }
}

impl<V> From<Vec<V>> for TaskArgs<V> {
  fn from(values: Vec<V>) -> Self {
    TaskArgs::Positional(values)
  }
}

impl<V, const N: usize> From<[V; N]> for TaskArgs<V> {
  fn from(values: [V; N]) -> Self {
    TaskArgs::Positional(values.into())
  }
}

impl<V> From<BTreeMap<String, V>> for TaskArgs<V> {
  fn from(named: BTreeMap<String, V>) -> Self {
    TaskArgs::Named(named)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_single_wraps_bare_value_as_positional() {
    let args = TaskArgs::single(7);
    assert_eq!(args, TaskArgs::Positional(vec![7]));
    assert_eq!(args.positional_args(), &[7]);
    assert!(args.named_args().is_none());
  }

  #[test]
  fn test_named_shape_exposes_lookup() {
    let args: TaskArgs<i32> = TaskArgs::named([("base", 4), ("mult", 3)]);
    assert_eq!(args.get_named("base"), Some(&4));
    assert_eq!(args.get_named("mult"), Some(&3));
    assert_eq!(args.get_named("absent"), None);
    assert!(args.positional_args().is_empty());
  }

  #[test]
  fn test_mixed_shape_carries_both_halves() {
    let args = TaskArgs::mixed([1, 2], [("scale", 10)]);
    assert_eq!(args.positional_args(), &[1, 2]);
    assert_eq!(args.get_named("scale"), Some(&10));
    assert_eq!(args.shape(), "mixed");
  }

  #[test]
  fn test_emptiness_checks_every_shape() {
    assert!(TaskArgs::<i32>::positional([]).is_empty());
    assert!(TaskArgs::<i32>::Named(BTreeMap::new()).is_empty());
    assert!(TaskArgs::<i32>::mixed([], std::iter::empty::<(String, i32)>()).is_empty());
    assert!(!TaskArgs::single(1).is_empty());
    assert!(!TaskArgs::named([("k", 1)]).is_empty());
  }

  #[test]
  fn test_from_conversions_produce_positional() {
    let from_vec: TaskArgs<u8> = vec![1, 2, 3].into();
    assert_eq!(from_vec, TaskArgs::Positional(vec![1, 2, 3]));

    let from_array: TaskArgs<u8> = [9, 8].into();
    assert_eq!(from_array, TaskArgs::Positional(vec![9, 8]));
  }
}
