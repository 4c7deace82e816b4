use crate::error::BatchError;
use crate::task::TaskArgs;

use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;

/// The set of tasks registered for a batch, keyed by caller identifier.
///
/// Registration order is remembered and drives dispatch and collection order.
/// Identifiers must be unique; re-registering one is an error rather than a
/// silent overwrite.
pub struct TaskSet<I, V> {
  order: Vec<I>,
  entries: HashMap<I, TaskArgs<V>>,
}

impl<I, V> TaskSet<I, V>
where
  I: Clone + Eq + Hash + Debug,
{
  pub fn new() -> Self {
    TaskSet {
      order: Vec::new(),
      entries: HashMap::new(),
    }
  }

  /// Registers one task. Rejects duplicate identifiers and argument shapes
  /// that hold nothing at all.
  pub fn insert(&mut self, id: I, args: TaskArgs<V>) -> Result<(), BatchError> {
    if args.is_empty() {
      return Err(BatchError::MissingArguments {
        id: format!("{:?}", id),
      });
    }
    if self.entries.contains_key(&id) {
      return Err(BatchError::DuplicateIdentifier {
        id: format!("{:?}", id),
      });
    }
    self.order.push(id.clone());
    self.entries.insert(id, args);
    Ok(())
  }

  /// The arguments registered under `id`, if any.
  pub fn get(&self, id: &I) -> Option<&TaskArgs<V>> {
    self.entries.get(id)
  }

  pub fn contains(&self, id: &I) -> bool {
    self.entries.contains_key(id)
  }

  /// Identifiers in registration order.
  pub fn ids(&self) -> &[I] {
    &self.order
  }

  /// `(identifier, arguments)` pairs in registration order.
  pub fn iter(&self) -> impl Iterator<Item = (&I, &TaskArgs<V>)> {
    self
      .order
      .iter()
      .filter_map(|id| self.entries.get(id).map(|args| (id, args)))
  }

  pub fn len(&self) -> usize {
    self.order.len()
  }

  pub fn is_empty(&self) -> bool {
    self.order.is_empty()
  }
}

impl<I, V> Default for TaskSet<I, V>
where
  I: Clone + Eq + Hash + Debug,
{
  fn default() -> Self {
    Self::new()
  }
}
