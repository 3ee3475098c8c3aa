use crate::core::node::NodeId;

/// Slot storage with stable indices.
///
/// Slots freed with [`remove`](Arena::remove) are reused by later inserts.
/// Slots freed with [`retire`](Arena::retire) never are, so an id handed out
/// to a caller can not come to address a different value.
pub(crate) struct Arena<T> {
    slots: Vec<Option<T>>,
    free: Vec<usize>,
    retired: usize,
}

impl<T> Default for Arena<T> {
    fn default() -> Self {
        Arena {
            slots: Vec::new(),
            free: Vec::new(),
            retired: 0,
        }
    }
}

impl<T> Arena<T> {
    pub fn insert(&mut self, value: T) -> NodeId {
        match self.free.pop() {
            Some(index) => {
                self.slots[index] = Some(value);
                NodeId(index)
            }
            None => {
                self.slots.push(Some(value));
                NodeId(self.slots.len() - 1)
            }
        }
    }

    pub fn remove(&mut self, id: NodeId) -> Option<T> {
        let value = self.slots.get_mut(id.0)?.take()?;
        self.free.push(id.0);
        Some(value)
    }

    pub fn retire(&mut self, id: NodeId) -> Option<T> {
        let value = self.slots.get_mut(id.0)?.take()?;
        self.retired += 1;
        Some(value)
    }

    pub fn get(&self, id: NodeId) -> Option<&T> {
        self.slots.get(id.0)?.as_ref()
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut T> {
        self.slots.get_mut(id.0)?.as_mut()
    }

    pub fn len(&self) -> usize {
        self.slots.len() - self.free.len() - self.retired
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &T)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_ref().map(|v| (NodeId(i), v)))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (NodeId, &mut T)> {
        self.slots
            .iter_mut()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_mut().map(|v| (NodeId(i), v)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arena_reuses_freed_slots() {
        let mut arena = Arena::default();
        let a = arena.insert("a");
        let b = arena.insert("b");
        assert_eq!(arena.remove(a), Some("a"));
        assert_eq!(arena.remove(a), None);
        assert_eq!(arena.len(), 1);
        let c = arena.insert("c");
        assert_eq!(c, a);
        assert_eq!(arena.get(b), Some(&"b"));
        let ids: Vec<NodeId> = arena.iter().map(|(id, _)| id).collect();
        assert_eq!(ids, vec![a, b]);
    }

    #[test]
    fn test_retired_slots_stay_empty() {
        let mut arena = Arena::default();
        let a = arena.insert("a");
        assert_eq!(arena.retire(a), Some("a"));
        assert_eq!(arena.retire(a), None);
        assert_eq!(arena.len(), 0);
        let b = arena.insert("b");
        assert_ne!(b, a);
        assert_eq!(arena.get(a), None);
        assert_eq!(arena.len(), 1);
    }
}
