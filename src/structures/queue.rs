use std::collections::VecDeque;

/// Очередь FIFO поверх `VecDeque`, извлечение за O(1).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Queue<T> {
    elements: VecDeque<T>,
}

impl<T> Queue<T> {
    pub fn new() -> Self {
        Self { elements: VecDeque::new() }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self { elements: VecDeque::with_capacity(capacity) }
    }

    /// Добавляет элемент в конец очереди.
    #[inline]
    pub fn enqueue(&mut self, item: T) {
        self.elements.push_back(item);
    }

    /// Извлекает первый элемент. `None`, если очередь пуста.
    #[inline]
    pub fn dequeue(&mut self) -> Option<T> {
        self.elements.pop_front()
    }

    #[inline]
    pub fn peek(&self) -> Option<&T> {
        self.elements.front()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.elements.len()
    }
}

impl<T> Default for Queue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> FromIterator<T> for Queue<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self { elements: iter.into_iter().collect() }
    }
}

impl<T> Extend<T> for Queue<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        self.elements.extend(iter);
    }
}

impl<T> IntoIterator for Queue<T> {
    type Item = T;
    type IntoIter = std::collections::vec_deque::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.elements.into_iter()
    }
}
