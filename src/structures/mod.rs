//! Простые обобщённые контейнеры: стек (LIFO) и очередь (FIFO).
//!
//! Пустота сообщается через `Option`, без значений-заглушек.

pub mod queue;
pub mod stack;

pub use queue::Queue;
pub use stack::Stack;
