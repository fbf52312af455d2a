use std::ops::Range;
use std::sync::Arc;

use bytemuck::Pod;

/// An append-only byte store for vertex, index and uniform data.
#[derive(Clone, Debug, Default)]
pub struct Buffer {
    data: Vec<u8>,
}

impl Buffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `value` and returns the byte range it occupies.
    pub fn push<T: Pod>(&mut self, value: T) -> Range<usize> {
        self.push_bytes(bytemuck::bytes_of(&value))
    }

    /// Appends a slice of values and returns the byte range they occupy.
    pub fn push_slice<T: Pod>(&mut self, values: &[T]) -> Range<usize> {
        self.push_bytes(bytemuck::cast_slice(values))
    }

    pub fn push_bytes(&mut self, bytes: &[u8]) -> Range<usize> {
        let start = self.data.len();
        self.data.extend_from_slice(bytes);
        start..self.data.len()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }
}

/// A windowed view over a shared [`Buffer`].
///
/// Views are cheap value types; the buffer stays alive for as long as any
/// view over it does.
#[derive(Clone, Debug)]
pub struct BufferView {
    buffer: Arc<Buffer>,
    offset: usize,
    len: usize,
}

impl BufferView {
    /// A view over the whole buffer.
    pub fn new(buffer: Arc<Buffer>) -> Self {
        let len = buffer.len();

        Self {
            buffer,
            offset: 0,
            len,
        }
    }

    pub fn with_range(buffer: Arc<Buffer>, range: Range<usize>) -> Self {
        assert!(range.start <= range.end && range.end <= buffer.len());

        Self {
            buffer,
            offset: range.start,
            len: range.end - range.start,
        }
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buffer.as_slice()[self.offset..self.offset + self.len]
    }
}

impl Default for BufferView {
    fn default() -> Self {
        Self::new(Arc::new(Buffer::new()))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::{Buffer, BufferView};

    #[test]
    fn buffer_push_returns_ranges() {
        let mut buffer = Buffer::new();

        let first = buffer.push(1.0f32);
        let second = buffer.push_slice(&[2u16, 3u16]);

        assert_eq!(first, 0..4);
        assert_eq!(second, 4..8);
        assert_eq!(buffer.len(), 8);
    }

    #[test]
    fn buffer_view_windows_the_buffer() {
        let mut buffer = Buffer::new();
        buffer.push_bytes(&[1, 2, 3, 4, 5]);

        let buffer = Arc::new(buffer);
        let view = BufferView::with_range(buffer.clone(), 1..4);

        assert_eq!(view.as_slice(), &[2, 3, 4]);
        assert_eq!(view.len(), 3);
        assert_eq!(BufferView::new(buffer).as_slice(), &[1, 2, 3, 4, 5]);
    }

    #[test]
    #[should_panic]
    fn buffer_view_rejects_out_of_bounds_ranges() {
        let buffer = Arc::new(Buffer::new());
        let _ = BufferView::with_range(buffer, 0..1);
    }
}
