use crate::utils::error::JpegError;

pub(crate) trait SafeAccess<T> {
    fn get_safe(&self, index: usize, marker: &'static str) -> Result<&T, JpegError>;
    fn get_range_safe(&self, range: std::ops::Range<usize>, marker: &'static str) -> Result<&[T], JpegError>;
}

impl<T> SafeAccess<T> for [T] {
    /// Retrieves a reference to the element at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`JpegError::Segment`] tagged with `marker` if the index is out of bounds,
    /// which for segment payloads means the segment is shorter than its contents claim.
    fn get_safe(&self, index: usize, marker: &'static str) -> Result<&T, JpegError> {
        self.get(index).ok_or_else(|| {
            JpegError::segment(
                marker,
                format!("index {} out of bounds (len {})", index, self.len()),
            )
        })
    }

    /// Retrieves a sub-slice covering `range`.
    ///
    /// # Errors
    ///
    /// Returns [`JpegError::Segment`] tagged with `marker` if the range is inverted or
    /// extends past the end of the slice.
    fn get_range_safe(&self, range: std::ops::Range<usize>, marker: &'static str) -> Result<&[T], JpegError> {
        self.get(range.clone()).ok_or_else(|| {
            JpegError::segment(
                marker,
                format!(
                    "range {}..{} out of bounds (len {})",
                    range.start,
                    range.end,
                    self.len()
                ),
            )
        })
    }
}
