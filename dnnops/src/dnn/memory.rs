use crate::dnn::{DnnLibrary, wrap_dnn_error};
use crate::dtype::DType;
use crate::error::{Error, Result};
use crate::tensor::{Dims, ITensor, Tensor};
use std::cell::{Ref, RefCell, RefMut};
use std::fmt::{Debug, Formatter};
use std::ops::Deref;
use std::rc::Rc;
use tracing::trace;

/// Tensor storage that can live either in the framework's plain layout or in a layout
/// private to a primitive of the accelerated library.
///
/// The buffer is reference counted so two memories can alias the same storage, see
/// [`DnnMemory::share_from`]. Memories are not `Send`: a buffer is only ever touched by the
/// thread that owns the memories aliasing it.
pub struct DnnMemory<L: DnnLibrary> {
    dims: Dims,
    layout: L::Layout,
    buffer: Rc<RefCell<Vec<L::DType>>>,
}

impl<L: DnnLibrary> DnnMemory<L> {
    /// Zeroed memory in the plain layout.
    pub fn new<D: Into<Dims>>(lib: &L, dims: D) -> Self {
        let dims = dims.into();
        let layout = lib.plain_layout(&dims);
        Self::with_layout(lib, dims, layout)
    }

    /// Zeroed memory in `layout`, typically one derived from a primitive.
    pub fn with_layout<D: Into<Dims>>(lib: &L, dims: D, layout: L::Layout) -> Self {
        let len = lib.layout_size(&layout);
        DnnMemory {
            dims: dims.into(),
            layout,
            buffer: Rc::new(RefCell::new(vec![L::DType::ZERO; len])),
        }
    }

    pub fn from_tensor(lib: &L, tensor: &Tensor<L::DType>) -> Self {
        let dims = tensor.dims().clone();
        let layout = lib.plain_layout(&dims);
        DnnMemory {
            dims,
            layout,
            buffer: Rc::new(RefCell::new(tensor.as_ref().to_vec())),
        }
    }

    /// Re-targets the memory to `dims` in `layout`. The memory always gets a fresh buffer so
    /// that anything still aliasing the old one is left untouched.
    pub fn reset<D: Into<Dims>>(&mut self, lib: &L, dims: D, layout: L::Layout) {
        let len = lib.layout_size(&layout);
        self.dims = dims.into();
        self.layout = layout;
        self.buffer = Rc::new(RefCell::new(vec![L::DType::ZERO; len]));
    }

    #[inline]
    pub fn dims(&self) -> &Dims {
        &self.dims
    }

    #[inline]
    pub fn layout(&self) -> &L::Layout {
        &self.layout
    }

    pub fn is_plain(&self, lib: &L) -> bool {
        self.layout == lib.plain_layout(&self.dims)
    }

    /// Whether both memories currently alias the same buffer.
    #[inline]
    pub fn shares_buffer_with(&self, other: &DnnMemory<L>) -> bool {
        Rc::ptr_eq(&self.buffer, &other.buffer)
    }

    pub fn buffer(&self) -> Result<Ref<'_, Vec<L::DType>>> {
        Ok(self.buffer.try_borrow()?)
    }

    pub fn buffer_mut(&self) -> Result<RefMut<'_, Vec<L::DType>>> {
        Ok(self.buffer.try_borrow_mut()?)
    }

    /// Aliases `other`'s buffer when dims and layout match, so results written here land in
    /// `other` without a copy. Otherwise detaches onto a private buffer. Returns whether the
    /// buffers are shared afterwards.
    pub fn share_from(&mut self, lib: &L, other: &DnnMemory<L>) -> bool {
        if self.dims == other.dims && self.layout == other.layout {
            if !Rc::ptr_eq(&self.buffer, &other.buffer) {
                trace!(dims = %self.dims, "sharing buffer with output");
                self.buffer = Rc::clone(&other.buffer);
            }
            true
        } else {
            if Rc::strong_count(&self.buffer) > 1 {
                trace!(dims = %self.dims, "layout mismatch, detaching from shared buffer");
                let len = lib.layout_size(&self.layout);
                self.buffer = Rc::new(RefCell::new(vec![L::DType::ZERO; len]));
            }
            false
        }
    }

    /// Returns the content in `layout`, converting into a temporary buffer only if the memory
    /// is in a different layout.
    pub fn view(&self, lib: &L, layout: &L::Layout) -> Result<MemoryView<'_, L::DType>> {
        let buffer = self.buffer.try_borrow()?;
        if self.layout == *layout {
            trace!(dims = %self.dims, "view matches layout, conversion skipped");
            return Ok(MemoryView::Borrowed(buffer));
        }
        trace!(dims = %self.dims, "converting view to primitive layout");
        let mut converted = vec![L::DType::ZERO; lib.layout_size(layout)];
        wrap_dnn_error!(
            lib.convert(&self.layout, &buffer, layout, &mut converted),
            "Failed to convert {} view",
            self.dims
        )?;
        Ok(MemoryView::Converted(converted))
    }

    /// Writes the content into `dst` in `dst`'s layout. Nothing is copied when `dst` aliases
    /// this memory's buffer.
    pub fn copy_to(&self, lib: &L, dst: &mut DnnMemory<L>) -> Result<()> {
        Error::shape_mismatch("copy destination length", self.dims.tensor_len(), dst.dims.tensor_len())?;
        if self.shares_buffer_with(dst) && self.layout == dst.layout {
            trace!(dims = %self.dims, "output aliases buffer, copy skipped");
            return Ok(());
        }
        let src = self.buffer.try_borrow()?;
        let mut dst_buffer = dst.buffer.try_borrow_mut()?;
        wrap_dnn_error!(
            lib.convert(&self.layout, &src, &dst.layout, &mut dst_buffer),
            "Failed to copy {} into output layout",
            self.dims
        )
    }

    /// Copies the content out into a tensor in the plain layout.
    pub fn to_tensor(&self, lib: &L) -> Result<Tensor<L::DType>> {
        let plain = lib.plain_layout(&self.dims);
        let data = self.view(lib, &plain)?.to_vec();
        Ok(Tensor::from_vec(data, self.dims.clone()))
    }
}

impl<L: DnnLibrary> Debug for DnnMemory<L> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DnnMemory")
            .field("dims", &self.dims)
            .field("layout", &self.layout)
            .field("shared", &(Rc::strong_count(&self.buffer) > 1))
            .finish_non_exhaustive()
    }
}

/// Content of a [`DnnMemory`] in a requested layout.
pub enum MemoryView<'a, T> {
    Borrowed(Ref<'a, Vec<T>>),
    Converted(Vec<T>),
}

impl<'a, T> MemoryView<'a, T> {
    #[inline]
    pub fn is_converted(&self) -> bool {
        matches!(self, MemoryView::Converted(_))
    }
}

impl<'a, T> Deref for MemoryView<'a, T> {
    type Target = [T];
    #[inline]
    fn deref(&self) -> &Self::Target {
        match self {
            MemoryView::Borrowed(data) => data.as_slice(),
            MemoryView::Converted(data) => data.as_slice(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::dnn::cpu::{CpuDnn, CpuLayout};
    use crate::tensor::Dim4;

    #[test]
    fn test_share_from_aliases_matching_layout() {
        let lib = CpuDnn::<f32>::new();
        let layout = CpuLayout::ChannelBlocked { dims: Dim4(1, 2, 2, 2), block: 4 };
        let y = DnnMemory::with_layout(&lib, Dim4(1, 2, 2, 2), layout.clone());
        let mut scratch = DnnMemory::with_layout(&lib, Dim4(1, 2, 2, 2), layout);
        assert!(scratch.share_from(&lib, &y));
        assert!(scratch.shares_buffer_with(&y));

        let plain = DnnMemory::new(&lib, [1, 2, 2, 2]);
        assert!(!scratch.share_from(&lib, &plain));
        assert!(!scratch.shares_buffer_with(&y));
        assert!(!scratch.shares_buffer_with(&plain));
        assert_eq!(16, scratch.buffer().unwrap().len());
    }

    #[test]
    fn test_view_and_copy() {
        let lib = CpuDnn::<f32>::with_block_size(2);
        let tensor = Tensor::from_vec((0..12).map(|v| v as f32).collect(), Dim4(1, 3, 2, 2));
        let mem = DnnMemory::from_tensor(&lib, &tensor);
        assert!(mem.is_plain(&lib));
        assert!(!mem.view(&lib, mem.layout()).unwrap().is_converted());

        let blocked = CpuLayout::ChannelBlocked { dims: Dim4(1, 3, 2, 2), block: 2 };
        assert!(mem.view(&lib, &blocked).unwrap().is_converted());
        let mut dst = DnnMemory::with_layout(&lib, Dim4(1, 3, 2, 2), blocked);
        mem.copy_to(&lib, &mut dst).unwrap();
        assert_eq!(tensor, dst.to_tensor(&lib).unwrap());

        let mut wrong = DnnMemory::new(&lib, 5);
        assert!(matches!(
            mem.copy_to(&lib, &mut wrong),
            Err(Error::ShapeMismatch { expected: 12, actual: 5, .. })
        ));
    }

    #[test]
    fn test_conflicting_borrow_is_an_error() {
        let lib = CpuDnn::<f32>::new();
        let mem = DnnMemory::new(&lib, 4);
        let _guard = mem.buffer_mut().unwrap();
        assert!(matches!(mem.buffer(), Err(Error::BufferBorrowed)));
    }
}
