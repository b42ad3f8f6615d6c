use crate::dnn::{DnnError, DnnResult, RESOURCE_COUNT, ResourceType};

/// Buffers bound to the resource slots of a primitive for one execution.
///
/// Source, filter and bias slots are read-only; the destination slot is the only one the
/// primitive writes to.
pub struct ResourceBindings<'a, T> {
    inputs: [Option<&'a [T]>; RESOURCE_COUNT - 1],
    dst: Option<&'a mut [T]>,
}

impl<'a, T> ResourceBindings<'a, T> {
    pub fn new() -> Self {
        ResourceBindings {
            inputs: [None; RESOURCE_COUNT - 1],
            dst: None,
        }
    }

    /// Binds a read-only slot. Binding [`ResourceType::Dst`] here is rejected.
    pub fn bind(&mut self, resource: ResourceType, data: &'a [T]) -> DnnResult<()> {
        match resource {
            ResourceType::Dst => Err(DnnError::IncorrectInputParameter),
            _ => {
                self.inputs[resource as usize] = Some(data);
                Ok(())
            }
        }
    }

    pub fn bind_dst(&mut self, data: &'a mut [T]) {
        self.dst = Some(data);
    }

    pub fn input(&self, resource: ResourceType) -> DnnResult<&'a [T]> {
        match resource {
            ResourceType::Dst => Err(DnnError::IncorrectInputParameter),
            _ => self.inputs[resource as usize].ok_or(DnnError::UnexpectedNullPointer),
        }
    }

    pub fn dst(&mut self) -> DnnResult<&mut [T]> {
        self.dst.as_deref_mut().ok_or(DnnError::UnexpectedNullPointer)
    }
}

impl<'a, T> Default for ResourceBindings<'a, T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_unbound_slots() {
        let mut res = ResourceBindings::<f32>::new();
        assert_eq!(Err(DnnError::UnexpectedNullPointer), res.input(ResourceType::Src));
        assert_eq!(Err(DnnError::UnexpectedNullPointer), res.dst().map(|_| ()));
    }

    #[test]
    fn test_bind() {
        let src = [1.0f32, 2.0];
        let mut dst = [0.0f32; 2];
        let mut res = ResourceBindings::new();
        res.bind(ResourceType::Src, &src).unwrap();
        assert_eq!(Err(DnnError::IncorrectInputParameter), res.bind(ResourceType::Dst, &src));
        res.bind_dst(&mut dst);
        assert_eq!(Ok(&src[..]), res.input(ResourceType::Src));
        res.dst().unwrap()[1] = 5.0;
        drop(res);
        assert_eq!([0.0, 5.0], dst);
    }
}
