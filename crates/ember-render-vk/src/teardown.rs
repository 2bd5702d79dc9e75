use ash::vk;

/// One created Vulkan object, recorded at the moment it was created.
///
/// `Instance` and `Device` carry no handle: the renderer keeps their loaders.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Resource {
    Instance,
    DebugMessenger(vk::DebugUtilsMessengerEXT),
    Surface(vk::SurfaceKHR),
    Device,
    Swapchain(vk::SwapchainKHR),
    ImageView(vk::ImageView),
    RenderPass(vk::RenderPass),
    PipelineLayout(vk::PipelineLayout),
    Pipeline(vk::Pipeline),
}

/// Creation-ordered ledger of live objects; unwinding destroys in reverse.
#[derive(Debug, Default)]
pub struct TeardownStack {
    entries: Vec<Resource>,
}

impl TeardownStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, resource: Resource) {
        self.entries.push(resource);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Resource> {
        self.entries.iter()
    }

    /// Hands every entry to `destroy` exactly once, newest first, leaving the
    /// stack empty.
    pub fn unwind(&mut self, mut destroy: impl FnMut(Resource)) {
        while let Some(resource) = self.entries.pop() {
            destroy(resource);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ash::vk::Handle;

    fn full_init_sequence() -> Vec<Resource> {
        vec![
            Resource::Instance,
            Resource::DebugMessenger(vk::DebugUtilsMessengerEXT::from_raw(1)),
            Resource::Surface(vk::SurfaceKHR::from_raw(2)),
            Resource::Device,
            Resource::Swapchain(vk::SwapchainKHR::from_raw(3)),
            Resource::ImageView(vk::ImageView::from_raw(4)),
            Resource::ImageView(vk::ImageView::from_raw(5)),
            Resource::ImageView(vk::ImageView::from_raw(6)),
            Resource::RenderPass(vk::RenderPass::from_raw(7)),
            Resource::PipelineLayout(vk::PipelineLayout::from_raw(8)),
            Resource::Pipeline(vk::Pipeline::from_raw(9)),
        ]
    }

    #[test]
    fn unwinds_in_exact_reverse_creation_order() {
        let created = full_init_sequence();
        let mut stack = TeardownStack::new();
        for &resource in &created {
            stack.push(resource);
        }

        let mut destroyed = Vec::new();
        stack.unwind(|r| destroyed.push(r));

        let mut expected = created;
        expected.reverse();
        assert_eq!(destroyed, expected);
        assert!(stack.is_empty());
    }

    #[test]
    fn second_unwind_destroys_nothing() {
        let mut stack = TeardownStack::new();
        for resource in full_init_sequence() {
            stack.push(resource);
        }
        let mut count = 0;
        stack.unwind(|_| count += 1);
        stack.unwind(|_| count += 1);
        assert_eq!(count, 11);
    }

    #[test]
    fn partial_sequence_only_touches_what_exists() {
        // failed while creating the second image view
        let mut stack = TeardownStack::new();
        for resource in full_init_sequence().into_iter().take(6) {
            stack.push(resource);
        }

        let mut destroyed = Vec::new();
        stack.unwind(|r| destroyed.push(r));

        assert_eq!(destroyed.len(), 6);
        assert_eq!(
            destroyed.first(),
            Some(&Resource::ImageView(vk::ImageView::from_raw(4)))
        );
        assert_eq!(destroyed.last(), Some(&Resource::Instance));
        assert!(!destroyed
            .iter()
            .any(|r| matches!(r, Resource::RenderPass(_) | Resource::Pipeline(_))));
    }

    #[test]
    fn device_outlives_its_children_and_instance_goes_last() {
        let mut stack = TeardownStack::new();
        for resource in full_init_sequence() {
            stack.push(resource);
        }
        let mut destroyed = Vec::new();
        stack.unwind(|r| destroyed.push(r));

        let position = |wanted: Resource| destroyed.iter().position(|&r| r == wanted).unwrap();
        let device = position(Resource::Device);
        assert!(position(Resource::Swapchain(vk::SwapchainKHR::from_raw(3))) < device);
        assert!(position(Resource::Pipeline(vk::Pipeline::from_raw(9))) < device);
        assert!(device < position(Resource::Surface(vk::SurfaceKHR::from_raw(2))));
        assert_eq!(destroyed.last(), Some(&Resource::Instance));
    }
}
