//! Render pass cache
//!
//! One backbuffer render pass plus nine offscreen passes covering every
//! combination of color and depth-stencil load behavior. All ten are built
//! once when device objects are created and stay alive until shutdown, so
//! step execution never creates API objects.

use ash::vk;

use crate::context::{VulkanError, VulkanResult};
use crate::step::RenderPassAction;

/// Offscreen table entries, in population order. Must match the
/// discriminants [`RenderPassCache::index_of`] builds indices from.
const ACTIONS: [RenderPassAction; 3] = [
    RenderPassAction::DontCare,
    RenderPassAction::Clear,
    RenderPassAction::Keep,
];

/// Cached compatible render passes, selected per step.
pub struct RenderPassCache {
    backbuffer: vk::RenderPass,
    offscreen: [vk::RenderPass; 9],
}

impl RenderPassCache {
    /// An empty cache. Populate with [`Self::create_device_objects`].
    pub fn new() -> Self {
        Self {
            backbuffer: vk::RenderPass::null(),
            offscreen: [vk::RenderPass::null(); 9],
        }
    }

    /// Table index for a load-behavior pair
    pub fn index_of(color: RenderPassAction, depth: RenderPassAction) -> usize {
        depth as usize * 3 + color as usize
    }

    /// The render pass compatible with backbuffer framebuffers
    pub fn backbuffer_pass(&self) -> vk::RenderPass {
        self.backbuffer
    }

    /// Offscreen render pass at a raw table index
    pub fn pass_at(&self, index: usize) -> vk::RenderPass {
        self.offscreen[index]
    }

    /// Offscreen render pass for a load-behavior pair
    pub fn pass_for(&self, color: RenderPassAction, depth: RenderPassAction) -> vk::RenderPass {
        self.offscreen[Self::index_of(color, depth)]
    }

    /// Create the backbuffer pass and the nine offscreen passes.
    ///
    /// Call once, after the device handle is available.
    pub fn create_device_objects(
        &mut self,
        device: &ash::Device,
        swapchain_format: vk::Format,
        depth_stencil_format: vk::Format,
        offscreen_color_format: vk::Format,
    ) -> VulkanResult<()> {
        if self.backbuffer != vk::RenderPass::null() {
            return Err(VulkanError::InvalidOperation {
                reason: "render pass cache already created".to_string(),
            });
        }
        log::debug!(
            "Creating render pass cache ({} offscreen variants, swapchain {:?}, depth {:?})",
            self.offscreen.len(),
            swapchain_format,
            depth_stencil_format
        );

        self.backbuffer = create_backbuffer_pass(device, swapchain_format, depth_stencil_format)
            .map_err(|err| {
                VulkanError::InitializationFailed(format!(
                    "Failed to create backbuffer render pass: {err}"
                ))
            })?;
        for depth in ACTIONS {
            for color in ACTIONS {
                self.offscreen[Self::index_of(color, depth)] = create_offscreen_pass(
                    device,
                    offscreen_color_format,
                    depth_stencil_format,
                    color,
                    depth,
                )
                .map_err(|err| {
                    VulkanError::InitializationFailed(format!(
                        "Failed to create offscreen render pass ({color:?}/{depth:?}): {err}"
                    ))
                })?;
            }
        }
        Ok(())
    }

    /// Destroy every cached pass.
    ///
    /// Call once, before device teardown.
    ///
    /// # Panics
    /// Panics if any entry is null; the cache must be populated exactly
    /// once and destroyed exactly once.
    pub fn destroy_device_objects(&mut self, device: &ash::Device) {
        log::debug!("Destroying render pass cache");
        for pass in &mut self.offscreen {
            assert!(
                *pass != vk::RenderPass::null(),
                "offscreen render pass missing at destroy; cache never created or destroyed twice"
            );
            unsafe { device.destroy_render_pass(*pass, None) };
            *pass = vk::RenderPass::null();
        }
        assert!(
            self.backbuffer != vk::RenderPass::null(),
            "backbuffer render pass missing at destroy; cache never created or destroyed twice"
        );
        unsafe { device.destroy_render_pass(self.backbuffer, None) };
        self.backbuffer = vk::RenderPass::null();
    }
}

impl Default for RenderPassCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Load op implementing a load behavior
fn load_op(action: RenderPassAction) -> vk::AttachmentLoadOp {
    match action {
        RenderPassAction::Clear => vk::AttachmentLoadOp::CLEAR,
        RenderPassAction::Keep => vk::AttachmentLoadOp::LOAD,
        RenderPassAction::DontCare => vk::AttachmentLoadOp::DONT_CARE,
    }
}

fn create_backbuffer_pass(
    device: &ash::Device,
    swapchain_format: vk::Format,
    depth_stencil_format: vk::Format,
) -> VulkanResult<vk::RenderPass> {
    // Final layout stays COLOR_ATTACHMENT_OPTIMAL; the swapchain owner
    // performs the present transition.
    let color_attachment = vk::AttachmentDescription::builder()
        .format(swapchain_format)
        .samples(vk::SampleCountFlags::TYPE_1)
        .load_op(vk::AttachmentLoadOp::CLEAR)
        .store_op(vk::AttachmentStoreOp::STORE)
        .stencil_load_op(vk::AttachmentLoadOp::DONT_CARE)
        .stencil_store_op(vk::AttachmentStoreOp::DONT_CARE)
        .initial_layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL)
        .final_layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL)
        .build();

    let depth_attachment = vk::AttachmentDescription::builder()
        .format(depth_stencil_format)
        .samples(vk::SampleCountFlags::TYPE_1)
        .load_op(vk::AttachmentLoadOp::CLEAR)
        .store_op(vk::AttachmentStoreOp::STORE)
        .stencil_load_op(vk::AttachmentLoadOp::CLEAR)
        .stencil_store_op(vk::AttachmentStoreOp::STORE)
        .initial_layout(vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL)
        .final_layout(vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL)
        .build();

    create_pass(device, [color_attachment, depth_attachment])
}

fn create_offscreen_pass(
    device: &ash::Device,
    color_format: vk::Format,
    depth_stencil_format: vk::Format,
    color: RenderPassAction,
    depth: RenderPassAction,
) -> VulkanResult<vk::RenderPass> {
    let color_attachment = vk::AttachmentDescription::builder()
        .format(color_format)
        .samples(vk::SampleCountFlags::TYPE_1)
        .load_op(load_op(color))
        .store_op(vk::AttachmentStoreOp::STORE)
        .stencil_load_op(vk::AttachmentLoadOp::DONT_CARE)
        .stencil_store_op(vk::AttachmentStoreOp::DONT_CARE)
        .initial_layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL)
        .final_layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL)
        .build();

    let depth_attachment = vk::AttachmentDescription::builder()
        .format(depth_stencil_format)
        .samples(vk::SampleCountFlags::TYPE_1)
        .load_op(load_op(depth))
        .store_op(vk::AttachmentStoreOp::STORE)
        .stencil_load_op(load_op(depth))
        .stencil_store_op(vk::AttachmentStoreOp::STORE)
        .initial_layout(vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL)
        .final_layout(vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL)
        .build();

    create_pass(device, [color_attachment, depth_attachment])
}

fn create_pass(
    device: &ash::Device,
    attachments: [vk::AttachmentDescription; 2],
) -> VulkanResult<vk::RenderPass> {
    let color_refs = [vk::AttachmentReference {
        attachment: 0,
        layout: vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
    }];
    let depth_ref = vk::AttachmentReference {
        attachment: 1,
        layout: vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL,
    };

    let subpasses = [vk::SubpassDescription::builder()
        .pipeline_bind_point(vk::PipelineBindPoint::GRAPHICS)
        .color_attachments(&color_refs)
        .depth_stencil_attachment(&depth_ref)
        .build()];

    // No subpass dependencies; every pass is bracketed by explicit barriers.
    let create_info = vk::RenderPassCreateInfo::builder()
        .attachments(&attachments)
        .subpasses(&subpasses);

    let pass = unsafe {
        device
            .create_render_pass(&create_info, None)
            .map_err(VulkanError::Api)?
    };
    Ok(pass)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_of_every_pair() {
        use RenderPassAction::{Clear, DontCare, Keep};

        assert_eq!(RenderPassCache::index_of(DontCare, DontCare), 0);
        assert_eq!(RenderPassCache::index_of(Clear, DontCare), 1);
        assert_eq!(RenderPassCache::index_of(Keep, DontCare), 2);
        assert_eq!(RenderPassCache::index_of(DontCare, Clear), 3);
        assert_eq!(RenderPassCache::index_of(Clear, Clear), 4);
        assert_eq!(RenderPassCache::index_of(Keep, Clear), 5);
        assert_eq!(RenderPassCache::index_of(DontCare, Keep), 6);
        assert_eq!(RenderPassCache::index_of(Clear, Keep), 7);
        assert_eq!(RenderPassCache::index_of(Keep, Keep), 8);
    }

    #[test]
    fn test_population_order_matches_index() {
        let mut expected = 0;
        for depth in ACTIONS {
            for color in ACTIONS {
                assert_eq!(RenderPassCache::index_of(color, depth), expected);
                expected += 1;
            }
        }
        assert_eq!(expected, 9);
    }

    #[test]
    fn test_load_op_mapping() {
        assert_eq!(load_op(RenderPassAction::Clear), vk::AttachmentLoadOp::CLEAR);
        assert_eq!(load_op(RenderPassAction::Keep), vk::AttachmentLoadOp::LOAD);
        assert_eq!(load_op(RenderPassAction::DontCare), vk::AttachmentLoadOp::DONT_CARE);
    }

    #[test]
    fn test_new_cache_is_unpopulated() {
        let cache = RenderPassCache::new();
        assert_eq!(cache.backbuffer_pass(), vk::RenderPass::null());
        assert_eq!(cache.pass_at(0), vk::RenderPass::null());
        assert_eq!(cache.pass_at(8), vk::RenderPass::null());
    }
}
