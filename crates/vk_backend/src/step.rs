//! Recorded render steps and their inline command lists
//!
//! The renderer core queues these records from application-facing calls;
//! the queue runner consumes them in order. A step holds non-owning
//! references to the framebuffers it touches.

use ash::vk;

use crate::framebuffer::FramebufferRef;

/// Load behavior for an attachment when a render pass begins.
///
/// The discriminants index the render pass cache; see
/// [`crate::render_pass::RenderPassCache::index_of`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderPassAction {
    /// Attachment contents are undefined on entry
    DontCare = 0,
    /// Attachment is cleared on entry
    Clear = 1,
    /// Attachment contents are preserved
    Keep = 2,
}

/// Layout change requested for a color attachment before a render step
/// begins, typically to make a previously rendered target samplable.
#[derive(Clone)]
pub struct TransitionRequest {
    /// Framebuffer whose color attachment transitions
    pub framebuffer: FramebufferRef,
    /// Layout the color attachment must be in when the step starts
    pub target_layout: vk::ImageLayout,
}

/// Up to three dynamic UBO offsets for a descriptor set bind.
///
/// Fixed backing array so recorded draws stay allocation-free.
#[derive(Debug, Clone, Copy, Default)]
pub struct DynamicOffsets {
    offsets: [u32; 3],
    len: u8,
}

impl DynamicOffsets {
    /// Maximum number of offsets a draw can carry
    pub const MAX: usize = 3;

    /// Build from a slice.
    ///
    /// # Panics
    /// Panics if more than [`Self::MAX`] offsets are given; that is a
    /// producer bug.
    pub fn new(offsets: &[u32]) -> Self {
        assert!(
            offsets.len() <= Self::MAX,
            "too many dynamic UBO offsets: {}",
            offsets.len()
        );
        let mut backing = [0u32; Self::MAX];
        backing[..offsets.len()].copy_from_slice(offsets);
        Self {
            offsets: backing,
            len: offsets.len() as u8,
        }
    }

    /// The populated offsets
    pub fn as_slice(&self) -> &[u32] {
        &self.offsets[..usize::from(self.len)]
    }
}

/// One unit of work inside a render step's command list.
///
/// Replayed strictly in order between render pass begin and end. Dynamic
/// state commands assume the bound pipeline declared that state dynamic.
pub enum RenderCommand {
    /// Bind a graphics pipeline. Redundant binds of the pipeline already
    /// bound in this step are dropped at replay.
    BindPipeline {
        /// Pipeline to bind
        pipeline: vk::Pipeline,
    },
    /// Set the dynamic viewport
    Viewport {
        /// Viewport transform
        viewport: vk::Viewport,
    },
    /// Set the dynamic scissor rectangle
    Scissor {
        /// Scissor rectangle
        rect: vk::Rect2D,
    },
    /// Set the blend constants
    BlendColor {
        /// RGBA blend constants
        color: [f32; 4],
    },
    /// Set stencil write mask, compare mask and reference, front and back
    Stencil {
        /// Stencil write mask
        write_mask: u8,
        /// Stencil compare mask
        compare_mask: u8,
        /// Stencil reference value
        reference: u8,
    },
    /// Clear attachments of the current render pass over the full target
    Clear {
        /// Aspects to clear; an empty selection clears nothing
        mask: vk::ImageAspectFlags,
        /// Packed RGBA8 color, used when the mask includes the color aspect
        color: u32,
        /// Depth clear value, used when the mask includes the depth aspect
        depth: f32,
        /// Stencil clear value, used when the mask includes the stencil aspect
        stencil: u32,
    },
    /// Non-indexed draw
    Draw {
        /// Layout the descriptor set binds against
        pipeline_layout: vk::PipelineLayout,
        /// Descriptor set bound at set 0
        descriptor_set: vk::DescriptorSet,
        /// Dynamic UBO offsets for the bind
        ubo_offsets: DynamicOffsets,
        /// Vertex buffer bound at binding 0
        vertex_buffer: vk::Buffer,
        /// Byte offset into the vertex buffer
        vertex_offset: vk::DeviceSize,
        /// Number of vertices to draw
        vertex_count: u32,
    },
    /// Indexed, instanced draw
    DrawIndexed {
        /// Layout the descriptor set binds against
        pipeline_layout: vk::PipelineLayout,
        /// Descriptor set bound at set 0
        descriptor_set: vk::DescriptorSet,
        /// Dynamic UBO offsets for the bind
        ubo_offsets: DynamicOffsets,
        /// Vertex buffer bound at binding 0
        vertex_buffer: vk::Buffer,
        /// Byte offset into the vertex buffer
        vertex_offset: vk::DeviceSize,
        /// Index buffer
        index_buffer: vk::Buffer,
        /// Byte offset into the index buffer
        index_offset: vk::DeviceSize,
        /// Index width the producer recorded. Replay currently binds the
        /// buffer as 16-bit regardless.
        index_type: vk::IndexType,
        /// Number of indices to draw
        index_count: u32,
        /// Number of instances to draw
        instance_count: u32,
    },
}

/// A render step: one render pass plus the commands replayed inside it.
pub struct RenderPassStep {
    /// Target framebuffer; `None` renders to the backbuffer
    pub framebuffer: Option<FramebufferRef>,
    /// Color load behavior
    pub color_action: RenderPassAction,
    /// Depth-stencil load behavior
    pub depth_action: RenderPassAction,
    /// Packed RGBA8 clear color, used when `color_action` is `Clear`
    pub clear_color: u32,
    /// Depth clear value, used when `depth_action` is `Clear`
    pub clear_depth: f32,
    /// Stencil clear value, used when `depth_action` is `Clear`
    pub clear_stencil: u32,
    /// Number of draw calls the producer recorded into `commands`
    pub num_draws: u32,
    /// Layout to move the color attachment to after the pass ends, or
    /// `UNDEFINED` to leave it where the render pass put it
    pub final_color_layout: vk::ImageLayout,
    /// Color attachment transitions performed before the pass begins
    pub pre_transitions: Vec<TransitionRequest>,
    /// Commands replayed between render pass begin and end
    pub commands: Vec<RenderCommand>,
}

/// An image-to-image copy between two framebuffers
pub struct CopyStep {
    /// Source framebuffer
    pub src: FramebufferRef,
    /// Destination framebuffer
    pub dst: FramebufferRef,
    /// Region read from the source
    pub src_rect: vk::Rect2D,
    /// Top-left corner written in the destination
    pub dst_offset: vk::Offset2D,
    /// Aspects to copy; depth and stencil always travel together
    pub aspect_mask: vk::ImageAspectFlags,
}

/// A scaled image-to-image blit between two framebuffers
pub struct BlitStep {
    /// Source framebuffer
    pub src: FramebufferRef,
    /// Destination framebuffer
    pub dst: FramebufferRef,
    /// Region read from the source
    pub src_rect: vk::Rect2D,
    /// Region written in the destination
    pub dst_rect: vk::Rect2D,
    /// Aspects to blit; depth and stencil always travel together
    pub aspect_mask: vk::ImageAspectFlags,
    /// Sampling filter for the scale
    pub filter: vk::Filter,
}

/// A framebuffer-to-host readback request.
///
/// Declared for producers but not executed yet; the runner skips these
/// steps with a diagnostic.
pub struct ReadbackStep {
    /// Source framebuffer
    pub src: FramebufferRef,
    /// Host memory the pixels land in
    pub dest_ptr: *mut u8,
    /// Region read from the source
    pub src_rect: vk::Rect2D,
}

/// One unit of work in the runner's input queue
pub enum Step {
    /// Begin a render pass and replay its inline commands
    Render(RenderPassStep),
    /// Copy between two framebuffers
    Copy(CopyStep),
    /// Blit between two framebuffers
    Blit(BlitStep),
    /// Read a framebuffer back to host memory (not executed yet)
    Readback(ReadbackStep),
}

/// Expand a packed RGBA8 color into normalized floats, byte 0 first.
pub fn unpack_rgba8(color: u32) -> [f32; 4] {
    [
        (color & 0xFF) as f32 / 255.0,
        ((color >> 8) & 0xFF) as f32 / 255.0,
        ((color >> 16) & 0xFF) as f32 / 255.0,
        (color >> 24) as f32 / 255.0,
    ]
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn test_unpack_rgba8() {
        let [r, g, b, a] = unpack_rgba8(0xFF20_4060);
        assert_relative_eq!(r, 0x60 as f32 / 255.0, max_relative = 1.0 / 255.0);
        assert_relative_eq!(g, 0x40 as f32 / 255.0, max_relative = 1.0 / 255.0);
        assert_relative_eq!(b, 0x20 as f32 / 255.0, max_relative = 1.0 / 255.0);
        assert_relative_eq!(a, 1.0, max_relative = 1.0 / 255.0);
    }

    #[test]
    fn test_unpack_rgba8_extremes() {
        assert_eq!(unpack_rgba8(0), [0.0, 0.0, 0.0, 0.0]);
        assert_eq!(unpack_rgba8(0xFFFF_FFFF), [1.0, 1.0, 1.0, 1.0]);
    }

    #[test]
    fn test_dynamic_offsets() {
        let offsets = DynamicOffsets::new(&[16, 32]);
        assert_eq!(offsets.as_slice(), &[16, 32]);

        let empty = DynamicOffsets::default();
        assert!(empty.as_slice().is_empty());

        let full = DynamicOffsets::new(&[1, 2, 3]);
        assert_eq!(full.as_slice().len(), DynamicOffsets::MAX);
    }

    #[test]
    #[should_panic(expected = "too many dynamic UBO offsets")]
    fn test_dynamic_offsets_overflow() {
        let _ = DynamicOffsets::new(&[1, 2, 3, 4]);
    }

    #[test]
    fn test_action_discriminants_are_cache_indices() {
        assert_eq!(RenderPassAction::DontCare as usize, 0);
        assert_eq!(RenderPassAction::Clear as usize, 1);
        assert_eq!(RenderPassAction::Keep as usize, 2);
    }
}
