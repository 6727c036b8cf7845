//! Queue runner
//!
//! Consumes the recorded step sequence and emits the matching low-level
//! command stream onto a command buffer: layout transitions, render pass
//! begin/end, inline command replay, and image-to-image transfers. Steps
//! run strictly in order and each one is released after it executes.

use ash::vk;

use crate::barrier;
use crate::config::RunnerConfig;
use crate::context::{DeviceContext, VulkanResult};
use crate::framebuffer::{Framebuffer, FramebufferRef};
use crate::render_pass::RenderPassCache;
use crate::step::{
    unpack_rgba8, BlitStep, CopyStep, RenderCommand, RenderPassAction, RenderPassStep, Step,
};

/// Replays recorded render steps onto a command buffer.
///
/// The runner is synchronous and single-threaded: `run_steps` returns once
/// the last command is recorded, and concurrent calls sharing a
/// framebuffer are not allowed. Attachment layouts tracked on the
/// referenced framebuffers are mutated as barriers are emitted, so each
/// step observes the state its predecessors left behind.
pub struct QueueRunner {
    device: ash::Device,
    swapchain_format: vk::Format,
    depth_stencil_format: vk::Format,
    backbuffer_extent: vk::Extent2D,
    backbuffer: vk::Framebuffer,
    render_passes: RenderPassCache,
    config: RunnerConfig,
}

impl QueueRunner {
    /// Create a runner over an existing device context with default
    /// configuration
    pub fn new(context: &DeviceContext) -> Self {
        Self::with_config(context, RunnerConfig::default())
    }

    /// Create a runner with explicit configuration
    pub fn with_config(context: &DeviceContext, config: RunnerConfig) -> Self {
        Self {
            device: context.raw_device().clone(),
            swapchain_format: context.swapchain_format(),
            depth_stencil_format: context.depth_stencil_format(),
            backbuffer_extent: context.backbuffer_extent(),
            backbuffer: vk::Framebuffer::null(),
            render_passes: RenderPassCache::new(),
            config,
        }
    }

    /// Framebuffer used when a render step targets the backbuffer
    pub fn set_backbuffer(&mut self, framebuffer: vk::Framebuffer) {
        self.backbuffer = framebuffer;
    }

    /// Build the render pass cache. Call once after device creation.
    pub fn create_device_objects(&mut self) -> VulkanResult<()> {
        self.render_passes.create_device_objects(
            &self.device,
            self.swapchain_format,
            self.depth_stencil_format,
            self.config.offscreen_color_format.to_vk(),
        )
    }

    /// Destroy the render pass cache. Call once before device teardown.
    pub fn destroy_device_objects(&mut self) {
        self.render_passes.destroy_device_objects(&self.device);
    }

    /// The render pass compatible with backbuffer framebuffers
    pub fn backbuffer_pass(&self) -> vk::RenderPass {
        self.render_passes.backbuffer_pass()
    }

    /// Offscreen render pass at a raw cache index
    pub fn pass_at(&self, index: usize) -> vk::RenderPass {
        self.render_passes.pass_at(index)
    }

    /// Cache index for a load-behavior pair
    pub fn index_of(color: RenderPassAction, depth: RenderPassAction) -> usize {
        RenderPassCache::index_of(color, depth)
    }

    /// Execute `steps` in order, recording onto `cmd`.
    ///
    /// The command buffer must already be recording. Steps are consumed
    /// destructively; the sequence cannot be re-run.
    pub fn run_steps(&mut self, cmd: vk::CommandBuffer, steps: Vec<Step>) {
        for step in steps {
            if self.config.log_steps {
                match &step {
                    Step::Render(render) => log::trace!(
                        "render step: {} commands, {} draws",
                        render.commands.len(),
                        render.num_draws
                    ),
                    Step::Copy(_) => log::trace!("copy step"),
                    Step::Blit(_) => log::trace!("blit step"),
                    Step::Readback(_) => log::trace!("readback step"),
                }
            }
            match step {
                Step::Render(render) => self.perform_render(cmd, &render),
                Step::Copy(copy) => self.perform_copy(cmd, &copy),
                Step::Blit(blit) => self.perform_blit(cmd, &blit),
                Step::Readback(_) => {
                    log::warn!("readback steps are not executed yet; skipping");
                }
            }
        }
    }

    fn perform_render(&self, cmd: vk::CommandBuffer, step: &RenderPassStep) {
        for request in &step.pre_transitions {
            let mut fb = request.framebuffer.borrow_mut();
            if let Some((image_barrier, src_stage, dst_stage)) =
                barrier::pre_transition(&mut fb.color, request.target_layout)
            {
                unsafe {
                    self.device.cmd_pipeline_barrier(
                        cmd,
                        src_stage,
                        dst_stage,
                        vk::DependencyFlags::empty(),
                        &[],
                        &[],
                        &[image_barrier],
                    );
                }
            }
        }

        let extent = self.begin_render_pass(cmd, step);

        let mut bind_state = PipelineBindState::default();
        for command in &step.commands {
            self.replay(cmd, command, extent, &mut bind_state);
        }

        unsafe { self.device.cmd_end_render_pass(cmd) };

        if let Some(fb_ref) = &step.framebuffer {
            if step.final_color_layout != vk::ImageLayout::UNDEFINED {
                let mut fb = fb_ref.borrow_mut();
                let (image_barrier, dst_stage) =
                    barrier::final_color_transition(&mut fb.color, step.final_color_layout);
                // Between passes; ALL_GRAPHICS covers whatever the pass did.
                unsafe {
                    self.device.cmd_pipeline_barrier(
                        cmd,
                        vk::PipelineStageFlags::ALL_GRAPHICS,
                        dst_stage,
                        vk::DependencyFlags::empty(),
                        &[],
                        &[],
                        &[image_barrier],
                    );
                }
            }
        }
    }

    /// Transition the target's attachments if needed, select the render
    /// pass and clear values, and begin the pass. Returns the render area
    /// extent for the commands inside.
    fn begin_render_pass(&self, cmd: vk::CommandBuffer, step: &RenderPassStep) -> vk::Extent2D {
        let framebuffer;
        let extent;
        let render_pass;
        let mut clear_values = [vk::ClearValue::default(); 2];
        let clear_count;

        if let Some(fb_ref) = &step.framebuffer {
            let mut fb = fb_ref.borrow_mut();

            // The backbuffer never needs these; its transitions are owned
            // by the swapchain.
            if let Some((image_barrier, src_stage)) = barrier::to_color_attachment(&mut fb.color) {
                unsafe {
                    self.device.cmd_pipeline_barrier(
                        cmd,
                        src_stage,
                        vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
                        vk::DependencyFlags::empty(),
                        &[],
                        &[],
                        &[image_barrier],
                    );
                }
            }
            if let Some((image_barrier, src_stage)) = barrier::to_depth_attachment(&mut fb.depth) {
                unsafe {
                    self.device.cmd_pipeline_barrier(
                        cmd,
                        src_stage,
                        vk::PipelineStageFlags::EARLY_FRAGMENT_TESTS
                            | vk::PipelineStageFlags::LATE_FRAGMENT_TESTS,
                        vk::DependencyFlags::empty(),
                        &[],
                        &[],
                        &[image_barrier],
                    );
                }
            }

            framebuffer = fb.framebuffer;
            extent = vk::Extent2D {
                width: fb.width,
                height: fb.height,
            };
            render_pass = self
                .render_passes
                .pass_for(step.color_action, step.depth_action);
            clear_count = fill_offscreen_clear_values(&mut clear_values, step);
        } else {
            framebuffer = self.backbuffer;
            extent = self.backbuffer_extent;
            render_pass = self.render_passes.backbuffer_pass();
            clear_values[0] = vk::ClearValue {
                color: vk::ClearColorValue {
                    float32: unpack_rgba8(step.clear_color),
                },
            };
            clear_values[1] = vk::ClearValue {
                depth_stencil: vk::ClearDepthStencilValue {
                    depth: 0.0,
                    stencil: 0,
                },
            };
            clear_count = 2;
        }

        let begin_info = vk::RenderPassBeginInfo::builder()
            .render_pass(render_pass)
            .framebuffer(framebuffer)
            .render_area(vk::Rect2D {
                offset: vk::Offset2D { x: 0, y: 0 },
                extent,
            })
            .clear_values(&clear_values[..clear_count]);

        unsafe {
            self.device
                .cmd_begin_render_pass(cmd, &begin_info, vk::SubpassContents::INLINE);
        }
        extent
    }

    fn replay(
        &self,
        cmd: vk::CommandBuffer,
        command: &RenderCommand,
        extent: vk::Extent2D,
        bind_state: &mut PipelineBindState,
    ) {
        match command {
            RenderCommand::BindPipeline { pipeline } => {
                if bind_state.should_bind(*pipeline) {
                    unsafe {
                        self.device
                            .cmd_bind_pipeline(cmd, vk::PipelineBindPoint::GRAPHICS, *pipeline);
                    }
                }
            }
            RenderCommand::Viewport { viewport } => unsafe {
                self.device
                    .cmd_set_viewport(cmd, 0, std::slice::from_ref(viewport));
            },
            RenderCommand::Scissor { rect } => unsafe {
                self.device.cmd_set_scissor(cmd, 0, std::slice::from_ref(rect));
            },
            RenderCommand::BlendColor { color } => unsafe {
                self.device.cmd_set_blend_constants(cmd, color);
            },
            RenderCommand::Stencil {
                write_mask,
                compare_mask,
                reference,
            } => unsafe {
                self.device.cmd_set_stencil_write_mask(
                    cmd,
                    vk::StencilFaceFlags::FRONT_AND_BACK,
                    u32::from(*write_mask),
                );
                self.device.cmd_set_stencil_compare_mask(
                    cmd,
                    vk::StencilFaceFlags::FRONT_AND_BACK,
                    u32::from(*compare_mask),
                );
                self.device.cmd_set_stencil_reference(
                    cmd,
                    vk::StencilFaceFlags::FRONT_AND_BACK,
                    u32::from(*reference),
                );
            },
            RenderCommand::Draw {
                pipeline_layout,
                descriptor_set,
                ubo_offsets,
                vertex_buffer,
                vertex_offset,
                vertex_count,
            } => unsafe {
                self.device.cmd_bind_descriptor_sets(
                    cmd,
                    vk::PipelineBindPoint::GRAPHICS,
                    *pipeline_layout,
                    0,
                    &[*descriptor_set],
                    ubo_offsets.as_slice(),
                );
                self.device
                    .cmd_bind_vertex_buffers(cmd, 0, &[*vertex_buffer], &[*vertex_offset]);
                self.device.cmd_draw(cmd, *vertex_count, 1, 0, 0);
            },
            RenderCommand::DrawIndexed {
                pipeline_layout,
                descriptor_set,
                ubo_offsets,
                vertex_buffer,
                vertex_offset,
                index_buffer,
                index_offset,
                index_type: _,
                index_count,
                instance_count,
            } => unsafe {
                self.device.cmd_bind_descriptor_sets(
                    cmd,
                    vk::PipelineBindPoint::GRAPHICS,
                    *pipeline_layout,
                    0,
                    &[*descriptor_set],
                    ubo_offsets.as_slice(),
                );
                // Producers record 16-bit index data throughout.
                self.device.cmd_bind_index_buffer(
                    cmd,
                    *index_buffer,
                    *index_offset,
                    vk::IndexType::UINT16,
                );
                self.device
                    .cmd_bind_vertex_buffers(cmd, 0, &[*vertex_buffer], &[*vertex_offset]);
                self.device
                    .cmd_draw_indexed(cmd, *index_count, *instance_count, 0, 0, 0);
            },
            RenderCommand::Clear {
                mask,
                color,
                depth,
                stencil,
            } => {
                let clears = attachment_clears(*mask, *color, *depth, *stencil);
                if clears.is_empty() {
                    return;
                }
                // The clear covers the whole target; the scissor in effect
                // is deliberately ignored.
                let rect = vk::ClearRect {
                    rect: vk::Rect2D {
                        offset: vk::Offset2D { x: 0, y: 0 },
                        extent,
                    },
                    base_array_layer: 0,
                    layer_count: 1,
                };
                unsafe { self.device.cmd_clear_attachments(cmd, &clears, &[rect]) };
            }
        }
    }

    fn perform_copy(&self, cmd: vk::CommandBuffer, step: &CopyStep) {
        self.transition_for_transfer(cmd, &step.src, &step.dst, step.aspect_mask);

        let src = step.src.borrow();
        let dst = step.dst.borrow();
        let mut region = copy_region(step.src_rect, step.dst_offset);

        if step.aspect_mask.contains(vk::ImageAspectFlags::COLOR) {
            region.src_subresource.aspect_mask = vk::ImageAspectFlags::COLOR;
            region.dst_subresource.aspect_mask = vk::ImageAspectFlags::COLOR;
            unsafe {
                self.device.cmd_copy_image(
                    cmd,
                    src.color.image,
                    src.color.layout,
                    dst.color.image,
                    dst.color.layout,
                    &[region],
                );
            }
        }
        let depth_stencil =
            step.aspect_mask & (vk::ImageAspectFlags::DEPTH | vk::ImageAspectFlags::STENCIL);
        if !depth_stencil.is_empty() {
            region.src_subresource.aspect_mask = depth_stencil;
            region.dst_subresource.aspect_mask = depth_stencil;
            unsafe {
                self.device.cmd_copy_image(
                    cmd,
                    src.depth.image,
                    src.depth.layout,
                    dst.depth.image,
                    dst.depth.layout,
                    &[region],
                );
            }
        }
    }

    fn perform_blit(&self, cmd: vk::CommandBuffer, step: &BlitStep) {
        self.transition_for_transfer(cmd, &step.src, &step.dst, step.aspect_mask);

        let src = step.src.borrow();
        let dst = step.dst.borrow();
        let mut region = blit_region(step.src_rect, step.dst_rect);

        if step.aspect_mask.contains(vk::ImageAspectFlags::COLOR) {
            region.src_subresource.aspect_mask = vk::ImageAspectFlags::COLOR;
            region.dst_subresource.aspect_mask = vk::ImageAspectFlags::COLOR;
            unsafe {
                self.device.cmd_blit_image(
                    cmd,
                    src.color.image,
                    src.color.layout,
                    dst.color.image,
                    dst.color.layout,
                    &[region],
                    step.filter,
                );
            }
        }
        let depth_stencil =
            step.aspect_mask & (vk::ImageAspectFlags::DEPTH | vk::ImageAspectFlags::STENCIL);
        if !depth_stencil.is_empty() {
            // TODO: check the depth format is blittable; copies may be the
            // better default for depth buffers.
            region.src_subresource.aspect_mask = depth_stencil;
            region.dst_subresource.aspect_mask = depth_stencil;
            unsafe {
                self.device.cmd_blit_image(
                    cmd,
                    src.depth.image,
                    src.depth.layout,
                    dst.depth.image,
                    dst.depth.layout,
                    &[region],
                    step.filter,
                );
            }
        }
    }

    /// Move both transfer participants into their transfer layouts,
    /// batching barriers per side: one call for the source, one for the
    /// destination.
    fn transition_for_transfer(
        &self,
        cmd: vk::CommandBuffer,
        src: &FramebufferRef,
        dst: &FramebufferRef,
        aspect_mask: vk::ImageAspectFlags,
    ) {
        let (src_barriers, src_stage) = {
            let mut fb = src.borrow_mut();
            source_transfer_barriers(&mut fb, aspect_mask)
        };
        let (dst_barriers, dst_stage) = {
            let mut fb = dst.borrow_mut();
            dest_transfer_barriers(&mut fb, aspect_mask)
        };

        if !src_barriers.is_empty() {
            unsafe {
                self.device.cmd_pipeline_barrier(
                    cmd,
                    src_stage,
                    vk::PipelineStageFlags::TRANSFER,
                    vk::DependencyFlags::empty(),
                    &[],
                    &[],
                    &src_barriers,
                );
            }
        }
        if !dst_barriers.is_empty() {
            unsafe {
                self.device.cmd_pipeline_barrier(
                    cmd,
                    dst_stage,
                    vk::PipelineStageFlags::TRANSFER,
                    vk::DependencyFlags::empty(),
                    &[],
                    &[],
                    &dst_barriers,
                );
            }
        }
    }
}

/// Tracks the pipeline bound in the current step so duplicate binds
/// collapse. Resets with every render step.
#[derive(Default)]
struct PipelineBindState {
    last_pipeline: vk::Pipeline,
}

impl PipelineBindState {
    /// True exactly when `pipeline` is not the one already bound; records
    /// the bind.
    fn should_bind(&mut self, pipeline: vk::Pipeline) -> bool {
        if self.last_pipeline == pipeline {
            false
        } else {
            self.last_pipeline = pipeline;
            true
        }
    }
}

/// Clear values for an offscreen pass: slot 0 color, slot 1 depth-stencil.
/// Returns how many leading slots the pass begin consumes.
fn fill_offscreen_clear_values(values: &mut [vk::ClearValue; 2], step: &RenderPassStep) -> usize {
    let mut count = 0;
    if step.color_action == RenderPassAction::Clear {
        values[0] = vk::ClearValue {
            color: vk::ClearColorValue {
                float32: unpack_rgba8(step.clear_color),
            },
        };
        count = 1;
    }
    if step.depth_action == RenderPassAction::Clear {
        values[1] = vk::ClearValue {
            depth_stencil: vk::ClearDepthStencilValue {
                depth: step.clear_depth,
                stencil: step.clear_stencil,
            },
        };
        count = 2;
    }
    count
}

/// Attachment-clear descriptors for a mid-pass clear. Empty when the mask
/// selects nothing.
fn attachment_clears(
    mask: vk::ImageAspectFlags,
    color: u32,
    depth: f32,
    stencil: u32,
) -> Vec<vk::ClearAttachment> {
    let mut clears = Vec::with_capacity(2);
    if mask.contains(vk::ImageAspectFlags::COLOR) {
        clears.push(vk::ClearAttachment {
            aspect_mask: vk::ImageAspectFlags::COLOR,
            color_attachment: 0,
            clear_value: vk::ClearValue {
                color: vk::ClearColorValue {
                    float32: unpack_rgba8(color),
                },
            },
        });
    }
    let depth_stencil = mask & (vk::ImageAspectFlags::DEPTH | vk::ImageAspectFlags::STENCIL);
    if !depth_stencil.is_empty() {
        clears.push(vk::ClearAttachment {
            aspect_mask: depth_stencil,
            color_attachment: 0,
            clear_value: vk::ClearValue {
                depth_stencil: vk::ClearDepthStencilValue { depth, stencil },
            },
        });
    }
    clears
}

/// Barriers that move a transfer source's requested aspects into
/// `TRANSFER_SRC_OPTIMAL`, skipping aspects already there.
fn source_transfer_barriers(
    fb: &mut Framebuffer,
    aspect_mask: vk::ImageAspectFlags,
) -> (Vec<vk::ImageMemoryBarrier>, vk::PipelineStageFlags) {
    let mut barriers = Vec::with_capacity(2);
    let mut stage = vk::PipelineStageFlags::empty();

    if aspect_mask.contains(vk::ImageAspectFlags::COLOR)
        && fb.color.layout != vk::ImageLayout::TRANSFER_SRC_OPTIMAL
    {
        let (image_barrier, src_stage) =
            barrier::to_transfer_src(&mut fb.color, vk::ImageAspectFlags::COLOR);
        barriers.push(image_barrier);
        stage |= src_stage;
    }
    // Depth and stencil transition as one; single-aspect depth transfers
    // are not supported.
    if aspect_mask.intersects(vk::ImageAspectFlags::DEPTH | vk::ImageAspectFlags::STENCIL)
        && fb.depth.layout != vk::ImageLayout::TRANSFER_SRC_OPTIMAL
    {
        let (image_barrier, src_stage) = barrier::to_transfer_src(
            &mut fb.depth,
            vk::ImageAspectFlags::DEPTH | vk::ImageAspectFlags::STENCIL,
        );
        barriers.push(image_barrier);
        stage |= src_stage;
    }
    (barriers, stage)
}

/// Barriers that move a transfer destination's requested aspects into
/// `TRANSFER_DST_OPTIMAL`, skipping aspects already there.
fn dest_transfer_barriers(
    fb: &mut Framebuffer,
    aspect_mask: vk::ImageAspectFlags,
) -> (Vec<vk::ImageMemoryBarrier>, vk::PipelineStageFlags) {
    let mut barriers = Vec::with_capacity(2);
    let mut stage = vk::PipelineStageFlags::empty();

    if aspect_mask.contains(vk::ImageAspectFlags::COLOR)
        && fb.color.layout != vk::ImageLayout::TRANSFER_DST_OPTIMAL
    {
        let (image_barrier, src_stage) =
            barrier::to_transfer_dst(&mut fb.color, vk::ImageAspectFlags::COLOR);
        barriers.push(image_barrier);
        stage |= src_stage;
    }
    if aspect_mask.intersects(vk::ImageAspectFlags::DEPTH | vk::ImageAspectFlags::STENCIL)
        && fb.depth.layout != vk::ImageLayout::TRANSFER_DST_OPTIMAL
    {
        let (image_barrier, src_stage) = barrier::to_transfer_dst(
            &mut fb.depth,
            vk::ImageAspectFlags::DEPTH | vk::ImageAspectFlags::STENCIL,
        );
        barriers.push(image_barrier);
        stage |= src_stage;
    }
    (barriers, stage)
}

/// Copy descriptor from a source rectangle and destination corner. Single
/// mip, single layer, unit depth; aspects are filled per issued copy.
fn copy_region(src_rect: vk::Rect2D, dst_offset: vk::Offset2D) -> vk::ImageCopy {
    let subresource = vk::ImageSubresourceLayers {
        aspect_mask: vk::ImageAspectFlags::empty(),
        mip_level: 0,
        base_array_layer: 0,
        layer_count: 1,
    };
    vk::ImageCopy {
        src_subresource: subresource,
        src_offset: vk::Offset3D {
            x: src_rect.offset.x,
            y: src_rect.offset.y,
            z: 0,
        },
        dst_subresource: subresource,
        dst_offset: vk::Offset3D {
            x: dst_offset.x,
            y: dst_offset.y,
            z: 0,
        },
        extent: vk::Extent3D {
            width: src_rect.extent.width,
            height: src_rect.extent.height,
            depth: 1,
        },
    }
}

/// Blit descriptor between two rectangles. Offsets span each rectangle as
/// a unit-depth volume; aspects are filled per issued blit.
fn blit_region(src_rect: vk::Rect2D, dst_rect: vk::Rect2D) -> vk::ImageBlit {
    let subresource = vk::ImageSubresourceLayers {
        aspect_mask: vk::ImageAspectFlags::empty(),
        mip_level: 0,
        base_array_layer: 0,
        layer_count: 1,
    };
    vk::ImageBlit {
        src_subresource: subresource,
        src_offsets: rect_corners(src_rect),
        dst_subresource: subresource,
        dst_offsets: rect_corners(dst_rect),
    }
}

/// Opposite corners of a rectangle as a unit-depth volume
fn rect_corners(rect: vk::Rect2D) -> [vk::Offset3D; 2] {
    [
        vk::Offset3D {
            x: rect.offset.x,
            y: rect.offset.y,
            z: 0,
        },
        vk::Offset3D {
            x: rect.offset.x + rect.extent.width as i32,
            y: rect.offset.y + rect.extent.height as i32,
            z: 1,
        },
    ]
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use ash::vk::Handle;

    use crate::framebuffer::AttachmentImage;

    use super::*;

    fn test_framebuffer(
        color_layout: vk::ImageLayout,
        depth_layout: vk::ImageLayout,
    ) -> Framebuffer {
        Framebuffer::new(
            vk::Framebuffer::null(),
            256,
            128,
            AttachmentImage::new(vk::Image::null(), color_layout),
            AttachmentImage::new(vk::Image::null(), depth_layout),
        )
    }

    fn render_step(color_action: RenderPassAction, depth_action: RenderPassAction) -> RenderPassStep {
        RenderPassStep {
            framebuffer: None,
            color_action,
            depth_action,
            clear_color: 0,
            clear_depth: 0.0,
            clear_stencil: 0,
            num_draws: 0,
            final_color_layout: vk::ImageLayout::UNDEFINED,
            pre_transitions: Vec::new(),
            commands: Vec::new(),
        }
    }

    #[test]
    fn test_pipeline_bind_dedup() {
        let _ = env_logger::builder().is_test(true).try_init();

        let mut state = PipelineBindState::default();
        let pipeline = vk::Pipeline::from_raw(0x10);
        let other = vk::Pipeline::from_raw(0x20);

        assert!(state.should_bind(pipeline));
        assert!(!state.should_bind(pipeline));
        assert!(state.should_bind(other));
        assert!(state.should_bind(pipeline));
    }

    #[test]
    fn test_clear_values_none_when_nothing_clears() {
        let mut values = [vk::ClearValue::default(); 2];
        let step = render_step(RenderPassAction::DontCare, RenderPassAction::DontCare);
        assert_eq!(fill_offscreen_clear_values(&mut values, &step), 0);

        let step = render_step(RenderPassAction::Keep, RenderPassAction::Keep);
        assert_eq!(fill_offscreen_clear_values(&mut values, &step), 0);
    }

    #[test]
    fn test_clear_values_color_only() {
        let mut values = [vk::ClearValue::default(); 2];
        let mut step = render_step(RenderPassAction::Clear, RenderPassAction::Keep);
        step.clear_color = 0xFF20_4060;

        assert_eq!(fill_offscreen_clear_values(&mut values, &step), 1);
        let color = unsafe { values[0].color.float32 };
        assert_relative_eq!(color[0], 0x60 as f32 / 255.0, max_relative = 1.0 / 255.0);
        assert_relative_eq!(color[3], 1.0, max_relative = 1.0 / 255.0);
    }

    #[test]
    fn test_clear_values_depth_forces_two_slots() {
        let mut values = [vk::ClearValue::default(); 2];
        let mut step = render_step(RenderPassAction::Keep, RenderPassAction::Clear);
        step.clear_depth = 1.0;
        step.clear_stencil = 0xFF;

        assert_eq!(fill_offscreen_clear_values(&mut values, &step), 2);
        let depth_stencil = unsafe { values[1].depth_stencil };
        assert_eq!(depth_stencil.depth, 1.0);
        assert_eq!(depth_stencil.stencil, 0xFF);
    }

    #[test]
    fn test_attachment_clears_color_and_depth() {
        let clears = attachment_clears(
            vk::ImageAspectFlags::COLOR | vk::ImageAspectFlags::DEPTH,
            0x8040_2010,
            1.0,
            0,
        );
        assert_eq!(clears.len(), 2);

        assert_eq!(clears[0].aspect_mask, vk::ImageAspectFlags::COLOR);
        assert_eq!(clears[0].color_attachment, 0);
        let color = unsafe { clears[0].clear_value.color.float32 };
        assert_relative_eq!(color[0], 0x10 as f32 / 255.0, max_relative = 1.0 / 255.0);
        assert_relative_eq!(color[1], 0x20 as f32 / 255.0, max_relative = 1.0 / 255.0);
        assert_relative_eq!(color[2], 0x40 as f32 / 255.0, max_relative = 1.0 / 255.0);
        assert_relative_eq!(color[3], 0x80 as f32 / 255.0, max_relative = 1.0 / 255.0);

        assert_eq!(clears[1].aspect_mask, vk::ImageAspectFlags::DEPTH);
        let depth_stencil = unsafe { clears[1].clear_value.depth_stencil };
        assert_eq!(depth_stencil.depth, 1.0);
    }

    #[test]
    fn test_attachment_clears_empty_mask() {
        assert!(attachment_clears(vk::ImageAspectFlags::empty(), 0xFFFF_FFFF, 1.0, 1).is_empty());
    }

    #[test]
    fn test_attachment_clears_stencil_only() {
        let clears = attachment_clears(vk::ImageAspectFlags::STENCIL, 0, 0.0, 7);
        assert_eq!(clears.len(), 1);
        assert_eq!(clears[0].aspect_mask, vk::ImageAspectFlags::STENCIL);
        assert_eq!(unsafe { clears[0].clear_value.depth_stencil.stencil }, 7);
    }

    #[test]
    fn test_source_transfer_barriers_color_and_depth() {
        let mut fb = test_framebuffer(
            vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
            vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL,
        );
        let (barriers, stage) = source_transfer_barriers(
            &mut fb,
            vk::ImageAspectFlags::COLOR | vk::ImageAspectFlags::DEPTH | vk::ImageAspectFlags::STENCIL,
        );

        assert_eq!(barriers.len(), 2);
        assert_eq!(
            stage,
            vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT
                | vk::PipelineStageFlags::EARLY_FRAGMENT_TESTS
                | vk::PipelineStageFlags::LATE_FRAGMENT_TESTS
        );
        assert_eq!(fb.color.layout, vk::ImageLayout::TRANSFER_SRC_OPTIMAL);
        assert_eq!(fb.depth.layout, vk::ImageLayout::TRANSFER_SRC_OPTIMAL);
    }

    #[test]
    fn test_transfer_barriers_skip_matching_layouts() {
        let mut src = test_framebuffer(
            vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
            vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
        );
        let mut dst = test_framebuffer(
            vk::ImageLayout::TRANSFER_DST_OPTIMAL,
            vk::ImageLayout::TRANSFER_DST_OPTIMAL,
        );
        let aspects =
            vk::ImageAspectFlags::COLOR | vk::ImageAspectFlags::DEPTH | vk::ImageAspectFlags::STENCIL;

        let (src_barriers, src_stage) = source_transfer_barriers(&mut src, aspects);
        let (dst_barriers, dst_stage) = dest_transfer_barriers(&mut dst, aspects);

        assert!(src_barriers.is_empty());
        assert!(dst_barriers.is_empty());
        assert_eq!(src_stage, vk::PipelineStageFlags::empty());
        assert_eq!(dst_stage, vk::PipelineStageFlags::empty());
    }

    #[test]
    fn test_dest_transfer_barriers_color_only() {
        let mut fb = test_framebuffer(
            vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
            vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL,
        );
        let (barriers, stage) = dest_transfer_barriers(&mut fb, vk::ImageAspectFlags::COLOR);

        assert_eq!(barriers.len(), 1);
        assert_eq!(barriers[0].new_layout, vk::ImageLayout::TRANSFER_DST_OPTIMAL);
        assert_eq!(stage, vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT);
        assert_eq!(fb.color.layout, vk::ImageLayout::TRANSFER_DST_OPTIMAL);
        // Depth untouched when only color is requested.
        assert_eq!(fb.depth.layout, vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL);
    }

    #[test]
    fn test_copy_region_geometry() {
        let region = copy_region(
            vk::Rect2D {
                offset: vk::Offset2D { x: 8, y: 16 },
                extent: vk::Extent2D {
                    width: 64,
                    height: 32,
                },
            },
            vk::Offset2D { x: 4, y: 2 },
        );

        assert_eq!(region.src_offset, vk::Offset3D { x: 8, y: 16, z: 0 });
        assert_eq!(region.dst_offset, vk::Offset3D { x: 4, y: 2, z: 0 });
        assert_eq!(
            region.extent,
            vk::Extent3D {
                width: 64,
                height: 32,
                depth: 1
            }
        );
        assert_eq!(region.src_subresource.mip_level, 0);
        assert_eq!(region.src_subresource.layer_count, 1);
    }

    #[test]
    fn test_blit_region_corners() {
        let region = blit_region(
            vk::Rect2D {
                offset: vk::Offset2D { x: 10, y: 20 },
                extent: vk::Extent2D {
                    width: 100,
                    height: 50,
                },
            },
            vk::Rect2D {
                offset: vk::Offset2D { x: 0, y: 0 },
                extent: vk::Extent2D {
                    width: 200,
                    height: 100,
                },
            },
        );

        assert_eq!(region.src_offsets[0], vk::Offset3D { x: 10, y: 20, z: 0 });
        assert_eq!(region.src_offsets[1], vk::Offset3D { x: 110, y: 70, z: 1 });
        assert_eq!(region.dst_offsets[0], vk::Offset3D { x: 0, y: 0, z: 0 });
        assert_eq!(region.dst_offsets[1], vk::Offset3D { x: 200, y: 100, z: 1 });
    }

    #[test]
    fn test_offscreen_pass_selection_index() {
        // Keep color + clear depth picks the sixth table entry.
        assert_eq!(
            QueueRunner::index_of(RenderPassAction::Keep, RenderPassAction::Clear),
            5
        );
    }
}
