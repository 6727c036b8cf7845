//! Image layout transition builders
//!
//! Fills the pipeline barriers the runner emits around render passes and
//! transfers. Each helper derives the source access and stage masks from
//! the image's tracked layout, updates that layout, and returns the stage
//! the caller must wait on. A layout outside the tables is a producer bug
//! and aborts.

use ash::vk;

use crate::framebuffer::AttachmentImage;

/// Single mip, single layer subresource range over `aspect`
fn subresource(aspect: vk::ImageAspectFlags) -> vk::ImageSubresourceRange {
    vk::ImageSubresourceRange {
        aspect_mask: aspect,
        base_mip_level: 0,
        level_count: 1,
        base_array_layer: 0,
        layer_count: 1,
    }
}

fn image_barrier(
    image: &AttachmentImage,
    aspect: vk::ImageAspectFlags,
    new_layout: vk::ImageLayout,
    src_access: vk::AccessFlags,
    dst_access: vk::AccessFlags,
) -> vk::ImageMemoryBarrier {
    vk::ImageMemoryBarrier::builder()
        .old_layout(image.layout)
        .new_layout(new_layout)
        .src_access_mask(src_access)
        .dst_access_mask(dst_access)
        .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
        .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
        .image(image.image)
        .subresource_range(subresource(aspect))
        .build()
}

/// Transition an attachment image to `TRANSFER_SRC_OPTIMAL`.
///
/// Returns the filled barrier and the pipeline stage whose work must
/// complete first; OR the stage into the batch's source stage mask. The
/// tracked layout is updated immediately.
pub fn to_transfer_src(
    image: &mut AttachmentImage,
    aspect: vk::ImageAspectFlags,
) -> (vk::ImageMemoryBarrier, vk::PipelineStageFlags) {
    let (src_access, src_stage) = match image.layout {
        vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL => (
            vk::AccessFlags::COLOR_ATTACHMENT_WRITE | vk::AccessFlags::COLOR_ATTACHMENT_READ,
            vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
        ),
        vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL => (
            vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE,
            vk::PipelineStageFlags::EARLY_FRAGMENT_TESTS | vk::PipelineStageFlags::LATE_FRAGMENT_TESTS,
        ),
        vk::ImageLayout::TRANSFER_SRC_OPTIMAL => (
            vk::AccessFlags::TRANSFER_READ,
            vk::PipelineStageFlags::TRANSFER,
        ),
        vk::ImageLayout::TRANSFER_DST_OPTIMAL => (
            vk::AccessFlags::TRANSFER_WRITE,
            vk::PipelineStageFlags::TRANSFER,
        ),
        vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL => (
            vk::AccessFlags::SHADER_READ,
            vk::PipelineStageFlags::FRAGMENT_SHADER,
        ),
        other => panic!("cannot transition {other:?} to TRANSFER_SRC_OPTIMAL"),
    };

    let barrier = image_barrier(
        image,
        aspect,
        vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
        src_access,
        vk::AccessFlags::TRANSFER_READ,
    );
    image.layout = vk::ImageLayout::TRANSFER_SRC_OPTIMAL;
    (barrier, src_stage)
}

/// Transition an attachment image to `TRANSFER_DST_OPTIMAL`.
///
/// Same contract as [`to_transfer_src`].
pub fn to_transfer_dst(
    image: &mut AttachmentImage,
    aspect: vk::ImageAspectFlags,
) -> (vk::ImageMemoryBarrier, vk::PipelineStageFlags) {
    let (src_access, src_stage) = match image.layout {
        vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL => (
            vk::AccessFlags::COLOR_ATTACHMENT_WRITE,
            vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
        ),
        vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL => (
            vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE,
            vk::PipelineStageFlags::EARLY_FRAGMENT_TESTS | vk::PipelineStageFlags::LATE_FRAGMENT_TESTS,
        ),
        vk::ImageLayout::TRANSFER_SRC_OPTIMAL => (
            vk::AccessFlags::TRANSFER_READ,
            vk::PipelineStageFlags::TRANSFER,
        ),
        vk::ImageLayout::TRANSFER_DST_OPTIMAL => (
            vk::AccessFlags::TRANSFER_WRITE,
            vk::PipelineStageFlags::TRANSFER,
        ),
        vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL => (
            vk::AccessFlags::SHADER_READ,
            vk::PipelineStageFlags::FRAGMENT_SHADER,
        ),
        other => panic!("cannot transition {other:?} to TRANSFER_DST_OPTIMAL"),
    };

    let barrier = image_barrier(
        image,
        aspect,
        vk::ImageLayout::TRANSFER_DST_OPTIMAL,
        src_access,
        vk::AccessFlags::TRANSFER_WRITE,
    );
    image.layout = vk::ImageLayout::TRANSFER_DST_OPTIMAL;
    (barrier, src_stage)
}

/// Honor a pre-transition request on a color attachment.
///
/// Returns `None` when the image already holds the requested layout,
/// otherwise the barrier plus source and destination stages.
pub fn pre_transition(
    image: &mut AttachmentImage,
    target: vk::ImageLayout,
) -> Option<(vk::ImageMemoryBarrier, vk::PipelineStageFlags, vk::PipelineStageFlags)> {
    if image.layout == target {
        return None;
    }

    let (src_access, src_stage) = match image.layout {
        vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL => (
            vk::AccessFlags::COLOR_ATTACHMENT_WRITE | vk::AccessFlags::COLOR_ATTACHMENT_READ,
            vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
        ),
        vk::ImageLayout::TRANSFER_DST_OPTIMAL => (
            vk::AccessFlags::TRANSFER_WRITE,
            vk::PipelineStageFlags::TRANSFER,
        ),
        vk::ImageLayout::TRANSFER_SRC_OPTIMAL => (
            vk::AccessFlags::TRANSFER_READ,
            vk::PipelineStageFlags::TRANSFER,
        ),
        other => panic!("unsupported source layout {other:?} for pre-transition"),
    };
    let (dst_access, dst_stage) = match target {
        vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL => (
            vk::AccessFlags::SHADER_READ,
            vk::PipelineStageFlags::FRAGMENT_SHADER,
        ),
        other => panic!("unsupported target layout {other:?} for pre-transition"),
    };

    let barrier = image_barrier(image, vk::ImageAspectFlags::COLOR, target, src_access, dst_access);
    image.layout = target;
    Some((barrier, src_stage, dst_stage))
}

/// Make a color attachment renderable before its pass begins.
///
/// Returns `None` when the image is already in `COLOR_ATTACHMENT_OPTIMAL`.
/// The destination stage is color attachment output.
pub fn to_color_attachment(
    image: &mut AttachmentImage,
) -> Option<(vk::ImageMemoryBarrier, vk::PipelineStageFlags)> {
    if image.layout == vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL {
        return None;
    }

    let (src_access, src_stage) = match image.layout {
        vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL => (
            vk::AccessFlags::SHADER_READ,
            vk::PipelineStageFlags::FRAGMENT_SHADER,
        ),
        vk::ImageLayout::TRANSFER_DST_OPTIMAL => (
            vk::AccessFlags::TRANSFER_WRITE,
            vk::PipelineStageFlags::TRANSFER,
        ),
        vk::ImageLayout::TRANSFER_SRC_OPTIMAL => (
            vk::AccessFlags::TRANSFER_READ,
            vk::PipelineStageFlags::TRANSFER,
        ),
        other => panic!("cannot rebind {other:?} as a color attachment"),
    };

    let barrier = image_barrier(
        image,
        vk::ImageAspectFlags::COLOR,
        vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
        src_access,
        vk::AccessFlags::COLOR_ATTACHMENT_WRITE | vk::AccessFlags::COLOR_ATTACHMENT_READ,
    );
    image.layout = vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL;
    Some((barrier, src_stage))
}

/// Make a depth-stencil attachment renderable before its pass begins.
///
/// Depth and stencil aspects transition together. Returns `None` when the
/// image is already in `DEPTH_STENCIL_ATTACHMENT_OPTIMAL`. The destination
/// stages are the early and late fragment tests.
pub fn to_depth_attachment(
    image: &mut AttachmentImage,
) -> Option<(vk::ImageMemoryBarrier, vk::PipelineStageFlags)> {
    if image.layout == vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL {
        return None;
    }

    let (src_access, src_stage) = match image.layout {
        vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL => (
            vk::AccessFlags::SHADER_READ,
            vk::PipelineStageFlags::FRAGMENT_SHADER,
        ),
        vk::ImageLayout::TRANSFER_SRC_OPTIMAL => (
            vk::AccessFlags::TRANSFER_READ,
            vk::PipelineStageFlags::TRANSFER,
        ),
        vk::ImageLayout::TRANSFER_DST_OPTIMAL => (
            vk::AccessFlags::TRANSFER_WRITE,
            vk::PipelineStageFlags::TRANSFER,
        ),
        other => panic!("cannot rebind {other:?} as a depth-stencil attachment"),
    };

    let barrier = image_barrier(
        image,
        vk::ImageAspectFlags::DEPTH | vk::ImageAspectFlags::STENCIL,
        vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL,
        src_access,
        vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE
            | vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_READ,
    );
    image.layout = vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL;
    Some((barrier, src_stage))
}

/// Move the color attachment to the layout the producer asked for after
/// its pass ends.
///
/// The source stage envelope is supplied by the caller (`ALL_GRAPHICS`
/// between passes); the returned stage is the destination to unblock.
pub fn final_color_transition(
    image: &mut AttachmentImage,
    target: vk::ImageLayout,
) -> (vk::ImageMemoryBarrier, vk::PipelineStageFlags) {
    let src_access = match image.layout {
        vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL => {
            vk::AccessFlags::COLOR_ATTACHMENT_WRITE | vk::AccessFlags::COLOR_ATTACHMENT_READ
        }
        vk::ImageLayout::TRANSFER_DST_OPTIMAL => vk::AccessFlags::TRANSFER_WRITE,
        other => panic!("unsupported source layout {other:?} for post-pass transition"),
    };
    let (dst_access, dst_stage) = match target {
        vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL => (
            vk::AccessFlags::SHADER_READ,
            vk::PipelineStageFlags::FRAGMENT_SHADER,
        ),
        other => panic!("unsupported target layout {other:?} for post-pass transition"),
    };

    let barrier = image_barrier(image, vk::ImageAspectFlags::COLOR, target, src_access, dst_access);
    image.layout = target;
    (barrier, dst_stage)
}
