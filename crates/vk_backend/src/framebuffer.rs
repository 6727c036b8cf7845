//! Render targets with tracked attachment layouts
//!
//! Framebuffers and their images are created and destroyed by the
//! framebuffer manager; the runner only reads their handles and mutates the
//! tracked layout of each attachment as it emits barriers.

use std::cell::RefCell;
use std::rc::Rc;

use ash::vk;

/// One attachment image together with its tracked layout.
///
/// `layout` is the runner's record of the layout the image was last left
/// in. Every barrier and render pass the runner emits keeps it current, so
/// later steps observe the state earlier steps produced.
#[derive(Debug, Clone, Copy)]
pub struct AttachmentImage {
    /// Image handle, owned by the framebuffer manager
    pub image: vk::Image,
    /// Layout the image currently holds
    pub layout: vk::ImageLayout,
}

impl AttachmentImage {
    /// Wrap an image handle with its known current layout
    pub fn new(image: vk::Image, layout: vk::ImageLayout) -> Self {
        Self { image, layout }
    }
}

/// An offscreen render target: a color and a depth-stencil attachment bound
/// into one framebuffer, with its pixel dimensions.
#[derive(Debug)]
pub struct Framebuffer {
    /// Framebuffer handle, owned by the framebuffer manager
    pub framebuffer: vk::Framebuffer,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Color attachment
    pub color: AttachmentImage,
    /// Depth-stencil attachment
    pub depth: AttachmentImage,
}

impl Framebuffer {
    /// Describe an externally created framebuffer
    pub fn new(
        framebuffer: vk::Framebuffer,
        width: u32,
        height: u32,
        color: AttachmentImage,
        depth: AttachmentImage,
    ) -> Self {
        Self {
            framebuffer,
            width,
            height,
            color,
            depth,
        }
    }

    /// Wrap into the shared handle steps carry
    pub fn into_ref(self) -> FramebufferRef {
        Rc::new(RefCell::new(self))
    }
}

/// Shared mutable handle to a framebuffer.
///
/// Steps reference framebuffers they do not own, and executing a step
/// updates the tracked attachment layouts through that reference. The
/// runner is single-threaded, so the interior mutability is a `RefCell`,
/// not a lock.
pub type FramebufferRef = Rc<RefCell<Framebuffer>>;
