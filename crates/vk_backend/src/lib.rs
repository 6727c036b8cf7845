//! # vk_backend
//!
//! Vulkan rendering backend built around recorded render steps. The
//! renderer core records high-level steps (render passes, copies, blits,
//! readbacks) into a queue; the queue runner replays them onto a command
//! buffer, inserting the pipeline barriers and layout transitions the API
//! requires and selecting compatible render passes from a fixed cache.
//!
//! ## Structure
//!
//! - [`runner::QueueRunner`] walks the step queue and records commands
//! - [`render_pass::RenderPassCache`] holds the backbuffer pass plus the
//!   3×3 offscreen load-behavior variants
//! - [`barrier`] builds image layout transitions from tracked state
//! - [`step`] defines the step and command records the producer fills in
//! - [`framebuffer`] describes externally owned render targets whose
//!   attachment layouts the runner tracks
//!
//! Pipeline objects, descriptor sets, buffer and image memory, windowing,
//! and queue submission are owned by collaborating subsystems; the runner
//! records, it never submits.

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod barrier;
pub mod config;
pub mod context;
pub mod framebuffer;
pub mod render_pass;
pub mod runner;
pub mod step;

pub use config::{ConfigError, OffscreenColorFormat, RunnerConfig};
pub use context::{DeviceContext, VulkanError, VulkanResult};
pub use framebuffer::{AttachmentImage, Framebuffer, FramebufferRef};
pub use render_pass::RenderPassCache;
pub use runner::QueueRunner;
pub use step::{
    BlitStep, CopyStep, DynamicOffsets, ReadbackStep, RenderCommand, RenderPassAction,
    RenderPassStep, Step, TransitionRequest,
};
