//! Device context shared with the queue runner
//!
//! A read-only view of the device state owned by the renderer core. The
//! runner copies what it needs at construction and never destroys any of it.

use ash::vk;
use thiserror::Error;

/// Vulkan-specific error types
#[derive(Error, Debug)]
pub enum VulkanError {
    /// General Vulkan API error with result code
    #[error("Vulkan API error: {0:?}")]
    Api(vk::Result),

    /// Object creation failed before the backend was usable
    #[error("Initialization failed: {0}")]
    InitializationFailed(String),

    /// Invalid operation attempted
    #[error("Invalid operation: {reason}")]
    InvalidOperation {
        /// Description of why the operation is invalid
        reason: String,
    },
}

/// Result type for Vulkan operations
pub type VulkanResult<T> = Result<T, VulkanError>;

/// Device state the queue runner records against.
///
/// The device handle, swapchain format and backbuffer dimensions are all
/// owned elsewhere; this bundle only carries them across the subsystem
/// boundary.
pub struct DeviceContext {
    device: ash::Device,
    swapchain_format: vk::Format,
    depth_stencil_format: vk::Format,
    backbuffer_extent: vk::Extent2D,
}

impl DeviceContext {
    /// Bundle an existing logical device with the formats and backbuffer
    /// size the runner needs
    pub fn new(
        device: ash::Device,
        swapchain_format: vk::Format,
        depth_stencil_format: vk::Format,
        backbuffer_extent: vk::Extent2D,
    ) -> Self {
        Self {
            device,
            swapchain_format,
            depth_stencil_format,
            backbuffer_extent,
        }
    }

    /// Get the raw device handle
    pub fn raw_device(&self) -> &ash::Device {
        &self.device
    }

    /// Color format of the swapchain images
    pub fn swapchain_format(&self) -> vk::Format {
        self.swapchain_format
    }

    /// Preferred depth-stencil format for attachments.
    ///
    /// The same format must be used for the backbuffer depth image.
    pub fn depth_stencil_format(&self) -> vk::Format {
        self.depth_stencil_format
    }

    /// Backbuffer dimensions in pixels
    pub fn backbuffer_extent(&self) -> vk::Extent2D {
        self.backbuffer_extent
    }
}
