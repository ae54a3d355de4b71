//! Vulkan swapchain management
//!
//! Surface queries, the selection rules for format, present mode, extent and
//! image count, and the RAII swap chain with its image views.

use crate::render::backends::vulkan::{PhysicalDeviceInfo, QueueFamilyIndices, VulkanError, VulkanResult};
use ash::extensions::khr::{Surface, Swapchain as SwapchainLoader};
use ash::{vk, Device};

/// Surface format used when the surface reports no preference
pub const PREFERRED_SURFACE_FORMAT: vk::SurfaceFormatKHR = vk::SurfaceFormatKHR {
    format: vk::Format::B8G8R8A8_UNORM,
    color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
};

/// Pick a surface format
///
/// A single `UNDEFINED` entry means any format is acceptable. Otherwise the
/// preferred format is taken when offered, else the first entry.
pub fn choose_surface_format(formats: &[vk::SurfaceFormatKHR]) -> Option<vk::SurfaceFormatKHR> {
    match formats {
        [] => None,
        [only] if only.format == vk::Format::UNDEFINED => Some(PREFERRED_SURFACE_FORMAT),
        _ => formats
            .iter()
            .copied()
            .find(|sf| {
                sf.format == PREFERRED_SURFACE_FORMAT.format
                    && sf.color_space == PREFERRED_SURFACE_FORMAT.color_space
            })
            .or_else(|| formats.first().copied()),
    }
}

/// Pick MAILBOX when available, else FIFO which every device supports
pub fn choose_present_mode(modes: &[vk::PresentModeKHR]) -> vk::PresentModeKHR {
    modes
        .iter()
        .copied()
        .find(|&mode| mode == vk::PresentModeKHR::MAILBOX)
        .unwrap_or(vk::PresentModeKHR::FIFO)
}

/// Use the surface's current extent unless it is the `u32::MAX` sentinel, in
/// which case the window size is clamped to the supported range
pub fn choose_extent(caps: &vk::SurfaceCapabilitiesKHR, window_extent: vk::Extent2D) -> vk::Extent2D {
    if caps.current_extent.width != u32::MAX {
        return caps.current_extent;
    }
    vk::Extent2D {
        width: window_extent
            .width
            .clamp(caps.min_image_extent.width, caps.max_image_extent.width),
        height: window_extent
            .height
            .clamp(caps.min_image_extent.height, caps.max_image_extent.height),
    }
}

/// One more than the minimum, capped by the maximum when the surface has one
pub fn choose_image_count(caps: &vk::SurfaceCapabilitiesKHR) -> u32 {
    let wanted = caps.min_image_count + 1;
    if caps.max_image_count > 0 {
        wanted.min(caps.max_image_count)
    } else {
        wanted
    }
}

/// What a surface supports on a given physical device
#[derive(Debug, Clone, Default)]
pub struct SwapchainSupport {
    /// Image counts, extents and transforms
    pub capabilities: vk::SurfaceCapabilitiesKHR,
    /// Supported surface formats
    pub formats: Vec<vk::SurfaceFormatKHR>,
    /// Supported present modes
    pub present_modes: Vec<vk::PresentModeKHR>,
}

impl SwapchainSupport {
    /// Query the surface
    pub fn query(
        surface_loader: &Surface,
        physical_device: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
    ) -> VulkanResult<Self> {
        // SAFETY: surface and physical_device come from the same instance as the loader.
        unsafe {
            Ok(Self {
                capabilities: surface_loader
                    .get_physical_device_surface_capabilities(physical_device, surface)
                    .map_err(VulkanError::Api)?,
                formats: surface_loader
                    .get_physical_device_surface_formats(physical_device, surface)
                    .map_err(VulkanError::Api)?,
                present_modes: surface_loader
                    .get_physical_device_surface_present_modes(physical_device, surface)
                    .map_err(VulkanError::Api)?,
            })
        }
    }

    /// At least one format and one present mode
    pub fn is_adequate(&self) -> bool {
        !self.formats.is_empty() && !self.present_modes.is_empty()
    }
}

/// Swapchain management wrapper with RAII cleanup
pub struct Swapchain {
    device: Device,
    swapchain_loader: SwapchainLoader,
    swapchain: vk::SwapchainKHR,
    images: Vec<vk::Image>,
    image_views: Vec<vk::ImageView>,
    format: vk::SurfaceFormatKHR,
    extent: vk::Extent2D,
}

impl Swapchain {
    /// Create a swap chain for the surface
    ///
    /// `old_swapchain` may be null; when set it is handed to the driver so
    /// in-flight presentation can retire cleanly. The caller still owns and
    /// destroys it.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        device: Device,
        swapchain_loader: SwapchainLoader,
        surface: vk::SurfaceKHR,
        surface_loader: &Surface,
        physical_device_info: &PhysicalDeviceInfo,
        window_extent: vk::Extent2D,
        old_swapchain: vk::SwapchainKHR,
    ) -> VulkanResult<Self> {
        let support = SwapchainSupport::query(surface_loader, physical_device_info.device, surface)?;

        let format = choose_surface_format(&support.formats).ok_or_else(|| {
            VulkanError::InitializationFailed("Surface reports no formats".to_string())
        })?;
        let present_mode = choose_present_mode(&support.present_modes);
        let extent = choose_extent(&support.capabilities, window_extent);
        if extent.width == 0 || extent.height == 0 {
            return Err(VulkanError::ZeroAreaSurface {
                width: extent.width,
                height: extent.height,
            });
        }
        let image_count = choose_image_count(&support.capabilities);

        let families: QueueFamilyIndices = physical_device_info.queue_families;
        let family_indices = [families.graphics, families.present];

        let mut create_info = vk::SwapchainCreateInfoKHR::builder()
            .surface(surface)
            .min_image_count(image_count)
            .image_format(format.format)
            .image_color_space(format.color_space)
            .image_extent(extent)
            .image_array_layers(1)
            .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT)
            .pre_transform(support.capabilities.current_transform)
            .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
            .present_mode(present_mode)
            .clipped(true)
            .old_swapchain(old_swapchain);

        create_info = if families.is_split() {
            create_info
                .image_sharing_mode(vk::SharingMode::CONCURRENT)
                .queue_family_indices(&family_indices)
        } else {
            create_info.image_sharing_mode(vk::SharingMode::EXCLUSIVE)
        };

        // SAFETY: create_info only borrows locals that outlive the call.
        let swapchain = unsafe { swapchain_loader.create_swapchain(&create_info, None) }
            .map_err(VulkanError::Api)?;

        // SAFETY: swapchain was just created by this loader.
        let images = match unsafe { swapchain_loader.get_swapchain_images(swapchain) } {
            Ok(images) => images,
            Err(err) => {
                unsafe { swapchain_loader.destroy_swapchain(swapchain, None) };
                return Err(VulkanError::Api(err));
            }
        };

        let mut this = Self {
            device,
            swapchain_loader,
            swapchain,
            images,
            image_views: Vec::new(),
            format,
            extent,
        };

        // Views are pushed one by one so Drop releases a partial set on failure.
        for image in this.images.clone() {
            let view = this.create_image_view(image)?;
            this.image_views.push(view);
        }

        log::debug!(
            "Swap chain created: {}x{}, {} images, {:?}, {:?}",
            extent.width,
            extent.height,
            this.images.len(),
            format.format,
            present_mode
        );

        Ok(this)
    }

    fn create_image_view(&self, image: vk::Image) -> VulkanResult<vk::ImageView> {
        let create_info = vk::ImageViewCreateInfo::builder()
            .image(image)
            .view_type(vk::ImageViewType::TYPE_2D)
            .format(self.format.format)
            .components(vk::ComponentMapping {
                r: vk::ComponentSwizzle::IDENTITY,
                g: vk::ComponentSwizzle::IDENTITY,
                b: vk::ComponentSwizzle::IDENTITY,
                a: vk::ComponentSwizzle::IDENTITY,
            })
            .subresource_range(vk::ImageSubresourceRange {
                aspect_mask: vk::ImageAspectFlags::COLOR,
                base_mip_level: 0,
                level_count: 1,
                base_array_layer: 0,
                layer_count: 1,
            });

        // SAFETY: image belongs to this swap chain.
        unsafe { self.device.create_image_view(&create_info, None) }.map_err(VulkanError::Api)
    }

    /// Get swapchain extent
    pub const fn extent(&self) -> vk::Extent2D {
        self.extent
    }

    /// Get surface format
    pub const fn format(&self) -> vk::SurfaceFormatKHR {
        self.format
    }

    /// Get image views
    pub fn image_views(&self) -> &[vk::ImageView] {
        &self.image_views
    }

    /// Get swapchain handle
    pub const fn handle(&self) -> vk::SwapchainKHR {
        self.swapchain
    }

    /// Get swapchain loader
    pub const fn loader(&self) -> &SwapchainLoader {
        &self.swapchain_loader
    }

    /// Number of images the driver actually created
    pub fn image_count(&self) -> u32 {
        u32::try_from(self.images.len()).unwrap_or(u32::MAX)
    }
}

impl Drop for Swapchain {
    fn drop(&mut self) {
        unsafe {
            for &image_view in &self.image_views {
                self.device.destroy_image_view(image_view, None);
            }
            self.swapchain_loader.destroy_swapchain(self.swapchain, None);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn caps(current: (u32, u32), min_count: u32, max_count: u32) -> vk::SurfaceCapabilitiesKHR {
        vk::SurfaceCapabilitiesKHR {
            min_image_count: min_count,
            max_image_count: max_count,
            current_extent: vk::Extent2D {
                width: current.0,
                height: current.1,
            },
            min_image_extent: vk::Extent2D { width: 16, height: 16 },
            max_image_extent: vk::Extent2D {
                width: 2048,
                height: 2048,
            },
            ..Default::default()
        }
    }

    fn format(format: vk::Format, color_space: vk::ColorSpaceKHR) -> vk::SurfaceFormatKHR {
        vk::SurfaceFormatKHR { format, color_space }
    }

    #[test]
    fn test_undefined_format_means_free_choice() {
        let formats = [format(vk::Format::UNDEFINED, vk::ColorSpaceKHR::SRGB_NONLINEAR)];
        assert_eq!(choose_surface_format(&formats), Some(PREFERRED_SURFACE_FORMAT));
    }

    #[test]
    fn test_preferred_format_wins() {
        let formats = [
            format(vk::Format::R8G8B8A8_UNORM, vk::ColorSpaceKHR::SRGB_NONLINEAR),
            PREFERRED_SURFACE_FORMAT,
        ];
        assert_eq!(choose_surface_format(&formats), Some(PREFERRED_SURFACE_FORMAT));
    }

    #[test]
    fn test_first_format_fallback() {
        let first = format(vk::Format::R8G8B8A8_SRGB, vk::ColorSpaceKHR::SRGB_NONLINEAR);
        let formats = [
            first,
            format(vk::Format::B8G8R8A8_UNORM, vk::ColorSpaceKHR::EXTENDED_SRGB_LINEAR_EXT),
        ];
        assert_eq!(choose_surface_format(&formats), Some(first));
        assert_eq!(choose_surface_format(&[]), None);
    }

    #[test]
    fn test_present_mode_selection() {
        assert_eq!(
            choose_present_mode(&[vk::PresentModeKHR::FIFO, vk::PresentModeKHR::MAILBOX]),
            vk::PresentModeKHR::MAILBOX
        );
        assert_eq!(
            choose_present_mode(&[vk::PresentModeKHR::IMMEDIATE, vk::PresentModeKHR::FIFO]),
            vk::PresentModeKHR::FIFO
        );
        assert_eq!(choose_present_mode(&[]), vk::PresentModeKHR::FIFO);
    }

    #[test]
    fn test_extent_uses_current_extent() {
        let window = vk::Extent2D { width: 10, height: 10 };
        assert_eq!(
            choose_extent(&caps((640, 480), 2, 3), window),
            vk::Extent2D {
                width: 640,
                height: 480
            }
        );
    }

    #[test]
    fn test_extent_clamps_window_size() {
        let capabilities = caps((u32::MAX, u32::MAX), 2, 3);
        let large = vk::Extent2D {
            width: 5000,
            height: 900,
        };
        assert_eq!(
            choose_extent(&capabilities, large),
            vk::Extent2D {
                width: 2048,
                height: 900
            }
        );

        let small = vk::Extent2D { width: 1, height: 1 };
        assert_eq!(
            choose_extent(&capabilities, small),
            vk::Extent2D { width: 16, height: 16 }
        );
    }

    #[test]
    fn test_image_count() {
        assert_eq!(choose_image_count(&caps((1, 1), 2, 3)), 3);
        assert_eq!(choose_image_count(&caps((1, 1), 2, 2)), 2);
        assert_eq!(choose_image_count(&caps((1, 1), 2, 0)), 3);
        assert_eq!(choose_image_count(&caps((1, 1), 1, 8)), 2);
    }

    #[test]
    fn test_support_adequacy() {
        let mut support = SwapchainSupport::default();
        assert!(!support.is_adequate());
        support.formats.push(PREFERRED_SURFACE_FORMAT);
        assert!(!support.is_adequate());
        support.present_modes.push(vk::PresentModeKHR::FIFO);
        assert!(support.is_adequate());
    }
}
