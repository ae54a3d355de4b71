//! Vulkan context management
//!
//! Instance, debug messenger, surface, physical device and logical device,
//! created in that order and destroyed in reverse.

use super::window::Window;
use crate::assets::AssetError;
use crate::core::config::RendererConfig;
use ash::extensions::ext::DebugUtils;
use ash::extensions::khr::{Surface, Swapchain as SwapchainLoader};
use ash::{vk, Device, Entry, Instance};
use std::collections::HashSet;
use std::ffi::{c_char, CStr, CString};
use thiserror::Error;

/// Khronos validation layer
pub const VALIDATION_LAYER: &CStr = c"VK_LAYER_KHRONOS_validation";

/// Vulkan-specific error types
#[derive(Error, Debug)]
pub enum VulkanError {
    /// General Vulkan API error with result code
    #[error("Vulkan API error: {0:?}")]
    Api(vk::Result),

    /// The Vulkan loader could not be found or opened
    #[error("Failed to load Vulkan: {0}")]
    Loading(String),

    /// Vulkan context initialization failed
    #[error("Initialization failed: {0}")]
    InitializationFailed(String),

    /// Validation was requested but the layer is not installed
    #[error("Validation layer requested but not available: {0}")]
    MissingValidationLayer(String),

    /// The instance reports no physical devices
    #[error("Failed to find GPUs with Vulkan support")]
    NoVulkanDevice,

    /// No physical device can draw to the surface
    #[error("Failed to find a suitable GPU")]
    NoSuitableDevice,

    /// No suitable memory type found for allocation
    #[error("No suitable memory type found")]
    NoSuitableMemoryType,

    /// The surface currently has zero width or height, e.g. while minimized
    #[error("Surface has zero area ({width}x{height})")]
    ZeroAreaSurface {
        /// Surface width
        width: u32,
        /// Surface height
        height: u32,
    },

    /// Invalid operation attempted
    #[error("Invalid operation: {reason}")]
    InvalidOperation {
        /// Description of why the operation is invalid
        reason: String,
    },

    /// A shader binary could not be read
    #[error("Failed to read shader {path}: {source}")]
    ShaderLoad {
        /// Shader file path
        path: String,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// Shader bytes are not valid SPIR-V
    #[error("Invalid SPIR-V: {0}")]
    InvalidSpirv(String),

    /// Image layout transition the texture upload does not know
    #[error("Unsupported layout transition from {old:?} to {new:?}")]
    UnsupportedLayoutTransition {
        /// Current layout
        old: vk::ImageLayout,
        /// Requested layout
        new: vk::ImageLayout,
    },

    /// Texture asset could not be loaded
    #[error(transparent)]
    Asset(#[from] AssetError),
}

/// Result type for Vulkan operations
pub type VulkanResult<T> = Result<T, VulkanError>;

/// Whether every layer in `requested` appears in `available`
pub fn layers_supported(available: &[vk::LayerProperties], requested: &[&CStr]) -> bool {
    requested.iter().all(|wanted| {
        available.iter().any(|layer| {
            // SAFETY: layer_name is a NUL-terminated fixed array filled by the driver.
            unsafe { CStr::from_ptr(layer.layer_name.as_ptr()) == *wanted }
        })
    })
}

/// Whether every extension in `required` appears in `available`
pub fn extensions_supported(available: &[vk::ExtensionProperties], required: &[&CStr]) -> bool {
    required.iter().all(|wanted| {
        available.iter().any(|ext| {
            // SAFETY: extension_name is a NUL-terminated fixed array filled by the driver.
            unsafe { CStr::from_ptr(ext.extension_name.as_ptr()) == *wanted }
        })
    })
}

/// Graphics and present queue family indices
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueFamilyIndices {
    /// Family accepting graphics work
    pub graphics: u32,
    /// Family able to present to the surface
    pub present: u32,
}

impl QueueFamilyIndices {
    /// Pick the first family with graphics support and the first that can
    /// present; families reporting no queues are skipped
    pub fn select<F>(families: &[vk::QueueFamilyProperties], mut can_present: F) -> VulkanResult<Option<Self>>
    where
        F: FnMut(u32) -> VulkanResult<bool>,
    {
        let mut graphics = None;
        let mut present = None;

        for (index, family) in (0u32..).zip(families) {
            if family.queue_count == 0 {
                continue;
            }
            if graphics.is_none() && family.queue_flags.contains(vk::QueueFlags::GRAPHICS) {
                graphics = Some(index);
            }
            if present.is_none() && can_present(index)? {
                present = Some(index);
            }
            if graphics.is_some() && present.is_some() {
                break;
            }
        }

        Ok(graphics.zip(present).map(|(graphics, present)| Self { graphics, present }))
    }

    /// Whether graphics and present run on different families
    pub const fn is_split(&self) -> bool {
        self.graphics != self.present
    }

    /// Distinct family indices, graphics first
    pub fn unique(&self) -> Vec<u32> {
        let mut seen = HashSet::new();
        [self.graphics, self.present]
            .into_iter()
            .filter(|family| seen.insert(*family))
            .collect()
    }
}

/// Vulkan instance wrapper with RAII cleanup
pub struct VulkanInstance {
    /// Vulkan entry point
    pub entry: Entry,
    /// Vulkan instance handle
    pub instance: Instance,
    /// Debug utilities extension, present when validation is on
    pub debug_utils: Option<DebugUtils>,
    /// Debug messenger handle
    pub debug_messenger: vk::DebugUtilsMessengerEXT,
}

impl VulkanInstance {
    /// Create the instance, checking the validation layer first when enabled
    pub fn new(window: &Window, config: &RendererConfig) -> VulkanResult<Self> {
        // SAFETY: loading the system Vulkan library has no preconditions beyond it being a valid loader.
        let entry = unsafe { Entry::load() }.map_err(|e| VulkanError::Loading(e.to_string()))?;
        let enable_validation = config.validation_enabled();

        if enable_validation {
            let available = entry
                .enumerate_instance_layer_properties()
                .map_err(VulkanError::Api)?;
            if !layers_supported(&available, &[VALIDATION_LAYER]) {
                return Err(VulkanError::MissingValidationLayer(
                    VALIDATION_LAYER.to_string_lossy().into_owned(),
                ));
            }
        }

        let to_cstring = |s: &str| {
            CString::new(s).map_err(|e| VulkanError::InitializationFailed(format!("Invalid name {s:?}: {e}")))
        };
        let app_name = to_cstring(&config.application_name)?;
        let engine_name = to_cstring(&config.engine_name)?;
        let (major, minor, patch) = config.application_version;
        let app_info = vk::ApplicationInfo::builder()
            .application_name(&app_name)
            .application_version(vk::make_api_version(0, major, minor, patch))
            .engine_name(&engine_name)
            .engine_version(vk::make_api_version(0, 1, 0, 0))
            .api_version(vk::API_VERSION_1_0);

        let required_extensions = window
            .required_instance_extensions()
            .map_err(|e| VulkanError::InitializationFailed(format!("Failed to get required extensions: {e}")))?;
        let extension_names = required_extensions
            .iter()
            .map(|ext| to_cstring(ext))
            .collect::<VulkanResult<Vec<_>>>()?;
        let mut extensions: Vec<*const c_char> = extension_names.iter().map(|ext| ext.as_ptr()).collect();
        if enable_validation {
            extensions.push(DebugUtils::name().as_ptr());
        }

        let layers: Vec<*const c_char> = if enable_validation {
            vec![VALIDATION_LAYER.as_ptr()]
        } else {
            Vec::new()
        };

        log::debug!(
            "Creating instance with extensions {:?}, validation {}",
            required_extensions,
            if enable_validation { "on" } else { "off" }
        );

        let create_info = vk::InstanceCreateInfo::builder()
            .application_info(&app_info)
            .enabled_extension_names(&extensions)
            .enabled_layer_names(&layers);

        // SAFETY: every pointer in create_info outlives this call.
        let instance = unsafe { entry.create_instance(&create_info, None) }.map_err(VulkanError::Api)?;

        let (debug_utils, debug_messenger) = if enable_validation {
            let debug_utils = DebugUtils::new(&entry, &instance);
            match Self::setup_debug_messenger(&debug_utils) {
                Ok(messenger) => (Some(debug_utils), messenger),
                Err(err) => {
                    // SAFETY: nothing else has been created from this instance yet.
                    unsafe { instance.destroy_instance(None) };
                    return Err(err);
                }
            }
        } else {
            (None, vk::DebugUtilsMessengerEXT::null())
        };

        Ok(Self {
            entry,
            instance,
            debug_utils,
            debug_messenger,
        })
    }

    fn setup_debug_messenger(debug_utils: &DebugUtils) -> VulkanResult<vk::DebugUtilsMessengerEXT> {
        let create_info = vk::DebugUtilsMessengerCreateInfoEXT::builder()
            .message_severity(
                vk::DebugUtilsMessageSeverityFlagsEXT::VERBOSE
                    | vk::DebugUtilsMessageSeverityFlagsEXT::WARNING
                    | vk::DebugUtilsMessageSeverityFlagsEXT::ERROR,
            )
            .message_type(
                vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                    | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                    | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
            )
            .pfn_user_callback(Some(debug_callback));

        // SAFETY: the callback is a plain function with 'static lifetime.
        unsafe { debug_utils.create_debug_utils_messenger(&create_info, None) }.map_err(VulkanError::Api)
    }

    /// Whether the debug messenger is installed
    pub const fn validation_enabled(&self) -> bool {
        self.debug_utils.is_some()
    }
}

impl Drop for VulkanInstance {
    fn drop(&mut self) {
        unsafe {
            if let Some(debug_utils) = &self.debug_utils {
                debug_utils.destroy_debug_utils_messenger(self.debug_messenger, None);
            }
            self.instance.destroy_instance(None);
        }
    }
}

/// Debug callback for validation layers
unsafe extern "system" fn debug_callback(
    message_severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    message_type: vk::DebugUtilsMessageTypeFlagsEXT,
    callback_data: *const vk::DebugUtilsMessengerCallbackDataEXT,
    _user_data: *mut std::ffi::c_void,
) -> vk::Bool32 {
    if callback_data.is_null() || (*callback_data).p_message.is_null() {
        return vk::FALSE;
    }
    let message = CStr::from_ptr((*callback_data).p_message).to_string_lossy();

    if message_severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::ERROR) {
        log::error!("[Vulkan] {:?} - {}", message_type, message);
    } else if message_severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::WARNING) {
        log::warn!("[Vulkan] {:?} - {}", message_type, message);
    } else {
        log::trace!("[Vulkan] {:?} - {}", message_type, message);
    }

    vk::FALSE
}

/// Physical device selection and capabilities
pub struct PhysicalDeviceInfo {
    /// Vulkan physical device handle
    pub device: vk::PhysicalDevice,
    /// Device properties and limits
    pub properties: vk::PhysicalDeviceProperties,
    /// Supported device features
    pub features: vk::PhysicalDeviceFeatures,
    /// Memory heaps and types
    pub memory_properties: vk::PhysicalDeviceMemoryProperties,
    /// Graphics and present families
    pub queue_families: QueueFamilyIndices,
}

impl PhysicalDeviceInfo {
    /// Select the first physical device that can render to `surface`
    pub fn select_suitable_device(
        instance: &Instance,
        surface: vk::SurfaceKHR,
        surface_loader: &Surface,
    ) -> VulkanResult<Self> {
        // SAFETY: instance is valid for the duration of the call.
        let devices = unsafe { instance.enumerate_physical_devices() }.map_err(VulkanError::Api)?;
        if devices.is_empty() {
            return Err(VulkanError::NoVulkanDevice);
        }

        for device in devices {
            if let Some(info) = Self::evaluate_device(instance, device, surface, surface_loader)? {
                // SAFETY: device_name is NUL-terminated.
                let name = unsafe { CStr::from_ptr(info.properties.device_name.as_ptr()) };
                log::info!("Selected GPU: {}", name.to_string_lossy());
                return Ok(info);
            }
        }

        Err(VulkanError::NoSuitableDevice)
    }

    fn evaluate_device(
        instance: &Instance,
        device: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
        surface_loader: &Surface,
    ) -> VulkanResult<Option<Self>> {
        // SAFETY: device was enumerated from this instance.
        let (properties, families) = unsafe {
            (
                instance.get_physical_device_properties(device),
                instance.get_physical_device_queue_family_properties(device),
            )
        };
        // SAFETY: device_name is NUL-terminated.
        let name = unsafe { CStr::from_ptr(properties.device_name.as_ptr()) }.to_string_lossy();

        let queue_families = QueueFamilyIndices::select(&families, |index| {
            // SAFETY: index is a valid family of device.
            unsafe { surface_loader.get_physical_device_surface_support(device, index, surface) }
                .map_err(VulkanError::Api)
        })?;
        let Some(queue_families) = queue_families else {
            log::debug!("Skipping {}: missing graphics or present queue", name);
            return Ok(None);
        };

        // SAFETY: device was enumerated from this instance.
        let extensions = unsafe { instance.enumerate_device_extension_properties(device) }
            .map_err(VulkanError::Api)?;
        if !extensions_supported(&extensions, &[SwapchainLoader::name()]) {
            log::debug!("Skipping {}: no swap chain support", name);
            return Ok(None);
        }

        let support = crate::render::backends::vulkan::state::swapchain::SwapchainSupport::query(
            surface_loader,
            device,
            surface,
        )?;
        if !support.is_adequate() {
            log::debug!("Skipping {}: no surface formats or present modes", name);
            return Ok(None);
        }

        // SAFETY: device was enumerated from this instance.
        let (features, memory_properties) = unsafe {
            (
                instance.get_physical_device_features(device),
                instance.get_physical_device_memory_properties(device),
            )
        };

        Ok(Some(Self {
            device,
            properties,
            features,
            memory_properties,
            queue_families,
        }))
    }

    /// Whether anisotropic filtering may be enabled
    pub fn supports_anisotropy(&self) -> bool {
        self.features.sampler_anisotropy == vk::TRUE
    }
}

/// Logical device wrapper with RAII cleanup
pub struct LogicalDevice {
    /// Vulkan logical device handle
    pub device: Device,
    /// Graphics operations queue
    pub graphics_queue: vk::Queue,
    /// Surface presentation queue
    pub present_queue: vk::Queue,
    /// Swapchain extension loader
    pub swapchain_loader: SwapchainLoader,
    /// Whether sampler anisotropy was enabled at creation
    pub anisotropy_enabled: bool,
}

impl LogicalDevice {
    /// Create a logical device with one queue per unique family
    pub fn new(instance: &Instance, physical_device: &PhysicalDeviceInfo) -> VulkanResult<Self> {
        let priorities = [1.0f32];
        let queue_infos: Vec<vk::DeviceQueueCreateInfo> = physical_device
            .queue_families
            .unique()
            .into_iter()
            .map(|family| {
                vk::DeviceQueueCreateInfo::builder()
                    .queue_family_index(family)
                    .queue_priorities(&priorities)
                    .build()
            })
            .collect();

        let required_extensions = [SwapchainLoader::name().as_ptr()];

        let anisotropy_enabled = physical_device.supports_anisotropy();
        let device_features = vk::PhysicalDeviceFeatures::builder()
            .sampler_anisotropy(anisotropy_enabled)
            .build();

        let create_info = vk::DeviceCreateInfo::builder()
            .queue_create_infos(&queue_infos)
            .enabled_extension_names(&required_extensions)
            .enabled_features(&device_features);

        // SAFETY: create_info and everything it points to outlive the call.
        let device = unsafe { instance.create_device(physical_device.device, &create_info, None) }
            .map_err(VulkanError::Api)?;

        let families = physical_device.queue_families;
        // SAFETY: both families were requested with one queue each.
        let (graphics_queue, present_queue) = unsafe {
            (
                device.get_device_queue(families.graphics, 0),
                device.get_device_queue(families.present, 0),
            )
        };

        let swapchain_loader = SwapchainLoader::new(instance, &device);

        Ok(Self {
            device,
            graphics_queue,
            present_queue,
            swapchain_loader,
            anisotropy_enabled,
        })
    }
}

impl Drop for LogicalDevice {
    fn drop(&mut self) {
        unsafe {
            let _ = self.device.device_wait_idle();
            self.device.destroy_device(None);
        }
    }
}

/// Owns the instance-level and device-level objects every other resource
/// is created from
pub struct VulkanContext {
    // Fields drop in declaration order: device, then surface, then instance.
    device: LogicalDevice,
    physical_device: PhysicalDeviceInfo,
    surface: SurfaceHandle,
    instance: VulkanInstance,
}

/// Surface with RAII cleanup
struct SurfaceHandle {
    loader: Surface,
    surface: vk::SurfaceKHR,
}

impl Drop for SurfaceHandle {
    fn drop(&mut self) {
        unsafe {
            self.loader.destroy_surface(self.surface, None);
        }
    }
}

impl VulkanContext {
    /// Create instance, debug messenger, surface and devices for `window`
    pub fn new(window: &Window, config: &RendererConfig) -> VulkanResult<Self> {
        let instance = VulkanInstance::new(window, config)?;

        let loader = Surface::new(&instance.entry, &instance.instance);
        let surface = window
            .create_vulkan_surface(instance.instance.handle())
            .map_err(|e| VulkanError::InitializationFailed(format!("Surface creation: {e}")))?;
        let surface = SurfaceHandle { loader, surface };

        let physical_device =
            PhysicalDeviceInfo::select_suitable_device(&instance.instance, surface.surface, &surface.loader)?;
        let device = LogicalDevice::new(&instance.instance, &physical_device)?;

        log::info!(
            "Vulkan context ready (graphics family {}, present family {})",
            physical_device.queue_families.graphics,
            physical_device.queue_families.present
        );

        Ok(Self {
            device,
            physical_device,
            surface,
            instance,
        })
    }

    /// Get a reference to the Vulkan instance
    pub const fn instance(&self) -> &Instance {
        &self.instance.instance
    }

    /// Get the surface handle
    pub const fn surface(&self) -> vk::SurfaceKHR {
        self.surface.surface
    }

    /// Get the surface loader
    pub const fn surface_loader(&self) -> &Surface {
        &self.surface.loader
    }

    /// Get the physical device info
    pub const fn physical_device(&self) -> &PhysicalDeviceInfo {
        &self.physical_device
    }

    /// Get the logical device
    pub const fn device(&self) -> &LogicalDevice {
        &self.device
    }

    /// Get the raw Device handle
    pub fn raw_device(&self) -> Device {
        self.device.device.clone()
    }

    /// Get the swapchain loader
    pub const fn swapchain_loader(&self) -> &SwapchainLoader {
        &self.device.swapchain_loader
    }

    /// Get the graphics queue
    pub const fn graphics_queue(&self) -> vk::Queue {
        self.device.graphics_queue
    }

    /// Get the present queue
    pub const fn present_queue(&self) -> vk::Queue {
        self.device.present_queue
    }

    /// Queue family indices in use
    pub const fn queue_families(&self) -> QueueFamilyIndices {
        self.physical_device.queue_families
    }

    /// Whether validation messages are being forwarded to the log
    pub const fn validation_enabled(&self) -> bool {
        self.instance.validation_enabled()
    }

    /// Wait for all queues to finish
    pub fn wait_idle(&self) -> VulkanResult<()> {
        // SAFETY: the device is alive for as long as self.
        unsafe { self.device.device.device_wait_idle() }.map_err(VulkanError::Api)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn family(flags: vk::QueueFlags, count: u32) -> vk::QueueFamilyProperties {
        vk::QueueFamilyProperties {
            queue_flags: flags,
            queue_count: count,
            ..Default::default()
        }
    }

    fn named<const N: usize>(name: &CStr) -> [c_char; N] {
        let mut out = [0 as c_char; N];
        for (dst, src) in out.iter_mut().zip(name.to_bytes()) {
            *dst = *src as c_char;
        }
        out
    }

    #[test]
    fn test_same_family_for_graphics_and_present() {
        let families = [family(vk::QueueFlags::GRAPHICS | vk::QueueFlags::COMPUTE, 1)];
        let selected = QueueFamilyIndices::select(&families, |_| Ok(true)).unwrap().unwrap();
        assert_eq!(selected, QueueFamilyIndices { graphics: 0, present: 0 });
        assert!(!selected.is_split());
        assert_eq!(selected.unique(), vec![0]);
    }

    #[test]
    fn test_split_families() {
        let families = [
            family(vk::QueueFlags::TRANSFER, 1),
            family(vk::QueueFlags::GRAPHICS, 1),
            family(vk::QueueFlags::COMPUTE, 1),
        ];
        let selected = QueueFamilyIndices::select(&families, |index| Ok(index == 2))
            .unwrap()
            .unwrap();
        assert_eq!(selected, QueueFamilyIndices { graphics: 1, present: 2 });
        assert!(selected.is_split());
        assert_eq!(selected.unique(), vec![1, 2]);
    }

    #[test]
    fn test_empty_families_are_skipped() {
        let families = [family(vk::QueueFlags::GRAPHICS, 0), family(vk::QueueFlags::GRAPHICS, 2)];
        let selected = QueueFamilyIndices::select(&families, |_| Ok(true)).unwrap().unwrap();
        assert_eq!(selected.graphics, 1);
        assert_eq!(selected.present, 1);
    }

    #[test]
    fn test_no_present_family() {
        let families = [family(vk::QueueFlags::GRAPHICS, 1)];
        assert_eq!(QueueFamilyIndices::select(&families, |_| Ok(false)).unwrap(), None);
    }

    #[test]
    fn test_present_query_errors_propagate() {
        let families = [family(vk::QueueFlags::GRAPHICS, 1)];
        let result = QueueFamilyIndices::select(&families, |_| {
            Err(VulkanError::Api(vk::Result::ERROR_SURFACE_LOST_KHR))
        });
        assert!(matches!(result, Err(VulkanError::Api(vk::Result::ERROR_SURFACE_LOST_KHR))));
    }

    #[test]
    fn test_layer_lookup() {
        let available = [vk::LayerProperties {
            layer_name: named(VALIDATION_LAYER),
            ..Default::default()
        }];
        assert!(layers_supported(&available, &[VALIDATION_LAYER]));
        assert!(!layers_supported(&[], &[VALIDATION_LAYER]));
        assert!(layers_supported(&[], &[]));
    }

    #[test]
    fn test_extension_lookup() {
        let available = [vk::ExtensionProperties {
            extension_name: named(SwapchainLoader::name()),
            spec_version: 70,
        }];
        assert!(extensions_supported(&available, &[SwapchainLoader::name()]));
        assert!(!extensions_supported(&available, &[DebugUtils::name()]));
    }
}
