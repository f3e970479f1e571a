use spincube_render::{Capability, CapabilityProbe};

/// Looks for a hardware GPU adapter able to present to `surface`.
///
/// Software adapters do not count: the widget wants real acceleration or the
/// fallback panel.
pub struct HardwareProbe<'a> {
    instance: &'a wgpu::Instance,
    surface: Option<&'a wgpu::Surface<'static>>,
    disabled: bool,
    adapter: Option<wgpu::Adapter>,
}

impl<'a> HardwareProbe<'a> {
    pub fn new(instance: &'a wgpu::Instance, surface: Option<&'a wgpu::Surface<'static>>) -> Self {
        Self {
            instance,
            surface,
            disabled: false,
            adapter: None,
        }
    }

    /// Report no capability without touching the GPU.
    pub fn disabled(mut self, disabled: bool) -> Self {
        self.disabled = disabled;
        self
    }

    /// The adapter found by a successful probe.
    pub fn into_adapter(self) -> Option<wgpu::Adapter> {
        self.adapter
    }
}

impl CapabilityProbe for HardwareProbe<'_> {
    fn probe(&mut self) -> Capability {
        if self.disabled {
            return Capability::Unsupported {
                reason: "hardware acceleration disabled".into(),
            };
        }

        let adapter = pollster::block_on(self.instance.request_adapter(
            &wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: self.surface,
                force_fallback_adapter: false,
            },
        ));

        let Some(adapter) = adapter else {
            return Capability::Unsupported {
                reason: "no compatible GPU adapter".into(),
            };
        };

        let info = adapter.get_info();
        if info.device_type == wgpu::DeviceType::Cpu {
            return Capability::Unsupported {
                reason: format!("only a software adapter is available ({})", info.name),
            };
        }

        let name = format!("{} ({})", info.name, info.backend.to_str());
        self.adapter = Some(adapter);
        Capability::Supported { adapter: name }
    }
}
