//! Extra port descriptions the `serialport` enumeration leaves out.
//!
//! Paired Bluetooth SPP ports come back as `SerialPortType::Unknown` with no
//! name or hardware id, so the scanner signature has nothing to match. These
//! lookups ask the OS device database directly: SetupAPI on Windows, udev on
//! Linux.

use super::PortTransport;

/// What the OS device database knows about one port
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PortDetails {
    pub description: Option<String>,
    pub hardware_id: Option<String>,
    /// Set when the lookup itself can tell the transport
    pub transport: Option<PortTransport>,
}

/// Port name inside a Windows friendly name such as
/// `Standard Serial over Bluetooth link (COM8)`
#[cfg(any(windows, test))]
pub fn port_in_friendly_name(friendly_name: &str) -> Option<&str> {
    let (_, tail) = friendly_name.rsplit_once('(')?;
    let name = tail.strip_suffix(')')?.trim();
    (!name.is_empty()).then_some(name)
}

pub fn lookup(port_name: &str) -> Option<PortDetails> {
    let details = platform::lookup(port_name);
    if details.is_none() {
        log::debug!("No device database entry for {}", port_name);
    }
    details
}

#[cfg(windows)]
mod platform {
    use windows::core::{GUID, PCWSTR};
    use windows::Win32::Devices::DeviceAndDriverInstallation::{
        SetupDiDestroyDeviceInfoList, SetupDiEnumDeviceInfo, SetupDiGetClassDevsW,
        SetupDiGetDeviceRegistryPropertyW, DIGCF_PRESENT, GUID_DEVCLASS_PORTS, HDEVINFO,
        SETUP_DI_REGISTRY_PROPERTY, SPDRP_FRIENDLYNAME, SPDRP_HARDWAREID, SP_DEVINFO_DATA,
    };
    use windows::Win32::Foundation::HWND;

    use super::{port_in_friendly_name, PortDetails};

    pub fn lookup(port_name: &str) -> Option<PortDetails> {
        // SAFETY: the device info set is created and destroyed here and every
        // buffer handed to SetupAPI outlives the call that fills it.
        unsafe {
            let set = SetupDiGetClassDevsW(
                Some(&GUID_DEVCLASS_PORTS as *const GUID),
                PCWSTR::null(),
                HWND::default(),
                DIGCF_PRESENT,
            )
            .ok()?;

            let mut found = None;
            let mut index = 0;
            loop {
                let mut info = SP_DEVINFO_DATA {
                    cbSize: std::mem::size_of::<SP_DEVINFO_DATA>() as u32,
                    ..Default::default()
                };
                if SetupDiEnumDeviceInfo(set, index, &mut info).is_err() {
                    break;
                }
                index += 1;

                let friendly_name = registry_string(set, &info, SPDRP_FRIENDLYNAME);
                let matches = friendly_name
                    .as_deref()
                    .and_then(port_in_friendly_name)
                    .is_some_and(|name| name.eq_ignore_ascii_case(port_name));
                if matches {
                    found = Some(PortDetails {
                        description: friendly_name,
                        hardware_id: registry_string(set, &info, SPDRP_HARDWAREID),
                        transport: None,
                    });
                    break;
                }
            }

            let _ = SetupDiDestroyDeviceInfoList(set);
            found
        }
    }

    /// First string of a REG_SZ / REG_MULTI_SZ device property
    unsafe fn registry_string(
        set: HDEVINFO,
        info: &SP_DEVINFO_DATA,
        property: SETUP_DI_REGISTRY_PROPERTY,
    ) -> Option<String> {
        let mut buffer = [0u8; 1024];
        SetupDiGetDeviceRegistryPropertyW(set, info, property, None, Some(&mut buffer[..]), None).ok()?;
        let wide: Vec<u16> = buffer
            .chunks_exact(2)
            .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
            .take_while(|&unit| unit != 0)
            .collect();
        (!wide.is_empty()).then(|| String::from_utf16_lossy(&wide))
    }
}

#[cfg(target_os = "linux")]
mod platform {
    use std::path::Path;

    use super::{PortDetails, PortTransport};

    pub fn lookup(port_name: &str) -> Option<PortDetails> {
        let sysname = Path::new(port_name).file_name()?.to_str()?;
        let context = libudev::Context::new().ok()?;
        let device =
            libudev::Device::from_syspath(&context, &Path::new("/sys/class/tty").join(sysname))
                .ok()?;

        let property = |key: &str| {
            device
                .property_value(key)
                .and_then(|value| value.to_str())
                .map(str::to_string)
        };
        let description = property("ID_MODEL_FROM_DATABASE").or_else(|| property("ID_MODEL"));
        let hardware_id = property("DEVPATH");

        // rfcomm TTYs are created by the kernel Bluetooth RFCOMM layer
        let bluetooth = sysname.starts_with("rfcomm")
            || hardware_id.as_deref().is_some_and(|path| path.contains("/bluetooth/"));

        Some(PortDetails {
            description,
            hardware_id,
            transport: bluetooth.then_some(PortTransport::Bluetooth),
        })
    }
}

#[cfg(not(any(windows, target_os = "linux")))]
mod platform {
    use super::PortDetails;

    pub fn lookup(_port_name: &str) -> Option<PortDetails> {
        None
    }
}
