// ===================== Autostart (HKCU Run key) =====================

use crate::error::AutostartError;

#[cfg(windows)]
const RUN_KEY: &str = r"Software\Microsoft\Windows\CurrentVersion\Run";
#[cfg(windows)]
const VALUE_NAME: &str = "Resmon";

/// Registers the current executable to start on logon.
#[cfg(windows)]
pub fn enable() -> Result<(), AutostartError> {
    use winreg::enums::HKEY_CURRENT_USER;
    use winreg::RegKey;

    let value = exe_command()?;
    let hkcu = RegKey::predef(HKEY_CURRENT_USER);
    let (key, _) = hkcu.create_subkey(RUN_KEY).map_err(AutostartError::Registry)?;
    key.set_value(VALUE_NAME, &value).map_err(AutostartError::Registry)?;
    log::info!("autostart enabled: {value}");
    Ok(())
}

/// Removes the autostart entry. A missing entry is not an error.
#[cfg(windows)]
pub fn disable() -> Result<(), AutostartError> {
    use std::io::ErrorKind;
    use winreg::enums::{HKEY_CURRENT_USER, KEY_SET_VALUE};
    use winreg::RegKey;

    let hkcu = RegKey::predef(HKEY_CURRENT_USER);
    let key = match hkcu.open_subkey_with_flags(RUN_KEY, KEY_SET_VALUE) {
        Ok(k) => k,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(AutostartError::Registry(e)),
    };
    match key.delete_value(VALUE_NAME) {
        Ok(()) => {
            log::info!("autostart disabled");
            Ok(())
        }
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(AutostartError::Registry(e)),
    }
}

/// Whether the autostart entry is present.
#[cfg(windows)]
pub fn is_enabled() -> Result<bool, AutostartError> {
    use std::io::ErrorKind;
    use winreg::enums::{HKEY_CURRENT_USER, KEY_QUERY_VALUE};
    use winreg::RegKey;

    let hkcu = RegKey::predef(HKEY_CURRENT_USER);
    let key = match hkcu.open_subkey_with_flags(RUN_KEY, KEY_QUERY_VALUE) {
        Ok(k) => k,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(AutostartError::Registry(e)),
    };
    match key.get_value::<String, _>(VALUE_NAME) {
        Ok(v) => Ok(!v.is_empty()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(AutostartError::Registry(e)),
    }
}

#[cfg(windows)]
fn exe_command() -> Result<String, AutostartError> {
    let exe = std::env::current_exe().map_err(AutostartError::ExePath)?;
    Ok(quoted(&exe.display().to_string()))
}

#[cfg(not(windows))]
pub fn enable() -> Result<(), AutostartError> {
    Err(AutostartError::Unsupported)
}

#[cfg(not(windows))]
pub fn disable() -> Result<(), AutostartError> {
    Err(AutostartError::Unsupported)
}

#[cfg(not(windows))]
pub fn is_enabled() -> Result<bool, AutostartError> {
    Err(AutostartError::Unsupported)
}

/// Enables or disables autostart.
pub fn set(enabled: bool) -> Result<(), AutostartError> {
    if enabled {
        enable()
    } else {
        disable()
    }
}

/// Run-key values are command lines; quote paths with spaces.
#[cfg_attr(not(windows), allow(dead_code))]
fn quoted(path: &str) -> String {
    format!("\"{path}\"")
}
