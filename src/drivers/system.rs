//! Chip-level helpers: restart, heap statistics, and identity strings
//! surfaced by the STATUS report.

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

/// Reboot the chip.  The host build exits the process instead so the
/// simulation observably stops rather than pretending to restart.
pub fn restart() -> ! {
    #[cfg(target_os = "espidf")]
    {
        // SAFETY: esp_restart is the documented reboot entry point.
        unsafe { esp_restart() };
        #[allow(unreachable_code)]
        loop {}
    }

    #[cfg(not(target_os = "espidf"))]
    {
        std::process::exit(1)
    }
}

#[cfg(target_os = "espidf")]
pub fn free_heap_bytes() -> u32 {
    // SAFETY: heap_caps accounting read, safe from any task.
    unsafe { esp_get_free_heap_size() }
}

#[cfg(not(target_os = "espidf"))]
pub fn free_heap_bytes() -> u32 {
    0
}

#[cfg(target_os = "espidf")]
pub fn chip_model() -> &'static str {
    let mut info = esp_chip_info_t::default();
    // SAFETY: esp_chip_info only writes the out-param.
    unsafe { esp_chip_info(&mut info) };
    match info.model {
        m if m == esp_chip_model_t_CHIP_ESP32 => "ESP32",
        m if m == esp_chip_model_t_CHIP_ESP32S2 => "ESP32-S2",
        m if m == esp_chip_model_t_CHIP_ESP32S3 => "ESP32-S3",
        m if m == esp_chip_model_t_CHIP_ESP32C3 => "ESP32-C3",
        _ => "ESP32 (unknown variant)",
    }
}

#[cfg(not(target_os = "espidf"))]
pub fn chip_model() -> &'static str {
    "host-sim"
}

#[cfg(target_os = "espidf")]
pub fn cpu_freq_mhz() -> u32 {
    // SAFETY: ROM helper returning the configured CPU clock in MHz.
    unsafe { ets_get_cpu_frequency() }
}

#[cfg(not(target_os = "espidf"))]
pub fn cpu_freq_mhz() -> u32 {
    0
}
