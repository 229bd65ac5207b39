//! Task Watchdog Timer (TWDT) driver.
//!
//! Wraps the ESP-IDF TWDT API to reset the device if the main loop stalls
//! past the configured timeout.  The supervisor rate-limits its own calls,
//! so `feed()` here is a bare register reset.

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

#[cfg(target_os = "espidf")]
use log::info;

pub struct Watchdog {
    active: bool,
}

impl Watchdog {
    /// Initialise the TWDT with the given timeout and subscribe the
    /// current task.  Host builds track the flag only.
    pub fn new(timeout_secs: u32) -> Self {
        #[cfg(target_os = "espidf")]
        {
            unsafe {
                let cfg = esp_task_wdt_config_t {
                    timeout_ms: timeout_secs * 1_000,
                    idle_core_mask: 0,
                    trigger_panic: true,
                };
                let ret = esp_task_wdt_reconfigure(&cfg);
                if ret != ESP_OK {
                    log::warn!(
                        "Watchdog: TWDT reconfigure returned {} (may already be configured)",
                        ret
                    );
                }

                let ret = esp_task_wdt_add(core::ptr::null_mut());
                let active = ret == ESP_OK;
                if active {
                    info!("Watchdog: subscribed ({timeout_secs}s timeout, panic on trigger)");
                } else {
                    log::warn!("Watchdog: failed to subscribe ({})", ret);
                }

                Self { active }
            }
        }

        #[cfg(not(target_os = "espidf"))]
        {
            log::info!("Watchdog(sim): no-op ({timeout_secs}s timeout unenforced)");
            Self { active: false }
        }
    }

    /// Reset the hardware timer.
    pub fn feed(&self) {
        #[cfg(target_os = "espidf")]
        {
            if self.active {
                unsafe {
                    esp_task_wdt_reset();
                }
            }
        }
    }

    /// Remove the current task from monitoring, for operations known to
    /// run longer than the timeout.
    pub fn suspend(&self) {
        #[cfg(target_os = "espidf")]
        {
            if self.active {
                info!("Watchdog: temporarily suspending monitoring");
                unsafe {
                    esp_task_wdt_delete(core::ptr::null_mut());
                }
            }
        }
    }

    /// Re-add the current task and reset the timer so the elapsed suspend
    /// time cannot trip it.
    pub fn resume(&self) {
        #[cfg(target_os = "espidf")]
        {
            if self.active {
                info!("Watchdog: resuming monitoring");
                unsafe {
                    esp_task_wdt_add(core::ptr::null_mut());
                    esp_task_wdt_reset();
                }
            }
        }
    }

    /// Whether hardware monitoring is live (always false in simulation).
    pub fn is_active(&self) -> bool {
        self.active
    }
}
