//! Driver framework (spec §6): every device driver is reached through a
//! single `Commands(Function, Parameter)` entry point returning a
//! `DF_ERROR_*` exit code, the same shape the keyboard/disk drivers in
//! `original_source/` use (`DF_KEY_*`/`DF_ERROR_*` in
//! `kernel/include/drivers/Keyboard.h`, `kernel/source/HD.c`). Device
//! discovery and binding are out of this core's scope (spec.md's
//! "Specific bus/device drivers... are external collaborators"); this
//! module only owns the registry and dispatch, not enumeration.

use heapless::Vec;

/// Driver function call succeeded.
pub const DF_ERROR_SUCCESS: i32 = 0;
/// `Parameter` was null, misaligned, or too small for the expected struct.
pub const DF_ERROR_BADPARAM: i32 = 1;
/// `Function` is not implemented by this driver.
pub const DF_ERROR_NOTIMPL: i32 = 2;
/// Caller lacks permission for this operation.
pub const DF_ERROR_NOPERM: i32 = 3;
/// The driver reached a state its author did not expect.
pub const DF_ERROR_UNEXPECT: i32 = 4;
/// Unclassified failure.
pub const DF_ERROR_GENERIC: i32 = 5;

/// Maximum number of registered drivers.
const MAX_DRIVERS: usize = 32;

pub type DriverFunction = u32;
/// A `LINEAR` parameter: either a struct pointer (validated by the driver
/// the way `SAFE_USE_INPUT_POINTER` validates syscall parameters) or an
/// inline scalar, depending on `Function`.
pub type DriverParameter = usize;

#[derive(Debug, Clone, Copy)]
pub struct DriverInfo {
    pub name: &'static str,
    pub version: &'static str,
}

/// Every driver is reached through exactly one entry point (spec §6).
/// There is no separate read/write/ioctl surface at the framework level —
/// a driver's own `Function` switch plays that role, the way
/// `DF_KEY_GETSTATE`/`DF_KEY_SETLED`/etc. do for the keyboard driver.
pub trait Driver {
    fn info(&self) -> DriverInfo;

    /// Dispatches one driver call. Implementations should return
    /// `DF_ERROR_BADPARAM` for an unrecognized `function` rather than
    /// `DF_ERROR_SUCCESS` (spec.md §9 Open Question: a 0 return would
    /// tell the caller an unknown call succeeded).
    fn commands(&mut self, function: DriverFunction, parameter: DriverParameter) -> i32;
}

struct DriverInstance {
    info: DriverInfo,
    driver: &'static mut dyn Driver,
}

pub struct DriverRegistry {
    drivers: Vec<DriverInstance, MAX_DRIVERS>,
}

impl DriverRegistry {
    pub const fn new() -> Self {
        Self { drivers: Vec::new() }
    }

    pub fn register(&mut self, driver: &'static mut dyn Driver) -> Result<(), i32> {
        let info = driver.info();
        crate::info!("[DRIVER] registering {} v{}", info.name, info.version);
        self.drivers
            .push(DriverInstance { info, driver })
            .map_err(|_| DF_ERROR_GENERIC)
    }

    fn find(&mut self, name: &str) -> Option<&mut DriverInstance> {
        self.drivers.iter_mut().find(|d| d.info.name == name)
    }

    /// Looks up `name` and forwards to its `Commands` entry point.
    /// `DF_ERROR_NOTIMPL` if no driver by that name is registered.
    pub fn dispatch(&mut self, name: &str, function: DriverFunction, parameter: DriverParameter) -> i32 {
        match self.find(name) {
            Some(instance) => instance.driver.commands(function, parameter),
            None => DF_ERROR_NOTIMPL,
        }
    }

    pub fn count(&self) -> usize {
        self.drivers.len()
    }
}

impl Default for DriverRegistry {
    fn default() -> Self {
        Self::new()
    }
}

static REGISTRY: spin::Mutex<DriverRegistry> = spin::Mutex::new(DriverRegistry::new());

pub fn register_driver(driver: &'static mut dyn Driver) -> Result<(), i32> {
    REGISTRY.lock().register(driver)
}

pub fn dispatch(name: &str, function: DriverFunction, parameter: DriverParameter) -> i32 {
    REGISTRY.lock().dispatch(name, function, parameter)
}

pub fn driver_count() -> usize {
    REGISTRY.lock().count()
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Echo {
        last: DriverParameter,
    }

    impl Driver for Echo {
        fn info(&self) -> DriverInfo {
            DriverInfo { name: "echo", version: "1.0" }
        }

        fn commands(&mut self, function: DriverFunction, parameter: DriverParameter) -> i32 {
            match function {
                0 => {
                    self.last = parameter;
                    DF_ERROR_SUCCESS
                }
                1 => DF_ERROR_NOPERM,
                _ => DF_ERROR_BADPARAM,
            }
        }
    }

    #[test]
    fn unregistered_driver_returns_notimpl() {
        let mut registry = DriverRegistry::new();
        assert_eq!(registry.dispatch("missing", 0, 0), DF_ERROR_NOTIMPL);
    }

    #[test]
    fn unknown_function_returns_badparam_not_success() {
        static mut ECHO: Echo = Echo { last: 0 };
        let mut registry = DriverRegistry::new();
        let driver: &'static mut dyn Driver = unsafe { &mut *core::ptr::addr_of_mut!(ECHO) };
        registry.register(driver).unwrap();
        assert_eq!(registry.dispatch("echo", 99, 0), DF_ERROR_BADPARAM);
    }

    #[test]
    fn registered_driver_dispatches_by_name() {
        static mut ECHO2: Echo = Echo { last: 0 };
        let mut registry = DriverRegistry::new();
        let driver: &'static mut dyn Driver = unsafe { &mut *core::ptr::addr_of_mut!(ECHO2) };
        registry.register(driver).unwrap();
        assert_eq!(registry.dispatch("echo", 0, 42), DF_ERROR_SUCCESS);
        assert_eq!(registry.dispatch("echo", 1, 0), DF_ERROR_NOPERM);
    }
}
