//! Scripted management library for tests
//!
//! [`MockLibrary`] replays a fixed list of devices and counts how often the
//! library is initialized and shut down, so callers can check that sessions
//! are released on every path.

use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use error_stack::Report;

use crate::accelerator::ManagementLibrary;
use crate::accelerator::ManagementSession;
use crate::accelerator::SdkError;
use crate::accelerator::SdkResult;

/// Behaviour of one scripted device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockDevice {
    Named(String),
    /// `device_by_index` fails for this index
    FailingHandle,
    /// the handle is returned but `device_name` fails
    FailingName,
}

#[derive(Debug, Default)]
struct Counters {
    init: AtomicUsize,
    shutdown: AtomicUsize,
}

/// Mock management library with scripted answers.
#[derive(Debug, Clone)]
pub struct MockLibrary {
    driver_version: String,
    devices: Vec<MockDevice>,
    fail_init: bool,
    fail_driver_version: bool,
    fail_device_count: bool,
    fail_shutdown: bool,
    counters: Arc<Counters>,
}

impl MockLibrary {
    pub fn new(driver_version: impl Into<String>) -> Self {
        Self {
            driver_version: driver_version.into(),
            devices: Vec::new(),
            fail_init: false,
            fail_driver_version: false,
            fail_device_count: false,
            fail_shutdown: false,
            counters: Arc::new(Counters::default()),
        }
    }

    pub fn with_device(mut self, name: impl Into<String>) -> Self {
        self.devices.push(MockDevice::Named(name.into()));
        self
    }

    pub fn with_failing_handle(mut self) -> Self {
        self.devices.push(MockDevice::FailingHandle);
        self
    }

    pub fn with_failing_name(mut self) -> Self {
        self.devices.push(MockDevice::FailingName);
        self
    }

    pub fn fail_init(mut self) -> Self {
        self.fail_init = true;
        self
    }

    pub fn fail_driver_version(mut self) -> Self {
        self.fail_driver_version = true;
        self
    }

    pub fn fail_device_count(mut self) -> Self {
        self.fail_device_count = true;
        self
    }

    pub fn fail_shutdown(mut self) -> Self {
        self.fail_shutdown = true;
        self
    }

    /// Number of `init` calls seen so far, shared between clones.
    pub fn init_calls(&self) -> usize {
        self.counters.init.load(Ordering::SeqCst)
    }

    /// Number of `shutdown` calls seen so far, shared between clones.
    pub fn shutdown_calls(&self) -> usize {
        self.counters.shutdown.load(Ordering::SeqCst)
    }
}

impl ManagementLibrary for MockLibrary {
    type Session = MockSession;

    fn init(&self) -> SdkResult<MockSession> {
        self.counters.init.fetch_add(1, Ordering::SeqCst);
        if self.fail_init {
            return Err(Report::new(SdkError::Init).attach_printable("scripted failure"));
        }
        Ok(MockSession {
            library: self.clone(),
        })
    }
}

/// Session handed out by [`MockLibrary`].
#[derive(Debug)]
pub struct MockSession {
    library: MockLibrary,
}

impl MockSession {
    fn scripted_failure(call: &'static str) -> Report<SdkError> {
        Report::new(SdkError::Call { call }).attach_printable("scripted failure")
    }
}

impl ManagementSession for MockSession {
    type Device<'s> = &'s MockDevice;

    fn driver_version(&self) -> SdkResult<String> {
        if self.library.fail_driver_version {
            return Err(Self::scripted_failure("driver_version"));
        }
        Ok(self.library.driver_version.clone())
    }

    fn device_count(&self) -> SdkResult<u32> {
        if self.library.fail_device_count {
            return Err(Self::scripted_failure("device_count"));
        }
        Ok(self.library.devices.len() as u32)
    }

    fn device_by_index(&self, index: u32) -> SdkResult<&MockDevice> {
        match self.library.devices.get(index as usize) {
            Some(MockDevice::FailingHandle) | None => {
                Err(Self::scripted_failure("device_by_index"))
            }
            Some(device) => Ok(device),
        }
    }

    fn device_name(&self, device: &&MockDevice) -> SdkResult<String> {
        match device {
            MockDevice::Named(name) => Ok(name.clone()),
            _ => Err(Self::scripted_failure("device_name")),
        }
    }

    fn shutdown(self) -> SdkResult<()> {
        self.library.counters.shutdown.fetch_add(1, Ordering::SeqCst);
        if self.library.fail_shutdown {
            return Err(Report::new(SdkError::Shutdown).attach_printable("scripted failure"));
        }
        Ok(())
    }
}
