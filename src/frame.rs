//! Per-frame hook installation.
//!
//! Every execution context (top-level document and each nested frame) gets
//! the hook exactly once, before any rewritten code runs in it. The
//! capability is handed to [`FrameSetup`] at construction; the host decides
//! when frames appear and calls [`FrameSetup::install`] for each.

use std::collections::HashSet;

use tracing::debug;

use crate::config::InstrumentConfig;
use crate::hook::{installer_script, HookIdentifier};

/// Host-assigned identity of an execution context.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FrameId(pub String);

impl From<&str> for FrameId {
    fn from(id: &str) -> Self {
        FrameId(id.to_string())
    }
}

impl From<String> for FrameId {
    fn from(id: String) -> Self {
        FrameId(id)
    }
}

/// Whatever drives the browser.
///
/// `add_init_script` must arrange for `source` to be evaluated in `frame`
/// before the first script of every document loaded into it. If the host
/// cannot guarantee that ordering, accesses may run before the hook exists
/// and will throw a `ReferenceError`; that is a host bug, not something
/// this crate can detect.
pub trait FrameHost {
    type Error;

    fn add_init_script(&mut self, frame: &FrameId, source: &str) -> Result<(), Self::Error>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Installation {
    Installed,
    AlreadyInstalled,
}

pub struct FrameSetup {
    hook: HookIdentifier,
    script: String,
    installed: HashSet<FrameId>,
}

impl FrameSetup {
    pub fn new(hook: HookIdentifier, report_endpoint: &str) -> Self {
        let script = installer_script(&hook, report_endpoint);
        Self { hook, script, installed: HashSet::new() }
    }

    pub fn from_config(config: &InstrumentConfig) -> Self {
        Self::new(config.hook_identifier.clone(), &config.report_endpoint)
    }

    pub fn hook(&self) -> &HookIdentifier {
        &self.hook
    }

    pub fn script(&self) -> &str {
        &self.script
    }

    pub fn install<H: FrameHost>(
        &mut self,
        frame: &FrameId,
        host: &mut H,
    ) -> Result<Installation, H::Error> {
        if self.installed.contains(frame) {
            return Ok(Installation::AlreadyInstalled);
        }
        host.add_init_script(frame, &self.script)?;
        self.installed.insert(frame.clone());
        debug!(frame = %frame.0, hook = %self.hook, "installed hook");
        Ok(Installation::Installed)
    }

    /// Call when a frame is detached so a new frame reusing the id is set up
    /// again.
    pub fn forget(&mut self, frame: &FrameId) -> bool {
        self.installed.remove(frame)
    }

    pub fn is_installed(&self, frame: &FrameId) -> bool {
        self.installed.contains(frame)
    }
}
