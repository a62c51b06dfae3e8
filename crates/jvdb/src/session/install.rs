//! Breakpoint installation.
//! - add_breakpoint: record intent, install now if the class is loaded
//! - install_class_prepare_watches: one class-prepare watch per class name
//! - install_pending_for: deferred install on class load

use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::registry::{Binding, InstalledBreakpoint};
use crate::spec::{BreakpointKind, BreakpointSpec};
use crate::target::{LoadedType, RequestId, WatchRequest};

use super::DebugSession;

impl DebugSession {
    /// Register a breakpoint intent. Installs immediately against every
    /// loaded type of that name; otherwise waits for the class to load.
    pub fn add_breakpoint(&mut self, spec: BreakpointSpec) {
        self.registry.add_pending(spec.clone());
        match self.target.classes_by_name(spec.class_name()) {
            Ok(types) => {
                for ty in &types {
                    self.install_for_type(&spec, ty);
                }
            }
            Err(err) => debug!(%spec, "class lookup failed: {err}"),
        }
    }

    /// Watch class loading for every class named by a pending spec.
    ///
    /// Class filters on a single request must all match, so each distinct
    /// name gets its own request.
    pub(super) fn install_class_prepare_watches(&mut self) {
        for class_name in self.registry.watched_classes() {
            let request = WatchRequest::ClassPrepare {
                class_name: class_name.clone(),
            };
            if let Err(err) = self.target.create_request(&request) {
                warn!(%class_name, "class-prepare watch failed: {err}");
            }
        }
    }

    pub(super) fn install_pending_for(&mut self, loaded: &LoadedType) {
        for spec in self.registry.specs_for_class(&loaded.name) {
            self.install_for_type(&spec, loaded);
        }
    }

    fn install_for_type(&mut self, spec: &BreakpointSpec, ty: &LoadedType) {
        match spec.kind() {
            BreakpointKind::Line(line) => match self.install_line(spec, ty, *line) {
                Ok(()) => self
                    .printer
                    .line(format!("[breakpoint set] {}:{line}", ty.name)),
                Err(Error::NoCodeAtLocation(_)) => self
                    .printer
                    .line(format!("[warn] no code at {}:{line}", ty.name)),
                Err(Error::DebugInfoAbsent(_)) => self
                    .printer
                    .line(format!("[warn] debug info absent for {}", ty.name)),
                Err(err) => self.printer.line(format!("[warn] cannot set {spec}: {err}")),
            },
            BreakpointKind::MethodEntry(method) => match self.install_method_entry(spec, ty) {
                Ok(()) => self
                    .printer
                    .line(format!("[method-entry set] {}#{method}", ty.name)),
                Err(err) => self.printer.line(format!("[warn] cannot set {spec}: {err}")),
            },
        }
    }

    fn install_line(&mut self, spec: &BreakpointSpec, ty: &LoadedType, line: u32) -> Result<()> {
        let locations = self.target.locations_of_line(ty, line)?;
        let Some(location) = locations.into_iter().next() else {
            return Err(Error::NoCodeAtLocation(format!("{}:{line}", ty.name)));
        };
        let request = self.target.create_request(&WatchRequest::Breakpoint {
            location: location.clone(),
        })?;
        self.record_install(spec, ty, Binding::Location(location), request);
        Ok(())
    }

    fn install_method_entry(&mut self, spec: &BreakpointSpec, ty: &LoadedType) -> Result<()> {
        let request = self.target.create_request(&WatchRequest::MethodEntry {
            class_name: ty.name.clone(),
        })?;
        let binding = Binding::MethodFilter {
            class_name: ty.name.clone(),
        };
        self.record_install(spec, ty, binding, request);
        Ok(())
    }

    fn record_install(
        &mut self,
        spec: &BreakpointSpec,
        ty: &LoadedType,
        binding: Binding,
        request: RequestId,
    ) {
        debug!(%spec, ?request, "breakpoint installed");
        self.registry.record_installed(InstalledBreakpoint {
            spec: spec.clone(),
            declaring_type: ty.name.clone(),
            binding,
            request,
        });
    }
}
