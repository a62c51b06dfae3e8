//! Breakpoint registry: requested intents and their installations.
//!
//! Pending specs are never removed: every class-prepare of a matching type
//! installs them again for that type.

use indexmap::IndexSet;
use smol_str::SmolStr;

use crate::spec::{BreakpointKind, BreakpointSpec};
use crate::target::{CodeLocation, RequestId};

/// What an installed breakpoint is bound to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Binding {
    Location(CodeLocation),
    /// Class-wide method-entry watch, refined by method name on arrival.
    MethodFilter { class_name: SmolStr },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledBreakpoint {
    pub spec: BreakpointSpec,
    pub declaring_type: SmolStr,
    pub binding: Binding,
    pub request: RequestId,
}

impl InstalledBreakpoint {
    /// `bp Type:line` or `bp(method) Type#method`.
    #[must_use]
    pub fn list_line(&self) -> String {
        match self.spec.kind() {
            BreakpointKind::Line(line) => format!("bp {}:{line}", self.declaring_type),
            BreakpointKind::MethodEntry(method) => {
                format!("bp(method) {}#{method}", self.declaring_type)
            }
        }
    }
}

#[derive(Debug, Default)]
pub struct BreakpointRegistry {
    pending: Vec<BreakpointSpec>,
    installed: Vec<InstalledBreakpoint>,
}

impl BreakpointRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_pending(&mut self, spec: BreakpointSpec) {
        self.pending.push(spec);
    }

    #[must_use]
    pub fn pending(&self) -> &[BreakpointSpec] {
        &self.pending
    }

    #[must_use]
    pub fn installed(&self) -> &[InstalledBreakpoint] {
        &self.installed
    }

    pub fn record_installed(&mut self, installed: InstalledBreakpoint) {
        self.installed.push(installed);
    }

    /// Pending specs targeting `class_name`, in request order.
    #[must_use]
    pub fn specs_for_class(&self, class_name: &str) -> Vec<BreakpointSpec> {
        self.pending
            .iter()
            .filter(|spec| spec.class_name() == class_name)
            .cloned()
            .collect()
    }

    /// Distinct class names referenced by pending specs.
    #[must_use]
    pub fn watched_classes(&self) -> IndexSet<SmolStr> {
        self.pending
            .iter()
            .map(|spec| SmolStr::from(spec.class_name()))
            .collect()
    }

    /// Whether a method-entry hit from `request` is for the method the
    /// breakpoint names.
    #[must_use]
    pub fn method_entry_matches(&self, request: RequestId, method: &str) -> bool {
        self.installed.iter().any(|installed| {
            installed.request == request
                && matches!(
                    installed.spec.kind(),
                    BreakpointKind::MethodEntry(name) if name == method
                )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::target::RequestKind;

    fn method_bp(request: i32, method: &str) -> InstalledBreakpoint {
        InstalledBreakpoint {
            spec: BreakpointSpec::method("Demo", method),
            declaring_type: "Demo".into(),
            binding: Binding::MethodFilter {
                class_name: "Demo".into(),
            },
            request: RequestId::new(RequestKind::MethodEntry, request),
        }
    }

    #[test]
    fn watched_classes_are_distinct_in_order() {
        let mut registry = BreakpointRegistry::new();
        registry.add_pending(BreakpointSpec::line("B", 1));
        registry.add_pending(BreakpointSpec::line("A", 2));
        registry.add_pending(BreakpointSpec::method("B", "run"));
        let watched: Vec<_> = registry.watched_classes().into_iter().collect();
        assert_eq!(watched, ["B", "A"]);
        assert_eq!(registry.specs_for_class("B").len(), 2);
    }

    #[test]
    fn duplicates_are_kept() {
        let mut registry = BreakpointRegistry::new();
        registry.add_pending(BreakpointSpec::line("A", 2));
        registry.add_pending(BreakpointSpec::line("A", 2));
        assert_eq!(registry.specs_for_class("A").len(), 2);
    }

    #[test]
    fn method_entry_matching_uses_request_and_name() {
        let mut registry = BreakpointRegistry::new();
        registry.record_installed(method_bp(4, "loopBody"));
        let request = RequestId::new(RequestKind::MethodEntry, 4);
        assert!(registry.method_entry_matches(request, "loopBody"));
        assert!(!registry.method_entry_matches(request, "fib"));
        assert!(!registry.method_entry_matches(
            RequestId::new(RequestKind::MethodEntry, 5),
            "loopBody"
        ));
    }

    #[test]
    fn list_lines() {
        assert_eq!(method_bp(1, "run").list_line(), "bp(method) Demo#run");
        let line = InstalledBreakpoint {
            spec: BreakpointSpec::line("Demo", 10),
            declaring_type: "Demo".into(),
            binding: Binding::Location(CodeLocation::new("Demo", "run", None, Some(10))),
            request: RequestId::new(RequestKind::Breakpoint, 2),
        };
        assert_eq!(line.list_line(), "bp Demo:10");
    }
}
