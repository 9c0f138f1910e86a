//! Terminal progress for resolution passes

use foreignkey::{Address, ReferenceError, ResolveProgress, ResourceId};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Progress bar over the store fetches of one pass
///
/// Hidden when `quiet`; indicatif also hides it when stderr is not a
/// terminal.
pub struct ResolveBar {
    pb: ProgressBar,
    resolved: AtomicUsize,
    failed: AtomicUsize,
}

impl ResolveBar {
    pub fn new(quiet: bool) -> Self {
        let pb = ProgressBar::new(0);
        if quiet {
            pb.set_draw_target(ProgressDrawTarget::hidden());
        }
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=>-");
        pb.set_style(style);
        Self {
            pb,
            resolved: AtomicUsize::new(0),
            failed: AtomicUsize::new(0),
        }
    }

    /// References substituted so far
    pub fn resolved(&self) -> usize {
        self.resolved.load(Ordering::Relaxed)
    }

    /// References that failed so far
    pub fn failed(&self) -> usize {
        self.failed.load(Ordering::Relaxed)
    }
}

impl ResolveProgress for ResolveBar {
    fn on_pass_start(&self, references: usize, resources: usize) {
        self.pb.set_length(resources as u64);
        self.pb.set_message(format!("{references} reference(s)"));
    }

    fn on_fetch_start(&self, id: &ResourceId) {
        self.pb.set_message(id.to_string());
    }

    fn on_fetch_complete(&self, id: &ResourceId, found: bool) {
        if !found {
            self.pb.set_message(format!("{id} (missing)"));
        }
        self.pb.inc(1);
    }

    fn on_resolved(&self, _path: &str, _address: &Address) {
        self.resolved.fetch_add(1, Ordering::Relaxed);
    }

    fn on_failed(&self, _error: &ReferenceError) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    fn on_pass_complete(&self) {
        self.pb.finish_and_clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use foreignkey::ResourceKind;

    #[test]
    fn test_counts_outcomes() {
        let bar = ResolveBar::new(true);
        let id = ResourceId::new(ResourceKind::AwsVpc, "prod", "main");
        let address = Address {
            kind: ResourceKind::AwsVpc,
            env: "prod".to_string(),
            name: "main".to_string(),
            field_path: "status.outputs.vpc_id".to_string(),
        };

        bar.on_pass_start(2, 1);
        bar.on_fetch_start(&id);
        bar.on_fetch_complete(&id, true);
        bar.on_resolved("spec.vpc_id", &address);
        bar.on_resolved("spec.other", &address);
        bar.on_pass_complete();

        assert_eq!(bar.resolved(), 2);
        assert_eq!(bar.failed(), 0);
    }
}
