use crate::error::ProtocolError;
use crate::host::HostBindings;
use crate::protocol::LayoutUpdate;
use crate::render::{InstanceId, Layout};
use crate::tree::NodeId;

/// What happened to one layout update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatchOutcome {
    /// The root took every field of the model and re-rendered.
    Root,
    /// A subtree was merged and its owning instance re-rendered.
    Updated { node: NodeId, instance: InstanceId },
    /// The update was logged and discarded.
    Dropped(ProtocolError),
}

impl<H: HostBindings> Layout<H> {
    /// Applies one update fully (mutation plus the re-render it triggers).
    /// Never fails: protocol errors are logged and reported as
    /// [`PatchOutcome::Dropped`] so later updates still apply.
    pub fn apply_update(&mut self, update: &LayoutUpdate) -> PatchOutcome {
        if update.path.is_empty() {
            let root = self.tree.root();
            self.tree.replace(root, &update.model);
            let root_instance = self.root_instance();
            self.render_instance(root_instance);
            return PatchOutcome::Root;
        }

        match self.route(&update.path) {
            Ok((node, instance)) => {
                self.update_instance(instance, &update.model);
                PatchOutcome::Updated { node, instance }
            }
            Err(err) => {
                log::warn!("dropping layout update for '{}': {err}", update.path);
                PatchOutcome::Dropped(err)
            }
        }
    }

    fn route(&self, path: &str) -> Result<(NodeId, InstanceId), ProtocolError> {
        let node = self.tree.resolve(path)?;
        let instance = self
            .handlers
            .owner(node)
            .ok_or_else(|| ProtocolError::NoHandler {
                path: path.to_string(),
            })?;
        Ok((node, instance))
    }
}
