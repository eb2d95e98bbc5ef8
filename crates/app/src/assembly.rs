//! Device assembly: turn runtime components into attached Homie nodes.

use tokio::sync::mpsc;

use homie_domain::device::Device;
use homie_domain::error::HomieError;
use homie_domain::id::NodeId;

use crate::ports::{Component, PropertyUpdate};
use crate::registry::{NodeBinding, Registry};

/// Seal `registry`, then build and attach one node per component that
/// declares a Homie node id. Components without one are skipped.
///
/// Returns the number of attached nodes.
///
/// # Errors
///
/// Any configuration error aborts assembly: an invalid node id
/// ([`HomieError::Validation`]), an unbound type tag
/// ([`HomieError::Registry`]), a duplicate node id
/// ([`HomieError::DuplicateId`]) or an already announced device
/// ([`HomieError::LateAttachment`]).
#[tracing::instrument(skip_all, fields(device = %device.id()))]
pub fn assemble<'a>(
    device: &mut Device,
    registry: &mut Registry,
    components: impl IntoIterator<Item = &'a dyn Component>,
    updates: &mpsc::UnboundedSender<PropertyUpdate>,
) -> Result<usize, HomieError> {
    registry.seal();
    let mut attached = 0;
    for component in components {
        let Some(node_id) = component.homie_node_id() else {
            tracing::debug!(component = component.name(), "no homie node, skipped");
            continue;
        };
        let binding = NodeBinding {
            node_id: NodeId::new(node_id)?,
            updates: updates.clone(),
        };
        let class = registry.resolve(component.type_tag())?;
        let node = class.build_node(component, &binding)?;
        device.attach_node(node)?;
        tracing::info!(
            node = node_id,
            tag = component.type_tag(),
            "node attached"
        );
        attached += 1;
    }
    Ok(attached)
}
