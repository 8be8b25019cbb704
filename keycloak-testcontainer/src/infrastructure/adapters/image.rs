use std::borrow::Cow;
use std::collections::BTreeMap;

use testcontainers::core::{ContainerPort, IntoContainerPort, WaitFor};
use testcontainers::{CopyDataSource, CopyToContainer, Image};

use crate::application::services::render::{ContainerPlan, CopySource};

/// Keycloak image definition driven by a rendered [`ContainerPlan`]
#[derive(Debug, Clone)]
pub struct KeycloakImage {
    name: String,
    tag: String,
    cmd: Vec<String>,
    env: BTreeMap<String, String>,
    copies: Vec<CopyToContainer>,
    ports: Vec<ContainerPort>,
    wait_for: WaitFor,
}

impl From<&ContainerPlan> for KeycloakImage {
    fn from(plan: &ContainerPlan) -> Self {
        let copies = plan
            .copies
            .iter()
            .map(|copy| {
                let source = match &copy.source {
                    CopySource::HostPath(path) => CopyDataSource::from(path.clone()),
                    CopySource::Bytes(bytes) => CopyDataSource::from(bytes.clone()),
                };
                CopyToContainer::new(source, copy.target.clone())
            })
            .collect();

        Self {
            name: plan.image.clone(),
            tag: plan.tag.clone(),
            cmd: plan.cmd.clone(),
            env: plan.env.clone(),
            copies,
            ports: plan.exposed_ports.iter().map(|port| port.tcp()).collect(),
            wait_for: plan.wait_for.clone(),
        }
    }
}

impl Image for KeycloakImage {
    fn name(&self) -> &str {
        &self.name
    }

    fn tag(&self) -> &str {
        &self.tag
    }

    fn ready_conditions(&self) -> Vec<WaitFor> {
        vec![self.wait_for.clone()]
    }

    fn env_vars(
        &self,
    ) -> impl IntoIterator<Item = (impl Into<Cow<'_, str>>, impl Into<Cow<'_, str>>)> {
        &self.env
    }

    fn copy_to_sources(&self) -> impl IntoIterator<Item = &CopyToContainer> {
        &self.copies
    }

    fn cmd(&self) -> impl IntoIterator<Item = impl Into<Cow<'_, str>>> {
        &self.cmd
    }

    fn expose_ports(&self) -> &[ContainerPort] {
        &self.ports
    }
}
