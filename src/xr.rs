//! Decoding of the parent XR and of owned resources' `status.conditions`.

use serde::Deserialize;

use crate::error::{ParseError, PollError};
use crate::model::{Condition, ConditionList, ResourceReference};

#[derive(Debug, Default, Deserialize)]
struct CompositeResource {
    #[serde(default)]
    metadata: Metadata,
    #[serde(default)]
    spec: CompositeSpec,
}

#[derive(Debug, Default, Deserialize)]
struct Metadata {
    #[serde(default)]
    namespace: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct CompositeSpec {
    #[serde(default)]
    crossplane: CrossplaneSpec,
}

#[derive(Debug, Default, Deserialize)]
struct CrossplaneSpec {
    #[serde(default, rename = "resourceRefs")]
    resource_refs: Option<Vec<ResourceReference>>,
}

#[derive(Debug, Default, Deserialize)]
struct StatusEnvelope {
    #[serde(default)]
    status: Option<StatusBody>,
}

#[derive(Debug, Default, Deserialize)]
struct StatusBody {
    #[serde(default)]
    conditions: Option<Vec<Condition>>,
}

pub fn extract(yaml: &str) -> Result<(String, Vec<ResourceReference>), ParseError> {
    let xr: CompositeResource =
        serde_yaml::from_str(yaml).map_err(|error| ParseError::MalformedYaml(error.to_string()))?;

    let namespace = xr.metadata.namespace.unwrap_or_default();
    let refs = xr.spec.crossplane.resource_refs.unwrap_or_default();
    Ok((namespace, refs))
}

pub fn parse_conditions(yaml: &str) -> Result<ConditionList, PollError> {
    let envelope: StatusEnvelope =
        serde_yaml::from_str(yaml).map_err(|error| PollError::MalformedYaml(error.to_string()))?;

    let conditions = envelope
        .status
        .and_then(|status| status.conditions)
        .unwrap_or_default();
    Ok(ConditionList(conditions))
}
