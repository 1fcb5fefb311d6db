//! AWS EC2 instances through the `aws` CLI.

use super::ActionHandler;
use crate::error::{Error, Result};
use crate::types::{Action, Component, Invocation};
use serde_json::{Map, Value, json};

/// Component kind served by [`Ec2InstanceHandler`]
pub const KIND: &str = "awsEc2Instance";

const RUN_INSTANCE_FIELDS: [&str; 5] = [
    "ImageId",
    "InstanceType",
    "KeyName",
    "SecurityGroupIds",
    "UserData",
];

const DEFAULT_RESOURCE_TYPE: &str = "instance";

/// Builds `aws ec2` invocations for instance components.
#[derive(Debug, Clone, Default)]
pub struct Ec2InstanceHandler;

impl ActionHandler for Ec2InstanceHandler {
    fn kind(&self) -> &str {
        KIND
    }

    fn invocation(&self, component: &Component, action: Action) -> Result<Invocation> {
        let region = string_property(component, "region")?;
        let (subcommand, input) = match action {
            Action::Create => ("run-instances", run_instances_input(component)),
            Action::Update => {
                let tags = normalize_tags(component.property("tags"));
                if tags.is_empty() {
                    return Err(missing(component, "tags"));
                }
                (
                    "create-tags",
                    json!({ "Resources": [instance_id(component)?], "Tags": tags }),
                )
            }
            Action::Delete => (
                "terminate-instances",
                json!({ "InstanceIds": [instance_id(component)?] }),
            ),
        };

        Ok(Invocation::new(
            "aws",
            vec![
                "ec2".to_string(),
                subcommand.to_string(),
                "--region".to_string(),
                region.to_string(),
                "--cli-input-json".to_string(),
                input.to_string(),
            ],
        ))
    }
}

/// `run-instances` input document.
///
/// `TagSpecifications` is only present when the component has tags.
pub fn run_instances_input(component: &Component) -> Value {
    let mut input = Map::new();
    for field in RUN_INSTANCE_FIELDS {
        if let Some(value) = component.property(field) {
            input.insert(field.to_string(), value.clone());
        }
    }

    let tags = normalize_tags(component.property("tags"));
    if !tags.is_empty() {
        let resource_type = component
            .property("awsResourceType")
            .and_then(Value::as_str)
            .unwrap_or(DEFAULT_RESOURCE_TYPE);
        input.insert(
            "TagSpecifications".to_string(),
            json!([{ "ResourceType": resource_type, "Tags": tags }]),
        );
    }

    Value::Object(input)
}

/// Turn a `{key: value}` map into AWS's `[{Key, Value}]` list.
///
/// Keys come out sorted; non-string values are written as JSON text.
pub fn normalize_tags(tags: Option<&Value>) -> Vec<Value> {
    let Some(Value::Object(map)) = tags else {
        return Vec::new();
    };
    map.iter()
        .map(|(key, value)| {
            let value = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            json!({ "Key": key, "Value": value })
        })
        .collect()
}

fn instance_id(component: &Component) -> Result<&str> {
    component
        .resource
        .data
        .as_ref()
        .and_then(|data| data.pointer("/Instances/0/InstanceId"))
        .and_then(Value::as_str)
        .ok_or_else(|| missing(component, "resource.data.Instances.0.InstanceId"))
}

fn string_property<'a>(component: &'a Component, key: &str) -> Result<&'a str> {
    component
        .property(key)
        .and_then(Value::as_str)
        .ok_or_else(|| missing(component, key))
}

fn missing(component: &Component, property: &str) -> Error {
    Error::MissingProperty {
        component: component.name.clone(),
        property: property.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Resource;

    fn component(properties: Value) -> Component {
        Component {
            id: "c1".into(),
            name: "web".into(),
            kind: KIND.into(),
            properties,
            resource: Resource::default(),
        }
    }

    fn input_of(inv: &Invocation) -> Value {
        let pos = inv.args.iter().position(|a| a == "--cli-input-json").unwrap();
        serde_json::from_str(&inv.args[pos + 1]).unwrap()
    }

    #[test]
    fn test_normalize_tags() {
        let tags = json!({"team": "infra", "cost": 12});
        assert_eq!(
            normalize_tags(Some(&tags)),
            vec![
                json!({"Key": "cost", "Value": "12"}),
                json!({"Key": "team", "Value": "infra"}),
            ]
        );
        assert!(normalize_tags(Some(&json!({}))).is_empty());
        assert!(normalize_tags(None).is_empty());
    }

    #[test]
    fn test_create_builds_run_instances() {
        let c = component(json!({
            "region": "us-east-1",
            "ImageId": "ami-123",
            "InstanceType": "t3.micro",
            "tags": {"Name": "web"},
        }));
        let inv = Ec2InstanceHandler.invocation(&c, Action::Create).unwrap();

        assert_eq!(inv.program, "aws");
        assert_eq!(&inv.args[..4], ["ec2", "run-instances", "--region", "us-east-1"]);
        assert_eq!(
            input_of(&inv),
            json!({
                "ImageId": "ami-123",
                "InstanceType": "t3.micro",
                "TagSpecifications": [{
                    "ResourceType": "instance",
                    "Tags": [{"Key": "Name", "Value": "web"}]
                }]
            })
        );
    }

    #[test]
    fn test_create_without_tags_omits_tag_specifications() {
        let c = component(json!({"region": "eu-west-1", "ImageId": "ami-1", "tags": {}}));
        let input = run_instances_input(&c);
        assert!(input.get("TagSpecifications").is_none());
    }

    #[test]
    fn test_delete_targets_recorded_instance() {
        let mut c = component(json!({"region": "us-east-1"}));
        c.record(Action::Create, json!({"Instances": [{"InstanceId": "i-0abc"}]}));

        let inv = Ec2InstanceHandler.invocation(&c, Action::Delete).unwrap();
        assert_eq!(inv.args[1], "terminate-instances");
        assert_eq!(input_of(&inv), json!({"InstanceIds": ["i-0abc"]}));
    }

    #[test]
    fn test_missing_region_is_reported() {
        let c = component(json!({"ImageId": "ami-1"}));
        let err = Ec2InstanceHandler.invocation(&c, Action::Create).unwrap_err();
        assert!(matches!(err, Error::MissingProperty { ref property, .. } if property == "region"));
    }
}
