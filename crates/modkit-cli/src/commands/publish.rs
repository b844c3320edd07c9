//! Publish command - hand built modules to the configured publisher

use super::{run_stage, StageReport};
use crate::config::{Config, ENV_PUBLISH_PATH};
use crate::ProjectArgs;
use anyhow::{bail, Result};
use serde_json::json;

pub fn run(args: &ProjectArgs, config: &Config, destination: Option<String>) -> Result<()> {
    let Some(destination) = destination else {
        bail!(
            "no publish destination; pass --destination or set {}",
            ENV_PUBLISH_PATH
        );
    };

    run_stage("publish", args, |builder| {
        let publisher = config.publisher();
        let published = builder.publish(publisher.as_ref(), &destination)?;
        let summary = if published {
            format!("published to {} via {}", destination, publisher.name())
        } else {
            format!("publisher {} not available, skipped", publisher.name())
        };
        Ok(StageReport {
            summary,
            details: json!({
                "destination": destination,
                "publisher": publisher.name(),
                "published": published,
            }),
        })
    })
}
