use chrono::Utc;
use std::collections::BTreeMap;

use crate::cli::{hub_api, open_store};
use crate::config::Config;
use crate::hub::ModelHub;
use crate::registry::endpoint_name::unique_endpoint_name;
use crate::registry::{DeploymentRecord, ModelRecord, ModelSource};
use crate::tasks::Task;
use crate::utils::errors::error_chain;
use crate::{die, warn, RegisterArgs};

/// Looks up the pipeline tag of a hub model. Anything short of a tag the
/// dispatcher understands records no task, and is reported.
async fn lookup_task(hub: &dyn ModelHub, model_id: &str) -> Option<String> {
    match hub.model_task(model_id).await {
        Ok(Some(tag)) if Task::parse(ModelSource::HuggingFace, &tag).is_some() => Some(tag),
        Ok(Some(tag)) => {
            warn!(
                "\"{}\" is labelled with unknown task \"{}\", recording no task",
                model_id, tag
            );
            None
        }
        Ok(None) => {
            warn!("the hub does not list a task for \"{}\"", model_id);
            None
        }
        Err(err) => {
            warn!(
                "failed to look up the task of \"{}\": {}",
                model_id,
                error_chain(&err)
            );
            None
        }
    }
}

fn model_record(args: &RegisterArgs, task: Option<String>) -> ModelRecord {
    let predict: BTreeMap<String, String> = args.predict.iter().cloned().collect();

    ModelRecord {
        id: args.model.clone(),
        source: args.source,
        task,
        version: args.version.clone(),
        location: args.location.clone(),
        predict: if predict.is_empty() { None } else { Some(predict) },
    }
}

fn deployment_record(args: &RegisterArgs, endpoint_name: String) -> DeploymentRecord {
    DeploymentRecord {
        instance_count: args.instance_count,
        num_gpus: args.num_gpus,
        quantization: args.quantization.clone(),
        ..DeploymentRecord::new(&endpoint_name, &args.instance_type)
    }
}

pub(crate) async fn register_cmd(config: &Config, args: &RegisterArgs) {
    let endpoint_name = match unique_endpoint_name(
        &args.model,
        args.source,
        args.endpoint_name.as_deref(),
        Utc::now(),
    ) {
        Ok(name) => name,
        Err(err) => die!("{}", err),
    };

    let task = match (&args.task, args.source) {
        (Some(task), _) => Some(task.clone()),
        (None, ModelSource::HuggingFace) => lookup_task(&hub_api(config), &args.model).await,
        (None, _) => None,
    };

    let model = model_record(args, task);
    let deployment = deployment_record(args, endpoint_name);

    let store = open_store(config);

    if let Err(err) = store.write(&deployment, &model) {
        die!("{}", error_chain(&err));
    }

    println!("{}", deployment.endpoint_name);
}
