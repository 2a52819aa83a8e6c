use serde::Serialize;
use strum::IntoEnumIterator;
use table::{IntoTable, Table};
pub(crate) mod table;

use crate::cli::open_store;
use crate::config::Config;
use crate::registry::{ModelDeployment, ModelSource};
use crate::tasks::{CatalogTask, HubTask, PayloadKind};
use crate::utils::errors::error_chain;
use crate::{die, ListArgs, ListObject, ListingFormat};

const UNSET: &str = "-";
const UNSUPPORTED: &str = "unsupported";

#[derive(Serialize)]
struct Deployment {
    endpoint_name: String,
    model_id: String,
    source: ModelSource,
    task: Option<String>,
    instance_type: String,
    instance_count: u32,
}

impl Deployment {
    /// Lists the deployment under its first model.
    fn from_record(record: &ModelDeployment) -> Option<Deployment> {
        let model = record.primary_model()?;

        Some(Deployment {
            endpoint_name: record.endpoint_name().to_string(),
            model_id: model.id.clone(),
            source: model.source,
            task: model.task.clone(),
            instance_type: record.deployment.instance_type.clone(),
            instance_count: record.deployment.instance_count,
        })
    }
}

impl From<Vec<Deployment>> for Table {
    fn from(value: Vec<Deployment>) -> Self {
        let mut tab = Table::new();

        tab.set_header(vec![
            "ENDPOINT", "MODEL", "SOURCE", "TASK", "INSTANCE", "COUNT",
        ]);

        for deployment in value {
            tab.add_row(vec![
                deployment.endpoint_name,
                deployment.model_id,
                deployment.source.to_string(),
                deployment.task.unwrap_or_else(|| UNSET.to_string()),
                deployment.instance_type,
                deployment.instance_count.to_string(),
            ]);
        }

        tab
    }
}

#[derive(Serialize)]
struct TaskListing {
    source: ModelSource,
    task: String,
    payload: Option<String>,
}

impl TaskListing {
    fn new(source: ModelSource, task: String, payload: Option<PayloadKind>) -> TaskListing {
        TaskListing {
            source,
            task,
            payload: payload.map(|kind| kind.to_string()),
        }
    }
}

impl From<Vec<TaskListing>> for Table {
    fn from(value: Vec<TaskListing>) -> Self {
        let mut tab = Table::new();

        tab.set_header(vec!["SOURCE", "TASK", "PAYLOAD"]);

        for task in value {
            tab.add_row(vec![
                task.source.to_string(),
                task.task,
                task.payload.unwrap_or_else(|| UNSUPPORTED.to_string()),
            ]);
        }

        tab
    }
}

fn get_deployments(config: &Config, model: Option<&str>) -> Vec<Deployment> {
    let store = open_store(config);

    let deployments = match model {
        Some(model) => store.get_by_model_id(model),
        None => store.list_all(),
    };

    let deployments = match deployments {
        Ok(deployments) => deployments,
        Err(err) => die!("failed to list deployments: {}", error_chain(&err)),
    };

    deployments.iter().filter_map(Deployment::from_record).collect()
}

fn catalog_tasks() -> impl Iterator<Item = TaskListing> {
    CatalogTask::iter()
        .map(|task| TaskListing::new(ModelSource::Sagemaker, task.to_string(), task.payload_kind()))
}

fn hub_tasks(source: ModelSource) -> impl Iterator<Item = TaskListing> {
    HubTask::iter().map(move |task| TaskListing::new(source, task.to_string(), task.payload_kind()))
}

/// Custom models accept both vocabularies, the hub's first.
fn get_tasks(source: Option<ModelSource>) -> Vec<TaskListing> {
    match source {
        Some(ModelSource::Sagemaker) => catalog_tasks().collect(),
        Some(ModelSource::HuggingFace) => hub_tasks(ModelSource::HuggingFace).collect(),
        Some(ModelSource::Custom) => hub_tasks(ModelSource::Custom)
            .chain(catalog_tasks().map(|t| TaskListing { source: ModelSource::Custom, ..t }))
            .collect(),
        None => catalog_tasks()
            .chain(hub_tasks(ModelSource::HuggingFace))
            .collect(),
    }
}

pub(crate) fn format_output<O: IntoTable + Serialize>(object: O, format: ListingFormat) {
    match format {
        ListingFormat::Json => match serde_json::to_string_pretty(&object) {
            Ok(output) => println!("{}", output),
            Err(err) => die!("failed to serialize the listing: {}", err),
        },
        ListingFormat::Table => {
            let tab = object.into_table();

            print!("{}", tab);
        }
        ListingFormat::HeaderlessTable => {
            let mut tab = object.into_table();

            tab.print_header(false);

            print!("{}", tab);
        }
    }
}

pub(crate) fn list_cmd(config: &Config, args: &ListArgs) {
    let format = args.format;

    match &args.object {
        ListObject::Deployments(args) => {
            let deployments = get_deployments(config, args.model.as_deref());
            format_output(deployments, format);
        }
        ListObject::Tasks(args) => {
            let tasks = get_tasks(args.source);
            format_output(tasks, format);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_listing_per_source() {
        let catalog = get_tasks(Some(ModelSource::Sagemaker));

        assert!(catalog.iter().all(|t| t.source == ModelSource::Sagemaker));
        assert!(catalog
            .iter()
            .any(|t| t.task == "eqa" && t.payload.as_deref() == Some("extractive-question-answering")));

        let hub = get_tasks(Some(ModelSource::HuggingFace));

        assert!(hub
            .iter()
            .any(|t| t.task == "object-detection" && t.payload.is_none()));

        let custom = get_tasks(Some(ModelSource::Custom));

        assert_eq!(custom.len(), catalog.len() + hub.len());
        assert_eq!(get_tasks(None).len(), catalog.len() + hub.len());
    }

    #[test]
    fn test_deployment_row_uses_first_model() {
        use crate::registry::{DeploymentRecord, ModelRecord};

        let mut model = ModelRecord::new("gpt2", ModelSource::HuggingFace);
        model.task = Some("text-generation".to_string());

        let record = ModelDeployment::new(
            DeploymentRecord::new("gpt2-20240101120000", "ml.g5.xlarge"),
            model,
        );

        let table: Table = vec![Deployment::from_record(&record).unwrap()].into();

        assert_eq!(
            table.to_string(),
            "ENDPOINT             MODEL  SOURCE       TASK             INSTANCE      COUNT\n\
             gpt2-20240101120000  gpt2   huggingface  text-generation  ml.g5.xlarge  1\n"
        );
    }

    #[test]
    fn test_task_table_marks_unsupported_tasks() {
        let table: Table = vec![TaskListing::new(
            ModelSource::HuggingFace,
            "object-detection".to_string(),
            None,
        )]
        .into();

        assert_eq!(
            table.to_string(),
            "SOURCE       TASK              PAYLOAD\nhuggingface  object-detection  unsupported\n"
        );
    }
}
