use serde::{Deserialize, Serialize};
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

use super::endpoint_name;
use super::record::{DeploymentRecord, ModelDeployment, ModelRecord, RecordError};
use super::tempfile::AtomicFile;
use crate::warn;

const RECORD_EXTENSION: &str = "toml";

#[derive(Error, Debug)]
pub(crate) enum Error {
    #[error("failed to access the registry at \"{}\"", .0.display())]
    Io(PathBuf, #[source] io::Error),
    #[error("record \"{}\" could not be parsed", .0.display())]
    Malformed(PathBuf, #[source] toml::de::Error),
    #[error("record \"{}\" is incomplete: {1}", .0.display())]
    Incomplete(PathBuf, &'static str),
    #[error("invalid record for endpoint \"{0}\"")]
    Invalid(String, #[source] RecordError),
    #[error("invalid endpoint name")]
    InvalidEndpointName(
        #[from]
        #[source]
        endpoint_name::Error,
    ),
    #[error("failed to serialize the record for endpoint \"{0}\"")]
    Serialization(String, #[source] toml::ser::Error),
}

/// The on-disk layout of a record. Both sections are optional here so that
/// incomplete files can be reported rather than rejected by the parser.
#[derive(Serialize, Deserialize, Debug, Default)]
struct RecordFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    deployment: Option<DeploymentRecord>,
    #[serde(default)]
    models: Vec<ModelRecord>,
}

impl RecordFile {
    fn into_deployment(self, path: &Path) -> Result<ModelDeployment, Error> {
        let deployment = self
            .deployment
            .ok_or_else(|| Error::Incomplete(path.to_path_buf(), "missing deployment section"))?;

        if self.models.is_empty() {
            return Err(Error::Incomplete(path.to_path_buf(), "no models listed"));
        }

        Ok(ModelDeployment {
            deployment,
            models: self.models,
        })
    }
}

/// A directory of deployment records, one file per endpoint.
pub(crate) struct RecordStore {
    dir: PathBuf,
}

impl RecordStore {
    /// Opens the registry at `dir`, creating the directory if necessary.
    pub(crate) fn open<P: Into<PathBuf>>(dir: P) -> Result<RecordStore, Error> {
        let dir = dir.into();

        std::fs::create_dir_all(&dir).map_err(|e| Error::Io(dir.clone(), e))?;

        Ok(RecordStore { dir })
    }

    fn record_path(&self, endpoint_name: &str) -> PathBuf {
        self.dir
            .join(format!("{}.{}", endpoint_name, RECORD_EXTENSION))
    }

    fn read_record(path: &Path) -> Result<ModelDeployment, Error> {
        let raw = std::fs::read_to_string(path).map_err(|e| Error::Io(path.to_path_buf(), e))?;

        let file: RecordFile =
            toml::from_str(&raw).map_err(|e| Error::Malformed(path.to_path_buf(), e))?;

        file.into_deployment(path)
    }

    /// Enumerates every record in the registry. Records which cannot be read
    /// or are incomplete are skipped with a warning.
    pub(crate) fn list_all(&self) -> Result<Vec<ModelDeployment>, Error> {
        let entries = std::fs::read_dir(&self.dir).map_err(|e| Error::Io(self.dir.clone(), e))?;

        let mut paths = Vec::new();

        for entry in entries {
            let entry = entry.map_err(|e| Error::Io(self.dir.clone(), e))?;

            let path = entry.path();

            let is_record = path.extension().is_some_and(|ext| ext == RECORD_EXTENSION)
                && !entry.file_name().to_string_lossy().starts_with('.');

            if is_record {
                paths.push(path);
            }
        }

        paths.sort();

        let mut deployments = Vec::new();

        for path in paths {
            match Self::read_record(&path) {
                Ok(deployment) => deployments.push(deployment),
                Err(err) => warn!("skipping record: {}", crate::utils::errors::error_chain(&err)),
            }
        }

        Ok(deployments)
    }

    /// Looks up the record of `endpoint_name`. A name which was never written
    /// yields `None`.
    pub(crate) fn get_by_endpoint(
        &self,
        endpoint_name: &str,
    ) -> Result<Option<ModelDeployment>, Error> {
        // Names outside the endpoint alphabet can never have been written
        if endpoint_name::validate(endpoint_name).is_err() {
            return Ok(None);
        }

        let path = self.record_path(endpoint_name);

        if !path.exists() {
            return Ok(None);
        }

        Self::read_record(&path).map(Some)
    }

    /// Returns every deployment which serves `model_id`.
    pub(crate) fn get_by_model_id(&self, model_id: &str) -> Result<Vec<ModelDeployment>, Error> {
        let deployments = self
            .list_all()?
            .into_iter()
            .filter(|d| d.serves_model(model_id))
            .collect();

        Ok(deployments)
    }

    /// Persists a deployment serving `model`, replacing any previous record
    /// under the same endpoint name.
    pub(crate) fn write(
        &self,
        deployment: &DeploymentRecord,
        model: &ModelRecord,
    ) -> Result<(), Error> {
        let name = &deployment.endpoint_name;

        endpoint_name::validate(name)?;

        let record = ModelDeployment::new(deployment.clone(), model.clone());

        record
            .validate()
            .map_err(|e| Error::Invalid(name.clone(), e))?;

        let contents = toml::to_string(&RecordFile {
            deployment: Some(record.deployment),
            models: record.models,
        })
        .map_err(|e| Error::Serialization(name.clone(), e))?;

        let path = self.record_path(name);

        let mut file = AtomicFile::new(&path).map_err(|e| Error::Io(path.clone(), e))?;

        file.write_all(contents.as_bytes())
            .map_err(|e| Error::Io(path.clone(), e))?;

        file.persist().map_err(|e| Error::Io(path.clone(), e))?;

        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use rand::{distributions::Alphanumeric, Rng};
    use std::path::{Path, PathBuf};

    /// A uniquely named directory under the system temp dir which is removed
    /// when dropped.
    pub(crate) struct ScratchDir {
        path: PathBuf,
    }

    impl ScratchDir {
        pub(crate) fn new() -> ScratchDir {
            let suffix: String = rand::thread_rng()
                .sample_iter(&Alphanumeric)
                .take(16)
                .map(char::from)
                .collect();

            let path = std::env::temp_dir().join(format!("mmgr-test-{}", suffix));

            std::fs::create_dir_all(&path).expect("failed to create scratch dir");

            ScratchDir { path }
        }

        pub(crate) fn path(&self) -> &Path {
            &self.path
        }
    }

    impl Drop for ScratchDir {
        fn drop(&mut self) {
            let _ = std::fs::remove_dir_all(&self.path);
        }
    }
}
