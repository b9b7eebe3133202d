//! Binary model artifacts.
//!
//! An artifact is a bincode envelope: an 8-byte magic tag, a `u32` format
//! version, then the [`TrainedModel`]. Files are written to a temporary
//! sibling and renamed into place, so a crash never leaves a partial
//! artifact at the target path.

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::classifier::Classifier;
use crate::error::{ChurnError, Result};
use crate::model::TrainedModel;

/// Leading bytes of every artifact.
pub const MAGIC: [u8; 8] = *b"CHURNMDL";

/// Current envelope format version.
pub const FORMAT_VERSION: u32 = 1;

#[derive(Deserialize)]
struct Header {
    magic: [u8; 8],
    format_version: u32,
}

#[derive(Serialize)]
struct EnvelopeRef<'a, C> {
    magic: [u8; 8],
    format_version: u32,
    model: &'a TrainedModel<C>,
}

/// Saves and loads [`TrainedModel`] artifacts.
#[derive(Debug, Clone, Copy, Default)]
pub struct ArtifactStore;

impl ArtifactStore {
    /// Encode `model` as artifact bytes.
    pub fn to_bytes<C: Serialize>(model: &TrainedModel<C>) -> Result<Vec<u8>> {
        bincode::serialize(&EnvelopeRef {
            magic: MAGIC,
            format_version: FORMAT_VERSION,
            model,
        })
        .map_err(|source| ChurnError::SerializeArtifact { source })
    }

    /// Decode artifact bytes; `path` is only used in error reports.
    pub fn from_bytes<C>(bytes: &[u8], path: &Path) -> Result<TrainedModel<C>>
    where
        C: Classifier + DeserializeOwned,
    {
        let corrupt = |reason: String| ChurnError::CorruptArtifact {
            path: path.to_path_buf(),
            reason,
        };

        let header: Header =
            bincode::deserialize(bytes).map_err(|e| corrupt(format!("unreadable header: {e}")))?;
        if header.magic != MAGIC {
            return Err(corrupt("not a churn model artifact".to_string()));
        }
        if header.format_version != FORMAT_VERSION {
            return Err(ChurnError::IncompatibleArtifact {
                path: path.to_path_buf(),
                expected: FORMAT_VERSION,
                found: header.format_version,
            });
        }

        let (_, model): (Header, TrainedModel<C>) =
            bincode::deserialize(bytes).map_err(|e| corrupt(format!("undecodable model: {e}")))?;
        if let Some(reason) = model.inconsistency() {
            return Err(corrupt(reason));
        }
        Ok(model)
    }

    /// Write `model` to `path`, replacing any existing file.
    pub fn save<C: Serialize>(model: &TrainedModel<C>, path: &Path) -> Result<()> {
        let bytes = Self::to_bytes(model)?;
        let tmp = temp_sibling(path)?;

        if let Err(source) = write_file(&tmp, &bytes).and_then(|()| fs::rename(&tmp, path)) {
            // Best effort; the original error is what matters.
            let _ = fs::remove_file(&tmp);
            return Err(ChurnError::ArtifactIo {
                path: path.to_path_buf(),
                source,
            });
        }

        info!(path = %path.display(), bytes = bytes.len(), "Saved model artifact");
        Ok(())
    }

    /// Read a model from `path`.
    pub fn load<C>(path: &Path) -> Result<TrainedModel<C>>
    where
        C: Classifier + DeserializeOwned,
    {
        let bytes = fs::read(path).map_err(|source| ChurnError::ArtifactIo {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), bytes = bytes.len(), "Read model artifact");

        let model = Self::from_bytes(&bytes, path)?;
        info!(
            path = %path.display(),
            version = model.version_tag(),
            "Loaded model artifact"
        );
        Ok(model)
    }
}

fn temp_sibling(path: &Path) -> Result<PathBuf> {
    let name = path.file_name().ok_or_else(|| ChurnError::ArtifactIo {
        path: path.to_path_buf(),
        source: io::Error::new(io::ErrorKind::InvalidInput, "artifact path has no file name"),
    })?;
    let mut tmp_name = name.to_os_string();
    tmp_name.push(".tmp");
    Ok(path.with_file_name(tmp_name))
}

fn write_file(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    writer.write_all(bytes)?;
    writer.flush()?;
    writer.get_ref().sync_all()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::{ForestParams, RandomForestClassifier};
    use churn_processing::{FeatureSpec, FittedTransformState, encode_labels};
    use polars::prelude::*;
    use pretty_assertions::assert_eq;

    fn frame() -> DataFrame {
        let tenure: Vec<f64> = (0..40).map(|i| i as f64).collect();
        let contract: Vec<&str> = (0..40)
            .map(|i| if i % 2 == 0 { "Month-to-month" } else { "One year" })
            .collect();
        let churn: Vec<&str> = (0..40).map(|i| if i < 15 { "Yes" } else { "No" }).collect();
        df! {
            "tenure" => tenure,
            "Contract" => contract,
            "Churn" => churn,
        }
        .unwrap()
    }

    fn trained(version: &str) -> (TrainedModel<RandomForestClassifier>, DataFrame) {
        let df = frame();
        let spec = FeatureSpec::builder()
            .numeric(["tenure"])
            .categorical(["Contract"])
            .build()
            .unwrap();
        let state = FittedTransformState::fit(&spec, &df).unwrap();
        let x = state.transform(&df).unwrap();
        let y = encode_labels(&df, "Churn").unwrap();
        let mut forest = RandomForestClassifier::new(ForestParams::default().with_n_estimators(5));
        forest.fit(&x, &y).unwrap();
        (TrainedModel::new(state, forest, version), df)
    }

    #[test]
    fn test_file_round_trip() {
        let (model, df) = trained("v1");
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("churn.bin");

        ArtifactStore::save(&model, &path).unwrap();
        let loaded: TrainedModel<RandomForestClassifier> = ArtifactStore::load(&path).unwrap();

        assert_eq!(loaded, model);
        assert_eq!(
            loaded.predict_proba(&df).unwrap(),
            model.predict_proba(&df).unwrap()
        );
        assert!(!dir.path().join("churn.bin.tmp").exists());
    }

    #[test]
    fn test_save_replaces_existing_file() {
        let (model, _) = trained("v2");
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("churn.bin");
        fs::write(&path, b"old").unwrap();

        ArtifactStore::save(&model, &path).unwrap();
        let loaded: TrainedModel<RandomForestClassifier> = ArtifactStore::load(&path).unwrap();
        assert_eq!(loaded.version_tag(), "v2");
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let result: Result<TrainedModel<RandomForestClassifier>> =
            ArtifactStore::load(&dir.path().join("absent.bin"));
        assert!(matches!(result, Err(ChurnError::ArtifactIo { .. })));
    }

    #[test]
    fn test_bad_magic_is_corrupt() {
        let (model, _) = trained("v1");
        let mut bytes = ArtifactStore::to_bytes(&model).unwrap();
        bytes[0] = b'X';
        let result: Result<TrainedModel<RandomForestClassifier>> =
            ArtifactStore::from_bytes(&bytes, Path::new("m.bin"));
        assert!(matches!(result, Err(ChurnError::CorruptArtifact { .. })));
    }

    #[test]
    fn test_truncated_bytes_are_corrupt() {
        let (model, _) = trained("v1");
        let bytes = ArtifactStore::to_bytes(&model).unwrap();
        let result: Result<TrainedModel<RandomForestClassifier>> =
            ArtifactStore::from_bytes(&bytes[..bytes.len() / 2], Path::new("m.bin"));
        assert!(matches!(result, Err(ChurnError::CorruptArtifact { .. })));

        let result: Result<TrainedModel<RandomForestClassifier>> =
            ArtifactStore::from_bytes(&bytes[..4], Path::new("m.bin"));
        assert!(matches!(result, Err(ChurnError::CorruptArtifact { .. })));
    }

    #[test]
    fn test_other_format_version_is_incompatible() {
        let (model, _) = trained("v1");
        let mut bytes = ArtifactStore::to_bytes(&model).unwrap();
        bytes[8..12].copy_from_slice(&(FORMAT_VERSION + 1).to_le_bytes());
        let result: Result<TrainedModel<RandomForestClassifier>> =
            ArtifactStore::from_bytes(&bytes, Path::new("m.bin"));
        match result {
            Err(ChurnError::IncompatibleArtifact {
                expected, found, ..
            }) => {
                assert_eq!(expected, FORMAT_VERSION);
                assert_eq!(found, FORMAT_VERSION + 1);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_empty_version_tag_is_corrupt() {
        let (model, _) = trained("");
        let bytes = ArtifactStore::to_bytes(&model).unwrap();
        let result: Result<TrainedModel<RandomForestClassifier>> =
            ArtifactStore::from_bytes(&bytes, Path::new("m.bin"));
        match result {
            Err(ChurnError::CorruptArtifact { reason, .. }) => {
                assert!(reason.contains("version tag"));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
