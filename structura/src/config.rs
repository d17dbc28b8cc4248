use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::constant::{Const, DataError, Timeframe};

#[derive(Debug, Clone, PartialEq)]
pub struct StructureConfig {
    pub fractal_length: usize,
    pub timeframes: Vec<Timeframe>,
    pub confluence_timeframes: Vec<Timeframe>,
    pub workers: usize,
    pub data_dir: PathBuf,
}

/// 配置文件中的可选字段，未给出的项沿用默认值。
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StructureConfigPatch {
    pub fractal_length: Option<usize>,
    pub timeframes: Option<Vec<String>>,
    pub confluence_timeframes: Option<Vec<String>>,
    pub workers: Option<usize>,
    pub data_dir: Option<PathBuf>,
}

impl Default for StructureConfig {
    fn default() -> Self {
        let timeframes = vec![Timeframe::D1, Timeframe::H4, Timeframe::H1];
        Self {
            fractal_length: Const::DEFAULT_FRACTAL_LENGTH,
            confluence_timeframes: timeframes.clone(),
            timeframes,
            workers: default_workers(),
            data_dir: PathBuf::from("dataset"),
        }
    }
}

impl StructureConfig {
    pub fn apply_patch(mut self, patch: StructureConfigPatch) -> Result<Self, DataError> {
        if let Some(v) = patch.fractal_length {
            self.fractal_length = v;
        }
        if let Some(v) = patch.timeframes {
            self.timeframes = parse_timeframes(&v)?;
            self.confluence_timeframes = self.timeframes.clone();
        }
        if let Some(v) = patch.confluence_timeframes {
            self.confluence_timeframes = parse_timeframes(&v)?;
        }
        if let Some(v) = patch.workers {
            self.workers = v.max(1);
        }
        if let Some(v) = patch.data_dir {
            self.data_dir = v;
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), DataError> {
        if self.fractal_length < Const::MIN_FRACTAL_LENGTH {
            return Err(DataError::InvalidConfig(format!(
                "fractal_length must be >= {}, got {}",
                Const::MIN_FRACTAL_LENGTH,
                self.fractal_length
            )));
        }
        if self.timeframes.is_empty() {
            return Err(DataError::InvalidConfig("timeframes must not be empty".to_string()));
        }
        if let Some(tf) = self
            .confluence_timeframes
            .iter()
            .find(|tf| !self.timeframes.contains(tf))
        {
            return Err(DataError::InvalidConfig(format!(
                "confluence timeframe {tf} is not in timeframes"
            )));
        }
        if self.workers == 0 {
            return Err(DataError::InvalidConfig("workers must be >= 1".to_string()));
        }
        Ok(())
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self, DataError> {
        let patch: StructureConfigPatch = serde_yaml::from_str(yaml)?;
        Self::default().apply_patch(patch)
    }

    pub fn from_json_str(json: &str) -> Result<Self, DataError> {
        let patch: StructureConfigPatch = serde_json::from_str(json)?;
        Self::default().apply_patch(patch)
    }

    /// 按扩展名选择 json 或 yaml 解析。
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, DataError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)?;
        match path.extension().and_then(|x| x.to_str()) {
            Some("json") => Self::from_json_str(&raw),
            Some("yaml") | Some("yml") => Self::from_yaml_str(&raw),
            _ => Err(DataError::InvalidConfig(format!(
                "unsupported config file format: {}",
                path.display()
            ))),
        }
    }
}

fn parse_timeframes(values: &[String]) -> Result<Vec<Timeframe>, DataError> {
    let mut out = Vec::with_capacity(values.len());
    for value in values {
        let tf = Timeframe::parse(value)?;
        if !out.contains(&tf) {
            out.push(tf);
        }
    }
    Ok(out)
}

fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|x| x.get())
        .unwrap_or(4)
}
