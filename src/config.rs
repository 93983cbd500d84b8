use std::path::Path;

use serde::Deserialize;

use crate::encoding::buckets::BucketTable;
use crate::encoding::payload::FloatDecoder;
use crate::encoding::token_record::TokenLayout;
use crate::error::LatticeError;
use crate::scoring::function::{Combinator, PayloadScoreFunction};
use crate::types::LatticeFormat;

/// Settings consumed by the lattice token filter.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LatticeFilterConfig {
    pub score_buckets: Option<BucketSetting>,
    pub lattice_format: Option<String>,
    pub num_extra_fields: Option<u32>,
    pub audio_position_increment_seconds: f32,
    pub delimiter: char,
}

impl LatticeFilterConfig {
    pub const DEFAULT_AUDIO_POSITION_INCREMENT_SECS: f32 = 0.01;
    pub const DEFAULT_DELIMITER: char = '|';

    pub fn from_json_str(json: &str) -> Result<Self, LatticeError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| LatticeError::json("parse filter config", e))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, LatticeError> {
        let data = std::fs::read_to_string(path)
            .map_err(|e| LatticeError::io("read filter config", e))?;
        Self::from_json_str(&data)
    }

    pub fn validate(&self) -> Result<(), LatticeError> {
        self.format()?;
        self.bucket_table()?;
        let secs = self.audio_position_increment_seconds;
        if !secs.is_finite() || secs <= 0.0 {
            return Err(LatticeError::invalid_config(format!(
                "audio_position_increment_seconds must be positive, got {secs}"
            )));
        }
        if self.delimiter.is_whitespace() {
            return Err(LatticeError::invalid_config(
                "delimiter must not be whitespace",
            ));
        }
        Ok(())
    }

    pub fn format(&self) -> Result<LatticeFormat, LatticeError> {
        let from_name = match self.lattice_format.as_deref() {
            Some(name) => Some(LatticeFormat::from_name(name).ok_or_else(|| {
                LatticeError::invalid_config(format!("invalid lattice format '{name}'"))
            })?),
            None => None,
        };
        let from_fields = match self.num_extra_fields {
            None => None,
            Some(0) => Some(LatticeFormat::Lattice),
            Some(2) => Some(LatticeFormat::Audio),
            Some(n) => {
                return Err(LatticeError::invalid_config(format!(
                    "num_extra_fields must be 0 or 2, got {n}"
                )))
            }
        };
        match (from_name, from_fields) {
            (Some(a), Some(b)) if a != b => Err(LatticeError::invalid_config(format!(
                "lattice_format '{}' disagrees with num_extra_fields",
                a.as_str()
            ))),
            (Some(f), _) | (None, Some(f)) => Ok(f),
            (None, None) => Ok(LatticeFormat::default()),
        }
    }

    pub fn token_layout(&self) -> Result<TokenLayout, LatticeError> {
        Ok(match self.format()? {
            LatticeFormat::Lattice => TokenLayout::Base,
            LatticeFormat::Audio => TokenLayout::Timed {
                increment_secs: self.audio_position_increment_seconds,
            },
        })
    }

    pub fn bucket_table(&self) -> Result<BucketTable, LatticeError> {
        match &self.score_buckets {
            Some(setting) => BucketTable::from_flat(&setting.entries()),
            None => Ok(BucketTable::default()),
        }
    }
}

impl Default for LatticeFilterConfig {
    fn default() -> Self {
        Self {
            score_buckets: None,
            lattice_format: None,
            num_extra_fields: None,
            audio_position_increment_seconds: Self::DEFAULT_AUDIO_POSITION_INCREMENT_SECS,
            delimiter: Self::DEFAULT_DELIMITER,
        }
    }
}

/// `score_buckets` may be written as a list or as one comma separated string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum BucketSetting {
    List(Vec<BucketValue>),
    Joined(String),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum BucketValue {
    Number(f64),
    Text(String),
}

impl BucketSetting {
    pub fn entries(&self) -> Vec<String> {
        match self {
            Self::List(values) => values
                .iter()
                .map(|v| match v {
                    BucketValue::Number(n) => n.to_string(),
                    BucketValue::Text(s) => s.trim().to_string(),
                })
                .collect(),
            Self::Joined(s) => s
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
        }
    }
}

/// Settings consumed by the payload scoring query.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LatticeQueryConfig {
    pub payload_function: String,
    pub payload_length_norm_factor: f32,
    pub payload_decoder: String,
    pub payload_scale: f32,
    pub slop: u32,
    pub slop_seconds: f32,
    pub in_order: bool,
    pub include_span_score: bool,
    pub boost: f32,
}

impl LatticeQueryConfig {
    pub const DEFAULT_SLOP_SECS: f32 = 3.0;
    pub const DEFAULT_LENGTH_NORM: f32 = 1.0;

    pub fn from_json_str(json: &str) -> Result<Self, LatticeError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| LatticeError::json("parse query config", e))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, LatticeError> {
        let data =
            std::fs::read_to_string(path).map_err(|e| LatticeError::io("read query config", e))?;
        Self::from_json_str(&data)
    }

    pub fn validate(&self) -> Result<(), LatticeError> {
        self.score_function()?;
        self.decoder()?;
        if !self.slop_seconds.is_finite() || self.slop_seconds < 0.0 {
            return Err(LatticeError::invalid_config(format!(
                "slop_seconds must be non-negative, got {}",
                self.slop_seconds
            )));
        }
        if !self.boost.is_finite() || self.boost < 0.0 {
            return Err(LatticeError::invalid_config(format!(
                "boost must be non-negative, got {}",
                self.boost
            )));
        }
        Ok(())
    }

    pub fn score_function(&self) -> Result<PayloadScoreFunction, LatticeError> {
        let combinator = Combinator::from_name(&self.payload_function).ok_or_else(|| {
            LatticeError::invalid_config(format!(
                "invalid payload function: {}",
                self.payload_function
            ))
        })?;
        PayloadScoreFunction::new(combinator, self.payload_length_norm_factor)
    }

    pub fn decoder(&self) -> Result<FloatDecoder, LatticeError> {
        if self.payload_decoder != "float" {
            return Err(LatticeError::invalid_config(format!(
                "invalid decoder: {}",
                self.payload_decoder
            )));
        }
        FloatDecoder::with_scale(self.payload_scale)
    }
}

impl Default for LatticeQueryConfig {
    fn default() -> Self {
        Self {
            payload_function: "sum".to_string(),
            payload_length_norm_factor: Self::DEFAULT_LENGTH_NORM,
            payload_decoder: "float".to_string(),
            payload_scale: 1.0,
            slop: 0,
            slop_seconds: Self::DEFAULT_SLOP_SECS,
            in_order: true,
            include_span_score: true,
            boost: 1.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_config_default() {
        let config = LatticeFilterConfig::default();
        assert!(config.score_buckets.is_none());
        assert_eq!(config.format().unwrap(), LatticeFormat::Lattice);
        assert_eq!(config.delimiter, '|');
        assert!((config.audio_position_increment_seconds - 0.01).abs() < 1e-9);
        assert!(config.bucket_table().unwrap().is_empty());
    }

    #[test]
    fn filter_config_buckets_from_joined_string() {
        let config =
            LatticeFilterConfig::from_json_str(r#"{"score_buckets": "0.9, 5, 0.5, 3, 0.2, 2"}"#)
                .expect("valid filter config");
        let table = config.bucket_table().unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(table.repeat_count(0.95), 5);
        assert_eq!(table.repeat_count(0.1), 1);
    }

    #[test]
    fn filter_config_buckets_from_list() {
        let config = LatticeFilterConfig::from_json_str(r#"{"score_buckets": [0.5, 3, "0.2", "2"]}"#)
            .expect("valid filter config");
        let table = config.bucket_table().unwrap();
        assert_eq!(table.repeat_count(0.6), 3);
        assert_eq!(table.repeat_count(0.3), 2);
    }

    #[test]
    fn filter_config_audio_format() {
        let config = LatticeFilterConfig::from_json_str(
            r#"{"lattice_format": "AUDIO", "audio_position_increment_seconds": 0.1}"#,
        )
        .expect("valid filter config");
        assert_eq!(config.format().unwrap(), LatticeFormat::Audio);
        match config.token_layout().unwrap() {
            TokenLayout::Timed { increment_secs } => assert!((increment_secs - 0.1).abs() < 1e-9),
            other => panic!("unexpected layout {other:?}"),
        }
    }

    #[test]
    fn filter_config_num_extra_fields_selects_audio() {
        let config = LatticeFilterConfig::from_json_str(r#"{"num_extra_fields": 2}"#).unwrap();
        assert_eq!(config.format().unwrap(), LatticeFormat::Audio);
    }

    #[test]
    fn filter_config_rejects_invalid_settings() {
        assert!(LatticeFilterConfig::from_json_str(r#"{"lattice_format": "video"}"#).is_err());
        assert!(LatticeFilterConfig::from_json_str(r#"{"num_extra_fields": 1}"#).is_err());
        assert!(LatticeFilterConfig::from_json_str(
            r#"{"lattice_format": "lattice", "num_extra_fields": 2}"#
        )
        .is_err());
        assert!(
            LatticeFilterConfig::from_json_str(r#"{"audio_position_increment_seconds": 0}"#)
                .is_err()
        );
        assert!(
            LatticeFilterConfig::from_json_str(r#"{"audio_position_increment_seconds": -0.5}"#)
                .is_err()
        );
        assert!(LatticeFilterConfig::from_json_str(r#"{"score_buckets": "0.9, 5, 0.5"}"#).is_err());
        assert!(LatticeFilterConfig::from_json_str(r#"{"score_buckets": "0.9, x"}"#).is_err());
        assert!(LatticeFilterConfig::from_json_str(r#"{"unknown_setting": 1}"#).is_err());
    }

    #[test]
    fn query_config_defaults() {
        let config = LatticeQueryConfig::from_json_str("{}").expect("valid query config");
        assert_eq!(config.payload_function, "sum");
        assert_eq!(config.slop, 0);
        assert!(config.in_order);
        assert!(config.include_span_score);
        assert!((config.slop_seconds - 3.0).abs() < 1e-9);
        let function = config.score_function().unwrap();
        assert_eq!(function, PayloadScoreFunction::lattice_default());
    }

    #[test]
    fn query_config_parses_all_fields() {
        let json = r#"{
            "payload_function": "max",
            "payload_length_norm_factor": 0.5,
            "payload_scale": 2.0,
            "slop": 3,
            "slop_seconds": 1.5,
            "in_order": false,
            "include_span_score": false
        }"#;
        let config = LatticeQueryConfig::from_json_str(json).expect("valid query config");
        let function = config.score_function().unwrap();
        assert_eq!(function.combinator(), Combinator::Max);
        assert!((function.length_norm_factor() - 0.5).abs() < 1e-9);
        assert!((config.decoder().unwrap().scale() - 2.0).abs() < 1e-9);
        assert!(!config.in_order);
    }

    #[test]
    fn query_config_rejects_unknown_names() {
        assert!(LatticeQueryConfig::from_json_str(r#"{"payload_function": "average"}"#).is_err());
        assert!(LatticeQueryConfig::from_json_str(r#"{"payload_decoder": "int"}"#).is_err());
        assert!(
            LatticeQueryConfig::from_json_str(r#"{"payload_length_norm_factor": -1.0}"#).is_err()
        );
        assert!(LatticeQueryConfig::from_json_str(r#"{"slop_seconds": -1.0}"#).is_err());
    }

    #[test]
    fn load_reports_missing_file() {
        let err = LatticeQueryConfig::load(Path::new("/nonexistent/query.json")).unwrap_err();
        assert!(matches!(err, LatticeError::Io { .. }));
    }
}
