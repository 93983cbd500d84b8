use crate::error::LatticeError;

/// Confidence threshold to emission count, highest threshold first.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BucketTable {
    entries: Vec<(f32, u32)>,
}

impl BucketTable {
    pub fn new(mut entries: Vec<(f32, u32)>) -> Result<Self, LatticeError> {
        for &(threshold, repeats) in &entries {
            if !threshold.is_finite() {
                return Err(LatticeError::invalid_config(format!(
                    "score bucket threshold must be finite, got {threshold}"
                )));
            }
            if repeats == 0 {
                return Err(LatticeError::invalid_config(format!(
                    "score bucket {threshold} must repeat at least once"
                )));
            }
        }
        entries.sort_by(|a, b| b.0.total_cmp(&a.0));
        // Later duplicates of a threshold override earlier ones.
        let mut deduped: Vec<(f32, u32)> = Vec::with_capacity(entries.len());
        for (threshold, repeats) in entries {
            match deduped.last_mut() {
                Some(last) if last.0 == threshold => last.1 = repeats,
                _ => deduped.push((threshold, repeats)),
            }
        }
        Ok(Self { entries: deduped })
    }

    /// Builds the table from an alternating `threshold, repeats, ...` list.
    pub fn from_flat<S: AsRef<str>>(values: &[S]) -> Result<Self, LatticeError> {
        if values.len() % 2 != 0 {
            return Err(LatticeError::invalid_config(format!(
                "score_buckets needs threshold/count pairs, got {} values",
                values.len()
            )));
        }
        let entries = values
            .chunks(2)
            .map(|pair| {
                let threshold_text = pair[0].as_ref();
                let count_text = pair[1].as_ref();
                let threshold: f32 = threshold_text.parse().map_err(|_| {
                    LatticeError::invalid_config(format!(
                        "bad score bucket threshold `{threshold_text}`"
                    ))
                })?;
                let repeats: u32 = count_text.parse().map_err(|_| {
                    LatticeError::invalid_config(format!("bad score bucket count `{count_text}`"))
                })?;
                Ok((threshold, repeats))
            })
            .collect::<Result<Vec<_>, LatticeError>>()?;
        Self::new(entries)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[(f32, u32)] {
        &self.entries
    }

    /// Count of the highest threshold not above `score`, or 1.
    pub fn repeat_count(&self, score: f32) -> u32 {
        self.entries
            .iter()
            .find(|&&(threshold, _)| score >= threshold)
            .map(|&(_, repeats)| repeats)
            .unwrap_or(1)
    }
}
