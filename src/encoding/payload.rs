use crate::error::LatticeError;

pub const PAYLOAD_WIDTH: usize = 4;

/// Value substituted for a missing payload; kept above zero so its logarithm is finite.
pub const ABSENT_PAYLOAD_SCORE: f32 = 0.00001;

pub type EncodedScore = [u8; PAYLOAD_WIDTH];

/// Big-endian IEEE-754 bits, the layout stored alongside each posting.
pub fn encode_float(value: f32) -> EncodedScore {
    value.to_bits().to_be_bytes()
}

pub fn decode_float(bytes: &EncodedScore) -> f32 {
    f32::from_bits(u32::from_be_bytes(*bytes))
}

/// Turns stored payload bytes back into a confidence factor.
#[derive(Debug, Clone, Copy)]
pub struct FloatDecoder {
    scale: f32,
}

impl FloatDecoder {
    pub fn with_scale(scale: f32) -> Result<Self, LatticeError> {
        if !scale.is_finite() || scale <= 0.0 {
            return Err(LatticeError::invalid_config(format!(
                "payload_scale must be positive, got {scale}"
            )));
        }
        Ok(Self { scale })
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn decode(&self, payload: Option<&[u8]>) -> f32 {
        let Some(bytes) = payload else {
            return ABSENT_PAYLOAD_SCORE;
        };
        match <EncodedScore>::try_from(bytes) {
            Ok(fixed) => decode_float(&fixed) * self.scale,
            Err(_) => {
                tracing::warn!(
                    width = bytes.len(),
                    expected = PAYLOAD_WIDTH,
                    "payload: unexpected width, treating as absent"
                );
                ABSENT_PAYLOAD_SCORE
            }
        }
    }
}

impl Default for FloatDecoder {
    fn default() -> Self {
        Self { scale: 1.0 }
    }
}

impl PartialEq for FloatDecoder {
    fn eq(&self, other: &Self) -> bool {
        self.scale.to_bits() == other.scale.to_bits()
    }
}

impl Eq for FloatDecoder {}

impl std::hash::Hash for FloatDecoder {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.scale.to_bits().hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encoding_is_big_endian_bits() {
        assert_eq!(encode_float(1.0), [0x3f, 0x80, 0x00, 0x00]);
        assert_eq!(encode_float(0.5), [0x3f, 0x00, 0x00, 0x00]);
    }

    #[test]
    fn round_trip_is_exact() {
        for value in [0.01f32, 0.2, 0.3, 0.7, 0.9, 1.0, 1e-6, 123.456] {
            assert_eq!(decode_float(&encode_float(value)), value);
        }
    }

    #[test]
    fn absent_payload_decodes_to_epsilon() {
        let decoder = FloatDecoder::default();
        let value = decoder.decode(None);
        assert!(value > 0.0);
        assert!(value.ln().is_finite());
    }

    #[test]
    fn wrong_width_decodes_to_epsilon() {
        let decoder = FloatDecoder::default();
        assert_eq!(decoder.decode(Some(&[1, 2])), ABSENT_PAYLOAD_SCORE);
    }

    #[test]
    fn scale_multiplies_decoded_value() {
        let decoder = FloatDecoder::with_scale(2.0).unwrap();
        let bytes = encode_float(0.25);
        assert_eq!(decoder.decode(Some(&bytes)), 0.5);
        assert!(FloatDecoder::with_scale(0.0).is_err());
        assert!(FloatDecoder::with_scale(f32::NAN).is_err());
    }
}
