//! ITU-T G.711 A-law and µ-law companding
//!
//! Reference arithmetic implementation, no lookup tables. Operates on
//! 16-bit linear PCM at 8 kHz, one byte per sample on the wire.

/// Compress a linear PCM sample to 8-bit A-law.
pub fn alaw_compress(sample: i16) -> u8 {
    let mut ix = if sample < 0 {
        (((!sample) as u16) >> 4) as i16
    } else {
        sample >> 4
    };

    if ix > 15 {
        let mut iexp = 1;
        while ix > 16 + 15 {
            ix >>= 1;
            iexp += 1;
        }
        ix -= 16;
        ix += iexp << 4;
    }

    if sample >= 0 {
        ix |= 0x0080;
    }

    (ix ^ 0x0055) as u8
}

/// Expand an 8-bit A-law byte to linear PCM.
pub fn alaw_expand(compressed: u8) -> i16 {
    let mut ix = (compressed ^ 0x0055) as i16;

    ix &= 0x007F;
    let iexp = ix >> 4;
    let mut mant = ix & 0x000F;

    if iexp > 0 {
        mant += 16;
    }

    mant = (mant << 4) + 0x0008;

    if iexp > 1 {
        mant <<= iexp - 1;
    }

    if compressed > 127 {
        mant
    } else {
        -mant
    }
}

/// Compress a linear PCM sample to 8-bit µ-law.
pub fn ulaw_compress(sample: i16) -> u8 {
    let absno = if sample < 0 {
        (((!sample) as u16) >> 2) as i16 + 33
    } else {
        (sample >> 2) + 33
    };

    let absno = absno.min(0x1FFF);

    let mut i = absno >> 6;
    let mut segno = 1;
    while i != 0 {
        segno += 1;
        i >>= 1;
    }

    let high_nibble = 0x0008 - segno;
    let low_nibble = 0x000F - ((absno >> segno) & 0x000F);
    let mut result = (high_nibble << 4) | low_nibble;

    if sample >= 0 {
        result |= 0x0080;
    }

    result as u8
}

/// Expand an 8-bit µ-law byte to linear PCM.
pub fn ulaw_expand(compressed: u8) -> i16 {
    let sign: i16 = if compressed < 0x0080 { -1 } else { 1 };
    let mantissa = (!compressed) as i16;
    let exponent = (mantissa >> 4) & 0x0007;
    let segment = exponent + 1;
    let mantissa = mantissa & 0x000F;

    let step = 4 << segment;

    sign * ((0x0080 << exponent) + step * mantissa + step / 2 - 4 * 33)
}

/// Compress a slice of f32 samples (-1.0..1.0) with the given compressor.
pub fn compress_f32(samples: &[f32], compress: fn(i16) -> u8, out: &mut Vec<u8>) {
    out.clear();
    out.extend(samples.iter().map(|&s| {
        let clamped = (s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
        compress(clamped)
    }));
}

/// Expand a slice of companded bytes to f32 samples with the given expander.
pub fn expand_f32(bytes: &[u8], expand: fn(u8) -> i16, out: &mut Vec<f32>) {
    out.clear();
    out.extend(bytes.iter().map(|&b| expand(b) as f32 / i16::MAX as f32));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alaw_round_trip() {
        for sample in [-32768i16, -12345, -256, -1, 0, 1, 255, 12345, 32767] {
            let decoded = alaw_expand(alaw_compress(sample));
            // A-law quantization error is bounded by the segment step size
            assert!(
                (decoded as i32 - sample as i32).abs() < 2048,
                "sample {} decoded to {}",
                sample,
                decoded
            );
        }
    }

    #[test]
    fn test_ulaw_round_trip() {
        for sample in [-32768i16, -12345, -256, -1, 0, 1, 255, 12345, 32767] {
            let decoded = ulaw_expand(ulaw_compress(sample));
            assert!(
                (decoded as i32 - sample as i32).abs() < 2048,
                "sample {} decoded to {}",
                sample,
                decoded
            );
        }
    }

    #[test]
    fn test_sign_preserved() {
        assert!(ulaw_expand(ulaw_compress(-10000)) < 0);
        assert!(ulaw_expand(ulaw_compress(10000)) > 0);
        assert!(alaw_expand(alaw_compress(-10000)) < 0);
        assert!(alaw_expand(alaw_compress(10000)) > 0);
    }

    #[test]
    fn test_f32_helpers() {
        let samples = [0.0f32, 0.5, -0.5, 1.0, -1.0];
        let mut bytes = Vec::new();
        let mut decoded = Vec::new();

        compress_f32(&samples, ulaw_compress, &mut bytes);
        assert_eq!(bytes.len(), samples.len());

        expand_f32(&bytes, ulaw_expand, &mut decoded);
        assert_eq!(decoded.len(), samples.len());
        for (orig, dec) in samples.iter().zip(decoded.iter()) {
            assert!((orig - dec).abs() < 0.1);
        }
    }
}
