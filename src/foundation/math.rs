pub(crate) fn mul_div255_u16(x: u16, y: u16) -> u16 {
    (((u32::from(x) * u32::from(y)) + 127) / 255) as u16
}

pub(crate) fn mul_div255_u8(x: u16, y: u16) -> u8 {
    mul_div255_u16(x, y) as u8
}

/// Premultiplied source-over for a single pixel.
pub(crate) fn over_px(dst: [u8; 4], src: [u8; 4]) -> [u8; 4] {
    if src[3] == 0 {
        return dst;
    }
    if src[3] == 255 {
        return src;
    }
    let inv = 255u16 - u16::from(src[3]);
    let mut out = [0u8; 4];
    for i in 0..4 {
        let v = u16::from(src[i]) + u16::from(mul_div255_u8(u16::from(dst[i]), inv));
        out[i] = v.min(255) as u8;
    }
    out
}

/// Scale every channel of a premultiplied pixel by `coverage` (0..=255).
pub(crate) fn scale_px(px: [u8; 4], coverage: u8) -> [u8; 4] {
    if coverage == 255 {
        return px;
    }
    let c = u16::from(coverage);
    [
        mul_div255_u8(u16::from(px[0]), c),
        mul_div255_u8(u16::from(px[1]), c),
        mul_div255_u8(u16::from(px[2]), c),
        mul_div255_u8(u16::from(px[3]), c),
    ]
}

/// `max(1, floor(len / factor))`, the downsampled length of one axis.
pub(crate) fn downsampled_len(len: u32, factor: f32) -> u32 {
    let scaled = (f64::from(len) / f64::from(factor)).floor();
    if scaled.is_finite() && scaled >= 1.0 {
        scaled.min(f64::from(u32::MAX)) as u32
    } else {
        1
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/math.rs"]
mod tests;
