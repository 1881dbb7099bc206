/// Convert a 0xRRGGBB literal to RGB in 0..1
pub fn hex_rgb(hex: u32) -> [f32; 3] {
    [
        ((hex >> 16) & 0xff) as f32 / 255.0,
        ((hex >> 8) & 0xff) as f32 / 255.0,
        (hex & 0xff) as f32 / 255.0,
    ]
}

pub const fn with_alpha(rgb: [f32; 3], alpha: f32) -> [f32; 4] {
    [rgb[0], rgb[1], rgb[2], alpha]
}

/// Decode sRGB-encoded components for shading
pub fn srgb_to_linear(rgb: [f32; 3]) -> [f32; 3] {
    rgb.map(|c| {
        if c <= 0.04045 {
            c / 12.92
        } else {
            ((c + 0.055) / 1.055).powf(2.4)
        }
    })
}

/// Encode linear components (e.g. glTF colour factors) as sRGB
pub fn linear_to_srgb(rgb: [f32; 3]) -> [f32; 3] {
    rgb.map(|c| {
        if c <= 0.0031308 {
            c * 12.92
        } else {
            1.055 * c.powf(1.0 / 2.4) - 0.055
        }
    })
}

pub const RED: [f32; 3] = [1.0, 0.0, 0.0];
/// 0xff69b4
pub const HOT_PINK: [f32; 3] = [1.0, 105.0 / 255.0, 180.0 / 255.0];
pub const WHITE: [f32; 3] = [1.0, 1.0, 1.0];
