//! Chromaticity constants for the built-in white points and primaries.
#![allow(clippy::excessive_precision)]

/// CIE illuminant D65, the white point used by sRGB.
pub const ILLUMINANT_D65: [f32; 2] = [0.3127, 0.329];

/// CIE illuminant E (equal-energy).
pub const ILLUMINANT_E: [f32; 2] = [1.0 / 3.0, 1.0 / 3.0];

/// DCI-P3 illuminant.
pub const ILLUMINANT_DCI: [f32; 2] = [0.314, 0.351];

/// Primaries used by the sRGB colorspace.
pub const PRIMARIES_SRGB: [[f32; 2]; 3] = [
    [0.639998686, 0.330010138],
    [0.300003784, 0.600003357],
    [0.150002046, 0.059997204],
];

/// Primaries specified in ITU-R BT.2100-2.
pub const PRIMARIES_BT2100: [[f32; 2]; 3] = [[0.708, 0.292], [0.170, 0.797], [0.131, 0.046]];

/// Primaries specified in SMPTE ST 428-1 (DCI-P3).
pub const PRIMARIES_P3: [[f32; 2]; 3] = [[0.680, 0.320], [0.265, 0.690], [0.150, 0.060]];

/// Opsin absorbance matrix rows used by the default XYB -> linear sRGB
/// inverse transform (`OpsinInverseMatrix::all_default`).
pub const DEFAULT_INV_MAT: [[f32; 3]; 3] = [
    [11.031566901960783, -9.866943921568629, -0.16462299647058826],
    [-3.254147380392157, 4.418770392156863, -0.16462299647058826],
    [-3.6588512862745097, 2.7129230470588235, 1.9459282392156863],
];

pub const DEFAULT_OPSIN_BIAS: [f32; 3] = [-0.0037930732552754493; 3];

pub const DEFAULT_QUANT_BIAS: [f32; 3] = [
    1.0 - 0.05465007330715401,
    1.0 - 0.07005449891748593,
    1.0 - 0.049935103337343655,
];

pub const DEFAULT_QUANT_BIAS_NUMERATOR: f32 = 0.145;
