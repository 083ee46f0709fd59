use {
    byteorder::{ByteOrder, LittleEndian},
    ndarray::{Array2, ArrayView2},
};

pub fn arr2zero(nlat: usize, nlon: usize) -> Array2<f64> {
    Array2::<f64>::zeros((nlat, nlon))
}

/// Reads a row-major `nlat x nlon` field of little-endian f64 values.
pub fn array2_from_r8(bytes: &[u8], nlat: usize, nlon: usize) -> Option<Array2<f64>> {
    if bytes.len() != nlat * nlon * 8 {
        return None;
    }

    Array2::from_shape_vec(
        (nlat, nlon),
        bytes
            .chunks(8)
            .map(LittleEndian::read_f64)
            .collect::<Vec<f64>>(),
    )
    .ok()
}

/// Writes a field as row-major little-endian f64 values.
pub fn array2_to_r8(field: ArrayView2<f64>) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(field.len() * 8);
    let mut buf = [0u8; 8];
    for e in field.iter() {
        LittleEndian::write_f64(&mut buf, *e);
        bytes.extend_from_slice(&buf);
    }
    bytes
}

/// Sum of squares over the grid.
pub fn energy(field: ArrayView2<f64>) -> f64 {
    field.iter().map(|x| x * x).sum()
}

pub fn max_abs(field: ArrayView2<f64>) -> f64 {
    field.iter().map(|x| x.abs()).fold(0.0, f64::max)
}

pub fn all_finite(field: ArrayView2<f64>) -> bool {
    field.iter().all(|x| x.is_finite())
}
