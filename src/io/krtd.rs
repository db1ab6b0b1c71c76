//! KRTD camera files.
//!
//! Plain text, whitespace separated:
//!
//! ```text
//! fx  s   cx
//! 0   fy  cy
//! 0   0   1
//!
//! r00 r01 r02
//! r10 r11 r12
//! r20 r21 r22
//!
//! tx  ty  tz
//!
//! [distortion coefficients, ignored]
//! ```
//!
//! `R` and `t` map world points into the camera frame (`x_c = R x_w + t`).

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use nalgebra::{Matrix3, Vector3};

use crate::error::DecodeError;
use crate::geometry::SE3;
use crate::scene::{Camera, CameraIntrinsics};

const KIND: &str = "KRTD";
const VALUES: usize = 9 + 9 + 3;

/// Read a camera from a KRTD file.
pub fn read_krtd(path: &Path) -> Result<Camera, DecodeError> {
    let text = fs::read_to_string(path).map_err(|e| DecodeError::io(path, e))?;
    parse_krtd(&text, path)
}

/// Parse KRTD text; `path` is only used for error reporting.
pub fn parse_krtd(text: &str, path: &Path) -> Result<Camera, DecodeError> {
    let mut values = Vec::with_capacity(VALUES);
    for token in text.split_whitespace().take(VALUES) {
        let v: f64 = token
            .parse()
            .map_err(|_| DecodeError::malformed(KIND, path, format!("bad number '{token}'")))?;
        if !v.is_finite() {
            return Err(DecodeError::malformed(KIND, path, "non-finite value"));
        }
        values.push(v);
    }
    if values.len() < VALUES {
        return Err(DecodeError::malformed(
            KIND,
            path,
            format!("expected {VALUES} values, found {}", values.len()),
        ));
    }

    let k = Matrix3::from_row_slice(&values[0..9]);
    let r = Matrix3::from_row_slice(&values[9..18]);
    let t = Vector3::from_column_slice(&values[18..21]);

    if k[(0, 0)] <= 0.0 || k[(1, 1)] <= 0.0 {
        return Err(DecodeError::malformed(KIND, path, "non-positive focal length"));
    }
    let det = r.determinant();
    if (det - 1.0).abs() > 1e-3 {
        return Err(DecodeError::malformed(
            KIND,
            path,
            format!("rotation determinant {det:.4} is not 1"),
        ));
    }

    let pose_cw = SE3::from_matrix(&r, t);
    Ok(Camera::new(CameraIntrinsics::from_k(&k), pose_cw.inverse()))
}

/// Format a camera as KRTD text.
pub fn format_krtd(camera: &Camera) -> String {
    let k = camera.intrinsics().k();
    let pose_cw = camera.pose_cw();
    let r = pose_cw.rotation_matrix();
    let t = pose_cw.translation;

    let mut out = String::new();
    for m in [&k, &r] {
        for row in 0..3 {
            let _ = writeln!(out, "{} {} {}", m[(row, 0)], m[(row, 1)], m[(row, 2)]);
        }
        out.push('\n');
    }
    let _ = writeln!(out, "{} {} {}", t.x, t.y, t.z);
    out.push('\n');
    out.push_str("0\n");
    out
}

/// Write a camera to a KRTD file.
pub fn write_krtd(path: &Path, camera: &Camera) -> Result<(), DecodeError> {
    fs::write(path, format_krtd(camera)).map_err(|e| DecodeError::io(path, e))
}
