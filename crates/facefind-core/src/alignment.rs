//! Face alignment via 4-DOF similarity transform.
//!
//! Warps a detected face to the canonical 112×112 ArcFace crop using the
//! five InsightFace reference landmarks and least-squares estimation.

/// ArcFace reference landmarks for a 112×112 output.
const REFERENCE_LANDMARKS_112: [(f32, f32); 5] = [
    (38.2946, 51.6963), // left eye
    (73.5318, 51.5014), // right eye
    (56.0252, 71.7366), // nose
    (41.5493, 92.3655), // left mouth
    (70.7299, 92.2041), // right mouth
];

pub const ALIGNED_SIZE: usize = 112;

/// Similarity transform (uniform scale, rotation, translation):
/// ```text
/// | a  -b  tx |
/// | b   a  ty |
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
struct Similarity {
    a: f32,
    b: f32,
    tx: f32,
    ty: f32,
}

impl Similarity {
    const IDENTITY: Similarity = Similarity {
        a: 1.0,
        b: 0.0,
        tx: 0.0,
        ty: 0.0,
    };

    /// Least-squares fit mapping `src` points onto `dst` points.
    fn estimate(src: &[(f32, f32); 5], dst: &[(f32, f32); 5]) -> Self {
        // Normal equations for the overdetermined system A·[a, b, tx, ty]ᵀ = B,
        // two rows per point pair (sx, sy) → (dx, dy):
        //   sx·a - sy·b + tx = dx
        //   sy·a + sx·b + ty = dy
        let mut ata = [[0.0f32; 4]; 4];
        let mut atb = [0.0f32; 4];

        for (&(sx, sy), &(dx, dy)) in src.iter().zip(dst.iter()) {
            for (row, target) in [([sx, -sy, 1.0, 0.0], dx), ([sy, sx, 0.0, 1.0], dy)] {
                for j in 0..4 {
                    for k in 0..4 {
                        ata[j][k] += row[j] * row[k];
                    }
                    atb[j] += row[j] * target;
                }
            }
        }

        match solve_4x4(ata, atb) {
            Some([a, b, tx, ty]) => Similarity { a, b, tx, ty },
            None => Self::IDENTITY,
        }
    }

    /// Map an output-space point back into source space.
    fn invert_point(&self, x: f32, y: f32) -> Option<(f32, f32)> {
        let det = self.a * self.a + self.b * self.b;
        if det < 1e-12 {
            return None;
        }
        let dx = x - self.tx;
        let dy = y - self.ty;
        Some((
            (self.a * dx + self.b * dy) / det,
            (-self.b * dx + self.a * dy) / det,
        ))
    }
}

/// Solve a 4×4 linear system via Gaussian elimination with partial pivoting.
/// Returns `None` for a singular system.
fn solve_4x4(mut m: [[f32; 4]; 4], mut rhs: [f32; 4]) -> Option<[f32; 4]> {
    for col in 0..4 {
        let pivot_row = (col..4)
            .max_by(|&i, &j| m[i][col].abs().total_cmp(&m[j][col].abs()))
            .unwrap_or(col);
        m.swap(col, pivot_row);
        rhs.swap(col, pivot_row);

        let pivot = m[col][col];
        if pivot.abs() < 1e-12 {
            return None;
        }

        for row in (col + 1)..4 {
            let factor = m[row][col] / pivot;
            for j in col..4 {
                m[row][j] -= factor * m[col][j];
            }
            rhs[row] -= factor * rhs[col];
        }
    }

    let mut x = [0.0f32; 4];
    for i in (0..4).rev() {
        let tail: f32 = ((i + 1)..4).map(|j| m[i][j] * x[j]).sum();
        x[i] = (rhs[i] - tail) / m[i][i];
    }
    Some(x)
}

/// Warp `frame` through `transform` into a square `out_size` crop.
///
/// Bilinear sampling; pixels that map outside the source are black.
fn warp(
    frame: &[u8],
    src_width: usize,
    src_height: usize,
    transform: &Similarity,
    out_size: usize,
) -> Vec<u8> {
    let mut output = vec![0u8; out_size * out_size];

    let sample = |x: i32, y: i32| -> f32 {
        if x >= 0 && (x as usize) < src_width && y >= 0 && (y as usize) < src_height {
            frame[y as usize * src_width + x as usize] as f32
        } else {
            0.0
        }
    };

    for oy in 0..out_size {
        for ox in 0..out_size {
            let Some((sx, sy)) = transform.invert_point(ox as f32, oy as f32) else {
                return output;
            };

            let x0 = sx.floor() as i32;
            let y0 = sy.floor() as i32;
            let fx = sx - x0 as f32;
            let fy = sy - y0 as f32;

            let val = sample(x0, y0) * (1.0 - fx) * (1.0 - fy)
                + sample(x0 + 1, y0) * fx * (1.0 - fy)
                + sample(x0, y0 + 1) * (1.0 - fx) * fy
                + sample(x0 + 1, y0 + 1) * fx * fy;

            output[oy * out_size + ox] = val.round().clamp(0.0, 255.0) as u8;
        }
    }

    output
}

/// Align a detected face to a canonical 112×112 grayscale crop for ArcFace.
pub fn align_face(frame: &[u8], width: u32, height: u32, landmarks: &[(f32, f32); 5]) -> Vec<u8> {
    let transform = Similarity::estimate(landmarks, &REFERENCE_LANDMARKS_112);
    warp(frame, width as usize, height as usize, &transform, ALIGNED_SIZE)
}
