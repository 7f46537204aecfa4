//! Four-point homography recovery for camera-facing quads.
//!
//! Given the four corners of an observed quadrilateral, this crate recovers
//! the 4x4 projective transform ("homography") that maps a canonical
//! reference quad onto it. Two solvers are provided:
//!
//! - [`basis_transform`] — the affine-only basis-to-basis composition
//!   `Mdst * inverse(Msrc)` for four full 3D correspondences.
//! - [`quad_homography`] — the general projective solve, which additionally
//!   recovers per-corner homogeneous weights so the result is a true
//!   perspective map when the correspondence is not affine.
//!
//! When only 2D ray directions are known for the observed corners (screen or
//! near-clip coordinates), and the real-world quad is known to be a
//! parallelogram, [`reconstruct_parallelogram`] first recovers plausible 3D
//! corner positions from the depth-ambiguous rays.
//!
//! Corner order is always lower-left, upper-left, upper-right, lower-right;
//! the order determines which corners are treated as diagonally opposite.
//!
//! # Testing
//!
//! ## Unit tests
//!
//! To run the unit tests:
//!
//! ```text
//! cargo test
//! ```
//!
//! ## Test for `no_std`
//!
//! Since the `thumbv7em-none-eabihf` target does not have `std` available, we
//! can build for it to check that our crate does not inadvertently pull in std:
//!
//! ```text
//! # install target with: "rustup target add thumbv7em-none-eabihf"
//! cargo build --no-default-features --target thumbv7em-none-eabihf
//! ```
//!
//! # Example
//!
//! ```
//! use nalgebra::{Point2, Vector4};
//!
//! // Quad corners on the near-clip plane, lower-right corner dragged inward.
//! let dragged = [
//!     Point2::new(-1.0, -1.0),
//!     Point2::new(-1.0, 1.0),
//!     Point2::new(1.0, 1.0),
//!     Point2::new(0.6, -0.8),
//! ];
//!
//! let h = homography4::sensor_homography(&dragged, 1e-12).unwrap();
//!
//! // The reference corner (1, -1) of the near-clip rectangle now lands on
//! // the camera ray through the dragged corner.
//! let mapped = h * Vector4::new(1.0, -1.0, -1.0, 1.0);
//! approx::assert_relative_eq!(mapped.x / mapped.z, -0.6, epsilon = 1e-10);
//! approx::assert_relative_eq!(mapped.y / mapped.z, 0.8, epsilon = 1e-10);
//! ```
//!
//! # See also
//!
//! You may also be interested in:
//!
//! - [`dlt`](https://crates.io/crates/dlt) - direct linear transform for
//!   full camera calibration from 6+ correspondences.

#![deny(rust_2018_idioms, unsafe_code, missing_docs)]
#![cfg_attr(not(feature = "std"), no_std)]

use core::ops::Index;

use nalgebra::{Matrix4, Point2, Point3, RealField, Vector3, Vector4};

/// Failure modes of the four-point solvers.
///
/// All of these describe degenerate inputs; retrying with the same points
/// cannot succeed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum HomographyError {
    /// A basis or equation matrix has no inverse, e.g. three of the supplied
    /// corners are collinear.
    #[error("basis matrix is singular (degenerate corner configuration)")]
    SingularBasis,
    /// The parallelogram depth system has no inverse, e.g. two ray
    /// directions coincide.
    #[error("parallelogram system is singular (degenerate ray directions)")]
    SingularSystem,
    /// A non-positive edge length was requested for metric normalization.
    #[error("edge length for metric normalization must be positive")]
    InvalidLength,
    /// A corner slice did not contain exactly four points.
    #[error("expected exactly 4 corner points, got {0}")]
    InvalidCorrespondenceSize(usize),
}

/// Homogeneous weight used for basis columns 0–2.
///
/// Column 3 (the reference corner) is always embedded at weight 1; with all
/// four columns at weight 0 the fourth row would vanish and the basis could
/// never be inverted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde-serialize",
    derive(serde::Serialize, serde::Deserialize)
)]
pub enum Embedding {
    /// Corners 0–2 enter as direction vectors (weight 0). Required for
    /// planar quads, whose position embedding is rank-deficient.
    Direction,
    /// Corners 0–2 enter as absolute positions (weight 1). Only invertible
    /// when the four corners are not coplanar.
    Position,
}

/// Scaling applied to the points recovered by [`reconstruct_parallelogram`].
///
/// Exactly one normalization is applied per call; the raw solution fixes the
/// depth scale of corner 3 at 1 and is otherwise only defined up to scale.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(
    feature = "serde-serialize",
    derive(serde::Serialize, serde::Deserialize)
)]
pub enum Normalization<R: RealField> {
    /// Divide all points by the largest depth magnitude `max |p_i.z|`, so
    /// depths land in `[-1, 1]`. Use when only the relative shape matters.
    UnitDepth,
    /// Scale so the edge `|p1 - p0|` has the given physical length. Use when
    /// true-world units are required. The length must be positive.
    EdgeLength(R),
}

/// An ordered set of exactly four corner points.
///
/// Order is lower-left, upper-left, upper-right, lower-right. It is
/// semantically significant: the solvers treat corners 0,2 and 1,3 as
/// diagonally opposite, and corner 3 as the depth/affine reference.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(
    feature = "serde-serialize",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct Corners<R: RealField> {
    points: [Point3<R>; 4],
}

impl<R: RealField + Copy> Corners<R> {
    /// Wraps four corner points. The length-4 invariant is carried by the
    /// array type.
    pub fn new(points: [Point3<R>; 4]) -> Self {
        Self { points }
    }

    /// Builds a corner set from a slice, which must contain exactly four
    /// points.
    pub fn from_slice(points: &[Point3<R>]) -> Result<Self, HomographyError> {
        match points {
            [a, b, c, d] => Ok(Self::new([*a, *b, *c, *d])),
            _ => Err(HomographyError::InvalidCorrespondenceSize(points.len())),
        }
    }

    /// The canonical near-clip ("sensor") rectangle
    /// `{(-1,-1,-1), (-1,1,-1), (1,1,-1), (1,-1,-1)}`, the usual source quad
    /// for screen-space warps.
    pub fn sensor_rect() -> Self {
        let one = R::one();
        Self::new([
            Point3::new(-one, -one, -one),
            Point3::new(-one, one, -one),
            Point3::new(one, one, -one),
            Point3::new(one, -one, -one),
        ])
    }

    /// The four corner points, in order.
    pub fn points(&self) -> &[Point3<R>; 4] {
        &self.points
    }
}

impl<R: RealField + Copy> From<[Point3<R>; 4]> for Corners<R> {
    fn from(points: [Point3<R>; 4]) -> Self {
        Self::new(points)
    }
}

impl<R: RealField> Index<usize> for Corners<R> {
    type Output = Point3<R>;

    fn index(&self, index: usize) -> &Point3<R> {
        &self.points[index]
    }
}

/// Builds the 4x4 basis matrix of a corner set.
///
/// Corners 0,1,2 occupy columns 0,1,2 at the homogeneous weight selected by
/// `embedding`; corner 3 occupies column 3 at weight 1.
pub fn basis_matrix<R: RealField + Copy>(corners: &Corners<R>, embedding: Embedding) -> Matrix4<R> {
    let w = match embedding {
        Embedding::Direction => R::zero(),
        Embedding::Position => R::one(),
    };
    let c = corners.points();
    Matrix4::from_columns(&[
        Vector4::new(c[0].x, c[0].y, c[0].z, w),
        Vector4::new(c[1].x, c[1].y, c[1].z, w),
        Vector4::new(c[2].x, c[2].y, c[2].z, w),
        Vector4::new(c[3].x, c[3].y, c[3].z, R::one()),
    ])
}

/// Inversion with an explicit singularity tolerance on the determinant.
fn try_invert<R: RealField + Copy>(
    m: &Matrix4<R>,
    epsilon: R,
    error: HomographyError,
) -> Result<Matrix4<R>, HomographyError> {
    if m.determinant().abs() <= epsilon {
        return Err(error);
    }
    m.try_inverse().ok_or(error)
}

/// Computes the transform mapping the source basis onto the destination
/// basis, `Mdst * inverse(Msrc)`.
///
/// This is the affine-only path: every corner keeps unit homogeneous weight,
/// so the result maps the four correspondences exactly but applies no
/// perspective correction. For quads that are not related by an affine map,
/// use [`quad_homography`].
///
/// The same `embedding` is used for both bases. `epsilon` is the determinant
/// magnitude below which the source basis is considered singular.
pub fn basis_transform<R: RealField + Copy>(
    source: &Corners<R>,
    destination: &Corners<R>,
    embedding: Embedding,
    epsilon: R,
) -> Result<Matrix4<R>, HomographyError> {
    let src_inv = try_invert(
        &basis_matrix(source, embedding),
        epsilon,
        HomographyError::SingularBasis,
    )?;
    Ok(basis_matrix(destination, embedding) * src_inv)
}

/// Solves `s1*d1 - s0*d0 = s2*d2 - d3` for the scales `(s0, s1, s2)`, with
/// the fourth scale fixed at 1.
///
/// Set up as a 4x4 homogeneous system with one trivial identity row, so the
/// one matrix inversion routine covers both this and the basis solves.
fn parallelogram_scales<R: RealField + Copy>(
    d: &[Vector3<R>; 4],
    epsilon: R,
    error: HomographyError,
) -> Result<Vector3<R>, HomographyError> {
    let zero = R::zero();
    let one = R::one();
    let em = Matrix4::from_columns(&[
        Vector4::new(d[0].x, d[0].y, d[0].z, zero),
        Vector4::new(-d[1].x, -d[1].y, -d[1].z, zero),
        Vector4::new(d[2].x, d[2].y, d[2].z, zero),
        Vector4::new(zero, zero, zero, one),
    ]);
    let scales = try_invert(&em, epsilon, error)? * Vector4::new(d[3].x, d[3].y, d[3].z, one);
    Ok(scales.xyz())
}

/// Reconstructs 3D corner positions from four 2D ray directions, assuming
/// the true quad is a parallelogram (`p1 - p0 = p2 - p3`).
///
/// Each `rays[i]` is lifted to the camera-ray direction
/// `d_i = (rays[i].x, rays[i].y, -1)`; the parallelogram constraint then
/// determines the depth scale of every corner relative to corner 3, whose
/// scale is fixed at 1. The chosen [`Normalization`] is applied to the
/// solved points before they are returned.
///
/// Configurations with no true perspective convergence are not
/// special-cased; the linear solve degrades naturally to the affine answer.
pub fn reconstruct_parallelogram<R: RealField + Copy>(
    rays: &[Point2<R>; 4],
    normalization: Normalization<R>,
    epsilon: R,
) -> Result<[Point3<R>; 4], HomographyError> {
    let neg_one = -R::one();
    let d = [
        Vector3::new(rays[0].x, rays[0].y, neg_one),
        Vector3::new(rays[1].x, rays[1].y, neg_one),
        Vector3::new(rays[2].x, rays[2].y, neg_one),
        Vector3::new(rays[3].x, rays[3].y, neg_one),
    ];
    let s = parallelogram_scales(&d, epsilon, HomographyError::SingularSystem)?;

    let mut points = [
        Point3::from(d[0] * s.x),
        Point3::from(d[1] * s.y),
        Point3::from(d[2] * s.z),
        Point3::from(d[3]),
    ];

    let scale = match normalization {
        Normalization::UnitDepth => {
            // Corner 3 sits at depth 1, so the maximum is at least 1.
            let mut max_depth = R::one();
            for p in &points {
                max_depth = max_depth.max(p.z.abs());
            }
            R::one() / max_depth
        }
        Normalization::EdgeLength(length) => {
            if length <= R::zero() {
                return Err(HomographyError::InvalidLength);
            }
            let edge = (points[1] - points[0]).norm();
            if edge <= epsilon {
                return Err(HomographyError::SingularSystem);
            }
            length / edge
        }
    };
    for p in &mut points {
        p.coords *= scale;
    }
    Ok(points)
}

/// Recovers the homogeneous weights `(alpha0, alpha1, alpha2)` of the first
/// three destination corners; the fourth weight is fixed at 1.
///
/// The weights solve the equation matrix (the destination basis at
/// [`Embedding::Direction`] with column 1 sign-negated) applied to the
/// weight-1 embedding of corner 3 — the same system as the parallelogram
/// depth solve, because `alpha_i * q_i` are exactly the corner positions of
/// the parallelogram that projects onto the destination quad. All weights
/// equal 1 when the correspondence is affine.
pub fn projective_weights<R: RealField + Copy>(
    destination: &Corners<R>,
    epsilon: R,
) -> Result<Vector3<R>, HomographyError> {
    let c = destination.points();
    parallelogram_scales(
        &[c[0].coords, c[1].coords, c[2].coords, c[3].coords],
        epsilon,
        HomographyError::SingularBasis,
    )
}

/// Computes the general projective transform mapping the source quad onto
/// the destination quad.
///
/// The destination basis columns are scaled by the recovered
/// [`projective_weights`] before composition, so the result is a true
/// perspective map for non-affine correspondences: each source corner lands
/// on the camera ray through its destination corner, at the depth implied by
/// its weight. The source quad is expected to be a parallelogram in the
/// documented winding (e.g. [`Corners::sensor_rect`]).
pub fn quad_homography<R: RealField + Copy>(
    source: &Corners<R>,
    destination: &Corners<R>,
    epsilon: R,
) -> Result<Matrix4<R>, HomographyError> {
    let src_inv = try_invert(
        &basis_matrix(source, Embedding::Direction),
        epsilon,
        HomographyError::SingularBasis,
    )?;
    let alpha = projective_weights(destination, epsilon)?;

    let zero = R::zero();
    let c = destination.points();
    let corrected = Matrix4::from_columns(&[
        Vector4::new(c[0].x * alpha.x, c[0].y * alpha.x, c[0].z * alpha.x, zero),
        Vector4::new(c[1].x * alpha.y, c[1].y * alpha.y, c[1].z * alpha.y, zero),
        Vector4::new(c[2].x * alpha.z, c[2].y * alpha.z, c[2].z * alpha.z, zero),
        Vector4::new(c[3].x, c[3].y, c[3].z, R::one()),
    ]);
    Ok(corrected * src_inv)
}

/// Convenience wrapper around [`quad_homography`] for the screen-warp case.
///
/// Lifts four user-picked 2D near-clip corners onto the `z = -1` plane and
/// maps the canonical [`Corners::sensor_rect`] onto them.
pub fn sensor_homography<R: RealField + Copy>(
    user_points: &[Point2<R>; 4],
    epsilon: R,
) -> Result<Matrix4<R>, HomographyError> {
    let neg_one = -R::one();
    let destination = Corners::new([
        Point3::new(user_points[0].x, user_points[0].y, neg_one),
        Point3::new(user_points[1].x, user_points[1].y, neg_one),
        Point3::new(user_points[2].x, user_points[2].y, neg_one),
        Point3::new(user_points[3].x, user_points[3].y, neg_one),
    ]);
    quad_homography(&Corners::sensor_rect(), &destination, epsilon)
}
