use homography4::{
    quad_homography, reconstruct_parallelogram, sensor_homography, Corners, Normalization,
};
use nalgebra::{Point2, Point3};

fn main() {
    // A poster of known size (2 x sqrt(5) units) hangs skewed in front of the
    // camera. Only its projected corner rays are observed.
    let poster = [
        Point3::new(-2.0, -1.0, -6.0),
        Point3::new(-2.0, 1.0, -5.0),
        Point3::new(1.0, 1.0, -4.0),
        Point3::new(1.0, -1.0, -5.0),
    ];
    let edge = (poster[1] - poster[0]).norm();
    let rays = poster.map(|p| Point2::new(p.x / -p.z, p.y / -p.z));

    let recovered =
        reconstruct_parallelogram(&rays, Normalization::EdgeLength(edge), 1e-12).unwrap();
    println!("Reconstructed poster corners:");
    for (observed, truth) in recovered.iter().zip(poster.iter()) {
        println!("   {}    (true: {})", observed, truth);
        approx::assert_relative_eq!(observed.x, truth.x, epsilon = 1e-9);
        approx::assert_relative_eq!(observed.y, truth.y, epsilon = 1e-9);
        approx::assert_relative_eq!(observed.z, truth.z, epsilon = 1e-9);
    }

    // Warp the full near-clip rectangle onto the observed quad, as a
    // renderer would before binding the matrix to a shader.
    let homography = sensor_homography(&rays, 1e-12).unwrap();
    println!("Near-clip homography:");
    println!("{}", homography);

    let sensor = Corners::sensor_rect();
    for (corner, target) in sensor.points().iter().zip(rays.iter()) {
        let mapped = homography * corner.to_homogeneous();
        let on_screen = Point2::new(mapped.x / -mapped.z, mapped.y / -mapped.z);
        println!("   {} -> {}", corner, on_screen);
        approx::assert_relative_eq!(on_screen.x, target.x, epsilon = 1e-9);
        approx::assert_relative_eq!(on_screen.y, target.y, epsilon = 1e-9);
    }

    // The same solve applied to the recovered 3D corners directly.
    let world = quad_homography(&sensor, &Corners::new(recovered), 1e-12).unwrap();
    println!("Sensor-to-world transform:");
    println!("{}", world);
}
