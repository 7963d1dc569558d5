use glam::{Vec2, Vec3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use site_exposure::geometry::primitives::cuboid;
use site_exposure::geometry::HostMesh;
use site_exposure::thresholds::{Credit, RegulationDocument};

/// Uniform sample in [0, 1).
pub fn unit_random(rng: &mut impl Rng) -> f32 {
    (rng.next_u32() as f32) / ((u32::MAX as f32) + 1.0)
}

/// Seeded context blocks around the origin, keeping a clear square of `clear` half-size.
pub fn context_towers(seed: u64, count: usize, extent: Vec2, clear: f32) -> Vec<HostMesh> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut towers = Vec::with_capacity(count);
    while towers.len() < count {
        let center = Vec2::new(
            (unit_random(&mut rng) - 0.5) * extent.x,
            (unit_random(&mut rng) - 0.5) * extent.y,
        );
        let footprint = 6.0 + 10.0 * unit_random(&mut rng);
        if center.x.abs() < clear + footprint && center.y.abs() < clear + footprint {
            continue;
        }
        let height = 8.0 + 40.0 * unit_random(&mut rng);
        towers.push(cuboid(
            format!("context-{}", towers.len()),
            center.extend(height * 0.5),
            Vec3::new(footprint, footprint, height),
        ));
    }
    towers
}

/// Two certification schemes with sun and daylight credits, as a host would load them.
pub fn certification_documents() -> Vec<RegulationDocument> {
    vec![
        RegulationDocument::new("Green Star")
            .with_credit(Credit::new(
                "Daylight and sunlight",
                [
                    "Amenity space receives a minimum 2 hours direct sunlight on 21 March.",
                    "Target 4 hours for exemplary performance.",
                ],
            ))
            .with_credit(Credit::new(
                "Acoustic comfort",
                ["Background noise below 40 dB for 8 hrs overnight."],
            )),
        RegulationDocument::new("Local plan").with_credit(Credit::new(
            "Solar access",
            [
                "Open space must see at least 3 hours of sun.",
                "Habitable rooms achieve a 2% daylight factor.",
            ],
        )),
    ]
}
