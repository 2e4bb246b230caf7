//! A complete lake scene: terrain, a circling boat with a tracked cutout,
//! the waterfall at the far shore, and the spray veil at its base.
//!
//! Run with `cargo run --example lake`.

use lagoon::*;

fn main() {
    env_logger::init();

    run(AppConfig::new().title("Lagoon Lake").size(1280, 720), |ctx| {
        let gpu = ctx.gpu;

        let noise = Texture::tileable_noise(gpu, 256, 7);
        let dudv = Texture::dudv(gpu, 256, 11);

        // The waterfall sheet: a tall plane stood up at the cliff face.
        let mut falls_geometry = RawGeometry::plane(24.0);
        falls_geometry.rotate(Quat::from_rotation_x(std::f32::consts::FRAC_PI_2));
        let falls = PlacementAsset::new(
            falls_geometry,
            Transform::from_position(Vec3::new(0.0, 12.0, -110.0)),
        );

        let desc = LakeSceneDesc {
            lake_size: 252.0,
            cutout_footprint: hull_footprint(12.0, 5.0),
            waterfall: &falls,
            veil_size: (26.0, 7.0),
            noise: &noise,
            dudv: &dudv,
        };
        let mut scene = LakeScene::new(gpu, &ctx.viewport, &desc).expect("scene setup");

        // Lake bed, well below the surface so the depth shading has range.
        scene.add_prop(
            gpu,
            Mesh::plane(gpu, 260.0),
            Transform::from_position(Vec3::new(0.0, -14.0, 0.0)),
            [0.45, 0.4, 0.3, 1.0],
            Some(&noise),
        );

        // The cliff the waterfall pours over.
        scene.add_prop(
            gpu,
            Mesh::cube(gpu),
            Transform::from_position(Vec3::new(0.0, 5.0, -122.0))
                .scale(Vec3::new(80.0, 40.0, 24.0)),
            [0.5, 0.48, 0.45, 1.0],
            Some(&noise),
        );

        // Shoreline rocks; they pierce the surface, so they grow foam rings.
        for (i, &(x, z)) in [(40.0, 20.0), (-55.0, -30.0), (15.0, 70.0)].iter().enumerate() {
            scene.add_prop(
                gpu,
                Mesh::cube(gpu),
                Transform::from_position(Vec3::new(x, -2.0, z))
                    .rotation(Quat::from_rotation_y(i as f32 * 0.8))
                    .uniform_scale(7.0),
                [0.55, 0.52, 0.5, 1.0],
                Some(&noise),
            );
        }

        // The boat hull the cutout tracks.
        let boat = scene.add_prop(
            gpu,
            Mesh::cube(gpu),
            Transform::new(),
            [0.6, 0.35, 0.2, 1.0],
            None,
        );

        let mut frames: u32 = 0;

        (
            scene,
            move |tick: &mut FrameTick| {
                tick.camera.position = Vec3::new(0.0, 28.0, 70.0);
                tick.camera.target = Vec3::new(0.0, 0.0, -20.0);

                // The boat circles the lake; its pose is the tracked input.
                // Leave it untracked for the very first frame, as a loader
                // that hasn't placed the hull yet would.
                let pose = (frames > 0).then(|| {
                    let angle = tick.time * 0.15;
                    Transform::from_position(Vec3::new(
                        angle.cos() * 35.0,
                        0.0,
                        angle.sin() * 35.0,
                    ))
                    .rotation(Quat::from_rotation_y(-angle))
                });

                if let Some(pose) = pose {
                    tick.scene
                        .set_prop_transform(tick.gpu, boat, pose.scale(Vec3::new(5.0, 3.0, 12.0)));
                }
                tick.scene.track(pose);

                frames += 1;
            },
        )
    });
}
