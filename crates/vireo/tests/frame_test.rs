//! End-to-end frames: transform and physics systems driven by stage.

use glam::Vec3;
use vireo::core::{CommandBufferHandle, EcsError, EntityManager, SystemStage};
use vireo::{scene, EngineConfig, FrameDriver, PhysicsSystem, Transform, TransformSystem};

fn engine() -> (EntityManager, FrameDriver) {
    let config = EngineConfig::from_toml_str(
        r#"
        [ecs]
        max_entities = 32

        [frame]
        fixed_dt = 0.015625
        max_substeps = 4
        max_frame_time = 10.0
        "#,
    )
    .unwrap();

    let mut manager = EntityManager::from_config(&config.ecs).unwrap();
    manager.register_cpu_system(TransformSystem::new()).unwrap();
    manager.register_cpu_system(PhysicsSystem::new(config.physics)).unwrap();
    (manager, FrameDriver::new(config.frame))
}

#[test]
fn test_duplicate_system_rejected() {
    let (mut manager, _) = engine();
    let result = manager.register_cpu_system(PhysicsSystem::default());
    assert!(matches!(
        result,
        Err(EcsError::SystemAlreadyRegistered {
            stage: SystemStage::Physics,
            ..
        })
    ));
    assert_eq!(manager.systems_in_stage(SystemStage::Physics).count(), 1);
}

#[test]
fn test_falling_child_follows_parent() {
    let (mut manager, mut driver) = engine();
    let ball = scene::spawn_sphere(&mut manager, Vec3::new(0.0, 10.0, 0.0), 0.5, vireo::RigidBody::new(1.0)).unwrap();
    let marker = scene::spawn_transform(&mut manager, Transform::from_position(Vec3::Y).with_parent(ball)).unwrap();

    for _ in 0..4 {
        driver.run_frame(&mut manager, 0.015625, CommandBufferHandle::default());
    }

    // Transform runs before physics, so world matrices lag one frame behind.
    let ball_world = manager.get_component::<Transform>(ball).unwrap().world_position();
    let marker_world = manager.get_component::<Transform>(marker).unwrap().world_position();
    assert!(ball_world.y < 10.0);
    assert!((marker_world - ball_world).abs_diff_eq(Vec3::Y, 1e-5));

    FrameDriver::run_stage(&mut manager, SystemStage::Transform, 0.0, CommandBufferHandle::default());
    let position = manager.get_component::<Transform>(ball).unwrap().position;
    let ball_world = manager.get_component::<Transform>(ball).unwrap().world_position();
    assert!(ball_world.abs_diff_eq(position, 1e-5));
}

#[test]
fn test_shutdown_after_frames() {
    let (mut manager, mut driver) = engine();
    scene::spawn_plane(&mut manager, Vec3::Y, 0.0).unwrap();
    driver.run_frame(&mut manager, 0.03125, CommandBufferHandle::default());

    assert_eq!(manager.shutdown(), Ok(()));
    assert_eq!(manager.system_count(), 0);
}
