use super::*;
use crate::error::{CameraError, SnapcamError};
use crate::orientation::FixedOrientation;

fn create_test_manager(backend: &MockCameraBackend) -> CameraDeviceManager {
    CameraDeviceManager::new(
        Box::new(backend.clone()),
        Box::new(FixedOrientation::default()),
        Facing::Back,
    )
}

#[test]
fn test_open_applies_orientation_then_configurations() {
    let backend = MockCameraBackend::new()
        .with_supported_values("focus-mode", &["auto", "continuous-picture"]);
    let mut manager = create_test_manager(&backend);
    manager
        .configurations_mut()
        .add(ParameterConfiguration::new("focus-mode", "continuous-picture"));

    let id = manager.open(Facing::Back).unwrap();

    assert_eq!(manager.current_handle_id(), Some(id));
    assert_eq!(manager.state(), DeviceState::Open);
    assert_eq!(backend.display_orientation(), Some(90));
    assert_eq!(
        backend.calls(),
        vec!["open:back", "display_orientation:90", "set_parameters"]
    );
    assert_eq!(
        backend.last_parameters().unwrap().get("focus-mode"),
        Some("continuous-picture")
    );
}

#[test]
fn test_front_camera_display_orientation() {
    let backend = MockCameraBackend::new().with_sensor_orientation(Facing::Front, 270);
    let mut manager = create_test_manager(&backend);

    manager.open(Facing::Front).unwrap();

    assert_eq!(backend.display_orientation(), Some(90));
    assert_eq!(manager.facing(), Facing::Front);
    assert_eq!(manager.current_handle().unwrap().facing(), Facing::Front);
}

#[test]
fn test_open_failure_reports_device_unavailable() {
    let backend = MockCameraBackend::new();
    backend.set_fail_open(true);
    let mut manager = create_test_manager(&backend);

    match manager.open(Facing::Back) {
        Err(SnapcamError::Camera(CameraError::DeviceUnavailable { facing, .. })) => {
            assert_eq!(facing, Facing::Back);
        }
        other => panic!("Expected DeviceUnavailable, got {:?}", other.map(|_| ())),
    }

    assert!(!manager.is_open());
    assert_eq!(backend.open_devices(), 0);
}

#[test]
fn test_rejected_configuration_releases_device() {
    let backend = MockCameraBackend::new().with_supported_values("flash-mode", &["off", "auto"]);
    let mut manager = create_test_manager(&backend);
    manager
        .configurations_mut()
        .add(ParameterConfiguration::new("flash-mode", "torch"));

    let result = manager.open(Facing::Back);

    assert!(matches!(
        result,
        Err(SnapcamError::Camera(CameraError::InvalidParameter { .. }))
    ));
    assert!(!manager.is_open());
    assert_eq!(backend.open_devices(), 0);
    assert_eq!(backend.release_count(), 1);
}

#[test]
fn test_close_is_idempotent() {
    let backend = MockCameraBackend::new();
    let mut manager = create_test_manager(&backend);

    assert!(!manager.close());

    manager.open(Facing::Back).unwrap();
    assert!(manager.close());
    assert!(!manager.close());

    assert_eq!(manager.state(), DeviceState::Closed);
    assert_eq!(backend.release_count(), 1);
    assert_eq!(backend.open_devices(), 0);
}

#[test]
fn test_close_releases_even_when_stop_preview_fails() {
    let backend = MockCameraBackend::new();
    let mut manager = create_test_manager(&backend);
    manager.open(Facing::Back).unwrap();
    manager.start_preview().unwrap();
    backend.set_fail_stop_preview(true);

    assert!(manager.close());

    let calls = backend.calls();
    assert_eq!(&calls[calls.len() - 2..], ["stop_preview", "release"]);
    assert_eq!(backend.open_devices(), 0);
}

#[test]
fn test_reopen_closes_previous_handle() {
    let backend = MockCameraBackend::new();
    let mut manager = create_test_manager(&backend);

    let first = manager.open(Facing::Back).unwrap();
    let second = manager.open(Facing::Back).unwrap();

    assert_ne!(first, second);
    assert!(second > first);
    assert_eq!(backend.open_devices(), 1);
    assert_eq!(backend.open_count(), 2);
}

#[test]
fn test_supported_sizes_require_open_device() {
    let backend = MockCameraBackend::new();
    let mut manager = create_test_manager(&backend);

    assert!(matches!(
        manager.current_supported_preview_sizes(),
        Err(SnapcamError::Camera(CameraError::NoActiveDevice { .. }))
    ));
    assert!(matches!(
        manager.current_supported_picture_sizes(),
        Err(SnapcamError::Camera(CameraError::NoActiveDevice { .. }))
    ));

    manager.open(Facing::Back).unwrap();
    assert_eq!(manager.current_supported_preview_sizes().unwrap().len(), 5);
    assert_eq!(
        manager.current_supported_picture_sizes().unwrap()[0],
        Resolution::new(4000, 3000)
    );
}

#[test]
fn test_apply_resolution_sets_sizes_and_starts_preview() {
    let backend = MockCameraBackend::new();
    let mut manager = create_test_manager(&backend);
    manager.open(Facing::Back).unwrap();

    manager
        .apply_resolution(
            Some(Resolution::new(1280, 720)),
            Some(Resolution::new(1920, 1080)),
        )
        .unwrap();

    let parameters = backend.last_parameters().unwrap();
    assert_eq!(parameters.preview_size(), Some(Resolution::new(1280, 720)));
    assert_eq!(parameters.picture_size(), Some(Resolution::new(1920, 1080)));
    assert_eq!(manager.state(), DeviceState::PreviewActive);

    backend.clear_calls();
    manager
        .apply_resolution(Some(Resolution::new(640, 480)), None)
        .unwrap();
    assert_eq!(
        backend.calls(),
        vec!["stop_preview", "set_parameters", "start_preview"]
    );
    assert_eq!(
        backend.last_parameters().unwrap().picture_size(),
        Some(Resolution::new(1920, 1080))
    );
}

#[test]
fn test_apply_resolution_rejects_unsupported_size() {
    let backend = MockCameraBackend::new();
    let mut manager = create_test_manager(&backend);
    manager.open(Facing::Back).unwrap();
    backend.clear_calls();

    let result = manager.apply_resolution(
        Some(Resolution::new(1280, 720)),
        Some(Resolution::new(123, 45)),
    );

    match result {
        Err(SnapcamError::Camera(CameraError::UnsupportedResolution { kind, resolution })) => {
            assert_eq!(kind, "picture");
            assert_eq!(resolution, Resolution::new(123, 45));
        }
        other => panic!("Expected UnsupportedResolution, got {:?}", other),
    }

    // Nothing reached the hardware and the device is still usable
    assert!(backend.calls().is_empty());
    assert_eq!(manager.state(), DeviceState::Open);
    assert!(result_is_recoverable(&manager.apply_resolution(Some(Resolution::new(1, 1)), None)));
}

fn result_is_recoverable(result: &crate::error::Result<()>) -> bool {
    result.as_ref().err().map(SnapcamError::is_recoverable).unwrap_or(false)
}

#[test]
fn test_apply_resolution_without_device() {
    let backend = MockCameraBackend::new();
    let mut manager = create_test_manager(&backend);

    assert!(matches!(
        manager.apply_resolution(Some(Resolution::new(640, 480)), None),
        Err(SnapcamError::Camera(CameraError::NoActiveDevice { .. }))
    ));
}

#[test]
fn test_bind_failure_is_surface_binding_error() {
    let backend = MockCameraBackend::new();
    backend.set_fail_bind(true);
    let mut manager = create_test_manager(&backend);
    manager.open(Facing::Back).unwrap();

    assert!(matches!(
        manager.bind_preview_target(&PreviewTarget::new(7, "surface")),
        Err(SnapcamError::Camera(CameraError::SurfaceBindingFailed { .. }))
    ));
}

#[test]
fn test_take_picture_requires_preview() {
    let backend = MockCameraBackend::new();
    let mut manager = create_test_manager(&backend);

    assert!(manager.take_picture(Box::new(|_| {})).is_err());

    manager.open(Facing::Back).unwrap();
    assert!(matches!(
        manager.take_picture(Box::new(|_| {})),
        Err(SnapcamError::Camera(CameraError::NoActiveDevice { .. }))
    ));

    manager.start_preview().unwrap();
    let id = manager.take_picture(Box::new(|_| {})).unwrap();
    assert_eq!(manager.current_handle_id(), Some(id));
    assert_eq!(backend.pending_captures(), 1);
}

#[test]
fn test_dropping_manager_releases_device() {
    let backend = MockCameraBackend::new();
    {
        let mut manager = create_test_manager(&backend);
        manager.open(Facing::Back).unwrap();
        assert_eq!(backend.open_devices(), 1);
    }
    assert_eq!(backend.open_devices(), 0);
}

#[test]
fn test_pipeline_add_moves_existing_entry_to_end() {
    let mut pipeline = ConfigurationPipeline::new();
    pipeline.add(ParameterConfiguration::new("focus-mode", "auto"));
    pipeline.add(ParameterConfiguration::new("flash-mode", "off"));
    pipeline.add(ParameterConfiguration::new("focus-mode", "continuous-picture"));

    assert_eq!(pipeline.len(), 2);
    assert_eq!(pipeline.names(), vec!["flash-mode", "focus-mode"]);

    pipeline.add(ParameterConfiguration::new("focus-mode", "macro"));
    assert_eq!(pipeline.len(), 2);
    assert_eq!(pipeline.names(), vec!["flash-mode", "focus-mode"]);
}

#[test]
fn test_pipeline_remove_and_clear() {
    let mut pipeline = ConfigurationPipeline::new();
    pipeline.add(ParameterConfiguration::new("scene-mode", "auto"));
    pipeline.add(FnConfiguration::new("noop", |_: &mut CameraParameters| Ok(())));

    assert!(pipeline.remove("scene-mode"));
    assert!(!pipeline.remove("scene-mode"));
    assert!(pipeline.contains("noop"));

    pipeline.clear();
    assert!(pipeline.is_empty());
}

#[test]
fn test_later_configurations_override_earlier() {
    let backend = MockCameraBackend::new();
    let mut manager = create_test_manager(&backend);
    manager
        .configurations_mut()
        .add(ParameterConfiguration::new("jpeg-quality", "70").named("quality-low"));
    manager
        .configurations_mut()
        .add(FnConfiguration::new("quality-high", |p: &mut CameraParameters| {
            p.set("jpeg-quality", "95")
        }));

    manager.open(Facing::Back).unwrap();

    let parameters = backend.last_parameters().unwrap();
    assert_eq!(parameters.get("jpeg-quality"), Some("95"));
    assert_eq!(
        backend.calls().iter().filter(|c| *c == "set_parameters").count(),
        2
    );
}

#[test]
fn test_parameter_validation() {
    let mut parameters = CameraParameters::new(vec![Resolution::new(640, 480)], vec![])
        .with_supported_values("white-balance", ["auto", "daylight"]);

    assert!(parameters.set("white-balance", "daylight").is_ok());
    assert!(parameters.set("white-balance", "neon").is_err());
    assert_eq!(parameters.get("white-balance"), Some("daylight"));
    assert!(parameters.set("free-form", "anything").is_ok());
    assert_eq!(parameters.remove("free-form"), Some("anything".to_string()));

    assert!(parameters.set_preview_size(Resolution::new(640, 480)).is_ok());
    assert!(parameters.set_picture_size(Resolution::new(640, 480)).is_err());
}
